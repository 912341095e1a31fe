use super::basics::{
    Address, Register, Value, ADDRESS_MASK, FONT_GLYPH_SIZE, FONT_OFFSET, REGISTER_COUNT,
};
use super::display::{Display, Frame};
use super::executor::{Stopper, TimerClock};
use super::keypad::{Keypad, NullKeypad};
use super::memory::Memory;
use super::program::{Instruction, Opcode};
use super::registers::{RegisterFile, State};
use crate::config::{BulkTransfer, Config};
use crate::error::VmError;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::thread;
use tracing::{debug, trace};

/// Where the program counter goes after an instruction.
enum Flow {
    Next,
    Skip,
    Jump(Address),
}

impl Flow {
    fn skip_if(condition: bool) -> Flow {
        if condition {
            Flow::Skip
        } else {
            Flow::Next
        }
    }
}

/// Holds the logic of a virtual machine in action, including things like the
/// program counter and the memory.
pub struct VirtualMachine<K: Keypad = NullKeypad> {
    memory: Memory,
    registers: RegisterFile,
    display: Display,
    keypad: K,
    rng: StdRng,
    config: Config,
}

impl<K: Keypad> VirtualMachine<K> {
    /// Creates a machine with the default configuration and `program`
    /// loaded at 0x200. Fails if the program does not fit in memory.
    pub fn new(program: &[u8], keypad: K) -> Result<VirtualMachine<K>, VmError> {
        VirtualMachine::with_config(program, keypad, Config::default())
    }

    pub fn with_config(
        program: &[u8],
        keypad: K,
        config: Config,
    ) -> Result<VirtualMachine<K>, VmError> {
        let memory = Memory::with_program(program)?;
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(VirtualMachine {
            memory,
            registers: RegisterFile::new(),
            display: Display::new(),
            keypad,
            rng,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn keypad(&self) -> &K {
        &self.keypad
    }

    pub fn keypad_mut(&mut self) -> &mut K {
        &mut self.keypad
    }

    pub fn state(&self) -> State {
        self.registers.state()
    }

    pub fn frame(&self) -> Frame {
        self.display.snapshot()
    }

    pub fn program_counter(&self) -> u16 {
        self.registers.program_counter.0
    }

    /// Whether the sound timer is still counting down.
    pub fn sound_active(&self) -> bool {
        self.registers.sound_timer.0 > 0
    }

    /// Decrements the delay and sound timers by one 60 Hz tick.
    pub fn tick_timers(&mut self) {
        self.registers.tick_timers();
    }

    /// Reads and decodes the instruction at the program counter without
    /// executing it.
    pub fn fetch(&self) -> Result<(Opcode, Instruction), VmError> {
        let pc = self.registers.program_counter;
        if pc.0 % 2 != 0 {
            return Err(VmError::MisalignedProgramCounter { address: pc.0 });
        }
        let opcode = Opcode::from_bytes(self.memory.read(pc), self.memory.read(pc.offset(1)));
        match Instruction::decode(opcode) {
            Some(instruction) => Ok((opcode, instruction)),
            None => Err(VmError::UnknownOpcode {
                opcode: opcode.0,
                address: pc.0,
            }),
        }
    }

    /// Fetches, decodes and executes exactly one instruction.
    pub fn step(&mut self) -> Result<(), VmError> {
        let (opcode, instruction) = self.fetch()?;
        trace!(
            pc = self.registers.program_counter.0,
            opcode = opcode.0,
            "{}",
            instruction
        );
        self.execute_instruction(&instruction)
    }

    /// Steps until `stopper` is stopped or a step fails. Timers tick at the
    /// configured interval, applied between instructions.
    pub fn run(&mut self, stopper: &Stopper) -> Result<(), VmError> {
        let mut clock = TimerClock::new(self.config.timer_interval);
        let pause = self.config.instruction_interval;
        debug!(pc = self.program_counter(), "run started");
        let result = loop {
            if stopper.is_stopped() {
                break Ok(());
            }
            for _ in 0..clock.due_ticks() {
                self.tick_timers();
            }
            if let Err(err) = self.step() {
                break Err(err);
            }
            if pause.as_nanos() > 0 {
                thread::sleep(pause);
            }
        };
        match &result {
            Ok(()) => debug!(pc = self.program_counter(), "run stopped"),
            Err(err) => debug!(pc = self.program_counter(), %err, "run failed"),
        }
        result
    }

    /// Executes a single instruction as if it was fetched at the current
    /// program counter, then moves the program counter on. Nothing is
    /// modified if the instruction fails.
    pub fn execute_instruction(&mut self, instruction: &Instruction) -> Result<(), VmError> {
        let pc = self.registers.program_counter;
        let flow = self.execute(pc, instruction)?;
        self.registers.program_counter = match flow {
            Flow::Next => pc.offset(2),
            Flow::Skip => pc.offset(4),
            Flow::Jump(addr) => Address(addr.0 & ADDRESS_MASK),
        };
        Ok(())
    }

    fn register(&self, reg: &Register) -> u8 {
        self.registers.get(*reg)
    }

    fn set_register(&mut self, reg: &Register, value: u8) {
        self.registers.set(*reg, value);
    }

    /// Sets VF, then stores the result, so a flag written to VF itself is
    /// overwritten by the result.
    fn set_with_flag(&mut self, reg: &Register, value: u8, flag: bool) {
        self.registers.set_vf(flag as u8);
        self.set_register(reg, value);
    }

    fn transfer_count(&self, vx: &Register) -> u16 {
        match self.config.quirks.bulk_transfer {
            BulkTransfer::AllRegisters => REGISTER_COUNT as u16,
            BulkTransfer::ThroughX => (vx.0 & 0x0F) as u16 + 1,
        }
    }

    fn execute(&mut self, pc: Address, instruction: &Instruction) -> Result<Flow, VmError> {
        let flow = match instruction {
            // Jumps
            Instruction::CallSubroutine(addr) => {
                if !self.registers.push(pc.offset(2)) {
                    return Err(VmError::StackOverflow { address: pc.0 });
                }
                debug!(from = pc.0, to = addr.0, depth = self.registers.stack_pointer(), "call");
                Flow::Jump(*addr)
            }
            Instruction::ReturnSubroutine => match self.registers.pop() {
                Some(addr) => {
                    debug!(
                        from = pc.0,
                        to = addr.0,
                        depth = self.registers.stack_pointer(),
                        "return"
                    );
                    Flow::Jump(addr)
                }
                None => return Err(VmError::StackUnderflow { address: pc.0 }),
            },
            Instruction::Jump(addr) => Flow::Jump(*addr),
            Instruction::JumpAdd(addr) => {
                let v0 = self.register(&Register(0)) as u16;
                Flow::Jump(Address(addr.0.wrapping_add(v0)))
            }

            // Conditionals
            Instruction::SkipEqualConst(vx, n) => Flow::skip_if(self.register(vx) == n.0),
            Instruction::SkipNotEqualConst(vx, n) => Flow::skip_if(self.register(vx) != n.0),
            Instruction::SkipEqual(vx, vy) => {
                Flow::skip_if(self.register(vx) == self.register(vy))
            }
            Instruction::SkipNotEqual(vx, vy) => {
                Flow::skip_if(self.register(vx) != self.register(vy))
            }

            // Register Arithmetic
            Instruction::SetConst(vx, n) => {
                self.set_register(vx, n.0);
                Flow::Next
            }
            Instruction::AddConst(vx, n) => {
                let value = self.register(vx).wrapping_add(n.0);
                self.set_register(vx, value);
                Flow::Next
            }
            Instruction::Set(vx, vy) => {
                let value = self.register(vy);
                self.set_register(vx, value);
                Flow::Next
            }
            Instruction::Or(vx, vy) => {
                let value = self.register(vx) | self.register(vy);
                self.set_register(vx, value);
                Flow::Next
            }
            Instruction::And(vx, vy) => {
                let value = self.register(vx) & self.register(vy);
                self.set_register(vx, value);
                Flow::Next
            }
            Instruction::Xor(vx, vy) => {
                let value = self.register(vx) ^ self.register(vy);
                self.set_register(vx, value);
                Flow::Next
            }
            Instruction::Add(vx, vy) => {
                let (value, carry) = self.register(vx).overflowing_add(self.register(vy));
                self.set_with_flag(vx, value, carry);
                Flow::Next
            }
            Instruction::Sub(vx, vy) => {
                let (x, y) = (self.register(vx), self.register(vy));
                self.set_with_flag(vx, x.wrapping_sub(y), x >= y);
                Flow::Next
            }
            Instruction::NegSub(vx, vy) => {
                let (x, y) = (self.register(vx), self.register(vy));
                self.set_with_flag(vx, y.wrapping_sub(x), y >= x);
                Flow::Next
            }
            Instruction::RightShift(vx) => {
                let x = self.register(vx);
                self.set_with_flag(vx, x >> 1, x & 0x01 != 0);
                Flow::Next
            }
            Instruction::LeftShift(vx) => {
                let x = self.register(vx);
                self.set_with_flag(vx, x << 1, x & 0x80 != 0);
                Flow::Next
            }

            // Key presses
            Instruction::SkipKey(vx) => {
                Flow::skip_if(self.keypad.pressed().is_down(self.register(vx)))
            }
            Instruction::SkipNotKey(vx) => {
                Flow::skip_if(!self.keypad.pressed().is_down(self.register(vx)))
            }
            Instruction::WaitKey(vx) => match self.keypad.wait_for_press() {
                Some(key) => {
                    self.set_register(vx, key & 0x0F);
                    Flow::Next
                }
                None => return Err(VmError::InputClosed { address: pc.0 }),
            },

            // Graphics
            Instruction::Draw(vx, vy, n) => {
                let sprite = self.memory.read_range(self.registers.register_i, n.0 as usize);
                let (x, y) = (self.register(vx), self.register(vy));
                let collision = self.display.write(&sprite, x, y);
                self.registers.set_vf(collision as u8);
                Flow::Next
            }
            Instruction::ClearDisplay => {
                self.display.clear();
                Flow::Next
            }
            Instruction::SpriteAddr(vx) => {
                let digit = (self.register(vx) & 0x0F) as u16;
                self.registers.register_i = Address(FONT_OFFSET + digit * FONT_GLYPH_SIZE);
                Flow::Next
            }

            // Timers
            Instruction::GetDelayTimer(vx) => {
                let value = self.registers.delay_timer.0;
                self.set_register(vx, value);
                Flow::Next
            }
            Instruction::SetDelayTimer(vx) => {
                self.registers.delay_timer = Value(self.register(vx));
                Flow::Next
            }
            Instruction::SetSoundTimer(vx) => {
                self.registers.sound_timer = Value(self.register(vx));
                Flow::Next
            }

            // I register
            Instruction::SetI(addr) => {
                self.registers.register_i = *addr;
                Flow::Next
            }
            Instruction::AddToI(vx) => {
                let i = self.registers.register_i.0;
                self.registers.register_i = Address(i.wrapping_add(self.register(vx) as u16));
                Flow::Next
            }
            Instruction::Decimal(vx) => {
                let index = self.registers.register_i;
                let value = self.register(vx);
                self.memory.write(index, value / 100);
                self.memory.write(index.offset(1), value / 10 % 10);
                self.memory.write(index.offset(2), value % 10);
                Flow::Next
            }
            Instruction::StoreRegisters(vx) => {
                let index = self.registers.register_i;
                for i in 0..self.transfer_count(vx) {
                    let value = self.register(&Register(i as u8));
                    self.memory.write(index.offset(i), value);
                }
                Flow::Next
            }
            Instruction::LoadRegisters(vx) => {
                let index = self.registers.register_i;
                for i in 0..self.transfer_count(vx) {
                    let value = self.memory.read(index.offset(i));
                    self.set_register(&Register(i as u8), value);
                }
                Flow::Next
            }

            // Misc
            Instruction::Rand(vx, n) => {
                let value = self.rng.gen::<u8>() & n.0;
                self.set_register(vx, value);
                Flow::Next
            }
            Instruction::MachineCodeRoutine(_) => {
                return Err(VmError::UnsupportedInstruction {
                    opcode: instruction.encode().0,
                    address: pc.0,
                })
            }
        };
        Ok(flow)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::emulator::basics::{PROGRAM_START, STACK_DEPTH};
    use crate::emulator::keypad::Keys;
    use std::collections::VecDeque;

    /// Keys held down and a queue of future presses.
    #[derive(Default)]
    struct ScriptedKeypad {
        down: Keys,
        presses: VecDeque<u8>,
    }

    impl Keypad for ScriptedKeypad {
        fn pressed(&self) -> Keys {
            self.down
        }

        fn wait_for_press(&mut self) -> Option<u8> {
            self.presses.pop_front()
        }
    }

    fn new_vm() -> VirtualMachine {
        VirtualMachine::new(&[], NullKeypad).unwrap()
    }

    fn vm_with(program: &[u8]) -> VirtualMachine {
        VirtualMachine::new(program, NullKeypad).unwrap()
    }

    fn set(vm: &mut VirtualMachine<impl Keypad>, reg: u8, value: u8) {
        vm.execute_instruction(&Instruction::SetConst(Register(reg), Value(value)))
            .unwrap();
    }

    fn reg(vm: &VirtualMachine<impl Keypad>, reg: u8) -> u8 {
        vm.state().registers[reg as usize]
    }

    #[test]
    fn test_vm_new() {
        let vm = new_vm();
        let state = vm.state();
        assert_eq!(state.program_counter, PROGRAM_START);
        assert_eq!(state.stack_pointer, 0);
        assert_eq!(state.registers, [0; REGISTER_COUNT]);
        assert_eq!(state.register_i, 0);
        assert_eq!(state.delay_timer, 0);
        assert_eq!(state.sound_timer, 0);
        assert!(vm.frame().is_blank());
        assert!(!vm.sound_active());
    }

    #[test]
    fn test_vm_rejects_large_program() {
        let program = vec![0; 3585];
        assert!(matches!(
            VirtualMachine::new(&program, NullKeypad),
            Err(VmError::ProgramTooLarge { size: 3585, max: 3584 })
        ));
    }

    #[test]
    fn test_clear_step() {
        let mut vm = vm_with(&[0x00, 0xE0]);
        vm.display.write(&[0xFF], 3, 3);
        vm.step().unwrap();
        assert!(vm.frame().is_blank());
        assert_eq!(vm.program_counter(), 0x202);
    }

    #[test]
    fn test_subroutines() {
        let mut vm = new_vm();
        vm.execute_instruction(&Instruction::CallSubroutine(Address(0x300)))
            .unwrap();
        assert_eq!(vm.program_counter(), 0x300);
        assert_eq!(vm.state().stack_pointer, 1);
        assert_eq!(vm.state().stack[0], 0x202);
        vm.execute_instruction(&Instruction::CallSubroutine(Address(0x456)))
            .unwrap();
        assert_eq!(vm.program_counter(), 0x456);
        assert_eq!(vm.state().stack_pointer, 2);
        vm.execute_instruction(&Instruction::ReturnSubroutine).unwrap();
        assert_eq!(vm.program_counter(), 0x302);
        assert_eq!(vm.state().stack_pointer, 1);
        vm.execute_instruction(&Instruction::ReturnSubroutine).unwrap();
        assert_eq!(vm.program_counter(), 0x202);
        assert_eq!(vm.state().stack_pointer, 0);
    }

    #[test]
    fn test_stack_no_overflow() {
        let mut vm = new_vm();
        let call = Instruction::CallSubroutine(Address(0x200));
        for _ in 0..STACK_DEPTH {
            vm.execute_instruction(&call).unwrap();
        }
        assert_eq!(vm.state().stack_pointer, 16);
    }

    #[test]
    fn test_stack_overflow() {
        let mut vm = new_vm();
        let call = Instruction::CallSubroutine(Address(0x200));
        for _ in 0..STACK_DEPTH {
            vm.execute_instruction(&call).unwrap();
        }
        let before = vm.state();
        assert_eq!(
            vm.execute_instruction(&call),
            Err(VmError::StackOverflow { address: 0x200 })
        );
        assert_eq!(vm.state(), before);
    }

    #[test]
    fn test_stack_empty() {
        let mut vm = new_vm();
        assert_eq!(
            vm.execute_instruction(&Instruction::ReturnSubroutine),
            Err(VmError::StackUnderflow { address: 0x200 })
        );
        assert_eq!(vm.program_counter(), 0x200);
    }

    #[test]
    fn test_jumps() {
        let mut vm = new_vm();
        vm.execute_instruction(&Instruction::Jump(Address(0x345)))
            .unwrap();
        assert_eq!(vm.program_counter(), 0x345);
        set(&mut vm, 0, 0x10);
        vm.execute_instruction(&Instruction::JumpAdd(Address(0x300)))
            .unwrap();
        assert_eq!(vm.program_counter(), 0x310);
        set(&mut vm, 0, 0xFF);
        vm.execute_instruction(&Instruction::JumpAdd(Address(0xFFF)))
            .unwrap();
        assert_eq!(vm.program_counter(), 0x0FE);
    }

    #[test]
    fn test_conditionals() {
        let mut vm = new_vm();
        set(&mut vm, 1, 0x42);
        set(&mut vm, 2, 0x42);
        set(&mut vm, 3, 0x07);
        let pc = vm.program_counter();

        let cases = vec![
            (Instruction::SkipEqualConst(Register(1), Value(0x42)), 4),
            (Instruction::SkipEqualConst(Register(1), Value(0x43)), 2),
            (Instruction::SkipNotEqualConst(Register(1), Value(0x42)), 2),
            (Instruction::SkipNotEqualConst(Register(1), Value(0x43)), 4),
            (Instruction::SkipEqual(Register(1), Register(2)), 4),
            (Instruction::SkipEqual(Register(1), Register(3)), 2),
            (Instruction::SkipNotEqual(Register(1), Register(2)), 2),
            (Instruction::SkipNotEqual(Register(1), Register(3)), 4),
        ];
        for (instruction, advance) in cases {
            vm.registers.program_counter = Address(pc);
            vm.execute_instruction(&instruction).unwrap();
            assert_eq!(vm.program_counter(), pc + advance, "{}", instruction);
        }
    }

    #[test]
    fn test_arithmetic() {
        let mut vm = new_vm();
        set(&mut vm, 1, 0b1100);
        set(&mut vm, 2, 0b1010);
        vm.execute_instruction(&Instruction::Or(Register(1), Register(2)))
            .unwrap();
        assert_eq!(reg(&vm, 1), 0b1110);
        vm.execute_instruction(&Instruction::And(Register(1), Register(2)))
            .unwrap();
        assert_eq!(reg(&vm, 1), 0b1010);
        vm.execute_instruction(&Instruction::Xor(Register(1), Register(2)))
            .unwrap();
        assert_eq!(reg(&vm, 1), 0);
        vm.execute_instruction(&Instruction::Set(Register(3), Register(2)))
            .unwrap();
        assert_eq!(reg(&vm, 3), 0b1010);
    }

    #[test]
    fn test_add_const_keeps_flag() {
        let mut vm = new_vm();
        set(&mut vm, 0xF, 0x05);
        set(&mut vm, 7, 0xF0);
        vm.execute_instruction(&Instruction::AddConst(Register(7), Value(0x20)))
            .unwrap();
        assert_eq!(reg(&vm, 7), 0x10);
        assert_eq!(reg(&vm, 0xF), 0x05);
    }

    #[test]
    fn test_add_carry() {
        let mut vm = new_vm();
        set(&mut vm, 1, 200);
        set(&mut vm, 2, 100);
        vm.execute_instruction(&Instruction::Add(Register(1), Register(2)))
            .unwrap();
        assert_eq!((reg(&vm, 1), reg(&vm, 0xF)), (44, 1));
        vm.execute_instruction(&Instruction::Add(Register(1), Register(2)))
            .unwrap();
        assert_eq!((reg(&vm, 1), reg(&vm, 0xF)), (144, 0));
    }

    #[test]
    fn test_sub_borrow() {
        let mut vm = new_vm();
        set(&mut vm, 1, 10);
        set(&mut vm, 2, 3);
        vm.execute_instruction(&Instruction::Sub(Register(1), Register(2)))
            .unwrap();
        assert_eq!((reg(&vm, 1), reg(&vm, 0xF)), (7, 1));
        vm.execute_instruction(&Instruction::Sub(Register(2), Register(1)))
            .unwrap();
        assert_eq!((reg(&vm, 2), reg(&vm, 0xF)), (252, 0));
        set(&mut vm, 3, 9);
        set(&mut vm, 4, 9);
        vm.execute_instruction(&Instruction::Sub(Register(3), Register(4)))
            .unwrap();
        assert_eq!((reg(&vm, 3), reg(&vm, 0xF)), (0, 1));
    }

    #[test]
    fn test_neg_sub() {
        let mut vm = new_vm();
        set(&mut vm, 1, 3);
        set(&mut vm, 2, 10);
        vm.execute_instruction(&Instruction::NegSub(Register(1), Register(2)))
            .unwrap();
        assert_eq!((reg(&vm, 1), reg(&vm, 0xF)), (7, 1));
        set(&mut vm, 1, 11);
        vm.execute_instruction(&Instruction::NegSub(Register(1), Register(2)))
            .unwrap();
        assert_eq!((reg(&vm, 1), reg(&vm, 0xF)), (255, 0));
    }

    #[test]
    fn test_shifts() {
        let mut vm = new_vm();
        set(&mut vm, 1, 0b0000_0011);
        vm.execute_instruction(&Instruction::RightShift(Register(1)))
            .unwrap();
        assert_eq!((reg(&vm, 1), reg(&vm, 0xF)), (0b0000_0001, 1));
        vm.execute_instruction(&Instruction::RightShift(Register(1)))
            .unwrap();
        vm.execute_instruction(&Instruction::RightShift(Register(1)))
            .unwrap();
        assert_eq!((reg(&vm, 1), reg(&vm, 0xF)), (0, 0));

        set(&mut vm, 2, 0b1000_0001);
        vm.execute_instruction(&Instruction::LeftShift(Register(2)))
            .unwrap();
        assert_eq!((reg(&vm, 2), reg(&vm, 0xF)), (0b0000_0010, 1));
        vm.execute_instruction(&Instruction::LeftShift(Register(2)))
            .unwrap();
        assert_eq!((reg(&vm, 2), reg(&vm, 0xF)), (0b0000_0100, 0));
    }

    #[test]
    fn test_flag_register_as_operand() {
        let mut vm = new_vm();
        set(&mut vm, 0xF, 0xFF);
        set(&mut vm, 1, 0x01);
        vm.execute_instruction(&Instruction::Add(Register(0xF), Register(1)))
            .unwrap();
        assert_eq!(reg(&vm, 0xF), 0x00);
    }

    #[test]
    fn test_draw() {
        let mut vm = new_vm();
        set(&mut vm, 0, 0x0A);
        vm.execute_instruction(&Instruction::SpriteAddr(Register(0)))
            .unwrap();
        assert_eq!(vm.state().register_i, 50);
        set(&mut vm, 1, 60);
        set(&mut vm, 2, 30);
        vm.execute_instruction(&Instruction::Draw(Register(1), Register(2), Value(5)))
            .unwrap();
        assert_eq!(reg(&vm, 0xF), 0);
        let frame = vm.frame();
        // "A" is F0 90 F0 90 90, drawn on rows 30, 31, 0, 1, 2.
        for x in 60..64 {
            assert!(frame.pixel(x, 30));
            assert!(frame.pixel(x, 0));
        }
        assert!(frame.pixel(60, 31));
        assert!(frame.pixel(63, 31));
        assert!(!frame.pixel(61, 31));
        assert!(!frame.pixel(0, 30));
        vm.execute_instruction(&Instruction::Draw(Register(1), Register(2), Value(5)))
            .unwrap();
        assert_eq!(reg(&vm, 0xF), 1);
        assert!(vm.frame().is_blank());
    }

    #[test]
    fn test_draw_zero_rows() {
        let mut vm = new_vm();
        set(&mut vm, 0xF, 1);
        vm.execute_instruction(&Instruction::Draw(Register(0), Register(0), Value(0)))
            .unwrap();
        assert_eq!(reg(&vm, 0xF), 0);
        assert!(vm.frame().is_blank());
    }

    #[test]
    fn test_timers() {
        let mut vm = new_vm();
        set(&mut vm, 3, 2);
        vm.execute_instruction(&Instruction::SetDelayTimer(Register(3)))
            .unwrap();
        vm.execute_instruction(&Instruction::SetSoundTimer(Register(3)))
            .unwrap();
        assert!(vm.sound_active());
        vm.tick_timers();
        vm.execute_instruction(&Instruction::GetDelayTimer(Register(4)))
            .unwrap();
        assert_eq!(reg(&vm, 4), 1);
        vm.tick_timers();
        vm.tick_timers();
        assert_eq!(vm.state().delay_timer, 0);
        assert!(!vm.sound_active());
    }

    #[test]
    fn test_register_i() {
        let mut vm = new_vm();
        vm.execute_instruction(&Instruction::SetI(Address(0x300)))
            .unwrap();
        set(&mut vm, 5, 0x22);
        vm.execute_instruction(&Instruction::AddToI(Register(5)))
            .unwrap();
        assert_eq!(vm.state().register_i, 0x322);
    }

    #[test]
    fn test_decimal() {
        let mut vm = new_vm();
        vm.execute_instruction(&Instruction::SetI(Address(0x400)))
            .unwrap();
        set(&mut vm, 2, 254);
        vm.execute_instruction(&Instruction::Decimal(Register(2)))
            .unwrap();
        assert_eq!(vm.memory().read_range(Address(0x400), 3), vec![2, 5, 4]);
        set(&mut vm, 2, 7);
        vm.execute_instruction(&Instruction::Decimal(Register(2)))
            .unwrap();
        assert_eq!(vm.memory().read_range(Address(0x400), 3), vec![0, 0, 7]);
    }

    #[test]
    fn test_store_and_load_all_registers() {
        let mut vm = new_vm();
        for r in 0..16 {
            set(&mut vm, r, r * 3 + 1);
        }
        vm.execute_instruction(&Instruction::SetI(Address(0x500)))
            .unwrap();
        vm.execute_instruction(&Instruction::StoreRegisters(Register(2)))
            .unwrap();
        let stored = vm.memory().read_range(Address(0x500), 17);
        assert_eq!(stored[15], 46);
        assert_eq!(stored[16], 0);
        for r in 0..16 {
            set(&mut vm, r, 0);
        }
        vm.execute_instruction(&Instruction::LoadRegisters(Register(0)))
            .unwrap();
        for r in 0..16 {
            assert_eq!(reg(&vm, r), r * 3 + 1);
        }
        assert_eq!(vm.state().register_i, 0x500);
    }

    #[test]
    fn test_store_and_load_through_x() {
        let config = Config::default().with_bulk_transfer(BulkTransfer::ThroughX);
        let mut vm = VirtualMachine::with_config(&[], NullKeypad, config).unwrap();
        for r in 0..16 {
            set(&mut vm, r, 0xA0 + r);
        }
        vm.execute_instruction(&Instruction::SetI(Address(0x500)))
            .unwrap();
        vm.execute_instruction(&Instruction::StoreRegisters(Register(2)))
            .unwrap();
        assert_eq!(
            vm.memory().read_range(Address(0x500), 4),
            vec![0xA0, 0xA1, 0xA2, 0]
        );
        vm.execute_instruction(&Instruction::SetI(Address(0x600)))
            .unwrap();
        vm.execute_instruction(&Instruction::LoadRegisters(Register(1)))
            .unwrap();
        assert_eq!((reg(&vm, 0), reg(&vm, 1), reg(&vm, 2)), (0, 0, 0xA2));
    }

    #[test]
    fn test_rand_masks_and_is_seeded() {
        let config = Config::default().with_rng_seed(7);
        let mut a = VirtualMachine::with_config(&[], NullKeypad, config.clone()).unwrap();
        let mut b = VirtualMachine::with_config(&[], NullKeypad, config).unwrap();
        for _ in 0..32 {
            a.execute_instruction(&Instruction::Rand(Register(1), Value(0x0F)))
                .unwrap();
            b.execute_instruction(&Instruction::Rand(Register(1), Value(0x0F)))
                .unwrap();
            assert!(reg(&a, 1) <= 0x0F);
            assert_eq!(reg(&a, 1), reg(&b, 1));
        }
    }

    #[test]
    fn test_keys() {
        let keypad = ScriptedKeypad {
            down: Keys::KEY_5,
            presses: vec![0xC].into_iter().collect(),
        };
        let mut vm = VirtualMachine::new(&[], keypad).unwrap();
        set(&mut vm, 1, 5);
        set(&mut vm, 2, 6);

        let pc = vm.program_counter();
        vm.execute_instruction(&Instruction::SkipKey(Register(1)))
            .unwrap();
        assert_eq!(vm.program_counter(), pc + 4);
        vm.execute_instruction(&Instruction::SkipKey(Register(2)))
            .unwrap();
        assert_eq!(vm.program_counter(), pc + 6);
        vm.execute_instruction(&Instruction::SkipNotKey(Register(1)))
            .unwrap();
        assert_eq!(vm.program_counter(), pc + 8);
        vm.execute_instruction(&Instruction::SkipNotKey(Register(2)))
            .unwrap();
        assert_eq!(vm.program_counter(), pc + 12);

        vm.execute_instruction(&Instruction::WaitKey(Register(3)))
            .unwrap();
        assert_eq!(reg(&vm, 3), 0xC);
        let pc = vm.program_counter();
        assert_eq!(
            vm.execute_instruction(&Instruction::WaitKey(Register(3))),
            Err(VmError::InputClosed { address: pc })
        );
        assert_eq!(vm.program_counter(), pc);
    }

    #[test]
    fn test_unknown_opcode_leaves_state() {
        let mut vm = vm_with(&[0x60, 0x11, 0x80, 0x0F]);
        vm.step().unwrap();
        let (state, frame) = (vm.state(), vm.frame());
        assert_eq!(
            vm.step(),
            Err(VmError::UnknownOpcode {
                opcode: 0x800F,
                address: 0x202
            })
        );
        assert_eq!(vm.state(), state);
        assert_eq!(vm.frame(), frame);
    }

    #[test]
    fn test_machine_code_routine_unsupported() {
        let mut vm = vm_with(&[0x02, 0x34]);
        assert_eq!(
            vm.step(),
            Err(VmError::UnsupportedInstruction {
                opcode: 0x0234,
                address: 0x200
            })
        );
        assert_eq!(vm.program_counter(), 0x200);
    }

    #[test]
    fn test_misaligned_fetch() {
        let mut vm = vm_with(&[0x12, 0x01]);
        vm.step().unwrap();
        assert_eq!(
            vm.step(),
            Err(VmError::MisalignedProgramCounter { address: 0x201 })
        );
    }

    #[test]
    fn test_program_counter_wraps() {
        let mut vm = new_vm();
        vm.execute_instruction(&Instruction::Jump(Address(0xFFE)))
            .unwrap();
        vm.execute_instruction(&Instruction::ClearDisplay).unwrap();
        assert_eq!(vm.program_counter(), 0x000);
    }

    #[test]
    fn test_run_stops_on_error() {
        // LD V0, 1 ; ADD V0, 1 ; RET
        let mut vm = vm_with(&[0x60, 0x01, 0x70, 0x01, 0x00, 0xEE]);
        let stopper = Stopper::new();
        assert_eq!(
            vm.run(&stopper),
            Err(VmError::StackUnderflow { address: 0x204 })
        );
        assert_eq!(reg(&vm, 0), 2);
    }

    #[test]
    fn test_run_checks_stopper_first() {
        let mut vm = vm_with(&[0x60, 0x01]);
        let stopper = Stopper::new();
        stopper.stop();
        assert_eq!(vm.run(&stopper), Ok(()));
        assert_eq!(vm.program_counter(), 0x200);
        assert_eq!(reg(&vm, 0), 0);
    }
}
