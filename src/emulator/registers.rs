use super::basics::{
    Address, Register, Value, FLAG_REGISTER, PROGRAM_START, REGISTER_COUNT, STACK_DEPTH,
};
use arrayvec::ArrayVec;

/// Read-only copy of the register file, handed out to front ends.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct State {
    pub program_counter: u16,
    pub stack_pointer: u8,
    pub stack: [u16; STACK_DEPTH],
    pub registers: [u8; REGISTER_COUNT],
    pub register_i: u16,
    pub delay_timer: u8,
    pub sound_timer: u8,
}

/// Registers, timers, program counter and the return-address stack.
#[derive(Clone, Debug)]
pub struct RegisterFile {
    pub program_counter: Address,
    pub register_i: Address,
    pub delay_timer: Value,
    pub sound_timer: Value,
    registers: [Value; REGISTER_COUNT],
    stack: ArrayVec<[Address; STACK_DEPTH]>,
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile {
            program_counter: Address(PROGRAM_START),
            register_i: Address(0),
            delay_timer: Value(0),
            sound_timer: Value(0),
            registers: [Value(0); REGISTER_COUNT],
            stack: ArrayVec::new(),
        }
    }

    pub fn get(&self, reg: Register) -> u8 {
        self.registers[(reg.0 & 0x0F) as usize].0
    }

    pub fn set(&mut self, reg: Register, value: u8) {
        self.registers[(reg.0 & 0x0F) as usize] = Value(value);
    }

    /// Sets the VF register to a given value.
    pub fn set_vf(&mut self, value: u8) {
        self.set(FLAG_REGISTER, value);
    }

    pub fn stack_pointer(&self) -> u8 {
        self.stack.len() as u8
    }

    pub fn stack_is_full(&self) -> bool {
        self.stack.is_full()
    }

    /// Pushes a return address. Returns `false` without touching the stack if it is full.
    pub fn push(&mut self, addr: Address) -> bool {
        self.stack.try_push(addr).is_ok()
    }

    pub fn pop(&mut self) -> Option<Address> {
        self.stack.pop()
    }

    /// Decrements both timers by one tick, stopping at zero.
    pub fn tick_timers(&mut self) {
        self.delay_timer.0 = self.delay_timer.0.saturating_sub(1);
        self.sound_timer.0 = self.sound_timer.0.saturating_sub(1);
    }

    pub fn state(&self) -> State {
        let mut stack = [0; STACK_DEPTH];
        for (slot, addr) in stack.iter_mut().zip(self.stack.iter()) {
            *slot = addr.0;
        }
        let mut registers = [0; REGISTER_COUNT];
        for (slot, value) in registers.iter_mut().zip(self.registers.iter()) {
            *slot = value.0;
        }
        State {
            program_counter: self.program_counter.0,
            stack_pointer: self.stack_pointer(),
            stack,
            registers,
            register_i: self.register_i.0,
            delay_timer: self.delay_timer.0,
            sound_timer: self.sound_timer.0,
        }
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        RegisterFile::new()
    }
}
