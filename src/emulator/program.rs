use super::basics::{Address, Register, Value, PROGRAM_START};
use std::fmt;

/// A raw big-endian 16 bit instruction word and its fixed fields.
///
/// ```text
///        | 15..12 | 11..8 | 7..4 | 3..0 |
/// class  |   c    |       |      |      |
/// x      |        |   x   |      |      |
/// y      |        |       |  y   |      |
/// n      |        |       |      |  n   |
/// kk     |        |       |  k   |  k   |
/// nnn    |        |   n   |  n   |  n   |
/// ```
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Opcode(pub u16);

impl Opcode {
    pub fn from_bytes(hi: u8, lo: u8) -> Opcode {
        Opcode(u16::from_be_bytes([hi, lo]))
    }

    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub fn class(self) -> u8 {
        (self.0 >> 12) as u8
    }

    pub fn x(self) -> u8 {
        (self.0 >> 8) as u8 & 0x0F
    }

    pub fn y(self) -> u8 {
        (self.0 >> 4) as u8 & 0x0F
    }

    pub fn n(self) -> u8 {
        self.0 as u8 & 0x0F
    }

    pub fn kk(self) -> u8 {
        self.0 as u8
    }

    pub fn nnn(self) -> u16 {
        self.0 & 0x0FFF
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Instruction {
    MachineCodeRoutine(Address),
    ClearDisplay,
    ReturnSubroutine,
    Jump(Address),
    CallSubroutine(Address),
    SkipEqualConst(Register, Value),
    SkipNotEqualConst(Register, Value),
    SkipEqual(Register, Register),
    SetConst(Register, Value),
    AddConst(Register, Value),
    Set(Register, Register),
    Or(Register, Register),
    And(Register, Register),
    Xor(Register, Register),
    Add(Register, Register),
    Sub(Register, Register),
    RightShift(Register),
    NegSub(Register, Register),
    LeftShift(Register),
    SkipNotEqual(Register, Register),
    SetI(Address),
    JumpAdd(Address),
    Rand(Register, Value),
    Draw(Register, Register, Value),
    SkipKey(Register),
    SkipNotKey(Register),
    GetDelayTimer(Register),
    WaitKey(Register),
    SetDelayTimer(Register),
    SetSoundTimer(Register),
    AddToI(Register),
    SpriteAddr(Register),
    Decimal(Register),
    StoreRegisters(Register),
    LoadRegisters(Register),
}

macro_rules! NNN {
    ($op:expr) => {
        Address($op.nnn())
    };
}

macro_rules! KK {
    ($op:expr) => {
        Value($op.kk())
    };
}

macro_rules! N {
    ($op:expr) => {
        Value($op.n())
    };
}

macro_rules! X {
    ($op:expr) => {
        Register($op.x())
    };
}

macro_rules! Y {
    ($op:expr) => {
        Register($op.y())
    };
}

impl Instruction {
    pub fn from_16bit(a: u8, b: u8) -> Option<Instruction> {
        Instruction::decode(Opcode::from_bytes(a, b))
    }

    /// Decodes an opcode, `None` if it matches no instruction.
    pub fn decode(op: Opcode) -> Option<Instruction> {
        let nibbles = (op.class(), op.x(), op.y(), op.n());
        let instruction = match nibbles {
            (0x0, 0x0, 0xE, 0x0) => Instruction::ClearDisplay,
            (0x0, 0x0, 0xE, 0xE) => Instruction::ReturnSubroutine,
            (0x0, _, _, _) => Instruction::MachineCodeRoutine(NNN!(op)),
            (0x1, _, _, _) => Instruction::Jump(NNN!(op)),
            (0x2, _, _, _) => Instruction::CallSubroutine(NNN!(op)),
            (0x3, _, _, _) => Instruction::SkipEqualConst(X!(op), KK!(op)),
            (0x4, _, _, _) => Instruction::SkipNotEqualConst(X!(op), KK!(op)),
            (0x5, _, _, 0x0) => Instruction::SkipEqual(X!(op), Y!(op)),
            (0x6, _, _, _) => Instruction::SetConst(X!(op), KK!(op)),
            (0x7, _, _, _) => Instruction::AddConst(X!(op), KK!(op)),
            (0x8, _, _, 0x0) => Instruction::Set(X!(op), Y!(op)),
            (0x8, _, _, 0x1) => Instruction::Or(X!(op), Y!(op)),
            (0x8, _, _, 0x2) => Instruction::And(X!(op), Y!(op)),
            (0x8, _, _, 0x3) => Instruction::Xor(X!(op), Y!(op)),
            (0x8, _, _, 0x4) => Instruction::Add(X!(op), Y!(op)),
            (0x8, _, _, 0x5) => Instruction::Sub(X!(op), Y!(op)),
            (0x8, _, _, 0x6) => Instruction::RightShift(X!(op)),
            (0x8, _, _, 0x7) => Instruction::NegSub(X!(op), Y!(op)),
            (0x8, _, _, 0xE) => Instruction::LeftShift(X!(op)),
            (0x9, _, _, 0x0) => Instruction::SkipNotEqual(X!(op), Y!(op)),
            (0xA, _, _, _) => Instruction::SetI(NNN!(op)),
            (0xB, _, _, _) => Instruction::JumpAdd(NNN!(op)),
            (0xC, _, _, _) => Instruction::Rand(X!(op), KK!(op)),
            (0xD, _, _, _) => Instruction::Draw(X!(op), Y!(op), N!(op)),
            (0xE, _, 0x9, 0xE) => Instruction::SkipKey(X!(op)),
            (0xE, _, 0xA, 0x1) => Instruction::SkipNotKey(X!(op)),
            (0xF, _, 0x0, 0x7) => Instruction::GetDelayTimer(X!(op)),
            (0xF, _, 0x0, 0xA) => Instruction::WaitKey(X!(op)),
            (0xF, _, 0x1, 0x5) => Instruction::SetDelayTimer(X!(op)),
            (0xF, _, 0x1, 0x8) => Instruction::SetSoundTimer(X!(op)),
            (0xF, _, 0x1, 0xE) => Instruction::AddToI(X!(op)),
            (0xF, _, 0x2, 0x9) => Instruction::SpriteAddr(X!(op)),
            (0xF, _, 0x3, 0x3) => Instruction::Decimal(X!(op)),
            (0xF, _, 0x5, 0x5) => Instruction::StoreRegisters(X!(op)),
            (0xF, _, 0x6, 0x5) => Instruction::LoadRegisters(X!(op)),
            _ => return None,
        };
        Some(instruction)
    }

    /// The opcode this instruction decodes from. Shift instructions encode
    /// y as zero.
    pub fn encode(&self) -> Opcode {
        fn addr(class: u16, a: &Address) -> u16 {
            class << 12 | (a.0 & 0x0FFF)
        }
        fn reg_byte(class: u16, x: &Register, v: &Value) -> u16 {
            class << 12 | (x.0 as u16 & 0xF) << 8 | v.0 as u16
        }
        fn regs(class: u16, x: &Register, y: &Register, n: u16) -> u16 {
            class << 12 | (x.0 as u16 & 0xF) << 8 | (y.0 as u16 & 0xF) << 4 | (n & 0xF)
        }
        fn reg_suffix(class: u16, x: &Register, suffix: u16) -> u16 {
            class << 12 | (x.0 as u16 & 0xF) << 8 | suffix
        }

        let word = match self {
            Instruction::MachineCodeRoutine(a) => addr(0x0, a),
            Instruction::ClearDisplay => 0x00E0,
            Instruction::ReturnSubroutine => 0x00EE,
            Instruction::Jump(a) => addr(0x1, a),
            Instruction::CallSubroutine(a) => addr(0x2, a),
            Instruction::SkipEqualConst(x, v) => reg_byte(0x3, x, v),
            Instruction::SkipNotEqualConst(x, v) => reg_byte(0x4, x, v),
            Instruction::SkipEqual(x, y) => regs(0x5, x, y, 0x0),
            Instruction::SetConst(x, v) => reg_byte(0x6, x, v),
            Instruction::AddConst(x, v) => reg_byte(0x7, x, v),
            Instruction::Set(x, y) => regs(0x8, x, y, 0x0),
            Instruction::Or(x, y) => regs(0x8, x, y, 0x1),
            Instruction::And(x, y) => regs(0x8, x, y, 0x2),
            Instruction::Xor(x, y) => regs(0x8, x, y, 0x3),
            Instruction::Add(x, y) => regs(0x8, x, y, 0x4),
            Instruction::Sub(x, y) => regs(0x8, x, y, 0x5),
            Instruction::RightShift(x) => reg_suffix(0x8, x, 0x06),
            Instruction::NegSub(x, y) => regs(0x8, x, y, 0x7),
            Instruction::LeftShift(x) => reg_suffix(0x8, x, 0x0E),
            Instruction::SkipNotEqual(x, y) => regs(0x9, x, y, 0x0),
            Instruction::SetI(a) => addr(0xA, a),
            Instruction::JumpAdd(a) => addr(0xB, a),
            Instruction::Rand(x, v) => reg_byte(0xC, x, v),
            Instruction::Draw(x, y, n) => regs(0xD, x, y, n.0 as u16),
            Instruction::SkipKey(x) => reg_suffix(0xE, x, 0x9E),
            Instruction::SkipNotKey(x) => reg_suffix(0xE, x, 0xA1),
            Instruction::GetDelayTimer(x) => reg_suffix(0xF, x, 0x07),
            Instruction::WaitKey(x) => reg_suffix(0xF, x, 0x0A),
            Instruction::SetDelayTimer(x) => reg_suffix(0xF, x, 0x15),
            Instruction::SetSoundTimer(x) => reg_suffix(0xF, x, 0x18),
            Instruction::AddToI(x) => reg_suffix(0xF, x, 0x1E),
            Instruction::SpriteAddr(x) => reg_suffix(0xF, x, 0x29),
            Instruction::Decimal(x) => reg_suffix(0xF, x, 0x33),
            Instruction::StoreRegisters(x) => reg_suffix(0xF, x, 0x55),
            Instruction::LoadRegisters(x) => reg_suffix(0xF, x, 0x65),
        };
        Opcode(word)
    }
}

/// Canonical assembly text, accepted back by the assembler.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::MachineCodeRoutine(a) => write!(f, "SYS 0X{:03X}", a.0),
            Instruction::ClearDisplay => write!(f, "CLS"),
            Instruction::ReturnSubroutine => write!(f, "RET"),
            Instruction::Jump(a) => write!(f, "JP 0X{:03X}", a.0),
            Instruction::CallSubroutine(a) => write!(f, "CALL 0X{:03X}", a.0),
            Instruction::SkipEqualConst(x, v) => write!(f, "SE V{:X}, 0X{:02X}", x.0, v.0),
            Instruction::SkipNotEqualConst(x, v) => write!(f, "SNE V{:X}, 0X{:02X}", x.0, v.0),
            Instruction::SkipEqual(x, y) => write!(f, "SE V{:X}, V{:X}", x.0, y.0),
            Instruction::SetConst(x, v) => write!(f, "LD V{:X}, 0X{:02X}", x.0, v.0),
            Instruction::AddConst(x, v) => write!(f, "ADD V{:X}, 0X{:02X}", x.0, v.0),
            Instruction::Set(x, y) => write!(f, "LD V{:X}, V{:X}", x.0, y.0),
            Instruction::Or(x, y) => write!(f, "OR V{:X}, V{:X}", x.0, y.0),
            Instruction::And(x, y) => write!(f, "AND V{:X}, V{:X}", x.0, y.0),
            Instruction::Xor(x, y) => write!(f, "XOR V{:X}, V{:X}", x.0, y.0),
            Instruction::Add(x, y) => write!(f, "ADD V{:X}, V{:X}", x.0, y.0),
            Instruction::Sub(x, y) => write!(f, "SUB V{:X}, V{:X}", x.0, y.0),
            Instruction::RightShift(x) => write!(f, "SHR V{:X}", x.0),
            Instruction::NegSub(x, y) => write!(f, "SUBN V{:X}, V{:X}", x.0, y.0),
            Instruction::LeftShift(x) => write!(f, "SHL V{:X}", x.0),
            Instruction::SkipNotEqual(x, y) => write!(f, "SNE V{:X}, V{:X}", x.0, y.0),
            Instruction::SetI(a) => write!(f, "LD I, 0X{:03X}", a.0),
            Instruction::JumpAdd(a) => write!(f, "JP V0, 0X{:03X}", a.0),
            Instruction::Rand(x, v) => write!(f, "RND V{:X}, 0X{:02X}", x.0, v.0),
            Instruction::Draw(x, y, n) => write!(f, "DRW V{:X}, V{:X}, 0X{:X}", x.0, y.0, n.0),
            Instruction::SkipKey(x) => write!(f, "SKP V{:X}", x.0),
            Instruction::SkipNotKey(x) => write!(f, "SKNP V{:X}", x.0),
            Instruction::GetDelayTimer(x) => write!(f, "LD V{:X}, DT", x.0),
            Instruction::WaitKey(x) => write!(f, "LD V{:X}, KEY", x.0),
            Instruction::SetDelayTimer(x) => write!(f, "LD DT, V{:X}", x.0),
            Instruction::SetSoundTimer(x) => write!(f, "LD ST, V{:X}", x.0),
            Instruction::AddToI(x) => write!(f, "ADD I, V{:X}", x.0),
            Instruction::SpriteAddr(x) => write!(f, "LD FONT, V{:X}", x.0),
            Instruction::Decimal(x) => write!(f, "LD BCD, V{:X}", x.0),
            Instruction::StoreRegisters(x) => write!(f, "LD I, V{:X}", x.0),
            Instruction::LoadRegisters(x) => write!(f, "LD V{:X}, I", x.0),
        }
    }
}

/// Lists a byte stream as `address: bytes  assembly` lines, assuming it is
/// loaded at `PROGRAM_START`. A trailing odd byte is listed as data.
pub fn disassemble(bytes: &[u8]) -> Vec<String> {
    let mut lines = Vec::with_capacity(bytes.len() / 2 + 1);
    let mut address = PROGRAM_START;
    for chunk in bytes.chunks(2) {
        let line = if let [hi, lo] = *chunk {
            match Instruction::from_16bit(hi, lo) {
                Some(instruction) => {
                    format!("{:03X}: {:02X} {:02X}  {}", address, hi, lo, instruction)
                }
                None => format!("{:03X}: {:02X} {:02X}  ???", address, hi, lo),
            }
        } else {
            format!("{:03X}: {:02X}     ???", address, chunk[0])
        };
        lines.push(line);
        address = address.wrapping_add(2);
    }
    lines
}
