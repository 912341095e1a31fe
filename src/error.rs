use thiserror::Error;

/// Failures raised while loading or executing a program.
///
/// A step that fails with any of these leaves the machine exactly as it was
/// before the failing instruction was fetched.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum VmError {
    #[error("program does not fit in memory: {size} > {max} bytes")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("unknown opcode {opcode:#06X} at {address:#05X}")]
    UnknownOpcode { opcode: u16, address: u16 },

    #[error("machine code routine {opcode:#06X} at {address:#05X} is not supported")]
    UnsupportedInstruction { opcode: u16, address: u16 },

    #[error("stack overflow: call at {address:#05X} exceeds 16 nested subroutines")]
    StackOverflow { address: u16 },

    #[error("stack underflow: return at {address:#05X} with an empty call stack")]
    StackUnderflow { address: u16 },

    #[error("program counter {address:#05X} is not aligned to an instruction boundary")]
    MisalignedProgramCounter { address: u16 },

    #[error("input source closed while waiting for a key at {address:#05X}")]
    InputClosed { address: u16 },
}

/// Failures raised while turning assembly text into opcodes.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AsmError {
    #[error("unknown instruction {mnemonic:?}")]
    UnknownInstruction { mnemonic: String },

    #[error("invalid operands for {mnemonic:?}: {operands:?}")]
    InvalidOperands {
        mnemonic: String,
        operands: Vec<String>,
    },

    #[error("invalid register {0:?}")]
    InvalidRegister(String),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("invalid value {0:?}")]
    InvalidValue(String),

    #[error("invalid nibble {0:?}")]
    InvalidNibble(String),

    #[error("{source} on line {line}")]
    Line {
        line: usize,
        #[source]
        source: Box<AsmError>,
    },
}
