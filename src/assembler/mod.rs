//! Assembler turning CHIP-8 mnemonics into opcodes.

pub mod encoder;
pub mod operand;
pub mod source;

pub use encoder::{canonical_mnemonic, encode, mnemonics};
pub use operand::OperandShape;
pub use source::assemble;
