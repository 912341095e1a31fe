use super::operand::{self, classify, OperandShape};
use crate::error::AsmError;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Builds the opcode of one operand pattern. `prefix` is the class nibble,
/// `suffix` fills the low bits left free by the operands.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Encoder {
    /// A fully specified opcode.
    Fixed(u16),
    /// `Pnnn`, the address taken from operand `index`.
    Address { prefix: u8, index: usize },
    /// `Pnnn` written as `V0, nnn`.
    OffsetAddress { prefix: u8 },
    /// `PxKK`
    RegisterByte { prefix: u8 },
    /// `PxyS`
    TwoRegister { prefix: u8, suffix: u8 },
    /// `PxSS`, the register taken from operand `index`.
    OneRegister { prefix: u8, suffix: u8, index: usize },
    /// `Pxyn`
    TwoRegisterNibble { prefix: u8 },
}

impl Encoder {
    fn encode(&self, mnemonic: &str, operands: &[String]) -> Result<u16, AsmError> {
        let class = |prefix: &u8| (*prefix as u16 & 0xF) << 12;
        let word = match self {
            Encoder::Fixed(word) => *word,
            Encoder::Address { prefix, index } => {
                class(prefix) | operand::address(&operands[*index])?.0
            }
            Encoder::OffsetAddress { prefix } => {
                if operand::register(&operands[0])?.0 != 0 {
                    return Err(AsmError::InvalidOperands {
                        mnemonic: mnemonic.to_string(),
                        operands: operands.to_vec(),
                    });
                }
                class(prefix) | operand::address(&operands[1])?.0
            }
            Encoder::RegisterByte { prefix } => {
                let x = operand::register(&operands[0])?;
                let kk = operand::value(&operands[1])?;
                class(prefix) | (x.0 as u16) << 8 | kk.0 as u16
            }
            Encoder::TwoRegister { prefix, suffix } => {
                let x = operand::register(&operands[0])?;
                let y = operand::register(&operands[1])?;
                class(prefix) | (x.0 as u16) << 8 | (y.0 as u16) << 4 | (*suffix as u16 & 0xF)
            }
            Encoder::OneRegister {
                prefix,
                suffix,
                index,
            } => {
                let x = operand::register(&operands[*index])?;
                class(prefix) | (x.0 as u16) << 8 | *suffix as u16
            }
            Encoder::TwoRegisterNibble { prefix } => {
                let x = operand::register(&operands[0])?;
                let y = operand::register(&operands[1])?;
                let n = operand::nibble(&operands[2])?;
                class(prefix) | (x.0 as u16) << 8 | (y.0 as u16) << 4 | n.0 as u16
            }
        };
        Ok(word)
    }
}

/// One accepted operand pattern of a mnemonic.
#[derive(Clone, Copy, Debug)]
struct Encoding {
    operands: &'static [OperandShape],
    encoder: Encoder,
}

use OperandShape::*;

fn fixed(word: u16) -> Encoding {
    Encoding {
        operands: &[],
        encoder: Encoder::Fixed(word),
    }
}

fn address_encoding(prefix: u8) -> Encoding {
    Encoding {
        operands: &[Address],
        encoder: Encoder::Address { prefix, index: 0 },
    }
}

fn register_byte_encoding(prefix: u8) -> Encoding {
    Encoding {
        operands: &[Register, Byte],
        encoder: Encoder::RegisterByte { prefix },
    }
}

fn two_register_encoding(prefix: u8, suffix: u8) -> Encoding {
    Encoding {
        operands: &[Register, Register],
        encoder: Encoder::TwoRegister { prefix, suffix },
    }
}

fn one_register_encoding(prefix: u8, suffix: u8) -> Encoding {
    Encoding {
        operands: &[Register],
        encoder: Encoder::OneRegister {
            prefix,
            suffix,
            index: 0,
        },
    }
}

/// A register in operand `index` next to a keyword operand.
fn keyword_encoding(operands: &'static [OperandShape], suffix: u8, index: usize) -> Encoding {
    Encoding {
        operands,
        encoder: Encoder::OneRegister {
            prefix: 0xF,
            suffix,
            index,
        },
    }
}

lazy_static! {
    static ref ALIASES: HashMap<&'static str, &'static str> = vec![
        ("CLEAR", "CLS"),
        ("RETURN", "RET"),
        ("JUMP", "JP"),
        ("JMP", "JP"),
        ("SKIP", "SE"),
        ("SKIPN", "SNE"),
        ("LOAD", "LD"),
        ("SHIFTR", "SHR"),
        ("SHIFTL", "SHL"),
        ("RAND", "RND"),
        ("DRAW", "DRW"),
        ("SKIPP", "SKP"),
        ("SKIPNP", "SKNP"),
    ]
    .into_iter()
    .collect();

    /// Candidate encodings per canonical mnemonic, tried in order.
    static ref INSTRUCTIONS: HashMap<&'static str, Vec<Encoding>> = vec![
        ("SYS", vec![address_encoding(0x0)]),
        ("CLS", vec![fixed(0x00E0)]),
        ("RET", vec![fixed(0x00EE)]),
        ("JP", vec![
            address_encoding(0x1),
            Encoding {
                operands: &[Register, Address],
                encoder: Encoder::OffsetAddress { prefix: 0xB },
            },
        ]),
        ("CALL", vec![address_encoding(0x2)]),
        ("SE", vec![register_byte_encoding(0x3), two_register_encoding(0x5, 0x0)]),
        ("SNE", vec![register_byte_encoding(0x4), two_register_encoding(0x9, 0x0)]),
        ("LD", vec![
            register_byte_encoding(0x6),
            two_register_encoding(0x8, 0x0),
            Encoding {
                operands: &[AddressRegister, Address],
                encoder: Encoder::Address {
                    prefix: 0xA,
                    index: 1,
                },
            },
            keyword_encoding(&[Register, DelayTimer], 0x07, 0),
            keyword_encoding(&[Register, Keypress], 0x0A, 0),
            keyword_encoding(&[DelayTimer, Register], 0x15, 1),
            keyword_encoding(&[SoundTimer, Register], 0x18, 1),
            keyword_encoding(&[Font, Register], 0x29, 1),
            keyword_encoding(&[Bcd, Register], 0x33, 1),
            keyword_encoding(&[AddressRegister, Register], 0x55, 1),
            keyword_encoding(&[Register, AddressRegister], 0x65, 0),
        ]),
        ("ADD", vec![
            register_byte_encoding(0x7),
            two_register_encoding(0x8, 0x4),
            keyword_encoding(&[AddressRegister, Register], 0x1E, 1),
        ]),
        ("OR", vec![two_register_encoding(0x8, 0x1)]),
        ("AND", vec![two_register_encoding(0x8, 0x2)]),
        ("XOR", vec![two_register_encoding(0x8, 0x3)]),
        ("SUB", vec![two_register_encoding(0x8, 0x5)]),
        ("SHR", vec![one_register_encoding(0x8, 0x06)]),
        ("SUBN", vec![two_register_encoding(0x8, 0x7)]),
        ("SHL", vec![one_register_encoding(0x8, 0x0E)]),
        ("RND", vec![register_byte_encoding(0xC)]),
        ("DRW", vec![Encoding {
            operands: &[Register, Register, Byte],
            encoder: Encoder::TwoRegisterNibble { prefix: 0xD },
        }]),
        ("SKP", vec![one_register_encoding(0xE, 0x9E)]),
        ("SKNP", vec![one_register_encoding(0xE, 0xA1)]),
    ]
    .into_iter()
    .collect();
}

/// Maps a mnemonic (any case, aliases allowed) to its canonical name.
pub fn canonical_mnemonic(mnemonic: &str) -> String {
    let upper = mnemonic.trim().to_uppercase();
    match ALIASES.get(upper.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => upper,
    }
}

/// All canonical mnemonics the assembler knows.
pub fn mnemonics() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = INSTRUCTIONS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Encodes one instruction into its two opcode bytes.
///
/// The operand shapes are matched against the mnemonic's encodings in
/// declaration order and the first exact match is used.
pub fn encode<S: AsRef<str>>(mnemonic: &str, operands: &[S]) -> Result<[u8; 2], AsmError> {
    let canonical = canonical_mnemonic(mnemonic);
    let encodings = INSTRUCTIONS
        .get(canonical.as_str())
        .ok_or_else(|| AsmError::UnknownInstruction {
            mnemonic: mnemonic.trim().to_uppercase(),
        })?;

    let operands: Vec<String> = operands
        .iter()
        .map(|o| o.as_ref().trim().to_uppercase())
        .collect();
    let shapes: Vec<OperandShape> = operands.iter().map(|o| classify(o)).collect();

    let encoding = encodings
        .iter()
        .find(|e| e.operands == shapes.as_slice())
        .ok_or_else(|| AsmError::InvalidOperands {
            mnemonic: mnemonic.trim().to_uppercase(),
            operands: operands.clone(),
        })?;

    let word = encoding.encoder.encode(&canonical, &operands)?;
    Ok(word.to_be_bytes())
}
