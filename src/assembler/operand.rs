use crate::emulator::basics::{Address, Register, Value, ADDRESS_MASK};
use crate::error::AsmError;

/// Lexical class of an operand token, used to pick an encoding.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum OperandShape {
    Register,
    Byte,
    Address,
    AddressRegister,
    DelayTimer,
    SoundTimer,
    Keypress,
    Bcd,
    Font,
}

/// Classifies an uppercase, trimmed operand token.
///
/// `V` followed by a hex digit is a register, the keywords name special
/// operands, exactly three hex digits (after an optional `0X`) are an
/// address and anything else is treated as a byte.
pub fn classify(token: &str) -> OperandShape {
    let mut chars = token.chars();
    if chars.next() == Some('V') && chars.next().map_or(false, |c| c.is_ascii_hexdigit()) {
        return OperandShape::Register;
    }

    match token {
        "I" => return OperandShape::AddressRegister,
        "DT" => return OperandShape::DelayTimer,
        "ST" => return OperandShape::SoundTimer,
        "K" | "KEY" => return OperandShape::Keypress,
        "BCD" => return OperandShape::Bcd,
        "FONT" => return OperandShape::Font,
        _ => {}
    }

    let digits = strip_hex_prefix(token);
    if digits.len() == 3 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        OperandShape::Address
    } else {
        OperandShape::Byte
    }
}

fn strip_hex_prefix(token: &str) -> &str {
    if token.starts_with("0X") {
        &token[2..]
    } else {
        token
    }
}

/// Parses bare hex digits with an optional `0X` prefix.
fn hex(token: &str) -> Option<u32> {
    let digits = strip_hex_prefix(token);
    if digits.is_empty() || digits.len() > 8 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Reads a register operand such as `VA`. Fails above VF.
pub fn register(token: &str) -> Result<Register, AsmError> {
    let index = if token.starts_with('V') {
        hex(&token[1..]).filter(|n| !token[1..].starts_with("0X") && *n <= 0xF)
    } else {
        None
    };
    index
        .map(|n| Register(n as u8))
        .ok_or_else(|| AsmError::InvalidRegister(token.to_string()))
}

/// Reads an immediate byte.
pub fn value(token: &str) -> Result<Value, AsmError> {
    match hex(token) {
        Some(n) if n <= 0xFF => Ok(Value(n as u8)),
        _ => Err(AsmError::InvalidValue(token.to_string())),
    }
}

/// Reads the 4 bit row count of a draw.
pub fn nibble(token: &str) -> Result<Value, AsmError> {
    match hex(token) {
        Some(n) if n <= 0xF => Ok(Value(n as u8)),
        Some(_) => Err(AsmError::InvalidNibble(token.to_string())),
        None => Err(AsmError::InvalidValue(token.to_string())),
    }
}

/// Reads a 12 bit address.
pub fn address(token: &str) -> Result<Address, AsmError> {
    match hex(token) {
        Some(n) if n <= ADDRESS_MASK as u32 => Ok(Address(n as u16)),
        _ => Err(AsmError::InvalidAddress(token.to_string())),
    }
}
