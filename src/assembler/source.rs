use super::encoder::encode;
use crate::error::AsmError;
use tracing::debug;

/// Strips a `;` comment and surrounding whitespace.
pub fn remove_comments(line: &str) -> &str {
    match line.find(';') {
        Some(i) => line[..i].trim(),
        None => line.trim(),
    }
}

/// Splits a comment-free line into its uppercase mnemonic and operands.
///
/// Lines look like `<ins> <op>(, <op>)*`; extra whitespace is ignored.
pub fn parse_line(line: &str) -> (String, Vec<String>) {
    let line = line.trim();
    let (instruction, rest) = match line.find(char::is_whitespace) {
        Some(i) => (&line[..i], line[i..].trim()),
        None => (line, ""),
    };

    let operands = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',')
            .map(|operand| operand.trim().to_uppercase())
            .collect()
    };

    (instruction.to_uppercase(), operands)
}

/// Assembles a whole source text into a flat byte stream, two bytes per
/// instruction line. Errors carry the 1-based line number.
pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
    let mut bytes = Vec::new();
    for (index, original_line) in source.lines().enumerate() {
        let line = remove_comments(original_line);
        if line.is_empty() {
            continue;
        }
        let (instruction, operands) = parse_line(line);
        let opcode = encode(&instruction, &operands[..]).map_err(|err| AsmError::Line {
            line: index + 1,
            source: Box::new(err),
        })?;
        bytes.extend_from_slice(&opcode);
    }
    debug!(size = bytes.len(), "assembled");
    Ok(bytes)
}
