use super::basics::{
    Address, ADDRESS_MASK, FONT_OFFSET, MAX_PROGRAM_SIZE, MEMORY_SIZE, PROGRAM_START,
};
use crate::error::VmError;
use tracing::debug;

const FONT_SPRITES: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// The 4 KiB address space with the hex font preloaded at `FONT_OFFSET`.
///
/// Every access masks its address to 12 bits, so reads and writes past the
/// end wrap around to the start instead of going out of bounds.
#[derive(Clone)]
pub struct Memory {
    cells: [u8; MEMORY_SIZE],
}

impl Memory {
    pub fn new() -> Memory {
        let mut cells = [0; MEMORY_SIZE];
        for (cell, font_byte) in cells
            .iter_mut()
            .skip(FONT_OFFSET as usize)
            .zip(FONT_SPRITES.iter())
        {
            *cell = *font_byte;
        }
        Memory { cells }
    }

    /// Creates memory holding `program` at `PROGRAM_START`.
    pub fn with_program(program: &[u8]) -> Result<Memory, VmError> {
        if program.len() > MAX_PROGRAM_SIZE {
            return Err(VmError::ProgramTooLarge {
                size: program.len(),
                max: MAX_PROGRAM_SIZE,
            });
        }
        let mut memory = Memory::new();
        let start = PROGRAM_START as usize;
        memory.cells[start..start + program.len()].copy_from_slice(program);
        debug!(size = program.len(), "program loaded");
        Ok(memory)
    }

    pub fn read(&self, addr: Address) -> u8 {
        self.cells[(addr.0 & ADDRESS_MASK) as usize]
    }

    pub fn write(&mut self, addr: Address, value: u8) {
        self.cells[(addr.0 & ADDRESS_MASK) as usize] = value;
    }

    /// Copies `len` bytes starting at `addr`, wrapping at the end of memory.
    pub fn read_range(&self, addr: Address, len: usize) -> Vec<u8> {
        (0..len as u16).map(|i| self.read(addr.offset(i))).collect()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}
