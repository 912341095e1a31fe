use super::basics::{SCREEN_HEIGHT, SCREEN_WIDTH};
use std::fmt;

const ROW_BYTES: usize = SCREEN_WIDTH as usize / 8;
pub const DISPLAY_BYTES: usize = ROW_BYTES * SCREEN_HEIGHT as usize;

/// 64x32 monochrome bitmap, one bit per pixel, eight bytes per row.
/// The most significant bit of a byte is its leftmost pixel.
#[derive(Clone)]
pub struct Display {
    buffer: [u8; DISPLAY_BYTES],
}

impl Display {
    pub fn new() -> Display {
        Display {
            buffer: [0; DISPLAY_BYTES],
        }
    }

    pub fn clear(&mut self) {
        self.buffer = [0; DISPLAY_BYTES];
    }

    /// XORs a sprite into the buffer with its top-left pixel at (x, y).
    /// Rows and columns wrap around the screen edges. Returns whether any
    /// pixel that was set got cleared.
    pub fn write(&mut self, sprite: &[u8], x: u8, y: u8) -> bool {
        let x = x as usize % SCREEN_WIDTH as usize;
        let y = y as usize % SCREEN_HEIGHT as usize;
        let column = x / 8;
        let shift = x % 8;

        let mut collision = false;
        for (i, &byte) in sprite.iter().enumerate() {
            let row = (y + i) % SCREEN_HEIGHT as usize * ROW_BYTES;
            collision |= self.xor(row + column, byte >> shift);
            if shift != 0 {
                let wrapped = (column + 1) % ROW_BYTES;
                collision |= self.xor(row + wrapped, byte << (8 - shift));
            }
        }
        collision
    }

    fn xor(&mut self, index: usize, bits: u8) -> bool {
        let cell = &mut self.buffer[index];
        let collision = *cell & bits != 0;
        *cell ^= bits;
        collision
    }

    pub fn snapshot(&self) -> Frame {
        Frame(self.buffer)
    }
}

impl Default for Display {
    fn default() -> Self {
        Display::new()
    }
}

/// Immutable copy of the display buffer.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Frame(pub [u8; DISPLAY_BYTES]);

impl Frame {
    pub fn pixel(&self, x: u8, y: u8) -> bool {
        let x = x as usize % SCREEN_WIDTH as usize;
        let y = y as usize % SCREEN_HEIGHT as usize;
        self.0[y * ROW_BYTES + x / 8] & (0x80 >> (x % 8)) != 0
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(\n{})", self)
    }
}

/// ASCII art, `@` for a lit pixel, one text line per row.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                f.write_str(if self.pixel(x, y) { "@" } else { " " })?;
            }
            if y + 1 < SCREEN_HEIGHT {
                f.write_str("\n")?;
            }
        }
        Ok(())
    }
}
