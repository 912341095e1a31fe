pub const MEMORY_SIZE: usize = 4096;
pub const PROGRAM_START: u16 = 0x200;
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;
pub const ADDRESS_MASK: u16 = 0x0FFF;
pub const SCREEN_WIDTH: u8 = 64;
pub const SCREEN_HEIGHT: u8 = 32;
pub const FONT_OFFSET: u16 = 0;
pub const FONT_GLYPH_SIZE: u16 = 5;
pub const STACK_DEPTH: usize = 16;
pub const REGISTER_COUNT: usize = 16;
pub const FLAG_REGISTER: Register = Register(0xF);

/// A 12 bit memory address.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Address(pub u16);

impl Address {
    /// Address `offset` bytes further, wrapped into the 12 bit space.
    pub fn offset(self, offset: u16) -> Address {
        Address(self.0.wrapping_add(offset) & ADDRESS_MASK)
    }
}

/// Index of one of the general purpose registers V0..VF.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Register(pub u8);

/// An immediate byte or nibble.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Value(pub u8);
