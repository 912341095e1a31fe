pub mod basics;
pub mod display;
pub mod executor;
pub mod keypad;
pub mod memory;
pub mod program;
pub mod registers;
pub mod vm;
