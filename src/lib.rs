//! A CHIP-8 virtual machine and its assembler.
//!
//! ```
//! use chip8::{assemble, NullKeypad, VirtualMachine};
//!
//! let program = assemble("LD V1, 0x11\nADD V1, 0x01").unwrap();
//! let mut vm = VirtualMachine::new(&program, NullKeypad).unwrap();
//! vm.step().unwrap();
//! vm.step().unwrap();
//! assert_eq!(vm.state().registers[1], 0x12);
//! ```

pub mod assembler;
pub mod config;
pub mod emulator;
pub mod error;

pub use assembler::{assemble, encode};
pub use config::{BulkTransfer, Config, Quirks};
pub use emulator::display::Frame;
pub use emulator::executor::{spawn, RunHandle, Stopper};
pub use emulator::keypad::{Keypad, Keys, NullKeypad, SharedKeypad};
pub use emulator::program::{disassemble, Instruction, Opcode};
pub use emulator::registers::State;
pub use emulator::vm::VirtualMachine;
pub use error::{AsmError, VmError};
