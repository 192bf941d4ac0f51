pub mod arch;
pub mod config;
pub mod errors;
pub mod exec;
pub mod instruction;
pub mod loader;
pub mod machine;
pub mod memory;
pub mod registers;
pub mod snapshot;
pub mod syscall;

pub mod decoder;
pub mod encoder;

pub mod asm;

pub use asm::{AsmError, Program, assemble, assemble_with};
pub use config::{DivideByZero, MachineConfig, UnmappedAccess};
pub use errors::{MipsError, Result};
pub use exec::Cause;
pub use instruction::{Format, Instruction};
pub use machine::{Entry, Machine, Tick};
pub use memory::{Bus, Memory, Region};
pub use registers::{RegisterFile, SpecialRegisters};
pub use snapshot::Snapshot;
pub use syscall::{BufferedConsole, SyscallHandler, SyscallOutcome, SyscallRequest};
