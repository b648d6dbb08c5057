//! `rvcore`: execution engine for a cycle-accountable RV64IMFD simulator.
//!
//! Wires together the register file, sparse memory, the integer and
//! floating-point ALUs, the decoder, reversible history, the syscall
//! layer, and the fetch/execute driver that ties them together.

pub mod alu;
pub mod constants;
pub mod decode;
pub mod fpu;
pub mod history;
pub mod isa;
pub mod memory;
pub mod processor;
pub mod registers;
pub mod syscall;

pub use decode::{decode, Decoded, DecodeError};
pub use history::{History, MemoryChange, RegisterBank, RegisterChange, StepDelta};
pub use isa::Op;
pub use memory::{Memory, MemoryError, Storage, StorageMut};
pub use processor::{Processor, Snapshot, StepError, StopReason};
pub use registers::RegisterFile;
pub use syscall::{InputQueue, SyscallError, SyscallOutcome};
