//! Instruction-level MOS 6510 execution core.
//!
//! Each `step()` fetches one opcode, resolves its operand, runs the handler
//! registered for it and retires the instruction as a whole. There is no
//! per-cycle bus model; cycles are counted, not simulated.
//!
//! The pieces:
//! - [`Memory`]: flat 64K bank behind [`emu_core::Bus`]
//! - [`Registers`] and [`Status`]: the register file
//! - [`resolve`]: the addressing resolver
//! - [`OpcodeTable`]: opcode byte to handler, addressing mode and timing
//! - [`Mos6510`]: the execution engine and its state machine
//! - [`Emulator`]: memory, CPU and an [`Observer`] bundled for hosts

mod addressing;
mod config;
mod cpu;
mod emulator;
mod error;
pub mod flags;
pub mod instructions;
mod memory;
mod observer;
mod opcodes;
mod registers;

pub use addressing::{AddressingMode, Operand, Resolved, resolve};
pub use config::CpuConfig;
pub use cpu::{Mos6510, State, StepOutcome, Termination, TerminationReport};
pub use emulator::Emulator;
pub use error::{Fault, InvalidOperand, LoadError};
pub use flags::Status;
pub use instructions::{Control, Handler};
pub use memory::Memory;
pub use observer::{
    ExecutionSnapshot, FaultSignal, HaltReason, HaltSignal, LogObserver, NullObserver, Observer, Recorder,
};
pub use opcodes::{OpcodeEntry, OpcodeTable};
pub use registers::{IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR, Registers};
