//! Error types.
//!
//! Instruction-level failures never escape `step()` as errors: they become
//! a [`Fault`] carried by the terminal state. Load errors go back to the
//! caller that attempted the load.

use thiserror::Error;

use crate::{AddressingMode, Operand};

/// Failure to place a program image in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The block runs past $FFFF and wraparound is disabled.
    #[error("{len} bytes at ${start:04X} run past $FFFF")]
    OutOfBounds { start: u16, len: usize },

    /// A PRG image needs a two-byte load address and at least one data byte.
    #[error("PRG image too short ({len} bytes, need at least 3)")]
    TruncatedPrg { len: usize },
}

/// A handler was given an operand shape it cannot use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operand {0:?} is not valid for this instruction")]
pub struct InvalidOperand(pub Operand);

/// Reason the engine stopped in the `Faulted` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// No opcode table entry exists for the byte at PC.
    #[error("unknown opcode ${opcode:02X} at ${address:04X}")]
    UnknownOpcode { opcode: u8, address: u16 },

    /// The operand could not be used, or the pointer it names is malformed.
    #[error("invalid {mode} operand for {mnemonic} (${opcode:02X}) at ${address:04X}")]
    InvalidOperand {
        opcode: u8,
        address: u16,
        mnemonic: &'static str,
        mode: AddressingMode,
    },
}

impl Fault {
    /// The opcode byte responsible.
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        match *self {
            Fault::UnknownOpcode { opcode, .. } | Fault::InvalidOperand { opcode, .. } => opcode,
        }
    }

    /// Address of the offending instruction.
    #[must_use]
    pub const fn address(&self) -> u16 {
        match *self {
            Fault::UnknownOpcode { address, .. } | Fault::InvalidOperand { address, .. } => address,
        }
    }
}
