//! Execution events and the sinks that receive them.
//!
//! The engine emits one [`ExecutionSnapshot`] per retired instruction, plus
//! a [`HaltSignal`] or [`FaultSignal`] when it reaches a terminal state.
//! Sinks get copies; the engine keeps no reference after emitting.

use std::fmt;

use crate::{Fault, Registers, Status, StepOutcome};

/// Point-in-time copy of the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionSnapshot {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: Status,
    /// Cycles accumulated since construction.
    pub cycles: u64,
}

impl ExecutionSnapshot {
    #[must_use]
    pub const fn capture(regs: &Registers, cycles: u64) -> Self {
        Self {
            pc: regs.pc(),
            a: regs.a(),
            x: regs.x(),
            y: regs.y(),
            sp: regs.sp(),
            status: regs.status(),
            cycles,
        }
    }
}

impl fmt::Display for ExecutionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC: {:04X}, A: {:02X}, X: {:02X}, Y: {:02X}, SP: {:02X}, P: {}",
            self.pc, self.a, self.x, self.y, self.sp, self.status
        )
    }
}

/// Why the engine halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// BRK executed with `halt_on_brk` set.
    Break,
}

/// Emitted once when the engine enters `Halted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaltSignal {
    pub reason: HaltReason,
    /// Address of the halting instruction.
    pub pc: u16,
    pub snapshot: ExecutionSnapshot,
}

/// Emitted once when the engine enters `Faulted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultSignal {
    pub fault: Fault,
    /// Register state at the fault; nothing was mutated by the faulting
    /// instruction.
    pub snapshot: ExecutionSnapshot,
}

/// Receives execution events.
///
/// All methods default to doing nothing, so a sink only implements the
/// events it cares about.
pub trait Observer {
    /// An instruction retired.
    fn on_retire(&mut self, _snapshot: &ExecutionSnapshot) {}

    /// The engine halted.
    fn on_halt(&mut self, _signal: &HaltSignal) {}

    /// The engine faulted.
    fn on_fault(&mut self, _signal: &FaultSignal) {}
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn on_retire(&mut self, snapshot: &ExecutionSnapshot) {
        (**self).on_retire(snapshot);
    }

    fn on_halt(&mut self, signal: &HaltSignal) {
        (**self).on_halt(signal);
    }

    fn on_fault(&mut self, signal: &FaultSignal) {
        (**self).on_fault(signal);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// Forwards events to the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogObserver {
    level: log::Level,
}

impl LogObserver {
    /// Log retired instructions and halts at `level`. Faults always log
    /// at warn.
    #[must_use]
    pub const fn new(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new(log::Level::Debug)
    }
}

impl Observer for LogObserver {
    fn on_retire(&mut self, snapshot: &ExecutionSnapshot) {
        log::log!(self.level, "{snapshot}");
    }

    fn on_halt(&mut self, signal: &HaltSignal) {
        log::log!(self.level, "halted ({:?}) at ${:04X}", signal.reason, signal.pc);
    }

    fn on_fault(&mut self, signal: &FaultSignal) {
        log::warn!("faulted: {}", signal.fault);
    }
}

/// Keeps every event in order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Vec<StepOutcome>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[StepOutcome] {
        &self.events
    }

    /// Snapshots of retired instructions only.
    pub fn snapshots(&self) -> impl Iterator<Item = &ExecutionSnapshot> {
        self.events.iter().filter_map(|event| match event {
            StepOutcome::Retired(snapshot) => Some(snapshot),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Observer for Recorder {
    fn on_retire(&mut self, snapshot: &ExecutionSnapshot) {
        self.events.push(StepOutcome::Retired(*snapshot));
    }

    fn on_halt(&mut self, signal: &HaltSignal) {
        self.events.push(StepOutcome::Halted(*signal));
    }

    fn on_fault(&mut self, signal: &FaultSignal) {
        self.events.push(StepOutcome::Faulted(*signal));
    }
}
