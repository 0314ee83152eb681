//! 6510 execution engine.
//!
//! Instruction-level execution: each `step()` fetches, decodes and retires
//! exactly one instruction. `execute()` is a loop over `step()`, so a
//! debugger single-stepping sees the same semantics as a full run.
//!
//! ```text
//!   Reset --step--> Running --BRK--> Halted
//!                      |
//!                      +--unknown opcode / invalid operand--> Faulted
//! ```
//!
//! `reset()` returns to `Reset` from any state.

use emu_core::{Bus, Observable, Value};

use crate::addressing;
use crate::flags::{B, C, D, I, N, V, Z};
use crate::instructions::{self, Control};
use crate::registers::{IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use crate::{
    CpuConfig, ExecutionSnapshot, Fault, FaultSignal, HaltReason, HaltSignal, Observer, OpcodeEntry,
    OpcodeTable, Registers,
};

/// Cycles taken by the IRQ/NMI entry sequence.
const INTERRUPT_CYCLES: u64 = 7;

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Constructed or reset; no instruction executed yet.
    Reset,
    /// Executing instructions.
    Running,
    /// BRK executed. Terminal until the next reset.
    Halted,
    /// Unknown opcode or invalid operand. Terminal until the next reset.
    Faulted,
}

impl State {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, State::Halted | State::Faulted)
    }

    const fn name(self) -> &'static str {
        match self {
            State::Reset => "reset",
            State::Running => "running",
            State::Halted => "halted",
            State::Faulted => "faulted",
        }
    }
}

/// Result of one `step()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One instruction retired.
    Retired(ExecutionSnapshot),
    /// The engine is halted.
    Halted(HaltSignal),
    /// The engine is faulted.
    Faulted(FaultSignal),
}

/// How an `execute()` run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Halted(HaltSignal),
    Faulted(FaultSignal),
    /// The step ceiling was reached while still running.
    StepLimit,
}

/// Summary returned by `execute()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationReport {
    pub termination: Termination,
    /// Engine state when the run stopped.
    pub state: State,
    /// Instructions retired during this run.
    pub instructions: u64,
    /// Cycles spent during this run.
    pub cycles: u64,
    /// Final register file.
    pub snapshot: ExecutionSnapshot,
}

impl TerminationReport {
    #[must_use]
    pub const fn fault(&self) -> Option<&Fault> {
        match &self.termination {
            Termination::Faulted(signal) => Some(&signal.fault),
            _ => None,
        }
    }
}

/// The MOS 6510 CPU.
///
/// Owns the register file and the execution state. Memory is reached
/// through the [`Bus`] passed to each call; events go to the [`Observer`]
/// passed alongside it.
#[derive(Debug)]
pub struct Mos6510 {
    /// CPU registers.
    regs: Registers,

    /// Current execution state.
    state: State,

    /// Signal returned again while terminal.
    terminal: Option<StepOutcome>,

    config: CpuConfig,

    table: &'static OpcodeTable,

    /// NMI edge latched, serviced at the next instruction boundary.
    nmi_pending: bool,

    /// IRQ latched, serviced at the next boundary if I is still clear.
    irq_pending: bool,

    /// Total cycles executed.
    total_cycles: u64,

    /// Total instructions retired.
    instructions: u64,
}

impl Default for Mos6510 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6510 {
    /// Create a 6510 in the `Reset` state with the standard opcode table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    #[must_use]
    pub fn with_config(config: CpuConfig) -> Self {
        Self {
            regs: Registers::new(),
            state: State::Reset,
            terminal: None,
            config,
            table: OpcodeTable::standard(),
            nmi_pending: false,
            irq_pending: false,
            total_cycles: 0,
            instructions: 0,
        }
    }

    /// Execute against a custom opcode table.
    #[must_use]
    pub fn with_table(mut self, table: &'static OpcodeTable) -> Self {
        self.table = table;
        self
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.regs
    }

    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.regs.pc()
    }

    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &CpuConfig {
        &self.config
    }

    #[must_use]
    pub fn table(&self) -> &'static OpcodeTable {
        self.table
    }

    /// Total cycles since construction.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Total instructions retired since construction.
    #[must_use]
    pub const fn instructions(&self) -> u64 {
        self.instructions
    }

    #[must_use]
    pub const fn snapshot(&self) -> ExecutionSnapshot {
        ExecutionSnapshot::capture(&self.regs, self.total_cycles)
    }

    /// Seed PC from outside normal execution, for tests and debuggers.
    pub fn debug_set_pc(&mut self, pc: u16) {
        log::debug!("debug PC set to ${pc:04X}");
        self.regs.set_pc(pc);
    }

    /// Seed the whole register file, for tests and debuggers.
    pub fn debug_set_registers(&mut self, regs: Registers) {
        log::debug!("debug registers set, PC ${:04X}", regs.pc());
        self.regs = regs;
    }

    /// Reload the register file from the reset vector at $FFFC and return
    /// to the `Reset` state. Memory is not touched.
    pub fn reset<B: Bus>(&mut self, bus: &B) {
        self.regs.reset(bus, RESET_VECTOR);
        self.state = State::Reset;
        self.terminal = None;
        self.nmi_pending = false;
        self.irq_pending = false;
        log::debug!("reset: PC set to ${:04X}", self.regs.pc());
    }

    /// Request a maskable interrupt. Returns false if I is set.
    pub fn irq(&mut self) -> bool {
        if self.regs.status().interrupt_disable() {
            false
        } else {
            self.irq_pending = true;
            true
        }
    }

    /// Request a non-maskable interrupt.
    pub fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Execute one instruction.
    ///
    /// In a terminal state this returns the terminal signal again and
    /// changes nothing.
    pub fn step<B: Bus, O: Observer + ?Sized>(&mut self, bus: &mut B, observer: &mut O) -> StepOutcome {
        if let Some(outcome) = self.terminal {
            return outcome;
        }
        self.state = State::Running;

        let bus: &mut dyn Bus = bus;
        self.service_interrupts(bus);

        let address = self.regs.pc();
        let opcode = bus.read(address);
        let entry = match self.table.lookup(opcode, address) {
            Ok(entry) => *entry,
            Err(fault) => return self.fault(fault, observer),
        };

        let resolved = addressing::resolve(entry.mode, &self.regs, &*bus);
        if resolved.pointer_wrapped && self.config.strict_indirect {
            return self.fault(invalid_operand(&entry, address), observer);
        }

        let control = match (entry.handler)(&mut self.regs, bus, resolved.operand) {
            Ok(control) => control,
            Err(err) => {
                log::debug!("{} at ${address:04X}: {err}", entry.mnemonic);
                return self.fault(invalid_operand(&entry, address), observer);
            }
        };

        let mut cycles = u64::from(entry.cycles);
        if entry.page_penalty && resolved.page_crossed {
            cycles += 1;
        }

        match control {
            Control::Next => self.regs.advance_pc(u16::from(entry.len)),
            Control::Jump(target) => self.regs.set_pc(target),
            Control::Branch { target, taken } => {
                if taken {
                    cycles += 1 + u64::from(resolved.page_crossed);
                    self.regs.set_pc(target);
                } else {
                    self.regs.advance_pc(u16::from(entry.len));
                }
            }
            Control::Break if self.config.halt_on_brk => {
                let snapshot = self.retire(&entry, address, cycles, observer);
                return self.halt(address, snapshot, observer);
            }
            Control::Break => {
                let return_addr = address.wrapping_add(2);
                let target = instructions::enter_interrupt(&mut self.regs, bus, return_addr, IRQ_VECTOR, true);
                self.regs.set_pc(target);
            }
        }

        StepOutcome::Retired(self.retire(&entry, address, cycles, observer))
    }

    /// Run until halted, faulted or `max_steps` instructions have retired.
    ///
    /// Without `max_steps` the configured `step_limit` applies; with
    /// neither, the run is unbounded.
    pub fn execute<B: Bus, O: Observer + ?Sized>(
        &mut self,
        bus: &mut B,
        observer: &mut O,
        max_steps: Option<u64>,
    ) -> TerminationReport {
        let limit = max_steps.or(self.config.step_limit);
        let start_instructions = self.instructions;
        let start_cycles = self.total_cycles;

        let termination = loop {
            if limit.is_some_and(|limit| self.instructions - start_instructions >= limit)
                && !self.state.is_terminal()
            {
                break Termination::StepLimit;
            }
            match self.step(bus, observer) {
                StepOutcome::Retired(_) => {}
                StepOutcome::Halted(signal) => break Termination::Halted(signal),
                StepOutcome::Faulted(signal) => break Termination::Faulted(signal),
            }
        };

        let report = TerminationReport {
            termination,
            state: self.state,
            instructions: self.instructions - start_instructions,
            cycles: self.total_cycles - start_cycles,
            snapshot: self.snapshot(),
        };
        log::info!(
            "execute stopped {} after {} instructions ({} cycles)",
            self.state.name(),
            report.instructions,
            report.cycles
        );
        report
    }

    fn service_interrupts(&mut self, bus: &mut dyn Bus) {
        let vector = if self.nmi_pending {
            self.nmi_pending = false;
            NMI_VECTOR
        } else if self.irq_pending {
            self.irq_pending = false;
            if self.regs.status().interrupt_disable() {
                return;
            }
            IRQ_VECTOR
        } else {
            return;
        };

        let return_addr = self.regs.pc();
        let target = instructions::enter_interrupt(&mut self.regs, bus, return_addr, vector, false);
        self.regs.set_pc(target);
        self.total_cycles += INTERRUPT_CYCLES;
        log::debug!("interrupt via ${vector:04X} from ${return_addr:04X} to ${target:04X}");
    }

    fn retire<O: Observer + ?Sized>(
        &mut self,
        entry: &OpcodeEntry,
        address: u16,
        cycles: u64,
        observer: &mut O,
    ) -> ExecutionSnapshot {
        self.total_cycles += cycles;
        self.instructions += 1;
        let snapshot = self.snapshot();
        log::trace!("${address:04X} {:<3} {snapshot}", entry.mnemonic);
        observer.on_retire(&snapshot);
        snapshot
    }

    fn halt<O: Observer + ?Sized>(&mut self, pc: u16, snapshot: ExecutionSnapshot, observer: &mut O) -> StepOutcome {
        let signal = HaltSignal {
            reason: HaltReason::Break,
            pc,
            snapshot,
        };
        log::debug!("break at ${pc:04X}, halting");
        self.state = State::Halted;
        let outcome = StepOutcome::Halted(signal);
        self.terminal = Some(outcome);
        observer.on_halt(&signal);
        outcome
    }

    fn fault<O: Observer + ?Sized>(&mut self, fault: Fault, observer: &mut O) -> StepOutcome {
        let signal = FaultSignal {
            fault,
            snapshot: self.snapshot(),
        };
        log::warn!("{fault}");
        self.state = State::Faulted;
        let outcome = StepOutcome::Faulted(signal);
        self.terminal = Some(outcome);
        observer.on_fault(&signal);
        outcome
    }
}

fn invalid_operand(entry: &OpcodeEntry, address: u16) -> Fault {
    Fault::InvalidOperand {
        opcode: entry.opcode,
        address,
        mnemonic: entry.mnemonic,
        mode: entry.mode,
    }
}

impl Observable for Mos6510 {
    fn query(&self, path: &str) -> Option<Value> {
        let p = self.regs.status();
        match path {
            "pc" => Some(self.regs.pc().into()),
            "a" => Some(self.regs.a().into()),
            "x" => Some(self.regs.x().into()),
            "y" => Some(self.regs.y().into()),
            "s" | "sp" => Some(self.regs.sp().into()),
            "p" | "status" => Some(p.bits().into()),
            "flags.c" | "c" => Some(p.is_set(C).into()),
            "flags.z" | "z" => Some(p.is_set(Z).into()),
            "flags.i" | "i" => Some(p.is_set(I).into()),
            "flags.d" | "d" => Some(p.is_set(D).into()),
            "flags.b" | "b" => Some(p.is_set(B).into()),
            "flags.v" | "v" => Some(p.is_set(V).into()),
            "flags.n" | "n" => Some(p.is_set(N).into()),
            "cycles" => Some(self.total_cycles.into()),
            "instructions" => Some(self.instructions.into()),
            "state" => Some(self.state.name().into()),
            "halted" => Some(self.state.is_terminal().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "x", "y", "sp", "p", "flags.c", "flags.z", "flags.i", "flags.d", "flags.b",
            "flags.v", "flags.n", "cycles", "instructions", "state", "halted",
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::{AddressingMode, Memory, NullObserver, OpcodeEntry, Recorder};

    fn setup(program: &[u8]) -> (Mos6510, Memory) {
        let mut memory = Memory::new();
        memory.load(0x0200, program, false).expect("program fits");
        let mut cpu = Mos6510::new();
        cpu.debug_set_pc(0x0200);
        (cpu, memory)
    }

    #[test]
    fn test_lda_immediate() {
        let (mut cpu, mut memory) = setup(&[0xA9, 0x42]);

        let outcome = cpu.step(&mut memory, &mut NullObserver);

        assert!(matches!(outcome, StepOutcome::Retired(_)));
        assert_eq!(cpu.registers().a(), 0x42);
        assert_eq!(cpu.pc(), 0x0202);
        assert_eq!(cpu.cycles(), 2);
        assert_eq!(cpu.state(), State::Running);
    }

    #[test]
    fn test_sta_zeropage() {
        // LDA #$55; STA $10
        let (mut cpu, mut memory) = setup(&[0xA9, 0x55, 0x85, 0x10]);

        cpu.step(&mut memory, &mut NullObserver);
        cpu.step(&mut memory, &mut NullObserver);

        assert_eq!(memory.read(0x0010), 0x55);
        assert_eq!(cpu.cycles(), 5);
    }

    #[test]
    fn test_jmp_absolute() {
        let (mut cpu, mut memory) = setup(&[0x4C, 0x34, 0x12]);

        cpu.step(&mut memory, &mut NullObserver);

        assert_eq!(cpu.pc(), 0x1234);
    }

    #[test]
    fn indexed_read_across_page_costs_a_cycle() {
        // LDY #$20; LDA $12F0,Y
        let (mut cpu, mut memory) = setup(&[0xA0, 0x20, 0xB9, 0xF0, 0x12]);
        memory.write(0x1310, 0x99);

        cpu.step(&mut memory, &mut NullObserver);
        cpu.step(&mut memory, &mut NullObserver);

        assert_eq!(cpu.registers().a(), 0x99);
        assert_eq!(cpu.cycles(), 2 + 5);
    }

    #[test]
    fn taken_branch_costs_extra_cycles() {
        // BNE +2 (taken, same page)
        let (mut cpu, mut memory) = setup(&[0xD0, 0x02]);

        cpu.step(&mut memory, &mut NullObserver);

        assert_eq!(cpu.pc(), 0x0204);
        assert_eq!(cpu.cycles(), 3);
    }

    #[test]
    fn terminal_state_repeats_signal_without_mutation() {
        let (mut cpu, mut memory) = setup(&[0x02]);

        let first = cpu.step(&mut memory, &mut NullObserver);
        let before = (*cpu.registers(), cpu.cycles());
        let second = cpu.step(&mut memory, &mut NullObserver);

        assert!(matches!(first, StepOutcome::Faulted(_)));
        assert_eq!(first, second);
        assert_eq!((*cpu.registers(), cpu.cycles()), before);
        assert_eq!(cpu.state(), State::Faulted);
    }

    #[test]
    fn brk_without_halting_enters_break_handler() {
        let mut memory = Memory::new();
        memory.load(0x0200, &[0x00, 0xEA], false).expect("program fits");
        memory.write(0xFFFE, 0x00);
        memory.write(0xFFFF, 0x03);
        let mut cpu = Mos6510::with_config(CpuConfig {
            halt_on_brk: false,
            ..CpuConfig::default()
        });
        cpu.debug_set_pc(0x0200);

        let outcome = cpu.step(&mut memory, &mut NullObserver);

        assert!(matches!(outcome, StepOutcome::Retired(_)));
        assert_eq!(cpu.pc(), 0x0300);
        assert_eq!(cpu.registers().sp(), 0xFC);
        assert_eq!(memory.read(0x01FF), 0x02);
        assert_eq!(memory.read(0x01FE), 0x02);
        assert_eq!(memory.read(0x01FD), 0x30);
        assert!(cpu.registers().status().interrupt_disable());
        assert!(cpu.registers().status().break_command());
    }

    #[test]
    fn irq_is_refused_while_interrupts_disabled() {
        // SEI; NOP
        let (mut cpu, mut memory) = setup(&[0x78, 0xEA]);
        cpu.step(&mut memory, &mut NullObserver);

        assert!(!cpu.irq());
        cpu.step(&mut memory, &mut NullObserver);
        assert_eq!(cpu.pc(), 0x0202);
    }

    #[test]
    fn nmi_is_serviced_at_next_boundary() {
        let (mut cpu, mut memory) = setup(&[0xEA]);
        memory.write(0xFFFA, 0x00);
        memory.write(0xFFFB, 0x40);
        memory.write(0x4000, 0xEA);

        cpu.nmi();
        cpu.step(&mut memory, &mut NullObserver);

        // Entry pushes $0200 and P, then the NOP at $4000 retires.
        assert_eq!(cpu.pc(), 0x4001);
        assert_eq!(memory.read(0x01FF), 0x02);
        assert_eq!(memory.read(0x01FE), 0x00);
        assert_eq!(memory.read(0x01FD), 0x20);
        assert_eq!(cpu.cycles(), INTERRUPT_CYCLES + 2);
    }

    #[test]
    fn strict_indirect_faults_on_page_wrap() {
        let mut memory = Memory::new();
        memory.load(0x0200, &[0x6C, 0xFF, 0x30], false).expect("program fits");
        let mut cpu = Mos6510::with_config(CpuConfig {
            strict_indirect: true,
            ..CpuConfig::default()
        });
        cpu.debug_set_pc(0x0200);

        let outcome = cpu.step(&mut memory, &mut NullObserver);

        let StepOutcome::Faulted(signal) = outcome else {
            panic!("expected fault, got {outcome:?}");
        };
        assert_eq!(
            signal.fault,
            Fault::InvalidOperand {
                opcode: 0x6C,
                address: 0x0200,
                mnemonic: "JMP",
                mode: AddressingMode::Indirect,
            }
        );
        assert_eq!(cpu.pc(), 0x0200);
    }

    #[test]
    fn mismatched_registration_faults_with_invalid_operand() {
        static TABLE: OnceLock<OpcodeTable> = OnceLock::new();
        let table = TABLE.get_or_init(|| {
            let mut table = OpcodeTable::empty();
            table.register(OpcodeEntry::new(0x02, "STA", AddressingMode::Immediate, 2, instructions::sta));
            table
        });
        let (cpu, mut memory) = setup(&[0x02, 0x10]);
        let mut cpu = cpu.with_table(table);
        let mut recorder = Recorder::new();
        let before = memory.clone();

        let outcome = cpu.step(&mut memory, &mut recorder);

        assert!(matches!(
            outcome,
            StepOutcome::Faulted(FaultSignal {
                fault: Fault::InvalidOperand { opcode: 0x02, address: 0x0200, .. },
                ..
            })
        ));
        assert_eq!(memory, before);
        assert_eq!(cpu.instructions(), 0);
        assert_eq!(recorder.events(), &[outcome]);
    }

    #[test]
    fn observable_paths_answer() {
        let (mut cpu, mut memory) = setup(&[0xA9, 0x00]);
        cpu.step(&mut memory, &mut NullObserver);

        assert_eq!(cpu.query("a"), Some(Value::U8(0)));
        assert_eq!(cpu.query("flags.z"), Some(Value::Bool(true)));
        assert_eq!(cpu.query("pc"), Some(Value::U16(0x0202)));
        assert_eq!(cpu.query("state"), Some(Value::from("running")));
        assert_eq!(cpu.query("instructions"), Some(Value::U64(1)));
        assert_eq!(cpu.query("nonsense"), None);
        for path in cpu.query_paths() {
            assert!(cpu.query(path).is_some(), "{path} should answer");
        }
    }
}
