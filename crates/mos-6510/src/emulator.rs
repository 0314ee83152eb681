//! Emulator facade: memory bank, CPU and observability sink in one place.

use emu_core::{Observable, Value};

use crate::{
    CpuConfig, ExecutionSnapshot, LoadError, Memory, Mos6510, NullObserver, Observer, Registers, State,
    StepOutcome, TerminationReport,
};

/// A 6510 wired to a flat 64K memory bank.
///
/// The CPU only sees memory through [`emu_core::Bus`]; this type owns both
/// and passes its sink to every call, so hosts get a single handle.
#[derive(Debug)]
pub struct Emulator<O: Observer = NullObserver> {
    cpu: Mos6510,
    memory: Memory,
    observer: O,
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Emulator {
    /// Zeroed memory, default configuration, no sink.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    #[must_use]
    pub fn with_config(config: CpuConfig) -> Self {
        Self::with_observer(config, NullObserver)
    }
}

impl<O: Observer> Emulator<O> {
    #[must_use]
    pub fn with_observer(config: CpuConfig, observer: O) -> Self {
        Self {
            cpu: Mos6510::with_config(config),
            memory: Memory::new(),
            observer,
        }
    }

    /// Replace the CPU, keeping memory and sink.
    #[must_use]
    pub fn with_cpu(mut self, cpu: Mos6510) -> Self {
        self.cpu = cpu;
        self
    }

    /// Copy raw bytes into memory at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::OutOfBounds`] if the block runs past $FFFF and
    /// `allow_load_wrap` is off. Memory is unchanged in that case.
    pub fn load_program(&mut self, bytes: &[u8], start: u16) -> Result<(), LoadError> {
        self.memory.load(start, bytes, self.cpu.config().allow_load_wrap)?;
        log::debug!("loaded {} bytes at ${start:04X}", bytes.len());
        Ok(())
    }

    /// Load a PRG image: a 2-byte little-endian load address followed by
    /// the data bytes.
    ///
    /// Returns the load address on success.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::TruncatedPrg`] if the image has no data after
    /// the header, or [`LoadError::OutOfBounds`] as for `load_program`.
    pub fn load_prg(&mut self, data: &[u8]) -> Result<u16, LoadError> {
        let [lo, hi, payload @ ..] = data else {
            return Err(LoadError::TruncatedPrg { len: data.len() });
        };
        if payload.is_empty() {
            return Err(LoadError::TruncatedPrg { len: data.len() });
        }

        let load_addr = u16::from_le_bytes([*lo, *hi]);
        self.load_program(payload, load_addr)?;
        Ok(load_addr)
    }

    /// Reload registers from the reset vector at $FFFC.
    pub fn reset(&mut self) {
        self.cpu.reset(&self.memory);
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> StepOutcome {
        self.cpu.step(&mut self.memory, &mut self.observer)
    }

    /// Run until halted, faulted or `max_steps` instructions have retired.
    pub fn execute(&mut self, max_steps: Option<u64>) -> TerminationReport {
        self.cpu.execute(&mut self.memory, &mut self.observer, max_steps)
    }

    pub fn debug_set_pc(&mut self, pc: u16) {
        self.cpu.debug_set_pc(pc);
    }

    pub fn debug_set_registers(&mut self, regs: Registers) {
        self.cpu.debug_set_registers(regs);
    }

    /// Request a maskable interrupt. Returns false if I is set.
    pub fn irq(&mut self) -> bool {
        self.cpu.irq()
    }

    pub fn nmi(&mut self) {
        self.cpu.nmi();
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.cpu.state()
    }

    #[must_use]
    pub fn snapshot(&self) -> ExecutionSnapshot {
        self.cpu.snapshot()
    }

    #[must_use]
    pub fn cpu(&self) -> &Mos6510 {
        &self.cpu
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Direct memory access, bypassing the load checks.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    #[must_use]
    pub fn into_observer(self) -> O {
        self.observer
    }
}

impl<O: Observer> Observable for Emulator<O> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(address) = path.strip_prefix("memory.") {
            let address = parse_address(address)?;
            return Some(self.memory.read(address).into());
        }
        self.cpu.query(path)
    }

    fn query_paths(&self) -> &'static [&'static str] {
        self.cpu.query_paths()
    }
}

/// Parse `$0801`, `0x0801` or `2049`.
fn parse_address(s: &str) -> Option<u16> {
    if let Some(hex) = s.strip_prefix('$').or_else(|| s.strip_prefix("0x")) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}
