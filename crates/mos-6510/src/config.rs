//! Engine configuration.

/// Configuration for constructing a CPU or emulator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CpuConfig {
    /// BRK halts the engine. When false, BRK runs the break interrupt
    /// through $FFFE and execution continues.
    pub halt_on_brk: bool,
    /// Ceiling used by `execute()` when the caller passes no limit.
    pub step_limit: Option<u64>,
    /// Program loads may wrap from $FFFF to $0000.
    pub allow_load_wrap: bool,
    /// Treat `JMP ($xxFF)` as a malformed pointer and fault, instead of
    /// reproducing the page-wrap quirk.
    pub strict_indirect: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            halt_on_brk: true,
            step_limit: None,
            allow_load_wrap: true,
            strict_indirect: false,
        }
    }
}
