//! Read-only state queries by path.
//!
//! A debugger, test or trace tool asks a CPU (or the machine wrapping it)
//! for `"pc"`, `"flags.c"` or `"state"` and gets a [`Value`] back, without
//! knowing the concrete register types. Answering a query never touches
//! registers, memory or the execution state.

use std::fmt;

/// Answer to a state query.
///
/// Register widths map to their own variants so the display form can show
/// them as hex of the right width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A single flag or a yes/no condition such as `halted`.
    Bool(bool),
    /// An 8-bit register or memory byte.
    U8(u8),
    /// PC or another 16-bit address.
    U16(u16),
    /// Counters: cycles, retired instructions.
    U64(u64),
    /// Named states such as `"running"`.
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(byte) => write!(f, "{byte:#04X}"),
            Value::U16(word) => write!(f, "{word:#06X}"),
            Value::Bool(flag) => fmt::Display::fmt(flag, f),
            Value::U64(count) => fmt::Display::fmt(count, f),
            Value::String(text) => f.write_str(text),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from!(bool => Bool, u8 => U8, u16 => U16, u64 => U64);

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_owned())
    }
}

/// Something whose state can be read by path between instructions.
pub trait Observable {
    /// Look up one path, e.g. `a`, `sp`, `flags.z`, `cycles`.
    ///
    /// Unknown paths give `None`.
    fn query(&self, path: &str) -> Option<Value>;

    /// Every path `query()` answers.
    fn query_paths(&self) -> &'static [&'static str];
}
