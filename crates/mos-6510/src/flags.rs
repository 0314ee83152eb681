//! Processor status register (P) and flag computation.
//!
//! The status register holds seven independent flags. Bit 5 is not stored:
//! it only exists in bytes pushed to the stack, where it always reads as 1.
//!
//! The free functions in this module are the flag computation unit. They
//! are pure: given operands and a result they return the flags an
//! operation produces, and each handler applies only the flags it is
//! documented to affect.

/// Carry flag - set if operation resulted in carry/borrow.
pub const C: u8 = 0x01;

/// Zero flag - set if result is zero.
pub const Z: u8 = 0x02;

/// Interrupt disable - when set, IRQ requests are ignored.
pub const I: u8 = 0x04;

/// Decimal mode - enables BCD arithmetic for ADC/SBC.
pub const D: u8 = 0x08;

/// Break command - set by BRK when it runs as a software interrupt.
pub const B: u8 = 0x10;

/// Unused bit - always reads as 1 when P is pushed.
pub const U: u8 = 0x20;

/// Overflow flag - set if signed arithmetic overflowed.
pub const V: u8 = 0x40;

/// Negative flag - set if result has bit 7 set.
pub const N: u8 = 0x80;

const STORED: u8 = C | Z | I | D | B | V | N;

/// Processor status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status(u8);

impl Status {
    /// All flags clear.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Build a status register from a raw byte. Bit 5 is dropped.
    #[must_use]
    pub const fn from_bits(value: u8) -> Self {
        Self(value & STORED)
    }

    /// Raw flag bits (bit 5 always clear).
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Byte pushed by PHP and BRK: unused and break both set.
    #[must_use]
    pub const fn to_byte_brk(self) -> u8 {
        self.0 | U | B
    }

    /// Byte pushed on IRQ/NMI entry: unused set, break clear.
    #[must_use]
    pub const fn to_byte_irq(self) -> u8 {
        (self.0 | U) & !B
    }

    /// Apply a byte pulled by PLP/RTI. The break flag is not a latch on the
    /// real chip, so the current value is kept.
    pub fn restore(&mut self, pulled: u8) {
        self.0 = (pulled & STORED & !B) | (self.0 & B);
    }

    /// Check if a flag is set.
    #[must_use]
    pub const fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Set a flag.
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag & STORED;
    }

    /// Clear a flag.
    pub fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    /// Set or clear a flag based on condition.
    pub fn set_if(&mut self, flag: u8, condition: bool) {
        if condition {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    /// Update N and Z flags based on a value.
    pub fn update_nz(&mut self, value: u8) {
        let (zero, negative) = zero_and_negative(value);
        self.set_if(Z, zero);
        self.set_if(N, negative);
    }

    #[must_use]
    pub const fn carry(self) -> bool {
        self.is_set(C)
    }

    #[must_use]
    pub const fn zero(self) -> bool {
        self.is_set(Z)
    }

    #[must_use]
    pub const fn interrupt_disable(self) -> bool {
        self.is_set(I)
    }

    #[must_use]
    pub const fn decimal_mode(self) -> bool {
        self.is_set(D)
    }

    #[must_use]
    pub const fn break_command(self) -> bool {
        self.is_set(B)
    }

    #[must_use]
    pub const fn overflow(self) -> bool {
        self.is_set(V)
    }

    #[must_use]
    pub const fn negative(self) -> bool {
        self.is_set(N)
    }
}

impl std::fmt::Display for Status {
    /// Renders as `NV-BDIZC`, upper case for set flags.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const LETTERS: [(u8, char); 8] = [
            (N, 'n'),
            (V, 'v'),
            (U, '-'),
            (B, 'b'),
            (D, 'd'),
            (I, 'i'),
            (Z, 'z'),
            (C, 'c'),
        ];
        for (flag, letter) in LETTERS {
            let shown = if flag != U && self.is_set(flag) {
                letter.to_ascii_uppercase()
            } else {
                letter
            };
            write!(f, "{shown}")?;
        }
        Ok(())
    }
}

/// Zero and negative flags for a result, as `(zero, negative)`.
#[must_use]
pub const fn zero_and_negative(result: u8) -> (bool, bool) {
    (result == 0, result & 0x80 != 0)
}

/// 8-bit addition with carry-in. Returns the wrapped sum and the carry-out.
#[must_use]
pub const fn carry_from_addition(a: u8, b: u8, carry_in: bool) -> (u8, bool) {
    let sum = a as u16 + b as u16 + carry_in as u16;
    (sum as u8, sum > 0xFF)
}

/// Two's-complement overflow: both operands share a sign and the result
/// has the other one.
#[must_use]
pub const fn overflow_from_addition(a: u8, b: u8, result: u8) -> bool {
    (a ^ result) & (b ^ result) & 0x80 != 0
}

/// Flags produced by CMP/CPX/CPY, as `(carry, zero, negative)`.
#[must_use]
pub const fn compare(register: u8, value: u8) -> (bool, bool, bool) {
    let (zero, negative) = zero_and_negative(register.wrapping_sub(value));
    (register >= value, zero, negative)
}
