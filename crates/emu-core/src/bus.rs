//! Memory bus interface.

/// Memory bus interface.
///
/// Components access memory through this trait. The 16-bit address type
/// makes every address valid: arithmetic on addresses wraps at $FFFF the
/// same way the address lines of an 8-bit CPU do.
pub trait Bus {
    /// Read a byte from the given address.
    ///
    /// Reads never change bus state, so address resolution can be done
    /// ahead of execution without side effects.
    fn read(&self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Read a little-endian word. The high byte comes from `address + 1`,
    /// wrapping from $FFFF to $0000.
    fn read_word(&self, address: u16) -> u16 {
        let low = self.read(address);
        let high = self.read(address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }
}
