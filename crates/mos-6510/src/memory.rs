//! Flat 64K memory bank.
//!
//! Every address is valid and the address space wraps at $FFFF, the same
//! way the 16-bit address bus does. Nothing is mapped: no ROM overlays, no
//! I/O, no 6510 port at $00/$01.

use emu_core::Bus;

use crate::LoadError;

const SIZE: usize = 0x10000;

/// 64K of RAM.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    ram: Box<[u8; SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory").field("size", &SIZE).finish_non_exhaustive()
    }
}

impl Memory {
    /// Create a zero-filled memory bank.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; SIZE]),
        }
    }

    #[must_use]
    pub fn read(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }

    /// Little-endian word at `address`. At $FFFF the high byte is read
    /// from $0000.
    #[must_use]
    pub fn read_word(&self, address: u16) -> u16 {
        Bus::read_word(self, address)
    }

    /// Copy `bytes` into memory starting at `start`.
    ///
    /// With `allow_wrap` the block continues at $0000 once it passes
    /// $FFFF. Without it, a block that does not fit below $10000 is
    /// rejected and nothing is written.
    pub fn load(&mut self, start: u16, bytes: &[u8], allow_wrap: bool) -> Result<(), LoadError> {
        if !allow_wrap && usize::from(start) + bytes.len() > SIZE {
            return Err(LoadError::OutOfBounds {
                start,
                len: bytes.len(),
            });
        }

        let mut address = start;
        for &byte in bytes {
            self.write(address, byte);
            address = address.wrapping_add(1);
        }
        Ok(())
    }

    /// Whole address space, for inspection.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.ram[..]
    }
}

impl Bus for Memory {
    fn read(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }
}
