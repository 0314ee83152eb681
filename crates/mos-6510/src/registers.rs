//! 6510 register file.

use emu_core::Bus;

use crate::Status;

/// Address of the reset vector.
pub const RESET_VECTOR: u16 = 0xFFFC;

/// Address of the NMI vector.
pub const NMI_VECTOR: u16 = 0xFFFA;

/// Address of the IRQ/BRK vector.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// 6510 CPU register set.
///
/// The 6510 has minimal registers:
/// - A: 8-bit accumulator
/// - X, Y: 8-bit index registers
/// - SP: 8-bit stack pointer (stack is at $0100-$01FF)
/// - PC: 16-bit program counter
/// - P: processor status
///
/// Register widths are carried by the types, so every setter wraps to
/// the register's width by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registers {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    pc: u16,
    status: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Power-on register state: everything zero except SP at $FF.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFF,
            pc: 0,
            status: Status::new(),
        }
    }

    /// Reinitialise from the vector stored at `vector_address`.
    ///
    /// PC is loaded from the vector, SP is set to $FF, A, X and Y are
    /// cleared and every flag is cleared. Memory is not touched.
    pub fn reset(&mut self, bus: &(impl Bus + ?Sized), vector_address: u16) {
        *self = Self {
            pc: bus.read_word(vector_address),
            ..Self::new()
        };
    }

    #[must_use]
    pub const fn a(&self) -> u8 {
        self.a
    }

    #[must_use]
    pub const fn x(&self) -> u8 {
        self.x
    }

    #[must_use]
    pub const fn y(&self) -> u8 {
        self.y
    }

    #[must_use]
    pub const fn sp(&self) -> u8 {
        self.sp
    }

    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    pub fn set_a(&mut self, value: u8) {
        self.a = value;
    }

    pub fn set_x(&mut self, value: u8) {
        self.x = value;
    }

    pub fn set_y(&mut self, value: u8) {
        self.y = value;
    }

    pub fn set_sp(&mut self, value: u8) {
        self.sp = value;
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    pub fn set_status(&mut self, value: Status) {
        self.status = value;
    }

    /// Mutable access to the flags, for instruction effects.
    pub fn status_mut(&mut self) -> &mut Status {
        &mut self.status
    }

    /// Move PC forward, wrapping at $FFFF.
    pub fn advance_pc(&mut self, bytes: u16) {
        self.pc = self.pc.wrapping_add(bytes);
    }

    /// Push a byte onto the stack. SP wraps within page one.
    pub fn push(&mut self, bus: &mut (impl Bus + ?Sized), value: u8) {
        bus.write(self.stack_addr(), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    /// Pull a byte from the stack.
    pub fn pull(&mut self, bus: &(impl Bus + ?Sized)) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(self.stack_addr())
    }

    /// Push a word, high byte first.
    pub fn push_word(&mut self, bus: &mut (impl Bus + ?Sized), value: u16) {
        let [low, high] = value.to_le_bytes();
        self.push(bus, high);
        self.push(bus, low);
    }

    /// Pull a word, low byte first.
    pub fn pull_word(&mut self, bus: &(impl Bus + ?Sized)) -> u16 {
        let low = self.pull(bus);
        let high = self.pull(bus);
        u16::from_le_bytes([low, high])
    }

    /// Get the current stack address without modifying SP.
    #[must_use]
    pub const fn stack_addr(&self) -> u16 {
        0x0100 | (self.sp as u16)
    }
}
