//! 6510 addressing modes and operand resolution.
//!
//! The 6510 has 13 addressing modes:
//! - Implied: No operand (e.g., CLC, RTS)
//! - Accumulator: Operates on A register (e.g., ASL A)
//! - Immediate: #$nn (literal value)
//! - Zero Page: $nn (8-bit address in page zero)
//! - Zero Page,X: $nn,X (8-bit address + X, wraps in page zero)
//! - Zero Page,Y: $nn,Y (8-bit address + Y, wraps in page zero)
//! - Absolute: $nnnn (16-bit address)
//! - Absolute,X: $nnnn,X (16-bit address + X, may cross page)
//! - Absolute,Y: $nnnn,Y (16-bit address + Y, may cross page)
//! - Indirect: ($nnnn) (JMP only, buggy page boundary behavior)
//! - Indexed Indirect: ($nn,X) (pointer in zero page indexed by X)
//! - Indirect Indexed: ($nn),Y (zero page pointer + Y)
//! - Relative: Branch offset (-128 to +127)
//!
//! Resolution only reads. It never writes memory or touches registers,
//! so the engine can resolve an operand and still fault cleanly afterwards.

use std::fmt;

use emu_core::Bus;

use crate::Registers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
    Relative,
}

impl AddressingMode {
    /// Instruction length in bytes, opcode included.
    #[must_use]
    pub const fn size(self) -> u8 {
        match self {
            Self::Implied | Self::Accumulator => 1,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::IndexedIndirect
            | Self::IndirectIndexed
            | Self::Relative => 2,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 3,
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Implied => "implied",
            Self::Accumulator => "accumulator",
            Self::Immediate => "immediate",
            Self::ZeroPage => "zero page",
            Self::ZeroPageX => "zero page,X",
            Self::ZeroPageY => "zero page,Y",
            Self::Absolute => "absolute",
            Self::AbsoluteX => "absolute,X",
            Self::AbsoluteY => "absolute,Y",
            Self::Indirect => "indirect",
            Self::IndexedIndirect => "(zero page,X)",
            Self::IndirectIndexed => "(zero page),Y",
            Self::Relative => "relative",
        };
        f.write_str(name)
    }
}

/// Where an instruction's operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No operand.
    Implied,
    /// The accumulator.
    Accumulator,
    /// A literal byte from the instruction stream.
    Immediate(u8),
    /// An effective memory address.
    Address(u16),
    /// Branch target, already offset from the next instruction.
    Branch(u16),
}

/// Result of resolving one instruction's operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub operand: Operand,
    /// Bytes consumed, opcode included.
    pub len: u8,
    /// Indexing or the branch target crossed a page boundary.
    pub page_crossed: bool,
    /// `JMP ($xxFF)`: the pointer's high byte came from $xx00.
    pub pointer_wrapped: bool,
}

impl Resolved {
    const fn new(operand: Operand, len: u8) -> Self {
        Self {
            operand,
            len,
            page_crossed: false,
            pointer_wrapped: false,
        }
    }

    const fn crossing(mut self, base: u16, effective: u16) -> Self {
        self.page_crossed = base & 0xFF00 != effective & 0xFF00;
        self
    }
}

/// Resolve the operand for the instruction whose opcode sits at `regs.pc()`.
pub fn resolve(mode: AddressingMode, regs: &Registers, bus: &(impl Bus + ?Sized)) -> Resolved {
    let pc = regs.pc();
    let byte = bus.read(pc.wrapping_add(1));
    let word = || bus.read_word(pc.wrapping_add(1));
    let len = mode.size();

    match mode {
        AddressingMode::Implied => Resolved::new(Operand::Implied, len),
        AddressingMode::Accumulator => Resolved::new(Operand::Accumulator, len),
        AddressingMode::Immediate => Resolved::new(Operand::Immediate(byte), len),
        AddressingMode::ZeroPage => Resolved::new(Operand::Address(u16::from(byte)), len),
        AddressingMode::ZeroPageX => {
            let address = u16::from(byte.wrapping_add(regs.x()));
            Resolved::new(Operand::Address(address), len)
        }
        AddressingMode::ZeroPageY => {
            let address = u16::from(byte.wrapping_add(regs.y()));
            Resolved::new(Operand::Address(address), len)
        }
        AddressingMode::Absolute => Resolved::new(Operand::Address(word()), len),
        AddressingMode::AbsoluteX => {
            let base = word();
            let address = base.wrapping_add(u16::from(regs.x()));
            Resolved::new(Operand::Address(address), len).crossing(base, address)
        }
        AddressingMode::AbsoluteY => {
            let base = word();
            let address = base.wrapping_add(u16::from(regs.y()));
            Resolved::new(Operand::Address(address), len).crossing(base, address)
        }
        AddressingMode::Indirect => {
            let pointer = word();
            let mut resolved = Resolved::new(Operand::Address(read_word_page_bug(bus, pointer)), len);
            resolved.pointer_wrapped = pointer & 0x00FF == 0x00FF;
            resolved
        }
        AddressingMode::IndexedIndirect => {
            let pointer = byte.wrapping_add(regs.x());
            Resolved::new(Operand::Address(read_word_zero_page(bus, pointer)), len)
        }
        AddressingMode::IndirectIndexed => {
            let base = read_word_zero_page(bus, byte);
            let address = base.wrapping_add(u16::from(regs.y()));
            Resolved::new(Operand::Address(address), len).crossing(base, address)
        }
        AddressingMode::Relative => {
            let next = pc.wrapping_add(u16::from(len));
            let target = next.wrapping_add(byte as i8 as u16);
            Resolved::new(Operand::Branch(target), len).crossing(next, target)
        }
    }
}

/// Read a 16-bit pointer from zero page; the high byte wraps within page zero.
fn read_word_zero_page(bus: &(impl Bus + ?Sized), pointer: u8) -> u16 {
    let low = bus.read(u16::from(pointer));
    let high = bus.read(u16::from(pointer.wrapping_add(1)));
    u16::from_le_bytes([low, high])
}

/// Read a 16-bit word with 6502 page boundary bug (for indirect JMP).
/// If addr is $xxFF, high byte comes from $xx00 instead of $xx00+$100.
fn read_word_page_bug(bus: &(impl Bus + ?Sized), addr: u16) -> u16 {
    let low = bus.read(addr);
    let high_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
    let high = bus.read(high_addr);
    u16::from_le_bytes([low, high])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Memory;

    fn setup(program: &[u8]) -> (Registers, Memory) {
        let mut memory = Memory::new();
        memory.load(0x0200, program, true).expect("program fits");
        let mut regs = Registers::new();
        regs.set_pc(0x0200);
        (regs, memory)
    }

    #[test]
    fn immediate_yields_literal() {
        let (regs, memory) = setup(&[0xA9, 0x42]);
        let resolved = resolve(AddressingMode::Immediate, &regs, &memory);
        assert_eq!(resolved.operand, Operand::Immediate(0x42));
        assert_eq!(resolved.len, 2);
    }

    #[test]
    fn zero_page_x_wraps_within_page_zero() {
        let (mut regs, memory) = setup(&[0xB5, 0xF0]);
        regs.set_x(0x20);
        let resolved = resolve(AddressingMode::ZeroPageX, &regs, &memory);
        assert_eq!(resolved.operand, Operand::Address(0x0010));
    }

    #[test]
    fn absolute_y_reports_page_crossing() {
        let (mut regs, memory) = setup(&[0xB9, 0xF0, 0x12]);
        regs.set_y(0x20);
        let resolved = resolve(AddressingMode::AbsoluteY, &regs, &memory);
        assert_eq!(resolved.operand, Operand::Address(0x1310));
        assert!(resolved.page_crossed);
        assert_eq!(resolved.len, 3);
    }

    #[test]
    fn absolute_x_wraps_at_top_of_memory() {
        let (mut regs, memory) = setup(&[0xBD, 0xFF, 0xFF]);
        regs.set_x(0x02);
        let resolved = resolve(AddressingMode::AbsoluteX, &regs, &memory);
        assert_eq!(resolved.operand, Operand::Address(0x0001));
    }

    #[test]
    fn indexed_indirect_pointer_wraps_in_zero_page() {
        let (mut regs, mut memory) = setup(&[0xA1, 0xFE]);
        regs.set_x(0x01);
        memory.write(0x00FF, 0x34);
        memory.write(0x0000, 0x12);
        let resolved = resolve(AddressingMode::IndexedIndirect, &regs, &memory);
        assert_eq!(resolved.operand, Operand::Address(0x1234));
    }

    #[test]
    fn indirect_indexed_adds_y_after_dereference() {
        let (mut regs, mut memory) = setup(&[0xB1, 0x10]);
        regs.set_y(0x10);
        memory.write(0x0010, 0xF8);
        memory.write(0x0011, 0x20);
        let resolved = resolve(AddressingMode::IndirectIndexed, &regs, &memory);
        assert_eq!(resolved.operand, Operand::Address(0x2108));
        assert!(resolved.page_crossed);
    }

    #[test]
    fn indirect_reproduces_page_wrap_quirk() {
        let (regs, mut memory) = setup(&[0x6C, 0xFF, 0x30]);
        memory.write(0x30FF, 0x80);
        memory.write(0x3000, 0x40);
        memory.write(0x3100, 0x50);
        let resolved = resolve(AddressingMode::Indirect, &regs, &memory);
        assert_eq!(resolved.operand, Operand::Address(0x4080));
        assert!(resolved.pointer_wrapped);
    }

    #[test]
    fn relative_offsets_from_next_instruction() {
        let (regs, memory) = setup(&[0xD0, 0xFC]);
        let resolved = resolve(AddressingMode::Relative, &regs, &memory);
        assert_eq!(resolved.operand, Operand::Branch(0x01FE));
        assert!(resolved.page_crossed);

        let (regs, memory) = setup(&[0xD0, 0x10]);
        let resolved = resolve(AddressingMode::Relative, &regs, &memory);
        assert_eq!(resolved.operand, Operand::Branch(0x0212));
        assert!(!resolved.page_crossed);
    }

    #[test]
    fn resolution_does_not_touch_memory() {
        let (regs, memory) = setup(&[0x91, 0x10]);
        let before = memory.clone();
        let _ = resolve(AddressingMode::IndirectIndexed, &regs, &memory);
        assert_eq!(memory, before);
    }
}
