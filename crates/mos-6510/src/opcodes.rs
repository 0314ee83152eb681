//! Opcode table.
//!
//! Dispatch is keyed data: each opcode byte maps to an [`OpcodeEntry`]
//! carrying its mnemonic, addressing mode, timing and handler. Adding an
//! instruction means registering an entry, not adding a match arm.
//!
//! [`OpcodeTable::standard`] holds the 151 documented NMOS opcodes. Every
//! other byte is unknown and faults the engine.

use std::sync::OnceLock;

use crate::addressing::AddressingMode::{
    self, Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implied, IndexedIndirect, Indirect,
    IndirectIndexed, Relative, ZeroPage, ZeroPageX, ZeroPageY,
};
use crate::instructions::{self as ops, Handler};
use crate::Fault;

/// One registered instruction.
#[derive(Clone, Copy)]
pub struct OpcodeEntry {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    /// Instruction length in bytes, opcode included.
    pub len: u8,
    /// Base cycle count.
    pub cycles: u8,
    /// Indexed reads that cross a page take one more cycle.
    pub page_penalty: bool,
    pub handler: Handler,
}

impl OpcodeEntry {
    #[must_use]
    pub const fn new(opcode: u8, mnemonic: &'static str, mode: AddressingMode, cycles: u8, handler: Handler) -> Self {
        Self {
            opcode,
            mnemonic,
            mode,
            len: mode.size(),
            cycles,
            page_penalty: false,
            handler,
        }
    }

    /// Same entry, with the page-crossing penalty.
    #[must_use]
    pub const fn with_page_penalty(mut self) -> Self {
        self.page_penalty = true;
        self
    }
}

impl std::fmt::Debug for OpcodeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcodeEntry")
            .field("opcode", &format_args!("${:02X}", self.opcode))
            .field("mnemonic", &self.mnemonic)
            .field("mode", &self.mode)
            .field("len", &self.len)
            .field("cycles", &self.cycles)
            .field("page_penalty", &self.page_penalty)
            .finish_non_exhaustive()
    }
}

/// Lookup table from opcode byte to entry.
#[derive(Clone)]
pub struct OpcodeTable {
    entries: [Option<OpcodeEntry>; 256],
}

impl std::fmt::Debug for OpcodeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcodeTable").field("len", &self.len()).finish_non_exhaustive()
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl OpcodeTable {
    /// A table with no instructions.
    #[must_use]
    pub const fn empty() -> Self {
        Self { entries: [None; 256] }
    }

    /// The documented NMOS 6502/6510 instruction set.
    ///
    /// Built on first use and shared for the life of the process.
    #[must_use]
    pub fn standard() -> &'static OpcodeTable {
        static TABLE: OnceLock<OpcodeTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let mut table = OpcodeTable::empty();
            for &entry in NMOS {
                table.register(entry);
            }
            log::debug!("opcode table built with {} entries", table.len());
            table
        })
    }

    /// Register an entry, returning whatever it displaced.
    pub fn register(&mut self, entry: OpcodeEntry) -> Option<OpcodeEntry> {
        self.entries[usize::from(entry.opcode)].replace(entry)
    }

    #[must_use]
    pub fn get(&self, opcode: u8) -> Option<&OpcodeEntry> {
        self.entries[usize::from(opcode)].as_ref()
    }

    /// Look up `opcode`, fetched from `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownOpcode`] if nothing is registered for it.
    pub fn lookup(&self, opcode: u8, address: u16) -> Result<&OpcodeEntry, Fault> {
        self.get(opcode).ok_or(Fault::UnknownOpcode { opcode, address })
    }

    /// Number of registered opcodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpcodeEntry> {
        self.entries.iter().flatten()
    }
}

const fn op(opcode: u8, mnemonic: &'static str, mode: AddressingMode, cycles: u8, handler: Handler) -> OpcodeEntry {
    OpcodeEntry::new(opcode, mnemonic, mode, cycles, handler)
}

/// Indexed read: +1 cycle on page crossing.
const fn opx(opcode: u8, mnemonic: &'static str, mode: AddressingMode, cycles: u8, handler: Handler) -> OpcodeEntry {
    OpcodeEntry::new(opcode, mnemonic, mode, cycles, handler).with_page_penalty()
}

#[rustfmt::skip]
const NMOS: &[OpcodeEntry] = &[
    // Loads
    op(0xA9, "LDA", Immediate, 2, ops::lda),
    op(0xA5, "LDA", ZeroPage, 3, ops::lda),
    op(0xB5, "LDA", ZeroPageX, 4, ops::lda),
    op(0xAD, "LDA", Absolute, 4, ops::lda),
    opx(0xBD, "LDA", AbsoluteX, 4, ops::lda),
    opx(0xB9, "LDA", AbsoluteY, 4, ops::lda),
    op(0xA1, "LDA", IndexedIndirect, 6, ops::lda),
    opx(0xB1, "LDA", IndirectIndexed, 5, ops::lda),
    op(0xA2, "LDX", Immediate, 2, ops::ldx),
    op(0xA6, "LDX", ZeroPage, 3, ops::ldx),
    op(0xB6, "LDX", ZeroPageY, 4, ops::ldx),
    op(0xAE, "LDX", Absolute, 4, ops::ldx),
    opx(0xBE, "LDX", AbsoluteY, 4, ops::ldx),
    op(0xA0, "LDY", Immediate, 2, ops::ldy),
    op(0xA4, "LDY", ZeroPage, 3, ops::ldy),
    op(0xB4, "LDY", ZeroPageX, 4, ops::ldy),
    op(0xAC, "LDY", Absolute, 4, ops::ldy),
    opx(0xBC, "LDY", AbsoluteX, 4, ops::ldy),

    // Stores
    op(0x85, "STA", ZeroPage, 3, ops::sta),
    op(0x95, "STA", ZeroPageX, 4, ops::sta),
    op(0x8D, "STA", Absolute, 4, ops::sta),
    op(0x9D, "STA", AbsoluteX, 5, ops::sta),
    op(0x99, "STA", AbsoluteY, 5, ops::sta),
    op(0x81, "STA", IndexedIndirect, 6, ops::sta),
    op(0x91, "STA", IndirectIndexed, 6, ops::sta),
    op(0x86, "STX", ZeroPage, 3, ops::stx),
    op(0x96, "STX", ZeroPageY, 4, ops::stx),
    op(0x8E, "STX", Absolute, 4, ops::stx),
    op(0x84, "STY", ZeroPage, 3, ops::sty),
    op(0x94, "STY", ZeroPageX, 4, ops::sty),
    op(0x8C, "STY", Absolute, 4, ops::sty),

    // Transfers
    op(0xAA, "TAX", Implied, 2, ops::tax),
    op(0xA8, "TAY", Implied, 2, ops::tay),
    op(0x8A, "TXA", Implied, 2, ops::txa),
    op(0x98, "TYA", Implied, 2, ops::tya),
    op(0xBA, "TSX", Implied, 2, ops::tsx),
    op(0x9A, "TXS", Implied, 2, ops::txs),

    // Stack
    op(0x48, "PHA", Implied, 3, ops::pha),
    op(0x68, "PLA", Implied, 4, ops::pla),
    op(0x08, "PHP", Implied, 3, ops::php),
    op(0x28, "PLP", Implied, 4, ops::plp),

    // Logic
    op(0x29, "AND", Immediate, 2, ops::and),
    op(0x25, "AND", ZeroPage, 3, ops::and),
    op(0x35, "AND", ZeroPageX, 4, ops::and),
    op(0x2D, "AND", Absolute, 4, ops::and),
    opx(0x3D, "AND", AbsoluteX, 4, ops::and),
    opx(0x39, "AND", AbsoluteY, 4, ops::and),
    op(0x21, "AND", IndexedIndirect, 6, ops::and),
    opx(0x31, "AND", IndirectIndexed, 5, ops::and),
    op(0x09, "ORA", Immediate, 2, ops::ora),
    op(0x05, "ORA", ZeroPage, 3, ops::ora),
    op(0x15, "ORA", ZeroPageX, 4, ops::ora),
    op(0x0D, "ORA", Absolute, 4, ops::ora),
    opx(0x1D, "ORA", AbsoluteX, 4, ops::ora),
    opx(0x19, "ORA", AbsoluteY, 4, ops::ora),
    op(0x01, "ORA", IndexedIndirect, 6, ops::ora),
    opx(0x11, "ORA", IndirectIndexed, 5, ops::ora),
    op(0x49, "EOR", Immediate, 2, ops::eor),
    op(0x45, "EOR", ZeroPage, 3, ops::eor),
    op(0x55, "EOR", ZeroPageX, 4, ops::eor),
    op(0x4D, "EOR", Absolute, 4, ops::eor),
    opx(0x5D, "EOR", AbsoluteX, 4, ops::eor),
    opx(0x59, "EOR", AbsoluteY, 4, ops::eor),
    op(0x41, "EOR", IndexedIndirect, 6, ops::eor),
    opx(0x51, "EOR", IndirectIndexed, 5, ops::eor),
    op(0x24, "BIT", ZeroPage, 3, ops::bit),
    op(0x2C, "BIT", Absolute, 4, ops::bit),

    // Arithmetic
    op(0x69, "ADC", Immediate, 2, ops::adc),
    op(0x65, "ADC", ZeroPage, 3, ops::adc),
    op(0x75, "ADC", ZeroPageX, 4, ops::adc),
    op(0x6D, "ADC", Absolute, 4, ops::adc),
    opx(0x7D, "ADC", AbsoluteX, 4, ops::adc),
    opx(0x79, "ADC", AbsoluteY, 4, ops::adc),
    op(0x61, "ADC", IndexedIndirect, 6, ops::adc),
    opx(0x71, "ADC", IndirectIndexed, 5, ops::adc),
    op(0xE9, "SBC", Immediate, 2, ops::sbc),
    op(0xE5, "SBC", ZeroPage, 3, ops::sbc),
    op(0xF5, "SBC", ZeroPageX, 4, ops::sbc),
    op(0xED, "SBC", Absolute, 4, ops::sbc),
    opx(0xFD, "SBC", AbsoluteX, 4, ops::sbc),
    opx(0xF9, "SBC", AbsoluteY, 4, ops::sbc),
    op(0xE1, "SBC", IndexedIndirect, 6, ops::sbc),
    opx(0xF1, "SBC", IndirectIndexed, 5, ops::sbc),

    // Compares
    op(0xC9, "CMP", Immediate, 2, ops::cmp),
    op(0xC5, "CMP", ZeroPage, 3, ops::cmp),
    op(0xD5, "CMP", ZeroPageX, 4, ops::cmp),
    op(0xCD, "CMP", Absolute, 4, ops::cmp),
    opx(0xDD, "CMP", AbsoluteX, 4, ops::cmp),
    opx(0xD9, "CMP", AbsoluteY, 4, ops::cmp),
    op(0xC1, "CMP", IndexedIndirect, 6, ops::cmp),
    opx(0xD1, "CMP", IndirectIndexed, 5, ops::cmp),
    op(0xE0, "CPX", Immediate, 2, ops::cpx),
    op(0xE4, "CPX", ZeroPage, 3, ops::cpx),
    op(0xEC, "CPX", Absolute, 4, ops::cpx),
    op(0xC0, "CPY", Immediate, 2, ops::cpy),
    op(0xC4, "CPY", ZeroPage, 3, ops::cpy),
    op(0xCC, "CPY", Absolute, 4, ops::cpy),

    // Increments and decrements
    op(0xE6, "INC", ZeroPage, 5, ops::inc),
    op(0xF6, "INC", ZeroPageX, 6, ops::inc),
    op(0xEE, "INC", Absolute, 6, ops::inc),
    op(0xFE, "INC", AbsoluteX, 7, ops::inc),
    op(0xC6, "DEC", ZeroPage, 5, ops::dec),
    op(0xD6, "DEC", ZeroPageX, 6, ops::dec),
    op(0xCE, "DEC", Absolute, 6, ops::dec),
    op(0xDE, "DEC", AbsoluteX, 7, ops::dec),
    op(0xE8, "INX", Implied, 2, ops::inx),
    op(0xC8, "INY", Implied, 2, ops::iny),
    op(0xCA, "DEX", Implied, 2, ops::dex),
    op(0x88, "DEY", Implied, 2, ops::dey),

    // Shifts and rotates
    op(0x0A, "ASL", Accumulator, 2, ops::asl),
    op(0x06, "ASL", ZeroPage, 5, ops::asl),
    op(0x16, "ASL", ZeroPageX, 6, ops::asl),
    op(0x0E, "ASL", Absolute, 6, ops::asl),
    op(0x1E, "ASL", AbsoluteX, 7, ops::asl),
    op(0x4A, "LSR", Accumulator, 2, ops::lsr),
    op(0x46, "LSR", ZeroPage, 5, ops::lsr),
    op(0x56, "LSR", ZeroPageX, 6, ops::lsr),
    op(0x4E, "LSR", Absolute, 6, ops::lsr),
    op(0x5E, "LSR", AbsoluteX, 7, ops::lsr),
    op(0x2A, "ROL", Accumulator, 2, ops::rol),
    op(0x26, "ROL", ZeroPage, 5, ops::rol),
    op(0x36, "ROL", ZeroPageX, 6, ops::rol),
    op(0x2E, "ROL", Absolute, 6, ops::rol),
    op(0x3E, "ROL", AbsoluteX, 7, ops::rol),
    op(0x6A, "ROR", Accumulator, 2, ops::ror),
    op(0x66, "ROR", ZeroPage, 5, ops::ror),
    op(0x76, "ROR", ZeroPageX, 6, ops::ror),
    op(0x6E, "ROR", Absolute, 6, ops::ror),
    op(0x7E, "ROR", AbsoluteX, 7, ops::ror),

    // Jumps and subroutines
    op(0x4C, "JMP", Absolute, 3, ops::jmp),
    op(0x6C, "JMP", Indirect, 5, ops::jmp),
    op(0x20, "JSR", Absolute, 6, ops::jsr),
    op(0x60, "RTS", Implied, 6, ops::rts),
    op(0x40, "RTI", Implied, 6, ops::rti),

    // Branches (+1 taken, +1 more on page crossing)
    op(0x90, "BCC", Relative, 2, ops::bcc),
    op(0xB0, "BCS", Relative, 2, ops::bcs),
    op(0xD0, "BNE", Relative, 2, ops::bne),
    op(0xF0, "BEQ", Relative, 2, ops::beq),
    op(0x10, "BPL", Relative, 2, ops::bpl),
    op(0x30, "BMI", Relative, 2, ops::bmi),
    op(0x50, "BVC", Relative, 2, ops::bvc),
    op(0x70, "BVS", Relative, 2, ops::bvs),

    // Flags
    op(0x18, "CLC", Implied, 2, ops::clc),
    op(0x38, "SEC", Implied, 2, ops::sec),
    op(0x58, "CLI", Implied, 2, ops::cli),
    op(0x78, "SEI", Implied, 2, ops::sei),
    op(0xD8, "CLD", Implied, 2, ops::cld),
    op(0xF8, "SED", Implied, 2, ops::sed),
    op(0xB8, "CLV", Implied, 2, ops::clv),

    // Misc
    op(0xEA, "NOP", Implied, 2, ops::nop),
    op(0x00, "BRK", Implied, 7, ops::brk),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_has_documented_set() {
        assert_eq!(NMOS.len(), 151);
        assert_eq!(OpcodeTable::standard().len(), 151);
    }

    #[test]
    fn no_opcode_registered_twice() {
        let mut table = OpcodeTable::empty();
        for &entry in NMOS {
            assert!(
                table.register(entry).is_none(),
                "opcode ${:02X} registered twice",
                entry.opcode
            );
        }
    }

    #[test]
    fn lda_immediate_entry() {
        let entry = OpcodeTable::standard().get(0xA9).expect("LDA # registered");
        assert_eq!(entry.mnemonic, "LDA");
        assert_eq!(entry.mode, AddressingMode::Immediate);
        assert_eq!(entry.len, 2);
        assert_eq!(entry.cycles, 2);
    }

    #[test]
    fn unknown_opcode_lookup_faults() {
        let result = OpcodeTable::standard().lookup(0xFF, 0x0801);
        assert!(matches!(
            result,
            Err(Fault::UnknownOpcode {
                opcode: 0xFF,
                address: 0x0801
            })
        ));
    }

    #[test]
    fn register_replaces_and_returns_previous() {
        let mut table = OpcodeTable::empty();
        assert!(table.is_empty());
        assert!(table.register(op(0xEA, "NOP", Implied, 2, ops::nop)).is_none());
        let displaced = table.register(op(0xEA, "XXX", Implied, 3, ops::nop));
        assert_eq!(displaced.map(|e| e.mnemonic), Some("NOP"));
        assert_eq!(table.get(0xEA).map(|e| e.cycles), Some(3));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn page_penalty_only_on_indexed_reads() {
        for entry in OpcodeTable::standard().iter() {
            if entry.page_penalty {
                assert!(matches!(
                    entry.mode,
                    AddressingMode::AbsoluteX | AddressingMode::AbsoluteY | AddressingMode::IndirectIndexed
                ));
                assert!(!matches!(entry.mnemonic, "STA" | "INC" | "DEC" | "ASL" | "LSR" | "ROL" | "ROR"));
            }
        }
    }
}
