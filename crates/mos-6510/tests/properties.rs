//! Property-based tests for register, memory and engine invariants.

use mos_6510::{CpuConfig, Emulator, Memory, OpcodeTable, State, StepOutcome, flags};
use proptest::prelude::*;

/// Emulator with the reset vector pointing at $8000.
fn setup_emulator() -> Emulator {
    let mut emu = Emulator::new();
    emu.load_program(&[0x00, 0x80], 0xFFFC).expect("vector fits");
    emu.reset();
    emu
}

fn undefined_opcodes() -> Vec<u8> {
    let table = OpcodeTable::standard();
    (0..=255u8).filter(|&op| table.get(op).is_none()).collect()
}

/// Opcodes whose only PC effect is advancing past themselves.
fn straight_line_opcodes() -> Vec<u8> {
    OpcodeTable::standard()
        .iter()
        .filter(|entry| {
            !matches!(
                entry.mnemonic,
                "BCC" | "BCS" | "BEQ" | "BMI" | "BNE" | "BPL" | "BVC" | "BVS" | "JMP" | "JSR" | "RTS" | "RTI" | "BRK"
            )
        })
        .map(|entry| entry.opcode)
        .collect()
}

proptest! {
    /// Property: LDA #imm sets Z and N from the value and leaves every
    /// other flag alone.
    #[test]
    fn prop_lda_immediate_flag_law(initial in any::<u8>(), value in any::<u8>()) {
        let mut emu = setup_emulator();
        // LDA #initial; PHA; PLP; LDA #value
        emu.load_program(&[0xA9, initial, 0x48, 0x28, 0xA9, value], 0x8000).expect("fits");
        for _ in 0..3 {
            emu.step();
        }
        let before = emu.cpu().registers().status();

        emu.step();

        let after = emu.cpu().registers().status();
        prop_assert_eq!(emu.cpu().registers().a(), value);
        prop_assert_eq!(after.zero(), value == 0);
        prop_assert_eq!(after.negative(), value & 0x80 != 0);
        let others = !(flags::Z | flags::N);
        prop_assert_eq!(after.bits() & others, before.bits() & others);
    }

    /// Property: a word is the byte at `addr` plus the byte after it,
    /// with $FFFF wrapping to $0000.
    #[test]
    fn prop_read_word_wrap_law(addr in any::<u16>(), lo in any::<u8>(), hi in any::<u8>()) {
        let mut memory = Memory::new();
        memory.write(addr, lo);
        memory.write(addr.wrapping_add(1), hi);

        let expected = u16::from(memory.read(addr)) | (u16::from(memory.read(addr.wrapping_add(1))) << 8);
        prop_assert_eq!(memory.read_word(addr), expected);
        prop_assert_eq!(memory.read_word(addr), u16::from_le_bytes([lo, hi]));
    }

    /// Property: with the vector unchanged, two resets give the same
    /// register file whatever ran before.
    #[test]
    fn prop_reset_idempotent(vector in any::<u16>(), program in prop::collection::vec(any::<u8>(), 0..32)) {
        let mut emu = setup_emulator();
        emu.load_program(&program, 0x8000).expect("fits");
        emu.execute(Some(16));
        emu.load_program(&vector.to_le_bytes(), 0xFFFC).expect("vector fits");

        emu.reset();
        let first = *emu.cpu().registers();
        emu.reset();
        let second = *emu.cpu().registers();

        prop_assert_eq!(first, second);
        prop_assert_eq!(first.pc(), vector);
        prop_assert_eq!(first.sp(), 0xFF);
        prop_assert_eq!(emu.state(), State::Reset);
    }

    /// Property: after an unknown opcode nothing moves, however often the
    /// engine is stepped.
    #[test]
    fn prop_fault_freezes_state(opcode in prop::sample::select(undefined_opcodes()), extra in 1usize..8) {
        let mut emu = setup_emulator();
        emu.load_program(&[0xA9, 0x33, 0x48, opcode], 0x8000).expect("fits");

        let report = emu.execute(None);
        prop_assert_eq!(report.state, State::Faulted);
        prop_assert_eq!(report.fault().map(|f| (f.opcode(), f.address())), Some((opcode, 0x8003)));

        let memory = emu.memory().clone();
        let regs = *emu.cpu().registers();
        for _ in 0..extra {
            let outcome = emu.step();
            prop_assert!(matches!(outcome, StepOutcome::Faulted(_)));
        }
        prop_assert_eq!(emu.memory(), &memory);
        prop_assert_eq!(*emu.cpu().registers(), regs);
    }

    /// Property: straight-line instructions advance PC by their length and
    /// cost at least their base cycles.
    #[test]
    fn prop_pc_advances_by_instruction_size(
        opcode in prop::sample::select(straight_line_opcodes()),
        operand1 in any::<u8>(),
        operand2 in any::<u8>(),
    ) {
        let mut emu = Emulator::with_config(CpuConfig::default());
        emu.load_program(&[opcode, operand1, operand2], 0x8000).expect("fits");
        emu.debug_set_pc(0x8000);
        let entry = *OpcodeTable::standard().get(opcode).expect("registered");

        let outcome = emu.step();

        prop_assert!(matches!(outcome, StepOutcome::Retired(_)), "{} did not retire", entry.mnemonic);
        prop_assert_eq!(
            emu.cpu().pc(),
            0x8000u16.wrapping_add(u16::from(entry.len)),
            "PC should advance by {} bytes for opcode 0x{:02X} ({})",
            entry.len,
            opcode,
            entry.mnemonic
        );
        prop_assert!(emu.cpu().cycles() >= u64::from(entry.cycles));
    }
}
