//! Single-instruction cases in the `SingleStepTests` JSON layout.
//!
//! Each case gives the register file and the RAM bytes before one
//! instruction and what they must be after it. Cases live in
//! `tests/data/cases.json`.

use mos_6510::{Emulator, Registers, Status, StepOutcome, flags};
use serde::Deserialize;

/// JSON test case format.
#[derive(Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
}

/// JSON CPU state format.
#[derive(Deserialize)]
struct CpuState {
    pc: u16,
    s: u8,
    a: u8,
    x: u8,
    y: u8,
    p: u8,
    ram: Vec<(u16, u8)>,
}

/// Set up registers and memory from the initial test state.
fn setup(emu: &mut Emulator, state: &CpuState) {
    for &(addr, value) in &state.ram {
        emu.memory_mut().write(addr, value);
    }
    let mut regs = Registers::new();
    regs.set_pc(state.pc);
    regs.set_sp(state.s);
    regs.set_a(state.a);
    regs.set_x(state.x);
    regs.set_y(state.y);
    let mut status = Status::from_bits(state.p);
    status.clear(flags::B);
    regs.set_status(status);
    emu.debug_set_registers(regs);
}

/// Compare against the expected state, returning a list of mismatches.
fn compare(emu: &Emulator, expected: &CpuState) -> Vec<String> {
    let mut errors = Vec::new();
    let regs = emu.cpu().registers();

    let pairs: [(&str, u16, u16); 5] = [
        ("PC", regs.pc(), expected.pc),
        ("S", regs.sp().into(), expected.s.into()),
        ("A", regs.a().into(), expected.a.into()),
        ("X", regs.x().into(), expected.x.into()),
        ("Y", regs.y().into(), expected.y.into()),
    ];
    for (name, got, want) in pairs {
        if got != want {
            errors.push(format!("{name}: got ${got:04X}, want ${want:04X}"));
        }
    }

    // B and bit 5 only exist on the stack.
    let actual_p = regs.status().bits() | 0x30;
    let expected_p = expected.p | 0x30;
    if actual_p != expected_p {
        errors.push(format!(
            "P: got ${actual_p:02X} ({actual_p:08b}), want ${expected_p:02X} ({expected_p:08b})"
        ));
    }

    for &(addr, expected_val) in &expected.ram {
        let actual_val = emu.memory().read(addr);
        if actual_val != expected_val {
            errors.push(format!("RAM[${addr:04X}]: got ${actual_val:02X}, want ${expected_val:02X}"));
        }
    }

    errors
}

fn load_cases() -> Vec<TestCase> {
    let json = include_str!("data/cases.json");
    serde_json::from_str(json).expect("cases.json should parse")
}

#[test]
fn single_step_cases() {
    let cases = load_cases();
    assert!(!cases.is_empty());

    let mut failures = Vec::new();
    for case in &cases {
        let mut emu = Emulator::new();
        setup(&mut emu, &case.initial);

        let outcome = emu.step();
        if !matches!(outcome, StepOutcome::Retired(_)) {
            failures.push(format!("{}: did not retire: {outcome:?}", case.name));
            continue;
        }

        let errors = compare(&emu, &case.final_state);
        if !errors.is_empty() {
            failures.push(format!("{}: {}", case.name, errors.join("; ")));
        }
    }

    assert!(failures.is_empty(), "{} of {} cases failed:\n{}", failures.len(), cases.len(), failures.join("\n"));
}

#[cfg(feature = "serde")]
#[test]
fn snapshot_serializes_for_trace_tooling() {
    let mut emu = Emulator::new();
    emu.load_program(&[0xA9, 0x01], 0x0400).expect("fits");
    emu.debug_set_pc(0x0400);

    let StepOutcome::Retired(snapshot) = emu.step() else {
        panic!("LDA should retire");
    };
    let json = serde_json::to_value(snapshot).expect("snapshot serializes");

    assert_eq!(json["pc"], 0x0402);
    assert_eq!(json["a"], 1);
    assert_eq!(json["cycles"], 2);
}
