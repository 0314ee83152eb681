//! Instruction handlers.
//!
//! Every handler receives the register file, the bus and its resolved
//! operand, and reports how PC should move. While a handler runs, PC still
//! points at its opcode; the engine applies the returned [`Control`].
//!
//! Handlers check the operand shape before touching any state, so an
//! [`InvalidOperand`] error always leaves registers and memory untouched.

use emu_core::Bus;

use crate::flags::{self, B, C, D, I, N, V, Z};
use crate::{InvalidOperand, Operand, Registers, Status};

/// Signature shared by every opcode handler.
pub type Handler = fn(&mut Registers, &mut dyn Bus, Operand) -> Result<Control, InvalidOperand>;

/// How the engine moves PC once a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Continue with the next instruction.
    Next,
    /// Continue at the given address.
    Jump(u16),
    /// Conditional branch; PC moves to `target` only when taken.
    Branch { target: u16, taken: bool },
    /// BRK. The engine decides whether this halts or interrupts.
    Break,
}

// ============================================================================
// Operand access
// ============================================================================

fn implied(operand: Operand) -> Result<(), InvalidOperand> {
    match operand {
        Operand::Implied => Ok(()),
        other => Err(InvalidOperand(other)),
    }
}

fn address(operand: Operand) -> Result<u16, InvalidOperand> {
    match operand {
        Operand::Address(address) => Ok(address),
        other => Err(InvalidOperand(other)),
    }
}

fn value(bus: &dyn Bus, operand: Operand) -> Result<u8, InvalidOperand> {
    match operand {
        Operand::Immediate(value) => Ok(value),
        Operand::Address(address) => Ok(bus.read(address)),
        other => Err(InvalidOperand(other)),
    }
}

fn branch(operand: Operand, taken: bool) -> Result<Control, InvalidOperand> {
    match operand {
        Operand::Branch(target) => Ok(Control::Branch { target, taken }),
        other => Err(InvalidOperand(other)),
    }
}

/// Read-modify-write on A or a memory location.
fn modify(
    regs: &mut Registers,
    bus: &mut dyn Bus,
    operand: Operand,
    op: fn(&mut Status, u8) -> u8,
) -> Result<Control, InvalidOperand> {
    match operand {
        Operand::Accumulator => {
            let a = regs.a();
            let result = op(regs.status_mut(), a);
            regs.set_a(result);
        }
        Operand::Address(address) => {
            let result = op(regs.status_mut(), bus.read(address));
            bus.write(address, result);
        }
        other => return Err(InvalidOperand(other)),
    }
    Ok(Control::Next)
}

// ============================================================================
// Loads, stores, transfers
// ============================================================================

pub fn lda(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let val = value(bus, operand)?;
    regs.set_a(val);
    regs.status_mut().update_nz(val);
    Ok(Control::Next)
}

pub fn ldx(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let val = value(bus, operand)?;
    regs.set_x(val);
    regs.status_mut().update_nz(val);
    Ok(Control::Next)
}

pub fn ldy(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let val = value(bus, operand)?;
    regs.set_y(val);
    regs.status_mut().update_nz(val);
    Ok(Control::Next)
}

pub fn sta(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    bus.write(address(operand)?, regs.a());
    Ok(Control::Next)
}

pub fn stx(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    bus.write(address(operand)?, regs.x());
    Ok(Control::Next)
}

pub fn sty(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    bus.write(address(operand)?, regs.y());
    Ok(Control::Next)
}

pub fn tax(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let x = regs.a();
    regs.set_x(x);
    regs.status_mut().update_nz(x);
    Ok(Control::Next)
}

pub fn tay(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let y = regs.a();
    regs.set_y(y);
    regs.status_mut().update_nz(y);
    Ok(Control::Next)
}

pub fn txa(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let a = regs.x();
    regs.set_a(a);
    regs.status_mut().update_nz(a);
    Ok(Control::Next)
}

pub fn tya(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let a = regs.y();
    regs.set_a(a);
    regs.status_mut().update_nz(a);
    Ok(Control::Next)
}

pub fn tsx(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let x = regs.sp();
    regs.set_x(x);
    regs.status_mut().update_nz(x);
    Ok(Control::Next)
}

/// TXS is the only transfer that leaves the flags alone.
pub fn txs(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    regs.set_sp(regs.x());
    Ok(Control::Next)
}

// ============================================================================
// Stack
// ============================================================================

pub fn pha(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let a = regs.a();
    regs.push(bus, a);
    Ok(Control::Next)
}

pub fn pla(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let val = regs.pull(&*bus);
    regs.set_a(val);
    regs.status_mut().update_nz(val);
    Ok(Control::Next)
}

pub fn php(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let p = regs.status().to_byte_brk();
    regs.push(bus, p);
    Ok(Control::Next)
}

pub fn plp(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let p = regs.pull(&*bus);
    regs.status_mut().restore(p);
    Ok(Control::Next)
}

// ============================================================================
// Logic and arithmetic
// ============================================================================

pub fn and(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let result = regs.a() & value(bus, operand)?;
    regs.set_a(result);
    regs.status_mut().update_nz(result);
    Ok(Control::Next)
}

pub fn ora(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let result = regs.a() | value(bus, operand)?;
    regs.set_a(result);
    regs.status_mut().update_nz(result);
    Ok(Control::Next)
}

pub fn eor(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let result = regs.a() ^ value(bus, operand)?;
    regs.set_a(result);
    regs.status_mut().update_nz(result);
    Ok(Control::Next)
}

pub fn bit(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let val = value(bus, operand)?;
    let a = regs.a();
    let status = regs.status_mut();
    status.set_if(Z, a & val == 0);
    status.set_if(N, val & 0x80 != 0);
    status.set_if(V, val & 0x40 != 0);
    Ok(Control::Next)
}

pub fn adc(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let val = value(bus, operand)?;
    if regs.status().decimal_mode() {
        adc_decimal(regs, val);
    } else {
        adc_binary(regs, val);
    }
    Ok(Control::Next)
}

pub fn sbc(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let val = value(bus, operand)?;
    if regs.status().decimal_mode() {
        sbc_decimal(regs, val);
    } else {
        // SBC is ADC with inverted operand
        adc_binary(regs, !val);
    }
    Ok(Control::Next)
}

fn adc_binary(regs: &mut Registers, val: u8) {
    let a = regs.a();
    let (result, carry) = flags::carry_from_addition(a, val, regs.status().carry());
    let status = regs.status_mut();
    status.set_if(C, carry);
    status.set_if(V, flags::overflow_from_addition(a, val, result));
    status.update_nz(result);
    regs.set_a(result);
}

/// NMOS decimal addition. Z comes from the binary sum; N and V come from
/// the intermediate result before the high nibble is adjusted.
// V is taken from `intermediate`, not the binary sum, so 0x79 + 0x01 sets it.
fn adc_decimal(regs: &mut Registers, val: u8) {
    let a = regs.a();
    let carry_in = regs.status().carry();

    let mut lo = u16::from(a & 0x0F) + u16::from(val & 0x0F) + u16::from(carry_in);
    if lo > 9 {
        lo += 6;
    }
    let mut hi = u16::from(a >> 4) + u16::from(val >> 4) + u16::from(lo > 0x0F);

    let (binary, _) = flags::carry_from_addition(a, val, carry_in);
    let intermediate = ((hi << 4) | (lo & 0x0F)) as u8;

    if hi > 9 {
        hi += 6;
    }

    let status = regs.status_mut();
    status.set_if(Z, binary == 0);
    status.set_if(N, intermediate & 0x80 != 0);
    status.set_if(V, flags::overflow_from_addition(a, val, intermediate));
    status.set_if(C, hi > 0x0F);
    regs.set_a(((hi << 4) | (lo & 0x0F)) as u8);
}

/// NMOS decimal subtraction. All flags follow the binary difference.
fn sbc_decimal(regs: &mut Registers, val: u8) {
    let a = regs.a();
    let borrow = i16::from(!regs.status().carry());

    let binary = i16::from(a) - i16::from(val) - borrow;
    let status = regs.status_mut();
    status.set_if(C, binary >= 0);
    status.set_if(Z, binary as u8 == 0);
    status.set_if(N, binary & 0x80 != 0);
    status.set_if(
        V,
        (i16::from(a) ^ binary) & (i16::from(a) ^ i16::from(val)) & 0x80 != 0,
    );

    let mut lo = i16::from(a & 0x0F) - i16::from(val & 0x0F) - borrow;
    let mut hi = i16::from(a >> 4) - i16::from(val >> 4);
    if lo < 0 {
        lo -= 6;
        hi -= 1;
    }
    if hi < 0 {
        hi -= 6;
    }

    regs.set_a(((hi << 4) as u8) | ((lo & 0x0F) as u8));
}

fn compare(status: &mut Status, register: u8, val: u8) {
    let (carry, zero, negative) = flags::compare(register, val);
    status.set_if(C, carry);
    status.set_if(Z, zero);
    status.set_if(N, negative);
}

pub fn cmp(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let val = value(bus, operand)?;
    let a = regs.a();
    compare(regs.status_mut(), a, val);
    Ok(Control::Next)
}

pub fn cpx(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let val = value(bus, operand)?;
    let x = regs.x();
    compare(regs.status_mut(), x, val);
    Ok(Control::Next)
}

pub fn cpy(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let val = value(bus, operand)?;
    let y = regs.y();
    compare(regs.status_mut(), y, val);
    Ok(Control::Next)
}

// ============================================================================
// Increments, decrements, shifts
// ============================================================================

pub fn inc(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let address = address(operand)?;
    let result = bus.read(address).wrapping_add(1);
    bus.write(address, result);
    regs.status_mut().update_nz(result);
    Ok(Control::Next)
}

pub fn dec(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let address = address(operand)?;
    let result = bus.read(address).wrapping_sub(1);
    bus.write(address, result);
    regs.status_mut().update_nz(result);
    Ok(Control::Next)
}

pub fn inx(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let x = regs.x().wrapping_add(1);
    regs.set_x(x);
    regs.status_mut().update_nz(x);
    Ok(Control::Next)
}

pub fn iny(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let y = regs.y().wrapping_add(1);
    regs.set_y(y);
    regs.status_mut().update_nz(y);
    Ok(Control::Next)
}

pub fn dex(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let x = regs.x().wrapping_sub(1);
    regs.set_x(x);
    regs.status_mut().update_nz(x);
    Ok(Control::Next)
}

pub fn dey(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let y = regs.y().wrapping_sub(1);
    regs.set_y(y);
    regs.status_mut().update_nz(y);
    Ok(Control::Next)
}

pub fn asl(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    modify(regs, bus, operand, |status, val| {
        status.set_if(C, val & 0x80 != 0);
        let result = val << 1;
        status.update_nz(result);
        result
    })
}

pub fn lsr(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    modify(regs, bus, operand, |status, val| {
        status.set_if(C, val & 0x01 != 0);
        let result = val >> 1;
        status.update_nz(result);
        result
    })
}

pub fn rol(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    modify(regs, bus, operand, |status, val| {
        let carry = u8::from(status.carry());
        status.set_if(C, val & 0x80 != 0);
        let result = (val << 1) | carry;
        status.update_nz(result);
        result
    })
}

pub fn ror(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    modify(regs, bus, operand, |status, val| {
        let carry = if status.carry() { 0x80 } else { 0 };
        status.set_if(C, val & 0x01 != 0);
        let result = (val >> 1) | carry;
        status.update_nz(result);
        result
    })
}

// ============================================================================
// Jumps, subroutines, branches
// ============================================================================

pub fn jmp(_regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    Ok(Control::Jump(address(operand)?))
}

/// JSR pushes the address of its own last byte; RTS adds one on return.
pub fn jsr(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    let target = address(operand)?;
    let return_addr = regs.pc().wrapping_add(2);
    regs.push_word(bus, return_addr);
    Ok(Control::Jump(target))
}

pub fn rts(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let return_addr = regs.pull_word(&*bus);
    Ok(Control::Jump(return_addr.wrapping_add(1)))
}

pub fn rti(regs: &mut Registers, bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    let p = regs.pull(&*bus);
    regs.status_mut().restore(p);
    let pc = regs.pull_word(&*bus);
    Ok(Control::Jump(pc))
}

pub fn bcc(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    branch(operand, !regs.status().is_set(C))
}

pub fn bcs(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    branch(operand, regs.status().is_set(C))
}

pub fn bne(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    branch(operand, !regs.status().is_set(Z))
}

pub fn beq(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    branch(operand, regs.status().is_set(Z))
}

pub fn bpl(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    branch(operand, !regs.status().is_set(N))
}

pub fn bmi(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    branch(operand, regs.status().is_set(N))
}

pub fn bvc(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    branch(operand, !regs.status().is_set(V))
}

pub fn bvs(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    branch(operand, regs.status().is_set(V))
}

// ============================================================================
// Flags, NOP, BRK
// ============================================================================

fn set_flag(regs: &mut Registers, operand: Operand, flag: u8, set: bool) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    regs.status_mut().set_if(flag, set);
    Ok(Control::Next)
}

pub fn clc(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    set_flag(regs, operand, C, false)
}

pub fn sec(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    set_flag(regs, operand, C, true)
}

pub fn cli(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    set_flag(regs, operand, I, false)
}

pub fn sei(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    set_flag(regs, operand, I, true)
}

pub fn cld(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    set_flag(regs, operand, D, false)
}

pub fn sed(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    set_flag(regs, operand, D, true)
}

pub fn clv(regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    set_flag(regs, operand, V, false)
}

pub fn nop(_regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    Ok(Control::Next)
}

/// BRK has no effect of its own here: halting or the interrupt sequence is
/// the engine's decision.
pub fn brk(_regs: &mut Registers, _bus: &mut dyn Bus, operand: Operand) -> Result<Control, InvalidOperand> {
    implied(operand)?;
    Ok(Control::Break)
}

/// Push PC and P, set I, and return the handler address from `vector`.
/// `brk` selects the pushed B bit.
pub(crate) fn enter_interrupt(regs: &mut Registers, bus: &mut dyn Bus, return_addr: u16, vector: u16, brk: bool) -> u16 {
    regs.push_word(bus, return_addr);
    let p = if brk {
        regs.status().to_byte_brk()
    } else {
        regs.status().to_byte_irq()
    };
    regs.push(bus, p);
    let status = regs.status_mut();
    status.set(I);
    status.set_if(B, brk);
    bus.read_word(vector)
}
