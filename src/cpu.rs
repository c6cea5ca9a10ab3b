//! The instruction table and handler family (§4.5, §4.6): the one place
//! that turns a compiled `Instruction` into state mutation on a
//! `Machine`. Dispatch is a plain `match` over the tagged `Mnemonic` —
//! no string hashing happens here, that cost was already paid once at
//! load time by `op::compile` (§9 "Instruction dispatch").

use crate::error::Error;
use crate::machine::Machine;
use crate::op::{Instruction, Mnemonic, StringOp};
use crate::operand::{MemoryOperand, Operand, Width};
use crate::register::{R16, R8};

const DEBUG_STUBS: bool = false;

/// Executes one already-compiled instruction against `m`. Returning
/// `Err(Error::Halt)` is how HLT signals the stepper to finish (§4.8);
/// every other error is a genuine failure.
pub fn execute(m: &mut Machine, instr: &Instruction) -> Result<(), Error> {
    use Mnemonic::*;
    match instr.mnemonic {
        Mov => exec_mov(m, instr),
        Push => exec_push(m, instr),
        Pop => exec_pop(m, instr),
        Xchg => exec_xchg(m, instr),
        Lea => exec_lea(m, instr),
        Lds => exec_lds_les(m, instr, crate::register::SReg::DS),
        Les => exec_lds_les(m, instr, crate::register::SReg::ES),
        Lahf => {
            let low = (m.flags().u16() & 0xFF) as u8;
            m.set_r8(R8::AH, low);
            Ok(())
        }
        Sahf => {
            let ah = m.r8(R8::AH);
            let merged = (m.flags().u16() & 0xFF00) | u16::from(ah);
            m.flags_mut().set_u16(merged);
            Ok(())
        }
        Pushf => {
            let flags = m.flags().u16();
            m.push_word(flags)
        }
        Popf => {
            let val = m.pop_word()?;
            m.flags_mut().set_u16(val);
            Ok(())
        }
        Pusha => exec_pusha(m),
        Popa => exec_popa(m),

        Add => exec_add(m, instr, false),
        Adc => exec_add(m, instr, true),
        Sub => exec_sub(m, instr, false).map(|_| ()),
        Sbb => exec_sub(m, instr, true).map(|_| ()),
        Inc => exec_inc_dec(m, instr, true),
        Dec => exec_inc_dec(m, instr, false),
        Neg => exec_neg(m, instr),
        Mul => exec_mul(m, instr, false),
        Imul => exec_mul(m, instr, true),
        Div => exec_div(m, instr, false),
        Idiv => exec_div(m, instr, true),
        Cbw => {
            let al = m.r8(R8::AL);
            m.set_r8(R8::AH, if al & 0x80 != 0 { 0xFF } else { 0x00 });
            Ok(())
        }
        Cwd => {
            let ax = m.r16(R16::AX);
            m.set_r16(R16::DX, if ax & 0x8000 != 0 { 0xFFFF } else { 0x0000 });
            Ok(())
        }
        Aaa => {
            exec_aaa_aas(m, true);
            Ok(())
        }
        Aas => {
            exec_aaa_aas(m, false);
            Ok(())
        }
        Daa => {
            exec_daa_das(m, true);
            Ok(())
        }
        Das => {
            exec_daa_das(m, false);
            Ok(())
        }
        Aam => {
            let al = m.r8(R8::AL);
            m.set_r8(R8::AH, al / 10);
            m.set_r8(R8::AL, al % 10);
            m.flags_mut().update(u32::from(m.r16(R16::AX)), false, false);
            Ok(())
        }
        Aad => {
            let al = u16::from(m.r8(R8::AL));
            let ah = u16::from(m.r8(R8::AH));
            let result = (ah.wrapping_mul(10).wrapping_add(al)) & 0xFF;
            m.set_r8(R8::AL, result as u8);
            m.set_r8(R8::AH, 0);
            m.flags_mut().update(u32::from(result), true, false);
            Ok(())
        }

        And => exec_logical(m, instr, |a, b| a & b),
        Or => exec_logical(m, instr, |a, b| a | b),
        Xor => exec_logical(m, instr, |a, b| a ^ b),
        Not => exec_not(m, instr),
        Test => exec_logical_no_store(m, instr, |a, b| a & b),
        Cmp => exec_sub(m, instr, false).map(|_| ()),

        Shl | Sal => exec_shift(m, instr, ShiftKind::Shl),
        Shr => exec_shift(m, instr, ShiftKind::Shr),
        Sar => exec_shift(m, instr, ShiftKind::Sar),
        Rol => exec_shift(m, instr, ShiftKind::Rol),
        Ror => exec_shift(m, instr, ShiftKind::Ror),
        Rcl => exec_shift(m, instr, ShiftKind::Rcl),
        Rcr => exec_shift(m, instr, ShiftKind::Rcr),

        Movsb => exec_string_step(m, StringOp::Movsb),
        Movsw => exec_string_step(m, StringOp::Movsw),
        Cmpsb => exec_string_step(m, StringOp::Cmpsb),
        Cmpsw => exec_string_step(m, StringOp::Cmpsw),
        Scasb => exec_string_step(m, StringOp::Scasb),
        Scasw => exec_string_step(m, StringOp::Scasw),
        Lodsb => exec_string_step(m, StringOp::Lodsb),
        Lodsw => exec_string_step(m, StringOp::Lodsw),
        Stosb => exec_string_step(m, StringOp::Stosb),
        Stosw => exec_string_step(m, StringOp::Stosw),

        Rep(op) => exec_rep(m, op, RepKind::Plain),
        Repe(op) => exec_rep(m, op, RepKind::WhileZero),
        Repne(op) => exec_rep(m, op, RepKind::WhileNotZero),

        Jmp => {
            let target = label_target(m, &instr.operands[0])?;
            m.set_ip(target);
            Ok(())
        }
        Call => {
            let target = label_target(m, &instr.operands[0])?;
            let ret = m.ip() as u16;
            m.push_word(ret)?;
            m.set_ip(target);
            Ok(())
        }
        Ret => {
            let ip = m.pop_word()?;
            m.set_ip(ip as usize);
            Ok(())
        }
        Retf => {
            let ip = m.pop_word()?;
            m.set_ip(ip as usize);
            let cs = m.pop_word()?;
            m.set_sreg(crate::register::SReg::CS, cs);
            Ok(())
        }

        Je => branch_if(m, instr, m.flags().zero),
        Jne => branch_if(m, instr, !m.flags().zero),
        Jb => branch_if(m, instr, m.flags().carry),
        Jnb => branch_if(m, instr, !m.flags().carry),
        Jbe => branch_if(m, instr, m.flags().carry || m.flags().zero),
        Ja => branch_if(m, instr, !m.flags().carry && !m.flags().zero),
        Jl => branch_if(m, instr, m.flags().sign != m.flags().overflow),
        Jnl => branch_if(m, instr, m.flags().sign == m.flags().overflow),
        Jle => branch_if(m, instr, m.flags().zero || (m.flags().sign != m.flags().overflow)),
        Jg => branch_if(m, instr, !m.flags().zero && (m.flags().sign == m.flags().overflow)),
        Jp => branch_if(m, instr, m.flags().parity),
        Jnp => branch_if(m, instr, !m.flags().parity),
        Jo => branch_if(m, instr, m.flags().overflow),
        Jno => branch_if(m, instr, !m.flags().overflow),
        Js => branch_if(m, instr, m.flags().sign),
        Jns => branch_if(m, instr, !m.flags().sign),
        Jcxz => branch_if(m, instr, m.r16(R16::CX) == 0),
        Loop => exec_loop(m, instr, LoopKind::Plain),
        Loopz => exec_loop(m, instr, LoopKind::WhileZero),
        Loopnz => exec_loop(m, instr, LoopKind::WhileNotZero),

        Clc => {
            m.flags_mut().carry = false;
            Ok(())
        }
        Stc => {
            m.flags_mut().carry = true;
            Ok(())
        }
        Cmc => {
            let c = m.flags().carry;
            m.flags_mut().carry = !c;
            Ok(())
        }
        Cld => {
            m.flags_mut().direction = false;
            Ok(())
        }
        Std => {
            m.flags_mut().direction = true;
            Ok(())
        }
        Cli => {
            m.flags_mut().interrupt = false;
            Ok(())
        }
        Sti => {
            m.flags_mut().interrupt = true;
            Ok(())
        }
        Hlt => Err(Error::Halt),
        Nop | Wait | Lock => Ok(()),
        Esc => Err(Error::Unimplemented("ESC".into())),
        Xlat => {
            let addr = m.r16(R16::BX).wrapping_add(u16::from(m.r8(R8::AL)));
            let val = m.read_byte(u32::from(addr))?;
            m.set_r8(R8::AL, val);
            Ok(())
        }

        Int => exec_int(m, instr),
        Into => {
            if m.flags().overflow {
                exec_int_number(m, 4)?;
            }
            Ok(())
        }
        Iret => {
            let ip = m.pop_word()?;
            let cs = m.pop_word()?;
            let flags = m.pop_word()?;
            m.set_ip(ip as usize);
            m.set_sreg(crate::register::SReg::CS, cs);
            m.flags_mut().set_u16(flags);
            Ok(())
        }
        In => exec_in(m, instr),
        Out => exec_out(instr),
    }
}

// --- operand access -----------------------------------------------------

fn effective_address(m: &Machine, mem: &MemoryOperand) -> u16 {
    let base_val = mem.base.map(|r| m.r16(r)).unwrap_or(0);
    let index_val = mem.index.map(|r| m.r16(r)).unwrap_or(0);
    mem.effective_address(base_val, index_val)
}

fn read_wide(m: &Machine, op: &Operand, is_byte: bool) -> Result<u32, Error> {
    match op {
        Operand::Reg8(r) => Ok(u32::from(m.r8(*r))),
        Operand::Reg16(r) => Ok(u32::from(m.r16(*r))),
        Operand::Imm(v) => Ok(if is_byte { v & 0xFF } else { v & 0xFFFF }),
        Operand::Mem(mem, _) => {
            let ea = effective_address(m, mem);
            if is_byte {
                Ok(u32::from(m.read_byte(u32::from(ea))?))
            } else {
                Ok(u32::from(m.read_word(u32::from(ea))?))
            }
        }
        Operand::Label(l) => Err(Error::OperandMismatch(format!("'{}' is not a value", l))),
    }
}

fn write_wide(m: &mut Machine, op: &Operand, is_byte: bool, val: u32) -> Result<(), Error> {
    match op {
        Operand::Reg8(r) => {
            m.set_r8(*r, val as u8);
            Ok(())
        }
        Operand::Reg16(r) => {
            m.set_r16(*r, val as u16);
            Ok(())
        }
        Operand::Mem(mem, _) => {
            let ea = effective_address(m, mem);
            if is_byte {
                m.write_byte(u32::from(ea), val as u8)
            } else {
                m.write_word(u32::from(ea), val as u16)
            }
        }
        _ => Err(Error::OperandMismatch("cannot write to this operand".into())),
    }
}

fn operand_width(op: &Operand) -> Option<bool> {
    match op {
        Operand::Reg8(_) => Some(true),
        Operand::Reg16(_) => Some(false),
        Operand::Mem(_, Some(Width::Byte)) => Some(true),
        Operand::Mem(_, Some(Width::Word)) => Some(false),
        _ => None,
    }
}

/// Width resolution for a two-operand instruction (§4.1): the
/// destination's width wins when it carries one; otherwise the
/// source's; an immediate-into-unhinted-memory pair defaults to word.
fn resolve_width(dest: &Operand, src: &Operand) -> Result<bool, Error> {
    match (operand_width(dest), operand_width(src)) {
        (Some(a), Some(b)) if a != b => Err(Error::OperandMismatch(
            "cannot mix 8-bit and 16-bit operands".into(),
        )),
        (Some(a), _) => Ok(a),
        (None, Some(b)) => Ok(b),
        (None, None) => Ok(false),
    }
}

fn label_target(m: &Machine, op: &Operand) -> Result<usize, Error> {
    match op {
        Operand::Label(name) => m
            .label_address(name)
            .ok_or_else(|| Error::UnknownLabel(name.clone())),
        other => Err(Error::OperandMismatch(format!("{:?} is not a branch target", other))),
    }
}

// --- data transfer --------------------------------------------------------

fn exec_mov(m: &mut Machine, instr: &Instruction) -> Result<(), Error> {
    let (dest, src) = (&instr.operands[0], &instr.operands[1]);
    let is_byte = resolve_width(dest, src)?;
    let val = read_wide(m, src, is_byte)?;
    write_wide(m, dest, is_byte, val)
}

fn exec_push(m: &mut Machine, instr: &Instruction) -> Result<(), Error> {
    let op = &instr.operands[0];
    if op.is_reg8() {
        return Err(Error::OperandMismatch("PUSH requires a 16-bit operand".into()));
    }
    let val = read_wide(m, op, false)? as u16;
    m.push_word(val)
}

fn exec_pop(m: &mut Machine, instr: &Instruction) -> Result<(), Error> {
    let op = &instr.operands[0];
    if op.is_reg8() || op.is_imm() {
        return Err(Error::OperandMismatch("POP requires a 16-bit register or memory destination".into()));
    }
    let val = m.pop_word()?;
    write_wide(m, op, false, u32::from(val))
}

fn exec_xchg(m: &mut Machine, instr: &Instruction) -> Result<(), Error> {
    let (a, b) = (&instr.operands[0], &instr.operands[1]);
    if a.is_mem() && b.is_mem() {
        return Err(Error::OperandMismatch("XCHG between two memory operands is not supported".into()));
    }
    let is_byte = resolve_width(a, b)?;
    let va = read_wide(m, a, is_byte)?;
    let vb = read_wide(m, b, is_byte)?;
    write_wide(m, a, is_byte, vb)?;
    write_wide(m, b, is_byte, va)
}

fn exec_lea(m: &mut Machine, instr: &Instruction) -> Result<(), Error> {
    let (dest, src) = (&instr.operands[0], &instr.operands[1]);
    let r = match dest {
        Operand::Reg16(r) => *r,
        _ => return Err(Error::OperandMismatch("LEA requires a 16-bit register destination".into())),
    };
    let mem = match src {
        Operand::Mem(mem, _) => mem,
        _ => return Err(Error::OperandMismatch("LEA requires a memory source".into())),
    };
    let ea = effective_address(m, mem);
    m.set_r16(r, ea);
    Ok(())
}

fn exec_lds_les(m: &mut Machine, instr: &Instruction, sreg: crate::register::SReg) -> Result<(), Error> {
    let (dest, src) = (&instr.operands[0], &instr.operands[1]);
    let r = match dest {
        Operand::Reg16(r) => *r,
        _ => return Err(Error::OperandMismatch("LDS/LES requires a 16-bit register destination".into())),
    };
    let mem = match src {
        Operand::Mem(mem, _) => mem,
        _ => return Err(Error::OperandMismatch("LDS/LES requires a memory source".into())),
    };
    let ea = effective_address(m, mem);
    let offset = m.read_word(u32::from(ea))?;
    let segment = m.read_word(u32::from(ea.wrapping_add(2)))?;
    m.set_r16(r, offset);
    m.set_sreg(sreg, segment);
    Ok(())
}

fn exec_pusha(m: &mut Machine) -> Result<(), Error> {
    let original_sp = m.r16(R16::SP);
    m.push_word(m.r16(R16::AX))?;
    m.push_word(m.r16(R16::CX))?;
    m.push_word(m.r16(R16::DX))?;
    m.push_word(m.r16(R16::BX))?;
    m.push_word(original_sp)?;
    m.push_word(m.r16(R16::BP))?;
    m.push_word(m.r16(R16::SI))?;
    m.push_word(m.r16(R16::DI))?;
    Ok(())
}

fn exec_popa(m: &mut Machine) -> Result<(), Error> {
    let di = m.pop_word()?;
    m.set_r16(R16::DI, di);
    let si = m.pop_word()?;
    m.set_r16(R16::SI, si);
    let bp = m.pop_word()?;
    m.set_r16(R16::BP, bp);
    m.pop_word()?; // the saved SP slot, discarded
    let bx = m.pop_word()?;
    m.set_r16(R16::BX, bx);
    let dx = m.pop_word()?;
    m.set_r16(R16::DX, dx);
    let cx = m.pop_word()?;
    m.set_r16(R16::CX, cx);
    let ax = m.pop_word()?;
    m.set_r16(R16::AX, ax);
    Ok(())
}

// --- arithmetic -------------------------------------------------------------

fn exec_add(m: &mut Machine, instr: &Instruction, with_carry: bool) -> Result<(), Error> {
    let (dest, src) = (&instr.operands[0], &instr.operands[1]);
    let is_byte = resolve_width(dest, src)?;
    let a = read_wide(m, dest, is_byte)?;
    let b = read_wide(m, src, is_byte)?;
    let cin = if with_carry && m.flags().carry { 1 } else { 0 };
    let b_with_carry = b + cin;
    let wide = a + b_with_carry;
    write_wide(m, dest, is_byte, wide)?;
    m.flags_mut().update(wide, is_byte, true);
    m.flags_mut().set_add_overflow(a, b_with_carry, wide, is_byte);
    Ok(())
}

/// Shared by SUB/SBB/CMP/CMPSx/SCASx: computes `a - b - borrow` in a
/// container one size wider than the operand (§4.4), updates ZF/SF/PF/CF
/// and OF/AF, and returns the wide (pre-mask) result so the caller can
/// decide whether to store it.
fn sub_wide(a: u32, b: u32, borrow: u32, is_byte: bool) -> u32 {
    if is_byte {
        ((a as i32 - b as i32 - borrow as i32) as u16) as u32
    } else {
        (a as i64 - b as i64 - borrow as i64) as u32
    }
}

fn exec_sub(m: &mut Machine, instr: &Instruction, with_borrow: bool) -> Result<u32, Error> {
    let (dest, src) = (&instr.operands[0], &instr.operands[1]);
    let is_byte = resolve_width(dest, src)?;
    let a = read_wide(m, dest, is_byte)?;
    let b = read_wide(m, src, is_byte)?;
    let bin = if with_borrow && m.flags().carry { 1 } else { 0 };
    let wide = sub_wide(a, b, bin, is_byte);
    let is_cmp = matches!(instr.mnemonic, Mnemonic::Cmp);
    if !is_cmp {
        write_wide(m, dest, is_byte, wide)?;
    }
    m.flags_mut().update(wide, is_byte, true);
    m.flags_mut().set_sub_overflow(a, b, wide, is_byte);
    Ok(wide)
}

fn exec_inc_dec(m: &mut Machine, instr: &Instruction, is_inc: bool) -> Result<(), Error> {
    let dest = &instr.operands[0];
    let is_byte = operand_width(dest).unwrap_or(false);
    let a = read_wide(m, dest, is_byte)?;
    let wide = if is_inc {
        a + 1
    } else {
        sub_wide(a, 1, 0, is_byte)
    };
    write_wide(m, dest, is_byte, wide)?;
    m.flags_mut().update(wide, is_byte, false);
    if is_inc {
        m.flags_mut().set_add_overflow(a, 1, wide, is_byte);
    } else {
        m.flags_mut().set_sub_overflow(a, 1, wide, is_byte);
    }
    Ok(())
}

fn exec_neg(m: &mut Machine, instr: &Instruction) -> Result<(), Error> {
    let dest = &instr.operands[0];
    let is_byte = operand_width(dest).unwrap_or(false);
    let a = read_wide(m, dest, is_byte)?;
    let wide = sub_wide(0, a, 0, is_byte);
    write_wide(m, dest, is_byte, wide)?;
    m.flags_mut().update(wide, is_byte, true);
    m.flags_mut().set_neg_overflow(a, wide, is_byte);
    Ok(())
}

fn exec_mul(m: &mut Machine, instr: &Instruction, signed: bool) -> Result<(), Error> {
    let src = &instr.operands[0];
    let is_byte = operand_width(src).unwrap_or(false);
    let overflowed;
    if is_byte {
        let al = m.r8(R8::AL);
        let rhs = read_wide(m, src, true)? as u8;
        let product: u32 = if signed {
            ((al as i8 as i32) * (rhs as i8 as i32)) as u32 & 0xFFFF
        } else {
            u32::from(al) * u32::from(rhs)
        };
        m.set_r16(R16::AX, product as u16);
        overflowed = if signed {
            let p = product as u16 as i16;
            i32::from(p) != (al as i8 as i32) * (rhs as i8 as i32)
        } else {
            (product >> 8) != 0
        };
    } else {
        let ax = m.r16(R16::AX);
        let rhs = read_wide(m, src, false)? as u16;
        let product: u64 = if signed {
            ((ax as i16 as i64) * (rhs as i16 as i64)) as u64 & 0xFFFF_FFFF
        } else {
            u64::from(ax) * u64::from(rhs)
        };
        m.set_r16(R16::AX, product as u16);
        m.set_r16(R16::DX, (product >> 16) as u16);
        overflowed = if signed {
            let p = product as u32 as i32;
            i64::from(p) != (ax as i16 as i64) * (rhs as i16 as i64)
        } else {
            (product >> 16) != 0
        };
    }
    m.flags_mut().update(u32::from(m.r16(R16::AX)), false, false);
    m.flags_mut().carry = overflowed;
    m.flags_mut().overflow = overflowed;
    Ok(())
}

fn exec_div(m: &mut Machine, instr: &Instruction, signed: bool) -> Result<(), Error> {
    let src = &instr.operands[0];
    let is_byte = operand_width(src).unwrap_or(false);
    if is_byte {
        let divisor = read_wide(m, src, true)? as u8;
        if divisor == 0 {
            return Err(Error::DivisionByZero);
        }
        let ax = m.r16(R16::AX);
        if signed {
            let dividend = ax as i16;
            let d = divisor as i8;
            m.set_r8(R8::AL, (dividend / i16::from(d)) as u8);
            m.set_r8(R8::AH, (dividend % i16::from(d)) as u8);
        } else {
            m.set_r8(R8::AL, (ax / u16::from(divisor)) as u8);
            m.set_r8(R8::AH, (ax % u16::from(divisor)) as u8);
        }
    } else {
        let divisor = read_wide(m, src, false)? as u16;
        if divisor == 0 {
            return Err(Error::DivisionByZero);
        }
        let dividend = (u32::from(m.r16(R16::DX)) << 16) | u32::from(m.r16(R16::AX));
        if signed {
            let dividend = dividend as i32;
            let d = divisor as i16;
            m.set_r16(R16::AX, (dividend / i32::from(d)) as u16);
            m.set_r16(R16::DX, (dividend % i32::from(d)) as u16);
        } else {
            m.set_r16(R16::AX, (dividend / u32::from(divisor)) as u16);
            m.set_r16(R16::DX, (dividend % u32::from(divisor)) as u16);
        }
    }
    Ok(())
}

fn exec_aaa_aas(m: &mut Machine, is_add: bool) {
    let al = m.r8(R8::AL);
    if (al & 0x0F) > 9 || m.flags().auxiliary {
        if is_add {
            m.set_r8(R8::AL, al.wrapping_add(6));
            m.set_r8(R8::AH, m.r8(R8::AH).wrapping_add(1));
        } else {
            m.set_r8(R8::AL, al.wrapping_sub(6));
            m.set_r8(R8::AH, m.r8(R8::AH).wrapping_sub(1));
        }
        m.flags_mut().auxiliary = true;
        m.flags_mut().carry = true;
    } else {
        m.flags_mut().auxiliary = false;
        m.flags_mut().carry = false;
    }
    m.set_r8(R8::AL, m.r8(R8::AL) & 0x0F);
}

fn exec_daa_das(m: &mut Machine, is_add: bool) {
    let old_al = m.r8(R8::AL);
    let old_cf = m.flags().carry;
    m.flags_mut().carry = false;
    if (old_al & 0x0F) > 9 || m.flags().auxiliary {
        let al = m.r8(R8::AL);
        m.set_r8(R8::AL, if is_add { al.wrapping_add(6) } else { al.wrapping_sub(6) });
        m.flags_mut().auxiliary = true;
    } else {
        m.flags_mut().auxiliary = false;
    }
    if old_al > 0x99 || old_cf {
        let al = m.r8(R8::AL);
        m.set_r8(R8::AL, if is_add { al.wrapping_add(0x60) } else { al.wrapping_sub(0x60) });
        m.flags_mut().carry = true;
    }
    let al = m.r8(R8::AL);
    m.flags_mut().update(u32::from(al), true, false);
}

// --- logical / compare ------------------------------------------------------

fn exec_logical(m: &mut Machine, instr: &Instruction, f: fn(u32, u32) -> u32) -> Result<(), Error> {
    let (dest, src) = (&instr.operands[0], &instr.operands[1]);
    let is_byte = resolve_width(dest, src)?;
    let a = read_wide(m, dest, is_byte)?;
    let b = read_wide(m, src, is_byte)?;
    let result = f(a, b);
    write_wide(m, dest, is_byte, result)?;
    m.flags_mut().update(result, is_byte, false);
    m.flags_mut().carry = false;
    m.flags_mut().overflow = false;
    Ok(())
}

fn exec_logical_no_store(m: &mut Machine, instr: &Instruction, f: fn(u32, u32) -> u32) -> Result<(), Error> {
    let (dest, src) = (&instr.operands[0], &instr.operands[1]);
    let is_byte = resolve_width(dest, src)?;
    let a = read_wide(m, dest, is_byte)?;
    let b = read_wide(m, src, is_byte)?;
    let result = f(a, b);
    m.flags_mut().update(result, is_byte, false);
    m.flags_mut().carry = false;
    m.flags_mut().overflow = false;
    Ok(())
}

fn exec_not(m: &mut Machine, instr: &Instruction) -> Result<(), Error> {
    let dest = &instr.operands[0];
    let is_byte = operand_width(dest).unwrap_or(false);
    let a = read_wide(m, dest, is_byte)?;
    let mask = if is_byte { 0xFF } else { 0xFFFF };
    write_wide(m, dest, is_byte, !a & mask)
}

// --- shift / rotate ---------------------------------------------------------

#[derive(Copy, Clone)]
enum ShiftKind {
    Shl,
    Shr,
    Sar,
    Rol,
    Ror,
    Rcl,
    Rcr,
}

fn exec_shift(m: &mut Machine, instr: &Instruction, kind: ShiftKind) -> Result<(), Error> {
    let (dest, count_op) = (&instr.operands[0], &instr.operands[1]);
    let is_byte = operand_width(dest).unwrap_or(false);
    let count = (read_wide(m, count_op, true)? & 0x1F) as u32;
    if count == 0 {
        return Ok(());
    }
    let sign_bit = if is_byte { 0x80u32 } else { 0x8000u32 };
    let top_bit = sign_bit;
    let mut val = read_wide(m, dest, is_byte)?;
    let mut carry = m.flags().carry;
    match kind {
        ShiftKind::Shl => {
            for _ in 0..count {
                carry = val & top_bit != 0;
                val = (val << 1) & (if is_byte { 0xFF } else { 0xFFFF });
            }
            write_wide(m, dest, is_byte, val)?;
            m.flags_mut().carry = carry;
            m.flags_mut().update(val, is_byte, false);
        }
        ShiftKind::Shr => {
            for _ in 0..count {
                carry = val & 1 != 0;
                val >>= 1;
            }
            write_wide(m, dest, is_byte, val)?;
            m.flags_mut().carry = carry;
            m.flags_mut().update(val, is_byte, false);
        }
        ShiftKind::Sar => {
            let sign = val & sign_bit != 0;
            for _ in 0..count {
                carry = val & 1 != 0;
                val = (val >> 1) | (if sign { sign_bit } else { 0 });
            }
            write_wide(m, dest, is_byte, val)?;
            m.flags_mut().carry = carry;
            m.flags_mut().update(val, is_byte, false);
        }
        ShiftKind::Rol => {
            for _ in 0..count {
                carry = val & top_bit != 0;
                val = ((val << 1) | (if carry { 1 } else { 0 })) & (if is_byte { 0xFF } else { 0xFFFF });
            }
            write_wide(m, dest, is_byte, val)?;
            m.flags_mut().carry = carry;
        }
        ShiftKind::Ror => {
            for _ in 0..count {
                carry = val & 1 != 0;
                val = (val >> 1) | (if carry { top_bit } else { 0 });
            }
            write_wide(m, dest, is_byte, val)?;
            m.flags_mut().carry = carry;
        }
        ShiftKind::Rcl => {
            for _ in 0..count {
                let new_carry = val & top_bit != 0;
                val = ((val << 1) | (if carry { 1 } else { 0 })) & (if is_byte { 0xFF } else { 0xFFFF });
                carry = new_carry;
            }
            write_wide(m, dest, is_byte, val)?;
            m.flags_mut().carry = carry;
        }
        ShiftKind::Rcr => {
            for _ in 0..count {
                let new_carry = val & 1 != 0;
                val = (val >> 1) | (if carry { top_bit } else { 0 });
                carry = new_carry;
            }
            write_wide(m, dest, is_byte, val)?;
            m.flags_mut().carry = carry;
        }
    }
    Ok(())
}

// --- string primitives -------------------------------------------------------

fn step_direction(m: &Machine, is_word: bool) -> u16 {
    let delta: i16 = if is_word { 2 } else { 1 };
    if m.flags().direction {
        (0u16).wrapping_sub(delta as u16)
    } else {
        delta as u16
    }
}

fn exec_string_step(m: &mut Machine, op: StringOp) -> Result<(), Error> {
    use StringOp::*;
    let is_word = matches!(op, Movsw | Cmpsw | Scasw | Lodsw | Stosw);
    let step = step_direction(m, is_word);
    match op {
        Movsb | Movsw => {
            let si = m.r16(R16::SI);
            let di = m.r16(R16::DI);
            if is_word {
                let val = m.read_word(u32::from(si))?;
                m.write_word(u32::from(di), val)?;
            } else {
                let val = m.read_byte(u32::from(si))?;
                m.write_byte(u32::from(di), val)?;
            }
            m.set_r16(R16::SI, si.wrapping_add(step));
            m.set_r16(R16::DI, di.wrapping_add(step));
        }
        Cmpsb | Cmpsw => {
            let si = m.r16(R16::SI);
            let di = m.r16(R16::DI);
            let is_byte = !is_word;
            let a = if is_word { u32::from(m.read_word(u32::from(si))?) } else { u32::from(m.read_byte(u32::from(si))?) };
            let b = if is_word { u32::from(m.read_word(u32::from(di))?) } else { u32::from(m.read_byte(u32::from(di))?) };
            let wide = sub_wide(a, b, 0, is_byte);
            m.flags_mut().update(wide, is_byte, true);
            m.flags_mut().set_sub_overflow(a, b, wide, is_byte);
            m.set_r16(R16::SI, si.wrapping_add(step));
            m.set_r16(R16::DI, di.wrapping_add(step));
        }
        Scasb | Scasw => {
            let di = m.r16(R16::DI);
            let is_byte = !is_word;
            let a = if is_word { u32::from(m.r16(R16::AX)) } else { u32::from(m.r8(R8::AL)) };
            let b = if is_word { u32::from(m.read_word(u32::from(di))?) } else { u32::from(m.read_byte(u32::from(di))?) };
            let wide = sub_wide(a, b, 0, is_byte);
            m.flags_mut().update(wide, is_byte, true);
            m.flags_mut().set_sub_overflow(a, b, wide, is_byte);
            m.set_r16(R16::DI, di.wrapping_add(step));
        }
        Lodsb | Lodsw => {
            let si = m.r16(R16::SI);
            if is_word {
                let val = m.read_word(u32::from(si))?;
                m.set_r16(R16::AX, val);
            } else {
                let val = m.read_byte(u32::from(si))?;
                m.set_r8(R8::AL, val);
            }
            m.set_r16(R16::SI, si.wrapping_add(step));
        }
        Stosb | Stosw => {
            let di = m.r16(R16::DI);
            if is_word {
                let val = m.r16(R16::AX);
                m.write_word(u32::from(di), val)?;
            } else {
                let val = m.r8(R8::AL);
                m.write_byte(u32::from(di), val)?;
            }
            m.set_r16(R16::DI, di.wrapping_add(step));
        }
    }
    Ok(())
}

enum RepKind {
    Plain,
    WhileZero,
    WhileNotZero,
}

fn exec_rep(m: &mut Machine, op: StringOp, kind: RepKind) -> Result<(), Error> {
    loop {
        let cx = m.r16(R16::CX);
        if cx == 0 {
            return Ok(());
        }
        exec_string_step(m, op)?;
        m.set_r16(R16::CX, cx.wrapping_sub(1));
        let should_continue = match kind {
            RepKind::Plain => true,
            RepKind::WhileZero => m.flags().zero,
            RepKind::WhileNotZero => !m.flags().zero,
        };
        if !should_continue {
            return Ok(());
        }
    }
}

// --- control transfer --------------------------------------------------------

fn branch_if(m: &mut Machine, instr: &Instruction, condition: bool) -> Result<(), Error> {
    if condition {
        let target = label_target(m, &instr.operands[0])?;
        m.set_ip(target);
    }
    Ok(())
}

enum LoopKind {
    Plain,
    WhileZero,
    WhileNotZero,
}

fn exec_loop(m: &mut Machine, instr: &Instruction, kind: LoopKind) -> Result<(), Error> {
    let cx = m.r16(R16::CX).wrapping_sub(1);
    m.set_r16(R16::CX, cx);
    let take = match kind {
        LoopKind::Plain => cx != 0,
        LoopKind::WhileZero => cx != 0 && m.flags().zero,
        LoopKind::WhileNotZero => cx != 0 && !m.flags().zero,
    };
    if take {
        let target = label_target(m, &instr.operands[0])?;
        m.set_ip(target);
    }
    Ok(())
}

// --- interrupts / IO stubs ---------------------------------------------------

fn exec_int(m: &mut Machine, instr: &Instruction) -> Result<(), Error> {
    let number = read_wide(m, &instr.operands[0], true)? as u8;
    exec_int_number(m, number)
}

fn exec_int_number(m: &mut Machine, number: u8) -> Result<(), Error> {
    if DEBUG_STUBS {
        println!("simulated INT {:02X}h", number);
    }
    let flags = m.flags().u16();
    m.push_word(flags)?;
    let cs = m.sreg(crate::register::SReg::CS);
    m.push_word(cs)?;
    let ip = m.ip() as u16;
    m.push_word(ip)?;
    m.flags_mut().interrupt = false;
    Ok(())
}

fn exec_in(m: &mut Machine, instr: &Instruction) -> Result<(), Error> {
    let (dest, port) = (&instr.operands[0], &instr.operands[1]);
    let is_byte = operand_width(dest).unwrap_or(false);
    let port_val = read_wide(m, port, false)?;
    if DEBUG_STUBS {
        println!("simulated IN from port {:04X}h", port_val);
    }
    write_wide(m, dest, is_byte, 0)
}

fn exec_out(instr: &Instruction) -> Result<(), Error> {
    let _ = (&instr.operands[0], &instr.operands[1]);
    if DEBUG_STUBS {
        println!("simulated OUT");
    }
    Ok(())
}

#[cfg(test)]
#[path = "./cpu_test.rs"]
mod cpu_test;
