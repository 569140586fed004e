// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scalar arithmetic, comparison, and conversion semantics: everything
//! dispatched through `Instr::Numeric` and `BulkInstr::Trunc`.
//!
//! Integer division, remainder, and all float-to-int conversions can trap;
//! everything else is total. Float-producing arithmetic canonicalizes a NaN
//! result to the positive quiet NaN, matching this implementation's
//! deterministic NaN policy (see `exec::interp`'s module doc).

use crate::Allocator;
use crate::types::{BulkOpcode, Opcode};

use super::super::error::{Error, Trap};
use super::super::value::Slot;
use super::super::context::ExecutionContext;

const CANON_NAN32: u32 = 0x7fc0_0000;
const CANON_NAN64: u64 = 0x7ff8_0000_0000_0000;

pub(crate) fn canon32(v: f32) -> f32 {
    if v.is_nan() { f32::from_bits(CANON_NAN32) } else { v }
}

pub(crate) fn canon64(v: f64) -> f64 {
    if v.is_nan() { f64::from_bits(CANON_NAN64) } else { v }
}

pub(crate) fn fmin32(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        return f32::from_bits(CANON_NAN32);
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_negative() { a } else { b };
    }
    a.min(b)
}

pub(crate) fn fmax32(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        return f32::from_bits(CANON_NAN32);
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_positive() { a } else { b };
    }
    a.max(b)
}

pub(crate) fn fmin64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::from_bits(CANON_NAN64);
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_negative() { a } else { b };
    }
    a.min(b)
}

pub(crate) fn fmax64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::from_bits(CANON_NAN64);
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_positive() { a } else { b };
    }
    a.max(b)
}

// Non-saturating float-to-int truncation: traps on a NaN input, and on any
// value whose truncation falls outside the target range (which also catches
// the infinities, since they compare outside every finite bound).
fn trunc_i32(v: f64) -> Result<i32, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    let t = libm::trunc(v);
    if !(-2_147_483_648.0..2_147_483_648.0).contains(&t) {
        return Err(Trap::IntegerOverflow);
    }
    Ok(t as i32)
}

fn trunc_u32(v: f64) -> Result<u32, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    let t = libm::trunc(v);
    if !(0.0..4_294_967_296.0).contains(&t) {
        return Err(Trap::IntegerOverflow);
    }
    Ok(t as u32)
}

fn trunc_i64(v: f64) -> Result<i64, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    let t = libm::trunc(v);
    if !(-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(&t) {
        return Err(Trap::IntegerOverflow);
    }
    Ok(t as i64)
}

fn trunc_u64(v: f64) -> Result<u64, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    let t = libm::trunc(v);
    if !(0.0..18_446_744_073_709_551_616.0).contains(&t) {
        return Err(Trap::IntegerOverflow);
    }
    Ok(t as u64)
}

pub(crate) fn trunc_sat_i32(v: f64) -> i32 {
    if v.is_nan() {
        0
    } else if v < -2_147_483_648.0 {
        i32::MIN
    } else if v >= 2_147_483_648.0 {
        i32::MAX
    } else {
        libm::trunc(v) as i32
    }
}

pub(crate) fn trunc_sat_u32(v: f64) -> u32 {
    if v.is_nan() || v < 0.0 {
        0
    } else if v >= 4_294_967_296.0 {
        u32::MAX
    } else {
        libm::trunc(v) as u32
    }
}

pub(crate) fn trunc_sat_i64(v: f64) -> i64 {
    if v.is_nan() {
        0
    } else if v < -9_223_372_036_854_775_808.0 {
        i64::MIN
    } else if v >= 9_223_372_036_854_775_808.0 {
        i64::MAX
    } else {
        libm::trunc(v) as i64
    }
}

pub(crate) fn trunc_sat_u64(v: f64) -> u64 {
    if v.is_nan() || v < 0.0 {
        0
    } else if v >= 18_446_744_073_709_551_616.0 {
        u64::MAX
    } else {
        libm::trunc(v) as u64
    }
}

pub(crate) fn eval_trunc_sat<A: Allocator + Clone>(
    ctx: &mut ExecutionContext<A>,
    op: BulkOpcode,
) -> Result<(), Error> {
    let result = match op {
        BulkOpcode::I32TruncSatF32S => {
            Slot::from_i32(trunc_sat_i32(f64::from(ctx.value_stack.pop().expect("validated: operand present").as_f32())))
        }
        BulkOpcode::I32TruncSatF32U => {
            Slot::from_u32(trunc_sat_u32(f64::from(ctx.value_stack.pop().expect("validated: operand present").as_f32())))
        }
        BulkOpcode::I32TruncSatF64S => {
            Slot::from_i32(trunc_sat_i32(ctx.value_stack.pop().expect("validated: operand present").as_f64()))
        }
        BulkOpcode::I32TruncSatF64U => {
            Slot::from_u32(trunc_sat_u32(ctx.value_stack.pop().expect("validated: operand present").as_f64()))
        }
        BulkOpcode::I64TruncSatF32S => {
            Slot::from_i64(trunc_sat_i64(f64::from(ctx.value_stack.pop().expect("validated: operand present").as_f32())))
        }
        BulkOpcode::I64TruncSatF32U => {
            Slot::from_u64(trunc_sat_u64(f64::from(ctx.value_stack.pop().expect("validated: operand present").as_f32())))
        }
        BulkOpcode::I64TruncSatF64S => {
            Slot::from_i64(trunc_sat_i64(ctx.value_stack.pop().expect("validated: operand present").as_f64()))
        }
        BulkOpcode::I64TruncSatF64U => {
            Slot::from_u64(trunc_sat_u64(ctx.value_stack.pop().expect("validated: operand present").as_f64()))
        }
        _ => unreachable!("bulk opcode {op:?} is not a saturating truncation"),
    };
    ctx.push_slot(result)
}

pub(crate) fn eval<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>, op: Opcode) -> Result<(), Error> {
    macro_rules! pop_i32 {
        () => {
            ctx.value_stack.pop().expect("validated: operand present").as_i32()
        };
    }
    macro_rules! pop_u32 {
        () => {
            ctx.value_stack.pop().expect("validated: operand present").as_u32()
        };
    }
    macro_rules! pop_i64 {
        () => {
            ctx.value_stack.pop().expect("validated: operand present").as_i64()
        };
    }
    macro_rules! pop_u64 {
        () => {
            ctx.value_stack.pop().expect("validated: operand present").as_u64()
        };
    }
    macro_rules! pop_f32 {
        () => {
            ctx.value_stack.pop().expect("validated: operand present").as_f32()
        };
    }
    macro_rules! pop_f64 {
        () => {
            ctx.value_stack.pop().expect("validated: operand present").as_f64()
        };
    }

    let result = match op {
        Opcode::I32Eqz => Slot::bool(pop_i32!() == 0),
        Opcode::I32Eq => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::bool(a == b)
        }
        Opcode::I32Ne => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::bool(a != b)
        }
        Opcode::I32LtS => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::bool(a < b)
        }
        Opcode::I32LtU => {
            let b = pop_u32!();
            let a = pop_u32!();
            Slot::bool(a < b)
        }
        Opcode::I32GtS => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::bool(a > b)
        }
        Opcode::I32GtU => {
            let b = pop_u32!();
            let a = pop_u32!();
            Slot::bool(a > b)
        }
        Opcode::I32LeS => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::bool(a <= b)
        }
        Opcode::I32LeU => {
            let b = pop_u32!();
            let a = pop_u32!();
            Slot::bool(a <= b)
        }
        Opcode::I32GeS => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::bool(a >= b)
        }
        Opcode::I32GeU => {
            let b = pop_u32!();
            let a = pop_u32!();
            Slot::bool(a >= b)
        }

        Opcode::I64Eqz => Slot::bool(pop_i64!() == 0),
        Opcode::I64Eq => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::bool(a == b)
        }
        Opcode::I64Ne => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::bool(a != b)
        }
        Opcode::I64LtS => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::bool(a < b)
        }
        Opcode::I64LtU => {
            let b = pop_u64!();
            let a = pop_u64!();
            Slot::bool(a < b)
        }
        Opcode::I64GtS => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::bool(a > b)
        }
        Opcode::I64GtU => {
            let b = pop_u64!();
            let a = pop_u64!();
            Slot::bool(a > b)
        }
        Opcode::I64LeS => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::bool(a <= b)
        }
        Opcode::I64LeU => {
            let b = pop_u64!();
            let a = pop_u64!();
            Slot::bool(a <= b)
        }
        Opcode::I64GeS => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::bool(a >= b)
        }
        Opcode::I64GeU => {
            let b = pop_u64!();
            let a = pop_u64!();
            Slot::bool(a >= b)
        }

        Opcode::F32Eq => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::bool(a == b)
        }
        Opcode::F32Ne => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::bool(a != b)
        }
        Opcode::F32Lt => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::bool(a < b)
        }
        Opcode::F32Gt => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::bool(a > b)
        }
        Opcode::F32Le => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::bool(a <= b)
        }
        Opcode::F32Ge => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::bool(a >= b)
        }

        Opcode::F64Eq => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::bool(a == b)
        }
        Opcode::F64Ne => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::bool(a != b)
        }
        Opcode::F64Lt => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::bool(a < b)
        }
        Opcode::F64Gt => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::bool(a > b)
        }
        Opcode::F64Le => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::bool(a <= b)
        }
        Opcode::F64Ge => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::bool(a >= b)
        }

        Opcode::I32Clz => Slot::from_i32(pop_i32!().leading_zeros() as i32),
        Opcode::I32Ctz => Slot::from_i32(pop_i32!().trailing_zeros() as i32),
        Opcode::I32Popcnt => Slot::from_i32(pop_i32!().count_ones() as i32),
        Opcode::I32Add => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::from_i32(a.wrapping_add(b))
        }
        Opcode::I32Sub => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::from_i32(a.wrapping_sub(b))
        }
        Opcode::I32Mul => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::from_i32(a.wrapping_mul(b))
        }
        Opcode::I32DivS => {
            let b = pop_i32!();
            let a = pop_i32!();
            if b == 0 {
                return Err(Error::Trap(Trap::DivisionByZero));
            }
            if a == i32::MIN && b == -1 {
                return Err(Error::Trap(Trap::IntegerOverflow));
            }
            Slot::from_i32(a.wrapping_div(b))
        }
        Opcode::I32DivU => {
            let b = pop_u32!();
            let a = pop_u32!();
            if b == 0 {
                return Err(Error::Trap(Trap::DivisionByZero));
            }
            Slot::from_u32(a / b)
        }
        Opcode::I32RemS => {
            let b = pop_i32!();
            let a = pop_i32!();
            if b == 0 {
                return Err(Error::Trap(Trap::DivisionByZero));
            }
            Slot::from_i32(a.wrapping_rem(b))
        }
        Opcode::I32RemU => {
            let b = pop_u32!();
            let a = pop_u32!();
            if b == 0 {
                return Err(Error::Trap(Trap::DivisionByZero));
            }
            Slot::from_u32(a % b)
        }
        Opcode::I32And => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::from_i32(a & b)
        }
        Opcode::I32Or => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::from_i32(a | b)
        }
        Opcode::I32Xor => {
            let b = pop_i32!();
            let a = pop_i32!();
            Slot::from_i32(a ^ b)
        }
        Opcode::I32Shl => {
            let b = pop_u32!();
            let a = pop_i32!();
            Slot::from_i32(a.wrapping_shl(b))
        }
        Opcode::I32ShrS => {
            let b = pop_u32!();
            let a = pop_i32!();
            Slot::from_i32(a.wrapping_shr(b))
        }
        Opcode::I32ShrU => {
            let b = pop_u32!();
            let a = pop_u32!();
            Slot::from_u32(a.wrapping_shr(b))
        }
        Opcode::I32Rotl => {
            let b = pop_u32!();
            let a = pop_u32!();
            Slot::from_u32(a.rotate_left(b))
        }
        Opcode::I32Rotr => {
            let b = pop_u32!();
            let a = pop_u32!();
            Slot::from_u32(a.rotate_right(b))
        }

        Opcode::I64Clz => Slot::from_i64(i64::from(pop_i64!().leading_zeros())),
        Opcode::I64Ctz => Slot::from_i64(i64::from(pop_i64!().trailing_zeros())),
        Opcode::I64Popcnt => Slot::from_i64(i64::from(pop_i64!().count_ones())),
        Opcode::I64Add => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::from_i64(a.wrapping_add(b))
        }
        Opcode::I64Sub => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::from_i64(a.wrapping_sub(b))
        }
        Opcode::I64Mul => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::from_i64(a.wrapping_mul(b))
        }
        Opcode::I64DivS => {
            let b = pop_i64!();
            let a = pop_i64!();
            if b == 0 {
                return Err(Error::Trap(Trap::DivisionByZero));
            }
            if a == i64::MIN && b == -1 {
                return Err(Error::Trap(Trap::IntegerOverflow));
            }
            Slot::from_i64(a.wrapping_div(b))
        }
        Opcode::I64DivU => {
            let b = pop_u64!();
            let a = pop_u64!();
            if b == 0 {
                return Err(Error::Trap(Trap::DivisionByZero));
            }
            Slot::from_u64(a / b)
        }
        Opcode::I64RemS => {
            let b = pop_i64!();
            let a = pop_i64!();
            if b == 0 {
                return Err(Error::Trap(Trap::DivisionByZero));
            }
            Slot::from_i64(a.wrapping_rem(b))
        }
        Opcode::I64RemU => {
            let b = pop_u64!();
            let a = pop_u64!();
            if b == 0 {
                return Err(Error::Trap(Trap::DivisionByZero));
            }
            Slot::from_u64(a % b)
        }
        Opcode::I64And => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::from_i64(a & b)
        }
        Opcode::I64Or => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::from_i64(a | b)
        }
        Opcode::I64Xor => {
            let b = pop_i64!();
            let a = pop_i64!();
            Slot::from_i64(a ^ b)
        }
        Opcode::I64Shl => {
            let b = pop_u64!() as u32;
            let a = pop_i64!();
            Slot::from_i64(a.wrapping_shl(b))
        }
        Opcode::I64ShrS => {
            let b = pop_u64!() as u32;
            let a = pop_i64!();
            Slot::from_i64(a.wrapping_shr(b))
        }
        Opcode::I64ShrU => {
            let b = pop_u64!() as u32;
            let a = pop_u64!();
            Slot::from_u64(a.wrapping_shr(b))
        }
        Opcode::I64Rotl => {
            let b = pop_u64!() as u32;
            let a = pop_u64!();
            Slot::from_u64(a.rotate_left(b))
        }
        Opcode::I64Rotr => {
            let b = pop_u64!() as u32;
            let a = pop_u64!();
            Slot::from_u64(a.rotate_right(b))
        }

        Opcode::F32Abs => Slot::from_f32(canon32(pop_f32!().abs())),
        Opcode::F32Neg => Slot::from_f32(canon32(-pop_f32!())),
        Opcode::F32Ceil => Slot::from_f32(canon32(libm::ceilf(pop_f32!()))),
        Opcode::F32Floor => Slot::from_f32(canon32(libm::floorf(pop_f32!()))),
        Opcode::F32Trunc => Slot::from_f32(canon32(libm::truncf(pop_f32!()))),
        Opcode::F32Nearest => Slot::from_f32(canon32(libm::rintf(pop_f32!()))),
        Opcode::F32Sqrt => Slot::from_f32(canon32(libm::sqrtf(pop_f32!()))),
        Opcode::F32Add => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::from_f32(canon32(a + b))
        }
        Opcode::F32Sub => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::from_f32(canon32(a - b))
        }
        Opcode::F32Mul => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::from_f32(canon32(a * b))
        }
        Opcode::F32Div => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::from_f32(canon32(a / b))
        }
        Opcode::F32Min => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::from_f32(fmin32(a, b))
        }
        Opcode::F32Max => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::from_f32(fmax32(a, b))
        }
        Opcode::F32Copysign => {
            let b = pop_f32!();
            let a = pop_f32!();
            Slot::from_f32(canon32(a.copysign(b)))
        }

        Opcode::F64Abs => Slot::from_f64(canon64(pop_f64!().abs())),
        Opcode::F64Neg => Slot::from_f64(canon64(-pop_f64!())),
        Opcode::F64Ceil => Slot::from_f64(canon64(libm::ceil(pop_f64!()))),
        Opcode::F64Floor => Slot::from_f64(canon64(libm::floor(pop_f64!()))),
        Opcode::F64Trunc => Slot::from_f64(canon64(libm::trunc(pop_f64!()))),
        Opcode::F64Nearest => Slot::from_f64(canon64(libm::rint(pop_f64!()))),
        Opcode::F64Sqrt => Slot::from_f64(canon64(libm::sqrt(pop_f64!()))),
        Opcode::F64Add => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::from_f64(canon64(a + b))
        }
        Opcode::F64Sub => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::from_f64(canon64(a - b))
        }
        Opcode::F64Mul => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::from_f64(canon64(a * b))
        }
        Opcode::F64Div => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::from_f64(canon64(a / b))
        }
        Opcode::F64Min => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::from_f64(fmin64(a, b))
        }
        Opcode::F64Max => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::from_f64(fmax64(a, b))
        }
        Opcode::F64Copysign => {
            let b = pop_f64!();
            let a = pop_f64!();
            Slot::from_f64(canon64(a.copysign(b)))
        }

        Opcode::I32WrapI64 => Slot::from_i32(pop_i64!() as i32),
        Opcode::I32TruncF32S => Slot::from_i32(trunc_i32(f64::from(pop_f32!())).map_err(Error::Trap)?),
        Opcode::I32TruncF32U => Slot::from_u32(trunc_u32(f64::from(pop_f32!())).map_err(Error::Trap)?),
        Opcode::I32TruncF64S => Slot::from_i32(trunc_i32(pop_f64!()).map_err(Error::Trap)?),
        Opcode::I32TruncF64U => Slot::from_u32(trunc_u32(pop_f64!()).map_err(Error::Trap)?),
        Opcode::I64ExtendI32S => Slot::from_i64(i64::from(pop_i32!())),
        Opcode::I64ExtendI32U => Slot::from_i64(i64::from(pop_u32!())),
        Opcode::I64TruncF32S => Slot::from_i64(trunc_i64(f64::from(pop_f32!())).map_err(Error::Trap)?),
        Opcode::I64TruncF32U => Slot::from_u64(trunc_u64(f64::from(pop_f32!())).map_err(Error::Trap)?),
        Opcode::I64TruncF64S => Slot::from_i64(trunc_i64(pop_f64!()).map_err(Error::Trap)?),
        Opcode::I64TruncF64U => Slot::from_u64(trunc_u64(pop_f64!()).map_err(Error::Trap)?),
        Opcode::F32ConvertI32S => Slot::from_f32(pop_i32!() as f32),
        Opcode::F32ConvertI32U => Slot::from_f32(pop_u32!() as f32),
        Opcode::F32ConvertI64S => Slot::from_f32(pop_i64!() as f32),
        Opcode::F32ConvertI64U => Slot::from_f32(pop_u64!() as f32),
        Opcode::F32DemoteF64 => Slot::from_f32(canon32(pop_f64!() as f32)),
        Opcode::F64ConvertI32S => Slot::from_f64(f64::from(pop_i32!())),
        Opcode::F64ConvertI32U => Slot::from_f64(f64::from(pop_u32!())),
        Opcode::F64ConvertI64S => Slot::from_f64(pop_i64!() as f64),
        Opcode::F64ConvertI64U => Slot::from_f64(pop_u64!() as f64),
        Opcode::F64PromoteF32 => Slot::from_f64(canon64(f64::from(pop_f32!()))),
        Opcode::I32ReinterpretF32 => Slot::from_i32(pop_f32!().to_bits() as i32),
        Opcode::I64ReinterpretF64 => Slot::from_i64(pop_f64!().to_bits() as i64),
        Opcode::F32ReinterpretI32 => Slot::from_f32(f32::from_bits(pop_i32!() as u32)),
        Opcode::F64ReinterpretI64 => Slot::from_f64(f64::from_bits(pop_i64!() as u64)),

        Opcode::I32Extend8S => Slot::from_i32(i32::from(pop_i32!() as i8)),
        Opcode::I32Extend16S => Slot::from_i32(i32::from(pop_i32!() as i16)),
        Opcode::I64Extend8S => Slot::from_i64(i64::from(pop_i64!() as i8)),
        Opcode::I64Extend16S => Slot::from_i64(i64::from(pop_i64!() as i16)),
        Opcode::I64Extend32S => Slot::from_i64(i64::from(pop_i64!() as i32)),

        _ => unreachable!("opcode {op:?} is handled outside of the numeric dispatch"),
    };
    ctx.push_slot(result)
}
