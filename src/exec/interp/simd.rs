// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! SIMD (v128) instruction semantics: everything dispatched through
//! `Instr::Vector`.
//!
//! A `v128` is carried on the stack as a `Slot`'s raw 128 bits; this module
//! reinterprets those bits as whichever lane shape the opcode names, computes
//! lane-wise, and repacks. Bitwise and lane-select operations never touch
//! NaN payloads; arithmetic that can produce a NaN canonicalizes it the same
//! way scalar float arithmetic does (see `numeric`).

use crate::Allocator;
use crate::types::{MemArg, VectorOpcode};

use super::super::context::ExecutionContext;
use super::super::error::Error;
use super::super::value::Slot;
use super::numeric::{canon32, canon64, fmax32, fmax64, fmin32, fmin64, trunc_sat_i32, trunc_sat_u32};

use crate::bytecode::VecInstr;

fn lanes_i8(v: [u8; 16]) -> [i8; 16] {
    core::array::from_fn(|i| v[i] as i8)
}

fn from_i8(v: [i8; 16]) -> [u8; 16] {
    core::array::from_fn(|i| v[i] as u8)
}

fn from_bool8(v: [bool; 16]) -> [u8; 16] {
    core::array::from_fn(|i| if v[i] { 0xff } else { 0 })
}

fn lanes_i16(v: [u8; 16]) -> [i16; 8] {
    core::array::from_fn(|i| i16::from_le_bytes([v[2 * i], v[2 * i + 1]]))
}

fn lanes_u16(v: [u8; 16]) -> [u16; 8] {
    core::array::from_fn(|i| u16::from_le_bytes([v[2 * i], v[2 * i + 1]]))
}

fn from_i16(v: [i16; 8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, lane) in v.iter().enumerate() {
        out[2 * i..2 * i + 2].copy_from_slice(&lane.to_le_bytes());
    }
    out
}

fn from_u16(v: [u16; 8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, lane) in v.iter().enumerate() {
        out[2 * i..2 * i + 2].copy_from_slice(&lane.to_le_bytes());
    }
    out
}

fn from_bool16(v: [bool; 8]) -> [u8; 16] {
    from_u16(core::array::from_fn(|i| if v[i] { 0xffff } else { 0 }))
}

fn lanes_i32(v: [u8; 16]) -> [i32; 4] {
    core::array::from_fn(|i| i32::from_le_bytes([v[4 * i], v[4 * i + 1], v[4 * i + 2], v[4 * i + 3]]))
}

fn lanes_u32(v: [u8; 16]) -> [u32; 4] {
    core::array::from_fn(|i| u32::from_le_bytes([v[4 * i], v[4 * i + 1], v[4 * i + 2], v[4 * i + 3]]))
}

fn from_i32(v: [i32; 4]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, lane) in v.iter().enumerate() {
        out[4 * i..4 * i + 4].copy_from_slice(&lane.to_le_bytes());
    }
    out
}

fn from_u32(v: [u32; 4]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, lane) in v.iter().enumerate() {
        out[4 * i..4 * i + 4].copy_from_slice(&lane.to_le_bytes());
    }
    out
}

fn from_bool32(v: [bool; 4]) -> [u8; 16] {
    from_u32(core::array::from_fn(|i| if v[i] { 0xffff_ffff } else { 0 }))
}

fn lanes_i64(v: [u8; 16]) -> [i64; 2] {
    core::array::from_fn(|i| {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&v[8 * i..8 * i + 8]);
        i64::from_le_bytes(buf)
    })
}

fn lanes_u64(v: [u8; 16]) -> [u64; 2] {
    core::array::from_fn(|i| {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&v[8 * i..8 * i + 8]);
        u64::from_le_bytes(buf)
    })
}

fn from_i64(v: [i64; 2]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, lane) in v.iter().enumerate() {
        out[8 * i..8 * i + 8].copy_from_slice(&lane.to_le_bytes());
    }
    out
}

fn from_u64(v: [u64; 2]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, lane) in v.iter().enumerate() {
        out[8 * i..8 * i + 8].copy_from_slice(&lane.to_le_bytes());
    }
    out
}

fn from_bool64(v: [bool; 2]) -> [u8; 16] {
    from_u64(core::array::from_fn(|i| if v[i] { u64::MAX } else { 0 }))
}

fn lanes_f32(v: [u8; 16]) -> [f32; 4] {
    core::array::from_fn(|i| f32::from_le_bytes([v[4 * i], v[4 * i + 1], v[4 * i + 2], v[4 * i + 3]]))
}

fn from_f32(v: [f32; 4]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, lane) in v.iter().enumerate() {
        out[4 * i..4 * i + 4].copy_from_slice(&lane.to_le_bytes());
    }
    out
}

fn lanes_f64(v: [u8; 16]) -> [f64; 2] {
    core::array::from_fn(|i| {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&v[8 * i..8 * i + 8]);
        f64::from_le_bytes(buf)
    })
}

fn from_f64(v: [f64; 2]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, lane) in v.iter().enumerate() {
        out[8 * i..8 * i + 8].copy_from_slice(&lane.to_le_bytes());
    }
    out
}

fn map2<T: Copy, const N: usize>(a: [T; N], b: [T; N], f: impl Fn(T, T) -> T) -> [T; N] {
    core::array::from_fn(|i| f(a[i], b[i]))
}

fn map1<T: Copy, const N: usize>(a: [T; N], f: impl Fn(T) -> T) -> [T; N] {
    core::array::from_fn(|i| f(a[i]))
}

fn cmp2<T: Copy, const N: usize>(a: [T; N], b: [T; N], f: impl Fn(T, T) -> bool) -> [bool; N] {
    core::array::from_fn(|i| f(a[i], b[i]))
}

// Unsigned rounding average, as used by `iNxM.avgr_u`: `(a + b + 1) / 2`
// computed without overflow by widening.
fn avgr_u16(a: u16, b: u16) -> u16 {
    ((u32::from(a) + u32::from(b) + 1) / 2) as u16
}

fn avgr_u8(a: u8, b: u8) -> u8 {
    ((u16::from(a) + u16::from(b) + 1) / 2) as u8
}

// `i16x8.q15mulr_sat_s`: fixed-point Q15 multiply-round-saturate.
fn q15mulr_sat_s(a: i16, b: i16) -> i16 {
    let product = i32::from(a) * i32::from(b) + 0x4000;
    let scaled = product >> 15;
    scaled.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

fn pop_v128<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>) -> [u8; 16] {
    ctx.value_stack.pop().expect("validated: operand present").as_v128()
}

fn pop_i32<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>) -> i32 {
    ctx.value_stack.pop().expect("validated: operand present").as_i32()
}

fn push_v128<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>, v: [u8; 16]) -> Result<(), Error> {
    ctx.push_slot(Slot::from_v128(v))
}

fn unop(ctx: &mut ExecutionContext<impl Allocator + Clone>, op: VectorOpcode) -> Result<(), Error> {
    use VectorOpcode as V;

    let v = pop_v128(ctx);
    let out = match op {
        V::V128Not => map1(v, |b| !b),

        V::I8x16Abs => from_i8(map1(lanes_i8(v), i8::wrapping_abs)),
        V::I8x16Neg => from_i8(map1(lanes_i8(v), i8::wrapping_neg)),
        V::I8x16Popcnt => map1(v, u8::count_ones).map(|c| c as u8),
        V::I16x8Abs => from_i16(map1(lanes_i16(v), i16::wrapping_abs)),
        V::I16x8Neg => from_i16(map1(lanes_i16(v), i16::wrapping_neg)),
        V::I32x4Abs => from_i32(map1(lanes_i32(v), i32::wrapping_abs)),
        V::I32x4Neg => from_i32(map1(lanes_i32(v), i32::wrapping_neg)),
        V::I64x2Abs => from_i64(map1(lanes_i64(v), i64::wrapping_abs)),
        V::I64x2Neg => from_i64(map1(lanes_i64(v), i64::wrapping_neg)),

        V::I16x8ExtaddPairwiseI8x16S => {
            let a = lanes_i8(v);
            from_i16(core::array::from_fn(|i| i16::from(a[2 * i]) + i16::from(a[2 * i + 1])))
        }
        V::I16x8ExtaddPairwiseI8x16U => {
            let a = v;
            from_u16(core::array::from_fn(|i| u16::from(a[2 * i]) + u16::from(a[2 * i + 1])))
        }
        V::I32x4ExtaddPairwiseI16x8S => {
            let a = lanes_i16(v);
            from_i32(core::array::from_fn(|i| i32::from(a[2 * i]) + i32::from(a[2 * i + 1])))
        }
        V::I32x4ExtaddPairwiseI16x8U => {
            let a = lanes_u16(v);
            from_u32(core::array::from_fn(|i| u32::from(a[2 * i]) + u32::from(a[2 * i + 1])))
        }

        V::I16x8ExtendLowI8x16S => {
            let a = lanes_i8(v);
            from_i16(core::array::from_fn(|i| i16::from(a[i])))
        }
        V::I16x8ExtendHighI8x16S => {
            let a = lanes_i8(v);
            from_i16(core::array::from_fn(|i| i16::from(a[i + 8])))
        }
        V::I16x8ExtendLowI8x16U => {
            let a = v;
            from_u16(core::array::from_fn(|i| u16::from(a[i])))
        }
        V::I16x8ExtendHighI8x16U => {
            let a = v;
            from_u16(core::array::from_fn(|i| u16::from(a[i + 8])))
        }
        V::I32x4ExtendLowI16x8S => {
            let a = lanes_i16(v);
            from_i32(core::array::from_fn(|i| i32::from(a[i])))
        }
        V::I32x4ExtendHighI16x8S => {
            let a = lanes_i16(v);
            from_i32(core::array::from_fn(|i| i32::from(a[i + 4])))
        }
        V::I32x4ExtendLowI16x8U => {
            let a = lanes_u16(v);
            from_u32(core::array::from_fn(|i| u32::from(a[i])))
        }
        V::I32x4ExtendHighI16x8U => {
            let a = lanes_u16(v);
            from_u32(core::array::from_fn(|i| u32::from(a[i + 4])))
        }
        V::I64x2ExtendLowI32x4S => {
            let a = lanes_i32(v);
            from_i64(core::array::from_fn(|i| i64::from(a[i])))
        }
        V::I64x2ExtendHighI32x4S => {
            let a = lanes_i32(v);
            from_i64(core::array::from_fn(|i| i64::from(a[i + 2])))
        }
        V::I64x2ExtendLowI32x4U => {
            let a = lanes_u32(v);
            from_u64(core::array::from_fn(|i| u64::from(a[i])))
        }
        V::I64x2ExtendHighI32x4U => {
            let a = lanes_u32(v);
            from_u64(core::array::from_fn(|i| u64::from(a[i + 2])))
        }

        V::F32x4Ceil => from_f32(map1(lanes_f32(v), |x| canon32(libm::ceilf(x)))),
        V::F32x4Floor => from_f32(map1(lanes_f32(v), |x| canon32(libm::floorf(x)))),
        V::F32x4Trunc => from_f32(map1(lanes_f32(v), |x| canon32(libm::truncf(x)))),
        V::F32x4Nearest => from_f32(map1(lanes_f32(v), |x| canon32(libm::rintf(x)))),
        V::F32x4Abs => from_f32(map1(lanes_f32(v), f32::abs)),
        V::F32x4Neg => from_f32(map1(lanes_f32(v), |x| -x)),
        V::F32x4Sqrt => from_f32(map1(lanes_f32(v), |x| canon32(libm::sqrtf(x)))),

        V::F64x2Ceil => from_f64(map1(lanes_f64(v), |x| canon64(libm::ceil(x)))),
        V::F64x2Floor => from_f64(map1(lanes_f64(v), |x| canon64(libm::floor(x)))),
        V::F64x2Trunc => from_f64(map1(lanes_f64(v), |x| canon64(libm::trunc(x)))),
        V::F64x2Nearest => from_f64(map1(lanes_f64(v), |x| canon64(libm::rint(x)))),
        V::F64x2Abs => from_f64(map1(lanes_f64(v), f64::abs)),
        V::F64x2Neg => from_f64(map1(lanes_f64(v), |x| -x)),
        V::F64x2Sqrt => from_f64(map1(lanes_f64(v), |x| canon64(libm::sqrt(x)))),

        V::I32x4TruncSatF32x4S => from_i32(map1(lanes_f32(v), |x| trunc_sat_i32(f64::from(x)))),
        V::I32x4TruncSatF32x4U => from_u32(map1(lanes_f32(v), |x| trunc_sat_u32(f64::from(x)))),
        V::F32x4ConvertI32x4S => from_f32(map1(lanes_i32(v), |x| x as f32)),
        V::F32x4ConvertI32x4U => from_f32(map1(lanes_u32(v), |x| x as f32)),

        V::I32x4TruncSatF64x2SZero => {
            let a = lanes_f64(v);
            from_i32([trunc_sat_i32(a[0]), trunc_sat_i32(a[1]), 0, 0])
        }
        V::I32x4TruncSatF64x2UZero => {
            let a = lanes_f64(v);
            from_u32([trunc_sat_u32(a[0]), trunc_sat_u32(a[1]), 0, 0])
        }
        V::F64x2ConvertLowI32x4S => {
            let a = lanes_i32(v);
            from_f64([f64::from(a[0]), f64::from(a[1])])
        }
        V::F64x2ConvertLowI32x4U => {
            let a = lanes_u32(v);
            from_f64([f64::from(a[0]), f64::from(a[1])])
        }
        V::F32x4DemoteF64x2Zero => {
            let a = lanes_f64(v);
            from_f32([canon32(a[0] as f32), canon32(a[1] as f32), 0.0, 0.0])
        }
        V::F64x2PromoteLowF32x4 => {
            let a = lanes_f32(v);
            from_f64([canon64(f64::from(a[0])), canon64(f64::from(a[1]))])
        }

        _ => unreachable!("vector opcode {op:?} is not a unary op"),
    };
    push_v128(ctx, out)
}

fn binop(ctx: &mut ExecutionContext<impl Allocator + Clone>, op: VectorOpcode) -> Result<(), Error> {
    use VectorOpcode as V;

    let b = pop_v128(ctx);
    let a = pop_v128(ctx);
    let out = match op {
        V::I8x16Eq => from_bool8(cmp2(lanes_i8(a), lanes_i8(b), |x, y| x == y)),
        V::I8x16Ne => from_bool8(cmp2(lanes_i8(a), lanes_i8(b), |x, y| x != y)),
        V::I8x16LtS => from_bool8(cmp2(lanes_i8(a), lanes_i8(b), |x, y| x < y)),
        V::I8x16LtU => from_bool8(cmp2(a, b, |x, y| x < y)),
        V::I8x16GtS => from_bool8(cmp2(lanes_i8(a), lanes_i8(b), |x, y| x > y)),
        V::I8x16GtU => from_bool8(cmp2(a, b, |x, y| x > y)),
        V::I8x16LeS => from_bool8(cmp2(lanes_i8(a), lanes_i8(b), |x, y| x <= y)),
        V::I8x16LeU => from_bool8(cmp2(a, b, |x, y| x <= y)),
        V::I8x16GeS => from_bool8(cmp2(lanes_i8(a), lanes_i8(b), |x, y| x >= y)),
        V::I8x16GeU => from_bool8(cmp2(a, b, |x, y| x >= y)),

        V::I16x8Eq => from_bool16(cmp2(lanes_i16(a), lanes_i16(b), |x, y| x == y)),
        V::I16x8Ne => from_bool16(cmp2(lanes_i16(a), lanes_i16(b), |x, y| x != y)),
        V::I16x8LtS => from_bool16(cmp2(lanes_i16(a), lanes_i16(b), |x, y| x < y)),
        V::I16x8LtU => from_bool16(cmp2(lanes_u16(a), lanes_u16(b), |x, y| x < y)),
        V::I16x8GtS => from_bool16(cmp2(lanes_i16(a), lanes_i16(b), |x, y| x > y)),
        V::I16x8GtU => from_bool16(cmp2(lanes_u16(a), lanes_u16(b), |x, y| x > y)),
        V::I16x8LeS => from_bool16(cmp2(lanes_i16(a), lanes_i16(b), |x, y| x <= y)),
        V::I16x8LeU => from_bool16(cmp2(lanes_u16(a), lanes_u16(b), |x, y| x <= y)),
        V::I16x8GeS => from_bool16(cmp2(lanes_i16(a), lanes_i16(b), |x, y| x >= y)),
        V::I16x8GeU => from_bool16(cmp2(lanes_u16(a), lanes_u16(b), |x, y| x >= y)),

        V::I32x4Eq => from_bool32(cmp2(lanes_i32(a), lanes_i32(b), |x, y| x == y)),
        V::I32x4Ne => from_bool32(cmp2(lanes_i32(a), lanes_i32(b), |x, y| x != y)),
        V::I32x4LtS => from_bool32(cmp2(lanes_i32(a), lanes_i32(b), |x, y| x < y)),
        V::I32x4LtU => from_bool32(cmp2(lanes_u32(a), lanes_u32(b), |x, y| x < y)),
        V::I32x4GtS => from_bool32(cmp2(lanes_i32(a), lanes_i32(b), |x, y| x > y)),
        V::I32x4GtU => from_bool32(cmp2(lanes_u32(a), lanes_u32(b), |x, y| x > y)),
        V::I32x4LeS => from_bool32(cmp2(lanes_i32(a), lanes_i32(b), |x, y| x <= y)),
        V::I32x4LeU => from_bool32(cmp2(lanes_u32(a), lanes_u32(b), |x, y| x <= y)),
        V::I32x4GeS => from_bool32(cmp2(lanes_i32(a), lanes_i32(b), |x, y| x >= y)),
        V::I32x4GeU => from_bool32(cmp2(lanes_u32(a), lanes_u32(b), |x, y| x >= y)),

        V::I64x2Eq => from_bool64(cmp2(lanes_i64(a), lanes_i64(b), |x, y| x == y)),
        V::I64x2Ne => from_bool64(cmp2(lanes_i64(a), lanes_i64(b), |x, y| x != y)),
        V::I64x2LtS => from_bool64(cmp2(lanes_i64(a), lanes_i64(b), |x, y| x < y)),
        V::I64x2GtS => from_bool64(cmp2(lanes_i64(a), lanes_i64(b), |x, y| x > y)),
        V::I64x2LeS => from_bool64(cmp2(lanes_i64(a), lanes_i64(b), |x, y| x <= y)),
        V::I64x2GeS => from_bool64(cmp2(lanes_i64(a), lanes_i64(b), |x, y| x >= y)),

        V::F32x4Eq => from_bool32(cmp2(lanes_f32(a), lanes_f32(b), |x, y| x == y)),
        V::F32x4Ne => from_bool32(cmp2(lanes_f32(a), lanes_f32(b), |x, y| x != y)),
        V::F32x4Lt => from_bool32(cmp2(lanes_f32(a), lanes_f32(b), |x, y| x < y)),
        V::F32x4Gt => from_bool32(cmp2(lanes_f32(a), lanes_f32(b), |x, y| x > y)),
        V::F32x4Le => from_bool32(cmp2(lanes_f32(a), lanes_f32(b), |x, y| x <= y)),
        V::F32x4Ge => from_bool32(cmp2(lanes_f32(a), lanes_f32(b), |x, y| x >= y)),

        V::F64x2Eq => from_bool64(cmp2(lanes_f64(a), lanes_f64(b), |x, y| x == y)),
        V::F64x2Ne => from_bool64(cmp2(lanes_f64(a), lanes_f64(b), |x, y| x != y)),
        V::F64x2Lt => from_bool64(cmp2(lanes_f64(a), lanes_f64(b), |x, y| x < y)),
        V::F64x2Gt => from_bool64(cmp2(lanes_f64(a), lanes_f64(b), |x, y| x > y)),
        V::F64x2Le => from_bool64(cmp2(lanes_f64(a), lanes_f64(b), |x, y| x <= y)),
        V::F64x2Ge => from_bool64(cmp2(lanes_f64(a), lanes_f64(b), |x, y| x >= y)),

        V::V128And => map2(a, b, |x, y| x & y),
        V::V128Andnot => map2(a, b, |x, y| x & !y),
        V::V128Or => map2(a, b, |x, y| x | y),
        V::V128Xor => map2(a, b, |x, y| x ^ y),

        V::I8x16NarrowI16x8S => {
            let (x, y) = (lanes_i16(a), lanes_i16(b));
            let narrow = |v: i16| v.clamp(i16::from(i8::MIN), i16::from(i8::MAX)) as i8;
            from_i8(core::array::from_fn(|i| if i < 8 { narrow(x[i]) } else { narrow(y[i - 8]) }))
        }
        V::I8x16NarrowI16x8U => {
            let (x, y) = (lanes_i16(a), lanes_i16(b));
            let narrow = |v: i16| v.clamp(0, i16::from(u8::MAX)) as u8;
            core::array::from_fn(|i| if i < 8 { narrow(x[i]) } else { narrow(y[i - 8]) })
        }
        V::I16x8NarrowI32x4S => {
            let (x, y) = (lanes_i32(a), lanes_i32(b));
            let narrow = |v: i32| v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
            from_i16(core::array::from_fn(|i| if i < 4 { narrow(x[i]) } else { narrow(y[i - 4]) }))
        }
        V::I16x8NarrowI32x4U => {
            let (x, y) = (lanes_i32(a), lanes_i32(b));
            let narrow = |v: i32| v.clamp(0, i32::from(u16::MAX)) as u16;
            from_u16(core::array::from_fn(|i| if i < 4 { narrow(x[i]) } else { narrow(y[i - 4]) }))
        }

        V::I8x16Add => from_i8(map2(lanes_i8(a), lanes_i8(b), i8::wrapping_add)),
        V::I8x16AddSatS => from_i8(map2(lanes_i8(a), lanes_i8(b), i8::saturating_add)),
        V::I8x16AddSatU => map2(a, b, u8::saturating_add),
        V::I8x16Sub => from_i8(map2(lanes_i8(a), lanes_i8(b), i8::wrapping_sub)),
        V::I8x16SubSatS => from_i8(map2(lanes_i8(a), lanes_i8(b), i8::saturating_sub)),
        V::I8x16SubSatU => map2(a, b, u8::saturating_sub),
        V::I8x16MinS => from_i8(map2(lanes_i8(a), lanes_i8(b), Ord::min)),
        V::I8x16MinU => map2(a, b, Ord::min),
        V::I8x16MaxS => from_i8(map2(lanes_i8(a), lanes_i8(b), Ord::max)),
        V::I8x16MaxU => map2(a, b, Ord::max),
        V::I8x16AvgrU => map2(a, b, avgr_u8),

        V::I16x8Add => from_i16(map2(lanes_i16(a), lanes_i16(b), i16::wrapping_add)),
        V::I16x8AddSatS => from_i16(map2(lanes_i16(a), lanes_i16(b), i16::saturating_add)),
        V::I16x8AddSatU => from_u16(map2(lanes_u16(a), lanes_u16(b), u16::saturating_add)),
        V::I16x8Sub => from_i16(map2(lanes_i16(a), lanes_i16(b), i16::wrapping_sub)),
        V::I16x8SubSatS => from_i16(map2(lanes_i16(a), lanes_i16(b), i16::saturating_sub)),
        V::I16x8SubSatU => from_u16(map2(lanes_u16(a), lanes_u16(b), u16::saturating_sub)),
        V::I16x8Mul => from_i16(map2(lanes_i16(a), lanes_i16(b), i16::wrapping_mul)),
        V::I16x8MinS => from_i16(map2(lanes_i16(a), lanes_i16(b), Ord::min)),
        V::I16x8MinU => from_u16(map2(lanes_u16(a), lanes_u16(b), Ord::min)),
        V::I16x8MaxS => from_i16(map2(lanes_i16(a), lanes_i16(b), Ord::max)),
        V::I16x8MaxU => from_u16(map2(lanes_u16(a), lanes_u16(b), Ord::max)),
        V::I16x8AvgrU => from_u16(map2(lanes_u16(a), lanes_u16(b), avgr_u16)),
        V::I16x8Q15mulrSatS => from_i16(map2(lanes_i16(a), lanes_i16(b), q15mulr_sat_s)),
        V::I16x8ExtmulLowI8x16S => {
            let (x, y) = (lanes_i8(a), lanes_i8(b));
            from_i16(core::array::from_fn(|i| i16::from(x[i]) * i16::from(y[i])))
        }
        V::I16x8ExtmulHighI8x16S => {
            let (x, y) = (lanes_i8(a), lanes_i8(b));
            from_i16(core::array::from_fn(|i| i16::from(x[i + 8]) * i16::from(y[i + 8])))
        }
        V::I16x8ExtmulLowI8x16U => {
            let (x, y) = (a, b);
            from_u16(core::array::from_fn(|i| u16::from(x[i]) * u16::from(y[i])))
        }
        V::I16x8ExtmulHighI8x16U => {
            let (x, y) = (a, b);
            from_u16(core::array::from_fn(|i| u16::from(x[i + 8]) * u16::from(y[i + 8])))
        }

        V::I32x4Add => from_i32(map2(lanes_i32(a), lanes_i32(b), i32::wrapping_add)),
        V::I32x4Sub => from_i32(map2(lanes_i32(a), lanes_i32(b), i32::wrapping_sub)),
        V::I32x4Mul => from_i32(map2(lanes_i32(a), lanes_i32(b), i32::wrapping_mul)),
        V::I32x4MinS => from_i32(map2(lanes_i32(a), lanes_i32(b), Ord::min)),
        V::I32x4MinU => from_u32(map2(lanes_u32(a), lanes_u32(b), Ord::min)),
        V::I32x4MaxS => from_i32(map2(lanes_i32(a), lanes_i32(b), Ord::max)),
        V::I32x4MaxU => from_u32(map2(lanes_u32(a), lanes_u32(b), Ord::max)),
        V::I32x4DotI16x8S => {
            let (x, y) = (lanes_i16(a), lanes_i16(b));
            from_i32(core::array::from_fn(|i| {
                i32::from(x[2 * i]) * i32::from(y[2 * i]) + i32::from(x[2 * i + 1]) * i32::from(y[2 * i + 1])
            }))
        }
        V::I32x4ExtmulLowI16x8S => {
            let (x, y) = (lanes_i16(a), lanes_i16(b));
            from_i32(core::array::from_fn(|i| i32::from(x[i]) * i32::from(y[i])))
        }
        V::I32x4ExtmulHighI16x8S => {
            let (x, y) = (lanes_i16(a), lanes_i16(b));
            from_i32(core::array::from_fn(|i| i32::from(x[i + 4]) * i32::from(y[i + 4])))
        }
        V::I32x4ExtmulLowI16x8U => {
            let (x, y) = (lanes_u16(a), lanes_u16(b));
            from_u32(core::array::from_fn(|i| u32::from(x[i]) * u32::from(y[i])))
        }
        V::I32x4ExtmulHighI16x8U => {
            let (x, y) = (lanes_u16(a), lanes_u16(b));
            from_u32(core::array::from_fn(|i| u32::from(x[i + 4]) * u32::from(y[i + 4])))
        }

        V::I64x2Add => from_i64(map2(lanes_i64(a), lanes_i64(b), i64::wrapping_add)),
        V::I64x2Sub => from_i64(map2(lanes_i64(a), lanes_i64(b), i64::wrapping_sub)),
        V::I64x2Mul => from_i64(map2(lanes_i64(a), lanes_i64(b), i64::wrapping_mul)),
        V::I64x2ExtmulLowI32x4S => {
            let (x, y) = (lanes_i32(a), lanes_i32(b));
            from_i64(core::array::from_fn(|i| i64::from(x[i]) * i64::from(y[i])))
        }
        V::I64x2ExtmulHighI32x4S => {
            let (x, y) = (lanes_i32(a), lanes_i32(b));
            from_i64(core::array::from_fn(|i| i64::from(x[i + 2]) * i64::from(y[i + 2])))
        }
        V::I64x2ExtmulLowI32x4U => {
            let (x, y) = (lanes_u32(a), lanes_u32(b));
            from_u64(core::array::from_fn(|i| u64::from(x[i]) * u64::from(y[i])))
        }
        V::I64x2ExtmulHighI32x4U => {
            let (x, y) = (lanes_u32(a), lanes_u32(b));
            from_u64(core::array::from_fn(|i| u64::from(x[i + 2]) * u64::from(y[i + 2])))
        }

        V::F32x4Add => from_f32(map2(lanes_f32(a), lanes_f32(b), |x, y| canon32(x + y))),
        V::F32x4Sub => from_f32(map2(lanes_f32(a), lanes_f32(b), |x, y| canon32(x - y))),
        V::F32x4Mul => from_f32(map2(lanes_f32(a), lanes_f32(b), |x, y| canon32(x * y))),
        V::F32x4Div => from_f32(map2(lanes_f32(a), lanes_f32(b), |x, y| canon32(x / y))),
        V::F32x4Min => from_f32(map2(lanes_f32(a), lanes_f32(b), fmin32)),
        V::F32x4Max => from_f32(map2(lanes_f32(a), lanes_f32(b), fmax32)),
        V::F32x4Pmin => from_f32(map2(lanes_f32(a), lanes_f32(b), |x, y| if y < x { y } else { x })),
        V::F32x4Pmax => from_f32(map2(lanes_f32(a), lanes_f32(b), |x, y| if x < y { y } else { x })),

        V::F64x2Add => from_f64(map2(lanes_f64(a), lanes_f64(b), |x, y| canon64(x + y))),
        V::F64x2Sub => from_f64(map2(lanes_f64(a), lanes_f64(b), |x, y| canon64(x - y))),
        V::F64x2Mul => from_f64(map2(lanes_f64(a), lanes_f64(b), |x, y| canon64(x * y))),
        V::F64x2Div => from_f64(map2(lanes_f64(a), lanes_f64(b), |x, y| canon64(x / y))),
        V::F64x2Min => from_f64(map2(lanes_f64(a), lanes_f64(b), fmin64)),
        V::F64x2Max => from_f64(map2(lanes_f64(a), lanes_f64(b), fmax64)),
        V::F64x2Pmin => from_f64(map2(lanes_f64(a), lanes_f64(b), |x, y| if y < x { y } else { x })),
        V::F64x2Pmax => from_f64(map2(lanes_f64(a), lanes_f64(b), |x, y| if x < y { y } else { x })),

        V::I8x16Swizzle => {
            let idx = b;
            core::array::from_fn(|i| if idx[i] < 16 { a[idx[i] as usize] } else { 0 })
        }

        _ => unreachable!("vector opcode {op:?} is not a binary op"),
    };
    push_v128(ctx, out)
}

fn shift(ctx: &mut ExecutionContext<impl Allocator + Clone>, op: VectorOpcode) -> Result<(), Error> {
    use VectorOpcode as V;

    let count = pop_i32(ctx) as u32;
    let v = pop_v128(ctx);
    let out = match op {
        V::I8x16Shl => from_i8(map1(lanes_i8(v), |x| x.wrapping_shl(count & 7))),
        V::I8x16ShrS => from_i8(map1(lanes_i8(v), |x| x.wrapping_shr(count & 7))),
        V::I8x16ShrU => map1(v, |x| x.wrapping_shr(count & 7)),
        V::I16x8Shl => from_i16(map1(lanes_i16(v), |x| x.wrapping_shl(count & 15))),
        V::I16x8ShrS => from_i16(map1(lanes_i16(v), |x| x.wrapping_shr(count & 15))),
        V::I16x8ShrU => from_u16(map1(lanes_u16(v), |x| x.wrapping_shr(count & 15))),
        V::I32x4Shl => from_i32(map1(lanes_i32(v), |x| x.wrapping_shl(count & 31))),
        V::I32x4ShrS => from_i32(map1(lanes_i32(v), |x| x.wrapping_shr(count & 31))),
        V::I32x4ShrU => from_u32(map1(lanes_u32(v), |x| x.wrapping_shr(count & 31))),
        V::I64x2Shl => from_i64(map1(lanes_i64(v), |x| x.wrapping_shl(count & 63))),
        V::I64x2ShrS => from_i64(map1(lanes_i64(v), |x| x.wrapping_shr(count & 63))),
        V::I64x2ShrU => from_u64(map1(lanes_u64(v), |x| x.wrapping_shr(count & 63))),
        _ => unreachable!("vector opcode {op:?} is not a shift"),
    };
    push_v128(ctx, out)
}

fn reduce(ctx: &mut ExecutionContext<impl Allocator + Clone>, op: VectorOpcode) -> Result<(), Error> {
    use VectorOpcode as V;

    let v = pop_v128(ctx);
    let result = match op {
        V::V128AnyTrue => i32::from(v.iter().any(|&b| b != 0)),
        V::I8x16AllTrue => i32::from(lanes_i8(v).iter().all(|&x| x != 0)),
        V::I16x8AllTrue => i32::from(lanes_i16(v).iter().all(|&x| x != 0)),
        V::I32x4AllTrue => i32::from(lanes_i32(v).iter().all(|&x| x != 0)),
        V::I64x2AllTrue => i32::from(lanes_i64(v).iter().all(|&x| x != 0)),
        V::I8x16Bitmask => {
            lanes_i8(v).iter().enumerate().fold(0i32, |acc, (i, &x)| acc | (i32::from(x < 0) << i))
        }
        V::I16x8Bitmask => {
            lanes_i16(v).iter().enumerate().fold(0i32, |acc, (i, &x)| acc | (i32::from(x < 0) << i))
        }
        V::I32x4Bitmask => {
            lanes_i32(v).iter().enumerate().fold(0i32, |acc, (i, &x)| acc | (i32::from(x < 0) << i))
        }
        V::I64x2Bitmask => {
            lanes_i64(v).iter().enumerate().fold(0i32, |acc, (i, &x)| acc | (i32::from(x < 0) << i))
        }
        _ => unreachable!("vector opcode {op:?} is not a reduction"),
    };
    ctx.push_slot(Slot::from_i32(result))
}

fn splat(ctx: &mut ExecutionContext<impl Allocator + Clone>, op: VectorOpcode) -> Result<(), Error> {
    use VectorOpcode as V;

    let out = match op {
        V::I8x16Splat => {
            let x = ctx.value_stack.pop().expect("validated: operand present").as_i32() as u8;
            [x; 16]
        }
        V::I16x8Splat => {
            let x = ctx.value_stack.pop().expect("validated: operand present").as_i32() as i16;
            from_i16([x; 8])
        }
        V::I32x4Splat => {
            let x = ctx.value_stack.pop().expect("validated: operand present").as_i32();
            from_i32([x; 4])
        }
        V::I64x2Splat => {
            let x = ctx.value_stack.pop().expect("validated: operand present").as_i64();
            from_i64([x; 2])
        }
        V::F32x4Splat => {
            let x = ctx.value_stack.pop().expect("validated: operand present").as_f32();
            from_f32([x; 4])
        }
        V::F64x2Splat => {
            let x = ctx.value_stack.pop().expect("validated: operand present").as_f64();
            from_f64([x; 2])
        }
        _ => unreachable!("vector opcode {op:?} is not a splat"),
    };
    push_v128(ctx, out)
}

fn bitselect(ctx: &mut ExecutionContext<impl Allocator + Clone>) -> Result<(), Error> {
    let c = pop_v128(ctx);
    let v2 = pop_v128(ctx);
    let v1 = pop_v128(ctx);
    let out = core::array::from_fn(|i| (v1[i] & c[i]) | (v2[i] & !c[i]));
    push_v128(ctx, out)
}

fn op(ctx: &mut ExecutionContext<impl Allocator + Clone>, op: VectorOpcode) -> Result<(), Error> {
    use VectorOpcode as V;

    match op {
        V::V128Not
        | V::I8x16Abs
        | V::I8x16Neg
        | V::I8x16Popcnt
        | V::I16x8ExtaddPairwiseI8x16S
        | V::I16x8ExtaddPairwiseI8x16U
        | V::I16x8Abs
        | V::I16x8Neg
        | V::I16x8ExtendLowI8x16S
        | V::I16x8ExtendHighI8x16S
        | V::I16x8ExtendLowI8x16U
        | V::I16x8ExtendHighI8x16U
        | V::I32x4ExtaddPairwiseI16x8S
        | V::I32x4ExtaddPairwiseI16x8U
        | V::I32x4Abs
        | V::I32x4Neg
        | V::I32x4ExtendLowI16x8S
        | V::I32x4ExtendHighI16x8S
        | V::I32x4ExtendLowI16x8U
        | V::I32x4ExtendHighI16x8U
        | V::I64x2Abs
        | V::I64x2Neg
        | V::I64x2ExtendLowI32x4S
        | V::I64x2ExtendHighI32x4S
        | V::I64x2ExtendLowI32x4U
        | V::I64x2ExtendHighI32x4U
        | V::F32x4Ceil
        | V::F32x4Floor
        | V::F32x4Trunc
        | V::F32x4Nearest
        | V::F32x4Abs
        | V::F32x4Neg
        | V::F32x4Sqrt
        | V::F64x2Ceil
        | V::F64x2Floor
        | V::F64x2Trunc
        | V::F64x2Nearest
        | V::F64x2Abs
        | V::F64x2Neg
        | V::F64x2Sqrt
        | V::I32x4TruncSatF32x4S
        | V::I32x4TruncSatF32x4U
        | V::F32x4ConvertI32x4S
        | V::F32x4ConvertI32x4U
        | V::I32x4TruncSatF64x2SZero
        | V::I32x4TruncSatF64x2UZero
        | V::F64x2ConvertLowI32x4S
        | V::F64x2ConvertLowI32x4U
        | V::F32x4DemoteF64x2Zero
        | V::F64x2PromoteLowF32x4 => unop(ctx, op),

        V::I8x16Eq
        | V::I8x16Ne
        | V::I8x16LtS
        | V::I8x16LtU
        | V::I8x16GtS
        | V::I8x16GtU
        | V::I8x16LeS
        | V::I8x16LeU
        | V::I8x16GeS
        | V::I8x16GeU
        | V::I16x8Eq
        | V::I16x8Ne
        | V::I16x8LtS
        | V::I16x8LtU
        | V::I16x8GtS
        | V::I16x8GtU
        | V::I16x8LeS
        | V::I16x8LeU
        | V::I16x8GeS
        | V::I16x8GeU
        | V::I32x4Eq
        | V::I32x4Ne
        | V::I32x4LtS
        | V::I32x4LtU
        | V::I32x4GtS
        | V::I32x4GtU
        | V::I32x4LeS
        | V::I32x4LeU
        | V::I32x4GeS
        | V::I32x4GeU
        | V::I64x2Eq
        | V::I64x2Ne
        | V::I64x2LtS
        | V::I64x2GtS
        | V::I64x2LeS
        | V::I64x2GeS
        | V::F32x4Eq
        | V::F32x4Ne
        | V::F32x4Lt
        | V::F32x4Gt
        | V::F32x4Le
        | V::F32x4Ge
        | V::F64x2Eq
        | V::F64x2Ne
        | V::F64x2Lt
        | V::F64x2Gt
        | V::F64x2Le
        | V::F64x2Ge
        | V::V128And
        | V::V128Andnot
        | V::V128Or
        | V::V128Xor
        | V::I8x16NarrowI16x8S
        | V::I8x16NarrowI16x8U
        | V::I16x8NarrowI32x4S
        | V::I16x8NarrowI32x4U
        | V::I8x16Add
        | V::I8x16AddSatS
        | V::I8x16AddSatU
        | V::I8x16Sub
        | V::I8x16SubSatS
        | V::I8x16SubSatU
        | V::I8x16MinS
        | V::I8x16MinU
        | V::I8x16MaxS
        | V::I8x16MaxU
        | V::I8x16AvgrU
        | V::I16x8Add
        | V::I16x8AddSatS
        | V::I16x8AddSatU
        | V::I16x8Sub
        | V::I16x8SubSatS
        | V::I16x8SubSatU
        | V::I16x8Mul
        | V::I16x8MinS
        | V::I16x8MinU
        | V::I16x8MaxS
        | V::I16x8MaxU
        | V::I16x8AvgrU
        | V::I16x8Q15mulrSatS
        | V::I16x8ExtmulLowI8x16S
        | V::I16x8ExtmulHighI8x16S
        | V::I16x8ExtmulLowI8x16U
        | V::I16x8ExtmulHighI8x16U
        | V::I32x4Add
        | V::I32x4Sub
        | V::I32x4Mul
        | V::I32x4MinS
        | V::I32x4MinU
        | V::I32x4MaxS
        | V::I32x4MaxU
        | V::I32x4DotI16x8S
        | V::I32x4ExtmulLowI16x8S
        | V::I32x4ExtmulHighI16x8S
        | V::I32x4ExtmulLowI16x8U
        | V::I32x4ExtmulHighI16x8U
        | V::I64x2Add
        | V::I64x2Sub
        | V::I64x2Mul
        | V::I64x2ExtmulLowI32x4S
        | V::I64x2ExtmulHighI32x4S
        | V::I64x2ExtmulLowI32x4U
        | V::I64x2ExtmulHighI32x4U
        | V::F32x4Add
        | V::F32x4Sub
        | V::F32x4Mul
        | V::F32x4Div
        | V::F32x4Min
        | V::F32x4Max
        | V::F32x4Pmin
        | V::F32x4Pmax
        | V::F64x2Add
        | V::F64x2Sub
        | V::F64x2Mul
        | V::F64x2Div
        | V::F64x2Min
        | V::F64x2Max
        | V::F64x2Pmin
        | V::F64x2Pmax
        | V::I8x16Swizzle => binop(ctx, op),

        V::I8x16Shl
        | V::I8x16ShrS
        | V::I8x16ShrU
        | V::I16x8Shl
        | V::I16x8ShrS
        | V::I16x8ShrU
        | V::I32x4Shl
        | V::I32x4ShrS
        | V::I32x4ShrU
        | V::I64x2Shl
        | V::I64x2ShrS
        | V::I64x2ShrU => shift(ctx, op),

        V::V128AnyTrue
        | V::I8x16AllTrue
        | V::I8x16Bitmask
        | V::I16x8AllTrue
        | V::I16x8Bitmask
        | V::I32x4AllTrue
        | V::I32x4Bitmask
        | V::I64x2AllTrue
        | V::I64x2Bitmask => reduce(ctx, op),

        V::I8x16Splat | V::I16x8Splat | V::I32x4Splat | V::I64x2Splat | V::F32x4Splat | V::F64x2Splat => {
            splat(ctx, op)
        }

        V::V128Bitselect => bitselect(ctx),

        _ => unreachable!("vector opcode {op:?} has its own VecInstr variant"),
    }
}

fn lane_width(op: VectorOpcode) -> usize {
    use VectorOpcode as V;
    match op {
        V::V128Load8Lane | V::V128Store8Lane => 1,
        V::V128Load16Lane | V::V128Store16Lane => 2,
        V::V128Load32Lane | V::V128Store32Lane => 4,
        V::V128Load64Lane | V::V128Store64Lane => 8,
        _ => unreachable!("vector opcode {op:?} has no lane memory width"),
    }
}

fn load(ctx: &mut ExecutionContext<impl Allocator + Clone>, op: VectorOpcode, memarg: MemArg) -> Result<(), Error> {
    use VectorOpcode as V;

    let addr = pop_i32(ctx) as u32;
    let memory = ctx.memory.as_ref().expect("validated: memory present for a v128 load");
    let out = match op {
        V::V128Load => {
            let mut buf = [0u8; 16];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            buf
        }
        V::V128Load8x8S => {
            let mut buf = [0u8; 8];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            from_i16(core::array::from_fn(|i| i16::from(buf[i] as i8)))
        }
        V::V128Load8x8U => {
            let mut buf = [0u8; 8];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            from_u16(core::array::from_fn(|i| u16::from(buf[i])))
        }
        V::V128Load16x4S => {
            let mut buf = [0u8; 8];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            let lanes: [i16; 4] = core::array::from_fn(|i| i16::from_le_bytes([buf[2 * i], buf[2 * i + 1]]));
            from_i32(core::array::from_fn(|i| i32::from(lanes[i])))
        }
        V::V128Load16x4U => {
            let mut buf = [0u8; 8];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            let lanes: [u16; 4] = core::array::from_fn(|i| u16::from_le_bytes([buf[2 * i], buf[2 * i + 1]]));
            from_u32(core::array::from_fn(|i| u32::from(lanes[i])))
        }
        V::V128Load32x2S => {
            let mut buf = [0u8; 8];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            let lanes: [i32; 2] =
                core::array::from_fn(|i| i32::from_le_bytes([buf[4 * i], buf[4 * i + 1], buf[4 * i + 2], buf[4 * i + 3]]));
            from_i64(core::array::from_fn(|i| i64::from(lanes[i])))
        }
        V::V128Load32x2U => {
            let mut buf = [0u8; 8];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            let lanes: [u32; 2] =
                core::array::from_fn(|i| u32::from_le_bytes([buf[4 * i], buf[4 * i + 1], buf[4 * i + 2], buf[4 * i + 3]]));
            from_u64(core::array::from_fn(|i| u64::from(lanes[i])))
        }
        V::V128Load8Splat => {
            let mut buf = [0u8; 1];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            [buf[0]; 16]
        }
        V::V128Load16Splat => {
            let mut buf = [0u8; 2];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            from_u16([u16::from_le_bytes(buf); 8])
        }
        V::V128Load32Splat => {
            let mut buf = [0u8; 4];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            from_u32([u32::from_le_bytes(buf); 4])
        }
        V::V128Load64Splat => {
            let mut buf = [0u8; 8];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            from_u64([u64::from_le_bytes(buf); 2])
        }
        V::V128Load32Zero => {
            let mut buf = [0u8; 16];
            memory.read(addr, memarg.offset, &mut buf[0..4]).map_err(Error::Trap)?;
            buf
        }
        V::V128Load64Zero => {
            let mut buf = [0u8; 16];
            memory.read(addr, memarg.offset, &mut buf[0..8]).map_err(Error::Trap)?;
            buf
        }
        _ => unreachable!("vector opcode {op:?} is not a v128 load"),
    };
    push_v128(ctx, out)
}

fn store(ctx: &mut ExecutionContext<impl Allocator + Clone>, memarg: MemArg) -> Result<(), Error> {
    let value = pop_v128(ctx);
    let addr = pop_i32(ctx) as u32;
    ctx.memory
        .as_mut()
        .expect("validated: memory present for a v128 store")
        .write(addr, memarg.offset, &value)
        .map_err(Error::Trap)
}

fn load_lane(
    ctx: &mut ExecutionContext<impl Allocator + Clone>,
    op: VectorOpcode,
    memarg: MemArg,
    lane: u8,
) -> Result<(), Error> {
    let mut into = pop_v128(ctx);
    let addr = pop_i32(ctx) as u32;
    let width = lane_width(op);
    let memory = ctx.memory.as_ref().expect("validated: memory present for a v128 load_lane");
    let start = lane as usize * width;
    memory.read(addr, memarg.offset, &mut into[start..start + width]).map_err(Error::Trap)?;
    push_v128(ctx, into)
}

fn store_lane(
    ctx: &mut ExecutionContext<impl Allocator + Clone>,
    op: VectorOpcode,
    memarg: MemArg,
    lane: u8,
) -> Result<(), Error> {
    let from = pop_v128(ctx);
    let addr = pop_i32(ctx) as u32;
    let width = lane_width(op);
    let start = lane as usize * width;
    ctx.memory
        .as_mut()
        .expect("validated: memory present for a v128 store_lane")
        .write(addr, memarg.offset, &from[start..start + width])
        .map_err(Error::Trap)
}

fn shuffle(ctx: &mut ExecutionContext<impl Allocator + Clone>, lanes: [u8; 16]) -> Result<(), Error> {
    let b = pop_v128(ctx);
    let a = pop_v128(ctx);
    let combined = {
        let mut both = [0u8; 32];
        both[..16].copy_from_slice(&a);
        both[16..].copy_from_slice(&b);
        both
    };
    // Validation bounds every shuffle immediate to < 32, so indexing is safe.
    let out = core::array::from_fn(|i| combined[lanes[i] as usize]);
    push_v128(ctx, out)
}

fn lane_op(ctx: &mut ExecutionContext<impl Allocator + Clone>, op: VectorOpcode, lane: u8) -> Result<(), Error> {
    use VectorOpcode as V;
    let lane = lane as usize;

    match op {
        V::I8x16ExtractLaneS => {
            let v = pop_v128(ctx);
            ctx.push_slot(Slot::from_i32(i32::from(lanes_i8(v)[lane])))
        }
        V::I8x16ExtractLaneU => {
            let v = pop_v128(ctx);
            ctx.push_slot(Slot::from_i32(i32::from(v[lane])))
        }
        V::I16x8ExtractLaneS => {
            let v = pop_v128(ctx);
            ctx.push_slot(Slot::from_i32(i32::from(lanes_i16(v)[lane])))
        }
        V::I16x8ExtractLaneU => {
            let v = pop_v128(ctx);
            ctx.push_slot(Slot::from_i32(i32::from(lanes_u16(v)[lane])))
        }
        V::I32x4ExtractLane => {
            let v = pop_v128(ctx);
            ctx.push_slot(Slot::from_i32(lanes_i32(v)[lane]))
        }
        V::I64x2ExtractLane => {
            let v = pop_v128(ctx);
            ctx.push_slot(Slot::from_i64(lanes_i64(v)[lane]))
        }
        V::F32x4ExtractLane => {
            let v = pop_v128(ctx);
            ctx.push_slot(Slot::from_f32(lanes_f32(v)[lane]))
        }
        V::F64x2ExtractLane => {
            let v = pop_v128(ctx);
            ctx.push_slot(Slot::from_f64(lanes_f64(v)[lane]))
        }
        V::I8x16ReplaceLane => {
            let x = pop_i32(ctx) as u8;
            let mut v = pop_v128(ctx);
            v[lane] = x;
            push_v128(ctx, v)
        }
        V::I16x8ReplaceLane => {
            let x = pop_i32(ctx) as i16;
            let v = pop_v128(ctx);
            let mut lanes = lanes_i16(v);
            lanes[lane] = x;
            push_v128(ctx, from_i16(lanes))
        }
        V::I32x4ReplaceLane => {
            let x = pop_i32(ctx);
            let v = pop_v128(ctx);
            let mut lanes = lanes_i32(v);
            lanes[lane] = x;
            push_v128(ctx, from_i32(lanes))
        }
        V::I64x2ReplaceLane => {
            let x = ctx.value_stack.pop().expect("validated: operand present").as_i64();
            let v = pop_v128(ctx);
            let mut lanes = lanes_i64(v);
            lanes[lane] = x;
            push_v128(ctx, from_i64(lanes))
        }
        V::F32x4ReplaceLane => {
            let x = ctx.value_stack.pop().expect("validated: operand present").as_f32();
            let v = pop_v128(ctx);
            let mut lanes = lanes_f32(v);
            lanes[lane] = x;
            push_v128(ctx, from_f32(lanes))
        }
        V::F64x2ReplaceLane => {
            let x = ctx.value_stack.pop().expect("validated: operand present").as_f64();
            let v = pop_v128(ctx);
            let mut lanes = lanes_f64(v);
            lanes[lane] = x;
            push_v128(ctx, from_f64(lanes))
        }
        _ => unreachable!("vector opcode {op:?} is not a lane extract/replace"),
    }
}

pub(crate) fn eval<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>, instr: &VecInstr) -> Result<(), Error> {
    match instr {
        VecInstr::Op(vop) => op(ctx, *vop),
        VecInstr::Load { op: vop, memarg } => load(ctx, *vop, *memarg),
        VecInstr::Store(memarg) => store(ctx, *memarg),
        VecInstr::LoadLane { op: vop, memarg, lane } => load_lane(ctx, *vop, *memarg, *lane),
        VecInstr::StoreLane { op: vop, memarg, lane } => store_lane(ctx, *vop, *memarg, *lane),
        VecInstr::Const(bytes) => push_v128(ctx, bytes.0),
        VecInstr::Shuffle(lanes) => shuffle(ctx, lanes.0),
        VecInstr::Lane { op: vop, lane } => lane_op(ctx, *vop, *lane),
    }
}
