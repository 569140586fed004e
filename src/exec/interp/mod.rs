// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! The bytecode interpreter.
//!
//! `run` drives a `Bytecode`'s pre-decoded instruction stream to completion
//! or a trap, using an explicit `call_stack` instead of native recursion so
//! that call depth is a configured, checked resource rather than a call into
//! the host stack. `block`/`loop`/`if`/`else`/`end` produce no instructions
//! at all (see `bytecode::instr`): falling off the end of a function's
//! instruction stream is handled identically to an explicit `return`.
//!
//! Float-producing arithmetic canonicalizes every NaN result to a single
//! positive quiet NaN (`0x7fc0_0000` for f32, `0x7ff8_0000_0000_0000` for
//! f64); bit-preserving operations (loads, stores, consts, reinterprets,
//! lane-wise bitwise ops) never do. See `numeric` and `simd` for the
//! instructions this applies to.

mod numeric;
mod simd;

use crate::Allocator;
use crate::core_compat::vec::Vec;
use crate::types::{CallIndirectOperands, FunctionType, MemArg, Opcode};
use crate::{constexpr, Module};

use super::context::{local_to_slot, ExecutionContext};
use super::error::{Error, Trap};
use super::frame::Frame;
use super::table;
use super::value::Slot;

use crate::bytecode::{BulkInstr, Instr, VecInstr};
use crate::types::ElementInit;

pub(crate) fn run<A: Allocator + Clone>(ctx: &mut ExecutionContext<'_, A>) -> Result<(), Error> {
    let module = ctx.module;
    loop {
        let frame = *ctx.call_stack.last().expect("run: call stack non-empty while running");
        let bytecode = &module.bytecode[frame.func_idx as usize];
        if frame.ip as usize >= bytecode.instrs.len() {
            if do_return(ctx)? {
                return Ok(());
            }
            continue;
        }
        let instr = &bytecode.instrs[frame.ip as usize];
        if step(ctx, module, frame, instr)? {
            return Ok(());
        }
    }
}

fn advance<A: Allocator>(ctx: &mut ExecutionContext<A>) {
    ctx.call_stack.last_mut().expect("run: call stack non-empty").ip += 1;
}

fn set_ip<A: Allocator>(ctx: &mut ExecutionContext<A>, ip: u32) {
    ctx.call_stack.last_mut().expect("run: call stack non-empty").ip = ip;
}

fn apply_branch<A: Allocator>(ctx: &mut ExecutionContext<A>, target: crate::bytecode::BranchTarget) {
    let stack = &mut ctx.value_stack;
    if target.keep == 1 {
        let top = stack.len() - 1;
        let kept = stack[top];
        let dest = top - target.drop as usize;
        stack[dest] = kept;
        stack.truncate(dest + 1);
    } else {
        let new_len = stack.len() - target.drop as usize;
        stack.truncate(new_len);
    }
    set_ip(ctx, target.ip);
}

/// Pops the current frame. Returns `Ok(true)` when that was the outermost
/// frame, meaning the whole `run` has finished: the result value (if any) is
/// left exactly where `ExecutionContext::invoke` expects to find it, on top
/// of its own locals, for it to clean up itself. For a nested return, the
/// callee's locals and argument region collapse down to just the result.
fn do_return<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>) -> Result<bool, Error> {
    let frame = *ctx.call_stack.last().expect("run: call stack non-empty");
    let module = ctx.module;
    let typeidx = module
        .funcsec
        .get(frame.func_idx as usize)
        .copied()
        .expect("validated: current frame's function index in range");
    let has_result = !module.typesec[*typeidx as usize].results.is_empty();

    ctx.call_stack.pop();
    if ctx.call_stack.is_empty() {
        return Ok(true);
    }

    let result = if has_result {
        Some(ctx.value_stack.pop().expect("validated: function leaves a result value"))
    } else {
        None
    };
    ctx.value_stack.truncate(frame.locals_offset as usize);
    if let Some(v) = result {
        ctx.push_slot(v)?;
    }
    Ok(false)
}

fn call_function<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>, funcidx: u32) -> Result<(), Error> {
    if ctx.call_stack.len() as u32 >= ctx.config.max_call_depth {
        return Err(Error::CallStackOverflow);
    }

    let module = ctx.module;
    let typeidx = module
        .funcsec
        .get(funcidx as usize)
        .copied()
        .expect("validated: call target in range");
    let ty = &module.typesec[*typeidx as usize];
    let locals_offset = ctx.value_stack.len() as u32 - ty.parameters.len() as u32;

    let function = module
        .codesec
        .get(funcidx as usize)
        .expect("validated: call target in range");
    for local in function.locals.iter() {
        ctx.push_slot(local_to_slot(local))?;
    }

    ctx.call_stack.push(Frame {
        ip: 0,
        locals_offset,
        func_idx: funcidx,
    });
    Ok(())
}

fn function_types_equal<A: Allocator>(a: &FunctionType<A>, b: &FunctionType<A>) -> bool {
    a.parameters.iter().eq(b.parameters.iter()) && a.results.iter().eq(b.results.iter())
}

fn call_indirect<A: Allocator + Clone>(
    ctx: &mut ExecutionContext<A>,
    ops: &CallIndirectOperands,
) -> Result<(), Error> {
    let elem_idx = ctx.value_stack.pop().expect("validated: operand present").as_u32();
    let funcref = ctx.tables[*ops.table as usize].get(elem_idx).map_err(Error::Trap)?;
    if funcref == table::NULL {
        return Err(Error::Trap(Trap::UninitializedElement));
    }

    let module = ctx.module;
    let expected = &module.typesec[*ops.ty as usize];
    let actual_typeidx = module
        .funcsec
        .get(funcref as usize)
        .copied()
        .expect("validated: table holds a module-defined function index");
    let actual = &module.typesec[*actual_typeidx as usize];
    if !function_types_equal(expected, actual) {
        return Err(Error::Trap(Trap::IndirectCallTypeMismatch));
    }

    call_function(ctx, funcref)
}

fn mem_write<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>, addr: u32, memarg: MemArg, data: &[u8]) -> Result<(), Error> {
    ctx.memory
        .as_mut()
        .expect("validated: memory present for a store")
        .write(addr, memarg.offset, data)
        .map_err(Error::Trap)
}

fn load<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>, op: Opcode, memarg: MemArg) -> Result<(), Error> {
    let addr = ctx.value_stack.pop().expect("validated: operand present").as_u32();
    let memory = ctx.memory.as_ref().expect("validated: memory present for a load");
    let slot = match op {
        Opcode::I32Load => {
            let mut buf = [0u8; 4];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i32(i32::from_le_bytes(buf))
        }
        Opcode::I64Load => {
            let mut buf = [0u8; 8];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i64(i64::from_le_bytes(buf))
        }
        Opcode::F32Load => {
            let mut buf = [0u8; 4];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_f32(f32::from_le_bytes(buf))
        }
        Opcode::F64Load => {
            let mut buf = [0u8; 8];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_f64(f64::from_le_bytes(buf))
        }
        Opcode::I32Load8S => {
            let mut buf = [0u8; 1];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i32(i32::from(buf[0] as i8))
        }
        Opcode::I32Load8U => {
            let mut buf = [0u8; 1];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i32(i32::from(buf[0]))
        }
        Opcode::I32Load16S => {
            let mut buf = [0u8; 2];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i32(i32::from(i16::from_le_bytes(buf)))
        }
        Opcode::I32Load16U => {
            let mut buf = [0u8; 2];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i32(i32::from(u16::from_le_bytes(buf)))
        }
        Opcode::I64Load8S => {
            let mut buf = [0u8; 1];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i64(i64::from(buf[0] as i8))
        }
        Opcode::I64Load8U => {
            let mut buf = [0u8; 1];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i64(i64::from(buf[0]))
        }
        Opcode::I64Load16S => {
            let mut buf = [0u8; 2];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i64(i64::from(i16::from_le_bytes(buf)))
        }
        Opcode::I64Load16U => {
            let mut buf = [0u8; 2];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i64(i64::from(u16::from_le_bytes(buf)))
        }
        Opcode::I64Load32S => {
            let mut buf = [0u8; 4];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i64(i64::from(i32::from_le_bytes(buf)))
        }
        Opcode::I64Load32U => {
            let mut buf = [0u8; 4];
            memory.read(addr, memarg.offset, &mut buf).map_err(Error::Trap)?;
            Slot::from_i64(i64::from(u32::from_le_bytes(buf)))
        }
        _ => unreachable!("opcode {op:?} is not a load"),
    };
    ctx.push_slot(slot)
}

fn store<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>, op: Opcode, memarg: MemArg) -> Result<(), Error> {
    match op {
        Opcode::I32Store => {
            let value = ctx.value_stack.pop().expect("validated: operand present").as_i32();
            let addr = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            mem_write(ctx, addr, memarg, &value.to_le_bytes())
        }
        Opcode::I64Store => {
            let value = ctx.value_stack.pop().expect("validated: operand present").as_i64();
            let addr = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            mem_write(ctx, addr, memarg, &value.to_le_bytes())
        }
        Opcode::F32Store => {
            let value = ctx.value_stack.pop().expect("validated: operand present").as_f32();
            let addr = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            mem_write(ctx, addr, memarg, &value.to_le_bytes())
        }
        Opcode::F64Store => {
            let value = ctx.value_stack.pop().expect("validated: operand present").as_f64();
            let addr = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            mem_write(ctx, addr, memarg, &value.to_le_bytes())
        }
        Opcode::I32Store8 => {
            let value = ctx.value_stack.pop().expect("validated: operand present").as_i32();
            let addr = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            mem_write(ctx, addr, memarg, &[value as u8])
        }
        Opcode::I32Store16 => {
            let value = ctx.value_stack.pop().expect("validated: operand present").as_i32();
            let addr = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            mem_write(ctx, addr, memarg, &(value as u16).to_le_bytes())
        }
        Opcode::I64Store8 => {
            let value = ctx.value_stack.pop().expect("validated: operand present").as_i64();
            let addr = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            mem_write(ctx, addr, memarg, &[value as u8])
        }
        Opcode::I64Store16 => {
            let value = ctx.value_stack.pop().expect("validated: operand present").as_i64();
            let addr = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            mem_write(ctx, addr, memarg, &(value as u16).to_le_bytes())
        }
        Opcode::I64Store32 => {
            let value = ctx.value_stack.pop().expect("validated: operand present").as_i64();
            let addr = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            mem_write(ctx, addr, memarg, &(value as u32).to_le_bytes())
        }
        _ => unreachable!("opcode {op:?} is not a store"),
    }
}

// Materializes an element segment's values as a plain index array, the same
// way an active segment's are computed at instantiation time (see
// `ExecutionContext::init_elements`), except it allocates its own buffer and
// treats a dropped segment as empty (matching `elem.drop`'s semantics for a
// subsequent passive `table.init`).
fn elem_segment_values<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>, elemidx: usize) -> Result<Vec<u32, A>, Error> {
    let mut values: Vec<u32, A> = Vec::new_in(ctx.alloc.clone());
    if ctx.elem_dropped[elemidx] {
        return Ok(values);
    }

    let module = ctx.module;
    let elem = &module.elemsec[elemidx];
    let len = match &elem.init {
        ElementInit::FunctionIndices(v) => v.len(),
        ElementInit::Expressions(v) => v.len(),
    };
    values.try_reserve_exact(len)?;
    match &elem.init {
        ElementInit::FunctionIndices(v) => {
            for f in v.iter() {
                values.push(**f);
            }
        }
        ElementInit::Expressions(v) => {
            for e in v.iter() {
                values.push(constexpr::eval_const_value(e) as u32);
            }
        }
    }
    Ok(values)
}

fn bulk_instr<A: Allocator + Clone>(ctx: &mut ExecutionContext<A>, instr: &BulkInstr) -> Result<(), Error> {
    match instr {
        BulkInstr::Trunc(op) => numeric::eval_trunc_sat(ctx, *op),

        BulkInstr::MemoryCopy => {
            let len = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let src = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let dst = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            ctx.memory
                .as_mut()
                .expect("validated: memory present")
                .copy_within(dst, src, len)
                .map_err(Error::Trap)
        }
        BulkInstr::MemoryFill => {
            let len = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let value = ctx.value_stack.pop().expect("validated: operand present").as_u32() as u8;
            let dst = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            ctx.memory
                .as_mut()
                .expect("validated: memory present")
                .fill(dst, value, len)
                .map_err(Error::Trap)
        }
        BulkInstr::MemoryInit(dataidx) => {
            let len = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let src = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let dst = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let module = ctx.module;
            let dataidx = *dataidx as usize;
            let empty: &[u8] = &[];
            let data: &[u8] = if ctx.data_dropped[dataidx] {
                empty
            } else {
                &module.datasec[dataidx].init
            };
            ctx.memory
                .as_mut()
                .expect("validated: memory present")
                .init(dst, data, src, len)
                .map_err(Error::Trap)
        }
        BulkInstr::DataDrop(dataidx) => {
            ctx.data_dropped[*dataidx as usize] = true;
            Ok(())
        }
        BulkInstr::TableCopy(ops) => {
            let len = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let src = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let dst = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let src_idx = *ops.src as usize;
            let dst_idx = *ops.dst as usize;
            if src_idx == dst_idx {
                ctx.tables[dst_idx].copy_within(dst, src, len).map_err(Error::Trap)
            } else if dst_idx < src_idx {
                let (left, right) = ctx.tables.split_at_mut(src_idx);
                left[dst_idx].copy_from(dst, &right[0], src, len).map_err(Error::Trap)
            } else {
                let (left, right) = ctx.tables.split_at_mut(dst_idx);
                right[0].copy_from(dst, &left[src_idx], src, len).map_err(Error::Trap)
            }
        }
        BulkInstr::TableInit(ops) => {
            let len = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let src = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let dst = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let values = elem_segment_values(ctx, *ops.elem as usize)?;
            ctx.tables[*ops.table as usize].init(dst, &values, src, len).map_err(Error::Trap)
        }
        BulkInstr::TableGrow(tableidx) => {
            let init = ctx.value_stack.pop().expect("validated: operand present").as_ref_idx();
            let delta = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let result = ctx.tables[*tableidx as usize].grow(delta, init);
            ctx.push_slot(Slot::from_i32(result.map_or(-1, |prev| prev as i32)))
        }
        BulkInstr::TableSize(tableidx) => {
            let size = ctx.tables[*tableidx as usize].size();
            ctx.push_slot(Slot::from_u32(size))
        }
        BulkInstr::TableFill(tableidx) => {
            let len = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let value = ctx.value_stack.pop().expect("validated: operand present").as_ref_idx();
            let dst = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            ctx.tables[*tableidx as usize].fill(dst, value, len).map_err(Error::Trap)
        }
        BulkInstr::ElemDrop(elemidx) => {
            ctx.elem_dropped[*elemidx as usize] = true;
            Ok(())
        }
    }
}

/// Executes one pre-decoded instruction. Returns `Ok(true)` when it drove the
/// outermost function to completion (an explicit or implicit `return` there),
/// meaning `run` itself is done.
fn step<A: Allocator + Clone>(
    ctx: &mut ExecutionContext<A>,
    module: &Module<A>,
    frame: Frame,
    instr: &Instr<A>,
) -> Result<bool, Error> {
    match instr {
        Instr::Unreachable => return Err(Error::Trap(Trap::Unreachable)),
        Instr::Nop => advance(ctx),

        Instr::Br(target) => apply_branch(ctx, *target),
        Instr::BrIf(target) => {
            let cond = ctx.value_stack.pop().expect("validated: operand present").as_i32();
            if cond != 0 {
                apply_branch(ctx, *target);
            } else {
                advance(ctx);
            }
        }
        Instr::BrIfFalse(target_ip) => {
            let cond = ctx.value_stack.pop().expect("validated: operand present").as_i32();
            if cond == 0 {
                set_ip(ctx, *target_ip);
            } else {
                advance(ctx);
            }
        }
        Instr::BrTable(idx) => {
            let i = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let bytecode = &module.bytecode[frame.func_idx as usize];
            let table = &bytecode.br_tables[*idx as usize];
            let target = table.labels.get(i as usize).copied().unwrap_or(table.default);
            apply_branch(ctx, target);
        }
        Instr::Return => {
            if do_return(ctx)? {
                return Ok(true);
            }
        }
        Instr::Call(funcidx) => {
            advance(ctx);
            call_function(ctx, *funcidx)?;
        }
        Instr::CallIndirect(ops) => {
            advance(ctx);
            call_indirect(ctx, ops)?;
        }

        Instr::Drop => {
            ctx.value_stack.pop().expect("validated: operand present");
            advance(ctx);
        }
        Instr::Select | Instr::SelectT(_) => {
            let cond = ctx.value_stack.pop().expect("validated: operand present").as_i32();
            let b = ctx.value_stack.pop().expect("validated: operand present");
            let a = ctx.value_stack.pop().expect("validated: operand present");
            ctx.push_slot(if cond != 0 { a } else { b })?;
            advance(ctx);
        }

        Instr::LocalGet(idx) => {
            let slot = ctx.value_stack[(frame.locals_offset + idx) as usize];
            ctx.push_slot(slot)?;
            advance(ctx);
        }
        Instr::LocalSet(idx) => {
            let value = ctx.value_stack.pop().expect("validated: operand present");
            ctx.value_stack[(frame.locals_offset + idx) as usize] = value;
            advance(ctx);
        }
        Instr::LocalTee(idx) => {
            let value = *ctx.value_stack.last().expect("validated: operand present");
            ctx.value_stack[(frame.locals_offset + idx) as usize] = value;
            advance(ctx);
        }
        Instr::GlobalGet(idx) => {
            let slot = ctx.globals[*idx as usize];
            ctx.push_slot(slot)?;
            advance(ctx);
        }
        Instr::GlobalSet(idx) => {
            let value = ctx.value_stack.pop().expect("validated: operand present");
            ctx.globals[*idx as usize] = value;
            advance(ctx);
        }
        Instr::TableGet(idx) => {
            let elem_idx = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let v = ctx.tables[*idx as usize].get(elem_idx).map_err(Error::Trap)?;
            ctx.push_slot(Slot::from_ref(v))?;
            advance(ctx);
        }
        Instr::TableSet(idx) => {
            let value = ctx.value_stack.pop().expect("validated: operand present").as_ref_idx();
            let elem_idx = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            ctx.tables[*idx as usize].set(elem_idx, value).map_err(Error::Trap)?;
            advance(ctx);
        }

        Instr::RefNull(_) => {
            ctx.push_slot(Slot::NULL_REF)?;
            advance(ctx);
        }
        Instr::RefIsNull => {
            let v = ctx.value_stack.pop().expect("validated: operand present");
            ctx.push_slot(Slot::bool(v.is_null_ref()))?;
            advance(ctx);
        }
        Instr::RefFunc(idx) => {
            ctx.push_slot(Slot::from_ref(*idx))?;
            advance(ctx);
        }

        Instr::I32Const(v) => {
            ctx.push_slot(Slot::from_i32(*v))?;
            advance(ctx);
        }
        Instr::I64Const(v) => {
            ctx.push_slot(Slot::from_i64(*v))?;
            advance(ctx);
        }
        Instr::F32Const(v) => {
            ctx.push_slot(Slot::from_f32(*v))?;
            advance(ctx);
        }
        Instr::F64Const(v) => {
            ctx.push_slot(Slot::from_f64(*v))?;
            advance(ctx);
        }

        Instr::Load { op, memarg } => {
            load(ctx, *op, *memarg)?;
            advance(ctx);
        }
        Instr::Store { op, memarg } => {
            store(ctx, *op, *memarg)?;
            advance(ctx);
        }
        Instr::MemorySize => {
            let pages = ctx.memory.as_ref().expect("validated: memory present").page_count();
            ctx.push_slot(Slot::from_u32(pages))?;
            advance(ctx);
        }
        Instr::MemoryGrow => {
            let delta = ctx.value_stack.pop().expect("validated: operand present").as_u32();
            let result = ctx.memory.as_mut().expect("validated: memory present").grow(delta);
            ctx.push_slot(Slot::from_i32(result.map_or(-1, |prev| prev as i32)))?;
            advance(ctx);
        }

        Instr::Numeric(op) => {
            numeric::eval(ctx, *op)?;
            advance(ctx);
        }
        Instr::Bulk(bulk) => {
            bulk_instr(ctx, bulk)?;
            advance(ctx);
        }
        Instr::Vector(vec_instr) => {
            simd::eval(ctx, vec_instr)?;
            advance(ctx);
        }
    }
    Ok(false)
}
