// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Lowers a validated `Expression` into a flat, jump-resolved `Bytecode`.
//!
//! This is a single forward pass over the expression's instructions. Each
//! open `block`/`loop`/`if` pushes a frame onto a small control-frame stack;
//! a `br`/`br_if`/`br_table` targeting a `loop` resolves immediately, since
//! the loop's header has already been emitted, while one targeting a
//! `block`/`if` is left as a placeholder and backpatched once that
//! construct's matching `end` fixes its exit point. Because the expression
//! has already been validated, this pass never rejects anything; the only
//! way it can fail is allocation failure.

use crate::Allocator;
use crate::core_compat::alloc::collections::TryReserveError;
use crate::core_compat::vec::Vec;
use crate::cursor::ExpressionCursor;
use crate::types::{BulkOpcode, Expression, Opcode, ValType, VectorOpcode};
use crate::validate::BranchAdjust;

use super::instr::{BranchTarget, BrTableTargets, BulkInstr, Instr, VecInstr};
use super::Bytecode;

/// The only way lowering a validated expression can fail.
#[derive(Debug)]
pub enum Error {
    AllocError,
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Error::AllocError
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Block,
    Loop,
    If,
}

// A backpatch site: the index of a jump instruction (or a br_table target
// slot) whose real target isn't known until the enclosing construct's `end`.
#[derive(Clone, Copy)]
enum Patch {
    Jump(u32),
    BrTableDefault(u32),
    BrTableLabel(u32, u32),
}

struct Frame<A: Allocator> {
    kind: FrameKind,
    // Meaningful only for FrameKind::Loop: the index of the loop's first
    // instruction, the immediate target of any branch to this frame's label.
    loop_start: u32,
    // Meaningful only for FrameKind::If: the index of the conditional jump
    // emitted for the `if` itself.
    if_jump_idx: u32,
    has_else: bool,
    // Patch sites for branches to this frame's label, resolved once this
    // frame's `end` is reached and its exit point is known.
    patches: Vec<Patch, A>,
}

/// Lowers a validated function body or block into its bytecode form.
/// `max_stack_depth` is the operand-stack high-water mark the validator
/// computed for this same expression; it is threaded through unchanged so
/// the execution context can size a function's value stack once, up front.
/// `adjustments` is the validator's per-branch drop/keep list for this same
/// expression, one entry per `br`/`br_if`/`br_table` site (label and
/// default alike) in the exact order they're encountered below.
pub(crate) fn lower<A: Allocator + Clone>(
    expr: &Expression<A>,
    max_stack_depth: u32,
    adjustments: &[BranchAdjust],
    alloc: A,
) -> Result<Bytecode<A>, Error> {
    let mut cursor = ExpressionCursor::new(expr);
    let mut instrs: Vec<Instr<A>, A> = Vec::new_in(alloc.clone());
    let mut br_tables: Vec<BrTableTargets<A>, A> = Vec::new_in(alloc.clone());
    let mut frames: Vec<Frame<A>, A> = Vec::new_in(alloc.clone());
    let mut next_adjust = adjustments.iter().copied();

    frames.try_reserve(1)?;
    frames.push(Frame {
        kind: FrameKind::Block,
        loop_start: 0,
        if_jump_idx: 0,
        has_else: false,
        patches: Vec::new_in(alloc.clone()),
    });

    loop {
        let op = cursor.read_opcode();
        match op {
            Opcode::Unreachable => push(&mut instrs, Instr::Unreachable)?,
            Opcode::Nop => push(&mut instrs, Instr::Nop)?,

            Opcode::Block => {
                cursor.read_blocktype();
                push_frame(
                    &mut frames,
                    Frame {
                        kind: FrameKind::Block,
                        loop_start: 0,
                        if_jump_idx: 0,
                        has_else: false,
                        patches: Vec::new_in(alloc.clone()),
                    },
                )?;
            }
            Opcode::Loop => {
                cursor.read_blocktype();
                push_frame(
                    &mut frames,
                    Frame {
                        kind: FrameKind::Loop,
                        loop_start: instrs.len() as u32,
                        if_jump_idx: 0,
                        has_else: false,
                        patches: Vec::new_in(alloc.clone()),
                    },
                )?;
            }
            Opcode::If => {
                cursor.read_blocktype();
                let idx = instrs.len() as u32;
                push(&mut instrs, Instr::BrIfFalse(u32::MAX))?;
                push_frame(
                    &mut frames,
                    Frame {
                        kind: FrameKind::If,
                        loop_start: 0,
                        if_jump_idx: idx,
                        has_else: false,
                        patches: Vec::new_in(alloc.clone()),
                    },
                )?;
            }
            Opcode::Else => {
                // Jump, at the end of the `if` branch just executed, past
                // the `else` branch about to begin.
                let jump_idx = instrs.len() as u32;
                push(&mut instrs, Instr::Br(BranchTarget { ip: u32::MAX, drop: 0, keep: 0 }))?;

                let frame = frames.last_mut().expect("validated body");
                frame.patches.try_reserve(1)?;
                frame.patches.push(Patch::Jump(jump_idx));
                frame.has_else = true;

                // The `if`'s own conditional jump now has a concrete target.
                let else_start = instrs.len() as u32;
                instrs[frame.if_jump_idx as usize] = Instr::BrIfFalse(else_start);
            }
            Opcode::End => {
                let frame = frames.pop().expect("validated body");
                let after = instrs.len() as u32;
                if frame.kind == FrameKind::If && !frame.has_else {
                    instrs[frame.if_jump_idx as usize] = Instr::BrIfFalse(after);
                }
                flush_patches(frame.patches, after, &mut instrs, &mut br_tables);
                if frames.is_empty() {
                    break;
                }
            }

            Opcode::Br => {
                let labelidx = cursor.read_u32();
                let adj = next_adjust.next().expect("one adjustment per branch site");
                branch_to(&mut frames, labelidx, &mut instrs, |ip| {
                    Instr::Br(BranchTarget { ip, drop: adj.drop, keep: adj.keep })
                })?;
            }
            Opcode::BrIf => {
                let labelidx = cursor.read_u32();
                let adj = next_adjust.next().expect("one adjustment per branch site");
                branch_to(&mut frames, labelidx, &mut instrs, |ip| {
                    Instr::BrIf(BranchTarget { ip, drop: adj.drop, keep: adj.keep })
                })?;
            }
            Opcode::BrTable => {
                let count = cursor.read_labelidx_vec_len();
                let table_idx = br_tables.len() as u32;

                let mut labels: Vec<BranchTarget, A> = Vec::new_in(alloc.clone());
                labels.try_reserve_exact(count as usize)?;
                for i in 0..count {
                    let labelidx = *cursor.read_labelidx();
                    let adj = next_adjust.next().expect("one adjustment per branch site");
                    let ip = resolve_label(&mut frames, labelidx, Patch::BrTableLabel(table_idx, i))?;
                    labels.push(BranchTarget { ip, drop: adj.drop, keep: adj.keep });
                }
                let default_label = *cursor.read_labelidx();
                let default_adj = next_adjust.next().expect("one adjustment per branch site");
                let default_ip =
                    resolve_label(&mut frames, default_label, Patch::BrTableDefault(table_idx))?;
                let default = BranchTarget {
                    ip: default_ip,
                    drop: default_adj.drop,
                    keep: default_adj.keep,
                };

                br_tables.try_reserve(1)?;
                br_tables.push(BrTableTargets {
                    labels: labels.into_boxed_slice(),
                    default,
                });
                push(&mut instrs, Instr::BrTable(table_idx))?;
            }
            Opcode::Return => push(&mut instrs, Instr::Return)?,

            Opcode::Call => {
                let funcidx = cursor.read_u32();
                push(&mut instrs, Instr::Call(funcidx))?;
            }
            Opcode::CallIndirect => {
                let operands = cursor.read_call_indirect();
                push(&mut instrs, Instr::CallIndirect(operands))?;
            }

            Opcode::Drop => push(&mut instrs, Instr::Drop)?,
            Opcode::Select => push(&mut instrs, Instr::Select)?,
            Opcode::SelectT => {
                let count = cursor.read_valtype_vec_len();
                let mut types: Vec<ValType, A> = Vec::new_in(alloc.clone());
                types.try_reserve_exact(count as usize)?;
                for _ in 0..count {
                    types.push(cursor.read_valtype());
                }
                push(&mut instrs, Instr::SelectT(types.into_boxed_slice()))?;
            }

            Opcode::LocalGet => {
                let i = cursor.read_u32();
                push(&mut instrs, Instr::LocalGet(i))?;
            }
            Opcode::LocalSet => {
                let i = cursor.read_u32();
                push(&mut instrs, Instr::LocalSet(i))?;
            }
            Opcode::LocalTee => {
                let i = cursor.read_u32();
                push(&mut instrs, Instr::LocalTee(i))?;
            }
            Opcode::GlobalGet => {
                let i = cursor.read_u32();
                push(&mut instrs, Instr::GlobalGet(i))?;
            }
            Opcode::GlobalSet => {
                let i = cursor.read_u32();
                push(&mut instrs, Instr::GlobalSet(i))?;
            }
            Opcode::TableGet => {
                let i = cursor.read_u32();
                push(&mut instrs, Instr::TableGet(i))?;
            }
            Opcode::TableSet => {
                let i = cursor.read_u32();
                push(&mut instrs, Instr::TableSet(i))?;
            }

            Opcode::RefNull => {
                let rt = cursor.read_reftype();
                push(&mut instrs, Instr::RefNull(rt))?;
            }
            Opcode::RefIsNull => push(&mut instrs, Instr::RefIsNull)?,
            Opcode::RefFunc => {
                let i = cursor.read_u32();
                push(&mut instrs, Instr::RefFunc(i))?;
            }

            Opcode::I32Const => {
                let v = cursor.read_i32();
                push(&mut instrs, Instr::I32Const(v))?;
            }
            Opcode::I64Const => {
                let v = cursor.read_i64();
                push(&mut instrs, Instr::I64Const(v))?;
            }
            Opcode::F32Const => {
                let v = cursor.read_f32();
                push(&mut instrs, Instr::F32Const(v))?;
            }
            Opcode::F64Const => {
                let v = cursor.read_f64();
                push(&mut instrs, Instr::F64Const(v))?;
            }

            Opcode::I32Load
            | Opcode::I64Load
            | Opcode::F32Load
            | Opcode::F64Load
            | Opcode::I32Load8S
            | Opcode::I32Load8U
            | Opcode::I32Load16S
            | Opcode::I32Load16U
            | Opcode::I64Load8S
            | Opcode::I64Load8U
            | Opcode::I64Load16S
            | Opcode::I64Load16U
            | Opcode::I64Load32S
            | Opcode::I64Load32U => {
                let memarg = cursor.read_memarg();
                push(&mut instrs, Instr::Load { op, memarg })?;
            }
            Opcode::I32Store
            | Opcode::I64Store
            | Opcode::F32Store
            | Opcode::F64Store
            | Opcode::I32Store8
            | Opcode::I32Store16
            | Opcode::I64Store8
            | Opcode::I64Store16
            | Opcode::I64Store32 => {
                let memarg = cursor.read_memarg();
                push(&mut instrs, Instr::Store { op, memarg })?;
            }
            Opcode::MemorySize => push(&mut instrs, Instr::MemorySize)?,
            Opcode::MemoryGrow => push(&mut instrs, Instr::MemoryGrow)?,

            Opcode::BulkPrefix => {
                let instr = bulk_instr(&mut cursor);
                push(&mut instrs, Instr::Bulk(instr))?;
            }
            Opcode::VectorPrefix => {
                let instr = vector_instr(&mut cursor);
                push(&mut instrs, Instr::Vector(instr))?;
            }

            // Every remaining opcode is a numeric instruction with no
            // immediate: comparisons, arithmetic, bitwise ops, and the
            // non-saturating conversions.
            _ => push(&mut instrs, Instr::Numeric(op))?,
        }
    }

    Ok(Bytecode {
        instrs: instrs.into_boxed_slice(),
        br_tables: br_tables.into_boxed_slice(),
        max_stack_depth,
    })
}

fn push<A: Allocator>(instrs: &mut Vec<Instr<A>, A>, instr: Instr<A>) -> Result<(), Error> {
    instrs.try_reserve(1)?;
    instrs.push(instr);
    Ok(())
}

fn push_frame<A: Allocator>(frames: &mut Vec<Frame<A>, A>, frame: Frame<A>) -> Result<(), Error> {
    frames.try_reserve(1)?;
    frames.push(frame);
    Ok(())
}

fn branch_to<A: Allocator>(
    frames: &mut [Frame<A>],
    depth: u32,
    instrs: &mut Vec<Instr<A>, A>,
    make: impl Fn(u32) -> Instr<A>,
) -> Result<(), Error> {
    let idx = frames.len() - 1 - depth as usize;
    if frames[idx].kind == FrameKind::Loop {
        let target = frames[idx].loop_start;
        push(instrs, make(target))
    } else {
        let slot = instrs.len() as u32;
        push(instrs, make(u32::MAX))?;
        frames[idx].patches.try_reserve(1)?;
        frames[idx].patches.push(Patch::Jump(slot));
        Ok(())
    }
}

// Resolves a single br_table target: immediately, if it names a loop,
// otherwise by recording `patch` against the named frame and returning a
// placeholder.
fn resolve_label<A: Allocator>(
    frames: &mut [Frame<A>],
    depth: u32,
    patch: Patch,
) -> Result<u32, Error> {
    let idx = frames.len() - 1 - depth as usize;
    if frames[idx].kind == FrameKind::Loop {
        Ok(frames[idx].loop_start)
    } else {
        frames[idx].patches.try_reserve(1)?;
        frames[idx].patches.push(patch);
        Ok(u32::MAX)
    }
}

fn flush_patches<A: Allocator>(
    patches: Vec<Patch, A>,
    target: u32,
    instrs: &mut [Instr<A>],
    br_tables: &mut [BrTableTargets<A>],
) {
    for patch in patches {
        match patch {
            Patch::Jump(idx) => {
                instrs[idx as usize] = match &instrs[idx as usize] {
                    Instr::Br(bt) => Instr::Br(BranchTarget { ip: target, ..*bt }),
                    Instr::BrIf(bt) => Instr::BrIf(BranchTarget { ip: target, ..*bt }),
                    Instr::BrIfFalse(_) => Instr::BrIfFalse(target),
                    _ => unreachable!("patch slot holds a non-jump instruction"),
                };
            }
            Patch::BrTableDefault(table_idx) => {
                br_tables[table_idx as usize].default.ip = target;
            }
            Patch::BrTableLabel(table_idx, label_idx) => {
                br_tables[table_idx as usize].labels[label_idx as usize].ip = target;
            }
        }
    }
}

fn bulk_instr(cursor: &mut ExpressionCursor) -> BulkInstr {
    let op = cursor.read_bulk_opcode();
    match op {
        BulkOpcode::I32TruncSatF32S
        | BulkOpcode::I32TruncSatF32U
        | BulkOpcode::I32TruncSatF64S
        | BulkOpcode::I32TruncSatF64U
        | BulkOpcode::I64TruncSatF32S
        | BulkOpcode::I64TruncSatF32U
        | BulkOpcode::I64TruncSatF64S
        | BulkOpcode::I64TruncSatF64U => BulkInstr::Trunc(op),
        BulkOpcode::MemoryInit => BulkInstr::MemoryInit(cursor.read_u32()),
        BulkOpcode::DataDrop => BulkInstr::DataDrop(cursor.read_u32()),
        BulkOpcode::MemoryCopy => BulkInstr::MemoryCopy,
        BulkOpcode::MemoryFill => BulkInstr::MemoryFill,
        BulkOpcode::TableInit => BulkInstr::TableInit(cursor.read_table_init()),
        BulkOpcode::ElemDrop => BulkInstr::ElemDrop(cursor.read_u32()),
        BulkOpcode::TableCopy => BulkInstr::TableCopy(cursor.read_table_copy()),
        BulkOpcode::TableGrow => BulkInstr::TableGrow(cursor.read_u32()),
        BulkOpcode::TableSize => BulkInstr::TableSize(cursor.read_u32()),
        BulkOpcode::TableFill => BulkInstr::TableFill(cursor.read_u32()),
    }
}

fn vector_instr(cursor: &mut ExpressionCursor) -> VecInstr {
    let op = cursor.read_vector_opcode();
    match op {
        VectorOpcode::V128Load
        | VectorOpcode::V128Load8x8S
        | VectorOpcode::V128Load8x8U
        | VectorOpcode::V128Load16x4S
        | VectorOpcode::V128Load16x4U
        | VectorOpcode::V128Load32x2S
        | VectorOpcode::V128Load32x2U
        | VectorOpcode::V128Load8Splat
        | VectorOpcode::V128Load16Splat
        | VectorOpcode::V128Load32Splat
        | VectorOpcode::V128Load64Splat
        | VectorOpcode::V128Load32Zero
        | VectorOpcode::V128Load64Zero => VecInstr::Load {
            op,
            memarg: cursor.read_memarg(),
        },

        VectorOpcode::V128Store => VecInstr::Store(cursor.read_memarg()),

        VectorOpcode::V128Load8Lane
        | VectorOpcode::V128Load16Lane
        | VectorOpcode::V128Load32Lane
        | VectorOpcode::V128Load64Lane => {
            let operands = cursor.read_memarg_lane();
            VecInstr::LoadLane {
                op,
                memarg: operands.memarg,
                lane: operands.lane,
            }
        }
        VectorOpcode::V128Store8Lane
        | VectorOpcode::V128Store16Lane
        | VectorOpcode::V128Store32Lane
        | VectorOpcode::V128Store64Lane => {
            let operands = cursor.read_memarg_lane();
            VecInstr::StoreLane {
                op,
                memarg: operands.memarg,
                lane: operands.lane,
            }
        }

        VectorOpcode::V128Const => VecInstr::Const(cursor.read_v128_bytes()),
        VectorOpcode::I8x16Shuffle => VecInstr::Shuffle(cursor.read_v128_bytes()),

        VectorOpcode::I8x16ExtractLaneS
        | VectorOpcode::I8x16ExtractLaneU
        | VectorOpcode::I16x8ExtractLaneS
        | VectorOpcode::I16x8ExtractLaneU
        | VectorOpcode::I32x4ExtractLane
        | VectorOpcode::I64x2ExtractLane
        | VectorOpcode::F32x4ExtractLane
        | VectorOpcode::F64x2ExtractLane
        | VectorOpcode::I8x16ReplaceLane
        | VectorOpcode::I16x8ReplaceLane
        | VectorOpcode::I32x4ReplaceLane
        | VectorOpcode::I64x2ReplaceLane
        | VectorOpcode::F32x4ReplaceLane
        | VectorOpcode::F64x2ReplaceLane => VecInstr::Lane {
            op,
            lane: cursor.read_u8(),
        },

        _ => VecInstr::Op(op),
    }
}
