// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! The flattened, jump-resolved instruction set that a `Bytecode` is made of.
//!
//! Each variant here corresponds to one or more `Opcode`/`BulkOpcode`/
//! `VectorOpcode` values from a validated `Expression`, grouped by the shape
//! of their immediate operands rather than given one variant apiece; the
//! interpreter recovers the exact operation from the wrapped opcode tag.
//! Structured control instructions (`block`/`loop`/`if`/`else`/`end`) do not
//! survive lowering at all: a `block`/`if` only matters, post-validation, for
//! where its label's branches land, and `lower` resolves that statically.

use crate::Allocator;
use crate::core_compat::boxed::Box;
use crate::types::{
    BulkOpcode, CallIndirectOperands, MemArg, RefType, TableCopyOperands, TableInitOperands,
    V128Bytes, ValType, VectorOpcode,
};

/// A resolved `br`/`br_if`/`br_table` target: the absolute instruction index
/// to jump to, plus the stack adjustment the validator computed for this
/// site (see `validate::expr::BranchAdjust`). At the jump, `drop` values are
/// discarded from under the top `keep` (0 or 1, since this profile caps
/// every block's result arity at one), which are left in place.
#[derive(Clone, Copy)]
pub(crate) struct BranchTarget {
    pub(crate) ip: u32,
    pub(crate) drop: u32,
    pub(crate) keep: u8,
}

/// One pre-decoded instruction.
///
/// `Br`/`BrIf` carry the absolute index, within the owning `Bytecode`, of the
/// instruction to jump to. `BrTable`'s targets don't fit inline, so it
/// instead carries an index into `Bytecode::br_tables`.
pub(crate) enum Instr<A: Allocator> {
    Unreachable,
    Nop,
    Br(BranchTarget),
    BrIf(BranchTarget),
    /// The lowered form of `if`'s own implicit branch: pops the condition and
    /// jumps to the given target when it is zero (to the `else` block if one
    /// is present, otherwise to just past the matching `end`). Never needs a
    /// stack adjustment of its own: reached with the operand stack at exactly
    /// the `if`'s entry height, nothing having been pushed yet.
    BrIfFalse(u32),
    BrTable(u32),
    Return,
    Call(u32),
    CallIndirect(CallIndirectOperands),
    Drop,
    Select,
    SelectT(Box<[ValType], A>),
    LocalGet(u32),
    LocalSet(u32),
    LocalTee(u32),
    GlobalGet(u32),
    GlobalSet(u32),
    TableGet(u32),
    TableSet(u32),
    RefNull(RefType),
    RefIsNull,
    RefFunc(u32),
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),
    Load { op: crate::types::Opcode, memarg: MemArg },
    Store { op: crate::types::Opcode, memarg: MemArg },
    MemorySize,
    MemoryGrow,
    /// Every numeric instruction that takes no immediate operand: unary and
    /// binary arithmetic, comparisons, and the non-saturating conversions.
    /// The interpreter dispatches on the wrapped opcode.
    Numeric(crate::types::Opcode),
    Bulk(BulkInstr),
    Vector(VecInstr),
}

/// The bulk memory/table instruction set (`0xfc` prefix), grouped by operand
/// shape the same way `Instr` is.
pub(crate) enum BulkInstr {
    /// One of the four saturating truncation conversions, which (unlike their
    /// trapping `Opcode` counterparts) take no immediate.
    Trunc(BulkOpcode),
    MemoryCopy,
    MemoryFill,
    MemoryInit(u32),
    DataDrop(u32),
    TableCopy(TableCopyOperands),
    TableInit(TableInitOperands),
    TableGrow(u32),
    TableSize(u32),
    TableFill(u32),
    ElemDrop(u32),
}

/// The SIMD instruction set (`0xfd` prefix), grouped by operand shape. Most
/// vector operations take no immediate at all, operating solely on values
/// already on the stack, so `Op` covers the bulk of `VectorOpcode`'s ~190
/// variants.
pub(crate) enum VecInstr {
    Op(VectorOpcode),
    Load { op: VectorOpcode, memarg: MemArg },
    Store(MemArg),
    LoadLane { op: VectorOpcode, memarg: MemArg, lane: u8 },
    StoreLane { op: VectorOpcode, memarg: MemArg, lane: u8 },
    Const(V128Bytes),
    Shuffle(V128Bytes),
    Lane { op: VectorOpcode, lane: u8 },
}

/// The out-of-line target list for a single `br_table`.
pub(crate) struct BrTableTargets<A: Allocator> {
    pub(crate) labels: Box<[BranchTarget], A>,
    pub(crate) default: BranchTarget,
}
