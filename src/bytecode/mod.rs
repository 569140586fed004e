// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Pre-decoded, control-flow-resolved bytecode.
//!
//! `Expression` is a convenient re-encoding of the wire format, but it still
//! requires a validation-style frame stack to interpret: `br`/`br_if`/
//! `br_table` name a target by structural nesting depth, not by absolute
//! position. Once a module has validated, that nesting is fixed and known,
//! so it pays to resolve it once, here, rather than on every execution of a
//! loop body. A `Bytecode` is the result: every branch already carries the
//! absolute instruction index it jumps to, and `block`/`loop`/`if`/`else`/
//! `end` no longer appear as instructions at all, only as the jump targets
//! they produced.

mod instr;
mod lower;

use crate::Allocator;
use crate::core_compat::boxed::Box;

pub(crate) use instr::{BranchTarget, BrTableTargets, BulkInstr, Instr, VecInstr};
pub(crate) use lower::lower;
pub use lower::Error;

/// The pre-decoded form of a single function body (or, transiently while
/// being built, a constant expression — though those are evaluated directly
/// by `constexpr` instead, and never lowered).
pub struct Bytecode<A: Allocator> {
    pub(crate) instrs: Box<[Instr<A>], A>,
    pub(crate) br_tables: Box<[BrTableTargets<A>], A>,
    /// The operand-stack high-water mark computed for this function during
    /// validation, in values (not bytes). Lets the execution context
    /// preallocate a call frame's value stack exactly once.
    pub(crate) max_stack_depth: u32,
}
