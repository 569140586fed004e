// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Evaluation of already-validated constant expressions.
//!
//! Globals, and active element/data segment offsets, are each restricted by
//! the validator to a single constant instruction followed by `end` (see
//! `validate::expr::validate_constant_expression`). Once a module has
//! validated, evaluating one of these is a matter of reading that single
//! instruction back out, never re-running the stack machine.

use crate::Allocator;
use crate::cursor::ExpressionCursor;
use crate::types::{Expression, Opcode};

/// Evaluates a validated constant expression to its 128-bit stack
/// representation. `global.get` of an imported global has no host-supplied
/// value in this profile (imports are never linked), so it evaluates to 0;
/// a module that reaches this case can never be instantiated anyway (see
/// `exec::Error::UnsupportedImport`), so the value only matters for
/// introspection of an uninstantiated module's declared initial value.
pub(crate) fn eval_const_value<A: Allocator>(expr: &Expression<A>) -> u128 {
    let mut cursor = ExpressionCursor::new(expr);
    match cursor.read_opcode() {
        Opcode::I32Const => u128::from(cursor.read_i32() as u32),
        Opcode::I64Const => u128::from(cursor.read_i64() as u64),
        Opcode::F32Const => u128::from(cursor.read_f32().to_bits()),
        Opcode::F64Const => u128::from(cursor.read_f64().to_bits()),
        Opcode::RefNull => {
            cursor.read_reftype();
            u128::from(u32::MAX)
        }
        Opcode::RefFunc => u128::from(cursor.read_u32()),
        Opcode::GlobalGet => {
            cursor.read_u32();
            0
        }
        // Unreachable: validate_constant_expression only ever accepts one of
        // the opcodes above.
        _ => unreachable!("non-constant expression reached eval_const_value"),
    }
}

/// Like `eval_const_value`, but specifically for the i32 offset expressions
/// used by active element/data segments. Returns `None` for the
/// `global.get`-of-import case (legal per the grammar, but never a literal,
/// so static bounds cannot be checked against it); callers fall back to a
/// runtime check in that case.
pub(crate) fn eval_const_i32<A: Allocator>(expr: &Expression<A>) -> Option<i32> {
    let mut cursor = ExpressionCursor::new(expr);
    match cursor.read_opcode() {
        Opcode::I32Const => Some(cursor.read_i32()),
        _ => None,
    }
}
