// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Type-checking of function bodies and constant expressions.
//!
//! Follows the stack-machine validation algorithm from the WebAssembly
//! specification's appendix: an operand stack of value types (with a
//! polymorphic "unknown" sentinel used once a branch of code is statically
//! unreachable) alongside a stack of control frames recording the expected
//! types at the start and end of each structured block.

use core::slice;

use crate::Allocator;
use crate::core_compat::vec::Vec;
use crate::types::{
    BlockType, BulkOpcode, Expression, FunctionType, GlobalTypeMutability, Local, Locals, Opcode,
    RefType, SectionId, ValType, VectorOpcode,
};

use crate::cursor::ExpressionCursor;

use super::{Error, Validator};

/// How much a taken branch (`br`/`br_if`/`br_table`, never a function-level
/// `return`, which the interpreter handles by resetting straight to the
/// frame's locals offset) must adjust the runtime value stack by: the target
/// label's arity is capped at one in this profile (see `Signature`'s
/// doc comment), so a branch either keeps the top value in place (`keep ==
/// 1`) or keeps nothing, after first discarding `drop` values that
/// accumulated above the target block's entry height since it was entered.
/// Computed once here, during validation, because the flat, jump-resolved
/// bytecode the pre-decoder produces has no runtime block stack from which
/// to recover this at execution time.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BranchAdjust {
    pub(crate) drop: u32,
    pub(crate) keep: u8,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum ExpressionValidationContext<'module, A: Allocator> {
    /// A function body, type-checked against its declared signature and its
    /// full set of locals (parameters followed by declared locals).
    Function(&'module FunctionType<A>, &'module Locals<A>),
    /// A constant expression, required to produce a single value of the
    /// given type.
    Constant(ValType),
}

// Returns the high-water mark of the operand stack reached while validating
// a function body (0 for constant expressions, which never need one: they
// are evaluated once, eagerly, rather than interpreted against a runtime
// stack). The pre-decoder attaches this to the function's Bytecode so the
// execution context can size its value stack checks without re-walking the
// body.
pub(crate) fn validate_expression<A: Allocator + Clone>(
    validator: &mut Validator<A>,
    expr: &Expression<A>,
    context: ExpressionValidationContext<A>,
    alloc: A,
) -> Result<(u32, Vec<BranchAdjust, A>), Error> {
    match context {
        ExpressionValidationContext::Function(func_type, locals) => {
            validate_function_body(validator, expr, func_type, locals, alloc)
        }
        ExpressionValidationContext::Constant(ty) => {
            validate_constant_expression(validator, expr, ty)?;
            Ok((0, Vec::new_in(alloc)))
        }
    }
}

// A value on the operand stack: either a concrete type, or the polymorphic
// "unknown" type that fills in a stack checked underneath unreachable code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operand {
    Val(ValType),
    Unknown,
}

// The in/out types of a structured control construct. Kept small and Copy so
// that a control frame can be read out of the frame stack by value.
#[derive(Clone, Copy, Debug)]
enum Signature<'module, A: Allocator> {
    Empty,
    Single(ValType),
    Block(&'module FunctionType<A>),
    // Used only for the implicit outermost frame of a function body: there
    // are no "input" types (locals are not operands), only declared results.
    FuncResults(&'module FunctionType<A>),
}

impl<'module, A: Allocator> Signature<'module, A> {
    fn params(&self) -> &[ValType] {
        match self {
            Self::Empty | Self::Single(_) | Self::FuncResults(_) => &[],
            Self::Block(func_type) => &func_type.parameters,
        }
    }

    fn results(&self) -> &[ValType] {
        match self {
            Self::Empty => &[],
            Self::Single(ty) => slice::from_ref(ty),
            Self::Block(func_type) | Self::FuncResults(func_type) => &func_type.results,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CtrlKind {
    Block,
    Loop,
    If,
    Else,
}

#[derive(Clone, Copy, Debug)]
struct CtrlFrame<'module, A: Allocator> {
    kind: CtrlKind,
    signature: Signature<'module, A>,
    // Operand stack height at the point this frame was entered.
    height: usize,
    // Whether the remainder of this frame is unreachable, in which case
    // underflowing pops are tolerated and yield Operand::Unknown.
    unreachable: bool,
}

impl<'module, A: Allocator> CtrlFrame<'module, A> {
    fn label_types(&self) -> &[ValType] {
        if self.kind == CtrlKind::Loop {
            self.signature.params()
        } else {
            self.signature.results()
        }
    }
}

struct State<'module, 'validator, A: Allocator> {
    validator: &'validator Validator<'module, A>,
    locals: Vec<ValType, A>,
    operands: Vec<Operand, A>,
    frames: Vec<CtrlFrame<'module, A>, A>,
    // Running high-water mark of `operands.len()`.
    max_height: usize,
    // One entry per `br`/`br_if`/`br_table` target encountered, in the exact
    // order `lower` will later walk the same expression, so the two passes
    // can be zipped up without needing to re-derive this information.
    adjustments: Vec<BranchAdjust, A>,
}

impl<'module, 'validator, A: Allocator + Clone> State<'module, 'validator, A> {
    fn new(validator: &'validator Validator<'module, A>, alloc: A) -> Self {
        Self {
            validator,
            locals: Vec::new_in(alloc.clone()),
            operands: Vec::new_in(alloc.clone()),
            frames: Vec::new_in(alloc.clone()),
            max_height: 0,
            adjustments: Vec::new_in(alloc),
        }
    }

    // Records the stack adjustment needed for a branch to the given label,
    // measured against the current operand height (i.e. before popping the
    // label's own result values off of `self.operands`).
    fn record_branch(&mut self, labelidx: u32) -> Result<(), Error> {
        let depth = self.frames.len();
        let idx = labelidx as usize;
        if idx >= depth {
            return Err(Error::InvalidLabel(labelidx));
        }
        let frame = &self.frames[depth - 1 - idx];
        let keep = frame.label_types().len() as u8;
        let height = self.operands.len();
        let drop = (height - frame.height) as u32 - u32::from(keep);
        self.adjustments
            .try_reserve(1)
            .map_err(|_| Error::AllocError)?;
        self.adjustments.push(BranchAdjust { drop, keep });
        Ok(())
    }

    fn local_type(&self, localidx: u32) -> Result<ValType, Error> {
        self.locals
            .get(localidx as usize)
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                id: SectionId::Custom, // there is no dedicated "locals" section id
                index: localidx,
                capacity: self.locals.len() as u32,
            })
    }

    fn push_val(&mut self, ty: ValType) -> Result<(), Error> {
        self.operands
            .try_reserve(1)
            .map_err(|_| Error::AllocError)?;
        self.operands.push(Operand::Val(ty));
        self.max_height = self.max_height.max(self.operands.len());
        Ok(())
    }

    fn push_unknown(&mut self) -> Result<(), Error> {
        self.operands
            .try_reserve(1)
            .map_err(|_| Error::AllocError)?;
        self.operands.push(Operand::Unknown);
        self.max_height = self.max_height.max(self.operands.len());
        Ok(())
    }

    fn push_vals(&mut self, tys: &[ValType]) -> Result<(), Error> {
        for &ty in tys {
            self.push_val(ty)?;
        }
        Ok(())
    }

    fn pop_val(&mut self) -> Result<Operand, Error> {
        let frame = self.frames.last().ok_or(Error::ControlStackUnderflow)?;
        if self.operands.len() == frame.height {
            return if frame.unreachable {
                Ok(Operand::Unknown)
            } else {
                Err(Error::OperandStackUnderflow)
            };
        }
        Ok(self.operands.pop().expect("checked non-empty above"))
    }

    fn pop_expect(&mut self, expected: ValType) -> Result<(), Error> {
        match self.pop_val()? {
            Operand::Unknown => Ok(()),
            Operand::Val(actual) if actual == expected => Ok(()),
            Operand::Val(actual) => Err(Error::TypeMismatch { expected, actual }),
        }
    }

    fn pop_vals(&mut self, tys: &[ValType]) -> Result<(), Error> {
        for &ty in tys.iter().rev() {
            self.pop_expect(ty)?;
        }
        Ok(())
    }

    fn mark_unreachable(&mut self) -> Result<(), Error> {
        let frame = self
            .frames
            .last_mut()
            .ok_or(Error::ControlStackUnderflow)?;
        self.operands.truncate(frame.height);
        frame.unreachable = true;
        Ok(())
    }

    fn push_ctrl(&mut self, kind: CtrlKind, signature: Signature<'module, A>) -> Result<(), Error> {
        let params = signature.params();
        self.pop_vals(params)?;
        let height = self.operands.len();
        self.frames
            .try_reserve(1)
            .map_err(|_| Error::AllocError)?;
        self.frames.push(CtrlFrame {
            kind,
            signature,
            height,
            unreachable: false,
        });
        self.push_vals(params)
    }

    fn pop_ctrl(&mut self) -> Result<CtrlFrame<'module, A>, Error> {
        let frame = *self.frames.last().ok_or(Error::ControlStackUnderflow)?;
        self.pop_vals(frame.signature.results())?;
        if self.operands.len() != frame.height {
            return Err(Error::ResultTypeMismatch);
        }
        self.frames.pop();
        Ok(frame)
    }

    fn label(&self, labelidx: u32) -> Result<&[ValType], Error> {
        let depth = self.frames.len();
        let idx = labelidx as usize;
        if idx >= depth {
            return Err(Error::InvalidLabel(labelidx));
        }
        Ok(self.frames[depth - 1 - idx].label_types())
    }

    fn resolve_blocktype(&self, bt: BlockType) -> Result<Signature<'module, A>, Error> {
        match bt {
            BlockType::Empty => Ok(Signature::Empty),
            BlockType::Result(ty) => Ok(Signature::Single(ty)),
            BlockType::TypeIndex(idx) => {
                let raw = *idx;
                let capacity = self.validator.type_count() as u32;
                if raw >= capacity {
                    return Err(Error::IndexOutOfBounds {
                        id: SectionId::Type,
                        index: raw,
                        capacity,
                    });
                }
                Ok(Signature::Block(self.validator.function_type(idx)))
            }
        }
    }
}

fn validate_function_body<A: Allocator + Clone>(
    validator: &mut Validator<A>,
    expr: &Expression<A>,
    func_type: &FunctionType<A>,
    locals: &Locals<A>,
    alloc: A,
) -> Result<(u32, Vec<BranchAdjust, A>), Error> {
    let validator = &*validator;

    let mut state = State::new(validator, alloc);
    let total_locals = func_type.parameters.len() + locals.len();
    state
        .locals
        .try_reserve_exact(total_locals)
        .map_err(|_| Error::AllocError)?;
    for &ty in func_type.parameters.iter() {
        state.locals.push(ty);
    }
    for local in locals.iter() {
        state.locals.push(local.val_type());
    }

    state.push_ctrl(CtrlKind::Block, Signature::FuncResults(func_type))?;
    let mut cursor = ExpressionCursor::new(expr);
    run(&mut state, &mut cursor)?;

    if !state.frames.is_empty() || !cursor.at_end() {
        return Err(Error::ControlStackUnderflow);
    }
    Ok((state.max_height as u32, state.adjustments))
}

// Constant expressions permit only a small, non-control-flow subset of
// instructions: the four *.const forms, global.get of an immutable import,
// ref.null, and ref.func. They are always terminated by a single End.
fn validate_constant_expression<A: Allocator + Clone>(
    validator: &mut Validator<A>,
    expr: &Expression<A>,
    result_ty: ValType,
) -> Result<(), Error> {
    let mut cursor = ExpressionCursor::new(expr);
    let op = cursor.read_opcode();
    let ty = match op {
        Opcode::I32Const => {
            cursor.read_i32();
            ValType::I32
        }
        Opcode::I64Const => {
            cursor.read_i64();
            ValType::I64
        }
        Opcode::F32Const => {
            cursor.read_f32();
            ValType::F32
        }
        Opcode::F64Const => {
            cursor.read_f64();
            ValType::F64
        }
        Opcode::RefNull => {
            let reftype = cursor.read_reftype();
            ValType::from(reftype)
        }
        Opcode::RefFunc => {
            let funcidx = cursor.read_u32();
            let capacity = validator.function_count() as u32;
            if funcidx >= capacity {
                return Err(Error::IndexOutOfBounds {
                    id: SectionId::Function,
                    index: funcidx,
                    capacity,
                });
            }
            ValType::FuncRef
        }
        Opcode::GlobalGet => {
            let globalidx = cursor.read_u32();
            let capacity = validator.global_count() as u32;
            if globalidx >= capacity {
                return Err(Error::IndexOutOfBounds {
                    id: SectionId::Global,
                    index: globalidx,
                    capacity,
                });
            }
            if !validator.global_is_import(crate::types::GlobalIdx::new(globalidx)) {
                return Err(Error::InvalidConstantGlobal(globalidx));
            }
            let global_ty = validator.global_type(crate::types::GlobalIdx::new(globalidx));
            if global_ty.mutability != GlobalTypeMutability::Const {
                return Err(Error::InvalidConstantGlobal(globalidx));
            }
            global_ty.value
        }
        _ => return Err(Error::InvalidConstantInstruction),
    };
    if ty != result_ty {
        return Err(Error::TypeMismatch {
            expected: result_ty,
            actual: ty,
        });
    }

    let end: Opcode = cursor.read_opcode();
    if end != Opcode::End || !cursor.at_end() {
        return Err(Error::InvalidConstantInstruction);
    }
    Ok(())
}

// Drives the operand/control stack machine over every instruction in the
// buffer, until the outermost frame (pushed by the caller) is popped by its
// matching End.
fn run<A: Allocator + Clone>(
    state: &mut State<A>,
    cursor: &mut ExpressionCursor,
) -> Result<(), Error> {
    loop {
        let op = cursor.read_opcode();
        match op {
            Opcode::Unreachable => state.mark_unreachable()?,
            Opcode::Nop => {}

            Opcode::Block => {
                let bt = cursor.read_blocktype();
                let sig = state.resolve_blocktype(bt)?;
                state.push_ctrl(CtrlKind::Block, sig)?;
            }
            Opcode::Loop => {
                let bt = cursor.read_blocktype();
                let sig = state.resolve_blocktype(bt)?;
                state.push_ctrl(CtrlKind::Loop, sig)?;
            }
            Opcode::If => {
                let bt = cursor.read_blocktype();
                let sig = state.resolve_blocktype(bt)?;
                state.pop_expect(ValType::I32)?;
                state.push_ctrl(CtrlKind::If, sig)?;
            }
            Opcode::Else => {
                let frame = state.pop_ctrl()?;
                if frame.kind != CtrlKind::If {
                    return Err(Error::ElseWithoutIf);
                }
                state.push_ctrl(CtrlKind::Else, frame.signature)?;
            }
            Opcode::End => {
                let frame = state.pop_ctrl()?;
                if frame.kind == CtrlKind::If && frame.signature.params() != frame.signature.results()
                {
                    return Err(Error::ResultTypeMismatch);
                }
                state.push_vals(frame.signature.results())?;
                if state.frames.is_empty() {
                    return Ok(());
                }
            }

            Opcode::Br => {
                let labelidx = cursor.read_u32();
                let types = state.label(labelidx)?;
                // Detach from `state` borrow before mutating.
                let types: &[ValType] =
                    unsafe { slice::from_raw_parts(types.as_ptr(), types.len()) };
                state.record_branch(labelidx)?;
                state.pop_vals(types)?;
                state.mark_unreachable()?;
            }
            Opcode::BrIf => {
                let labelidx = cursor.read_u32();
                state.pop_expect(ValType::I32)?;
                let types = state.label(labelidx)?;
                let types: &[ValType] =
                    unsafe { slice::from_raw_parts(types.as_ptr(), types.len()) };
                state.record_branch(labelidx)?;
                state.pop_vals(types)?;
                state.push_vals(types)?;
            }
            Opcode::BrTable => {
                let count = cursor.read_labelidx_vec_len();
                state.pop_expect(ValType::I32)?;
                let mut arity = None;
                for _ in 0..count {
                    let labelidx = *cursor.read_labelidx();
                    let types = state.label(labelidx)?;
                    if let Some(expected) = arity {
                        if expected != types.len() {
                            return Err(Error::ResultTypeMismatch);
                        }
                    } else {
                        arity = Some(types.len());
                    }
                    state.record_branch(labelidx)?;
                }
                let default = *cursor.read_labelidx();
                state.record_branch(default)?;
                let types = state.label(default)?;
                let types: &[ValType] =
                    unsafe { slice::from_raw_parts(types.as_ptr(), types.len()) };
                state.pop_vals(types)?;
                state.mark_unreachable()?;
            }
            Opcode::Return => {
                // The outermost frame's label types are its function results.
                let outer = state.frames[0];
                let types = outer.signature.results();
                let types: &[ValType] =
                    unsafe { slice::from_raw_parts(types.as_ptr(), types.len()) };
                state.pop_vals(types)?;
                state.mark_unreachable()?;
            }

            Opcode::Call => {
                let funcidx = cursor.read_u32();
                let capacity = state.validator.function_count() as u32;
                if funcidx >= capacity {
                    return Err(Error::IndexOutOfBounds {
                        id: SectionId::Function,
                        index: funcidx,
                        capacity,
                    });
                }
                let func_type = state
                    .validator
                    .function_signature(crate::types::FuncIdx::new(funcidx));
                state.pop_vals(&func_type.parameters)?;
                state.push_vals(&func_type.results)?;
            }
            Opcode::CallIndirect => {
                let operands = cursor.read_call_indirect();
                let table_idx = *operands.table;
                let table_capacity = state.validator.table_count() as u32;
                if table_idx >= table_capacity {
                    return Err(Error::IndexOutOfBounds {
                        id: SectionId::Table,
                        index: table_idx,
                        capacity: table_capacity,
                    });
                }
                let table_ty = state.validator.table_type(operands.table);
                if table_ty.reftype != RefType::Func {
                    return Err(Error::InvalidLabel(table_idx));
                }
                let type_idx = *operands.ty;
                let type_capacity = state.validator.type_count() as u32;
                if type_idx >= type_capacity {
                    return Err(Error::IndexOutOfBounds {
                        id: SectionId::Type,
                        index: type_idx,
                        capacity: type_capacity,
                    });
                }
                let func_type = state.validator.function_type(operands.ty);
                state.pop_expect(ValType::I32)?;
                state.pop_vals(&func_type.parameters)?;
                state.push_vals(&func_type.results)?;
            }

            Opcode::Drop => {
                state.pop_val()?;
            }
            Opcode::Select => {
                state.pop_expect(ValType::I32)?;
                let a = state.pop_val()?;
                let b = state.pop_val()?;
                match (a, b) {
                    (Operand::Val(a), Operand::Val(b)) if a != b => {
                        return Err(Error::TypeMismatch {
                            expected: a,
                            actual: b,
                        });
                    }
                    _ => {}
                }
                let result = match (a, b) {
                    (Operand::Val(ty), _) | (_, Operand::Val(ty)) => Operand::Val(ty),
                    (Operand::Unknown, Operand::Unknown) => Operand::Unknown,
                };
                match result {
                    Operand::Val(ty) => state.push_val(ty)?,
                    Operand::Unknown => state.push_unknown()?,
                }
            }
            Opcode::SelectT => {
                let count = cursor.read_valtype_vec_len();
                let mut last = ValType::I32;
                for _ in 0..count {
                    last = cursor.read_valtype();
                }
                state.pop_expect(ValType::I32)?;
                state.pop_expect(last)?;
                state.pop_expect(last)?;
                state.push_val(last)?;
            }

            Opcode::LocalGet => {
                let idx = cursor.read_u32();
                let ty = state.local_type(idx)?;
                state.push_val(ty)?;
            }
            Opcode::LocalSet => {
                let idx = cursor.read_u32();
                let ty = state.local_type(idx)?;
                state.pop_expect(ty)?;
            }
            Opcode::LocalTee => {
                let idx = cursor.read_u32();
                let ty = state.local_type(idx)?;
                state.pop_expect(ty)?;
                state.push_val(ty)?;
            }
            Opcode::GlobalGet => {
                let idx = cursor.read_u32();
                let capacity = state.validator.global_count() as u32;
                if idx >= capacity {
                    return Err(Error::IndexOutOfBounds {
                        id: SectionId::Global,
                        index: idx,
                        capacity,
                    });
                }
                let ty = state
                    .validator
                    .global_type(crate::types::GlobalIdx::new(idx));
                state.push_val(ty.value)?;
            }
            Opcode::GlobalSet => {
                let idx = cursor.read_u32();
                let capacity = state.validator.global_count() as u32;
                if idx >= capacity {
                    return Err(Error::IndexOutOfBounds {
                        id: SectionId::Global,
                        index: idx,
                        capacity,
                    });
                }
                let ty = state
                    .validator
                    .global_type(crate::types::GlobalIdx::new(idx));
                if ty.mutability != GlobalTypeMutability::Var {
                    return Err(Error::InvalidConstantGlobal(idx));
                }
                state.pop_expect(ty.value)?;
            }

            Opcode::TableGet => {
                let idx = cursor.read_u32();
                let capacity = state.validator.table_count() as u32;
                if idx >= capacity {
                    return Err(Error::IndexOutOfBounds {
                        id: SectionId::Table,
                        index: idx,
                        capacity,
                    });
                }
                let ty = state
                    .validator
                    .table_type(crate::types::TableIdx::new(idx));
                state.pop_expect(ValType::I32)?;
                state.push_val(ValType::from(ty.reftype))?;
            }
            Opcode::TableSet => {
                let idx = cursor.read_u32();
                let capacity = state.validator.table_count() as u32;
                if idx >= capacity {
                    return Err(Error::IndexOutOfBounds {
                        id: SectionId::Table,
                        index: idx,
                        capacity,
                    });
                }
                let ty = state
                    .validator
                    .table_type(crate::types::TableIdx::new(idx));
                state.pop_expect(ValType::from(ty.reftype))?;
                state.pop_expect(ValType::I32)?;
            }

            Opcode::RefNull => {
                let reftype = cursor.read_reftype();
                state.push_val(ValType::from(reftype))?;
            }
            Opcode::RefIsNull => {
                let operand = state.pop_val()?;
                match operand {
                    Operand::Val(ValType::FuncRef | ValType::ExternRef) | Operand::Unknown => {}
                    Operand::Val(actual) => {
                        return Err(Error::TypeMismatch {
                            expected: ValType::FuncRef,
                            actual,
                        });
                    }
                }
                state.push_val(ValType::I32)?;
            }
            Opcode::RefFunc => {
                let idx = cursor.read_u32();
                let capacity = state.validator.function_count() as u32;
                if idx >= capacity {
                    return Err(Error::IndexOutOfBounds {
                        id: SectionId::Function,
                        index: idx,
                        capacity,
                    });
                }
                state.push_val(ValType::FuncRef)?;
            }

            Opcode::MemorySize => {
                require_memory(state.validator)?;
                state.push_val(ValType::I32)?;
            }
            Opcode::MemoryGrow => {
                require_memory(state.validator)?;
                state.pop_expect(ValType::I32)?;
                state.push_val(ValType::I32)?;
            }

            Opcode::BulkPrefix => bulk_op(state, cursor)?,
            Opcode::VectorPrefix => vector_op(state, cursor)?,

            // Plain numeric instructions: all pop/push a fixed, opcode-determined
            // sequence of value types with no further structural checks.
            _ => {
                let (pops, pushes) = numeric_signature(op, &mut *cursor)?;
                state.pop_vals(pops)?;
                state.push_vals(pushes)?;
            }
        }
    }
}

fn require_memory<A: Allocator>(validator: &Validator<A>) -> Result<(), Error> {
    if validator.memory_count() == 0 {
        Err(Error::IndexOutOfBounds {
            id: SectionId::Memory,
            index: 0,
            capacity: 0,
        })
    } else {
        Ok(())
    }
}

// Type signatures for every plain (non-control, non-bulk, non-vector)
// instruction that isn't handled specially above. Memory instructions consume
// their MemArg operand from the cursor but otherwise only need a declared
// memory to exist.
fn numeric_signature(
    op: Opcode,
    cursor: &mut ExpressionCursor,
) -> Result<(&'static [ValType], &'static [ValType]), Error> {
    use ValType::{F32, F64, I32, I64};

    macro_rules! sig {
        ([$($i:expr),*], [$($o:expr),*]) => {
            (&[$($i),*] as &[ValType], &[$($o),*] as &[ValType])
        };
    }

    let result = match op {
        Opcode::I32Const => {
            cursor.read_i32();
            sig!([], [I32])
        }
        Opcode::I64Const => {
            cursor.read_i64();
            sig!([], [I64])
        }
        Opcode::F32Const => {
            cursor.read_f32();
            sig!([], [F32])
        }
        Opcode::F64Const => {
            cursor.read_f64();
            sig!([], [F64])
        }

        Opcode::I32Eqz => sig!([I32], [I32]),
        Opcode::I32Eq
        | Opcode::I32Ne
        | Opcode::I32LtS
        | Opcode::I32LtU
        | Opcode::I32GtS
        | Opcode::I32GtU
        | Opcode::I32LeS
        | Opcode::I32LeU
        | Opcode::I32GeS
        | Opcode::I32GeU => sig!([I32, I32], [I32]),

        Opcode::I64Eqz => sig!([I64], [I32]),
        Opcode::I64Eq
        | Opcode::I64Ne
        | Opcode::I64LtS
        | Opcode::I64LtU
        | Opcode::I64GtS
        | Opcode::I64GtU
        | Opcode::I64LeS
        | Opcode::I64LeU
        | Opcode::I64GeS
        | Opcode::I64GeU => sig!([I64, I64], [I32]),

        Opcode::F32Eq
        | Opcode::F32Ne
        | Opcode::F32Lt
        | Opcode::F32Gt
        | Opcode::F32Le
        | Opcode::F32Ge => sig!([F32, F32], [I32]),
        Opcode::F64Eq
        | Opcode::F64Ne
        | Opcode::F64Lt
        | Opcode::F64Gt
        | Opcode::F64Le
        | Opcode::F64Ge => sig!([F64, F64], [I32]),

        Opcode::I32Clz | Opcode::I32Ctz | Opcode::I32Popcnt => sig!([I32], [I32]),
        Opcode::I32Add
        | Opcode::I32Sub
        | Opcode::I32Mul
        | Opcode::I32DivS
        | Opcode::I32DivU
        | Opcode::I32RemS
        | Opcode::I32RemU
        | Opcode::I32And
        | Opcode::I32Or
        | Opcode::I32Xor
        | Opcode::I32Shl
        | Opcode::I32ShrS
        | Opcode::I32ShrU
        | Opcode::I32Rotl
        | Opcode::I32Rotr => sig!([I32, I32], [I32]),

        Opcode::I64Clz | Opcode::I64Ctz | Opcode::I64Popcnt => sig!([I64], [I64]),
        Opcode::I64Add
        | Opcode::I64Sub
        | Opcode::I64Mul
        | Opcode::I64DivS
        | Opcode::I64DivU
        | Opcode::I64RemS
        | Opcode::I64RemU
        | Opcode::I64And
        | Opcode::I64Or
        | Opcode::I64Xor
        | Opcode::I64Shl
        | Opcode::I64ShrS
        | Opcode::I64ShrU
        | Opcode::I64Rotl
        | Opcode::I64Rotr => sig!([I64, I64], [I64]),

        Opcode::F32Abs
        | Opcode::F32Neg
        | Opcode::F32Ceil
        | Opcode::F32Floor
        | Opcode::F32Trunc
        | Opcode::F32Nearest
        | Opcode::F32Sqrt => sig!([F32], [F32]),
        Opcode::F32Add
        | Opcode::F32Sub
        | Opcode::F32Mul
        | Opcode::F32Div
        | Opcode::F32Min
        | Opcode::F32Max
        | Opcode::F32Copysign => sig!([F32, F32], [F32]),

        Opcode::F64Abs
        | Opcode::F64Neg
        | Opcode::F64Ceil
        | Opcode::F64Floor
        | Opcode::F64Trunc
        | Opcode::F64Nearest
        | Opcode::F64Sqrt => sig!([F64], [F64]),
        Opcode::F64Add
        | Opcode::F64Sub
        | Opcode::F64Mul
        | Opcode::F64Div
        | Opcode::F64Min
        | Opcode::F64Max
        | Opcode::F64Copysign => sig!([F64, F64], [F64]),

        Opcode::I32WrapI64 => sig!([I64], [I32]),
        Opcode::I32TruncF32S | Opcode::I32TruncF32U => sig!([F32], [I32]),
        Opcode::I32TruncF64S | Opcode::I32TruncF64U => sig!([F64], [I32]),
        Opcode::I64ExtendI32S | Opcode::I64ExtendI32U => sig!([I32], [I64]),
        Opcode::I64TruncF32S | Opcode::I64TruncF32U => sig!([F32], [I64]),
        Opcode::I64TruncF64S | Opcode::I64TruncF64U => sig!([F64], [I64]),
        Opcode::F32ConvertI32S | Opcode::F32ConvertI32U => sig!([I32], [F32]),
        Opcode::F32ConvertI64S | Opcode::F32ConvertI64U => sig!([I64], [F32]),
        Opcode::F32DemoteF64 => sig!([F64], [F32]),
        Opcode::F64ConvertI32S | Opcode::F64ConvertI32U => sig!([I32], [F64]),
        Opcode::F64ConvertI64S | Opcode::F64ConvertI64U => sig!([I64], [F64]),
        Opcode::F64PromoteF32 => sig!([F32], [F64]),
        Opcode::I32ReinterpretF32 => sig!([F32], [I32]),
        Opcode::I64ReinterpretF64 => sig!([F64], [I64]),
        Opcode::F32ReinterpretI32 => sig!([I32], [F32]),
        Opcode::F64ReinterpretI64 => sig!([I64], [F64]),

        Opcode::I32Extend8S | Opcode::I32Extend16S => sig!([I32], [I32]),
        Opcode::I64Extend8S | Opcode::I64Extend16S | Opcode::I64Extend32S => sig!([I64], [I64]),

        Opcode::I32Load
        | Opcode::I32Load8S
        | Opcode::I32Load8U
        | Opcode::I32Load16S
        | Opcode::I32Load16U => {
            cursor.read_memarg();
            sig!([I32], [I32])
        }
        Opcode::I64Load
        | Opcode::I64Load8S
        | Opcode::I64Load8U
        | Opcode::I64Load16S
        | Opcode::I64Load16U
        | Opcode::I64Load32S
        | Opcode::I64Load32U => {
            cursor.read_memarg();
            sig!([I32], [I64])
        }
        Opcode::F32Load => {
            cursor.read_memarg();
            sig!([I32], [F32])
        }
        Opcode::F64Load => {
            cursor.read_memarg();
            sig!([I32], [F64])
        }
        Opcode::I32Store | Opcode::I32Store8 | Opcode::I32Store16 => {
            cursor.read_memarg();
            sig!([I32, I32], [])
        }
        Opcode::I64Store | Opcode::I64Store8 | Opcode::I64Store16 | Opcode::I64Store32 => {
            cursor.read_memarg();
            sig!([I64, I32], [])
        }
        Opcode::F32Store => {
            cursor.read_memarg();
            sig!([F32, I32], [])
        }
        Opcode::F64Store => {
            cursor.read_memarg();
            sig!([F64, I32], [])
        }

        _ => unreachable!("opcode {op:?} handled by a dedicated branch in run()"),
    };
    Ok(result)
}

fn bulk_op<A: Allocator + Clone>(
    state: &mut State<A>,
    cursor: &mut ExpressionCursor,
) -> Result<(), Error> {
    let bulk_op = cursor.read_bulk_opcode();
    match bulk_op {
        BulkOpcode::I32TruncSatF32S | BulkOpcode::I32TruncSatF32U => {
            state.pop_expect(ValType::F32)?;
            state.push_val(ValType::I32)?;
        }
        BulkOpcode::I32TruncSatF64S | BulkOpcode::I32TruncSatF64U => {
            state.pop_expect(ValType::F64)?;
            state.push_val(ValType::I32)?;
        }
        BulkOpcode::I64TruncSatF32S | BulkOpcode::I64TruncSatF32U => {
            state.pop_expect(ValType::F32)?;
            state.push_val(ValType::I64)?;
        }
        BulkOpcode::I64TruncSatF64S | BulkOpcode::I64TruncSatF64U => {
            state.pop_expect(ValType::F64)?;
            state.push_val(ValType::I64)?;
        }
        BulkOpcode::MemoryInit => {
            let dataidx = cursor.read_u32();
            let capacity = state.validator.data_count() as u32;
            if dataidx >= capacity {
                return Err(Error::IndexOutOfBounds {
                    id: SectionId::Data,
                    index: dataidx,
                    capacity,
                });
            }
            require_memory(state.validator)?;
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::I32)?;
        }
        BulkOpcode::DataDrop => {
            let dataidx = cursor.read_u32();
            let capacity = state.validator.data_count() as u32;
            if dataidx >= capacity {
                return Err(Error::IndexOutOfBounds {
                    id: SectionId::Data,
                    index: dataidx,
                    capacity,
                });
            }
        }
        BulkOpcode::MemoryCopy => {
            require_memory(state.validator)?;
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::I32)?;
        }
        BulkOpcode::MemoryFill => {
            require_memory(state.validator)?;
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::I32)?;
        }
        BulkOpcode::TableInit => {
            let operands = cursor.read_table_init();
            let elemidx = *operands.elem;
            let elem_capacity = state.validator.element_count() as u32;
            if elemidx >= elem_capacity {
                return Err(Error::IndexOutOfBounds {
                    id: SectionId::Element,
                    index: elemidx,
                    capacity: elem_capacity,
                });
            }
            let tableidx = *operands.table;
            let table_capacity = state.validator.table_count() as u32;
            if tableidx >= table_capacity {
                return Err(Error::IndexOutOfBounds {
                    id: SectionId::Table,
                    index: tableidx,
                    capacity: table_capacity,
                });
            }
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::I32)?;
        }
        BulkOpcode::ElemDrop => {
            let elemidx = cursor.read_u32();
            let capacity = state.validator.element_count() as u32;
            if elemidx >= capacity {
                return Err(Error::IndexOutOfBounds {
                    id: SectionId::Element,
                    index: elemidx,
                    capacity,
                });
            }
        }
        BulkOpcode::TableCopy => {
            let operands = cursor.read_table_copy();
            let capacity = state.validator.table_count() as u32;
            for tableidx in [*operands.src, *operands.dst] {
                if tableidx >= capacity {
                    return Err(Error::IndexOutOfBounds {
                        id: SectionId::Table,
                        index: tableidx,
                        capacity,
                    });
                }
            }
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::I32)?;
        }
        BulkOpcode::TableGrow => {
            let tableidx = cursor.read_u32();
            let capacity = state.validator.table_count() as u32;
            if tableidx >= capacity {
                return Err(Error::IndexOutOfBounds {
                    id: SectionId::Table,
                    index: tableidx,
                    capacity,
                });
            }
            let ty = state
                .validator
                .table_type(crate::types::TableIdx::new(tableidx));
            state.pop_expect(ValType::from(ty.reftype))?;
            state.pop_expect(ValType::I32)?;
            state.push_val(ValType::I32)?;
        }
        BulkOpcode::TableSize => {
            let tableidx = cursor.read_u32();
            let capacity = state.validator.table_count() as u32;
            if tableidx >= capacity {
                return Err(Error::IndexOutOfBounds {
                    id: SectionId::Table,
                    index: tableidx,
                    capacity,
                });
            }
            state.push_val(ValType::I32)?;
        }
        BulkOpcode::TableFill => {
            let tableidx = cursor.read_u32();
            let capacity = state.validator.table_count() as u32;
            if tableidx >= capacity {
                return Err(Error::IndexOutOfBounds {
                    id: SectionId::Table,
                    index: tableidx,
                    capacity,
                });
            }
            let ty = state
                .validator
                .table_type(crate::types::TableIdx::new(tableidx));
            state.pop_expect(ValType::I32)?;
            state.pop_expect(ValType::from(ty.reftype))?;
            state.pop_expect(ValType::I32)?;
        }
    }
    Ok(())
}

fn vector_op<A: Allocator + Clone>(
    state: &mut State<A>,
    cursor: &mut ExpressionCursor,
) -> Result<(), Error> {
    use ValType::{F32, F64, I32, I64, Vec as V128};

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
        | VectorOpcode::V128Load64Zero => {
            cursor.read_memarg();
            require_memory(state.validator)?;
            state.pop_expect(I32)?;
            state.push_val(V128)?;
        }
        VectorOpcode::V128Store => {
            cursor.read_memarg();
            require_memory(state.validator)?;
            state.pop_expect(V128)?;
            state.pop_expect(I32)?;
        }
        VectorOpcode::V128Load8Lane
        | VectorOpcode::V128Load16Lane
        | VectorOpcode::V128Load32Lane
        | VectorOpcode::V128Load64Lane => {
            cursor.read_memarg_lane();
            require_memory(state.validator)?;
            state.pop_expect(V128)?;
            state.pop_expect(I32)?;
            state.push_val(V128)?;
        }
        VectorOpcode::V128Store8Lane
        | VectorOpcode::V128Store16Lane
        | VectorOpcode::V128Store32Lane
        | VectorOpcode::V128Store64Lane => {
            cursor.read_memarg_lane();
            require_memory(state.validator)?;
            state.pop_expect(V128)?;
            state.pop_expect(I32)?;
        }

        VectorOpcode::V128Const => {
            cursor.read_v128_bytes();
            state.push_val(V128)?;
        }
        VectorOpcode::I8x16Shuffle => {
            cursor.read_v128_bytes();
            state.pop_expect(V128)?;
            state.pop_expect(V128)?;
            state.push_val(V128)?;
        }
        VectorOpcode::I8x16Swizzle => {
            state.pop_expect(V128)?;
            state.pop_expect(V128)?;
            state.push_val(V128)?;
        }

        VectorOpcode::I8x16Splat | VectorOpcode::I16x8Splat | VectorOpcode::I32x4Splat => {
            state.pop_expect(I32)?;
            state.push_val(V128)?;
        }
        VectorOpcode::I64x2Splat => {
            state.pop_expect(I64)?;
            state.push_val(V128)?;
        }
        VectorOpcode::F32x4Splat => {
            state.pop_expect(F32)?;
            state.push_val(V128)?;
        }
        VectorOpcode::F64x2Splat => {
            state.pop_expect(F64)?;
            state.push_val(V128)?;
        }

        VectorOpcode::I8x16ExtractLaneS
        | VectorOpcode::I8x16ExtractLaneU
        | VectorOpcode::I16x8ExtractLaneS
        | VectorOpcode::I16x8ExtractLaneU
        | VectorOpcode::I32x4ExtractLane => {
            cursor.read_u8();
            state.pop_expect(V128)?;
            state.push_val(I32)?;
        }
        VectorOpcode::I64x2ExtractLane => {
            cursor.read_u8();
            state.pop_expect(V128)?;
            state.push_val(I64)?;
        }
        VectorOpcode::F32x4ExtractLane => {
            cursor.read_u8();
            state.pop_expect(V128)?;
            state.push_val(F32)?;
        }
        VectorOpcode::F64x2ExtractLane => {
            cursor.read_u8();
            state.pop_expect(V128)?;
            state.push_val(F64)?;
        }
        VectorOpcode::I8x16ReplaceLane
        | VectorOpcode::I16x8ReplaceLane
        | VectorOpcode::I32x4ReplaceLane => {
            cursor.read_u8();
            state.pop_expect(I32)?;
            state.pop_expect(V128)?;
            state.push_val(V128)?;
        }
        VectorOpcode::I64x2ReplaceLane => {
            cursor.read_u8();
            state.pop_expect(I64)?;
            state.pop_expect(V128)?;
            state.push_val(V128)?;
        }
        VectorOpcode::F32x4ReplaceLane => {
            cursor.read_u8();
            state.pop_expect(F32)?;
            state.pop_expect(V128)?;
            state.push_val(V128)?;
        }
        VectorOpcode::F64x2ReplaceLane => {
            cursor.read_u8();
            state.pop_expect(F64)?;
            state.pop_expect(V128)?;
            state.push_val(V128)?;
        }

        // All comparisons, bitwise ops, and straight-line arithmetic below
        // operate entirely in terms of v128 values (per-lane interpretation
        // is a runtime, not a type-level, concern).
        VectorOpcode::I8x16Eq
        | VectorOpcode::I8x16Ne
        | VectorOpcode::I8x16LtS
        | VectorOpcode::I8x16LtU
        | VectorOpcode::I8x16GtS
        | VectorOpcode::I8x16GtU
        | VectorOpcode::I8x16LeS
        | VectorOpcode::I8x16LeU
        | VectorOpcode::I8x16GeS
        | VectorOpcode::I8x16GeU
        | VectorOpcode::I16x8Eq
        | VectorOpcode::I16x8Ne
        | VectorOpcode::I16x8LtS
        | VectorOpcode::I16x8LtU
        | VectorOpcode::I16x8GtS
        | VectorOpcode::I16x8GtU
        | VectorOpcode::I16x8LeS
        | VectorOpcode::I16x8LeU
        | VectorOpcode::I16x8GeS
        | VectorOpcode::I16x8GeU
        | VectorOpcode::I32x4Eq
        | VectorOpcode::I32x4Ne
        | VectorOpcode::I32x4LtS
        | VectorOpcode::I32x4LtU
        | VectorOpcode::I32x4GtS
        | VectorOpcode::I32x4GtU
        | VectorOpcode::I32x4LeS
        | VectorOpcode::I32x4LeU
        | VectorOpcode::I32x4GeS
        | VectorOpcode::I32x4GeU
        | VectorOpcode::I64x2Eq
        | VectorOpcode::I64x2Ne
        | VectorOpcode::I64x2LtS
        | VectorOpcode::I64x2GtS
        | VectorOpcode::I64x2LeS
        | VectorOpcode::I64x2GeS
        | VectorOpcode::F32x4Eq
        | VectorOpcode::F32x4Ne
        | VectorOpcode::F32x4Lt
        | VectorOpcode::F32x4Gt
        | VectorOpcode::F32x4Le
        | VectorOpcode::F32x4Ge
        | VectorOpcode::F64x2Eq
        | VectorOpcode::F64x2Ne
        | VectorOpcode::F64x2Lt
        | VectorOpcode::F64x2Gt
        | VectorOpcode::F64x2Le
        | VectorOpcode::F64x2Ge
        | VectorOpcode::V128And
        | VectorOpcode::V128Andnot
        | VectorOpcode::V128Or
        | VectorOpcode::V128Xor
        | VectorOpcode::I8x16NarrowI16x8S
        | VectorOpcode::I8x16NarrowI16x8U
        | VectorOpcode::I16x8NarrowI32x4S
        | VectorOpcode::I16x8NarrowI32x4U
        | VectorOpcode::I8x16Add
        | VectorOpcode::I8x16AddSatS
        | VectorOpcode::I8x16AddSatU
        | VectorOpcode::I8x16Sub
        | VectorOpcode::I8x16SubSatS
        | VectorOpcode::I8x16SubSatU
        | VectorOpcode::I8x16MinS
        | VectorOpcode::I8x16MinU
        | VectorOpcode::I8x16MaxS
        | VectorOpcode::I8x16MaxU
        | VectorOpcode::I8x16AvgrU
        | VectorOpcode::I16x8Add
        | VectorOpcode::I16x8AddSatS
        | VectorOpcode::I16x8AddSatU
        | VectorOpcode::I16x8Sub
        | VectorOpcode::I16x8SubSatS
        | VectorOpcode::I16x8SubSatU
        | VectorOpcode::I16x8Mul
        | VectorOpcode::I16x8MinS
        | VectorOpcode::I16x8MinU
        | VectorOpcode::I16x8MaxS
        | VectorOpcode::I16x8MaxU
        | VectorOpcode::I16x8AvgrU
        | VectorOpcode::I16x8Q15mulrSatS
        | VectorOpcode::I16x8ExtmulLowI8x16S
        | VectorOpcode::I16x8ExtmulHighI8x16S
        | VectorOpcode::I16x8ExtmulLowI8x16U
        | VectorOpcode::I16x8ExtmulHighI8x16U
        | VectorOpcode::I32x4Add
        | VectorOpcode::I32x4Sub
        | VectorOpcode::I32x4Mul
        | VectorOpcode::I32x4MinS
        | VectorOpcode::I32x4MinU
        | VectorOpcode::I32x4MaxS
        | VectorOpcode::I32x4MaxU
        | VectorOpcode::I32x4DotI16x8S
        | VectorOpcode::I32x4ExtmulLowI16x8S
        | VectorOpcode::I32x4ExtmulHighI16x8S
        | VectorOpcode::I32x4ExtmulLowI16x8U
        | VectorOpcode::I32x4ExtmulHighI16x8U
        | VectorOpcode::I64x2Add
        | VectorOpcode::I64x2Sub
        | VectorOpcode::I64x2Mul
        | VectorOpcode::I64x2ExtmulLowI32x4S
        | VectorOpcode::I64x2ExtmulHighI32x4S
        | VectorOpcode::I64x2ExtmulLowI32x4U
        | VectorOpcode::I64x2ExtmulHighI32x4U
        | VectorOpcode::F32x4Add
        | VectorOpcode::F32x4Sub
        | VectorOpcode::F32x4Mul
        | VectorOpcode::F32x4Div
        | VectorOpcode::F32x4Min
        | VectorOpcode::F32x4Max
        | VectorOpcode::F32x4Pmin
        | VectorOpcode::F32x4Pmax
        | VectorOpcode::F64x2Add
        | VectorOpcode::F64x2Sub
        | VectorOpcode::F64x2Mul
        | VectorOpcode::F64x2Div
        | VectorOpcode::F64x2Min
        | VectorOpcode::F64x2Max
        | VectorOpcode::F64x2Pmin
        | VectorOpcode::F64x2Pmax => {
            state.pop_expect(V128)?;
            state.pop_expect(V128)?;
            state.push_val(V128)?;
        }

        VectorOpcode::V128Bitselect => {
            state.pop_expect(V128)?;
            state.pop_expect(V128)?;
            state.pop_expect(V128)?;
            state.push_val(V128)?;
        }

        VectorOpcode::V128Not
        | VectorOpcode::I8x16Abs
        | VectorOpcode::I8x16Neg
        | VectorOpcode::I8x16Popcnt
        | VectorOpcode::I16x8ExtaddPairwiseI8x16S
        | VectorOpcode::I16x8ExtaddPairwiseI8x16U
        | VectorOpcode::I16x8Abs
        | VectorOpcode::I16x8Neg
        | VectorOpcode::I16x8ExtendLowI8x16S
        | VectorOpcode::I16x8ExtendHighI8x16S
        | VectorOpcode::I16x8ExtendLowI8x16U
        | VectorOpcode::I16x8ExtendHighI8x16U
        | VectorOpcode::I32x4ExtaddPairwiseI16x8S
        | VectorOpcode::I32x4ExtaddPairwiseI16x8U
        | VectorOpcode::I32x4Abs
        | VectorOpcode::I32x4Neg
        | VectorOpcode::I32x4ExtendLowI16x8S
        | VectorOpcode::I32x4ExtendHighI16x8S
        | VectorOpcode::I32x4ExtendLowI16x8U
        | VectorOpcode::I32x4ExtendHighI16x8U
        | VectorOpcode::I64x2Abs
        | VectorOpcode::I64x2Neg
        | VectorOpcode::I64x2ExtendLowI32x4S
        | VectorOpcode::I64x2ExtendHighI32x4S
        | VectorOpcode::I64x2ExtendLowI32x4U
        | VectorOpcode::I64x2ExtendHighI32x4U
        | VectorOpcode::F32x4Ceil
        | VectorOpcode::F32x4Floor
        | VectorOpcode::F32x4Trunc
        | VectorOpcode::F32x4Nearest
        | VectorOpcode::F32x4Abs
        | VectorOpcode::F32x4Neg
        | VectorOpcode::F32x4Sqrt
        | VectorOpcode::F64x2Ceil
        | VectorOpcode::F64x2Floor
        | VectorOpcode::F64x2Trunc
        | VectorOpcode::F64x2Nearest
        | VectorOpcode::F64x2Abs
        | VectorOpcode::F64x2Neg
        | VectorOpcode::F64x2Sqrt
        | VectorOpcode::I32x4TruncSatF32x4S
        | VectorOpcode::I32x4TruncSatF32x4U
        | VectorOpcode::F32x4ConvertI32x4S
        | VectorOpcode::F32x4ConvertI32x4U
        | VectorOpcode::I32x4TruncSatF64x2SZero
        | VectorOpcode::I32x4TruncSatF64x2UZero
        | VectorOpcode::F64x2ConvertLowI32x4S
        | VectorOpcode::F64x2ConvertLowI32x4U
        | VectorOpcode::F32x4DemoteF64x2Zero
        | VectorOpcode::F64x2PromoteLowF32x4 => {
            state.pop_expect(V128)?;
            state.push_val(V128)?;
        }

        VectorOpcode::I8x16Shl
        | VectorOpcode::I8x16ShrS
        | VectorOpcode::I8x16ShrU
        | VectorOpcode::I16x8Shl
        | VectorOpcode::I16x8ShrS
        | VectorOpcode::I16x8ShrU
        | VectorOpcode::I32x4Shl
        | VectorOpcode::I32x4ShrS
        | VectorOpcode::I32x4ShrU
        | VectorOpcode::I64x2Shl
        | VectorOpcode::I64x2ShrS
        | VectorOpcode::I64x2ShrU => {
            state.pop_expect(I32)?;
            state.pop_expect(V128)?;
            state.push_val(V128)?;
        }

        VectorOpcode::V128AnyTrue
        | VectorOpcode::I8x16AllTrue
        | VectorOpcode::I8x16Bitmask
        | VectorOpcode::I16x8AllTrue
        | VectorOpcode::I16x8Bitmask
        | VectorOpcode::I32x4AllTrue
        | VectorOpcode::I32x4Bitmask
        | VectorOpcode::I64x2AllTrue
        | VectorOpcode::I64x2Bitmask => {
            state.pop_expect(V128)?;
            state.push_val(I32)?;
        }
    }
    Ok(())
}
