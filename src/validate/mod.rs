// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

mod expr;
mod validate_impls;

use crate::core_compat::vec::Vec;
use crate::types::{
    FuncIdx, FunctionType, GlobalIdx, GlobalType, ImportDescriptor, Limits, SectionId, TableIdx,
    TableType, TypeIdx, ValType,
};
use crate::{Allocator, Module};

pub(crate) use expr::{BranchAdjust, ExpressionValidationContext, validate_expression};

/// Represents errors that can arise during module validation.
#[derive(Clone, Copy, Debug)]
pub enum Error {
    DataCountMismatch {
        expected: usize,
        actual: usize,
    },
    DuplicateExportName {
        exportsec_idx: u32,
    },
    FunctionAndCodeSectionMismatch {
        funcsec_size: u32,
        codesec_size: u32,
    },
    IndexOutOfBounds {
        id: SectionId,
        index: u32,
        capacity: u32,
    },
    InvalidMemType(Limits),
    InvalidStartFunction(FuncIdx),
    InvalidTableLimits(Limits),
    /// More than one memory was declared or imported; this profile accepts
    /// at most one.
    TooManyMemories,
    /// An active element segment's `offset + length` does not fit within its
    /// table's declared minimum size.
    ElementSegmentOutOfBounds,
    /// A constant expression used an instruction other than one of the
    /// handful permitted in that context.
    InvalidConstantInstruction,
    /// A `global.get` within a constant expression referenced a global that
    /// either isn't an import or isn't immutable.
    InvalidConstantGlobal(u32),
    /// Attempted to branch to a nonexistent label.
    InvalidLabel(u32),
    /// Control stack underflowed: an `else` or `end` was reached with no
    /// matching `block`/`loop`/`if`.
    ControlStackUnderflow,
    /// An `else` was reached without a matching `if`.
    ElseWithoutIf,
    /// The operand stack did not have enough values to satisfy an
    /// instruction's inputs.
    OperandStackUnderflow,
    /// An operand on the stack had the wrong type.
    TypeMismatch { expected: ValType, actual: ValType },
    /// A function's body produced a different number (or exact sequence) of
    /// final values than its declared result type.
    ResultTypeMismatch,
    /// The module declares imports, which this implementation does not
    /// support executing.
    UnsupportedImport,
    /// A function type declares more than one result, which this
    /// implementation does not support for directly callable functions.
    TooManyResults { typeidx: u32 },
    /// Allocation failed while validating an expression.
    AllocError,
}

// Called at the end of Module::decode() to reorder the import and export
// sections in a way convenient for validation:
// * imports are *stably* reordered by type, since logical grouping makes for
//   O(1) access by funcidx/tableidx/memidx/globalidx, easier determination of
//   the number of imports by type, and easier separaton later on.
// * exports are reordered by field name, making it easier to determine whether
//   they are all unique.
pub(crate) fn prepare_module_for_validation<A: Allocator>(module: &mut Module<A>) {
    module
        .importsec
        .0
        .sort_by_key(|import| import.descriptor.discriminant());
    module
        .exportsec
        .0
        .sort_by(|a, b| a.field.as_ref().cmp(b.field.as_ref()));
}

pub(crate) struct Validator<'module, A: Allocator> {
    module: &'module Module<A>,

    // The exclusive ending index within the import section of the functions, or
    // `import_tableidx_end` if there are none.
    import_funcidx_end: usize,

    // The exclusive ending index within the import section of the tables, or
    // `import_memidx_end` if there are none.
    import_tableidx_end: usize,

    // The exclusive ending index within the import section of the memories, or
    // the end index of the whole section if there are none.
    import_memidx_end: usize,

    // Per-function operand-stack high-water mark, collected in codesec
    // order as CodeSection is validated. Empty until that point.
    pub(crate) max_stack_depths: Vec<u32, A>,

    // Per-function branch stack adjustments, parallel to `max_stack_depths`
    // and in the same codesec order; consumed by `bytecode::lower`.
    pub(crate) branch_adjustments: Vec<Vec<expr::BranchAdjust, A>, A>,

    alloc: A,
}

impl<'module, A: Allocator + Clone> Validator<'module, A> {
    pub(crate) fn new(module: &'module Module<A>, alloc: A) -> Self {
        // Recall that the import section was stably sorted by type in
        // prepare_module_for_validation().
        let mut import_tableidx_start = None;
        let mut import_memidx_start = None;
        let mut import_globalidx_start = None;
        for (idx, import) in module.importsec.iter().enumerate() {
            match import.descriptor {
                ImportDescriptor::Function(_) => {}
                ImportDescriptor::Table(_) => {
                    if import_tableidx_start.is_none() {
                        import_tableidx_start = Some(idx);
                    }
                }
                ImportDescriptor::Memory(_) => {
                    if import_memidx_start.is_none() {
                        import_memidx_start = Some(idx);
                    }
                }
                ImportDescriptor::Global(_) => {
                    import_globalidx_start = Some(idx);
                    break;
                }
            }
        }

        let import_memidx_end = import_globalidx_start.unwrap_or(module.importsec.len());
        let import_tableidx_end = import_memidx_start.unwrap_or(import_memidx_end);
        let import_funcidx_end = import_tableidx_start.unwrap_or(import_tableidx_end);
        Self {
            module,
            import_funcidx_end,
            import_tableidx_end,
            import_memidx_end,
            max_stack_depths: Vec::new_in(alloc.clone()),
            branch_adjustments: Vec::new_in(alloc.clone()),
            alloc,
        }
    }

    pub(crate) fn alloc(&self) -> A {
        self.alloc.clone()
    }

    pub(crate) fn data_count(&self) -> usize {
        self.module.datasec.len()
    }

    pub(crate) fn element_count(&self) -> usize {
        self.module.elemsec.len()
    }

    pub(crate) fn function_count(&self) -> usize {
        self.module.funcsec.len() + self.import_funcidx_end
    }

    pub(crate) fn global_count(&self) -> usize {
        self.module.globalsec.len() + (self.module.importsec.len() - self.import_memidx_end)
    }

    pub(crate) fn memory_count(&self) -> usize {
        self.module.memsec.len() + (self.import_memidx_end - self.import_tableidx_end)
    }

    pub(crate) fn table_count(&self) -> usize {
        self.module.tablesec.len() + (self.import_tableidx_end - self.import_funcidx_end)
    }

    pub(crate) fn type_count(&self) -> usize {
        self.module.typesec.len()
    }

    pub(crate) fn function_type(&self, typeidx: TypeIdx) -> &'module FunctionType<A> {
        &self.module.typesec[*typeidx as usize]
    }

    pub(crate) fn function_signature(&self, funcidx: FuncIdx) -> &'module FunctionType<A> {
        let idx = *funcidx as usize;
        let typeidx = if idx < self.import_funcidx_end {
            let import = &self.module.importsec[idx];
            let ImportDescriptor::Function(typeidx) = &import.descriptor else {
                unreachable!();
            };
            *typeidx
        } else {
            let idx = idx - self.import_funcidx_end;
            debug_assert!(idx < self.module.funcsec.len());
            self.module.funcsec[idx]
        };
        self.function_type(typeidx)
    }

    pub(crate) fn table_type(&self, tableidx: TableIdx) -> TableType {
        let idx = *tableidx as usize;
        let num_imported = self.import_tableidx_end - self.import_funcidx_end;
        if idx < num_imported {
            let import = &self.module.importsec[self.import_funcidx_end + idx];
            let ImportDescriptor::Table(ty) = import.descriptor else {
                unreachable!();
            };
            ty
        } else {
            self.module.tablesec[idx - num_imported]
        }
    }

    pub(crate) fn global_type(&self, globalidx: GlobalIdx) -> GlobalType {
        let idx = *globalidx as usize;
        let num_imported = self.module.importsec.len() - self.import_memidx_end;
        if idx < num_imported {
            let import = &self.module.importsec[self.import_memidx_end + idx];
            let ImportDescriptor::Global(ty) = import.descriptor else {
                unreachable!();
            };
            ty
        } else {
            self.module.globalsec[idx - num_imported].ty
        }
    }

    // Whether the global at the given index is an import (and so, per this
    // implementation's restriction on constant expressions, the only kind of
    // global.get usable within one).
    fn global_is_import(&self, globalidx: GlobalIdx) -> bool {
        let idx = *globalidx as usize;
        let num_imported = self.module.importsec.len() - self.import_memidx_end;
        idx < num_imported
    }

    fn validate<T: Validate<A>>(&mut self, value: &T) -> Result<(), Error> {
        value.validate(self)
    }

    // Validates a type index used as a directly callable function's
    // signature: besides being in bounds, its result type must have an arity
    // of at most one, a restriction this implementation places on top of the
    // base format (which otherwise permits multi-value results).
    fn validate_function_typeidx(&mut self, typeidx: TypeIdx) -> Result<(), Error> {
        self.validate(&typeidx)?;
        if self.function_type(typeidx).results.len() > 1 {
            return Err(Error::TooManyResults {
                typeidx: *typeidx,
            });
        }
        Ok(())
    }
}

trait Validate<A: Allocator> {
    fn validate(&self, validator: &mut Validator<A>) -> Result<(), Error>;
}

// Validates the whole module and returns, on success, the per-function
// operand-stack high-water mark and branch stack adjustments computed for
// each entry of `codesec`, in order. The caller (see lib.rs) feeds these
// into the pre-decoder.
pub(crate) fn validate_module<A: Allocator + Clone>(
    module: &Module<A>,
    alloc: A,
) -> Result<(Vec<u32, A>, Vec<Vec<BranchAdjust, A>, A>), Error> {
    let mut validator = Validator::new(module, alloc);

    // The type section is always valid.
    validator.validate(&module.importsec)?;
    validator.validate(&module.funcsec)?;
    validator.validate(&module.tablesec)?;
    validator.validate(&module.memsec)?;
    validator.validate(&module.globalsec)?;
    validator.validate(&module.exportsec)?;
    if let Some(startsec) = &module.startsec {
        validator.validate(startsec)?;
    }
    validator.validate(&module.elemsec)?;
    validator.validate(&module.codesec)?;
    validator.validate(&module.datasec)?;

    if let Some(count) = module.datacountsec
        && (count as usize) != module.datasec.len()
    {
        return Err(Error::DataCountMismatch {
            expected: count as usize,
            actual: module.datasec.len(),
        });
    }

    Ok((validator.max_stack_depths, validator.branch_adjustments))
}
