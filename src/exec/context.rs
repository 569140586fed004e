// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Module instantiation and the top-level invocation entry point.

use crate::Allocator;
use crate::core_compat::vec::Vec;
use crate::types::{DataMode, ElementInit, ElementMode};
use crate::{constexpr, Module};

use super::error::Error;
use super::frame::Frame;
use super::interp;
use super::memory::Memory;
use super::table::Table;
use super::value::Slot;

/// The tunable resource limits for an `ExecutionContext`. There is nothing
/// else to configure: no host functions can be linked in (see
/// `Error::UnsupportedImport`), so the only knobs left are how much stack
/// space to give the interpreter.
#[derive(Clone, Copy, Debug)]
pub struct ContextConfig {
    /// Maximum nesting depth of `call`/`call_indirect`.
    pub max_call_depth: u32,
    /// Maximum number of values live on the operand stack at once, across all
    /// active frames.
    pub value_stack_capacity: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            max_call_depth: 1024,
            value_stack_capacity: 65536,
        }
    }
}

/// A live instantiation of a `Module`: its globals, memory, tables, and the
/// call/value stacks of whatever invocation is currently in progress.
///
/// Construction runs the module's active element and data segments and, if
/// declared, its start function, exactly as WebAssembly instantiation
/// requires. A module with a non-empty import section is rejected outright:
/// this implementation never links host functions, tables, memories, or
/// globals in.
pub struct ExecutionContext<'m, A: Allocator> {
    pub(crate) module: &'m Module<A>,
    pub(crate) value_stack: Vec<Slot, A>,
    pub(crate) call_stack: Vec<Frame, A>,
    pub(crate) globals: Vec<Slot, A>,
    pub(crate) memory: Option<Memory<A>>,
    pub(crate) tables: Vec<Table<A>, A>,
    pub(crate) data_dropped: Vec<bool, A>,
    pub(crate) elem_dropped: Vec<bool, A>,
    pub(crate) config: ContextConfig,
    pub(crate) alloc: A,
}

impl<'m, A: Allocator + Clone> ExecutionContext<'m, A> {
    pub fn new(module: &'m Module<A>, config: ContextConfig, alloc: A) -> Result<Self, Error> {
        if !module.importsec.is_empty() {
            return Err(Error::UnsupportedImport);
        }

        let mut value_stack: Vec<Slot, A> = Vec::new_in(alloc.clone());
        value_stack.try_reserve_exact(config.value_stack_capacity as usize)?;

        let mut call_stack: Vec<Frame, A> = Vec::new_in(alloc.clone());
        call_stack.try_reserve_exact(config.max_call_depth as usize)?;

        let mut globals: Vec<Slot, A> = Vec::new_in(alloc.clone());
        globals.try_reserve_exact(module.globalsec.len())?;
        for global in module.globalsec.iter() {
            globals.push(Slot(constexpr::eval_const_value(&global.init)));
        }

        let memory = match module.memsec.first() {
            Some(ty) => Some(Memory::new(*ty, alloc.clone())?),
            None => None,
        };

        let mut tables: Vec<Table<A>, A> = Vec::new_in(alloc.clone());
        tables.try_reserve_exact(module.tablesec.len())?;
        for ty in module.tablesec.iter() {
            tables.push(Table::new(*ty, alloc.clone())?);
        }

        let mut data_dropped: Vec<bool, A> = Vec::new_in(alloc.clone());
        data_dropped.try_reserve_exact(module.datasec.len())?;
        data_dropped.resize(module.datasec.len(), false);

        let mut elem_dropped: Vec<bool, A> = Vec::new_in(alloc.clone());
        elem_dropped.try_reserve_exact(module.elemsec.len())?;
        elem_dropped.resize(module.elemsec.len(), false);

        let mut context = ExecutionContext {
            module,
            value_stack,
            call_stack,
            globals,
            memory,
            tables,
            data_dropped,
            elem_dropped,
            config,
            alloc,
        };

        context.init_elements()?;
        context.init_data()?;

        if let Some(start) = &module.startsec {
            let funcidx: u32 = **start;
            context.invoke(funcidx, &[])?;
        }

        Ok(context)
    }

    fn init_elements(&mut self) -> Result<(), Error> {
        for (idx, elem) in self.module.elemsec.iter().enumerate() {
            let ElementMode::Active(active) = &elem.mode else {
                continue;
            };
            let offset = match constexpr::eval_const_i32(&active.offset) {
                Some(v) => v as u32,
                // Only an imported global can appear in a constant expression
                // here, and imports have already been rejected above.
                None => unreachable!("non-import module: segment offset is always i32.const"),
            };

            let len = match &elem.init {
                ElementInit::FunctionIndices(v) => v.len(),
                ElementInit::Expressions(v) => v.len(),
            };
            let mut values: Vec<u32, A> = Vec::new_in(self.alloc.clone());
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

            let table = self
                .tables
                .get_mut(*active.table as usize)
                .ok_or(Error::OutOfBounds)?;
            table.set_at(offset as usize, &values)?;

            // An active segment behaves as if `elem.drop` ran right after
            // instantiation: nothing refers to it passively afterwards.
            self.elem_dropped[idx] = true;
        }
        Ok(())
    }

    fn init_data(&mut self) -> Result<(), Error> {
        for (idx, data) in self.module.datasec.iter().enumerate() {
            let DataMode::Active(active) = &data.mode else {
                continue;
            };
            let offset = match constexpr::eval_const_i32(&active.offset) {
                Some(v) => v as u32,
                None => unreachable!("non-import module: segment offset is always i32.const"),
            };
            let memory = self.memory.as_mut().ok_or(Error::OutOfBounds)?;
            memory.write_at(offset as usize, &data.init)?;
            self.data_dropped[idx] = true;
        }
        Ok(())
    }

    /// Reads a global's current value by index, for embedder inspection
    /// (e.g. a `get` action against an exported global). Returns `None` if
    /// the index is out of range.
    pub fn global(&self, idx: u32) -> Option<Slot> {
        self.globals.get(idx as usize).copied()
    }

    pub(crate) fn push_slot(&mut self, slot: Slot) -> Result<(), Error> {
        if self.value_stack.len() >= self.config.value_stack_capacity as usize {
            return Err(Error::CallStackOverflow);
        }
        self.value_stack.push(slot);
        Ok(())
    }

    /// Invokes a module-defined function by index (the whole function-index
    /// space, since imports are never present). Traps propagate as `Err`;
    /// the context should not be used again afterwards, since the value and
    /// call stacks are left in whatever state the trap occurred in.
    pub fn invoke(&mut self, funcidx: u32, args: &[Slot]) -> Result<Option<Slot>, Error> {
        let typeidx = *self.module.funcsec.get(funcidx as usize).ok_or(Error::NotFound)?;
        let ty = &self.module.typesec[*typeidx as usize];
        if args.len() != ty.parameters.len() {
            return Err(Error::ApiMisuse);
        }
        if self.call_stack.len() as u32 >= self.config.max_call_depth {
            return Err(Error::CallStackOverflow);
        }

        let locals_offset = self.value_stack.len() as u32;
        for &arg in args {
            self.push_slot(arg)?;
        }

        let function = self.module.codesec.get(funcidx as usize).ok_or(Error::NotFound)?;
        for local in function.locals.iter() {
            self.push_slot(local_to_slot(local))?;
        }

        self.call_stack.push(Frame {
            ip: 0,
            locals_offset,
            func_idx: funcidx,
        });

        interp::run(self)?;

        let value = if ty.results.is_empty() {
            None
        } else {
            Some(self.value_stack.pop().expect("interp left a result value"))
        };
        self.value_stack.truncate(locals_offset as usize);
        Ok(value)
    }
}

pub(crate) fn local_to_slot(local: &crate::types::Local) -> Slot {
    use crate::types::Local;
    match *local {
        Local::I32(v) => Slot::from_i32(v),
        Local::I64(v) => Slot::from_i64(v),
        Local::F32(v) => Slot::from_f32(v),
        Local::F64(v) => Slot::from_f64(v),
        Local::FuncRef(v) | Local::ExternRef(v) => Slot::from_ref(v),
        Local::V128(v) => Slot(v),
    }
}
