// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Module instantiation and execution: the runtime counterpart to `decode`
//! and `validate`.
//!
//! A validated `Module` is inert: it owns no memory, tables, globals, or
//! call/value stacks of its own. `ExecutionContext::new` instantiates one,
//! and `ExecutionContext::invoke` runs the pre-decoded `bytecode` of a
//! function to completion or a trap.

mod context;
mod error;
mod frame;
mod interp;
mod memory;
mod table;
mod value;

pub use context::{ContextConfig, ExecutionContext};
pub use error::{Error, Trap};
pub use value::Slot;
