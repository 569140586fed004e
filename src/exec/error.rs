// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! The error taxonomy for module instantiation and execution.

use crate::core_compat::alloc::collections::TryReserveError;

/// The reason a trap unwound the interpreter loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Trap {
    Unreachable,
    DivisionByZero,
    IntegerOverflow,
    InvalidConversionToInteger,
    OutOfBoundsMemoryAccess,
    OutOfBoundsTableAccess,
    IndirectCallTypeMismatch,
    UninitializedElement,
}

/// Everything that can go wrong constructing or driving an
/// `ExecutionContext`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// A runtime precondition failed mid-execution; the interpreter loop has
    /// unwound back to the caller of `invoke`.
    Trap(Trap),
    /// The call-frame stack or value stack would have exceeded its
    /// configured capacity.
    CallStackOverflow,
    /// An active data segment's `offset + length` didn't fit within the
    /// memory's actual size at instantiation time.
    OutOfBounds,
    /// Export lookup by name or index found nothing.
    NotFound,
    /// The caller supplied the wrong number of arguments, or otherwise
    /// misused the embedder API.
    ApiMisuse,
    /// Allocation failed while constructing the context or growing a stack.
    AllocError,
    /// The module declares a non-empty import section; this implementation
    /// never links imports, so such a module cannot be instantiated.
    UnsupportedImport,
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Error::AllocError
    }
}
