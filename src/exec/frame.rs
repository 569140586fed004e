// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Call frames.

/// One activation record on the call stack.
///
/// There is no separate locals array: a frame's locals live directly on the
/// value stack starting at `locals_offset`, beginning with the arguments the
/// caller already pushed (reused in place) and followed by the callee's
/// zero-initialized declared locals.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame {
    /// Index of the next instruction to execute in the callee's bytecode.
    pub(crate) ip: u32,
    /// Value-stack index of this frame's first local.
    pub(crate) locals_offset: u32,
    /// The function being executed, for bytecode/signature lookup.
    pub(crate) func_idx: u32,
}
