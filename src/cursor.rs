// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! A cursor for reading back the fixed-width, aligned instruction stream
//! produced by the decoder's expression transcoder. (See Expression's
//! docstring for the encoding this mirrors.)

use crate::types::{
    BlockType, BulkOpcode, CallIndirectOperands, LabelIdx, MemArg, MemArgLaneOperands, Opcode,
    RefType, TableCopyOperands, TableInitOperands, V128Bytes, ValType, VectorOpcode,
};

/// A forward-only cursor over a transcoded `Expression`'s bytes.
pub(crate) struct ExpressionCursor<'e> {
    data: &'e [u8],
    pos: usize,
}

impl<'e> ExpressionCursor<'e> {
    pub(crate) fn new(data: &'e [u8]) -> Self {
        Self { data, pos: 0 }
    }

    // Reads a value of type T starting at the next T-aligned position, per
    // the write scheme used by the transcoder's Transcodable::write_to.
    //
    // Safety: The bytes at the resulting aligned position must have
    // previously been written as a valid T by the same encoding scheme.
    unsafe fn read<T: Copy>(&mut self) -> T {
        let aligned_pos = self.pos.next_multiple_of(align_of::<T>());
        debug_assert!(aligned_pos + size_of::<T>() <= self.data.len());
        // Safety: forwarded to caller.
        let value = unsafe { self.data.as_ptr().add(aligned_pos).cast::<T>().read() };
        self.pos = aligned_pos + size_of::<T>();
        value
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    // Safety: every Opcode byte in an Expression was written from a value
    // that was itself successfully decoded via Opcode's TryFromPrimitive
    // impl, so the bit pattern is always a valid discriminant.
    pub(crate) fn read_opcode(&mut self) -> Opcode {
        unsafe { self.read() }
    }

    pub(crate) fn read_bulk_opcode(&mut self) -> BulkOpcode {
        unsafe { self.read() }
    }

    pub(crate) fn read_vector_opcode(&mut self) -> VectorOpcode {
        unsafe { self.read() }
    }

    pub(crate) fn read_u8(&mut self) -> u8 {
        unsafe { self.read() }
    }

    pub(crate) fn read_u32(&mut self) -> u32 {
        unsafe { self.read() }
    }

    pub(crate) fn read_i32(&mut self) -> i32 {
        unsafe { self.read() }
    }

    pub(crate) fn read_i64(&mut self) -> i64 {
        unsafe { self.read() }
    }

    pub(crate) fn read_f32(&mut self) -> f32 {
        unsafe { self.read() }
    }

    pub(crate) fn read_f64(&mut self) -> f64 {
        unsafe { self.read() }
    }

    pub(crate) fn read_reftype(&mut self) -> RefType {
        unsafe { self.read() }
    }

    pub(crate) fn read_valtype(&mut self) -> ValType {
        unsafe { self.read() }
    }

    pub(crate) fn read_blocktype(&mut self) -> BlockType {
        unsafe { self.read() }
    }

    pub(crate) fn read_memarg(&mut self) -> MemArg {
        unsafe { self.read() }
    }

    pub(crate) fn read_memarg_lane(&mut self) -> MemArgLaneOperands {
        unsafe { self.read() }
    }

    pub(crate) fn read_v128_bytes(&mut self) -> V128Bytes {
        unsafe { self.read() }
    }

    pub(crate) fn read_call_indirect(&mut self) -> CallIndirectOperands {
        unsafe { self.read() }
    }

    pub(crate) fn read_table_copy(&mut self) -> TableCopyOperands {
        unsafe { self.read() }
    }

    pub(crate) fn read_table_init(&mut self) -> TableInitOperands {
        unsafe { self.read() }
    }

    pub(crate) fn read_labelidx(&mut self) -> LabelIdx {
        unsafe { self.read() }
    }

    // Reads a `vec(labelidx)` as written by Vec<T,A>'s Transcodable impl: a
    // u32 length followed by that many naturally-aligned elements.
    pub(crate) fn read_labelidx_vec_len(&mut self) -> u32 {
        self.read_u32()
    }

    // Reads a `vec(valtype)` length, as written for SelectTOperands.
    pub(crate) fn read_valtype_vec_len(&mut self) -> u32 {
        self.read_u32()
    }
}
