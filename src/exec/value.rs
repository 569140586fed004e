// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! The runtime value representation.
//!
//! A `Slot` is a raw 128-bit stack cell with no type tag: validation already
//! established what each instruction's operands mean, so the interpreter
//! just reinterprets the bits each instruction expects. A fresh `Slot` is
//! always built zero-extended from whichever width actually matters, so two
//! slots holding (say) the same `i32` compare equal regardless of how they
//! were produced.

/// One value-stack cell: the low N bits hold an i32/i64/f32/f64/funcref, or
/// all 128 bits hold a v128, depending on what the validated instruction
/// stream says is there.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Slot(pub u128);

impl Slot {
    pub const NULL_REF: Slot = Slot(u32::MAX as u128);

    #[must_use]
    pub fn from_i32(v: i32) -> Self {
        Slot(v as u32 as u128)
    }

    #[must_use]
    pub fn from_u32(v: u32) -> Self {
        Slot(u128::from(v))
    }

    #[must_use]
    pub fn from_i64(v: i64) -> Self {
        Slot(v as u64 as u128)
    }

    #[must_use]
    pub fn from_u64(v: u64) -> Self {
        Slot(u128::from(v))
    }

    #[must_use]
    pub fn from_f32(v: f32) -> Self {
        Slot(u128::from(v.to_bits()))
    }

    #[must_use]
    pub fn from_f64(v: f64) -> Self {
        Slot(u128::from(v.to_bits()))
    }

    #[must_use]
    pub fn from_v128(bytes: [u8; 16]) -> Self {
        Slot(u128::from_le_bytes(bytes))
    }

    #[must_use]
    pub fn from_ref(idx: u32) -> Self {
        Slot::from_u32(idx)
    }

    #[must_use]
    pub fn as_i32(self) -> i32 {
        self.0 as u32 as i32
    }

    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0 as u32
    }

    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0 as u64 as i64
    }

    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0 as u64
    }

    #[must_use]
    pub fn as_f32(self) -> f32 {
        f32::from_bits(self.0 as u32)
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from_bits(self.0 as u64)
    }

    #[must_use]
    pub fn as_v128(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    #[must_use]
    pub fn as_ref_idx(self) -> u32 {
        self.0 as u32
    }

    #[must_use]
    pub fn is_null_ref(self) -> bool {
        self.as_ref_idx() == u32::MAX
    }

    #[must_use]
    pub fn bool(v: bool) -> Self {
        Slot::from_i32(i32::from(v))
    }
}
