// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Tables: growable arrays of opaque reference indices.
//!
//! A table element is stored as a raw `u32` index (a funcref is a function
//! index, an externref is treated identically since this profile never
//! imports or exports host values); `u32::MAX` is the null reference.

use crate::Allocator;
use crate::core_compat::vec::Vec;
use crate::types::TableType;

use super::error::{Error, Trap};

pub(crate) const NULL: u32 = u32::MAX;

pub(crate) struct Table<A: Allocator> {
    elems: Vec<u32, A>,
    max_elements: Option<u32>,
}

impl<A: Allocator + Clone> Table<A> {
    pub(crate) fn new(ty: TableType, alloc: A) -> Result<Self, Error> {
        let min = ty.min_elements() as usize;
        let mut elems: Vec<u32, A> = Vec::new_in(alloc);
        elems.try_reserve_exact(min)?;
        elems.resize(min, NULL);
        Ok(Self {
            elems,
            max_elements: ty.max_elements(),
        })
    }

    pub(crate) fn size(&self) -> u32 {
        self.elems.len() as u32
    }

    pub(crate) fn grow(&mut self, delta: u32, init: u32) -> Option<u32> {
        let current = self.size();
        let new_total = current.checked_add(delta)?;
        if new_total > self.max_elements.unwrap_or(u32::MAX) {
            return None;
        }
        if self.elems.try_reserve_exact(delta as usize).is_err() {
            return None;
        }
        self.elems.resize(new_total as usize, init);
        Some(current)
    }

    pub(crate) fn get(&self, idx: u32) -> Result<u32, Trap> {
        self.elems
            .get(idx as usize)
            .copied()
            .ok_or(Trap::OutOfBoundsTableAccess)
    }

    pub(crate) fn set(&mut self, idx: u32, value: u32) -> Result<(), Trap> {
        *self
            .elems
            .get_mut(idx as usize)
            .ok_or(Trap::OutOfBoundsTableAccess)? = value;
        Ok(())
    }

    // Used for active element segments at instantiation time, where the
    // offset has already been statically validated to be in range.
    pub(crate) fn set_at(&mut self, offset: usize, init: &[u32]) -> Result<(), Error> {
        if offset.checked_add(init.len()).is_none_or(|end| end > self.elems.len()) {
            return Err(Error::OutOfBounds);
        }
        self.elems[offset..offset + init.len()].copy_from_slice(init);
        Ok(())
    }

    pub(crate) fn fill(&mut self, idx: u32, value: u32, len: u32) -> Result<(), Trap> {
        let end = u64::from(idx) + u64::from(len);
        if end > self.elems.len() as u64 {
            return Err(Trap::OutOfBoundsTableAccess);
        }
        self.elems[idx as usize..end as usize].fill(value);
        Ok(())
    }

    pub(crate) fn copy_within(&mut self, dst: u32, src: u32, len: u32) -> Result<(), Trap> {
        let dst_end = u64::from(dst) + u64::from(len);
        let src_end = u64::from(src) + u64::from(len);
        if dst_end > self.elems.len() as u64 || src_end > self.elems.len() as u64 {
            return Err(Trap::OutOfBoundsTableAccess);
        }
        self.elems
            .copy_within(src as usize..src_end as usize, dst as usize);
        Ok(())
    }

    pub(crate) fn init(&mut self, dst: u32, src_elems: &[u32], src: u32, len: u32) -> Result<(), Trap> {
        let src_end = u64::from(src) + u64::from(len);
        if src_end > src_elems.len() as u64 {
            return Err(Trap::OutOfBoundsTableAccess);
        }
        let dst_end = u64::from(dst) + u64::from(len);
        if dst_end > self.elems.len() as u64 {
            return Err(Trap::OutOfBoundsTableAccess);
        }
        self.elems[dst as usize..dst_end as usize]
            .copy_from_slice(&src_elems[src as usize..src_end as usize]);
        Ok(())
    }

    // table.copy across two distinct tables: same bounds-checking as `init`,
    // just with a live table instead of an element segment as the source.
    pub(crate) fn copy_from(&mut self, dst: u32, src_table: &Table<A>, src: u32, len: u32) -> Result<(), Trap> {
        let src_end = u64::from(src) + u64::from(len);
        if src_end > src_table.elems.len() as u64 {
            return Err(Trap::OutOfBoundsTableAccess);
        }
        let dst_end = u64::from(dst) + u64::from(len);
        if dst_end > self.elems.len() as u64 {
            return Err(Trap::OutOfBoundsTableAccess);
        }
        self.elems[dst as usize..dst_end as usize]
            .copy_from_slice(&src_table.elems[src as usize..src_end as usize]);
        Ok(())
    }
}
