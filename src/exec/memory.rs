// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Linear memory: a growable byte buffer addressed in 64 KiB pages.

use crate::Allocator;
use crate::core_compat::vec::Vec;
use crate::types::MemType;

use super::error::{Error, Trap};

pub(crate) const PAGE_SIZE: usize = MemType::PAGE_SIZE;

pub(crate) struct Memory<A: Allocator> {
    bytes: Vec<u8, A>,
    max_pages: Option<u32>,
}

impl<A: Allocator + Clone> Memory<A> {
    pub(crate) fn new(ty: MemType, alloc: A) -> Result<Self, Error> {
        let mut bytes: Vec<u8, A> = Vec::new_in(alloc);
        bytes.try_reserve_exact(ty.min_size_bytes())?;
        bytes.resize(ty.min_size_bytes(), 0);
        Ok(Self {
            bytes,
            max_pages: ty.max,
        })
    }

    pub(crate) fn page_count(&self) -> u32 {
        (self.bytes.len() / PAGE_SIZE) as u32
    }

    pub(crate) fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Grows the memory by `delta` pages, returning the previous page count
    /// on success or `None` (mapped by the caller to i32 -1) on failure:
    /// exceeding the declared maximum, exceeding the implicit 4 GiB page
    /// bound, or allocation refusal. Leaves memory unchanged on failure.
    pub(crate) fn grow(&mut self, delta: u32) -> Option<u32> {
        let current = self.page_count();
        let new_total = current.checked_add(delta)?;
        const ABSOLUTE_MAX_PAGES: u32 = (u16::MAX as u32) + 1;
        if new_total > self.max_pages.unwrap_or(ABSOLUTE_MAX_PAGES) || new_total > ABSOLUTE_MAX_PAGES
        {
            return None;
        }
        let new_size = (new_total as usize).checked_mul(PAGE_SIZE)?;
        if self.bytes.try_reserve_exact(new_size - self.bytes.len()).is_err() {
            return None;
        }
        self.bytes.resize(new_size, 0);
        Some(current)
    }

    fn bounds_check(&self, addr: u32, offset: u32, width: usize) -> Result<usize, Trap> {
        let effective = u64::from(addr) + u64::from(offset);
        let end = effective + width as u64;
        if end > self.bytes.len() as u64 {
            return Err(Trap::OutOfBoundsMemoryAccess);
        }
        Ok(effective as usize)
    }

    pub(crate) fn read(&self, addr: u32, offset: u32, buf: &mut [u8]) -> Result<(), Trap> {
        let start = self.bounds_check(addr, offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
        Ok(())
    }

    pub(crate) fn write(&mut self, addr: u32, offset: u32, data: &[u8]) -> Result<(), Trap> {
        let start = self.bounds_check(addr, offset, data.len())?;
        self.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    // Writes `init` at a statically-known (already bounds-checked) offset,
    // used for active data segments at instantiation time.
    pub(crate) fn write_at(&mut self, offset: usize, init: &[u8]) -> Result<(), Error> {
        if offset.checked_add(init.len()).is_none_or(|end| end > self.bytes.len()) {
            return Err(Error::OutOfBounds);
        }
        self.bytes[offset..offset + init.len()].copy_from_slice(init);
        Ok(())
    }

    pub(crate) fn fill(&mut self, addr: u32, value: u8, len: u32) -> Result<(), Trap> {
        let start = self.bounds_check(addr, 0, len as usize)?;
        self.bytes[start..start + len as usize].fill(value);
        Ok(())
    }

    // memory.copy uses overlap-safe semantics, as if through a temporary
    // buffer; Rust's slice::copy_within already provides that.
    pub(crate) fn copy_within(&mut self, dst: u32, src: u32, len: u32) -> Result<(), Trap> {
        let dst_start = self.bounds_check(dst, 0, len as usize)?;
        let src_start = self.bounds_check(src, 0, len as usize)?;
        self.bytes.copy_within(src_start..src_start + len as usize, dst_start);
        Ok(())
    }

    pub(crate) fn init(&mut self, dst: u32, data: &[u8], src: u32, len: u32) -> Result<(), Trap> {
        let src_end = u64::from(src) + u64::from(len);
        if src_end > data.len() as u64 {
            return Err(Trap::OutOfBoundsMemoryAccess);
        }
        let dst_start = self.bounds_check(dst, 0, len as usize)?;
        let src_start = src as usize;
        self.bytes[dst_start..dst_start + len as usize]
            .copy_from_slice(&data[src_start..src_start + len as usize]);
        Ok(())
    }
}
