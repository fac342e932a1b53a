/***************************************************************************************************
 * Copyright (c) 2021-2023 Qualcomm Innovation Center, Inc. All rights reserved.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of this software
 * and associated documentation files (the “Software”), to deal in the Software without
 * restriction, including without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice (including the next
 * paragraph) shall be included in all copies or substantial portions of the
 * Software.
 *
 * THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
 * BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
 * DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 **************************************************************************************************/
/***************************************************************************************************
 * tps_streamcbor string allocator API
 *
 * A streaming, cursor-based, deserializer and serializer for CBOR (RFC8949). This implementation
 * is designed for use in constrained systems and requires neither the Rust standard library nor
 * an allocator.
 **************************************************************************************************/
use crate::error::{CBORError, Result};

/// Allocator used by the decoder to coalesce the chunks of indefinite-length strings into a
/// single contiguous string, and optionally to copy every decoded string so that the input
/// buffer need not outlive decoding.
///
/// The allocator builds one string at a time and follows a stack discipline: only the string
/// most recently opened with [`StringAllocator::allocate`] may be grown, abandoned or
/// completed. Strings returned from [`StringAllocator::complete`] remain valid until
/// [`StringAllocator::destruct`] releases the pool, which the decoder calls from
/// [`crate::decoder::CBORDecoder::finish`].
///
/// `'pool` is the lifetime of the memory backing completed strings. The decoder requires it to
/// cover the lifetime of the input buffer so that borrowed and allocated strings can share one
/// item representation.
pub trait StringAllocator<'pool> {
    /// Open a new string, seeding it with `first`. Fails with
    /// [`CBORError::StringAllocate`] if the pool cannot hold it.
    fn allocate(&mut self, first: &[u8]) -> Result<()>;

    /// Grow the open string by appending `chunk`.
    fn reallocate(&mut self, chunk: &[u8]) -> Result<()>;

    /// Abandon the open string, releasing its space.
    fn free(&mut self);

    /// Seal the open string and return the coalesced bytes.
    fn complete(&mut self) -> Result<&'pool [u8]>;

    /// Release the whole pool. Previously completed strings stay borrowed and remain valid;
    /// no further allocation is possible.
    fn destruct(&mut self);
}

/// A bump allocator over a caller-supplied byte slice.
///
/// The pool carves completed strings off the front of its slice, so the total size of all
/// coalesced strings is bounded by the slice length. There is no heap involvement and freed
/// space from an abandoned string is reused by the next allocation.
///
/// ## Example
/// ```
///# use tps_streamcbor::decoder::{MemPool, StringAllocator};
/// let mut scratch = [0u8; 32];
/// let mut pool = MemPool::new(&mut scratch);
/// pool.allocate(b"Hel").unwrap();
/// pool.reallocate(b"lo").unwrap();
/// assert_eq!(pool.complete().unwrap(), b"Hello");
/// ```
#[derive(Debug)]
pub struct MemPool<'pool> {
    /// Unused space. `None` once the pool has been destructed.
    space: Option<&'pool mut [u8]>,
    /// Bytes written into the string currently under construction.
    open: usize,
    /// A string is under construction.
    active: bool,
}

impl<'pool> MemPool<'pool> {
    /// Construct a pool over `space`. Completed strings borrow from `space` and stay valid for
    /// its full lifetime.
    pub fn new(space: &'pool mut [u8]) -> MemPool<'pool> {
        MemPool {
            space: Some(space),
            open: 0,
            active: false,
        }
    }

    fn append(&mut self, data: &[u8]) -> Result<()> {
        let space = self.space.as_deref_mut().ok_or(CBORError::StringAllocate)?;
        if self.open + data.len() > space.len() {
            return Err(CBORError::StringAllocate);
        }
        space[self.open..self.open + data.len()].copy_from_slice(data);
        self.open += data.len();
        Ok(())
    }
}

impl<'pool> StringAllocator<'pool> for MemPool<'pool> {
    fn allocate(&mut self, first: &[u8]) -> Result<()> {
        if self.active {
            // Stack discipline violated
            return Err(CBORError::StringAllocate);
        }
        self.open = 0;
        self.active = true;
        self.append(first)
    }

    fn reallocate(&mut self, chunk: &[u8]) -> Result<()> {
        if !self.active {
            return Err(CBORError::StringAllocate);
        }
        self.append(chunk)
    }

    fn free(&mut self) {
        self.active = false;
        self.open = 0;
    }

    fn complete(&mut self) -> Result<&'pool [u8]> {
        if !self.active {
            return Err(CBORError::StringAllocate);
        }
        let space = self.space.take().ok_or(CBORError::StringAllocate)?;
        let (sealed, rest) = space.split_at_mut(self.open);
        self.space = Some(rest);
        self.open = 0;
        self.active = false;
        Ok(&*sealed)
    }

    fn destruct(&mut self) {
        self.space = None;
        self.open = 0;
        self.active = false;
    }
}
