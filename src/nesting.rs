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
 * CBOR traversal nesting stack
 *
 * Bookkeeping for the arrays, maps and byte-string wrapped regions open around the traversal
 * cursor. The stack is a small fixed array of frames, so decoder state stays constant-size and
 * snapshot/restore for map searches is a plain struct copy.
 **************************************************************************************************/
use crate::constants::{COUNT_EMPTY_BOUNDED, COUNT_INDEFINITE, MAX_NESTING};
use crate::error::{CBORError, Result};

/// Marker for a frame offset that has not been recorded. An aggregate frame with this start
/// offset has not been entered through the bounded API.
pub(crate) const OFFSET_INVALID: u32 = u32::MAX;

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum AggregateKind {
    Array,
    Map,
    MapAsArray,
}

/// One open level around the cursor.
///
/// An `Aggregate` frame tracks a map or array: `remaining` counts down as items at that level
/// are consumed (`COUNT_INDEFINITE` until the break for the indefinite form), `total` keeps the
/// original count so a bounded map can be re-traversed, and `start_offset` records where the
/// first contained item starts once the level has been entered through the bounded API.
///
/// A `WrappedString` frame tracks byte-string wrapped CBOR: `saved_end` is the buffer end to
/// restore on exit and `start_offset` the start of the wrapped region. The base frame of every
/// stack is a `WrappedString` covering the whole input.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Frame {
    Aggregate {
        kind: AggregateKind,
        remaining: u16,
        total: u16,
        start_offset: u32,
    },
    WrappedString {
        saved_end: u32,
        start_offset: u32,
    },
}

impl Frame {
    const BASE: Frame = Frame::WrappedString {
        saved_end: OFFSET_INVALID,
        start_offset: 0,
    };

    /// Return `true` if traversal must not ascend past this frame without an explicit exit.
    pub(crate) fn is_bounded(&self) -> bool {
        match self {
            Frame::WrappedString { .. } => true,
            Frame::Aggregate { start_offset, .. } => *start_offset != OFFSET_INVALID,
        }
    }
}

/// The stack of open levels. `current` is the innermost frame the traversal is in;
/// `bounded` is the innermost frame that was entered through the bounded API. The invariant
/// `current >= bounded >= 0` always holds, with frame 0 being the base sentinel.
#[derive(Debug, Copy, Clone)]
pub(crate) struct NestingStack {
    frames: [Frame; MAX_NESTING + 1],
    current: usize,
    bounded: usize,
}

impl NestingStack {
    pub(crate) fn new() -> Self {
        NestingStack {
            frames: [Frame::BASE; MAX_NESTING + 1],
            current: 0,
            bounded: 0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.frames[0] = Frame::BASE;
        self.current = 0;
        self.bounded = 0;
    }

    #[inline]
    pub(crate) fn current_level(&self) -> u8 {
        self.current as u8
    }

    #[inline]
    pub(crate) fn bounded_level(&self) -> u8 {
        self.bounded as u8
    }

    #[inline]
    pub(crate) fn is_at_top(&self) -> bool {
        self.current == 0
    }

    #[inline]
    pub(crate) fn in_bounded_level(&self) -> bool {
        self.bounded > 0
    }

    #[inline]
    pub(crate) fn current_frame(&self) -> Frame {
        self.frames[self.current]
    }

    #[inline]
    pub(crate) fn bounded_frame(&self) -> Frame {
        self.frames[self.bounded]
    }

    /// Return `true` if the innermost frame is a map whose entries are label/value pairs.
    pub(crate) fn in_map(&self) -> bool {
        matches!(
            self.frames[self.current],
            Frame::Aggregate {
                kind: AggregateKind::Map,
                ..
            }
        )
    }

    /// Open a new map or array level containing `count` items.
    pub(crate) fn descend(&mut self, kind: AggregateKind, count: u16) -> Result<()> {
        if self.current + 1 > MAX_NESTING {
            return Err(CBORError::ArrayDecodeNestingTooDeep);
        }
        self.current += 1;
        self.frames[self.current] = Frame::Aggregate {
            kind,
            remaining: count,
            total: count,
            start_offset: OFFSET_INVALID,
        };
        Ok(())
    }

    /// Open a byte-string wrapped level. Wrapped levels are inherently bounded.
    pub(crate) fn descend_wrapped(&mut self, saved_end: u32, start_offset: u32) -> Result<()> {
        if self.current + 1 > MAX_NESTING {
            return Err(CBORError::ArrayDecodeNestingTooDeep);
        }
        self.current += 1;
        self.frames[self.current] = Frame::WrappedString {
            saved_end,
            start_offset,
        };
        self.bounded = self.current;
        Ok(())
    }

    /// Close the innermost level.
    pub(crate) fn ascend(&mut self) {
        debug_assert!(self.current > 0);
        self.current -= 1;
    }

    /// Set the innermost level directly. Used by the bounded exit operations which may pop
    /// several levels at once.
    pub(crate) fn set_current(&mut self, level: usize) {
        debug_assert!(level <= self.current);
        self.current = level;
    }

    /// Consume one item at the innermost definite-length level. Indefinite and synthetic
    /// empty levels are unaffected.
    pub(crate) fn decrement(&mut self) {
        if let Frame::Aggregate { remaining, .. } = &mut self.frames[self.current] {
            if *remaining != COUNT_INDEFINITE && *remaining != COUNT_EMPTY_BOUNDED && *remaining > 0
            {
                *remaining -= 1;
            }
        }
    }

    /// Mark the innermost level exhausted. Bounded levels are never ascended implicitly, so
    /// this is how the traversal signals their end.
    pub(crate) fn zero_remaining(&mut self) {
        if let Frame::Aggregate { remaining, .. } = &mut self.frames[self.current] {
            *remaining = 0;
        }
    }

    /// Restore the innermost level's remaining count to its original total. Used when a
    /// bounded map or array is rewound for re-traversal.
    pub(crate) fn reset_remaining(&mut self) {
        if let Frame::Aggregate {
            remaining, total, ..
        } = &mut self.frames[self.current]
        {
            *remaining = *total;
        }
    }

    /// Record the start of the innermost aggregate's content and make it the innermost
    /// bounded level.
    pub(crate) fn mark_bounded(&mut self, start: u32) {
        if let Frame::Aggregate { start_offset, .. } = &mut self.frames[self.current] {
            *start_offset = start;
        }
        self.bounded = self.current;
    }

    #[inline]
    pub(crate) fn is_current_bounded(&self) -> bool {
        self.frames[self.current].is_bounded()
    }

    /// Set the innermost bounded level directly.
    pub(crate) fn set_bounded(&mut self, level: usize) {
        self.bounded = level;
    }

    /// Recompute the innermost bounded level after an exit popped frames off the stack.
    pub(crate) fn restore_bounded(&mut self) {
        let mut level = self.current;
        while level > 0 && !self.frames[level].is_bounded() {
            level -= 1;
        }
        self.bounded = level;
    }

    /// Remaining item count of the innermost frame, if it is an aggregate.
    pub(crate) fn current_remaining(&self) -> Option<u16> {
        match self.frames[self.current] {
            Frame::Aggregate { remaining, .. } => Some(remaining),
            Frame::WrappedString { .. } => None,
        }
    }

    /// Return `true` if the bounded frame is the synthetic level pushed when an empty map or
    /// array was entered.
    pub(crate) fn bounded_is_empty(&self) -> bool {
        matches!(
            self.frames[self.bounded],
            Frame::Aggregate {
                total: COUNT_EMPTY_BOUNDED,
                ..
            }
        )
    }
}
