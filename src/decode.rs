/***************************************************************************************************
 * Copyright (c) 2020-2023 Qualcomm Innovation Center, Inc. All rights reserved.
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
 * CBOR Decoder
 *
 * A streaming, cursor-based, deserializer for CBOR (RFC8949). This implementation is designed
 * for use in constrained systems and requires neither the Rust standard library nor an
 * allocator.
 **************************************************************************************************/
/// # The CBOR traversal decoder
///
/// The decoder walks the input in pre-order, one item per call, without building a tree and
/// without heap allocation. Strings come back as borrowed slices of the input buffer; the only
/// dynamic memory is the optional string allocator used to coalesce indefinite-length strings.
///
/// Internally each call runs a stack of small layers: the head and atomic item decode at the
/// bottom, then indefinite-length string assembly, tag number aggregation, map label pairing,
/// nesting traversal, and finally tag content dispatch. The same traversal cursor also drives
/// the map search operations, which save and restore it around each search.
///
/// ## Example
///
/// ```
///# use tps_streamcbor::decoder::{CBORDecoder, DecodeMode};
///# use tps_streamcbor::types::Value;
/// let buf = [0x82u8, 0x01, 0x62, 0x68, 0x69];
/// let mut decoder = CBORDecoder::new(&buf, DecodeMode::Normal);
/// let array = decoder.get_next().unwrap();
/// assert_eq!(array.value, Value::Array(2));
/// let first = decoder.get_next().unwrap();
/// assert_eq!(first.value, Value::Int64(1));
/// let second = decoder.get_next().unwrap();
/// assert!(matches!(second.value, Value::TextString(t) if t.as_str() == "hi"));
/// assert!(decoder.finish().is_ok());
/// ```
use crate::constants::*;
use crate::error::{CBORError, Result};
use crate::item::{CBORItem, StringKind, TagSlots, Text, Value};
use crate::nesting::{AggregateKind, Frame, NestingStack};
use crate::pool::StringAllocator;
use crate::tag::TagDecoderEntry;

use std::str::from_utf8;

#[cfg(all(feature = "float", feature = "half-float"))]
use half::f16;

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/***************************************************************************************************
 * Head decoding
 **************************************************************************************************/

/// One decoded CBOR head: the major type, the raw additional information bits and the decoded
/// argument. For the indefinite-length form the argument is zero and `ai` is
/// [`PAYLOAD_INDEFINITE`].
#[derive(Debug, Copy, Clone)]
pub(crate) struct Head {
    pub major: u8,
    pub ai: u8,
    pub arg: u64,
}

fn read_arg(buf: &[u8], offset: usize, n_bytes: usize) -> Result<(usize, u64)> {
    let end = offset.checked_add(n_bytes).ok_or(CBORError::HitEnd)?;
    let bytes = buf.get(offset..end).ok_or(CBORError::HitEnd)?;
    let mut arg = 0u64;
    for b in bytes {
        arg = (arg << 8) | (*b as u64);
    }
    Ok((end, arg))
}

/// Read one head starting at `offset`. Returns the offset of the byte after the head. Bounds
/// are checked against `buf`, so callers narrow the slice to enforce a buffer end.
pub(crate) fn read_head(buf: &[u8], offset: usize) -> Result<(usize, Head)> {
    let initial = *buf.get(offset).ok_or(CBORError::HitEnd)?;
    let major = initial >> 5;
    let ai = initial & AI_MASK;
    let (next, arg) = match ai {
        0..=PAYLOAD_AI_BITS => (offset + 1, ai as u64),
        PAYLOAD_ONE_BYTE => read_arg(buf, offset + 1, 1)?,
        PAYLOAD_TWO_BYTES => read_arg(buf, offset + 1, 2)?,
        PAYLOAD_FOUR_BYTES => read_arg(buf, offset + 1, 4)?,
        PAYLOAD_EIGHT_BYTES => read_arg(buf, offset + 1, 8)?,
        PAYLOAD_INDEFINITE => (offset + 1, 0),
        _ => return Err(CBORError::Unsupported),
    };
    Ok((next, Head { major, ai, arg }))
}

/// Return the offset just past the complete encoded item starting at `offset`, including the
/// contents of arrays, maps and tags. Used by the deterministic-encoding checks, which compare
/// encoded map labels without disturbing the traversal state.
pub(crate) fn encoded_item_span(buf: &[u8], offset: usize, depth: usize) -> Result<usize> {
    if depth > MAX_NESTING {
        return Err(CBORError::ArrayDecodeNestingTooDeep);
    }
    let (mut off, head) = read_head(buf, offset)?;
    match head.major {
        0 | 1 => {
            if head.ai == PAYLOAD_INDEFINITE {
                return Err(CBORError::BadInt);
            }
            Ok(off)
        }
        2 | 3 => {
            if head.ai == PAYLOAD_INDEFINITE {
                loop {
                    if *buf.get(off).ok_or(CBORError::HitEnd)? == BREAK_BYTE {
                        return Ok(off + 1);
                    }
                    let (chunk_off, chunk) = read_head(buf, off)?;
                    if chunk.major != head.major || chunk.ai == PAYLOAD_INDEFINITE {
                        return Err(CBORError::IndefiniteStringChunk);
                    }
                    off = string_end(buf, chunk_off, chunk.arg)?;
                }
            }
            string_end(buf, off, head.arg)
        }
        4 | 5 => {
            if head.ai == PAYLOAD_INDEFINITE {
                loop {
                    if *buf.get(off).ok_or(CBORError::HitEnd)? == BREAK_BYTE {
                        return Ok(off + 1);
                    }
                    off = encoded_item_span(buf, off, depth + 1)?;
                }
            }
            let items = if head.major == 5 {
                head.arg.checked_mul(2).ok_or(CBORError::ArrayDecodeTooLong)?
            } else {
                head.arg
            };
            for _ in 0..items {
                off = encoded_item_span(buf, off, depth + 1)?;
            }
            Ok(off)
        }
        6 => {
            if head.ai == PAYLOAD_INDEFINITE {
                return Err(CBORError::BadInt);
            }
            encoded_item_span(buf, off, depth + 1)
        }
        _ => {
            if head.ai == PAYLOAD_INDEFINITE {
                // A bare break is not an item
                return Err(CBORError::BadBreak);
            }
            Ok(off)
        }
    }
}

fn string_end(buf: &[u8], start: usize, len: u64) -> Result<usize> {
    if len > (usize::MAX - 4) as u64 {
        return Err(CBORError::StringTooLong);
    }
    let end = start.checked_add(len as usize).ok_or(CBORError::HitEnd)?;
    if end > buf.len() {
        return Err(CBORError::HitEnd);
    }
    Ok(end)
}

/***************************************************************************************************
 * Decode modes
 **************************************************************************************************/

/// Conformance profile selected when the decoder is constructed.
///
/// The first three accept any well-formed CBOR and differ in how map labels are surfaced.
/// `Preferred`, `CDE` and `DCBor` each add a stricter set of checks on the encoded form and
/// reject input that a conforming encoder would not produce.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DecodeMode {
    /// Any well-formed CBOR.
    Normal,
    /// Any well-formed CBOR, but map labels must be text strings.
    MapStringsOnly,
    /// Maps are surfaced as arrays with doubled counts; labels become ordinary items.
    MapAsArray,
    /// Require shortest-form arguments and no indefinite lengths.
    Preferred,
    /// Preferred, plus sorted and unique map labels.
    CDE,
    /// CDE, plus numeric canonicalization and the restricted simple-value set.
    DCBor,
}

impl DecodeMode {
    #[inline]
    pub(crate) fn preferred(&self) -> bool {
        matches!(self, DecodeMode::Preferred | DecodeMode::CDE | DecodeMode::DCBor)
    }

    #[inline]
    pub(crate) fn cde(&self) -> bool {
        matches!(self, DecodeMode::CDE | DecodeMode::DCBor)
    }

    #[inline]
    pub(crate) fn dcbor(&self) -> bool {
        matches!(self, DecodeMode::DCBor)
    }

    #[inline]
    pub(crate) fn map_strings_only(&self) -> bool {
        matches!(self, DecodeMode::MapStringsOnly)
    }

    #[inline]
    pub(crate) fn map_as_array(&self) -> bool {
        matches!(self, DecodeMode::MapAsArray)
    }
}

/***************************************************************************************************
 * The decoder
 **************************************************************************************************/

/// A CBOR decoder over a borrowed input buffer.
///
/// `'buf` is the lifetime of the input (and of string-allocator memory, which must live at
/// least as long). `'alloc` is the borrow of the allocator object and tag-decoder table.
///
/// The decoder is a self-contained state machine: a cursor into the input, a fixed-size
/// nesting stack, a small tag-number mapping table and a sticky error slot. It may be moved
/// between threads but not shared; run one decoder per input.
pub struct CBORDecoder<'buf, 'alloc> {
    pub(crate) input: &'buf [u8],
    pub(crate) cursor: usize,
    /// End of the visible input. Entering byte-string wrapped CBOR narrows this; exiting
    /// restores it.
    pub(crate) buf_end: usize,
    pub(crate) nesting: NestingStack,
    pub(crate) mode: DecodeMode,
    pub(crate) error: Option<CBORError>,
    /// Tag numbers above [`LAST_UNMAPPED_TAG`], mapped to small slot values.
    pub(crate) tag_map: [u64; NUM_MAPPED_TAGS],
    pub(crate) tag_decoders: Option<&'alloc [TagDecoderEntry]>,
    pub(crate) allocator: Option<&'alloc mut dyn StringAllocator<'buf>>,
    pub(crate) copy_all_strings: bool,
    /// A string is being coalesced; suspends the copy-all-strings behaviour for its chunks.
    pub(crate) assembling: bool,
    /// Cached (start, end) offsets of the current bounded map or array, filled by the first
    /// search so later exits are O(1).
    pub(crate) map_end_cache: Option<(u32, u32)>,
    pub(crate) tag_check_disabled: bool,
    pub(crate) last_tags: TagSlots,
    /// Offset of the item whose tag numbers are being consumed one at a time, and how many
    /// have been consumed.
    pub(crate) tag_number_check_offset: usize,
    pub(crate) tag_number_index: u8,
    /// Offset just past the most recently decoded map label.
    pub(crate) label_end_offset: usize,
}

impl<'buf, 'alloc> CBORDecoder<'buf, 'alloc> {
    /// Construct a decoder over `input` in the given conformance mode.
    #[cfg_attr(feature = "trace", trace)]
    pub fn new(input: &'buf [u8], mode: DecodeMode) -> CBORDecoder<'buf, 'alloc> {
        let mut decoder = CBORDecoder {
            input,
            cursor: 0,
            buf_end: input.len(),
            nesting: NestingStack::new(),
            mode,
            error: None,
            tag_map: [TAG_INVALID; NUM_MAPPED_TAGS],
            tag_decoders: None,
            allocator: None,
            copy_all_strings: false,
            assembling: false,
            map_end_cache: None,
            tag_check_disabled: false,
            last_tags: TagSlots::empty(),
            tag_number_check_offset: usize::MAX,
            tag_number_index: 0,
            label_end_offset: 0,
        };
        if input.len() > MAX_INPUT_SIZE {
            decoder.error = Some(CBORError::InputTooLarge);
        }
        decoder
    }

    /// Configure the string allocator used to coalesce indefinite-length strings. With
    /// `copy_all` set every decoded string is copied into allocator memory, so the input
    /// buffer need not outlive the decoded items.
    pub fn set_string_allocator(
        &mut self,
        allocator: &'alloc mut dyn StringAllocator<'buf>,
        copy_all: bool,
    ) {
        self.allocator = Some(allocator);
        self.copy_all_strings = copy_all;
    }

    /// The active conformance mode.
    #[inline]
    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// The current cursor offset into the input buffer.
    #[inline]
    pub fn tell(&self) -> usize {
        self.cursor
    }

    /// The stored sticky error, if any.
    #[inline]
    pub fn error(&self) -> Option<CBORError> {
        self.error
    }

    /// Retrieve and clear the sticky error. Clearing an unrecoverable error is not useful:
    /// further decoding will fail again.
    #[inline]
    pub fn get_and_reset_error(&mut self) -> Option<CBORError> {
        self.error.take()
    }

    /// Store `error` as the sticky error.
    #[inline]
    pub fn set_error(&mut self, error: CBORError) {
        self.error = Some(error);
    }

    #[inline]
    pub(crate) fn guard(&self) -> Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[inline]
    pub(crate) fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.error = Some(*e);
        }
        result
    }

    /***********************************************************************************************
     * Head and atomic item decode
     **********************************************************************************************/

    fn decode_head(&mut self) -> Result<Head> {
        let visible = &self.input[..self.buf_end];
        let (next, head) = read_head(visible, self.cursor)?;
        if self.mode.preferred() {
            if head.major != 7 && head.ai >= PAYLOAD_ONE_BYTE && head.ai <= PAYLOAD_EIGHT_BYTES {
                let minimal = match head.ai {
                    PAYLOAD_ONE_BYTE => head.arg >= PAYLOAD_ONE_BYTE as u64,
                    PAYLOAD_TWO_BYTES => head.arg > u8::MAX as u64,
                    PAYLOAD_FOUR_BYTES => head.arg > u16::MAX as u64,
                    _ => head.arg > u32::MAX as u64,
                };
                if !minimal {
                    return Err(CBORError::PreferredConformance);
                }
            }
            if head.ai == PAYLOAD_INDEFINITE && (2..=5).contains(&head.major) {
                return Err(CBORError::PreferredConformance);
            }
        }
        self.cursor = next;
        Ok(head)
    }

    /// Decode one atomic item: a head plus, for strings, the payload bytes. Arrays, maps and
    /// tag numbers come back as their head only; the layers above handle their contents.
    fn next_atomic(&mut self) -> Result<CBORItem<'buf>> {
        let head = self.decode_head()?;
        let value = match head.major {
            0 => {
                if head.ai == PAYLOAD_INDEFINITE {
                    return Err(CBORError::BadInt);
                }
                if head.arg > i64::MAX as u64 {
                    Value::UInt64(head.arg)
                } else {
                    Value::Int64(head.arg as i64)
                }
            }
            1 => {
                if head.ai == PAYLOAD_INDEFINITE {
                    return Err(CBORError::BadInt);
                }
                if head.arg > i64::MAX as u64 {
                    Value::NegInt65(head.arg)
                } else {
                    Value::Int64(-(head.arg as i64) - 1)
                }
            }
            2 => self.decode_string(head, StringKind::Byte)?,
            3 => self.decode_string(head, StringKind::Text)?,
            4 => {
                if head.ai == PAYLOAD_INDEFINITE {
                    self.indefinite_aggregate(false)?
                } else {
                    if head.arg > MAX_ITEMS_IN_ARRAY {
                        return Err(CBORError::ArrayDecodeTooLong);
                    }
                    Value::Array(head.arg as u16)
                }
            }
            5 => {
                if head.ai == PAYLOAD_INDEFINITE {
                    self.indefinite_aggregate(true)?
                } else {
                    if head.arg > MAX_ITEMS_IN_MAP {
                        return Err(CBORError::ArrayDecodeTooLong);
                    }
                    if self.mode.map_as_array() {
                        Value::MapAsArray((head.arg * 2) as u16)
                    } else {
                        Value::Map(head.arg as u16)
                    }
                }
            }
            6 => {
                if head.ai == PAYLOAD_INDEFINITE {
                    return Err(CBORError::BadInt);
                }
                self.tag_number_value(head.arg)?
            }
            _ => self.decode_type7(head)?,
        };
        Ok(CBORItem::of(value))
    }

    fn indefinite_aggregate(&self, is_map: bool) -> Result<Value<'buf>> {
        #[cfg(not(feature = "indefinite-arrays"))]
        {
            let _ = is_map;
            Err(CBORError::IndefLenArraysDisabled)
        }
        #[cfg(feature = "indefinite-arrays")]
        {
            Ok(if is_map {
                if self.mode.map_as_array() {
                    Value::MapAsArray(COUNT_INDEFINITE)
                } else {
                    Value::Map(COUNT_INDEFINITE)
                }
            } else {
                Value::Array(COUNT_INDEFINITE)
            })
        }
    }

    fn tag_number_value(&self, number: u64) -> Result<Value<'buf>> {
        #[cfg(not(feature = "tags"))]
        {
            let _ = number;
            Err(CBORError::TagsDisabled)
        }
        #[cfg(feature = "tags")]
        {
            Ok(Value::TagNumber(number))
        }
    }

    fn indefinite_string_value(&self, kind: StringKind) -> Result<Value<'buf>> {
        #[cfg(not(feature = "indefinite-strings"))]
        {
            let _ = kind;
            Err(CBORError::IndefLenStringsDisabled)
        }
        #[cfg(feature = "indefinite-strings")]
        {
            Ok(Value::IndefiniteStringHead(kind))
        }
    }

    fn decode_string(&mut self, head: Head, kind: StringKind) -> Result<Value<'buf>> {
        if head.ai == PAYLOAD_INDEFINITE {
            return self.indefinite_string_value(kind);
        }
        if head.arg > (usize::MAX - 4) as u64 {
            return Err(CBORError::StringTooLong);
        }
        let len = head.arg as usize;
        let end = self.cursor.checked_add(len).ok_or(CBORError::StringTooLong)?;
        if end > self.buf_end {
            return Err(CBORError::HitEnd);
        }
        let mut slice: &'buf [u8] = &self.input[self.cursor..end];
        self.cursor = end;
        let mut allocated = false;
        if self.copy_all_strings && !self.assembling {
            if let Some(alloc) = self.allocator.as_mut() {
                alloc.allocate(slice)?;
                slice = alloc.complete()?;
                allocated = true;
            }
        }
        Ok(match kind {
            StringKind::Byte => {
                if allocated {
                    Value::ByteString(crate::item::Bytes::Allocated(slice))
                } else {
                    Value::ByteString(crate::item::Bytes::Borrowed(slice))
                }
            }
            StringKind::Text => {
                let text = from_utf8(slice).map_err(|_| CBORError::BadUtf8)?;
                if allocated {
                    Value::TextString(Text::Allocated(text))
                } else {
                    Value::TextString(Text::Borrowed(text))
                }
            }
        })
    }

    fn decode_type7(&mut self, head: Head) -> Result<Value<'buf>> {
        match head.ai {
            0..=19 => {
                if self.mode.dcbor() {
                    return Err(CBORError::DCBorConformance);
                }
                Ok(Value::Simple(head.ai))
            }
            20 => Ok(Value::False),
            21 => Ok(Value::True),
            22 => Ok(Value::Null),
            23 => {
                if self.mode.dcbor() {
                    return Err(CBORError::DCBorConformance);
                }
                Ok(Value::Undefined)
            }
            PAYLOAD_ONE_BYTE => {
                if head.arg < 32 {
                    return Err(CBORError::BadType7);
                }
                if self.mode.dcbor() {
                    return Err(CBORError::DCBorConformance);
                }
                Ok(Value::Simple(head.arg as u8))
            }
            PAYLOAD_TWO_BYTES => self.decode_half(head),
            PAYLOAD_FOUR_BYTES => self.decode_single(head),
            PAYLOAD_EIGHT_BYTES => self.decode_double(head),
            PAYLOAD_INDEFINITE => Ok(Value::Break),
            _ => Err(CBORError::Unsupported),
        }
    }

    #[cfg(all(feature = "float", feature = "half-float"))]
    fn decode_half(&mut self, head: Head) -> Result<Value<'buf>> {
        let h = f16::from_bits(head.arg as u16);
        if self.mode.dcbor() {
            if h.is_nan() && h.to_bits() != 0x7e00 {
                return Err(CBORError::DCBorConformance);
            }
            if !h.is_nan() && is_integer_valued(h.to_f64()) {
                return Err(CBORError::DCBorConformance);
            }
        }
        Ok(Value::Double(h.to_f64()))
    }

    #[cfg(all(feature = "float", not(feature = "half-float")))]
    fn decode_half(&mut self, _head: Head) -> Result<Value<'buf>> {
        Err(CBORError::HalfPrecisionDisabled)
    }

    #[cfg(not(feature = "float"))]
    fn decode_half(&mut self, _head: Head) -> Result<Value<'buf>> {
        Err(self.float_disabled_error())
    }

    #[cfg(feature = "float")]
    fn decode_single(&mut self, head: Head) -> Result<Value<'buf>> {
        let f = f32::from_bits(head.arg as u32);
        if self.mode.dcbor() {
            if f.is_nan() {
                return Err(CBORError::DCBorConformance);
            }
            if is_integer_valued(f as f64) {
                return Err(CBORError::DCBorConformance);
            }
            #[cfg(feature = "half-float")]
            {
                if f16::from_f32(f).to_f32().to_bits() == f.to_bits() {
                    return Err(CBORError::DCBorConformance);
                }
            }
            #[cfg(not(feature = "half-float"))]
            {
                // Whether a shorter half-precision form exists cannot be decided here
                return Err(CBORError::CantCheckFloatConformance);
            }
        }
        Ok(Value::Float(f))
    }

    #[cfg(not(feature = "float"))]
    fn decode_single(&mut self, _head: Head) -> Result<Value<'buf>> {
        Err(self.float_disabled_error())
    }

    #[cfg(feature = "float")]
    fn decode_double(&mut self, head: Head) -> Result<Value<'buf>> {
        let d = f64::from_bits(head.arg);
        if self.mode.dcbor() {
            if d.is_nan() {
                return Err(CBORError::DCBorConformance);
            }
            if is_integer_valued(d) {
                return Err(CBORError::DCBorConformance);
            }
            if ((d as f32) as f64).to_bits() == d.to_bits() {
                return Err(CBORError::DCBorConformance);
            }
        }
        Ok(Value::Double(d))
    }

    #[cfg(not(feature = "float"))]
    fn decode_double(&mut self, _head: Head) -> Result<Value<'buf>> {
        Err(self.float_disabled_error())
    }

    #[cfg(not(feature = "float"))]
    fn float_disabled_error(&self) -> CBORError {
        if self.mode.dcbor() {
            CBORError::CantCheckFloatConformance
        } else {
            CBORError::AllFloatDisabled
        }
    }

    /***********************************************************************************************
     * Indefinite-length string assembly
     **********************************************************************************************/

    /// Decode the next item, coalescing indefinite-length strings into a single allocated
    /// string. Misplaced breaks are caught here: breaks closing indefinite arrays and maps
    /// are consumed during ascent and never decoded as items.
    pub(crate) fn next_full_item(&mut self) -> Result<CBORItem<'buf>> {
        let item = self.next_atomic()?;
        let kind = match item.value {
            Value::IndefiniteStringHead(k) => k,
            Value::Break => return Err(CBORError::BadBreak),
            _ => return Ok(item),
        };
        if self.allocator.is_none() {
            return Err(CBORError::NoStringAllocator);
        }
        self.assembling = true;
        let result = self.assemble_string(kind);
        self.assembling = false;
        result
    }

    fn assemble_string(&mut self, kind: StringKind) -> Result<CBORItem<'buf>> {
        if let Some(alloc) = self.allocator.as_mut() {
            alloc.allocate(&[])?;
        }
        loop {
            let chunk = match self.next_atomic() {
                Ok(c) => c,
                Err(e) => {
                    self.abandon_string();
                    return Err(e);
                }
            };
            let bytes: &[u8] = match chunk.value {
                Value::Break => break,
                Value::ByteString(b) if kind == StringKind::Byte => b.as_slice(),
                Value::TextString(t) if kind == StringKind::Text => t.as_str().as_bytes(),
                _ => {
                    self.abandon_string();
                    return Err(CBORError::IndefiniteStringChunk);
                }
            };
            if let Some(alloc) = self.allocator.as_mut() {
                if let Err(e) = alloc.reallocate(bytes) {
                    alloc.free();
                    return Err(e);
                }
            }
        }
        let coalesced = match self.allocator.as_mut() {
            Some(alloc) => alloc.complete()?,
            None => return Err(CBORError::NoStringAllocator),
        };
        let value = match kind {
            StringKind::Byte => Value::ByteString(crate::item::Bytes::Allocated(coalesced)),
            StringKind::Text => {
                let text = from_utf8(coalesced).map_err(|_| CBORError::BadUtf8)?;
                Value::TextString(Text::Allocated(text))
            }
        };
        Ok(CBORItem::of(value))
    }

    fn abandon_string(&mut self) {
        if let Some(alloc) = self.allocator.as_mut() {
            alloc.free();
        }
    }

    /***********************************************************************************************
     * Nesting traversal
     **********************************************************************************************/

    /// Check that the cursor can produce another item at the current traversal position.
    pub(crate) fn check_traversal_position(&self) -> Result<()> {
        match self.nesting.current_frame() {
            Frame::WrappedString { .. } => {
                if self.cursor >= self.buf_end {
                    return Err(CBORError::NoMoreItems);
                }
            }
            Frame::Aggregate { remaining, .. } => {
                if remaining == 0 || remaining == COUNT_EMPTY_BOUNDED {
                    return Err(CBORError::NoMoreItems);
                }
            }
        }
        Ok(())
    }

    /// Decode the next item and maintain the nesting stack: descend into non-empty arrays and
    /// maps, close definite levels whose counts reach zero, and consume the breaks closing
    /// indefinite levels. `break_out` reports whether a break was consumed during ascent.
    pub(crate) fn next_nested(
        &mut self,
        search_mode: bool,
        break_out: Option<&mut bool>,
    ) -> Result<CBORItem<'buf>> {
        self.check_traversal_position()?;
        let mut item = self.next_map_entry(search_mode)?;
        item.nest_level = self.nesting.current_level();
        match item.value.aggregate_count() {
            Some(0) => {
                item.next_nest_level = self.ascender(break_out, false);
            }
            Some(COUNT_INDEFINITE) => {
                self.nesting
                    .descend(aggregate_kind(&item.value), COUNT_INDEFINITE)?;
                item.next_nest_level = self.ascender(break_out, false);
            }
            Some(count) => {
                self.nesting.descend(aggregate_kind(&item.value), count)?;
                if self.mode.cde() && matches!(item.value, Value::Map(_)) {
                    self.check_map_order(self.cursor, count)?;
                }
                item.next_nest_level = self.nesting.current_level();
            }
            None => {
                item.next_nest_level = self.ascender(break_out, false);
            }
        }
        Ok(item)
    }

    /// Close as many levels as the just-consumed item completed. Stops at bounded levels,
    /// zeroing their counts instead of ascending, unless `ascend_past_bounded` is set by the
    /// explicit exit operations. Returns the level the next item will be reported at.
    pub(crate) fn ascender(
        &mut self,
        mut break_out: Option<&mut bool>,
        ascend_past_bounded: bool,
    ) -> u8 {
        loop {
            if self.nesting.is_at_top() {
                break;
            }
            match self.nesting.current_frame() {
                Frame::Aggregate { remaining, .. }
                    if remaining != COUNT_INDEFINITE && remaining != COUNT_EMPTY_BOUNDED =>
                {
                    self.nesting.decrement();
                    if self.nesting.current_remaining() != Some(0) {
                        break;
                    }
                }
                Frame::Aggregate { .. } => {
                    if self.cursor >= self.buf_end {
                        break;
                    }
                    if self.input[self.cursor] != BREAK_BYTE {
                        break;
                    }
                    self.cursor += 1;
                    if let Some(b) = break_out.as_mut() {
                        **b = true;
                    }
                }
                Frame::WrappedString { .. } => break,
            }
            // The innermost array or map is complete
            if !ascend_past_bounded && self.nesting.is_current_bounded() {
                self.nesting.zero_remaining();
                break;
            }
            self.nesting.ascend();
        }
        self.nesting.current_level()
    }

    /// Verify the deterministic-encoding rules for the definite-length map whose first entry
    /// starts at `start`: encoded labels must be unique and in ascending lexicographic byte
    /// order.
    fn check_map_order(&self, start: usize, pairs: u16) -> Result<()> {
        let buf = &self.input[..self.buf_end];
        let mut off = start;
        let mut prev: Option<(usize, usize)> = None;
        for i in 0..pairs {
            let label_start = off;
            let label_end = encoded_item_span(buf, label_start, 0)?;
            off = encoded_item_span(buf, label_end, 0)?;
            if let Some((ps, pe)) = prev {
                if buf[ps..pe] == buf[label_start..label_end] {
                    return Err(CBORError::DuplicateLabel);
                }
                if buf[ps..pe] > buf[label_start..label_end] {
                    return Err(CBORError::Unsorted);
                }
            }
            let mut scan = off;
            for _ in (i + 1)..pairs {
                let scan_end = encoded_item_span(buf, scan, 0)?;
                if buf[scan..scan_end] == buf[label_start..label_end] {
                    return Err(CBORError::DuplicateLabel);
                }
                scan = encoded_item_span(buf, scan_end, 0)?;
            }
            prev = Some((label_start, label_end));
        }
        Ok(())
    }

    /***********************************************************************************************
     * Public traversal API
     **********************************************************************************************/

    pub(crate) fn get_next_internal(&mut self, break_out: Option<&mut bool>) -> Result<CBORItem<'buf>> {
        let start = self.cursor;
        let mut item = self.next_nested(false, break_out)?;
        self.dispatch_tag_content(&mut item)?;
        if !self.tag_check_disabled && !item.tags.is_empty() {
            let acknowledged = start == self.tag_number_check_offset
                && self.tag_number_index as usize >= item.tags.count();
            if !acknowledged {
                return Err(CBORError::UnprocessedTagNumber);
            }
        }
        self.last_tags = item.tags;
        Ok(item)
    }

    /// Decode the next item in pre-order. This works even when a sticky error is set; use
    /// [`CBORDecoder::vget_next`] for the short-circuiting variant.
    #[cfg_attr(feature = "trace", trace)]
    pub fn get_next(&mut self) -> Result<CBORItem<'buf>> {
        self.get_next_internal(None)
    }

    /// Decode the next item without consuming it. Also works in an error state.
    #[cfg_attr(feature = "trace", trace)]
    pub fn peek_next(&mut self) -> Result<CBORItem<'buf>> {
        let saved_cursor = self.cursor;
        let saved_nesting = self.nesting;
        let mut result = self.next_nested(false, None);
        if let Ok(item) = result.as_mut() {
            if let Err(e) = self.dispatch_tag_content(item) {
                result = Err(e);
            }
        }
        self.cursor = saved_cursor;
        self.nesting = saved_nesting;
        result
    }

    /// Decode the next item into `item`. When a sticky error is set, or this call fails,
    /// `item` is overwritten with an empty item and the error is stored.
    #[cfg_attr(feature = "trace", trace)]
    pub fn vget_next(&mut self, item: &mut CBORItem<'buf>) {
        *item = CBORItem::none();
        if self.error.is_some() {
            return;
        }
        match self.get_next_internal(None) {
            Ok(decoded) => *item = decoded,
            Err(e) => self.error = Some(e),
        }
    }

    /// Peek the next item into `item` with the sticky-error discipline of
    /// [`CBORDecoder::vget_next`].
    pub fn vpeek_next(&mut self, item: &mut CBORItem<'buf>) {
        *item = CBORItem::none();
        if self.error.is_some() {
            return;
        }
        match self.peek_next() {
            Ok(decoded) => *item = decoded,
            Err(e) => self.error = Some(e),
        }
    }

    /// Decode the next item and consume its contents: for an array or map, everything down to
    /// its close is traversed and discarded.
    pub fn vget_next_consume(&mut self, item: &mut CBORItem<'buf>) {
        self.vget_next(item);
        if self.error.is_none() {
            let consumed = *item;
            if let Err(e) = self.consume_item(&consumed) {
                self.error = Some(e);
            }
        }
    }

    /// Traverse past the contents of `item` if it opened an array or map.
    pub(crate) fn consume_item(&mut self, item: &CBORItem<'buf>) -> Result<()> {
        if item.value.is_aggregate() && item.next_nest_level > item.nest_level {
            loop {
                let inner = self.next_nested(false, None)?;
                if inner.next_nest_level <= item.nest_level {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Seek back to the start of the innermost bounded level, or of the whole input when no
    /// bounded level is active. The only operation that moves the cursor backwards.
    #[cfg_attr(feature = "trace", trace)]
    pub fn rewind(&mut self) {
        self.map_end_cache = None;
        if self.nesting.in_bounded_level() {
            let bounded = self.nesting.bounded_level() as usize;
            match self.nesting.bounded_frame() {
                Frame::Aggregate { start_offset, .. } => {
                    self.cursor = start_offset as usize;
                    self.nesting.set_current(bounded);
                    self.nesting.reset_remaining();
                }
                Frame::WrappedString { start_offset, .. } => {
                    self.cursor = start_offset as usize;
                    self.nesting.set_current(bounded);
                }
            }
        } else {
            self.nesting.reset();
            self.cursor = 0;
            self.buf_end = self.input.len();
        }
    }

    /***********************************************************************************************
     * End of decoding
     **********************************************************************************************/

    /// Check that decoding consumed the whole input cleanly, reporting the number of bytes
    /// consumed. Unlike [`CBORDecoder::finish`] the string allocator stays alive, so decoding
    /// of a CBOR sequence can continue after an [`CBORError::ExtraBytes`] result.
    pub fn partial_finish(&mut self) -> Result<usize> {
        self.guard()?;
        if !self.nesting.is_at_top() {
            return Err(CBORError::ArrayOrMapUnconsumed);
        }
        if self.cursor < self.buf_end {
            return Err(CBORError::ExtraBytes);
        }
        Ok(self.cursor)
    }

    /// Finish decoding: report the sticky error or a consistency failure, and release the
    /// string allocator. The allocator is destructed even on error.
    #[cfg_attr(feature = "trace", trace)]
    pub fn finish(&mut self) -> Result<()> {
        let result = self.partial_finish().map(|_| ());
        if let Some(alloc) = self.allocator.take() {
            alloc.destruct();
        }
        result
    }

    /***********************************************************************************************
     * Simple typed getters
     **********************************************************************************************/

    /// Decode the next item, requiring a boolean.
    pub fn get_bool(&mut self) -> Result<bool> {
        self.typed_next(|v| match v {
            Value::True => Some(true),
            Value::False => Some(false),
            _ => None,
        })
    }

    /// Decode the next item, requiring null.
    pub fn get_null(&mut self) -> Result<()> {
        self.typed_next(|v| match v {
            Value::Null => Some(()),
            _ => None,
        })
    }

    /// Decode the next item, requiring undefined.
    pub fn get_undefined(&mut self) -> Result<()> {
        self.typed_next(|v| match v {
            Value::Undefined => Some(()),
            _ => None,
        })
    }

    /// Decode the next item, requiring an integer that fits an `i64`.
    pub fn get_int64(&mut self) -> Result<i64> {
        self.typed_next(|v| match v {
            Value::Int64(i) => Some(*i),
            _ => None,
        })
    }

    /// Decode the next item, requiring a non-negative integer.
    pub fn get_uint64(&mut self) -> Result<u64> {
        self.typed_next(|v| match v {
            Value::UInt64(u) => Some(*u),
            Value::Int64(i) if *i >= 0 => Some(*i as u64),
            _ => None,
        })
    }

    /// Decode the next item, requiring a single or double precision float.
    pub fn get_double(&mut self) -> Result<f64> {
        self.typed_next(|v| match v {
            Value::Double(d) => Some(*d),
            Value::Float(f) => Some(*f as f64),
            _ => None,
        })
    }

    /// Decode the next item, requiring a byte string.
    pub fn get_bytes(&mut self) -> Result<crate::item::Bytes<'buf>> {
        self.typed_next(|v| match v {
            Value::ByteString(b) => Some(*b),
            _ => None,
        })
    }

    /// Decode the next item, requiring a text string.
    pub fn get_text(&mut self) -> Result<Text<'buf>> {
        self.typed_next(|v| match v {
            Value::TextString(t) => Some(*t),
            _ => None,
        })
    }

    fn typed_next<T>(&mut self, select: impl Fn(&Value<'buf>) -> Option<T>) -> Result<T> {
        self.guard()?;
        let result = self
            .get_next_internal(None)
            .and_then(|item| select(&item.value).ok_or(CBORError::UnexpectedType));
        self.record(result)
    }
}

pub(crate) fn aggregate_kind(value: &Value) -> AggregateKind {
    match value {
        Value::Map(_) => AggregateKind::Map,
        Value::MapAsArray(_) => AggregateKind::MapAsArray,
        _ => AggregateKind::Array,
    }
}

/// Return `true` if `v` is a whole number representable as a 64-bit integer, which the dCBOR
/// profile requires to be encoded as an integer.
#[cfg(feature = "float")]
pub(crate) fn is_integer_valued(v: f64) -> bool {
    if !v.is_finite() {
        return false;
    }
    if v >= i64::MIN as f64 && v < 9_223_372_036_854_775_808.0 {
        (v as i64) as f64 == v
    } else if v >= 9_223_372_036_854_775_808.0 && v < 18_446_744_073_709_551_616.0 {
        (v as u64) as f64 == v
    } else {
        false
    }
}
