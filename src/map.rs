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
 * CBOR Map access and bounded traversal
 *
 * Map label pairing, the map search subsystem and the bounded enter/exit operations for maps,
 * arrays and byte-string wrapped CBOR. A search shares the traversal cursor with the linear
 * decoding API: it snapshots cursor and nesting, rewinds to the start of the bounded map, runs
 * the lower decoder layers over every entry and restores the snapshot, so the caller observes
 * an unchanged position.
 **************************************************************************************************/
use crate::constants::*;
use crate::decode::CBORDecoder;
use crate::error::{CBORError, Result};
use crate::item::{Bytes, CBORItem, Label, Text, Value, ValueKind};
use crate::nesting::{AggregateKind, Frame, OFFSET_INVALID};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// One query of a bulk map search: the label to find, the type the value must have
/// ([`ValueKind::Any`] to accept anything), and the found item. Labels not present in the map
/// leave `item` holding [`Value::None`].
#[derive(Debug, Copy, Clone)]
pub struct MapQuery<'buf> {
    pub label: Label<'buf>,
    pub expected: ValueKind,
    pub item: CBORItem<'buf>,
}

impl<'buf> MapQuery<'buf> {
    pub fn new(label: Label<'buf>, expected: ValueKind) -> Self {
        MapQuery {
            label,
            expected,
            item: CBORItem::none(),
        }
    }
}

/// Constraint on the tag number of a byte string entered as wrapped CBOR.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TagRequirement {
    /// The string must carry tag 24 or tag 63.
    Tag,
    /// The string must carry neither tag.
    NotTag,
    /// Either form is accepted.
    OptionalTag,
}

/// Result of one map search traversal.
#[derive(Debug, Copy, Clone)]
pub(crate) struct SearchInfo {
    /// Offset of the first matched entry, [`OFFSET_INVALID`] when nothing matched.
    pub found_offset: u32,
    /// Number of entries before the first matched one.
    pub found_ordinal: u16,
    /// Total entries traversed.
    pub item_count: u16,
    /// Offset just past the end of the bounded container.
    pub end_offset: u32,
}

/// Label equality for searches: decoded-value comparison for integers, content comparison for
/// strings.
fn label_eq(a: &Label<'_>, b: &Label<'_>) -> bool {
    match (a, b) {
        (Label::Int(x), Label::Int(y)) => x == y,
        (Label::UInt(x), Label::UInt(y)) => x == y,
        (Label::ByteString(x), Label::ByteString(y)) => x.as_slice() == y.as_slice(),
        (Label::TextString(x), Label::TextString(y)) => x.as_str() == y.as_str(),
        _ => false,
    }
}

impl<'buf, 'alloc> CBORDecoder<'buf, 'alloc> {
    /***********************************************************************************************
     * Map entry pairing
     **********************************************************************************************/

    /// When the innermost level is a map, pair a label item with its value item; the value's
    /// payload and tag numbers are returned with the label attached. During a search any
    /// non-aggregate label shape must be traversed past, so the label type policy is relaxed
    /// to `Label::None` for shapes outside the integer and string set.
    pub(crate) fn next_map_entry(&mut self, search_mode: bool) -> Result<CBORItem<'buf>> {
        if !self.nesting.in_map() {
            return self.next_with_tags();
        }
        let label_item = self.next_with_tags()?;
        self.label_end_offset = self.cursor;
        let label = match label_item.value {
            Value::Int64(v) => {
                if self.mode.map_strings_only() {
                    return Err(CBORError::MapLabelType);
                }
                Label::Int(v)
            }
            Value::UInt64(v) => {
                if self.mode.map_strings_only() {
                    return Err(CBORError::MapLabelType);
                }
                Label::UInt(v)
            }
            Value::TextString(t) => Label::TextString(t),
            Value::ByteString(b) => {
                if self.mode.map_strings_only() {
                    return Err(CBORError::MapLabelType);
                }
                Label::ByteString(b)
            }
            Value::Array(_) | Value::Map(_) | Value::MapAsArray(_) => {
                return Err(CBORError::MapLabelType)
            }
            _ if search_mode => Label::None,
            _ => return Err(CBORError::MapLabelType),
        };
        let mut value_item = self.next_with_tags()?;
        value_item.label = label;
        Ok(value_item)
    }

    /***********************************************************************************************
     * Map search
     **********************************************************************************************/

    /// Traverse every entry of the current bounded map, calling `matcher` on each decoded
    /// entry and `unmatched` on the entries the matcher declined. The cursor and nesting are
    /// restored afterwards; the end offset of the container is cached for O(1) exits.
    fn map_search_raw(
        &mut self,
        matcher: &mut dyn FnMut(&CBORItem<'buf>) -> Result<bool>,
        mut unmatched: Option<&mut dyn FnMut(&CBORItem<'buf>) -> Result<()>>,
        allow_any_aggregate: bool,
    ) -> Result<SearchInfo> {
        if !self.nesting.in_bounded_level() {
            return Err(CBORError::UnexpectedType);
        }
        let (kind, start_offset) = match self.nesting.bounded_frame() {
            Frame::Aggregate {
                kind, start_offset, ..
            } => (kind, start_offset),
            Frame::WrappedString { .. } => return Err(CBORError::UnexpectedType),
        };
        if kind != AggregateKind::Map && !allow_any_aggregate {
            return Err(CBORError::UnexpectedType);
        }
        let mut info = SearchInfo {
            found_offset: OFFSET_INVALID,
            found_ordinal: 0,
            item_count: 0,
            end_offset: start_offset,
        };
        if self.nesting.bounded_is_empty() {
            self.map_end_cache = Some((start_offset, start_offset));
            return Ok(info);
        }
        let saved_cursor = self.cursor;
        let saved_nesting = self.nesting;
        self.cursor = start_offset as usize;
        let bounded = self.nesting.bounded_level() as usize;
        self.nesting.set_current(bounded);
        self.nesting.reset_remaining();
        let mut outcome: Result<()> = Ok(());
        loop {
            let entry_offset = self.cursor;
            let mut item = match self.next_nested(true, None) {
                Ok(i) => i,
                Err(CBORError::NoMoreItems) => break,
                Err(e) if e.is_recoverable() => {
                    if self.cursor == entry_offset {
                        // The entry could not be consumed, so skipping cannot make progress
                        outcome = Err(e);
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            };
            if let Err(e) = self.dispatch_tag_content(&mut item) {
                if e.is_recoverable() {
                    continue;
                }
                outcome = Err(e);
                break;
            }
            info.item_count = info.item_count.saturating_add(1);
            match matcher(&item) {
                Ok(true) => {
                    if info.found_offset == OFFSET_INVALID {
                        info.found_offset = entry_offset as u32;
                        info.found_ordinal = info.item_count - 1;
                    }
                }
                Ok(false) => {
                    if let Some(cb) = unmatched.as_mut() {
                        if let Err(e) = cb(&item) {
                            outcome = Err(e);
                            break;
                        }
                    }
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
            if let Err(e) = self.consume_item(&item) {
                outcome = Err(e);
                break;
            }
        }
        if outcome.is_ok() {
            info.end_offset = self.cursor as u32;
            self.map_end_cache = Some((start_offset, self.cursor as u32));
        }
        self.cursor = saved_cursor;
        self.nesting = saved_nesting;
        outcome.map(|_| info)
    }

    /// Search for a single label, requiring `expected` to match the value type.
    pub(crate) fn search_one(
        &mut self,
        label: &Label<'_>,
        expected: ValueKind,
    ) -> Result<(CBORItem<'buf>, SearchInfo)> {
        let mut found: Option<CBORItem<'buf>> = None;
        let mut matcher = |item: &CBORItem<'buf>| -> Result<bool> {
            if label_eq(label, &item.label) {
                if found.is_some() {
                    return Err(CBORError::DuplicateLabel);
                }
                if !expected.matches(&item.value) {
                    return Err(CBORError::UnexpectedType);
                }
                found = Some(*item);
                Ok(true)
            } else {
                Ok(false)
            }
        };
        let info = self.map_search_raw(&mut matcher, None, false)?;
        match found {
            Some(item) => Ok((item, info)),
            None => Err(CBORError::LabelNotFound),
        }
    }

    /// Fetch a set of labelled values from the current bounded map in one traversal. Queries
    /// whose labels are absent come back with [`Value::None`]; a label matching twice is a
    /// [`CBORError::DuplicateLabel`], a value of the wrong type a
    /// [`CBORError::UnexpectedType`]. The traversal cursor is unchanged.
    #[cfg_attr(feature = "trace", trace)]
    pub fn get_items_in_map<'q>(&mut self, queries: &mut [MapQuery<'q>]) -> Result<()>
    where
        'buf: 'q,
    {
        self.guard()?;
        for q in queries.iter_mut() {
            q.item = CBORItem::none();
        }
        let mut matcher = |item: &CBORItem<'buf>| -> Result<bool> {
            for q in queries.iter_mut() {
                if label_eq(&q.label, &item.label) {
                    if !matches!(q.item.value, Value::None) {
                        return Err(CBORError::DuplicateLabel);
                    }
                    if !q.expected.matches(&item.value) {
                        return Err(CBORError::UnexpectedType);
                    }
                    q.item = *item;
                    return Ok(true);
                }
            }
            Ok(false)
        };
        let result = self.map_search_raw(&mut matcher, None, false).map(|_| ());
        self.record(result)
    }

    /// As [`CBORDecoder::get_items_in_map`], additionally calling `unmatched` for every entry
    /// no query matched. An error from the callback aborts the search.
    pub fn get_items_in_map_with_callback<'q>(
        &mut self,
        queries: &mut [MapQuery<'q>],
        unmatched: &mut dyn FnMut(&CBORItem<'buf>) -> Result<()>,
    ) -> Result<()>
    where
        'buf: 'q,
    {
        self.guard()?;
        for q in queries.iter_mut() {
            q.item = CBORItem::none();
        }
        let mut matcher = |item: &CBORItem<'buf>| -> Result<bool> {
            for q in queries.iter_mut() {
                if label_eq(&q.label, &item.label) {
                    if !matches!(q.item.value, Value::None) {
                        return Err(CBORError::DuplicateLabel);
                    }
                    if !q.expected.matches(&item.value) {
                        return Err(CBORError::UnexpectedType);
                    }
                    q.item = *item;
                    return Ok(true);
                }
            }
            Ok(false)
        };
        let result = self
            .map_search_raw(&mut matcher, Some(unmatched), false)
            .map(|_| ());
        self.record(result)
    }

    /// End offset of the current bounded map or array, from the cache or a no-op search.
    fn bounded_end_offset(&mut self) -> Result<u32> {
        let start = match self.nesting.bounded_frame() {
            Frame::Aggregate { start_offset, .. } => start_offset,
            _ => return Err(CBORError::ExitMismatch),
        };
        if let Some((s, e)) = self.map_end_cache {
            if s == start {
                return Ok(e);
            }
        }
        let mut matcher = |_item: &CBORItem<'buf>| -> Result<bool> { Ok(false) };
        let info = self.map_search_raw(&mut matcher, None, true)?;
        Ok(info.end_offset)
    }

    /***********************************************************************************************
     * Bounded enter and exit
     **********************************************************************************************/

    fn enter_aggregate(&mut self, kind: AggregateKind) -> Result<()> {
        let item = self.get_next_internal(None)?;
        let kind_ok = match kind {
            AggregateKind::Map => matches!(item.value, Value::Map(_)),
            _ => matches!(item.value, Value::Array(_) | Value::MapAsArray(_)),
        };
        if !kind_ok {
            return Err(CBORError::UnexpectedType);
        }
        if item.next_nest_level <= item.nest_level {
            // Empty container, already closed: open a synthetic level so exit is symmetric
            self.nesting
                .descend(crate::decode::aggregate_kind(&item.value), COUNT_EMPTY_BOUNDED)?;
        }
        self.nesting.mark_bounded(self.cursor as u32);
        self.map_end_cache = None;
        Ok(())
    }

    fn exit_aggregate(&mut self, kind: AggregateKind) -> Result<()> {
        if !self.nesting.in_bounded_level() {
            return Err(CBORError::ExitMismatch);
        }
        let kind_ok = match (kind, self.nesting.bounded_frame()) {
            (
                AggregateKind::Map,
                Frame::Aggregate {
                    kind: AggregateKind::Map,
                    ..
                },
            ) => true,
            (
                AggregateKind::Array,
                Frame::Aggregate {
                    kind: AggregateKind::Array,
                    ..
                },
            ) => true,
            (
                AggregateKind::Array,
                Frame::Aggregate {
                    kind: AggregateKind::MapAsArray,
                    ..
                },
            ) => true,
            _ => false,
        };
        if !kind_ok {
            return Err(CBORError::ExitMismatch);
        }
        let end = self.bounded_end_offset()?;
        let was_empty = self.nesting.bounded_is_empty();
        self.cursor = end as usize;
        let bounded = self.nesting.bounded_level() as usize;
        self.nesting.set_current(bounded - 1);
        if !was_empty {
            // The container counts as one item of its parent
            let _ = self.ascender(None, false);
        }
        self.nesting.restore_bounded();
        self.map_end_cache = None;
        Ok(())
    }

    /// Consume the next item, requiring a map, and make it the current bounded level. Further
    /// traversal stays inside it until [`CBORDecoder::exit_map`].
    #[cfg_attr(feature = "trace", trace)]
    pub fn enter_map(&mut self) -> Result<()> {
        self.guard()?;
        let result = self.enter_aggregate(AggregateKind::Map);
        self.record(result)
    }

    /// Consume the next item, requiring an array, and make it the current bounded level.
    #[cfg_attr(feature = "trace", trace)]
    pub fn enter_array(&mut self) -> Result<()> {
        self.guard()?;
        let result = self.enter_aggregate(AggregateKind::Array);
        self.record(result)
    }

    /// Leave the map entered by the matching [`CBORDecoder::enter_map`], positioning the
    /// cursor immediately after the whole map regardless of how much of it was traversed.
    #[cfg_attr(feature = "trace", trace)]
    pub fn exit_map(&mut self) -> Result<()> {
        self.guard()?;
        let result = self.exit_aggregate(AggregateKind::Map);
        self.record(result)
    }

    /// Leave the array entered by the matching [`CBORDecoder::enter_array`].
    #[cfg_attr(feature = "trace", trace)]
    pub fn exit_array(&mut self) -> Result<()> {
        self.guard()?;
        let result = self.exit_aggregate(AggregateKind::Array);
        self.record(result)
    }

    fn enter_wrapped(&mut self, requirement: TagRequirement) -> Result<()> {
        self.check_traversal_position()?;
        let mut item = self.next_map_entry(false)?;
        item.nest_level = self.nesting.current_level();
        self.dispatch_tag_content(&mut item)?;
        let (bytes, typed_as_wrapped) = match item.value {
            Value::ByteString(b) => (b, false),
            Value::WrappedCBOR(b) | Value::WrappedCBORSequence(b) => (b, true),
            _ => return Err(CBORError::UnexpectedType),
        };
        let raw_tag = item.tags.slot(0).map(|s| self.resolve_slot(s));
        let has_tag =
            typed_as_wrapped || matches!(raw_tag, Some(TAG_CBOR) | Some(TAG_CBOR_SEQUENCE));
        match requirement {
            TagRequirement::Tag if !has_tag => return Err(CBORError::UnexpectedType),
            TagRequirement::NotTag if has_tag => return Err(CBORError::UnexpectedType),
            _ => (),
        }
        if bytes.is_allocated() {
            return Err(CBORError::CannotEnterAllocatedString);
        }
        let len = bytes.len();
        let start = self.cursor - len;
        self.nesting
            .descend_wrapped(self.buf_end as u32, start as u32)?;
        self.buf_end = start + len;
        self.cursor = start;
        self.map_end_cache = None;
        Ok(())
    }

    fn exit_wrapped(&mut self) -> Result<()> {
        if !self.nesting.in_bounded_level() {
            return Err(CBORError::ExitMismatch);
        }
        let saved_end = match self.nesting.bounded_frame() {
            Frame::WrappedString { saved_end, .. } => saved_end,
            _ => return Err(CBORError::ExitMismatch),
        };
        let end_of_wrapped = self.buf_end;
        self.buf_end = saved_end as usize;
        self.cursor = end_of_wrapped;
        let bounded = self.nesting.bounded_level() as usize;
        self.nesting.set_current(bounded - 1);
        let _ = self.ascender(None, false);
        self.nesting.restore_bounded();
        self.map_end_cache = None;
        Ok(())
    }

    /// Consume the next item, requiring a byte string holding encoded CBOR, and decode inside
    /// it in place: the visible buffer is narrowed to the string and the cursor moved to its
    /// start. No bytes are copied. `requirement` constrains the tag numbers 24 and 63.
    #[cfg_attr(feature = "trace", trace)]
    pub fn enter_bstr_wrapped(&mut self, requirement: TagRequirement) -> Result<()> {
        self.guard()?;
        let result = self.enter_wrapped(requirement);
        self.record(result)
    }

    /// Leave byte-string wrapped CBOR, restoring the outer visible buffer and positioning the
    /// cursor after the wrapping string.
    #[cfg_attr(feature = "trace", trace)]
    pub fn exit_bstr_wrapped(&mut self) -> Result<()> {
        self.guard()?;
        let result = self.exit_wrapped();
        self.record(result)
    }

    /***********************************************************************************************
     * Positioning by label
     **********************************************************************************************/

    fn seek(&mut self, label: Label<'_>) -> Result<()> {
        let (_, info) = self.search_one(&label, ValueKind::Any)?;
        self.cursor = info.found_offset as usize;
        let bounded = self.nesting.bounded_level() as usize;
        self.nesting.set_current(bounded);
        self.nesting.reset_remaining();
        for _ in 0..info.found_ordinal {
            self.nesting.decrement();
        }
        Ok(())
    }

    /// Position the traversal cursor on the entry of the current bounded map whose label is
    /// the integer `label`; the next [`CBORDecoder::get_next`] returns that entry.
    pub fn seek_to_label_n(&mut self, label: i64) -> Result<()> {
        self.guard()?;
        let result = self.seek(Label::Int(label));
        self.record(result)
    }

    /// Position the traversal cursor on the entry whose label is the text string `label`.
    pub fn seek_to_label_sz(&mut self, label: &str) -> Result<()> {
        self.guard()?;
        let result = self.seek(Label::TextString(Text::Borrowed(label)));
        self.record(result)
    }

    fn enter_from_map(&mut self, label: Label<'_>, kind: AggregateKind) -> Result<()> {
        let expected = match kind {
            AggregateKind::Map => ValueKind::Map,
            _ => ValueKind::Array,
        };
        let (_, info) = self.search_one(&label, expected)?;
        self.cursor = info.found_offset as usize;
        let bounded = self.nesting.bounded_level() as usize;
        self.nesting.set_current(bounded);
        self.nesting.reset_remaining();
        for _ in 0..info.found_ordinal {
            self.nesting.decrement();
        }
        self.enter_aggregate(kind)
    }

    /// Enter the map that is the value of the integer-labelled entry of the current bounded
    /// map.
    #[cfg_attr(feature = "trace", trace)]
    pub fn enter_map_in_map_n(&mut self, label: i64) -> Result<()> {
        self.guard()?;
        let result = self.enter_from_map(Label::Int(label), AggregateKind::Map);
        self.record(result)
    }

    /// Enter the map that is the value of the text-labelled entry of the current bounded map.
    pub fn enter_map_in_map_sz(&mut self, label: &str) -> Result<()> {
        self.guard()?;
        let result =
            self.enter_from_map(Label::TextString(Text::Borrowed(label)), AggregateKind::Map);
        self.record(result)
    }

    /// Enter the array that is the value of the integer-labelled entry of the current bounded
    /// map.
    pub fn enter_array_in_map_n(&mut self, label: i64) -> Result<()> {
        self.guard()?;
        let result = self.enter_from_map(Label::Int(label), AggregateKind::Array);
        self.record(result)
    }

    /// Enter the array that is the value of the text-labelled entry of the current bounded
    /// map.
    pub fn enter_array_in_map_sz(&mut self, label: &str) -> Result<()> {
        self.guard()?;
        let result = self.enter_from_map(
            Label::TextString(Text::Borrowed(label)),
            AggregateKind::Array,
        );
        self.record(result)
    }

    /***********************************************************************************************
     * Whole-container getters
     **********************************************************************************************/

    fn get_whole_aggregate(&mut self, want_map: bool) -> Result<(CBORItem<'buf>, &'buf [u8])> {
        let mut start = self.cursor;
        let mut head_break = false;
        let item = self.get_next_internal(Some(&mut head_break))?;
        let kind_ok = if want_map {
            matches!(item.value, Value::Map(_))
        } else {
            matches!(item.value, Value::Array(_) | Value::MapAsArray(_))
        };
        if !kind_ok {
            return Err(CBORError::UnexpectedType);
        }
        if !item.label.is_none() {
            start = self.label_end_offset;
        }
        if item.next_nest_level > item.nest_level {
            // Bound the container so consumption cannot ascend past it, then walk to its end
            let prev_bounded = self.nesting.bounded_level() as usize;
            self.nesting.mark_bounded(self.cursor as u32);
            let mut last_break = false;
            loop {
                let mut consumed_break = false;
                match self.next_nested(false, Some(&mut consumed_break)) {
                    Ok(_) => last_break = consumed_break,
                    Err(CBORError::NoMoreItems) => break,
                    Err(e) => {
                        self.nesting.set_bounded(prev_bounded);
                        return Err(e);
                    }
                }
            }
            let end = self.cursor - if last_break { 1 } else { 0 };
            self.nesting.set_current(item.nest_level as usize);
            let _ = self.ascender(None, false);
            self.nesting.set_bounded(prev_bounded);
            Ok((item, &self.input[start..end]))
        } else {
            let end = self.cursor - if head_break { 1 } else { 0 };
            Ok((item, &self.input[start..end]))
        }
    }

    /// Consume a whole array, returning its head item and the encoded bytes of the array.
    /// For an indefinite-length array the trailing break is excluded from the byte range.
    #[cfg_attr(feature = "trace", trace)]
    pub fn get_array(&mut self) -> Result<(CBORItem<'buf>, &'buf [u8])> {
        self.guard()?;
        let result = self.get_whole_aggregate(false);
        self.record(result)
    }

    /// Consume a whole map, returning its head item and the encoded bytes of the map.
    #[cfg_attr(feature = "trace", trace)]
    pub fn get_map(&mut self) -> Result<(CBORItem<'buf>, &'buf [u8])> {
        self.guard()?;
        let result = self.get_whole_aggregate(true);
        self.record(result)
    }

    /***********************************************************************************************
     * Typed getters by label
     **********************************************************************************************/

    fn typed_in_map<T>(
        &mut self,
        label: Label<'_>,
        select: impl Fn(&Value<'buf>) -> Option<T>,
    ) -> Result<T> {
        self.guard()?;
        let result = self
            .search_one(&label, ValueKind::Any)
            .and_then(|(item, _)| select(&item.value).ok_or(CBORError::UnexpectedType));
        self.record(result)
    }

    /// Fetch the boolean value of the integer-labelled map entry. The cursor is unchanged.
    pub fn get_bool_in_map_n(&mut self, label: i64) -> Result<bool> {
        self.typed_in_map(Label::Int(label), select_bool)
    }

    /// Fetch the boolean value of the text-labelled map entry.
    pub fn get_bool_in_map_sz(&mut self, label: &str) -> Result<bool> {
        self.typed_in_map(Label::TextString(Text::Borrowed(label)), select_bool)
    }

    /// Verify that the integer-labelled map entry holds null.
    pub fn get_null_in_map_n(&mut self, label: i64) -> Result<()> {
        self.typed_in_map(Label::Int(label), select_null)
    }

    /// Verify that the text-labelled map entry holds null.
    pub fn get_null_in_map_sz(&mut self, label: &str) -> Result<()> {
        self.typed_in_map(Label::TextString(Text::Borrowed(label)), select_null)
    }

    /// Fetch the integer value of the integer-labelled map entry.
    pub fn get_int64_in_map_n(&mut self, label: i64) -> Result<i64> {
        self.typed_in_map(Label::Int(label), select_int64)
    }

    /// Fetch the integer value of the text-labelled map entry.
    pub fn get_int64_in_map_sz(&mut self, label: &str) -> Result<i64> {
        self.typed_in_map(Label::TextString(Text::Borrowed(label)), select_int64)
    }

    /// Fetch the unsigned integer value of the integer-labelled map entry.
    pub fn get_uint64_in_map_n(&mut self, label: i64) -> Result<u64> {
        self.typed_in_map(Label::Int(label), select_uint64)
    }

    /// Fetch the unsigned integer value of the text-labelled map entry.
    pub fn get_uint64_in_map_sz(&mut self, label: &str) -> Result<u64> {
        self.typed_in_map(Label::TextString(Text::Borrowed(label)), select_uint64)
    }

    /// Fetch the float value of the integer-labelled map entry.
    pub fn get_double_in_map_n(&mut self, label: i64) -> Result<f64> {
        self.typed_in_map(Label::Int(label), select_double)
    }

    /// Fetch the float value of the text-labelled map entry.
    pub fn get_double_in_map_sz(&mut self, label: &str) -> Result<f64> {
        self.typed_in_map(Label::TextString(Text::Borrowed(label)), select_double)
    }

    /// Fetch the byte string value of the integer-labelled map entry.
    pub fn get_bytes_in_map_n(&mut self, label: i64) -> Result<Bytes<'buf>> {
        self.typed_in_map(Label::Int(label), select_bytes)
    }

    /// Fetch the byte string value of the text-labelled map entry.
    pub fn get_bytes_in_map_sz(&mut self, label: &str) -> Result<Bytes<'buf>> {
        self.typed_in_map(Label::TextString(Text::Borrowed(label)), select_bytes)
    }

    /// Fetch the text string value of the integer-labelled map entry.
    pub fn get_text_in_map_n(&mut self, label: i64) -> Result<Text<'buf>> {
        self.typed_in_map(Label::Int(label), select_text)
    }

    /// Fetch the text string value of the text-labelled map entry.
    pub fn get_text_in_map_sz(&mut self, label: &str) -> Result<Text<'buf>> {
        self.typed_in_map(Label::TextString(Text::Borrowed(label)), select_text)
    }
}

fn select_bool(v: &Value<'_>) -> Option<bool> {
    match v {
        Value::True => Some(true),
        Value::False => Some(false),
        _ => None,
    }
}

fn select_null(v: &Value<'_>) -> Option<()> {
    match v {
        Value::Null => Some(()),
        _ => None,
    }
}

fn select_int64(v: &Value<'_>) -> Option<i64> {
    match v {
        Value::Int64(i) => Some(*i),
        _ => None,
    }
}

fn select_uint64(v: &Value<'_>) -> Option<u64> {
    match v {
        Value::UInt64(u) => Some(*u),
        Value::Int64(i) if *i >= 0 => Some(*i as u64),
        _ => None,
    }
}

fn select_double(v: &Value<'_>) -> Option<f64> {
    match v {
        Value::Double(d) => Some(*d),
        Value::Float(f) => Some(*f as f64),
        _ => None,
    }
}

fn select_bytes<'buf>(v: &Value<'buf>) -> Option<Bytes<'buf>> {
    match v {
        Value::ByteString(b) => Some(*b),
        _ => None,
    }
}

fn select_text<'buf>(v: &Value<'buf>) -> Option<Text<'buf>> {
    match v {
        Value::TextString(t) => Some(*t),
        _ => None,
    }
}
