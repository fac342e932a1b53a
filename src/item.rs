/***************************************************************************************************
 * Copyright (c) 2020-2023 Qualcomm Innovation Center, Inc. All rights reserved.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of this software
 * and associated documentation files (the “Software”), to deal in the Software without
 * restriction, including without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all copies or
 * substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
 * BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
 * DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 **************************************************************************************************/
/***************************************************************************************************
 * CBOR Decoded Item model
 *
 * A streaming, cursor-based, deserializer and serializer for CBOR (RFC8949). This implementation
 * is designed for use in constrained systems and requires neither the Rust standard library nor
 * an allocator.
 **************************************************************************************************/
use crate::constants::{COUNT_INDEFINITE, MAX_TAGS_PER_ITEM, TAG_SLOT_INVALID};
use crate::error::CBORError;

use std::convert::TryFrom;

#[cfg(feature = "full")]
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// A byte string decoded from CBOR input.
///
/// `Borrowed` strings are slices of the input buffer and are valid as long as it is.
/// `Allocated` strings live in string-allocator memory; they arise from coalesced
/// indefinite-length strings and from the copy-all-strings decoding option, and remain valid
/// until the allocator is destructed. Equality compares content only, so a coalesced string
/// compares equal to the same bytes borrowed from an input buffer.
#[derive(Debug, Copy, Clone)]
pub enum Bytes<'buf> {
    Borrowed(&'buf [u8]),
    Allocated(&'buf [u8]),
}

impl<'buf> Bytes<'buf> {
    /// View the string content.
    #[inline]
    pub fn as_slice(&self) -> &'buf [u8] {
        match self {
            Bytes::Borrowed(b) | Bytes::Allocated(b) => b,
        }
    }

    /// Length of the string in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Return `true` if the string is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Return `true` if the string lives in string-allocator memory.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        matches!(self, Bytes::Allocated(_))
    }
}

impl<'buf> PartialEq for Bytes<'buf> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

/// A text string decoded from CBOR input. UTF-8 validity is checked at decode time.
///
/// The borrowed/allocated distinction is as for [`Bytes`].
#[derive(Debug, Copy, Clone)]
pub enum Text<'buf> {
    Borrowed(&'buf str),
    Allocated(&'buf str),
}

impl<'buf> Text<'buf> {
    /// View the string content.
    #[inline]
    pub fn as_str(&self) -> &'buf str {
        match self {
            Text::Borrowed(s) | Text::Allocated(s) => s,
        }
    }

    /// Return `true` if the string lives in string-allocator memory.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        matches!(self, Text::Allocated(_))
    }
}

impl<'buf> PartialEq for Text<'buf> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// The two CBOR string major types. Used while assembling indefinite-length strings.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StringKind {
    Byte,
    Text,
}

/// An epoch date decoded from tag 1 content: whole seconds plus a fractional part when the
/// content was a float. The fractional part carries the sign of the original value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Epoch {
    pub seconds: i64,
    pub fraction: f64,
}

/// The mantissa of a decimal fraction or bigfloat.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Mantissa<'buf> {
    Int(i64),
    UInt(u64),
    PosBignum(Bytes<'buf>),
    NegBignum(Bytes<'buf>),
}

/// Exponent and mantissa decoded from tag 4 or tag 5 content.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ExpMantissa<'buf> {
    pub exponent: i64,
    pub mantissa: Mantissa<'buf>,
}

/// The value of one decoded CBOR item.
///
/// Integer representations follow the smallest-surprise rule: positive values that fit are
/// `Int64`, positive values above `i64::MAX` are `UInt64`, and negative values below
/// `i64::MIN` are `NegInt65` carrying the raw argument `n` of the encoding `-(n+1)`.
///
/// Array and map counts use [`COUNT_INDEFINITE`] for the indefinite-length form. A `Map` count
/// is the number of entries; a `MapAsArray` count is the number of label and value items, twice
/// the entry count.
///
/// `TagNumber` and `Break` are transient types used between decoder layers; they are never
/// returned from the public traversal API.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Value<'buf> {
    /// Empty slot, e.g. a map search query whose label was not found.
    None,
    Int64(i64),
    UInt64(u64),
    /// A negative integer in `[-2^64, -2^63 - 1]`; the payload is `n` where the value is
    /// `-(n+1)`.
    NegInt65(u64),
    ByteString(Bytes<'buf>),
    TextString(Text<'buf>),
    Array(u16),
    Map(u16),
    MapAsArray(u16),
    True,
    False,
    Null,
    Undefined,
    /// A simple value other than false, true, null and undefined.
    Simple(u8),
    Float(f32),
    Double(f64),
    // Registered tag content.
    DateString(Text<'buf>),
    DateEpoch(Epoch),
    EpochDays(i64),
    PosBignum(Bytes<'buf>),
    NegBignum(Bytes<'buf>),
    DecimalFraction(ExpMantissa<'buf>),
    Bigfloat(ExpMantissa<'buf>),
    Uri(Text<'buf>),
    Base64Url(Text<'buf>),
    Base64(Text<'buf>),
    Regex(Text<'buf>),
    MimeText(Text<'buf>),
    MimeBinary(Bytes<'buf>),
    Uuid(Bytes<'buf>),
    WrappedCBOR(Bytes<'buf>),
    WrappedCBORSequence(Bytes<'buf>),
    // Transient types internal to the decoder layers.
    TagNumber(u64),
    Break,
    /// Transient: head of an indefinite-length string. Chunks follow until a break.
    IndefiniteStringHead(StringKind),
}

/// Type discriminators for [`Value`], used to express type expectations in map search queries.
/// `Any` matches every value except `None`; `Bool` matches both `True` and `False`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ValueKind {
    Any,
    None,
    Int64,
    UInt64,
    NegInt65,
    ByteString,
    TextString,
    Array,
    Map,
    MapAsArray,
    Bool,
    Null,
    Undefined,
    Simple,
    Float,
    Double,
    DateString,
    DateEpoch,
    EpochDays,
    PosBignum,
    NegBignum,
    DecimalFraction,
    Bigfloat,
    Uri,
    Base64Url,
    Base64,
    Regex,
    MimeText,
    MimeBinary,
    Uuid,
    WrappedCBOR,
    WrappedCBORSequence,
}

impl<'buf> Value<'buf> {
    /// The discriminator of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Int64(_) => ValueKind::Int64,
            Value::UInt64(_) => ValueKind::UInt64,
            Value::NegInt65(_) => ValueKind::NegInt65,
            Value::ByteString(_) => ValueKind::ByteString,
            Value::TextString(_) => ValueKind::TextString,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
            Value::MapAsArray(_) => ValueKind::MapAsArray,
            Value::True | Value::False => ValueKind::Bool,
            Value::Null => ValueKind::Null,
            Value::Undefined => ValueKind::Undefined,
            Value::Simple(_) => ValueKind::Simple,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::DateString(_) => ValueKind::DateString,
            Value::DateEpoch(_) => ValueKind::DateEpoch,
            Value::EpochDays(_) => ValueKind::EpochDays,
            Value::PosBignum(_) => ValueKind::PosBignum,
            Value::NegBignum(_) => ValueKind::NegBignum,
            Value::DecimalFraction(_) => ValueKind::DecimalFraction,
            Value::Bigfloat(_) => ValueKind::Bigfloat,
            Value::Uri(_) => ValueKind::Uri,
            Value::Base64Url(_) => ValueKind::Base64Url,
            Value::Base64(_) => ValueKind::Base64,
            Value::Regex(_) => ValueKind::Regex,
            Value::MimeText(_) => ValueKind::MimeText,
            Value::MimeBinary(_) => ValueKind::MimeBinary,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::WrappedCBOR(_) => ValueKind::WrappedCBOR,
            Value::WrappedCBORSequence(_) => ValueKind::WrappedCBORSequence,
            // Transient types never surface; map them to None so a stray one matches nothing.
            Value::TagNumber(_) | Value::Break | Value::IndefiniteStringHead(_) => ValueKind::None,
        }
    }

    /// Return `true` if this value is an array, map or map-as-array.
    #[inline]
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Value::Array(_) | Value::Map(_) | Value::MapAsArray(_)
        )
    }

    /// The declared count of an array or map value, if this is one.
    #[inline]
    pub(crate) fn aggregate_count(&self) -> Option<u16> {
        match self {
            Value::Array(c) | Value::Map(c) | Value::MapAsArray(c) => Some(*c),
            _ => None,
        }
    }

    /// Return `true` for an indefinite-length array or map value.
    #[inline]
    pub fn is_indefinite(&self) -> bool {
        self.aggregate_count() == Some(COUNT_INDEFINITE)
    }
}

impl ValueKind {
    /// Return `true` if `value` satisfies this type expectation.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::Any => !matches!(value, Value::None),
            k => *k == value.kind(),
        }
    }
}

/// The label half of a map entry. Aggregate labels are never accepted, so the representable
/// shapes are integers and strings; `None` marks an item that is not a map entry, or a label
/// shape outside this set encountered during a map search.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Label<'buf> {
    None,
    Int(i64),
    UInt(u64),
    ByteString(Bytes<'buf>),
    TextString(Text<'buf>),
}

impl<'buf> Label<'buf> {
    /// Return `true` if there is no label.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Label::None)
    }
}

impl<'buf> From<i64> for Label<'buf> {
    #[inline]
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl<'buf> From<&'buf str> for Label<'buf> {
    #[inline]
    fn from(v: &'buf str) -> Self {
        Label::TextString(Text::Borrowed(v))
    }
}

/// The tag numbers enclosing one item, innermost first, in the compact mapped form.
///
/// Slot values at or below [`crate::constants::LAST_UNMAPPED_TAG`] are tag numbers stored
/// directly; larger slot values index the per-decoder mapping table and must be resolved with
/// [`crate::decoder::CBORDecoder::nth_tag`] before being shown to callers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TagSlots(pub(crate) [u16; MAX_TAGS_PER_ITEM]);

impl TagSlots {
    /// Slots with no tag numbers at all.
    #[inline]
    pub const fn empty() -> Self {
        TagSlots([TAG_SLOT_INVALID; MAX_TAGS_PER_ITEM])
    }

    /// Return `true` if the item carried no tag numbers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0[0] == TAG_SLOT_INVALID
    }

    /// Number of tag numbers present.
    pub fn count(&self) -> usize {
        self.0.iter().take_while(|s| **s != TAG_SLOT_INVALID).count()
    }

    /// The `n`th slot, innermost first.
    #[inline]
    pub(crate) fn slot(&self, n: usize) -> Option<u16> {
        match self.0.get(n) {
            Some(s) if *s != TAG_SLOT_INVALID => Some(*s),
            _ => None,
        }
    }

    /// Remove the slot at `n`, shifting the outer slots down.
    pub(crate) fn remove(&mut self, n: usize) {
        for i in n..MAX_TAGS_PER_ITEM - 1 {
            self.0[i] = self.0[i + 1];
        }
        self.0[MAX_TAGS_PER_ITEM - 1] = TAG_SLOT_INVALID;
    }
}

/// One decoded CBOR item.
///
/// `nest_level` is the number of arrays and maps open around the item; items of a CBOR
/// sequence are at level 0. `next_nest_level` is the level the following item will be
/// reported at; when it is less than `nest_level`, one or more enclosing arrays or maps
/// closed on this item.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CBORItem<'buf> {
    pub value: Value<'buf>,
    pub label: Label<'buf>,
    pub nest_level: u8,
    pub next_nest_level: u8,
    pub tags: TagSlots,
}

impl<'buf> CBORItem<'buf> {
    /// An item with no value, no label and no tag numbers.
    pub const fn none() -> Self {
        CBORItem {
            value: Value::None,
            label: Label::None,
            nest_level: 0,
            next_nest_level: 0,
            tags: TagSlots::empty(),
        }
    }

    pub(crate) fn of(value: Value<'buf>) -> Self {
        CBORItem {
            value,
            label: Label::None,
            nest_level: 0,
            next_nest_level: 0,
            tags: TagSlots::empty(),
        }
    }

    /// Return `true` if at least one enclosing array or map closed on this item.
    #[inline]
    pub fn closes_levels(&self) -> bool {
        self.next_nest_level < self.nest_level
    }

    /// Interpret this item as a date/time.
    ///
    /// Works for tag 0 content (an RFC 3339 date string, validated and parsed here) and tag 1
    /// content (epoch seconds; sub-second precision is dropped).
    #[cfg(feature = "full")]
    pub fn date_time(&self) -> Result<DateTime<FixedOffset>, CBORError> {
        match self.value {
            Value::DateString(s) => {
                DateTime::parse_from_rfc3339(s.as_str()).map_err(|_| CBORError::DateOverflow)
            }
            Value::DateEpoch(e) => match Utc.timestamp_opt(e.seconds, 0) {
                chrono::LocalResult::Single(dt) => Ok(dt.into()),
                _ => Err(CBORError::DateOverflow),
            },
            _ => Err(CBORError::UnexpectedType),
        }
    }
}

/***************************************************************************************************
 * Standard Trait Implementations: Try to convert a decoded item into a value. Always fallible
 **************************************************************************************************/

/// Attempt to convert a decoded item into bool
impl<'buf> TryFrom<CBORItem<'buf>> for bool {
    type Error = CBORError;

    fn try_from(item: CBORItem<'buf>) -> Result<Self, Self::Error> {
        match item.value {
            Value::True => Ok(true),
            Value::False => Ok(false),
            _ => Err(CBORError::UnexpectedType),
        }
    }
}

/// Attempt to convert a decoded item into u64
impl<'buf> TryFrom<CBORItem<'buf>> for u64 {
    type Error = CBORError;

    fn try_from(item: CBORItem<'buf>) -> Result<Self, Self::Error> {
        match item.value {
            Value::UInt64(v) => Ok(v),
            Value::Int64(v) if v >= 0 => Ok(v as u64),
            Value::Int64(_) | Value::NegInt65(_) => Err(CBORError::NumberSignConversion),
            _ => Err(CBORError::UnexpectedType),
        }
    }
}

/// Attempt to convert a decoded item into i64
///
/// This will fail, for positive values, if n > i64::MAX.
impl<'buf> TryFrom<CBORItem<'buf>> for i64 {
    type Error = CBORError;

    fn try_from(item: CBORItem<'buf>) -> Result<Self, Self::Error> {
        match item.value {
            Value::Int64(v) => Ok(v),
            Value::UInt64(_) | Value::NegInt65(_) => Err(CBORError::ConversionUnderOverFlow),
            _ => Err(CBORError::UnexpectedType),
        }
    }
}

/// Attempt to convert a decoded item into i128
///
/// This always succeeds for integer values: every CBOR major type 0 and 1 value, including the
/// 65-bit negative range, fits in 128 bits.
impl<'buf> TryFrom<CBORItem<'buf>> for i128 {
    type Error = CBORError;

    fn try_from(item: CBORItem<'buf>) -> Result<Self, Self::Error> {
        match item.value {
            Value::Int64(v) => Ok(v as i128),
            Value::UInt64(v) => Ok(v as i128),
            Value::NegInt65(n) => Ok(-1 - (n as i128)),
            _ => Err(CBORError::UnexpectedType),
        }
    }
}

/// Attempt to convert a decoded item into a &str
///
/// # Lifetime
///
/// The lifetime of the str is the lifetime of the buffer the item borrows from: the input
/// buffer, or allocator memory for coalesced strings.
impl<'buf> TryFrom<CBORItem<'buf>> for &'buf str {
    type Error = CBORError;

    fn try_from(item: CBORItem<'buf>) -> Result<Self, Self::Error> {
        match item.value {
            Value::TextString(t) => Ok(t.as_str()),
            _ => Err(CBORError::UnexpectedType),
        }
    }
}

/// Attempt to convert a decoded item into a &[u8]
///
/// # Lifetime
///
/// The lifetime of the slice is the lifetime of the buffer the item borrows from: the input
/// buffer, or allocator memory for coalesced strings.
impl<'buf> TryFrom<CBORItem<'buf>> for &'buf [u8] {
    type Error = CBORError;

    fn try_from(item: CBORItem<'buf>) -> Result<Self, Self::Error> {
        match item.value {
            Value::ByteString(b) => Ok(b.as_slice()),
            _ => Err(CBORError::UnexpectedType),
        }
    }
}

/// Attempt to convert a decoded item into f64. Integer values convert with possible precision
/// loss; use the conversion functions on the decoder when that matters.
impl<'buf> TryFrom<CBORItem<'buf>> for f64 {
    type Error = CBORError;

    fn try_from(item: CBORItem<'buf>) -> Result<Self, Self::Error> {
        match item.value {
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(v as f64),
            Value::Int64(v) => Ok(v as f64),
            Value::UInt64(v) => Ok(v as f64),
            _ => Err(CBORError::UnexpectedType),
        }
    }
}
