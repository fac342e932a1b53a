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
 * tps_streamcbor CBOR Error API
 *
 * A streaming, cursor-based, deserializer and serializer for CBOR (RFC8949). This implementation
 * is designed for use in constrained systems and requires neither the Rust standard library nor
 * an allocator.
 **************************************************************************************************/
use std::result;

#[cfg(any(feature = "full", test))]
use thiserror::Error;

/// An alias for Result<T, CBORError> used throughout this crate.
pub type Result<T> = result::Result<T, CBORError>;

/// `CBORError` covers every failure the decoder and encoder can report.
///
/// Variants are declared in classification order: the not-well-formed group first, then the
/// remaining unrecoverable groups (invalid CBOR, implementation limits, configuration,
/// resources), then the recoverable group. The classification of each variant is stable and
/// testable via [`CBORError::is_unrecoverable`] and friends. Once an unrecoverable error has
/// been reported the input must be assumed malformed and no further decoding attempted; a
/// recoverable error leaves the decoder at a well-defined cursor position.
#[cfg_attr(any(feature = "full", test), derive(Copy, Clone, Error, Debug, PartialEq))]
#[cfg_attr(all(not(feature = "full"), not(test)), derive(Copy, Clone, Debug, PartialEq))]
pub enum CBORError {
    // ---- Not well formed (unrecoverable) ----
    /// The input ended inside a head or string payload.
    #[cfg_attr(any(feature = "full", test), error("Input ended in the middle of a data item"))]
    HitEnd,
    /// A head used one of the reserved additional-information values 28..30.
    #[cfg_attr(any(feature = "full", test), error("Reserved additional information value"))]
    Unsupported,
    /// A simple value that must be encoded in one byte used the two-byte form.
    #[cfg_attr(any(feature = "full", test), error("Simple value not encoded in its required form"))]
    BadType7,
    /// A break byte appeared outside an indefinite-length string, array or map.
    #[cfg_attr(any(feature = "full", test), error("Misplaced break"))]
    BadBreak,
    /// The indefinite-length form was used where it is not defined (integers and tag numbers).
    #[cfg_attr(any(feature = "full", test), error("Indefinite-length form on an integer or tag number"))]
    BadInt,
    /// A chunk of an indefinite-length string was not a definite string of the same major type.
    #[cfg_attr(any(feature = "full", test), error("Invalid chunk in an indefinite-length string"))]
    IndefiniteStringChunk,
    /// A text string contains an invalid UTF-8 sequence.
    #[cfg_attr(any(feature = "full", test), error("A text string contains an invalid UTF8 sequence"))]
    BadUtf8,

    // ---- Invalid CBOR (unrecoverable) ----
    /// No further items are available at the current traversal level.
    #[cfg_attr(any(feature = "full", test), error("No more items at the current level"))]
    NoMoreItems,
    /// A decimal fraction or bigfloat did not contain exactly an exponent and a mantissa.
    #[cfg_attr(any(feature = "full", test), error("Malformed exponent and mantissa"))]
    BadExpAndMantissa,
    /// A registered tag-content decoder found content of the wrong shape under its tag number.
    #[cfg_attr(any(feature = "full", test), error("Invalid content under a tag number"))]
    UnrecoverableTagContent,

    // ---- Implementation limits (unrecoverable) ----
    /// An integer value cannot be represented in the decoded item.
    #[cfg_attr(any(feature = "full", test), error("Integer overflow"))]
    IntOverflow,
    /// A definite-length array or map declared more entries than supported.
    #[cfg_attr(any(feature = "full", test), error("Array or map too long to decode"))]
    ArrayDecodeTooLong,
    /// An epoch date is outside the representable range.
    #[cfg_attr(any(feature = "full", test), error("Date overflow"))]
    DateOverflow,
    /// Arrays, maps and wrapped byte strings are nested deeper than the traversal stack.
    #[cfg_attr(any(feature = "full", test), error("Nesting deeper than supported"))]
    ArrayDecodeNestingTooDeep,
    /// A string is too long to be represented.
    #[cfg_attr(any(feature = "full", test), error("String too long"))]
    StringTooLong,
    /// More tag numbers on one item, or more large tag numbers per decoder, than supported.
    #[cfg_attr(any(feature = "full", test), error("Too many tag numbers"))]
    TooManyTags,
    /// The input buffer is larger than the maximum decodable size.
    #[cfg_attr(any(feature = "full", test), error("Input too large"))]
    InputTooLarge,

    // ---- Configuration (unrecoverable) ----
    /// An indefinite-length string was encountered with no string allocator configured.
    #[cfg_attr(any(feature = "full", test), error("No string allocator configured"))]
    NoStringAllocator,
    /// A map label has a type not permitted by the active decode mode.
    #[cfg_attr(any(feature = "full", test), error("Map label type not allowed"))]
    MapLabelType,
    /// Half-precision floats are disabled in this build.
    #[cfg_attr(any(feature = "full", test), error("Half-precision float support disabled"))]
    HalfPrecisionDisabled,
    /// Indefinite-length arrays and maps are disabled in this build.
    #[cfg_attr(any(feature = "full", test), error("Indefinite-length array support disabled"))]
    IndefLenArraysDisabled,
    /// Indefinite-length strings are disabled in this build.
    #[cfg_attr(any(feature = "full", test), error("Indefinite-length string support disabled"))]
    IndefLenStringsDisabled,
    /// Floating point support is disabled in this build.
    #[cfg_attr(any(feature = "full", test), error("Floating point support disabled"))]
    AllFloatDisabled,
    /// Tag number decoding is disabled in this build.
    #[cfg_attr(any(feature = "full", test), error("Tag number support disabled"))]
    TagsDisabled,
    /// Hardware floating point use is disabled; the conversion cannot be performed.
    #[cfg_attr(any(feature = "full", test), error("Hardware float use disabled"))]
    HwFloatDisabled,
    /// Float conformance was requested but floats cannot be decoded in this build.
    #[cfg_attr(any(feature = "full", test), error("Cannot check float conformance in this build"))]
    CantCheckFloatConformance,

    // ---- Resources (unrecoverable) ----
    /// The string allocator could not satisfy a request.
    #[cfg_attr(any(feature = "full", test), error("String allocation failed"))]
    StringAllocate,

    // ---- Recoverable ----
    /// A searched-for map label is not present.
    #[cfg_attr(any(feature = "full", test), error("Label not found in map"))]
    LabelNotFound,
    /// A map contains the same label more than once.
    #[cfg_attr(any(feature = "full", test), error("Duplicate map label"))]
    DuplicateLabel,
    /// The decoded item does not have the expected type.
    #[cfg_attr(any(feature = "full", test), error("Unexpected item type"))]
    UnexpectedType,
    /// A numeric conversion would overflow or underflow the target type.
    #[cfg_attr(any(feature = "full", test), error("Overflow or underflow in number conversion"))]
    ConversionUnderOverFlow,
    /// A negative number cannot be converted to an unsigned target, or vice versa.
    #[cfg_attr(any(feature = "full", test), error("Number sign conversion not possible"))]
    NumberSignConversion,
    /// A floating point value is NaN or infinite where a finite value is required.
    #[cfg_attr(any(feature = "full", test), error("Floating point exception"))]
    FloatException,
    /// An exit operation does not match the kind of level that was entered.
    #[cfg_attr(any(feature = "full", test), error("Exit does not match the entered level"))]
    ExitMismatch,
    /// An item carries tag numbers that were neither consumed nor content-decoded.
    #[cfg_attr(any(feature = "full", test), error("Unprocessed tag number on item"))]
    UnprocessedTagNumber,
    /// The input violates preferred serialization.
    #[cfg_attr(any(feature = "full", test), error("Preferred serialization violated"))]
    PreferredConformance,
    /// The input violates the dCBOR application profile.
    #[cfg_attr(any(feature = "full", test), error("dCBOR conformance violated"))]
    DCBorConformance,
    /// Map labels are not in the deterministic encoding order.
    #[cfg_attr(any(feature = "full", test), error("Map labels not sorted"))]
    Unsorted,
    /// Decoding finished with arrays or maps still open.
    #[cfg_attr(any(feature = "full", test), error("Array or map not fully consumed"))]
    ArrayOrMapUnconsumed,
    /// Bytes remain after the last decoded item. Expected when decoding CBOR sequences.
    #[cfg_attr(any(feature = "full", test), error("Extra bytes after the last item"))]
    ExtraBytes,
    /// The output buffer is too small for the encoded result.
    #[cfg_attr(any(feature = "full", test), error("Buffer too small"))]
    BufferTooSmall,
    /// Byte-string wrapped CBOR cannot be entered when the string lives in allocator memory.
    #[cfg_attr(any(feature = "full", test), error("Cannot enter an allocated string"))]
    CannotEnterAllocatedString,
}

impl CBORError {
    /// Return `true` for errors meaning the input is not well-formed CBOR.
    pub fn is_not_well_formed(&self) -> bool {
        matches!(
            self,
            CBORError::HitEnd
                | CBORError::Unsupported
                | CBORError::BadType7
                | CBORError::BadBreak
                | CBORError::BadInt
                | CBORError::IndefiniteStringChunk
                | CBORError::BadUtf8
        )
    }

    /// Return `true` for errors the caller may clear with
    /// [`crate::decoder::CBORDecoder::get_and_reset_error`] and continue decoding after.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CBORError::LabelNotFound
                | CBORError::DuplicateLabel
                | CBORError::UnexpectedType
                | CBORError::ConversionUnderOverFlow
                | CBORError::NumberSignConversion
                | CBORError::FloatException
                | CBORError::ExitMismatch
                | CBORError::UnprocessedTagNumber
                | CBORError::PreferredConformance
                | CBORError::DCBorConformance
                | CBORError::Unsorted
                | CBORError::ArrayOrMapUnconsumed
                | CBORError::ExtraBytes
                | CBORError::BufferTooSmall
                | CBORError::CannotEnterAllocatedString
        )
    }

    /// Return `true` for errors after which further decoding is undefined.
    #[inline]
    pub fn is_unrecoverable(&self) -> bool {
        !self.is_recoverable()
    }
}
