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
 * tps_streamcbor CBOR constants
 *
 * A streaming, cursor-based, deserializer and serializer for CBOR (RFC8949). This implementation
 * is designed for use in constrained systems and requires neither the Rust standard library nor
 * an allocator.
 **************************************************************************************************/
// Major type bitmask
pub const MT_MASK: u8 = 0b111_00000;
/// Additional Information bitmask
pub const AI_MASK: u8 = 0b000_11111;

/// Major Type 0 (Positive integers)
pub const MT_UINT: u8 = 0b000_00000;
/// Major Type 1 (Negative integers)
pub const MT_NINT: u8 = 0b001_00000;
/// Major Type 2 (Byte Strings)
pub const MT_BSTR: u8 = 0b010_00000;
/// Major Type 3 (Text Strings)
pub const MT_TSTR: u8 = 0b011_00000;
/// Major Type 4 (Array)
pub const MT_ARRAY: u8 = 0b100_00000;
/// Major Type 5 (Map)
pub const MT_MAP: u8 = 0b101_00000;
/// Major Type 6 (Tag)
pub const MT_TAG: u8 = 0b110_00000;
/// Major Type 7 (Floats, simple types etc.)
pub const MT_SIMPLE: u8 = 0b111_00000;

/// Maximum value of a "simple" payload mapped on AI bits
pub const PAYLOAD_AI_BITS: u8 = 23;
/// Indicates one byte of length of value information follows MT/AI byte
pub const PAYLOAD_ONE_BYTE: u8 = 24;
/// Indicates two bytes of length of value information follows MT/AI byte
pub const PAYLOAD_TWO_BYTES: u8 = 25;
/// Indicates four bytes of length of value information follows MT/AI byte
pub const PAYLOAD_FOUR_BYTES: u8 = 26;
/// Indicates eight bytes of length of value information follows MT/AI byte
pub const PAYLOAD_EIGHT_BYTES: u8 = 27;
/// Indicates an indefinite-length item whose end is marked by a break byte
pub const PAYLOAD_INDEFINITE: u8 = 31;
/// The break byte terminating indefinite-length strings, arrays and maps
pub const BREAK_BYTE: u8 = 0xff;

/***************************************************************************************************
 * Implementation limits
 **************************************************************************************************/

/// Maximum depth of nested arrays, maps and byte-string wrapped CBOR. The traversal state for
/// each level is a small fixed-size frame, so this bounds decoder memory.
pub const MAX_NESTING: usize = 15;
/// Maximum number of tag numbers that can precede a single data item.
pub const MAX_TAGS_PER_ITEM: usize = 4;
/// Number of entries in the per-decoder table mapping large tag numbers to item slots.
pub const NUM_MAPPED_TAGS: usize = 4;
/// Tag numbers at or below this value are stored directly in item tag slots. Larger tag numbers
/// go through the per-decoder mapping table.
pub const LAST_UNMAPPED_TAG: u64 = (u16::MAX as u64) - (NUM_MAPPED_TAGS as u64) - 1;
/// Empty tag slot marker.
pub const TAG_SLOT_INVALID: u16 = u16::MAX;
/// Tag number value meaning "no tag". Never a valid tag number in the IANA registry range used
/// here.
pub const TAG_INVALID: u64 = u64::MAX;
/// Tag number wildcard used in content-decoder tables to match any tag number.
pub const TAG_ANY: u64 = u64::MAX - 1;

/// Sentinel count for indefinite-length arrays and maps.
pub const COUNT_INDEFINITE: u16 = u16::MAX;
/// Sentinel count marking the synthetic traversal level created when an empty array or map is
/// entered in bounded mode.
pub const COUNT_EMPTY_BOUNDED: u16 = u16::MAX - 1;
/// Maximum number of items in a definite-length array.
pub const MAX_ITEMS_IN_ARRAY: u64 = (u16::MAX as u64) - 2;
/// Maximum number of entries in a definite-length map.
pub const MAX_ITEMS_IN_MAP: u64 = MAX_ITEMS_IN_ARRAY / 2;
/// Maximum decodable input size. Offsets are kept as `u32` in traversal frames.
pub const MAX_INPUT_SIZE: usize = u32::MAX as usize;

/***************************************************************************************************
 * Registered tag numbers with content decoders
 **************************************************************************************************/

/// RFC 3339 date/time string
pub const TAG_DATE_STRING: u64 = 0;
/// Seconds (integer or float) since the UNIX epoch
pub const TAG_EPOCH_DATE: u64 = 1;
/// Positive arbitrary-precision integer, big-endian byte string
pub const TAG_POS_BIGNUM: u64 = 2;
/// Negative arbitrary-precision integer, offset by -1, big-endian byte string
pub const TAG_NEG_BIGNUM: u64 = 3;
/// Decimal fraction, two-element array of exponent and mantissa
pub const TAG_DECIMAL_FRACTION: u64 = 4;
/// Bigfloat, two-element array of exponent and mantissa
pub const TAG_BIGFLOAT: u64 = 5;
/// Byte string containing encoded CBOR
pub const TAG_CBOR: u64 = 24;
/// URI text string
pub const TAG_URI: u64 = 32;
/// base64url-encoded text string
pub const TAG_B64URL: u64 = 33;
/// base64-encoded text string
pub const TAG_B64: u64 = 34;
/// Regular expression text string
pub const TAG_REGEX: u64 = 35;
/// MIME message text string
pub const TAG_MIME: u64 = 36;
/// Binary UUID byte string
pub const TAG_UUID: u64 = 37;
/// Byte string containing an encoded CBOR sequence
pub const TAG_CBOR_SEQUENCE: u64 = 63;
/// Days (integer) since the UNIX epoch date
pub const TAG_EPOCH_DAYS: u64 = 100;
/// MIME message byte string
pub const TAG_BINARY_MIME: u64 = 257;

/// Module defining bitfield values selecting the source types accepted by the numeric
/// conversion functions. See [`crate::decoder::CBORDecoder::get_int64_convert`].
pub mod convert {
    /// Accept major type 0 and 1 integers, including the 65-bit negative range.
    pub const XINT64: u32 = 1;
    /// Accept half, single and double precision floats.
    pub const FLOAT: u32 = 2;
    /// Accept big numbers (tags 2 and 3).
    pub const BIG_NUM: u32 = 4;
    /// Accept decimal fractions (tag 4).
    pub const DECIMAL_FRACTION: u32 = 8;
    /// Accept bigfloats (tag 5).
    pub const BIGFLOAT: u32 = 16;
    /// Accept every convertible source type.
    pub const ALL: u32 = XINT64 | FLOAT | BIG_NUM | DECIMAL_FRACTION | BIGFLOAT;
}
