/***************************************************************************************************
 * Copyright (c) 2020-2023, Qualcomm Innovation Center, Inc. All rights reserved.
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
 * tps_streamcbor module definition
 *
 * A streaming, cursor-based, deserializer and serializer for CBOR (RFC8949). This implementation
 * is designed for use in constrained systems and requires neither the Rust standard library nor
 * an allocator.
 **************************************************************************************************/

// Default configuration
#![no_std]

//! # TPS_STREAMCBOR
//!
//! The `tps_streamcbor` crate provides a CBOR implementation aimed at embedded targets where
//! the programmer wants to maintain low-level control over serialization and deserialization.
//! The typical use-case is implementation of a standardized CBOR-based container or protocol
//! such as COSE [RFC 9052](https://datatracker.ietf.org/doc/rfc9052/),
//! [CWT](https://datatracker.ietf.org/doc/rfc8392/) or
//! [Entity Attestation Token](https://www.ietf.org/archive/id/draft-ietf-rats-eat-18.txt).
//!
//! The default configuration of `tps_streamcbor` does not require an allocator, and simply
//! serializes or deserializes on byte buffers of your choice. Decoded strings are borrowed
//! slices of the input buffer. The one place dynamic memory is useful, coalescing the chunks of
//! indefinite-length strings, goes through a caller-supplied memory pool rather than a heap.
//!
//! ## Features
//!
//! - A pre-order traversal decoder: one call, one item, with the nesting level of each item and
//!   of its successor reported so arbitrary structure can be reconstructed without recursion.
//! - Bounded decoding of maps and arrays: enter a container, fetch entries by label in any
//!   order while the cursor stays put, and exit to the position just past the container.
//! - Byte-string wrapped CBOR (tags 24 and 63) decoded in place, without copying.
//! - Tag numbers aggregated onto items, with registered content decoders for dates, big
//!   numbers, decimal fractions, bigfloats and the common string-shaped tags.
//! - Conformance profiles up to CDE and dCBOR, checked while decoding.
//! - Numeric conversions between integer, float, big-number, decimal-fraction and bigfloat
//!   representations with explicit overflow reporting.
//! - An encoder with preferred serialization for integer heads and shortest-form floats.
//!
//! ## Decoding
//!
//! The decoder walks the input one item per call. Fetching by label inside a map uses the
//! bounded API and leaves the traversal position unchanged:
//!
//! ```
//! use tps_streamcbor::decoder::{CBORDecoder, DecodeMode};
//! use tps_streamcbor::error::CBORError;
//!
//! fn main() -> Result<(), CBORError> {
//!     // {10: h'948F8860', 258: 64242, 260: ["3.1", 1]}
//!     let input: &[u8] = &[
//!         0xa3, 0x0a, 0x44, 0x94, 0x8f, 0x88, 0x60, 0x19, 0x01, 0x02, 0x19, 0xfa, 0xf2, 0x19,
//!         0x01, 0x04, 0x82, 0x63, 0x33, 0x2e, 0x31, 0x01,
//!     ];
//!     let mut decoder = CBORDecoder::new(input, DecodeMode::Normal);
//!     decoder.enter_map()?;
//!     let nonce = decoder.get_bytes_in_map_n(10)?;
//!     assert_eq!(nonce.as_slice(), &[0x94, 0x8f, 0x88, 0x60]);
//!     let oemid = decoder.get_uint64_in_map_n(258)?;
//!     assert_eq!(oemid, 64242);
//!     decoder.enter_array_in_map_n(260)?;
//!     let version = decoder.get_text()?;
//!     assert_eq!(version.as_str(), "3.1");
//!     assert_eq!(decoder.get_int64()?, 1);
//!     decoder.exit_array()?;
//!     decoder.exit_map()?;
//!     decoder.finish()
//! }
//! ```
//!
//! ## Encoding
//!
//! The encoder appends items to a byte buffer and fixes up array and map lengths when they
//! close:
//!
//! ```
//! use tps_streamcbor::encoder::CBOREncoder;
//! use tps_streamcbor::error::CBORError;
//!
//! fn main() -> Result<(), CBORError> {
//!     let mut buffer = [0u8; 64];
//!     let mut encoder = CBOREncoder::new(&mut buffer);
//!     encoder
//!         .open_map()?
//!         .add_int64(10)?
//!         .add_bytes(&[0x94, 0x8f, 0x88, 0x60])?
//!         .add_int64(258)?
//!         .add_uint64(64242)?
//!         .close_map()?;
//!     let expected: &[u8] = &[
//!         0xa2, 0x0a, 0x44, 0x94, 0x8f, 0x88, 0x60, 0x19, 0x01, 0x02, 0x19, 0xfa, 0xf2,
//!     ];
//!     assert_eq!(encoder.finish()?, expected);
//!     Ok(())
//! }
//! ```

// Pull in std if we are testing or if it is defined as feature (because we run tests on a
// platform supporting I/O and full feature set.
#[cfg(any(feature = "std", test))]
extern crate std;

// If we are really building no_std, pull in core as well. It is aliased as std so that "use"
// statements are always the same
#[cfg(all(not(feature = "std"), not(test)))]
extern crate core as std;

#[cfg(any(feature = "float", test))]
extern crate half;

#[cfg(feature = "full")]
extern crate chrono;

pub(crate) mod decode;
pub(crate) mod encode;
pub(crate) mod item;
pub(crate) mod map;
pub(crate) mod nesting;
pub(crate) mod number;
pub(crate) mod pool;
pub(crate) mod tag;

/// The `constants` module exports CBOR wire-format constants, the registered tag numbers with
/// content decoders, the implementation limits and the [`constants::convert`] flags for the
/// numeric conversion functions.
pub mod constants;

/// The `error` module contains error definitions used throughout `tps_streamcbor`.
pub mod error;

/// The `types` module exports the decoded item model: [`types::CBORItem`] and the sum types
/// carried in it.
pub mod types {
    pub use super::item::{
        Bytes, CBORItem, Epoch, ExpMantissa, Label, Mantissa, StringKind, TagSlots, Text, Value,
        ValueKind,
    };
}

/// The `decoder` module exports types, functions and traits for decoding CBOR items from a
/// buffer.
pub mod decoder {
    pub use super::decode::{CBORDecoder, DecodeMode};
    pub use super::map::{MapQuery, TagRequirement};
    pub use super::pool::{MemPool, StringAllocator};
    pub use super::tag::{TagContentDecodeFn, TagDecoderEntry, DEFAULT_TAG_DECODERS};
}

/// The `encoder` module exports the [`encoder::CBOREncoder`] type, which is used to encode
/// values as CBOR items.
pub mod encoder {
    pub use super::encode::CBOREncoder;
}
