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
 * CBOR Encoder
 *
 * A streaming, cursor-based, serializer for CBOR (RFC8949). Output goes directly into a
 * caller-supplied buffer with preferred (shortest-form) serialization throughout. Array and map
 * lengths are fixed up on close, so the number of items need not be known in advance.
 **************************************************************************************************/
use crate::constants::*;
use crate::error::{CBORError, Result};

#[cfg(all(feature = "float", feature = "half-float"))]
use half::f16;

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

#[derive(Debug, Copy, Clone, PartialEq)]
enum ContextKind {
    Array,
    Map,
}

#[derive(Debug, Copy, Clone)]
struct EncodeContext {
    kind: ContextKind,
    head_index: usize,
    items: usize,
}

impl EncodeContext {
    const EMPTY: EncodeContext = EncodeContext {
        kind: ContextKind::Array,
        head_index: 0,
        items: 0,
    };
}

/// A CBOR encoder over a caller-supplied output buffer.
///
/// Items are appended with the `add_*` functions; arrays and maps are bracketed with the
/// `open_*`/`close_*` pairs, which back-patch the length on close by moving the contents when
/// the length needs more than the reserved byte. A buffer that is too small reports
/// [`CBORError::BufferTooSmall`]; sizing the buffer generously avoids the error entirely.
///
/// ## Example
/// ```
///# use tps_streamcbor::encoder::CBOREncoder;
///# use tps_streamcbor::error::CBORError;
///# fn main() -> Result<(), CBORError> {
///    let mut buffer = [0u8; 32];
///    let mut encoder = CBOREncoder::new(&mut buffer);
///    encoder
///        .open_map()?
///        .add_int64(1)?
///        .add_text("Hello")?
///        .add_int64(2)?
///        .add_text("World")?
///        .close_map()?;
///    let expected: &[u8] = &[
///        0xa2, 0x01, 0x65, 0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x02, 0x65, 0x57, 0x6f, 0x72, 0x6c,
///        0x64,
///    ];
///    assert_eq!(encoder.finish()?, expected);
///#    Ok(())
///# }
/// ```
#[derive(Debug)]
pub struct CBOREncoder<'buf> {
    bytes: &'buf mut [u8],
    index: usize,
    contexts: [EncodeContext; MAX_NESTING],
    depth: usize,
}

#[inline]
fn head_size(arg: u64) -> usize {
    if arg < PAYLOAD_ONE_BYTE as u64 {
        1
    } else if arg <= u8::MAX as u64 {
        2
    } else if arg <= u16::MAX as u64 {
        3
    } else if arg <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

impl<'buf> CBOREncoder<'buf> {
    /// Construct an encoder writing into `bytes`.
    #[cfg_attr(feature = "trace", trace)]
    pub fn new(bytes: &'buf mut [u8]) -> CBOREncoder<'buf> {
        CBOREncoder {
            bytes,
            index: 0,
            contexts: [EncodeContext::EMPTY; MAX_NESTING],
            depth: 0,
        }
    }

    #[inline]
    fn ensure(&self, extra: usize) -> Result<()> {
        if self.index + extra <= self.bytes.len() {
            Ok(())
        } else {
            Err(CBORError::BufferTooSmall)
        }
    }

    fn count_item(&mut self) {
        if self.depth > 0 {
            self.contexts[self.depth - 1].items += 1;
        }
    }

    /// Write one head in preferred (shortest) form.
    fn write_head(&mut self, mt: u8, arg: u64) -> Result<()> {
        let size = head_size(arg);
        self.ensure(size)?;
        match size {
            1 => self.bytes[self.index] = mt | arg as u8,
            2 => {
                self.bytes[self.index] = mt | PAYLOAD_ONE_BYTE;
                self.bytes[self.index + 1] = arg as u8;
            }
            3 => {
                self.bytes[self.index] = mt | PAYLOAD_TWO_BYTES;
                self.bytes[self.index + 1..self.index + 3]
                    .copy_from_slice(&(arg as u16).to_be_bytes());
            }
            5 => {
                self.bytes[self.index] = mt | PAYLOAD_FOUR_BYTES;
                self.bytes[self.index + 1..self.index + 5]
                    .copy_from_slice(&(arg as u32).to_be_bytes());
            }
            _ => {
                self.bytes[self.index] = mt | PAYLOAD_EIGHT_BYTES;
                self.bytes[self.index + 1..self.index + 9].copy_from_slice(&arg.to_be_bytes());
            }
        }
        self.index += size;
        Ok(())
    }

    /// Append an integer, serialized as major type 0 or 1.
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_int64(&mut self, value: i64) -> Result<&mut Self> {
        if value < 0 {
            self.write_head(MT_NINT, (-1 - (value as i128)) as u64)?;
        } else {
            self.write_head(MT_UINT, value as u64)?;
        }
        self.count_item();
        Ok(self)
    }

    /// Append an unsigned integer as major type 0.
    pub fn add_uint64(&mut self, value: u64) -> Result<&mut Self> {
        self.write_head(MT_UINT, value)?;
        self.count_item();
        Ok(self)
    }

    /// Append a byte string.
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_bytes(&mut self, value: &[u8]) -> Result<&mut Self> {
        self.write_head(MT_BSTR, value.len() as u64)?;
        self.ensure(value.len())?;
        self.bytes[self.index..self.index + value.len()].copy_from_slice(value);
        self.index += value.len();
        self.count_item();
        Ok(self)
    }

    /// Append a text string.
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_text(&mut self, value: &str) -> Result<&mut Self> {
        let bytes = value.as_bytes();
        self.write_head(MT_TSTR, bytes.len() as u64)?;
        self.ensure(bytes.len())?;
        self.bytes[self.index..self.index + bytes.len()].copy_from_slice(bytes);
        self.index += bytes.len();
        self.count_item();
        Ok(self)
    }

    /// Append a boolean.
    pub fn add_bool(&mut self, value: bool) -> Result<&mut Self> {
        self.write_head(MT_SIMPLE, if value { 21 } else { 20 })?;
        self.count_item();
        Ok(self)
    }

    /// Append null.
    pub fn add_null(&mut self) -> Result<&mut Self> {
        self.write_head(MT_SIMPLE, 22)?;
        self.count_item();
        Ok(self)
    }

    /// Append undefined.
    pub fn add_undefined(&mut self) -> Result<&mut Self> {
        self.write_head(MT_SIMPLE, 23)?;
        self.count_item();
        Ok(self)
    }

    /// Append a simple value other than false, true, null and undefined. Values 24..31 have
    /// no legal encoding.
    pub fn add_simple(&mut self, value: u8) -> Result<&mut Self> {
        match value {
            0..=19 => {
                self.ensure(1)?;
                self.bytes[self.index] = MT_SIMPLE | value;
                self.index += 1;
            }
            20..=31 => return Err(CBORError::BadType7),
            _ => {
                self.ensure(2)?;
                self.bytes[self.index] = MT_SIMPLE | PAYLOAD_ONE_BYTE;
                self.bytes[self.index + 1] = value;
                self.index += 2;
            }
        }
        self.count_item();
        Ok(self)
    }

    /// Append a tag number. The next appended item is its content; the tag and content
    /// together count as one item of the enclosing array or map.
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_tag(&mut self, tag: u64) -> Result<&mut Self> {
        self.write_head(MT_TAG, tag)?;
        Ok(self)
    }

    /// Append a double, using the shortest float form that preserves the value exactly. NaN
    /// is canonicalized to the half-precision quiet NaN.
    #[cfg(all(feature = "float", feature = "half-float"))]
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_double(&mut self, value: f64) -> Result<&mut Self> {
        if value.is_nan() {
            self.write_float16_bits(0x7e00)?;
        } else if f16::from_f64(value).to_f64().to_bits() == value.to_bits() {
            self.write_float16_bits(f16::from_f64(value).to_bits())?;
        } else if ((value as f32) as f64).to_bits() == value.to_bits() {
            self.write_float32(value as f32)?;
        } else {
            self.write_float64(value)?;
        }
        self.count_item();
        Ok(self)
    }

    /// Append a double, shortened to single precision when exact. Half precision is
    /// disabled in this build, so the decoder here could not read it back. NaN is
    /// canonicalized to the single-precision quiet NaN.
    #[cfg(all(feature = "float", not(feature = "half-float")))]
    #[cfg_attr(feature = "trace", trace)]
    pub fn add_double(&mut self, value: f64) -> Result<&mut Self> {
        if value.is_nan() {
            self.write_float32(f32::from_bits(0x7fc0_0000))?;
        } else if ((value as f32) as f64).to_bits() == value.to_bits() {
            self.write_float32(value as f32)?;
        } else {
            self.write_float64(value)?;
        }
        self.count_item();
        Ok(self)
    }

    /// Append a single-precision float, shortened to half precision when exact.
    #[cfg(all(feature = "float", feature = "half-float"))]
    pub fn add_float(&mut self, value: f32) -> Result<&mut Self> {
        if value.is_nan() {
            self.write_float16_bits(0x7e00)?;
        } else if f16::from_f32(value).to_f32().to_bits() == value.to_bits() {
            self.write_float16_bits(f16::from_f32(value).to_bits())?;
        } else {
            self.write_float32(value)?;
        }
        self.count_item();
        Ok(self)
    }

    /// Append a single-precision float. Half precision is disabled in this build, so no
    /// shorter form is emitted. NaN is canonicalized to the single-precision quiet NaN.
    #[cfg(all(feature = "float", not(feature = "half-float")))]
    pub fn add_float(&mut self, value: f32) -> Result<&mut Self> {
        if value.is_nan() {
            self.write_float32(f32::from_bits(0x7fc0_0000))?;
        } else {
            self.write_float32(value)?;
        }
        self.count_item();
        Ok(self)
    }

    #[cfg(all(feature = "float", feature = "half-float"))]
    fn write_float16_bits(&mut self, bits: u16) -> Result<()> {
        self.ensure(3)?;
        self.bytes[self.index] = MT_SIMPLE | PAYLOAD_TWO_BYTES;
        self.bytes[self.index + 1..self.index + 3].copy_from_slice(&bits.to_be_bytes());
        self.index += 3;
        Ok(())
    }

    #[cfg(feature = "float")]
    fn write_float32(&mut self, value: f32) -> Result<()> {
        self.ensure(5)?;
        self.bytes[self.index] = MT_SIMPLE | PAYLOAD_FOUR_BYTES;
        self.bytes[self.index + 1..self.index + 5]
            .copy_from_slice(&value.to_bits().to_be_bytes());
        self.index += 5;
        Ok(())
    }

    #[cfg(feature = "float")]
    fn write_float64(&mut self, value: f64) -> Result<()> {
        self.ensure(9)?;
        self.bytes[self.index] = MT_SIMPLE | PAYLOAD_EIGHT_BYTES;
        self.bytes[self.index + 1..self.index + 9]
            .copy_from_slice(&value.to_bits().to_be_bytes());
        self.index += 9;
        Ok(())
    }

    /// Append pre-encoded CBOR verbatim as one item.
    pub fn add_encoded(&mut self, encoded: &[u8]) -> Result<&mut Self> {
        self.ensure(encoded.len())?;
        self.bytes[self.index..self.index + encoded.len()].copy_from_slice(encoded);
        self.index += encoded.len();
        self.count_item();
        Ok(self)
    }

    fn open_aggregate(&mut self, kind: ContextKind) -> Result<&mut Self> {
        if self.depth == MAX_NESTING {
            return Err(CBORError::ArrayDecodeNestingTooDeep);
        }
        self.count_item();
        self.ensure(1)?;
        self.contexts[self.depth] = EncodeContext {
            kind,
            head_index: self.index,
            items: 0,
        };
        self.depth += 1;
        self.bytes[self.index] = 0;
        self.index += 1;
        Ok(self)
    }

    fn close_aggregate(&mut self, kind: ContextKind) -> Result<&mut Self> {
        if self.depth == 0 {
            return Err(CBORError::ExitMismatch);
        }
        let ctx = self.contexts[self.depth - 1];
        if ctx.kind != kind {
            return Err(CBORError::ExitMismatch);
        }
        let count = match kind {
            ContextKind::Array => ctx.items,
            ContextKind::Map => {
                if ctx.items % 2 != 0 {
                    return Err(CBORError::ExitMismatch);
                }
                ctx.items / 2
            }
        };
        let extra = head_size(count as u64) - 1;
        if extra > 0 {
            self.ensure(extra)?;
            let content_start = ctx.head_index + 1;
            self.bytes
                .copy_within(content_start..self.index, content_start + extra);
            self.index += extra;
        }
        let mt = match kind {
            ContextKind::Array => MT_ARRAY,
            ContextKind::Map => MT_MAP,
        };
        let end = self.index;
        self.index = ctx.head_index;
        self.write_head(mt, count as u64)?;
        self.index = end;
        self.depth -= 1;
        Ok(self)
    }

    /// Open an array. The length is fixed up by the matching [`CBOREncoder::close_array`].
    #[cfg_attr(feature = "trace", trace)]
    pub fn open_array(&mut self) -> Result<&mut Self> {
        self.open_aggregate(ContextKind::Array)
    }

    /// Close the innermost open array.
    #[cfg_attr(feature = "trace", trace)]
    pub fn close_array(&mut self) -> Result<&mut Self> {
        self.close_aggregate(ContextKind::Array)
    }

    /// Open a map. Keys and values are appended alternately; the entry count is fixed up by
    /// the matching [`CBOREncoder::close_map`], which requires an even number of items.
    #[cfg_attr(feature = "trace", trace)]
    pub fn open_map(&mut self) -> Result<&mut Self> {
        self.open_aggregate(ContextKind::Map)
    }

    /// Close the innermost open map.
    #[cfg_attr(feature = "trace", trace)]
    pub fn close_map(&mut self) -> Result<&mut Self> {
        self.close_aggregate(ContextKind::Map)
    }

    /// Number of bytes encoded so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.index
    }

    /// Return `true` if nothing has been encoded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    /// Return the encoded bytes. Fails with [`CBORError::ArrayOrMapUnconsumed`] while an
    /// array or map is still open.
    #[cfg_attr(feature = "trace", trace)]
    pub fn finish(&self) -> Result<&[u8]> {
        if self.depth != 0 {
            return Err(CBORError::ArrayOrMapUnconsumed);
        }
        Ok(&self.bytes[..self.index])
    }
}
