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
 * CBOR Tag number handling
 *
 * Tag number aggregation, the per-decoder mapping of large tag numbers to compact item slots,
 * and the dispatch of registered tag-content decoders that reclassify an item based on the tag
 * numbers enclosing it.
 **************************************************************************************************/
use crate::constants::*;
use crate::decode::CBORDecoder;
use crate::error::{CBORError, Result};
use crate::item::{CBORItem, Epoch, ExpMantissa, Mantissa, Value};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// A tag-content decoder. Called with the resolved tag number and the decoded item carrying
/// the tag; on success it reclassifies the item's value. Decoders for tags whose content spans
/// several items (decimal fractions, bigfloats) fetch the extra items through the decoder.
pub type TagContentDecodeFn =
    for<'b, 'a> fn(&mut CBORDecoder<'b, 'a>, u64, &mut CBORItem<'b>) -> Result<()>;

/// One entry of a tag-content decoder table: a tag number, or [`TAG_ANY`] as a wildcard, and
/// the decoder to run for it.
pub struct TagDecoderEntry {
    pub tag: u64,
    pub decode: TagContentDecodeFn,
}

/// The content decoders for the commonly registered tag numbers: dates, big numbers, decimal
/// fractions, bigfloats, URIs, base64 variants, regular expressions, MIME messages, UUIDs and
/// wrapped CBOR. Installed by [`CBORDecoder::v1_compatibility`]; can also be installed
/// explicitly with [`CBORDecoder::install_tag_decoders`].
pub static DEFAULT_TAG_DECODERS: &[TagDecoderEntry] = &[
    TagDecoderEntry { tag: TAG_DATE_STRING, decode: decode_date_string },
    TagDecoderEntry { tag: TAG_EPOCH_DATE, decode: decode_epoch_date },
    TagDecoderEntry { tag: TAG_POS_BIGNUM, decode: decode_bignum },
    TagDecoderEntry { tag: TAG_NEG_BIGNUM, decode: decode_bignum },
    TagDecoderEntry { tag: TAG_DECIMAL_FRACTION, decode: decode_exp_mantissa },
    TagDecoderEntry { tag: TAG_BIGFLOAT, decode: decode_exp_mantissa },
    TagDecoderEntry { tag: TAG_CBOR, decode: decode_wrapped_cbor },
    TagDecoderEntry { tag: TAG_CBOR_SEQUENCE, decode: decode_wrapped_cbor },
    TagDecoderEntry { tag: TAG_URI, decode: decode_text_content },
    TagDecoderEntry { tag: TAG_B64URL, decode: decode_text_content },
    TagDecoderEntry { tag: TAG_B64, decode: decode_text_content },
    TagDecoderEntry { tag: TAG_REGEX, decode: decode_text_content },
    TagDecoderEntry { tag: TAG_MIME, decode: decode_text_content },
    TagDecoderEntry { tag: TAG_BINARY_MIME, decode: decode_binary_mime },
    TagDecoderEntry { tag: TAG_UUID, decode: decode_uuid },
    TagDecoderEntry { tag: TAG_EPOCH_DAYS, decode: decode_epoch_days },
];

impl<'buf, 'alloc> CBORDecoder<'buf, 'alloc> {
    /// Install a tag-content decoder table. Entries are searched in order; a [`TAG_ANY`]
    /// entry matches every tag number.
    pub fn install_tag_decoders(&mut self, table: &'alloc [TagDecoderEntry]) {
        self.tag_decoders = Some(table);
    }

    /// Select the traversal behaviour of earlier releases: items may carry unconsumed tag
    /// numbers without error, and the default tag-content decoder table is installed.
    pub fn v1_compatibility(&mut self) {
        self.tag_check_disabled = true;
        self.tag_decoders = Some(DEFAULT_TAG_DECODERS);
    }

    /// Map `number` to a compact slot value. Small tag numbers map to themselves; large ones
    /// are assigned an entry in the per-decoder table, write-once per value.
    pub(crate) fn map_tag_number(&mut self, number: u64) -> Result<u16> {
        if number <= LAST_UNMAPPED_TAG {
            return Ok(number as u16);
        }
        for (i, entry) in self.tag_map.iter().enumerate() {
            if *entry == number {
                return Ok(mapped_slot(i));
            }
        }
        for (i, entry) in self.tag_map.iter_mut().enumerate() {
            if *entry == TAG_INVALID {
                *entry = number;
                return Ok(mapped_slot(i));
            }
        }
        Err(CBORError::TooManyTags)
    }

    /// Resolve a compact slot value back to the tag number it stands for.
    pub(crate) fn resolve_slot(&self, slot: u16) -> u64 {
        if slot as u64 <= LAST_UNMAPPED_TAG {
            slot as u64
        } else {
            self.tag_map[(slot - (LAST_UNMAPPED_TAG as u16 + 1)) as usize]
        }
    }

    /// The `n`th tag number on `item`, innermost first. Returns `None` past the last tag.
    pub fn nth_tag(&self, item: &CBORItem<'buf>, n: usize) -> Option<u64> {
        item.tags.slot(n).map(|s| self.resolve_slot(s))
    }

    /// The `n`th tag number on `item`, outermost first.
    pub fn nth_tag_number(&self, item: &CBORItem<'buf>, n: usize) -> Option<u64> {
        let count = item.tags.count();
        if n >= count {
            return None;
        }
        item.tags.slot(count - 1 - n).map(|s| self.resolve_slot(s))
    }

    /// The `n`th tag number, outermost first, of the most recently decoded item.
    pub fn nth_tag_number_of_last(&self, n: usize) -> Option<u64> {
        let last = CBORItem {
            tags: self.last_tags,
            ..CBORItem::none()
        };
        self.nth_tag_number(&last, n)
    }

    /// Consume one tag number of the upcoming item, outermost first, without consuming the
    /// item itself. Returns `None` once every tag number has been consumed. Consuming all of
    /// an item's tag numbers this way satisfies the unprocessed-tag-number check that
    /// [`CBORDecoder::get_next`] otherwise applies.
    #[cfg_attr(feature = "trace", trace)]
    pub fn get_next_tag_number(&mut self) -> Result<Option<u64>> {
        let start = self.cursor;
        let saved_nesting = self.nesting;
        let peeked = self.next_nested(false, None);
        self.cursor = start;
        self.nesting = saved_nesting;
        let item = peeked?;
        let count = item.tags.count();
        let index = if start == self.tag_number_check_offset {
            self.tag_number_index as usize
        } else {
            0
        };
        self.tag_number_check_offset = start;
        if index < count {
            self.tag_number_index = (index + 1) as u8;
            let slot = item.tags.slot(count - 1 - index);
            Ok(slot.map(|s| self.resolve_slot(s)))
        } else {
            self.tag_number_index = index as u8;
            Ok(None)
        }
    }

    /// Aggregate the tag numbers preceding the next item into its tag slots, innermost
    /// first. Consumes the whole run of tag numbers even when there are more than fit, so
    /// the cursor is positioned after the item when [`CBORError::TooManyTags`] is reported.
    pub(crate) fn next_with_tags(&mut self) -> Result<CBORItem<'buf>> {
        let mut outermost_first = [TAG_SLOT_INVALID; MAX_TAGS_PER_ITEM];
        let mut n_tags = 0usize;
        let mut overflowed = false;
        loop {
            let mut item = self.next_full_item()?;
            match item.value {
                Value::TagNumber(number) => {
                    let slot = self.map_tag_number(number)?;
                    if n_tags == MAX_TAGS_PER_ITEM {
                        overflowed = true;
                        continue;
                    }
                    outermost_first[n_tags] = slot;
                    n_tags += 1;
                }
                _ => {
                    for i in 0..n_tags {
                        item.tags.0[i] = outermost_first[n_tags - 1 - i];
                    }
                    if overflowed {
                        return Err(CBORError::TooManyTags);
                    }
                    return Ok(item);
                }
            }
        }
    }

    /// Run the registered content decoders over the item's tag numbers, innermost first.
    /// Each successful decoder consumes its tag number; an unregistered tag number stops the
    /// walk and stays on the item for the caller to consume.
    pub(crate) fn dispatch_tag_content(&mut self, item: &mut CBORItem<'buf>) -> Result<()> {
        let table = match self.tag_decoders {
            Some(t) => t,
            None => return Ok(()),
        };
        loop {
            let slot = match item.tags.slot(0) {
                Some(s) => s,
                None => break,
            };
            let tag = self.resolve_slot(slot);
            let entry = table.iter().find(|e| e.tag == tag || e.tag == TAG_ANY);
            match entry {
                Some(e) => {
                    (e.decode)(self, tag, item)?;
                    item.tags.remove(0);
                }
                None => break,
            }
        }
        Ok(())
    }
}

#[inline]
fn mapped_slot(index: usize) -> u16 {
    LAST_UNMAPPED_TAG as u16 + 1 + index as u16
}

/***************************************************************************************************
 * Content decoders for the default table
 **************************************************************************************************/

fn decode_date_string<'b, 'a>(
    _decoder: &mut CBORDecoder<'b, 'a>,
    _tag: u64,
    item: &mut CBORItem<'b>,
) -> Result<()> {
    match item.value {
        Value::TextString(t) => {
            item.value = Value::DateString(t);
            Ok(())
        }
        _ => Err(CBORError::UnrecoverableTagContent),
    }
}

/// Epoch dates carry whole seconds for integer content and a split seconds/fraction pair for
/// float content. Out-of-range floats, NaN included, are a date overflow.
fn decode_epoch_date<'b, 'a>(
    _decoder: &mut CBORDecoder<'b, 'a>,
    _tag: u64,
    item: &mut CBORItem<'b>,
) -> Result<()> {
    let epoch = match item.value {
        Value::Int64(v) => Epoch {
            seconds: v,
            fraction: 0.0,
        },
        Value::UInt64(_) | Value::NegInt65(_) => return Err(CBORError::DateOverflow),
        Value::Double(d) => split_epoch_float(d)?,
        Value::Float(f) => split_epoch_float(f as f64)?,
        _ => return Err(CBORError::UnrecoverableTagContent),
    };
    item.value = Value::DateEpoch(epoch);
    Ok(())
}

fn split_epoch_float(d: f64) -> Result<Epoch> {
    if !d.is_finite() {
        return Err(CBORError::DateOverflow);
    }
    if d >= 9_223_372_036_854_775_808.0 || d < -9_223_372_036_854_775_808.0 {
        return Err(CBORError::DateOverflow);
    }
    let seconds = d as i64;
    Ok(Epoch {
        seconds,
        fraction: d - seconds as f64,
    })
}

fn decode_epoch_days<'b, 'a>(
    _decoder: &mut CBORDecoder<'b, 'a>,
    _tag: u64,
    item: &mut CBORItem<'b>,
) -> Result<()> {
    match item.value {
        Value::Int64(v) => {
            item.value = Value::EpochDays(v);
            Ok(())
        }
        Value::UInt64(_) | Value::NegInt65(_) => Err(CBORError::DateOverflow),
        _ => Err(CBORError::UnrecoverableTagContent),
    }
}

fn decode_bignum<'b, 'a>(
    _decoder: &mut CBORDecoder<'b, 'a>,
    tag: u64,
    item: &mut CBORItem<'b>,
) -> Result<()> {
    match item.value {
        Value::ByteString(b) => {
            item.value = if tag == TAG_POS_BIGNUM {
                Value::PosBignum(b)
            } else {
                Value::NegBignum(b)
            };
            Ok(())
        }
        _ => Err(CBORError::UnrecoverableTagContent),
    }
}

/// Decimal fractions and bigfloats are a two-element array: an integer exponent and a
/// mantissa that is an integer or a big number. The two content items are consumed here, so
/// the reclassified item covers the whole array.
fn decode_exp_mantissa<'b, 'a>(
    decoder: &mut CBORDecoder<'b, 'a>,
    tag: u64,
    item: &mut CBORItem<'b>,
) -> Result<()> {
    match item.value {
        Value::Array(2) | Value::Array(COUNT_INDEFINITE) => (),
        _ => return Err(CBORError::BadExpAndMantissa),
    }
    let exp_item = decoder.next_nested(false, None)?;
    let exponent = match exp_item.value {
        Value::Int64(v) => v,
        _ => return Err(CBORError::BadExpAndMantissa),
    };
    let mut mant_item = decoder.next_nested(false, None)?;
    decoder.dispatch_tag_content(&mut mant_item)?;
    let mantissa = match mant_item.value {
        Value::Int64(v) => Mantissa::Int(v),
        Value::UInt64(v) => Mantissa::UInt(v),
        Value::PosBignum(b) => Mantissa::PosBignum(b),
        Value::NegBignum(b) => Mantissa::NegBignum(b),
        Value::ByteString(b) => match mant_item.tags.slot(0).map(|s| decoder.resolve_slot(s)) {
            Some(TAG_POS_BIGNUM) => Mantissa::PosBignum(b),
            Some(TAG_NEG_BIGNUM) => Mantissa::NegBignum(b),
            _ => return Err(CBORError::BadExpAndMantissa),
        },
        _ => return Err(CBORError::BadExpAndMantissa),
    };
    if mant_item.next_nest_level > item.nest_level {
        // The array holds more than the two permitted items
        return Err(CBORError::BadExpAndMantissa);
    }
    let pair = ExpMantissa { exponent, mantissa };
    item.value = if tag == TAG_DECIMAL_FRACTION {
        Value::DecimalFraction(pair)
    } else {
        Value::Bigfloat(pair)
    };
    item.next_nest_level = mant_item.next_nest_level;
    Ok(())
}

fn decode_text_content<'b, 'a>(
    _decoder: &mut CBORDecoder<'b, 'a>,
    tag: u64,
    item: &mut CBORItem<'b>,
) -> Result<()> {
    let text = match item.value {
        Value::TextString(t) => t,
        _ => return Err(CBORError::UnrecoverableTagContent),
    };
    item.value = match tag {
        TAG_URI => Value::Uri(text),
        TAG_B64URL => Value::Base64Url(text),
        TAG_B64 => Value::Base64(text),
        TAG_REGEX => Value::Regex(text),
        _ => Value::MimeText(text),
    };
    Ok(())
}

fn decode_binary_mime<'b, 'a>(
    _decoder: &mut CBORDecoder<'b, 'a>,
    _tag: u64,
    item: &mut CBORItem<'b>,
) -> Result<()> {
    match item.value {
        Value::ByteString(b) => {
            item.value = Value::MimeBinary(b);
            Ok(())
        }
        _ => Err(CBORError::UnrecoverableTagContent),
    }
}

fn decode_uuid<'b, 'a>(
    _decoder: &mut CBORDecoder<'b, 'a>,
    _tag: u64,
    item: &mut CBORItem<'b>,
) -> Result<()> {
    match item.value {
        Value::ByteString(b) => {
            item.value = Value::Uuid(b);
            Ok(())
        }
        _ => Err(CBORError::UnrecoverableTagContent),
    }
}

fn decode_wrapped_cbor<'b, 'a>(
    _decoder: &mut CBORDecoder<'b, 'a>,
    tag: u64,
    item: &mut CBORItem<'b>,
) -> Result<()> {
    match item.value {
        Value::ByteString(b) => {
            item.value = if tag == TAG_CBOR {
                Value::WrappedCBOR(b)
            } else {
                Value::WrappedCBORSequence(b)
            };
            Ok(())
        }
        _ => Err(CBORError::UnrecoverableTagContent),
    }
}
