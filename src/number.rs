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
 * CBOR Numeric conversions
 *
 * Conversions from the decoded numeric representations (integers, floats, big numbers, decimal
 * fractions and bigfloats) into i64, u64 and f64 targets. A bit-flag set selects which source
 * types a conversion accepts. Exponentiation is iterative with an overflow check on every
 * multiplication, so out-of-range results are reported rather than wrapped.
 **************************************************************************************************/
use crate::constants::convert;
use crate::decode::CBORDecoder;
use crate::error::{CBORError, Result};
use crate::item::{Bytes, CBORItem, ExpMantissa, Label, Mantissa, Text, Value, ValueKind};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

impl<'buf, 'alloc> CBORDecoder<'buf, 'alloc> {
    /// Decode the next item and convert it to an `i64`. `convert_types` is a bit set of
    /// [`convert`] flags naming the source types to accept; everything else is an
    /// [`CBORError::UnexpectedType`].
    #[cfg_attr(feature = "trace", trace)]
    pub fn get_int64_convert(&mut self, convert_types: u32) -> Result<i64> {
        self.guard()?;
        let result = self
            .get_next_internal(None)
            .and_then(|item| convert_int64(&item, convert_types));
        self.record(result)
    }

    /// Decode the next item and convert it to a `u64`.
    #[cfg_attr(feature = "trace", trace)]
    pub fn get_uint64_convert(&mut self, convert_types: u32) -> Result<u64> {
        self.guard()?;
        let result = self
            .get_next_internal(None)
            .and_then(|item| convert_uint64(&item, convert_types));
        self.record(result)
    }

    /// Decode the next item and convert it to an `f64`. Integer sources convert with possible
    /// precision loss.
    #[cfg_attr(feature = "trace", trace)]
    pub fn get_double_convert(&mut self, convert_types: u32) -> Result<f64> {
        self.guard()?;
        let result = self
            .get_next_internal(None)
            .and_then(|item| convert_double(&item, convert_types));
        self.record(result)
    }

    /// Decode the next item, requiring a big number, and return its sign and magnitude. The
    /// magnitude of a negative big number is the offset-encoded `n` of the value `-(n+1)`.
    pub fn get_big_num(&mut self) -> Result<(bool, Bytes<'buf>)> {
        self.guard()?;
        let result = self.get_next_internal(None).and_then(|item| match item.value {
            Value::PosBignum(b) => Ok((false, b)),
            Value::NegBignum(b) => Ok((true, b)),
            _ => Err(CBORError::UnexpectedType),
        });
        self.record(result)
    }

    /// Convert the value of the integer-labelled map entry to an `i64`. The cursor is
    /// unchanged.
    pub fn get_int64_convert_in_map_n(&mut self, label: i64, convert_types: u32) -> Result<i64> {
        self.convert_in_map(Label::Int(label), move |item| {
            convert_int64(item, convert_types)
        })
    }

    /// Convert the value of the text-labelled map entry to an `i64`.
    pub fn get_int64_convert_in_map_sz(&mut self, label: &str, convert_types: u32) -> Result<i64> {
        self.convert_in_map(Label::TextString(Text::Borrowed(label)), move |item| {
            convert_int64(item, convert_types)
        })
    }

    /// Convert the value of the integer-labelled map entry to a `u64`.
    pub fn get_uint64_convert_in_map_n(&mut self, label: i64, convert_types: u32) -> Result<u64> {
        self.convert_in_map(Label::Int(label), move |item| {
            convert_uint64(item, convert_types)
        })
    }

    /// Convert the value of the text-labelled map entry to a `u64`.
    pub fn get_uint64_convert_in_map_sz(&mut self, label: &str, convert_types: u32) -> Result<u64> {
        self.convert_in_map(Label::TextString(Text::Borrowed(label)), move |item| {
            convert_uint64(item, convert_types)
        })
    }

    /// Convert the value of the integer-labelled map entry to an `f64`.
    pub fn get_double_convert_in_map_n(&mut self, label: i64, convert_types: u32) -> Result<f64> {
        self.convert_in_map(Label::Int(label), move |item| {
            convert_double(item, convert_types)
        })
    }

    /// Convert the value of the text-labelled map entry to an `f64`.
    pub fn get_double_convert_in_map_sz(&mut self, label: &str, convert_types: u32) -> Result<f64> {
        self.convert_in_map(Label::TextString(Text::Borrowed(label)), move |item| {
            convert_double(item, convert_types)
        })
    }

    fn convert_in_map<T>(
        &mut self,
        label: Label<'_>,
        convert: impl Fn(&CBORItem<'buf>) -> Result<T>,
    ) -> Result<T> {
        self.guard()?;
        let result = self
            .search_one(&label, ValueKind::Any)
            .and_then(|(item, _)| convert(&item));
        self.record(result)
    }
}

/***************************************************************************************************
 * Conversion cores
 **************************************************************************************************/

fn convert_int64(item: &CBORItem<'_>, convert_types: u32) -> Result<i64> {
    match item.value {
        Value::Int64(v) if convert_types & convert::XINT64 != 0 => Ok(v),
        Value::UInt64(v) if convert_types & convert::XINT64 != 0 => {
            if v <= i64::MAX as u64 {
                Ok(v as i64)
            } else {
                Err(CBORError::ConversionUnderOverFlow)
            }
        }
        Value::NegInt65(_) if convert_types & convert::XINT64 != 0 => {
            Err(CBORError::ConversionUnderOverFlow)
        }
        Value::Double(d) if convert_types & convert::FLOAT != 0 => float_to_int64(d),
        Value::Float(f) if convert_types & convert::FLOAT != 0 => float_to_int64(f as f64),
        Value::PosBignum(b) if convert_types & convert::BIG_NUM != 0 => {
            let magnitude = bignum_to_u64(b.as_slice())?;
            if magnitude <= i64::MAX as u64 {
                Ok(magnitude as i64)
            } else {
                Err(CBORError::ConversionUnderOverFlow)
            }
        }
        Value::NegBignum(b) if convert_types & convert::BIG_NUM != 0 => {
            let offset = bignum_to_u64(b.as_slice())?;
            negate_offset(offset)
        }
        Value::DecimalFraction(em) if convert_types & convert::DECIMAL_FRACTION != 0 => {
            exp_mantissa_to_int64(&em, 10)
        }
        Value::Bigfloat(em) if convert_types & convert::BIGFLOAT != 0 => {
            exp_mantissa_to_int64(&em, 2)
        }
        _ => Err(CBORError::UnexpectedType),
    }
}

fn convert_uint64(item: &CBORItem<'_>, convert_types: u32) -> Result<u64> {
    match item.value {
        Value::Int64(v) if convert_types & convert::XINT64 != 0 => {
            if v >= 0 {
                Ok(v as u64)
            } else {
                Err(CBORError::NumberSignConversion)
            }
        }
        Value::UInt64(v) if convert_types & convert::XINT64 != 0 => Ok(v),
        Value::NegInt65(_) if convert_types & convert::XINT64 != 0 => {
            Err(CBORError::NumberSignConversion)
        }
        Value::Double(d) if convert_types & convert::FLOAT != 0 => float_to_uint64(d),
        Value::Float(f) if convert_types & convert::FLOAT != 0 => float_to_uint64(f as f64),
        Value::PosBignum(b) if convert_types & convert::BIG_NUM != 0 => bignum_to_u64(b.as_slice()),
        Value::NegBignum(_) if convert_types & convert::BIG_NUM != 0 => {
            Err(CBORError::NumberSignConversion)
        }
        Value::DecimalFraction(em) if convert_types & convert::DECIMAL_FRACTION != 0 => {
            exp_mantissa_to_uint64(&em, 10)
        }
        Value::Bigfloat(em) if convert_types & convert::BIGFLOAT != 0 => {
            exp_mantissa_to_uint64(&em, 2)
        }
        _ => Err(CBORError::UnexpectedType),
    }
}

fn convert_double(item: &CBORItem<'_>, convert_types: u32) -> Result<f64> {
    match item.value {
        Value::Double(d) if convert_types & convert::FLOAT != 0 => Ok(d),
        Value::Float(f) if convert_types & convert::FLOAT != 0 => Ok(f as f64),
        Value::Int64(v) if convert_types & convert::XINT64 != 0 => Ok(v as f64),
        Value::UInt64(v) if convert_types & convert::XINT64 != 0 => Ok(v as f64),
        Value::NegInt65(n) if convert_types & convert::XINT64 != 0 => Ok(-1.0 - n as f64),
        Value::PosBignum(b) if convert_types & convert::BIG_NUM != 0 => {
            Ok(bignum_to_f64(b.as_slice()))
        }
        Value::NegBignum(b) if convert_types & convert::BIG_NUM != 0 => {
            Ok(-1.0 - bignum_to_f64(b.as_slice()))
        }
        Value::DecimalFraction(em) if convert_types & convert::DECIMAL_FRACTION != 0 => {
            Ok(scale_f64(mantissa_to_f64(&em.mantissa), 10.0, em.exponent))
        }
        Value::Bigfloat(em) if convert_types & convert::BIGFLOAT != 0 => {
            Ok(scale_f64(mantissa_to_f64(&em.mantissa), 2.0, em.exponent))
        }
        _ => Err(CBORError::UnexpectedType),
    }
}

/// Round to nearest, halves away from zero, then convert. Rounding needs the standard
/// library; without it the conversion reports that hardware float use is unavailable.
#[cfg(feature = "std")]
fn float_to_int64(d: f64) -> Result<i64> {
    if d.is_nan() || d.is_infinite() {
        return Err(CBORError::FloatException);
    }
    let rounded = d.round();
    if rounded >= 9_223_372_036_854_775_808.0 || rounded < -9_223_372_036_854_775_808.0 {
        return Err(CBORError::ConversionUnderOverFlow);
    }
    Ok(rounded as i64)
}

#[cfg(not(feature = "std"))]
fn float_to_int64(_d: f64) -> Result<i64> {
    Err(CBORError::HwFloatDisabled)
}

#[cfg(feature = "std")]
fn float_to_uint64(d: f64) -> Result<u64> {
    if d.is_nan() || d.is_infinite() {
        return Err(CBORError::FloatException);
    }
    let rounded = d.round();
    if rounded < 0.0 {
        return Err(CBORError::NumberSignConversion);
    }
    if rounded >= 18_446_744_073_709_551_616.0 {
        return Err(CBORError::ConversionUnderOverFlow);
    }
    Ok(rounded as u64)
}

#[cfg(not(feature = "std"))]
fn float_to_uint64(_d: f64) -> Result<u64> {
    Err(CBORError::HwFloatDisabled)
}

/// Big-endian magnitude to u64. Leading zero bytes are not significant, so only the stripped
/// length is bounded.
fn bignum_to_u64(bytes: &[u8]) -> Result<u64> {
    let stripped = match bytes.iter().position(|b| *b != 0) {
        Some(first) => &bytes[first..],
        None => &[],
    };
    if stripped.len() > 8 {
        return Err(CBORError::ConversionUnderOverFlow);
    }
    let mut value = 0u64;
    for b in stripped {
        value = (value << 8) | *b as u64;
    }
    Ok(value)
}

fn bignum_to_f64(bytes: &[u8]) -> f64 {
    let mut value = 0.0f64;
    for b in bytes {
        value = value * 256.0 + *b as f64;
    }
    value
}

/// The negative integer encoding holds `n` for the value `-(n+1)`.
fn negate_offset(offset: u64) -> Result<i64> {
    if offset <= i64::MAX as u64 {
        Ok(-(offset as i64) - 1)
    } else {
        Err(CBORError::ConversionUnderOverFlow)
    }
}

/// Multiply `mantissa` by `base` raised to `exponent`, one checked step at a time so overflow
/// is detected rather than wrapped.
fn exponentiate(mantissa: u64, base: u64, exponent: u64) -> Result<u64> {
    if mantissa == 0 {
        return Ok(0);
    }
    if exponent > 64 {
        // base is at least 2, so any nonzero mantissa has long since overflowed
        return Err(CBORError::ConversionUnderOverFlow);
    }
    let mut value = mantissa;
    for _ in 0..exponent {
        value = value
            .checked_mul(base)
            .ok_or(CBORError::ConversionUnderOverFlow)?;
    }
    Ok(value)
}

fn mantissa_parts(mantissa: &Mantissa<'_>) -> Result<(bool, u64)> {
    match mantissa {
        Mantissa::Int(v) => {
            if *v >= 0 {
                Ok((false, *v as u64))
            } else {
                Ok((true, (*v as i128).unsigned_abs() as u64))
            }
        }
        Mantissa::UInt(v) => Ok((false, *v)),
        Mantissa::PosBignum(b) => Ok((false, bignum_to_u64(b.as_slice())?)),
        Mantissa::NegBignum(b) => {
            let offset = bignum_to_u64(b.as_slice())?;
            let magnitude = offset.checked_add(1).ok_or(CBORError::ConversionUnderOverFlow)?;
            Ok((true, magnitude))
        }
    }
}

fn exp_mantissa_to_int64(em: &ExpMantissa<'_>, base: u64) -> Result<i64> {
    if em.exponent < 0 {
        // A fractional result has no integer representation
        return Err(CBORError::ConversionUnderOverFlow);
    }
    let (negative, magnitude) = mantissa_parts(&em.mantissa)?;
    let scaled = exponentiate(magnitude, base, em.exponent as u64)?;
    if negative {
        if scaled <= i64::MAX as u64 {
            Ok(-(scaled as i64))
        } else if scaled == (i64::MAX as u64) + 1 {
            Ok(i64::MIN)
        } else {
            Err(CBORError::ConversionUnderOverFlow)
        }
    } else if scaled <= i64::MAX as u64 {
        Ok(scaled as i64)
    } else {
        Err(CBORError::ConversionUnderOverFlow)
    }
}

fn exp_mantissa_to_uint64(em: &ExpMantissa<'_>, base: u64) -> Result<u64> {
    if em.exponent < 0 {
        return Err(CBORError::ConversionUnderOverFlow);
    }
    let (negative, magnitude) = mantissa_parts(&em.mantissa)?;
    if negative {
        return Err(CBORError::NumberSignConversion);
    }
    exponentiate(magnitude, base, em.exponent as u64)
}

fn mantissa_to_f64(mantissa: &Mantissa<'_>) -> f64 {
    match mantissa {
        Mantissa::Int(v) => *v as f64,
        Mantissa::UInt(v) => *v as f64,
        Mantissa::PosBignum(b) => bignum_to_f64(b.as_slice()),
        Mantissa::NegBignum(b) => -1.0 - bignum_to_f64(b.as_slice()),
    }
}

/// Scale by `base^exponent` with a bounded loop; magnitudes beyond the double range saturate
/// to infinity or zero through ordinary float arithmetic.
fn scale_f64(mantissa: f64, base: f64, exponent: i64) -> f64 {
    let steps = exponent.unsigned_abs().min(4096);
    let mut value = mantissa;
    for _ in 0..steps {
        if exponent >= 0 {
            value *= base;
        } else {
            value /= base;
        }
    }
    value
}
