/***************************************************************************************************
 * Copyright (c) 2022-2023 Qualcomm Innovation Center, Inc. All rights reserved.
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
 * Numeric conversion behaviour: integers, floats, big numbers, decimal fractions, bigfloats.
 **************************************************************************************************/

extern crate tps_streamcbor;

use tps_streamcbor::constants::convert;
use tps_streamcbor::decoder::{CBORDecoder, DecodeMode};
use tps_streamcbor::error::CBORError;

fn decoder_with_tags<'a>(buf: &'a [u8]) -> CBORDecoder<'a, 'a> {
    let mut decoder = CBORDecoder::new(buf, DecodeMode::Normal);
    decoder.v1_compatibility();
    decoder
}

/***************************************************************************************************
 * Integer sources
 **************************************************************************************************/

#[test]
fn int64_from_integers() {
    let mut decoder = decoder_with_tags(&[0x18, 0x2a]);
    assert_eq!(decoder.get_int64_convert(convert::XINT64).unwrap(), 42);

    let mut decoder = decoder_with_tags(&[0x38, 0x63]);
    assert_eq!(decoder.get_int64_convert(convert::XINT64).unwrap(), -100);
}

#[test]
fn int64_rejects_out_of_range_unsigned() {
    let buf = [0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(
        decoder.get_int64_convert(convert::ALL).unwrap_err(),
        CBORError::ConversionUnderOverFlow
    );
}

#[test]
fn int64_rejects_sources_outside_the_flag_set() {
    let mut decoder = decoder_with_tags(&[0x18, 0x2a]);
    assert_eq!(
        decoder.get_int64_convert(convert::FLOAT).unwrap_err(),
        CBORError::UnexpectedType
    );
}

#[test]
fn uint64_rejects_negative_sources() {
    let mut decoder = decoder_with_tags(&[0x20]);
    assert_eq!(
        decoder.get_uint64_convert(convert::ALL).unwrap_err(),
        CBORError::NumberSignConversion
    );
}

#[test]
fn uint64_from_large_unsigned() {
    let buf = [0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(
        decoder.get_uint64_convert(convert::XINT64).unwrap(),
        u64::MAX
    );
}

/***************************************************************************************************
 * Float sources
 **************************************************************************************************/

#[cfg(all(feature = "float", feature = "half-float", feature = "std"))]
#[test]
fn int64_from_floats_rounds_to_nearest() {
    // 2.5 rounds away from zero
    let buf = [0xfb, 0x40, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(decoder.get_int64_convert(convert::ALL).unwrap(), 3);

    let buf = [0xf9, 0xc4, 0x00]; // -4.0
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(decoder.get_int64_convert(convert::ALL).unwrap(), -4);
}

#[cfg(all(feature = "float", feature = "half-float", feature = "std"))]
#[test]
fn float_conversion_rejects_nan_and_infinity() {
    let buf = [0xf9, 0x7e, 0x00];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(
        decoder.get_int64_convert(convert::ALL).unwrap_err(),
        CBORError::FloatException
    );
    let buf = [0xf9, 0x7c, 0x00];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(
        decoder.get_int64_convert(convert::ALL).unwrap_err(),
        CBORError::FloatException
    );
}

#[cfg(feature = "float")]
#[test]
fn double_from_integers() {
    let mut decoder = decoder_with_tags(&[0x18, 0x2a]);
    assert_eq!(decoder.get_double_convert(convert::ALL).unwrap(), 42.0);

    let mut decoder = decoder_with_tags(&[0x20]);
    assert_eq!(decoder.get_double_convert(convert::ALL).unwrap(), -1.0);
}

/***************************************************************************************************
 * Big numbers
 **************************************************************************************************/

#[test]
fn int64_from_big_numbers() {
    // 2(h'010000') = 65536
    let mut decoder = decoder_with_tags(&[0xc2, 0x43, 0x01, 0x00, 0x00]);
    assert_eq!(decoder.get_int64_convert(convert::ALL).unwrap(), 65536);

    // 3(h'18') = -25
    let mut decoder = decoder_with_tags(&[0xc3, 0x41, 0x18]);
    assert_eq!(decoder.get_int64_convert(convert::ALL).unwrap(), -25);
}

#[test]
fn big_number_overflow_is_reported() {
    // 2(h'010000000000000000') = 2^64
    let buf = [
        0xc2, 0x49, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(
        decoder.get_uint64_convert(convert::ALL).unwrap_err(),
        CBORError::ConversionUnderOverFlow
    );
}

#[test]
fn leading_zeros_in_big_numbers_are_ignored() {
    // 2(h'000000000000000000002A') = 42
    let buf = [
        0xc2, 0x4b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2a,
    ];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(decoder.get_uint64_convert(convert::ALL).unwrap(), 42);
}

#[test]
fn get_big_num_returns_sign_and_magnitude() {
    let mut decoder = decoder_with_tags(&[0xc3, 0x42, 0x01, 0x02]);
    let (negative, magnitude) = decoder.get_big_num().unwrap();
    assert!(negative);
    assert_eq!(magnitude.as_slice(), &[0x01, 0x02]);
}

/***************************************************************************************************
 * Decimal fractions and bigfloats
 **************************************************************************************************/

#[test]
fn int64_from_decimal_fraction() {
    // 4([2, 271]) = 27100
    let buf = [0xc4, 0x82, 0x02, 0x19, 0x01, 0x0f];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(
        decoder.get_int64_convert(convert::DECIMAL_FRACTION).unwrap(),
        27100
    );
}

#[test]
fn int64_from_bigfloat() {
    // 5([3, 21]) = 21 * 2^3 = 168
    let buf = [0xc5, 0x82, 0x03, 0x15];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(decoder.get_int64_convert(convert::BIGFLOAT).unwrap(), 168);
}

#[test]
fn negative_exponent_has_no_integer_form() {
    // 4([-2, 27315]) = 273.15
    let buf = [0xc4, 0x82, 0x21, 0x19, 0x6a, 0xb3];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(
        decoder.get_int64_convert(convert::ALL).unwrap_err(),
        CBORError::ConversionUnderOverFlow
    );
}

#[cfg(feature = "float")]
#[test]
fn double_from_decimal_fraction() {
    // 4([-2, 27315]) = 273.15
    let buf = [0xc4, 0x82, 0x21, 0x19, 0x6a, 0xb3];
    let mut decoder = decoder_with_tags(&buf);
    let value = decoder.get_double_convert(convert::ALL).unwrap();
    assert!((value - 273.15).abs() < 1e-9);
}

#[test]
fn exponentiation_overflow_is_detected() {
    // 4([20, 9223372036854775807])
    let buf = [
        0xc4, 0x82, 0x14, 0x1b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    ];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(
        decoder.get_int64_convert(convert::ALL).unwrap_err(),
        CBORError::ConversionUnderOverFlow
    );
}

#[test]
fn malformed_exp_and_mantissa_is_rejected() {
    // 4([1]) has only one element
    let buf = [0xc4, 0x81, 0x01];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(
        decoder.get_int64_convert(convert::ALL).unwrap_err(),
        CBORError::BadExpAndMantissa
    );
}

#[test]
fn decimal_fraction_with_bignum_mantissa() {
    // 4([1, 2(h'0100')]) = 256 * 10 = 2560
    let buf = [0xc4, 0x82, 0x01, 0xc2, 0x42, 0x01, 0x00];
    let mut decoder = decoder_with_tags(&buf);
    assert_eq!(decoder.get_int64_convert(convert::ALL).unwrap(), 2560);
}

/***************************************************************************************************
 * Conversions by label
 **************************************************************************************************/

#[test]
fn conversions_inside_a_map() {
    // {1: 42, 2: 3(h'18'), "t": 4([1, 5])}
    let buf = [
        0xa3, 0x01, 0x18, 0x2a, 0x02, 0xc3, 0x41, 0x18, 0x61, 0x74, 0xc4, 0x82, 0x01, 0x05,
    ];
    let mut decoder = decoder_with_tags(&buf);
    assert!(decoder.enter_map().is_ok());
    assert_eq!(
        decoder.get_int64_convert_in_map_n(1, convert::ALL).unwrap(),
        42
    );
    assert_eq!(
        decoder.get_int64_convert_in_map_n(2, convert::ALL).unwrap(),
        -25
    );
    assert_eq!(
        decoder
            .get_int64_convert_in_map_sz("t", convert::ALL)
            .unwrap(),
        50
    );
    assert_eq!(
        decoder.get_uint64_convert_in_map_n(1, convert::ALL).unwrap(),
        42
    );
    assert!(decoder.exit_map().is_ok());
    assert!(decoder.finish().is_ok());
}
