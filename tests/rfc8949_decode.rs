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
 * Test cases from RFC8949, Appendix A, decoded through the traversal decoder.
 **************************************************************************************************/

extern crate tps_streamcbor;

use tps_streamcbor::decoder::{CBORDecoder, DecodeMode};
use tps_streamcbor::error::CBORError;
use tps_streamcbor::types::Value;

fn decode_single(buf: &[u8]) -> Value<'_> {
    let mut decoder = CBORDecoder::new(buf, DecodeMode::Normal);
    let item = decoder.get_next().expect("well-formed input");
    item.value
}

fn decode_single_err(buf: &[u8]) -> CBORError {
    let mut decoder = CBORDecoder::new(buf, DecodeMode::Normal);
    decoder.get_next().expect_err("malformed input")
}

#[test]
fn rfc8949_positive_integers() {
    assert_eq!(decode_single(&[0x00]), Value::Int64(0));
    assert_eq!(decode_single(&[0x01]), Value::Int64(1));
    assert_eq!(decode_single(&[0x0a]), Value::Int64(10));
    assert_eq!(decode_single(&[0x17]), Value::Int64(23));
    assert_eq!(decode_single(&[0x18, 0x18]), Value::Int64(24));
    assert_eq!(decode_single(&[0x18, 0x19]), Value::Int64(25));
    assert_eq!(decode_single(&[0x18, 0x64]), Value::Int64(100));
    assert_eq!(decode_single(&[0x19, 0x03, 0xe8]), Value::Int64(1000));
    assert_eq!(
        decode_single(&[0x1a, 0x00, 0x0f, 0x42, 0x40]),
        Value::Int64(1000000)
    );
    assert_eq!(
        decode_single(&[0x1b, 0x00, 0x00, 0x00, 0xe8, 0xd4, 0xa5, 0x10, 0x00]),
        Value::Int64(1000000000000)
    );
    // Values above i64::MAX surface as unsigned
    assert_eq!(
        decode_single(&[0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]),
        Value::UInt64(18446744073709551615)
    );
}

#[test]
fn rfc8949_negative_integers() {
    assert_eq!(decode_single(&[0x20]), Value::Int64(-1));
    assert_eq!(decode_single(&[0x29]), Value::Int64(-10));
    assert_eq!(decode_single(&[0x38, 0x63]), Value::Int64(-100));
    assert_eq!(decode_single(&[0x39, 0x03, 0xe7]), Value::Int64(-1000));
    assert_eq!(
        decode_single(&[0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]),
        Value::Int64(i64::MIN)
    );
    // -18446744073709551616 needs the 65-bit negative representation
    assert_eq!(
        decode_single(&[0x3b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]),
        Value::NegInt65(18446744073709551615)
    );
}

#[test]
fn rfc8949_simple_values() {
    assert_eq!(decode_single(&[0xf4]), Value::False);
    assert_eq!(decode_single(&[0xf5]), Value::True);
    assert_eq!(decode_single(&[0xf6]), Value::Null);
    assert_eq!(decode_single(&[0xf7]), Value::Undefined);
    assert_eq!(decode_single(&[0xf0]), Value::Simple(16));
    assert_eq!(decode_single(&[0xf8, 0xff]), Value::Simple(255));
    // Simple values below 32 must be encoded directly in the AI bits
    assert_eq!(decode_single_err(&[0xf8, 0x18]), CBORError::BadType7);
}

#[test]
fn rfc8949_strings() {
    match decode_single(&[0x40]) {
        Value::ByteString(b) => assert!(b.is_empty()),
        other => panic!("expected byte string, got {:?}", other),
    }
    match decode_single(&[0x44, 0x01, 0x02, 0x03, 0x04]) {
        Value::ByteString(b) => {
            assert_eq!(b.as_slice(), &[1, 2, 3, 4]);
            assert!(!b.is_allocated());
        }
        other => panic!("expected byte string, got {:?}", other),
    }
    match decode_single(&[0x60]) {
        Value::TextString(t) => assert_eq!(t.as_str(), ""),
        other => panic!("expected text string, got {:?}", other),
    }
    match decode_single(&[0x64, 0x49, 0x45, 0x54, 0x46]) {
        Value::TextString(t) => assert_eq!(t.as_str(), "IETF"),
        other => panic!("expected text string, got {:?}", other),
    }
    // "\u{00fc}"
    match decode_single(&[0x62, 0xc3, 0xbc]) {
        Value::TextString(t) => assert_eq!(t.as_str(), "\u{00fc}"),
        other => panic!("expected text string, got {:?}", other),
    }
    // Truncated UTF-8 is rejected at decode time
    assert_eq!(decode_single_err(&[0x61, 0xc3]), CBORError::BadUtf8);
}

#[test]
fn rfc8949_arrays_and_maps() {
    assert_eq!(decode_single(&[0x80]), Value::Array(0));
    assert_eq!(decode_single(&[0x83, 0x01, 0x02, 0x03]), Value::Array(3));
    assert_eq!(decode_single(&[0xa0]), Value::Map(0));
    assert_eq!(
        decode_single(&[0xa2, 0x01, 0x02, 0x03, 0x04]),
        Value::Map(2)
    );
    // [1, [2, 3], [4, 5]]
    let buf = [0x83, 0x01, 0x82, 0x02, 0x03, 0x82, 0x04, 0x05];
    let mut decoder = CBORDecoder::new(&buf, DecodeMode::Normal);
    assert_eq!(decoder.get_next().unwrap().value, Value::Array(3));
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(1));
    assert_eq!(decoder.get_next().unwrap().value, Value::Array(2));
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(2));
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(3));
    assert_eq!(decoder.get_next().unwrap().value, Value::Array(2));
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(4));
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(5));
    assert!(decoder.finish().is_ok());
}

#[test]
fn rfc8949_map_labels() {
    // {"a": 1, "b": [2, 3]}
    let buf = [0xa2, 0x61, 0x61, 0x01, 0x61, 0x62, 0x82, 0x02, 0x03];
    let mut decoder = CBORDecoder::new(&buf, DecodeMode::Normal);
    assert_eq!(decoder.get_next().unwrap().value, Value::Map(2));
    let first = decoder.get_next().unwrap();
    assert_eq!(first.value, Value::Int64(1));
    match first.label {
        tps_streamcbor::types::Label::TextString(t) => assert_eq!(t.as_str(), "a"),
        other => panic!("expected text label, got {:?}", other),
    }
    let second = decoder.get_next().unwrap();
    assert_eq!(second.value, Value::Array(2));
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(2));
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(3));
    assert!(decoder.finish().is_ok());
}

#[cfg(all(feature = "float", feature = "half-float"))]
#[test]
fn rfc8949_floats() {
    assert_eq!(decode_single(&[0xf9, 0x00, 0x00]), Value::Double(0.0));
    assert_eq!(decode_single(&[0xf9, 0x3c, 0x00]), Value::Double(1.0));
    assert_eq!(decode_single(&[0xf9, 0x3e, 0x00]), Value::Double(1.5));
    assert_eq!(decode_single(&[0xf9, 0x7b, 0xff]), Value::Double(65504.0));
    assert_eq!(decode_single(&[0xf9, 0xc4, 0x00]), Value::Double(-4.0));
    assert_eq!(
        decode_single(&[0xfa, 0x47, 0xc3, 0x50, 0x00]),
        Value::Float(100000.0)
    );
    assert_eq!(
        decode_single(&[0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9a]),
        Value::Double(1.1)
    );
    assert_eq!(
        decode_single(&[0xf9, 0x7c, 0x00]),
        Value::Double(f64::INFINITY)
    );
    match decode_single(&[0xf9, 0x7e, 0x00]) {
        Value::Double(d) => assert!(d.is_nan()),
        other => panic!("expected NaN, got {:?}", other),
    }
}

#[cfg(not(feature = "float"))]
#[test]
fn floats_disabled_without_float_feature() {
    assert_eq!(
        decode_single_err(&[0xf9, 0x3c, 0x00]),
        CBORError::AllFloatDisabled
    );
    assert_eq!(
        decode_single_err(&[0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9a]),
        CBORError::AllFloatDisabled
    );
}

#[test]
fn rfc8949_reserved_additional_information() {
    assert_eq!(decode_single_err(&[0x1c]), CBORError::Unsupported);
    assert_eq!(decode_single_err(&[0x1d]), CBORError::Unsupported);
    assert_eq!(decode_single_err(&[0x1e]), CBORError::Unsupported);
    assert_eq!(decode_single_err(&[0x3c]), CBORError::Unsupported);
}

#[test]
fn rfc8949_truncated_input() {
    assert_eq!(decode_single_err(&[0x18]), CBORError::HitEnd);
    assert_eq!(decode_single_err(&[0x19, 0x03]), CBORError::HitEnd);
    assert_eq!(decode_single_err(&[0x44, 0x01, 0x02]), CBORError::HitEnd);
    assert_eq!(
        decode_single_err(&[0x1b, 0x00, 0x00, 0x00]),
        CBORError::HitEnd
    );
}

#[test]
fn rfc8949_misplaced_break() {
    assert_eq!(decode_single_err(&[0xff]), CBORError::BadBreak);
    // Break inside a definite-length array
    let buf = [0x82, 0x01, 0xff];
    let mut decoder = CBORDecoder::new(&buf, DecodeMode::Normal);
    assert_eq!(decoder.get_next().unwrap().value, Value::Array(2));
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(1));
    assert_eq!(decoder.get_next().unwrap_err(), CBORError::BadBreak);
}

#[test]
fn rfc8949_indefinite_integer_forms_rejected() {
    assert_eq!(decode_single_err(&[0x1f]), CBORError::BadInt);
    assert_eq!(decode_single_err(&[0x3f]), CBORError::BadInt);
    assert_eq!(decode_single_err(&[0xdf, 0x01]), CBORError::BadInt);
}
