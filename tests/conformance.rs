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
 * Preferred-serialization, CDE and dCBOR conformance checking.
 **************************************************************************************************/

extern crate tps_streamcbor;

use tps_streamcbor::decoder::{CBORDecoder, DecodeMode};
use tps_streamcbor::error::CBORError;
use tps_streamcbor::types::Value;

fn first_error(buf: &[u8], mode: DecodeMode) -> CBORError {
    let mut decoder = CBORDecoder::new(buf, mode);
    loop {
        match decoder.get_next() {
            Ok(_) => (),
            Err(e) => return e,
        }
    }
}

/***************************************************************************************************
 * Preferred serialization
 **************************************************************************************************/

#[test]
fn preferred_rejects_overlong_arguments() {
    // 23 encoded with a one-byte argument
    assert_eq!(
        first_error(&[0x18, 0x17], DecodeMode::Preferred),
        CBORError::PreferredConformance
    );
    // 255 encoded with a two-byte argument
    assert_eq!(
        first_error(&[0x19, 0x00, 0xff], DecodeMode::Preferred),
        CBORError::PreferredConformance
    );
    // 65535 encoded with a four-byte argument
    assert_eq!(
        first_error(&[0x1a, 0x00, 0x00, 0xff, 0xff], DecodeMode::Preferred),
        CBORError::PreferredConformance
    );
    // String length in overlong form
    assert_eq!(
        first_error(&[0x58, 0x01, 0x41], DecodeMode::Preferred),
        CBORError::PreferredConformance
    );
}

#[test]
fn preferred_accepts_minimal_arguments() {
    let mut decoder = CBORDecoder::new(&[0x18, 0x18], DecodeMode::Preferred);
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(24));
    let mut decoder = CBORDecoder::new(&[0x19, 0x01, 0x00], DecodeMode::Preferred);
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(256));
}

#[test]
fn preferred_rejects_indefinite_lengths() {
    assert_eq!(
        first_error(&[0x9f, 0x01, 0xff], DecodeMode::Preferred),
        CBORError::PreferredConformance
    );
    assert_eq!(
        first_error(&[0xbf, 0x01, 0x02, 0xff], DecodeMode::Preferred),
        CBORError::PreferredConformance
    );
    assert_eq!(
        first_error(&[0x7f, 0x61, 0x48, 0xff], DecodeMode::Preferred),
        CBORError::PreferredConformance
    );
}

#[test]
fn normal_mode_accepts_overlong_arguments() {
    let mut decoder = CBORDecoder::new(&[0x18, 0x17], DecodeMode::Normal);
    assert_eq!(decoder.get_next().unwrap().value, Value::Int64(23));
}

/***************************************************************************************************
 * CDE map ordering
 **************************************************************************************************/

#[test]
fn cde_rejects_unsorted_map_labels() {
    // {2: "B", 1: "A"}: label 2 sorts after label 1
    let buf = [0xa2, 0x02, 0x61, 0x42, 0x01, 0x61, 0x41];
    assert_eq!(first_error(&buf, DecodeMode::CDE), CBORError::Unsorted);
}

#[test]
fn normal_mode_accepts_unsorted_map_labels() {
    let buf = [0xa2, 0x02, 0x61, 0x42, 0x01, 0x61, 0x41];
    let mut decoder = CBORDecoder::new(&buf, DecodeMode::Normal);
    assert!(decoder.enter_map().is_ok());
    assert_eq!(decoder.get_text_in_map_n(1).unwrap().as_str(), "A");
    assert_eq!(decoder.get_text_in_map_n(2).unwrap().as_str(), "B");
    assert!(decoder.exit_map().is_ok());
    assert!(decoder.finish().is_ok());
}

#[test]
fn cde_rejects_duplicate_map_labels() {
    // {1: 2, 1: 3}
    let buf = [0xa2, 0x01, 0x02, 0x01, 0x03];
    assert_eq!(first_error(&buf, DecodeMode::CDE), CBORError::DuplicateLabel);
}

#[test]
fn cde_accepts_sorted_unique_labels() {
    // {1: 2, 2: 3, "a": 4}: integer labels sort before the longer text label
    let buf = [0xa3, 0x01, 0x02, 0x02, 0x03, 0x61, 0x61, 0x04];
    let mut decoder = CBORDecoder::new(&buf, DecodeMode::CDE);
    assert_eq!(decoder.get_next().unwrap().value, Value::Map(3));
    for _ in 0..3 {
        assert!(decoder.get_next().is_ok());
    }
    assert!(decoder.finish().is_ok());
}

#[test]
fn cde_checks_nested_maps() {
    // [{2: 1, 1: 1}]
    let buf = [0x81, 0xa2, 0x02, 0x01, 0x01, 0x01];
    let mut decoder = CBORDecoder::new(&buf, DecodeMode::CDE);
    assert_eq!(decoder.get_next().unwrap().value, Value::Array(1));
    assert_eq!(decoder.get_next().unwrap_err(), CBORError::Unsorted);
}

/***************************************************************************************************
 * dCBOR numeric and simple-value rules
 **************************************************************************************************/

#[test]
fn dcbor_rejects_undefined() {
    assert_eq!(
        first_error(&[0xf7], DecodeMode::DCBor),
        CBORError::DCBorConformance
    );
}

#[test]
fn dcbor_rejects_unassigned_simple_values() {
    assert_eq!(
        first_error(&[0xf0], DecodeMode::DCBor),
        CBORError::DCBorConformance
    );
    assert_eq!(
        first_error(&[0xf8, 0x20], DecodeMode::DCBor),
        CBORError::DCBorConformance
    );
}

#[test]
fn dcbor_accepts_the_basic_simple_values() {
    let mut decoder = CBORDecoder::new(&[0xf4, 0xf5, 0xf6], DecodeMode::DCBor);
    assert_eq!(decoder.get_next().unwrap().value, Value::False);
    assert_eq!(decoder.get_next().unwrap().value, Value::True);
    assert_eq!(decoder.get_next().unwrap().value, Value::Null);
}

#[cfg(all(feature = "float", feature = "half-float"))]
#[test]
fn dcbor_rejects_integral_floats() {
    // 1.0 as a double must have been encoded as the integer 1
    assert_eq!(
        first_error(
            &[0xfb, 0x3f, 0xf0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            DecodeMode::DCBor
        ),
        CBORError::DCBorConformance
    );
    // 2.0 as a half
    assert_eq!(
        first_error(&[0xf9, 0x40, 0x00], DecodeMode::DCBor),
        CBORError::DCBorConformance
    );
}

#[cfg(feature = "float")]
#[test]
fn dcbor_rejects_floats_with_a_shorter_form() {
    // 1.5 as a double fits a half exactly
    assert_eq!(
        first_error(
            &[0xfb, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            DecodeMode::DCBor
        ),
        CBORError::DCBorConformance
    );
}

#[cfg(all(feature = "float", feature = "half-float"))]
#[test]
fn dcbor_rejects_nan_payloads() {
    // Half NaN with a nonzero payload
    assert_eq!(
        first_error(&[0xf9, 0x7e, 0x01], DecodeMode::DCBor),
        CBORError::DCBorConformance
    );
    // Any wider NaN should have been the canonical half NaN
    assert_eq!(
        first_error(
            &[0xfb, 0x7f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            DecodeMode::DCBor
        ),
        CBORError::DCBorConformance
    );
}

#[cfg(all(feature = "float", feature = "half-float"))]
#[test]
fn dcbor_accepts_the_canonical_nan_and_fractional_doubles() {
    let mut decoder = CBORDecoder::new(&[0xf9, 0x7e, 0x00], DecodeMode::DCBor);
    match decoder.get_next().unwrap().value {
        Value::Double(d) => assert!(d.is_nan()),
        other => panic!("expected NaN, got {:?}", other),
    }
    // 1.1 has no shorter exact form and is not integral
    let mut decoder = CBORDecoder::new(
        &[0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9a],
        DecodeMode::DCBor,
    );
    assert_eq!(decoder.get_next().unwrap().value, Value::Double(1.1));
}

#[test]
fn conformance_errors_are_recoverable() {
    assert!(CBORError::PreferredConformance.is_recoverable());
    assert!(CBORError::DCBorConformance.is_recoverable());
    assert!(CBORError::Unsorted.is_recoverable());
}
