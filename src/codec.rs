//! Conversion between typed values and raw register byte spans.
//!
//! The canonical layout is the big-endian image of a value across its
//! registers. The four byte/word-order combinations are transforms of that
//! image, and every transform is its own inverse, so encoding and decoding
//! share them.

use crate::address::{ByteOrder, Modifiers, WordOrder};
use crate::error::{InternalError, TagError};
use crate::types::{DataType, Value};

/// Decode a register byte span into a typed value
///
/// `bytes` must be exactly `data_type.register_count() * 2` bytes long.
pub fn decode(bytes: &[u8], data_type: &DataType, modifiers: Modifiers) -> Result<Value, TagError> {
    check_span(bytes, data_type)?;

    match data_type {
        DataType::Bit { underlying, bit } => {
            let value = decode(bytes, underlying, modifiers)?;
            match value.as_i64() {
                // indices >= 64 alias into 0-63 via the shift's modular behavior
                Some(v) => Ok(Value::Bool(v & 1i64.wrapping_shl(*bit) != 0)),
                None => {
                    Err(InternalError::BitUnderlyingNotNumeric((**underlying).clone()).into())
                }
            }
        }
        DataType::Bool => Ok(Value::Bool(u16::from_be_bytes(canonical(bytes, modifiers)) != 0)),
        DataType::Int16 => Ok(Value::Int16(i16::from_be_bytes(canonical(bytes, modifiers)))),
        DataType::UInt16 => Ok(Value::UInt16(u16::from_be_bytes(canonical(bytes, modifiers)))),
        DataType::Int32 => Ok(Value::Int32(i32::from_be_bytes(canonical(bytes, modifiers)))),
        DataType::UInt32 => Ok(Value::UInt32(u32::from_be_bytes(canonical(bytes, modifiers)))),
        DataType::Int64 => Ok(Value::Int64(i64::from_be_bytes(canonical(bytes, modifiers)))),
        DataType::UInt64 => Ok(Value::UInt64(u64::from_be_bytes(canonical(bytes, modifiers)))),
        DataType::Float32 => Ok(Value::Float32(f32::from_be_bytes(canonical(
            bytes, modifiers,
        )))),
        DataType::Float64 => Ok(Value::Float64(f64::from_be_bytes(canonical(
            bytes, modifiers,
        )))),
        // strings bypass the layout transforms; read up to the first NUL
        DataType::String(length) => {
            let text = &bytes[..(*length).min(bytes.len())];
            let text = match text.iter().position(|b| *b == 0) {
                Some(nul) => &text[..nul],
                None => text,
            };
            Ok(Value::String(String::from_utf8_lossy(text).into_owned()))
        }
    }
}

/// Encode a typed value into a register byte span
///
/// The value's domain is checked against the data type before any bytes are
/// produced; a mismatch is a [TagError::TypeMismatch]. Bit projections cannot
/// be encoded directly; they are written through the translation layer's
/// read-modify-write.
pub fn encode(value: &Value, data_type: &DataType, modifiers: Modifiers) -> Result<Vec<u8>, TagError> {
    if let DataType::Bit { .. } = data_type {
        return Err(InternalError::DirectBitEncode.into());
    }

    data_type.check(value)?;

    let bytes = match (data_type, value) {
        (DataType::Bool, Value::Bool(v)) => laid_out(u16::from(*v).to_be_bytes(), modifiers),
        (DataType::Int16, Value::Int16(v)) => laid_out(v.to_be_bytes(), modifiers),
        (DataType::UInt16, Value::UInt16(v)) => laid_out(v.to_be_bytes(), modifiers),
        (DataType::Int32, Value::Int32(v)) => laid_out(v.to_be_bytes(), modifiers),
        (DataType::UInt32, Value::UInt32(v)) => laid_out(v.to_be_bytes(), modifiers),
        (DataType::Int64, Value::Int64(v)) => laid_out(v.to_be_bytes(), modifiers),
        (DataType::UInt64, Value::UInt64(v)) => laid_out(v.to_be_bytes(), modifiers),
        (DataType::Float32, Value::Float32(v)) => laid_out(v.to_be_bytes(), modifiers),
        (DataType::Float64, Value::Float64(v)) => laid_out(v.to_be_bytes(), modifiers),
        // truncate or zero-pad to the declared byte width, no layout transform
        (DataType::String(length), Value::String(v)) => {
            let width = data_type.register_count() * 2;
            let mut bytes = vec![0u8; width];
            let text = v.as_bytes();
            let copied = text.len().min(*length).min(width);
            bytes[..copied].copy_from_slice(&text[..copied]);
            bytes
        }
        // check() above makes any other combination unreachable
        _ => return Err(TagError::TypeMismatch),
    };

    Ok(bytes)
}

fn check_span(bytes: &[u8], data_type: &DataType) -> Result<(), TagError> {
    let expected = data_type.register_count() * 2;
    if bytes.len() != expected {
        return Err(InternalError::BadSpanLength {
            expected,
            actual: bytes.len(),
        }
        .into());
    }
    Ok(())
}

fn canonical<const N: usize>(bytes: &[u8], modifiers: Modifiers) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[..N]);
    apply_layout(&mut buf, modifiers);
    buf
}

fn laid_out<const N: usize>(mut bytes: [u8; N], modifiers: Modifiers) -> Vec<u8> {
    apply_layout(&mut bytes, modifiers);
    bytes.to_vec()
}

/// transform between the canonical big-endian image and the selected layout
fn apply_layout(bytes: &mut [u8], modifiers: Modifiers) {
    match modifiers.resolve() {
        (ByteOrder::Big, WordOrder::HighFirst) => {}
        (ByteOrder::Big, WordOrder::LowFirst) => reverse_words(bytes),
        (ByteOrder::Little, WordOrder::HighFirst) => bytes.reverse(),
        (ByteOrder::Little, WordOrder::LowFirst) => swap_word_bytes(bytes),
    }
}

fn reverse_words(bytes: &mut [u8]) {
    let words = bytes.len() / 2;
    for i in 0..words / 2 {
        let j = words - 1 - i;
        bytes.swap(2 * i, 2 * j);
        bytes.swap(2 * i + 1, 2 * j + 1);
    }
}

fn swap_word_bytes(bytes: &mut [u8]) {
    for word in bytes.chunks_exact_mut(2) {
        word.swap(0, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_layouts() -> [Modifiers; 4] {
        [
            Modifiers::default(),
            Modifiers::byte_order(ByteOrder::Big).with_word_order(WordOrder::LowFirst),
            Modifiers::byte_order(ByteOrder::Little),
            Modifiers::byte_order(ByteOrder::Little).with_word_order(WordOrder::LowFirst),
        ]
    }

    #[test]
    fn float_big_endian_high_first_matches_known_byte_pattern() {
        let bytes = encode(&Value::Float32(1.234), &DataType::Float32, Modifiers::default())
            .unwrap();
        assert_eq!(bytes, [0x3F, 0x9D, 0xF3, 0xB6]);
        assert_eq!(
            decode(&bytes, &DataType::Float32, Modifiers::default()).unwrap(),
            Value::Float32(1.234)
        );
    }

    #[test]
    fn double_big_endian_round_trips_exactly() {
        let bytes = encode(&Value::Float64(1.234), &DataType::Float64, Modifiers::default())
            .unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(
            decode(&bytes, &DataType::Float64, Modifiers::default()).unwrap(),
            Value::Float64(1.234)
        );
    }

    #[test]
    fn int32_byte_layout_under_each_combination() {
        let value = Value::Int32(0x1234_5678);

        let cases: [(Modifiers, [u8; 4]); 4] = [
            (Modifiers::default(), [0x12, 0x34, 0x56, 0x78]),
            (
                Modifiers::word_order(WordOrder::LowFirst),
                [0x56, 0x78, 0x12, 0x34],
            ),
            (
                Modifiers::byte_order(ByteOrder::Little),
                [0x78, 0x56, 0x34, 0x12],
            ),
            (
                Modifiers::byte_order(ByteOrder::Little).with_word_order(WordOrder::LowFirst),
                [0x34, 0x12, 0x78, 0x56],
            ),
        ];

        for (modifiers, expected) in cases {
            let bytes = encode(&value, &DataType::Int32, modifiers).unwrap();
            assert_eq!(bytes, expected, "modifiers: {modifiers:?}");
            assert_eq!(
                decode(&bytes, &DataType::Int32, modifiers).unwrap(),
                value,
                "modifiers: {modifiers:?}"
            );
        }
    }

    #[test]
    fn word_order_does_not_affect_single_register_types() {
        let hl = encode(&Value::Int16(-2), &DataType::Int16, Modifiers::default()).unwrap();
        let lh = encode(
            &Value::Int16(-2),
            &DataType::Int16,
            Modifiers::word_order(WordOrder::LowFirst),
        )
        .unwrap();
        assert_eq!(hl, [0xFF, 0xFE]);
        assert_eq!(lh, [0xFF, 0xFE]);
    }

    #[test]
    fn signed_negatives_round_trip_under_every_layout() {
        for modifiers in all_layouts() {
            for value in [
                Value::Int16(-1),
                Value::Int32(-123_456),
                Value::Int64(-1_234_567_890_123),
                Value::Float32(-1.5),
                Value::Float64(-2.25),
                Value::UInt64(u64::MAX),
            ] {
                let data_type = match value {
                    Value::Int16(_) => DataType::Int16,
                    Value::Int32(_) => DataType::Int32,
                    Value::Int64(_) => DataType::Int64,
                    Value::Float32(_) => DataType::Float32,
                    Value::Float64(_) => DataType::Float64,
                    Value::UInt64(_) => DataType::UInt64,
                    _ => unreachable!(),
                };
                let bytes = encode(&value, &data_type, modifiers).unwrap();
                assert_eq!(
                    decode(&bytes, &data_type, modifiers).unwrap(),
                    value,
                    "modifiers: {modifiers:?}"
                );
            }
        }
    }

    #[test]
    fn bool_encodes_as_one_register() {
        let bytes = encode(&Value::Bool(true), &DataType::Bool, Modifiers::default()).unwrap();
        assert_eq!(bytes, [0x00, 0x01]);
        assert_eq!(
            decode(&bytes, &DataType::Bool, Modifiers::default()).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            decode(&[0x00, 0x00], &DataType::Bool, Modifiers::default()).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn string_encode_pads_and_truncates_to_the_declared_length() {
        let dt = DataType::String(4);

        let bytes = encode(&Value::String("a".to_string()), &dt, Modifiers::default()).unwrap();
        assert_eq!(bytes, [0x61, 0x00, 0x00, 0x00]);

        let bytes = encode(&Value::String("abcdef".to_string()), &dt, Modifiers::default())
            .unwrap();
        assert_eq!(bytes, [0x61, 0x62, 0x63, 0x64]);
    }

    #[test]
    fn string_decode_stops_at_the_first_nul() {
        let dt = DataType::String(4);
        assert_eq!(
            decode(&[0x61, 0x00, 0x62, 0x00], &dt, Modifiers::default()).unwrap(),
            Value::String("a".to_string())
        );
        assert_eq!(
            decode(&[0x61, 0x62, 0x63, 0x64], &dt, Modifiers::default()).unwrap(),
            Value::String("abcd".to_string())
        );
    }

    #[test]
    fn odd_string_length_reads_only_the_declared_bytes() {
        let dt = DataType::String(3);
        assert_eq!(dt.register_count(), 2);
        assert_eq!(
            decode(&[0x61, 0x62, 0x63, 0x64], &dt, Modifiers::default()).unwrap(),
            Value::String("abc".to_string())
        );
    }

    #[test]
    fn bit_decode_tests_the_selected_bit_of_the_underlying_value() {
        let dt = |bit| DataType::Bit {
            underlying: Box::new(DataType::UInt16),
            bit,
        };
        let bytes = [0x00, 0x05];
        assert_eq!(decode(&bytes, &dt(0), Modifiers::default()).unwrap(), Value::Bool(true));
        assert_eq!(decode(&bytes, &dt(1), Modifiers::default()).unwrap(), Value::Bool(false));
        assert_eq!(decode(&bytes, &dt(2), Modifiers::default()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn bit_indices_at_or_beyond_64_alias_into_the_low_bits() {
        let dt = |bit| DataType::Bit {
            underlying: Box::new(DataType::UInt16),
            bit,
        };
        let bytes = [0x00, 0x01];
        // 64 aliases to 0, 65 to 1
        assert_eq!(decode(&bytes, &dt(64), Modifiers::default()).unwrap(), Value::Bool(true));
        assert_eq!(decode(&bytes, &dt(65), Modifiers::default()).unwrap(), Value::Bool(false));
    }

    #[test]
    fn bit_indices_beyond_a_narrow_type_read_the_widened_value() {
        // -1 as int16 widens to 64 set bits, so bit 40 reads as true
        let dt = DataType::Bit {
            underlying: Box::new(DataType::Int16),
            bit: 40,
        };
        assert_eq!(
            decode(&[0xFF, 0xFF], &dt, Modifiers::default()).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn bit_decode_over_a_float_truncates_toward_zero() {
        let bytes = encode(&Value::Float32(1.9), &DataType::Float32, Modifiers::default())
            .unwrap();
        let dt = DataType::Bit {
            underlying: Box::new(DataType::Float32),
            bit: 0,
        };
        // 1.9 truncates to 1, bit 0 is set
        assert_eq!(decode(&bytes, &dt, Modifiers::default()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn bit_decode_over_bool_or_string_is_an_internal_error() {
        let over_bool = DataType::Bit {
            underlying: Box::new(DataType::Bool),
            bit: 0,
        };
        assert!(matches!(
            decode(&[0x00, 0x01], &over_bool, Modifiers::default()),
            Err(TagError::Internal(InternalError::BitUnderlyingNotNumeric(_)))
        ));

        let over_string = DataType::Bit {
            underlying: Box::new(DataType::String(2)),
            bit: 0,
        };
        assert!(matches!(
            decode(&[0x61, 0x62], &over_string, Modifiers::default()),
            Err(TagError::Internal(InternalError::BitUnderlyingNotNumeric(_)))
        ));
    }

    #[test]
    fn encoding_a_bit_projection_directly_is_an_internal_error() {
        let dt = DataType::Bit {
            underlying: Box::new(DataType::Int32),
            bit: 3,
        };
        assert_eq!(
            encode(&Value::Bool(true), &dt, Modifiers::default()),
            Err(TagError::Internal(InternalError::DirectBitEncode))
        );
    }

    #[test]
    fn type_mismatch_is_reported_before_any_bytes_are_produced() {
        assert_eq!(
            encode(&Value::UInt16(1), &DataType::Int16, Modifiers::default()),
            Err(TagError::TypeMismatch)
        );
        assert_eq!(
            encode(
                &Value::String("x".to_string()),
                &DataType::Float64,
                Modifiers::default()
            ),
            Err(TagError::TypeMismatch)
        );
    }

    #[test]
    fn wrong_span_length_is_an_internal_error() {
        assert!(matches!(
            decode(&[0x00], &DataType::Int16, Modifiers::default()),
            Err(TagError::Internal(InternalError::BadSpanLength { .. }))
        ));
    }
}
