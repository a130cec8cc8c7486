//! Numeric codec tests: reference values plus property-based round trips.

use scs_rs::payload::bcd::*;

#[test]
fn test_fixed_bcd_energy_register() {
    let bytes = [0x00, 0x12, 0x34, 0x56, 0x78, 0x90, 0x00];
    assert_eq!(fixed_bcd_to_string(&bytes, 4), "1234.56789000");
    assert!((fixed_bcd_to_float(&bytes, 4) - 1234.56789).abs() < 1e-9);
}

#[test]
fn test_floating_bcd_point_position() {
    // High nibble 3: three decimals
    assert_eq!(floating_bcd_to_string(&[0x30, 0x01, 0x23, 0x45], 4), "12.345");
    // High nibble 0: integer
    assert_eq!(floating_bcd_to_string(&[0x00, 0x01, 0x23, 0x45], 4), "12345");
    assert_eq!(string_to_floating_bcd("12.345", 4), Some(vec![0x30, 0x01, 0x23, 0x45]));
}

#[test]
fn test_signed_int_reassembly() {
    assert_eq!(bytes_to_signed_int(&[0x7F]), 127);
    assert_eq!(bytes_to_signed_int(&[0xFF]), -1);
    assert_eq!(bytes_to_signed_int(&[0x01, 0x00]), 256);
    assert_eq!(bytes_to_signed_int(&[0xFF, 0xFE]), -2);
    assert_eq!(bytes_to_signed_int(&[0x12, 0x34, 0x56, 0x78]), 0x1234_5678);
}

#[test]
fn test_reordered_float_reference() {
    // 1.0f32 is 0x3F800000, stored high byte first
    assert_eq!(reorder_and_read_float(&[0x3F, 0x80, 0x00, 0x00]), 1.0);
    assert_eq!(float_to_reordered_bytes(-2.5), [0xC0, 0x20, 0x00, 0x00]);
}

mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_int_bcd_round_trip(value in 0u32..100_000_000) {
            prop_assert_eq!(bcd_to_int(&int_to_bcd(value, 4)), value);
        }

        #[test]
        fn prop_byte_bcd_round_trip(value in 0u8..100) {
            prop_assert_eq!(bcd_to_byte(byte_to_bcd(value)), value);
        }

        #[test]
        fn prop_fixed_bcd_round_trip(cents in 0u64..10_000_000_000) {
            let value = cents as f64 / 100.0;
            let bytes = float_to_fixed_bcd(value, 7, 1);
            prop_assert!((fixed_bcd_to_float(&bytes, 1) - value).abs() < 0.005);
        }

        #[test]
        fn prop_floating_bcd_round_trip(int_part in 0u32..10_000, frac in 0u32..1000) {
            let text = format!("{int_part}.{frac:03}");
            let bytes = string_to_floating_bcd(&text, 4).unwrap();
            let decoded: f64 = floating_bcd_to_string(&bytes, 4).parse().unwrap();
            let expected: f64 = text.parse().unwrap();
            prop_assert!((decoded - expected).abs() < 1e-6);
        }

        #[test]
        fn prop_float_reorder_is_involution(bytes in any::<[u8; 4]>()) {
            prop_assert_eq!(reorder_float_bytes(reorder_float_bytes(bytes)), bytes);
        }

        #[test]
        fn prop_reordered_float_round_trip(value in -1.0e6f32..1.0e6f32) {
            prop_assert_eq!(reorder_and_read_float(&float_to_reordered_bytes(value)), value);
        }
    }
}
