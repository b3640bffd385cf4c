//! Property-based tests of the token amount codec
//!
//! Properties tested:
//! - Every decimal string with at most 18 fractional digits survives
//!   a parse/format/parse cycle with the exact same scaled integer
//! - Formatting is canonical: the formatted string of a parsed amount is
//!   the input without its insignificant zeros
//! - Any scaled integer formats to a string that parses back to itself

use alloy_primitives::U256;
use lir_common::amount::{format_coin, from_coin};
use proptest::prelude::*;

// Strip leading zeros of the integer part and trailing zeros of the fraction
fn canonical(integer: &str, fraction: &str) -> String {
    let integer = integer.trim_start_matches('0');
    let integer = if integer.is_empty() { "0" } else { integer };
    let fraction = fraction.trim_end_matches('0');
    let fraction = if fraction.is_empty() { "0" } else { fraction };
    format!("{}.{}", integer, fraction)
}

proptest! {
    #[test]
    fn test_decimal_string_roundtrip(
        integer in "[0-9]{1,30}",
        fraction in "[0-9]{0,18}",
    ) {
        let input = if fraction.is_empty() {
            integer.clone()
        } else {
            format!("{}.{}", integer, fraction)
        };

        let scaled = from_coin(&input).unwrap();
        let formatted = format_coin(scaled);

        prop_assert_eq!(&formatted, &canonical(&integer, &fraction));
        prop_assert_eq!(from_coin(&formatted).unwrap(), scaled);
    }
}

proptest! {
    #[test]
    fn test_scaled_integer_roundtrip(limbs in any::<[u64; 3]>()) {
        // 192 bits keeps the value far from the U256 limit
        let value = U256::from_limbs([limbs[0], limbs[1], limbs[2], 0]);
        let formatted = format_coin(value);
        prop_assert_eq!(from_coin(&formatted).unwrap(), value);
    }
}

#[test]
fn test_too_many_decimals_is_rejected() {
    // 19 significant fractional digits can't be represented
    assert!(from_coin("1.0000000000000000001").is_err());
}
