use alloy_primitives::{Address, AddressError};
use std::str::FromStr;

// Parse a 20 bytes hex address, the 0x prefix is optional
// A mixed-case input must match its EIP-55 checksum
pub fn parse_address(value: &str) -> Result<Address, AddressError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());

    if has_lower && has_upper {
        Address::parse_checksummed(format!("0x{}", digits), None)
    } else {
        Ok(Address::from_str(digits)?)
    }
}

// Shortened checksum form for display: 0x1234...abcd
pub fn shorten_address(address: &Address) -> String {
    let checksum = address.to_checksum(None);
    format!("{}...{}", &checksum[..6], &checksum[checksum.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_checksum() {
        let address = parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert_eq!(address.to_checksum(None), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

        // Same bytes, wrong letter case on the last character
        assert!(matches!(
            parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD"),
            Err(AddressError::InvalidChecksum)
        ));
    }

    #[test]
    fn test_parse_single_case_and_prefix() {
        let lower = parse_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        let upper = parse_address("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED").unwrap();
        assert_eq!(lower, upper);

        assert!(parse_address("").is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xzzaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
    }

    #[test]
    fn test_shorten() {
        let address = parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert_eq!(shorten_address(&address), "0x5aAe...eAed");
    }
}
