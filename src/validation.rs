// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Syntactic checks on submitted wallet addresses.

/// Length of a Tezos implicit account address (`tz1...`) as submitted.
pub const EXPECTED_ADDRESS_LEN: usize = 36;

/// Returns `true` when `address` has the expected fixed length.
///
/// Length is counted in UTF-8 bytes, not characters. Only the length is
/// checked; whether the address exists is up to the wallet lookup.
pub fn validate_address(address: &str) -> bool {
    address.len() == EXPECTED_ADDRESS_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_length() {
        assert!(validate_address("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb"));
        assert!(validate_address(&"a".repeat(EXPECTED_ADDRESS_LEN)));
    }

    #[test]
    fn rejects_other_lengths() {
        assert!(!validate_address(""));
        assert!(!validate_address("tz1"));
        assert!(!validate_address(&"a".repeat(EXPECTED_ADDRESS_LEN - 1)));
        assert!(!validate_address(&"a".repeat(EXPECTED_ADDRESS_LEN + 1)));
    }

    #[test]
    fn counts_bytes_not_chars() {
        let wide = "é".repeat(EXPECTED_ADDRESS_LEN);
        assert!(!validate_address(&wide));

        // 18 two-byte characters make 36 bytes
        let half = "é".repeat(EXPECTED_ADDRESS_LEN / 2);
        assert!(validate_address(&half));
    }
}
