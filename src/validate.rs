//! Syntactic predicates over the textual fields of a block.
//!
//! Every predicate is pure: no allocation beyond what decoding needs, no
//! shared state, safe to call from any number of threads.

use crate::address::decode_address;

/// The number of hex characters in a key or hash.
pub const HEX_32_LEN: usize = 64;

/// The number of decimal digits in the largest raw amount, `u128::MAX`.
const MAX_AMOUNT_DIGITS: usize = 39;

fn is_hex_32(value: &str) -> bool {
    value.len() == HEX_32_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn is_valid_key(value: &str) -> bool {
    is_hex_32(value)
}

pub fn is_valid_hash(value: &str) -> bool {
    is_hex_32(value)
}

/// Checks prefix, alphabet, padding and checksum.
pub fn is_valid_address(value: &str) -> bool {
    decode_address(value).is_ok()
}

/// A raw amount is a plain run of decimal digits no larger than `u128::MAX`.
pub fn is_valid_amount(value: &str) -> bool {
    if value.is_empty() || value.len() > MAX_AMOUNT_DIGITS {
        return false;
    }
    // `u128::from_str` accepts a leading '+', which we do not.
    value.bytes().all(|b| b.is_ascii_digit()) && value.parse::<u128>().is_ok()
}
