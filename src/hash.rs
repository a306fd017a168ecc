use std::fmt;
use std::str::FromStr;

use crate::address::{decode_address, ACCOUNT_KEY_SIZE};
use crate::error::BlockError;
use crate::validate::{is_valid_address, is_valid_amount, is_valid_hash};

// The number of bytes in a block hash.
pub const BLOCK_HASH_SIZE: usize = blake3::OUT_LEN;

const BLOCK_HASH_CONTEXT: &str = "state-block 2021-11-11 block hash";

/// A 32 byte block fingerprint, written as upper case hex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockHash([u8; BLOCK_HASH_SIZE]);

impl BlockHash {
    /// The sentinel for "no previous block" and "no link".
    pub const BLANK: BlockHash = BlockHash([0; BLOCK_HASH_SIZE]);

    pub fn from_bytes(bytes: [u8; BLOCK_HASH_SIZE]) -> Self {
        BlockHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_HASH_SIZE] {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::BLANK
    }
}

impl FromStr for BlockHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; BLOCK_HASH_SIZE];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(BlockHash(bytes))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// The fields a block fingerprint covers, in hashing order.
///
/// `account` and `representative` are addresses, `previous` and `link` are
/// hex hashes, `balance` is a decimal raw amount.
#[derive(Clone, Copy, Debug)]
pub struct HashInput<'a> {
    pub account: &'a str,
    pub previous: &'a str,
    pub representative: &'a str,
    pub balance: &'a str,
    pub link: &'a str,
}

fn key_or_zero(address: &str) -> [u8; ACCOUNT_KEY_SIZE] {
    decode_address(address).unwrap_or([0; ACCOUNT_KEY_SIZE])
}

fn hash_or_blank(value: &str) -> BlockHash {
    value.parse().unwrap_or(BlockHash::BLANK)
}

/// Fingerprints already validated fields.
///
/// Nothing is checked here: a field that fails to parse is hashed as zero.
/// Use [`hash_block`] on input that has not been through validation.
pub fn hash_block_unchecked(input: &HashInput<'_>) -> BlockHash {
    let balance: u128 = input.balance.parse().unwrap_or(0);

    let mut hasher = blake3::Hasher::new_derive_key(BLOCK_HASH_CONTEXT);
    hasher.update(&key_or_zero(input.account));
    hasher.update(hash_or_blank(input.previous).as_bytes());
    hasher.update(&key_or_zero(input.representative));
    hasher.update(&balance.to_be_bytes());
    hasher.update(hash_or_blank(input.link).as_bytes());
    BlockHash(*hasher.finalize().as_bytes())
}

/// Validates every field, then fingerprints them.
pub fn hash_block(input: &HashInput<'_>) -> Result<BlockHash, BlockError> {
    if !is_valid_address(input.account) {
        return Err(BlockError::InvalidAccount);
    }
    if !is_valid_hash(input.previous) {
        return Err(BlockError::InvalidPrevious);
    }
    if !is_valid_address(input.representative) {
        return Err(BlockError::InvalidRepresentative);
    }
    if !is_valid_amount(input.balance) {
        return Err(BlockError::InvalidBalance);
    }
    if !is_valid_hash(input.link) {
        return Err(BlockError::InvalidLink);
    }
    Ok(hash_block_unchecked(input))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::address::{encode_address, AddressPrefix};

    fn input_with<'a>(account: &'a str, representative: &'a str, balance: &'a str) -> HashInput<'a> {
        HashInput {
            account,
            previous: "0000000000000000000000000000000000000000000000000000000000000000",
            representative,
            balance,
            link: "A0B1C2D3E4F5061728394A5B6C7D8E9FA0B1C2D3E4F5061728394A5B6C7D8E9F",
        }
    }

    #[test]
    fn test_blank_hash_display() {
        assert_eq!(BlockHash::BLANK.to_string(), "0".repeat(64));
        assert!(BlockHash::BLANK.is_blank());
        assert_eq!("0".repeat(64).parse::<BlockHash>().unwrap(), BlockHash::BLANK);
    }

    #[test]
    fn test_hash_parse_accepts_either_case() {
        let lower: BlockHash = "ab".repeat(32).parse().unwrap();
        let upper: BlockHash = "AB".repeat(32).parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_string(), "AB".repeat(32));
    }

    #[test]
    fn test_hash_is_deterministic_and_field_sensitive() {
        let account = encode_address(&[1; 32], AddressPrefix::Xrb);
        let representative = encode_address(&[2; 32], AddressPrefix::Xrb);

        let h1 = hash_block(&input_with(&account, &representative, "100")).unwrap();
        let h2 = hash_block(&input_with(&account, &representative, "100")).unwrap();
        let h3 = hash_block(&input_with(&account, &representative, "101")).unwrap();
        let swapped = hash_block(&input_with(&representative, &account, "100")).unwrap();

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_ne!(h1, swapped);
    }

    #[test]
    fn test_prefix_does_not_change_hash() {
        let xrb = encode_address(&[1; 32], AddressPrefix::Xrb);
        let nano = encode_address(&[1; 32], AddressPrefix::Nano);
        let representative = encode_address(&[2; 32], AddressPrefix::Ban);

        assert_eq!(
            hash_block(&input_with(&xrb, &representative, "7")),
            hash_block(&input_with(&nano, &representative, "7"))
        );
    }

    #[test]
    fn test_checked_hash_rejects_bad_fields() {
        let account = encode_address(&[1; 32], AddressPrefix::Xrb);
        let representative = encode_address(&[2; 32], AddressPrefix::Xrb);

        assert_eq!(
            hash_block(&input_with("xrb_nope", &representative, "1")),
            Err(BlockError::InvalidAccount)
        );
        assert_eq!(
            hash_block(&input_with(&account, &representative, "-1")),
            Err(BlockError::InvalidBalance)
        );
        let mut input = input_with(&account, &representative, "1");
        input.link = account.as_str();
        assert_eq!(hash_block(&input), Err(BlockError::InvalidLink));
    }
}
