//! Human readable account addresses.
//!
//! An address is a prefix followed by 60 base32 characters: 52 encode four
//! zero bits of padding and the 256 bit public key, the last 8 encode a
//! 40 bit checksum over the key.

use crate::error::AddressError;

/// The base32 alphabet. It leaves out `0`, `2`, `l` and `v`.
const ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

// The number of bytes in a raw account key.
pub const ACCOUNT_KEY_SIZE: usize = 32;

const CHECKSUM_SIZE: usize = 5;
const KEY_PAD_BITS: usize = 4;
const KEY_CHARS: usize = (KEY_PAD_BITS + ACCOUNT_KEY_SIZE * 8) / 5;
const CHECKSUM_CHARS: usize = CHECKSUM_SIZE * 8 / 5;
const BODY_CHARS: usize = KEY_CHARS + CHECKSUM_CHARS;

/// The network branding an address is written with.
///
/// All prefixes encode the same key space: the same key under two prefixes
/// is the same account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressPrefix {
    #[default]
    Xrb,
    Nano,
    Ban,
}

impl AddressPrefix {
    const ALL: [AddressPrefix; 3] = [AddressPrefix::Xrb, AddressPrefix::Nano, AddressPrefix::Ban];

    pub fn as_str(self) -> &'static str {
        match self {
            AddressPrefix::Xrb => "xrb_",
            AddressPrefix::Nano => "nano_",
            AddressPrefix::Ban => "ban_",
        }
    }

    fn strip(value: &str) -> Option<(AddressPrefix, &str)> {
        Self::ALL
            .iter()
            .find_map(|prefix| value.strip_prefix(prefix.as_str()).map(|body| (*prefix, body)))
    }
}

fn checksum(key: &[u8; ACCOUNT_KEY_SIZE]) -> [u8; CHECKSUM_SIZE] {
    let digest = blake3::hash(key);
    let mut out = [0; CHECKSUM_SIZE];
    out.copy_from_slice(&digest.as_bytes()[..CHECKSUM_SIZE]);
    out.reverse();
    out
}

fn push_base32(out: &mut String, bytes: &[u8], pad_bits: usize) {
    let total_bits = pad_bits + bytes.len() * 8;
    for chunk in 0..total_bits / 5 {
        let mut value = 0u8;
        for offset in 0..5 {
            let i = chunk * 5 + offset;
            let bit = if i < pad_bits {
                0
            } else {
                let j = i - pad_bits;
                (bytes[j / 8] >> (7 - j % 8)) & 1
            };
            value = (value << 1) | bit;
        }
        out.push(ALPHABET[value as usize] as char);
    }
}

fn read_base32(chars: &[u8], pad_bits: usize, out: &mut [u8]) -> Result<(), AddressError> {
    for (chunk, c) in chars.iter().enumerate() {
        let value = ALPHABET
            .iter()
            .position(|a| a == c)
            .ok_or(AddressError::InvalidCharacter)? as u8;
        for offset in 0..5 {
            let i = chunk * 5 + offset;
            let bit = (value >> (4 - offset)) & 1;
            if i < pad_bits {
                if bit != 0 {
                    return Err(AddressError::InvalidPadding);
                }
                continue;
            }
            let j = i - pad_bits;
            out[j / 8] |= bit << (7 - j % 8);
        }
    }
    Ok(())
}

pub fn encode_address(key: &[u8; ACCOUNT_KEY_SIZE], prefix: AddressPrefix) -> String {
    let mut out = String::with_capacity(prefix.as_str().len() + BODY_CHARS);
    out.push_str(prefix.as_str());
    push_base32(&mut out, key, KEY_PAD_BITS);
    push_base32(&mut out, &checksum(key), 0);
    out
}

/// Decodes an address under any known prefix back into its raw key.
pub fn decode_address(value: &str) -> Result<[u8; ACCOUNT_KEY_SIZE], AddressError> {
    let (_, body) = AddressPrefix::strip(value).ok_or(AddressError::UnknownPrefix)?;
    if !body.is_ascii() {
        return Err(AddressError::InvalidCharacter);
    }
    if body.len() != BODY_CHARS {
        return Err(AddressError::InvalidLength);
    }
    let (key_chars, checksum_chars) = body.as_bytes().split_at(KEY_CHARS);

    let mut key = [0; ACCOUNT_KEY_SIZE];
    read_base32(key_chars, KEY_PAD_BITS, &mut key)?;
    let mut expected = [0; CHECKSUM_SIZE];
    read_base32(checksum_chars, 0, &mut expected)?;

    if checksum(&key) != expected {
        return Err(AddressError::ChecksumMismatch);
    }
    Ok(key)
}

/// Encodes a hex public key as an address.
pub fn derive_address(public_key_hex: &str, prefix: AddressPrefix) -> Result<String, AddressError> {
    let mut key = [0; ACCOUNT_KEY_SIZE];
    hex::decode_to_slice(public_key_hex, &mut key).map_err(|_| AddressError::InvalidPublicKey)?;
    Ok(encode_address(&key, prefix))
}

/// The upper case hex public key an address stands for.
pub fn address_to_public_key(value: &str) -> Result<String, AddressError> {
    decode_address(value).map(hex::encode_upper)
}

#[cfg(test)]
mod test {
    use super::*;

    const KEY: [u8; 32] = [
        0x3b, 0x1a, 0xf7, 0x09, 0x4e, 0x8c, 0x62, 0xd5, 0x10, 0x27, 0xaa, 0x91, 0xfe, 0x00, 0x6b,
        0x44, 0x80, 0x5f, 0xc3, 0x2e, 0x19, 0x77, 0xd0, 0x08, 0xbb, 0x6a, 0x35, 0xe2, 0x4c, 0x93,
        0x01, 0xff,
    ];

    #[test]
    fn test_encoded_address_decodes_to_same_key() {
        for prefix in AddressPrefix::ALL {
            let address = encode_address(&KEY, prefix);
            assert!(address.starts_with(prefix.as_str()));
            assert_eq!(address.len(), prefix.as_str().len() + 60);
            assert_eq!(decode_address(&address), Ok(KEY));
        }
    }

    #[test]
    fn test_extreme_keys_encode() {
        let zero = encode_address(&[0; 32], AddressPrefix::Xrb);
        assert!(zero.starts_with(&format!("xrb_{}", "1".repeat(52))));
        assert_eq!(decode_address(&zero), Ok([0; 32]));

        let ones = encode_address(&[0xff; 32], AddressPrefix::Nano);
        assert!(ones.starts_with("nano_3"));
        assert_eq!(decode_address(&ones), Ok([0xff; 32]));
    }

    #[test]
    fn test_single_character_change_breaks_checksum() {
        let address = encode_address(&KEY, AddressPrefix::Xrb);
        let mut bytes = address.into_bytes();
        let i = 10;
        bytes[i] = if bytes[i] == b'1' { b'3' } else { b'1' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert_eq!(decode_address(&tampered), Err(AddressError::ChecksumMismatch));
    }

    #[test]
    fn test_malformed_addresses_are_rejected() {
        let address = encode_address(&KEY, AddressPrefix::Ban);
        let body = &address["ban_".len()..];

        assert_eq!(decode_address(&format!("abc_{}", body)), Err(AddressError::UnknownPrefix));
        assert_eq!(decode_address(&address[..address.len() - 1]), Err(AddressError::InvalidLength));
        assert_eq!(
            decode_address(&format!("ban_0{}", &body[1..])),
            Err(AddressError::InvalidCharacter)
        );
        assert_eq!(
            decode_address(&format!("ban_4{}", &body[1..])),
            Err(AddressError::InvalidPadding)
        );
        assert_eq!(
            decode_address(&format!("ban_é{}", &body[2..])),
            Err(AddressError::InvalidCharacter)
        );
    }

    #[test]
    fn test_derive_address_from_hex() {
        let hex_key = hex::encode_upper(KEY);
        let address = derive_address(&hex_key, AddressPrefix::Nano).unwrap();
        assert_eq!(address, encode_address(&KEY, AddressPrefix::Nano));
        assert_eq!(address_to_public_key(&address).unwrap(), hex_key);
        assert_eq!(
            derive_address("not hex", AddressPrefix::Xrb),
            Err(AddressError::InvalidPublicKey)
        );
    }
}
