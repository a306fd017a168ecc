use std::fmt;
use std::str::FromStr;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::IsIdentity;
use curve25519_dalek::{constants::RISTRETTO_BASEPOINT_TABLE, ristretto::CompressedRistretto};
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

use crate::error::SignatureError;
use crate::hash::BlockHash;

/// Adapts a BLAKE3 output stream to the RNG interface `Scalar::random` wants.
struct HashRng(blake3::OutputReader);

impl HashRng {
    fn new(hasher: &blake3::Hasher) -> Self {
        HashRng(hasher.finalize_xof())
    }
}

impl RngCore for HashRng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// BLAKE3's XOF is a cryptographically secure stream.
impl CryptoRng for HashRng {}

pub const SECRET_KEY_SIZE: usize = 32;
pub const PUBLIC_KEY_SIZE: usize = 32;
pub const SIGNATURE_SIZE: usize = 64;

const DERIVE_SCALAR_CONTEXT: &str = "state-block 2021-11-11 derive scalar";
const DERIVE_NONCE_KEY_CONTEXT: &str = "state-block 2021-11-11 derive nonce key";
const CHALLENGE_CONTEXT: &str = "state-block 2021-11-11 signature challenge";

/// The key an account signs its blocks with.
///
/// The bytes are a seed: the signing scalar and the nonce key are both
/// derived from them on use. It does not implement `Debug`.
#[derive(Clone)]
pub struct SecretKey {
    bytes: [u8; SECRET_KEY_SIZE],
}

impl SecretKey {
    pub fn from_bytes(bytes: [u8; SECRET_KEY_SIZE]) -> Self {
        SecretKey { bytes }
    }

    pub fn from_hex(value: &str) -> Result<Self, SignatureError> {
        let mut bytes = [0; SECRET_KEY_SIZE];
        hex::decode_to_slice(value, &mut bytes).map_err(|_| SignatureError::InvalidSecretKey)?;
        Ok(SecretKey { bytes })
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut key = SecretKey {
            bytes: [0; SECRET_KEY_SIZE],
        };
        rng.fill_bytes(&mut key.bytes);
        key
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.bytes)
    }

    fn derive_scalar(&self) -> Scalar {
        let mut hasher = blake3::Hasher::new_derive_key(DERIVE_SCALAR_CONTEXT);
        hasher.update(&self.bytes);
        Scalar::random(&mut HashRng::new(&hasher))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_point(&self.derive_scalar() * &RISTRETTO_BASEPOINT_TABLE)
    }

    /// Signs `message` with a nonce derived from the key and the message, so
    /// the same key and message always give the same signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let secret_scalar = self.derive_scalar();
        let public = (&secret_scalar * &RISTRETTO_BASEPOINT_TABLE).compress();

        let nonce_key = blake3::derive_key(DERIVE_NONCE_KEY_CONTEXT, &self.bytes);
        let mut nonce_hasher = blake3::Hasher::new_keyed(&nonce_key);
        nonce_hasher.update(message);
        let nonce = Scalar::random(&mut HashRng::new(&nonce_hasher));
        let commitment = (&nonce * &RISTRETTO_BASEPOINT_TABLE).compress();

        let challenge = challenge(&public, &commitment, message);
        let response = nonce + challenge * secret_scalar;

        let mut signature = Signature([0; SIGNATURE_SIZE]);
        signature.0[..32].copy_from_slice(commitment.as_bytes());
        signature.0[32..].copy_from_slice(response.as_bytes());
        signature
    }
}

fn challenge(public: &CompressedRistretto, commitment: &CompressedRistretto, message: &[u8]) -> Scalar {
    let mut hasher = blake3::Hasher::new_derive_key(CHALLENGE_CONTEXT);
    hasher.update(public.as_bytes());
    hasher.update(commitment.as_bytes());
    hasher.update(message);
    Scalar::random(&mut HashRng::new(&hasher))
}

/// Derives the `index`th child key of a hex seed.
pub fn derive_secret_key(seed_hex: &str, index: u32) -> Result<SecretKey, SignatureError> {
    let mut seed = [0; SECRET_KEY_SIZE];
    hex::decode_to_slice(seed_hex, &mut seed).map_err(|_| SignatureError::InvalidSecretKey)?;
    let child = blake3::keyed_hash(&seed, &index.to_be_bytes());
    Ok(SecretKey::from_bytes(*child.as_bytes()))
}

/// The upper case hex public key belonging to a hex secret key.
pub fn derive_public_key(secret_key_hex: &str) -> Result<String, SignatureError> {
    Ok(SecretKey::from_hex(secret_key_hex)?.public_key().to_hex())
}

/// Signs a block fingerprint.
pub fn sign_block(hash: &BlockHash, secret_key: &SecretKey) -> Signature {
    secret_key.sign(hash.as_bytes())
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; SIGNATURE_SIZE];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| SignatureError::InvalidSignature)?;
        Ok(Signature(bytes))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey {
    point: RistrettoPoint,
    compressed: CompressedRistretto,
}

impl PublicKey {
    fn from_point(point: RistrettoPoint) -> Self {
        PublicKey {
            point,
            compressed: point.compress(),
        }
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.compressed.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.compressed.as_bytes())
    }

    pub fn verify(&self, signature: &Signature, message: &[u8]) -> Result<(), SignatureError> {
        let commitment = CompressedRistretto::from_slice(&signature.0[..32]);
        let mut response_bytes = [0; 32];
        response_bytes.copy_from_slice(&signature.0[32..]);
        let response =
            Scalar::from_canonical_bytes(response_bytes).ok_or(SignatureError::InvalidSignature)?;

        let challenge = challenge(&self.compressed, &commitment, message);
        let expected_commitment =
            RistrettoPoint::vartime_double_scalar_mul_basepoint(&-challenge, &self.point, &response);

        if !bool::from(expected_commitment.compress().ct_eq(&commitment)) {
            return Err(SignatureError::InvalidSignature);
        }
        Ok(())
    }
}

impl<'a> TryFrom<&'a [u8]> for PublicKey {
    type Error = SignatureError;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        if value.len() != PUBLIC_KEY_SIZE {
            return Err(SignatureError::InvalidPublicKey);
        }
        let compressed = CompressedRistretto::from_slice(value);
        let point = compressed.decompress().ok_or(SignatureError::InvalidPublicKey)?;
        if point.is_identity() {
            return Err(SignatureError::InvalidPublicKey);
        }
        Ok(PublicKey { point, compressed })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn test_signing_message_verifies() {
        let message = b"block fingerprint";
        let secret_key = SecretKey::random(&mut OsRng);
        let signature = secret_key.sign(message);
        assert!(secret_key.public_key().verify(&signature, message).is_ok());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let secret_key = SecretKey::random(&mut OsRng);
        assert_eq!(secret_key.sign(b"same"), secret_key.sign(b"same"));
        assert_ne!(secret_key.sign(b"same"), secret_key.sign(b"other"));
    }

    #[test]
    fn test_signature_does_not_verify_with_different_message() {
        let secret_key = SecretKey::random(&mut OsRng);
        let signature = secret_key.sign(b"send 10");
        assert_eq!(
            secret_key.public_key().verify(&signature, b"send 1000"),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn test_signature_does_not_verify_with_different_key() {
        let message = b"block fingerprint";
        let signature = SecretKey::random(&mut OsRng).sign(message);
        let public_key = SecretKey::random(&mut OsRng).public_key();
        assert!(public_key.verify(&signature, message).is_err());
    }

    #[test]
    fn test_public_key_bytes_round_trip() {
        let public_key = SecretKey::random(&mut OsRng).public_key();
        let bytes = public_key.to_bytes();
        assert_eq!(PublicKey::try_from(&bytes[..]), Ok(public_key));
        assert_eq!(
            PublicKey::try_from(&[0u8; 32][..]),
            Err(SignatureError::InvalidPublicKey)
        );
        assert_eq!(
            PublicKey::try_from(&bytes[..31]),
            Err(SignatureError::InvalidPublicKey)
        );
    }

    #[test]
    fn test_hex_helpers() {
        let secret_key = SecretKey::random(&mut OsRng);
        let public_hex = derive_public_key(&secret_key.to_hex()).unwrap();
        assert_eq!(public_hex, secret_key.public_key().to_hex());
        assert_eq!(public_hex.len(), 64);
        assert_eq!(derive_public_key("12"), Err(SignatureError::InvalidSecretKey));

        let signature = sign_block(&BlockHash::BLANK, &secret_key);
        assert_eq!(signature.to_string().len(), 128);
        assert_eq!(signature.to_string().parse::<Signature>(), Ok(signature));
    }

    #[test]
    fn test_child_keys_differ_by_index() {
        let seed = "0".repeat(64);
        let first = derive_secret_key(&seed, 0).unwrap();
        let again = derive_secret_key(&seed, 0).unwrap();
        let second = derive_secret_key(&seed, 1).unwrap();
        assert_eq!(first.to_hex(), again.to_hex());
        assert_ne!(first.to_hex(), second.to_hex());
        assert!(derive_secret_key("xyz", 0).is_err());
    }
}
