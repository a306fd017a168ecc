//! Construction and verification of state blocks for an account-chain
//! ledger.
//!
//! The entry point is [`create_block`], which validates caller data, derives
//! the signing account, fingerprints the canonical fields and signs them.
//! [`verify_block`] checks a block produced elsewhere.

pub mod address;
pub mod block;
pub mod error;
pub mod hash;
pub mod signature;
pub mod validate;

pub use address::{
    address_to_public_key, decode_address, derive_address, encode_address, AddressPrefix,
};
pub use block::{
    create_block, verify_block, Block, BlockData, BlockKind, BlockParams, BlockRepresentation,
    BlockType, LinkForms,
};
pub use error::{AddressError, BlockError, SignatureError};
pub use hash::{hash_block, hash_block_unchecked, BlockHash, HashInput};
pub use signature::{
    derive_public_key, derive_secret_key, sign_block, PublicKey, SecretKey, Signature,
};
pub use validate::{is_valid_address, is_valid_amount, is_valid_hash, is_valid_key};
