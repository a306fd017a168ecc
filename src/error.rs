use thiserror::Error;

/// Errors raised while assembling or verifying a state block.
///
/// The construction variants are listed in the order their guards run:
/// the first failing guard is the one reported.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("secret key is not valid")]
    InvalidSecretKey,
    #[error("work is not set")]
    WorkNotSet,
    #[error("representative is not a valid address")]
    InvalidRepresentative,
    #[error("balance is not a valid amount")]
    InvalidBalance,
    #[error("previous is not a valid hash")]
    InvalidPrevious,
    #[error("link is neither a valid address nor a valid hash")]
    InvalidLink,
    #[error("block is impossible: an open block needs a non-blank hash link")]
    ImpossibleBlock,
    #[error("at most one address prefix flag may be set")]
    ConflictingPrefixes,

    /// The `account` field does not decode to a public key.
    #[error("account is not a valid address")]
    InvalidAccount,
    /// `link` and `link_as_account` encode different keys.
    #[error("link and link_as_account disagree")]
    LinkMismatch,
    #[error("hash does not match block contents")]
    HashMismatch,
    #[error("signature does not verify against account")]
    InvalidSignature,
}

/// Errors raised by the address codec.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("unknown address prefix")]
    UnknownPrefix,
    #[error("address body has the wrong length")]
    InvalidLength,
    #[error("address contains a character outside the alphabet")]
    InvalidCharacter,
    #[error("address padding bits are not zero")]
    InvalidPadding,
    #[error("address checksum does not match")]
    ChecksumMismatch,
    #[error("public key is not 64 hex characters")]
    InvalidPublicKey,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("secret key is not 64 hex characters")]
    InvalidSecretKey,
    #[error("public key is not a valid curve point")]
    InvalidPublicKey,
    #[error("signature is malformed or does not verify")]
    InvalidSignature,
}
