//! Assembly and verification of state blocks.
//!
//! A state block folds the open, receive, send and change kinds into one
//! record. The kind is never written down: it is implied by whether
//! `previous` is blank and by whether `link` is blank, a block hash, or an
//! account address.
//!
//! | previous | link    | kind    |
//! |----------|---------|---------|
//! | blank    | hash    | open    |
//! | blank    | blank   | invalid |
//! | blank    | address | invalid |
//! | hash     | blank   | change  |
//! | hash     | address | send    |
//! | hash     | hash    | receive |

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::{decode_address, encode_address, AddressPrefix, ACCOUNT_KEY_SIZE};
use crate::error::BlockError;
use crate::hash::{hash_block_unchecked, BlockHash, HashInput};
use crate::signature::{sign_block, PublicKey, SecretKey, Signature};
use crate::validate::{is_valid_address, is_valid_amount, is_valid_hash, is_valid_key};

/// Caller supplied contents of a block, before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    /// Proof of work. Only its presence is checked.
    #[serde(default)]
    pub work: Option<String>,
    /// Raw balance after this block, in decimal.
    pub balance: String,
    pub representative: String,
    /// Hash of the account's previous block, `None` for an open block.
    #[serde(default)]
    pub previous: Option<String>,
    /// Source block hash, destination address, or `None` for a change.
    #[serde(default)]
    pub link: Option<String>,
}

/// Options for block assembly.
///
/// With neither flag set addresses use the legacy `xrb_` prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BlockParams {
    pub use_nano_prefix: bool,
    pub use_banano_prefix: bool,
}

impl BlockParams {
    /// The prefix the flags select. Setting both flags is an error.
    pub fn prefix(&self) -> Result<AddressPrefix, BlockError> {
        match (self.use_nano_prefix, self.use_banano_prefix) {
            (false, false) => Ok(AddressPrefix::Xrb),
            (true, false) => Ok(AddressPrefix::Nano),
            (false, true) => Ok(AddressPrefix::Ban),
            (true, true) => Err(BlockError::ConflictingPrefixes),
        }
    }
}

/// The legacy block kind a state block stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Open,
    Change,
    Send,
    Receive,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockKind::Open => "open",
            BlockKind::Change => "change",
            BlockKind::Send => "send",
            BlockKind::Receive => "receive",
        })
    }
}

enum Link<'a> {
    Blank,
    Hash(BlockHash),
    Account {
        address: &'a str,
        key: [u8; ACCOUNT_KEY_SIZE],
    },
}

struct Normalized<'a> {
    previous: BlockHash,
    link: Link<'a>,
    kind: BlockKind,
}

impl BlockData {
    /// The kind of block this data describes, or the error assembly would
    /// report for its `previous` and `link` fields.
    pub fn kind(&self) -> Result<BlockKind, BlockError> {
        self.normalize().map(|normalized| normalized.kind)
    }

    fn normalize(&self) -> Result<Normalized<'_>, BlockError> {
        let previous = match self.previous.as_deref() {
            None => BlockHash::BLANK,
            Some(previous) if is_valid_hash(previous) => {
                previous.parse::<BlockHash>().map_err(|_| BlockError::InvalidPrevious)?
            }
            Some(_) => return Err(BlockError::InvalidPrevious),
        };

        // Addresses are checked first: hashes and addresses never overlap.
        let link = match self.link.as_deref() {
            None => Link::Blank,
            Some(link) => match decode_address(link) {
                Ok(key) => Link::Account { address: link, key },
                Err(_) if is_valid_hash(link) => {
                    let hash: BlockHash = link.parse().map_err(|_| BlockError::InvalidLink)?;
                    if hash.is_blank() {
                        Link::Blank
                    } else {
                        Link::Hash(hash)
                    }
                }
                Err(_) => return Err(BlockError::InvalidLink),
            },
        };

        let kind = match (previous.is_blank(), &link) {
            (true, Link::Hash(_)) => BlockKind::Open,
            (true, _) => return Err(BlockError::ImpossibleBlock),
            (false, Link::Blank) => BlockKind::Change,
            (false, Link::Account { .. }) => BlockKind::Send,
            (false, Link::Hash(_)) => BlockKind::Receive,
        };

        Ok(Normalized {
            previous,
            link,
            kind,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockType {
    #[default]
    #[serde(rename = "state")]
    State,
}

/// Both spellings of a block's link: as a hash and as an address.
///
/// The pair is derived once from whichever form was supplied and cannot be
/// edited afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkForms {
    #[serde(rename = "link")]
    hash: String,
    #[serde(rename = "link_as_account")]
    account: String,
}

impl LinkForms {
    fn from_hash(hash: BlockHash, prefix: AddressPrefix) -> Self {
        LinkForms {
            account: encode_address(hash.as_bytes(), prefix),
            hash: hash.to_string(),
        }
    }

    fn from_account(address: &str, key: &[u8; ACCOUNT_KEY_SIZE]) -> Self {
        LinkForms {
            hash: hex::encode_upper(key),
            account: address.to_owned(),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

/// The signed, normalized contents of a block as they appear on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRepresentation {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub account: String,
    pub previous: String,
    pub representative: String,
    pub balance: String,
    #[serde(flatten)]
    pub link: LinkForms,
    pub work: String,
    pub signature: String,
}

impl BlockRepresentation {
    fn hash_input(&self) -> HashInput<'_> {
        HashInput {
            account: &self.account,
            previous: &self.previous,
            representative: &self.representative,
            balance: &self.balance,
            link: self.link.hash(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    pub block: BlockRepresentation,
}

/// Builds and signs a state block.
///
/// Inputs are checked in a fixed order and the first failure is returned:
/// secret key, work, representative, balance, previous, link, then the
/// legality of the previous and link pair. No key material is derived for
/// input that fails any of these.
pub fn create_block(
    secret_key: &str,
    data: &BlockData,
    params: &BlockParams,
) -> Result<Block, BlockError> {
    let result = assemble(secret_key, data, params);
    if let Err(error) = &result {
        debug!(%error, "rejected state block");
    }
    result
}

fn assemble(secret_key: &str, data: &BlockData, params: &BlockParams) -> Result<Block, BlockError> {
    if !is_valid_key(secret_key) {
        return Err(BlockError::InvalidSecretKey);
    }
    let work = data.work.as_deref().ok_or(BlockError::WorkNotSet)?;
    if !is_valid_address(&data.representative) {
        return Err(BlockError::InvalidRepresentative);
    }
    if !is_valid_amount(&data.balance) {
        return Err(BlockError::InvalidBalance);
    }
    let Normalized {
        previous,
        link,
        kind,
    } = data.normalize()?;
    let prefix = params.prefix()?;

    let secret_key = SecretKey::from_hex(secret_key).map_err(|_| BlockError::InvalidSecretKey)?;
    let account = encode_address(&secret_key.public_key().to_bytes(), prefix);

    let link = match link {
        Link::Blank => LinkForms::from_hash(BlockHash::BLANK, prefix),
        Link::Hash(hash) => LinkForms::from_hash(hash, prefix),
        Link::Account { address, key } => LinkForms::from_account(address, &key),
    };
    let previous = previous.to_string();

    let hash = hash_block_unchecked(&HashInput {
        account: &account,
        previous: &previous,
        representative: &data.representative,
        balance: &data.balance,
        link: link.hash(),
    });
    let signature = sign_block(&hash, &secret_key);

    debug!(%kind, %hash, %account, "assembled state block");

    Ok(Block {
        hash: hash.to_string(),
        block: BlockRepresentation {
            block_type: BlockType::State,
            account,
            previous,
            representative: data.representative.clone(),
            balance: data.balance.clone(),
            link,
            work: work.to_owned(),
            signature: signature.to_string(),
        },
    })
}

/// Checks that a block is well formed, that its hash covers its contents,
/// and that its account signed it.
pub fn verify_block(block: &Block) -> Result<(), BlockError> {
    let contents = &block.block;

    let account_key = decode_address(&contents.account).map_err(|_| BlockError::InvalidAccount)?;
    let public_key =
        PublicKey::try_from(&account_key[..]).map_err(|_| BlockError::InvalidAccount)?;
    if !is_valid_address(&contents.representative) {
        return Err(BlockError::InvalidRepresentative);
    }
    if !is_valid_amount(&contents.balance) {
        return Err(BlockError::InvalidBalance);
    }
    let previous: BlockHash = contents
        .previous
        .parse()
        .map_err(|_| BlockError::InvalidPrevious)?;
    let link: BlockHash = contents
        .link
        .hash()
        .parse()
        .map_err(|_| BlockError::InvalidLink)?;
    let link_key = decode_address(contents.link.account()).map_err(|_| BlockError::InvalidLink)?;
    if link_key != *link.as_bytes() {
        return Err(BlockError::LinkMismatch);
    }
    if previous.is_blank() && link.is_blank() {
        return Err(BlockError::ImpossibleBlock);
    }

    let hash = hash_block_unchecked(&contents.hash_input());
    if block.hash.parse::<BlockHash>().ok() != Some(hash) {
        return Err(BlockError::HashMismatch);
    }

    let signature: Signature = contents
        .signature
        .parse()
        .map_err(|_| BlockError::InvalidSignature)?;
    public_key
        .verify(&signature, hash.as_bytes())
        .map_err(|_| BlockError::InvalidSignature)
}
