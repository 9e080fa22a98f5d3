// crates/flyclient-chain/src/header.rs

//! 80-byte block headers: field layout, block hash and proof-of-work target.
//!
//! Layout (all integers little-endian):
//!
//! | bytes  | field        |
//! |--------|--------------|
//! | 0..4   | version      |
//! | 4..36  | previous hash (internal byte order) |
//! | 36..68 | merkle root (internal byte order)   |
//! | 68..72 | time         |
//! | 72..76 | bits         |
//! | 76..80 | nonce        |
//!
//! Hashes held by [`Header`] are in display order, like every other
//! [`Digest`] in the workspace; they are reversed on the wire.

use flyclient_crypto::{hash_bytes, Digest, DIGEST_LEN};
use num_bigint::BigUint;

/// Serialized header length.
pub const HEADER_LEN: usize = 80;

/// Errors raised while parsing raw headers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    /// Input is not exactly [`HEADER_LEN`] bytes.
    #[error("header must be {HEADER_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Decoded block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Block version.
    pub version: i32,
    /// Hash of the previous block (display order).
    pub prev_block: Digest,
    /// Merkle root of the block's transactions (display order).
    pub merkle_root: Digest,
    /// Unix timestamp.
    pub time: u32,
    /// Compact proof-of-work target.
    pub bits: u32,
    /// Nonce.
    pub nonce: u32,
}

impl Header {
    /// Parse the 80-byte wire form.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, HeaderError> {
        let raw: &[u8; HEADER_LEN] = raw
            .try_into()
            .map_err(|_| HeaderError::InvalidLength(raw.len()))?;
        Ok(Self {
            version: i32::from_le_bytes(word(raw, 0)),
            prev_block: internal_digest(raw, 4),
            merkle_root: internal_digest(raw, 36),
            time: u32::from_le_bytes(word(raw, 68)),
            bits: u32::from_le_bytes(word(raw, 72)),
            nonce: u32::from_le_bytes(word(raw, 76)),
        })
    }

    /// Serialize to the 80-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(self.prev_block.reversed().as_bytes());
        out[36..68].copy_from_slice(self.merkle_root.reversed().as_bytes());
        out[68..72].copy_from_slice(&self.time.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Block hash (display order).
    #[must_use]
    pub fn block_hash(&self) -> Digest {
        hash_bytes(&self.to_bytes())
    }

    /// Target encoded by [`Header::bits`].
    #[must_use]
    pub fn target(&self) -> BigUint {
        target_from_bits(self.bits)
    }

    /// `true` when the block hash, read as a big-endian number, does not
    /// exceed the target.
    #[must_use]
    pub fn meets_target(&self) -> bool {
        hash_meets_target(&self.block_hash(), self.bits)
    }
}

/// Block hash of a raw header.
pub fn block_hash(raw: &[u8]) -> Result<Digest, HeaderError> {
    if raw.len() != HEADER_LEN {
        return Err(HeaderError::InvalidLength(raw.len()));
    }
    Ok(hash_bytes(raw))
}

/// Proof-of-work check on a raw header.
pub fn meets_target(raw: &[u8]) -> Result<bool, HeaderError> {
    Ok(Header::from_bytes(raw)?.meets_target())
}

/// Decode compact `bits`: `mantissa * 256^(exponent - 3)` where the mantissa
/// is the low three bytes and the exponent the high byte.
#[must_use]
pub fn target_from_bits(bits: u32) -> BigUint {
    let mantissa = BigUint::from(bits & 0x00ff_ffff);
    let exponent = bits >> 24;
    if exponent >= 3 {
        mantissa << (8 * (exponent - 3))
    } else {
        mantissa >> (8 * (3 - exponent))
    }
}

/// `hash <= target(bits)`, with the hash read as a big-endian number.
#[must_use]
pub fn hash_meets_target(hash: &Digest, bits: u32) -> bool {
    BigUint::from_bytes_be(hash.as_bytes()) <= target_from_bits(bits)
}

fn word(raw: &[u8; HEADER_LEN], at: usize) -> [u8; 4] {
    [raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]
}

fn internal_digest(raw: &[u8; HEADER_LEN], at: usize) -> Digest {
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&raw[at..at + DIGEST_LEN]);
    Digest::new(bytes).reversed()
}
