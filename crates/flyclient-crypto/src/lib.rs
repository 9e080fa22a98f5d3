// crates/flyclient-crypto/src/lib.rs

//! Minimal crypto substrate: 32-byte digests and the chain hash.
//!
//! The chain hash is Bitcoin's block-hash construction: `sha256(sha256(x))`
//! with the output byte order reversed, so digests read the way block
//! explorers print them. Every internal MMR node combines its children with
//! [`chain_hash`], and a block header hashes to its leaf with [`hash_bytes`].
//!
//! ⚠️ The byte order of a [`Digest`] is the **display** order: the bytes of its
//! hex string. A verifier recomputing a root must hash the same bytes.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

/// Digest width in bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of the canonical hex form.
pub const DIGEST_HEX_LEN: usize = 2 * DIGEST_LEN;

/// Errors produced when decoding a digest from text or bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    /// Input was not valid hexadecimal.
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),
    /// Input decoded to the wrong number of bytes.
    #[error("digest must be {DIGEST_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Opaque 32-byte digest (block hash, MMR node root, transaction id).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    /// The all-zero digest (e.g. the previous-hash field of a genesis header).
    pub const ZERO: Self = Self([0u8; DIGEST_LEN]);

    /// Wrap raw bytes.
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Build from a byte slice of exactly [`DIGEST_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DigestError> {
        let arr: [u8; DIGEST_LEN] = bytes
            .try_into()
            .map_err(|_| DigestError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Parse the 64-character hex form (case-insensitive, optional `0x`).
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| DigestError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Canonical lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Copy with the byte order reversed (display order ↔ internal order).
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut out = self.0;
        out.reverse();
        Self(out)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Digests travel as hex strings in JSON and CBOR alike, matching how the
// chain tooling prints them.
impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// `reverse(sha256(sha256(data)))`.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> Digest {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&second);
    out.reverse();
    Digest(out)
}

/// Combine two digests: [`hash_bytes`] over `left || right`.
#[must_use]
pub fn chain_hash(left: &Digest, right: &Digest) -> Digest {
    let mut buf = [0u8; 2 * DIGEST_LEN];
    buf[..DIGEST_LEN].copy_from_slice(&left.0);
    buf[DIGEST_LEN..].copy_from_slice(&right.0);
    hash_bytes(&buf)
}
