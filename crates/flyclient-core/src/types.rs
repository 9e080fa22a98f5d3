//! Canonical core types used across the FlyClient workspace.
//!
//! These live in `flyclient-core` and are re-exported at the crate root so
//! other crates can import via `flyclient_core::ChainData`,
//! `flyclient_core::ForkWindow`, etc.

use flyclient_crypto::Digest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Block height, 1-based (height `h` is element `h - 1` of a chain).
pub type Height = u64;

/// Transaction identifier (display byte order, like block hashes).
pub type TxId = Digest;

/// Schema version of [`ChainFile`].
pub const CHAIN_FILE_VERSION: u32 = 1;

/// Which side of the duel a chain or participant belongs to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Prover whose chain carries the honest proof of work.
    Honest,
    /// Prover presenting the forked chain.
    Adversary,
}

impl Role {
    /// `true` for [`Role::Adversary`].
    #[inline]
    #[must_use]
    pub const fn is_adversary(self) -> bool {
        matches!(self, Self::Adversary)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Padded so interleaved log lines from both provers stay aligned.
        match self {
            Self::Honest => f.write_str("Honest   "),
            Self::Adversary => f.write_str("Adversary"),
        }
    }
}

/// Height range over which the honest and adversarial chains differ.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ForkWindow {
    /// Heights in `[start, end)` differ; the chains reconverge at `end`.
    Closed {
        /// First divergent height.
        start: Height,
        /// First height after the divergence (exclusive bound).
        end: Height,
    },
    /// Heights `>= start` differ; no reconvergence.
    Open {
        /// First divergent height.
        start: Height,
    },
}

impl ForkWindow {
    /// First divergent height.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> Height {
        match *self {
            Self::Closed { start, .. } | Self::Open { start } => start,
        }
    }

    /// Returns `true` if the two chains differ at `height`.
    #[inline]
    #[must_use]
    pub const fn contains(&self, height: Height) -> bool {
        match *self {
            Self::Closed { start, end } => height >= start && height < end,
            Self::Open { start } => height >= start,
        }
    }

    /// Half of the paired transaction-inclusion check a participant claims
    /// when committing at `height`.
    ///
    /// Outside the window both sides claim `1`; inside it the adversary keeps
    /// claiming `1` while the honest side claims `0`.
    #[inline]
    #[must_use]
    pub const fn inclusion_index(&self, height: Height, role: Role) -> u8 {
        if !self.contains(height) || role.is_adversary() {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for ForkWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed { start, end } => write!(f, "closed[{start},{end})"),
            Self::Open { start } => write!(f, "open[{start},..)"),
        }
    }
}

/// Inclusion flag for a participant with optional fork metadata (`1` when no
/// fork is known).
#[inline]
#[must_use]
pub fn inclusion_index(fork: Option<&ForkWindow>, height: Height, role: Role) -> u8 {
    fork.map_or(1, |w| w.inclusion_index(height, role))
}

/// Aligned block hashes and raw headers of one chain.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainData {
    /// Block hash per height (leaf sequence of the MMR).
    pub digests: Vec<Digest>,
    /// Raw header bytes per height, aligned 1:1 with `digests`.
    #[serde(with = "hex_vec")]
    pub headers: Vec<Vec<u8>>,
    /// Coinbase transaction id per height (empty when unknown).
    #[serde(default)]
    pub transactions: Vec<TxId>,
}

impl ChainData {
    /// Number of blocks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// `true` if the chain has no blocks.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// `true` if headers (and transactions, when present) line up with digests.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.headers.len() == self.digests.len()
            && (self.transactions.is_empty() || self.transactions.len() == self.digests.len())
    }

    /// Header at 1-based `height`.
    #[must_use]
    pub fn header(&self, height: Height) -> Option<&[u8]> {
        let idx = usize::try_from(height.checked_sub(1)?).ok()?;
        self.headers.get(idx).map(Vec::as_slice)
    }

    /// Coinbase transaction id at 1-based `height`.
    #[must_use]
    pub fn transaction(&self, height: Height) -> Option<&TxId> {
        let idx = usize::try_from(height.checked_sub(1)?).ok()?;
        self.transactions.get(idx)
    }
}

/// Serialized envelope: one chain plus the fork metadata it was produced with.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainFile {
    /// Schema/encoding version.
    pub version: u32,
    /// Which participant this chain belongs to.
    pub role: Role,
    /// Divergence window against the counterpart chain, if known.
    #[serde(default)]
    pub fork: Option<ForkWindow>,
    /// The chain itself.
    pub chain: ChainData,
}

impl ChainFile {
    /// Wrap chain data with the current schema version.
    #[must_use]
    pub const fn new(role: Role, fork: Option<ForkWindow>, chain: ChainData) -> Self {
        Self {
            version: CHAIN_FILE_VERSION,
            role,
            fork,
            chain,
        }
    }
}

/// Serde adapter: `Vec<Vec<u8>>` as a list of hex strings.
mod hex_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &[Vec<u8>], s: S) -> Result<S::Ok, S::Error> {
        let strs: Vec<String> = v.iter().map(hex::encode).collect();
        strs.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let strs = Vec::<String>::deserialize(d)?;
        strs.iter()
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
