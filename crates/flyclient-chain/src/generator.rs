// crates/flyclient-chain/src/generator.rs

//! Deterministic honest/adversary chain pairs for simulations and tests.
//!
//! Both chains start at the regtest genesis block and share every header
//! outside the fork window. The honest chain is mined against the regtest
//! target. Inside the window the adversary carries its own coinbase
//! transactions, and its headers are ground to *miss* the target: it cannot
//! afford the work, which is what sampling is meant to expose.

use crate::header::{Header, HEADER_LEN};
use anyhow::{bail, Result};
use flyclient_core::{ChainData, ChainFile, ForkWindow, Height, Role};
use flyclient_crypto::{hash_bytes, Digest};
use rand::{rngs::StdRng, Rng as _, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Compact target of regtest (`0x7fffff * 256^29`).
pub const REGTEST_BITS: u32 = 0x207f_ffff;

/// Timestamp of the regtest genesis block.
pub const REGTEST_GENESIS_TIME: u32 = 1_296_688_602;

/// Nominal spacing between synthetic blocks, in seconds.
const BLOCK_INTERVAL: u32 = 600;

/// Version field of synthetic blocks (BIP9 signalling base).
const BLOCK_VERSION: i32 = 0x2000_0000;

/// Coinbase id of the regtest genesis block (display order).
const REGTEST_GENESIS_MERKLE: [u8; 32] = [
    0x4a, 0x5e, 0x1e, 0x4b, 0xaa, 0xb8, 0x9f, 0x3a, 0x32, 0x51, 0x8a, 0x88, 0xc3, 0x1b, 0xc8, 0x7f,
    0x61, 0x8f, 0x76, 0x67, 0x3e, 0x2c, 0xc7, 0x7a, 0xb2, 0x12, 0x7b, 0x7a, 0xfd, 0xed, 0xa3, 0x3b,
];

/// Generator inputs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorParams {
    /// Number of blocks in each chain, genesis included.
    pub length: u64,
    /// Where the adversary diverges.
    pub fork: ForkWindow,
    /// RNG seed for the synthetic coinbase payloads.
    pub seed: u64,
}

impl Default for GeneratorParams {
    /// Genesis plus 201 blocks with a ten-block closed fork at heights
    /// `[101, 111)`.
    fn default() -> Self {
        Self {
            length: 202,
            fork: ForkWindow::Closed {
                start: 101,
                end: 111,
            },
            seed: 42,
        }
    }
}

/// Output of [`generate_pair`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainPair {
    /// Honest chain (every header meets its target).
    pub honest: ChainFile,
    /// Forked chain.
    pub adversary: ChainFile,
    /// The window both files are tagged with.
    pub fork: ForkWindow,
}

/// Header of the regtest genesis block.
#[must_use]
pub fn regtest_genesis() -> Header {
    Header {
        version: 1,
        prev_block: Digest::ZERO,
        merkle_root: Digest::new(REGTEST_GENESIS_MERKLE),
        time: REGTEST_GENESIS_TIME,
        bits: REGTEST_BITS,
        nonce: 2,
    }
}

/// Generate an honest chain and its forked counterpart.
///
/// The fork must leave genesis shared (`start >= 2`); a closed window must be
/// non-empty and end within the chain.
pub fn generate_pair(params: &GeneratorParams) -> Result<ChainPair> {
    let GeneratorParams { length, fork, seed } = *params;
    let last_forked = match fork {
        ForkWindow::Closed { start, end } => {
            if end <= start {
                bail!("empty fork window [{start}, {end})");
            }
            if end > length {
                bail!("fork window [{start}, {end}) ends past chain length {length}");
            }
            end - 1
        }
        ForkWindow::Open { .. } => length,
    };
    if fork.start() < 2 {
        bail!("fork must start after genesis (start = {})", fork.start());
    }
    if fork.start() > length {
        bail!("fork start {} is past chain length {length}", fork.start());
    }

    let mut rng = StdRng::seed_from_u64(seed);

    let mut honest = ChainData::default();
    push_block(&mut honest, regtest_genesis(), Digest::new(REGTEST_GENESIS_MERKLE));
    for height in 2..=length {
        let (header, txid) = next_block(&mut rng, &honest, height, Role::Honest);
        push_block(&mut honest, header, txid);
    }

    let mut adversary = honest.clone();
    for height in fork.start()..=last_forked {
        let (header, txid) = next_block(&mut rng, &adversary, height, Role::Adversary);
        let i = index(height);
        adversary.digests[i] = header.block_hash();
        adversary.headers[i] = header.to_bytes().to_vec();
        adversary.transactions[i] = txid;
    }

    debug!(length, %fork, seed, "generated chain pair");

    Ok(ChainPair {
        honest: ChainFile::new(Role::Honest, Some(fork), honest),
        adversary: ChainFile::new(Role::Adversary, Some(fork), adversary),
        fork,
    })
}

/// Build the header at `height` on top of `chain[height - 1]`.
fn next_block(
    rng: &mut StdRng,
    chain: &ChainData,
    height: Height,
    role: Role,
) -> (Header, Digest) {
    let txid = synthetic_coinbase(rng, height, role);
    let mut header = Header {
        version: BLOCK_VERSION,
        prev_block: chain.digests[index(height - 1)],
        merkle_root: txid,
        time: block_time(height),
        bits: REGTEST_BITS,
        nonce: 0,
    };
    // Honest blocks are mined; adversarial ones are ground to miss the target.
    let want = !role.is_adversary();
    while header.meets_target() != want {
        header.nonce = header.nonce.wrapping_add(1);
    }
    (header, txid)
}

/// Id of a one-transaction coinbase; with a single transaction it is also
/// the block's merkle root.
fn synthetic_coinbase(rng: &mut StdRng, height: Height, role: Role) -> Digest {
    let mut payload = Vec::with_capacity(48);
    payload.extend_from_slice(b"coinbase");
    payload.extend_from_slice(&height.to_le_bytes());
    payload.push(u8::from(role.is_adversary()));
    payload.extend_from_slice(&rng.random::<[u8; 16]>());
    hash_bytes(&payload)
}

fn push_block(chain: &mut ChainData, header: Header, txid: Digest) {
    let raw = header.to_bytes();
    debug_assert_eq!(raw.len(), HEADER_LEN);
    chain.digests.push(header.block_hash());
    chain.headers.push(raw.to_vec());
    chain.transactions.push(txid);
}

fn block_time(height: Height) -> u32 {
    let offset = (height - 1).saturating_mul(u64::from(BLOCK_INTERVAL));
    u32::try_from(u64::from(REGTEST_GENESIS_TIME).saturating_add(offset)).unwrap_or(u32::MAX)
}

#[inline]
const fn index(height: Height) -> usize {
    (height - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGTEST_GENESIS_HASH: &str =
        "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206";

    fn small(fork: ForkWindow) -> GeneratorParams {
        GeneratorParams {
            length: 24,
            fork,
            seed: 7,
        }
    }

    #[test]
    fn genesis_is_regtest() {
        let g = regtest_genesis();
        assert_eq!(g.block_hash().to_hex(), REGTEST_GENESIS_HASH);
        assert!(g.meets_target());
    }

    #[test]
    fn closed_fork_reconverges() {
        let fork = ForkWindow::Closed { start: 5, end: 9 };
        let pair = generate_pair(&small(fork)).unwrap();
        let (h, a) = (&pair.honest.chain, &pair.adversary.chain);
        assert_eq!(h.len(), 24);
        assert_eq!(a.len(), 24);
        assert!(h.is_aligned() && a.is_aligned());
        assert_eq!(pair.honest.fork, Some(fork));
        assert_eq!(pair.adversary.role, Role::Adversary);

        for height in 1..=24u64 {
            let i = index(height);
            let hh = Header::from_bytes(&h.headers[i]).unwrap();
            let ah = Header::from_bytes(&a.headers[i]).unwrap();
            assert_eq!(hh.block_hash(), h.digests[i]);
            assert_eq!(ah.block_hash(), a.digests[i]);
            assert!(hh.meets_target(), "honest height {height}");
            if fork.contains(height) {
                assert_ne!(h.digests[i], a.digests[i]);
                assert_ne!(h.transactions[i], a.transactions[i]);
                assert!(!ah.meets_target(), "adversary height {height}");
            } else {
                assert_eq!(h.digests[i], a.digests[i]);
                assert_eq!(h.headers[i], a.headers[i]);
            }
        }
    }

    #[test]
    fn headers_link_within_each_chain() {
        let pair = generate_pair(&small(ForkWindow::Open { start: 10 })).unwrap();
        for chain in [&pair.honest.chain, &pair.adversary.chain] {
            for i in 1..chain.len() {
                let hdr = Header::from_bytes(&chain.headers[i]).unwrap();
                assert_eq!(hdr.prev_block, chain.digests[i - 1]);
                assert_eq!(hdr.merkle_root, chain.transactions[i]);
            }
        }
        // Open: the adversary never rejoins.
        assert_ne!(
            pair.honest.chain.digests.last(),
            pair.adversary.chain.digests.last()
        );
    }

    #[test]
    fn same_seed_same_chains() {
        let p = small(ForkWindow::Closed { start: 3, end: 6 });
        assert_eq!(generate_pair(&p).unwrap(), generate_pair(&p).unwrap());
        let other = GeneratorParams { seed: 8, ..p };
        assert_ne!(
            generate_pair(&p).unwrap().honest,
            generate_pair(&other).unwrap().honest
        );
    }

    #[test]
    fn bad_windows_are_rejected() {
        for fork in [
            ForkWindow::Closed { start: 1, end: 4 },
            ForkWindow::Closed { start: 6, end: 6 },
            ForkWindow::Closed { start: 6, end: 40 },
            ForkWindow::Open { start: 25 },
            ForkWindow::Open { start: 0 },
        ] {
            assert!(generate_pair(&small(fork)).is_err(), "{fork}");
        }
    }

    #[test]
    fn default_matches_demo_layout() {
        let p = GeneratorParams::default();
        assert_eq!(p.length, 202);
        assert_eq!(p.fork, ForkWindow::Closed { start: 101, end: 111 });
    }
}
