//! Persisted commitment over a chain's header digests.
//!
//! A manifest is what a verifier keeps: the root and leaf count. It is enough
//! to check any revealed path with [`crate::verify_path`] and to confirm that
//! a chain file still matches what was committed.

use crate::{path, MmrAccumulator, MmrError};
use anyhow::{anyhow, Context, Result};
use flyclient_core::{io as core_io, ChainData, Digest};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Format version for [`MmrManifest`].
pub const MANIFEST_VERSION: u32 = 1;

/// Root and leaf count of an accumulator.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MmrManifest {
    /// Schema version.
    pub version: u32,
    /// Root digest (`None` for an empty commitment).
    pub root: Option<Digest>,
    /// Number of leaves.
    pub leaf_count: u64,
}

impl MmrManifest {
    /// Check a revealed path against this commitment.
    pub fn verify_path(
        &self,
        height: u64,
        leaf: &Digest,
        proof: &[Digest],
    ) -> Result<(), MmrError> {
        let root = self.root.ok_or(MmrError::EmptyAccumulator)?;
        path::verify_path(&root, self.leaf_count, height, leaf, proof)
    }
}

/// Manifest of an in-memory accumulator.
#[must_use]
pub fn commit(acc: &MmrAccumulator) -> MmrManifest {
    MmrManifest {
        version: MANIFEST_VERSION,
        root: acc.root(),
        leaf_count: acc.leaf_count(),
    }
}

/// Manifest over the header digests of `chain`.
#[must_use]
pub fn commit_chain(chain: &ChainData) -> MmrManifest {
    commit(&MmrAccumulator::build(&chain.digests))
}

/// Read a chain file, commit its digests, write the manifest and return it.
pub fn commit_chain_file<P: AsRef<Path>, Q: AsRef<Path>>(
    chain_path: P,
    out_manifest_path: Q,
) -> Result<MmrManifest> {
    let path = chain_path.as_ref();
    let file = core_io::read_chain_file_auto(path)
        .with_context(|| format!("read chain {}", path.display()))?;
    let manifest = commit_chain(&file.chain);
    write_manifest_auto(&out_manifest_path, &manifest)?;
    info!(
        role = %file.role,
        leaves = manifest.leaf_count,
        root = %display_root(manifest.root),
        manifest = %out_manifest_path.as_ref().display(),
        "committed chain"
    );
    Ok(manifest)
}

/// Recompute root and leaf count and compare them with `man`.
pub fn validate_against_manifest(acc: &MmrAccumulator, man: &MmrManifest) -> Result<()> {
    if man.version != MANIFEST_VERSION {
        return Err(anyhow!(
            "unsupported manifest version {} (expected {MANIFEST_VERSION})",
            man.version
        ));
    }
    let recomputed = commit(acc);
    if recomputed.root != man.root {
        return Err(anyhow!(
            "root mismatch: manifest={}, recomputed={}",
            display_root(man.root),
            display_root(recomputed.root)
        ));
    }
    if recomputed.leaf_count != man.leaf_count {
        return Err(anyhow!(
            "leaf count mismatch: manifest={}, recomputed={}",
            man.leaf_count,
            recomputed.leaf_count
        ));
    }
    Ok(())
}

/// Verify that a chain file matches a manifest file.
pub fn verify_chain_file_against_manifest<P: AsRef<Path>, Q: AsRef<Path>>(
    chain_path: P,
    manifest_path: Q,
) -> Result<()> {
    let path = chain_path.as_ref();
    let man = read_manifest_auto(&manifest_path)?;
    let file = core_io::read_chain_file_auto(path)
        .with_context(|| format!("read chain {}", path.display()))?;
    validate_against_manifest(&MmrAccumulator::build(&file.chain.digests), &man)
}

/* -------------------- Manifest IO (JSON/CBOR) -------------------- */

/// Read a manifest, format chosen by extension (`.json` / `.cbor`).
pub fn read_manifest_auto<P: AsRef<Path>>(path: P) -> Result<MmrManifest> {
    let path_ref = path.as_ref();
    core_io::read_auto(path_ref).with_context(|| format!("read manifest {}", path_ref.display()))
}

/// Write a manifest (JSON unless the extension is `.cbor`).
pub fn write_manifest_auto<P: AsRef<Path>>(path: P, v: &MmrManifest) -> Result<()> {
    let path_ref = path.as_ref();
    core_io::write_auto(path_ref, v)
        .with_context(|| format!("write manifest {}", path_ref.display()))
}

fn display_root(root: Option<Digest>) -> String {
    root.map_or_else(|| "<empty>".to_owned(), |d| d.to_hex())
}
