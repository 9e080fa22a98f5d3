// crates/flyclient-mmr/src/lib.rs

//! Merkle Mountain Range accumulator over header digests.
//!
//! - Shape is a function of the leaf count alone: a node over `n` leaves puts
//!   the largest power of two strictly below `n` on the left (exactly half
//!   when `n` is a power of two).
//! - Internal roots are [`flyclient_crypto::chain_hash`] of the child roots.
//! - Paths are listed bottom-up and have *exact* length; see
//!   [`path_size_for`].
//! - Accumulators are values: every mutation returns a new revision, and
//!   appends share untouched subtrees with the previous one.
//!
//! ```
//! use flyclient_crypto::hash_bytes;
//! use flyclient_mmr::{verify_path, MmrAccumulator};
//!
//! let leaves: Vec<_> = (0u8..5).map(|i| hash_bytes(&[i])).collect();
//! let acc = MmrAccumulator::build(&leaves);
//! let proof = acc.path(3)?;
//! assert!(acc.verify_proof(3, &proof)?);
//! verify_path(&acc.root().unwrap(), 5, 3, &leaves[2], &proof)?;
//! # Ok::<(), flyclient_mmr::MmrError>(())
//! ```

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
#![allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]

mod accumulator;
mod error;
pub mod manifest;
mod node;
pub mod path;

pub use accumulator::{LeafRef, MmrAccumulator};
pub use error::MmrError;
pub use manifest::{commit, validate_against_manifest, MmrManifest, MANIFEST_VERSION};
pub use path::{
    decode_path_hex, encode_path_hex, path_from_bytes, path_size_for, path_to_bytes, verify_path,
};
