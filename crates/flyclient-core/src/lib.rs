//! flyclient-core: shared chain types, fork metadata and file I/O.
//!
//! This crate defines the **stable boundary** used across FlyClient crates:
//! - chain data as the external data source supplies it (`ChainData`: aligned
//!   block hashes and raw headers),
//! - fork-window metadata and the inclusion flag derived from it,
//! - the serialized chain envelope (`ChainFile`) and JSON/CBOR helpers.
//!
//! ```no_run
//! use flyclient_core::io::read_chain_file_auto;
//! let file = read_chain_file_auto("honest.cbor")?;
//! println!("{} blocks, fork {:?}", file.chain.len(), file.fork);
//! # Ok::<(), anyhow::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// JSON/CBOR helpers and auto-detecting read/write APIs.
pub mod io;
/// Canonical core data types shared across the workspace.
pub mod types;

pub use types::*;

/// Re-export so downstream crates need a single import for digests.
pub use flyclient_crypto::{Digest, DigestError};
