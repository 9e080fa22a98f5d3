//! Block headers and synthetic chain pairs.
//!
//! - `header`: the 80-byte header layout, block hash, compact-target decoding
//!   and the proof-of-work check a verifier applies to revealed blocks.
//! - `generator`: a seeded honest/adversary chain pair with a closed or open
//!   fork window, standing in for a regtest node.
//!
//! Callers use module paths such as `flyclient_chain::header::Header`.

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

/// Seeded honest/adversary chain generator.
pub mod generator;
/// Header fields, block hash and proof-of-work target.
pub mod header;
