//! Error taxonomy for accumulator and path operations.

use flyclient_crypto::Digest;

/// Errors raised by [`crate::MmrAccumulator`] and the standalone path helpers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MmrError {
    /// The digest is not a leaf of the accumulator.
    #[error("digest {0} is not a leaf of the accumulator")]
    NotFound(Digest),

    /// Index 0, or an index beyond either end of the leaf sequence.
    #[error("invalid leaf index {index} for an accumulator of {len} leaves")]
    InvalidIndex {
        /// Requested index (1-based, or negative from the end).
        index: i64,
        /// Number of leaves at the time of the request.
        len: u64,
    },

    /// The operation needs at least one leaf.
    #[error("operation requires a non-empty accumulator")]
    EmptyAccumulator,

    /// Proof length disagrees with the exact path length of the leaf.
    #[error("proof has {actual} siblings, expected exactly {expected}")]
    ProofLengthMismatch {
        /// Exact path length for the leaf position.
        expected: usize,
        /// Number of siblings supplied.
        actual: usize,
    },

    /// The folded proof does not reproduce the root.
    #[error("proof does not fold to the committed root")]
    RootMismatch,

    /// A serialized path is not a whole number of digests.
    #[error("invalid path encoding: {0}")]
    InvalidPathEncoding(String),
}
