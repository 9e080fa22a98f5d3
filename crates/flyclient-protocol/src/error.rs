//! Session-level error taxonomy.

use crate::{OracleError, Outcome};
use flyclient_mmr::MmrError;

/// Errors surfaced by [`crate::ProverSession`] and the duel runner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Accumulator lookup failed.
    #[error(transparent)]
    Mmr(#[from] MmrError),

    /// The verifier refused or failed a call.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Headers and digests do not line up.
    #[error("chain has {digests} digests but {headers} headers")]
    MisalignedChain {
        /// Number of digests.
        digests: usize,
        /// Number of headers.
        headers: usize,
    },

    /// The committed height is not a block of the chain.
    #[error("committed height {height} is outside a chain of {len} blocks")]
    InvalidCommittedHeight {
        /// Requested height.
        height: u64,
        /// Chain length.
        len: u64,
    },

    /// The verifier asked for a block the chain does not have.
    #[error("verifier requested height {height} from a chain of {len} blocks")]
    InvalidRevealHeight {
        /// Requested height, as decoded.
        height: i64,
        /// Chain length.
        len: u64,
    },

    /// A directive word does not fit a signed 64-bit integer.
    #[error("directive {0} does not fit in 64 bits")]
    DirectiveOutOfRange(String),

    /// Too many consecutive wait codes.
    #[error("gave up after {polls} consecutive wait codes")]
    WaitBudgetExhausted {
        /// Polls made in the streak.
        polls: u64,
    },

    /// Stopped waiting because the other participant of a duel failed.
    #[error("stopped waiting: the counterpart session failed")]
    CounterpartFailed,

    /// The session already reached a terminal outcome.
    #[error("session already terminated ({0})")]
    AlreadyTerminated(Outcome),

    /// An operation was called in a state that does not allow it.
    #[error("cannot {operation} while {state}")]
    OutOfOrder {
        /// Attempted operation.
        operation: &'static str,
        /// State name at the time of the call.
        state: &'static str,
    },
}
