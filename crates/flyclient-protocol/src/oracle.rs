//! The verifier seam: four blocking calls, each answered with a receipt.
//!
//! Implementations decide ordering between participants and adjudication;
//! the session only reacts to the codes they return.

use crate::Word;
use flyclient_core::{Digest, Height, TxId};
use flyclient_mmr::path_to_bytes;
use std::fmt;

/// Error text a verifier uses once a transaction is decided.
pub const ALREADY_DETERMINED: &str = "a result already has been determined for this transaction";

/// Identity a participant signs its calls with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub u32);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

/// Payload of the `commitment` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    /// Raw header at the committed height (claimed to contain the transaction).
    pub header: Vec<u8>,
    /// 1-based committed height.
    pub height: Height,
    /// Transaction under dispute.
    pub tx_id: TxId,
    /// Transaction merkle proof inside the block (may be empty).
    pub merkle_proof: Vec<u8>,
    /// Inclusion claim, `0` or `1`.
    pub inclusion_flag: u8,
    /// MMR path of the committed header.
    pub mmr_proof: Vec<Digest>,
    /// Claimed chain length.
    pub leaf_count: u64,
    /// Claimed MMR root.
    pub mmr_root: Digest,
}

impl Commitment {
    /// Flat encoding of every field, as it would travel in calldata.
    #[must_use]
    pub fn calldata(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.header.len() + self.merkle_proof.len() + 32 * (self.mmr_proof.len() + 2) + 17,
        );
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(self.tx_id.as_bytes());
        out.extend_from_slice(&self.merkle_proof);
        out.push(self.inclusion_flag);
        out.extend_from_slice(&path_to_bytes(&self.mmr_proof));
        out.extend_from_slice(&self.leaf_count.to_be_bytes());
        out.extend_from_slice(self.mmr_root.as_bytes());
        out
    }
}

/// Proof that a call was executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Receipt {
    /// Gas charged for the call.
    pub gas_used: u64,
}

/// Failures reported by a verifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The verifier could not be reached or is in a broken state.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
    /// The transaction already has a result.
    #[error("{0}")]
    Conflict(String),
    /// The call was refused.
    #[error("call rejected: {0}")]
    Rejected(String),
}

impl OracleError {
    /// The conflict a verifier raises once a transaction is decided.
    #[must_use]
    pub fn already_determined() -> Self {
        Self::Conflict(ALREADY_DETERMINED.to_owned())
    }
}

/// On-chain verifier contract reached by blocking call/response.
///
/// Calls from one participant are strictly sequential; two participants may
/// call concurrently, hence the `&self` receivers.
pub trait VerifierOracle {
    /// Register a participant's chain commitment.
    fn commitment(&self, from: AccountId, commitment: &Commitment)
        -> Result<Receipt, OracleError>;

    /// Reveal the header requested by the last `get_next`, with its MMR path.
    fn submit_block(
        &self,
        from: AccountId,
        tx_id: &TxId,
        header: &[u8],
        mmr_proof: &[Digest],
    ) -> Result<Receipt, OracleError>;

    /// Next sampling directive for `from`.
    fn get_next(&self, from: AccountId, tx_id: &TxId) -> Result<(Word, Receipt), OracleError>;

    /// Compare both commitments.
    fn verify(&self, from: AccountId, tx_id: &TxId) -> Result<(Word, Receipt), OracleError>;
}

impl<O: VerifierOracle + ?Sized> VerifierOracle for &O {
    fn commitment(&self, from: AccountId, c: &Commitment) -> Result<Receipt, OracleError> {
        (**self).commitment(from, c)
    }

    fn submit_block(
        &self,
        from: AccountId,
        tx_id: &TxId,
        header: &[u8],
        mmr_proof: &[Digest],
    ) -> Result<Receipt, OracleError> {
        (**self).submit_block(from, tx_id, header, mmr_proof)
    }

    fn get_next(&self, from: AccountId, tx_id: &TxId) -> Result<(Word, Receipt), OracleError> {
        (**self).get_next(from, tx_id)
    }

    fn verify(&self, from: AccountId, tx_id: &TxId) -> Result<(Word, Receipt), OracleError> {
        (**self).verify(from, tx_id)
    }
}
