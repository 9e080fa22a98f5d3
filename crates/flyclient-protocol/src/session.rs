//! One participant's side of the sampling protocol.
//!
//! ```text
//! Init --commit--> Committed --verify--> Verifying --(0)--> Sampling
//!                                 |  ^  (-1)                   |  ^
//!                                 |  +--+                      |  +-- reveal / wait
//!                                 +--(agree)--> Done(Agreed)   +--(-2/-3/-4)--> Done(..)
//! ```
//!
//! Every oracle call is blocking and calls are strictly sequential. A
//! `submit_block` is only issued after the `get_next` that asked for it.

use crate::directive::{Directive, Outcome, Verdict};
use crate::oracle::{AccountId, Commitment, OracleError, Receipt, VerifierOracle};
use crate::ProtocolError;
use flyclient_core::{inclusion_index, ChainFile, ForkWindow, Height, Role, TxId};
use flyclient_mmr::{MmrAccumulator, MmrError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Where a session is in the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, nothing sent.
    Init,
    /// Commitment accepted.
    Committed,
    /// Waiting for the counterpart's commitment.
    Verifying,
    /// Sampling game in progress.
    Sampling,
    /// Terminal.
    Done(Outcome),
}

impl SessionState {
    /// Short name used in errors and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Committed => "committed",
            Self::Verifying => "verifying",
            Self::Sampling => "sampling",
            Self::Done(_) => "done",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(o) => write!(f, "done({o})"),
            s => f.write_str(s.name()),
        }
    }
}

/// Wait policy for `-1` codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sleep between polls.
    pub poll_interval: Duration,
    /// Consecutive waits tolerated before giving up (`None`: unbounded).
    pub max_polls: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            max_polls: None,
        }
    }
}

/// A prover's chain, its accumulator and its protocol state.
#[derive(Clone, Debug)]
pub struct ProverSession {
    account: AccountId,
    role: Role,
    fork: Option<ForkWindow>,
    mmr: MmrAccumulator,
    headers: Vec<Vec<u8>>,
    height: Height,
    tx_id: TxId,
    merkle_proof: Vec<u8>,
    next: i64,
    pending: Option<Height>,
    waiting: bool,
    state: SessionState,
    gas: Vec<u64>,
    config: SessionConfig,
}

impl ProverSession {
    /// Build a session committing to `tx_id` at `height` of `file`'s chain.
    pub fn new(
        account: AccountId,
        file: ChainFile,
        height: Height,
        tx_id: TxId,
    ) -> Result<Self, ProtocolError> {
        let ChainFile {
            role, fork, chain, ..
        } = file;
        if chain.headers.len() != chain.digests.len() {
            return Err(ProtocolError::MisalignedChain {
                digests: chain.digests.len(),
                headers: chain.headers.len(),
            });
        }
        let len = chain.len() as u64;
        if height == 0 || height > len {
            return Err(ProtocolError::InvalidCommittedHeight { height, len });
        }
        Ok(Self {
            account,
            role,
            fork,
            mmr: MmrAccumulator::from_leaves(chain.digests),
            headers: chain.headers,
            height,
            tx_id,
            merkle_proof: Vec::new(),
            next: 0,
            pending: None,
            waiting: false,
            state: SessionState::Init,
            gas: Vec::new(),
            config: SessionConfig::default(),
        })
    }

    /// Replace the wait policy.
    #[must_use]
    pub const fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a transaction merkle proof to the commitment.
    #[must_use]
    pub fn with_merkle_proof(mut self, proof: Vec<u8>) -> Self {
        self.merkle_proof = proof;
        self
    }

    /// Replace the wait policy in place.
    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    /* ---------------- Accessors ---------------- */

    /// Account used for every call.
    #[must_use]
    pub const fn account(&self) -> AccountId {
        self.account
    }

    /// Side of the duel.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Terminal outcome, once reached.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        match self.state {
            SessionState::Done(o) => Some(o),
            _ => None,
        }
    }

    /// Latest `getNext` code.
    #[must_use]
    pub const fn next(&self) -> i64 {
        self.next
    }

    /// Committed height.
    #[must_use]
    pub const fn height(&self) -> Height {
        self.height
    }

    /// Transaction under dispute.
    #[must_use]
    pub const fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    /// The accumulator over this chain.
    #[must_use]
    pub const fn mmr(&self) -> &MmrAccumulator {
        &self.mmr
    }

    /// Gas charged per call, in call order.
    #[must_use]
    pub fn gas(&self) -> &[u64] {
        &self.gas
    }

    /// Sum of [`ProverSession::gas`].
    #[must_use]
    pub fn total_gas(&self) -> u64 {
        self.gas.iter().sum()
    }

    /// Inclusion claim sent with the commitment.
    #[must_use]
    pub fn inclusion_flag(&self) -> u8 {
        inclusion_index(self.fork.as_ref(), self.height, self.role)
    }

    /* ---------------- Protocol steps ---------------- */

    /// Send the commitment (`Init -> Committed`).
    pub fn commit<O: VerifierOracle + ?Sized>(&mut self, oracle: &O) -> Result<(), ProtocolError> {
        self.expect_state("commit", |s| matches!(s, SessionState::Init))?;
        info!(role = %self.role, height = self.height, "beginning to commit chain");

        let commitment = Commitment {
            header: self.header_at(self.height)?.to_vec(),
            height: self.height,
            tx_id: self.tx_id,
            merkle_proof: self.merkle_proof.clone(),
            inclusion_flag: self.inclusion_flag(),
            mmr_proof: self.mmr.path(self.height)?,
            leaf_count: self.mmr.leaf_count(),
            mmr_root: self.mmr.root().ok_or(MmrError::EmptyAccumulator)?,
        };
        let receipt = oracle.commitment(self.account, &commitment)?;
        self.charge(receipt);
        self.state = SessionState::Committed;
        info!(
            role = %self.role,
            leaves = commitment.leaf_count,
            root = %commitment.mmr_root,
            flag = commitment.inclusion_flag,
            "chain commitment is done"
        );
        Ok(())
    }

    /// Ask whether the counterpart agrees (one poll).
    pub fn verify<O: VerifierOracle + ?Sized>(
        &mut self,
        oracle: &O,
    ) -> Result<Verdict, ProtocolError> {
        self.expect_state("verify", |s| {
            matches!(s, SessionState::Committed | SessionState::Verifying)
        })?;
        debug!(role = %self.role, "checking whether the other prover agrees");

        let code = match oracle.verify(self.account, &self.tx_id) {
            Ok((word, receipt)) => {
                self.charge(receipt);
                word.to_i64()?
            }
            Err(OracleError::Conflict(msg)) => {
                debug!(role = %self.role, %msg, "verifier already decided");
                self.finish(Outcome::Agreed);
                return Ok(Verdict::Agreed);
            }
            Err(e) => return Err(e.into()),
        };

        let verdict = Verdict::from_code(code);
        match verdict {
            Verdict::Pending => {
                self.state = SessionState::Verifying;
                if !self.waiting {
                    warn!(role = %self.role, "the other prover hasn't committed yet");
                    self.waiting = true;
                }
            }
            Verdict::Disagree => {
                self.state = SessionState::Sampling;
                self.waiting = false;
                warn!(role = %self.role, "disagreeing with the other prover, launching sampling");
            }
            Verdict::Agreed => self.finish(Outcome::Agreed),
        }
        Ok(verdict)
    }

    /// Fetch the next directive (one poll).
    ///
    /// A reveal height is checked against the chain before it is accepted.
    pub fn get_next<O: VerifierOracle + ?Sized>(
        &mut self,
        oracle: &O,
    ) -> Result<Directive, ProtocolError> {
        self.expect_state("get_next", |s| matches!(s, SessionState::Sampling))?;
        if self.pending.is_some() {
            return Err(ProtocolError::OutOfOrder {
                operation: "get_next",
                state: "awaiting-submission",
            });
        }
        debug!(role = %self.role, "querying next block to sample");

        let (word, receipt) = oracle.get_next(self.account, &self.tx_id)?;
        self.charge(receipt);
        let code = word.to_i64()?;
        self.next = code;

        let directive = Directive::from_code(code);
        match directive {
            Directive::Wait => {
                if !self.waiting {
                    warn!(role = %self.role, "the other prover hasn't submitted all their proofs yet");
                    self.waiting = true;
                }
            }
            Directive::Done(outcome) => self.finish(outcome),
            Directive::Reveal(h) => {
                let len = self.mmr.leaf_count();
                let height = u64::try_from(h)
                    .ok()
                    .filter(|&x| x >= 1 && x <= len)
                    .ok_or(ProtocolError::InvalidRevealHeight { height: h, len })?;
                self.pending = Some(height);
                self.waiting = false;
                info!(role = %self.role, height, "received next block to be sampled");
            }
        }
        Ok(directive)
    }

    /// Reveal the block requested by the last `get_next`.
    pub fn submit_block<O: VerifierOracle + ?Sized>(
        &mut self,
        oracle: &O,
    ) -> Result<(), ProtocolError> {
        self.expect_state("submit_block", |s| matches!(s, SessionState::Sampling))?;
        let height = self.pending.ok_or(ProtocolError::OutOfOrder {
            operation: "submit_block",
            state: "no-pending-reveal",
        })?;
        info!(role = %self.role, height, "submitting block");

        let proof = self.mmr.path(height)?;
        let receipt = oracle.submit_block(
            self.account,
            &self.tx_id,
            self.header_at(height)?,
            &proof,
        )?;
        self.charge(receipt);
        self.pending = None;
        info!(role = %self.role, height, "submitted block");
        Ok(())
    }

    /// Drive the session to a terminal outcome.
    ///
    /// Commits first when still in `Init`; resumes from wherever the session
    /// stands otherwise.
    pub fn run<O: VerifierOracle + ?Sized>(&mut self, oracle: &O) -> Result<Outcome, ProtocolError> {
        self.run_until_aborted(oracle, &AtomicBool::new(false))
    }

    /// [`Self::run`], giving up with [`ProtocolError::CounterpartFailed`] at
    /// the next wait once `abort` is set.
    pub fn run_until_aborted<O: VerifierOracle + ?Sized>(
        &mut self,
        oracle: &O,
        abort: &AtomicBool,
    ) -> Result<Outcome, ProtocolError> {
        match self.state {
            SessionState::Done(o) => return Err(ProtocolError::AlreadyTerminated(o)),
            SessionState::Init => self.commit(oracle)?,
            _ => {}
        }

        let mut polls = 0;
        while matches!(
            self.state,
            SessionState::Committed | SessionState::Verifying
        ) {
            match self.verify(oracle)? {
                Verdict::Pending => self.wait(&mut polls, abort)?,
                Verdict::Disagree => {}
                Verdict::Agreed => {
                    info!(role = %self.role, "agreeing with the other prover on the transaction's inclusion");
                    return Ok(Outcome::Agreed);
                }
            }
        }

        polls = 0;
        if self.pending.is_some() {
            self.submit_block(oracle)?;
        }
        loop {
            match self.get_next(oracle)? {
                Directive::Wait => self.wait(&mut polls, abort)?,
                Directive::Reveal(_) => {
                    polls = 0;
                    self.submit_block(oracle)?;
                }
                Directive::Done(outcome) => return Ok(outcome),
            }
        }
    }

    /* ---------------- Helpers ---------------- */

    fn header_at(&self, height: Height) -> Result<&[u8], ProtocolError> {
        usize::try_from(height)
            .ok()
            .and_then(|h| h.checked_sub(1))
            .and_then(|i| self.headers.get(i))
            .map(Vec::as_slice)
            .ok_or_else(|| ProtocolError::InvalidRevealHeight {
                height: i64::try_from(height).unwrap_or(i64::MAX),
                len: self.headers.len() as u64,
            })
    }

    fn charge(&mut self, receipt: Receipt) {
        self.gas.push(receipt.gas_used);
    }

    fn finish(&mut self, outcome: Outcome) {
        self.state = SessionState::Done(outcome);
        self.pending = None;
        self.waiting = false;
        match outcome {
            Outcome::Agreed => {}
            Outcome::Success => info!(role = %self.role, %outcome, "protocol is over"),
            Outcome::Failure => error!(role = %self.role, %outcome, "protocol is over"),
            Outcome::Undetermined => error!(
                role = %self.role,
                %outcome,
                "protocol is over: couldn't determine which prover is the honest one"
            ),
        }
    }

    fn wait(&self, polls: &mut u64, abort: &AtomicBool) -> Result<(), ProtocolError> {
        if abort.load(Ordering::Acquire) {
            warn!(role = %self.role, "counterpart failed, abandoning the session");
            return Err(ProtocolError::CounterpartFailed);
        }
        *polls += 1;
        if self.config.max_polls.is_some_and(|max| *polls > max) {
            return Err(ProtocolError::WaitBudgetExhausted { polls: *polls });
        }
        if !self.config.poll_interval.is_zero() {
            std::thread::sleep(self.config.poll_interval);
        }
        Ok(())
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: impl Fn(SessionState) -> bool,
    ) -> Result<(), ProtocolError> {
        match self.state {
            SessionState::Done(o) => Err(ProtocolError::AlreadyTerminated(o)),
            s if allowed(s) => Ok(()),
            s => Err(ProtocolError::OutOfOrder {
                operation,
                state: s.name(),
            }),
        }
    }
}
