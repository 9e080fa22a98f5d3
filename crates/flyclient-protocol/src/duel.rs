//! Two provers against one verifier.

use crate::directive::Outcome;
use crate::oracle::{AccountId, VerifierOracle};
use crate::session::{ProverSession, SessionConfig};
use crate::ProtocolError;
use flyclient_core::Role;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::info;

/// How one participant fared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantReport {
    /// Side of the duel.
    pub role: Role,
    /// Account used.
    pub account: AccountId,
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Gas per call, in call order.
    pub gas: Vec<u64>,
}

impl ParticipantReport {
    fn from_session(session: &ProverSession, outcome: Outcome) -> Self {
        Self {
            role: session.role(),
            account: session.account(),
            outcome,
            gas: session.gas().to_vec(),
        }
    }

    /// Total gas spent.
    #[must_use]
    pub fn total_gas(&self) -> u64 {
        self.gas.iter().sum()
    }

    /// Running gas total after each call.
    #[must_use]
    pub fn cumulative_gas(&self) -> Vec<u64> {
        self.gas
            .iter()
            .scan(0u64, |acc, g| {
                *acc += g;
                Some(*acc)
            })
            .collect()
    }
}

/// Result of [`run_duel`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuelReport {
    /// The forked chain's prover.
    pub adversary: ParticipantReport,
    /// The honest prover.
    pub honest: ParticipantReport,
}

/// Commit the adversary then the honest prover on this thread, run both
/// sessions on their own threads and wait for both.
///
/// `config` replaces the wait policy of both sessions. When one session
/// fails, the other stops at its next wait and the first failure is
/// returned; if both fail on their own, the adversary's error wins.
pub fn run_duel<O>(
    oracle: &O,
    mut adversary: ProverSession,
    mut honest: ProverSession,
    config: &SessionConfig,
) -> Result<DuelReport, ProtocolError>
where
    O: VerifierOracle + Sync + ?Sized,
{
    adversary.set_config(*config);
    honest.set_config(*config);

    adversary.commit(oracle)?;
    honest.commit(oracle)?;

    let abort = AtomicBool::new(false);
    let (adv_result, honest_result) = thread::scope(|s| {
        let adv = s.spawn(|| run_participant(&mut adversary, oracle, &abort));
        let hon = s.spawn(|| run_participant(&mut honest, oracle, &abort));
        (join(adv), join(hon))
    });

    let (adv_outcome, honest_outcome) = match (adv_result, honest_result) {
        (Ok(a), Ok(h)) => (a, h),
        (Err(ProtocolError::CounterpartFailed), Err(e)) | (Err(e), _) | (_, Err(e)) => return Err(e),
    };
    let report = DuelReport {
        adversary: ParticipantReport::from_session(&adversary, adv_outcome),
        honest: ParticipantReport::from_session(&honest, honest_outcome),
    };
    info!(
        adversary = %report.adversary.outcome,
        adversary_gas = report.adversary.total_gas(),
        honest = %report.honest.outcome,
        honest_gas = report.honest.total_gas(),
        "duel finished"
    );
    Ok(report)
}

fn run_participant<O>(
    session: &mut ProverSession,
    oracle: &O,
    abort: &AtomicBool,
) -> Result<Outcome, ProtocolError>
where
    O: VerifierOracle + ?Sized,
{
    // Raised on error and on unwind alike.
    let guard = AbortOnDrop(abort);
    let result = session.run_until_aborted(oracle, abort);
    if result.is_ok() {
        std::mem::forget(guard);
    }
    result
}

struct AbortOnDrop<'a>(&'a AtomicBool);

impl Drop for AbortOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(v) => v,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
