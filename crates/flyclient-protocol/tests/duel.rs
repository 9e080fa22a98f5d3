//! Full duels against the in-process verifier.

use flyclient_chain::generator::{generate_pair, ChainPair, GeneratorParams};
use flyclient_core::{Digest, ForkWindow, TxId};
use flyclient_protocol::local::GAS_BASE;
use flyclient_protocol::{
    run_duel, AccountId, Commitment, DuelReport, LocalVerifier, LocalVerifierConfig,
    OracleError, Outcome, ProtocolError, ProverSession, Receipt, SessionConfig, Verdict,
    VerifierOracle, Word,
};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const ADVERSARY: AccountId = AccountId(1);
const HONEST: AccountId = AccountId(2);

fn pair(fork: ForkWindow) -> ChainPair {
    generate_pair(&GeneratorParams {
        length: 40,
        fork,
        seed: 11,
    })
    .unwrap()
}

fn sessions(pair: ChainPair, height: u64) -> (ProverSession, ProverSession) {
    let tx = pair.adversary.chain.transactions[height as usize - 1];
    (
        ProverSession::new(ADVERSARY, pair.adversary, height, tx).unwrap(),
        ProverSession::new(HONEST, pair.honest, height, tx).unwrap(),
    )
}

fn config() -> SessionConfig {
    SessionConfig {
        poll_interval: Duration::from_micros(50),
        max_polls: Some(1_000_000),
    }
}

#[test]
fn agreement_outside_the_fork_window() {
    let (adv, hon) = sessions(pair(ForkWindow::Closed { start: 11, end: 21 }), 5);
    let verifier = LocalVerifier::default();
    let report = run_duel(&verifier, adv, hon, &config()).unwrap();
    assert_eq!(report.adversary.outcome, Outcome::Agreed);
    assert_eq!(report.honest.outcome, Outcome::Agreed);
    // Only the commitment and the verify polls are paid for.
    assert!(report.adversary.gas.iter().all(|&g| g > GAS_BASE));
}

#[test]
fn agreement_after_reconvergence() {
    let (adv, hon) = sessions(pair(ForkWindow::Closed { start: 11, end: 21 }), 30);
    let report = run_duel(&LocalVerifier::default(), adv, hon, &config()).unwrap();
    assert_eq!(report.adversary.outcome, Outcome::Agreed);
    assert_eq!(report.honest.outcome, Outcome::Agreed);
}

#[test]
fn adversary_is_caught_inside_the_fork() {
    // Every adversarial block after genesis misses its target, so the first
    // sampled height above 1 exposes it.
    let (adv, hon) = sessions(pair(ForkWindow::Open { start: 2 }), 20);
    assert_eq!(adv.inclusion_flag(), 1);
    assert_eq!(hon.inclusion_flag(), 0);

    let report = run_duel(&LocalVerifier::default(), adv, hon, &config()).unwrap();
    assert_eq!(report.adversary.outcome, Outcome::Failure);
    assert_eq!(report.honest.outcome, Outcome::Success);
    assert_eq!(report.adversary.account, ADVERSARY);
    assert!(report.honest.gas.len() >= 4);

    let cumulative = report.honest.cumulative_gas();
    assert_eq!(cumulative.last().copied(), Some(report.honest.total_gas()));
    assert!(cumulative.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn zero_budget_is_undetermined() {
    let (adv, hon) = sessions(pair(ForkWindow::Closed { start: 11, end: 21 }), 15);
    let verifier = LocalVerifier::new(LocalVerifierConfig { sample_budget: 0 });
    let report = run_duel(&verifier, adv, hon, &config()).unwrap();
    assert_eq!(report.adversary.outcome, Outcome::Undetermined);
    assert_eq!(report.honest.outcome, Outcome::Undetermined);
}

#[test]
fn verifier_admits_two_parties_once() {
    let p = pair(ForkWindow::Closed { start: 11, end: 21 });
    let tx = p.adversary.chain.transactions[14];
    let verifier = LocalVerifier::default();

    let mut adv = ProverSession::new(ADVERSARY, p.adversary.clone(), 15, tx).unwrap();
    adv.commit(&verifier).unwrap();
    // Counterpart missing: pending.
    assert_eq!(adv.verify(&verifier).unwrap(), Verdict::Pending);

    let mut again = ProverSession::new(ADVERSARY, p.adversary.clone(), 15, tx).unwrap();
    assert!(matches!(
        again.commit(&verifier),
        Err(ProtocolError::Oracle(OracleError::Rejected(_)))
    ));

    let mut hon = ProverSession::new(HONEST, p.honest.clone(), 15, tx).unwrap();
    hon.commit(&verifier).unwrap();

    let mut third = ProverSession::new(AccountId(3), p.honest, 15, tx).unwrap();
    assert!(matches!(
        third.commit(&verifier),
        Err(ProtocolError::Oracle(OracleError::Rejected(_)))
    ));

    assert_eq!(adv.verify(&verifier).unwrap(), Verdict::Disagree);
    assert_eq!(hon.verify(&verifier).unwrap(), Verdict::Disagree);
}

/// Local verifier that refuses every block submission from one account.
struct RefusesSubmissions {
    inner: LocalVerifier,
    from: AccountId,
}

impl VerifierOracle for RefusesSubmissions {
    fn commitment(&self, from: AccountId, c: &Commitment) -> Result<Receipt, OracleError> {
        self.inner.commitment(from, c)
    }

    fn submit_block(
        &self,
        from: AccountId,
        tx_id: &TxId,
        header: &[u8],
        mmr_proof: &[Digest],
    ) -> Result<Receipt, OracleError> {
        if from == self.from {
            return Err(OracleError::Unavailable("node went away".to_owned()));
        }
        self.inner.submit_block(from, tx_id, header, mmr_proof)
    }

    fn get_next(&self, from: AccountId, tx_id: &TxId) -> Result<(Word, Receipt), OracleError> {
        self.inner.get_next(from, tx_id)
    }

    fn verify(&self, from: AccountId, tx_id: &TxId) -> Result<(Word, Receipt), OracleError> {
        self.inner.verify(from, tx_id)
    }
}

fn duel_with_refusals(from: AccountId) -> Result<DuelReport, ProtocolError> {
    let (adv, hon) = sessions(pair(ForkWindow::Open { start: 2 }), 20);
    let oracle = RefusesSubmissions {
        inner: LocalVerifier::default(),
        from,
    };
    // Unbounded waits: only the failed side can end the counterpart's polling.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(run_duel(&oracle, adv, hon, &SessionConfig::default()));
    });
    rx.recv_timeout(Duration::from_secs(10))
        .expect("run_duel must return once a participant fails")
}

#[test]
fn failed_adversary_ends_the_duel_with_its_error() {
    assert_eq!(
        duel_with_refusals(ADVERSARY),
        Err(ProtocolError::Oracle(OracleError::Unavailable(
            "node went away".to_owned()
        )))
    );
}

#[test]
fn failed_honest_prover_error_is_not_masked() {
    assert_eq!(
        duel_with_refusals(HONEST),
        Err(ProtocolError::Oracle(OracleError::Unavailable(
            "node went away".to_owned()
        )))
    );
}
