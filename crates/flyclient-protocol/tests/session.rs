//! State-machine transitions against a scripted verifier.

use flyclient_core::{ChainData, ChainFile, ForkWindow, Role};
use flyclient_crypto::{hash_bytes, Digest};
use flyclient_protocol::mock::{Call, ScriptedOracle};
use flyclient_protocol::oracle::ALREADY_DETERMINED;
use flyclient_protocol::{
    AccountId, Directive, OracleError, Outcome, ProtocolError, ProverSession, SessionConfig,
    SessionState, Verdict, Word,
};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

const ME: AccountId = AccountId(7);
const LEN: u8 = 9;

fn chain_file(role: Role, fork: Option<ForkWindow>) -> ChainFile {
    let headers: Vec<Vec<u8>> = (1..=LEN).map(|i| vec![i; 80]).collect();
    ChainFile::new(
        role,
        fork,
        ChainData {
            digests: headers.iter().map(|h| hash_bytes(h)).collect(),
            headers,
            transactions: vec![],
        },
    )
}

fn tx() -> Digest {
    hash_bytes(b"tx")
}

fn fast() -> SessionConfig {
    SessionConfig {
        poll_interval: Duration::ZERO,
        max_polls: None,
    }
}

fn session(height: u64) -> ProverSession {
    ProverSession::new(ME, chain_file(Role::Honest, None), height, tx())
        .unwrap()
        .with_config(fast())
}

fn submitted_headers(oracle: &ScriptedOracle) -> Vec<u8> {
    oracle
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::SubmitBlock { header, .. } => Some(header[0]),
            _ => None,
        })
        .collect()
}

#[test]
fn commitment_carries_the_claim() {
    let oracle = ScriptedOracle::new(100);
    let mut s = ProverSession::new(
        ME,
        chain_file(Role::Honest, Some(ForkWindow::Closed { start: 4, end: 6 })),
        5,
        tx(),
    )
    .unwrap()
    .with_merkle_proof(vec![0xab; 4]);
    s.commit(&oracle).unwrap();
    assert_eq!(s.state(), SessionState::Committed);
    assert_eq!(s.gas(), &[100]);

    let calls = oracle.calls();
    let [Call::Commitment(from, c)] = calls.as_slice() else {
        panic!("expected one commitment, got {calls:?}");
    };
    assert_eq!(*from, ME);
    assert_eq!(c.height, 5);
    assert_eq!(c.header, vec![5u8; 80]);
    assert_eq!(c.tx_id, tx());
    assert_eq!(c.merkle_proof, vec![0xab; 4]);
    assert_eq!(c.inclusion_flag, 0);
    assert_eq!(c.leaf_count, u64::from(LEN));
    assert_eq!(Some(c.mmr_root), s.mmr().root());
    assert_eq!(c.mmr_proof, s.mmr().path(5).unwrap());
}

#[test]
fn inclusion_flags_follow_the_fork_window() {
    let closed = Some(ForkWindow::Closed { start: 4, end: 6 });
    let flag = |role, fork, h| {
        ProverSession::new(ME, chain_file(role, fork), h, tx())
            .unwrap()
            .inclusion_flag()
    };
    assert_eq!(flag(Role::Honest, closed, 3), 1);
    assert_eq!(flag(Role::Honest, closed, 4), 0);
    assert_eq!(flag(Role::Honest, closed, 6), 1);
    assert_eq!(flag(Role::Adversary, closed, 5), 1);
    assert_eq!(flag(Role::Honest, Some(ForkWindow::Open { start: 4 }), 9), 0);
    assert_eq!(flag(Role::Honest, None, 5), 1);
}

#[test]
fn agreement_after_waiting_for_the_counterpart() {
    let oracle = ScriptedOracle::new(1).verify_codes([-1, -1, 1]);
    let mut s = session(3);
    assert_eq!(s.run(&oracle).unwrap(), Outcome::Agreed);
    assert_eq!(s.outcome(), Some(Outcome::Agreed));
    assert_eq!(s.gas().len(), 4);
    assert!(oracle
        .calls()
        .iter()
        .all(|c| !matches!(c, Call::GetNext(_) | Call::SubmitBlock { .. })));
}

#[test]
fn any_other_verify_code_is_agreement() {
    let oracle = ScriptedOracle::new(1).verify_codes([42]);
    let mut s = session(3);
    s.commit(&oracle).unwrap();
    assert_eq!(s.verify(&oracle).unwrap(), Verdict::Agreed);
    assert_eq!(s.state(), SessionState::Done(Outcome::Agreed));
}

#[test]
fn conflict_means_agreement() {
    let oracle = ScriptedOracle::new(1).verify_error(OracleError::already_determined());
    let mut s = session(3);
    assert_eq!(s.run(&oracle).unwrap(), Outcome::Agreed);
    // No receipt for the failed call.
    assert_eq!(s.gas().len(), 1);
    assert_eq!(
        OracleError::already_determined().to_string(),
        ALREADY_DETERMINED
    );
}

#[test]
fn waits_do_not_resubmit() {
    let oracle = ScriptedOracle::new(1)
        .verify_codes([0])
        .next_codes([3, -1, -1, 5, -1, -3]);
    let mut s = session(2);
    assert_eq!(s.run(&oracle).unwrap(), Outcome::Success);
    assert_eq!(submitted_headers(&oracle), vec![3, 5]);
    assert_eq!(s.next(), -3);
    assert_eq!(oracle.remaining(), (0, 0));

    // The revealed paths are the session's own.
    let proofs: Vec<Vec<Digest>> = oracle
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::SubmitBlock { mmr_proof, .. } => Some(mmr_proof),
            _ => None,
        })
        .collect();
    assert_eq!(proofs[0], s.mmr().path(3).unwrap());
    assert_eq!(proofs[1], s.mmr().path(5).unwrap());
}

#[test]
fn terminal_codes_are_reported_verbatim() {
    for (code, outcome) in [
        (-2, Outcome::Failure),
        (-3, Outcome::Success),
        (-4, Outcome::Undetermined),
    ] {
        let oracle = ScriptedOracle::new(1).verify_codes([0]).next_codes([code]);
        let mut s = session(1);
        assert_eq!(s.run(&oracle).unwrap(), outcome);
        assert_eq!(s.state(), SessionState::Done(outcome));
        assert!(submitted_headers(&oracle).is_empty());
    }
}

#[test]
fn bad_reveal_heights_are_rejected() {
    for code in [0i64, -5, i64::from(LEN) + 1] {
        let oracle = ScriptedOracle::new(1).verify_codes([0]).next_codes([code]);
        let mut s = session(1);
        assert_eq!(
            s.run(&oracle),
            Err(ProtocolError::InvalidRevealHeight {
                height: code,
                len: u64::from(LEN)
            })
        );
        assert!(submitted_headers(&oracle).is_empty());
    }
}

#[test]
fn oversized_directive_is_out_of_range() {
    let mut raw = vec![0u8; 32];
    raw[16] = 1; // 2^120
    let oracle = ScriptedOracle::new(1)
        .verify_codes([0])
        .next_word(Word::from_be_bytes(raw));
    let mut s = session(1);
    assert!(matches!(
        s.run(&oracle),
        Err(ProtocolError::DirectiveOutOfRange(_))
    ));
}

#[test]
fn wait_budget_is_enforced() {
    let oracle = ScriptedOracle::new(1).verify_codes([-1, -1, -1, -1]);
    let mut s = session(1).with_config(SessionConfig {
        poll_interval: Duration::ZERO,
        max_polls: Some(2),
    });
    assert_eq!(
        s.run(&oracle),
        Err(ProtocolError::WaitBudgetExhausted { polls: 3 })
    );
    assert_eq!(s.state(), SessionState::Verifying);
}

#[test]
fn terminal_states_have_no_exits() {
    let oracle = ScriptedOracle::new(1).verify_codes([1]);
    let mut s = session(1);
    s.run(&oracle).unwrap();
    let done = Err(ProtocolError::AlreadyTerminated(Outcome::Agreed));
    assert_eq!(s.run(&oracle), done);
    assert_eq!(s.commit(&oracle), Err(ProtocolError::AlreadyTerminated(Outcome::Agreed)));
    assert_eq!(s.verify(&oracle), Err(ProtocolError::AlreadyTerminated(Outcome::Agreed)));
    assert_eq!(
        s.get_next(&oracle),
        Err(ProtocolError::AlreadyTerminated(Outcome::Agreed))
    );
}

#[test]
fn steps_must_come_in_order() {
    let oracle = ScriptedOracle::new(1).verify_codes([0]).next_codes([4]);
    let mut s = session(1);
    assert!(matches!(
        s.get_next(&oracle),
        Err(ProtocolError::OutOfOrder { operation: "get_next", .. })
    ));
    s.commit(&oracle).unwrap();
    assert!(matches!(
        s.commit(&oracle),
        Err(ProtocolError::OutOfOrder { operation: "commit", .. })
    ));
    assert_eq!(s.verify(&oracle).unwrap(), Verdict::Disagree);
    assert!(matches!(
        s.submit_block(&oracle),
        Err(ProtocolError::OutOfOrder { operation: "submit_block", .. })
    ));
    assert_eq!(s.get_next(&oracle).unwrap(), Directive::Reveal(4));
    // The reveal must be submitted before asking again.
    assert!(matches!(
        s.get_next(&oracle),
        Err(ProtocolError::OutOfOrder { operation: "get_next", .. })
    ));
    s.submit_block(&oracle).unwrap();
    assert_eq!(submitted_headers(&oracle), vec![4]);
}

#[test]
fn oracle_failures_surface() {
    let oracle = ScriptedOracle::new(1).verify_codes([0]);
    let mut s = session(1);
    assert!(matches!(
        s.run(&oracle),
        Err(ProtocolError::Oracle(OracleError::Unavailable(_)))
    ));
}

#[test]
fn construction_validates_the_chain() {
    let mut file = chain_file(Role::Honest, None);
    file.chain.headers.pop();
    assert_eq!(
        ProverSession::new(ME, file, 1, tx()).unwrap_err(),
        ProtocolError::MisalignedChain {
            digests: 9,
            headers: 8
        }
    );
    for h in [0, 10] {
        assert_eq!(
            ProverSession::new(ME, chain_file(Role::Honest, None), h, tx()).unwrap_err(),
            ProtocolError::InvalidCommittedHeight { height: h, len: 9 }
        );
    }
    let empty = ChainFile::new(Role::Honest, None, ChainData::default());
    assert!(matches!(
        ProverSession::new(ME, empty, 1, tx()),
        Err(ProtocolError::InvalidCommittedHeight { .. })
    ));
}

#[test]
fn raised_abort_flag_stops_waiting() {
    let oracle = ScriptedOracle::new(1).verify_codes([-1, -1]);
    let mut s = session(5);
    let abort = AtomicBool::new(true);
    assert_eq!(
        s.run_until_aborted(&oracle, &abort),
        Err(ProtocolError::CounterpartFailed)
    );
    // One pending verdict consumed, then no further polling.
    assert_eq!(oracle.remaining(), (1, 0));

    // A lowered flag leaves the session free to continue.
    let oracle = ScriptedOracle::new(1).verify_codes([-1, 1]);
    let mut s = session(5);
    assert_eq!(
        s.run_until_aborted(&oracle, &AtomicBool::new(false)),
        Ok(Outcome::Agreed)
    );
}
