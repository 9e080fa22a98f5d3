//! Client side of the FlyClient block-sampling protocol.
//!
//! Two provers commit to their chains (an MMR root, a length and a claim
//! about one transaction) with a verifier. If the claims differ, the verifier
//! samples heights and each prover reveals the header there together with
//! its MMR path; the first inconsistent reveal decides.
//!
//! - [`VerifierOracle`] is the seam to the verifier (four blocking calls);
//! - [`ProverSession`] is one participant's state machine;
//! - [`LocalVerifier`] and [`mock::ScriptedOracle`] are in-process verifiers
//!   for simulations and tests;
//! - [`run_duel`] runs both participants to completion.
//!
//! ```no_run
//! use flyclient_chain::generator::{generate_pair, GeneratorParams};
//! use flyclient_protocol::{run_duel, AccountId, LocalVerifier, ProverSession, SessionConfig};
//!
//! let pair = generate_pair(&GeneratorParams::default())?;
//! let tx = pair.adversary.chain.transactions[104];
//! let adversary = ProverSession::new(AccountId(1), pair.adversary, 105, tx)?;
//! let honest = ProverSession::new(AccountId(2), pair.honest, 105, tx)?;
//! let report = run_duel(&LocalVerifier::default(), adversary, honest, &SessionConfig::default())?;
//! println!("adversary: {}, honest: {}", report.adversary.outcome, report.honest.outcome);
//! # Ok::<(), anyhow::Error>(())
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
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation
)]

/// Result codes and terminal outcomes.
pub mod directive;
/// Two-participant runner.
pub mod duel;
mod error;
/// In-process reference verifier.
pub mod local;
/// Scripted verifier for tests.
pub mod mock;
/// The verifier seam.
pub mod oracle;
/// Participant state machine.
pub mod session;
/// Two's-complement result words.
pub mod word;

pub use directive::{Directive, Outcome, Verdict};
pub use duel::{run_duel, DuelReport, ParticipantReport};
pub use error::ProtocolError;
pub use local::{LocalVerifier, LocalVerifierConfig};
pub use oracle::{AccountId, Commitment, OracleError, Receipt, VerifierOracle};
pub use session::{ProverSession, SessionConfig, SessionState};
pub use word::{decode_signed, Word};
