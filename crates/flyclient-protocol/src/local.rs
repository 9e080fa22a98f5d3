//! In-process reference verifier.
//!
//! A simulation aid implementing the four-call contract with a simple,
//! deterministic adjudication rule:
//!
//! - two commitments per transaction; equal inclusion flags settle it;
//! - otherwise heights are sampled from a seed chained off both roots, and a
//!   revealed block counts only if it hashes to the sampled leaf, its path
//!   folds to the party's committed root and it meets its work target;
//! - the first round with exactly one invalid reveal decides (`-2` to that
//!   party, `-3` to the other); two invalid reveals or an exhausted budget
//!   end with `-4`.
//!
//! Gas follows calldata pricing: `21000 + 16` per nonzero byte `+ 4` per zero
//! byte.

use crate::directive::{
    CODE_FAILURE, CODE_SUCCESS, CODE_UNDETERMINED, CODE_WAIT, VERIFY_AGREED, VERIFY_DISAGREE,
    VERIFY_PENDING,
};
use crate::oracle::{AccountId, Commitment, OracleError, Receipt, VerifierOracle};
use crate::Word;
use flyclient_chain::header;
use flyclient_core::{Digest, Height, TxId};
use flyclient_crypto::{chain_hash, hash_bytes};
use flyclient_mmr::{path_to_bytes, verify_path};
use num_bigint::BigUint;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Base cost of a call.
pub const GAS_BASE: u64 = 21_000;
/// Cost per nonzero calldata byte.
pub const GAS_NONZERO_BYTE: u64 = 16;
/// Cost per zero calldata byte.
pub const GAS_ZERO_BYTE: u64 = 4;

/// Gas charged for a call carrying `calldata`.
#[must_use]
pub fn call_gas(calldata: &[u8]) -> u64 {
    calldata.iter().fold(GAS_BASE, |acc, &b| {
        acc + if b == 0 { GAS_ZERO_BYTE } else { GAS_NONZERO_BYTE }
    })
}

/// Verifier tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalVerifierConfig {
    /// Sampling rounds before the game ends undetermined.
    pub sample_budget: u32,
}

impl Default for LocalVerifierConfig {
    fn default() -> Self {
        Self { sample_budget: 32 }
    }
}

/// Thread-safe in-process verifier.
#[derive(Debug, Default)]
pub struct LocalVerifier {
    config: LocalVerifierConfig,
    disputes: Mutex<HashMap<TxId, Dispute>>,
}

#[derive(Debug)]
struct Party {
    account: AccountId,
    commitment: Commitment,
    valid: bool,
}

#[derive(Debug, Default)]
struct Dispute {
    parties: Vec<Party>,
    decided: bool,
    game: Option<Game>,
}

#[derive(Debug)]
struct Game {
    seed: Digest,
    round: u32,
    height: Height,
    span: u64,
    reveals: [Option<bool>; 2],
    result: Option<GameResult>,
}

/// Terminal result of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GameResult {
    /// Index of the party that lost.
    Loser(usize),
    Undetermined,
}

impl LocalVerifier {
    /// Verifier with the given tuning.
    #[must_use]
    pub fn new(config: LocalVerifierConfig) -> Self {
        Self {
            config,
            disputes: Mutex::default(),
        }
    }

    /// Tuning in use.
    #[must_use]
    pub const fn config(&self) -> &LocalVerifierConfig {
        &self.config
    }

    fn ledger(&self) -> Result<MutexGuard<'_, HashMap<TxId, Dispute>>, OracleError> {
        self.disputes
            .lock()
            .map_err(|_| OracleError::Unavailable("verifier state poisoned".to_owned()))
    }
}

impl Dispute {
    fn party(&self, from: AccountId) -> Result<usize, OracleError> {
        self.parties
            .iter()
            .position(|p| p.account == from)
            .ok_or_else(|| OracleError::Rejected(format!("{from} has not committed")))
    }
}

impl Game {
    fn open(a: &Commitment, b: &Commitment, budget: u32) -> Self {
        let seed = chain_hash(&a.mmr_root, &b.mmr_root);
        let span = a.leaf_count.min(b.leaf_count);
        let mut game = Self {
            seed,
            round: 0,
            height: 0,
            span,
            reveals: [None, None],
            result: None,
        };
        if budget == 0 {
            game.result = Some(GameResult::Undetermined);
        } else {
            game.height = sample(&seed, span);
        }
        game
    }

    fn next_round(&mut self, budget: u32) {
        self.round += 1;
        self.reveals = [None, None];
        if self.round >= budget {
            self.result = Some(GameResult::Undetermined);
        } else {
            self.seed = hash_bytes(self.seed.as_bytes());
            self.height = sample(&self.seed, self.span);
        }
    }

    const fn code_for(&self, party: usize) -> Option<i64> {
        match self.result {
            None => None,
            Some(GameResult::Undetermined) => Some(CODE_UNDETERMINED),
            Some(GameResult::Loser(l)) if l == party => Some(CODE_FAILURE),
            Some(GameResult::Loser(_)) => Some(CODE_SUCCESS),
        }
    }
}

/// `seed mod span + 1`, with the seed read as a big-endian number.
fn sample(seed: &Digest, span: u64) -> Height {
    if span == 0 {
        return 1;
    }
    let r = BigUint::from_bytes_be(seed.as_bytes()) % BigUint::from(span);
    u64::try_from(&r).unwrap_or(0) + 1
}

/// A commitment is sound when its header is the committed leaf.
fn commitment_is_valid(c: &Commitment) -> bool {
    header::block_hash(&c.header).is_ok_and(|leaf| {
        verify_path(&c.mmr_root, c.leaf_count, c.height, &leaf, &c.mmr_proof).is_ok()
    })
}

fn reveal_is_valid(c: &Commitment, height: Height, raw: &[u8], proof: &[Digest]) -> bool {
    let Ok(leaf) = header::block_hash(raw) else {
        return false;
    };
    verify_path(&c.mmr_root, c.leaf_count, height, &leaf, proof).is_ok()
        && header::meets_target(raw).unwrap_or(false)
}

fn receipt(calldata: &[u8]) -> Receipt {
    Receipt {
        gas_used: call_gas(calldata),
    }
}

impl VerifierOracle for LocalVerifier {
    fn commitment(&self, from: AccountId, c: &Commitment) -> Result<Receipt, OracleError> {
        let mut ledger = self.ledger()?;
        let dispute = ledger.entry(c.tx_id).or_default();
        if dispute.decided {
            return Err(OracleError::already_determined());
        }
        if dispute.party(from).is_ok() {
            return Err(OracleError::Rejected(format!("{from} already committed")));
        }
        if dispute.parties.len() == 2 {
            return Err(OracleError::Rejected(
                "two parties already committed for this transaction".to_owned(),
            ));
        }
        let valid = commitment_is_valid(c);
        if !valid {
            warn!(%from, height = c.height, "commitment path does not match its root");
        }
        debug!(%from, height = c.height, flag = c.inclusion_flag, "commitment recorded");
        dispute.parties.push(Party {
            account: from,
            commitment: c.clone(),
            valid,
        });
        Ok(receipt(&c.calldata()))
    }

    fn submit_block(
        &self,
        from: AccountId,
        tx_id: &TxId,
        raw: &[u8],
        mmr_proof: &[Digest],
    ) -> Result<Receipt, OracleError> {
        let mut ledger = self.ledger()?;
        let dispute = ledger
            .get_mut(tx_id)
            .ok_or_else(|| OracleError::Rejected("unknown transaction".to_owned()))?;
        let i = dispute.party(from)?;
        let game = dispute
            .game
            .as_mut()
            .ok_or_else(|| OracleError::Rejected("no sampling game is open".to_owned()))?;
        if game.result.is_some() {
            return Err(OracleError::already_determined());
        }
        if game.reveals[i].is_some() {
            return Err(OracleError::Rejected(format!(
                "{from} already revealed for round {}",
                game.round
            )));
        }
        let party = &dispute.parties[i];
        let valid = party.valid && reveal_is_valid(&party.commitment, game.height, raw, mmr_proof);
        debug!(%from, round = game.round, height = game.height, valid, "block revealed");
        game.reveals[i] = Some(valid);

        let mut calldata = tx_id.as_bytes().to_vec();
        calldata.extend_from_slice(raw);
        calldata.extend_from_slice(&path_to_bytes(mmr_proof));
        Ok(receipt(&calldata))
    }

    fn get_next(&self, from: AccountId, tx_id: &TxId) -> Result<(Word, Receipt), OracleError> {
        let budget = self.config.sample_budget;
        let mut ledger = self.ledger()?;
        let dispute = ledger
            .get_mut(tx_id)
            .ok_or_else(|| OracleError::Rejected("unknown transaction".to_owned()))?;
        let i = dispute.party(from)?;
        let game = dispute
            .game
            .as_mut()
            .ok_or_else(|| OracleError::Rejected("no sampling game is open".to_owned()))?;

        if game.result.is_none() {
            if let [Some(a), Some(b)] = game.reveals {
                match (a, b) {
                    (true, true) => game.next_round(budget),
                    (false, true) => game.result = Some(GameResult::Loser(0)),
                    (true, false) => game.result = Some(GameResult::Loser(1)),
                    (false, false) => game.result = Some(GameResult::Undetermined),
                }
            }
            if let Some(v) = game.result {
                info!(round = game.round, ?v, "sampling game decided");
            }
        }

        let code = if let Some(code) = game.code_for(i) {
            code
        } else if game.reveals[i].is_none() {
            i64::try_from(game.height).unwrap_or(i64::MAX)
        } else {
            CODE_WAIT
        };
        if game.result.is_some() {
            dispute.decided = true;
        }
        Ok((Word::from_i64(code), receipt(tx_id.as_bytes())))
    }

    fn verify(&self, from: AccountId, tx_id: &TxId) -> Result<(Word, Receipt), OracleError> {
        let budget = self.config.sample_budget;
        let mut ledger = self.ledger()?;
        let dispute = ledger
            .get_mut(tx_id)
            .ok_or_else(|| OracleError::Rejected("unknown transaction".to_owned()))?;
        dispute.party(from)?;
        if dispute.decided {
            return Err(OracleError::already_determined());
        }

        let code = match dispute.parties.as_slice() {
            [a, b] if a.commitment.inclusion_flag == b.commitment.inclusion_flag => {
                dispute.decided = true;
                info!(flag = a.commitment.inclusion_flag, "both provers agree");
                VERIFY_AGREED
            }
            [a, b] => {
                if dispute.game.is_none() {
                    let game = Game::open(&a.commitment, &b.commitment, budget);
                    info!(first = game.height, span = game.span, "opening sampling game");
                    dispute.game = Some(game);
                }
                VERIFY_DISAGREE
            }
            _ => VERIFY_PENDING,
        };
        Ok((Word::from_i64(code), receipt(tx_id.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_pricing() {
        assert_eq!(call_gas(&[]), 21_000);
        assert_eq!(call_gas(&[0, 0, 1]), 21_000 + 4 + 4 + 16);
    }

    #[test]
    fn sampled_heights_stay_in_range() {
        let mut seed = hash_bytes(b"seed");
        for span in [1u64, 2, 7, 202] {
            for _ in 0..50 {
                let h = sample(&seed, span);
                assert!((1..=span).contains(&h));
                seed = hash_bytes(seed.as_bytes());
            }
        }
    }

    #[test]
    fn zero_budget_game_is_undetermined_at_once() {
        let c = Commitment {
            header: vec![],
            height: 1,
            tx_id: Digest::ZERO,
            merkle_proof: vec![],
            inclusion_flag: 1,
            mmr_proof: vec![],
            leaf_count: 5,
            mmr_root: Digest::ZERO,
        };
        let game = Game::open(&c, &c, 0);
        assert_eq!(game.code_for(0), Some(CODE_UNDETERMINED));
        assert_eq!(game.code_for(1), Some(CODE_UNDETERMINED));
    }

    #[test]
    fn rounds_advance_until_budget() {
        let c = Commitment {
            header: vec![],
            height: 1,
            tx_id: Digest::ZERO,
            merkle_proof: vec![],
            inclusion_flag: 1,
            mmr_proof: vec![],
            leaf_count: 9,
            mmr_root: hash_bytes(b"root"),
        };
        let mut game = Game::open(&c, &c, 2);
        assert!(game.result.is_none());
        game.next_round(2);
        assert!(game.result.is_none());
        assert_eq!(game.round, 1);
        game.next_round(2);
        assert_eq!(game.result, Some(GameResult::Undetermined));
    }
}
