//! Scripted verifier for deterministic state-machine tests.
//!
//! Answers `verify` and `get_next` from queues filled up front and records
//! every call it receives. An exhausted queue answers `Unavailable`.

use crate::oracle::{AccountId, Commitment, OracleError, Receipt, VerifierOracle};
use crate::Word;
use flyclient_core::{Digest, TxId};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call as the scripted verifier saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// `commitment`.
    Commitment(AccountId, Commitment),
    /// `submit_block`.
    SubmitBlock {
        /// Caller.
        from: AccountId,
        /// Revealed header.
        header: Vec<u8>,
        /// Revealed path.
        mmr_proof: Vec<Digest>,
    },
    /// `get_next`.
    GetNext(AccountId),
    /// `verify`.
    Verify(AccountId),
}

type Script = VecDeque<Result<Word, OracleError>>;

/// Verifier replaying canned answers.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    verify: Mutex<Script>,
    next: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
    gas: u64,
}

impl ScriptedOracle {
    /// Empty script charging `gas` per call.
    #[must_use]
    pub fn new(gas: u64) -> Self {
        Self {
            gas,
            ..Self::default()
        }
    }

    /// Queue `verify` codes.
    #[must_use]
    pub fn verify_codes(self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.push(&self.verify, codes.into_iter().map(|c| Ok(Word::from_i64(c))));
        self
    }

    /// Queue a `verify` error.
    #[must_use]
    pub fn verify_error(self, err: OracleError) -> Self {
        self.push(&self.verify, [Err(err)]);
        self
    }

    /// Queue `get_next` codes.
    #[must_use]
    pub fn next_codes(self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.push(&self.next, codes.into_iter().map(|c| Ok(Word::from_i64(c))));
        self
    }

    /// Queue a raw `get_next` word.
    #[must_use]
    pub fn next_word(self, word: Word) -> Self {
        self.push(&self.next, [Ok(word)]);
        self
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).map(|c| c.clone()).unwrap_or_default()
    }

    /// Answers not consumed yet, as `(verify, get_next)`.
    #[must_use]
    pub fn remaining(&self) -> (usize, usize) {
        (
            lock(&self.verify).map_or(0, |q| q.len()),
            lock(&self.next).map_or(0, |q| q.len()),
        )
    }

    // Scripting happens before any call, so a poisoned queue is still intact.
    fn push(&self, queue: &Mutex<Script>, items: impl IntoIterator<Item = Result<Word, OracleError>>) {
        queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(items);
    }

    fn record(&self, call: Call) -> Result<Receipt, OracleError> {
        lock(&self.calls)?.push(call);
        Ok(Receipt { gas_used: self.gas })
    }

    fn pop(&self, queue: &Mutex<Script>, what: &str) -> Result<Word, OracleError> {
        lock(queue)?
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Unavailable(format!("{what} script exhausted"))))
    }
}

impl VerifierOracle for ScriptedOracle {
    fn commitment(&self, from: AccountId, c: &Commitment) -> Result<Receipt, OracleError> {
        self.record(Call::Commitment(from, c.clone()))
    }

    fn submit_block(
        &self,
        from: AccountId,
        _tx_id: &TxId,
        header: &[u8],
        mmr_proof: &[Digest],
    ) -> Result<Receipt, OracleError> {
        self.record(Call::SubmitBlock {
            from,
            header: header.to_vec(),
            mmr_proof: mmr_proof.to_vec(),
        })
    }

    fn get_next(&self, from: AccountId, _tx_id: &TxId) -> Result<(Word, Receipt), OracleError> {
        let receipt = self.record(Call::GetNext(from))?;
        Ok((self.pop(&self.next, "get_next")?, receipt))
    }

    fn verify(&self, from: AccountId, _tx_id: &TxId) -> Result<(Word, Receipt), OracleError> {
        let receipt = self.record(Call::Verify(from))?;
        Ok((self.pop(&self.verify, "verify")?, receipt))
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, OracleError> {
    m.lock()
        .map_err(|_| OracleError::Unavailable("scripted oracle lock poisoned".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn scripting_survives_a_poisoned_queue() {
        let oracle = Arc::new(ScriptedOracle::new(1));
        let poisoner = Arc::clone(&oracle);
        let _ = thread::spawn(move || {
            let _guard = poisoner.verify.lock().unwrap();
            panic!("poison the verify queue");
        })
        .join();
        assert!(oracle.verify.is_poisoned());

        let oracle = Arc::try_unwrap(oracle).unwrap().verify_codes([0, 1]);
        assert_eq!(oracle.verify.lock().unwrap_or_else(PoisonError::into_inner).len(), 2);
    }
}
