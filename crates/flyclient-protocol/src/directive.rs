//! Result codes of `getNext` and `verify`, and the terminal outcomes they map to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `getNext`: the counterpart has not submitted for this round yet.
pub const CODE_WAIT: i64 = -1;
/// `getNext`: the caller lost.
pub const CODE_FAILURE: i64 = -2;
/// `getNext`: the caller won.
pub const CODE_SUCCESS: i64 = -3;
/// `getNext`: sampling could not separate the two provers.
pub const CODE_UNDETERMINED: i64 = -4;

/// `verify`: the counterpart has not committed yet.
pub const VERIFY_PENDING: i64 = -1;
/// `verify`: the provers disagree; sampling starts.
pub const VERIFY_DISAGREE: i64 = 0;
/// `verify`: agreement (any code other than pending or disagree means this).
pub const VERIFY_AGREED: i64 = 1;

/// Decoded `getNext` result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Reveal the block at this height. Not yet validated against the chain.
    Reveal(i64),
    /// Poll again later.
    Wait,
    /// Terminal.
    Done(Outcome),
}

impl Directive {
    /// Map a raw code.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            CODE_WAIT => Self::Wait,
            CODE_FAILURE => Self::Done(Outcome::Failure),
            CODE_SUCCESS => Self::Done(Outcome::Success),
            CODE_UNDETERMINED => Self::Done(Outcome::Undetermined),
            h => Self::Reveal(h),
        }
    }

    /// Raw code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Reveal(h) => h,
            Self::Wait => CODE_WAIT,
            Self::Done(o) => o.code(),
        }
    }
}

/// Decoded `verify` result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Counterpart not committed; poll again.
    Pending,
    /// Claims differ; proceed to sampling.
    Disagree,
    /// Claims match; the session is over.
    Agreed,
}

impl Verdict {
    /// Map a raw code.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            VERIFY_PENDING => Self::Pending,
            VERIFY_DISAGREE => Self::Disagree,
            _ => Self::Agreed,
        }
    }
}

/// How a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Both provers agreed on the transaction; no sampling took place.
    Agreed,
    /// Verifier code `-2`.
    Failure,
    /// Verifier code `-3`.
    Success,
    /// Verifier code `-4`.
    Undetermined,
}

impl Outcome {
    /// Verifier code (`1` for agreement).
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Agreed => VERIFY_AGREED,
            Self::Failure => CODE_FAILURE,
            Self::Success => CODE_SUCCESS,
            Self::Undetermined => CODE_UNDETERMINED,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Agreed => "agreed",
            Self::Failure => "FAILURE",
            Self::Success => "SUCCESS",
            Self::Undetermined => "undetermined",
        })
    }
}
