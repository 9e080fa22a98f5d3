//! Duel scenarios loaded from TOML.
//!
//! ```toml
//! height = 105
//!
//! [generator]
//! length = 202
//! seed = 42
//! fork = { kind = "closed", start = 101, end = 111 }
//!
//! [verifier]
//! sample_budget = 32
//!
//! [session]
//! poll_interval_ms = 1
//! max_polls = 100000
//! ```
//!
//! Every section is optional; command-line flags override file values.

use anyhow::{Context, Result};
use flyclient_chain::generator::GeneratorParams;
use flyclient_protocol::{LocalVerifierConfig, SessionConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    /// Committed height (both provers).
    pub height: u64,
    pub generator: GeneratorParams,
    pub verifier: VerifierSection,
    pub session: SessionSection,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierSection {
    pub sample_budget: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    pub poll_interval_ms: u64,
    pub max_polls: Option<u64>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            height: 105,
            generator: GeneratorParams::default(),
            verifier: VerifierSection::default(),
            session: SessionSection::default(),
        }
    }
}

impl Default for VerifierSection {
    fn default() -> Self {
        Self {
            sample_budget: LocalVerifierConfig::default().sample_budget,
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            max_polls: None,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("read scenario {}", path.display()))?;
        toml::from_str(&src).with_context(|| format!("parse scenario toml {}", path.display()))
    }

    pub const fn verifier_config(&self) -> LocalVerifierConfig {
        LocalVerifierConfig {
            sample_budget: self.verifier.sample_budget,
        }
    }

    pub const fn session_config(&self) -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::from_millis(self.session.poll_interval_ms),
            max_polls: self.session.max_polls,
        }
    }
}
