// crates/flyclient-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

mod scenario;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use flyclient_chain::generator::{generate_pair, GeneratorParams};
use flyclient_core::io::{ensure_parent_dir, read_chain_file_auto, write_auto, write_chain_file_auto};
use flyclient_core::{Digest, ForkWindow, Role};
use flyclient_mmr::manifest::{
    commit_chain_file, read_manifest_auto, verify_chain_file_against_manifest,
};
use flyclient_mmr::{decode_path_hex, encode_path_hex, LeafRef, MmrAccumulator};
use flyclient_protocol::{
    run_duel, AccountId, DuelReport, LocalVerifier, Outcome, ParticipantReport, ProverSession,
};
use scenario::Scenario;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "flyclient",
    about = "FlyClient MMR and sampling-protocol CLI",
    long_about = "FlyClient MMR and sampling-protocol CLI.\n\nGenerate forked chain pairs, commit chains to MMR manifests, produce and check paths, and run two-prover duels against an in-process verifier.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate an honest chain and a forked adversarial chain
    Generate {
        #[command(flatten)]
        args: GenArgs,

        /// Output path for the honest chain (CBOR/JSON)
        #[arg(long, default_value = "honest.cbor")]
        out_honest: PathBuf,

        /// Output path for the adversarial chain (CBOR/JSON)
        #[arg(long, default_value = "adversary.cbor")]
        out_adversary: PathBuf,
    },

    /// Commit a chain to an MMR root and write a manifest
    Commit {
        /// Input chain file (CBOR/JSON)
        #[arg(long)]
        chain: PathBuf,

        /// Output path for the manifest (CBOR/JSON)
        #[arg(long, default_value = "manifest.json")]
        out: PathBuf,
    },

    /// Check that a chain file matches a manifest
    VerifyCommit {
        /// Input chain file (CBOR/JSON)
        #[arg(long)]
        chain: PathBuf,

        /// Input manifest (CBOR/JSON)
        #[arg(long)]
        manifest: PathBuf,
    },

    /// Print the MMR path of one block
    Path {
        /// Input chain file (CBOR/JSON)
        #[arg(long)]
        chain: PathBuf,

        /// 1-based height; negative counts from the tip
        #[arg(long, allow_hyphen_values = true, conflicts_with = "digest")]
        height: Option<i64>,

        /// Block hash to look up instead of a height
        #[arg(long)]
        digest: Option<Digest>,
    },

    /// Check a path against a manifest without the chain
    VerifyPath {
        /// Input manifest (CBOR/JSON)
        #[arg(long)]
        manifest: PathBuf,

        /// 1-based height of the leaf
        #[arg(long)]
        height: u64,

        /// Leaf digest (block hash, hex)
        #[arg(long)]
        leaf: Digest,

        /// Concatenated hex siblings, bottom-up (empty for a single-leaf chain)
        #[arg(long, default_value = "")]
        proof: String,
    },

    /// Run a two-prover duel against the in-process verifier
    Duel {
        /// TOML scenario (generator, verifier and session settings)
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Honest chain file; generated from the scenario when omitted
        #[arg(long, requires = "adversary")]
        honest: Option<PathBuf>,

        /// Adversarial chain file; generated from the scenario when omitted
        #[arg(long, requires = "honest")]
        adversary: Option<PathBuf>,

        /// Committed height
        #[arg(long)]
        height: Option<u64>,

        /// Disputed transaction id (hex); defaults to the adversary's coinbase
        #[arg(long)]
        tx: Option<Digest>,

        /// Sampling rounds before the verifier gives up
        #[arg(long)]
        budget: Option<u32>,

        /// Pause between polls while the verifier answers "wait"
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Consecutive wait codes tolerated per prover
        #[arg(long)]
        max_polls: Option<u64>,

        /// Write the duel report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct GenArgs {
    /// Blocks per chain, genesis included
    #[arg(long, default_value_t = 202, value_parser = clap::value_parser!(u64).range(2..))]
    length: u64,

    /// First forked height
    #[arg(long, default_value_t = 101)]
    fork_start: u64,

    /// First height after the fork (closed forks only)
    #[arg(long, default_value_t = 111, conflicts_with = "open")]
    fork_end: u64,

    /// The adversary never rejoins the honest chain
    #[arg(long, default_value_t = false)]
    open: bool,

    /// Seed for the synthetic coinbase payloads
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl GenArgs {
    fn params(&self) -> GeneratorParams {
        let fork = if self.open {
            ForkWindow::Open {
                start: self.fork_start,
            }
        } else {
            ForkWindow::Closed {
                start: self.fork_start,
                end: self.fork_end,
            }
        };
        GeneratorParams {
            length: self.length,
            fork,
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Generate {
            args,
            out_honest,
            out_adversary,
        } => generate(&args.params(), out_honest, out_adversary),

        Cmd::Commit { chain, out } => commit(chain, out),

        Cmd::VerifyCommit { chain, manifest } => verify_commit(chain, manifest),

        Cmd::Path {
            chain,
            height,
            digest,
        } => path(chain, height, digest),

        Cmd::VerifyPath {
            manifest,
            height,
            leaf,
            proof,
        } => verify_path(manifest, height, leaf, &proof),

        Cmd::Duel {
            scenario,
            honest,
            adversary,
            height,
            tx,
            budget,
            poll_interval_ms,
            max_polls,
            report,
        } => {
            let mut sc = match scenario {
                Some(p) => Scenario::load(&p)?,
                None => Scenario::default(),
            };
            if let Some(h) = height {
                sc.height = h;
            }
            if let Some(b) = budget {
                sc.verifier.sample_budget = b;
            }
            if let Some(ms) = poll_interval_ms {
                sc.session.poll_interval_ms = ms;
            }
            if max_polls.is_some() {
                sc.session.max_polls = max_polls;
            }
            let files = match (honest, adversary) {
                (Some(h), Some(a)) => Some((h, a)),
                _ => None,
            };
            duel(&sc, files, tx, report)
        }
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn generate(params: &GeneratorParams, out_honest: PathBuf, out_adversary: PathBuf) -> Result<()> {
    info!(length = params.length, fork = %params.fork, seed = params.seed, "generating chain pair");
    let pair = generate_pair(params)?;

    write_chain_file_auto(&out_honest, &pair.honest)
        .with_context(|| format!("writing honest chain to {}", out_honest.display()))?;
    write_chain_file_auto(&out_adversary, &pair.adversary)
        .with_context(|| format!("writing adversarial chain to {}", out_adversary.display()))?;

    println!(
        "Generated {} blocks, fork {} → {} / {}",
        params.length,
        pair.fork,
        out_honest.display(),
        out_adversary.display()
    );
    Ok(())
}

fn commit(chain: PathBuf, out: PathBuf) -> Result<()> {
    info!(chain = %chain.display(), out = %out.display(), "committing chain");
    ensure_parent_dir(&out)?;

    let man = commit_chain_file(&chain, &out).with_context(|| {
        format!("committing {} to manifest {}", chain.display(), out.display())
    })?;

    println!(
        "Committed {} leaves, root={} → {}",
        man.leaf_count,
        man.root.map_or_else(|| "<empty>".to_owned(), |r| r.to_hex()),
        out.display()
    );
    Ok(())
}

fn verify_commit(chain: PathBuf, manifest: PathBuf) -> Result<()> {
    info!(chain = %chain.display(), manifest = %manifest.display(), "verifying commit");
    verify_chain_file_against_manifest(&chain, &manifest).with_context(|| {
        format!(
            "verifying that {} matches manifest {}",
            chain.display(),
            manifest.display()
        )
    })?;

    println!("OK: {} matches manifest {}", chain.display(), manifest.display());
    Ok(())
}

fn path(chain: PathBuf, height: Option<i64>, digest: Option<Digest>) -> Result<()> {
    let target: LeafRef = match (height, digest) {
        (Some(h), _) => h.into(),
        (None, Some(d)) => d.into(),
        (None, None) => bail!("pass --height or --digest"),
    };
    let file = read_chain_file_auto(&chain)?;
    let acc = MmrAccumulator::from_leaves(file.chain.digests);

    let path = acc.path(target)?;
    let root = acc.root().ok_or_else(|| anyhow!("empty chain"))?;
    println!("leaves    {}", acc.leaf_count());
    println!("root      {root}");
    println!("size      {}", path.len());
    println!("path      {}", encode_path_hex(&path));
    Ok(())
}

fn verify_path(manifest: PathBuf, height: u64, leaf: Digest, proof: &str) -> Result<()> {
    let man = read_manifest_auto(&manifest)?;
    let proof = decode_path_hex(proof)?;
    man.verify_path(height, &leaf, &proof)
        .with_context(|| format!("path for height {height} rejected"))?;
    println!("OK: leaf {leaf} is at height {height} of {} leaves", man.leaf_count);
    Ok(())
}

fn duel(
    sc: &Scenario,
    files: Option<(PathBuf, PathBuf)>,
    tx: Option<Digest>,
    report: Option<PathBuf>,
) -> Result<()> {
    let (honest, adversary) = match files {
        Some((h, a)) => (read_chain_file_auto(&h)?, read_chain_file_auto(&a)?),
        None => {
            let pair = generate_pair(&sc.generator)?;
            (pair.honest, pair.adversary)
        }
    };
    if honest.role != Role::Honest || adversary.role != Role::Adversary {
        bail!(
            "chain files have roles {} / {} (expected honest / adversary)",
            honest.role.to_string().trim(),
            adversary.role.to_string().trim()
        );
    }

    let height = sc.height;
    let tx = match tx {
        Some(tx) => tx,
        None => *adversary
            .chain
            .transaction(height)
            .ok_or_else(|| anyhow!("no coinbase at height {height}; pass --tx"))?,
    };
    info!(
        height,
        %tx,
        fork = ?adversary.fork,
        budget = sc.verifier.sample_budget,
        "starting duel"
    );

    let verifier = LocalVerifier::new(sc.verifier_config());
    let adv = ProverSession::new(AccountId(1), adversary, height, tx)?;
    let hon = ProverSession::new(AccountId(2), honest, height, tx)?;
    let result = run_duel(&verifier, adv, hon, &sc.session_config())?;

    print_participant(&result.adversary);
    print_participant(&result.honest);

    if let Some(out) = report {
        write_auto(&out, &ReportOut::new(&result, height, tx))
            .with_context(|| format!("writing duel report to {}", out.display()))?;
        println!("Report → {}", out.display());
    }
    Ok(())
}

fn print_participant(p: &ParticipantReport) {
    let verdict = match p.outcome {
        Outcome::Agreed => "agreed with the other prover".to_owned(),
        o => format!("protocol is over: {o}"),
    };
    println!(
        "[{}] {verdict} ({} calls, {} gas)",
        p.role,
        p.gas.len(),
        p.total_gas()
    );
}

/// Serializable duel summary.
#[derive(Serialize)]
struct ReportOut {
    height: u64,
    tx: Digest,
    adversary: ParticipantOut,
    honest: ParticipantOut,
}

#[derive(Serialize)]
struct ParticipantOut {
    role: Role,
    outcome: Outcome,
    gas: Vec<u64>,
    cumulative_gas: Vec<u64>,
}

impl ReportOut {
    fn new(r: &DuelReport, height: u64, tx: Digest) -> Self {
        Self {
            height,
            tx,
            adversary: ParticipantOut::from(&r.adversary),
            honest: ParticipantOut::from(&r.honest),
        }
    }
}

impl From<&ParticipantReport> for ParticipantOut {
    fn from(p: &ParticipantReport) -> Self {
        Self {
            role: p.role,
            outcome: p.outcome,
            gas: p.gas.clone(),
            cumulative_gas: p.cumulative_gas(),
        }
    }
}
