//! Command-line arguments for `localqa`.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use localqa_core::config::RetrievalSettings;

/// localqa - answer questions from a local product manual
#[derive(Parser, Debug)]
#[command(name = "localqa")]
#[command(version)]
#[command(about = "Answer questions from a local product manual, fully offline", long_about = None)]
pub struct Args {
    /// Directory holding config.toml (current directory by default)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Configuration environment: dev, prod or test (overrides RUST_ENV)
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Verbosity: -v (info), -vv (debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single question
    Ask {
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Number of chunks to retrieve
        #[arg(short)]
        k: Option<usize>,

        /// Also print the retrieved chunks
        #[arg(long)]
        show_context: bool,
    },

    /// Interactive question loop
    Repl {
        /// Number of chunks to retrieve
        #[arg(short)]
        k: Option<usize>,
    },

    /// Check the artifacts and print what was loaded
    Inspect,
}

impl Args {
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn env_name(&self) -> String {
        self.env
            .clone()
            .or_else(|| std::env::var("RUST_ENV").ok())
            .unwrap_or_else(|| "dev".to_string())
    }

    /// Default log filter when RUST_LOG is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Picks the configured default when `k` is absent and enforces the allowed range.
pub fn resolve_k(k: Option<usize>, retrieval: &RetrievalSettings) -> Result<usize> {
    let k = k.unwrap_or(retrieval.default_k);
    if k < retrieval.min_k || k > retrieval.max_k {
        bail!("k must be between {} and {} (got {})", retrieval.min_k, retrieval.max_k, k);
    }
    Ok(k)
}
