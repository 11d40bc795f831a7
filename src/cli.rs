//! Command-line interface for voxlate
//!
//! Provides argument parsing using clap derive macros.

use crate::config::Config;
use crate::review::ReviewTarget;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Live speech relay: transcripts in, translated speech out
#[derive(Parser, Debug)]
#[command(
    name = "voxlate",
    version,
    about = "Live speech relay: transcripts in, translated speech out",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Subcommand to execute (default: run)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub run: RunArgs,
}

impl Cli {
    /// Relay options, whether given at top level or after `run`.
    pub fn run_args(&self) -> Option<&RunArgs> {
        match &self.command {
            None => Some(&self.run),
            Some(Commands::Run(args)) => Some(args),
            Some(_) => None,
        }
    }
}

/// Options of the relay loop.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    /// Read transcript events from FILE (or FIFO) instead of stdin
    #[arg(long, short = 'i', value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Spoken language of the transcript (e.g., pt-BR)
    #[arg(long, value_name = "LANG")]
    pub from: Option<String>,

    /// Language to speak (e.g., English)
    #[arg(long, value_name = "LANG")]
    pub to: Option<String>,

    /// Silence before unfinished speech is flushed. Examples: 1500ms, 2s
    #[arg(long, short = 'g', value_name = "DURATION", value_parser = parse_grace)]
    pub grace: Option<Duration>,

    /// Which text the reviewer edits
    #[arg(long, value_enum, value_name = "TARGET")]
    pub review_target: Option<ReviewTarget>,

    /// Skip the interactive review step
    #[arg(long)]
    pub no_review: bool,

    /// Print translations instead of speaking them
    #[arg(long)]
    pub no_speech: bool,
}

impl RunArgs {
    /// Apply command-line overrides on top of the file and environment.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref from) = self.from {
            config.translation.source_language = from.clone();
        }
        if let Some(ref to) = self.to {
            config.translation.target_language = to.clone();
        }
        if let Some(grace) = self.grace {
            config.pipeline.flush_grace_ms = grace.as_millis() as u64;
        }
        if let Some(target) = self.review_target {
            config.review.target = target;
        }
        if self.no_review {
            config.review.enabled = false;
        }
        if self.no_speech {
            config.speech.enabled = false;
        }
    }
}

/// Parse a grace period.
///
/// Supports any duration format accepted by `humantime` (`1500ms`, `2s`,
/// `1s500ms`); a bare number is taken as seconds.
fn parse_grace(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Relay a transcript feed (default when no command is given)
    Run(RunArgs),

    /// List available audio output devices
    Devices,

    /// Manage configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration (file + environment)
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
