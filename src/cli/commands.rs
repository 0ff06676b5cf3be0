//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::api::ResourceKind;

/// plantrack - Follow deployment plan changes until they converge.
#[derive(Parser, Debug)]
#[command(name = "plantrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the settings file.
    #[arg(short, long, global = true, env = "PLANTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track a plan change until it converges.
    Track {
        /// Deployment to track.
        #[arg(long, conflicts_with = "resource_id", required_unless_present = "resource_id")]
        deployment_id: Option<String>,

        /// Resource whose deployment should be tracked.
        #[arg(long, requires = "kind")]
        resource_id: Option<String>,

        /// Kind of the tracked resource.
        #[arg(long, value_enum)]
        kind: Option<ResourceKind>,

        /// Only report events for the tracked kind.
        #[arg(long)]
        ignore_downstream: bool,

        /// Time between polls, in milliseconds.
        #[arg(long)]
        poll_frequency_ms: Option<u64>,

        /// Polls without progress before the plan is considered converged.
        #[arg(long)]
        max_retries: Option<u32>,

        /// Output format (text, json).
        #[arg(long, default_value = "text")]
        output: OutputFormat,

        /// Pretty-print JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Print the deployment owning a resource.
    Resolve {
        /// Resource to look up.
        #[arg(long)]
        resource_id: String,

        /// Kind of the resource.
        #[arg(long, value_enum)]
        kind: ResourceKind,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
