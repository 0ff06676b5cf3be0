//! CLI module for the plan tracker.
//!
//! This module provides the command-line interface for following
//! deployment plan changes.

mod commands;

pub use commands::{Cli, Commands, OutputFormat};
