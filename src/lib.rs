// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Deploy Plan Tracker
//!
//! Follows asynchronous configuration changes ("plans") applied to the
//! resources of a hosted deployment, and reports their progress until they
//! converge.
//!
//! ## Overview
//!
//! A plan runs on the control plane as an ordered log of steps. The tracker
//! polls the deployment, reduces every resource's step log to the step that
//! best describes it, and streams one event per resource with something new
//! to report:
//!
//! - Track by deployment id, or by resource id (the deployment is resolved)
//! - Optionally ignore resources changed as a side effect of the tracked one
//! - Render the stream as colored text or line-delimited JSON
//!
//! ## Architecture
//!
//! 1. **Snapshot**: fetched from the control plane through [`api::DeploymentApi`]
//! 2. **Evaluation**: step logs are normalized and evaluated in [`plan`]
//! 3. **Tracking**: [`tracker::track_change`] polls until no progress is seen,
//!    then performs a final authoritative read
//! 4. **Rendering**: [`render`] de-duplicates events and aggregates failures
//!
//! ## Modules
//!
//! - [`api`]: Control-plane client, snapshot model and search queries
//! - [`plan`]: Step evaluation and event building
//! - [`tracker`]: Tracking sessions
//! - [`render`]: Text and JSON renderers
//! - [`config`]: Settings parsing and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! api:
//!   endpoint: https://api.elastic-cloud.com
//! track:
//!   poll_frequency_ms: 10000
//!   max_retries: 2
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod plan;
pub mod render;
pub mod tracker;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{DeploymentApi, DeploymentClient, DeploymentSnapshot, ResourceKind};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::{ConfigParser, ConfigValidator, Settings};
pub use error::{Result, StepError, TrackError, TrackerError};
pub use plan::{build_events, evaluate_steps, extract_step_log, TrackEvent};
pub use render::{render_json, render_text};
pub use tracker::{resolve_deployment_id, track_change, TrackConfig, TrackParams};
