//! Plan change tracking module.
//!
//! This module drives a tracking session:
//! - Validating what to track and how often
//! - Resolving the owning deployment of a resource
//! - Polling snapshots and streaming progress events until convergence

mod params;
mod poller;
mod resolver;

pub use params::{Target, TrackConfig, TrackParams, DEFAULT_MAX_RETRIES, DEFAULT_POLL_FREQUENCY};
pub use poller::{check_interrupted, track_change};
pub use resolver::resolve_deployment_id;
