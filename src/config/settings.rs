//! Settings file types.
//!
//! This module defines the structs that map to `plantrack.yaml`. Every field
//! has a default, so an empty or missing file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::api::DEFAULT_ENDPOINT;
use crate::tracker::TrackConfig;

/// The root settings structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Control-plane API settings.
    #[serde(default)]
    pub api: ApiSettings,
    /// Tracking defaults.
    #[serde(default)]
    pub track: TrackSettings,
}

/// Control-plane API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApiSettings {
    /// Base URL of the control plane.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts for rate-limited or failed-to-connect requests.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Tracking defaults, overridable per command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TrackSettings {
    /// Time between two polls, in milliseconds.
    #[serde(default = "default_poll_frequency_ms")]
    pub poll_frequency_ms: u64,
    /// Ticks without progress before the plan is considered converged.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Only report the tracked kind when tracking a resource.
    #[serde(default)]
    pub ignore_downstream: bool,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            poll_frequency_ms: default_poll_frequency_ms(),
            max_retries: default_max_retries(),
            ignore_downstream: false,
        }
    }
}

impl TrackSettings {
    /// Poll frequency as a duration.
    #[must_use]
    pub const fn poll_frequency(&self) -> Duration {
        Duration::from_millis(self.poll_frequency_ms)
    }
}

impl From<&TrackSettings> for TrackConfig {
    fn from(settings: &TrackSettings) -> Self {
        Self::new(settings.poll_frequency(), settings.max_retries)
    }
}

fn default_endpoint() -> String {
    String::from(DEFAULT_ENDPOINT)
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_poll_frequency_ms() -> u64 {
    10_000
}

const fn default_max_retries() -> u32 {
    2
}
