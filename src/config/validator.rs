//! Settings validation.
//!
//! Errors make the settings unusable; warnings flag values that work but are
//! probably not what the user wants.

use crate::error::{ConfigError, Result, TrackerError};
use reqwest::Url;
use tracing::{debug, warn};

use super::settings::{ApiSettings, Settings, TrackSettings};

/// Poll frequencies below this many milliseconds produce a warning.
const FAST_POLL_THRESHOLD_MS: u64 = 1_000;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

/// Validator for tracker settings.
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates settings.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, settings: &Settings) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_api(&settings.api, &mut result);
        Self::validate_track(&settings.track, &mut result);

        for warning in &result.warnings {
            warn!("{warning}");
        }

        match result.errors.first() {
            None => {
                debug!("Settings validation passed");
                Ok(result)
            }
            Some(first) => Err(TrackerError::Config(ConfigError::validation(
                first.message.clone(),
                first.field.clone(),
            ))),
        }
    }

    fn validate_api(api: &ApiSettings, result: &mut ValidationResult) {
        match Url::parse(&api.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => result.error(
                "api.endpoint",
                format!("Endpoint scheme '{}' is not http or https", url.scheme()),
            ),
            Err(e) => result.error(
                "api.endpoint",
                format!("Endpoint '{}' is not a valid URL: {e}", api.endpoint),
            ),
        }

        if api.timeout_secs < 1 {
            result.error("api.timeout_secs", "Timeout must be at least 1 second");
        }

        if api.max_attempts < 1 {
            result.error("api.max_attempts", "Max attempts must be at least 1");
        }
    }

    fn validate_track(track: &TrackSettings, result: &mut ValidationResult) {
        if track.poll_frequency_ms < 1 {
            result.error("track.poll_frequency_ms", "Poll frequency must be at least 1ms");
        } else if track.poll_frequency_ms < FAST_POLL_THRESHOLD_MS {
            result.warnings.push(format!(
                "Polling every {}ms may trigger API rate limiting",
                track.poll_frequency_ms
            ));
        }

        if track.max_retries < 1 {
            result.error("track.max_retries", "Max retries must be at least 1");
        }
    }
}
