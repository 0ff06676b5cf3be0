//! Error types for the deployment plan tracker.
//!
//! This module provides the error hierarchy for every stage of plan tracking:
//! configuration, control-plane API access, plan log extraction, plan step
//! failures, and the tracker itself.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the deployment plan tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration and parameter errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Control-plane API errors.
    #[error("Deployment API error: {0}")]
    Api(#[from] ApiError),

    /// Tracking errors, including aggregated plan step failures.
    #[error("{0}")]
    Track(#[from] TrackError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and parameter errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file was not found.
    #[error("Settings file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The settings file could not be parsed.
    #[error("Failed to parse settings: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// Control-plane API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Rate limited.
    #[error("API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Deployment not found.
    #[error("Deployment not found: {deployment_id}")]
    DeploymentNotFound {
        /// ID of the missing deployment.
        deployment_id: String,
    },

    /// Network error.
    #[error("Network error communicating with the API: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from the API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Errors raised while extracting a resource's plan log from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The resource has nothing in flight right now.
    #[error("Resource {resource_id} has no pending plan")]
    NoPendingPlan {
        /// Backend id of the resource.
        resource_id: String,
    },

    /// The selected plan attempt could not be read as an ordered step log.
    #[error("Malformed plan log for resource {resource_id}: {message}")]
    MalformedLog {
        /// Backend id of the resource.
        resource_id: String,
        /// What was wrong with the log.
        message: String,
    },
}

/// Outcome carried by a plan step that is not plain progress.
///
/// `PlanFinished` is a convergence marker, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// The backend reported the step as failed.
    #[error("{message}")]
    Failed {
        /// Id of the failed step.
        step: String,
        /// Last message of the step's info log.
        message: String,
    },

    /// The step failed without any info log message.
    #[error("unknown failure")]
    UnknownFailure {
        /// Id of the failed step.
        step: String,
    },

    /// The plan reached its final step.
    #[error("plan finished")]
    PlanFinished,
}

/// Tracking errors.
#[derive(Debug, Error)]
pub enum TrackError {
    /// No deployment owns the given resource.
    #[error("No deployment found for resource {resource_id}")]
    ResourceNotFound {
        /// Backend id of the resource.
        resource_id: String,
    },

    /// A single plan step failed.
    #[error("{0}")]
    Step(StepError),

    /// Several resources finished with a failed plan step.
    #[error("{} plan errors occurred:{}", .errors.len(), bullet_list(.errors))]
    Aggregate {
        /// The failures, in the order they were observed.
        errors: Vec<StepError>,
    },

    /// The session was cancelled before the plan converged.
    #[error("Tracking interrupted before the plan converged")]
    Interrupted,
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

fn bullet_list(errors: &[StepError]) -> String {
    errors.iter().map(|e| format!("\n\t* {e}")).collect()
}

impl TrackerError {
    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::RateLimited { .. } | ApiError::NetworkError { .. })
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Api(ApiError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            Self::Api(ApiError::NetworkError { .. }) => Some(1),
            _ => None,
        }
    }

    /// Returns true if this error was raised by parameter or settings validation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Config(ConfigError::ValidationError { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl ApiError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}

impl PlanError {
    /// Creates a malformed log error.
    #[must_use]
    pub fn malformed(resource_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedLog {
            resource_id: resource_id.into(),
            message: message.into(),
        }
    }
}

impl StepError {
    /// Returns true for the convergence marker.
    #[must_use]
    pub const fn is_plan_finished(&self) -> bool {
        matches!(self, Self::PlanFinished)
    }
}

impl TrackError {
    /// Folds accumulated step failures into a single error.
    ///
    /// Returns `None` when there is nothing to report.
    #[must_use]
    pub fn from_step_errors(mut errors: Vec<StepError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop().map(Self::Step),
            _ => Some(Self::Aggregate { errors }),
        }
    }
}
