//! Tracking parameters and their validation.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::api::{DeploymentApi, ResourceKind};
use crate::error::{ConfigError, Result};

/// Poll frequency used when none is configured.
pub const DEFAULT_POLL_FREQUENCY: Duration = Duration::from_nanos(1);

/// Retry budget used when none is configured.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Polling behaviour of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackConfig {
    /// Time between two snapshot fetches.
    pub poll_frequency: Duration,
    /// Consecutive ticks without progress (or with a failed fetch) before
    /// the plan is considered converged.
    pub max_retries: u32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            poll_frequency: DEFAULT_POLL_FREQUENCY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl TrackConfig {
    /// Creates a tracking configuration.
    #[must_use]
    pub const fn new(poll_frequency: Duration, max_retries: u32) -> Self {
        Self {
            poll_frequency,
            max_retries,
        }
    }

    /// Checks that the configuration can drive a tracker.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the poll frequency is zero or the retry
    /// budget is below one.
    pub fn validate(&self) -> Result<()> {
        if self.poll_frequency.is_zero() {
            return Err(ConfigError::validation(
                "poll frequency must be greater than zero",
                "poll_frequency",
            )
            .into());
        }

        if self.max_retries < 1 {
            return Err(
                ConfigError::validation("max retries must be at least 1", "max_retries").into(),
            );
        }

        Ok(())
    }
}

/// What a tracker was asked to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A known deployment.
    Deployment(String),
    /// The deployment owning a resource, to be resolved first.
    Resource {
        /// Backend resource id.
        resource_id: String,
        /// Resource kind.
        kind: ResourceKind,
    },
}

/// Parameters of a tracking session.
#[derive(Clone)]
pub struct TrackParams {
    /// Control-plane API.
    pub api: Arc<dyn DeploymentApi>,
    /// Deployment to track.
    pub deployment_id: Option<String>,
    /// Resource whose deployment should be tracked.
    pub resource_id: Option<String>,
    /// Kind of the tracked resource.
    pub kind: Option<ResourceKind>,
    /// Only report events for `kind`, ignoring resources changed as a side effect.
    pub ignore_downstream: bool,
    /// Polling behaviour.
    pub config: TrackConfig,
    /// Stops the tracker when cancelled.
    pub cancel: CancellationToken,
}

impl TrackParams {
    /// Tracks a deployment by id.
    #[must_use]
    pub fn for_deployment(api: Arc<dyn DeploymentApi>, deployment_id: impl Into<String>) -> Self {
        Self {
            api,
            deployment_id: Some(deployment_id.into()),
            resource_id: None,
            kind: None,
            ignore_downstream: false,
            config: TrackConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Tracks the deployment owning a resource.
    #[must_use]
    pub fn for_resource(
        api: Arc<dyn DeploymentApi>,
        resource_id: impl Into<String>,
        kind: ResourceKind,
    ) -> Self {
        Self {
            api,
            deployment_id: None,
            resource_id: Some(resource_id.into()),
            kind: Some(kind),
            ignore_downstream: false,
            config: TrackConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the polling behaviour.
    #[must_use]
    pub fn with_config(mut self, config: TrackConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the tracked kind, used to filter downstream resources.
    #[must_use]
    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets whether events for other kinds are dropped.
    #[must_use]
    pub fn with_ignore_downstream(mut self, ignore_downstream: bool) -> Self {
        self.ignore_downstream = ignore_downstream;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Validates the parameters and returns the tracking target.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configuration is invalid, or if not
    /// exactly one of a deployment id or a resource id with its kind is set.
    pub fn validate(&self) -> Result<Target> {
        self.config.validate()?;

        let deployment_id = non_empty(self.deployment_id.as_deref());
        let resource_id = non_empty(self.resource_id.as_deref());

        match (deployment_id, resource_id) {
            (Some(_), Some(_)) => Err(ConfigError::validation_general(
                "only one of deployment id or resource id can be set",
            )
            .into()),
            (None, None) => Err(ConfigError::validation_general(
                "one of deployment id or resource id must be set",
            )
            .into()),
            (Some(id), None) => Ok(Target::Deployment(id.to_string())),
            (None, Some(id)) => match self.kind {
                Some(kind) => Ok(Target::Resource {
                    resource_id: id.to_string(),
                    kind,
                }),
                None => Err(ConfigError::validation("resource kind must be set", "kind").into()),
            },
        }
    }

    /// Returns true if events of `kind` should be dropped.
    #[must_use]
    pub fn filters_out(&self, kind: ResourceKind) -> bool {
        self.ignore_downstream && self.kind.is_some_and(|tracked| tracked != kind)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
