//! Progress events and the snapshot diff builder.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, trace};

use crate::api::{DeploymentSnapshot, ResourceKind};
use crate::error::{PlanError, StepError};

use super::extract::{extract_step_log, PlanResource};
use super::step::evaluate_steps;

/// A unit of plan progress for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    /// Backend resource id.
    pub resource_id: String,
    /// Human label of the resource.
    pub ref_id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Deployment owning the resource.
    pub deployment_id: String,
    /// Id of the current step.
    pub step: String,
    /// Step failure, or [`StepError::PlanFinished`] on convergence.
    pub err: Option<StepError>,
    /// No further progress is expected for this resource.
    pub finished: bool,
    /// Elapsed time since the plan's first step started.
    pub duration: Duration,
}

impl TrackEvent {
    /// Returns the error if it is a genuine failure rather than the convergence marker.
    #[must_use]
    pub fn failure(&self) -> Option<&StepError> {
        self.err.as_ref().filter(|e| !e.is_plan_finished())
    }
}

/// Builds the progress events for a snapshot.
///
/// See [`build_events_at`].
#[must_use]
pub fn build_events(snapshot: &DeploymentSnapshot, want_current: bool) -> Vec<TrackEvent> {
    build_events_at(snapshot, want_current, Utc::now())
}

/// Builds the progress events for a snapshot, measuring durations up to `now`.
///
/// Resources are visited in kind order. A resource without a pending plan,
/// with a malformed log, or with an empty log contributes no event.
#[must_use]
pub fn build_events_at(
    snapshot: &DeploymentSnapshot,
    want_current: bool,
    now: DateTime<Utc>,
) -> Vec<TrackEvent> {
    snapshot
        .resources
        .plan_resources()
        .into_iter()
        .filter_map(|resource| resource_event(&snapshot.id, resource, want_current, now))
        .collect()
}

fn resource_event(
    deployment_id: &str,
    resource: &dyn PlanResource,
    want_current: bool,
    now: DateTime<Utc>,
) -> Option<TrackEvent> {
    let identity = resource.identity();

    let steps = match extract_step_log(resource, want_current) {
        Ok(steps) => steps,
        Err(PlanError::NoPendingPlan { .. }) => {
            trace!("No pending plan for {} {}", identity.kind, identity.id);
            return None;
        }
        Err(e) => {
            debug!("Skipping {} {}: {e}", identity.kind, identity.id);
            return None;
        }
    };

    let evaluation = evaluate_steps(&steps)?;
    if evaluation.step.is_empty() {
        return None;
    }

    let duration = steps
        .first()
        .and_then(|first| (now - first.started_at).to_std().ok())
        .unwrap_or_default();

    Some(TrackEvent {
        resource_id: identity.id,
        ref_id: identity.ref_id,
        kind: identity.kind,
        deployment_id: deployment_id.to_string(),
        finished: evaluation.is_completed(),
        step: evaluation.step,
        err: evaluation.error,
        duration,
    })
}
