//! Resource plan extraction.
//!
//! Every resource kind stores its plan logs in its own `info` block. The
//! [`PlanResource`] capability gives the tracker one uniform view over them,
//! and [`extract_step_log`] normalizes the selected plan attempt into
//! [`PlanStep`]s.

use chrono::{DateTime, Utc};

use crate::api::{DeploymentResources, KindInfo, PlanAttempt, PlanInfo, PlanStepInfo, Resource, ResourceKind};
use crate::error::PlanError;

use super::step::{PlanStep, StepStatus};

/// Identity of one resource instance inside a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    /// Backend resource id.
    pub id: String,
    /// Human label, e.g. `main-elasticsearch`.
    pub ref_id: String,
    /// Resource kind.
    pub kind: ResourceKind,
}

/// A deployment resource that carries plan logs.
pub trait PlanResource {
    /// Identity of the resource.
    fn identity(&self) -> ResourceRef;

    /// Plan logs of the resource, if it ever had a plan.
    fn plan_log(&self) -> Option<&PlanInfo>;
}

impl<I: KindInfo> PlanResource for Resource<I> {
    fn identity(&self) -> ResourceRef {
        ResourceRef {
            id: self.id.clone(),
            ref_id: self.ref_id.clone(),
            kind: I::KIND,
        }
    }

    fn plan_log(&self) -> Option<&PlanInfo> {
        self.info.plan_info()
    }
}

fn as_plan_resources<I: KindInfo>(resources: &[Resource<I>]) -> Vec<&dyn PlanResource> {
    resources.iter().map(|r| r as &dyn PlanResource).collect()
}

impl DeploymentResources {
    /// Resources of one kind.
    #[must_use]
    pub fn of_kind(&self, kind: ResourceKind) -> Vec<&dyn PlanResource> {
        match kind {
            ResourceKind::Elasticsearch => as_plan_resources(&self.elasticsearch),
            ResourceKind::Kibana => as_plan_resources(&self.kibana),
            ResourceKind::Apm => as_plan_resources(&self.apm),
            ResourceKind::IntegrationsServer => as_plan_resources(&self.integrations_server),
            ResourceKind::AppSearch => as_plan_resources(&self.appsearch),
            ResourceKind::EnterpriseSearch => as_plan_resources(&self.enterprise_search),
        }
    }

    /// All resources, in traversal order.
    #[must_use]
    pub fn plan_resources(&self) -> Vec<&dyn PlanResource> {
        ResourceKind::ALL
            .into_iter()
            .flat_map(|kind| self.of_kind(kind))
            .collect()
    }
}

/// Selects and normalizes a resource's step log.
///
/// With `want_current` unset the pending plan is selected; with it set the
/// current plan is selected, falling back to the newest history entry for
/// resources whose plan failed before ever becoming current.
///
/// # Errors
///
/// Returns [`PlanError::NoPendingPlan`] when nothing is in flight, and
/// [`PlanError::MalformedLog`] when the selected attempt is missing or
/// cannot be read as an ordered step log.
pub fn extract_step_log(
    resource: &dyn PlanResource,
    want_current: bool,
) -> Result<Vec<PlanStep>, PlanError> {
    let resource_id = resource.identity().id;
    let plan_info = resource.plan_log();

    let attempt = if want_current {
        plan_info
            .and_then(|p| p.current.as_ref().or_else(|| p.history.last()))
            .ok_or_else(|| PlanError::malformed(&resource_id, "no current plan or plan history"))?
    } else {
        plan_info
            .and_then(|p| p.pending.as_ref())
            .ok_or_else(|| PlanError::NoPendingPlan {
                resource_id: resource_id.clone(),
            })?
    };

    normalize_attempt(&resource_id, attempt)
}

fn normalize_attempt(resource_id: &str, attempt: &PlanAttempt) -> Result<Vec<PlanStep>, PlanError> {
    let log = attempt
        .plan_attempt_log
        .as_ref()
        .ok_or_else(|| PlanError::malformed(resource_id, "plan attempt has no step log"))?;

    log.iter()
        .enumerate()
        .map(|(index, raw)| normalize_step(resource_id, index, raw))
        .collect()
}

fn normalize_step(resource_id: &str, index: usize, raw: &PlanStepInfo) -> Result<PlanStep, PlanError> {
    let step_id = raw
        .step_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PlanError::malformed(resource_id, format!("step {index} has no id")))?;

    let started = raw.started.as_deref().ok_or_else(|| {
        PlanError::malformed(resource_id, format!("step {step_id} has no start time"))
    })?;
    let started_at = DateTime::parse_from_rfc3339(started)
        .map_err(|e| {
            PlanError::malformed(resource_id, format!("step {step_id} start time {started}: {e}"))
        })?
        .with_timezone(&Utc);

    Ok(PlanStep {
        status: StepStatus::from(raw.status.as_deref().unwrap_or_default()),
        step_id,
        started_at,
        info_log: raw.info_log.iter().map(|m| m.message.clone()).collect(),
    })
}
