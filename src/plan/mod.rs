//! Plan progress evaluation module.
//!
//! This module turns deployment snapshots into progress events:
//! - Normalizing each resource's plan log into ordered steps
//! - Evaluating a step log down to its current step
//! - Building one event per resource with progress to report

mod events;
mod extract;
mod step;

pub use events::{build_events, build_events_at, TrackEvent};
pub use extract::{extract_step_log, PlanResource, ResourceRef};
pub use step::{evaluate_steps, Evaluation, PlanStep, StepStatus, PLAN_COMPLETED};
