//! Plan steps and the step evaluator.
//!
//! A resource's plan is an ordered log of steps. [`evaluate_steps`] reduces
//! that log to the single step that best describes what is happening now.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::StepError;

/// Id of the step every successful plan ends with.
pub const PLAN_COMPLETED: &str = "plan-completed";

/// Status of a plan step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The step completed.
    Success,
    /// The step is running.
    Pending,
    /// The step failed.
    Error,
    /// Any other status reported by the backend, e.g. `cancelled`.
    Other(String),
}

impl From<&str> for StepStatus {
    fn from(status: &str) -> Self {
        match status {
            "success" => Self::Success,
            "pending" => Self::Pending,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Pending => f.write_str("pending"),
            Self::Error => f.write_str("error"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// One step of a resource's plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    /// Stable step identifier, e.g. `validate-plan`.
    pub step_id: String,
    /// Step status.
    pub status: StepStatus,
    /// When the step started.
    pub started_at: DateTime<Utc>,
    /// Messages logged by the step, oldest first.
    pub info_log: Vec<String>,
}

/// Result of evaluating a step log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Id of the step that represents the current state.
    pub step: String,
    /// Failure of that step, or [`StepError::PlanFinished`] on convergence.
    pub error: Option<StepError>,
}

impl Evaluation {
    fn progress(step: &PlanStep) -> Self {
        Self {
            step: step.step_id.clone(),
            error: None,
        }
    }

    fn failed(step: &PlanStep) -> Self {
        let error = step.info_log.last().map_or_else(
            || StepError::UnknownFailure {
                step: step.step_id.clone(),
            },
            |message| StepError::Failed {
                step: step.step_id.clone(),
                message: message.clone(),
            },
        );

        Self {
            step: step.step_id.clone(),
            error: Some(error),
        }
    }

    /// Returns true if the evaluated step marks the end of the plan.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.step == PLAN_COMPLETED
    }
}

/// Determines the step that best represents the state of a plan.
///
/// Priority, highest first:
/// 1. a failed last step;
/// 2. the first step that is neither successful nor pending, carrying an
///    error only if it failed;
/// 3. the last step, flagged with [`StepError::PlanFinished`] when it is
///    [`PLAN_COMPLETED`].
///
/// Returns `None` for an empty log.
#[must_use]
pub fn evaluate_steps(log: &[PlanStep]) -> Option<Evaluation> {
    let last = log.last()?;

    if last.status == StepStatus::Error {
        return Some(Evaluation::failed(last));
    }

    for step in log {
        match step.status {
            StepStatus::Error => return Some(Evaluation::failed(step)),
            StepStatus::Other(_) => return Some(Evaluation::progress(step)),
            StepStatus::Success | StepStatus::Pending => {}
        }
    }

    let mut evaluation = Evaluation::progress(last);
    if evaluation.is_completed() {
        evaluation.error = Some(StepError::PlanFinished);
    }
    Some(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, status: StepStatus, info: &[&str]) -> PlanStep {
        PlanStep {
            step_id: id.to_string(),
            status,
            started_at: DateTime::<Utc>::default(),
            info_log: info.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn test_empty_log() {
        assert!(evaluate_steps(&[]).is_none());
    }

    #[test]
    fn test_pending_step_is_last() {
        let log = vec![
            step("step-1", StepStatus::Success, &[]),
            step("step-2", StepStatus::Success, &[]),
            step("step-3", StepStatus::Success, &[]),
            step("step-4", StepStatus::Pending, &[]),
        ];

        let eval = evaluate_steps(&log).expect("evaluation");
        assert_eq!(eval.step, "step-4");
        assert!(eval.error.is_none());
    }

    #[test]
    fn test_plan_completed_signals_finished() {
        let log = vec![
            step("step-1", StepStatus::Success, &[]),
            step(PLAN_COMPLETED, StepStatus::Success, &[]),
        ];

        let eval = evaluate_steps(&log).expect("evaluation");
        assert_eq!(eval.step, PLAN_COMPLETED);
        assert_eq!(eval.error, Some(StepError::PlanFinished));
    }

    #[test]
    fn test_error_message_is_last_info_log() {
        let log = vec![
            step("step-1", StepStatus::Success, &[]),
            step("allocate", StepStatus::Error, &["retrying", "disk full"]),
        ];

        let eval = evaluate_steps(&log).expect("evaluation");
        assert_eq!(eval.step, "allocate");
        let err = eval.error.expect("error");
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_error_without_info_log_is_unknown_failure() {
        let log = vec![step("allocate", StepStatus::Error, &[])];

        let eval = evaluate_steps(&log).expect("evaluation");
        assert_eq!(
            eval.error,
            Some(StepError::UnknownFailure {
                step: String::from("allocate")
            })
        );
        assert_eq!(eval.error.map(|e| e.to_string()).as_deref(), Some("unknown failure"));
    }

    #[test]
    fn test_earlier_error_beats_later_pending_step() {
        let log = vec![
            step("step-1", StepStatus::Error, &["first"]),
            step("step-2", StepStatus::Pending, &[]),
        ];

        let eval = evaluate_steps(&log).expect("evaluation");
        assert_eq!(eval.step, "step-1");
        assert_eq!(eval.error.map(|e| e.to_string()).as_deref(), Some("first"));
    }

    #[test]
    fn test_last_error_beats_earlier_error() {
        let log = vec![
            step("step-1", StepStatus::Error, &["first"]),
            step("step-2", StepStatus::Success, &[]),
            step("step-3", StepStatus::Error, &["last"]),
        ];

        let eval = evaluate_steps(&log).expect("evaluation");
        assert_eq!(eval.step, "step-3");
        assert_eq!(eval.error.map(|e| e.to_string()).as_deref(), Some("last"));
    }

    #[test]
    fn test_unknown_status_short_circuits_without_error() {
        let log = vec![
            step("step-1", StepStatus::Success, &[]),
            step("step-2", StepStatus::from("cancelled"), &[]),
            step("step-3", StepStatus::Pending, &[]),
        ];

        let eval = evaluate_steps(&log).expect("evaluation");
        assert_eq!(eval.step, "step-2");
        assert!(eval.error.is_none());
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let log = vec![
            step("step-1", StepStatus::Success, &[]),
            step("step-2", StepStatus::Error, &["boom"]),
        ];

        assert_eq!(evaluate_steps(&log), evaluate_steps(&log));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(StepStatus::from("success"), StepStatus::Success);
        assert_eq!(StepStatus::from("pending"), StepStatus::Pending);
        assert_eq!(StepStatus::from("error"), StepStatus::Error);
        assert_eq!(StepStatus::from("warning").to_string(), "warning");
    }
}
