//! Progress stream renderers.
//!
//! Both renderers drain a tracker's event channel, print one line per
//! meaningful change, and fold the failures of finished resources into the
//! returned error:
//! - [`render_text`]: colored, human-readable lines
//! - [`render_json`]: one JSON object per line

mod json;
mod text;

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Result, StepError, TrackError};
use crate::plan::TrackEvent;

pub use json::{render_json, ErrorRecord, EventRecord};
pub use text::render_text;

/// How an admitted event is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    /// Progress on a step.
    Running,
    /// A step failed but the plan is not over yet.
    Warning,
    /// The plan finished successfully.
    Succeeded,
    /// The plan finished on a failed step.
    Failed,
}

/// An event that passed de-duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line {
    kind: LineKind,
    /// First line rendered for this resource.
    first: bool,
}

/// De-duplication and error accumulation shared by the renderers.
#[derive(Debug, Default)]
struct StreamState {
    last_step: HashMap<String, String>,
    errors: Vec<StepError>,
}

impl StreamState {
    /// Decides whether an event is rendered, and how.
    ///
    /// An event is rendered when its step differs from the last one rendered
    /// for the resource, or when it carries an error.
    fn admit(&mut self, event: &TrackEvent) -> Option<Line> {
        let previous = self
            .last_step
            .insert(event.resource_id.clone(), event.step.clone());

        let changed = previous.as_deref() != Some(event.step.as_str());
        if !changed && event.err.is_none() {
            return None;
        }

        let kind = match (event.finished, event.failure()) {
            (true, Some(err)) => {
                self.errors.push(err.clone());
                LineKind::Failed
            }
            (true, None) => LineKind::Succeeded,
            (false, Some(_)) => LineKind::Warning,
            (false, None) => LineKind::Running,
        };

        Some(Line {
            kind,
            first: previous.is_none(),
        })
    }

    /// Returns the accumulated failures, if any.
    fn finish(self) -> Result<()> {
        TrackError::from_step_errors(self.errors).map_or(Ok(()), |e| Err(e.into()))
    }
}

/// Formats a duration as `1h2m3s`, truncated to whole seconds.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
