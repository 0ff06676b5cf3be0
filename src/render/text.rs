//! Human-readable progress lines.

use colored::Colorize;
use std::io::Write;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::plan::TrackEvent;

use super::{format_duration, Line, LineKind, StreamState};

/// Drains `events`, writing one colored line per rendered event.
///
/// # Errors
///
/// Returns the failure of a finished resource, a combined error if several
/// resources failed, or an IO error if `out` cannot be written.
pub async fn render_text(mut events: mpsc::Receiver<TrackEvent>, out: &mut impl Write) -> Result<()> {
    let mut state = StreamState::default();

    while let Some(event) = events.recv().await {
        if let Some(line) = state.admit(&event) {
            writeln!(out, "{}", format_line(&event, line))?;
        }
    }

    state.finish()
}

fn format_line(event: &TrackEvent, line: Line) -> String {
    let prefix = format!(
        "Deployment [{}] - [{}][{}]",
        event.deployment_id,
        event.kind.title(),
        event.resource_id
    );
    let duration = format_duration(event.duration);
    let message = event.failure().map(ToString::to_string).unwrap_or_default();

    match line.kind {
        LineKind::Running => {
            let text = format!(
                "{prefix}: running step \"{}\" (Plan duration {duration})...",
                event.step
            );
            if line.first {
                text.bold().to_string()
            } else {
                text
            }
        }
        LineKind::Warning => format!(
            "{prefix}: step \"{}\" reported error: \"{message}\" (Plan duration {duration})",
            event.step
        )
        .yellow()
        .to_string(),
        LineKind::Succeeded => format!(
            "{prefix}: finished running all the plan steps (Total plan duration {duration})"
        )
        .green()
        .to_string(),
        LineKind::Failed => format!(
            "{prefix}: caught error: \"{message}\" (Total plan duration {duration})"
        )
        .red()
        .to_string(),
    }
}
