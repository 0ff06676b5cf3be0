//! Line-delimited JSON progress records.

use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::sync::mpsc;

use crate::api::ResourceKind;
use crate::error::Result;
use crate::plan::TrackEvent;

use super::{format_duration, StreamState};

/// Serialized form of a step failure.
///
/// Only the message survives serialization; the error variant does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error message.
    pub message: String,
}

/// One rendered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Backend resource id.
    pub id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Current step id.
    pub step: String,
    /// Step failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<ErrorRecord>,
    /// Deployment owning the resource.
    pub deployment_id: String,
    /// Human label of the resource.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ref_id: String,
    /// Elapsed plan time, e.g. `1m30s`.
    pub duration: String,
    /// No further progress is expected.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub finished: bool,
}

impl From<&TrackEvent> for EventRecord {
    fn from(event: &TrackEvent) -> Self {
        Self {
            id: event.resource_id.clone(),
            kind: event.kind,
            step: event.step.clone(),
            err: event.failure().map(|e| ErrorRecord {
                message: e.to_string(),
            }),
            deployment_id: event.deployment_id.clone(),
            ref_id: event.ref_id.clone(),
            duration: format_duration(event.duration),
            finished: event.finished,
        }
    }
}

/// Drains `events`, writing one JSON object per rendered event.
///
/// # Errors
///
/// Returns the failure of a finished resource, a combined error if several
/// resources failed, or an IO error if `out` cannot be written.
pub async fn render_json(
    mut events: mpsc::Receiver<TrackEvent>,
    out: &mut impl Write,
    pretty: bool,
) -> Result<()> {
    let mut state = StreamState::default();

    while let Some(event) = events.recv().await {
        if state.admit(&event).is_none() {
            continue;
        }

        let record = EventRecord::from(&event);
        let written = if pretty {
            serde_json::to_writer_pretty(&mut *out, &record)
        } else {
            serde_json::to_writer(&mut *out, &record)
        };
        written.map_err(std::io::Error::from)?;
        writeln!(out)?;
    }

    state.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;
    use std::time::Duration;

    fn event(id: &str, kind: ResourceKind, step: &str) -> TrackEvent {
        TrackEvent {
            resource_id: id.to_string(),
            ref_id: String::new(),
            kind,
            deployment_id: String::from("dep-1"),
            step: step.to_string(),
            err: None,
            finished: false,
            duration: Duration::from_secs(3_723),
        }
    }

    async fn render(events: Vec<TrackEvent>, pretty: bool) -> (String, Result<()>) {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            tx.send(event).await.expect("send");
        }
        drop(tx);

        let mut out = Vec::new();
        let result = render_json(rx, &mut out, pretty).await;
        (String::from_utf8(out).expect("utf-8"), result)
    }

    #[tokio::test]
    async fn test_compact_line_omits_empty_fields() {
        let (output, result) =
            render(vec![event("es-1", ResourceKind::Elasticsearch, "step-4")], false).await;

        assert!(result.is_ok());
        assert_eq!(
            output,
            "{\"id\":\"es-1\",\"kind\":\"elasticsearch\",\"step\":\"step-4\",\"deployment_id\":\"dep-1\",\"duration\":\"1h2m3s\"}\n"
        );
    }

    #[tokio::test]
    async fn test_plan_finished_is_not_an_error_field() {
        let mut done = event("kb-1", ResourceKind::Kibana, "plan-completed");
        done.err = Some(StepError::PlanFinished);
        done.finished = true;

        let (output, _) = render(vec![done], false).await;
        let record: EventRecord = serde_json::from_str(output.trim()).expect("json");

        assert!(record.err.is_none());
        assert!(record.finished);
    }

    #[tokio::test]
    async fn test_records_parse_back() {
        let mut failed = event("es-1", ResourceKind::Elasticsearch, "allocate");
        failed.ref_id = String::from("main-elasticsearch");
        failed.err = Some(StepError::Failed {
            step: String::from("allocate"),
            message: String::from("disk full"),
        });
        failed.finished = true;
        let events = vec![
            event("es-1", ResourceKind::Elasticsearch, "step-1"),
            event("apm-1", ResourceKind::Apm, "step-1"),
            failed,
        ];
        let expected: Vec<EventRecord> = events.iter().map(EventRecord::from).collect();

        let (output, result) = render(events, false).await;
        let parsed: Vec<EventRecord> = output
            .lines()
            .map(|line| serde_json::from_str(line).expect("json"))
            .collect();

        assert_eq!(parsed, expected);
        assert_eq!(
            parsed[2].err,
            Some(ErrorRecord {
                message: String::from("disk full")
            })
        );
        assert_eq!(result.expect_err("failure").to_string(), "disk full");
    }

    #[tokio::test]
    async fn test_pretty_output_is_multiline() {
        let (output, _) =
            render(vec![event("es-1", ResourceKind::Elasticsearch, "step-4")], true).await;

        assert!(output.lines().count() > 1);
        let record: EventRecord = serde_json::from_str(&output).expect("json");
        assert_eq!(record.step, "step-4");
    }
}
