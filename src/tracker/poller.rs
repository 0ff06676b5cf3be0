//! Plan change poller.
//!
//! [`track_change`] validates its parameters, resolves the deployment when
//! only a resource id is known, and hands back a channel fed by a background
//! task. The task polls the deployment until no new progress is observed for
//! `max_retries` consecutive ticks, then performs one authoritative read that
//! includes plan history and reports the final step of every resource it saw
//! in flight. The channel closes when the task ends.
//!
//! There is no overall deadline: a deployment that keeps producing new
//! pending steps is tracked for as long as it does. Callers that need a bound
//! cancel the session through [`TrackParams::cancel`].

use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{DeploymentSnapshot, GetDeploymentParams};
use crate::error::{Result, TrackError};
use crate::plan::{build_events, TrackEvent};

use super::params::{Target, TrackParams};
use super::resolver::resolve_deployment_id;

/// Starts tracking a plan change.
///
/// # Errors
///
/// Returns a validation error for invalid parameters and, when tracking by
/// resource id, any error raised while resolving its deployment. Once the
/// receiver is returned, every later failure is reported through events.
pub async fn track_change(params: TrackParams) -> Result<mpsc::Receiver<TrackEvent>> {
    let deployment_id = match params.validate()? {
        Target::Deployment(id) => id,
        Target::Resource { resource_id, kind } => {
            resolve_deployment_id(params.api.as_ref(), &resource_id, kind).await?
        }
    };

    let (tx, rx) = mpsc::channel(1);
    let tracker = Tracker {
        params,
        deployment_id,
        tx,
        retries: 0,
        seen: HashSet::new(),
    };
    tokio::spawn(tracker.run());

    Ok(rx)
}

/// Fails if the session was cancelled.
///
/// A cancelled session closes its channel like a converged one; callers
/// check this once the stream is drained.
///
/// # Errors
///
/// Returns [`TrackError::Interrupted`] if `cancel` was cancelled.
pub fn check_interrupted(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(TrackError::Interrupted.into());
    }
    Ok(())
}

/// State owned by the background task.
struct Tracker {
    params: TrackParams,
    deployment_id: String,
    tx: mpsc::Sender<TrackEvent>,
    /// Consecutive ticks without progress.
    retries: u32,
    /// Resources observed with an in-flight plan.
    seen: HashSet<String>,
}

/// Why the task stopped early.
enum Stop {
    Cancelled,
    ReceiverDropped,
}

impl Tracker {
    async fn run(mut self) {
        info!("Tracking plan changes for deployment {}", self.deployment_id);

        let period = self.params.config.poll_frequency;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.retries < self.params.config.max_retries {
            tokio::select! {
                biased;
                () = self.params.cancel.cancelled() => {
                    self.stopped(&Stop::Cancelled);
                    return;
                }
                _ = ticker.tick() => {}
            }

            if let Err(stop) = self.poll().await {
                self.stopped(&stop);
                return;
            }
        }
        drop(ticker);

        if let Err(stop) = self.finish().await {
            self.stopped(&stop);
        }
    }

    /// One polling tick.
    async fn poll(&mut self) -> std::result::Result<(), Stop> {
        let snapshot = match self.fetch(GetDeploymentParams::polling()).await? {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.retries += 1;
                warn!(
                    retries = self.retries,
                    "Failed to fetch deployment {}: {e}", self.deployment_id
                );
                return Ok(());
            }
        };

        let events = build_events(&snapshot, false);
        debug!("Tick produced {} events", events.len());

        if events.is_empty() {
            self.retries += 1;
            return Ok(());
        }

        self.retries = 0;
        for event in events {
            self.seen.insert(event.resource_id.clone());
            self.emit(event).await?;
        }

        Ok(())
    }

    /// The authoritative read once polling stopped finding progress.
    async fn finish(&self) -> std::result::Result<(), Stop> {
        info!(
            "No new progress after {} attempts, checking final plan state of deployment {}",
            self.retries, self.deployment_id
        );

        let Some(snapshot) = self.fetch_final().await? else {
            return Ok(());
        };

        // The final read is authoritative: whatever it reports is terminal.
        for mut event in build_events(&snapshot, true) {
            if self.seen.contains(&event.resource_id) {
                event.finished = true;
                self.emit(event).await?;
            }
        }

        Ok(())
    }

    /// Fetches the final snapshot, retrying up to `max_retries` more times.
    async fn fetch_final(&self) -> std::result::Result<Option<DeploymentSnapshot>, Stop> {
        let max_retries = self.params.config.max_retries;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                tokio::select! {
                    biased;
                    () = self.params.cancel.cancelled() => return Err(Stop::Cancelled),
                    () = tokio::time::sleep(self.params.config.poll_frequency) => {}
                }
            }

            match self.fetch(GetDeploymentParams::with_history()).await? {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => warn!(
                    attempt,
                    "Failed to fetch final state of deployment {}: {e}", self.deployment_id
                ),
            }
        }

        warn!(
            "Giving up on the final state of deployment {} after {} attempts",
            self.deployment_id,
            max_retries + 1
        );
        Ok(None)
    }

    async fn fetch(
        &self,
        params: GetDeploymentParams,
    ) -> std::result::Result<Result<DeploymentSnapshot>, Stop> {
        tokio::select! {
            biased;
            () = self.params.cancel.cancelled() => Err(Stop::Cancelled),
            result = self.params.api.get_deployment(&self.deployment_id, params) => Ok(result),
        }
    }

    async fn emit(&self, mut event: TrackEvent) -> std::result::Result<(), Stop> {
        if self.params.filters_out(event.kind) {
            return Ok(());
        }
        event.deployment_id.clone_from(&self.deployment_id);

        tokio::select! {
            biased;
            () = self.params.cancel.cancelled() => Err(Stop::Cancelled),
            sent = self.tx.send(event) => sent.map_err(|_| Stop::ReceiverDropped),
        }
    }

    fn stopped(&self, stop: &Stop) {
        match stop {
            Stop::Cancelled => info!("Tracking of deployment {} cancelled", self.deployment_id),
            Stop::ReceiverDropped => {
                debug!("Event receiver for deployment {} dropped", self.deployment_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        DeploymentApi, DeploymentRef, ElasticsearchInfo, KibanaInfo, PlanAttempt, PlanInfo,
        PlanStepInfo, Resource, ResourceKind, SearchRequest,
    };
    use crate::error::{ApiError, StepError};
    use crate::tracker::TrackConfig;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Scripted = VecDeque<Result<DeploymentSnapshot>>;

    /// Replays scripted snapshots; returns `fallback` once a script is exhausted.
    #[derive(Default)]
    struct ScriptedApi {
        polls: Mutex<Scripted>,
        finals: Mutex<Scripted>,
        fallback: DeploymentSnapshot,
        search: Vec<DeploymentRef>,
        calls: Mutex<Vec<GetDeploymentParams>>,
    }

    impl ScriptedApi {
        fn call_count(&self) -> usize {
            self.calls.lock().map(|c| c.len()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl DeploymentApi for ScriptedApi {
        async fn get_deployment(
            &self,
            _deployment_id: &str,
            params: GetDeploymentParams,
        ) -> Result<DeploymentSnapshot> {
            self.calls.lock().expect("lock").push(params);
            let script = if params.show_plan_history { &self.finals } else { &self.polls };
            let next = script.lock().expect("lock").pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }

        async fn search_deployments(&self, _request: &SearchRequest) -> Result<Vec<DeploymentRef>> {
            Ok(self.search.clone())
        }
    }

    fn attempt(steps: &[(&str, &str)]) -> PlanAttempt {
        PlanAttempt {
            plan_attempt_log: Some(
                steps
                    .iter()
                    .map(|(id, status)| PlanStepInfo {
                        step_id: Some((*id).to_string()),
                        status: Some((*status).to_string()),
                        started: Some(String::from("2024-05-01T10:00:00Z")),
                        ..PlanStepInfo::default()
                    })
                    .collect(),
            ),
            ..PlanAttempt::default()
        }
    }

    fn pending(steps: &[(&str, &str)]) -> Option<PlanInfo> {
        Some(PlanInfo {
            pending: Some(attempt(steps)),
            ..PlanInfo::default()
        })
    }

    fn current(steps: &[(&str, &str)]) -> Option<PlanInfo> {
        Some(PlanInfo {
            current: Some(attempt(steps)),
            ..PlanInfo::default()
        })
    }

    fn snapshot(es: Option<PlanInfo>, kibana: Option<PlanInfo>) -> DeploymentSnapshot {
        let mut snapshot = DeploymentSnapshot {
            id: String::from("dep-1"),
            ..DeploymentSnapshot::default()
        };
        snapshot.resources.elasticsearch.push(Resource {
            id: String::from("es-1"),
            ref_id: String::from("main-elasticsearch"),
            region: None,
            info: ElasticsearchInfo {
                plan_info: es,
                ..ElasticsearchInfo::default()
            },
        });
        snapshot.resources.kibana.push(Resource {
            id: String::from("kb-1"),
            ref_id: String::from("main-kibana"),
            region: None,
            info: KibanaInfo {
                plan_info: kibana,
                ..KibanaInfo::default()
            },
        });
        snapshot
    }

    fn completed() -> Option<PlanInfo> {
        current(&[
            ("step-1", "success"),
            ("step-2", "success"),
            ("step-3", "success"),
            ("step-4", "success"),
            ("step-5", "success"),
            ("plan-completed", "success"),
        ])
    }

    fn in_flight() -> Option<PlanInfo> {
        pending(&[
            ("step-1", "success"),
            ("step-2", "success"),
            ("step-3", "success"),
            ("step-4", "pending"),
        ])
    }

    fn config(max_retries: u32) -> TrackConfig {
        TrackConfig::new(Duration::from_secs(1), max_retries)
    }

    async fn collect(mut rx: mpsc::Receiver<TrackEvent>) -> Vec<TrackEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_finished() {
        let api = Arc::new(ScriptedApi {
            polls: Mutex::new(VecDeque::from([
                Ok(snapshot(in_flight(), None)),
                Ok(snapshot(completed(), None)),
            ])),
            finals: Mutex::new(VecDeque::from([Ok(snapshot(completed(), None))])),
            ..ScriptedApi::default()
        });

        let params = TrackParams::for_deployment(api.clone(), "dep-1").with_config(config(1));
        let events = collect(track_change(params).await.expect("started")).await;

        let steps: Vec<&str> = events.iter().map(|e| e.step.as_str()).collect();
        assert_eq!(steps, vec!["step-4", "plan-completed"]);
        assert!(!events[0].finished);
        assert!(events[1].finished);
        assert_eq!(events[1].err, Some(StepError::PlanFinished));
        assert!(events.iter().all(|e| e.deployment_id == "dep-1"));
        assert_eq!(api.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_plan_is_terminal_in_final_read() {
        let mut failed = PlanStepInfo {
            step_id: Some(String::from("allocate")),
            status: Some(String::from("error")),
            started: Some(String::from("2024-05-01T10:00:00Z")),
            ..PlanStepInfo::default()
        };
        failed.info_log = vec![crate::api::StepLogMessage {
            message: String::from("disk full"),
            ..crate::api::StepLogMessage::default()
        }];
        let history = Some(PlanInfo {
            history: vec![PlanAttempt {
                plan_attempt_log: Some(vec![failed]),
                ..PlanAttempt::default()
            }],
            ..PlanInfo::default()
        });
        let api = Arc::new(ScriptedApi {
            polls: Mutex::new(VecDeque::from([Ok(snapshot(in_flight(), None))])),
            finals: Mutex::new(VecDeque::from([Ok(snapshot(history, None))])),
            ..ScriptedApi::default()
        });

        let params = TrackParams::for_deployment(api, "dep-1").with_config(config(1));
        let events = collect(track_change(params).await.expect("started")).await;

        let last = events.last().expect("final event");
        assert_eq!(last.step, "allocate");
        assert!(last.finished);
        assert_eq!(last.failure().map(ToString::to_string).as_deref(), Some("disk full"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_fails_synchronously() {
        let api = Arc::new(ScriptedApi::default());

        let params = TrackParams::for_deployment(api.clone(), "dep-1").with_config(config(0));
        let result = track_change(params).await;
        assert!(result.is_err_and(|e| e.is_validation()));

        let params = TrackParams::for_deployment(api.clone(), "dep-1")
            .with_config(TrackConfig::new(Duration::ZERO, 1));
        assert!(track_change(params).await.is_err());

        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_consume_retries() {
        let api = Arc::new(ScriptedApi {
            polls: Mutex::new(VecDeque::from([
                Err(ApiError::network("reset").into()),
                Err(ApiError::network("reset").into()),
            ])),
            fallback: snapshot(in_flight(), None),
            ..ScriptedApi::default()
        });

        let params = TrackParams::for_deployment(api.clone(), "dep-1").with_config(config(2));
        let events = collect(track_change(params).await.expect("started")).await;

        // Nothing was ever seen in flight, so the final read reports nothing.
        assert!(events.is_empty());
        assert_eq!(api.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_resets_retry_counter() {
        let api = Arc::new(ScriptedApi {
            polls: Mutex::new(VecDeque::from([
                Err(ApiError::network("reset").into()),
                Ok(snapshot(in_flight(), None)),
                Err(ApiError::network("reset").into()),
                Ok(snapshot(in_flight(), None)),
            ])),
            finals: Mutex::new(VecDeque::from([Ok(snapshot(completed(), None))])),
            ..ScriptedApi::default()
        });

        let params = TrackParams::for_deployment(api.clone(), "dep-1").with_config(config(2));
        let events = collect(track_change(params).await.expect("started")).await;

        let steps: Vec<&str> = events.iter().map(|e| e.step.as_str()).collect();
        assert_eq!(steps, vec!["step-4", "step-4", "plan-completed"]);
        // Four scripted polls, two empty fallback polls, one final read.
        assert_eq!(api.call_count(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_read_is_retried() {
        let api = Arc::new(ScriptedApi {
            polls: Mutex::new(VecDeque::from([Ok(snapshot(in_flight(), None))])),
            finals: Mutex::new(VecDeque::from([
                Err(ApiError::network("reset").into()),
                Ok(snapshot(completed(), None)),
            ])),
            ..ScriptedApi::default()
        });

        let params = TrackParams::for_deployment(api.clone(), "dep-1").with_config(config(1));
        let events = collect(track_change(params).await.expect("started")).await;

        assert_eq!(events.last().map(|e| e.step.as_str()), Some("plan-completed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_read_gives_up() {
        let api = Arc::new(ScriptedApi {
            polls: Mutex::new(VecDeque::from([Ok(snapshot(in_flight(), None))])),
            finals: Mutex::new(VecDeque::from([
                Err(ApiError::network("reset").into()),
                Err(ApiError::network("reset").into()),
            ])),
            ..ScriptedApi::default()
        });

        let params = TrackParams::for_deployment(api.clone(), "dep-1").with_config(config(1));
        let events = collect(track_change(params).await.expect("started")).await;

        let steps: Vec<&str> = events.iter().map(|e| e.step.as_str()).collect();
        assert_eq!(steps, vec!["step-4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_read_only_reports_seen_resources() {
        let api = Arc::new(ScriptedApi {
            polls: Mutex::new(VecDeque::from([Ok(snapshot(in_flight(), None))])),
            finals: Mutex::new(VecDeque::from([Ok(snapshot(completed(), completed()))])),
            ..ScriptedApi::default()
        });

        let params = TrackParams::for_deployment(api.clone(), "dep-1").with_config(config(1));
        let events = collect(track_change(params).await.expect("started")).await;

        assert!(events.iter().all(|e| e.kind == ResourceKind::Elasticsearch));
        assert_eq!(events.len(), 2);
    }

    fn two_resource_api() -> Arc<ScriptedApi> {
        Arc::new(ScriptedApi {
            polls: Mutex::new(VecDeque::from([Ok(snapshot(in_flight(), in_flight()))])),
            finals: Mutex::new(VecDeque::from([Ok(snapshot(completed(), completed()))])),
            ..ScriptedApi::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignore_downstream_filters_other_kinds() {
        let params = TrackParams::for_deployment(two_resource_api(), "dep-1")
            .with_config(config(1))
            .with_kind(ResourceKind::Elasticsearch)
            .with_ignore_downstream(true);
        let events = collect(track_change(params).await.expect("started")).await;

        let seen: Vec<(ResourceKind, &str)> =
            events.iter().map(|e| (e.kind, e.step.as_str())).collect();
        assert_eq!(
            seen,
            vec![
                (ResourceKind::Elasticsearch, "step-4"),
                (ResourceKind::Elasticsearch, "plan-completed"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_downstream_events_are_interleaved_per_tick() {
        let params = TrackParams::for_deployment(two_resource_api(), "dep-1")
            .with_config(config(1))
            .with_kind(ResourceKind::Elasticsearch);
        let events = collect(track_change(params).await.expect("started")).await;

        let seen: Vec<(ResourceKind, &str)> =
            events.iter().map(|e| (e.kind, e.step.as_str())).collect();
        assert_eq!(
            seen,
            vec![
                (ResourceKind::Elasticsearch, "step-4"),
                (ResourceKind::Kibana, "step-4"),
                (ResourceKind::Elasticsearch, "plan-completed"),
                (ResourceKind::Kibana, "plan-completed"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_deployment_from_resource() {
        let mut final_snapshot = snapshot(completed(), None);
        final_snapshot.id = String::from("dep-7");
        let api = Arc::new(ScriptedApi {
            polls: Mutex::new(VecDeque::from([Ok(snapshot(in_flight(), None))])),
            finals: Mutex::new(VecDeque::from([Ok(final_snapshot)])),
            search: vec![DeploymentRef {
                id: String::from("dep-7"),
                name: String::from("prod"),
            }],
            ..ScriptedApi::default()
        });

        let params = TrackParams::for_resource(api, "es-1", ResourceKind::Elasticsearch)
            .with_config(config(1));
        let events = collect(track_change(params).await.expect("started")).await;

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.deployment_id == "dep-7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolvable_resource_fails_synchronously() {
        let params = TrackParams::for_resource(
            Arc::new(ScriptedApi::default()),
            "es-1",
            ResourceKind::Elasticsearch,
        );
        assert!(track_change(params).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_closes_channel() {
        let api = Arc::new(ScriptedApi {
            fallback: snapshot(in_flight(), None),
            ..ScriptedApi::default()
        });
        let cancel = CancellationToken::new();

        let params = TrackParams::for_deployment(api.clone(), "dep-1")
            .with_config(config(1))
            .with_cancellation(cancel.clone());
        let mut rx = track_change(params).await.expect("started");

        assert!(rx.recv().await.is_some());
        cancel.cancel();

        // At most the event already queued before cancellation.
        let rest = collect(rx).await;
        assert!(rest.len() <= 1);
        assert!(rest.iter().all(|e| e.step == "step-4"));

        let calls = api.calls.lock().expect("lock").clone();
        assert!(!calls.is_empty());
        assert!(calls.iter().all(|params| !params.show_plan_history));
        assert!(matches!(
            check_interrupted(&cancel),
            Err(crate::error::TrackerError::Track(TrackError::Interrupted))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_converged_session_is_not_interrupted() {
        let cancel = CancellationToken::new();
        let params = TrackParams::for_deployment(two_resource_api(), "dep-1")
            .with_config(config(1))
            .with_cancellation(cancel.clone());

        let events = collect(track_change(params).await.expect("started")).await;

        assert!(!events.is_empty());
        assert!(check_interrupted(&cancel).is_ok());
    }
}
