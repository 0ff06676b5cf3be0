//! Deployments API types and data structures.
//!
//! This module defines the snapshot of a deployment as returned by the
//! control plane. Every resource kind has its own `info` shape; the only
//! thing they share is the optional `plan_info` block, exposed through
//! [`KindInfo`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of resources a deployment can own.
///
/// The declaration order is the order in which snapshots are traversed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum ResourceKind {
    /// Search engine cluster.
    #[serde(rename = "elasticsearch")]
    #[value(name = "elasticsearch")]
    Elasticsearch,
    /// Dashboards.
    #[serde(rename = "kibana")]
    #[value(name = "kibana")]
    Kibana,
    /// APM server.
    #[serde(rename = "apm")]
    #[value(name = "apm")]
    Apm,
    /// Integrations server.
    #[serde(rename = "integrations_server")]
    #[value(name = "integrations_server")]
    IntegrationsServer,
    /// App Search.
    #[serde(rename = "appsearch")]
    #[value(name = "appsearch")]
    AppSearch,
    /// Enterprise Search.
    #[serde(rename = "enterprise_search")]
    #[value(name = "enterprise_search")]
    EnterpriseSearch,
}

impl ResourceKind {
    /// All kinds, in traversal order.
    pub const ALL: [Self; 6] = [
        Self::Elasticsearch,
        Self::Kibana,
        Self::Apm,
        Self::IntegrationsServer,
        Self::AppSearch,
        Self::EnterpriseSearch,
    ];

    /// Wire name of the kind, as used in API paths and queries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Elasticsearch => "elasticsearch",
            Self::Kibana => "kibana",
            Self::Apm => "apm",
            Self::IntegrationsServer => "integrations_server",
            Self::AppSearch => "appsearch",
            Self::EnterpriseSearch => "enterprise_search",
        }
    }

    /// Human label of the kind.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Elasticsearch => "Elasticsearch",
            Self::Kibana => "Kibana",
            Self::Apm => "Apm",
            Self::IntegrationsServer => "IntegrationsServer",
            Self::AppSearch => "Appsearch",
            Self::EnterpriseSearch => "EnterpriseSearch",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time read of a deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentSnapshot {
    /// Deployment id.
    pub id: String,
    /// Deployment name.
    #[serde(default)]
    pub name: Option<String>,
    /// Resources owned by the deployment, grouped by kind.
    #[serde(default)]
    pub resources: DeploymentResources,
}

/// Resources of a deployment, grouped by kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentResources {
    /// Search engine clusters.
    #[serde(default)]
    pub elasticsearch: Vec<Resource<ElasticsearchInfo>>,
    /// Dashboards.
    #[serde(default)]
    pub kibana: Vec<Resource<KibanaInfo>>,
    /// APM servers.
    #[serde(default)]
    pub apm: Vec<Resource<ApmInfo>>,
    /// Integrations servers.
    #[serde(default)]
    pub integrations_server: Vec<Resource<IntegrationsServerInfo>>,
    /// App Search instances.
    #[serde(default)]
    pub appsearch: Vec<Resource<AppSearchInfo>>,
    /// Enterprise Search instances.
    #[serde(default)]
    pub enterprise_search: Vec<Resource<EnterpriseSearchInfo>>,
}

/// One resource instance inside a deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resource<I> {
    /// Backend resource id (not the deployment id).
    pub id: String,
    /// Human label, e.g. `main-elasticsearch`.
    #[serde(default)]
    pub ref_id: String,
    /// Region the resource runs in.
    #[serde(default)]
    pub region: Option<String>,
    /// Kind-specific information.
    pub info: I,
}

/// Capability shared by every kind-specific `info` block.
pub trait KindInfo {
    /// The kind this info block belongs to.
    const KIND: ResourceKind;

    /// The resource's plan logs, if it ever had a plan.
    fn plan_info(&self) -> Option<&PlanInfo>;
}

/// Search engine cluster information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElasticsearchInfo {
    /// Cluster id.
    #[serde(default)]
    pub cluster_id: String,
    /// Cluster name.
    #[serde(default)]
    pub cluster_name: String,
    /// Whether the cluster reports itself healthy.
    #[serde(default)]
    pub healthy: Option<bool>,
    /// Plan logs.
    #[serde(default)]
    pub plan_info: Option<PlanInfo>,
}

/// Dashboards information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KibanaInfo {
    /// Cluster id.
    #[serde(default)]
    pub cluster_id: String,
    /// Cluster name.
    #[serde(default)]
    pub cluster_name: String,
    /// The search engine cluster this instance is attached to.
    #[serde(default)]
    pub elasticsearch_cluster: Option<ClusterRef>,
    /// Plan logs.
    #[serde(default)]
    pub plan_info: Option<PlanInfo>,
}

/// APM server information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApmInfo {
    /// APM id.
    #[serde(default)]
    pub id: String,
    /// APM name.
    #[serde(default)]
    pub name: String,
    /// Public APM server URL.
    #[serde(default)]
    pub apm_server_url: Option<String>,
    /// Plan logs.
    #[serde(default)]
    pub plan_info: Option<PlanInfo>,
}

/// Integrations server information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationsServerInfo {
    /// Integrations server id.
    #[serde(default)]
    pub id: String,
    /// Integrations server name.
    #[serde(default)]
    pub name: String,
    /// Plan logs.
    #[serde(default)]
    pub plan_info: Option<PlanInfo>,
}

/// App Search information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSearchInfo {
    /// App Search id.
    #[serde(default)]
    pub id: String,
    /// App Search name.
    #[serde(default)]
    pub name: String,
    /// Plan logs.
    #[serde(default)]
    pub plan_info: Option<PlanInfo>,
}

/// Enterprise Search information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnterpriseSearchInfo {
    /// Enterprise Search id.
    #[serde(default)]
    pub id: String,
    /// Enterprise Search name.
    #[serde(default)]
    pub name: String,
    /// Plan logs.
    #[serde(default)]
    pub plan_info: Option<PlanInfo>,
}

/// Reference to a sibling resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterRef {
    /// Ref id of the referenced resource.
    pub ref_id: String,
}

impl KindInfo for ElasticsearchInfo {
    const KIND: ResourceKind = ResourceKind::Elasticsearch;

    fn plan_info(&self) -> Option<&PlanInfo> {
        self.plan_info.as_ref()
    }
}

impl KindInfo for KibanaInfo {
    const KIND: ResourceKind = ResourceKind::Kibana;

    fn plan_info(&self) -> Option<&PlanInfo> {
        self.plan_info.as_ref()
    }
}

impl KindInfo for ApmInfo {
    const KIND: ResourceKind = ResourceKind::Apm;

    fn plan_info(&self) -> Option<&PlanInfo> {
        self.plan_info.as_ref()
    }
}

impl KindInfo for IntegrationsServerInfo {
    const KIND: ResourceKind = ResourceKind::IntegrationsServer;

    fn plan_info(&self) -> Option<&PlanInfo> {
        self.plan_info.as_ref()
    }
}

impl KindInfo for AppSearchInfo {
    const KIND: ResourceKind = ResourceKind::AppSearch;

    fn plan_info(&self) -> Option<&PlanInfo> {
        self.plan_info.as_ref()
    }
}

impl KindInfo for EnterpriseSearchInfo {
    const KIND: ResourceKind = ResourceKind::EnterpriseSearch;

    fn plan_info(&self) -> Option<&PlanInfo> {
        self.plan_info.as_ref()
    }
}

/// Plan logs of one resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanInfo {
    /// In-flight plan, absent if none.
    #[serde(default)]
    pub pending: Option<PlanAttempt>,
    /// Most recently applied plan, absent until the first plan completes.
    #[serde(default)]
    pub current: Option<PlanAttempt>,
    /// Past plans, newest last.
    #[serde(default)]
    pub history: Vec<PlanAttempt>,
}

/// One attempt at applying a plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanAttempt {
    /// Attempt id.
    #[serde(default)]
    pub plan_attempt_id: Option<String>,
    /// Ordered steps of the attempt.
    #[serde(default)]
    pub plan_attempt_log: Option<Vec<PlanStepInfo>>,
    /// Whether the attempt left the resource healthy.
    #[serde(default)]
    pub healthy: Option<bool>,
}

/// A step as reported by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanStepInfo {
    /// Stable step identifier.
    #[serde(default)]
    pub step_id: Option<String>,
    /// Step status (`success`, `pending`, `error`, ...).
    #[serde(default)]
    pub status: Option<String>,
    /// RFC 3339 start timestamp.
    #[serde(default)]
    pub started: Option<String>,
    /// RFC 3339 completion timestamp.
    #[serde(default)]
    pub completed: Option<String>,
    /// Step duration.
    #[serde(default)]
    pub duration_in_millis: Option<i64>,
    /// Messages logged by the step.
    #[serde(default)]
    pub info_log: Vec<StepLogMessage>,
}

/// A message logged by a plan step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepLogMessage {
    /// Message text.
    pub message: String,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Stage that logged the message.
    #[serde(default)]
    pub stage: Option<String>,
}

/// Flags for fetching a deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetDeploymentParams {
    /// Include plan information.
    pub show_plans: bool,
    /// Include plan step logs.
    pub show_plan_logs: bool,
    /// Include plan history.
    pub show_plan_history: bool,
}

impl GetDeploymentParams {
    /// Flags used while polling for progress.
    #[must_use]
    pub const fn polling() -> Self {
        Self {
            show_plans: true,
            show_plan_logs: true,
            show_plan_history: false,
        }
    }

    /// Flags used for the final, authoritative read.
    #[must_use]
    pub const fn with_history() -> Self {
        Self {
            show_plans: true,
            show_plan_logs: true,
            show_plan_history: true,
        }
    }
}

/// A deployment matched by a search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentRef {
    /// Deployment id.
    pub id: String,
    /// Deployment name.
    #[serde(default)]
    pub name: String,
}

/// Response of a deployment search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matched deployments.
    #[serde(default)]
    pub deployments: Vec<DeploymentRef>,
    /// Number of matches returned.
    #[serde(default)]
    pub return_count: u32,
}
