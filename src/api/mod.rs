//! Control-plane deployments API module.
//!
//! This module provides the two operations the tracker consumes from the
//! control plane (fetching a deployment snapshot and searching deployments),
//! the snapshot data model, and the search query DSL.

mod client;
mod query;
mod types;

pub use client::{DeploymentApi, DeploymentClient, DEFAULT_ENDPOINT};
pub use query::{BoolQuery, MatchQuery, NestedQuery, Query, SearchRequest};
pub use types::{
    ApmInfo, AppSearchInfo, ClusterRef, DeploymentRef, DeploymentResources, DeploymentSnapshot,
    ElasticsearchInfo, EnterpriseSearchInfo, GetDeploymentParams, IntegrationsServerInfo,
    KibanaInfo, KindInfo, PlanAttempt, PlanInfo, PlanStepInfo, Resource, ResourceKind,
    SearchResponse, StepLogMessage,
};
