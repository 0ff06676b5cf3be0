//! Deployment resolution from a bare resource id.

use tracing::{debug, info};

use crate::api::{DeploymentApi, ResourceKind, SearchRequest};
use crate::error::{Result, TrackError};

/// Finds the id of the deployment that owns a resource.
///
/// # Errors
///
/// Returns [`TrackError::ResourceNotFound`] if no deployment matches, or the
/// API error if the search itself fails.
pub async fn resolve_deployment_id(
    api: &dyn DeploymentApi,
    resource_id: &str,
    kind: ResourceKind,
) -> Result<String> {
    debug!("Resolving deployment for {kind} resource {resource_id}");

    let request = SearchRequest::by_resource_id(resource_id);
    let deployments = api.search_deployments(&request).await?;

    let deployment = deployments.into_iter().next().ok_or_else(|| TrackError::ResourceNotFound {
        resource_id: resource_id.to_string(),
    })?;

    info!("Resource {resource_id} belongs to deployment {}", deployment.id);
    Ok(deployment.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DeploymentRef, DeploymentSnapshot, GetDeploymentParams};
    use crate::error::{ApiError, TrackerError};
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        Api {}

        #[async_trait]
        impl DeploymentApi for Api {
            async fn get_deployment(
                &self,
                deployment_id: &str,
                params: GetDeploymentParams,
            ) -> Result<DeploymentSnapshot>;

            async fn search_deployments(&self, request: &SearchRequest) -> Result<Vec<DeploymentRef>>;
        }
    }

    fn deployment(id: &str) -> DeploymentRef {
        DeploymentRef {
            id: id.to_string(),
            name: String::new(),
        }
    }

    #[tokio::test]
    async fn test_returns_first_match() {
        let mut api = MockApi::new();
        api.expect_search_deployments()
            .withf(|request| *request == SearchRequest::by_resource_id("es-1"))
            .times(1)
            .returning(|_| Ok(vec![deployment("dep-1"), deployment("dep-2")]));

        let id = resolve_deployment_id(&api, "es-1", ResourceKind::Elasticsearch)
            .await
            .expect("resolved");
        assert_eq!(id, "dep-1");
    }

    #[tokio::test]
    async fn test_no_match_is_not_found() {
        let mut api = MockApi::new();
        api.expect_search_deployments().returning(|_| Ok(vec![]));

        let err = resolve_deployment_id(&api, "kb-1", ResourceKind::Kibana)
            .await
            .expect_err("not found");
        assert!(matches!(
            err,
            TrackerError::Track(TrackError::ResourceNotFound { ref resource_id }) if resource_id == "kb-1"
        ));
    }

    #[tokio::test]
    async fn test_transport_error_is_propagated() {
        let mut api = MockApi::new();
        api.expect_search_deployments()
            .returning(|_| Err(ApiError::network("connection reset").into()));

        let err = resolve_deployment_id(&api, "kb-1", ResourceKind::Kibana)
            .await
            .expect_err("transport failure");
        assert!(matches!(err, TrackerError::Api(ApiError::NetworkError { .. })));
    }
}
