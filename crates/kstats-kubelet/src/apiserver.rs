//! Kubernetes API server client for claim and volume lookups

use crate::rest::RestClient;
use crate::Result;
use async_trait::async_trait;
use kstats_core::{EndpointConfig, PersistentVolume, PersistentVolumeClaim, VolumeApi};
use tracing::{debug, info};

/// Read-only client for the core/v1 storage objects
#[derive(Debug, Clone)]
pub struct ApiServerClient {
    rest: RestClient,
}

impl ApiServerClient {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        info!("Creating API server client for endpoint: {}", config.endpoint);
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }
}

#[async_trait]
impl VolumeApi for ApiServerClient {
    async fn persistent_volume_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> kstats_core::Result<PersistentVolumeClaim> {
        let path = format!("/api/v1/namespaces/{}/persistentvolumeclaims/{}", namespace, name);
        let claim: PersistentVolumeClaim = self.rest.get_json(&path).await?;
        debug!("Resolved claim {}/{}", namespace, name);
        Ok(claim)
    }

    async fn persistent_volume(&self, name: &str) -> kstats_core::Result<PersistentVolume> {
        let path = format!("/api/v1/persistentvolumes/{}", name);
        let volume: PersistentVolume = self.rest.get_json(&path).await?;
        debug!("Resolved volume {}", name);
        Ok(volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use axum::{extract::Path, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
    use kstats_core::{AuthType, Error, PersistentVolumeSource};

    async fn claim_handler(Path((namespace, name)): Path<(String, String)>) -> impl IntoResponse {
        if namespace == "ns1" && name == "pvc-a" {
            Json(serde_json::json!({
                "metadata": {"name": "pvc-a", "namespace": "ns1"},
                "spec": {"volumeName": "vol-1"}
            }))
            .into_response()
        } else {
            StatusCode::NOT_FOUND.into_response()
        }
    }

    async fn volume_handler(Path(name): Path<String>) -> impl IntoResponse {
        if name == "vol-1" {
            Json(serde_json::json!({
                "metadata": {"name": "vol-1"},
                "spec": {"gcePersistentDisk": {"pdName": "disk-1", "fsType": "ext4"}}
            }))
            .into_response()
        } else {
            StatusCode::NOT_FOUND.into_response()
        }
    }

    async fn client() -> ApiServerClient {
        let router = Router::new()
            .route(
                "/api/v1/namespaces/:namespace/persistentvolumeclaims/:name",
                get(claim_handler),
            )
            .route("/api/v1/persistentvolumes/:name", get(volume_handler));
        let endpoint = test_server::serve(router).await;
        ApiServerClient::new(&EndpointConfig::new(endpoint).with_auth_type(AuthType::None)).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_claim_and_volume() {
        let client = client().await;

        let claim = client.persistent_volume_claim("ns1", "pvc-a").await.unwrap();
        assert_eq!(claim.volume_name(), Some("vol-1"));

        let volume = client.persistent_volume("vol-1").await.unwrap();
        assert!(matches!(
            volume.source(),
            PersistentVolumeSource::GcePersistentDisk(ref s) if s.pd_name == "disk-1"
        ));
    }

    #[tokio::test]
    async fn test_not_found_is_resolution_failure() {
        let client = client().await;

        let err = client.persistent_volume_claim("ns1", "pvc-missing").await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));

        let err = client.persistent_volume("vol-missing").await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }
}
