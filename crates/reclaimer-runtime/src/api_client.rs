use crate::error::{Result, RuntimeError};
use crate::traits::Orchestrator;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::{Event, Pod};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// HTTP client for the Kubernetes API server.
///
/// Supports an explicit URL/token pair for out-of-cluster use and in-cluster
/// discovery from the service-account mount. Every request carries the
/// configured timeout; a request that exceeds it is a per-candidate failure,
/// never a hang.
pub struct KubeApiClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl KubeApiClient {
    /// Create a client for an explicitly configured API server
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RuntimeError::request_failed(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    /// Create a client from the in-cluster environment: service host/port
    /// from the environment, bearer token and CA bundle from the
    /// service-account mount
    pub fn in_cluster(timeout: Duration) -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            RuntimeError::invalid_config(
                "KUBERNETES_SERVICE_HOST is not set",
                "Run inside a cluster, or pass --api-url for out-of-cluster use",
            )
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").map_err(|_| {
            RuntimeError::invalid_config(
                "KUBERNETES_SERVICE_PORT is not set",
                "Run inside a cluster, or pass --api-url for out-of-cluster use",
            )
        })?;

        let token = std::fs::read_to_string(format!("{}/token", SERVICE_ACCOUNT_DIR))
            .map_err(|e| {
                RuntimeError::invalid_config(
                    format!("Failed to read service-account token: {}", e),
                    "Check that the pod mounts a service-account token",
                )
            })?
            .trim()
            .to_string();

        let ca_pem = std::fs::read(format!("{}/ca.crt", SERVICE_ACCOUNT_DIR)).map_err(|e| {
            RuntimeError::invalid_config(
                format!("Failed to read cluster CA bundle: {}", e),
                "Check that the pod mounts the service-account CA certificate",
            )
        })?;
        let ca = reqwest::Certificate::from_pem(&ca_pem)
            .map_err(|e| RuntimeError::request_failed(format!("Invalid CA certificate: {}", e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .add_root_certificate(ca)
            .build()
            .map_err(|e| RuntimeError::request_failed(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: format!("https://{}:{}", host, port),
            token: Some(token),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map the response status, turning 404 into the distinguishable
    /// NotFound error execution relies on
    async fn check(resp: Response, kind: &str, name: &str) -> Result<Response> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RuntimeError::not_found(kind, name));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RuntimeError::api_error(status.as_u16(), body));
        }
        Ok(resp)
    }
}

#[async_trait]
impl Orchestrator for KubeApiClient {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        let path = format!("/api/v1/namespaces/{}/pods/{}", namespace, name);
        let resp = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|e| RuntimeError::request_failed(e.to_string()))?;

        Self::check(resp, "Pod", name)
            .await?
            .json::<Pod>()
            .await
            .map_err(|e| RuntimeError::request_failed(format!("Failed to parse pod: {}", e)))
    }

    async fn get_replica_set(&self, namespace: &str, name: &str) -> Result<ReplicaSet> {
        let path = format!("/apis/apps/v1/namespaces/{}/replicasets/{}", namespace, name);
        let resp = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|e| RuntimeError::request_failed(e.to_string()))?;

        Self::check(resp, "ReplicaSet", name)
            .await?
            .json::<ReplicaSet>()
            .await
            .map_err(|e| RuntimeError::request_failed(format!("Failed to parse replicaset: {}", e)))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        let path = format!("/api/v1/namespaces/{}/pods/{}", namespace, name);
        let resp = self
            .request(Method::DELETE, &path)
            .send()
            .await
            .map_err(|e| RuntimeError::request_failed(e.to_string()))?;

        Self::check(resp, "Pod", name).await?;
        Ok(())
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        // Background propagation: without it the legacy batch/v1 default
        // orphans the job's pods instead of garbage-collecting them
        let path = format!(
            "/apis/batch/v1/namespaces/{}/jobs/{}?propagationPolicy=Background",
            namespace, name
        );
        let resp = self
            .request(Method::DELETE, &path)
            .send()
            .await
            .map_err(|e| RuntimeError::request_failed(e.to_string()))?;

        Self::check(resp, "Job", name).await?;
        Ok(())
    }

    async fn scale_deployment(&self, namespace: &str, name: &str, replicas: i32) -> Result<()> {
        let path = format!(
            "/apis/apps/v1/namespaces/{}/deployments/{}/scale",
            namespace, name
        );
        let resp = self
            .request(Method::PATCH, &path)
            .header(reqwest::header::CONTENT_TYPE, "application/merge-patch+json")
            .json(&json!({ "spec": { "replicas": replicas } }))
            .send()
            .await
            .map_err(|e| RuntimeError::request_failed(e.to_string()))?;

        Self::check(resp, "Deployment", name).await?;
        Ok(())
    }

    async fn create_event(&self, namespace: &str, event: &Event) -> Result<()> {
        let path = format!("/api/v1/namespaces/{}/events", namespace);
        let name = event.metadata.name.as_deref().unwrap_or("<unnamed>");
        let resp = self
            .request(Method::POST, &path)
            .json(event)
            .send()
            .await
            .map_err(|e| RuntimeError::request_failed(e.to_string()))?;

        Self::check(resp, "Event", name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client =
            KubeApiClient::new("https://10.0.0.1:6443/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "https://10.0.0.1:6443");
    }

    /// With no server listening, the request error maps to RequestFailed,
    /// not a panic or a hang (the client carries a timeout)
    #[tokio::test]
    async fn test_unreachable_server_is_request_failed() {
        let client =
            KubeApiClient::new("http://127.0.0.1:1", None, Duration::from_secs(1)).unwrap();
        let result = client.get_pod("default", "missing").await;
        assert!(matches!(result, Err(RuntimeError::RequestFailed { .. })));
    }
}
