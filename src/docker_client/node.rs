// Remote node engine client. Each node in the swarm fronts its engine with
// the same proxy, so calls go over HTTPS with the shared token header.

use async_trait::async_trait;
use bollard::models::{ContainerStatsResponse, ContainerSummary};
use reqwest::header::{HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

use super::DockerClientError;
use crate::config::MetricsPorts;
use crate::models::NodeEndpoint;

/// Per-node engine operations used by the metrics collector.
#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, DockerClientError>;
    async fn container_stats(&self, id: &str) -> Result<ContainerStatsResponse, DockerClientError>;
}

/// Builds a client for a node; swapped out for a test double in tests.
pub trait NodeFactory: Send + Sync {
    fn client_for(
        &self,
        node: &NodeEndpoint,
        token: &str,
    ) -> Result<Arc<dyn NodeApi>, DockerClientError>;
}

pub struct NodeClient {
    base_url: String,
    http: reqwest::Client,
}

impl NodeClient {
    pub fn new(
        base_url: impl Into<String>,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, DockerClientError> {
        let value = HeaderValue::from_str(token).map_err(|_| {
            DockerClientError::Other("token contains invalid header characters".to_string())
        })?;
        let mut headers = HeaderMap::new();
        headers.insert("token", value);
        let http = reqwest::Client::builder()
            // The shared token is the authorization control here, not the
            // engine's TLS identity; intra-cluster certs are not verified.
            .danger_accept_invalid_certs(true)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, http })
    }
}

#[async_trait]
impl NodeApi for NodeClient {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, DockerClientError> {
        let url = format!("{}/containers/json", self.base_url);
        let resp = self.http.get(&url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    async fn container_stats(&self, id: &str) -> Result<ContainerStatsResponse, DockerClientError> {
        // One-shot sample; the engine includes the previous cumulative
        // counters in the same response.
        let url = format!("{}/containers/{}/stats", self.base_url, id);
        let resp = self
            .http
            .get(&url)
            .query(&[("stream", "false")])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

/// Production factory: HTTPS to the node's role-specific engine port.
pub struct TlsNodeFactory {
    ports: MetricsPorts,
    timeout: Duration,
}

impl TlsNodeFactory {
    pub fn new(ports: MetricsPorts, timeout: Duration) -> Self {
        Self { ports, timeout }
    }
}

impl NodeFactory for TlsNodeFactory {
    fn client_for(
        &self,
        node: &NodeEndpoint,
        token: &str,
    ) -> Result<Arc<dyn NodeApi>, DockerClientError> {
        let port = self.ports.for_role(node.role);
        let client = NodeClient::new(format!("https://{}:{}", node.addr, port), token, self.timeout)?;
        Ok(Arc::new(client))
    }
}
