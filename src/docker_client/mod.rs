// Docker Engine access: the local socket (swarm topology, network joins)
// and remote node engines (per-node metrics collection).

mod node;
pub(crate) mod unix;

pub use node::{NodeApi, NodeClient, NodeFactory, TlsNodeFactory};

use crate::models::{NetworkInfo, NodeEndpoint, NodeRole, TaskInfo};
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{InspectNetworkOptions, ListNodesOptions};
use bollard::models::{NetworkConnectRequest, NodeSpecRoleEnum};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::HOST;
use hyper::{Method, Request};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

#[derive(thiserror::Error, Debug)]
pub enum DockerClientError {
    /// The named network does not exist (yet). Only the joiner branches
    /// on this.
    #[error("network not found")]
    NotFound,
    #[error("docker api error: {0}")]
    Api(#[from] bollard::errors::Error),
    #[error("remote engine error: {0}")]
    Remote(#[from] reqwest::Error),
    #[error("engine returned status {0}")]
    Status(hyper::StatusCode),
    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("engine transport error: {0}")]
    Transport(#[from] hyper::Error),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Swarm topology operations against the local engine. Errors are
/// propagated, never retried here; retry policy lives in callers that know
/// the semantics (the network joiner).
#[async_trait]
pub trait SwarmApi: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<NodeEndpoint>, DockerClientError>;
    async fn list_tasks(&self, service: &str) -> Result<Vec<TaskInfo>, DockerClientError>;
    async fn inspect_network(&self, name: &str) -> Result<NetworkInfo, DockerClientError>;
    async fn connect_network(
        &self,
        network_id: &str,
        container: &str,
    ) -> Result<(), DockerClientError>;
}

/// Bollard-backed implementation over the local UNIX socket.
pub struct LocalDocker {
    docker: Docker,
    socket_path: String,
}

impl LocalDocker {
    pub fn connect(socket_path: &str) -> Result<Self, DockerClientError> {
        let docker = Docker::connect_with_unix(socket_path, 120, bollard::API_DEFAULT_VERSION)?;
        Ok(Self {
            docker,
            socket_path: socket_path.to_string(),
        })
    }
}

#[async_trait]
impl SwarmApi for LocalDocker {
    async fn list_nodes(&self) -> Result<Vec<NodeEndpoint>, DockerClientError> {
        let nodes = self.docker.list_nodes(None::<ListNodesOptions>).await?;
        let mut out = Vec::with_capacity(nodes.len());
        for n in nodes {
            let id = n.id.unwrap_or_default();
            let addr = n.status.and_then(|s| s.addr).unwrap_or_default();
            if addr.is_empty() || addr == "0.0.0.0" {
                warn!(node = %id, "node has no reachable address, skipping");
                continue;
            }
            let role = match n.spec.as_ref().and_then(|s| s.role.as_ref()) {
                Some(NodeSpecRoleEnum::MANAGER) => NodeRole::Manager,
                _ => NodeRole::Worker,
            };
            out.push(NodeEndpoint { id, role, addr });
        }
        Ok(out)
    }

    // The generated Task model carries no network attachments (a gap in the
    // upstream API definition), so task listing reads the engine endpoint
    // directly and filters by service id client-side.
    async fn list_tasks(&self, service: &str) -> Result<Vec<TaskInfo>, DockerClientError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/tasks")
            .header(HOST, "docker")
            .body(Full::new(Bytes::new()))?;
        let resp = unix::send_request(&self.socket_path, req).await?;
        if !resp.status().is_success() {
            return Err(DockerClientError::Status(resp.status()));
        }
        let body = resp.into_body().collect().await?.to_bytes();
        let tasks: Vec<TaskRaw> = serde_json::from_slice(&body)?;
        Ok(tasks
            .into_iter()
            .filter(|t| t.service_id.as_deref() == Some(service))
            .map(map_task)
            .collect())
    }

    async fn inspect_network(&self, name: &str) -> Result<NetworkInfo, DockerClientError> {
        match self
            .docker
            .inspect_network(name, None::<InspectNetworkOptions>)
            .await
        {
            Ok(net) => Ok(NetworkInfo {
                id: net.id.unwrap_or_default(),
                attachable: net.attachable.unwrap_or(false),
            }),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(DockerClientError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn connect_network(
        &self,
        network_id: &str,
        container: &str,
    ) -> Result<(), DockerClientError> {
        let config = NetworkConnectRequest {
            container: container.to_string(),
            ..Default::default()
        };
        self.docker.connect_network(network_id, config).await?;
        Ok(())
    }
}

// Engine wire shapes for the raw /tasks listing; only the fields the
// dispatcher needs.

#[derive(Debug, Deserialize)]
struct TaskRaw {
    #[serde(rename = "ID")]
    id: Option<String>,
    #[serde(rename = "ServiceID")]
    service_id: Option<String>,
    #[serde(rename = "NetworksAttachments")]
    networks_attachments: Option<Vec<AttachmentRaw>>,
}

#[derive(Debug, Deserialize)]
struct AttachmentRaw {
    #[serde(rename = "Network")]
    network: Option<AttachedNetworkRaw>,
    #[serde(rename = "Addresses")]
    addresses: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct AttachedNetworkRaw {
    #[serde(rename = "Spec")]
    spec: Option<AttachedNetworkSpecRaw>,
}

#[derive(Debug, Deserialize)]
struct AttachedNetworkSpecRaw {
    #[serde(rename = "Name")]
    name: Option<String>,
}

fn map_task(raw: TaskRaw) -> TaskInfo {
    let mut addresses: HashMap<String, Vec<String>> = HashMap::new();
    for attachment in raw.networks_attachments.unwrap_or_default() {
        let Some(name) = attachment
            .network
            .and_then(|n| n.spec)
            .and_then(|s| s.name)
        else {
            continue;
        };
        let addrs = attachment
            .addresses
            .unwrap_or_default()
            .into_iter()
            // Engine reports addresses as ip/prefix.
            .map(|a| a.split('/').next().unwrap_or_default().to_string())
            .filter(|a| !a.is_empty())
            .collect::<Vec<_>>();
        addresses.entry(name).or_default().extend(addrs);
    }
    TaskInfo {
        id: raw.id.unwrap_or_default(),
        addresses,
    }
}
