// Shared test helpers: programmable fakes for the Docker seams and mock
// HTTP servers for task/node endpoints.

#![allow(dead_code)]

use async_trait::async_trait;
use bollard::models::{
    ContainerCpuStats, ContainerCpuUsage, ContainerMemoryStats, ContainerStatsResponse,
    ContainerSummary,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use swarmgate::config::AppConfig;
use swarmgate::docker_client::{DockerClientError, NodeApi, NodeFactory, SwarmApi};
use swarmgate::models::{NetworkInfo, NodeEndpoint, NodeRole, TaskInfo};
use swarmgate::routes::AppState;

pub fn test_config() -> AppConfig {
    let mut env = HashMap::new();
    env.insert("DOCKER_API_TOKEN".to_string(), "secret".to_string());
    env.insert("SWARM_NETWORK".to_string(), "ovnet".to_string());
    env.insert("DOCKER_API_REQUEST_TIMEOUT_MS".to_string(), "2000".to_string());
    AppConfig::from_env_map(&env).unwrap()
}

// ── Fake swarm (local engine) ───────────────────────────────

/// Scripted inspect_network outcome for joiner tests.
pub enum NetworkStep {
    NotFound,
    Error,
    Found { id: String, attachable: bool },
}

#[derive(Default)]
pub struct FakeSwarm {
    pub nodes: Vec<NodeEndpoint>,
    pub tasks: Vec<TaskInfo>,
    pub fail_list_nodes: bool,
    pub fail_list_tasks: bool,
    pub network_script: Mutex<VecDeque<NetworkStep>>,
    pub connect_script: Mutex<VecDeque<bool>>,
    pub list_nodes_calls: AtomicUsize,
    pub list_tasks_calls: AtomicUsize,
    pub inspect_calls: AtomicUsize,
    pub connect_calls: AtomicUsize,
    pub connected: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SwarmApi for FakeSwarm {
    async fn list_nodes(&self) -> Result<Vec<NodeEndpoint>, DockerClientError> {
        self.list_nodes_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list_nodes {
            return Err(DockerClientError::Other("node list unavailable".to_string()));
        }
        Ok(self.nodes.clone())
    }

    async fn list_tasks(&self, _service: &str) -> Result<Vec<TaskInfo>, DockerClientError> {
        self.list_tasks_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list_tasks {
            return Err(DockerClientError::Other("task list unavailable".to_string()));
        }
        Ok(self.tasks.clone())
    }

    async fn inspect_network(&self, _name: &str) -> Result<NetworkInfo, DockerClientError> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        match self.network_script.lock().unwrap().pop_front() {
            Some(NetworkStep::Found { id, attachable }) => Ok(NetworkInfo { id, attachable }),
            Some(NetworkStep::Error) => {
                Err(DockerClientError::Other("engine unavailable".to_string()))
            }
            Some(NetworkStep::NotFound) | None => Err(DockerClientError::NotFound),
        }
    }

    async fn connect_network(
        &self,
        network_id: &str,
        container: &str,
    ) -> Result<(), DockerClientError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let ok = self.connect_script.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            self.connected
                .lock()
                .unwrap()
                .push((network_id.to_string(), container.to_string()));
            Ok(())
        } else {
            Err(DockerClientError::Other("connect refused".to_string()))
        }
    }
}

// ── Fake node engines (remote) ──────────────────────────────

#[derive(Default)]
pub struct FakeNode {
    pub containers: Vec<ContainerSummary>,
    pub stats: HashMap<String, ContainerStatsResponse>,
    pub fail_list_containers: bool,
    pub list_calls: AtomicUsize,
    pub stats_calls: AtomicUsize,
}

#[async_trait]
impl NodeApi for FakeNode {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, DockerClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list_containers {
            return Err(DockerClientError::Other("connection timed out".to_string()));
        }
        Ok(self.containers.clone())
    }

    async fn container_stats(&self, id: &str) -> Result<ContainerStatsResponse, DockerClientError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        self.stats
            .get(id)
            .cloned()
            .ok_or_else(|| DockerClientError::Other(format!("no stats for {}", id)))
    }
}

#[derive(Default)]
pub struct FakeNodeFactory {
    /// Keyed by node address.
    pub nodes: HashMap<String, Arc<FakeNode>>,
    pub calls: AtomicUsize,
    pub tokens_seen: Mutex<Vec<String>>,
}

impl NodeFactory for FakeNodeFactory {
    fn client_for(
        &self,
        node: &NodeEndpoint,
        token: &str,
    ) -> Result<Arc<dyn NodeApi>, DockerClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen.lock().unwrap().push(token.to_string());
        self.nodes
            .get(&node.addr)
            .cloned()
            .map(|n| n as Arc<dyn NodeApi>)
            .ok_or_else(|| DockerClientError::Other(format!("unknown node {}", node.addr)))
    }
}

// ── Fixture builders ────────────────────────────────────────

pub fn node(id: &str, role: NodeRole, addr: &str) -> NodeEndpoint {
    NodeEndpoint {
        id: id.to_string(),
        role,
        addr: addr.to_string(),
    }
}

pub fn task(id: &str, network: &str, addresses: &[&str]) -> TaskInfo {
    let mut map = HashMap::new();
    map.insert(
        network.to_string(),
        addresses.iter().map(|a| a.to_string()).collect(),
    );
    TaskInfo {
        id: id.to_string(),
        addresses: map,
    }
}

pub fn container(id: &str, name: &str) -> ContainerSummary {
    ContainerSummary {
        id: Some(id.to_string()),
        names: Some(vec![format!("/{}", name)]),
        ..Default::default()
    }
}

fn cpu_section(total_usage: u64, system_cpu_usage: u64, online: u32) -> ContainerCpuStats {
    ContainerCpuStats {
        cpu_usage: Some(ContainerCpuUsage {
            total_usage: Some(total_usage),
            ..Default::default()
        }),
        system_cpu_usage: Some(system_cpu_usage),
        online_cpus: Some(online),
        throttling_data: None,
    }
}

pub fn stats_sample(mem_usage: u64, mem_limit: u64) -> ContainerStatsResponse {
    ContainerStatsResponse {
        cpu_stats: Some(cpu_section(150, 1500, 4)),
        precpu_stats: Some(cpu_section(100, 1000, 4)),
        memory_stats: Some(ContainerMemoryStats {
            usage: Some(mem_usage),
            limit: Some(mem_limit),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ── App wiring ──────────────────────────────────────────────

pub fn test_state(
    config: AppConfig,
    swarm: Arc<FakeSwarm>,
    nodes: Arc<FakeNodeFactory>,
) -> AppState {
    AppState::new(Arc::new(config), swarm, nodes).unwrap()
}

/// Mock task endpoint on an ephemeral localhost port; replies to any path
/// with `{"result": true, "operation": <path>}` and counts hits.
pub struct TaskServer {
    pub port: u16,
    pub hits: Arc<AtomicUsize>,
}

pub async fn spawn_task_server() -> TaskServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_inner = Arc::clone(&hits);
    let app = axum::Router::new().fallback(move |req: axum::extract::Request| {
        let hits = Arc::clone(&hits_inner);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            axum::Json(serde_json::json!({
                "result": true,
                "operation": req.uri().path(),
            }))
        }
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TaskServer { port, hits }
}

/// A port on which nothing listens (bind then drop).
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
