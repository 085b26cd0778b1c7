// Cluster topology and wire models. All of these are rebuilt per request;
// nothing here survives the call that created it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Swarm node role; decides which engine port to use when collecting metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Manager,
    Worker,
}

impl NodeRole {
    /// Parse from the swarm node spec role string (e.g. "manager").
    pub fn from_docker(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "manager" => NodeRole::Manager,
            _ => NodeRole::Worker,
        }
    }
}

/// One cluster member as discovered from the node list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEndpoint {
    pub id: String,
    pub role: NodeRole,
    /// Overlay address of the node, without port.
    pub addr: String,
}

/// One running instance of a swarm service, with its per-network addresses.
/// Addresses are plain IPs; the `/prefix` suffix is stripped at map time.
#[derive(Debug, Clone, Default)]
pub struct TaskInfo {
    pub id: String,
    pub addresses: HashMap<String, Vec<String>>,
}

impl TaskInfo {
    /// First address of this task on the named network, if any.
    pub fn address_on(&self, network: &str) -> Option<&str> {
        self.addresses
            .get(network)
            .and_then(|addrs| addrs.first())
            .map(String::as_str)
    }
}

/// Result of inspecting an overlay network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub id: String,
    pub attachable: bool,
}

/// Normalized resource usage for one container, derived from a single
/// live stats sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub container_name: String,
    pub cpu_percent: f64,
    pub online_cpus: u32,
    pub memory_bytes: u64,
    pub memory_limit_bytes: u64,
    /// Two-decimal precision.
    pub mem_percent: f64,
    pub blk_read: u64,
    pub blk_write: u64,
    pub net_in: u64,
    pub net_out: u64,
    /// Epoch milliseconds of the engine's sample read time.
    pub timestamp: i64,
}

/// Per-task outcome of a maintenance broadcast. `response` is either the
/// task's own JSON reply or a `{result: false, ts, error}` failure object,
/// so callers always know which instance failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub id: String,
    pub response: serde_json::Value,
}

impl TaskReport {
    pub fn failure(id: String, error: impl std::fmt::Display) -> Self {
        Self {
            id,
            response: serde_json::json!({
                "result": false,
                "ts": chrono::Utc::now().timestamp_millis(),
                "error": error.to_string(),
            }),
        }
    }
}
