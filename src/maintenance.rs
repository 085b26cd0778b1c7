// Maintenance broadcast: one HTTP GET to every running task of a service,
// addressed by overlay IP on a named network.

use futures_util::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

use crate::docker_client::{DockerClientError, SwarmApi};
use crate::error::ProxyError;
use crate::models::{TaskInfo, TaskReport};

/// Typed, boundary-validated parameters for one maintenance call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceRequest {
    pub service_id: String,
    pub operation: String,
    pub maintenance_port: u16,
    pub network: String,
}

impl MaintenanceRequest {
    /// All four parameters are required; missing or unusable ones are
    /// collected and reported together, and nothing executes partially.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, ProxyError> {
        let mut missing = Vec::new();
        let get = |key: &str| {
            params
                .get(key)
                .map(String::as_str)
                .filter(|v| !v.is_empty())
        };

        let service_id = get("id");
        if service_id.is_none() {
            missing.push("id".to_string());
        }
        let port = get("maintenancePort").and_then(|p| p.parse::<u16>().ok());
        if port.is_none() {
            missing.push("maintenancePort".to_string());
        }
        let operation = get("operation");
        if operation.is_none() {
            missing.push("operation".to_string());
        }
        let network = get("network");
        if network.is_none() {
            missing.push("network".to_string());
        }

        if !missing.is_empty() {
            return Err(ProxyError::Validation(missing));
        }
        Ok(Self {
            service_id: service_id.unwrap_or_default().to_string(),
            operation: operation.unwrap_or_default().to_string(),
            maintenance_port: port.unwrap_or_default(),
            network: network.unwrap_or_default().to_string(),
        })
    }
}

/// Scatter-gather over every task of the service. One report per task,
/// task identity preserved on failure; a hung task stalls only its own
/// entry up to the per-call timeout.
pub async fn dispatch(
    swarm: &dyn SwarmApi,
    http: &reqwest::Client,
    request: &MaintenanceRequest,
    timeout: Duration,
    fanout_limit: usize,
) -> Result<Vec<TaskReport>, DockerClientError> {
    let tasks = swarm.list_tasks(&request.service_id).await?;
    let reports = futures_util::stream::iter(
        tasks
            .into_iter()
            .map(|task| async move { call_task(http, request, task, timeout).await }),
    )
    .buffer_unordered(fanout_limit.max(1))
    .collect()
    .await;
    Ok(reports)
}

async fn call_task(
    http: &reqwest::Client,
    request: &MaintenanceRequest,
    task: TaskInfo,
    timeout: Duration,
) -> TaskReport {
    let Some(address) = task.address_on(&request.network) else {
        tracing::warn!(task = %task.id, network = %request.network, "task has no address on network");
        return TaskReport::failure(task.id, "no ip address");
    };
    let url = format!(
        "http://{}:{}/{}",
        address,
        request.maintenance_port,
        request.operation.trim_start_matches('/')
    );
    tracing::debug!(task = %task.id, %url, "dispatching maintenance call");

    let resp = match http
        .get(&url)
        .header(reqwest::header::ACCEPT, "application/json")
        .timeout(timeout)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => return TaskReport::failure(task.id, e),
    };
    match resp.text().await {
        // Non-JSON replies are preserved verbatim as a string value.
        Ok(body) => {
            let response = serde_json::from_str(&body)
                .unwrap_or_else(|_| serde_json::Value::String(body));
            TaskReport {
                id: task.id,
                response,
            }
        }
        Err(e) => TaskReport::failure(task.id, e),
    }
}
