// Cluster-wide metrics collection: one live stats sample per container on
// every reachable node, merged into a single map keyed by container name.

mod derive;

use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::docker_client::{DockerClientError, NodeApi, NodeFactory, SwarmApi};
use crate::models::{DerivedMetrics, NodeEndpoint};

/// Gather a fresh snapshot across the whole swarm. Failing to list nodes is
/// the only fatal error; any single node or container failure just drops
/// that contribution from the aggregate.
pub async fn collect(
    swarm: &dyn SwarmApi,
    nodes: &dyn NodeFactory,
    token: &str,
    fanout_limit: usize,
) -> Result<HashMap<String, DerivedMetrics>, DockerClientError> {
    let endpoints = swarm.list_nodes().await?;
    let limit = fanout_limit.max(1);

    let per_node: Vec<Vec<DerivedMetrics>> = futures_util::stream::iter(
        endpoints
            .into_iter()
            .map(|node| async move { collect_node(nodes, &node, token, limit).await }),
    )
    .buffer_unordered(limit)
    .collect()
    .await;

    let mut merged = HashMap::new();
    for metrics in per_node.into_iter().flatten() {
        let name = metrics.container_name.clone();
        if merged.insert(name.clone(), metrics).is_some() {
            // Accepted limitation: duplicate names across nodes overwrite.
            warn!(container = %name, "duplicate container name across nodes, keeping later sample");
        }
    }
    Ok(merged)
}

/// Everything on one node; soft-fails to an empty contribution.
async fn collect_node(
    factory: &dyn NodeFactory,
    node: &NodeEndpoint,
    token: &str,
    limit: usize,
) -> Vec<DerivedMetrics> {
    let client = match factory.client_for(node, token) {
        Ok(c) => c,
        Err(e) => {
            warn!(node = %node.id, error = %e, "could not build node client, node omitted");
            return Vec::new();
        }
    };
    let containers = match client.list_containers().await {
        Ok(c) => c,
        Err(e) => {
            warn!(node = %node.id, error = %e, "listing containers failed, node omitted");
            return Vec::new();
        }
    };

    futures_util::stream::iter(containers.into_iter().map(|c| {
        let client = Arc::clone(&client);
        async move { sample_container(client.as_ref(), c).await }
    }))
    .buffer_unordered(limit)
    .collect::<Vec<Option<DerivedMetrics>>>()
    .await
    .into_iter()
    .flatten()
    .collect()
}

async fn sample_container(
    client: &dyn NodeApi,
    container: bollard::models::ContainerSummary,
) -> Option<DerivedMetrics> {
    let id = container.id.unwrap_or_default();
    let name = container
        .names
        .as_ref()
        .and_then(|n| n.first())
        .cloned()
        .unwrap_or_else(|| id.clone());
    let name = name.trim_start_matches('/').to_string();
    match client.container_stats(&id).await {
        Ok(sample) => derive::derive_metrics(&sample, &name),
        Err(e) => {
            warn!(container = %name, error = %e, "stats sample failed, entry omitted");
            None
        }
    }
}
