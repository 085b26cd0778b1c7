// GET handlers: /maintenance, /metrics

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use std::collections::HashMap;

use super::AppState;
use crate::error::ProxyError;
use crate::maintenance::{self, MaintenanceRequest};
use crate::metrics;
use crate::models::{DerivedMetrics, TaskReport};

/// GET /maintenance?id=&maintenancePort=&operation=&network= — broadcast an
/// HTTP signal to every task of the service, one report per task.
pub(super) async fn maintenance_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<TaskReport>>, ProxyError> {
    let request = MaintenanceRequest::from_query(&params)?;
    let reports = maintenance::dispatch(
        state.swarm.as_ref(),
        &state.http,
        &request,
        state.config.http.request_timeout(),
        state.config.http.fanout_limit,
    )
    .await?;
    Ok(Json(reports))
}

/// GET /metrics — live per-container resource usage across the swarm,
/// keyed by container name. The caller's own token is propagated to the
/// per-node engine calls.
pub(super) async fn metrics_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HashMap<String, DerivedMetrics>>, ProxyError> {
    // Auth middleware already validated the header; it is re-read here only
    // to forward it.
    let token = headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let aggregated = metrics::collect(
        state.swarm.as_ref(),
        state.nodes.as_ref(),
        token,
        state.config.http.fanout_limit,
    )
    .await?;
    Ok(Json(aggregated))
}
