// HTTPS front-end: token auth on every route, the two cluster operations,
// and a transparent fallback to the local engine socket.

mod http;
mod proxy;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::docker_client::{NodeFactory, SwarmApi};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub swarm: Arc<dyn SwarmApi>,
    pub nodes: Arc<dyn NodeFactory>,
    /// Plain client for task maintenance endpoints (overlay IPs, no TLS).
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        swarm: Arc<dyn SwarmApi>,
        nodes: Arc<dyn NodeFactory>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http.request_timeout())
            .build()?;
        Ok(Self {
            config,
            swarm,
            nodes,
            http,
        })
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/maintenance", get(http::maintenance_handler)) // GET /maintenance
        .route("/metrics", get(http::metrics_handler)) // GET /metrics
        .fallback(proxy::proxy_handler) // everything else -> local engine
        .layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

/// Shared-secret check on every request. The 401 body is constant; no
/// detail about why authentication failed leaves the process.
async fn auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req);
    tracing::info!(%ip, method = %req.method(), path = %req.uri().path(), "incoming call");

    let authorized = req
        .headers()
        .get("token")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|t| t == state.config.auth.token);
    if !authorized {
        tracing::warn!(%ip, "unauthorized request rejected");
        return (StatusCode::UNAUTHORIZED, "unauthorized\n").into_response();
    }
    next.run(req).await
}

fn client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        let forwarded = forwarded.trim();
        if !forwarded.is_empty() {
            return forwarded.to_string();
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
