// Fallback route: forward the request unchanged to the local Docker Engine
// UNIX socket and stream the response back as-is.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use hyper::header::{HeaderValue, HOST};

use super::AppState;
use crate::docker_client::unix;
use crate::error::ProxyError;

pub(super) async fn proxy_handler(
    State(state): State<AppState>,
    req: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut upstream_req = hyper::Request::builder()
        .method(parts.method)
        .uri(path_and_query)
        .body(body)
        .map_err(|e| ProxyError::Upstream(e.into()))?;
    *upstream_req.headers_mut() = parts.headers;
    if !upstream_req.headers().contains_key(HOST) {
        upstream_req
            .headers_mut()
            .insert(HOST, HeaderValue::from_static("docker"));
    }

    let upstream_resp = unix::send_request(&state.config.docker.socket_path, upstream_req).await?;
    Ok(upstream_resp.map(Body::new))
}
