// Request-level error taxonomy. Partial failures inside aggregate
// operations are modeled as data, never as these errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::docker_client::DockerClientError;

#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    /// Missing required query parameters, enumerated by name.
    #[error("missing required parameters: {}", .0.join(", "))]
    Validation(Vec<String>),
    /// Failure before any partial result could be constructed (e.g. the
    /// node or task listing itself). Detail is logged, never echoed.
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl From<DockerClientError> for ProxyError {
    fn from(e: DockerClientError) -> Self {
        ProxyError::Upstream(anyhow::Error::new(e))
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                axum::Json(serde_json::json!({ "message": self.to_string() })),
            )
                .into_response(),
            ProxyError::Upstream(e) => {
                tracing::error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(serde_json::json!({ "message": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
