//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use dcns_node::ResolverError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    /// Stable identifier sent as the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Resolver(e) => e.code(),
            Self::InvalidRequest(_) => "validation_error",
            Self::Server(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            "validation_error" => StatusCode::BAD_REQUEST,
            "insufficient_balance" => StatusCode::PAYMENT_REQUIRED,
            "already_registered" => StatusCode::CONFLICT,
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}
