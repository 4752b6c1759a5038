//! API route handlers
//!
//! - `health`: liveness, readiness and server metadata
//! - `search`: image upload search and relevance feedback

pub mod health;
pub mod search;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
///
/// # Response
///
/// ```json
/// {
///   "name": "CBIR Server",
///   "version": "0.1.0",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "CBIR Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /upload",
            "POST /feedback",
            "GET /health",
            "GET /ready",
            "GET /metadata"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
