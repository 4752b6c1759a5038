use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id stored in the request extensions by [`request_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Which part of the API a path belongs to. Logged with every request so
/// query traffic can be told apart from health probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFamily {
    /// `/upload`: ranking by an uploaded image.
    ImageQuery,
    /// `/feedback`: ranking by liked exemplars.
    ExemplarQuery,
    /// `/health`, `/ready`, `/metadata`, `/`.
    Probe,
    Other,
}

impl RouteFamily {
    pub fn of(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/upload" => RouteFamily::ImageQuery,
            "/feedback" => RouteFamily::ExemplarQuery,
            "" | "/health" | "/ready" | "/metadata" => RouteFamily::Probe,
            _ => RouteFamily::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteFamily::ImageQuery => "image_query",
            RouteFamily::ExemplarQuery => "exemplar_query",
            RouteFamily::Probe => "probe",
            RouteFamily::Other => "other",
        }
    }
}

/// Reuse the caller's `x-request-id` or mint one, and echo it back.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// One completion event per request, tagged with its [`RouteFamily`].
/// Probes log at debug.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let family = RouteFamily::of(&path);
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if family == RouteFamily::Probe {
        tracing::debug!(
            route_family = family.as_str(),
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            request_id = %request_id,
            "request"
        );
    } else {
        tracing::info!(
            route_family = family.as_str(),
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            request_id = %request_id,
            "request"
        );
    }
    response
}
