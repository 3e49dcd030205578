//! CORS for the single dashboard origin

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
const FALLBACK_ORIGIN: &str = "http://localhost:4028";

/// Parse the configured origin, falling back to the local dashboard
pub fn origin(client_url: &str) -> HeaderValue {
    HeaderValue::from_str(client_url.trim_end_matches('/')).unwrap_or_else(|_| {
        warn!("Invalid CORS origin '{}', using {}", client_url, FALLBACK_ORIGIN);
        HeaderValue::from_static(FALLBACK_ORIGIN)
    })
}

fn apply(headers: &mut HeaderMap, origin: &HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
}

/// Answer preflights directly and tag every other response
pub async fn cors(State(origin): State<HeaderValue>, req: Request, next: Next) -> Response {
    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    apply(resp.headers_mut(), &origin);
    resp
}
