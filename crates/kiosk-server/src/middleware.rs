//! Request middleware.
//!
//! The pipeline order is fixed in [`crate::server::router`]; each function
//! here is one stage of it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use kiosk_core::SessionId;

use crate::error::ApiError;
use crate::server::AppState;
use crate::session::SESSION_COOKIE;

/// Adds baseline security headers to every response.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        header::HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

/// Admits or rejects the request against the per-client rate budget.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&req);

    match state.limiter.check(&key) {
        Ok(()) => Ok(next.run(req).await),
        Err(retry_after) => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            Err(ApiError::RateLimited { retry_after })
        }
    }
}

/// Resolves the client key used for rate limiting.
///
/// Prefers the peer address; behind a proxy the first `x-forwarded-for`
/// entry is used instead.
fn client_key(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Assigns a session to the request.
///
/// An existing session cookie is validated against the store; anything else
/// gets a fresh session and a `set-cookie` on the response. Handlers read
/// the id from the request extensions.
pub async fn assign_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = session_from_cookies(req.headers())
        .and_then(|id| state.sessions.touch(&id).map(|_| id));

    let (session_id, is_new) = match existing {
        Some(id) => (id, false),
        None => (state.sessions.create().id, true),
    };

    req.extensions_mut().insert(session_id.clone());
    let mut response = next.run(req).await;

    if is_new {
        let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

/// Extracts the session id from the request cookies, if any.
fn session_from_cookies(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE))
        .filter_map(|rest| rest.strip_prefix('='))
        .find_map(SessionId::parse)
}

/// Records per-request latency and status into the metrics collector.
pub async fn track_response_time(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    state.metrics.record(status, elapsed);

    tracing::info!(
        %method,
        %path,
        status,
        elapsed_ms = elapsed.as_millis() as u64,
        "Request completed"
    );

    response
}
