//! HTTP server: configuration, shared state, router, and run loop.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use kiosk_core::{CompletionBackend, Error, Result};
use kiosk_telemetry::RequestMetrics;

use crate::handlers;
use crate::middleware;
use crate::ratelimit::{RateLimitConfig, RateLimiter};
use crate::session::SessionStore;
use crate::upstream::{CompletionClient, UpstreamConfig};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub addr: SocketAddr,
    /// Enable CORS.
    pub cors: bool,
    /// Upstream completion API settings.
    pub upstream: UpstreamConfig,
    /// Rate limiter settings.
    pub rate_limit: RateLimitConfig,
    /// Directory uploaded files are stored in.
    pub upload_dir: PathBuf,
    /// Path of the append-only message logbook.
    pub logbook_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".parse().unwrap(),
            cors: true,
            upstream: UpstreamConfig::default(),
            rate_limit: RateLimitConfig::default(),
            upload_dir: PathBuf::from("uploads"),
            logbook_path: PathBuf::from("logs.txt"),
        }
    }
}

impl ServerConfig {
    /// Creates a new server config builder.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    addr: Option<SocketAddr>,
    cors: Option<bool>,
    upstream: Option<UpstreamConfig>,
    rate_limit: Option<RateLimitConfig>,
    upload_dir: Option<PathBuf>,
    logbook_path: Option<PathBuf>,
}

impl ServerConfigBuilder {
    /// Sets the listen address.
    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Sets whether CORS is enabled.
    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors = Some(enabled);
        self
    }

    /// Sets the upstream completion API settings.
    pub fn upstream(mut self, upstream: UpstreamConfig) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Sets the rate limiter settings.
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Sets the upload directory.
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    /// Sets the logbook path.
    pub fn logbook_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.logbook_path = Some(path.into());
        self
    }

    /// Builds the server config.
    pub fn build(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            addr: self.addr.unwrap_or(defaults.addr),
            cors: self.cors.unwrap_or(defaults.cors),
            upstream: self.upstream.unwrap_or(defaults.upstream),
            rate_limit: self.rate_limit.unwrap_or(defaults.rate_limit),
            upload_dir: self.upload_dir.unwrap_or(defaults.upload_dir),
            logbook_path: self.logbook_path.unwrap_or(defaults.logbook_path),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,
    /// Active sessions.
    pub sessions: SessionStore,
    /// Per-client rate limiter.
    pub limiter: RateLimiter,
    /// Upstream completion backend.
    pub backend: Arc<dyn CompletionBackend>,
    /// Request metrics collector.
    pub metrics: Arc<RequestMetrics>,
    /// Server start time.
    pub start_time: Instant,
}

impl AppState {
    /// Creates new app state around the given completion backend.
    pub fn new(config: ServerConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        let limiter = RateLimiter::new(config.rate_limit.clone());
        Self {
            config,
            sessions: SessionStore::new(),
            limiter,
            backend,
            metrics: Arc::new(RequestMetrics::new()),
            start_time: Instant::now(),
        }
    }
}

/// Builds the router with the full middleware pipeline.
///
/// Layers are listed innermost first; axum applies the last added layer to
/// the request first, so the wire order is: security headers, CORS, trace,
/// rate limit, compression, session assignment, response-time tracking.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::index))
        .route("/ask", post(handlers::ask))
        .route("/upload", post(handlers::upload))
        .route("/download/:filename", get(handlers::download))
        .route("/sessions", get(handlers::current_session))
        .route("/logout", post(handlers::logout))
        .route("/form", post(handlers::form))
        .route("/time", get(handlers::current_time))
        .route("/log", post(handlers::log_message))
        .route("/status", get(handlers::server_status))
        .route("/system-info", get(handlers::system_info))
        .route("/calc/:op", get(handlers::calc))
        .route("/uuid", get(handlers::generate_uuid))
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_response_time,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::assign_session,
        ))
        .layer(CompressionLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(TraceLayer::new_for_http());

    if state.config.cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .with_state(state)
}

/// The HTTP server.
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Creates a new server with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream HTTP client cannot be built.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let backend = Arc::new(CompletionClient::new(config.upstream.clone())?);
        Ok(Self::with_backend(config, backend))
    }

    /// Creates a new server around an arbitrary completion backend.
    pub fn with_backend(config: ServerConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            state: Arc::new(AppState::new(config, backend)),
        }
    }

    /// Returns the shared state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Runs the server until ctrl-c or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server fails.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.addr;
        let router = router(Arc::clone(&self.state));

        tracing::info!(%addr, "Starting Kiosk server");

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(Error::Io)?;

        let shutdown_signal = async {
            let ctrl_c = async {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to install Ctrl+C handler");
            };

            #[cfg(unix)]
            let terminate = async {
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to install signal handler")
                    .recv()
                    .await;
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                () = ctrl_c => {
                    tracing::info!("Received Ctrl+C, shutting down gracefully");
                },
                () = terminate => {
                    tracing::info!("Received SIGTERM, shutting down gracefully");
                },
            }
        };

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| Error::internal(e.to_string()))?;

        let snapshot = self.state.metrics.snapshot();
        tracing::info!(
            requests = snapshot.requests,
            client_errors = snapshot.client_errors,
            server_errors = snapshot.server_errors,
            avg_latency_ms = snapshot.average_latency_ms,
            "Server shutdown complete"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    /// Backend that answers from a script instead of the network.
    struct ScriptedBackend {
        reply: Option<String>,
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(Error::upstream(Some(500), "scripted failure")),
            }
        }
    }

    fn test_state_with(
        reply: Option<&str>,
        rate_limit: RateLimitConfig,
    ) -> (Arc<AppState>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::builder()
            .upload_dir(dir.path().join("uploads"))
            .logbook_path(dir.path().join("logs.txt"))
            .rate_limit(rate_limit)
            .build();
        let backend = Arc::new(ScriptedBackend {
            reply: reply.map(str::to_string),
        });
        (Arc::new(AppState::new(config, backend)), dir)
    }

    fn test_app(reply: Option<&str>) -> (Router, tempfile::TempDir) {
        let (state, dir) = test_state_with(reply, RateLimitConfig::default());
        (router(state), dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_server_config_builder() {
        let config = ServerConfig::builder()
            .addr("127.0.0.1:3000".parse().unwrap())
            .cors(false)
            .upload_dir("/tmp/files")
            .build();

        assert_eq!(config.addr, "127.0.0.1:3000".parse().unwrap());
        assert!(!config.cors);
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/files"));
        assert_eq!(config.logbook_path, PathBuf::from("logs.txt"));
        assert_eq!(config.rate_limit.max_requests, 100);
    }

    #[tokio::test]
    async fn test_index_banner() {
        let (app, _dir) = test_app(None);

        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["service"], "kiosk");
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_calc_routes() {
        let (app, _dir) = test_app(None);

        for (uri, expected) in [
            ("/calc/soma?a=1.5&b=2.5", 4.0),
            ("/calc/subtracao?a=5&b=3", 2.0),
            ("/calc/multiplicacao?a=4&b=2.5", 10.0),
            ("/calc/divisao?a=9&b=3", 3.0),
        ] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");

            let json = body_json(response).await;
            assert_eq!(json["result"], expected, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_calc_division_by_zero() {
        let (app, _dir) = test_app(None);

        let response = app.oneshot(get("/calc/divisao?a=1&b=0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_calc_bad_operands() {
        let (app, _dir) = test_app(None);

        for uri in ["/calc/soma?a=x&b=2", "/calc/soma?b=2", "/calc/soma"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_calc_unknown_operation() {
        let (app, _dir) = test_app(None);

        let response = app.oneshot(get("/calc/potencia?a=2&b=3")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_uuid_route() {
        let (app, _dir) = test_app(None);

        let first = body_json(app.clone().oneshot(get("/uuid")).await.unwrap()).await;
        let second = body_json(app.oneshot(get("/uuid")).await.unwrap()).await;

        let first = first["uuid"].as_str().unwrap().to_string();
        let second = second["uuid"].as_str().unwrap().to_string();

        assert!(uuid::Uuid::parse_str(&first).is_ok());
        assert!(uuid::Uuid::parse_str(&second).is_ok());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_time_route() {
        let (app, _dir) = test_app(None);

        let json = body_json(app.oneshot(get("/time")).await.unwrap()).await;
        assert!(json["datetime"].as_str().unwrap().contains(':'));
    }

    #[tokio::test]
    async fn test_status_route() {
        let (app, _dir) = test_app(None);

        let json = body_json(app.oneshot(get("/status")).await.unwrap()).await;
        assert_eq!(json["status"], "running");
        assert!(json["uptime_seconds"].is_u64());
    }

    #[tokio::test]
    async fn test_system_info_route() {
        let (app, _dir) = test_app(None);

        let json = body_json(app.oneshot(get("/system-info")).await.unwrap()).await;
        assert_eq!(json["platform"], std::env::consts::OS);
        assert!(json["cpus"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_form_route() {
        let (app, _dir) = test_app(None);

        let response = app
            .oneshot(post_json(
                "/form",
                r#"{"nome": "Ana", "email": "ana@example.com", "mensagem": "Oi"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let text = body_text(response).await;
        assert!(text.contains("Ana"));
        assert!(text.contains("ana@example.com"));
        assert!(text.contains("Oi"));
    }

    #[tokio::test]
    async fn test_unknown_route_falls_back_to_404() {
        let (app, _dir) = test_app(None);

        let response = app.oneshot(get("/no-such-route")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Page not found");
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let (app, _dir) = test_app(None);

        let response = app.oneshot(get("/status")).await.unwrap();
        let headers = response.headers();

        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "SAMEORIGIN");
        assert_eq!(headers.get(header::REFERRER_POLICY).unwrap(), "no-referrer");
    }

    fn extract_session_cookie(response: &axum::response::Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("expected a session cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_session_cookie_roundtrip() {
        let (app, _dir) = test_app(None);

        let response = app.clone().oneshot(get("/status")).await.unwrap();
        let cookie = extract_session_cookie(&response);

        let request = Request::builder()
            .uri("/sessions")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // A recognized cookie must not be re-issued.
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let json = body_json(response).await;
        let sid = cookie.split('=').nth(1).unwrap();
        assert_eq!(json["id"].as_str().unwrap(), sid);
        assert!(json["requests"].is_u64());
    }

    #[tokio::test]
    async fn test_logout_destroys_session() {
        let (app, _dir) = test_app(None);

        let response = app.clone().oneshot(get("/status")).await.unwrap();
        let cookie = extract_session_cookie(&response);

        let request = Request::builder()
            .method("POST")
            .uri("/logout")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Logged out successfully");

        // The old id is gone; presenting it yields a fresh session.
        let request = Request::builder()
            .uri("/sessions")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let old_sid = cookie.split('=').nth(1).unwrap().to_string();
        let json = body_json(response).await;
        assert_ne!(json["id"].as_str().unwrap(), old_sid);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_over_budget() {
        let (state, _dir) = test_state_with(
            None,
            RateLimitConfig {
                max_requests: 2,
                window: std::time::Duration::from_secs(60),
            },
        );
        let app = router(state);

        for _ in 0..2 {
            let response = app.clone().oneshot(get("/status")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(get("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn test_upload_without_file_is_rejected() {
        let (app, _dir) = test_app(None);

        let body = "--BOUNDARY\r\n\
                    Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
                    just text\r\n\
                    --BOUNDARY--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=BOUNDARY",
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_download_roundtrip() {
        let (app, _dir) = test_app(None);

        let body = "--BOUNDARY\r\n\
                    Content-Disposition: form-data; name=\"file\"; filename=\"hello.txt\"\r\n\
                    Content-Type: text/plain\r\n\r\n\
                    hello kiosk\r\n\
                    --BOUNDARY--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=BOUNDARY",
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/download/hello.txt")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("hello.txt"));
        assert_eq!(body_text(response).await, "hello kiosk");
    }

    #[tokio::test]
    async fn test_download_missing_file() {
        let (app, _dir) = test_app(None);

        let response = app.oneshot(get("/download/absent.bin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_rejects_traversal() {
        let (app, _dir) = test_app(None);

        for uri in ["/download/..", "/download/..%2Fsecret.txt"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_log_route_appends() {
        let (state, _dir) = test_state_with(None, RateLimitConfig::default());
        let logbook_path = state.config.logbook_path.clone();
        let app = router(state);

        let response = app
            .oneshot(post_json("/log", r#"{"message": "disk almost full"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let content = tokio::fs::read_to_string(&logbook_path).await.unwrap();
        assert!(content.trim_end().ends_with("- disk almost full"));
    }

    #[tokio::test]
    async fn test_ask_relays_answer() {
        let (app, _dir) = test_app(Some("Rust is a systems language."));

        let response = app
            .oneshot(post_json("/ask", r#"{"question": "What is Rust?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["answer"], "Rust is a systems language.");
    }

    #[tokio::test]
    async fn test_ask_requires_question() {
        let (app, _dir) = test_app(Some("unused"));

        for body in ["{}", r#"{"question": "   "}"#] {
            let response = app.clone().oneshot(post_json("/ask", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        }
    }

    #[tokio::test]
    async fn test_ask_maps_upstream_failure_to_500() {
        let (app, _dir) = test_app(None);

        let response = app
            .oneshot(post_json("/ask", r#"{"question": "anything"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("completion API"));
    }
}
