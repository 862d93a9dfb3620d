//! Request handlers.

use std::sync::Arc;

use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kiosk_core::{FormSubmission, Operation, Session, SessionId};

use crate::error::ApiError;
use crate::server::AppState;
use crate::{files, logbook};

// === Service banner ===

/// Service banner returned by `GET /`.
#[derive(Debug, Serialize)]
pub struct ServiceBanner {
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Always `"ok"` when the server answers at all.
    pub status: &'static str,
}

/// `GET /`: service banner.
pub async fn index() -> Json<ServiceBanner> {
    Json(ServiceBanner {
        service: "kiosk",
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

// === Ask ===

/// Request body for `POST /ask`.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// The question to forward to the completion API.
    #[serde(default)]
    pub question: String,
}

/// Response body for `POST /ask`.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    /// The completion text.
    pub answer: String,
}

/// `POST /ask`: forward the question upstream and relay the answer.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question is required".to_string()));
    }

    let answer = state.backend.complete(question).await?;
    Ok(Json(AskResponse { answer }))
}

// === File upload / download ===

/// `POST /upload`: store the first file part under its client name.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<String, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let Some(name) = field.file_name().map(ToOwned::to_owned) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?;

        let path = files::store(&state.config.upload_dir, &name, &data).await?;
        tracing::info!(file = %name, bytes = data.len(), path = %path.display(), "File uploaded");
        return Ok("File uploaded successfully".to_string());
    }

    Err(ApiError::BadRequest("No file was uploaded".to_string()))
}

/// `GET /download/:filename`: stream back a previously uploaded file.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let (data, mime) = files::open(&state.config.upload_dir, &filename).await?;

    let disposition = format!("attachment; filename=\"{filename}\"");
    Ok((
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

// === Sessions ===

/// `GET /sessions`: the caller's current session record.
pub async fn current_session(
    State(state): State<Arc<AppState>>,
    Extension(session_id): Extension<SessionId>,
) -> Result<Json<Session>, ApiError> {
    state
        .sessions
        .get(&session_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

/// `POST /logout`: destroy the caller's session and clear the cookie.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session_id): Extension<SessionId>,
) -> Response {
    state.sessions.remove(&session_id);
    tracing::debug!(session = %session_id, "Session destroyed");

    let clear = format!("{}=; Path=/; Max-Age=0", crate::session::SESSION_COOKIE);
    ([(header::SET_COOKIE, clear)], "Logged out successfully").into_response()
}

// === Forms ===

/// `POST /form`: echo the submitted form back as text.
pub async fn form(Json(submission): Json<FormSubmission>) -> String {
    format!(
        "Form received! Name: {}, Email: {}, Message: {}",
        submission.name, submission.email, submission.message
    )
}

// === Utility routes ===

/// Response body for `GET /time`.
#[derive(Debug, Serialize)]
pub struct TimeResponse {
    /// Current local date-time.
    pub datetime: String,
}

/// `GET /time`: current local date and time.
pub async fn current_time() -> Json<TimeResponse> {
    Json(TimeResponse {
        datetime: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

/// Request body for `POST /log`.
#[derive(Debug, Deserialize)]
pub struct LogRequest {
    /// Message to append to the logbook.
    pub message: String,
}

/// `POST /log`: append a message to the logbook file.
pub async fn log_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LogRequest>,
) -> Result<&'static str, ApiError> {
    logbook::append(&state.config.logbook_path, &request.message)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save log: {e}")))?;

    Ok("Log saved successfully")
}

/// Response body for `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always `"running"`.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
}

/// `GET /status`: liveness and uptime.
pub async fn server_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running",
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Response body for `GET /system-info`.
#[derive(Debug, Serialize)]
pub struct SystemInfo {
    /// Operating system family.
    pub platform: &'static str,
    /// CPU architecture.
    pub arch: &'static str,
    /// Server version.
    pub version: &'static str,
    /// Process id.
    pub pid: u32,
    /// Logical CPU count.
    pub cpus: usize,
}

/// `GET /system-info`: host and process facts.
pub async fn system_info() -> Json<SystemInfo> {
    Json(SystemInfo {
        platform: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        version: env!("CARGO_PKG_VERSION"),
        pid: std::process::id(),
        cpus: num_cpus::get(),
    })
}

// === Calculator ===

/// Query parameters for the calculator routes.
#[derive(Debug, Deserialize)]
pub struct CalcParams {
    /// Left operand.
    pub a: Option<String>,
    /// Right operand.
    pub b: Option<String>,
}

/// Response body for the calculator routes.
#[derive(Debug, Serialize)]
pub struct CalcResponse {
    /// Operation result.
    pub result: f64,
}

fn parse_operand(value: Option<&str>, name: &str) -> Result<f64, ApiError> {
    value
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("query parameter '{name}' must be a number")))
}

/// `GET /calc/:op?a=&b=`: apply an arithmetic operation to two operands.
pub async fn calc(
    Path(op): Path<String>,
    Query(params): Query<CalcParams>,
) -> Result<Json<CalcResponse>, ApiError> {
    let operation: Operation = op
        .parse()
        .map_err(|_| ApiError::NotFound("Page not found".to_string()))?;

    let a = parse_operand(params.a.as_deref(), "a")?;
    let b = parse_operand(params.b.as_deref(), "b")?;

    let result = operation.apply(a, b)?;
    Ok(Json(CalcResponse { result }))
}

// === UUID ===

/// Response body for `GET /uuid`.
#[derive(Debug, Serialize)]
pub struct UuidResponse {
    /// A freshly generated v4 UUID.
    pub uuid: Uuid,
}

/// `GET /uuid`: generate a fresh UUID.
pub async fn generate_uuid() -> Json<UuidResponse> {
    Json(UuidResponse {
        uuid: Uuid::new_v4(),
    })
}

// === Fallback ===

/// Fallback for unknown routes.
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Page not found")
}
