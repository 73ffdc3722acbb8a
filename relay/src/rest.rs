use crate::channel::Publisher;
use crate::clock::Clock;
use crate::dispatch::send_ac_command;
use crate::liveness::{is_fresh, is_online};
use crate::model::{
    AcRequest, ApiResponse, HealthView, LoginRequest, ScheduleRequest, ScheduleStatus,
    SessionView, TelemetryReading, UpdateRequest,
};
use crate::schedule::ScheduleController;
use crate::session::{
    session_id_from_cookie, Credentials, SessionStore, SESSION_COOKIE, SESSION_TTL_MS,
};
use crate::telemetry::TelemetryStore;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

const DASHBOARD_HTML: &str = include_str!("dashboard.html");

/// Handles shared by every route
#[derive(Clone)]
pub struct AppState {
    pub telemetry: Arc<TelemetryStore>,
    pub schedule: Arc<ScheduleController>,
    pub sessions: Arc<SessionStore>,
    pub publisher: Arc<dyn Publisher>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn Publisher>,
        credentials: Credentials,
    ) -> Self {
        Self {
            telemetry: Arc::new(TelemetryStore::new(clock.clone())),
            schedule: Arc::new(ScheduleController::new(clock.clone(), publisher.clone())),
            sessions: Arc::new(SessionStore::new(credentials, clock.clone())),
            publisher,
            clock,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/update", post(update))
        .route("/ac", post(ac))
        .route("/schedule", post(schedule))
        .route("/api/data", get(get_data))
        .route("/api/status", get(get_status))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/session", get(get_session))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(middleware::map_response(allow_any_origin))
        .with_state(state)
}

/// Parses a JSON body without looking at `Content-Type`; the device does not
/// always send one.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    Ok(serde_json::from_slice(body)?)
}

async fn update(State(state): State<AppState>, body: Bytes) -> Result<Json<ApiResponse>, AppError> {
    let request: UpdateRequest = parse_body(&body)?;
    state.telemetry.record(request.temperature, request.humidity);
    Ok(Json(ApiResponse::success()))
}

async fn ac(State(state): State<AppState>, body: Bytes) -> Result<Json<ApiResponse>, AppError> {
    let request: AcRequest = parse_body(&body)?;
    send_ac_command(state.publisher.as_ref(), request.action);
    Ok(Json(ApiResponse::success_with(format!(
        "AC {} command sent",
        request.action.as_str()
    ))))
}

async fn schedule(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse>, AppError> {
    let request: ScheduleRequest = parse_body(&body)?;
    let status = state.schedule.set_schedule(request.enabled);
    Ok(Json(ApiResponse::success_with(if status.enabled {
        "Schedule enabled"
    } else {
        "Schedule disabled"
    })))
}

async fn get_data(State(state): State<AppState>) -> Json<TelemetryReading> {
    Json(state.telemetry.snapshot())
}

async fn get_status(State(state): State<AppState>) -> Json<ScheduleStatus> {
    Json(state.schedule.snapshot())
}

async fn login(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let request: LoginRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!("Malformed login body: {}", e);
        AppError::new(StatusCode::BAD_REQUEST, "Malformed request")
    })?;

    let id = state
        .sessions
        .login(&request.username, &request.password)
        .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "Invalid username or password"))?;

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; Max-Age={}",
        SESSION_COOKIE,
        id,
        SESSION_TTL_MS / 1000
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success_with("Logged in")),
    )
        .into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        state.sessions.logout(id);
    }
    (
        [(header::SET_COOKIE, format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE))],
        Json(ApiResponse::success_with("Logged out")),
    )
        .into_response()
}

async fn get_session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionView> {
    let authenticated = session_id(&headers)
        .map(|id| state.sessions.is_valid(id))
        .unwrap_or(false);
    Json(SessionView { authenticated })
}

async fn health(State(state): State<AppState>) -> Json<HealthView> {
    let now = state.clock.now_ms();
    Json(HealthView {
        online: is_online(&state.telemetry.snapshot(), now),
        schedule_fresh: is_fresh(&state.schedule.snapshot(), now),
    })
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

async fn allow_any_origin(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(session_id_from_cookie)
}

struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    fn new(status: StatusCode, message: &'static str) -> Self {
        Self {
            status,
            error: anyhow::anyhow!(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        warn!("API error ({}): {}", self.status, self.error);
        (self.status, Json(ApiResponse::error(self.error.to_string()))).into_response()
    }
}

/// Anything that bubbles up with `?` is a bad request body
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: err.into(),
        }
    }
}
