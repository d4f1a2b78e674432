use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::assistant::ChatMessage;
use crate::config::AppConfig;
use crate::events::sse_stream;
use crate::layout::{DragMove, LayoutView, PointerSample};
use crate::prefs::{FilePrefs, Theme};
use crate::preview::{PreviewView, UrlError};
use crate::ui;
use crate::workspace::{WorkspaceError, WorkspaceSnapshot, spawn_workspace};

/// Client hint carrying the browser's colour-scheme preference.
pub const PREFERS_COLOR_SCHEME: &str = "sec-ch-prefers-color-scheme";

const PREFERS_COLOR_SCHEME_HINT: &str = "Sec-CH-Prefers-Color-Scheme";

/// Request bodies are a few small JSON fields.
const BODY_LIMIT: usize = 64 * 1024;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let settings = config.workspace_settings()?;
    let prefs = Arc::new(FilePrefs::new(config.storage.prefs_path.clone()));

    info!(
        name: "prefs.store.opened",
        path = %prefs.path().display(),
        "Preference store opened"
    );

    let state = AppState {
        workspace: spawn_workspace(settings, prefs),
        config: Arc::clone(&config),
    };
    let app = router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router.
///
/// The event stream is long-lived, so the request timeout only wraps the
/// page and the command endpoints.
pub fn router(state: AppState) -> Router {
    let timeout = state.config.request_timeout();
    let static_dir = state.config.server.static_dir.clone();

    let commands = Router::new()
        .route("/", get(index))
        .route("/api/state", get(api_state))
        .route("/api/theme/toggle", post(api_toggle_theme))
        .route("/api/theme/system", post(api_system_theme))
        .route("/api/layout/drag/start", post(api_drag_start))
        .route("/api/layout/drag/move", post(api_drag_move))
        .route("/api/layout/drag/end", post(api_drag_end))
        .route("/api/layout/key", post(api_layout_key))
        .route("/api/preview/input", post(api_preview_input))
        .route("/api/preview/submit", post(api_preview_submit))
        .route("/api/preview/loaded", post(api_preview_loaded))
        .route("/api/preview/failed", post(api_preview_failed))
        .route("/api/chat/send", post(api_chat_send))
        .route("/api/chat/clear", post(api_chat_clear))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ));

    Router::new()
        .merge(commands)
        .route("/api/events", get(api_events))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Handler failures mapped onto HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The submitted preview URL was rejected.
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),

    /// The workspace actor is gone.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidUrl(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Workspace(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ─────────────────────────────────────────────────────────────────────────────
// Page and stream
// ─────────────────────────────────────────────────────────────────────────────

/// Theme announced by the `Sec-CH-Prefers-Color-Scheme` client hint.
pub fn system_theme(headers: &HeaderMap) -> Option<Theme> {
    headers
        .get(PREFERS_COLOR_SCHEME)?
        .to_str()
        .ok()?
        .trim()
        .trim_matches('"')
        .parse()
        .ok()
}

/// GET / - Render the full page.
///
/// The theme comes from the stored choice, else this request's client hint.
/// Browsers without the hint report their preference through
/// `/api/theme/system` once the script runs.
async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let system = system_theme(&headers);
    let snapshot = state
        .workspace
        .with(move |ws| WorkspaceSnapshot {
            theme: ws.theme_for(system),
            ..ws.snapshot()
        })
        .await?;

    let mut response = Html(ui::page(&snapshot).into_string()).into_response();
    let headers = response.headers_mut();
    let hint = HeaderValue::from_static(PREFERS_COLOR_SCHEME_HINT);
    headers.insert(HeaderName::from_static("accept-ch"), hint.clone());
    // Chromium retries the first request with the hint instead of rendering without it.
    headers.insert(HeaderName::from_static("critical-ch"), hint.clone());
    headers.insert(header::VARY, hint);
    Ok(response)
}

/// GET /api/state - Current workspace snapshot.
async fn api_state(State(state): State<AppState>) -> ApiResult<WorkspaceSnapshot> {
    Ok(Json(state.workspace.with(|ws| ws.snapshot()).await?))
}

/// GET /api/events - SSE stream of workspace events.
async fn api_events(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("SSE subscriber connected");
    sse_stream(state.workspace.subscribe())
}

// ─────────────────────────────────────────────────────────────────────────────
// Theme and layout
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ToggleRequest {
    /// Theme the page shows right now.
    #[serde(default)]
    showing: Option<Theme>,
}

#[derive(Debug, Deserialize)]
struct SystemThemeRequest {
    theme: Theme,
}

#[derive(Debug, Serialize)]
struct ThemeResponse {
    theme: Theme,
    stored: bool,
    /// Rendered `#theme-toggle` for the resolved theme.
    html: String,
}

impl ThemeResponse {
    fn new(theme: Theme, stored: bool) -> Self {
        Self {
            theme,
            stored,
            html: ui::theme_toggle(theme).into_string(),
        }
    }
}

/// POST /api/theme/toggle
async fn api_toggle_theme(
    State(state): State<AppState>,
    req: Option<Json<ToggleRequest>>,
) -> ApiResult<ThemeResponse> {
    let Json(req) = req.unwrap_or_default();
    let theme = state
        .workspace
        .with(move |ws| ws.toggle_theme(req.showing))
        .await?;
    Ok(Json(ThemeResponse::new(theme, true)))
}

/// POST /api/theme/system - The page reports its `prefers-color-scheme`.
///
/// Answers with the theme that page should show. Shared state is untouched.
async fn api_system_theme(
    State(state): State<AppState>,
    Json(req): Json<SystemThemeRequest>,
) -> ApiResult<ThemeResponse> {
    let (theme, stored) = state
        .workspace
        .with(move |ws| (ws.theme_for(Some(req.theme)), ws.theme_stored()))
        .await?;
    Ok(Json(ThemeResponse::new(theme, stored)))
}

#[derive(Debug, Deserialize)]
struct DragStartRequest {
    pointer_id: u32,
    #[serde(flatten)]
    sample: PointerSample,
}

#[derive(Debug, Deserialize)]
struct DragMoveRequest {
    pointer_id: u32,
    buttons: u16,
    #[serde(flatten)]
    sample: PointerSample,
}

#[derive(Debug, Deserialize)]
struct PointerRequest {
    pointer_id: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum DragStatus {
    Moved,
    Released,
    Ignored,
}

#[derive(Debug, Serialize)]
struct DragResponse {
    status: DragStatus,
    layout: LayoutView,
}

/// POST /api/layout/drag/start
async fn api_drag_start(
    State(state): State<AppState>,
    Json(req): Json<DragStartRequest>,
) -> ApiResult<LayoutView> {
    let view = state
        .workspace
        .with(move |ws| ws.begin_drag(req.pointer_id, req.sample))
        .await?;
    Ok(Json(view))
}

/// POST /api/layout/drag/move
async fn api_drag_move(
    State(state): State<AppState>,
    Json(req): Json<DragMoveRequest>,
) -> ApiResult<DragResponse> {
    let (outcome, layout) = state
        .workspace
        .with(move |ws| {
            let outcome = ws.drag_move(req.pointer_id, req.sample, req.buttons);
            (outcome, ws.snapshot().layout)
        })
        .await?;
    let status = match outcome {
        DragMove::Moved { .. } => DragStatus::Moved,
        DragMove::Released => DragStatus::Released,
        DragMove::Ignored => DragStatus::Ignored,
    };
    Ok(Json(DragResponse { status, layout }))
}

/// POST /api/layout/drag/end - Pointer up or cancel.
async fn api_drag_end(
    State(state): State<AppState>,
    Json(req): Json<PointerRequest>,
) -> ApiResult<serde_json::Value> {
    let ended = state
        .workspace
        .with(move |ws| ws.end_drag(req.pointer_id))
        .await?;
    Ok(Json(json!({ "ended": ended })))
}

#[derive(Debug, Deserialize)]
struct KeyRequest {
    key: String,
}

#[derive(Debug, Serialize)]
struct KeyResponse {
    handled: bool,
    layout: LayoutView,
}

/// POST /api/layout/key - Divider keyboard input.
async fn api_layout_key(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> ApiResult<KeyResponse> {
    let (handled, layout) = state
        .workspace
        .with(move |ws| (ws.resize_key(&req.key), ws.snapshot().layout))
        .await?;
    Ok(Json(KeyResponse { handled, layout }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Preview
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct InputRequest {
    value: String,
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    url: String,
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    token: u64,
}

#[derive(Debug, Serialize)]
struct SignalResponse {
    accepted: bool,
}

/// POST /api/preview/input - URL field edited.
async fn api_preview_input(
    State(state): State<AppState>,
    Json(req): Json<InputRequest>,
) -> ApiResult<PreviewView> {
    let view = state
        .workspace
        .with(move |ws| ws.preview_input(&req.value))
        .await?;
    Ok(Json(view))
}

/// POST /api/preview/submit - Validate and load a URL.
async fn api_preview_submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<PreviewView> {
    let view = state
        .workspace
        .with(move |ws| ws.submit_url(&req.url))
        .await??;
    Ok(Json(view))
}

/// POST /api/preview/loaded - The frame fired `load`.
async fn api_preview_loaded(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<SignalResponse> {
    let accepted = state
        .workspace
        .with(move |ws| ws.preview_loaded(req.token))
        .await?;
    Ok(Json(SignalResponse { accepted }))
}

/// POST /api/preview/failed - The frame fired `error`.
async fn api_preview_failed(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<SignalResponse> {
    let accepted = state
        .workspace
        .with(move |ws| ws.preview_failed(req.token))
        .await?;
    Ok(Json(SignalResponse { accepted }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for chat API.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    /// User message content.
    message: String,
}

/// Response from chat API. `message` is absent when the input was blank.
#[derive(Debug, Serialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct TranscriptResponse {
    messages: Vec<ChatMessage>,
}

/// POST /api/chat/send
async fn api_chat_send(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    tracing::debug!(message_length = req.message.len(), "Received chat message");
    let message = state
        .workspace
        .with(move |ws| ws.send_message(&req.message))
        .await?;
    Ok(Json(ChatResponse { message }))
}

/// POST /api/chat/clear
async fn api_chat_clear(State(state): State<AppState>) -> ApiResult<TranscriptResponse> {
    let messages = state.workspace.with(|ws| ws.clear_history()).await?;
    Ok(Json(TranscriptResponse { messages }))
}
