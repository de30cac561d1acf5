use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dashboard_api::{dashboard_layout, stateless_view, validate_change, ApiContext};
use dataset::Dataset;
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use shared::{
    domain::{SessionId, SiteSelection},
    error::{ApiError, ErrorCode},
    protocol::{DashboardEvent, DashboardLayout, DashboardView, SelectionChange, SessionOpened},
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};
use uuid::Uuid;

mod app_state;
mod config;

use app_state::{sweep_idle_sessions, AppState};
use config::load_settings;

const INDEX_HTML: &str = include_str!("../assets/index.html");

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
struct ViewQuery {
    site: Option<String>,
    low: Option<f64>,
    high: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let dataset = Dataset::load(&settings.dataset_path)
        .await
        .map_err(|error| {
            error!(
                dataset_path = %settings.dataset_path,
                %error,
                "failed to load launch dataset; verify the csv path and its columns"
            );
            error
        })
        .with_context(|| format!("loading dataset '{}'", settings.dataset_path))?;
    info!(
        records = dataset.len(),
        sites = ?dataset.sites(),
        payload_extent = ?dataset.payload_extent(),
        "dataset ready"
    );

    let api = ApiContext {
        dataset: Arc::new(dataset),
        slider: settings.slider(),
    };
    let state = Arc::new(AppState::new(api, settings.event_buffer));
    tokio::spawn(sweep_idle_sessions(state.clone(), settings.session_idle()));
    let app = build_router(state);

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "dashboard listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/layout", get(http_layout))
        .route("/views", get(http_view))
        .route("/sessions", post(http_open_session))
        .route(
            "/sessions/:session_id",
            get(http_session_view).delete(http_close_session),
        )
        .route("/sessions/:session_id/selection", post(http_apply_selection))
        .route("/sessions/:session_id/reset", post(http_reset_session))
        .route("/sessions/:session_id/ws", get(ws_handler))
        .with_state(state)
}

fn error_response(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

fn session_not_found(session_id: SessionId) -> (StatusCode, Json<ApiError>) {
    error_response(ApiError::not_found(format!(
        "dashboard session {session_id} not found"
    )))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_layout(State(state): State<Arc<AppState>>) -> Json<DashboardLayout> {
    Json(dashboard_layout(&state.api))
}

async fn http_view(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ViewQuery>,
) -> ApiResult<DashboardView> {
    let site = q.site.map(SiteSelection::from);
    let view = stateless_view(&state.api, site, q.low, q.high).map_err(error_response)?;
    Ok(Json(view))
}

async fn http_open_session(State(state): State<Arc<AppState>>) -> Json<SessionOpened> {
    Json(state.sessions.open(&state.api, &state.events).await)
}

async fn http_session_view(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<DashboardView> {
    let session_id = SessionId(session_id);
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;
    let view = session.lock().await.view().clone();
    Ok(Json(view))
}

async fn http_apply_selection(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(change): Json<SelectionChange>,
) -> ApiResult<DashboardView> {
    let session_id = SessionId(session_id);
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;
    let update = validate_change(&state.api, change).map_err(error_response)?;
    let mut session = session.lock().await;
    let view = session.apply(update).clone();
    Ok(Json(view))
}

async fn http_reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<DashboardView> {
    let session_id = SessionId(session_id);
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;
    let mut session = session.lock().await;
    let view = session.reset().clone();
    Ok(Json(view))
}

async fn http_close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let session_id = SessionId(session_id);
    if !state.sessions.close(session_id).await {
        return Err(session_not_found(session_id));
    }
    state.announce_closed(session_id);
    Ok(StatusCode::NO_CONTENT)
}

// The upgrade is extracted fallibly so an unknown session answers 404 even
// when the request is not a websocket handshake.
async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let session_id = SessionId(session_id);
    if !state.sessions.contains(session_id).await {
        return session_not_found(session_id).into_response();
    }
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| ws_connection(state, socket, session_id))
            .into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket, session_id: SessionId) {
    let (sender, mut receiver) = socket.split();
    let events_rx = state.events.subscribe();
    if !state.sessions.attach(session_id).await {
        return;
    }

    let mut send_task = tokio::spawn(forward_session_events(events_rx, sender, session_id));
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    if state.sessions.detach(session_id).await {
        state.announce_closed(session_id);
    }
}

fn is_for_session(event: &DashboardEvent, session_id: SessionId) -> bool {
    event.session_id() == Some(session_id)
}

/// Writes the session's events to `sink` as JSON text frames. Ends with a
/// close frame after `SessionClosed`, or when the sink or channel goes away.
async fn forward_session_events<S>(
    mut events_rx: broadcast::Receiver<DashboardEvent>,
    mut sink: S,
    session_id: SessionId,
) where
    S: Sink<Message> + Unpin,
{
    loop {
        let event = match events_rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(%session_id, skipped, "websocket subscriber lagged");
                continue;
            }
            Err(RecvError::Closed) => return,
        };
        if !is_for_session(&event, session_id) {
            continue;
        }
        let closed = matches!(event, DashboardEvent::SessionClosed { .. });
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(error) => {
                warn!(%session_id, %error, "failed to encode dashboard event");
                continue;
            }
        };
        if sink.send(Message::Text(text)).await.is_err() {
            return;
        }
        if closed {
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
