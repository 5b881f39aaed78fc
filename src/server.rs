//! HTTP surface: submit a transfer, stream its session as server-sent events

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use eyre::{Context, Result};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::chain::ChainConnector;
use crate::config::{ServerConfig, TransferDefaults, TransferForm, TransferRequest};
use crate::orchestrator::TransferOrchestrator;
use crate::session::{SessionFeed, SessionId, SessionRegistry};

/// Application state shared across handlers
pub struct AppState<K: ChainConnector> {
    registry: Arc<SessionRegistry>,
    orchestrator: Arc<TransferOrchestrator<K>>,
    defaults: Arc<TransferDefaults>,
}

impl<K: ChainConnector> Clone for AppState<K> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            orchestrator: Arc::clone(&self.orchestrator),
            defaults: Arc::clone(&self.defaults),
        }
    }
}

impl<K: ChainConnector> AppState<K> {
    pub fn new(connector: K, config: &ServerConfig, defaults: TransferDefaults) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(config.session_retention())),
            orchestrator: Arc::new(TransferOrchestrator::new(connector, config.monitor())),
            defaults: Arc::new(defaults),
        }
    }
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    session_id: SessionId,
}

/// Build the router
pub fn router<K: ChainConnector>(state: AppState<K>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/transfer", post(submit_transfer::<K>))
        .route("/api/transfer/{session_id}/events", get(stream_events::<K>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve<K: ChainConnector>(
    connector: K,
    config: ServerConfig,
    defaults: TransferDefaults,
) -> Result<()> {
    let app = router(AppState::new(connector, &config, defaults));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    tracing::info!("Server listening on http://{}", config.bind);

    axum::serve(listener, app).await.context("Server error")
}

async fn health() -> &'static str {
    "ok"
}

async fn submit_transfer<K: ChainConnector>(
    State(state): State<AppState<K>>,
    Json(form): Json<TransferForm>,
) -> impl IntoResponse {
    let request = TransferRequest::resolve(form, &state.defaults);
    let session = state.registry.create().await;
    let session_id = session.id();
    tracing::info!(session = %session_id, "transfer submitted");

    state.orchestrator.spawn(&state.registry, request, session);

    (StatusCode::ACCEPTED, Json(SubmitResponse { session_id }))
}

async fn stream_events<K: ChainConnector>(
    State(state): State<AppState<K>>,
    Path(session_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let feed = state.registry.subscribe_raw(&session_id).await;
    Sse::new(feed.map(|item| Ok(to_sse(item)))).keep_alive(KeepAlive::default())
}

fn to_sse(item: SessionFeed) -> Event {
    match item {
        SessionFeed::Event(event) => match Event::default().json_data(&event) {
            Ok(sse) => sse,
            Err(e) => {
                tracing::error!("Failed to serialize event: {e}");
                Event::default().data(event.message)
            }
        },
        SessionFeed::End => Event::default().event("end").data(""),
    }
}
