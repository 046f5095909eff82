//! Session API for the chat page.
//!
//! Endpoints:
//!
//! - `POST   /api/sessions`                : Start a session
//! - `GET    /api/sessions/{id}/transcript`: Recorded turns (empty for an unknown id)
//! - `POST   /api/sessions/{id}/turns`     : Submit a prompt, get an SSE stream of the turn
//! - `DELETE /api/sessions/{id}`           : End a session

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info};

use toolchat_core::{SessionId, Turn};
use toolchat_session::{SessionError, SessionEvent, SessionStore};

/// Shared state for the session API.
pub struct ApiState {
    pub sessions: SessionStore,
}

pub type SharedApiState = Arc<ApiState>;

/// Build the session API router. Nest this under "/api" in the main router.
pub fn api_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/sessions", post(create_session_handler))
        .route("/sessions/{id}", delete(delete_session_handler))
        .route("/sessions/{id}/transcript", get(transcript_handler))
        .route("/sessions/{id}/turns", post(submit_turn_handler))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn session_failure(e: SessionError) -> ApiError {
    error!(error = %e, "Session could not be started");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

/// `POST /api/sessions`
async fn create_session_handler(
    State(state): State<SharedApiState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let id = state.sessions.create().await.map_err(session_failure)?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: id.to_string(),
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

/// `GET /api/sessions/{id}/transcript`
///
/// Reading never creates a session; an unknown or evicted id has no turns.
async fn transcript_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Json<TranscriptResponse> {
    let id = SessionId(id);
    let turns = match state.sessions.get(&id).await {
        Some(session) => session.lock().await.transcript().to_vec(),
        None => Vec::new(),
    };

    Json(TranscriptResponse {
        session_id: id.to_string(),
        turns,
    })
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub prompt: String,
}

/// `POST /api/sessions/{id}/turns`
///
/// The turn runs in its own task so it completes even if the client goes
/// away; the response streams whatever the turn reports.
async fn submit_turn_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(payload): Json<TurnRequest>,
) -> Result<Response, ApiError> {
    if payload.prompt.trim().is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let id = SessionId(id);
    let session = state
        .sessions
        .get_or_create(&id)
        .await
        .map_err(session_failure)?;

    let (mut tx, rx) = mpsc::unbounded_channel::<SessionEvent>();
    tokio::spawn(async move {
        let mut session = session.lock().await;
        info!(session_id = %id, "Turn submitted");
        if let Err(e) = session.submit(&payload.prompt, &mut tx).await {
            error!(session_id = %id, error = %e, "Turn failed");
            let _ = tx.send(SessionEvent::Error {
                message: e.to_string(),
            });
        }
    });

    let stream = UnboundedReceiverStream::new(rx).map(|event| {
        Ok::<_, Infallible>(
            SseEvent::default()
                .event(event.event_type())
                .data(event.data().to_string()),
        )
    });

    Ok(Sse::new(stream).into_response())
}

/// `DELETE /api/sessions/{id}`
async fn delete_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.sessions.remove(&SessionId(id)).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
