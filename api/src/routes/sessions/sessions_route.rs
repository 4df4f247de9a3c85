//! Chat dashboard sessions.
//!
//! A session accepts one question at a time. `POST /sessions/{id}/messages`
//! answers with a `text/event-stream`:
//!
//! ```text
//! event: fragment   data: {"type":"fragment","text":"..."}     (zero or more)
//! event: done       data: {"type":"completed","content":"..."}
//! event: error      data: {"type":"failed","message":"..."}
//! ```
//!
//! The turn keeps running if the client disconnects; the answer is still
//! recorded in the transcript. Clearing the history or deleting the session
//! aborts it.

use std::{convert::Infallible, sync::Arc};

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt};
use qa_core::{PromptStyle, TurnEvent, build_prompt, drive_turn};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, info, info_span, instrument};
use uuid::Uuid;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::sessions::session_request::{CreatedSession, MessageRequest, SessionView},
};

/// Buffered fragments per live turn before the producer waits.
const EVENT_BUFFER: usize = 64;

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("session {id}"))
}

/// Handler: POST /sessions
pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (session_id, _) = state.sessions.create().await;
    info!(%session_id, "session created");
    (StatusCode::CREATED, Json(CreatedSession { session_id }))
}

/// Handler: GET /sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let session = state.sessions.get(&id).await.ok_or_else(|| not_found(id))?;
    let guard = session.lock().await;
    Ok(Json(SessionView::new(id, &guard)))
}

/// Handler: DELETE /sessions/{id}
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !state.sessions.remove(&id).await {
        return Err(not_found(id));
    }
    info!(session_id = %id, "session removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Handler: DELETE /sessions/{id}/messages ("Clear History")
pub async fn clear_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let session = state.sessions.get(&id).await.ok_or_else(|| not_found(id))?;
    let mut guard = session.lock().await;
    let aborted = state.sessions.abort_turn(&id).await;
    guard.clear();
    info!(session_id = %id, aborted_turn = aborted, "history cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// Handler: POST /sessions/{id}/messages
///
/// # Example
/// ```bash
/// curl -N -X POST http://127.0.0.1:8000/sessions/$ID/messages \
///   -H 'content-type: application/json' \
///   -d '{"content":"What are the monsoon patterns?"}'
/// ```
#[instrument(name = "post_message", skip_all, fields(session_id = %id))]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageRequest>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = state.sessions.get(&id).await.ok_or_else(|| not_found(id))?;
    // Held until the turn is tracked so a concurrent clear can abort it.
    let mut guard = session.lock().await;
    let pending = guard.submit(&body.content)?;

    let prompt = build_prompt(PromptStyle::Concise, &pending.query, state.qa.citations());
    let generator = state.generator.clone();
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let span = info_span!("turn", session_id = %id, ticket = pending.ticket.value());
    let turn_session = session.clone();
    let turn = tokio::spawn(
        async move {
            drive_turn(&turn_session, generator.as_deref(), &prompt, pending.ticket, &tx).await;
        }
        .instrument(span),
    );
    state.sessions.track_turn(&id, turn.abort_handle()).await;
    drop(guard);

    let events = ReceiverStream::new(rx).map(|ev| Ok(to_sse(&ev)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn to_sse(ev: &TurnEvent) -> Event {
    let name = match ev {
        TurnEvent::Fragment { .. } => "fragment",
        TurnEvent::Completed { .. } => "done",
        TurnEvent::Failed { .. } => "error",
    };
    Event::default()
        .event(name)
        .json_data(ev)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

