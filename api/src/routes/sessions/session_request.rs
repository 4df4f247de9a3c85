use qa_core::{ChatSession, Turn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request payload for POST /sessions/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// The user's question.
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedSession {
    pub session_id: Uuid,
}

/// Snapshot of a session for the dashboard.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub awaiting_response: bool,
    pub questions_asked: usize,
    pub last_error: Option<String>,
    pub messages: Vec<Turn>,
}

impl SessionView {
    pub fn new(session_id: Uuid, session: &ChatSession) -> Self {
        Self {
            session_id,
            awaiting_response: session.is_awaiting_response(),
            questions_asked: session.questions_asked(),
            last_error: session.last_error().map(str::to_string),
            messages: session.transcript().to_vec(),
        }
    }
}
