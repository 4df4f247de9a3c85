//! Single-flight turn-taking state machine for one chat session.
//!
//! ```text
//! Idle --submit(text)--> Pending --complete(answer) | fail(error)--> Idle
//! ```
//!
//! While `Pending`, further submissions are rejected. Every submission hands
//! out a [`Ticket`]; `complete`/`fail` must present it, so a generation that
//! outlives a `clear()` cannot write into the fresh transcript.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Observable state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    Pending,
}

/// Identifies the submission a generation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What a successful submission hands to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub ticket: Ticket,
    /// Content of the user turn that was just appended.
    pub query: String,
}

/// Transcript plus the `awaiting_response` flag of one chat session.
#[derive(Debug, Default)]
pub struct ChatSession {
    transcript: Vec<Turn>,
    awaiting_response: bool,
    ticket: u64,
    last_error: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle → Pending: append the user turn and raise the flag.
    ///
    /// # Errors
    /// - [`SessionError::EmptyInput`] for blank text
    /// - [`SessionError::AwaitingResponse`] while a response is in flight
    pub fn submit(&mut self, text: &str) -> Result<PendingTurn, SessionError> {
        if self.awaiting_response {
            return Err(SessionError::AwaitingResponse);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        self.transcript.push(Turn {
            role: Role::User,
            content: text.to_string(),
        });
        self.awaiting_response = true;
        self.last_error = None;
        self.ticket += 1;

        Ok(PendingTurn {
            ticket: Ticket(self.ticket),
            query: text.to_string(),
        })
    }

    /// Pending → Idle with the fully accumulated answer as one assistant turn.
    pub fn complete(&mut self, ticket: Ticket, answer: String) -> Result<(), SessionError> {
        self.check_ticket(ticket)?;
        self.transcript.push(Turn {
            role: Role::Assistant,
            content: answer,
        });
        self.awaiting_response = false;
        Ok(())
    }

    /// Pending → Idle without touching the transcript; the error is kept for display.
    pub fn fail(&mut self, ticket: Ticket, message: impl Into<String>) -> Result<(), SessionError> {
        self.check_ticket(ticket)?;
        self.last_error = Some(message.into());
        self.awaiting_response = false;
        Ok(())
    }

    /// Drop the whole conversation and return to `Idle`.
    ///
    /// Any generation still running for the old transcript becomes stale.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.awaiting_response = false;
        self.last_error = None;
        self.ticket += 1;
    }

    pub fn state(&self) -> TurnState {
        if self.awaiting_response {
            TurnState::Pending
        } else {
            TurnState::Idle
        }
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// Number of user turns ("Questions Asked" on the dashboard).
    pub fn questions_asked(&self) -> usize {
        self.transcript
            .iter()
            .filter(|t| t.role == Role::User)
            .count()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The question being answered, while `Pending`.
    pub fn pending_query(&self) -> Option<&str> {
        if !self.awaiting_response {
            return None;
        }
        self.transcript
            .last()
            .filter(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
    }

    fn check_ticket(&self, ticket: Ticket) -> Result<(), SessionError> {
        if ticket.0 != self.ticket {
            return Err(SessionError::StaleTicket {
                got: ticket.0,
                current: self.ticket,
            });
        }
        if !self.awaiting_response {
            return Err(SessionError::NotPending);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_moves_to_pending_and_appends_user_turn() {
        let mut s = ChatSession::new();
        assert_eq!(s.state(), TurnState::Idle);

        let p = s.submit("  Which states grow jowar?  ").unwrap();
        assert_eq!(p.query, "Which states grow jowar?");
        assert_eq!(s.state(), TurnState::Pending);
        assert_eq!(s.pending_query(), Some("Which states grow jowar?"));
        assert_eq!(
            s.transcript(),
            &[Turn {
                role: Role::User,
                content: "Which states grow jowar?".into()
            }]
        );
    }

    #[test]
    fn second_submission_is_rejected_while_pending() {
        let mut s = ChatSession::new();
        s.submit("first").unwrap();
        assert_eq!(s.submit("second"), Err(SessionError::AwaitingResponse));
        assert_eq!(s.transcript().len(), 1);
    }

    #[test]
    fn blank_input_is_rejected() {
        let mut s = ChatSession::new();
        assert_eq!(s.submit(" \n\t"), Err(SessionError::EmptyInput));
        assert_eq!(s.state(), TurnState::Idle);
        assert!(s.transcript().is_empty());
    }

    #[test]
    fn complete_appends_one_assistant_turn_and_returns_to_idle() {
        let mut s = ChatSession::new();
        let p = s.submit("q").unwrap();
        s.complete(p.ticket, "answer".into()).unwrap();

        assert_eq!(s.state(), TurnState::Idle);
        assert_eq!(s.transcript().len(), 2);
        assert_eq!(s.transcript()[1].role, Role::Assistant);
        assert_eq!(s.pending_query(), None);
    }

    #[test]
    fn failure_keeps_transcript_and_surfaces_error() {
        let mut s = ChatSession::new();
        let p = s.submit("q").unwrap();
        s.fail(p.ticket, "quota exceeded").unwrap();

        assert_eq!(s.state(), TurnState::Idle);
        assert_eq!(s.transcript().len(), 1);
        assert_eq!(s.last_error(), Some("quota exceeded"));

        // The next submission clears the surfaced error.
        s.submit("again").unwrap();
        assert_eq!(s.last_error(), None);
    }

    #[test]
    fn flag_cannot_be_cleared_twice_for_one_submission() {
        let mut s = ChatSession::new();
        let p = s.submit("q").unwrap();
        s.complete(p.ticket, "a".into()).unwrap();
        assert_eq!(
            s.complete(p.ticket, "again".into()),
            Err(SessionError::NotPending)
        );
        assert_eq!(s.fail(p.ticket, "late"), Err(SessionError::NotPending));
        assert_eq!(s.transcript().len(), 2);
    }

    #[test]
    fn clear_resets_transcript_and_flag() {
        let mut s = ChatSession::new();
        let p = s.submit("q").unwrap();
        s.clear();

        assert!(s.transcript().is_empty());
        assert!(!s.is_awaiting_response());
        assert_eq!(s.questions_asked(), 0);

        // A generation started before the reset cannot land afterwards.
        assert!(matches!(
            s.complete(p.ticket, "late".into()),
            Err(SessionError::StaleTicket { .. })
        ));
        assert!(s.transcript().is_empty());
    }

    #[test]
    fn questions_asked_counts_user_turns() {
        let mut s = ChatSession::new();
        for q in ["a", "b", "c"] {
            let p = s.submit(q).unwrap();
            s.complete(p.ticket, format!("answer to {q}")).unwrap();
        }
        assert_eq!(s.questions_asked(), 3);
        assert_eq!(s.transcript().len(), 6);
    }

    #[test]
    fn tickets_increase_per_submission() {
        let mut s = ChatSession::new();
        let a = s.submit("a").unwrap();
        s.complete(a.ticket, "x".into()).unwrap();
        let b = s.submit("b").unwrap();
        assert!(b.ticket.value() > a.ticket.value());
    }
}
