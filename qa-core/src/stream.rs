//! Streaming consumer: accumulate model fragments and drive one chat turn.
//!
//! Fragments are forwarded to the caller as they arrive and concatenated in
//! receipt order. The assistant turn is recorded once, with the full text,
//! after the producer signals completion. A failed stream leaves no partial
//! assistant turn behind.

use ai_llm_service::{AiLlmError, FragmentStream, TextGenerator};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::session::{ChatSession, Ticket};

/// Message shown when no model client could be built at startup.
pub const MODEL_NOT_CONFIGURED: &str = "model not configured: set GEMINI_API_KEY";

/// Concatenates fragments in arrival order.
#[derive(Debug, Default)]
pub struct FragmentAccumulator {
    buf: String,
    fragments: usize,
}

impl FragmentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `fragment`. Empty fragments are ignored.
    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.buf.push_str(fragment);
        self.fragments += 1;
    }

    /// Text accumulated so far (the "live" view of the answer).
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// Drains `stream` into a single string, stopping at the first error.
pub async fn collect_fragments(mut stream: FragmentStream) -> Result<String, AiLlmError> {
    let mut acc = FragmentAccumulator::new();
    while let Some(item) = stream.next().await {
        acc.push(&item?);
    }
    Ok(acc.finish())
}

/// Progress of one turn as seen by a live subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Next piece of the answer, in order.
    Fragment { text: String },
    /// The full answer was recorded as an assistant turn.
    Completed { content: String },
    /// Generation failed; nothing was recorded.
    Failed { message: String },
}

/// How a driven turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed(String),
    Failed(String),
    /// The session was reset while generating; the result was dropped.
    Discarded,
}

/// Runs the generation for a turn submitted under `ticket` and settles it.
///
/// `session` is locked only to record the outcome, so readers can inspect the
/// transcript while fragments stream. A dropped `events` receiver does not
/// stop the turn: the answer is still accumulated and recorded.
pub async fn drive_turn(
    session: &Mutex<ChatSession>,
    generator: Option<&dyn TextGenerator>,
    prompt: &str,
    ticket: Ticket,
    events: &mpsc::Sender<TurnEvent>,
) -> TurnOutcome {
    let result = match generator {
        Some(g) => stream_answer(g, prompt, events).await,
        None => Err(MODEL_NOT_CONFIGURED.to_string()),
    };

    match result {
        Ok(answer) => {
            let settled = session.lock().await.complete(ticket, answer.clone());
            if let Err(e) = settled {
                return discarded(ticket, e);
            }
            info!(ticket = ticket.value(), answer_len = answer.len(), "turn completed");
            let _ = events
                .send(TurnEvent::Completed {
                    content: answer.clone(),
                })
                .await;
            TurnOutcome::Completed(answer)
        }
        Err(message) => {
            let settled = session.lock().await.fail(ticket, message.clone());
            if let Err(e) = settled {
                return discarded(ticket, e);
            }
            warn!(ticket = ticket.value(), error = %message, "turn failed");
            let _ = events
                .send(TurnEvent::Failed {
                    message: message.clone(),
                })
                .await;
            TurnOutcome::Failed(message)
        }
    }
}

async fn stream_answer(
    generator: &dyn TextGenerator,
    prompt: &str,
    events: &mpsc::Sender<TurnEvent>,
) -> Result<String, String> {
    let mut stream = generator
        .generate_stream(prompt)
        .await
        .map_err(|e| e.to_string())?;

    let mut acc = FragmentAccumulator::new();
    let mut subscribed = true;
    while let Some(item) = stream.next().await {
        let fragment = item.map_err(|e| e.to_string())?;
        if fragment.is_empty() {
            continue;
        }
        acc.push(&fragment);
        if subscribed
            && events
                .send(TurnEvent::Fragment { text: fragment })
                .await
                .is_err()
        {
            debug!("turn subscriber went away, continuing to accumulate");
            subscribed = false;
        }
    }
    Ok(acc.finish())
}

fn discarded(ticket: Ticket, reason: SessionError) -> TurnOutcome {
    debug!(ticket = ticket.value(), %reason, "turn result discarded");
    TurnOutcome::Discarded
}

#[cfg(test)]
mod tests {
    use ai_llm_service::error_handler::{ProviderError, ProviderErrorKind};
    use ai_llm_service::{LlmProvider, Result as LlmResult};
    use async_trait::async_trait;

    use super::*;
    use crate::session::{Role, TurnState};

    enum Step {
        Text(&'static str),
        Fail(&'static str),
    }

    struct Scripted(Vec<Step>);

    #[async_trait]
    impl TextGenerator for Scripted {
        fn model_label(&self) -> String {
            "scripted".into()
        }

        async fn generate_stream(&self, _prompt: &str) -> LlmResult<FragmentStream> {
            let items: Vec<LlmResult<String>> = self
                .0
                .iter()
                .map(|s| match s {
                    Step::Text(t) => Ok((*t).to_string()),
                    Step::Fail(m) => Err(stream_err(m)),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn stream_err(msg: &str) -> AiLlmError {
        ProviderError::new(LlmProvider::Gemini, ProviderErrorKind::Stream(msg.into())).into()
    }

    async fn drain(mut rx: mpsc::Receiver<TurnEvent>) -> Vec<TurnEvent> {
        let mut out = Vec::new();
        while let Some(ev) = rx.recv().await {
            out.push(ev);
        }
        out
    }

    #[test]
    fn accumulator_skips_empty_fragments() {
        let mut acc = FragmentAccumulator::new();
        for f in ["Kha", "", "rif", ""] {
            acc.push(f);
        }
        assert_eq!(acc.as_str(), "Kharif");
        assert_eq!(acc.fragment_count(), 2);
        assert_eq!(acc.finish(), "Kharif");
    }

    #[tokio::test]
    async fn chunk_boundaries_do_not_change_the_answer() {
        let splits: [&[&str]; 3] = [
            &["Punjab leads wheat."],
            &["Punjab ", "leads ", "wheat."],
            &["P", "unjab lead", "", "s wheat."],
        ];
        for parts in splits {
            let items: Vec<LlmResult<String>> =
                parts.iter().map(|p| Ok((*p).to_string())).collect();
            let text = collect_fragments(Box::pin(futures::stream::iter(items)))
                .await
                .unwrap();
            assert_eq!(text, "Punjab leads wheat.");
        }
    }

    #[tokio::test]
    async fn completed_turn_records_one_assistant_message() {
        let session = Mutex::new(ChatSession::new());
        let pending = session.lock().await.submit("rice?").unwrap();
        let g = Scripted(vec![Step::Text("West "), Step::Text("Bengal")]);
        let (tx, rx) = mpsc::channel(16);

        let outcome = drive_turn(&session, Some(&g), "prompt", pending.ticket, &tx).await;
        drop(tx);

        assert_eq!(outcome, TurnOutcome::Completed("West Bengal".into()));
        let s = session.lock().await;
        assert_eq!(s.state(), TurnState::Idle);
        assert_eq!(s.transcript().len(), 2);
        assert_eq!(s.transcript()[1].role, Role::Assistant);
        assert_eq!(s.transcript()[1].content, "West Bengal");
        drop(s);

        let events = drain(rx).await;
        assert_eq!(
            events,
            vec![
                TurnEvent::Fragment { text: "West ".into() },
                TurnEvent::Fragment { text: "Bengal".into() },
                TurnEvent::Completed {
                    content: "West Bengal".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn failure_mid_stream_leaves_no_partial_turn() {
        let session = Mutex::new(ChatSession::new());
        let pending = session.lock().await.submit("rice?").unwrap();
        let g = Scripted(vec![Step::Text("West "), Step::Fail("quota exceeded")]);
        let (tx, _rx) = mpsc::channel(16);

        let outcome = drive_turn(&session, Some(&g), "prompt", pending.ticket, &tx).await;

        assert!(matches!(outcome, TurnOutcome::Failed(ref m) if m.contains("quota exceeded")));
        let s = session.lock().await;
        assert!(!s.is_awaiting_response());
        assert_eq!(s.transcript().len(), 1);
        assert!(s.last_error().is_some_and(|e| e.contains("quota exceeded")));
    }

    #[tokio::test]
    async fn missing_model_fails_turn_and_resets_flag() {
        let session = Mutex::new(ChatSession::new());
        let pending = session.lock().await.submit("rice?").unwrap();
        let (tx, rx) = mpsc::channel(4);

        let outcome = drive_turn(&session, None, "prompt", pending.ticket, &tx).await;
        drop(tx);

        assert_eq!(outcome, TurnOutcome::Failed(MODEL_NOT_CONFIGURED.into()));
        assert!(!session.lock().await.is_awaiting_response());
        assert_eq!(
            drain(rx).await,
            vec![TurnEvent::Failed {
                message: MODEL_NOT_CONFIGURED.into()
            }]
        );
    }

    #[tokio::test]
    async fn reset_during_generation_discards_result() {
        let session = Mutex::new(ChatSession::new());
        let pending = session.lock().await.submit("rice?").unwrap();
        session.lock().await.clear();
        let g = Scripted(vec![Step::Text("late answer")]);
        let (tx, _rx) = mpsc::channel(16);

        let outcome = drive_turn(&session, Some(&g), "prompt", pending.ticket, &tx).await;

        assert_eq!(outcome, TurnOutcome::Discarded);
        assert!(session.lock().await.transcript().is_empty());
    }

    #[tokio::test]
    async fn dropped_subscriber_still_records_answer() {
        let session = Mutex::new(ChatSession::new());
        let pending = session.lock().await.submit("rice?").unwrap();
        let g = Scripted(vec![Step::Text("a"), Step::Text("b"), Step::Text("c")]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = drive_turn(&session, Some(&g), "prompt", pending.ticket, &tx).await;

        assert_eq!(outcome, TurnOutcome::Completed("abc".into()));
        assert_eq!(session.lock().await.transcript()[1].content, "abc");
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let v = serde_json::to_value(TurnEvent::Fragment { text: "x".into() }).unwrap();
        assert_eq!(v, serde_json::json!({"type": "fragment", "text": "x"}));
    }
}

#[cfg(test)]
mod proptests {
    use ai_llm_service::Result as LlmResult;
    use proptest::prelude::*;

    use super::*;

    fn fragment_stream(parts: &[String]) -> FragmentStream {
        let items: Vec<LlmResult<String>> = parts.iter().cloned().map(Ok).collect();
        Box::pin(futures::stream::iter(items))
    }

    struct Replay(Vec<String>);

    #[async_trait::async_trait]
    impl TextGenerator for Replay {
        fn model_label(&self) -> String {
            "replay".into()
        }

        async fn generate_stream(&self, _prompt: &str) -> LlmResult<FragmentStream> {
            Ok(fragment_stream(&self.0))
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime")
    }

    proptest! {
        #[test]
        fn collected_text_is_concatenation(parts in prop::collection::vec(".{0,12}", 0..24)) {
            let text = runtime().block_on(collect_fragments(fragment_stream(&parts))).unwrap();
            prop_assert_eq!(text, parts.concat());
        }

        #[test]
        fn recorded_turn_is_concatenation(parts in prop::collection::vec(".{0,12}", 0..24)) {
            let expected = parts.concat();
            let (stored, forwarded) = runtime().block_on(async move {
                let session = Mutex::new(ChatSession::new());
                let pending = session.lock().await.submit("rice?").unwrap();
                let (tx, mut rx) = mpsc::channel(parts.len() + 2);
                let g = Replay(parts);

                drive_turn(&session, Some(&g), "prompt", pending.ticket, &tx).await;
                drop(tx);

                let mut forwarded = String::new();
                while let Some(ev) = rx.recv().await {
                    if let TurnEvent::Fragment { text } = ev {
                        forwarded.push_str(&text);
                    }
                }
                let stored = session.lock().await.transcript()[1].content.clone();
                (stored, forwarded)
            });
            prop_assert_eq!(&stored, &expected);
            prop_assert_eq!(&forwarded, &expected);
        }
    }
}
