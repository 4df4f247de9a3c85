//! Question answering core for the Samarth backend.
//!
//! - [`prompt`] wraps a question (and optional dataset citations) in a fixed template.
//! - [`session`] is the single-flight turn-taking state machine of a chat session.
//! - [`stream`] accumulates model fragments and drives one chat turn to completion.
//! - [`store`] keeps per-session contexts for the HTTP layer.
//! - [`ask`] answers a one-shot question for the plain `/chat` endpoint.

pub mod catalog;
pub mod cfg;
pub mod prompt;
pub mod session;
pub mod store;
pub mod stream;

mod api_types;
mod error;

pub use api_types::QaAnswer;
pub use catalog::{DATASET_CATALOG, DatasetEntry, SAMPLE_QUESTIONS};
pub use cfg::QaConfig;
pub use error::{QaError, SessionError};
pub use prompt::{PromptStyle, build_prompt};
pub use session::{ChatSession, PendingTurn, Role, Ticket, Turn, TurnState};
pub use store::{SessionStore, SharedSession};
pub use stream::{FragmentAccumulator, TurnEvent, TurnOutcome, collect_fragments, drive_turn};

use ai_llm_service::TextGenerator;
use tracing::{info, instrument};

/// Source line attached to every answer besides the model label.
pub const GENERAL_KNOWLEDGE_SOURCE: &str = "General knowledge about Indian agriculture";

/// Answer a single question with the detailed template.
///
/// `citations` are interpolated into the prompt and echoed back in
/// [`QaAnswer::sources`] via [`DatasetEntry::source_label`].
///
/// # Errors
/// - [`QaError::EmptyQuestion`] for blank input
/// - [`QaError::Llm`] when the model call fails
#[instrument(skip_all, fields(question_len = question.len(), citations = citations.len()))]
pub async fn ask(
    generator: &dyn TextGenerator,
    question: &str,
    citations: &[DatasetEntry],
) -> Result<QaAnswer, QaError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(QaError::EmptyQuestion);
    }

    let prompt = build_prompt(PromptStyle::Detailed, question, citations);
    let answer = generator.generate(&prompt).await?;

    let mut sources = vec![generator.model_label(), GENERAL_KNOWLEDGE_SOURCE.to_string()];
    sources.extend(citations.iter().map(DatasetEntry::source_label));

    info!(answer_len = answer.len(), "question answered");
    Ok(QaAnswer { answer, sources })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ai_llm_service::error_handler::{ProviderError, ProviderErrorKind};
    use ai_llm_service::{FragmentStream, LlmProvider, Result as LlmResult};
    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Recording {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for Recording {
        fn model_label(&self) -> String {
            "Google Gemini 2.5 Flash".into()
        }

        async fn generate_stream(&self, prompt: &str) -> LlmResult<FragmentStream> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let parts = vec![Ok("MSP is a ".to_string()), Ok("price floor.".to_string())];
            Ok(Box::pin(futures::stream::iter(parts)))
        }
    }

    struct Quota;

    #[async_trait]
    impl TextGenerator for Quota {
        fn model_label(&self) -> String {
            "Google Gemini 2.5 Flash".into()
        }

        async fn generate_stream(&self, _prompt: &str) -> LlmResult<FragmentStream> {
            let parts = vec![
                Ok("MSP is ".to_string()),
                Err(ProviderError::new(
                    LlmProvider::Gemini,
                    ProviderErrorKind::Stream("quota exceeded".into()),
                )
                .into()),
            ];
            Ok(Box::pin(futures::stream::iter(parts)))
        }
    }

    #[tokio::test]
    async fn ask_returns_answer_and_sources() {
        let g = Recording::default();
        let qa = ask(&g, "  What is MSP?  ", &DATASET_CATALOG[..1]).await.unwrap();

        assert_eq!(qa.answer, "MSP is a price floor.");
        assert_eq!(qa.sources[0], "Google Gemini 2.5 Flash");
        assert_eq!(qa.sources[1], GENERAL_KNOWLEDGE_SOURCE);
        assert!(qa.sources[2].contains("9ef84268-d588-465a-a308-a864a43d0070"));

        let prompts = g.prompts.lock().unwrap();
        assert!(prompts[0].contains("User Question: What is MSP?\n"));
    }

    #[tokio::test]
    async fn ask_rejects_blank_question() {
        let g = Recording::default();
        let err = ask(&g, "   ", &[]).await.unwrap_err();
        assert!(matches!(err, QaError::EmptyQuestion));
        assert!(g.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn model_failure_yields_no_partial_answer() {
        let err = ask(&Quota, "What is MSP?", &[]).await.unwrap_err();
        assert!(matches!(err, QaError::Llm(_)));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
