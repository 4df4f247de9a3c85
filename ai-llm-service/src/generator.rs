//! Provider-agnostic text generation seam.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::error_handler::Result;

/// Ordered fragments of a model answer, in receipt order.
///
/// The stream ends after the last fragment. An `Err` item is terminal: the
/// producer stops after sending it.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Something that turns a prompt into model text.
///
/// Implemented by [`crate::LlmService`]; tests substitute scripted fakes.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Label for status output and answer sources (e.g. `Google Gemini 2.5 Flash`).
    fn model_label(&self) -> String;

    /// Opens a streamed generation for `prompt`.
    ///
    /// Errors returned here happen before the first fragment (bad status,
    /// transport); later failures arrive as `Err` items on the stream.
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream>;

    /// Produces one complete answer.
    ///
    /// The default drains [`TextGenerator::generate_stream`]; providers with a
    /// dedicated non-streaming endpoint override it.
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut stream = self.generate_stream(prompt).await?;
        let mut out = String::new();
        while let Some(fragment) = stream.next().await {
            out.push_str(&fragment?);
        }
        Ok(out)
    }
}
