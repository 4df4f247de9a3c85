use std::fmt;

use crate::config::llm_provider::LlmProvider;

/// Configuration for an LLM model invocation.
///
/// # Fields
///
/// - `provider`: Which LLM provider/backend to use (Gemini or Ollama).
/// - `model`: The model identifier (e.g., `"gemini-2.5-flash"`).
/// - `endpoint`: API base URL (without the `/v1beta/...` path).
/// - `api_key`: API key for providers that require authentication.
/// - `max_tokens`: Maximum number of tokens to generate (if supported).
/// - `temperature`: Controls randomness (0.0 = deterministic).
/// - `top_p`: Nucleus sampling cutoff.
/// - `timeout_secs`: Optional request timeout in seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::Gemini,
///     model: "gemini-2.5-flash".to_string(),
///     endpoint: "https://generativelanguage.googleapis.com".to_string(),
///     api_key: Some("secret".to_string()),
///     max_tokens: None,
///     temperature: None,
///     top_p: None,
///     timeout_secs: Some(120),
/// };
/// assert_eq!(cfg.display_name(), "Google Gemini 2.5 Flash");
/// ```
#[derive(Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The LLM provider/backend.
    pub provider: LlmProvider,

    /// Model identifier string (e.g., `"gemini-2.5-flash"`).
    pub model: String,

    /// API base URL.
    pub endpoint: String,

    /// Optional API key for authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Human-readable model label, used in answer `sources` and status output.
    ///
    /// Gemini ids are prettified (`gemini-2.5-flash` → `Google Gemini 2.5 Flash`);
    /// Ollama models are shown verbatim.
    pub fn display_name(&self) -> String {
        match self.provider {
            LlmProvider::Gemini => {
                let id = self.model.trim_start_matches("models/");
                let words: Vec<String> = id.split(['-', '_']).map(capitalize).collect();
                format!("Google {}", words.join(" "))
            }
            LlmProvider::Ollama => format!("Ollama {}", self.model),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// Hand-written so the key never reaches logs.
impl fmt::Debug for LlmModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(provider: LlmProvider, model: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider,
            model: model.into(),
            endpoint: "http://localhost".into(),
            api_key: Some("very-secret".into()),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
        }
    }

    #[test]
    fn gemini_display_name_is_prettified() {
        let c = cfg(LlmProvider::Gemini, "models/gemini-2.5-flash");
        assert_eq!(c.display_name(), "Google Gemini 2.5 Flash");
    }

    #[test]
    fn default_model_label_matches_display_name() {
        use crate::config::default_config::{DEFAULT_GEMINI_LABEL, DEFAULT_GEMINI_MODEL};
        let c = cfg(LlmProvider::Gemini, DEFAULT_GEMINI_MODEL);
        assert_eq!(c.display_name(), DEFAULT_GEMINI_LABEL);
    }

    #[test]
    fn ollama_display_name_keeps_tag() {
        let c = cfg(LlmProvider::Ollama, "qwen3:14b");
        assert_eq!(c.display_name(), "Ollama qwen3:14b");
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = cfg(LlmProvider::Gemini, "gemini-2.5-flash");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("very-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
