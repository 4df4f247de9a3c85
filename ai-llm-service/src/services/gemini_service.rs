//! Google Gemini service for text generation.
//!
//! Thin client around the Generative Language REST API. Endpoints are derived
//! from `LlmModelConfig::endpoint` and `LlmModelConfig::model`:
//! - single answer: `POST {endpoint}/v1beta/models/{model}:generateContent`
//! - streamed answer: `POST {endpoint}/v1beta/models/{model}:streamGenerateContent?alt=sse`
//!
//! Constructor validation:
//! - `cfg.provider` must be `LlmProvider::Gemini`
//! - `cfg.api_key` must be present (sent as `x-goog-api-key`)
//! - `cfg.endpoint` must start with http:// or https://
//!
//! Streaming uses a producer task that parses server-sent events and pushes
//! text fragments into a bounded channel; the caller consumes the receiving
//! end as a [`FragmentStream`].

use std::time::{Duration, Instant};

use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::{
    config::{
        default_config::DEFAULT_TIMEOUT_SECS, llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::{AiLlmError, HttpError, ProviderError, ProviderErrorKind, make_snippet},
    generator::FragmentStream,
};

/// Fragments buffered between the SSE reader and the consumer.
const FRAGMENT_BUFFER: usize = 64;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Thin client for the Gemini API.
///
/// Constructed from a complete [`LlmModelConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeout and default headers).
#[derive(Debug)]
pub struct GeminiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    timeout: Duration,
    url_generate: String,
    url_stream: String,
}

impl GeminiService {
    /// Creates a new [`GeminiService`] from the given config.
    ///
    /// # Errors
    /// - [`AiLlmError::Provider`] with `InvalidProvider` if `cfg.provider` is not Gemini
    /// - [`AiLlmError::Provider`] with `MissingApiKey` if `cfg.api_key` is `None`
    /// - [`AiLlmError::Provider`] with `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::Gemini {
            return Err(provider_err(ProviderErrorKind::InvalidProvider));
        }

        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| provider_err(ProviderErrorKind::MissingApiKey))?;

        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(provider_err(ProviderErrorKind::InvalidEndpoint(
                cfg.endpoint.clone(),
            )));
        }

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let mut key_value = header::HeaderValue::from_str(&api_key).map_err(|e| {
            provider_err(ProviderErrorKind::Decode(format!(
                "invalid API key header: {e}"
            )))
        })?;
        key_value.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(API_KEY_HEADER, key_value);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()?;

        let base = model_base_url(endpoint, &cfg.model);
        let url_generate = format!("{base}:generateContent");
        let url_stream = format!("{base}:streamGenerateContent?alt=sse");

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = timeout.as_secs(),
            "GeminiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            timeout,
            url_generate,
            url_stream,
        })
    }

    /// Performs a **non-streaming** `generateContent` request.
    ///
    /// # Errors
    /// - [`AiLlmError::Provider`] with `HttpStatus` for non-2xx responses
    /// - [`AiLlmError::Timeout`] when the request exceeds the configured timeout
    /// - [`AiLlmError::HttpTransport`] for other client/network failures
    /// - [`AiLlmError::Provider`] with `Decode`, `Blocked` or `EmptyResponse`
    pub async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = GenerateContentRequest::from_cfg(&self.cfg, prompt);

        debug!(
            model = %self.cfg.model,
            prompt_len = prompt.len(),
            "POST {}", self.url_generate
        );

        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let resp = self.ensure_success(resp, &self.url_generate, started).await?;

        let raw = resp.text().await.map_err(|e| self.transport_error(e))?;
        let text = parse_full_response(&raw).map_err(|kind| {
            error!(
                model = %self.cfg.model,
                error = %kind,
                latency_ms = started.elapsed().as_millis(),
                "failed to read generateContent response"
            );
            provider_err(kind)
        })?;

        info!(
            model = %self.cfg.model,
            answer_len = text.len(),
            latency_ms = started.elapsed().as_millis(),
            "generation completed"
        );

        Ok(text)
    }

    /// Opens a `streamGenerateContent` request and returns its fragments.
    ///
    /// The HTTP status is checked before returning; errors discovered while
    /// reading the event stream are delivered as the final stream item.
    ///
    /// # Errors
    /// Same pre-stream errors as [`GeminiService::generate`].
    pub async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, AiLlmError> {
        let started = Instant::now();
        let body = GenerateContentRequest::from_cfg(&self.cfg, prompt);

        debug!(
            model = %self.cfg.model,
            prompt_len = prompt.len(),
            "POST {}", self.url_stream
        );

        let resp = self
            .client
            .post(&self.url_stream)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let resp = self.ensure_success(resp, &self.url_stream, started).await?;

        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        tokio::spawn(pump_events(resp, tx, self.cfg.model.clone(), started));

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn ensure_success(
        &self,
        resp: reqwest::Response,
        url: &str,
        started: Instant,
    ) -> Result<reqwest::Response, AiLlmError> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let url = strip_query(url);
        let text = resp.text().await.unwrap_or_default();
        let snippet = make_snippet(&error_message(&text).unwrap_or(text));

        error!(
            %status,
            %url,
            %snippet,
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            "Gemini returned non-success status"
        );

        Err(provider_err(ProviderErrorKind::HttpStatus(HttpError {
            status,
            url,
            snippet,
        })))
    }

    fn transport_error(&self, err: reqwest::Error) -> AiLlmError {
        if err.is_timeout() {
            AiLlmError::Timeout(self.timeout)
        } else {
            AiLlmError::HttpTransport(err)
        }
    }
}

/// Reads server-sent events and forwards their text in receipt order.
async fn pump_events(
    resp: reqwest::Response,
    tx: mpsc::Sender<Result<String, AiLlmError>>,
    model: String,
    started: Instant,
) {
    let mut events = resp.bytes_stream().eventsource();
    let mut fragments = 0usize;

    while let Some(event) = events.next().await {
        let item = match event {
            Ok(ev) => match parse_stream_chunk(&ev.data) {
                Ok(text) if text.is_empty() => continue,
                Ok(text) => Ok(text),
                Err(kind) => Err(provider_err(kind)),
            },
            Err(e) => Err(provider_err(ProviderErrorKind::Stream(e.to_string()))),
        };

        let terminal = item.is_err();
        if let Err(e) = &item {
            warn!(%model, error = %e, fragments, "Gemini stream ended with error");
        }
        if tx.send(item).await.is_err() {
            debug!(%model, fragments, "fragment consumer dropped; stopping stream");
            return;
        }
        if terminal {
            return;
        }
        fragments += 1;
    }

    info!(
        %model,
        fragments,
        latency_ms = started.elapsed().as_millis(),
        "streamed generation completed"
    );
}

fn provider_err(kind: ProviderErrorKind) -> AiLlmError {
    ProviderError::new(LlmProvider::Gemini, kind).into()
}

/// `{endpoint}/v1beta/models/{model}` with a `models/` prefix tolerated.
pub(crate) fn model_base_url(endpoint: &str, model: &str) -> String {
    let base = endpoint.trim().trim_end_matches('/');
    let model = model.trim().trim_start_matches("models/");
    format!("{base}/v1beta/models/{model}")
}

fn strip_query(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

/// Extracts `error.message` from a Gemini error body, if it has one.
pub(crate) fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
}

/// Parses a complete `generateContent` body into answer text.
fn parse_full_response(raw: &str) -> Result<String, ProviderErrorKind> {
    let resp: GenerateContentResponse = serde_json::from_str(raw).map_err(|e| {
        ProviderErrorKind::Decode(format!(
            "serde error: {e}; expected `candidates[0].content.parts[].text`"
        ))
    })?;
    resp.check()?;
    let text = resp.text();
    if text.is_empty() {
        return Err(ProviderErrorKind::EmptyResponse);
    }
    Ok(text)
}

/// Parses one SSE `data:` payload into the fragment it carries (may be empty).
fn parse_stream_chunk(data: &str) -> Result<String, ProviderErrorKind> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(String::new());
    }
    let resp: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| ProviderErrorKind::Decode(format!("SSE chunk: {e}")))?;
    if let Some(err) = resp.error {
        return Err(ProviderErrorKind::Stream(err.message));
    }
    resp.check()?;
    Ok(resp.text())
}

/* ===========================================================================
HTTP payloads
======================================================================== */

/// Request body shared by `generateContent` and `streamGenerateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl<'a> GenerateContentRequest<'a> {
    /// Builds a single-turn user request from config and `prompt`.
    fn from_cfg(cfg: &LlmModelConfig, prompt: &'a str) -> Self {
        let generation_config = GenerationConfig {
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_output_tokens: cfg.max_tokens,
        };
        let generation_config = (!generation_config.is_empty()).then_some(generation_config);

        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config,
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.top_p.is_none() && self.max_output_tokens.is_none()
    }
}

/// Response body (full answer or one streamed chunk).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiErrorBody>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Rejects blocked prompts and candidates stopped by safety filters.
    fn check(&self) -> Result<(), ProviderErrorKind> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(ProviderErrorKind::Blocked(reason.to_string()));
        }
        if let Some(first) = self.candidates.first() {
            let stopped_by_filter = matches!(
                first.finish_reason.as_deref(),
                Some("SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII")
            );
            if stopped_by_filter && self.text().is_empty() {
                let reason = first.finish_reason.clone().unwrap_or_default();
                return Err(ProviderErrorKind::Blocked(reason));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Gemini,
            model: "gemini-2.5-flash".into(),
            endpoint: "https://generativelanguage.googleapis.com/".into(),
            api_key: Some("k".into()),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn builds_model_urls() {
        assert_eq!(
            model_base_url("https://host/", "models/gemini-2.5-flash"),
            "https://host/v1beta/models/gemini-2.5-flash"
        );
        let svc = GeminiService::new(cfg()).unwrap();
        assert!(svc.url_stream.ends_with(":streamGenerateContent?alt=sse"));
        assert!(svc.url_generate.ends_with("gemini-2.5-flash:generateContent"));
    }

    #[test]
    fn rejects_missing_key_and_wrong_provider() {
        let mut c = cfg();
        c.api_key = None;
        assert!(matches!(
            GeminiService::new(c),
            Err(AiLlmError::Provider(ProviderError {
                kind: ProviderErrorKind::MissingApiKey,
                ..
            }))
        ));

        let mut c = cfg();
        c.provider = LlmProvider::Ollama;
        assert!(GeminiService::new(c).is_err());
    }

    #[test]
    fn request_omits_empty_generation_config() {
        let c = cfg();
        let body = serde_json::to_value(GenerateContentRequest::from_cfg(&c, "hi")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );

        let mut c = cfg();
        c.max_tokens = Some(256);
        let body = serde_json::to_value(GenerateContentRequest::from_cfg(&c, "hi")).unwrap();
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn full_response_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Punjab "},{"text":"and Haryana."}]},"finishReason":"STOP"}]}"#;
        assert_eq!(parse_full_response(raw).unwrap(), "Punjab and Haryana.");
    }

    #[test]
    fn full_response_reports_block_and_empty() {
        let blocked = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(
            parse_full_response(blocked),
            Err(ProviderErrorKind::Blocked(r)) if r == "SAFETY"
        ));
        let empty = r#"{"candidates":[]}"#;
        assert!(matches!(
            parse_full_response(empty),
            Err(ProviderErrorKind::EmptyResponse)
        ));
        assert!(matches!(
            parse_full_response("not json"),
            Err(ProviderErrorKind::Decode(_))
        ));
    }

    #[test]
    fn stream_chunk_may_be_empty_but_errors_are_terminal() {
        assert_eq!(parse_stream_chunk("").unwrap(), "");
        let usage_only = r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{}}"#;
        assert_eq!(parse_stream_chunk(usage_only).unwrap(), "");
        let chunk = r#"{"candidates":[{"content":{"parts":[{"text":"MSP is"}],"role":"model"}}]}"#;
        assert_eq!(parse_stream_chunk(chunk).unwrap(), "MSP is");
        let err = r#"{"error":{"code":429,"message":"quota exceeded"}}"#;
        assert!(matches!(
            parse_stream_chunk(err),
            Err(ProviderErrorKind::Stream(m)) if m == "quota exceeded"
        ));
    }

    #[test]
    fn extracts_error_message_from_body() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body).as_deref(), Some("API key not valid"));
        assert_eq!(error_message("<html>"), None);
    }
}
