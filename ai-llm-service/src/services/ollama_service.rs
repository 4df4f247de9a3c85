//! Lightweight Ollama service for local text generation.
//!
//! - single answer: `POST {endpoint}/api/generate` with `stream=false`
//! - NDJSON fragments: `POST {endpoint}/api/generate` with `stream=true`
//!
//! It uses the universal configuration [`LlmModelConfig`] and ensures
//! that the selected provider is [`LlmProvider::Ollama`].

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, instrument, warn};

use crate::config::default_config::DEFAULT_TIMEOUT_SECS;
use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HttpError, ProviderError, ProviderErrorKind, make_snippet};
use crate::generator::FragmentStream;

const FRAGMENT_BUFFER: usize = 64;

/// Thin client for Ollama.
///
/// Initialized with a full [`LlmModelConfig`]. Reuses an HTTP client with
/// a configurable timeout.
#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    timeout: Duration,
    url_generate: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is not `Ollama`
    /// - `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(provider_err(ProviderErrorKind::InvalidProvider));
        }

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

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        let url_generate = format!("{}/api/generate", endpoint.trim_end_matches('/'));

        Ok(Self {
            client,
            cfg,
            timeout,
            url_generate,
        })
    }

    /// Performs a **non-streaming** generation request via `/api/generate`.
    ///
    /// # Errors
    /// - `HttpStatus` for non-2xx responses
    /// - [`AiLlmError::Timeout`] / [`AiLlmError::HttpTransport`] for client errors
    /// - `Decode` if response cannot be parsed
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        let resp = self.post(prompt, false).await?;

        let out: GenerateResponse = resp.json().await.map_err(|e| {
            provider_err(ProviderErrorKind::Decode(format!(
                "serde error: {e}; ensure `stream=false` is used"
            )))
        })?;

        if let Some(err) = out.error {
            return Err(provider_err(ProviderErrorKind::Stream(err)));
        }
        Ok(out.response)
    }

    /// Streams NDJSON chunks from `/api/generate` as fragments.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, AiLlmError> {
        let resp = self.post(prompt, true).await?;

        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        tokio::spawn(pump_lines(resp, tx));

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn post(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, AiLlmError> {
        let body = GenerateRequest::from_cfg(&self.cfg, prompt, stream);

        debug!(stream, "POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiLlmError::Timeout(self.timeout)
                } else {
                    AiLlmError::HttpTransport(e)
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_generate.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            return Err(provider_err(ProviderErrorKind::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })));
        }

        Ok(resp)
    }
}

/// Splits the response body into NDJSON lines and forwards their text.
async fn pump_lines(resp: reqwest::Response, tx: mpsc::Sender<Result<String, AiLlmError>>) {
    let mut body = resp.bytes_stream();
    let mut lines = LineBuffer::default();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(b) => b,
            Err(e) => {
                let _ = tx
                    .send(Err(provider_err(ProviderErrorKind::Stream(e.to_string()))))
                    .await;
                return;
            }
        };

        for line in lines.push(&bytes) {
            match parse_line(&line) {
                Ok(LineOutcome::Fragment(text)) => {
                    if tx.send(Ok(text)).await.is_err() {
                        debug!("fragment consumer dropped; stopping stream");
                        return;
                    }
                }
                Ok(LineOutcome::Skip) => {}
                Ok(LineOutcome::Done) => return,
                Err(kind) => {
                    warn!(error = %kind, "Ollama stream ended with error");
                    let _ = tx.send(Err(provider_err(kind))).await;
                    return;
                }
            }
        }
    }

    if let Some(rest) = lines.finish() {
        if let Ok(LineOutcome::Fragment(text)) = parse_line(&rest) {
            let _ = tx.send(Ok(text)).await;
        }
    }
}

fn provider_err(kind: ProviderErrorKind) -> AiLlmError {
    ProviderError::new(LlmProvider::Ollama, kind).into()
}

/// Accumulates raw bytes and yields complete `\n`-terminated lines.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line).trim().to_string();
            if !line.is_empty() {
                out.push(line);
            }
        }
        out
    }

    fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buf).trim().to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

#[derive(Debug, PartialEq)]
enum LineOutcome {
    Fragment(String),
    Skip,
    Done,
}

fn parse_line(line: &str) -> Result<LineOutcome, ProviderErrorKind> {
    let chunk: StreamChunk = serde_json::from_str(line)
        .map_err(|e| ProviderErrorKind::Decode(format!("NDJSON line: {e}")))?;
    if let Some(err) = chunk.error {
        return Err(ProviderErrorKind::Stream(err));
    }
    if !chunk.response.is_empty() {
        return Ok(LineOutcome::Fragment(chunk.response));
    }
    if chunk.done {
        Ok(LineOutcome::Done)
    } else {
        Ok(LineOutcome::Skip)
    }
}

/* ==========================
HTTP payloads & options
========================== */

/// Request body for `/api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

impl<'a> GenerateRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str, stream: bool) -> Self {
        let options = GenerateOptions {
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            num_predict: cfg.max_tokens,
        };

        Self {
            model: &cfg.model,
            prompt,
            stream,
            options: Some(options),
        }
    }
}

/// Subset of Ollama `options`.
#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response body for `/api/generate` (non-streaming).
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    error: Option<String>,
}

/// One NDJSON line of a streamed `/api/generate` response.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_handles_split_lines() {
        let mut lb = LineBuffer::default();
        assert!(lb.push(b"{\"response\":\"Wh").is_empty());
        let lines = lb.push(b"eat\"}\n{\"response\":\"!\"}\n{\"done\"");
        assert_eq!(lines, vec![r#"{"response":"Wheat"}"#, r#"{"response":"!"}"#]);
        assert_eq!(lb.finish().as_deref(), Some(r#"{"done""#));
    }

    #[test]
    fn parses_ndjson_lines() {
        assert_eq!(
            parse_line(r#"{"model":"m","response":"Rabi","done":false}"#).unwrap(),
            LineOutcome::Fragment("Rabi".into())
        );
        assert_eq!(
            parse_line(r#"{"model":"m","response":"","done":true}"#).unwrap(),
            LineOutcome::Done
        );
        assert_eq!(
            parse_line(r#"{"response":"","done":false}"#).unwrap(),
            LineOutcome::Skip
        );
        assert!(matches!(
            parse_line(r#"{"error":"model not found"}"#),
            Err(ProviderErrorKind::Stream(m)) if m == "model not found"
        ));
    }

    #[test]
    fn rejects_gemini_config() {
        let cfg = LlmModelConfig {
            provider: LlmProvider::Gemini,
            model: "m".into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
        };
        assert!(OllamaService::new(cfg).is_err());
    }
}
