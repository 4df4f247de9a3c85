//! HTTP client for the data.gov.in datastore.
//!
//! [`OpenDataClient::try_fetch`] is strict and returns typed errors.
//! [`OpenDataClient::fetch_datasets`] never fails: errors and non-200
//! answers become a [`DatasetsPayload::Fallback`] with sample topics.

use std::time::Instant;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::OpenDataConfig;
use crate::error::{OpenDataError, Result, make_snippet};

/// Topics listed when live data is unavailable.
pub const SAMPLE_TOPICS: &[&str] = &[
    "Agricultural Production",
    "Climate Data",
    "Crop Prices",
    "Rainfall Patterns",
    "Soil Health",
];

/// Topics kept in the fallback produced after a transport or decode error.
const ERROR_TOPICS: usize = 3;

/// What `GET /datasets` returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DatasetsPayload {
    /// Portal JSON passed through unchanged.
    Live(Value),
    Fallback(FallbackPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sample_topics: Vec<String>,
}

impl FallbackPayload {
    /// The portal answered, but not with 200 (usually a missing key).
    pub fn unavailable() -> Self {
        Self {
            message: "Sample datasets endpoint".into(),
            note: Some("Configure DATA_GOV_API_KEY for live data access".into()),
            error: None,
            sample_topics: SAMPLE_TOPICS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// The request itself failed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            message: "Datasets endpoint".into(),
            note: None,
            error: Some(error.into()),
            sample_topics: SAMPLE_TOPICS[..ERROR_TOPICS]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

struct Cached {
    at: Instant,
    body: Value,
}

pub struct OpenDataClient {
    cfg: OpenDataConfig,
    http: reqwest::Client,
    cache: RwLock<Option<Cached>>,
}

impl OpenDataClient {
    /// # Errors
    /// [`OpenDataError::Transport`] if the HTTP client cannot be built.
    pub fn new(cfg: OpenDataConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        info!(
            endpoint = %cfg.endpoint,
            resource_id = %cfg.resource_id,
            timeout_secs = cfg.timeout.as_secs(),
            cache_ttl_secs = cfg.cache_ttl.as_secs(),
            "OpenDataClient initialized"
        );
        Ok(Self {
            cfg,
            http,
            cache: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &OpenDataConfig {
        &self.cfg
    }

    /// Single GET against the datastore.
    ///
    /// # Errors
    /// - [`OpenDataError::HttpStatus`] for any status other than 200
    /// - [`OpenDataError::Transport`] for connection failures and timeouts
    /// - [`OpenDataError::Decode`] when the body is not JSON
    pub async fn try_fetch(&self) -> Result<Value> {
        let limit = self.cfg.limit.to_string();
        let params = [
            ("resource_id", self.cfg.resource_id.as_str()),
            ("api-key", self.cfg.api_key.as_str()),
            ("limit", limit.as_str()),
        ];

        let start = Instant::now();
        let resp = self
            .http
            .get(&self.cfg.endpoint)
            .query(&params)
            .send()
            .await?;
        let status = resp.status();
        debug!(%status, latency_ms = start.elapsed().as_millis(), "datastore responded");

        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(OpenDataError::HttpStatus {
                status,
                snippet: make_snippet(&body),
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| OpenDataError::Decode(e.to_string()))
    }

    /// Resilient fetch for `GET /datasets`. Live payloads are cached for
    /// `cache_ttl`; fallbacks are never cached.
    pub async fn fetch_datasets(&self) -> DatasetsPayload {
        if let Some(body) = self.cached().await {
            debug!("serving datasets from cache");
            return DatasetsPayload::Live(body);
        }

        match self.try_fetch().await {
            Ok(body) => {
                if !self.cfg.cache_ttl.is_zero() {
                    *self.cache.write().await = Some(Cached {
                        at: Instant::now(),
                        body: body.clone(),
                    });
                }
                DatasetsPayload::Live(body)
            }
            Err(OpenDataError::HttpStatus { status, snippet }) => {
                warn!(%status, %snippet, "datastore returned non-200, serving sample topics");
                DatasetsPayload::Fallback(FallbackPayload::unavailable())
            }
            Err(e) => {
                warn!(error = %e, "datastore request failed, serving sample topics");
                DatasetsPayload::Fallback(FallbackPayload::failed(e.to_string()))
            }
        }
    }

    async fn cached(&self) -> Option<Value> {
        let guard = self.cache.read().await;
        guard
            .as_ref()
            .filter(|c| c.at.elapsed() < self.cfg.cache_ttl)
            .map(|c| c.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::extract::{Query, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    use super::*;

    #[derive(Clone, Copy)]
    enum Mode {
        Ok,
        Unavailable,
        Garbage,
    }

    #[derive(Clone)]
    struct Stub {
        mode: Mode,
        hits: Arc<AtomicUsize>,
    }

    async fn handler(
        State(stub): State<Stub>,
        Query(q): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        stub.hits.fetch_add(1, Ordering::SeqCst);
        match stub.mode {
            Mode::Ok => Json(serde_json::json!({
                "status": "ok",
                "resource_id": q.get("resource_id"),
                "limit": q.get("limit"),
                "records": [{"commodity": "Onion"}],
            }))
            .into_response(),
            Mode::Unavailable => (AxumStatus::FORBIDDEN, "key not authorised").into_response(),
            Mode::Garbage => (AxumStatus::OK, "<html>not json</html>").into_response(),
        }
    }

    async fn serve(mode: Mode) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/resource.json", get(handler))
            .with_state(Stub {
                mode,
                hits: hits.clone(),
            });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/resource.json"), hits)
    }

    fn client(endpoint: String, ttl: Duration) -> OpenDataClient {
        OpenDataClient::new(OpenDataConfig {
            endpoint,
            timeout: Duration::from_secs(2),
            cache_ttl: ttl,
            ..OpenDataConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn live_payload_passes_through_with_query() {
        let (url, _) = serve(Mode::Ok).await;
        let payload = client(url, Duration::ZERO).fetch_datasets().await;

        let DatasetsPayload::Live(body) = payload else {
            panic!("expected live payload");
        };
        assert_eq!(body["resource_id"], crate::config::DEFAULT_RESOURCE_ID);
        assert_eq!(body["limit"], "10");
    }

    #[tokio::test]
    async fn non_200_yields_five_sample_topics() {
        let (url, _) = serve(Mode::Unavailable).await;
        let c = client(url, Duration::ZERO);

        assert!(matches!(
            c.try_fetch().await,
            Err(OpenDataError::HttpStatus { status, .. }) if status == StatusCode::FORBIDDEN
        ));

        let payload = c.fetch_datasets().await;
        assert_eq!(payload, DatasetsPayload::Fallback(FallbackPayload::unavailable()));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["message"], "Sample datasets endpoint");
        assert_eq!(json["sample_topics"].as_array().unwrap().len(), 5);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn malformed_json_yields_error_fallback() {
        let (url, _) = serve(Mode::Garbage).await;
        let payload = client(url, Duration::ZERO).fetch_datasets().await;

        let DatasetsPayload::Fallback(fb) = payload else {
            panic!("expected fallback");
        };
        assert_eq!(fb.message, "Datasets endpoint");
        assert!(fb.error.is_some_and(|e| e.contains("decode")));
        assert_eq!(fb.sample_topics, ["Agricultural Production", "Climate Data", "Crop Prices"]);
    }

    #[tokio::test]
    async fn unreachable_host_yields_error_fallback() {
        let c = client("http://127.0.0.1:1/resource.json".into(), Duration::ZERO);
        let payload = c.fetch_datasets().await;

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["message"], "Datasets endpoint");
        assert!(!json["error"].as_str().unwrap().is_empty());
        assert_eq!(json["sample_topics"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn live_payload_is_cached_within_ttl() {
        let (url, hits) = serve(Mode::Ok).await;
        let c = client(url, Duration::from_secs(60));

        let first = c.fetch_datasets().await;
        let second = c.fetch_datasets().await;

        assert_eq!(first, second);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fallbacks_are_not_cached() {
        let (url, hits) = serve(Mode::Unavailable).await;
        let c = client(url, Duration::from_secs(60));

        c.fetch_datasets().await;
        c.fetch_datasets().await;

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
