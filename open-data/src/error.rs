//! Errors for the data.gov.in client.
//!
//! Messages carry the `[Open Data]` suffix so they are easy to attribute in logs.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpenDataError>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OpenDataError {
    /// An environment variable was set to something unusable.
    #[error("[Open Data] invalid value in {var}: {reason}")]
    Config {
        var: &'static str,
        reason: &'static str,
    },

    /// The portal answered with a non-200 status.
    #[error("[Open Data] HTTP {status}: {snippet}")]
    HttpStatus { status: StatusCode, snippet: String },

    /// Connection, TLS or timeout failure.
    #[error("[Open Data] transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body was not valid JSON.
    #[error("[Open Data] decode error: {0}")]
    Decode(String),
}

const SNIPPET_CHARS: usize = 200;

pub(crate) fn make_snippet(text: &str) -> String {
    let trimmed = text.trim();
    let mut out: String = trimmed.chars().take(SNIPPET_CHARS).collect();
    if trimmed.chars().count() > SNIPPET_CHARS {
        out.push('…');
    }
    out
}
