//! Client for the data.gov.in open-data portal.
//!
//! Used by `GET /datasets`. The portal is optional: without a key (or
//! without network) callers still get a well-formed payload listing sample
//! topics.

pub mod client;
pub mod config;
pub mod error;

pub use client::{DatasetsPayload, FallbackPayload, OpenDataClient, SAMPLE_TOPICS};
pub use config::OpenDataConfig;
pub use error::{OpenDataError, Result};
