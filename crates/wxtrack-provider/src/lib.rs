//! Open-Meteo provider client
//!
//! One process-wide client serves both the refresh loop and request
//! handlers. It retries transient failures with exponential backoff, bounds
//! every call with an overall timeout, and keeps successful responses in a
//! short-lived cache.

pub mod cache;
pub mod open_meteo;
pub mod retry;

pub use cache::ResponseCache;
pub use open_meteo::*;
pub use retry::RetryConfig;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Failed to decode provider response: {0}")]
    Decode(String),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
