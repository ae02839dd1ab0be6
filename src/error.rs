// src/error.rs
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Network-level failure (DNS, refused connection, timeout).
    /// Never retried by this crate; surfaces immediately.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// A required element was absent from a parsed page. Means the page
    /// structure no longer matches what the extractor expects, so no
    /// default is substituted.
    #[error("missing expected element: {0}")]
    MissingElement(String),

    #[error("malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },

    /// Invalid combination of crawl-time settings. Raised at construction.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("login failed: {0}")]
    Auth(String),

    /// Only reachable when a finite retry limit is configured; with the
    /// default unbounded policy the rate-limit loop never errors.
    #[error("still rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// A tag merge chain looped back on itself (A merged into B merged
    /// into A). Detected per resolution call via a visited set.
    #[error("tag merge cycle detected at {0:?}")]
    TagCycle(String),

    #[error("tag cache: {0}")]
    Cache(#[from] std::io::Error),

    #[error("tag cache format: {0}")]
    CacheFormat(#[from] serde_json::Error),
}
