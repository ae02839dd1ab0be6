// src/params.rs
use std::path::PathBuf;

pub const DEFAULT_ROOT: &str = "https://archiveofourown.org";

/// Minimum wall-clock gap between any two requests, in milliseconds.
pub const FETCH_INTERVAL_MS: u64 = 1_500;

/// Cooldown after the archive answers with its rate-limit body, in seconds.
/// Deliberately much longer than the regular fetch interval.
pub const RATE_LIMIT_COOLDOWN_SECS: u64 = 20;

/// The archive signals rate limiting with this body prefix only.
/// No status code or header is consulted for this condition.
pub const RATE_LIMIT_SENTINEL: &str = "Retry later";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Query {
    Search,
    TaggedWorks,
}

#[derive(Clone)]
pub struct Params {
    pub query: Query,                    // search terms vs one tag's works
    pub terms: Vec<(String, String)>,    // work_search key=value pairs
    pub tag: Option<String>,             // tag whose works to list
    pub root: String,                    // archive base URL
    pub interval_ms: u64,                // minimum inter-request gap
    pub cooldown_secs: u64,              // rate-limit cooldown
    pub retry_limit: Option<u32>,        // None = retry rate limits forever
    pub tag_cache: Option<PathBuf>,      // JSON cache for resolved tags
    pub resolve: bool,                   // auto-resolve tags while listing
    pub limit: Option<usize>,            // stop after N works
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Params {
    pub fn new() -> Self {
        Self {
            query: Query::Search,
            terms: Vec::new(),
            tag: None,
            root: DEFAULT_ROOT.to_string(),
            interval_ms: FETCH_INTERVAL_MS,
            cooldown_secs: RATE_LIMIT_COOLDOWN_SECS,
            retry_limit: None,
            tag_cache: None,
            resolve: false,
            limit: None,
            username: None,
            password: None,
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}
