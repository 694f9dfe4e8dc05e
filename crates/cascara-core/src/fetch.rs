use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque capability token naming a retrieval strategy.
///
/// The dispatcher never interprets these beyond ordering; well-known
/// values ("http", "browser") are defined by whichever registry is
/// plugged in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(pub String);

impl StrategyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StrategyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StrategyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Default for StrategyId {
    fn default() -> Self {
        Self(String::new())
    }
}

/// Result of a single fetch attempt, produced by one strategy.
///
/// A completed HTTP exchange is an outcome even when the status code is
/// an error — the classifier judges status codes. `error` is set only
/// when the attempt itself failed to complete (DNS, connect, timeout).
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchOutcome {
    pub strategy: StrategyId,
    pub status_code: Option<u16>,
    pub body: String,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

impl FetchOutcome {
    /// An attempt that never produced content (transport failure).
    pub fn failed(strategy: StrategyId, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            strategy,
            status_code: None,
            body: String::new(),
            elapsed_ms,
            error: Some(error.into()),
        }
    }

    /// True if the attempt failed to complete or carried no content.
    pub fn is_transport_failure(&self) -> bool {
        self.error.is_some() || self.body.is_empty()
    }

    /// Content length in characters.
    pub fn content_len(&self) -> usize {
        self.body.chars().count()
    }
}
