//! Error taxonomy for the matching engine.
//!
//! Per-issue and per-pattern failures are reported and skipped by the
//! callers; [`MatchError::Storage`] and [`MatchError::Lookup`] are fatal for
//! the whole invocation since no meaningful partial result exists without
//! the store or the resolved chain.

use std::fmt;

#[derive(Debug)]
pub enum MatchError {
    /// Input document does not conform to the expected report shape.
    Schema(String),
    /// A stored or inline pattern contains an invalid regex or malformed
    /// structure. Carries the offending issue id so administrators can find
    /// and fix the pattern.
    Pattern { issue_id: String, detail: String },
    /// Pattern store I/O failure.
    Storage(String),
    /// By-id resolution found no matching node.
    Lookup(String),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::Schema(detail) => write!(f, "invalid report document: {}", detail),
            MatchError::Pattern { issue_id, detail } => {
                write!(f, "bad pattern for issue {}: {}", issue_id, detail)
            }
            MatchError::Storage(detail) => write!(f, "pattern store failure: {}", detail),
            MatchError::Lookup(detail) => write!(f, "lookup failed: {}", detail),
        }
    }
}

impl std::error::Error for MatchError {}

impl From<sqlx::Error> for MatchError {
    fn from(err: sqlx::Error) -> Self {
        MatchError::Storage(err.to_string())
    }
}
