//! Pattern ingestion from issue-update documents.
//!
//! Walks the document's `issues` array in order: an issue carrying a
//! non-empty `misc.pattern_object` replaces its stored pattern, any other
//! issue withdraws it. Later entries for the same issue id overwrite earlier
//! ones within a batch. Malformed patterns are collected and reported without
//! aborting the rest of the batch; store failures are fatal.

use crate::error::MatchError;
use crate::models::{PatternObject, Report};
use crate::patterns::CompiledPattern;
use crate::store::PatternStore;

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub seen: u64,
    pub upserted: u64,
    pub deleted: u64,
    pub failures: Vec<MatchError>,
}

pub async fn update_patterns(
    store: &PatternStore,
    report: &Report,
) -> Result<IngestSummary, MatchError> {
    let mut summary = IngestSummary::default();

    for issue in &report.issues {
        summary.seen += 1;
        let Some(raw) = issue.pattern_object() else {
            store.delete(&issue.id).await?;
            summary.deleted += 1;
            continue;
        };

        match normalize(&issue.id, issue.version, raw) {
            Ok(serialized) => {
                store.upsert(&issue.id, issue.version, &serialized).await?;
                summary.upserted += 1;
            }
            Err(err) => summary.failures.push(err),
        }
    }

    Ok(summary)
}

/// Parses and compile-checks a raw pattern so bad regexes are rejected at
/// ingestion time, then serializes the normalized (head-only) form for
/// storage.
fn normalize(
    issue_id: &str,
    issue_version: i64,
    raw: &serde_json::Value,
) -> Result<String, MatchError> {
    let pattern = PatternObject::parse(issue_id, raw)?;
    CompiledPattern::compile(issue_id, issue_version, &pattern)?;
    serde_json::to_string(&pattern).map_err(|err| MatchError::Pattern {
        issue_id: issue_id.to_string(),
        detail: err.to_string(),
    })
}
