//! Matching orchestration over candidate patterns.
//!
//! Candidates come either from the pattern store or from the input document's
//! own `issues` array. A candidate that fails to compile is reported with its
//! issue id and skipped; the remaining candidates still run. Every candidate
//! is evaluated — a chain may match zero, one, or many issues.

use crate::logs;
use crate::models::{Issue, Report};
use crate::patterns::{CompiledPattern, Evaluation};
use crate::store::PatternRecord;

/// One matched issue identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchHit {
    pub issue_id: String,
    pub issue_version: i64,
}

/// Compiles stored records into candidates, skipping (and reporting) any
/// whose persisted pattern no longer parses or compiles.
pub fn candidates_from_records(records: &[PatternRecord]) -> Vec<CompiledPattern> {
    let mut candidates = Vec::new();
    for record in records {
        let result = serde_json::from_str(&record.pattern_object)
            .map_err(|err| crate::error::MatchError::Pattern {
                issue_id: record.issue_id.clone(),
                detail: err.to_string(),
            })
            .and_then(|pattern| {
                CompiledPattern::compile(&record.issue_id, record.issue_version, &pattern)
            });
        match result {
            Ok(candidate) => candidates.push(candidate),
            Err(err) => eprintln!("skipping stored pattern: {}", err),
        }
    }
    candidates
}

/// Compiles inline candidates from an `issues` array; issues without a
/// pattern impose no constraint and are silently skipped.
pub fn candidates_from_issues(issues: &[Issue]) -> Vec<CompiledPattern> {
    let mut candidates = Vec::new();
    for issue in issues {
        let Some(raw) = issue.pattern_object() else {
            continue;
        };
        let result = crate::models::PatternObject::parse(&issue.id, raw)
            .and_then(|pattern| CompiledPattern::compile(&issue.id, issue.version, &pattern));
        match result {
            Ok(candidate) => candidates.push(candidate),
            Err(err) => eprintln!("skipping inline pattern: {}", err),
        }
    }
    candidates
}

/// Evaluates every candidate against the report's chain and collects all
/// matches. Pending log checks fetch the full log; a fetch failure counts as
/// a non-match for that candidate only.
pub async fn run_match(report: &Report, candidates: &[CompiledPattern]) -> Vec<MatchHit> {
    let chain = report.chain();
    let mut hits = Vec::new();

    for candidate in candidates {
        let matched = match candidate.evaluate(&chain) {
            Evaluation::Match => true,
            Evaluation::NoMatch => false,
            Evaluation::LogPending { regex, url } => match logs::fetch_log(url).await {
                Ok(Some(text)) => regex.is_match(&text),
                Ok(None) => false,
                Err(err) => {
                    eprintln!(
                        "log fetch failed for issue {}: {}",
                        candidate.issue_id, err
                    );
                    false
                }
            },
        };
        if matched {
            hits.push(MatchHit {
                issue_id: candidate.issue_id.clone(),
                issue_version: candidate.issue_version,
            });
        }
    }

    hits
}
