//! Incident document generation.
//!
//! Converts matched issue identities into schema-compliant incident records
//! against the chain's deepest build or test. Incident ids are derived from
//! the issue identity and the subject node id, so regenerating incidents for
//! the same match yields the same id.

use sha2::{Digest, Sha256};

use crate::matcher::MatchHit;
use crate::models::{Chain, Incident, Report, SubjectKind};

/// Builds one incident for a matched issue, or `None` for a checkout-only
/// chain (incidents are defined only against builds and tests).
pub fn incident_for(
    default_origin: &str,
    issue_id: &str,
    issue_version: i64,
    chain: &Chain,
) -> Option<Incident> {
    let (node, kind) = chain.subject()?;
    let node_id = node.id()?;
    let origin = node.origin().unwrap_or(default_origin);

    let mut hasher = Sha256::new();
    hasher.update(issue_id.as_bytes());
    hasher.update(issue_version.to_string().as_bytes());
    hasher.update(node_id.as_bytes());
    let id = format!("{}:{:x}", origin, hasher.finalize());

    let (build_id, test_id) = match kind {
        SubjectKind::Build => (Some(node_id.to_string()), None),
        SubjectKind::Test => (None, Some(node_id.to_string())),
    };

    Some(Incident {
        id,
        origin: origin.to_string(),
        issue_id: issue_id.to_string(),
        issue_version,
        present: true,
        build_id,
        test_id,
    })
}

/// Renders all matches into an incidents-only document fragment suitable for
/// merging into a larger submission.
pub fn emit(default_origin: &str, hits: &[MatchHit], chain: &Chain) -> Report {
    let incidents = hits
        .iter()
        .filter_map(|hit| incident_for(default_origin, &hit.issue_id, hit.issue_version, chain))
        .collect();
    Report::incidents_only(incidents)
}
