//! External by-id chain resolution.
//!
//! Delegates to the external query tool (a black box reached over a database
//! connection string), asking for the node and its parents, and parses the
//! returned report. One resolution per invocation; nothing is cached.

use std::fmt;
use std::process::Command;

use crate::error::MatchError;
use crate::models::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIdKind {
    Build,
    Test,
}

impl NodeIdKind {
    fn flag(&self) -> &'static str {
        match self {
            NodeIdKind::Build => "-b",
            NodeIdKind::Test => "-t",
        }
    }
}

impl fmt::Display for NodeIdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeIdKind::Build => write!(f, "build"),
            NodeIdKind::Test => write!(f, "test"),
        }
    }
}

/// Resolves `node_id` into a full report (with parents) via the external
/// query tool. A missing node or a failing tool run is a [`MatchError::Lookup`].
pub fn resolve(
    command: &str,
    kind: NodeIdKind,
    node_id: &str,
    db_conn: &str,
) -> Result<Report, MatchError> {
    let output = Command::new(command)
        .arg(kind.flag())
        .arg(node_id)
        .arg("-d")
        .arg(db_conn)
        .arg("--parents")
        .output()
        .map_err(|err| MatchError::Lookup(format!("failed to run {}: {}", command, err)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MatchError::Lookup(format!(
            "{} exited with {}: {}",
            command,
            output.status,
            stderr.trim()
        )));
    }

    let report: Report = serde_json::from_slice(&output.stdout)
        .map_err(|err| MatchError::Schema(format!("query tool output: {}", err)))?;

    let found = match kind {
        NodeIdKind::Build => report.builds.iter().any(|n| n.id() == Some(node_id)),
        NodeIdKind::Test => report.tests.iter().any(|n| n.id() == Some(node_id)),
    };
    if !found {
        return Err(MatchError::Lookup(format!(
            "no {} with id {}",
            kind, node_id
        )));
    }

    Ok(report)
}
