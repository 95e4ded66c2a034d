//! Report document types shared across the engine.
//!
//! A report is the JSON document read from stdin (or returned by the external
//! query tool): a version header plus `checkouts`, `builds`, `tests`,
//! `issues`, and `incidents` arrays. Checkout/build/test objects carry
//! arbitrary schema fields, so they are kept as raw JSON objects behind the
//! [`Node`] wrapper instead of fixed structs.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::MatchError;

/// Schema version stamped on emitted documents.
pub const SCHEMA_VERSION_MAJOR: u64 = 4;
pub const SCHEMA_VERSION_MINOR: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub major: u64,
    pub minor: u64,
}

impl SchemaVersion {
    pub fn current() -> Self {
        Self {
            major: SCHEMA_VERSION_MAJOR,
            minor: SCHEMA_VERSION_MINOR,
        }
    }
}

/// One checkout, build, or test object, schema fields preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(transparent)]
pub struct Node(pub Map<String, Value>);

impl Node {
    pub fn value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn origin(&self) -> Option<&str> {
        self.str_field("origin")
    }

    pub fn checkout_id(&self) -> Option<&str> {
        self.str_field("checkout_id")
    }

    pub fn build_id(&self) -> Option<&str> {
        self.str_field("build_id")
    }

    pub fn log_excerpt(&self) -> Option<&str> {
        self.str_field("log_excerpt")
    }

    pub fn log_url(&self) -> Option<&str> {
        self.str_field("log_url")
    }
}

/// A known issue carrying a versioned identity and, optionally, a match
/// pattern under `misc.pattern_object`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misc: Option<Map<String, Value>>,
}

impl Issue {
    /// The raw pattern document, if the issue carries a non-empty one.
    pub fn pattern_object(&self) -> Option<&Value> {
        let value = self.misc.as_ref()?.get("pattern_object")?;
        match value {
            Value::Object(map) if map.is_empty() => None,
            Value::Null => None,
            other => Some(other),
        }
    }
}

/// The three constrainable report levels, parent levels first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Checkouts,
    Builds,
    Tests,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Checkouts, Level::Builds, Level::Tests];

    pub fn key(&self) -> &'static str {
        match self {
            Level::Checkouts => "checkouts",
            Level::Builds => "builds",
            Level::Tests => "tests",
        }
    }
}

/// A partial report-shaped template: per level, a mapping of field name to
/// regex string (or literal value for non-string fields).
///
/// Administrators submit each level as a JSON list for compatibility with the
/// report schema; only the head element is meaningful, so the list collapses
/// to a single optional mapping on read and is serialized back out as a
/// one-element list.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PatternObject {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "head_of_list",
        serialize_with = "singleton_list"
    )]
    pub checkouts: Option<Map<String, Value>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "head_of_list",
        serialize_with = "singleton_list"
    )]
    pub builds: Option<Map<String, Value>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "head_of_list",
        serialize_with = "singleton_list"
    )]
    pub tests: Option<Map<String, Value>>,
}

impl PatternObject {
    pub fn level(&self, level: Level) -> Option<&Map<String, Value>> {
        match level {
            Level::Checkouts => self.checkouts.as_ref(),
            Level::Builds => self.builds.as_ref(),
            Level::Tests => self.tests.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.checkouts.is_none() && self.builds.is_none() && self.tests.is_none()
    }

    /// Parses a raw `misc.pattern_object` value, reporting malformed
    /// structure against the owning issue.
    pub fn parse(issue_id: &str, value: &Value) -> Result<Self, MatchError> {
        serde_json::from_value(value.clone()).map_err(|err| MatchError::Pattern {
            issue_id: issue_id.to_string(),
            detail: err.to_string(),
        })
    }
}

fn head_of_list<'de, D>(deserializer: D) -> Result<Option<Map<String, Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(mut items)) => {
            if items.is_empty() {
                return Ok(None);
            }
            match items.remove(0) {
                Value::Object(map) => Ok(Some(map)),
                other => Err(D::Error::custom(format!(
                    "pattern level element must be an object, got {}",
                    value_kind(&other)
                ))),
            }
        }
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(D::Error::custom(format!(
            "pattern level must be a list or object, got {}",
            value_kind(&other)
        ))),
    }
}

fn singleton_list<S>(field: &Option<Map<String, Value>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match field {
        Some(map) => [map].serialize(serializer),
        None => serializer.serialize_none(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// A generated record asserting that a specific build or test is an
/// occurrence of a specific issue. Never persisted by this engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    pub id: String,
    pub origin: String,
    pub issue_id: String,
    pub issue_version: i64,
    pub present: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
}

/// A full report document. Emitted documents reuse the same type with only
/// `version` and `incidents` populated; empty arrays are skipped on output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub version: SchemaVersion,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checkouts: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub builds: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incidents: Vec<Incident>,
}

impl Report {
    pub fn incidents_only(incidents: Vec<Incident>) -> Self {
        Self {
            version: SchemaVersion::current(),
            checkouts: Vec::new(),
            builds: Vec::new(),
            tests: Vec::new(),
            issues: Vec::new(),
            incidents,
        }
    }

    /// A matchable report must carry at least one non-empty build or test.
    pub fn ensure_matchable(&self) -> Result<(), MatchError> {
        if self.builds.is_empty() && self.tests.is_empty() {
            return Err(MatchError::Schema(
                "report must contain at least one build or test".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the concrete chain this report describes: the first test, its
    /// build (by `build_id`), and the build's checkout (by `checkout_id`),
    /// falling back to first elements when parent links are absent.
    pub fn chain(&self) -> Chain<'_> {
        let test = self.tests.first();
        let build = test
            .and_then(Node::build_id)
            .and_then(|id| self.builds.iter().find(|b| b.id() == Some(id)))
            .or_else(|| self.builds.first());
        let checkout = build
            .and_then(Node::checkout_id)
            .and_then(|id| self.checkouts.iter().find(|c| c.id() == Some(id)))
            .or_else(|| self.checkouts.first());
        Chain {
            checkout,
            build,
            test,
        }
    }
}

/// One concrete (checkout, build, test) triple — the unit of matching.
#[derive(Debug, Clone, Copy)]
pub struct Chain<'a> {
    pub checkout: Option<&'a Node>,
    pub build: Option<&'a Node>,
    pub test: Option<&'a Node>,
}

/// Kind of the deepest node in a chain, used to pick the incident id field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Build,
    Test,
}

impl<'a> Chain<'a> {
    pub fn level(&self, level: Level) -> Option<&'a Node> {
        match level {
            Level::Checkouts => self.checkout,
            Level::Builds => self.build,
            Level::Tests => self.test,
        }
    }

    /// The deepest build/test node. Checkout-only chains have no subject and
    /// produce no incidents.
    pub fn subject(&self) -> Option<(&'a Node, SubjectKind)> {
        if let Some(test) = self.test {
            return Some((test, SubjectKind::Test));
        }
        self.build.map(|build| (build, SubjectKind::Build))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(value: Value) -> Report {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn pattern_levels_collapse_to_head_element() {
        let pattern: PatternObject = serde_json::from_value(json!({
            "checkouts": [{"tree_name": "next"}, {"tree_name": "ignored"}],
            "builds": [{"compiler": "gcc.*"}]
        }))
        .unwrap();
        let checkouts = pattern.checkouts.as_ref().unwrap();
        assert_eq!(checkouts.get("tree_name"), Some(&json!("next")));
        assert!(pattern.tests.is_none());
    }

    #[test]
    fn pattern_serializes_back_as_one_element_lists() {
        let pattern: PatternObject = serde_json::from_value(json!({
            "builds": [{"compiler": "gcc.*"}, {"compiler": "clang.*"}]
        }))
        .unwrap();
        let out = serde_json::to_value(&pattern).unwrap();
        assert_eq!(out, json!({"builds": [{"compiler": "gcc.*"}]}));
    }

    #[test]
    fn scalar_pattern_level_is_rejected() {
        let result: Result<PatternObject, _> =
            serde_json::from_value(json!({"builds": "gcc.*"}));
        assert!(result.is_err());
    }

    #[test]
    fn empty_pattern_object_on_issue_reads_as_absent() {
        let issue: Issue = serde_json::from_value(json!({
            "id": "X",
            "version": 1,
            "misc": {"pattern_object": {}}
        }))
        .unwrap();
        assert!(issue.pattern_object().is_none());
    }

    #[test]
    fn chain_follows_parent_links() {
        let doc = report(json!({
            "version": {"major": 4, "minor": 3},
            "checkouts": [
                {"id": "co:1", "origin": "lab"},
                {"id": "co:2", "origin": "lab"}
            ],
            "builds": [
                {"id": "b:1", "origin": "lab", "checkout_id": "co:2"}
            ],
            "tests": [
                {"id": "t:1", "origin": "lab", "build_id": "b:1"}
            ]
        }));
        let chain = doc.chain();
        assert_eq!(chain.test.unwrap().id(), Some("t:1"));
        assert_eq!(chain.build.unwrap().id(), Some("b:1"));
        assert_eq!(chain.checkout.unwrap().id(), Some("co:2"));
        let (node, kind) = chain.subject().unwrap();
        assert_eq!(kind, SubjectKind::Test);
        assert_eq!(node.id(), Some("t:1"));
    }

    #[test]
    fn build_only_report_is_matchable_and_has_build_subject() {
        let doc = report(json!({
            "version": {"major": 4, "minor": 3},
            "builds": [{"id": "b:1", "origin": "lab"}]
        }));
        doc.ensure_matchable().unwrap();
        let (_, kind) = doc.chain().subject().unwrap();
        assert_eq!(kind, SubjectKind::Build);
    }

    #[test]
    fn checkout_only_report_is_not_matchable() {
        let doc = report(json!({
            "version": {"major": 4, "minor": 3},
            "checkouts": [{"id": "co:1", "origin": "lab"}]
        }));
        assert!(doc.ensure_matchable().is_err());
    }

    #[test]
    fn incidents_only_document_skips_empty_arrays() {
        let doc = Report::incidents_only(vec![]);
        let out = serde_json::to_value(&doc).unwrap();
        assert_eq!(out, json!({"version": {"major": 4, "minor": 3}}));
    }
}
