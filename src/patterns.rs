//! Pattern compilation and chain evaluation.
//!
//! Patterns are compiled once per load — every regex in the document is built
//! up front and reused for each chain evaluated, and a malformed regex
//! surfaces as a [`MatchError::Pattern`] naming the issue and field instead
//! of a silent non-match.

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::MatchError;
use crate::extract;
use crate::models::{Chain, Level, Node, PatternObject};

/// Special pattern field matched against a node's log rather than a schema
/// field. Excluded from ordinary field comparison.
const LOG_REGEX_FIELD: &str = "log_regex";

/// A pattern ready to evaluate: per constrained level, the flattened field
/// rules plus a spec tree for reading the corresponding chain node.
#[derive(Debug)]
pub struct CompiledPattern {
    pub issue_id: String,
    pub issue_version: i64,
    levels: Vec<CompiledLevel>,
}

#[derive(Debug)]
struct CompiledLevel {
    level: Level,
    spec_tree: Value,
    rules: Vec<FieldRule>,
    log_regex: Option<Regex>,
}

#[derive(Debug)]
struct FieldRule {
    path: Vec<String>,
    matcher: Matcher,
}

/// String pattern values compare as regexes, anything else as a literal.
#[derive(Debug)]
enum Matcher {
    Search(Regex),
    Literal(Value),
}

impl Matcher {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Matcher::Search(regex), Value::String(s)) => regex.is_match(s),
            (Matcher::Search(_), _) => false,
            (Matcher::Literal(expected), actual) => expected == actual,
        }
    }
}

/// Outcome of evaluating one pattern against one chain.
pub enum Evaluation<'a> {
    Match,
    NoMatch,
    /// Every field rule passed but a `log_regex` still needs the full log
    /// from `url`; the excerpt alone was absent or did not match.
    LogPending { regex: &'a Regex, url: &'a str },
}

impl CompiledPattern {
    pub fn compile(
        issue_id: &str,
        issue_version: i64,
        pattern: &PatternObject,
    ) -> Result<Self, MatchError> {
        let mut levels = Vec::new();
        for level in Level::ALL {
            if let Some(element) = pattern.level(level) {
                levels.push(CompiledLevel::compile(issue_id, level, element)?);
            }
        }
        Ok(Self {
            issue_id: issue_id.to_string(),
            issue_version,
            levels,
        })
    }

    /// Checks the chain against every constrained level, parents first,
    /// stopping at the first failing level.
    ///
    /// A level the pattern constrains but the chain lacks fails the match: a
    /// pattern that says something about builds cannot match a chain that
    /// has no build.
    pub fn evaluate<'a>(&'a self, chain: &Chain<'a>) -> Evaluation<'a> {
        for compiled in &self.levels {
            let Some(node) = chain.level(compiled.level) else {
                return Evaluation::NoMatch;
            };
            if !compiled.fields_match(node) {
                return Evaluation::NoMatch;
            }
        }
        // Deepest log_regex wins; shallower ones are ignored once it is
        // present, mirroring the per-level precedence of field rules.
        for compiled in self.levels.iter().rev() {
            let Some(regex) = &compiled.log_regex else {
                continue;
            };
            let Some(node) = chain.level(compiled.level) else {
                return Evaluation::NoMatch;
            };
            if let Some(excerpt) = node.log_excerpt() {
                if regex.is_match(excerpt) {
                    return Evaluation::Match;
                }
            }
            if let Some(url) = node.log_url() {
                return Evaluation::LogPending { regex, url };
            }
            return Evaluation::NoMatch;
        }
        Evaluation::Match
    }
}

impl CompiledLevel {
    fn compile(
        issue_id: &str,
        level: Level,
        element: &Map<String, Value>,
    ) -> Result<Self, MatchError> {
        let mut rules = Vec::new();
        let mut log_regex = None;
        let mut spec_tree = Map::new();

        for (path, value) in flatten(element) {
            if path.len() == 1 && path[0] == LOG_REGEX_FIELD {
                let source = value.as_str().ok_or_else(|| MatchError::Pattern {
                    issue_id: issue_id.to_string(),
                    detail: format!("{}.log_regex must be a string", level.key()),
                })?;
                log_regex = Some(compile_regex(issue_id, level, &path, source)?);
                continue;
            }
            let matcher = match value {
                Value::String(source) => {
                    Matcher::Search(compile_regex(issue_id, level, &path, source)?)
                }
                other => Matcher::Literal(other.clone()),
            };
            mark(&mut spec_tree, &path);
            rules.push(FieldRule {
                path: path.iter().map(|s| s.to_string()).collect(),
                matcher,
            });
        }

        Ok(Self {
            level,
            spec_tree: Value::Object(spec_tree),
            rules,
            log_regex,
        })
    }

    /// Every field rule must find a matching value in the node. Missing
    /// fields fail the rule; repeated paths (list recursion) pass if any
    /// extracted value matches.
    fn fields_match(&self, node: &Node) -> bool {
        let found = extract::extract(&self.spec_tree, &node.value());
        self.rules.iter().all(|rule| {
            found
                .iter()
                .any(|(path, value)| path == &rule.path && rule.matcher.matches(value))
        })
    }
}

/// Flattens a pattern level into leaf `(path, value)` pairs, descending
/// nested mappings so nested scalar fields can be constrained.
fn flatten(element: &Map<String, Value>) -> Vec<(Vec<&str>, &Value)> {
    let mut out = Vec::new();
    for (key, value) in element {
        match value {
            Value::Object(nested) => {
                for (mut path, leaf) in flatten(nested) {
                    path.insert(0, key.as_str());
                    out.push((path, leaf));
                }
            }
            leaf => out.push((vec![key.as_str()], leaf)),
        }
    }
    out
}

fn mark(tree: &mut Map<String, Value>, path: &[&str]) {
    match path {
        [] => {}
        [leaf] => {
            tree.insert(leaf.to_string(), extract::LEAF);
        }
        [head, rest @ ..] => {
            let entry = tree
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(nested) = entry {
                mark(nested, rest);
            }
        }
    }
}

fn compile_regex(
    issue_id: &str,
    level: Level,
    path: &[&str],
    source: &str,
) -> Result<Regex, MatchError> {
    Regex::new(source).map_err(|err| MatchError::Pattern {
        issue_id: issue_id.to_string(),
        detail: format!("invalid regex for field `{}.{}`: {}", level.key(), path.join("."), err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Report;
    use serde_json::json;

    fn pattern(value: Value) -> PatternObject {
        serde_json::from_value(value).unwrap()
    }

    fn compiled(value: Value) -> CompiledPattern {
        CompiledPattern::compile("X", 1, &pattern(value)).unwrap()
    }

    fn report(value: Value) -> Report {
        serde_json::from_value(value).unwrap()
    }

    fn gcc_chain() -> Report {
        report(json!({
            "version": {"major": 4, "minor": 3},
            "checkouts": [{"id": "co:1", "origin": "lab", "tree_name": "next"}],
            "builds": [{
                "id": "b:1", "origin": "lab", "checkout_id": "co:1",
                "compiler": "gcc-10", "architecture": "x86_64"
            }],
            "tests": [{
                "id": "t:1", "origin": "lab", "build_id": "b:1",
                "path": "boot.smoke", "status": "FAIL"
            }]
        }))
    }

    fn is_match(evaluation: Evaluation) -> bool {
        matches!(evaluation, Evaluation::Match)
    }

    #[test]
    fn full_chain_pattern_matches() {
        let doc = gcc_chain();
        let p = compiled(json!({
            "checkouts": [{"tree_name": "next"}],
            "builds": [{"compiler": "gcc.*"}]
        }));
        assert!(is_match(p.evaluate(&doc.chain())));
    }

    #[test]
    fn checkout_field_mismatch_fails() {
        let doc = report(json!({
            "version": {"major": 4, "minor": 3},
            "checkouts": [{"id": "co:1", "origin": "lab", "tree_name": "mainline"}],
            "builds": [{"id": "b:1", "origin": "lab", "checkout_id": "co:1", "compiler": "gcc-10"}]
        }));
        let p = compiled(json!({
            "checkouts": [{"tree_name": "next"}],
            "builds": [{"compiler": "gcc.*"}]
        }));
        assert!(!is_match(p.evaluate(&doc.chain())));
    }

    #[test]
    fn unconstrained_levels_impose_nothing() {
        // Constrains only builds; checkout and test fields are free.
        let p = compiled(json!({"builds": [{"compiler": "gcc.*"}]}));
        assert!(is_match(p.evaluate(&gcc_chain().chain())));
    }

    #[test]
    fn all_fields_at_a_level_must_match() {
        let doc = gcc_chain();
        let p = compiled(json!({
            "builds": [{"compiler": "gcc.*", "architecture": "arm64"}]
        }));
        assert!(!is_match(p.evaluate(&doc.chain())));
    }

    #[test]
    fn constrained_level_missing_from_chain_fails() {
        let doc = report(json!({
            "version": {"major": 4, "minor": 3},
            "builds": [{"id": "b:1", "origin": "lab", "compiler": "gcc-10"}]
        }));
        let p = compiled(json!({"tests": [{"status": "FAIL"}]}));
        assert!(!is_match(p.evaluate(&doc.chain())));
    }

    #[test]
    fn missing_field_fails_the_level() {
        let p = compiled(json!({"builds": [{"config_name": "defconfig"}]}));
        assert!(!is_match(p.evaluate(&gcc_chain().chain())));
    }

    #[test]
    fn regex_uses_search_semantics() {
        // Unanchored: "c-1" occurs inside "gcc-10".
        let p = compiled(json!({"builds": [{"compiler": "c-1"}]}));
        assert!(is_match(p.evaluate(&gcc_chain().chain())));
    }

    #[test]
    fn regex_is_case_sensitive() {
        let p = compiled(json!({"builds": [{"compiler": "GCC"}]}));
        assert!(!is_match(p.evaluate(&gcc_chain().chain())));
    }

    #[test]
    fn non_string_values_compare_literally() {
        let doc = report(json!({
            "version": {"major": 4, "minor": 3},
            "tests": [{"id": "t:1", "origin": "lab", "number": {"value": 42.0}, "waived": false}]
        }));
        let p = compiled(json!({"tests": [{"waived": false}]}));
        assert!(is_match(p.evaluate(&doc.chain())));
        let p = compiled(json!({"tests": [{"waived": true}]}));
        assert!(!is_match(p.evaluate(&doc.chain())));
    }

    #[test]
    fn nested_scalar_fields_are_constrained() {
        let doc = report(json!({
            "version": {"major": 4, "minor": 3},
            "builds": [{
                "id": "b:1", "origin": "lab",
                "misc": {"platform": "qemu-x86"}
            }]
        }));
        let p = compiled(json!({"builds": [{"misc": {"platform": "qemu.*"}}]}));
        assert!(is_match(p.evaluate(&doc.chain())));
        let p = compiled(json!({"builds": [{"misc": {"platform": "beagle.*"}}]}));
        assert!(!is_match(p.evaluate(&doc.chain())));
    }

    #[test]
    fn bad_regex_reports_issue_and_field() {
        let err = CompiledPattern::compile(
            "X",
            1,
            &pattern(json!({"builds": [{"compiler": "gcc[("}]})),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("issue X"), "{msg}");
        assert!(msg.contains("builds.compiler"), "{msg}");
    }

    #[test]
    fn log_regex_matches_against_the_excerpt() {
        let doc = report(json!({
            "version": {"major": 4, "minor": 3},
            "tests": [{
                "id": "t:1", "origin": "lab",
                "log_excerpt": "Kernel panic - not syncing: VFS"
            }]
        }));
        let p = compiled(json!({"tests": [{"log_regex": "Kernel panic"}]}));
        assert!(is_match(p.evaluate(&doc.chain())));
    }

    #[test]
    fn log_regex_defers_to_url_when_excerpt_misses() {
        let doc = report(json!({
            "version": {"major": 4, "minor": 3},
            "tests": [{
                "id": "t:1", "origin": "lab",
                "log_excerpt": "all good here",
                "log_url": "https://logs.example/t1.log"
            }]
        }));
        let p = compiled(json!({"tests": [{"log_regex": "Kernel panic"}]}));
        match p.evaluate(&doc.chain()) {
            Evaluation::LogPending { url, .. } => {
                assert_eq!(url, "https://logs.example/t1.log")
            }
            _ => panic!("expected a pending log check"),
        }
    }

    #[test]
    fn log_regex_without_excerpt_or_url_fails() {
        let doc = report(json!({
            "version": {"major": 4, "minor": 3},
            "tests": [{"id": "t:1", "origin": "lab"}]
        }));
        let p = compiled(json!({"tests": [{"log_regex": "panic"}]}));
        assert!(!is_match(p.evaluate(&doc.chain())));
    }
}
