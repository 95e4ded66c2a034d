//! Lockstep tree extraction.
//!
//! Walks a specification tree and a data tree together and collects a flat
//! list of `(field path, value)` pairs wherever the specification marks a
//! leaf. Spec nodes are one of a closed set of three kinds — the leaf marker,
//! a mapping, or a single-element list — each with its own handler; any other
//! spec/data shape combination yields nothing for that branch.
//!
//! The pattern evaluator derives a spec tree from each pattern level
//! (constrained fields replaced by the leaf marker) and extracts it against
//! chain nodes to read the values under comparison.

use serde_json::Value;

/// Sentinel marking an extractable leaf in a spec tree.
pub const LEAF: Value = Value::Bool(true);

pub fn is_leaf(spec: &Value) -> bool {
    matches!(spec, Value::Bool(true))
}

/// Extracts every marked leaf of `spec` present in `data`.
///
/// Mapping keys absent from the data are skipped, not an error. List
/// recursion visits every data element with the spec's sole element and does
/// not prefix paths with an index, so a path may repeat in the output.
pub fn extract(spec: &Value, data: &Value) -> Vec<(Vec<String>, Value)> {
    let mut out = Vec::new();
    walk(spec, data, &mut Vec::new(), &mut out);
    out
}

fn walk(
    spec: &Value,
    data: &Value,
    prefix: &mut Vec<String>,
    out: &mut Vec<(Vec<String>, Value)>,
) {
    if is_leaf(spec) {
        out.push((prefix.clone(), data.clone()));
        return;
    }
    match (spec, data) {
        (Value::Object(spec_map), Value::Object(data_map)) => {
            for (key, sub_spec) in spec_map {
                if let Some(sub_data) = data_map.get(key) {
                    prefix.push(key.clone());
                    walk(sub_spec, sub_data, prefix, out);
                    prefix.pop();
                }
            }
        }
        (Value::Array(spec_items), Value::Array(data_items)) if spec_items.len() == 1 => {
            for sub_data in data_items {
                walk(&spec_items[0], sub_data, prefix, out);
            }
        }
        _ => {}
    }
}
