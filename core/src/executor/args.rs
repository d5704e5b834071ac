//! `${task.N}` / `${task.N.field}` references to earlier results.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use super::types::{ArgMap, TaskId};

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{task\.(\d+)((?:\.[A-Za-z0-9_\-]+)*)\}").expect("valid reference regex")
    })
}

/// Resolve references in every string argument against `results`.
///
/// A string that is exactly one reference becomes the referenced JSON value.
/// References embedded in longer text are replaced by their text form.
/// Unresolvable references are kept verbatim.
pub fn resolve_args(args: &ArgMap, results: &HashMap<TaskId, Value>) -> ArgMap {
    args.iter()
        .map(|(k, v)| (k.clone(), resolve_value(v, results)))
        .collect()
}

pub fn resolve_value(value: &Value, results: &HashMap<TaskId, Value>) -> Value {
    match value {
        Value::String(s) => resolve_str(s, results),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, results)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, results)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Task ids referenced anywhere in `args`.
pub fn referenced_tasks(args: &ArgMap) -> Vec<TaskId> {
    let mut ids = Vec::new();
    for value in args.values() {
        collect_refs(value, &mut ids);
    }
    ids
}

fn collect_refs(value: &Value, ids: &mut Vec<TaskId>) {
    match value {
        Value::String(s) => {
            for caps in reference_regex().captures_iter(s) {
                if let Ok(id) = caps[1].parse::<TaskId>() {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_refs(v, ids)),
        Value::Object(map) => map.values().for_each(|v| collect_refs(v, ids)),
        _ => {}
    }
}

fn resolve_str(s: &str, results: &HashMap<TaskId, Value>) -> Value {
    let re = reference_regex();

    if let Some(caps) = re.captures(s) {
        let whole = caps.get(0).map(|m| m.as_str().len()) == Some(s.len());
        if whole {
            if let Some(found) = lookup(&caps, results) {
                return found.clone();
            }
            return Value::String(s.to_string());
        }
    } else {
        return Value::String(s.to_string());
    }

    let replaced = re.replace_all(s, |caps: &Captures| match lookup(caps, results) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => caps[0].to_string(),
    });
    Value::String(replaced.into_owned())
}

fn lookup<'v>(caps: &Captures, results: &'v HashMap<TaskId, Value>) -> Option<&'v Value> {
    let id: TaskId = caps[1].parse().ok()?;
    let mut current = results.get(&id)?;

    let path = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn results() -> HashMap<TaskId, Value> {
        let mut map = HashMap::new();
        map.insert(1, json!({"path": "out.txt", "lines": [10, 20], "size": 42}));
        map.insert(2, json!("plain text"));
        map
    }

    fn args(value: Value) -> ArgMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_whole_reference_keeps_json_type() {
        let resolved = resolve_args(
            &args(json!({"size": "${task.1.size}", "all": "${task.1}"})),
            &results(),
        );
        assert_eq!(resolved["size"], json!(42));
        assert_eq!(resolved["all"]["path"], json!("out.txt"));
    }

    #[test]
    fn test_embedded_reference_is_text() {
        let resolved = resolve_args(
            &args(json!({"msg": "read ${task.1.path} -> ${task.2} (${task.1.lines.1})"})),
            &results(),
        );
        assert_eq!(resolved["msg"], json!("read out.txt -> plain text (20)"));
    }

    #[test]
    fn test_unknown_reference_left_verbatim() {
        let resolved = resolve_args(
            &args(json!({"a": "${task.9}", "b": "x ${task.1.nope} y", "n": 3})),
            &results(),
        );
        assert_eq!(resolved["a"], json!("${task.9}"));
        assert_eq!(resolved["b"], json!("x ${task.1.nope} y"));
        assert_eq!(resolved["n"], json!(3));
    }

    #[test]
    fn test_nested_values_resolved() {
        let resolved = resolve_args(
            &args(json!({"list": ["${task.2}", {"inner": "${task.1.path}"}]})),
            &results(),
        );
        assert_eq!(resolved["list"], json!(["plain text", {"inner": "out.txt"}]));
    }

    #[test]
    fn test_referenced_tasks() {
        let ids = referenced_tasks(&args(json!({
            "a": "${task.3.x} and ${task.1}",
            "b": ["${task.3}"],
        })));
        assert_eq!(ids, vec![3, 1]);
    }
}
