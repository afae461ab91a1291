use serde_json::Value;
use std::collections::HashSet;

/// Collapses records sharing a composite natural key, keeping the first
/// occurrence and preserving input order otherwise. Non-object records always
/// pass through; they are never considered duplicates of anything. An empty
/// key definition disables deduplication.
pub fn dedupe(records: Vec<Value>, unique_fields: &[String]) -> Vec<Value> {
    if unique_fields.is_empty() {
        return records;
    }
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let Some(obj) = record.as_object() else {
            tracing::warn!(value = %record, "Non-object record passed through dedupe unchanged");
            out.push(record);
            continue;
        };
        let key = unique_fields
            .iter()
            .map(|field| key_segment(obj.get(field)))
            .collect::<Vec<_>>()
            .join("|");
        if seen.insert(key) {
            out.push(record);
        }
    }
    out
}

fn key_segment(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
