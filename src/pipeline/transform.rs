use serde_json::Value;

use crate::models::{FieldMapping, FieldType, Result, SyncEngineError};

/// Re-shapes every record according to the declared source-to-target mapping.
/// Output records carry only mapped target fields; record count and order are
/// preserved. Non-object records pass through unchanged.
pub fn transform(records: Vec<Value>, mapping: &FieldMapping) -> Result<Vec<Value>> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let Some(source) = record.as_object() else {
            tracing::warn!(value = %record, "Non-object record passed through transform unchanged");
            out.push(record);
            continue;
        };
        let mut target = serde_json::Map::new();
        for rule in &mapping.rules {
            let Some(value) = source.get(&rule.source_field) else {
                continue;
            };
            let mut value = value.clone();
            if let Some(name) = &rule.transform {
                value = apply_named_transform(name, value)?;
            }
            if let Some(data_type) = rule.data_type {
                value = coerce(value, data_type);
            }
            target.insert(rule.target_field.clone(), value);
        }
        out.push(Value::Object(target));
    }
    Ok(out)
}

fn apply_named_transform(name: &str, value: Value) -> Result<Value> {
    let transformed = match name {
        "trim" => match value.as_str() {
            Some(s) => Value::String(s.trim().to_string()),
            None => value,
        },
        "lowercase" => match value.as_str() {
            Some(s) => Value::String(s.to_lowercase()),
            None => value,
        },
        "uppercase" => match value.as_str() {
            Some(s) => Value::String(s.to_uppercase()),
            None => value,
        },
        "to_number" => to_number(value),
        "to_bool" => to_bool(value),
        other => {
            return Err(SyncEngineError::Transform(format!(
                "unknown transform function: {other}"
            )))
        }
    };
    Ok(transformed)
}

/// Best-effort string-to-number coercion. Handles currency symbols, spaces,
/// and both US and EU separator conventions; unparseable inputs become null
/// so the validation stage can report them.
fn to_number(value: Value) -> Value {
    if value.is_number() {
        return value;
    }
    let Some(raw) = value.as_str() else {
        return Value::Null;
    };
    let mut s = raw.trim().to_string();
    if s.is_empty() {
        return Value::Null;
    }
    let mut cleaned: String = s
        .drain(..)
        .filter(|c| !matches!(c, ' ' | '\u{00A0}' | '$' | '€' | '£' | '¥' | '₹'))
        .collect();
    let has_dot = cleaned.contains('.');
    let has_comma = cleaned.contains(',');
    if has_dot && has_comma {
        if cleaned.rfind('.') > cleaned.rfind(',') {
            cleaned = cleaned.replace(',', "");
        } else {
            cleaned = cleaned.replace('.', "").replace(',', ".");
        }
    } else if has_comma {
        let decimal_like = cleaned
            .rsplit_once(',')
            .map(|(_, frac)| (1..=3).contains(&frac.len()) && frac.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false);
        if decimal_like {
            cleaned = cleaned.replace(',', ".");
        } else {
            cleaned = cleaned.replace(',', "");
        }
    }
    match cleaned.parse::<f64>() {
        Ok(n) => serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    }
}

fn to_bool(value: Value) -> Value {
    if value.is_boolean() {
        return value;
    }
    if let Some(n) = value.as_f64() {
        return Value::Bool(n != 0.0);
    }
    if let Some(s) = value.as_str() {
        return match s.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Value::Bool(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Value::Bool(false),
            _ => Value::Null,
        };
    }
    Value::Null
}

/// Lenient type-hint coercion. Values that cannot be converted keep their
/// original shape so the validation stage reports the mismatch instead of the
/// transform stage swallowing it.
fn coerce(value: Value, data_type: FieldType) -> Value {
    match data_type {
        FieldType::String => match &value {
            Value::String(_) => value,
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            _ => value,
        },
        FieldType::Number => match &value {
            Value::Number(_) => value,
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(value),
            _ => value,
        },
        FieldType::Boolean => match to_bool(value.clone()) {
            Value::Null => value,
            b => b,
        },
        FieldType::Date => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldRule;
    use serde_json::json;

    fn mapping(rules: Vec<(&str, &str)>) -> FieldMapping {
        FieldMapping {
            rules: rules
                .into_iter()
                .map(|(source, target)| FieldRule {
                    source_field: source.to_string(),
                    target_field: target.to_string(),
                    data_type: None,
                    validators: vec![],
                    transform: None,
                })
                .collect(),
        }
    }

    #[test]
    fn preserves_record_count_and_keeps_only_mapped_fields() {
        let records = vec![
            json!({"Name": "Acme", "Industry": "Retail", "Noise": 1}),
            json!({"Name": "Globex", "Industry": "Energy"}),
        ];
        let out = transform(records, &mapping(vec![("Name", "name"), ("Industry", "industry")])).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], json!({"name": "Acme", "industry": "Retail"}));
        assert!(out[0].get("Noise").is_none());
    }

    #[test]
    fn absent_source_fields_are_skipped() {
        let out = transform(vec![json!({"a": 1})], &mapping(vec![("a", "x"), ("b", "y")])).unwrap();
        assert_eq!(out[0], json!({"x": 1}));
    }

    #[test]
    fn non_object_records_pass_through_unchanged() {
        let out = transform(vec![json!("scalar"), json!(42)], &mapping(vec![("a", "b")])).unwrap();
        assert_eq!(out, vec![json!("scalar"), json!(42)]);
    }

    #[test]
    fn named_transform_and_type_hint_are_applied() {
        let m = FieldMapping {
            rules: vec![
                FieldRule {
                    source_field: "price".into(),
                    target_field: "price".into(),
                    data_type: Some(FieldType::Number),
                    validators: vec![],
                    transform: Some("to_number".into()),
                },
                FieldRule {
                    source_field: "name".into(),
                    target_field: "name".into(),
                    data_type: None,
                    validators: vec![],
                    transform: Some("trim".into()),
                },
            ],
        };
        let out = transform(vec![json!({"price": "$1,234.56", "name": "  Acme  "})], &m).unwrap();
        assert_eq!(out[0], json!({"price": 1234.56, "name": "Acme"}));
    }

    #[test]
    fn eu_number_format_is_parsed() {
        let m = FieldMapping {
            rules: vec![FieldRule {
                source_field: "amount".into(),
                target_field: "amount".into(),
                data_type: None,
                validators: vec![],
                transform: Some("to_number".into()),
            }],
        };
        let out = transform(vec![json!({"amount": "1.234,56"})], &m).unwrap();
        assert_eq!(out[0], json!({"amount": 1234.56}));
    }

    #[test]
    fn unknown_transform_is_an_error() {
        let m = FieldMapping {
            rules: vec![FieldRule {
                source_field: "a".into(),
                target_field: "a".into(),
                data_type: None,
                validators: vec![],
                transform: Some("reverse_polarity".into()),
            }],
        };
        let err = transform(vec![json!({"a": 1})], &m).unwrap_err();
        assert!(err.to_string().contains("unknown transform function"));
    }
}
