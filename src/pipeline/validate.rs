use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{FieldMapping, FieldType, ValidationSchema};

#[derive(Debug, Clone)]
pub struct InvalidRecord {
    pub record: Value,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub valid: Vec<Value>,
    pub invalid: Vec<InvalidRecord>,
}

/// Partitions records against the declared field-type schema plus any named
/// validators declared on the field mapping. A record with zero errors is
/// valid; any error routes it to `invalid` with its accumulated error list.
/// Non-object records are treated as trivially valid with a logged warning.
pub fn validate(records: Vec<Value>, schema: &ValidationSchema, mapping: &FieldMapping) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();
    for record in records {
        let Some(obj) = record.as_object() else {
            tracing::warn!(value = %record, "Non-object record treated as trivially valid");
            outcome.valid.push(record);
            continue;
        };

        let mut errors = Vec::new();
        for declared in &schema.fields {
            match obj.get(&declared.field) {
                None | Some(Value::Null) => {
                    errors.push(format!("{} is required", declared.field));
                }
                Some(value) => {
                    if !type_matches(value, declared.field_type) {
                        errors.push(format!("{} must be {}", declared.field, declared.field_type.as_str()));
                    }
                }
            }
        }
        for rule in &mapping.rules {
            for validator in &rule.validators {
                if let Some(value) = obj.get(&rule.target_field) {
                    if let Some(message) = run_named_validator(validator, &rule.target_field, value) {
                        errors.push(message);
                    }
                }
            }
        }

        if errors.is_empty() {
            outcome.valid.push(record);
        } else {
            outcome.invalid.push(InvalidRecord { record, errors });
        }
    }
    outcome
}

fn type_matches(value: &Value, field_type: FieldType) -> bool {
    match field_type {
        FieldType::String => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Date => value.as_str().map(parses_as_date).unwrap_or(false),
    }
}

fn parses_as_date(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
}

fn run_named_validator(name: &str, field: &str, value: &Value) -> Option<String> {
    match name {
        "non_empty" => match value {
            Value::String(s) if s.trim().is_empty() => Some(format!("{field} must not be empty")),
            _ => None,
        },
        "positive" => match value.as_f64() {
            Some(n) if n <= 0.0 => Some(format!("{field} must be positive")),
            _ => None,
        },
        "non_negative" => match value.as_f64() {
            Some(n) if n < 0.0 => Some(format!("{field} must not be negative")),
            _ => None,
        },
        other => {
            tracing::warn!(validator = other, field, "Unknown validator; skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SchemaField;
    use serde_json::json;

    fn schema(fields: Vec<(&str, FieldType)>) -> ValidationSchema {
        ValidationSchema {
            fields: fields
                .into_iter()
                .map(|(field, field_type)| SchemaField {
                    field: field.to_string(),
                    field_type,
                })
                .collect(),
        }
    }

    #[test]
    fn missing_and_null_fields_are_required_errors() {
        let s = schema(vec![("name", FieldType::String), ("price", FieldType::Number)]);
        let outcome = validate(
            vec![json!({"name": "Acme"}), json!({"name": null, "price": 3})],
            &s,
            &FieldMapping::default(),
        );
        assert!(outcome.valid.is_empty());
        assert_eq!(outcome.invalid.len(), 2);
        assert_eq!(outcome.invalid[0].errors, vec!["price is required"]);
        assert_eq!(outcome.invalid[1].errors, vec!["name is required"]);
    }

    #[test]
    fn type_mismatches_report_expected_type() {
        let s = schema(vec![
            ("name", FieldType::String),
            ("price", FieldType::Number),
            ("active", FieldType::Boolean),
            ("since", FieldType::Date),
        ]);
        let outcome = validate(
            vec![json!({"name": 5, "price": "3", "active": "yes", "since": "not a date"})],
            &s,
            &FieldMapping::default(),
        );
        assert_eq!(
            outcome.invalid[0].errors,
            vec![
                "name must be string",
                "price must be number",
                "active must be boolean",
                "since must be date",
            ]
        );
    }

    #[test]
    fn valid_records_never_appear_in_invalid() {
        let s = schema(vec![("since", FieldType::Date), ("price", FieldType::Number)]);
        let outcome = validate(
            vec![
                json!({"since": "2024-03-01", "price": 9.5}),
                json!({"since": "2024-03-01T10:00:00Z", "price": 1}),
            ],
            &s,
            &FieldMapping::default(),
        );
        assert_eq!(outcome.valid.len(), 2);
        assert!(outcome.invalid.is_empty());
    }

    #[test]
    fn non_object_records_are_trivially_valid() {
        let s = schema(vec![("name", FieldType::String)]);
        let outcome = validate(vec![json!(17)], &s, &FieldMapping::default());
        assert_eq!(outcome.valid, vec![json!(17)]);
    }

    #[test]
    fn named_validators_from_mapping_are_applied() {
        use crate::models::FieldRule;
        let mapping = FieldMapping {
            rules: vec![FieldRule {
                source_field: "p".into(),
                target_field: "price".into(),
                data_type: None,
                validators: vec!["positive".into()],
                transform: None,
            }],
        };
        let outcome = validate(
            vec![json!({"price": -2.0}), json!({"price": 10.0})],
            &schema(vec![("price", FieldType::Number)]),
            &mapping,
        );
        assert_eq!(outcome.valid.len(), 1);
        assert_eq!(outcome.invalid[0].errors, vec!["price must be positive"]);
    }
}
