//! Structured output extraction.
//!
//! Models sometimes wrap JSON in a markdown fence even when asked not to.
//! The fence is stripped, the remainder is parsed strictly and checked
//! against the requested schema. Nothing else is repaired.

use haven_core::ReplySuggestion;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::resilience::CompletionError;

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (`json`, `JSON`, ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse `raw` as JSON and check it against `schema`.
///
/// The schema uses the provider dialect: `type` (case-insensitive),
/// `items`, `properties` and `required`.
pub fn extract(raw: &str, schema: &Value) -> Result<Value, CompletionError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| CompletionError::MalformedOutput(format!("invalid JSON: {e}")))?;

    check_shape(&value, schema, "$")?;
    Ok(value)
}

/// Parse `raw` straight into `T` after fence stripping.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Result<T, CompletionError> {
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| CompletionError::MalformedOutput(e.to_string()))
}

/// Parse a reply-suggestion array. Every field must be a non-empty string.
pub fn extract_suggestions(raw: &str) -> Result<Vec<ReplySuggestion>, CompletionError> {
    let value = extract(raw, &ReplySuggestion::schema())?;

    if let Some(items) = value.as_array() {
        for (i, item) in items.iter().enumerate() {
            for field in ReplySuggestion::FIELDS {
                let blank = item
                    .get(field)
                    .and_then(Value::as_str)
                    .is_none_or(|s| s.trim().is_empty());
                if blank {
                    return Err(CompletionError::MalformedOutput(format!(
                        "$[{i}].{field} is empty"
                    )));
                }
            }
        }
    }

    serde_json::from_value(value).map_err(|e| CompletionError::MalformedOutput(e.to_string()))
}

fn check_shape(value: &Value, schema: &Value, path: &str) -> Result<(), CompletionError> {
    let Some(kind) = schema.get("type").and_then(Value::as_str) else {
        return Ok(());
    };

    let mismatch = || CompletionError::MalformedOutput(format!("{path}: expected {kind}"));

    match kind.to_ascii_lowercase().as_str() {
        "array" => {
            let items = value.as_array().ok_or_else(mismatch)?;
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    check_shape(item, item_schema, &format!("{path}[{i}]"))?;
                }
            }
        }
        "object" => {
            let object = value.as_object().ok_or_else(mismatch)?;

            let required = schema
                .get("required")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str);
            for key in required {
                if !object.contains_key(key) {
                    return Err(CompletionError::MalformedOutput(format!(
                        "{path}: missing required field `{key}`"
                    )));
                }
            }

            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (key, property_schema) in properties {
                    if let Some(field) = object.get(key) {
                        check_shape(field, property_schema, &format!("{path}.{key}"))?;
                    }
                }
            }
        }
        "string" => {
            value.as_str().ok_or_else(mismatch)?;
        }
        "number" => {
            value.as_f64().ok_or_else(mismatch)?;
        }
        "integer" => {
            if value.as_i64().is_none() && value.as_u64().is_none() {
                return Err(mismatch());
            }
        }
        "boolean" => {
            value.as_bool().ok_or_else(mismatch)?;
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FENCED: &str = "```json\n[{\"title\":\"A\",\"text\":\"B\",\"rationalAnalysis\":\"C\",\"warmSupport\":\"D\"}]\n```";

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fence("  [2]  "), "[2]");
        assert_eq!(strip_code_fence("```json[3]```"), "[3]");
    }

    #[test]
    fn test_fenced_suggestions_are_extracted() {
        let suggestions = extract_suggestions(FENCED).unwrap();
        assert_eq!(suggestions.len(), 1);
        let s = &suggestions[0];
        assert_eq!(
            (
                s.title.as_str(),
                s.text.as_str(),
                s.rational_analysis.as_str(),
                s.warm_support.as_str()
            ),
            ("A", "B", "C", "D")
        );
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let raw = "```json\n[{\"title\":\"A\",\"text\":\"B\",\"rationalAnalysis\":\"C\"}]\n```";
        let err = extract_suggestions(raw).unwrap_err();
        match err {
            CompletionError::MalformedOutput(detail) => assert!(detail.contains("warmSupport")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_field_is_malformed() {
        let raw = r#"[{"title":"A","text":"  ","rationalAnalysis":"C","warmSupport":"D"}]"#;
        assert!(matches!(
            extract_suggestions(raw),
            Err(CompletionError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_top_level_object_is_rejected() {
        let raw = r#"{"title":"A","text":"B","rationalAnalysis":"C","warmSupport":"D"}"#;
        assert!(matches!(
            extract_suggestions(raw),
            Err(CompletionError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_truncated_json_is_not_repaired() {
        assert!(matches!(
            extract_suggestions(r#"[{"title":"A","text":"B""#),
            Err(CompletionError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_wrong_field_type_is_rejected() {
        let raw = r#"[{"title":1,"text":"B","rationalAnalysis":"C","warmSupport":"D"}]"#;
        assert!(extract_suggestions(raw).is_err());
    }

    #[test]
    fn test_extract_json_generic() {
        let numbers: Vec<u32> = extract_json("```\n[1, 2, 3]\n```").unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
