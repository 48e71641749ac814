//! Relationship-metadata validation and sanitization.
//!
//! Guarantees that metadata handed to the graph store is bounded and
//! serializable: strings and arrays are truncated, over-deep objects are
//! stringified, and payloads over the size budget go through
//! priority-preserving truncation that keeps the semantically important keys.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::errors::IndexError;

/// Keys kept first during priority-preserving truncation.
const PRIORITY_KEYS: &[&str] = &[
    "calls",
    "imports",
    "identifier",
    "type",
    "calleeName",
    "callType",
];

/// Share of the size budget the priority pass may fill before cutting off.
const TRUNCATION_FILL_RATIO: f64 = 0.8;

/// Log verbosity for validation warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLogLevel {
    None,
    #[default]
    Warn,
    Info,
    Debug,
}

/// Validator limits. All sizes are in serialized bytes.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub max_metadata_size: usize,
    pub max_string_length: usize,
    pub max_array_length: usize,
    pub max_object_depth: usize,
    /// Fast path: skip all work when disabled.
    pub validation_enabled: bool,
    /// When false, oversized payloads fail instead of truncating.
    pub allow_truncation: bool,
    pub log_level: ValidationLogLevel,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_metadata_size: 32 * 1024,
            max_string_length: 4096,
            max_array_length: 256,
            max_object_depth: 10,
            validation_enabled: true,
            allow_truncation: true,
            log_level: ValidationLogLevel::Warn,
        }
    }
}

/// Result of a validation pass. The input is never mutated.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub sanitized: Value,
    pub warnings: Vec<String>,
    pub was_truncated: bool,
}

/// Validate and sanitize one metadata payload.
pub fn validate_metadata(
    metadata: &Value,
    config: &ValidatorConfig,
) -> Result<ValidationOutcome, IndexError> {
    if !config.validation_enabled {
        return Ok(ValidationOutcome {
            sanitized: metadata.clone(),
            warnings: Vec::new(),
            was_truncated: false,
        });
    }

    let mut warnings = Vec::new();
    let mut visiting: HashSet<usize> = HashSet::new();
    let sanitized = sanitize(metadata, config, 0, &mut visiting, &mut warnings)?;

    let serialized = serde_json::to_string(&sanitized)
        .map_err(|e| IndexError::Validation(format!("metadata not serializable: {e}")))?;

    if serialized.len() <= config.max_metadata_size {
        return Ok(ValidationOutcome {
            sanitized,
            warnings,
            was_truncated: false,
        });
    }

    if !config.allow_truncation {
        return Err(IndexError::SizeLimit(format!(
            "metadata is {} bytes, limit {}",
            serialized.len(),
            config.max_metadata_size
        )));
    }

    let truncated = truncate_by_priority(&sanitized, config, serialized.len(), &mut warnings);
    Ok(ValidationOutcome {
        sanitized: truncated,
        warnings,
        was_truncated: true,
    })
}

fn sanitize(
    value: &Value,
    config: &ValidatorConfig,
    depth: usize,
    visiting: &mut HashSet<usize>,
    warnings: &mut Vec<String>,
) -> Result<Value, IndexError> {
    if depth > config.max_object_depth {
        // Too deep to keep structured; flatten to a tagged string.
        let mut map = Map::new();
        map.insert("__stringified".into(), Value::Bool(true));
        map.insert(
            "__originalType".into(),
            Value::String(type_label(value).to_string()),
        );
        let mut rendered = value.to_string();
        if rendered.len() > config.max_string_length {
            rendered.truncate(config.max_string_length.saturating_sub(3));
            rendered.push_str("...");
        }
        map.insert("value".into(), Value::String(rendered));
        warnings.push(format!(
            "object depth {} exceeds limit {}; subtree stringified",
            depth, config.max_object_depth
        ));
        return Ok(Value::Object(map));
    }

    match value {
        Value::Null => Ok(Value::Null),
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Number(n) => Ok(Value::Number(n.clone())),
        Value::String(s) => {
            if s.len() > config.max_string_length {
                let cut = config.max_string_length.saturating_sub(3);
                let mut truncated = String::with_capacity(cut + 3);
                truncated.extend(s.chars().take(cut));
                truncated.push_str("...");
                warnings.push(format!(
                    "string of {} chars truncated to {}",
                    s.len(),
                    config.max_string_length
                ));
                Ok(Value::String(truncated))
            } else {
                Ok(Value::String(s.clone()))
            }
        }
        Value::Array(items) => {
            // Identity guard: owned JSON values form a tree, but the guard is
            // kept so aliased inputs from future arena-backed callers fail
            // loudly instead of looping.
            let addr = items.as_ptr() as usize;
            if !visiting.insert(addr) {
                return Err(IndexError::CircularReference(
                    "circular_reference_detection: array revisited during walk".into(),
                ));
            }
            let mut out = Vec::new();
            for item in items.iter().take(config.max_array_length) {
                if item.is_null() {
                    continue;
                }
                out.push(sanitize(item, config, depth + 1, visiting, warnings)?);
            }
            if items.len() > config.max_array_length {
                warnings.push(format!(
                    "array of {} items truncated to {}",
                    items.len(),
                    config.max_array_length
                ));
            }
            visiting.remove(&addr);
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let addr = map as *const Map<String, Value> as usize;
            if !visiting.insert(addr) {
                return Err(IndexError::CircularReference(
                    "circular_reference_detection: object revisited during walk".into(),
                ));
            }
            let mut out = Map::new();
            for (key, item) in map {
                if item.is_null() {
                    continue;
                }
                out.insert(
                    key.clone(),
                    sanitize(item, config, depth + 1, visiting, warnings)?,
                );
            }
            visiting.remove(&addr);
            Ok(Value::Object(out))
        }
    }
}

/// Keep priority keys first, fill to 80% of the budget, then tag the cut.
fn truncate_by_priority(
    value: &Value,
    config: &ValidatorConfig,
    original_size: usize,
    warnings: &mut Vec<String>,
) -> Value {
    let map = match value {
        Value::Object(map) => map,
        // Non-object payloads cannot be partially kept; replace wholesale.
        other => {
            warnings.push("oversized non-object metadata replaced with marker".into());
            let mut out = Map::new();
            out.insert("__truncated".into(), Value::Bool(true));
            out.insert(
                "__originalType".into(),
                Value::String(type_label(other).to_string()),
            );
            out.insert("__truncatedSize".into(), Value::from(original_size));
            out.insert("__maxSize".into(), Value::from(config.max_metadata_size));
            return Value::Object(out);
        }
    };

    let budget = (config.max_metadata_size as f64 * TRUNCATION_FILL_RATIO) as usize;
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_by_key(|k| {
        PRIORITY_KEYS
            .iter()
            .position(|p| p == k)
            .unwrap_or(PRIORITY_KEYS.len())
    });

    let mut out = Map::new();
    let mut used = 2; // braces
    let mut dropped = 0usize;
    for key in keys {
        let item = &map[key];
        let entry_size = key.len() + 4 + item.to_string().len();
        if used + entry_size > budget {
            dropped += 1;
            continue;
        }
        used += entry_size;
        out.insert(key.clone(), item.clone());
    }

    out.insert("__truncated".into(), Value::Bool(true));
    out.insert("__remainingProperties".into(), Value::from(dropped));
    out.insert("__truncatedSize".into(), Value::from(original_size));
    out.insert("__maxSize".into(), Value::from(config.max_metadata_size));

    warnings.push(format!(
        "metadata of {} bytes truncated to priority keys ({} dropped)",
        original_size, dropped
    ));

    Value::Object(out)
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passthrough_when_disabled() {
        let config = ValidatorConfig {
            validation_enabled: false,
            ..Default::default()
        };
        let meta = json!({"a": null, "b": "x".repeat(10_000)});
        let outcome = validate_metadata(&meta, &config).unwrap();
        assert_eq!(outcome.sanitized, meta);
        assert!(!outcome.was_truncated);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn small_payload_passes_untouched() {
        let config = ValidatorConfig::default();
        let meta = json!({"source": "./utils", "symbols": ["a", "b"], "isDefault": false});
        let outcome = validate_metadata(&meta, &config).unwrap();
        assert_eq!(outcome.sanitized, meta);
        assert!(!outcome.was_truncated);
    }

    #[test]
    fn input_is_not_mutated() {
        let config = ValidatorConfig {
            max_string_length: 8,
            ..Default::default()
        };
        let meta = json!({"long": "abcdefghijklmnop"});
        let before = meta.clone();
        let _ = validate_metadata(&meta, &config).unwrap();
        assert_eq!(meta, before);
    }

    #[test]
    fn long_strings_get_ellipsis() {
        let config = ValidatorConfig {
            max_string_length: 10,
            ..Default::default()
        };
        let meta = json!({"s": "abcdefghijklmnop"});
        let outcome = validate_metadata(&meta, &config).unwrap();
        assert_eq!(outcome.sanitized["s"], "abcdefg...");
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn null_members_are_dropped() {
        let config = ValidatorConfig::default();
        let meta = json!({"keep": 1, "drop": null, "arr": [1, null, 2]});
        let outcome = validate_metadata(&meta, &config).unwrap();
        assert!(outcome.sanitized.get("drop").is_none());
        assert_eq!(outcome.sanitized["arr"], json!([1, 2]));
    }

    #[test]
    fn arrays_truncate_to_limit() {
        let config = ValidatorConfig {
            max_array_length: 3,
            ..Default::default()
        };
        let meta = json!({"xs": [1, 2, 3, 4, 5, 6]});
        let outcome = validate_metadata(&meta, &config).unwrap();
        assert_eq!(outcome.sanitized["xs"], json!([1, 2, 3]));
        assert!(outcome.warnings.iter().any(|w| w.contains("array")));
    }

    #[test]
    fn depth_overflow_stringifies() {
        let config = ValidatorConfig {
            max_object_depth: 2,
            ..Default::default()
        };
        let meta = json!({"a": {"b": {"c": {"d": 1}}}});
        let outcome = validate_metadata(&meta, &config).unwrap();
        let flattened = &outcome.sanitized["a"]["b"]["c"];
        assert_eq!(flattened["__stringified"], true);
        assert_eq!(flattened["__originalType"], "object");
        assert!(flattened["value"].as_str().unwrap().contains("d"));
    }

    #[test]
    fn oversize_fails_without_truncation() {
        let config = ValidatorConfig {
            max_metadata_size: 64,
            allow_truncation: false,
            ..Default::default()
        };
        let meta = json!({"payload": "y".repeat(200)});
        let err = validate_metadata(&meta, &config).unwrap_err();
        assert!(matches!(err, IndexError::SizeLimit(_)));
    }

    #[test]
    fn priority_truncation_keeps_important_keys() {
        let config = ValidatorConfig {
            max_metadata_size: 200,
            max_string_length: 4096,
            ..Default::default()
        };
        let meta = json!({
            "calleeName": "saveUser",
            "callType": "method",
            "padding": "z".repeat(400),
            "more": "w".repeat(400),
        });
        let outcome = validate_metadata(&meta, &config).unwrap();
        assert!(outcome.was_truncated);
        let map = outcome.sanitized.as_object().unwrap();
        assert_eq!(map["calleeName"], "saveUser");
        assert_eq!(map["callType"], "method");
        assert!(map.get("padding").is_none());
        assert_eq!(map["__truncated"], true);
        assert_eq!(map["__maxSize"], 200);
        assert!(map["__remainingProperties"].as_u64().unwrap() >= 1);
        assert!(map["__truncatedSize"].as_u64().unwrap() > 200);
    }

    #[test]
    fn truncated_result_fits_the_budget() {
        let config = ValidatorConfig {
            max_metadata_size: 300,
            ..Default::default()
        };
        let mut big = serde_json::Map::new();
        for i in 0..50 {
            big.insert(format!("k{i}"), json!("v".repeat(40)));
        }
        let outcome = validate_metadata(&Value::Object(big), &config).unwrap();
        assert!(outcome.was_truncated);
        let size = serde_json::to_string(&outcome.sanitized).unwrap().len();
        assert!(size <= 300 + 120, "size {size} blew past the budget");
    }

    #[test]
    fn oversized_scalar_payload_becomes_marker() {
        let config = ValidatorConfig {
            max_metadata_size: 16,
            max_string_length: 4096,
            ..Default::default()
        };
        let meta = json!("a very long string payload that cannot be split");
        let outcome = validate_metadata(&meta, &config).unwrap();
        assert!(outcome.was_truncated);
        assert_eq!(outcome.sanitized["__truncated"], true);
        assert_eq!(outcome.sanitized["__originalType"], "string");
    }
}
