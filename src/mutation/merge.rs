//! Structural merge engine for pod mutation
//!
//! Deep-merges a partial mutation template into a pod's JSON representation
//! under a [`MutationStrategy`]. The merge is pure: inputs are never mutated,
//! and a kind mismatch between template and original fails loudly instead of
//! silently dropping data.

use serde_json::Value;

use super::MutationStrategy;
use crate::{Error, Result};

/// Merge `template` into a copy of `original` under the supplied strategy.
///
/// Rules, applied recursively per field:
/// - fields present only in the template are always populated;
/// - scalar leaves set in both keep the original unless `strategy.overwrite`;
/// - arrays set in both are concatenated (original first) under
///   `strategy.append`, replaced wholesale under `strategy.overwrite`, and
///   kept otherwise;
/// - objects merge per key, so partial templates never clobber sibling fields;
/// - `null` in the template means "unset" and leaves the original alone;
/// - mismatched kinds (scalar vs array, object vs scalar, ...) are an error.
pub fn merge_value(original: &Value, template: &Value, strategy: &MutationStrategy) -> Result<Value> {
    merge_at("", original, template, strategy)
}

fn merge_at(path: &str, original: &Value, template: &Value, strategy: &MutationStrategy) -> Result<Value> {
    match (original, template) {
        // Template leaves the field unset.
        (original, Value::Null) => Ok(original.clone()),

        // Original has nothing here; take the template value.
        (Value::Null, template) => Ok(template.clone()),

        (Value::Object(original), Value::Object(template)) => {
            let mut merged = original.clone();
            for (key, value) in template {
                let child_path = format!("{path}/{key}");
                match original.get(key) {
                    Some(existing) => {
                        merged.insert(key.clone(), merge_at(&child_path, existing, value, strategy)?);
                    }
                    None => {
                        if !value.is_null() {
                            merged.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            Ok(Value::Object(merged))
        }

        (Value::Array(original), Value::Array(template)) => {
            if strategy.append {
                let mut merged = original.clone();
                merged.extend(template.iter().cloned());
                Ok(Value::Array(merged))
            } else if strategy.overwrite {
                Ok(Value::Array(template.clone()))
            } else {
                Ok(Value::Array(original.clone()))
            }
        }

        (original, template) if same_scalar_kind(original, template) => {
            if strategy.overwrite {
                Ok(template.clone())
            } else {
                Ok(original.clone())
            }
        }

        (original, template) => Err(Error::merge(format!(
            "incompatible kinds at {}: cannot merge {} into {}",
            if path.is_empty() { "/" } else { path },
            kind_name(template),
            kind_name(original),
        ))),
    }
}

fn same_scalar_kind(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Bool(_), Value::Bool(_))
            | (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
    )
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
