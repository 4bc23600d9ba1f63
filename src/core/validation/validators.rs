//! Reusable property validators
//!
//! Each validator checks one constraint and lets values it does not apply to
//! pass through, so constraints compose: `string_length` ignores numbers,
//! `of_type` is the one that rejects them.

use crate::core::dictionary::PropertyType;
use regex::Regex;
use serde_json::Value;

/// Validator: value has the declared JSON type
pub fn of_type(kind: PropertyType) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        let ok = match kind {
            PropertyType::String => value.is_string(),
            PropertyType::Integer => value.is_i64() || value.is_u64(),
            PropertyType::Number => value.is_number(),
            PropertyType::Boolean => value.is_boolean(),
            PropertyType::Array => value.is_array(),
            PropertyType::Object => value.is_object(),
        };
        if ok {
            Ok(())
        } else {
            Err(format!(
                "'{}' must be of type {:?} (got {})",
                field, kind, value
            ))
        }
    }
}

/// Validator: value must be in allowed list
pub fn in_list(
    allowed: Vec<String>,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        if let Some(s) = value.as_str() {
            if !allowed.iter().any(|a| a == s) {
                Err(format!(
                    "'{}' must be one of {:?} (got {})",
                    field, allowed, s
                ))
            } else {
                Ok(())
            }
        } else {
            Ok(())
        }
    }
}

/// Validator: string must match the pattern
pub fn pattern(regex: Regex) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value.as_str() {
        Some(s) if !regex.is_match(s) => Err(format!(
            "'{}' does not match pattern {} (got {})",
            field,
            regex.as_str(),
            s
        )),
        _ => Ok(()),
    }
}

/// Validator: string length must be within range
pub fn string_length(
    min: Option<usize>,
    max: Option<usize>,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if min.is_some_and(|min| len < min) {
                Err(format!(
                    "'{}' must be at least {} characters (got {})",
                    field,
                    min.unwrap_or_default(),
                    len
                ))
            } else if max.is_some_and(|max| len > max) {
                Err(format!(
                    "'{}' must be at most {} characters (got {})",
                    field,
                    max.unwrap_or_default(),
                    len
                ))
            } else {
                Ok(())
            }
        } else {
            Ok(())
        }
    }
}

/// Validator: number must be within range (inclusive)
pub fn range(
    minimum: Option<f64>,
    maximum: Option<f64>,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        let Some(num) = value.as_f64() else {
            return Ok(());
        };
        match (minimum, maximum) {
            (Some(min), _) if num < min => {
                Err(format!("'{}' must be >= {} (got {})", field, min, num))
            }
            (_, Some(max)) if num > max => {
                Err(format!("'{}' must be <= {} (got {})", field, max, num))
            }
            _ => Ok(()),
        }
    }
}
