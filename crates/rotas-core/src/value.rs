//! Scalar payload values and the coercion rules applied to them.
//!
//! Upstream agents send values in whatever shape their PLC bridge produces:
//! booleans, numbers, numeric strings, sentinel words ("ligado", "off"),
//! arbitrary text. Everything funnels through [`coerce_value`] once and the
//! rest of the pipeline only ever sees [`ScalarValue`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A coerced payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

const TRUE_WORDS: [&str; 4] = ["true", "on", "sim", "ligado"];
const FALSE_WORDS: [&str; 5] = ["false", "off", "nao", "não", "desligado"];

/// Coerce a raw JSON value into a scalar.
///
/// Booleans and numbers pass through unchanged. Strings are trimmed, mapped
/// to 1/0 when they are a recognized sentinel word, parsed as a number when
/// possible and kept as text otherwise. Null and blank strings coerce to
/// `None`.
pub fn coerce_value(raw: &Value) -> Option<ScalarValue> {
    match raw {
        Value::Null => None,
        Value::Bool(b) => Some(ScalarValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(ScalarValue::Int(i))
            } else {
                n.as_f64().map(ScalarValue::Float)
            }
        }
        Value::String(s) => {
            let text = s.trim();
            if text.is_empty() {
                return None;
            }
            let lower = text.to_lowercase();
            if TRUE_WORDS.contains(&lower.as_str()) {
                return Some(ScalarValue::Int(1));
            }
            if FALSE_WORDS.contains(&lower.as_str()) {
                return Some(ScalarValue::Int(0));
            }
            if text.contains('.') {
                match text.parse::<f64>() {
                    Ok(f) => Some(ScalarValue::Float(f)),
                    Err(_) => Some(ScalarValue::Text(text.to_string())),
                }
            } else {
                match text.parse::<i64>() {
                    Ok(i) => Some(ScalarValue::Int(i)),
                    Err(_) => Some(ScalarValue::Text(text.to_string())),
                }
            }
        }
        other => Some(ScalarValue::Text(other.to_string())),
    }
}

/// Uniform truthiness rule for route attributes.
///
/// Unset is inactive, numbers are active when positive, recognized sentinel
/// strings map to their boolean meaning and any other non-empty string
/// defaults to active.
pub fn is_active(value: Option<&ScalarValue>) -> bool {
    match value {
        None => false,
        Some(ScalarValue::Bool(b)) => *b,
        Some(ScalarValue::Int(i)) => *i > 0,
        Some(ScalarValue::Float(f)) => *f > 0.0,
        Some(ScalarValue::Text(s)) => {
            let text = s.trim().to_lowercase();
            if ["1", "true", "on", "sim", "ligado"].contains(&text.as_str()) {
                return true;
            }
            if ["0", "false", "off", "nao", "não", "desligado", ""].contains(&text.as_str()) {
                return false;
            }
            true
        }
    }
}

/// Integer-coerce a value, used for ORIGEM/DESTINO codes.
///
/// Floats and numeric strings truncate toward zero.
pub fn value_to_int(value: Option<&ScalarValue>) -> Option<i64> {
    match value {
        None => None,
        Some(ScalarValue::Bool(b)) => Some(*b as i64),
        Some(ScalarValue::Int(i)) => Some(*i),
        Some(ScalarValue::Float(f)) => Some(*f as i64),
        Some(ScalarValue::Text(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
    }
}

/// Ternary view of a value: unset stays unset, anything else becomes 1/0.
pub fn binary_state(value: Option<&ScalarValue>) -> Option<u8> {
    value.map(|v| is_active(Some(v)) as u8)
}

/// Display form used in event feeds: floats are trimmed to at most three
/// decimal places, unset renders as a dash.
pub fn format_value(value: Option<&ScalarValue>) -> String {
    match value {
        None => "-".to_string(),
        Some(ScalarValue::Float(f)) => {
            let text = format!("{:.3}", f);
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        Some(other) => scalar_text(other),
    }
}

/// Plain stringification without float trimming.
pub fn scalar_text(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Bool(b) => b.to_string(),
        ScalarValue::Int(i) => i.to_string(),
        ScalarValue::Float(f) => f.to_string(),
        ScalarValue::Text(s) => s.clone(),
    }
}
