//! Typed, best-effort accessors.
//!
//! Each getter coerces whatever is stored at the path and falls back to the
//! caller's default when the path is missing or the value does not convert.

use super::{OptionValue, Options};
use crate::duration::parse_duration;
use std::time::Duration;

impl Options {
    /// Text at `path`. Numbers and booleans are rendered as text.
    pub fn get_string(&self, path: &str, default: &str) -> String {
        self.get_object(path)
            .and_then(|value| value_as_string(&value))
            .unwrap_or_else(|| default.to_string())
    }

    /// 32-bit integer at `path`; values outside the `i32` range yield the default.
    pub fn get_int(&self, path: &str, default: i32) -> i32 {
        self.get_object(path)
            .and_then(|value| value_as_i64(&value))
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(default)
    }

    /// 64-bit integer at `path`. Floats are truncated.
    pub fn get_int64(&self, path: &str, default: i64) -> i64 {
        self.get_object(path)
            .and_then(|value| value_as_i64(&value))
            .unwrap_or(default)
    }

    /// Floating point number at `path`
    pub fn get_float(&self, path: &str, default: f64) -> f64 {
        self.get_object(path)
            .and_then(|value| value_as_f64(&value))
            .unwrap_or(default)
    }

    /// Boolean at `path`. Text accepts `1`, `t`, `true` and `0`, `f`, `false`
    /// in lower, upper or title case.
    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        self.get_object(path)
            .and_then(|value| value_as_bool(&value))
            .unwrap_or(default)
    }

    /// Duration at `path`. Numbers are nanoseconds; text uses the
    /// [`parse_duration`] syntax.
    pub fn get_duration(&self, path: &str, default: Duration) -> Duration {
        self.get_object(path)
            .and_then(|value| value_as_duration(&value))
            .unwrap_or(default)
    }

    /// Array of text at `path`
    pub fn get_string_array(&self, path: &str, default: Vec<String>) -> Vec<String> {
        self.get_array(path, default, value_as_string)
    }

    /// Array of 64-bit integers at `path`; elements that do not convert are skipped
    pub fn get_int64_array(&self, path: &str, default: Vec<i64>) -> Vec<i64> {
        self.get_array(path, default, value_as_i64)
    }

    /// Array of floats at `path`; elements that do not convert are skipped
    pub fn get_float64_array(&self, path: &str, default: Vec<f64>) -> Vec<f64> {
        self.get_array(path, default, value_as_f64)
    }

    /// Array of nodes at `path`; non-node elements are skipped
    pub fn get_object_array(&self, path: &str, default: Vec<Options>) -> Vec<Options> {
        self.get_array(path, default, |value| value.as_node().cloned())
    }

    fn get_array<T>(
        &self,
        path: &str,
        default: Vec<T>,
        convert: impl Fn(&OptionValue) -> Option<T>,
    ) -> Vec<T> {
        match self.get_object(path) {
            Some(OptionValue::Array(items)) => items.iter().filter_map(convert).collect(),
            _ => default,
        }
    }
}

fn value_as_string(value: &OptionValue) -> Option<String> {
    match value {
        OptionValue::String(s) => Some(s.clone()),
        OptionValue::Number(n) => Some(n.to_string()),
        OptionValue::Bool(b) => Some(b.to_string()),
        OptionValue::Node(node) => Some(node.to_string()),
        OptionValue::Array(_) => serde_json::to_string(value).ok(),
        OptionValue::Null => None,
    }
}

fn value_as_i64(value: &OptionValue) -> Option<i64> {
    match value {
        OptionValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|v| i64::try_from(v).ok()))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        OptionValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn value_as_f64(value: &OptionValue) -> Option<f64> {
    match value {
        OptionValue::Number(n) => n.as_f64(),
        OptionValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn value_as_bool(value: &OptionValue) -> Option<bool> {
    match value {
        OptionValue::Bool(b) => Some(*b),
        OptionValue::Number(n) => parse_bool(&n.to_string()),
        OptionValue::String(s) => parse_bool(s),
        _ => None,
    }
}

fn value_as_duration(value: &OptionValue) -> Option<Duration> {
    match value {
        OptionValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(Duration::from_nanos),
        OptionValue::String(s) => parse_duration(s),
        _ => None,
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
