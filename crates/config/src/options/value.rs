//! Values stored in an option tree

use super::Options;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

/// A single value in an option tree.
///
/// Nested [`Options`] are stored by handle, so cloning a value that holds
/// a node shares the node.
#[derive(Debug, Clone, Default)]
pub enum OptionValue {
    /// Explicit null
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer or floating point number
    Number(Number),
    /// Text
    String(String),
    /// Nested option node
    Node(Options),
    /// Ordered list
    Array(Vec<OptionValue>),
}

impl OptionValue {
    /// Short name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Null => "null",
            OptionValue::Bool(_) => "bool",
            OptionValue::Number(_) => "number",
            OptionValue::String(_) => "string",
            OptionValue::Node(_) => "object",
            OptionValue::Array(_) => "array",
        }
    }

    /// Borrow the text of a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The nested node, if this is one
    pub fn as_node(&self) -> Option<&Options> {
        match self {
            OptionValue::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Whether this is [`OptionValue::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, OptionValue::Null)
    }

    /// Copy the value, including every nested node, so nothing is shared
    pub fn deep_clone(&self) -> Self {
        match self {
            OptionValue::Node(node) => OptionValue::Node(node.deep_clone()),
            OptionValue::Array(items) => {
                OptionValue::Array(items.iter().map(OptionValue::deep_clone).collect())
            }
            other => other.clone(),
        }
    }

    /// Convert into a plain JSON value
    pub fn to_json(&self) -> Value {
        match self {
            OptionValue::Null => Value::Null,
            OptionValue::Bool(b) => Value::Bool(*b),
            OptionValue::Number(n) => Value::Number(n.clone()),
            OptionValue::String(s) => Value::String(s.clone()),
            OptionValue::Node(node) => node.to_json_value(),
            OptionValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

/// Numbers compare by value: `1`, `1u64` and `1.0` are equal.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

impl PartialEq for OptionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OptionValue::Null, OptionValue::Null) => true,
            (OptionValue::Bool(a), OptionValue::Bool(b)) => a == b,
            (OptionValue::Number(a), OptionValue::Number(b)) => numbers_equal(a, b),
            (OptionValue::String(a), OptionValue::String(b)) => a == b,
            (OptionValue::Node(a), OptionValue::Node(b)) => a == b,
            (OptionValue::Array(a), OptionValue::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptionValue::Null => serializer.serialize_unit(),
            OptionValue::Bool(b) => serializer.serialize_bool(*b),
            OptionValue::Number(n) => n.serialize(serializer),
            OptionValue::String(s) => serializer.serialize_str(s),
            OptionValue::Node(node) => node.serialize(serializer),
            OptionValue::Array(items) => items.serialize(serializer),
        }
    }
}

impl From<Value> for OptionValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => OptionValue::Null,
            Value::Bool(b) => OptionValue::Bool(b),
            Value::Number(n) => OptionValue::Number(n),
            Value::String(s) => OptionValue::String(s),
            Value::Array(items) => {
                OptionValue::Array(items.into_iter().map(OptionValue::from).collect())
            }
            Value::Object(map) => OptionValue::Node(Options::from_map(
                map.into_iter()
                    .map(|(k, v)| (k, OptionValue::from(v)))
                    .collect(),
            )),
        }
    }
}

impl From<Options> for OptionValue {
    fn from(value: Options) -> Self {
        OptionValue::Node(value)
    }
}

impl From<Vec<OptionValue>> for OptionValue {
    fn from(value: Vec<OptionValue>) -> Self {
        OptionValue::Array(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::String(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<f64> for OptionValue {
    /// NaN and infinities have no JSON form and become [`OptionValue::Null`].
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(OptionValue::Null, OptionValue::Number)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for OptionValue {
                fn from(value: $ty) -> Self {
                    OptionValue::Number(Number::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i32, i64, u32, u64, usize);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(OptionValue::from(10), OptionValue::from(10u64));
        assert_eq!(OptionValue::from(2), OptionValue::from(2.0));
        assert_ne!(OptionValue::from(2), OptionValue::from(2.5));
        assert_ne!(OptionValue::from(-1), OptionValue::from(u64::MAX));
    }

    #[test]
    fn different_variants_are_unequal() {
        assert_ne!(OptionValue::from("1"), OptionValue::from(1));
        assert_ne!(OptionValue::Null, OptionValue::from(false));
    }

    #[test]
    fn json_objects_become_nodes() {
        let value = OptionValue::from(json!({"a": {"b": [1, "two", null]}}));
        let node = value.as_node().unwrap();
        assert_eq!(
            node.get("a").get_object("b"),
            Some(OptionValue::Array(vec![
                1.into(),
                "two".into(),
                OptionValue::Null
            ]))
        );
        assert_eq!(value.to_json(), json!({"a": {"b": [1, "two", null]}}));
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert!(OptionValue::from(f64::NAN).is_null());
    }

    #[test]
    fn deep_clone_detaches_nodes() {
        let node = Options::new();
        node.set("x", 1);
        let value = OptionValue::Node(node.clone());
        let copy = value.deep_clone();
        node.set("x", 2);
        assert_eq!(copy.as_node().unwrap().get_int("x", 0), 1);
    }
}
