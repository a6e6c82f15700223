//! XML-RPC value model.
//!
//! The GBX dialect uses a restricted XML-RPC vocabulary: `i4`, `boolean`,
//! `double`, `string`, `base64`, `array` and `struct`. Values form a
//! tagged union with typed accessors.

use std::collections::BTreeMap;

/// One XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<i4>` / `<int>`.
    Int(i32),
    /// `<boolean>`.
    Bool(bool),
    /// `<double>`.
    Double(f64),
    /// `<string>` or untagged text.
    String(String),
    /// `<base64>`.
    Base64(Vec<u8>),
    /// `<array>`.
    Array(Vec<Value>),
    /// `<struct>`.
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// Get as i32 if this is an `Int`.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as bool if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as f64 if this is a `Double`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Get as &str if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as byte slice if this is a `Base64`.
    pub fn as_base64(&self) -> Option<&[u8]> {
        match self {
            Value::Base64(b) => Some(b),
            _ => None,
        }
    }

    /// Get as slice of values if this is an `Array`.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get as member map if this is a `Struct`.
    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Look up a struct member by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_struct().and_then(|m| m.get(name))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(members: BTreeMap<String, Value>) -> Self {
        Value::Struct(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_match_variant() {
        assert_eq!(Value::Int(7).as_i32(), Some(7));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Double(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::String("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Int(7).as_str(), None);
        assert_eq!(Value::String("x".into()).as_i32(), None);
    }

    #[test]
    fn test_struct_get() {
        let mut members = BTreeMap::new();
        members.insert("Login".to_string(), Value::from("nadeo"));
        let value = Value::Struct(members);

        assert_eq!(value.get("Login").and_then(Value::as_str), Some("nadeo"));
        assert!(value.get("Missing").is_none());
        assert!(Value::Int(1).get("Login").is_none());
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from("hi"), Value::String("hi".to_string()));
        assert_eq!(
            Value::from(vec![Value::Int(1)]),
            Value::Array(vec![Value::Int(1)])
        );
    }
}
