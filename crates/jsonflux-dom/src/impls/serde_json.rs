//! Conversions between [`Value`] and `serde_json::Value`.
//!
//! The bridge keeps the rest of the serde ecosystem reachable: fixtures in
//! tests are written with `serde_json::json!`, and callers that already hold
//! a `serde_json` tree can convert it instead of re-serializing.

use crate::{
    number::Number,
    value::{Array, Object, Value},
};

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Number(Number::from_i64(i))
                } else if let Some(f) = n.as_f64() {
                    // serde_json numbers are finite, from_f64 cannot fail.
                    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
                } else {
                    // u64 beyond i64 range: keep the digits as a raw lexeme.
                    Number::from_lexeme(&n.to_string())
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::string(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from).collect())
            }
            serde_json::Value::Object(members) => {
                let mut object = Object::new();
                for (key, member) in members {
                    // serde_json allows the empty key; this model does not,
                    // so such members are dropped on conversion.
                    let _ = object.put(key, Value::from(member));
                }
                Value::Object(object)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        Value::from(&value)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> serde_json::Value {
        match value {
            Value::Invalid | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                let (int, flags) = n.as_i64();
                if flags.is_ok() {
                    serde_json::Value::from(int)
                } else {
                    let (float, _) = n.as_f64();
                    serde_json::Value::from(float)
                }
            }
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(members) => {
                let mut out = serde_json::Map::with_capacity(members.len());
                for (key, member) in members.iter() {
                    out.insert(key.to_string(), serde_json::Value::from(member));
                }
                serde_json::Value::Object(out)
            }
        }
    }
}

impl PartialEq<serde_json::Value> for Value {
    fn eq(&self, other: &serde_json::Value) -> bool {
        *self == Value::from(other)
    }
}

impl PartialEq<Value> for serde_json::Value {
    fn eq(&self, other: &Value) -> bool {
        other == self
    }
}
