mod array;
mod object;

use std::{
    cmp::Ordering,
    fmt,
    sync::{Arc, LazyLock},
};

pub use array::{Array, Splice};
pub use object::Object;

use crate::{error::ValueError, number::Number};

/// Process-wide empty-string singleton; `Value::string("")` always hands out
/// another reference to this allocation.
static EMPTY_STRING: LazyLock<Arc<str>> = LazyLock::new(|| Arc::from(""));

/// The sentinel returned by infallible accessors on a miss.
static INVALID: Value = Value::Invalid;

/// A JSON value.
///
/// Containers and strings are `Arc`-shared: `clone` is O(1) and hands out
/// another reference, mutation is copy-on-write through `&mut self`. A value
/// is therefore logically immutable once inserted into a container; an
/// unshared one is updated in place, invisibly to other holders.
///
/// `Invalid` is a distinguished sentinel meaning "operation produced no
/// value". It serializes like `null` but is recognizable via
/// [`Value::is_valid`], and it never appears inside a container built by the
/// parser.
#[derive(Clone, Debug, Default)]
pub enum Value {
    Invalid,
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Array),
    Object(Object),
}

impl Value {
    /// A shared string value; the empty string is a process-wide singleton.
    pub fn string(text: &str) -> Value {
        if text.is_empty() {
            Value::String(EMPTY_STRING.clone())
        } else {
            Value::String(Arc::from(text))
        }
    }

    /// A string value reusing an existing shared allocation.
    pub fn shared_string(text: Arc<str>) -> Value {
        Value::String(text)
    }

    pub fn number_from_i64(value: i64) -> Value {
        Value::Number(Number::from_i64(value))
    }

    pub fn number_from_f64(value: f64) -> Result<Value, ValueError> {
        Ok(Value::Number(Number::from_f64(value)?))
    }

    /// A raw number keeping `lexeme` verbatim; see [`Number::from_lexeme`].
    pub fn number_from_lexeme(lexeme: &str) -> Result<Value, ValueError> {
        Ok(Value::Number(Number::from_lexeme(lexeme)?))
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Invalid)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(ValueError::NotABoolean),
        }
    }

    /// The lossy truthiness projection kept for legacy callers: numbers are
    /// true when non-zero, strings when non-empty, containers always, null
    /// and invalid never. New code should use [`Value::as_bool`].
    pub fn coerce_bool(&self) -> bool {
        match self {
            Value::Invalid | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => {
                let (value, _) = n.as_f64();
                value != 0.0
            }
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Element at `index`, or the `Invalid` sentinel when out of bounds or
    /// not an array.
    pub fn at(&self, index: usize) -> &Value {
        self.try_at(index).unwrap_or(&INVALID)
    }

    pub fn try_at(&self, index: usize) -> Option<&Value> {
        self.as_array().and_then(|a| a.get(index))
    }

    /// Member under `key`, or the `Invalid` sentinel when absent or not an
    /// object.
    pub fn get(&self, key: &str) -> &Value {
        self.try_get(key).unwrap_or(&INVALID)
    }

    pub fn try_get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Number of children for containers, 0 for scalars.
    pub fn len(&self) -> usize {
        match self {
            Value::Array(a) => a.len(),
            Value::Object(o) => o.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deep copy sharing no mutable storage with `self`.
    pub fn duplicate(&self) -> Value {
        match self {
            Value::Array(a) => {
                let mut out = Array::with_capacity(a.len());
                for item in a.iter() {
                    out.push(item.duplicate());
                }
                Value::Array(out)
            }
            Value::Object(o) => {
                let mut out = Object::new();
                for (key, value) in o.iter() {
                    // Keys are immutable, sharing them is safe.
                    out.put_shared(key.clone(), value.duplicate());
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }

    /// The address of the shared payload for containers; `None` for scalars.
    pub fn identity(&self) -> Option<*const ()> {
        match self {
            Value::Array(a) => Some(a.identity()),
            Value::Object(o) => Some(o.identity()),
            _ => None,
        }
    }

    /// True when any container transitively reachable from `self` is the
    /// same allocation as `target`. Copy-on-write makes a true cycle
    /// unrepresentable; this predicate exists to assert that.
    pub fn contains_identity(&self, target: &Value) -> bool {
        let Some(wanted) = target.identity() else {
            return false;
        };
        self.contains_ptr(wanted)
    }

    fn contains_ptr(&self, wanted: *const ()) -> bool {
        match self {
            Value::Array(a) => {
                std::ptr::eq(a.identity(), wanted)
                    || a.iter().any(|item| item.contains_ptr(wanted))
            }
            Value::Object(o) => {
                std::ptr::eq(o.identity(), wanted)
                    || o.iter().any(|(_, value)| value.contains_ptr(wanted))
            }
            _ => false,
        }
    }

    fn tag_index(&self) -> u8 {
        match self {
            Value::Invalid => 0,
            Value::Null => 1,
            Value::Bool(_) => 2,
            Value::Number(_) => 3,
            Value::String(_) => 4,
            Value::Array(_) => 5,
            Value::Object(_) => 6,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    /// Total order: tag index first (Null < Bool < Number < String < Array
    /// < Object, with `Invalid` below everything), then value-specific
    /// order. Strings compare bytewise, arrays elementwise with shorter <
    /// longer on a common prefix, objects by sorted key sequence and then
    /// by the values at matching keys.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Invalid, Value::Invalid) | (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.numeric_cmp(b),
            (Value::String(a), Value::String(b)) => {
                // Interned keys share an allocation; skip the byte compare
                // when both sides are the same one.
                if Arc::ptr_eq(a, b) {
                    Ordering::Equal
                } else {
                    a.as_bytes().cmp(b.as_bytes())
                }
            }
            (Value::Array(a), Value::Array(b)) => a.cmp_elements(b),
            (Value::Object(a), Value::Object(b)) => a.cmp_entries(b),
            (a, b) => a.tag_index().cmp(&b.tag_index()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::number_from_i64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::string(value)
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Value {
        Value::Number(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Value {
        Value::Array(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Value {
        Value::Object(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::generate::serialize(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_a_singleton() {
        let a = Value::string("");
        let b = Value::string("");
        let (Value::String(a), Value::String(b)) = (&a, &b) else {
            panic!("expected strings");
        };
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn singleton_release_has_no_observable_effect() {
        let before = Value::string("");
        let extra = before.clone();
        drop(extra);
        assert_eq!(before, Value::string(""));
    }

    #[test]
    fn invalid_is_distinguishable_from_null() {
        assert!(!Value::Invalid.is_valid());
        assert!(Value::Null.is_valid());
        assert!(!Value::Invalid.is_null());
        assert_ne!(Value::Invalid, Value::Null);
    }

    #[test]
    fn missing_access_yields_invalid() {
        let mut obj = Object::new();
        obj.put("a", Value::from(1)).unwrap();
        let value = Value::Object(obj);
        assert!(!value.get("missing").is_valid());
        assert!(!value.at(3).is_valid());
        assert!(value.get("a").is_valid());
    }

    #[test]
    fn tag_order_is_total() {
        let values = [
            Value::Null,
            Value::Bool(false),
            Value::from(1),
            Value::string("a"),
            Value::Array(Array::new()),
            Value::Object(Object::new()),
        ];
        for (i, a) in values.iter().enumerate() {
            for (j, b) in values.iter().enumerate() {
                assert_eq!(a.cmp(b), i.cmp(&j), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn equal_iff_compare_zero() {
        let a = Value::number_from_lexeme("1.0").unwrap();
        let b = Value::from(1);
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a, b);
    }

    #[test]
    fn array_prefix_orders_before_longer() {
        let mut short = Array::new();
        short.push(Value::from(1));
        let mut long = Array::new();
        long.push(Value::from(1));
        long.push(Value::from(2));
        assert!(Value::Array(short) < Value::Array(long));
    }

    #[test]
    fn object_order_by_sorted_keys_then_values() {
        let mut a = Object::new();
        a.put("x", Value::from(1)).unwrap();
        let mut b = Object::new();
        b.put("x", Value::from(2)).unwrap();
        assert!(Value::Object(a) < Value::Object(b));
    }

    #[test]
    fn duplicate_shares_no_mutable_storage() {
        let mut inner = Array::new();
        inner.push(Value::from(1));
        let mut obj = Object::new();
        obj.put("items", Value::Array(inner)).unwrap();
        let original = Value::Object(obj);

        let copy = original.duplicate();
        assert_eq!(copy, original);
        assert!(!copy.contains_identity(&original));
        assert!(!copy
            .get("items")
            .contains_identity(original.get("items")));
    }

    #[test]
    fn clone_shares_storage() {
        let mut arr = Array::new();
        arr.push(Value::from(1));
        let value = Value::Array(arr);
        let alias = value.clone();
        assert!(alias.contains_identity(&value));
    }

    #[test]
    fn coercion_and_typed_bool_read() {
        assert!(Value::from("x").coerce_bool());
        assert!(!Value::string("").coerce_bool());
        assert!(!Value::Null.coerce_bool());
        assert!(!Value::from(0).coerce_bool());
        assert!(Value::from(2).coerce_bool());
        assert_eq!(Value::from(2).as_bool(), Err(ValueError::NotABoolean));
        assert_eq!(Value::Bool(true).as_bool(), Ok(true));
    }
}
