use std::{cmp::Ordering, sync::Arc};

use ahash::AHashMap;

use crate::{error::ValueError, value::Value};

type Members = AHashMap<Arc<str>, Value>;

/// A JSON object with a shared, copy-on-write member store.
///
/// Keys are non-empty shared strings; lookups take an identity fast path
/// when both sides come from the same interned allocation. Iteration order
/// is unspecified; membership count is O(1). Duplicate keys collapse with
/// last-write-wins.
#[derive(Clone, Debug, Default)]
pub struct Object {
    members: Arc<Members>,
}

impl Object {
    pub fn new() -> Object {
        Object::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.members.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.members.contains_key(key)
    }

    /// Inserts `value` under `key`, returning the previous member if any.
    /// Empty keys are rejected; the passed value is consumed either way.
    pub fn put(&mut self, key: &str, value: Value) -> Result<Option<Value>, ValueError> {
        if key.is_empty() {
            return Err(ValueError::EmptyKey);
        }
        Ok(Arc::make_mut(&mut self.members).insert(Arc::from(key), value))
    }

    /// [`Object::put`] reusing an already shared (interned) key allocation.
    pub fn put_shared(&mut self, key: Arc<str>, value: Value) -> Result<Option<Value>, ValueError> {
        if key.is_empty() {
            return Err(ValueError::EmptyKey);
        }
        Ok(Arc::make_mut(&mut self.members).insert(key, value))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if !self.members.contains_key(key) {
            return None;
        }
        Arc::make_mut(&mut self.members).remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.members.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.members.keys()
    }

    /// Member keys in sorted order; the serializer and the entry-order
    /// comparison both rely on this for determinism.
    pub fn sorted_keys(&self) -> Vec<&Arc<str>> {
        let mut keys: Vec<&Arc<str>> = self.members.keys().collect();
        keys.sort_unstable_by(|a, b| sorted_key_cmp(a, b));
        keys
    }

    pub(crate) fn identity(&self) -> *const () {
        Arc::as_ptr(&self.members).cast()
    }

    /// Order by sorted key sequence, then by values at matching keys.
    pub(crate) fn cmp_entries(&self, other: &Object) -> Ordering {
        if Arc::ptr_eq(&self.members, &other.members) {
            return Ordering::Equal;
        }
        let mut a_entries: Vec<(&Arc<str>, &Value)> = self.members.iter().collect();
        let mut b_entries: Vec<(&Arc<str>, &Value)> = other.members.iter().collect();
        a_entries.sort_unstable_by(|x, y| sorted_key_cmp(x.0, y.0));
        b_entries.sort_unstable_by(|x, y| sorted_key_cmp(x.0, y.0));
        for ((a_key, a_value), (b_key, b_value)) in a_entries.iter().zip(&b_entries) {
            match sorted_key_cmp(a_key, b_key) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
            match a_value.cmp(b_value) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        a_entries.len().cmp(&b_entries.len())
    }
}

/// Bytewise key order with the interned-identity fast path.
fn sorted_key_cmp(a: &Arc<str>, b: &Arc<str>) -> Ordering {
    if Arc::ptr_eq(a, b) {
        Ordering::Equal
    } else {
        a.as_bytes().cmp(b.as_bytes())
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_entries(other) == Ordering::Equal
    }
}

impl Eq for Object {}
