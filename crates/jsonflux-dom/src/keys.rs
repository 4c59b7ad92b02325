use std::sync::Arc;

use ahash::AHashSet;

/// Interned storage for object keys.
///
/// Parsing the same schema-shaped documents over and over produces the same
/// handful of keys; interning makes every occurrence share one allocation,
/// which in turn lets key comparison take the pointer-identity fast path.
/// The dictionary is opt-in and owned by a single parse session.
#[derive(Debug, Default)]
pub struct KeyDictionary {
    keys: AHashSet<Arc<str>>,
}

impl KeyDictionary {
    pub fn new() -> KeyDictionary {
        KeyDictionary::default()
    }

    /// The shared allocation for `key`, creating it on first sight.
    pub fn intern(&mut self, key: &str) -> Arc<str> {
        if let Some(existing) = self.keys.get(key) {
            return existing.clone();
        }
        let shared: Arc<str> = Arc::from(key);
        self.keys.insert(shared.clone());
        shared
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
