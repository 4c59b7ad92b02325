use ahash::AHashMap;

/// Registry from `(document, fragment)` locations to compiled artifacts.
///
/// Fragments are `#`-prefixed JSON pointers (or named `definitions`
/// entries); the whole document registers under `#`. A document whose
/// fragment table is still empty has been *mentioned* (by a `$ref`) but not
/// compiled yet — the resolution loop uses that to drive external
/// retrieval.
#[derive(Debug)]
pub struct Registry<T> {
    documents: AHashMap<Box<str>, AHashMap<Box<str>, T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Registry {
            documents: AHashMap::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Registry<T> {
        Registry::default()
    }

    /// Makes sure `document` has an entry, without registering fragments.
    pub fn add_document(&mut self, document: &str) {
        if !self.documents.contains_key(document) {
            self.documents.insert(document.into(), AHashMap::new());
        }
    }

    /// Registers `value` at the location. Returns `false` when the fragment
    /// was already taken; the first registration wins.
    pub fn register(&mut self, document: &str, fragment: &str, value: T) -> bool {
        let fragments = self
            .documents
            .entry(document.into())
            .or_insert_with(AHashMap::new);
        if fragments.contains_key(fragment) {
            return false;
        }
        fragments.insert(fragment.into(), value);
        true
    }

    pub fn lookup(&self, document: &str, fragment: &str) -> Option<&T> {
        self.documents.get(document)?.get(fragment)
    }

    /// A document that was mentioned but has no registered fragments yet.
    pub fn unresolved_document(&self) -> Option<&str> {
        self.documents
            .iter()
            .find(|(_, fragments)| fragments.is_empty())
            .map(|(document, _)| document.as_ref())
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registration_wins() {
        let mut registry = Registry::new();
        assert!(registry.register("doc", "#", 1));
        assert!(!registry.register("doc", "#", 2));
        assert_eq!(registry.lookup("doc", "#"), Some(&1));
    }

    #[test]
    fn mentioned_documents_are_reported_unresolved() {
        let mut registry: Registry<u32> = Registry::new();
        registry.add_document("http://example.com/other.json");
        assert_eq!(
            registry.unresolved_document(),
            Some("http://example.com/other.json")
        );
        registry.register("http://example.com/other.json", "#", 7);
        assert_eq!(registry.unresolved_document(), None);
    }

    #[test]
    fn lookup_misses_cleanly() {
        let registry: Registry<u32> = Registry::new();
        assert_eq!(registry.lookup("nope", "#"), None);
    }
}
