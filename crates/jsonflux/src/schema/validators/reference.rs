use std::sync::{Arc, OnceLock, Weak};

use crate::schema::node::SchemaNode;

/// A `$ref` placeholder, linked to its target by `resolve`.
///
/// The target is held weakly: every node is owned by the schema's registry,
/// and a strong link here would turn self-referential schemas into leaked
/// `Arc` cycles.
#[derive(Debug)]
pub(crate) struct ReferenceValidator {
    /// Absolute target URI, split for registry lookup.
    uri: Box<str>,
    document: Box<str>,
    fragment: Box<str>,
    target: OnceLock<Weak<SchemaNode>>,
}

impl ReferenceValidator {
    pub(crate) fn new(uri: &str, document: &str, fragment: &str) -> ReferenceValidator {
        ReferenceValidator {
            uri: uri.into(),
            document: document.into(),
            fragment: fragment.into(),
            target: OnceLock::new(),
        }
    }

    pub(crate) fn uri(&self) -> &str {
        &self.uri
    }

    pub(crate) fn document(&self) -> &str {
        &self.document
    }

    pub(crate) fn fragment(&self) -> &str {
        &self.fragment
    }

    pub(crate) fn is_linked(&self) -> bool {
        self.target.get().is_some()
    }

    /// Links the reference; later calls are ignored, keeping `resolve`
    /// idempotent.
    pub(crate) fn link(&self, target: &Arc<SchemaNode>) {
        let _ = self.target.set(Arc::downgrade(target));
    }

    pub(crate) fn target(&self) -> Option<Arc<SchemaNode>> {
        self.target.get().and_then(Weak::upgrade)
    }
}
