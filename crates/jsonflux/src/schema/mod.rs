pub(crate) mod compiler;
pub(crate) mod node;
pub(crate) mod validators;

use std::sync::Arc;

use ahash::AHashSet;
use jsonflux_dom::{traverse, Value, Visitor};
use jsonflux_referencing::{DefaultRetriever, Retrieve};
use tracing::debug;

use crate::{
    error::Error,
    events::{Event, NumberKind},
    schema::{
        compiler::CompiledSet,
        node::{SchemaNode, ValidatorKind},
    },
    validation::{ValidationCtx, ValidationState},
};

/// A compiled JSON-Schema (Draft 4) document.
///
/// Compilation is two-pass: the schema text is parsed as an ordinary JSON
/// document, then lowered into a tree of typed validators; `$ref` nodes are
/// placeholders until [`Schema::resolve`] links them through the URI
/// registry. A resolved schema is immutable and can validate any number of
/// concurrent parse sessions.
pub struct Schema {
    root: Arc<SchemaNode>,
    set: CompiledSet,
}

impl Schema {
    /// Compiles schema text and resolves local references.
    pub fn parse(text: &str) -> Result<Schema, Error> {
        Schema::parse_with(text, &DefaultRetriever)
    }

    /// Compiles schema text, resolving external references through
    /// `retriever`.
    pub fn parse_with(text: &str, retriever: &dyn Retrieve) -> Result<Schema, Error> {
        let document = crate::parser::parse(text)?;
        Schema::from_value_with(&document, retriever)
    }

    /// Compiles a schema that is already a DOM value.
    pub fn from_value(schema: &Value) -> Result<Schema, Error> {
        Schema::from_value_with(schema, &DefaultRetriever)
    }

    pub fn from_value_with(schema: &Value, retriever: &dyn Retrieve) -> Result<Schema, Error> {
        let mut set = CompiledSet::new();
        let root = compiler::compile(schema, None, &mut set)?;
        let mut compiled = Schema { root, set };
        compiled.resolve(retriever)?;
        Ok(compiled)
    }

    /// Links every `$ref` to its target, fetching external documents
    /// through `retriever` as needed. Idempotent: resolving an already
    /// resolved schema is a no-op.
    pub fn resolve(&mut self, retriever: &dyn Retrieve) -> Result<(), Error> {
        let mut attempted: AHashSet<String> = AHashSet::new();
        loop {
            self.link_local();
            let Some(document) = self.set.registry.unresolved_document() else {
                break;
            };
            let document = document.to_string();
            if !attempted.insert(document.clone()) {
                return Err(Error::schema(
                    format!("external document {document} did not resolve itself"),
                    "#",
                ));
            }
            debug!(document = document.as_str(), "retrieving external schema");
            let retrieved = retriever.retrieve(&document)?;
            let parsed = crate::parser::parse(&retrieved.text)?;
            let base = retrieved.base_uri.as_deref().unwrap_or(document.as_str());
            let root = compiler::compile(&parsed, Some(base), &mut self.set)?;
            // Reachable under the URI it was requested as, even when the
            // document declares a different base.
            self.set.registry.register(&document, "#", root);
        }
        self.check_links()?;
        Ok(())
    }

    /// Links references whose targets are already in the registry.
    fn link_local(&self) {
        for node in &self.set.references {
            let ValidatorKind::Reference(reference) = &node.kind else {
                continue;
            };
            if reference.is_linked() {
                continue;
            }
            if let Some(target) = self
                .set
                .registry
                .lookup(reference.document(), reference.fragment())
            {
                reference.link(target);
            }
        }
    }

    /// After resolution: every reference linked, no reference-to-reference
    /// cycle.
    fn check_links(&self) -> Result<(), Error> {
        for node in &self.set.references {
            let ValidatorKind::Reference(reference) = &node.kind else {
                continue;
            };
            if !reference.is_linked() {
                return Err(Error::schema(
                    format!("unresolved reference {}", reference.uri()),
                    node.location.as_ref(),
                ));
            }
            let mut seen: AHashSet<*const SchemaNode> = AHashSet::new();
            seen.insert(Arc::as_ptr(node));
            let mut current = node.clone();
            while let ValidatorKind::Reference(step) = &current.kind {
                let Some(next) = step.target() else {
                    return Err(Error::schema(
                        format!("unresolved reference {}", step.uri()),
                        current.location.as_ref(),
                    ));
                };
                if !seen.insert(Arc::as_ptr(&next)) {
                    return Err(Error::schema(
                        format!("cyclic reference chain through {}", step.uri()),
                        node.location.as_ref(),
                    ));
                }
                current = next;
            }
        }
        Ok(())
    }

    pub(crate) fn root(&self) -> Arc<SchemaNode> {
        self.root.clone()
    }

    /// Validates an existing DOM against the schema, without touching it.
    pub fn validate(&self, instance: &Value) -> Result<(), Error> {
        let mut pump = EventPump {
            state: ValidationState::new(self.root()),
            ctx: ValidationCtx::new(false),
        };
        traverse(instance, &mut pump)?;
        if !pump.state.is_complete() {
            return Err(Error::internal("validation ended mid-instance"));
        }
        Ok(())
    }

    /// Validates `instance` and returns a copy enriched with the schema's
    /// `default` members for absent properties.
    pub fn apply(&self, instance: &Value) -> Result<Value, Error> {
        let text = jsonflux_dom::serialize(instance);
        crate::parser::parse_with_schema(&text, self)
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("documents", &self.set.registry.document_count())
            .field("references", &self.set.references.len())
            .finish()
    }
}

/// Replays a DOM as SAX events into a validation machine; used for
/// post-parse validation.
struct EventPump {
    state: ValidationState,
    ctx: ValidationCtx,
}

impl EventPump {
    fn push(&mut self, event: Event<'_>) -> Result<(), Error> {
        self.state.check(&event, &mut self.ctx)
    }
}

impl Visitor for EventPump {
    type Err = Error;

    fn on_null(&mut self) -> Result<(), Error> {
        self.push(Event::Null)
    }

    fn on_bool(&mut self, value: bool) -> Result<(), Error> {
        self.push(Event::Bool(value))
    }

    fn on_number(&mut self, value: &jsonflux_dom::Number) -> Result<(), Error> {
        let lexeme = match value.as_raw() {
            Some(raw) => raw.to_string(),
            None => value.to_string(),
        };
        let kind = if lexeme.contains(['.', 'e', 'E']) {
            NumberKind::Decimal
        } else {
            NumberKind::Integer
        };
        self.push(Event::Number(&lexeme, kind))
    }

    fn on_string(&mut self, value: &str) -> Result<(), Error> {
        self.push(Event::String(value))
    }

    fn begin_object(&mut self, _len: usize) -> Result<(), Error> {
        self.push(Event::ObjectBegin)
    }

    fn on_key(&mut self, key: &str) -> Result<(), Error> {
        self.push(Event::Key(key))
    }

    fn end_object(&mut self) -> Result<(), Error> {
        self.push(Event::ObjectEnd)
    }

    fn begin_array(&mut self, _len: usize) -> Result<(), Error> {
        self.push(Event::ArrayBegin)
    }

    fn end_array(&mut self) -> Result<(), Error> {
        self.push(Event::ArrayEnd)
    }
}
