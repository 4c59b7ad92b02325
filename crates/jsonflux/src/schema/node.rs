use std::sync::{Arc, LazyLock};

use jsonflux_dom::Value;

use crate::{
    error::{Error, ValidationCode},
    schema::validators::{
        ArrayValidator, CombinedValidator, EnumValidator, GenericValidator, NumberValidator,
        ObjectValidator, ReferenceValidator, StringValidator,
    },
};

/// One compiled validator node.
///
/// A resolved tree of these is immutable and shared (`Arc`) between the
/// schema registry, `$ref` targets and live validation frames.
#[derive(Debug)]
pub(crate) struct SchemaNode {
    pub(crate) kind: ValidatorKind,
    /// Value injected for an absent object property whose schema is this
    /// node.
    pub(crate) default: Option<Value>,
    /// Schema fragment this node was compiled from, for error reporting.
    pub(crate) location: Box<str>,
}

/// One validator per JSON type, plus the generic, combining, referencing
/// and enumerating forms.
#[derive(Debug)]
pub(crate) enum ValidatorKind {
    Null,
    Boolean,
    String(StringValidator),
    Number(NumberValidator),
    Array(ArrayValidator),
    Object(ObjectValidator),
    Generic(GenericValidator),
    Combined(CombinedValidator),
    Reference(ReferenceValidator),
    Enum(EnumValidator),
}

/// The accept-everything node used for unconstrained children.
static ANY: LazyLock<Arc<SchemaNode>> = LazyLock::new(|| {
    Arc::new(SchemaNode {
        kind: ValidatorKind::Generic(GenericValidator::default()),
        default: None,
        location: "#".into(),
    })
});

impl SchemaNode {
    pub(crate) fn any() -> Arc<SchemaNode> {
        ANY.clone()
    }

    /// Follows `$ref` indirections to the node that actually validates.
    ///
    /// Chains are cycle-checked during `resolve`, so the loop bound only
    /// guards against unresolved schemas used directly.
    pub(crate) fn dereference(start: &Arc<SchemaNode>, offset: u64) -> Result<Arc<SchemaNode>, Error> {
        let mut node = start.clone();
        for _ in 0..64 {
            let ValidatorKind::Reference(reference) = &node.kind else {
                return Ok(node);
            };
            node = reference.target().ok_or_else(|| {
                Error::validation(
                    ValidationCode::RefUnresolved,
                    format!("unresolved reference {}", reference.uri()),
                    node.location.as_ref(),
                    offset,
                )
            })?;
        }
        Err(Error::internal("reference chain too long"))
    }

    /// The object constraints that apply when this node validates an
    /// object, from either the typed or the generic form.
    pub(crate) fn object_validator(&self) -> Option<&ObjectValidator> {
        match &self.kind {
            ValidatorKind::Object(validator) => Some(validator),
            ValidatorKind::Generic(generic) => generic.object.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn array_validator(&self) -> Option<&ArrayValidator> {
        match &self.kind {
            ValidatorKind::Array(validator) => Some(validator),
            ValidatorKind::Generic(generic) => generic.array.as_ref(),
            _ => None,
        }
    }
}
