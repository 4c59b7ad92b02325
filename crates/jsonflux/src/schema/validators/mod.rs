mod array;
mod combined;
mod enum_;
mod generic;
mod number;
mod object;
mod reference;
mod string;

use std::sync::Arc;

pub(crate) use array::{ArrayValidator, ItemsKind};
pub(crate) use combined::{CombineMode, CombinedValidator};
pub(crate) use enum_::EnumValidator;
pub(crate) use generic::{GenericValidator, TypeSet};
pub(crate) use number::NumberValidator;
pub(crate) use object::{ObjectValidator, PatternProperty, PropertyMatch};
pub(crate) use reference::ReferenceValidator;
pub(crate) use string::StringValidator;

use crate::schema::node::SchemaNode;

/// Policy for children not covered by an explicit schema: object members
/// outside `properties`/`patternProperties`, array elements past a tuple.
#[derive(Debug)]
pub(crate) enum Additional {
    Allowed,
    Forbidden,
    Schema(Arc<SchemaNode>),
}
