use std::sync::Arc;

use crate::{
    error::{Error, ValidationCode},
    schema::{node::SchemaNode, validators::Additional},
};

/// The `items` keyword: one schema for every element, or a tuple of
/// positional schemas.
#[derive(Debug, Default)]
pub(crate) enum ItemsKind {
    #[default]
    Any,
    Single(Arc<SchemaNode>),
    Tuple(Vec<Arc<SchemaNode>>),
}

/// Constraints applied when the instance is an array.
#[derive(Debug, Default)]
pub(crate) struct ArrayValidator {
    pub(crate) items: ItemsKind,
    pub(crate) additional_items: Option<Additional>,
    pub(crate) min_items: Option<u64>,
    pub(crate) max_items: Option<u64>,
    pub(crate) unique_items: bool,
}

impl ArrayValidator {
    /// The schema for the element at `index` (0-based), or a rejection when
    /// the element is not allowed to exist at all.
    pub(crate) fn element_node(
        &self,
        index: u64,
        location: &str,
        offset: u64,
    ) -> Result<Arc<SchemaNode>, Error> {
        if let Some(max) = self.max_items {
            if index >= max {
                return Err(Error::validation(
                    ValidationCode::TooManyItems,
                    format!("array exceeds maxItems {max}"),
                    location,
                    offset,
                ));
            }
        }
        match &self.items {
            ItemsKind::Any => Ok(SchemaNode::any()),
            ItemsKind::Single(node) => Ok(node.clone()),
            ItemsKind::Tuple(tuple) => {
                if let Some(node) = tuple.get(index as usize) {
                    return Ok(node.clone());
                }
                match &self.additional_items {
                    None | Some(Additional::Allowed) => Ok(SchemaNode::any()),
                    Some(Additional::Schema(node)) => Ok(node.clone()),
                    Some(Additional::Forbidden) => Err(Error::validation(
                        ValidationCode::TooManyItems,
                        format!("array is longer than its {}-element tuple", tuple.len()),
                        location,
                        offset,
                    )),
                }
            }
        }
    }

    /// Checks the closing-bracket conditions.
    pub(crate) fn check_close(&self, len: u64, location: &str, offset: u64) -> Result<(), Error> {
        if let Some(min) = self.min_items {
            if len < min {
                return Err(Error::validation(
                    ValidationCode::TooFewItems,
                    format!("array has fewer than minItems {min} elements"),
                    location,
                    offset,
                ));
            }
        }
        Ok(())
    }
}
