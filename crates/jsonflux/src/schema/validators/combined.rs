use std::sync::Arc;

use crate::{error::ValidationCode, schema::node::SchemaNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CombineMode {
    AllOf,
    AnyOf,
    OneOf,
    Not,
}

impl CombineMode {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            CombineMode::AllOf => "allOf",
            CombineMode::AnyOf => "anyOf",
            CombineMode::OneOf => "oneOf",
            CombineMode::Not => "not",
        }
    }

    pub(crate) fn failure_code(self) -> ValidationCode {
        match self {
            CombineMode::AllOf => ValidationCode::AllOfFailed,
            CombineMode::AnyOf => ValidationCode::AnyOfFailed,
            CombineMode::OneOf => ValidationCode::OneOfFailed,
            CombineMode::Not => ValidationCode::NotFailed,
        }
    }
}

/// A combinator over child schemas.
///
/// The verdict is a function of the branch verdicts: `allOf` demands every
/// branch, `anyOf` at least one, `oneOf` exactly one, `not` inverts its
/// single branch. Branches are kept in schema source order; the state
/// machine multiplexes events to all of them and reports the first failing
/// branch's error.
#[derive(Debug)]
pub(crate) struct CombinedValidator {
    pub(crate) mode: CombineMode,
    pub(crate) branches: Vec<Arc<SchemaNode>>,
}
