use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use regex::Regex;
use smallvec::SmallVec;

use crate::{
    error::{Error, ValidationCode},
    schema::{node::SchemaNode, validators::Additional},
};

#[derive(Debug)]
pub(crate) struct PatternProperty {
    pub(crate) regex: Regex,
    pub(crate) node: Arc<SchemaNode>,
}

/// Constraints applied when the instance is an object.
#[derive(Debug, Default)]
pub(crate) struct ObjectValidator {
    pub(crate) properties: AHashMap<Box<str>, Arc<SchemaNode>>,
    pub(crate) pattern_properties: Vec<PatternProperty>,
    pub(crate) additional_properties: Option<Additional>,
    /// Schema order, for deterministic error messages.
    pub(crate) required: Vec<Box<str>>,
    pub(crate) required_set: AHashSet<Box<str>>,
    pub(crate) min_properties: Option<u64>,
    pub(crate) max_properties: Option<u64>,
}

/// What a member name matched.
pub(crate) enum PropertyMatch {
    /// The schemas the member value must satisfy, conjunctively: the
    /// `properties` entry plus every matching `patternProperties` regex.
    Schemas(SmallVec<[Arc<SchemaNode>; 2]>),
    /// Neither matched and `additionalProperties` permits the member.
    Additional(Arc<SchemaNode>),
    /// Neither matched and `additionalProperties` is `false`.
    Forbidden,
}

impl ObjectValidator {
    pub(crate) fn match_property(&self, key: &str) -> PropertyMatch {
        let mut nodes: SmallVec<[Arc<SchemaNode>; 2]> = SmallVec::new();
        if let Some(node) = self.properties.get(key) {
            nodes.push(node.clone());
        }
        for pattern in &self.pattern_properties {
            if pattern.regex.is_match(key) {
                nodes.push(pattern.node.clone());
            }
        }
        if !nodes.is_empty() {
            return PropertyMatch::Schemas(nodes);
        }
        match &self.additional_properties {
            None | Some(Additional::Allowed) => PropertyMatch::Additional(SchemaNode::any()),
            Some(Additional::Schema(node)) => PropertyMatch::Additional(node.clone()),
            Some(Additional::Forbidden) => PropertyMatch::Forbidden,
        }
    }

    /// `(key, default)` pairs for properties that inject one, in key order
    /// so that synthesized members are deterministic.
    pub(crate) fn defaults(&self) -> Vec<(Box<str>, &SchemaNode)> {
        let mut entries: Vec<(Box<str>, &SchemaNode)> = self
            .properties
            .iter()
            .filter(|(_, node)| node.default.is_some())
            .map(|(key, node)| (key.clone(), node.as_ref()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub(crate) fn check_max(&self, count: u64, location: &str, offset: u64) -> Result<(), Error> {
        if let Some(max) = self.max_properties {
            if count > max {
                return Err(Error::validation(
                    ValidationCode::TooManyProperties,
                    format!("object exceeds maxProperties {max}"),
                    location,
                    offset,
                ));
            }
        }
        Ok(())
    }

    /// Checks the closing-brace conditions; `missing` is the set of
    /// required keys that never appeared.
    pub(crate) fn check_close(
        &self,
        count: u64,
        missing: &AHashSet<Box<str>>,
        location: &str,
        offset: u64,
    ) -> Result<(), Error> {
        if let Some(min) = self.min_properties {
            if count < min {
                return Err(Error::validation(
                    ValidationCode::TooFewProperties,
                    format!("object has fewer than minProperties {min} members"),
                    location,
                    offset,
                ));
            }
        }
        if !missing.is_empty() {
            // Report the first missing key in schema order.
            let key = self
                .required
                .iter()
                .find(|key| missing.contains(*key))
                .map(|key| key.as_ref())
                .unwrap_or_default();
            return Err(Error::validation(
                ValidationCode::MissingRequiredKey,
                format!("missing required key {key:?}"),
                location,
                offset,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator_with(
        properties: &[&str],
        patterns: &[&str],
        additional: Option<Additional>,
    ) -> ObjectValidator {
        ObjectValidator {
            properties: properties
                .iter()
                .map(|name| (Box::from(*name), SchemaNode::any()))
                .collect(),
            pattern_properties: patterns
                .iter()
                .map(|pattern| PatternProperty {
                    regex: Regex::new(pattern).unwrap(),
                    node: SchemaNode::any(),
                })
                .collect(),
            additional_properties: additional,
            ..ObjectValidator::default()
        }
    }

    #[test]
    fn named_and_pattern_matches_combine() {
        let validator = validator_with(&["port"], &["^p"], None);
        match validator.match_property("port") {
            PropertyMatch::Schemas(nodes) => assert_eq!(nodes.len(), 2),
            _ => panic!("expected schema matches"),
        }
    }

    #[test]
    fn unmatched_falls_back_to_additional() {
        let validator = validator_with(&["a"], &[], Some(Additional::Forbidden));
        assert!(matches!(
            validator.match_property("b"),
            PropertyMatch::Forbidden
        ));
        let validator = validator_with(&["a"], &[], None);
        assert!(matches!(
            validator.match_property("b"),
            PropertyMatch::Additional(_)
        ));
    }

    #[test]
    fn missing_required_reported_in_schema_order() {
        let validator = ObjectValidator {
            required: vec!["b".into(), "a".into()],
            required_set: ["b".into(), "a".into()].into_iter().collect(),
            ..ObjectValidator::default()
        };
        let missing: AHashSet<Box<str>> = ["a".into(), "b".into()].into_iter().collect();
        let err = validator.check_close(2, &missing, "#", 0).unwrap_err();
        assert!(err.to_string().contains("\"b\""));
    }
}
