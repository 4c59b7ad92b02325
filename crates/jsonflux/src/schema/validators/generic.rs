use std::fmt;

use crate::schema::validators::{
    ArrayValidator, NumberValidator, ObjectValidator, StringValidator,
};

/// Set of JSON types admitted by the `type` keyword.
///
/// `integer` is narrower than `number`: it admits only numbers that denote
/// mathematical integers.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct TypeSet(u8);

impl TypeSet {
    pub(crate) const NULL: TypeSet = TypeSet(1);
    pub(crate) const BOOLEAN: TypeSet = TypeSet(1 << 1);
    pub(crate) const INTEGER: TypeSet = TypeSet(1 << 2);
    pub(crate) const NUMBER: TypeSet = TypeSet(1 << 3);
    pub(crate) const STRING: TypeSet = TypeSet(1 << 4);
    pub(crate) const ARRAY: TypeSet = TypeSet(1 << 5);
    pub(crate) const OBJECT: TypeSet = TypeSet(1 << 6);

    pub(crate) fn from_name(name: &str) -> Option<TypeSet> {
        Some(match name {
            "null" => TypeSet::NULL,
            "boolean" => TypeSet::BOOLEAN,
            "integer" => TypeSet::INTEGER,
            "number" => TypeSet::NUMBER,
            "string" => TypeSet::STRING,
            "array" => TypeSet::ARRAY,
            "object" => TypeSet::OBJECT,
            _ => return None,
        })
    }

    pub(crate) fn insert(self, other: TypeSet) -> TypeSet {
        TypeSet(self.0 | other.0)
    }

    pub(crate) fn contains(self, other: TypeSet) -> bool {
        self.0 & other.0 != 0
    }

    /// True when the set names exactly one type keyword.
    pub(crate) fn is_single(self) -> bool {
        self.0.count_ones() == 1
    }
}

impl fmt::Debug for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (TypeSet::NULL, "null"),
            (TypeSet::BOOLEAN, "boolean"),
            (TypeSet::INTEGER, "integer"),
            (TypeSet::NUMBER, "number"),
            (TypeSet::STRING, "string"),
            (TypeSet::ARRAY, "array"),
            (TypeSet::OBJECT, "object"),
        ];
        let mut list = f.debug_list();
        for (flag, name) in names {
            if self.contains(flag) {
                list.entry(&name);
            }
        }
        list.finish()
    }
}

/// Validator for schema objects without a single `type`: any JSON type is
/// admitted (optionally narrowed by a multi-type `type` list), and each
/// constraint group applies only when the instance has the matching type.
#[derive(Debug, Default)]
pub(crate) struct GenericValidator {
    pub(crate) types: Option<TypeSet>,
    pub(crate) string: Option<StringValidator>,
    pub(crate) number: Option<NumberValidator>,
    pub(crate) array: Option<ArrayValidator>,
    pub(crate) object: Option<ObjectValidator>,
}

impl GenericValidator {
    /// True when nothing constrains this node: it accepts every instance.
    pub(crate) fn is_unconstrained(&self) -> bool {
        self.types.is_none()
            && self.string.is_none()
            && self.number.is_none()
            && self.array.is_none()
            && self.object.is_none()
    }

    pub(crate) fn admits(&self, candidate: TypeSet) -> bool {
        match self.types {
            None => true,
            Some(types) => types.contains(candidate),
        }
    }
}
