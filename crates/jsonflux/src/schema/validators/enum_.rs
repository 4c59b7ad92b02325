use jsonflux_dom::Value;

use crate::error::{Error, ValidationCode};

/// The `enum` keyword: the instance must equal one of the options.
///
/// Equality is structural with numeric cross-representation semantics, so
/// `1.0` in an instance matches an option written as `1`.
#[derive(Debug)]
pub(crate) struct EnumValidator {
    pub(crate) options: Vec<Value>,
}

impl EnumValidator {
    pub(crate) fn check(&self, instance: &Value, location: &str, offset: u64) -> Result<(), Error> {
        if self.options.iter().any(|option| option == instance) {
            return Ok(());
        }
        Err(Error::validation(
            ValidationCode::EnumMismatch,
            "value is not one of the enumerated options",
            location,
            offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_across_number_representations() {
        let validator = EnumValidator {
            options: vec![Value::from(1), Value::from("x")],
        };
        assert!(validator
            .check(&Value::number_from_lexeme("1.0").unwrap(), "#", 0)
            .is_ok());
        assert!(validator.check(&Value::from("x"), "#", 0).is_ok());
        assert!(validator.check(&Value::from("y"), "#", 0).is_err());
    }
}
