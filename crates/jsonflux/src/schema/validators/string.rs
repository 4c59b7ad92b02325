use regex::Regex;

use crate::error::{Error, ValidationCode};

/// Constraints applied when the instance is a string.
#[derive(Debug, Default)]
pub(crate) struct StringValidator {
    pub(crate) min_length: Option<u64>,
    pub(crate) max_length: Option<u64>,
    pub(crate) pattern: Option<Regex>,
}

impl StringValidator {
    /// Lengths count Unicode code points, not bytes.
    pub(crate) fn check(&self, value: &str, location: &str, offset: u64) -> Result<(), Error> {
        let length = || value.chars().count() as u64;
        if let Some(min) = self.min_length {
            if length() < min {
                return Err(Error::validation(
                    ValidationCode::StringTooShort,
                    format!("string is shorter than minLength {min}"),
                    location,
                    offset,
                ));
            }
        }
        if let Some(max) = self.max_length {
            if length() > max {
                return Err(Error::validation(
                    ValidationCode::StringTooLong,
                    format!("string is longer than maxLength {max}"),
                    location,
                    offset,
                ));
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                return Err(Error::validation(
                    ValidationCode::PatternMismatch,
                    format!("string does not match pattern {:?}", pattern.as_str()),
                    location,
                    offset,
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationCode;

    fn validator(min: Option<u64>, max: Option<u64>, pattern: Option<&str>) -> StringValidator {
        StringValidator {
            min_length: min,
            max_length: max,
            pattern: pattern.map(|p| Regex::new(p).unwrap()),
        }
    }

    #[test]
    fn length_bounds() {
        let v = validator(Some(2), Some(3), None);
        assert!(v.check("ab", "#", 0).is_ok());
        assert_eq!(
            v.check("a", "#", 0).unwrap_err().validation_code(),
            Some(ValidationCode::StringTooShort)
        );
        assert_eq!(
            v.check("abcd", "#", 0).unwrap_err().validation_code(),
            Some(ValidationCode::StringTooLong)
        );
    }

    #[test]
    fn lengths_count_code_points() {
        let v = validator(None, Some(3), None);
        assert!(v.check("héé", "#", 0).is_ok());
    }

    #[test]
    fn pattern_is_unanchored() {
        let v = validator(None, None, Some("^a+$"));
        assert!(v.check("aaa", "#", 0).is_ok());
        assert_eq!(
            v.check("ab", "#", 0).unwrap_err().validation_code(),
            Some(ValidationCode::PatternMismatch)
        );
    }
}
