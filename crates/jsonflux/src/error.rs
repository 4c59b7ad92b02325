use thiserror::Error;

use jsonflux_dom::ValueError;

/// Error categories mirroring the public `code()` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Syntax,
    Schema,
    Validation,
    InvalidParameters,
    Internal,
}

/// Enumerated causes of a validation rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    TypeMismatch,
    MissingRequiredKey,
    TooFewItems,
    TooManyItems,
    TooFewProperties,
    TooManyProperties,
    StringTooShort,
    StringTooLong,
    PatternMismatch,
    NumberOutOfRange,
    NotAMultiple,
    EnumMismatch,
    UniqueViolation,
    UnknownProperty,
    RefUnresolved,
    AllOfFailed,
    AnyOfFailed,
    OneOfFailed,
    NotFailed,
    InternalError,
}

impl ValidationCode {
    /// Stable numeric identifier for the rejection cause.
    pub fn code(self) -> u32 {
        match self {
            ValidationCode::TypeMismatch => 1,
            ValidationCode::MissingRequiredKey => 2,
            ValidationCode::TooFewItems => 3,
            ValidationCode::TooManyItems => 4,
            ValidationCode::TooFewProperties => 5,
            ValidationCode::TooManyProperties => 6,
            ValidationCode::StringTooShort => 7,
            ValidationCode::StringTooLong => 8,
            ValidationCode::PatternMismatch => 9,
            ValidationCode::NumberOutOfRange => 10,
            ValidationCode::NotAMultiple => 11,
            ValidationCode::EnumMismatch => 12,
            ValidationCode::UniqueViolation => 13,
            ValidationCode::UnknownProperty => 14,
            ValidationCode::RefUnresolved => 15,
            ValidationCode::AllOfFailed => 16,
            ValidationCode::AnyOfFailed => 17,
            ValidationCode::OneOfFailed => 18,
            ValidationCode::NotFailed => 19,
            ValidationCode::InternalError => 20,
        }
    }
}

/// The structured error surface of the library.
///
/// Three taxonomies propagate through one type: syntactic errors from the
/// lexer, schema errors from the compiler, and validation errors from the
/// state machine. `Display` renders the formatted message kept for legacy
/// callers; structured fields are the primary interface.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: u64 },
    #[error("schema error at {location}: {message}")]
    Schema { message: String, location: String },
    #[error("validation error at offset {offset}: {message} (schema location {location})")]
    Validation {
        code: ValidationCode,
        message: String,
        /// Fragment of the schema node that rejected.
        location: String,
        /// Byte offset of the offending event in the input.
        offset: u64,
    },
    #[error("invalid parameters: {message}")]
    InvalidParameters { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Syntax { .. } => ErrorCategory::Syntax,
            Error::Schema { .. } => ErrorCategory::Schema,
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::InvalidParameters { .. } => ErrorCategory::InvalidParameters,
            Error::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Numeric code: the category for most errors, the enumerated
    /// [`ValidationCode`] for validation rejections.
    pub fn code(&self) -> u32 {
        match self {
            Error::Syntax { .. } => 100,
            Error::Schema { .. } => 200,
            Error::Validation { code, .. } => 300 + code.code(),
            Error::InvalidParameters { .. } => 400,
            Error::Internal { .. } => 500,
        }
    }

    pub fn validation_code(&self) -> Option<ValidationCode> {
        match self {
            Error::Validation { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>, offset: u64) -> Error {
        Error::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub(crate) fn schema(message: impl Into<String>, location: impl Into<String>) -> Error {
        Error::Schema {
            message: message.into(),
            location: location.into(),
        }
    }

    pub(crate) fn validation(
        code: ValidationCode,
        message: impl Into<String>,
        location: impl Into<String>,
        offset: u64,
    ) -> Error {
        Error::Validation {
            code,
            message: message.into(),
            location: location.into(),
            offset,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Error {
        Error::Internal {
            message: message.into(),
        }
    }
}

impl From<ValueError> for Error {
    fn from(err: ValueError) -> Error {
        Error::InvalidParameters {
            message: err.to_string(),
        }
    }
}

impl From<jsonflux_referencing::Error> for Error {
    fn from(err: jsonflux_referencing::Error) -> Error {
        Error::Schema {
            message: err.to_string(),
            location: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_and_codes() {
        let err = Error::validation(ValidationCode::EnumMismatch, "m", "#/enum", 3);
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.code(), 312);
        assert_eq!(err.validation_code(), Some(ValidationCode::EnumMismatch));

        let err = Error::syntax("m", 0);
        assert_eq!(err.category(), ErrorCategory::Syntax);
        assert_eq!(err.validation_code(), None);
    }
}
