use thiserror::Error;

/// Errors produced by DOM constructors and mutators.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    /// A typed boolean read on a non-boolean value.
    #[error("value is not a boolean")]
    NotABoolean,
    /// Object keys must be non-empty strings.
    #[error("object keys must be non-empty")]
    EmptyKey,
    /// Index past the end of an array for an operation that cannot extend it.
    #[error("index {index} out of bounds for array of length {len}")]
    OutOfBounds { index: usize, len: usize },
    /// Splice source range is not within the source array.
    #[error("splice range {start}..{end} out of bounds for array of length {len}")]
    BadSpliceRange {
        start: usize,
        end: usize,
        len: usize,
    },
    /// NaN and infinities have no JSON representation.
    #[error("number is not finite")]
    NotFinite,
    /// A numeric lexeme that does not follow the JSON number grammar.
    #[error("malformed number lexeme {lexeme:?}")]
    MalformedLexeme { lexeme: Box<str> },
}
