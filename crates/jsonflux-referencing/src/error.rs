use thiserror::Error;

/// Referencing failures surfaced during schema compilation and resolution.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid URI {uri:?}: {reason}")]
    InvalidUri { uri: Box<str>, reason: String },
    #[error("unresolved reference {uri}")]
    Unresolved { uri: Box<str> },
    #[error("cyclic reference chain through {uri}")]
    CyclicReference { uri: Box<str> },
    #[error("cannot retrieve external document {uri}: {reason}")]
    Retrieval { uri: Box<str>, reason: String },
}

impl Error {
    pub(crate) fn invalid_uri(uri: &str, reason: impl ToString) -> Error {
        Error::InvalidUri {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }
}
