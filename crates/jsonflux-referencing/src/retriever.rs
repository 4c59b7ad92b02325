use crate::error::Error;

/// An external schema document fetched by a [`Retrieve`] implementation.
#[derive(Debug, Clone)]
pub struct Retrieved {
    /// The schema text, to be parsed and compiled by the caller.
    pub text: String,
    /// Base URI the document should be compiled under; defaults to the
    /// requested URI when `None`.
    pub base_uri: Option<String>,
}

/// Hook for fetching external schema documents during reference resolution.
///
/// This is the only I/O the schema compiler performs, and it runs only
/// inside `resolve` — never during parsing or validation.
pub trait Retrieve: Send + Sync {
    fn retrieve(&self, uri: &str) -> Result<Retrieved, Error>;
}

/// The default retriever refuses everything; schemas without external
/// references never notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRetriever;

impl Retrieve for DefaultRetriever {
    fn retrieve(&self, uri: &str) -> Result<Retrieved, Error> {
        Err(Error::Retrieval {
            uri: uri.into(),
            reason: "external schema retrieval is not configured".to_string(),
        })
    }
}
