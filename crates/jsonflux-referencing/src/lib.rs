//! # jsonflux-referencing
//!
//! URI bookkeeping for schema compilation: a scope stack that follows `id`
//! keywords and JSON-pointer descent, a registry from `(document, fragment)`
//! pairs to compiled artifacts, and the retrieval hook through which external
//! schema documents are fetched.
mod error;
mod registry;
mod retriever;
mod scope;
mod segments;
pub mod uri;

pub use error::Error;
pub use fluent_uri::{Uri, UriRef};
pub use registry::Registry;
pub use retriever::{DefaultRetriever, Retrieve, Retrieved};
pub use scope::{UriScope, DEFAULT_ROOT_URI, ROOT_FRAGMENT};
pub use segments::{escape_segment, unescape_segment};
