//! # jsonflux
//!
//! A streaming JSON parser coupled with a JSON-Schema (Draft 4) validator
//! that runs *inside* the parse: the lexer's event stream drives DOM
//! construction and a stack of schema validators in lockstep, so
//! non-conforming input is rejected at the offending byte instead of after
//! the whole tree materializes.
//!
//! ```
//! use jsonflux::{parse_with_schema, Schema, Value};
//!
//! let schema = Schema::parse(
//!     r#"{"type": "object", "required": ["name"],
//!         "properties": {"name": {"type": "string"},
//!                        "port": {"type": "integer", "default": 8080}}}"#,
//! )?;
//! let config = parse_with_schema(r#"{"name": "search"}"#, &schema)?;
//! assert_eq!(config.get("name"), &Value::from("search"));
//! // Absent properties with a `default` are injected during validation.
//! assert_eq!(config.get("port"), &Value::from(8080));
//! # Ok::<(), jsonflux::Error>(())
//! ```
//!
//! Chunked input goes through [`DomParser`]; compiled [`Schema`]s are
//! immutable and shared freely across sessions. The value model lives in
//! [`jsonflux-dom`](jsonflux_dom) and is re-exported here.
mod builder;
mod error;
mod events;
mod lexer;
mod parser;
mod schema;
mod validation;

pub use error::{Error, ErrorCategory, ValidationCode};
pub use parser::{
    parse, parse_with_options, parse_with_schema, parse_with_schema_options, DomParser,
    ParseOptions,
};
pub use schema::Schema;

pub use jsonflux_dom::{
    serialize, serialize_pretty, traverse, Array, Conversion, KeyDictionary, Number, Object,
    Serializer, Splice, Value, ValueError, Visitor,
};
pub use jsonflux_referencing::{DefaultRetriever, Retrieve, Retrieved};
