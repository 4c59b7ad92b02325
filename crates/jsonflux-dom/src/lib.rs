//! # jsonflux-dom
//!
//! The in-memory JSON document model used by `jsonflux`.
//!
//! Values are a closed sum type with `Arc`-shared payloads: cloning is O(1),
//! mutation is copy-on-write, and a fully built tree can be handed between
//! threads. Numbers keep their source lexeme and convert lazily, recording
//! overflow and precision-loss conditions instead of silently rounding.
mod error;
mod generate;
mod impls;
mod keys;
mod number;
mod traverse;
mod value;

pub use error::ValueError;
pub use generate::{serialize, serialize_pretty, Serializer};
pub use keys::KeyDictionary;
pub use number::{Conversion, Number};
pub use traverse::{traverse, Visitor};
pub use value::{Array, Object, Splice, Value};
