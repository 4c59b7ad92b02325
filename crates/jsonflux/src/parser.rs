use std::marker::PhantomData;

use jsonflux_dom::Value;
use tracing::debug;

use crate::{
    builder::DomBuilder,
    error::Error,
    lexer::Lexer,
    schema::Schema,
    validation::{ValidationCtx, ValidationState},
};

/// Knobs for a parse session.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Intern object keys in a per-session dictionary, sharing allocations
    /// between repeated keys.
    pub use_key_dictionary: bool,
    /// Synthesize `default` members for absent properties during schema
    /// validation.
    pub inject_defaults: bool,
    /// Maximum container nesting before the lexer rejects the document.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> ParseOptions {
        ParseOptions {
            use_key_dictionary: false,
            inject_defaults: true,
            max_depth: 512,
        }
    }
}

/// A streaming parse session: `feed` arbitrary byte chunks, then `end`.
///
/// DOM construction and schema validation run in lockstep off the same
/// event stream; a validation rejection stops the parse at the offending
/// event, before the DOM grows past it. Between `feed` calls the session is
/// quiescent and holds no reference to the caller's buffers. A failed
/// session stays failed; drop it to release the partial DOM.
pub struct DomParser<'s> {
    lexer: Lexer,
    builder: DomBuilder,
    validation: Option<ValidationState>,
    ctx: ValidationCtx,
    error: Option<Error>,
    finished: bool,
    /// Validation frames hold weak links into the schema; it must outlive
    /// the session.
    _schema: PhantomData<&'s Schema>,
}

impl<'s> DomParser<'s> {
    /// A session without validation.
    pub fn new(options: &ParseOptions) -> DomParser<'s> {
        DomParser {
            lexer: Lexer::new(options.max_depth),
            builder: DomBuilder::new(options.use_key_dictionary),
            validation: None,
            ctx: ValidationCtx::new(false),
            error: None,
            finished: false,
            _schema: PhantomData,
        }
    }

    /// A session validating against `schema` as it parses.
    pub fn with_schema(schema: &'s Schema, options: &ParseOptions) -> DomParser<'s> {
        DomParser {
            lexer: Lexer::new(options.max_depth),
            builder: DomBuilder::new(options.use_key_dictionary),
            validation: Some(ValidationState::new(schema.root())),
            ctx: ValidationCtx::new(options.inject_defaults),
            error: None,
            finished: false,
            _schema: PhantomData,
        }
    }

    fn guard(&self) -> Result<(), Error> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.finished {
            return Err(Error::InvalidParameters {
                message: "parse session already finished".to_string(),
            });
        }
        Ok(())
    }

    /// Feeds one chunk; the chunk may end anywhere, including inside a
    /// token.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), Error> {
        self.guard()?;
        self.lexer.feed(chunk);
        self.pump()
    }

    /// Signals end of input and hands back the completed DOM root.
    pub fn end(&mut self) -> Result<Value, Error> {
        self.guard()?;
        self.lexer.finish();
        self.pump()?;
        if let Err(err) = self.lexer.ensure_complete() {
            self.error = Some(err.clone());
            return Err(err);
        }
        if let Some(state) = &self.validation {
            if !state.is_complete() {
                let err = Error::internal("validation incomplete at end of input");
                self.error = Some(err.clone());
                return Err(err);
            }
        }
        self.finished = true;
        debug!("parse session completed");
        self.builder.finish()
    }

    /// Drains every event the lexer can produce from buffered input.
    fn pump(&mut self) -> Result<(), Error> {
        let DomParser {
            lexer,
            builder,
            validation,
            ctx,
            ..
        } = self;
        let result = (|| -> Result<(), Error> {
            while let Some((event, offset)) = lexer.next_event()? {
                ctx.offset = offset;
                if let Some(state) = validation.as_mut() {
                    state.check(&event, ctx)?;
                    // An object just closed with absent defaulted members:
                    // synthesize them before the builder sees the close.
                    for (key, value) in ctx.defaults.drain(..) {
                        builder.insert_default(key, value)?;
                    }
                }
                builder.on_event(&event, offset)?;
            }
            Ok(())
        })();
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }
}

/// Parses a complete document held in memory.
pub fn parse(text: &str) -> Result<Value, Error> {
    parse_with_options(text, &ParseOptions::default())
}

pub fn parse_with_options(text: &str, options: &ParseOptions) -> Result<Value, Error> {
    let mut session = DomParser::new(options);
    session.feed(text.as_bytes())?;
    session.end()
}

/// Parses a complete document, validating against `schema` as the parse
/// advances.
pub fn parse_with_schema(text: &str, schema: &Schema) -> Result<Value, Error> {
    parse_with_schema_options(text, schema, &ParseOptions::default())
}

pub fn parse_with_schema_options(
    text: &str,
    schema: &Schema,
    options: &ParseOptions,
) -> Result<Value, Error> {
    let mut session = DomParser::with_schema(schema, options);
    session.feed(text.as_bytes())?;
    session.end()
}
