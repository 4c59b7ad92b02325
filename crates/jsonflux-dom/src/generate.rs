use std::convert::Infallible;
use std::fmt::Write;

use crate::{
    number::Number,
    traverse::{traverse, Visitor},
    value::Value,
};

/// Serializes `value` to compact UTF-8 JSON text.
pub fn serialize(value: &Value) -> String {
    let mut serializer = Serializer::new(None);
    let _ = traverse(value, &mut serializer);
    serializer.finish()
}

/// Serializes `value` with one `indent` per nesting level.
pub fn serialize_pretty(value: &Value, indent: &str) -> String {
    let mut serializer = Serializer::new(Some(indent));
    let _ = traverse(value, &mut serializer);
    serializer.finish()
}

/// A [`Visitor`] that renders the event stream as JSON text.
///
/// Number formatting is deterministic: integers exactly, doubles with 14
/// significant digits, raw lexemes verbatim. NaN and infinities are rejected
/// at value construction, so they can never reach this point.
pub struct Serializer {
    out: String,
    indent: Option<Box<str>>,
    depth: usize,
    /// Comma is needed before the next element at each open container.
    needs_comma: Vec<bool>,
    /// The next emission is an object member value, no separator wanted.
    after_key: bool,
}

impl Serializer {
    pub fn new(indent: Option<&str>) -> Serializer {
        Serializer {
            out: String::new(),
            indent: indent.map(Box::from),
            depth: 0,
            needs_comma: Vec::new(),
            after_key: false,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn newline(&mut self) {
        if let Some(indent) = &self.indent {
            self.out.push('\n');
            for _ in 0..self.depth {
                self.out.push_str(indent);
            }
        }
    }

    fn separate(&mut self) {
        if self.after_key {
            self.after_key = false;
            return;
        }
        if let Some(needs_comma) = self.needs_comma.last_mut() {
            if *needs_comma {
                self.out.push(',');
            }
            *needs_comma = true;
            self.newline();
        }
    }

    fn open(&mut self, bracket: char) {
        self.separate();
        self.out.push(bracket);
        self.depth += 1;
        self.needs_comma.push(false);
    }

    fn close(&mut self, bracket: char) {
        self.depth -= 1;
        let had_members = self.needs_comma.pop() == Some(true);
        if had_members {
            self.newline();
        }
        self.out.push(bracket);
    }

    fn push_escaped(&mut self, text: &str) {
        self.out.push('"');
        for c in text.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                '\u{8}' => self.out.push_str("\\b"),
                '\u{c}' => self.out.push_str("\\f"),
                c if (c as u32) < 0x20 => {
                    let _ = write!(self.out, "\\u{:04x}", c as u32);
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

impl Visitor for Serializer {
    type Err = Infallible;

    fn on_null(&mut self) -> Result<(), Infallible> {
        self.separate();
        self.out.push_str("null");
        Ok(())
    }

    fn on_bool(&mut self, value: bool) -> Result<(), Infallible> {
        self.separate();
        self.out.push_str(if value { "true" } else { "false" });
        Ok(())
    }

    fn on_number(&mut self, value: &Number) -> Result<(), Infallible> {
        self.separate();
        let _ = write!(self.out, "{value}");
        Ok(())
    }

    fn on_string(&mut self, value: &str) -> Result<(), Infallible> {
        self.separate();
        self.push_escaped(value);
        Ok(())
    }

    fn begin_object(&mut self, _len: usize) -> Result<(), Infallible> {
        self.open('{');
        Ok(())
    }

    fn on_key(&mut self, key: &str) -> Result<(), Infallible> {
        self.separate();
        self.push_escaped(key);
        self.out.push(':');
        if self.indent.is_some() {
            self.out.push(' ');
        }
        self.after_key = true;
        Ok(())
    }

    fn end_object(&mut self) -> Result<(), Infallible> {
        self.close('}');
        Ok(())
    }

    fn begin_array(&mut self, _len: usize) -> Result<(), Infallible> {
        self.open('[');
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), Infallible> {
        self.close(']');
        Ok(())
    }
}
