use std::sync::Arc;

use jsonflux_dom::{Array, KeyDictionary, Object, Value};

use crate::{error::Error, events::Event};

/// Builds a DOM from the lexer's event stream.
///
/// Containers under construction live on a stack; a completed value is
/// attached to its parent (or becomes the root). Keys are optionally routed
/// through a [`KeyDictionary`] so that repeated parses of similarly shaped
/// documents share key allocations.
pub(crate) struct DomBuilder {
    stack: Vec<Incomplete>,
    root: Option<Value>,
    dictionary: Option<KeyDictionary>,
}

enum Incomplete {
    Array(Array),
    Object {
        object: Object,
        pending_key: Option<Arc<str>>,
    },
}

impl DomBuilder {
    pub(crate) fn new(with_dictionary: bool) -> DomBuilder {
        DomBuilder {
            stack: Vec::new(),
            root: None,
            dictionary: with_dictionary.then(KeyDictionary::new),
        }
    }

    fn intern(&mut self, key: &str) -> Arc<str> {
        match &mut self.dictionary {
            Some(dictionary) => dictionary.intern(key),
            None => Arc::from(key),
        }
    }

    pub(crate) fn on_event(&mut self, event: &Event<'_>, offset: u64) -> Result<(), Error> {
        match event {
            Event::ObjectBegin => {
                self.stack.push(Incomplete::Object {
                    object: Object::new(),
                    pending_key: None,
                });
                Ok(())
            }
            Event::ArrayBegin => {
                self.stack.push(Incomplete::Array(Array::new()));
                Ok(())
            }
            Event::Key(key) => {
                if key.is_empty() {
                    // The DOM requires keys of length >= 1.
                    return Err(Error::syntax("empty object key", offset));
                }
                let interned = self.intern(key);
                match self.stack.last_mut() {
                    Some(Incomplete::Object { pending_key, .. }) => {
                        *pending_key = Some(interned);
                        Ok(())
                    }
                    _ => Err(Error::internal("key event outside an object")),
                }
            }
            Event::ObjectEnd => match self.stack.pop() {
                Some(Incomplete::Object { object, .. }) => {
                    self.complete(Value::Object(object))
                }
                _ => Err(Error::internal("unbalanced end of object")),
            },
            Event::ArrayEnd => match self.stack.pop() {
                Some(Incomplete::Array(items)) => self.complete(Value::Array(items)),
                _ => Err(Error::internal("unbalanced end of array")),
            },
            Event::String(text) => self.complete(Value::string(text)),
            Event::Number(lexeme, _) => {
                // The lexer validated the grammar already.
                let value = Value::number_from_lexeme(lexeme)
                    .map_err(|err| Error::internal(err.to_string()))?;
                self.complete(value)
            }
            Event::Bool(b) => self.complete(Value::Bool(*b)),
            Event::Null => self.complete(Value::Null),
        }
    }

    /// Attaches a finished value to the container under construction, or
    /// records it as the root.
    fn complete(&mut self, value: Value) -> Result<(), Error> {
        match self.stack.last_mut() {
            None => {
                self.root = Some(value);
                Ok(())
            }
            Some(Incomplete::Array(items)) => {
                items.push(value);
                Ok(())
            }
            Some(Incomplete::Object {
                object,
                pending_key,
            }) => {
                let Some(key) = pending_key.take() else {
                    return Err(Error::internal("member value without a key"));
                };
                object.put_shared(key, value)?;
                Ok(())
            }
        }
    }

    /// Injects a synthesized member into the object currently being built;
    /// existing members win over defaults.
    pub(crate) fn insert_default(&mut self, key: Arc<str>, value: Value) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(Incomplete::Object { object, .. }) => {
                if !object.contains_key(&key) {
                    object.put_shared(key, value)?;
                }
                Ok(())
            }
            _ => Err(Error::internal(
                "default injection outside an open object",
            )),
        }
    }

    pub(crate) fn finish(&mut self) -> Result<Value, Error> {
        if !self.stack.is_empty() {
            return Err(Error::internal("builder finished with open containers"));
        }
        self.root
            .take()
            .ok_or_else(|| Error::internal("builder finished without a value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NumberKind;

    fn run(events: &[Event<'_>]) -> Value {
        let mut builder = DomBuilder::new(false);
        for event in events {
            builder.on_event(event, 0).unwrap();
        }
        builder.finish().unwrap()
    }

    #[test]
    fn builds_nested_structures() {
        let value = run(&[
            Event::ObjectBegin,
            Event::Key("list"),
            Event::ArrayBegin,
            Event::Number("1", NumberKind::Integer),
            Event::Bool(false),
            Event::ArrayEnd,
            Event::Key("name"),
            Event::String("x"),
            Event::ObjectEnd,
        ]);
        assert_eq!(value.len(), 2);
        assert_eq!(value.get("list").at(0), &Value::from(1));
        assert_eq!(value.get("list").at(1), &Value::Bool(false));
        assert_eq!(value.get("name"), &Value::from("x"));
    }

    #[test]
    fn empty_key_rejected() {
        let mut builder = DomBuilder::new(false);
        builder.on_event(&Event::ObjectBegin, 0).unwrap();
        let err = builder.on_event(&Event::Key(""), 5).unwrap_err();
        assert!(matches!(err, Error::Syntax { offset: 5, .. }));
    }

    #[test]
    fn duplicate_keys_last_write_wins() {
        let value = run(&[
            Event::ObjectBegin,
            Event::Key("k"),
            Event::Number("1", NumberKind::Integer),
            Event::Key("k"),
            Event::Number("2", NumberKind::Integer),
            Event::ObjectEnd,
        ]);
        assert_eq!(value.len(), 1);
        assert_eq!(value.get("k"), &Value::from(2));
    }

    #[test]
    fn interned_keys_share_allocations() {
        let mut builder = DomBuilder::new(true);
        for event in [
            Event::ArrayBegin,
            Event::ObjectBegin,
            Event::Key("id"),
            Event::Null,
            Event::ObjectEnd,
            Event::ObjectBegin,
            Event::Key("id"),
            Event::Null,
            Event::ObjectEnd,
            Event::ArrayEnd,
        ] {
            builder.on_event(&event, 0).unwrap();
        }
        let value = builder.finish().unwrap();
        let first = value.at(0).as_object().unwrap().keys().next().unwrap();
        let second = value.at(1).as_object().unwrap().keys().next().unwrap();
        assert!(Arc::ptr_eq(first, second));
    }

    #[test]
    fn defaults_do_not_overwrite() {
        let mut builder = DomBuilder::new(false);
        builder.on_event(&Event::ObjectBegin, 0).unwrap();
        builder.on_event(&Event::Key("a"), 0).unwrap();
        builder
            .on_event(&Event::Number("1", NumberKind::Integer), 0)
            .unwrap();
        builder
            .insert_default(Arc::from("a"), Value::from(9))
            .unwrap();
        builder
            .insert_default(Arc::from("b"), Value::from(7))
            .unwrap();
        builder.on_event(&Event::ObjectEnd, 0).unwrap();
        let value = builder.finish().unwrap();
        assert_eq!(value.get("a"), &Value::from(1));
        assert_eq!(value.get("b"), &Value::from(7));
    }
}
