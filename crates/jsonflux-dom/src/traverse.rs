use crate::value::Value;

/// Callbacks driven by [`traverse`] over a DOM in document order.
///
/// The serializer and the post-parse validator are both visitors; a visitor
/// can abort the walk by returning its error type.
pub trait Visitor {
    type Err;

    fn on_null(&mut self) -> Result<(), Self::Err>;
    fn on_bool(&mut self, value: bool) -> Result<(), Self::Err>;
    fn on_number(&mut self, value: &crate::number::Number) -> Result<(), Self::Err>;
    fn on_string(&mut self, value: &str) -> Result<(), Self::Err>;
    fn begin_object(&mut self, len: usize) -> Result<(), Self::Err>;
    fn on_key(&mut self, key: &str) -> Result<(), Self::Err>;
    fn end_object(&mut self) -> Result<(), Self::Err>;
    fn begin_array(&mut self, len: usize) -> Result<(), Self::Err>;
    fn end_array(&mut self) -> Result<(), Self::Err>;
}

/// Walks `value` depth-first, invoking the visitor for every node.
///
/// Object members are visited in sorted key order so that two structurally
/// equal documents drive a visitor identically. The `Invalid` sentinel is
/// presented as null.
pub fn traverse<V: Visitor>(value: &Value, visitor: &mut V) -> Result<(), V::Err> {
    match value {
        Value::Invalid | Value::Null => visitor.on_null(),
        Value::Bool(b) => visitor.on_bool(*b),
        Value::Number(n) => visitor.on_number(n),
        Value::String(s) => visitor.on_string(s),
        Value::Array(items) => {
            visitor.begin_array(items.len())?;
            for item in items.iter() {
                traverse(item, visitor)?;
            }
            visitor.end_array()
        }
        Value::Object(members) => {
            visitor.begin_object(members.len())?;
            for key in members.sorted_keys() {
                visitor.on_key(key)?;
                if let Some(member) = members.get(key) {
                    traverse(member, visitor)?;
                }
            }
            visitor.end_object()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Array, Object};

    #[derive(Default)]
    struct Trace(Vec<String>);

    impl Visitor for Trace {
        type Err = std::convert::Infallible;

        fn on_null(&mut self) -> Result<(), Self::Err> {
            self.0.push("null".into());
            Ok(())
        }
        fn on_bool(&mut self, value: bool) -> Result<(), Self::Err> {
            self.0.push(format!("bool {value}"));
            Ok(())
        }
        fn on_number(&mut self, value: &crate::number::Number) -> Result<(), Self::Err> {
            self.0.push(format!("number {value}"));
            Ok(())
        }
        fn on_string(&mut self, value: &str) -> Result<(), Self::Err> {
            self.0.push(format!("string {value}"));
            Ok(())
        }
        fn begin_object(&mut self, _len: usize) -> Result<(), Self::Err> {
            self.0.push("{".into());
            Ok(())
        }
        fn on_key(&mut self, key: &str) -> Result<(), Self::Err> {
            self.0.push(format!("key {key}"));
            Ok(())
        }
        fn end_object(&mut self) -> Result<(), Self::Err> {
            self.0.push("}".into());
            Ok(())
        }
        fn begin_array(&mut self, _len: usize) -> Result<(), Self::Err> {
            self.0.push("[".into());
            Ok(())
        }
        fn end_array(&mut self) -> Result<(), Self::Err> {
            self.0.push("]".into());
            Ok(())
        }
    }

    #[test]
    fn visits_in_document_order_with_sorted_keys() {
        let mut inner = Array::new();
        inner.push(Value::from(1));
        inner.push(Value::Null);
        let mut obj = Object::new();
        obj.put("b", Value::Array(inner)).unwrap();
        obj.put("a", Value::from("x")).unwrap();

        let mut trace = Trace::default();
        traverse(&Value::Object(obj), &mut trace).unwrap();
        assert_eq!(
            trace.0,
            vec!["{", "key a", "string x", "key b", "[", "number 1", "null", "]", "}"]
        );
    }
}
