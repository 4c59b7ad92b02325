use jsonflux::{DomParser, ErrorCategory, ParseOptions, Schema, ValidationCode, Value};

fn feed_in_chunks(session: &mut DomParser<'_>, text: &str, chunk: usize) -> Result<(), jsonflux::Error> {
    for piece in text.as_bytes().chunks(chunk) {
        session.feed(piece)?;
    }
    Ok(())
}

#[test]
fn single_byte_chunks_build_the_same_dom() {
    let text = r#"{"a": [1, 2.5, "x"], "b": {"c": null}} "#;
    let whole = jsonflux::parse(text).unwrap();
    for chunk in [1, 2, 3, 7] {
        let options = ParseOptions::default();
        let mut session = DomParser::new(&options);
        feed_in_chunks(&mut session, text, chunk).unwrap();
        assert_eq!(session.end().unwrap(), whole, "chunk size {chunk}");
    }
}

#[test]
fn validation_runs_between_chunks() {
    let schema = Schema::parse(r#"{"type": "array", "items": {"type": "integer"}}"#).unwrap();
    let options = ParseOptions::default();
    let mut session = DomParser::with_schema(&schema, &options);
    session.feed(b"[1, 2, ").unwrap();
    // The offending token arrives in its own chunk and is rejected there.
    let err = session.feed(b"\"three\"").unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::TypeMismatch));
    // The session stays failed.
    let err = session.feed(b", 4]").unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::TypeMismatch));
}

#[test]
fn end_without_complete_document_is_a_syntax_error() {
    let options = ParseOptions::default();
    let mut session = DomParser::new(&options);
    session.feed(b"{\"a\": ").unwrap();
    let err = session.end().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Syntax);
}

#[test]
fn finished_session_rejects_more_input() {
    let options = ParseOptions::default();
    let mut session = DomParser::new(&options);
    session.feed(b"[]").unwrap();
    session.end().unwrap();
    let err = session.feed(b"[]").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidParameters);
}

#[test]
fn comments_and_whitespace_between_chunks() {
    let options = ParseOptions::default();
    let mut session = DomParser::new(&options);
    session.feed(b"// heade").unwrap();
    session.feed(b"r\n[1, /* spl").unwrap();
    session.feed(b"it */ 2]").unwrap();
    let value = session.end().unwrap();
    assert_eq!(value.len(), 2);
}

#[test]
fn key_dictionary_interns_across_the_document() {
    let options = ParseOptions {
        use_key_dictionary: true,
        ..ParseOptions::default()
    };
    let mut session = DomParser::new(&options);
    session
        .feed(br#"[{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]"#)
        .unwrap();
    let value = session.end().unwrap();
    let first_keys = value.at(0).as_object().unwrap();
    let second_keys = value.at(1).as_object().unwrap();
    let id_a = first_keys.keys().find(|k| k.as_ref() == "id").unwrap();
    let id_b = second_keys.keys().find(|k| k.as_ref() == "id").unwrap();
    assert!(std::sync::Arc::ptr_eq(id_a, id_b));
}

#[test]
fn depth_limit_is_configurable() {
    let options = ParseOptions {
        max_depth: 3,
        ..ParseOptions::default()
    };
    let mut session = DomParser::new(&options);
    let err = session.feed(b"[[[[1]]]]").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Syntax);
    assert!(err.to_string().contains("depth"));
}

#[test]
fn schema_is_reusable_across_sessions() {
    let schema = Schema::parse(r#"{"type": "integer"}"#).unwrap();
    for text in ["1", "2", "3"] {
        assert!(jsonflux::parse_with_schema(text, &schema).is_ok());
    }
    assert!(jsonflux::parse_with_schema("1.5", &schema).is_err());
}

#[test]
fn shared_schema_validates_concurrently() {
    let schema = std::sync::Arc::new(
        Schema::parse(r#"{"type": "array", "items": {"type": "integer"}}"#).unwrap(),
    );
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let schema = schema.clone();
            std::thread::spawn(move || {
                let text = format!("[{i}, {i}, {i}]");
                jsonflux::parse_with_schema(&text, &schema).map(|v| v.len())
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), 3);
    }
}

#[test]
fn default_injection_can_be_disabled() {
    let schema = Schema::parse(r#"{"type": "object", "properties": {"x": {"default": 7}}}"#).unwrap();
    let options = ParseOptions {
        inject_defaults: false,
        ..ParseOptions::default()
    };
    let mut session = DomParser::with_schema(&schema, &options);
    session.feed(b"{}").unwrap();
    let value = session.end().unwrap();
    assert!(!value.get("x").is_valid());

    let with_defaults = jsonflux::parse_with_schema("{}", &schema).unwrap();
    assert_eq!(with_defaults.get("x"), &Value::from(7));
}
