use jsonflux::{parse_with_schema, Conversion, Schema, ValidationCode, Value};
use test_case::test_case;

fn schema(text: &str) -> Schema {
    Schema::parse(text).expect("schema compiles")
}

fn rejection(schema_text: &str, instance: &str) -> ValidationCode {
    let compiled = schema(schema_text);
    let err = parse_with_schema(instance, &compiled).expect_err("instance must be rejected");
    err.validation_code()
        .unwrap_or_else(|| panic!("expected a validation error, got {err}"))
}

#[test]
fn required_key_present() {
    let compiled = schema(r#"{"type": "object", "required": ["a"]}"#);
    let dom = parse_with_schema(r#"{"a":1,"b":2}"#, &compiled).unwrap();
    assert_eq!(dom.len(), 2);
}

#[test]
fn required_key_missing() {
    assert_eq!(
        rejection(r#"{"type": "object", "required": ["a"]}"#, r#"{"b":2}"#),
        ValidationCode::MissingRequiredKey
    );
}

#[test]
fn unique_items_violated_at_index_two() {
    let compiled = schema(r#"{"type": "array", "uniqueItems": true}"#);
    let err = parse_with_schema("[1,2,2]", &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::UniqueViolation));
    assert!(err.to_string().contains("index 2"), "{err}");
}

#[test]
fn present_property_wins_over_default() {
    let compiled = schema(r#"{"properties":{"x":{"default":7}},"type":"object"}"#);
    let dom = parse_with_schema(r#"{"x":1}"#, &compiled).unwrap();
    assert_eq!(dom.get("x"), &Value::from(1));
}

#[test]
fn absent_property_gets_default_injected() {
    let compiled = schema(r#"{"properties":{"x":{"default":7}},"type":"object"}"#);
    let dom = parse_with_schema("{}", &compiled).unwrap();
    assert_eq!(dom.get("x"), &Value::from(7));
}

#[test]
fn one_past_i64_max_is_accepted_with_flags() {
    let compiled = schema(r#"{"type": "number"}"#);
    let dom = parse_with_schema("9223372036854775808", &compiled).unwrap();
    let number = dom.as_number().expect("a number");
    let (_, int_flags) = number.as_i64();
    assert!(int_flags.contains(Conversion::POSITIVE_OVERFLOW));
    let (_, float_flags) = number.as_f64();
    assert!(float_flags.contains(Conversion::PRECISION_LOSS));
}

#[test_case(r#"{"type": "string"}"#, "42", ValidationCode::TypeMismatch ; "number for string")]
#[test_case(r#"{"type": "integer"}"#, "1.5", ValidationCode::TypeMismatch ; "fraction for integer")]
#[test_case(r#"{"type": "object"}"#, "[]", ValidationCode::TypeMismatch ; "array for object")]
#[test_case(r#"{"type": "array", "minItems": 2}"#, "[1]", ValidationCode::TooFewItems ; "too few items")]
#[test_case(r#"{"type": "array", "maxItems": 1}"#, "[1, 2]", ValidationCode::TooManyItems ; "too many items")]
#[test_case(r#"{"type": "object", "minProperties": 1}"#, "{}", ValidationCode::TooFewProperties ; "too few properties")]
#[test_case(r#"{"type": "object", "maxProperties": 1}"#, r#"{"a":1,"b":2}"#, ValidationCode::TooManyProperties ; "too many properties")]
#[test_case(r#"{"type": "string", "minLength": 2}"#, r#""a""#, ValidationCode::StringTooShort ; "short string")]
#[test_case(r#"{"type": "string", "maxLength": 1}"#, r#""ab""#, ValidationCode::StringTooLong ; "long string")]
#[test_case(r#"{"type": "string", "pattern": "^a"}"#, r#""b""#, ValidationCode::PatternMismatch ; "pattern miss")]
#[test_case(r#"{"type": "number", "minimum": 3}"#, "2", ValidationCode::NumberOutOfRange ; "below minimum")]
#[test_case(r#"{"type": "number", "maximum": 3, "exclusiveMaximum": true}"#, "3", ValidationCode::NumberOutOfRange ; "at exclusive maximum")]
#[test_case(r#"{"type": "number", "multipleOf": 3}"#, "7", ValidationCode::NotAMultiple ; "not a multiple")]
#[test_case(r#"{"enum": [1, "two"]}"#, "3", ValidationCode::EnumMismatch ; "enum miss")]
fn single_keyword_rejections(schema_text: &str, instance: &str, expected: ValidationCode) {
    assert_eq!(rejection(schema_text, instance), expected);
}

#[test_case(r#"{"type": "null"}"#, "null")]
#[test_case(r#"{"type": "boolean"}"#, "true")]
#[test_case(r#"{"type": ["string", "null"]}"#, "null")]
#[test_case(r#"{"type": "number", "minimum": 3}"#, "3")]
#[test_case(r#"{"type": "integer"}"#, "1e2" ; "integral exponent form")]
#[test_case(r#"{"enum": [{"a": 1}, [2]]}"#, r#"{"a": 1}"#  ; "object enum option")]
#[test_case(r#"{"type": "array", "uniqueItems": true}"#, r#"[1, "1", [1], {"x":1}, {"x":2}]"# ; "unique but similar")]
fn single_keyword_accepts(schema_text: &str, instance: &str) {
    let compiled = schema(schema_text);
    parse_with_schema(instance, &compiled).unwrap();
}

#[test]
fn tuple_items_with_additional_forbidden() {
    let text = r#"{
        "type": "array",
        "items": [{"type": "integer"}, {"type": "string"}],
        "additionalItems": false
    }"#;
    let compiled = schema(text);
    parse_with_schema(r#"[1, "x"]"#, &compiled).unwrap();
    parse_with_schema("[1]", &compiled).unwrap();
    let err = parse_with_schema(r#"[1, "x", 2]"#, &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::TooManyItems));
}

#[test]
fn pattern_properties_conjoin_with_named() {
    let text = r#"{
        "type": "object",
        "properties": {"port": {"type": "integer"}},
        "patternProperties": {"^p": {"minimum": 1024}},
        "additionalProperties": false
    }"#;
    let compiled = schema(text);
    parse_with_schema(r#"{"port": 8080}"#, &compiled).unwrap();
    // Satisfies the named schema but not the pattern's minimum.
    let err = parse_with_schema(r#"{"port": 80}"#, &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::NumberOutOfRange));
    // Unmatched by both: rejected by additionalProperties: false.
    let err = parse_with_schema(r#"{"host": "x"}"#, &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::UnknownProperty));
}

#[test]
fn additional_properties_schema_applies() {
    let text = r#"{"type": "object", "additionalProperties": {"type": "integer"}}"#;
    let compiled = schema(text);
    parse_with_schema(r#"{"a": 1, "b": 2}"#, &compiled).unwrap();
    let err = parse_with_schema(r#"{"a": "x"}"#, &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::TypeMismatch));
}

#[test]
fn all_of_propagates_first_branch_failure() {
    let text = r#"{"allOf": [{"type": "object"}, {"required": ["a"]}]}"#;
    let compiled = schema(text);
    parse_with_schema(r#"{"a": null}"#, &compiled).unwrap();
    let err = parse_with_schema(r#"{"b": 1}"#, &compiled).unwrap_err();
    assert_eq!(
        err.validation_code(),
        Some(ValidationCode::MissingRequiredKey)
    );
}

#[test]
fn any_of_accepts_any_live_branch() {
    let text = r#"{"anyOf": [{"type": "string"}, {"type": "integer"}]}"#;
    let compiled = schema(text);
    parse_with_schema("1", &compiled).unwrap();
    parse_with_schema(r#""x""#, &compiled).unwrap();
    let err = parse_with_schema("1.5", &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::AnyOfFailed));
}

#[test]
fn one_of_requires_exactly_one() {
    let text = r#"{"oneOf": [{"type": "number"}, {"type": "integer"}]}"#;
    let compiled = schema(text);
    // A fraction matches only the first branch.
    parse_with_schema("1.5", &compiled).unwrap();
    // An integer matches both.
    let err = parse_with_schema("3", &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::OneOfFailed));
    let err = parse_with_schema(r#""x""#, &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::OneOfFailed));
}

#[test]
fn not_inverts() {
    let compiled = schema(r#"{"not": {"type": "string"}}"#);
    parse_with_schema("1", &compiled).unwrap();
    let err = parse_with_schema(r#""x""#, &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::NotFailed));
}

#[test]
fn combinators_nest_inside_containers() {
    let text = r#"{
        "type": "object",
        "properties": {
            "value": {"anyOf": [
                {"type": "object", "required": ["kind"]},
                {"type": "array", "minItems": 1}
            ]}
        }
    }"#;
    let compiled = schema(text);
    parse_with_schema(r#"{"value": {"kind": "a", "extra": [1, 2]}}"#, &compiled).unwrap();
    parse_with_schema(r#"{"value": [null]}"#, &compiled).unwrap();
    let err = parse_with_schema(r#"{"value": []}"#, &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::AnyOfFailed));
}

#[test]
fn local_ref_to_definitions() {
    let text = r##"{
        "type": "object",
        "properties": {"node": {"$ref": "#/definitions/node"}},
        "definitions": {
            "node": {
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": {"type": "string"},
                    "next": {"$ref": "#/definitions/node"}
                }
            }
        }
    }"##;
    let compiled = schema(text);
    parse_with_schema(
        r#"{"node": {"name": "a", "next": {"name": "b"}}}"#,
        &compiled,
    )
    .unwrap();
    let err = parse_with_schema(r#"{"node": {"name": "a", "next": {}}}"#, &compiled).unwrap_err();
    assert_eq!(
        err.validation_code(),
        Some(ValidationCode::MissingRequiredKey)
    );
}

#[test]
fn self_referential_root() {
    let text = r##"{
        "type": "object",
        "properties": {"child": {"$ref": "#"}}
    }"##;
    let compiled = schema(text);
    parse_with_schema(r#"{"child": {"child": {}}}"#, &compiled).unwrap();
    let err = parse_with_schema(r#"{"child": {"child": 1}}"#, &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::TypeMismatch));
}

#[test]
fn rejection_stops_the_parse_early() {
    let compiled = schema(r#"{"type": "array", "items": {"type": "integer"}}"#);
    let err = parse_with_schema(r#"[1, "two", 3]"#, &compiled).unwrap_err();
    assert_eq!(err.validation_code(), Some(ValidationCode::TypeMismatch));
    // Offset points at the offending token, not the end of input.
    match err {
        jsonflux::Error::Validation { offset, .. } => assert_eq!(offset, 4),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn validation_error_reports_schema_location() {
    let text = r#"{"type": "object", "properties": {"a": {"type": "string"}}}"#;
    let compiled = schema(text);
    let err = parse_with_schema(r#"{"a": 1}"#, &compiled).unwrap_err();
    match err {
        jsonflux::Error::Validation { location, .. } => {
            assert_eq!(location, "#/properties/a");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn post_hoc_validation_matches_streaming() {
    let compiled = schema(r#"{"type": "object", "required": ["a"]}"#);
    let good = jsonflux::parse(r#"{"a": 1}"#).unwrap();
    let bad = jsonflux::parse(r#"{"b": 1}"#).unwrap();
    compiled.validate(&good).unwrap();
    let err = compiled.validate(&bad).unwrap_err();
    assert_eq!(
        err.validation_code(),
        Some(ValidationCode::MissingRequiredKey)
    );
}

#[test]
fn apply_enriches_with_defaults() {
    let compiled = schema(r#"{"type": "object", "properties": {"x": {"default": 7}}}"#);
    let plain = jsonflux::parse("{}").unwrap();
    let enriched = compiled.apply(&plain).unwrap();
    assert_eq!(enriched.get("x"), &Value::from(7));
    // The original DOM is untouched.
    assert!(!plain.get("x").is_valid());
}

#[test]
fn defaults_are_not_injected_inside_combinator_branches() {
    let text = r#"{"allOf": [{"type": "object", "properties": {"x": {"default": 7}}}]}"#;
    let compiled = schema(text);
    let dom = parse_with_schema("{}", &compiled).unwrap();
    assert!(!dom.get("x").is_valid());
}

#[test]
fn unknown_keywords_are_ignored() {
    let compiled = schema(
        r#"{"type": "integer", "format": "int32", "title": "n", "x-vendor": {"weird": true}}"#,
    );
    parse_with_schema("5", &compiled).unwrap();
}
