use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use jsonflux_dom::{Number, Value};
use jsonflux_referencing::{uri, Registry, UriScope};
use regex::Regex;
use tracing::debug;

use crate::{
    error::Error,
    schema::{
        node::{SchemaNode, ValidatorKind},
        validators::{
            Additional, ArrayValidator, CombineMode, CombinedValidator, EnumValidator,
            GenericValidator, ItemsKind, NumberValidator, ObjectValidator, PatternProperty,
            ReferenceValidator, StringValidator, TypeSet,
        },
    },
};

/// Compilation artifacts shared by a schema and everything `resolve` pulls
/// in later: the location registry and the `$ref` placeholders awaiting
/// linking.
pub(crate) struct CompiledSet {
    pub(crate) registry: Registry<Arc<SchemaNode>>,
    pub(crate) references: Vec<Arc<SchemaNode>>,
}

impl CompiledSet {
    pub(crate) fn new() -> CompiledSet {
        CompiledSet {
            registry: Registry::new(),
            references: Vec::new(),
        }
    }
}

/// Lowers a parsed schema document into a validator tree, registering every
/// schema object under its URI locations.
pub(crate) fn compile(
    schema: &Value,
    base_uri: Option<&str>,
    set: &mut CompiledSet,
) -> Result<Arc<SchemaNode>, Error> {
    let mut scope = UriScope::new(base_uri)?;
    let root = compile_node(schema, &mut scope, set)?;
    debug!(
        documents = set.registry.document_count(),
        references = set.references.len(),
        "compiled schema document"
    );
    Ok(root)
}

fn compile_node(
    schema: &Value,
    scope: &mut UriScope,
    set: &mut CompiledSet,
) -> Result<Arc<SchemaNode>, Error> {
    let Some(members) = schema.as_object() else {
        return Err(Error::schema("schema must be an object", scope.fragment()));
    };

    // `$ref` short-circuits: only the referenced schema applies here. Its
    // `definitions` are still compiled, since references may point into
    // them.
    if let Some(reference) = members.get("$ref") {
        let Some(reference) = reference.as_str() else {
            return Err(Error::schema("$ref must be a string", scope.fragment()));
        };
        compile_definitions(members, scope, set)?;
        let target = scope.resolve(reference)?;
        let (document, fragment) = uri::split_fragment(&target);
        set.registry.add_document(&document);
        let node = Arc::new(SchemaNode {
            kind: ValidatorKind::Reference(ReferenceValidator::new(
                target.as_str(),
                &document,
                &fragment,
            )),
            default: None,
            location: scope.fragment().into(),
        });
        set.references.push(node.clone());
        register(scope, set, &node);
        return Ok(node);
    }

    let outer = scope.location();
    let mut rebased = false;
    if let Some(id) = members.get("id") {
        let Some(id) = id.as_str() else {
            return Err(Error::schema("id must be a string", scope.fragment()));
        };
        scope.push_id(id)?;
        rebased = true;
    }

    let result = compile_body(members, scope, set);
    let node = match result {
        Ok(node) => node,
        Err(err) => {
            if rebased {
                scope.pop_id();
            }
            return Err(err);
        }
    };

    register(scope, set, &node);
    if rebased {
        scope.pop_id();
        // Also reachable under its physical position in the outer document.
        let (document, fragment) = outer;
        set.registry.register(&document, &fragment, node.clone());
    }
    Ok(node)
}

/// Compiles (and registers) named sub-schemas; nothing points at them yet,
/// `$ref` finds them during resolve.
fn compile_definitions(
    members: &jsonflux_dom::Object,
    scope: &mut UriScope,
    set: &mut CompiledSet,
) -> Result<(), Error> {
    let Some(definitions) = members.get("definitions") else {
        return Ok(());
    };
    let Some(definitions) = definitions.as_object() else {
        return Err(Error::schema(
            "definitions must be an object",
            scope.fragment(),
        ));
    };
    for (name, definition) in definitions.iter() {
        scope.push_segment("definitions");
        scope.push_segment(name);
        compile_node(definition, scope, set)?;
        scope.pop_segment();
        scope.pop_segment();
    }
    Ok(())
}

fn register(scope: &UriScope, set: &mut CompiledSet, node: &Arc<SchemaNode>) {
    let (document, fragment) = scope.location();
    set.registry.register(&document, &fragment, node.clone());
}

/// Compiles the keywords of one schema object (minus `$ref`/`id`, already
/// handled) into a validator.
fn compile_body(
    members: &jsonflux_dom::Object,
    scope: &mut UriScope,
    set: &mut CompiledSet,
) -> Result<Arc<SchemaNode>, Error> {
    compile_definitions(members, scope, set)?;

    let types = compile_types(members, scope)?;
    let string = compile_string_features(members, scope)?;
    let number = compile_number_features(members, scope)?;
    let array = compile_array_features(members, scope, set)?;
    let object = compile_object_features(members, scope, set)?;

    let mut kinds: Vec<ValidatorKind> = Vec::new();
    match types {
        Some(types) if types.is_single() => {
            kinds.push(single_type_kind(types, string, number, array, object));
        }
        Some(types) => kinds.push(ValidatorKind::Generic(GenericValidator {
            types: Some(types),
            string,
            number,
            array,
            object,
        })),
        None => {
            let generic = GenericValidator {
                types: None,
                string,
                number,
                array,
                object,
            };
            if !generic.is_unconstrained() {
                kinds.push(ValidatorKind::Generic(generic));
            }
        }
    }

    if let Some(options) = members.get("enum") {
        let Some(options) = options.as_array() else {
            return Err(Error::schema("enum must be an array", scope.fragment()));
        };
        if options.is_empty() {
            return Err(Error::schema("enum must not be empty", scope.fragment()));
        }
        kinds.push(ValidatorKind::Enum(EnumValidator {
            options: options.iter().cloned().collect(),
        }));
    }

    for mode in [CombineMode::AllOf, CombineMode::AnyOf, CombineMode::OneOf] {
        if let Some(branches) = members.get(mode.keyword()) {
            let Some(branches) = branches.as_array() else {
                return Err(Error::schema(
                    format!("{} must be an array", mode.keyword()),
                    scope.fragment(),
                ));
            };
            if branches.is_empty() {
                return Err(Error::schema(
                    format!("{} must not be empty", mode.keyword()),
                    scope.fragment(),
                ));
            }
            let mut compiled = Vec::with_capacity(branches.len());
            for (index, branch) in branches.iter().enumerate() {
                scope.push_segment(mode.keyword());
                scope.push_index(index);
                compiled.push(compile_node(branch, scope, set)?);
                scope.pop_segment();
                scope.pop_segment();
            }
            kinds.push(ValidatorKind::Combined(CombinedValidator {
                mode,
                branches: compiled,
            }));
        }
    }

    if let Some(forbidden) = members.get("not") {
        scope.push_segment("not");
        let branch = compile_node(forbidden, scope, set)?;
        scope.pop_segment();
        kinds.push(ValidatorKind::Combined(CombinedValidator {
            mode: CombineMode::Not,
            branches: vec![branch],
        }));
    }

    let location: Box<str> = scope.fragment().into();
    let kind = match kinds.len() {
        0 => ValidatorKind::Generic(GenericValidator::default()),
        1 => kinds
            .pop()
            .unwrap_or(ValidatorKind::Generic(GenericValidator::default())),
        _ => {
            // Independent keyword groups combine conjunctively.
            let branches = kinds
                .into_iter()
                .map(|kind| {
                    Arc::new(SchemaNode {
                        kind,
                        default: None,
                        location: location.clone(),
                    })
                })
                .collect();
            ValidatorKind::Combined(CombinedValidator {
                mode: CombineMode::AllOf,
                branches,
            })
        }
    };

    let default = members.get("default").cloned();
    Ok(Arc::new(SchemaNode {
        kind,
        default,
        location,
    }))
}

fn single_type_kind(
    types: TypeSet,
    string: Option<StringValidator>,
    number: Option<NumberValidator>,
    array: Option<ArrayValidator>,
    object: Option<ObjectValidator>,
) -> ValidatorKind {
    match types {
        TypeSet::NULL => ValidatorKind::Null,
        TypeSet::BOOLEAN => ValidatorKind::Boolean,
        TypeSet::STRING => ValidatorKind::String(string.unwrap_or_default()),
        TypeSet::INTEGER => {
            let mut validator = number.unwrap_or_default();
            validator.integer = true;
            ValidatorKind::Number(validator)
        }
        TypeSet::NUMBER => ValidatorKind::Number(number.unwrap_or_default()),
        TypeSet::ARRAY => ValidatorKind::Array(array.unwrap_or_default()),
        TypeSet::OBJECT => ValidatorKind::Object(object.unwrap_or_default()),
        _ => ValidatorKind::Generic(GenericValidator {
            types: Some(types),
            string,
            number,
            array,
            object,
        }),
    }
}

fn compile_types(
    members: &jsonflux_dom::Object,
    scope: &UriScope,
) -> Result<Option<TypeSet>, Error> {
    let Some(value) = members.get("type") else {
        return Ok(None);
    };
    let mut types = TypeSet::default();
    let names: Vec<&str> = match value {
        Value::String(name) => vec![name.as_ref()],
        Value::Array(names) => {
            let mut collected = Vec::with_capacity(names.len());
            for name in names.iter() {
                let Some(name) = name.as_str() else {
                    return Err(Error::schema(
                        "type entries must be strings",
                        scope.fragment(),
                    ));
                };
                collected.push(name);
            }
            collected
        }
        _ => {
            return Err(Error::schema(
                "type must be a string or an array of strings",
                scope.fragment(),
            ));
        }
    };
    for name in names {
        let Some(single) = TypeSet::from_name(name) else {
            return Err(Error::schema(
                format!("unknown type {name:?}"),
                scope.fragment(),
            ));
        };
        types = types.insert(single);
    }
    Ok(Some(types))
}

fn uint_feature(
    members: &jsonflux_dom::Object,
    keyword: &str,
    scope: &UriScope,
) -> Result<Option<u64>, Error> {
    let Some(value) = members.get(keyword) else {
        return Ok(None);
    };
    let invalid = || Error::schema(
        format!("{keyword} must be a non-negative integer"),
        scope.fragment(),
    );
    let number = value.as_number().ok_or_else(invalid)?;
    let (limit, flags) = number.as_i64();
    if !flags.is_ok() || limit < 0 {
        return Err(invalid());
    }
    Ok(Some(limit as u64))
}

fn bool_feature(
    members: &jsonflux_dom::Object,
    keyword: &str,
    scope: &UriScope,
) -> Result<Option<bool>, Error> {
    let Some(value) = members.get(keyword) else {
        return Ok(None);
    };
    value.as_bool().map(Some).map_err(|_| {
        Error::schema(format!("{keyword} must be a boolean"), scope.fragment())
    })
}

fn number_feature(
    members: &jsonflux_dom::Object,
    keyword: &str,
    scope: &UriScope,
) -> Result<Option<Number>, Error> {
    let Some(value) = members.get(keyword) else {
        return Ok(None);
    };
    let Some(number) = value.as_number() else {
        return Err(Error::schema(
            format!("{keyword} must be a number"),
            scope.fragment(),
        ));
    };
    Ok(Some(number.clone()))
}

fn compile_string_features(
    members: &jsonflux_dom::Object,
    scope: &UriScope,
) -> Result<Option<StringValidator>, Error> {
    let min_length = uint_feature(members, "minLength", scope)?;
    let max_length = uint_feature(members, "maxLength", scope)?;
    let pattern = match members.get("pattern") {
        None => None,
        Some(value) => {
            let Some(source) = value.as_str() else {
                return Err(Error::schema("pattern must be a string", scope.fragment()));
            };
            Some(compile_regex(source, scope)?)
        }
    };
    if min_length.is_none() && max_length.is_none() && pattern.is_none() {
        return Ok(None);
    }
    Ok(Some(StringValidator {
        min_length,
        max_length,
        pattern,
    }))
}

fn compile_regex(source: &str, scope: &UriScope) -> Result<Regex, Error> {
    Regex::new(source).map_err(|err| {
        Error::schema(
            format!("cannot compile pattern {source:?}: {err}"),
            scope.fragment(),
        )
    })
}

fn compile_number_features(
    members: &jsonflux_dom::Object,
    scope: &UriScope,
) -> Result<Option<NumberValidator>, Error> {
    let minimum = number_feature(members, "minimum", scope)?;
    let maximum = number_feature(members, "maximum", scope)?;
    let exclusive_minimum = bool_feature(members, "exclusiveMinimum", scope)?;
    let exclusive_maximum = bool_feature(members, "exclusiveMaximum", scope)?;
    if exclusive_minimum.is_some() && minimum.is_none() {
        return Err(Error::schema(
            "exclusiveMinimum requires minimum",
            scope.fragment(),
        ));
    }
    if exclusive_maximum.is_some() && maximum.is_none() {
        return Err(Error::schema(
            "exclusiveMaximum requires maximum",
            scope.fragment(),
        ));
    }
    let multiple_of = match number_feature(members, "multipleOf", scope)? {
        None => None,
        Some(step) => {
            let (value, _) = step.as_f64();
            if value <= 0.0 {
                return Err(Error::schema(
                    "multipleOf must be greater than zero",
                    scope.fragment(),
                ));
            }
            Some(step)
        }
    };
    if minimum.is_none() && maximum.is_none() && multiple_of.is_none() {
        return Ok(None);
    }
    Ok(Some(NumberValidator {
        integer: false,
        minimum,
        exclusive_minimum: exclusive_minimum.unwrap_or(false),
        maximum,
        exclusive_maximum: exclusive_maximum.unwrap_or(false),
        multiple_of,
    }))
}

fn compile_array_features(
    members: &jsonflux_dom::Object,
    scope: &mut UriScope,
    set: &mut CompiledSet,
) -> Result<Option<ArrayValidator>, Error> {
    let min_items = uint_feature(members, "minItems", scope)?;
    let max_items = uint_feature(members, "maxItems", scope)?;
    let unique_items = bool_feature(members, "uniqueItems", scope)?.unwrap_or(false);

    let items = match members.get("items") {
        None => ItemsKind::Any,
        Some(Value::Array(tuple)) => {
            let mut compiled = Vec::with_capacity(tuple.len());
            for (index, entry) in tuple.iter().enumerate() {
                scope.push_segment("items");
                scope.push_index(index);
                compiled.push(compile_node(entry, scope, set)?);
                scope.pop_segment();
                scope.pop_segment();
            }
            ItemsKind::Tuple(compiled)
        }
        Some(entry @ Value::Object(_)) => {
            scope.push_segment("items");
            let node = compile_node(entry, scope, set)?;
            scope.pop_segment();
            ItemsKind::Single(node)
        }
        Some(_) => {
            return Err(Error::schema(
                "items must be a schema or an array of schemas",
                scope.fragment(),
            ));
        }
    };

    let additional_items = compile_additional(members, "additionalItems", scope, set)?;

    if min_items.is_none()
        && max_items.is_none()
        && !unique_items
        && matches!(items, ItemsKind::Any)
        && additional_items.is_none()
    {
        return Ok(None);
    }
    Ok(Some(ArrayValidator {
        items,
        additional_items,
        min_items,
        max_items,
        unique_items,
    }))
}

/// `additionalItems` / `additionalProperties`: a boolean or a schema.
fn compile_additional(
    members: &jsonflux_dom::Object,
    keyword: &str,
    scope: &mut UriScope,
    set: &mut CompiledSet,
) -> Result<Option<Additional>, Error> {
    match members.get(keyword) {
        None => Ok(None),
        Some(Value::Bool(true)) => Ok(Some(Additional::Allowed)),
        Some(Value::Bool(false)) => Ok(Some(Additional::Forbidden)),
        Some(entry @ Value::Object(_)) => {
            scope.push_segment(keyword);
            let node = compile_node(entry, scope, set)?;
            scope.pop_segment();
            Ok(Some(Additional::Schema(node)))
        }
        Some(_) => Err(Error::schema(
            format!("{keyword} must be a boolean or a schema"),
            scope.fragment(),
        )),
    }
}

fn compile_object_features(
    members: &jsonflux_dom::Object,
    scope: &mut UriScope,
    set: &mut CompiledSet,
) -> Result<Option<ObjectValidator>, Error> {
    let min_properties = uint_feature(members, "minProperties", scope)?;
    let max_properties = uint_feature(members, "maxProperties", scope)?;

    let mut properties: AHashMap<Box<str>, Arc<SchemaNode>> = AHashMap::new();
    if let Some(value) = members.get("properties") {
        let Some(entries) = value.as_object() else {
            return Err(Error::schema(
                "properties must be an object",
                scope.fragment(),
            ));
        };
        for (name, entry) in entries.iter() {
            scope.push_segment("properties");
            scope.push_segment(name);
            let node = compile_node(entry, scope, set)?;
            scope.pop_segment();
            scope.pop_segment();
            properties.insert(name.as_ref().into(), node);
        }
    }

    let mut pattern_properties = Vec::new();
    if let Some(value) = members.get("patternProperties") {
        let Some(entries) = value.as_object() else {
            return Err(Error::schema(
                "patternProperties must be an object",
                scope.fragment(),
            ));
        };
        // Sorted for a deterministic conjunction order.
        for name in entries.sorted_keys() {
            let Some(entry) = entries.get(name) else {
                continue;
            };
            let regex = compile_regex(name, scope)?;
            scope.push_segment("patternProperties");
            scope.push_segment(name);
            let node = compile_node(entry, scope, set)?;
            scope.pop_segment();
            scope.pop_segment();
            pattern_properties.push(PatternProperty { regex, node });
        }
    }

    let additional_properties = compile_additional(members, "additionalProperties", scope, set)?;

    let mut required: Vec<Box<str>> = Vec::new();
    let mut required_set: AHashSet<Box<str>> = AHashSet::new();
    if let Some(value) = members.get("required") {
        let Some(entries) = value.as_array() else {
            return Err(Error::schema(
                "required must be an array of strings",
                scope.fragment(),
            ));
        };
        for entry in entries.iter() {
            let Some(key) = entry.as_str() else {
                return Err(Error::schema(
                    "required must be an array of strings",
                    scope.fragment(),
                ));
            };
            if required_set.insert(key.into()) {
                required.push(key.into());
            }
        }
    }

    if min_properties.is_none()
        && max_properties.is_none()
        && properties.is_empty()
        && pattern_properties.is_empty()
        && additional_properties.is_none()
        && required.is_empty()
    {
        return Ok(None);
    }
    Ok(Some(ObjectValidator {
        properties,
        pattern_properties,
        additional_properties,
        required,
        required_set,
        min_properties,
        max_properties,
    }))
}
