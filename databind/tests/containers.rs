//! Container deserialization: coercion boundaries, null policies, set and
//! map materialization, forward references.

use std::sync::Arc;

use databind::deser::ValueDeser;
use databind::{BindConfig, Binder, DeserContext};
use databind_core::{
    Attrs, BindError, Callable, CoercionAction, CoercionConfigs, CoercionInput, CollectionKind,
    Constructor, EnumConstant, LogicalShape, MapKind, NullPolicy, ParamSpec, TokenKind,
    TokenSlice, TokenSource, TypeDesc, TypeRegistry, TypeSpec, Value, ValueMap, Visibility,
};

fn binder() -> Binder {
    Binder::new(BindConfig::new(TypeRegistry::new()))
}

fn strings(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| Value::Str((*s).to_owned())).collect())
}

fn ints(items: &[i64]) -> Value {
    Value::Array(items.iter().copied().map(Value::Int).collect())
}

// ============================================================================
// Basic collection reads
// ============================================================================

#[test]
fn list_of_longs() {
    let target = TypeDesc::list_of(TypeDesc::long());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::int(1),
        TokenKind::int(2),
        TokenKind::int(3),
        TokenKind::ArrayEnd,
    ]);
    let value = binder().read_value(&mut tokens, &target).unwrap();
    assert_eq!(value, ints(&[1, 2, 3]));
}

#[test]
fn list_of_strings_uses_fast_path() {
    let target = TypeDesc::list_of(TypeDesc::string());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::str("a"),
        TokenKind::str("b"),
        TokenKind::ArrayEnd,
    ]);
    let value = binder().read_value(&mut tokens, &target).unwrap();
    assert_eq!(value, strings(&["a", "b"]));
}

#[test]
fn mismatched_scalar_inside_string_list_reports_index() {
    let target = TypeDesc::list_of(TypeDesc::string());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::str("a"),
        TokenKind::ObjectStart,
        TokenKind::ObjectEnd,
        TokenKind::ArrayEnd,
    ]);
    let err = binder().read_value(&mut tokens, &target).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("[1]"), "missing index in: {rendered}");
}

#[test]
fn wrap_disabled_leaves_element_errors_bare() {
    let config = BindConfig::new(TypeRegistry::new()).with_wrap_element_errors(false);
    let binder = Binder::new(config);
    let target = TypeDesc::list_of(TypeDesc::string());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::ObjectStart,
        TokenKind::ObjectEnd,
        TokenKind::ArrayEnd,
    ]);
    let err = binder.read_value(&mut tokens, &target).unwrap_err();
    assert_eq!(err.path(), None);
}

// ============================================================================
// Coercion boundary: empty and blank strings into List<String>
// ============================================================================

fn list_from_text(action: Option<CoercionAction>, text: &'static str) -> Result<Value, BindError> {
    let mut config = BindConfig::new(TypeRegistry::new());
    if let Some(action) = action {
        config = config.with_coercions(
            CoercionConfigs::new().with_action(
                LogicalShape::Collection,
                CoercionInput::EmptyString,
                action,
            ),
        );
    }
    let binder = Binder::new(config);
    let target = TypeDesc::list_of(TypeDesc::string());
    let mut tokens = TokenSlice::of(vec![TokenKind::str(text)]);
    binder.read_value(&mut tokens, &target)
}

#[test]
fn empty_string_into_list_fails_by_default() {
    assert!(matches!(
        list_from_text(None, ""),
        Err(BindError::MismatchedInput { .. })
    ));
}

#[test]
fn empty_string_into_list_as_null() {
    assert_eq!(
        list_from_text(Some(CoercionAction::AsNull), "").unwrap(),
        Value::Null
    );
}

#[test]
fn empty_string_into_list_as_empty() {
    assert_eq!(
        list_from_text(Some(CoercionAction::AsEmpty), "").unwrap(),
        Value::Array(Vec::new())
    );
}

#[test]
fn blank_string_policy_is_independent_of_empty_string() {
    let config = BindConfig::new(TypeRegistry::new()).with_coercions(
        CoercionConfigs::new()
            .with_action(
                LogicalShape::Collection,
                CoercionInput::EmptyString,
                CoercionAction::AsEmpty,
            )
            .with_blank_string(CoercionAction::AsNull),
    );
    let binder = Binder::new(config);
    let target = TypeDesc::list_of(TypeDesc::string());

    let mut tokens = TokenSlice::of(vec![TokenKind::str("")]);
    assert_eq!(
        binder.read_value(&mut tokens, &target).unwrap(),
        Value::Array(Vec::new())
    );

    let mut tokens = TokenSlice::of(vec![TokenKind::str("   ")]);
    assert_eq!(binder.read_value(&mut tokens, &target).unwrap(), Value::Null);
}

// ============================================================================
// Accept single value as array
// ============================================================================

#[test]
fn single_value_as_array_enabled_wraps_the_value() {
    let config = BindConfig::new(TypeRegistry::new()).with_accept_single_value_as_array(true);
    let binder = Binder::new(config);
    let target = TypeDesc::list_of(TypeDesc::string());
    let mut tokens = TokenSlice::of(vec![TokenKind::str("abc")]);
    assert_eq!(
        binder.read_value(&mut tokens, &target).unwrap(),
        strings(&["abc"])
    );
}

#[test]
fn single_value_as_array_disabled_is_a_mismatch() {
    let target = TypeDesc::list_of(TypeDesc::string());
    let mut tokens = TokenSlice::of(vec![TokenKind::str("abc")]);
    assert!(matches!(
        binder().read_value(&mut tokens, &target),
        Err(BindError::MismatchedInput { .. })
    ));
}

// ============================================================================
// Null policies for elements
// ============================================================================

fn list_with_null(policy: NullPolicy) -> Result<Value, BindError> {
    let config = BindConfig::new(TypeRegistry::new()).with_null_policy(policy);
    let binder = Binder::new(config);
    let target = TypeDesc::list_of(TypeDesc::long());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::int(1),
        TokenKind::null(),
        TokenKind::int(2),
        TokenKind::ArrayEnd,
    ]);
    binder.read_value(&mut tokens, &target)
}

#[test]
fn null_elements_kept_by_default() {
    assert_eq!(
        list_with_null(NullPolicy::Set).unwrap(),
        Value::Array(vec![Value::Int(1), Value::Null, Value::Int(2)])
    );
}

#[test]
fn null_elements_skipped_when_configured() {
    assert_eq!(list_with_null(NullPolicy::Skip).unwrap(), ints(&[1, 2]));
}

#[test]
fn null_elements_replaced_when_as_empty() {
    assert_eq!(
        list_with_null(NullPolicy::AsEmpty).unwrap(),
        ints(&[1, 0, 2])
    );
}

#[test]
fn null_elements_fail_when_configured() {
    let err = list_with_null(NullPolicy::Fail).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("[1]"), "missing index in: {rendered}");
}

// ============================================================================
// Set and sorted-set materialization
// ============================================================================

#[test]
fn set_deduplicates_preserving_first_occurrence() {
    let target = TypeDesc::collection_of(CollectionKind::Set, TypeDesc::long());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::int(3),
        TokenKind::int(1),
        TokenKind::int(3),
        TokenKind::ArrayEnd,
    ]);
    let value = binder().read_value(&mut tokens, &target).unwrap();
    assert_eq!(value, ints(&[3, 1]));
}

#[test]
fn sorted_set_sorts_and_deduplicates() {
    let target = TypeDesc::collection_of(CollectionKind::SortedSet, TypeDesc::long());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::int(3),
        TokenKind::int(1),
        TokenKind::int(2),
        TokenKind::int(1),
        TokenKind::ArrayEnd,
    ]);
    let value = binder().read_value(&mut tokens, &target).unwrap();
    assert_eq!(value, ints(&[1, 2, 3]));
}

#[test]
fn null_into_sorted_set_is_a_structured_mismatch() {
    let target = TypeDesc::collection_of(CollectionKind::SortedSet, TypeDesc::long());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::int(1),
        TokenKind::null(),
        TokenKind::ArrayEnd,
    ]);
    match binder().read_value(&mut tokens, &target) {
        Err(BindError::MismatchedInput { expected, .. }) => {
            assert!(expected.contains("non-null"), "{expected}");
        }
        other => panic!("expected structured mismatch, got {other:?}"),
    }
}

// ============================================================================
// Maps
// ============================================================================

#[test]
fn map_preserves_insertion_order() {
    let target = TypeDesc::map_of(TypeDesc::string(), TypeDesc::long());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ObjectStart,
        TokenKind::key("b"),
        TokenKind::int(2),
        TokenKind::key("a"),
        TokenKind::int(1),
        TokenKind::ObjectEnd,
    ]);
    let value = binder().read_value(&mut tokens, &target).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["b", "a"]);
}

#[test]
fn sorted_map_materializes_in_key_order() {
    let target = TypeDesc::map_kind_of(MapKind::SortedMap, TypeDesc::string(), TypeDesc::long());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ObjectStart,
        TokenKind::key("b"),
        TokenKind::int(2),
        TokenKind::key("a"),
        TokenKind::int(1),
        TokenKind::ObjectEnd,
    ]);
    let value = binder().read_value(&mut tokens, &target).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["a", "b"]);
}

#[test]
fn integer_keys_are_validated_and_canonicalized() {
    let target = TypeDesc::map_of(TypeDesc::long(), TypeDesc::string());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ObjectStart,
        TokenKind::key("007"),
        TokenKind::str("bond"),
        TokenKind::ObjectEnd,
    ]);
    let value = binder().read_value(&mut tokens, &target).unwrap();
    assert_eq!(
        value.as_object().unwrap().get("7"),
        Some(&Value::Str("bond".into()))
    );
}

#[test]
fn non_numeric_key_for_integer_key_map_fails() {
    let target = TypeDesc::map_of(TypeDesc::long(), TypeDesc::string());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ObjectStart,
        TokenKind::key("seven"),
        TokenKind::str("bond"),
        TokenKind::ObjectEnd,
    ]);
    assert!(matches!(
        binder().read_value(&mut tokens, &target),
        Err(BindError::InvalidValue { .. })
    ));
}

fn color_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register(
        TypeSpec::builder("Color")
            .constant(EnumConstant::named("Red").with_aliases(["r"]))
            .constant(EnumConstant::named("Green"))
            .constant(EnumConstant::named("Blue"))
            .build(),
    );
    registry
}

#[test]
fn abstract_map_with_enum_key_degrades_to_ordinal_order() {
    let binder = Binder::new(BindConfig::new(color_registry()));
    let target = TypeDesc::map_of(TypeDesc::enumeration("Color"), TypeDesc::long());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ObjectStart,
        TokenKind::key("Blue"),
        TokenKind::int(3),
        TokenKind::key("Red"),
        TokenKind::int(1),
        TokenKind::ObjectEnd,
    ]);
    let value = binder.read_value(&mut tokens, &target).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["Red", "Blue"]);
}

#[test]
fn enum_key_alias_canonicalizes_and_unknown_key_fails() {
    let binder = Binder::new(BindConfig::new(color_registry()));
    let target = TypeDesc::map_of(TypeDesc::enumeration("Color"), TypeDesc::long());

    let mut tokens = TokenSlice::of(vec![
        TokenKind::ObjectStart,
        TokenKind::key("r"),
        TokenKind::int(1),
        TokenKind::ObjectEnd,
    ]);
    let value = binder.read_value(&mut tokens, &target).unwrap();
    assert!(value.as_object().unwrap().contains_key("Red"));

    let mut tokens = TokenSlice::of(vec![
        TokenKind::ObjectStart,
        TokenKind::key("Purple"),
        TokenKind::int(1),
        TokenKind::ObjectEnd,
    ]);
    assert!(binder.read_value(&mut tokens, &target).is_err());
}

// ============================================================================
// Enums
// ============================================================================

#[test]
fn enum_reads_name_alias_and_ordinal() {
    let binder = Binder::new(BindConfig::new(color_registry()));
    let target = TypeDesc::enumeration("Color");

    let mut tokens = TokenSlice::of(vec![TokenKind::str("Green")]);
    assert_eq!(
        binder.read_value(&mut tokens, &target).unwrap(),
        Value::Str("Green".into())
    );

    let mut tokens = TokenSlice::of(vec![TokenKind::str("r")]);
    assert_eq!(
        binder.read_value(&mut tokens, &target).unwrap(),
        Value::Str("Red".into())
    );

    let mut tokens = TokenSlice::of(vec![TokenKind::int(2)]);
    assert_eq!(
        binder.read_value(&mut tokens, &target).unwrap(),
        Value::Str("Blue".into())
    );
}

#[test]
fn unknown_enum_constant_fails_or_maps_to_null() {
    let target = TypeDesc::enumeration("Color");

    let strict = Binder::new(BindConfig::new(color_registry()));
    let mut tokens = TokenSlice::of(vec![TokenKind::str("Purple")]);
    match strict.read_value(&mut tokens, &target) {
        Err(BindError::InvalidValue { detail, .. }) => {
            assert!(detail.contains("Purple"), "{detail}");
            assert!(detail.contains("Red"), "{detail}");
        }
        other => panic!("expected invalid value, got {other:?}"),
    }

    let lenient = Binder::new(BindConfig::new(color_registry()).with_unknown_enum_as_null(true));
    let mut tokens = TokenSlice::of(vec![TokenKind::str("Purple")]);
    assert_eq!(lenient.read_value(&mut tokens, &target).unwrap(), Value::Null);
}

// ============================================================================
// Arrays and references
// ============================================================================

#[test]
fn primitive_array_reads_scalars_directly() {
    let target = TypeDesc::array_of(TypeDesc::long());
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::int(4),
        TokenKind::int(5),
        TokenKind::ArrayEnd,
    ]);
    assert_eq!(binder().read_value(&mut tokens, &target).unwrap(), ints(&[4, 5]));
}

#[test]
fn option_wraps_content_and_passes_null_through() {
    let target = TypeDesc::option_of(TypeDesc::string());

    let mut tokens = TokenSlice::of(vec![TokenKind::null()]);
    assert_eq!(binder().read_value(&mut tokens, &target).unwrap(), Value::Null);

    let mut tokens = TokenSlice::of(vec![TokenKind::str("x")]);
    assert_eq!(
        binder().read_value(&mut tokens, &target).unwrap(),
        Value::Str("x".into())
    );
}

#[test]
fn custom_reference_wrapper_constructs_through_delegating_creator() {
    let mut registry = TypeRegistry::new();
    registry.register(
        TypeSpec::builder("Boxed")
            .constructor(Constructor {
                params: vec![ParamSpec::unnamed(TypeDesc::any())],
                visibility: Visibility::Public,
                attrs: Attrs::new().with_str("creator", "delegating"),
                callable: Callable::new("Boxed::new", |mut args| {
                    let mut map = ValueMap::new();
                    map.insert("value".into(), args.remove(0));
                    Ok(Value::Object(map))
                }),
            })
            .build(),
    );
    let binder = Binder::new(BindConfig::new(registry));
    let target = TypeDesc::reference_of(
        databind_core::RefKind::Custom("Boxed".into()),
        TypeDesc::long(),
    );
    let mut tokens = TokenSlice::of(vec![TokenKind::int(5)]);
    let value = binder.read_value(&mut tokens, &target).unwrap();
    assert_eq!(
        value.as_object().unwrap().get("value"),
        Some(&Value::Int(5))
    );
}

// ============================================================================
// Forward references through object identity
// ============================================================================

fn node_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register(
        TypeSpec::builder("Node")
            .constructor(Constructor {
                params: vec![
                    ParamSpec::named("id", TypeDesc::long()),
                    ParamSpec::named("tag", TypeDesc::string()),
                ],
                visibility: Visibility::Public,
                attrs: Attrs::new().with_str("creator", "properties"),
                callable: Callable::new("Node::new", |mut args| {
                    let mut map = ValueMap::new();
                    map.insert("id".into(), args.remove(0));
                    map.insert("tag".into(), args.remove(0));
                    Ok(Value::Object(map))
                }),
            })
            .identity("id")
            .build(),
    );
    registry
}

fn node(id: i64, tag: &str) -> Value {
    let mut map = ValueMap::new();
    map.insert("id".into(), Value::Int(id));
    map.insert("tag".into(), Value::Str(tag.to_owned()));
    Value::Object(map)
}

#[test]
fn forward_reference_resolves_in_original_order() {
    let binder = Binder::new(BindConfig::new(node_registry()));
    let target = TypeDesc::list_of(TypeDesc::class("Node"));
    // Element 1 references id 2 before its definition in element 2;
    // element 3 references it after.
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::ObjectStart,
        TokenKind::key("id"),
        TokenKind::int(1),
        TokenKind::key("tag"),
        TokenKind::str("a"),
        TokenKind::ObjectEnd,
        TokenKind::int(2),
        TokenKind::ObjectStart,
        TokenKind::key("id"),
        TokenKind::int(2),
        TokenKind::key("tag"),
        TokenKind::str("b"),
        TokenKind::ObjectEnd,
        TokenKind::int(1),
        TokenKind::ArrayEnd,
    ]);
    let value = binder.read_value(&mut tokens, &target).unwrap();
    assert_eq!(
        value,
        Value::Array(vec![
            node(1, "a"),
            node(2, "b"),
            node(2, "b"),
            node(1, "a"),
        ])
    );
}

#[test]
fn unresolved_forward_reference_is_reported() {
    let binder = Binder::new(BindConfig::new(node_registry()));
    let target = TypeDesc::list_of(TypeDesc::class("Node"));
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ArrayStart,
        TokenKind::int(9),
        TokenKind::ArrayEnd,
    ]);
    match binder.read_value(&mut tokens, &target) {
        Err(BindError::UnresolvedForwardReference { id }) => {
            assert_eq!(id, databind_core::IdKey::Int(9));
        }
        other => panic!("expected unresolved forward reference, got {other:?}"),
    }
}

#[test]
fn map_values_participate_in_forward_references() {
    let binder = Binder::new(BindConfig::new(node_registry()));
    let target = TypeDesc::map_of(TypeDesc::string(), TypeDesc::class("Node"));
    let mut tokens = TokenSlice::of(vec![
        TokenKind::ObjectStart,
        TokenKind::key("alias"),
        TokenKind::int(7),
        TokenKind::key("original"),
        TokenKind::ObjectStart,
        TokenKind::key("id"),
        TokenKind::int(7),
        TokenKind::key("tag"),
        TokenKind::str("n"),
        TokenKind::ObjectEnd,
        TokenKind::ObjectEnd,
    ]);
    let value = binder.read_value(&mut tokens, &target).unwrap();
    let map = value.as_object().unwrap();
    assert_eq!(map.get("alias"), Some(&node(7, "n")));
    assert_eq!(map.get("original"), Some(&node(7, "n")));
}

// ============================================================================
// Cachability
// ============================================================================

#[derive(Debug)]
struct Upper;
impl ValueDeser for Upper {
    fn deserialize(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let value = databind::deser::ScalarDeser::new(databind_core::ScalarKind::Str)
            .deserialize(tokens, ctxt)?;
        match value {
            Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
            other => Ok(other),
        }
    }
    fn is_cachable(&self) -> bool {
        false
    }
}

#[test]
fn standard_container_deserializers_are_cached_and_reused() {
    let binder = binder();
    let target = TypeDesc::list_of(TypeDesc::string());
    binder.find_value_deserializer(&target).unwrap();
    let cached = binder.cache().cached_deserializers();
    binder.find_value_deserializer(&target).unwrap();
    assert_eq!(binder.cache().cached_deserializers(), cached);
}

#[test]
fn custom_element_override_disables_caching() {
    let mut registry = TypeRegistry::new();
    registry.register(
        TypeSpec::builder("Tags")
            .constructor(Constructor {
                params: vec![ParamSpec::named("tags", TypeDesc::list_of(TypeDesc::string()))
                    .with_attrs(Attrs::new().with_str("content_with", "upper"))],
                visibility: Visibility::Public,
                attrs: Attrs::new().with_str("creator", "properties"),
                callable: Callable::new("Tags::new", |mut args| Ok(args.remove(0))),
            })
            .build(),
    );
    let config = BindConfig::new(registry).with_custom_deserializer("upper", Arc::new(Upper));
    let binder = Binder::new(config);

    let deser = binder
        .find_value_deserializer(&TypeDesc::class("Tags"))
        .unwrap();
    assert!(!deser.is_cachable());

    let mut tokens = TokenSlice::of(vec![
        TokenKind::ObjectStart,
        TokenKind::key("tags"),
        TokenKind::ArrayStart,
        TokenKind::str("ab"),
        TokenKind::str("cd"),
        TokenKind::ArrayEnd,
        TokenKind::ObjectEnd,
    ]);
    let value = binder
        .read_value(&mut tokens, &TypeDesc::class("Tags"))
        .unwrap();
    assert_eq!(value, strings(&["AB", "CD"]));
}
