//! Creator resolution: precedence, ambiguity rejection, scalar shortcuts,
//! caching.

use std::sync::Arc;

use databind::introspect::{Introspector, IntrospectorChain};
use databind::{BindConfig, Binder, CreatorKind, ValueInstantiator};
use databind_core::{
    Attrs, BindError, Callable, Constructor, FactoryMethod, ParamSpec, ScalarKind, TypeDesc,
    TypeRegistry, TypeSpec, Value, Visibility,
};

fn echo_callable(name: &str) -> Callable {
    Callable::new(name.to_owned(), |args| Ok(Value::Array(args)))
}

fn ctor(params: Vec<ParamSpec>, attrs: Attrs, name: &str) -> Constructor {
    Constructor {
        params,
        visibility: Visibility::Public,
        attrs,
        callable: echo_callable(name),
    }
}

fn factory(name: &str, params: Vec<ParamSpec>, attrs: Attrs) -> FactoryMethod {
    FactoryMethod {
        name: name.to_owned(),
        params,
        visibility: Visibility::Public,
        attrs,
        callable: echo_callable(name),
    }
}

fn binder_for(spec: Arc<TypeSpec>) -> Binder {
    let mut registry = TypeRegistry::new();
    registry.register(spec);
    Binder::new(BindConfig::new(registry))
}

// ============================================================================
// Scalar shortcut and determinism
// ============================================================================

#[test]
fn single_string_constructor_resolves_to_scalar_strategy() {
    let spec = TypeSpec::builder("Name")
        .constructor(ctor(
            vec![ParamSpec::unnamed(TypeDesc::string())],
            Attrs::new(),
            "Name::new",
        ))
        .build();
    let binder = binder_for(spec);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Name"))
        .unwrap();
    // Assert on the variant tag, not just successful deserialization.
    match vi.kind() {
        CreatorKind::Scalar { kind, explicit, .. } => {
            assert_eq!(*kind, ScalarKind::Str);
            assert!(!explicit);
        }
        other => panic!("expected scalar strategy, got {}", other.variant_name()),
    }
}

#[test]
fn scalar_detection_prefers_string_over_other_kinds() {
    let spec = TypeSpec::builder("Mixed")
        .constructor(ctor(
            vec![ParamSpec::unnamed(TypeDesc::long())],
            Attrs::new(),
            "Mixed::from_long",
        ))
        .constructor(ctor(
            vec![ParamSpec::unnamed(TypeDesc::string())],
            Attrs::new(),
            "Mixed::from_str",
        ))
        .build();
    let binder = binder_for(spec);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Mixed"))
        .unwrap();
    match vi.kind() {
        CreatorKind::Scalar { kind, callable, .. } => {
            assert_eq!(*kind, ScalarKind::Str);
            assert_eq!(callable.name(), "Mixed::from_str");
        }
        other => panic!("expected scalar strategy, got {}", other.variant_name()),
    }
}

#[test]
fn same_type_and_config_resolve_to_structurally_equal_instantiators() {
    let build_spec = || {
        TypeSpec::builder("Point")
            .constructor(ctor(
                vec![
                    ParamSpec::named("x", TypeDesc::int()),
                    ParamSpec::named("y", TypeDesc::int()),
                ],
                Attrs::new().with_str("creator", "properties"),
                "Point::new",
            ))
            .build()
    };
    let first = binder_for(build_spec())
        .find_value_instantiator(&TypeDesc::class("Point"))
        .unwrap();
    let second = binder_for(build_spec())
        .find_value_instantiator(&TypeDesc::class("Point"))
        .unwrap();
    assert_eq!(*first, *second);
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn explicit_properties_outranks_explicit_delegating() {
    let spec = TypeSpec::builder("Pair")
        .constructor(ctor(
            vec![ParamSpec::unnamed(TypeDesc::list_of(TypeDesc::long()))],
            Attrs::new().with_str("creator", "delegating"),
            "Pair::from_list",
        ))
        .constructor(ctor(
            vec![
                ParamSpec::named("a", TypeDesc::long()),
                ParamSpec::named("b", TypeDesc::long()),
            ],
            Attrs::new().with_str("creator", "properties"),
            "Pair::new",
        ))
        .build();
    let binder = binder_for(spec);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Pair"))
        .unwrap();
    assert_eq!(vi.kind().variant_name(), "properties-based");
    assert_eq!(vi.properties().len(), 2);
}

#[test]
fn explicit_delegating_outranks_implicit_scalar_constructor() {
    let spec = TypeSpec::builder("Wrapper")
        .constructor(ctor(
            vec![ParamSpec::unnamed(TypeDesc::string())],
            Attrs::new(),
            "Wrapper::from_str",
        ))
        .factory(factory(
            "from_list",
            vec![ParamSpec::unnamed(TypeDesc::list_of(TypeDesc::long()))],
            Attrs::new().with_str("creator", "delegating"),
        ))
        .build();
    let binder = binder_for(spec);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Wrapper"))
        .unwrap();
    match vi.kind() {
        CreatorKind::Delegating { callable, .. } => {
            assert_eq!(callable.name(), "from_list");
        }
        other => panic!("expected delegating strategy, got {}", other.variant_name()),
    }
}

#[test]
fn declaration_order_wins_among_explicit_delegating_creators() {
    let spec = TypeSpec::builder("Multi")
        .factory(factory(
            "first",
            vec![ParamSpec::unnamed(TypeDesc::list_of(TypeDesc::long()))],
            Attrs::new().with_str("creator", "delegating"),
        ))
        .factory(factory(
            "second",
            vec![ParamSpec::unnamed(TypeDesc::map_of(
                TypeDesc::string(),
                TypeDesc::long(),
            ))],
            Attrs::new().with_str("creator", "delegating"),
        ))
        .build();
    let binder = binder_for(spec);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Multi"))
        .unwrap();
    match vi.kind() {
        CreatorKind::Delegating { callable, .. } => assert_eq!(callable.name(), "first"),
        other => panic!("expected delegating strategy, got {}", other.variant_name()),
    }
}

#[test]
fn disabled_creator_falls_through_to_default_constructor() {
    let spec = TypeSpec::builder("Plain")
        .constructor(ctor(
            vec![ParamSpec::unnamed(TypeDesc::string())],
            Attrs::new().with_str("creator", "disabled"),
            "Plain::from_str",
        ))
        .constructor(ctor(Vec::new(), Attrs::new(), "Plain::default"))
        .build();
    let binder = binder_for(spec);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Plain"))
        .unwrap();
    assert_eq!(vi.kind().variant_name(), "default");
}

// ============================================================================
// Degenerate creator shapes
// ============================================================================

#[test]
fn zero_arg_properties_factory_becomes_default_strategy() {
    let spec = TypeSpec::builder("Unit")
        .factory(factory(
            "make",
            Vec::new(),
            Attrs::new().with_str("creator", "properties"),
        ))
        .build();
    let binder = binder_for(spec);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Unit"))
        .unwrap();
    assert_eq!(vi.kind().variant_name(), "default");
    assert!(vi.can_create_default());
}

#[test]
fn zero_arg_delegating_creator_behaves_like_empty_properties_creator() {
    let spec = TypeSpec::builder("Unit")
        .factory(factory(
            "make",
            Vec::new(),
            Attrs::new().with_str("creator", "delegating"),
        ))
        .build();
    let binder = binder_for(spec);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Unit"))
        .unwrap();
    assert_eq!(vi.kind().variant_name(), "properties-based");
    assert!(vi.properties().is_empty());
    assert!(vi.can_create_default());
}

// ============================================================================
// Definition errors
// ============================================================================

#[test]
fn competing_implicit_delegating_constructors_are_rejected() {
    // Two multi-argument constructors, each with one un-injectable, unnamed
    // parameter and no creator annotation.
    let spec = TypeSpec::builder("Ambiguous")
        .constructor(ctor(
            vec![
                ParamSpec::unnamed(TypeDesc::string()),
                ParamSpec::unnamed(TypeDesc::long())
                    .with_attrs(Attrs::new().with_str("inject", "a")),
            ],
            Attrs::new(),
            "Ambiguous::one",
        ))
        .constructor(ctor(
            vec![
                ParamSpec::unnamed(TypeDesc::long())
                    .with_attrs(Attrs::new().with_str("inject", "b")),
                ParamSpec::unnamed(TypeDesc::double()),
            ],
            Attrs::new(),
            "Ambiguous::two",
        ))
        .build();
    let binder = binder_for(spec);

    match binder.find_value_instantiator(&TypeDesc::class("Ambiguous")) {
        Err(BindError::BadTypeDefinition { detail, .. }) => {
            assert!(
                detail.contains("more than one argument left as delegating"),
                "unexpected detail: {detail}"
            );
        }
        other => panic!("expected bad type definition, got {other:?}"),
    }
}

#[test]
fn explicit_delegating_with_two_open_arguments_is_rejected() {
    let spec = TypeSpec::builder("TwoOpen")
        .constructor(ctor(
            vec![
                ParamSpec::unnamed(TypeDesc::string()),
                ParamSpec::unnamed(TypeDesc::long()),
            ],
            Attrs::new().with_str("creator", "delegating"),
            "TwoOpen::new",
        ))
        .build();
    let binder = binder_for(spec);

    match binder.find_value_instantiator(&TypeDesc::class("TwoOpen")) {
        Err(BindError::BadTypeDefinition { detail, .. }) => {
            assert!(
                detail.contains("more than one argument left as delegating"),
                "unexpected detail: {detail}"
            );
        }
        other => panic!("expected bad type definition, got {other:?}"),
    }
}

#[test]
fn properties_parameter_without_name_or_injection_is_rejected() {
    let spec = TypeSpec::builder("NoName")
        .constructor(ctor(
            vec![
                ParamSpec::named("a", TypeDesc::long()),
                ParamSpec::unnamed(TypeDesc::long()),
            ],
            Attrs::new().with_str("creator", "properties"),
            "NoName::new",
        ))
        .build();
    let binder = binder_for(spec);

    match binder.find_value_instantiator(&TypeDesc::class("NoName")) {
        Err(BindError::BadTypeDefinition { detail, .. }) => {
            assert!(
                detail.contains("no property name annotation and is not injectable"),
                "unexpected detail: {detail}"
            );
        }
        other => panic!("expected bad type definition, got {other:?}"),
    }
}

#[test]
fn two_any_setters_are_rejected() {
    let spec = TypeSpec::builder("DoubleAny")
        .constructor(ctor(
            vec![
                ParamSpec::unnamed(TypeDesc::any())
                    .with_attrs(Attrs::new().with_flag("any_setter")),
                ParamSpec::unnamed(TypeDesc::any())
                    .with_attrs(Attrs::new().with_flag("any_setter")),
            ],
            Attrs::new().with_str("creator", "properties"),
            "DoubleAny::new",
        ))
        .build();
    let binder = binder_for(spec);

    match binder.find_value_instantiator(&TypeDesc::class("DoubleAny")) {
        Err(BindError::BadTypeDefinition { detail, .. }) => {
            assert!(detail.contains("any-setter"), "unexpected detail: {detail}");
        }
        other => panic!("expected bad type definition, got {other:?}"),
    }
}

#[test]
fn broken_type_fails_identically_on_repeated_resolution() {
    let spec = TypeSpec::builder("Broken")
        .constructor(ctor(
            vec![
                ParamSpec::named("a", TypeDesc::long()),
                ParamSpec::unnamed(TypeDesc::long()),
            ],
            Attrs::new().with_str("creator", "properties"),
            "Broken::new",
        ))
        .build();
    let binder = binder_for(spec);
    let target = TypeDesc::class("Broken");

    let first = binder.find_value_instantiator(&target).unwrap_err();
    let second = binder.find_value_instantiator(&target).unwrap_err();
    assert!(first.is_definition_error());
    assert_eq!(first, second);
}

#[test]
fn unregistered_type_is_a_definition_error() {
    let binder = Binder::new(BindConfig::new(TypeRegistry::new()));
    match binder.find_value_instantiator(&TypeDesc::class("Ghost")) {
        Err(BindError::BadTypeDefinition { type_name, .. }) => {
            assert_eq!(type_name, "Ghost");
        }
        other => panic!("expected bad type definition, got {other:?}"),
    }
}

// ============================================================================
// Configuration gates
// ============================================================================

#[test]
fn implicit_detection_disabled_skips_scalar_constructors() {
    let spec = TypeSpec::builder("Name")
        .constructor(ctor(
            vec![ParamSpec::unnamed(TypeDesc::string())],
            Attrs::new(),
            "Name::new",
        ))
        .build();
    let mut registry = TypeRegistry::new();
    registry.register(spec);
    let binder = Binder::new(
        BindConfig::new(registry).with_implicit_creator_detection(false),
    );

    match binder.find_value_instantiator(&TypeDesc::class("Name")) {
        Err(BindError::BadTypeDefinition { detail, .. }) => {
            assert!(detail.contains("no suitable creator"), "{detail}");
        }
        other => panic!("expected bad type definition, got {other:?}"),
    }
}

#[test]
fn private_constructors_are_invisible_to_implicit_detection() {
    let spec = TypeSpec::builder("Guarded")
        .constructor(Constructor {
            params: vec![ParamSpec::unnamed(TypeDesc::string())],
            visibility: Visibility::Private,
            attrs: Attrs::new(),
            callable: echo_callable("Guarded::hidden"),
        })
        .constructor(ctor(Vec::new(), Attrs::new(), "Guarded::default"))
        .build();
    let binder = binder_for(spec);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Guarded"))
        .unwrap();
    assert_eq!(vi.kind().variant_name(), "default");
}

#[test]
fn preferred_creator_marker_selects_properties_strategy() {
    let spec = TypeSpec::builder("Point")
        .constructor(ctor(
            vec![
                ParamSpec::named("x", TypeDesc::int()),
                ParamSpec::named("y", TypeDesc::int()),
            ],
            Attrs::new().with_flag("primary"),
            "Point::new",
        ))
        .build();
    let binder = binder_for(spec);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Point"))
        .unwrap();
    assert_eq!(vi.kind().variant_name(), "properties-based");
}

// ============================================================================
// Oracle override escape hatch
// ============================================================================

#[test]
fn oracle_supplied_instantiator_short_circuits_discovery() {
    struct Override;
    impl Introspector for Override {
        fn find_value_instantiator(&self, spec: &TypeSpec) -> Option<Arc<ValueInstantiator>> {
            (spec.name() == "Special").then(|| {
                Arc::new(ValueInstantiator::new(
                    "Special",
                    CreatorKind::Default {
                        callable: Callable::new("Special::magic", |_| {
                            Ok(Value::Str("magic".into()))
                        }),
                    },
                ))
            })
        }
    }

    // The registered spec would normally resolve to a scalar strategy.
    let spec = TypeSpec::builder("Special")
        .constructor(ctor(
            vec![ParamSpec::unnamed(TypeDesc::string())],
            Attrs::new(),
            "Special::new",
        ))
        .build();
    let mut registry = TypeRegistry::new();
    registry.register(spec);
    let config = BindConfig::new(registry)
        .with_introspector(IntrospectorChain::standard().prepend(Arc::new(Override)));
    let binder = Binder::new(config);

    let vi = binder
        .find_value_instantiator(&TypeDesc::class("Special"))
        .unwrap();
    assert_eq!(vi.kind().variant_name(), "default");
    match vi.kind() {
        CreatorKind::Default { callable } => assert_eq!(callable.name(), "Special::magic"),
        other => panic!("expected default strategy, got {}", other.variant_name()),
    }
}
