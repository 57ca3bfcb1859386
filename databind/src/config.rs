//! Immutable binding configuration.
//!
//! A [`BindConfig`] is built once, then shared read-only by every
//! deserialization call; resolution results cached against it stay valid for
//! its whole life. Feature toggles follow the builder style: `with_*`
//! methods consume and return the config.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use databind_core::{
    BindError, CoercionConfigs, NullPolicy, TypeRegistry, TypeSpec, Value, Visibility,
};

use crate::deser::ValueDeser;
use crate::introspect::IntrospectorChain;

/// Per-type configuration override.
#[derive(Debug, Clone, Default)]
pub struct TypeOverride {
    /// Null policy applied to the type's properties and contents.
    pub null_policy: Option<NullPolicy>,
    /// Whether unknown properties are ignored for this type.
    pub ignore_unknown: Option<bool>,
}

/// Values supplied outside the token stream, keyed by injection id.
#[derive(Debug, Clone, Default)]
pub struct InjectableValues {
    values: HashMap<String, Value>,
}

impl InjectableValues {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value under an injection id.
    pub fn with_value(mut self, id: impl Into<String>, value: Value) -> Self {
        self.values.insert(id.into(), value);
        self
    }

    /// Look up the value for an injection id.
    pub fn find(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }
}

/// Immutable configuration shared by all calls on one binder.
#[derive(Clone)]
pub struct BindConfig {
    registry: TypeRegistry,
    introspector: IntrospectorChain,
    coercions: CoercionConfigs,
    type_overrides: HashMap<String, TypeOverride>,
    custom_deserializers: HashMap<String, Arc<dyn ValueDeser>>,
    accept_single_value_as_array: bool,
    fail_on_unknown_properties: bool,
    wrap_element_errors: bool,
    implicit_creator_detection: bool,
    unknown_enum_as_null: bool,
    min_creator_visibility: Visibility,
    global_null_policy: NullPolicy,
}

impl BindConfig {
    /// Configuration over a registry, with the standard oracle chain and
    /// default features.
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            introspector: IntrospectorChain::standard(),
            coercions: CoercionConfigs::new(),
            type_overrides: HashMap::new(),
            custom_deserializers: HashMap::new(),
            accept_single_value_as_array: false,
            fail_on_unknown_properties: true,
            wrap_element_errors: true,
            implicit_creator_detection: true,
            unknown_enum_as_null: false,
            min_creator_visibility: Visibility::Public,
            global_null_policy: NullPolicy::Set,
        }
    }

    /// Replace the oracle chain.
    pub fn with_introspector(mut self, chain: IntrospectorChain) -> Self {
        self.introspector = chain;
        self
    }

    /// Replace the coercion tables.
    pub fn with_coercions(mut self, coercions: CoercionConfigs) -> Self {
        self.coercions = coercions;
        self
    }

    /// Add a per-type override.
    pub fn with_type_override(mut self, type_name: impl Into<String>, ov: TypeOverride) -> Self {
        self.type_overrides.insert(type_name.into(), ov);
        self
    }

    /// Register a custom deserializer under a name usable from `with` /
    /// `content_with` attributes.
    pub fn with_custom_deserializer(
        mut self,
        name: impl Into<String>,
        deser: Arc<dyn ValueDeser>,
    ) -> Self {
        self.custom_deserializers.insert(name.into(), deser);
        self
    }

    /// Toggle accepting a lone value where an array is expected.
    pub fn with_accept_single_value_as_array(mut self, on: bool) -> Self {
        self.accept_single_value_as_array = on;
        self
    }

    /// Toggle failing on unknown properties.
    pub fn with_fail_on_unknown_properties(mut self, on: bool) -> Self {
        self.fail_on_unknown_properties = on;
        self
    }

    /// Toggle wrapping element-level errors with container paths.
    pub fn with_wrap_element_errors(mut self, on: bool) -> Self {
        self.wrap_element_errors = on;
        self
    }

    /// Toggle implicit (un-annotated) constructor detection.
    pub fn with_implicit_creator_detection(mut self, on: bool) -> Self {
        self.implicit_creator_detection = on;
        self
    }

    /// Toggle mapping unknown enum constants to null instead of failing.
    pub fn with_unknown_enum_as_null(mut self, on: bool) -> Self {
        self.unknown_enum_as_null = on;
        self
    }

    /// Minimum visibility an un-annotated member needs to be considered.
    pub fn with_min_creator_visibility(mut self, visibility: Visibility) -> Self {
        self.min_creator_visibility = visibility;
        self
    }

    /// Global null-handling default.
    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.global_null_policy = policy;
        self
    }

    /// The type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Look up a registered spec, failing with a definition error.
    pub fn require_spec(&self, name: &str) -> Result<&Arc<TypeSpec>, BindError> {
        self.registry.get(name).ok_or_else(|| {
            BindError::bad_definition(name, "type is not registered with the binder")
        })
    }

    /// The oracle chain.
    pub fn introspector(&self) -> &IntrospectorChain {
        &self.introspector
    }

    /// The coercion tables.
    pub fn coercions(&self) -> &CoercionConfigs {
        &self.coercions
    }

    /// Per-type override, if configured.
    pub fn type_override(&self, type_name: &str) -> Option<&TypeOverride> {
        self.type_overrides.get(type_name)
    }

    /// Custom deserializer registered under `name`.
    pub fn custom_deserializer(&self, name: &str) -> Option<&Arc<dyn ValueDeser>> {
        self.custom_deserializers.get(name)
    }

    /// Whether a lone value is accepted where an array is expected.
    pub fn accept_single_value_as_array(&self) -> bool {
        self.accept_single_value_as_array
    }

    /// Whether unknown properties fail, honoring a per-type override.
    pub fn fail_on_unknown_properties_for(&self, type_name: &str) -> bool {
        match self
            .type_override(type_name)
            .and_then(|ov| ov.ignore_unknown)
        {
            Some(ignore) => !ignore,
            None => self.fail_on_unknown_properties,
        }
    }

    /// Whether element-level errors get container paths attached.
    pub fn wrap_element_errors(&self) -> bool {
        self.wrap_element_errors
    }

    /// Whether implicit constructor detection runs.
    pub fn implicit_creator_detection(&self) -> bool {
        self.implicit_creator_detection
    }

    /// Whether unknown enum constants map to null.
    pub fn unknown_enum_as_null(&self) -> bool {
        self.unknown_enum_as_null
    }

    /// Minimum visibility for un-annotated creator members.
    pub fn min_creator_visibility(&self) -> Visibility {
        self.min_creator_visibility
    }

    /// Global null-handling default.
    pub fn global_null_policy(&self) -> NullPolicy {
        self.global_null_policy
    }

    /// Null policy for one type: per-type override or the global default.
    pub fn null_policy_for(&self, type_name: &str) -> NullPolicy {
        self.type_override(type_name)
            .and_then(|ov| ov.null_policy)
            .unwrap_or(self.global_null_policy)
    }
}

impl fmt::Debug for BindConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindConfig")
            .field("registered_types", &self.registry.len())
            .field("custom_deserializers", &self.custom_deserializers.len())
            .field(
                "accept_single_value_as_array",
                &self.accept_single_value_as_array,
            )
            .field(
                "fail_on_unknown_properties",
                &self.fail_on_unknown_properties,
            )
            .field("wrap_element_errors", &self.wrap_element_errors)
            .field(
                "implicit_creator_detection",
                &self.implicit_creator_detection,
            )
            .finish_non_exhaustive()
    }
}
