//! Introspection oracle: the capability interface creator discovery asks.
//!
//! Every method returns `None` ("no opinion") by default. Oracles compose
//! through [`IntrospectorChain`]: introspectors are queried in order and the
//! first non-absent answer wins. The chain is carried explicitly on the
//! configuration; there is no global registry.
//!
//! [`AttrIntrospector`] is the standard oracle, reading the attribute
//! metadata attached to registered specs. Custom introspectors layer in
//! front of (or behind) it for overrides.

use std::sync::Arc;

use databind_core::{MemberRef, NullPolicy, ParamSpec, TypeSpec};

use crate::instantiator::ValueInstantiator;

/// How a creator annotation classifies a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorMode {
    /// Arguments bound by property name from an object.
    PropertiesBased,
    /// One non-injected argument deserialized generically.
    Delegating,
    /// Never use this member as a creator.
    Disabled,
}

/// Prefix-stripping name transformer for unwrapped creator properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTransformer {
    prefix: String,
}

impl NameTransformer {
    /// Transformer stripping `prefix` from matching keys.
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The stripped name, when `key` matches this transformer.
    pub fn unwrap_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.prefix.as_str())
    }
}

/// Capability-style query interface over type and member metadata.
///
/// `None` always means "no opinion", letting the next oracle in the chain
/// answer.
pub trait Introspector: Send + Sync {
    /// Creator classification for a member, if annotated.
    fn find_creator_annotation(
        &self,
        _spec: &TypeSpec,
        _member: MemberRef<'_>,
    ) -> Option<CreatorMode> {
        None
    }

    /// A creator preferred without an explicit annotation (canonical
    /// constructor, unambiguous multi-arg under permissive detection).
    fn find_preferred_creator<'a>(&self, _spec: &'a TypeSpec) -> Option<MemberRef<'a>> {
        None
    }

    /// Injection id for a parameter supplied outside the token stream.
    fn find_injectable_value(&self, _param: &ParamSpec) -> Option<String> {
        None
    }

    /// Explicit property name override for a parameter.
    fn find_parameter_name(&self, _param: &ParamSpec) -> Option<String> {
        None
    }

    /// Unwrapping transformer for a parameter.
    fn find_unwrapping_transformer(&self, _param: &ParamSpec) -> Option<NameTransformer> {
        None
    }

    /// Whether a parameter is the any-setter catch-all.
    fn has_any_setter(&self, _param: &ParamSpec) -> Option<bool> {
        None
    }

    /// Whether a parameter carries a required marker.
    fn has_required_marker(&self, _param: &ParamSpec) -> Option<bool> {
        None
    }

    /// Explicit positional index override.
    fn find_property_index(&self, _param: &ParamSpec) -> Option<u32> {
        None
    }

    /// Default-value text to apply when the property is absent.
    fn find_property_default_value(&self, _param: &ParamSpec) -> Option<String> {
        None
    }

    /// Human-readable property description.
    fn find_property_description(&self, _param: &ParamSpec) -> Option<String> {
        None
    }

    /// Accepted alias names for a parameter.
    fn find_property_aliases(&self, _param: &ParamSpec) -> Option<Vec<String>> {
        None
    }

    /// Null-handling policy declared on the parameter.
    fn find_setter_info(&self, _param: &ParamSpec) -> Option<NullPolicy> {
        None
    }

    /// Name of a registered custom deserializer to use for the parameter.
    fn find_custom_deserializer(&self, _param: &ParamSpec) -> Option<String> {
        None
    }

    /// Name of a registered custom deserializer for the parameter's
    /// container contents.
    fn find_custom_content_deserializer(&self, _param: &ParamSpec) -> Option<String> {
        None
    }

    /// Explicit value-instantiator override for a whole type.
    fn find_value_instantiator(&self, _spec: &TypeSpec) -> Option<Arc<ValueInstantiator>> {
        None
    }
}

/// Ordered oracle composition: first non-absent answer wins.
#[derive(Clone, Default)]
pub struct IntrospectorChain {
    oracles: Vec<Arc<dyn Introspector>>,
}

impl IntrospectorChain {
    /// Chain with only the standard attribute oracle.
    pub fn standard() -> Self {
        Self {
            oracles: vec![Arc::new(AttrIntrospector)],
        }
    }

    /// Empty chain (every query answers "no opinion").
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert an oracle in front of the existing ones.
    pub fn prepend(mut self, oracle: Arc<dyn Introspector>) -> Self {
        self.oracles.insert(0, oracle);
        self
    }

    /// Append an oracle behind the existing ones.
    pub fn append(mut self, oracle: Arc<dyn Introspector>) -> Self {
        self.oracles.push(oracle);
        self
    }

    fn first<T>(&self, mut query: impl FnMut(&dyn Introspector) -> Option<T>) -> Option<T> {
        self.oracles.iter().find_map(|oracle| query(oracle.as_ref()))
    }
}

impl Introspector for IntrospectorChain {
    fn find_creator_annotation(
        &self,
        spec: &TypeSpec,
        member: MemberRef<'_>,
    ) -> Option<CreatorMode> {
        self.first(|o| o.find_creator_annotation(spec, member))
    }

    fn find_preferred_creator<'a>(&self, spec: &'a TypeSpec) -> Option<MemberRef<'a>> {
        self.first(|o| o.find_preferred_creator(spec))
    }

    fn find_injectable_value(&self, param: &ParamSpec) -> Option<String> {
        self.first(|o| o.find_injectable_value(param))
    }

    fn find_parameter_name(&self, param: &ParamSpec) -> Option<String> {
        self.first(|o| o.find_parameter_name(param))
    }

    fn find_unwrapping_transformer(&self, param: &ParamSpec) -> Option<NameTransformer> {
        self.first(|o| o.find_unwrapping_transformer(param))
    }

    fn has_any_setter(&self, param: &ParamSpec) -> Option<bool> {
        self.first(|o| o.has_any_setter(param))
    }

    fn has_required_marker(&self, param: &ParamSpec) -> Option<bool> {
        self.first(|o| o.has_required_marker(param))
    }

    fn find_property_index(&self, param: &ParamSpec) -> Option<u32> {
        self.first(|o| o.find_property_index(param))
    }

    fn find_property_default_value(&self, param: &ParamSpec) -> Option<String> {
        self.first(|o| o.find_property_default_value(param))
    }

    fn find_property_description(&self, param: &ParamSpec) -> Option<String> {
        self.first(|o| o.find_property_description(param))
    }

    fn find_property_aliases(&self, param: &ParamSpec) -> Option<Vec<String>> {
        self.first(|o| o.find_property_aliases(param))
    }

    fn find_setter_info(&self, param: &ParamSpec) -> Option<NullPolicy> {
        self.first(|o| o.find_setter_info(param))
    }

    fn find_custom_deserializer(&self, param: &ParamSpec) -> Option<String> {
        self.first(|o| o.find_custom_deserializer(param))
    }

    fn find_custom_content_deserializer(&self, param: &ParamSpec) -> Option<String> {
        self.first(|o| o.find_custom_content_deserializer(param))
    }

    fn find_value_instantiator(&self, spec: &TypeSpec) -> Option<Arc<ValueInstantiator>> {
        self.first(|o| o.find_value_instantiator(spec))
    }
}

impl std::fmt::Debug for IntrospectorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IntrospectorChain({} oracles)", self.oracles.len())
    }
}

/// Standard oracle reading attribute metadata off registered specs.
///
/// Recognized member attributes: `creator = "properties" | "delegating" |
/// "disabled"`, `primary` (preferred creator marker). Recognized parameter
/// attributes: `name`, `inject`, `required`, `index`, `default`,
/// `description`, `alias` (repeatable), `nulls`, `any_setter`, `unwrap`,
/// `with`, `content_with`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttrIntrospector;

impl Introspector for AttrIntrospector {
    fn find_creator_annotation(
        &self,
        _spec: &TypeSpec,
        member: MemberRef<'_>,
    ) -> Option<CreatorMode> {
        match member.attrs().str_value("creator") {
            Some("properties") => Some(CreatorMode::PropertiesBased),
            Some("delegating") => Some(CreatorMode::Delegating),
            Some("disabled") => Some(CreatorMode::Disabled),
            _ => None,
        }
    }

    fn find_preferred_creator<'a>(&self, spec: &'a TypeSpec) -> Option<MemberRef<'a>> {
        spec.creator_members()
            .find(|member| member.attrs().flag("primary"))
    }

    fn find_injectable_value(&self, param: &ParamSpec) -> Option<String> {
        param.attrs.str_value("inject").map(str::to_owned)
    }

    fn find_parameter_name(&self, param: &ParamSpec) -> Option<String> {
        param.attrs.str_value("name").map(str::to_owned)
    }

    fn find_unwrapping_transformer(&self, param: &ParamSpec) -> Option<NameTransformer> {
        param
            .attrs
            .str_value("unwrap")
            .map(NameTransformer::prefixed)
    }

    fn has_any_setter(&self, param: &ParamSpec) -> Option<bool> {
        param.attrs.flag("any_setter").then_some(true)
    }

    fn has_required_marker(&self, param: &ParamSpec) -> Option<bool> {
        param.attrs.flag("required").then_some(true)
    }

    fn find_property_index(&self, param: &ParamSpec) -> Option<u32> {
        param
            .attrs
            .int_value("index")
            .and_then(|n| u32::try_from(n).ok())
    }

    fn find_property_default_value(&self, param: &ParamSpec) -> Option<String> {
        param.attrs.str_value("default").map(str::to_owned)
    }

    fn find_property_description(&self, param: &ParamSpec) -> Option<String> {
        param.attrs.str_value("description").map(str::to_owned)
    }

    fn find_property_aliases(&self, param: &ParamSpec) -> Option<Vec<String>> {
        let aliases = param.attrs.str_values("alias");
        if aliases.is_empty() {
            None
        } else {
            Some(aliases.into_iter().map(str::to_owned).collect())
        }
    }

    fn find_setter_info(&self, param: &ParamSpec) -> Option<NullPolicy> {
        param.attrs.str_value("nulls").and_then(NullPolicy::parse)
    }

    fn find_custom_deserializer(&self, param: &ParamSpec) -> Option<String> {
        param.attrs.str_value("with").map(str::to_owned)
    }

    fn find_custom_content_deserializer(&self, param: &ParamSpec) -> Option<String> {
        param.attrs.str_value("content_with").map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use databind_core::{Attrs, TypeDesc};

    #[test]
    fn chain_first_answer_wins() {
        struct Always(NullPolicy);
        impl Introspector for Always {
            fn find_setter_info(&self, _param: &ParamSpec) -> Option<NullPolicy> {
                Some(self.0)
            }
        }

        let chain = IntrospectorChain::empty()
            .append(Arc::new(Always(NullPolicy::Fail)))
            .append(Arc::new(Always(NullPolicy::Skip)));
        let param = ParamSpec::unnamed(TypeDesc::string());
        assert_eq!(chain.find_setter_info(&param), Some(NullPolicy::Fail));
    }

    #[test]
    fn attr_oracle_reads_parameter_metadata() {
        let param = ParamSpec::unnamed(TypeDesc::int()).with_attrs(
            Attrs::new()
                .with_str("name", "x")
                .with_flag("required")
                .with_str("alias", "ex")
                .with_str("alias", "x_coord"),
        );
        let oracle = AttrIntrospector;
        assert_eq!(oracle.find_parameter_name(&param), Some("x".to_owned()));
        assert_eq!(oracle.has_required_marker(&param), Some(true));
        assert_eq!(
            oracle.find_property_aliases(&param),
            Some(vec!["ex".to_owned(), "x_coord".to_owned()])
        );
    }

    #[test]
    fn transformer_strips_prefix() {
        let tr = NameTransformer::prefixed("geo_");
        assert_eq!(tr.unwrap_key("geo_lat"), Some("lat"));
        assert_eq!(tr.unwrap_key("lat"), None);
    }
}
