//! Creator properties: the named argument slots of a properties-based
//! creator.
//!
//! Discovery produces immutable [`PropertyDraft`]s; the explicit
//! [`PropertyDraft::into_resolved`] step attaches the resolved value
//! deserializer and yields the runtime [`CreatorProperty`]. Nothing mutates
//! after that except the one-time fallback-setter attachment used by
//! update-in-place scenarios, which is deliberately narrow and never
//! re-entered.

use std::fmt;
use std::sync::{Arc, OnceLock};

use databind_core::{BindError, Callable, NullPolicy, ScalarKind, TypeDesc, TypeShape, Value};

use crate::context::DeserContext;
use crate::deser::ValueDeser;
use crate::introspect::NameTransformer;

/// Property metadata gathered during discovery.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyMetadata {
    /// Whether the property must be present in the input.
    pub required: bool,
    /// Human-readable description, for diagnostics.
    pub description: Option<String>,
    /// Explicit positional index override.
    pub index: Option<u32>,
    /// Default-value text applied when the property is absent.
    pub default_text: Option<String>,
    /// Merged null-handling policy.
    pub null_policy: NullPolicy,
}

/// Immutable declaration-phase view of one creator property.
#[derive(Debug, Clone)]
pub struct PropertyDraft {
    /// Logical name; `None` only for the any-setter slot.
    pub name: Option<String>,
    /// Accepted aliases.
    pub aliases: Vec<String>,
    /// Declared type.
    pub declared: TypeDesc,
    /// Unwrapping transformer, when the slot collects prefixed keys.
    pub unwrapper: Option<NameTransformer>,
    /// Injection id, when the value comes from outside the stream.
    pub injection: Option<String>,
    /// Whether this is the any-setter catch-all slot.
    pub any_setter: bool,
    /// Positional index within the creator invocation.
    pub creator_slot: usize,
    /// Name of a custom deserializer to use instead of the standard one.
    pub custom_deser: Option<String>,
    /// Name of a custom deserializer for container contents.
    pub custom_content: Option<String>,
    /// Gathered metadata.
    pub metadata: PropertyMetadata,
}

impl PropertyDraft {
    /// Attach the resolved value deserializer, producing the runtime
    /// property.
    ///
    /// A custom deserializer name marks the property (and anything caching
    /// it) as call-site-specific.
    pub fn into_resolved(
        self,
        ctxt: &mut DeserContext<'_>,
        owner: &str,
    ) -> Result<CreatorProperty, BindError> {
        let (deser, custom) = if let Some(name) = &self.custom_deser {
            let deser = ctxt.config().custom_deserializer(name).cloned().ok_or_else(|| {
                BindError::bad_definition(
                    owner,
                    format!("custom deserializer `{name}` is not registered"),
                )
            })?;
            (deser, true)
        } else if let Some(name) = &self.custom_content {
            let element = ctxt.config().custom_deserializer(name).cloned().ok_or_else(|| {
                BindError::bad_definition(
                    owner,
                    format!("custom deserializer `{name}` is not registered"),
                )
            })?;
            let deser =
                crate::factory::container_with_custom_element(ctxt, &self.declared, element)?;
            (deser, true)
        } else {
            (ctxt.find_value_deserializer(&self.declared)?, false)
        };
        Ok(CreatorProperty {
            name: self.name,
            aliases: self.aliases,
            declared: self.declared,
            unwrapper: self.unwrapper,
            injection: self.injection,
            any_setter: self.any_setter,
            creator_slot: self.creator_slot,
            metadata: self.metadata,
            deser,
            custom,
            fallback_setter: OnceLock::new(),
        })
    }
}

/// Resolved runtime creator property.
pub struct CreatorProperty {
    name: Option<String>,
    aliases: Vec<String>,
    declared: TypeDesc,
    unwrapper: Option<NameTransformer>,
    injection: Option<String>,
    any_setter: bool,
    creator_slot: usize,
    metadata: PropertyMetadata,
    deser: Arc<dyn ValueDeser>,
    custom: bool,
    fallback_setter: OnceLock<Callable>,
}

impl CreatorProperty {
    /// Logical name, absent only for the any-setter slot.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared type.
    pub fn declared(&self) -> &TypeDesc {
        &self.declared
    }

    /// Unwrapping transformer, if any.
    pub fn unwrapper(&self) -> Option<&NameTransformer> {
        self.unwrapper.as_ref()
    }

    /// Injection id, if any.
    pub fn injection(&self) -> Option<&str> {
        self.injection.as_deref()
    }

    /// Whether this is the any-setter catch-all slot.
    pub const fn is_any_setter(&self) -> bool {
        self.any_setter
    }

    /// Positional index within the creator invocation.
    pub const fn creator_slot(&self) -> usize {
        self.creator_slot
    }

    /// Gathered metadata.
    pub fn metadata(&self) -> &PropertyMetadata {
        &self.metadata
    }

    /// The resolved value deserializer.
    pub fn deser(&self) -> &Arc<dyn ValueDeser> {
        &self.deser
    }

    /// Whether the value deserializer is a per-property override.
    pub const fn is_custom(&self) -> bool {
        self.custom
    }

    /// Whether `key` addresses this property (name or alias).
    pub fn matches(&self, key: &str) -> bool {
        self.name.as_deref() == Some(key) || self.aliases.iter().any(|alias| alias == key)
    }

    /// Attach the fallback setter used by update-in-place merge scenarios.
    ///
    /// One-time: a second attachment is ignored, matching the documented
    /// mutation discipline.
    pub fn attach_fallback_setter(&self, setter: Callable) {
        let _ = self.fallback_setter.set(setter);
    }

    /// The fallback setter, if one was attached.
    pub fn fallback_setter(&self) -> Option<&Callable> {
        self.fallback_setter.get()
    }

    /// Parse the default-value text against the declared type.
    ///
    /// Only scalar declared types have a textual default form; a default on
    /// anything else is a definition mistake surfaced at invocation time.
    pub fn parse_default_text(&self, owner: &str) -> Result<Option<Value>, BindError> {
        let Some(text) = self.metadata.default_text.as_deref() else {
            return Ok(None);
        };
        let parsed = match self.declared.shape() {
            TypeShape::Scalar(ScalarKind::Str) => Some(Value::Str(text.to_owned())),
            TypeShape::Scalar(ScalarKind::Int) | TypeShape::Scalar(ScalarKind::Long) => {
                text.parse::<i64>().ok().map(Value::Int)
            }
            TypeShape::Scalar(ScalarKind::BigInt) => text.parse::<i128>().ok().map(Value::BigInt),
            TypeShape::Scalar(ScalarKind::Double) => text.parse::<f64>().ok().map(Value::Double),
            TypeShape::Scalar(ScalarKind::Decimal) => text.parse().ok().map(Value::Decimal),
            TypeShape::Scalar(ScalarKind::Bool) => text.parse::<bool>().ok().map(Value::Bool),
            _ => None,
        };
        match parsed {
            Some(value) => Ok(Some(value)),
            None => Err(BindError::bad_definition(
                owner,
                format!(
                    "default value {text:?} cannot be parsed as {} for property `{}`",
                    self.declared,
                    self.name.as_deref().unwrap_or("<any-setter>"),
                ),
            )),
        }
    }
}

impl fmt::Debug for CreatorProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatorProperty")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("injection", &self.injection)
            .field("any_setter", &self.any_setter)
            .field("creator_slot", &self.creator_slot)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CreatorProperty {
    fn eq(&self, other: &Self) -> bool {
        // Structural comparison: the resolved deserializer and fallback
        // setter are identity-bearing runtime attachments, not structure.
        self.name == other.name
            && self.aliases == other.aliases
            && self.declared == other.declared
            && self.unwrapper == other.unwrapper
            && self.injection == other.injection
            && self.any_setter == other.any_setter
            && self.creator_slot == other.creator_slot
            && self.metadata == other.metadata
    }
}
