//! Deserializer trait and the concrete container/scalar deserializers.
//!
//! A [`ValueDeser`] consumes tokens for exactly one value of its target
//! type. Fully-resolved deserializers are immutable and — when their
//! [`ValueDeser::is_cachable`] predicate holds — shared across calls and
//! threads through the factory cache. A deserializer stops being cachable
//! the moment any nested element/key/value deserializer came from a
//! per-property override, because that resolution is call-site-specific.

use std::fmt;

use databind_core::{BindError, IdentitySpec, TokenSource, Value};

use crate::context::DeserContext;

mod any;
mod array;
mod class;
mod collection;
mod enums;
mod map;
mod reference;
mod scalar;
mod string_collection;

pub use any::AnyDeser;
pub use array::ArrayDeser;
pub use class::ClassDeser;
pub use collection::CollectionDeser;
pub use enums::EnumDeser;
pub use map::{KeyDeser, MapDeser};
pub use reference::ReferenceDeser;
pub use scalar::ScalarDeser;
pub use string_collection::StringCollectionDeser;

/// Deserializer for one target type.
pub trait ValueDeser: fmt::Debug + Send + Sync {
    /// Consume the tokens of one value and build it.
    fn deserialize(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError>;

    /// The value a `null` token maps to.
    fn null_value(&self, _ctxt: &mut DeserContext<'_>) -> Result<Value, BindError> {
        Ok(Value::Null)
    }

    /// The value an as-empty coercion or null policy substitutes.
    fn empty_value(&self, _ctxt: &mut DeserContext<'_>) -> Result<Value, BindError> {
        Ok(Value::Null)
    }

    /// Whether this resolved instance may be cached and shared.
    fn is_cachable(&self) -> bool {
        true
    }

    /// Object-identity declaration of the target, when it participates in
    /// id/forward-reference handling.
    fn identity(&self) -> Option<&IdentitySpec> {
        None
    }
}
