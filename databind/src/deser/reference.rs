//! Reference-wrapper deserialization: single-content wrappers around a
//! referent value.

use std::sync::Arc;

use databind_core::{
    BindError, RefKind, ScalarToken, TokenKind, TokenSource, TypeDesc, Value,
};

use crate::context::DeserContext;
use crate::deser::ValueDeser;
use crate::instantiator::ValueInstantiator;

/// Deserializer for `Option`-like and custom reference wrappers.
pub struct ReferenceDeser {
    desc: TypeDesc,
    kind: RefKind,
    referent: Arc<dyn ValueDeser>,
    /// Dedicated instantiator, present only for custom wrapper types.
    instantiator: Option<Arc<ValueInstantiator>>,
}

impl ReferenceDeser {
    /// Zero-overhead wrapper (the built-in reference kinds).
    pub fn new(desc: TypeDesc, kind: RefKind, referent: Arc<dyn ValueDeser>) -> Self {
        Self {
            desc,
            kind,
            referent,
            instantiator: None,
        }
    }

    /// Custom wrapper constructed through its own delegating instantiator.
    pub fn with_instantiator(
        desc: TypeDesc,
        kind: RefKind,
        referent: Arc<dyn ValueDeser>,
        instantiator: Arc<ValueInstantiator>,
    ) -> Self {
        Self {
            desc,
            kind,
            referent,
            instantiator: Some(instantiator),
        }
    }
}

impl ValueDeser for ReferenceDeser {
    fn deserialize(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let peeked = tokens.peek()?;
        if matches!(
            peeked.map(|t| t.kind),
            Some(TokenKind::Scalar(ScalarToken::Null))
        ) {
            tokens.next()?;
            return Ok(Value::Null);
        }
        let content = self.referent.deserialize(tokens, ctxt)?;
        match &self.instantiator {
            Some(instantiator) => instantiator.create_using_delegate(ctxt, content),
            None => Ok(content),
        }
    }

    fn is_cachable(&self) -> bool {
        self.referent.is_cachable()
    }
}

impl std::fmt::Debug for ReferenceDeser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceDeser")
            .field("desc", &self.desc.to_string())
            .field("kind", &self.kind)
            .field("dedicated_instantiator", &self.instantiator.is_some())
            .finish_non_exhaustive()
    }
}
