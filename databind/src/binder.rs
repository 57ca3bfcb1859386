//! Top-level entry point.
//!
//! A [`Binder`] owns one immutable configuration and the resolution cache
//! built against it. It is cheap to share: every call gets its own
//! [`DeserContext`], while resolved deserializers and instantiators are
//! reused across calls and threads.

use std::sync::Arc;

use databind_core::{BindError, TokenSource, TypeDesc, Value};

use crate::config::{BindConfig, InjectableValues};
use crate::context::DeserContext;
use crate::deser::ValueDeser;
use crate::factory::{self, DeserializerCache};
use crate::instantiator::ValueInstantiator;

/// Read-side binding engine over one configuration.
#[derive(Debug)]
pub struct Binder {
    config: Arc<BindConfig>,
    cache: DeserializerCache,
    no_injectables: InjectableValues,
}

impl Binder {
    /// Binder over a configuration.
    pub fn new(config: BindConfig) -> Self {
        Self {
            config: Arc::new(config),
            cache: DeserializerCache::new(),
            no_injectables: InjectableValues::new(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    /// The resolution cache (observable for tests).
    pub fn cache(&self) -> &DeserializerCache {
        &self.cache
    }

    /// Deserialize one value of `target` from the token stream.
    pub fn read_value(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        target: &TypeDesc,
    ) -> Result<Value, BindError> {
        self.read_value_with(tokens, target, &self.no_injectables)
    }

    /// Deserialize one value, supplying per-call injectable values.
    pub fn read_value_with(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        target: &TypeDesc,
        injectables: &InjectableValues,
    ) -> Result<Value, BindError> {
        let mut ctxt = DeserContext::new(&self.config, &self.cache, injectables);
        let deser = ctxt.find_value_deserializer(target)?;
        deser.deserialize(tokens, &mut ctxt)
    }

    /// Resolve the value instantiator for a class target.
    ///
    /// Never returns a placeholder for a resolvable type; fails with a
    /// definition error otherwise.
    pub fn find_value_instantiator(
        &self,
        target: &TypeDesc,
    ) -> Result<Arc<ValueInstantiator>, BindError> {
        let mut ctxt = DeserContext::new(&self.config, &self.cache, &self.no_injectables);
        factory::find_value_instantiator(&mut ctxt, target)
    }

    /// Resolve the deserializer for a target type.
    pub fn find_value_deserializer(
        &self,
        target: &TypeDesc,
    ) -> Result<Arc<dyn ValueDeser>, BindError> {
        let mut ctxt = DeserContext::new(&self.config, &self.cache, &self.no_injectables);
        ctxt.find_value_deserializer(target)
    }
}
