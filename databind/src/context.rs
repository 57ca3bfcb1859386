//! Per-call deserialization context.
//!
//! One [`DeserContext`] exists per top-level deserialization call. It
//! threads the immutable configuration and the shared cache through the
//! descent, and owns the call-local mutable state: the object-id table and
//! the in-progress resolution set used to break type cycles. It is never
//! shared across threads.

use std::collections::HashSet;
use std::sync::Arc;

use databind_core::{
    BindError, CoercionAction, CoercionInput, LogicalShape, TypeDesc, Value,
};

use crate::config::{BindConfig, InjectableValues};
use crate::deser::ValueDeser;
use crate::factory::{self, DeserializerCache};
use crate::instantiator::ValueInstantiator;
use crate::refs::ObjectIdTable;

/// Per-call services for deserializers and the resolution pipeline.
pub struct DeserContext<'a> {
    config: &'a BindConfig,
    cache: &'a DeserializerCache,
    injectables: &'a InjectableValues,
    objects: ObjectIdTable,
    resolving: HashSet<TypeDesc>,
}

impl<'a> DeserContext<'a> {
    /// Context for one call.
    pub fn new(
        config: &'a BindConfig,
        cache: &'a DeserializerCache,
        injectables: &'a InjectableValues,
    ) -> Self {
        Self {
            config,
            cache,
            injectables,
            objects: ObjectIdTable::new(),
            resolving: HashSet::new(),
        }
    }

    /// The immutable configuration.
    pub fn config(&self) -> &'a BindConfig {
        self.config
    }

    /// The shared deserializer cache.
    pub(crate) fn cache(&self) -> &'a DeserializerCache {
        self.cache
    }

    /// Resolve (or fetch from cache) the deserializer for a type.
    pub fn find_value_deserializer(
        &mut self,
        desc: &TypeDesc,
    ) -> Result<Arc<dyn ValueDeser>, BindError> {
        factory::deserializer_for(self, desc)
    }

    /// Resolve (or fetch from cache) the value instantiator for a type.
    pub fn find_value_instantiator(
        &mut self,
        desc: &TypeDesc,
    ) -> Result<Arc<ValueInstantiator>, BindError> {
        factory::instantiator_for(self, desc)
    }

    /// Coercion action for a target/input pair.
    pub fn coercion_action(
        &self,
        shape: LogicalShape,
        input: CoercionInput,
        fallback: CoercionAction,
    ) -> CoercionAction {
        self.config.coercions().action_for(shape, input, fallback)
    }

    /// Value registered for an injection id.
    ///
    /// A missing injectable is a caller/configuration bug, not a data
    /// error, and is reported as an invalid definition.
    pub fn injectable(&self, id: &str, type_name: &str) -> Result<Value, BindError> {
        self.injectables.find(id).cloned().ok_or_else(|| {
            BindError::InvalidDefinition {
                type_name: type_name.to_owned(),
                detail: format!("no injectable value registered for id `{id}`"),
            }
        })
    }

    /// The per-call object-id table.
    pub fn objects(&self) -> &ObjectIdTable {
        &self.objects
    }

    /// Mutable access to the per-call object-id table.
    pub fn objects_mut(&mut self) -> &mut ObjectIdTable {
        &mut self.objects
    }

    /// Mark a type as being resolved; `false` means a cycle was hit.
    pub(crate) fn begin_resolving(&mut self, desc: &TypeDesc) -> bool {
        self.resolving.insert(desc.clone())
    }

    /// Unmark a type after resolution finished.
    pub(crate) fn end_resolving(&mut self, desc: &TypeDesc) {
        self.resolving.remove(desc);
    }
}
