//! Deserializer factory and the shared resolution cache.
//!
//! The factory maps a concrete [`TypeDesc`] to the deserializer that
//! handles it, resolving abstract container kinds through the fallback
//! table first and re-attempting discovery against the concrete kind. The
//! cache keeps both positive and negative results: a type found broken
//! stays broken for the life of the configuration, and a data error never
//! poisons a cached entry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use databind_core::{
    BindError, NullPolicy, ScalarKind, TokenSource, TypeDesc, TypeShape, Value,
};

use crate::config::BindConfig;
use crate::context::DeserContext;
use crate::creator::resolve_value_instantiator;
use crate::deser::{
    AnyDeser, ArrayDeser, ClassDeser, CollectionDeser, EnumDeser, KeyDeser, MapDeser,
    ReferenceDeser, ScalarDeser, StringCollectionDeser, ValueDeser,
};
use crate::instantiator::ValueInstantiator;

type DeserEntry = Result<Arc<dyn ValueDeser>, Arc<BindError>>;
type InstEntry = Result<Arc<ValueInstantiator>, Arc<BindError>>;

/// Concurrent cache of resolved deserializers and instantiators, keyed by
/// concrete type descriptor.
#[derive(Default)]
pub struct DeserializerCache {
    deserializers: RwLock<HashMap<TypeDesc, DeserEntry>>,
    instantiators: RwLock<HashMap<TypeDesc, InstEntry>>,
}

impl DeserializerCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup_deser(&self, desc: &TypeDesc) -> Option<DeserEntry> {
        self.deserializers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(desc)
            .cloned()
    }

    fn store_deser(&self, desc: TypeDesc, entry: DeserEntry) {
        self.deserializers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(desc, entry);
    }

    fn lookup_instantiator(&self, desc: &TypeDesc) -> Option<InstEntry> {
        self.instantiators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(desc)
            .cloned()
    }

    fn store_instantiator(&self, desc: TypeDesc, entry: InstEntry) {
        self.instantiators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(desc, entry);
    }

    /// Number of cached deserializer entries (observable for tests).
    pub fn cached_deserializers(&self) -> usize {
        self.deserializers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for DeserializerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DeserializerCache({} deserializers)",
            self.cached_deserializers()
        )
    }
}

/// Indirection inserted when a type participates in a resolution cycle; the
/// real deserializer is fetched from the cache at first use.
struct LazyDeser {
    desc: TypeDesc,
}

impl ValueDeser for LazyDeser {
    fn deserialize(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let deser = ctxt.find_value_deserializer(&self.desc)?;
        deser.deserialize(tokens, ctxt)
    }
}

impl std::fmt::Debug for LazyDeser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LazyDeser({})", self.desc)
    }
}

/// Null policy for container contents: per-type override when the element
/// is a registered type, the global default otherwise.
fn content_null_policy(config: &BindConfig, element: &TypeDesc) -> NullPolicy {
    match element.shape() {
        TypeShape::Class(name) | TypeShape::Enum(name) => config.null_policy_for(name),
        _ => config.global_null_policy(),
    }
}

/// Resolve (or fetch) the deserializer for a type descriptor.
pub(crate) fn deserializer_for(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
) -> Result<Arc<dyn ValueDeser>, BindError> {
    // Abstract container kinds resolve through the fallback table before
    // anything else; the concrete descriptor is the cache key.
    let desc = desc.with_concrete_containers();

    if let Some(entry) = ctxt.cache().lookup_deser(&desc) {
        return entry.map_err(|err| (*err).clone());
    }

    if !ctxt.begin_resolving(&desc) {
        log::trace!("cyclic resolution of {desc}: inserting lazy indirection");
        return Ok(Arc::new(LazyDeser { desc }));
    }
    let built = build_deserializer(ctxt, &desc);
    ctxt.end_resolving(&desc);

    match built {
        Ok(deser) => {
            if deser.is_cachable() {
                ctxt.cache().store_deser(desc, Ok(deser.clone()));
            }
            Ok(deser)
        }
        Err(err) => {
            if err.is_definition_error() {
                ctxt.cache().store_deser(desc, Err(Arc::new(err.clone())));
            }
            Err(err)
        }
    }
}

fn build_deserializer(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
) -> Result<Arc<dyn ValueDeser>, BindError> {
    log::debug!("building deserializer for {desc}");
    match desc.shape() {
        TypeShape::Any => Ok(Arc::new(AnyDeser)),
        TypeShape::Scalar(kind) => Ok(Arc::new(ScalarDeser::new(*kind))),
        TypeShape::Enum(name) => {
            let spec = ctxt.config().require_spec(name)?.clone();
            if spec.constants().is_empty() {
                return Err(BindError::bad_definition(
                    name.as_ref(),
                    "registered as enum target but declares no constants",
                ));
            }
            Ok(Arc::new(EnumDeser::new(spec)))
        }
        TypeShape::Class(name) => {
            let spec = ctxt.config().require_spec(name)?.clone();
            let instantiator = instantiator_for(ctxt, desc)?;
            Ok(Arc::new(ClassDeser::new(spec, instantiator)))
        }
        TypeShape::Collection { kind, element } => {
            let null_policy = content_null_policy(ctxt.config(), element);
            if matches!(element.shape(), TypeShape::Scalar(ScalarKind::Str)) {
                return Ok(Arc::new(StringCollectionDeser::new(
                    desc.clone(),
                    *kind,
                    null_policy,
                )));
            }
            let element_deser = deserializer_for(ctxt, element)?;
            Ok(Arc::new(CollectionDeser::new(
                desc.clone(),
                *kind,
                element_deser,
                null_policy,
                false,
            )))
        }
        TypeShape::Map { kind, key, value } => {
            let key_deser = KeyDeser::for_type(ctxt, &desc.to_string(), key)?;
            let value_deser = deserializer_for(ctxt, value)?;
            let null_policy = content_null_policy(ctxt.config(), value);
            Ok(Arc::new(MapDeser::new(
                desc.clone(),
                *kind,
                key_deser,
                value_deser,
                null_policy,
                false,
            )))
        }
        TypeShape::Array { element } => {
            let primitive = match element.shape() {
                TypeShape::Scalar(kind) => Some(*kind),
                _ => None,
            };
            let element_deser = deserializer_for(ctxt, element)?;
            let null_policy = content_null_policy(ctxt.config(), element);
            Ok(Arc::new(ArrayDeser::new(
                desc.clone(),
                element_deser,
                primitive,
                null_policy,
                false,
            )))
        }
        TypeShape::Reference { kind, referent } => {
            let referent_deser = deserializer_for(ctxt, referent)?;
            match kind {
                databind_core::RefKind::Custom(name) => {
                    let wrapper_desc = TypeDesc::class(name.clone());
                    let instantiator = instantiator_for(ctxt, &wrapper_desc)?;
                    if !instantiator.can_create_using_delegate() {
                        return Err(BindError::bad_definition(
                            name.as_ref(),
                            "reference wrapper type requires a delegating creator",
                        ));
                    }
                    Ok(Arc::new(ReferenceDeser::with_instantiator(
                        desc.clone(),
                        kind.clone(),
                        referent_deser,
                        instantiator,
                    )))
                }
                _ => Ok(Arc::new(ReferenceDeser::new(
                    desc.clone(),
                    kind.clone(),
                    referent_deser,
                ))),
            }
        }
    }
}

/// Resolve (or fetch) the value instantiator for a class descriptor.
///
/// Never returns a placeholder: a resolvable type gets exactly one
/// instantiator, anything else is a definition error — cached either way.
pub(crate) fn instantiator_for(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
) -> Result<Arc<ValueInstantiator>, BindError> {
    let TypeShape::Class(name) = desc.shape() else {
        return Err(BindError::bad_definition(
            desc.to_string(),
            "only registered class types resolve to a value instantiator",
        ));
    };

    if let Some(entry) = ctxt.cache().lookup_instantiator(desc) {
        return entry.map_err(|err| (*err).clone());
    }

    let spec = ctxt.config().require_spec(name)?.clone();
    let resolved = resolve_value_instantiator(ctxt, &spec);
    match resolved {
        Ok(instantiator) => {
            ctxt.cache()
                .store_instantiator(desc.clone(), Ok(instantiator.clone()));
            Ok(instantiator)
        }
        Err(err) => {
            ctxt.cache()
                .store_instantiator(desc.clone(), Err(Arc::new(err.clone())));
            Err(err)
        }
    }
}

/// Build a container deserializer whose element/value deserializer is a
/// per-property override. The result is call-site-specific and never
/// cached.
pub(crate) fn container_with_custom_element(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
    element: Arc<dyn ValueDeser>,
) -> Result<Arc<dyn ValueDeser>, BindError> {
    let desc = desc.with_concrete_containers();
    match desc.shape() {
        TypeShape::Collection {
            kind,
            element: element_type,
        } => {
            let null_policy = content_null_policy(ctxt.config(), element_type);
            if matches!(element_type.shape(), TypeShape::Scalar(ScalarKind::Str)) {
                Ok(Arc::new(StringCollectionDeser::with_custom_element(
                    desc.clone(),
                    *kind,
                    null_policy,
                    element,
                )))
            } else {
                Ok(Arc::new(CollectionDeser::new(
                    desc.clone(),
                    *kind,
                    element,
                    null_policy,
                    true,
                )))
            }
        }
        TypeShape::Map { kind, key, value } => {
            let key_deser = KeyDeser::for_type(ctxt, &desc.to_string(), key)?;
            let null_policy = content_null_policy(ctxt.config(), value);
            Ok(Arc::new(MapDeser::new(
                desc.clone(),
                *kind,
                key_deser,
                element,
                null_policy,
                true,
            )))
        }
        TypeShape::Array {
            element: element_type,
        } => {
            let null_policy = content_null_policy(ctxt.config(), element_type);
            Ok(Arc::new(ArrayDeser::new(
                desc.clone(),
                element,
                None,
                null_policy,
                true,
            )))
        }
        _ => Err(BindError::bad_definition(
            desc.to_string(),
            "content deserializer override on a non-container type",
        )),
    }
}

/// Primary instantiator entry point.
pub fn find_value_instantiator(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
) -> Result<Arc<ValueInstantiator>, BindError> {
    instantiator_for(ctxt, desc)
}

fn expect_shape(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
    wanted: &'static str,
    matches: bool,
) -> Result<Arc<dyn ValueDeser>, BindError> {
    if !matches {
        return Err(BindError::bad_definition(
            desc.to_string(),
            format!("not a {wanted} type"),
        ));
    }
    deserializer_for(ctxt, desc)
}

/// Build (or fetch) a collection deserializer.
pub fn create_collection_deserializer(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
) -> Result<Arc<dyn ValueDeser>, BindError> {
    let ok = matches!(desc.shape(), TypeShape::Collection { .. });
    expect_shape(ctxt, desc, "collection", ok)
}

/// Build (or fetch) a map deserializer.
pub fn create_map_deserializer(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
) -> Result<Arc<dyn ValueDeser>, BindError> {
    let ok = matches!(desc.shape(), TypeShape::Map { .. });
    expect_shape(ctxt, desc, "map", ok)
}

/// Build (or fetch) an array deserializer.
pub fn create_array_deserializer(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
) -> Result<Arc<dyn ValueDeser>, BindError> {
    let ok = matches!(desc.shape(), TypeShape::Array { .. });
    expect_shape(ctxt, desc, "array", ok)
}

/// Build (or fetch) an enum deserializer.
pub fn create_enum_deserializer(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
) -> Result<Arc<dyn ValueDeser>, BindError> {
    let ok = matches!(desc.shape(), TypeShape::Enum(_));
    expect_shape(ctxt, desc, "enum", ok)
}

/// Build (or fetch) a reference deserializer.
pub fn create_reference_deserializer(
    ctxt: &mut DeserContext<'_>,
    desc: &TypeDesc,
) -> Result<Arc<dyn ValueDeser>, BindError> {
    let ok = matches!(desc.shape(), TypeShape::Reference { .. });
    expect_shape(ctxt, desc, "reference", ok)
}
