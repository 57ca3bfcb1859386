//! Class deserialization driven by the resolved value instantiator.
//!
//! One deserializer per registered class; the instantiation strategy
//! decides which token shapes are acceptable. Properties-based targets read
//! an object and bind creator properties by name or alias; delegating
//! targets hand the whole value to the delegate; scalar targets consume one
//! scalar; default targets accept an (ideally empty) object.

use std::sync::Arc;

use databind_core::{
    BindError, IdKey, IdentitySpec, NullPolicy, PathSegment, ScalarToken, Span, TokenKind,
    TokenSource, TypeSpec, Value, ValueMap,
};

use crate::context::DeserContext;
use crate::deser::{AnyDeser, ScalarDeser, ValueDeser};
use crate::instantiator::{CreatorKind, ValueInstantiator};

/// Closest known property names for an unknown key, best first.
fn suggest(known: impl Iterator<Item = impl AsRef<str>>, unknown: &str) -> Vec<String> {
    let mut scored: Vec<(f64, String)> = known
        .filter_map(|name| {
            let name = name.as_ref();
            let score = strsim::jaro_winkler(name, unknown);
            (score >= 0.75).then(|| (score, name.to_owned()))
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, name)| name).take(3).collect()
}

/// Deserializer for registered class targets.
pub struct ClassDeser {
    spec: Arc<TypeSpec>,
    instantiator: Arc<ValueInstantiator>,
}

impl ClassDeser {
    /// Class deserializer over a resolved instantiator.
    pub fn new(spec: Arc<TypeSpec>, instantiator: Arc<ValueInstantiator>) -> Self {
        Self { spec, instantiator }
    }

    /// The resolved instantiator (exposed for strategy assertions).
    pub fn instantiator(&self) -> &Arc<ValueInstantiator> {
        &self.instantiator
    }

    fn type_name(&self) -> &str {
        self.spec.name()
    }

    fn wrap_property(&self, err: BindError, ctxt: &DeserContext<'_>, property: &str) -> BindError {
        if err.is_definition_error() || !ctxt.config().wrap_element_errors() {
            return err;
        }
        err.prepend_path(PathSegment::Property {
            type_name: self.type_name().to_owned(),
            property: property.to_owned(),
        })
    }

    /// Bind the instance id into the per-call table, resolving forward
    /// references waiting on it.
    fn bind_identity(
        &self,
        ctxt: &mut DeserContext<'_>,
        instance: &Value,
    ) -> Result<(), BindError> {
        let Some(IdentitySpec { property }) = self.spec.identity() else {
            return Ok(());
        };
        let id = instance
            .as_object()
            .and_then(|map| map.get(property))
            .and_then(IdKey::from_value);
        if let Some(id) = id {
            ctxt.objects_mut().bind(id, instance.clone())?;
        }
        Ok(())
    }

    /// Scalar token consumed as an id reference to an already- or
    /// not-yet-defined instance.
    fn read_id_reference(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let Some(token) = tokens.next()? else {
            return Err(BindError::mismatched("object id", "end of input"));
        };
        let id = match &token.kind {
            TokenKind::Scalar(ScalarToken::I64(n)) => IdKey::Int(*n),
            TokenKind::Scalar(ScalarToken::U64(u)) => match i64::try_from(*u) {
                Ok(n) => IdKey::Int(n),
                Err(_) => {
                    return Err(BindError::invalid_value(format!(
                        "object id {u} out of range"
                    ))
                    .with_span(token.span));
                }
            },
            TokenKind::Scalar(ScalarToken::Str(s)) => IdKey::Str(s.to_string()),
            other => {
                return Err(BindError::mismatched(
                    "object or object id",
                    other.kind_name().to_owned(),
                )
                .with_span(token.span));
            }
        };
        match ctxt.objects().resolve(&id) {
            Some(value) => Ok(value.clone()),
            None => Err(BindError::UnresolvedForwardReference { id }),
        }
    }

    /// Properties-based object read.
    fn read_properties(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let properties = self.instantiator.properties();
        let mut args: Vec<Option<Value>> = (0..properties.len()).map(|_| None).collect();
        let any_slot = properties
            .iter()
            .find(|p| p.is_any_setter())
            .map(|p| p.creator_slot());
        let mut any_values = ValueMap::new();
        let fail_unknown = ctxt
            .config()
            .fail_on_unknown_properties_for(self.type_name());

        loop {
            let Some(token) = tokens.next()? else {
                return Err(BindError::mismatched("object end", "end of input"));
            };
            match token.kind {
                TokenKind::ObjectEnd => break,
                TokenKind::Key(key) => {
                    self.read_property_value(
                        tokens,
                        ctxt,
                        &key,
                        token.span,
                        &mut args,
                        any_slot,
                        &mut any_values,
                        fail_unknown,
                    )?;
                }
                other => {
                    return Err(BindError::mismatched(
                        "object key or object end",
                        other.kind_name().to_owned(),
                    )
                    .with_span(token.span));
                }
            }
        }

        if let Some(slot) = any_slot {
            if !any_values.is_empty() {
                args[slot] = Some(Value::Object(any_values));
            }
        }
        self.instantiator.create_from_object_with(ctxt, args)
    }

    #[allow(clippy::too_many_arguments)]
    fn read_property_value(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
        key: &str,
        key_span: Span,
        args: &mut [Option<Value>],
        any_slot: Option<usize>,
        any_values: &mut ValueMap,
        fail_unknown: bool,
    ) -> Result<(), BindError> {
        let properties = self.instantiator.properties();

        // Direct name or alias match.
        if let Some(property) = properties.iter().find(|p| p.matches(key)) {
            let peeked = tokens.peek()?;
            if matches!(
                peeked.map(|t| t.kind),
                Some(TokenKind::Scalar(ScalarToken::Null))
            ) {
                tokens.next()?;
                match property.metadata().null_policy {
                    NullPolicy::Skip => {}
                    NullPolicy::Set => args[property.creator_slot()] = Some(Value::Null),
                    NullPolicy::AsEmpty => {
                        args[property.creator_slot()] = Some(property.deser().empty_value(ctxt)?);
                    }
                    NullPolicy::Fail => {
                        return Err(self.wrap_property(
                            BindError::invalid_value("null value for non-nullable property"),
                            ctxt,
                            key,
                        ));
                    }
                }
                return Ok(());
            }
            let value = property
                .deser()
                .deserialize(tokens, ctxt)
                .map_err(|err| self.wrap_property(err, ctxt, key))?;
            args[property.creator_slot()] = Some(value);
            return Ok(());
        }

        // Prefixed key collected by an unwrapping property.
        let unwrapped = properties.iter().find_map(|p| {
            p.unwrapper()
                .and_then(|tr| tr.unwrap_key(key))
                .map(|stripped| (p.creator_slot(), stripped.to_owned()))
        });
        if let Some((slot, stripped)) = unwrapped {
            let value = AnyDeser
                .deserialize(tokens, ctxt)
                .map_err(|err| self.wrap_property(err, ctxt, key))?;
            let entry = args[slot].get_or_insert_with(|| Value::Object(ValueMap::new()));
            if let Value::Object(map) = entry {
                map.insert(stripped, value);
            }
            return Ok(());
        }

        // Any-setter catch-all.
        if any_slot.is_some() {
            let value = AnyDeser
                .deserialize(tokens, ctxt)
                .map_err(|err| self.wrap_property(err, ctxt, key))?;
            any_values.insert(key.to_owned(), value);
            return Ok(());
        }

        // Unknown property.
        if fail_unknown {
            let known = properties.iter().filter_map(|p| p.name());
            return Err(BindError::UnrecognizedProperty {
                property: key.to_owned(),
                type_name: self.type_name().to_owned(),
                suggestions: suggest(known, key),
                span: Some(key_span),
                path: databind_core::PathRef::root(),
            });
        }
        log::trace!("{}: skipping unknown property `{key}`", self.type_name());
        tokens.skip_value()?;
        Ok(())
    }

    /// Default-strategy object read: no bindable properties.
    fn read_default(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let fail_unknown = ctxt
            .config()
            .fail_on_unknown_properties_for(self.type_name());
        loop {
            let Some(token) = tokens.next()? else {
                return Err(BindError::mismatched("object end", "end of input"));
            };
            match token.kind {
                TokenKind::ObjectEnd => break,
                TokenKind::Key(key) => {
                    if fail_unknown {
                        return Err(BindError::UnrecognizedProperty {
                            property: key.into_owned(),
                            type_name: self.type_name().to_owned(),
                            suggestions: Vec::new(),
                            span: Some(token.span),
                            path: databind_core::PathRef::root(),
                        });
                    }
                    tokens.skip_value()?;
                }
                other => {
                    return Err(BindError::mismatched(
                        "object key or object end",
                        other.kind_name().to_owned(),
                    )
                    .with_span(token.span));
                }
            }
        }
        self.instantiator.create_default(ctxt)
    }
}

impl ValueDeser for ClassDeser {
    fn deserialize(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        // Scalar strategy: one scalar token, coercion included.
        if let CreatorKind::Scalar { kind, .. } = self.instantiator.kind() {
            let value = ScalarDeser::new(*kind).deserialize(tokens, ctxt)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let instance = self.instantiator.create_from_scalar(ctxt, *kind, value)?;
            self.bind_identity(ctxt, &instance)?;
            return Ok(instance);
        }

        let Some(peeked) = tokens.peek()? else {
            return Err(BindError::mismatched("object", "end of input"));
        };
        let span = peeked.span;

        if peeked.kind == TokenKind::Scalar(ScalarToken::Null) {
            tokens.next()?;
            return Ok(Value::Null);
        }

        // Delegating strategy: the delegate deserializer owns the token
        // shape entirely.
        if let CreatorKind::Delegating { .. } = self.instantiator.kind() {
            let delegate_type = self
                .instantiator
                .delegate_type()
                .cloned()
                .ok_or_else(|| BindError::InvalidDefinition {
                    type_name: self.type_name().to_owned(),
                    detail: "delegating instantiator without delegate type".to_owned(),
                })?;
            let delegate_deser = ctxt.find_value_deserializer(&delegate_type)?;
            let delegate = delegate_deser.deserialize(tokens, ctxt)?;
            let instance = self.instantiator.create_using_delegate(ctxt, delegate)?;
            self.bind_identity(ctxt, &instance)?;
            return Ok(instance);
        }

        match &peeked.kind {
            TokenKind::ObjectStart => {
                tokens.next()?;
                let instance = match self.instantiator.kind() {
                    CreatorKind::PropertiesBased { .. } => self.read_properties(tokens, ctxt)?,
                    _ => self.read_default(tokens, ctxt)?,
                };
                self.bind_identity(ctxt, &instance)?;
                Ok(instance)
            }
            TokenKind::Scalar(_) if self.spec.identity().is_some() => {
                self.read_id_reference(tokens, ctxt)
            }
            other => Err(
                BindError::mismatched("object", other.kind_name().to_owned()).with_span(span)
            ),
        }
    }

    fn identity(&self) -> Option<&IdentitySpec> {
        self.spec.identity()
    }

    fn is_cachable(&self) -> bool {
        !self
            .instantiator
            .properties()
            .iter()
            .any(|property| property.is_custom())
    }
}

impl std::fmt::Debug for ClassDeser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ClassDeser({}, {})",
            self.type_name(),
            self.instantiator.kind().variant_name()
        )
    }
}
