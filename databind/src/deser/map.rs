//! Map deserialization: independent key and value resolution, enum-keyed
//! degradation, sorted materialization, forward-reference deferral for
//! values.

use std::sync::Arc;

use databind_core::{
    BindError, CoercionAction, CoercionInput, IdKey, LogicalShape, MapKind, NullPolicy,
    PathSegment, ScalarToken, TokenKind, TokenSource, TypeDesc, TypeSpec, Value, ValueMap,
};

use crate::context::DeserContext;
use crate::deser::ValueDeser;

/// Key deserializer: object keys arrive as strings and are validated and
/// canonicalized against the declared key type.
#[derive(Debug, Clone)]
pub enum KeyDeser {
    /// String keys, kept as-is.
    Str,
    /// Integer keys, validated and canonicalized.
    Int,
    /// Boolean keys (`"true"` / `"false"`).
    Bool,
    /// Enum keys, matched by constant name or alias.
    Enum(Arc<TypeSpec>),
}

impl KeyDeser {
    /// Key deserializer for a declared key type.
    pub fn for_type(
        ctxt: &DeserContext<'_>,
        map_name: &str,
        key: &TypeDesc,
    ) -> Result<KeyDeser, BindError> {
        use databind_core::{ScalarKind, TypeShape};
        match key.shape() {
            TypeShape::Scalar(ScalarKind::Str) => Ok(KeyDeser::Str),
            TypeShape::Scalar(ScalarKind::Int) | TypeShape::Scalar(ScalarKind::Long) => {
                Ok(KeyDeser::Int)
            }
            TypeShape::Scalar(ScalarKind::Bool) => Ok(KeyDeser::Bool),
            TypeShape::Enum(name) => {
                let spec = ctxt.config().require_spec(name)?.clone();
                Ok(KeyDeser::Enum(spec))
            }
            other => Err(BindError::bad_definition(
                map_name,
                format!("unsupported map key type: {other:?}"),
            )),
        }
    }

    /// Validate and canonicalize one key.
    pub fn canonical(&self, key: &str) -> Result<String, BindError> {
        match self {
            KeyDeser::Str => Ok(key.to_owned()),
            KeyDeser::Int => key
                .parse::<i64>()
                .map(|n| n.to_string())
                .map_err(|_| {
                    BindError::invalid_value(format!("cannot parse map key {key:?} as integer"))
                }),
            KeyDeser::Bool => key
                .parse::<bool>()
                .map(|b| b.to_string())
                .map_err(|_| {
                    BindError::invalid_value(format!("cannot parse map key {key:?} as boolean"))
                }),
            KeyDeser::Enum(spec) => spec
                .constants()
                .iter()
                .find(|constant| {
                    constant.name == key || constant.aliases.iter().any(|alias| alias == key)
                })
                .map(|constant| constant.name.clone())
                .ok_or_else(|| {
                    BindError::invalid_value(format!(
                        "map key {key:?} is not a constant of `{}`",
                        spec.name()
                    ))
                }),
        }
    }

    /// Constant ordinal for enum-keyed map ordering.
    fn ordinal(&self, key: &str) -> Option<usize> {
        match self {
            KeyDeser::Enum(spec) => spec
                .constants()
                .iter()
                .position(|constant| constant.name == key),
            _ => None,
        }
    }
}

/// One map entry while the object is still being read: values that hit an
/// unresolved forward reference stay pending until the id binds.
enum Slot {
    Value(Value),
    Pending(IdKey),
}

/// Deserializer for map targets.
pub struct MapDeser {
    desc: TypeDesc,
    kind: MapKind,
    key: KeyDeser,
    value: Arc<dyn ValueDeser>,
    null_policy: NullPolicy,
    custom_value: bool,
}

impl MapDeser {
    /// Map deserializer over resolved key and value deserializers.
    pub fn new(
        desc: TypeDesc,
        kind: MapKind,
        key: KeyDeser,
        value: Arc<dyn ValueDeser>,
        null_policy: NullPolicy,
        custom_value: bool,
    ) -> Self {
        Self {
            desc,
            kind,
            key,
            value,
            null_policy,
            custom_value,
        }
    }

    fn wrap_entry(&self, err: BindError, ctxt: &DeserContext<'_>, key: &str) -> BindError {
        if err.is_definition_error() || !ctxt.config().wrap_element_errors() {
            return err;
        }
        err.prepend_path(PathSegment::Property {
            type_name: self.desc.to_string(),
            property: key.to_owned(),
        })
    }

    fn null_entry(
        &self,
        ctxt: &mut DeserContext<'_>,
        key: &str,
    ) -> Result<Option<Value>, BindError> {
        match self.null_policy {
            NullPolicy::Skip => Ok(None),
            NullPolicy::Set => self.value.null_value(ctxt).map(Some),
            NullPolicy::AsEmpty => self.value.empty_value(ctxt).map(Some),
            NullPolicy::Fail => Err(self.wrap_entry(
                BindError::invalid_value("null value where nulls are not allowed"),
                ctxt,
                key,
            )),
        }
    }

    fn flush_pending(&self, entries: &mut [(String, Slot)], ctxt: &DeserContext<'_>) {
        for (_, slot) in entries.iter_mut() {
            if let Slot::Pending(id) = slot {
                if let Some(value) = ctxt.objects().resolve(id) {
                    *slot = Slot::Value(value.clone());
                }
            }
        }
    }

    fn read_entries(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Vec<(String, Value)>, BindError> {
        let track_ids = self.value.identity().is_some();
        let mut entries: Vec<(String, Slot)> = Vec::new();
        loop {
            let Some(token) = tokens.next()? else {
                return Err(BindError::mismatched("object end", "end of input"));
            };
            match token.kind {
                TokenKind::ObjectEnd => break,
                TokenKind::Key(raw_key) => {
                    let key = self
                        .key
                        .canonical(&raw_key)
                        .map_err(|err| self.wrap_entry(err, ctxt, &raw_key))?;

                    let peeked = tokens.peek()?;
                    if matches!(
                        peeked.map(|t| t.kind),
                        Some(TokenKind::Scalar(ScalarToken::Null))
                    ) {
                        tokens.next()?;
                        if let Some(value) = self.null_entry(ctxt, &key)? {
                            entries.push((key, Slot::Value(value)));
                        }
                    } else {
                        match self.value.deserialize(tokens, ctxt) {
                            Ok(value) => entries.push((key, Slot::Value(value))),
                            Err(BindError::UnresolvedForwardReference { id }) if track_ids => {
                                entries.push((key, Slot::Pending(id)));
                            }
                            Err(err) => return Err(self.wrap_entry(err, ctxt, &key)),
                        }
                    }
                    if track_ids {
                        self.flush_pending(&mut entries, ctxt);
                    }
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

        if track_ids {
            self.flush_pending(&mut entries, ctxt);
        }
        let mut resolved = Vec::with_capacity(entries.len());
        for (key, slot) in entries {
            match slot {
                Slot::Value(value) => resolved.push((key, value)),
                Slot::Pending(id) => {
                    return Err(BindError::UnresolvedForwardReference { id });
                }
            }
        }
        Ok(resolved)
    }

    fn materialize(&self, entries: Vec<(String, Value)>) -> Result<Value, BindError> {
        let mut map = ValueMap::new();
        for (key, value) in entries {
            map.insert(key, value);
        }
        match self.kind {
            MapKind::BTreeMap => map.sort_keys(),
            MapKind::EnumMap => {
                map.sort_by(|ka, _, kb, _| {
                    self.key
                        .ordinal(ka)
                        .cmp(&self.key.ordinal(kb))
                        .then_with(|| ka.cmp(kb))
                });
            }
            _ => {}
        }
        Ok(Value::Object(map))
    }
}

impl ValueDeser for MapDeser {
    fn deserialize(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let Some(peeked) = tokens.peek()? else {
            return Err(BindError::mismatched("object", "end of input"));
        };
        let span = peeked.span;
        match &peeked.kind {
            TokenKind::ObjectStart => {
                tokens.next()?;
                let entries = self.read_entries(tokens, ctxt)?;
                self.materialize(entries)
            }
            TokenKind::Scalar(ScalarToken::Str(s)) if s.trim().is_empty() => {
                let input = if s.is_empty() {
                    CoercionInput::EmptyString
                } else {
                    CoercionInput::BlankString
                };
                match ctxt.coercion_action(LogicalShape::Map, input, CoercionAction::Fail) {
                    CoercionAction::AsNull => {
                        tokens.next()?;
                        Ok(Value::Null)
                    }
                    CoercionAction::AsEmpty => {
                        tokens.next()?;
                        Ok(Value::Object(ValueMap::new()))
                    }
                    _ => Err(BindError::mismatched("object", format!("{:?}", s.as_ref()))
                        .with_span(span)),
                }
            }
            other => Err(
                BindError::mismatched("object", other.kind_name().to_owned()).with_span(span)
            ),
        }
    }

    fn empty_value(&self, _ctxt: &mut DeserContext<'_>) -> Result<Value, BindError> {
        Ok(Value::Object(ValueMap::new()))
    }

    fn is_cachable(&self) -> bool {
        !self.custom_value && self.value.is_cachable()
    }
}

impl std::fmt::Debug for MapDeser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapDeser")
            .field("desc", &self.desc.to_string())
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("null_policy", &self.null_policy)
            .field("custom_value", &self.custom_value)
            .finish_non_exhaustive()
    }
}
