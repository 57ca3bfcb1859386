//! Collection deserialization: the array-shaped state machine with
//! single-value and coercion entries, per-element null policy, error
//! wrapping, and forward-reference routing.

use std::sync::Arc;

use databind_core::{
    BindError, CoercionAction, CoercionInput, CollectionKind, LogicalShape, NullPolicy,
    PathSegment, ScalarToken, TokenKind, TokenSource, TypeDesc, Value,
};

use crate::context::DeserContext;
use crate::deser::ValueDeser;
use crate::refs::RefsAccumulator;

/// Apply set/sorted-set semantics to the collected elements.
///
/// Sorted kinds reject null members; the rejection surfaces as a
/// structured mismatch, not a low-level failure.
pub(crate) fn materialize_collection(
    kind: CollectionKind,
    items: Vec<Value>,
) -> Result<Value, BindError> {
    if !kind.is_set() {
        return Ok(Value::Array(items));
    }
    if kind.is_sorted() && items.iter().any(Value::is_null) {
        return Err(BindError::mismatched(
            "non-null element for sorted collection",
            "null",
        ));
    }
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    if kind.is_sorted() {
        unique.sort_by(|a, b| a.total_cmp(b));
    }
    Ok(Value::Array(unique))
}

/// Deserializer for growable collections.
pub struct CollectionDeser {
    desc: TypeDesc,
    kind: CollectionKind,
    element: Arc<dyn ValueDeser>,
    null_policy: NullPolicy,
    custom_element: bool,
}

impl CollectionDeser {
    /// Collection deserializer over a resolved element deserializer.
    pub fn new(
        desc: TypeDesc,
        kind: CollectionKind,
        element: Arc<dyn ValueDeser>,
        null_policy: NullPolicy,
        custom_element: bool,
    ) -> Self {
        Self {
            desc,
            kind,
            element,
            null_policy,
            custom_element,
        }
    }

    fn wrap_element(
        &self,
        err: BindError,
        ctxt: &DeserContext<'_>,
        index: usize,
    ) -> BindError {
        if err.is_definition_error() || !ctxt.config().wrap_element_errors() {
            return err;
        }
        err.prepend_path(PathSegment::Index {
            type_name: self.desc.to_string(),
            index,
        })
    }

    /// Handle one null element per the configured policy; `Ok(None)` means
    /// the element is skipped.
    fn null_element(
        &self,
        ctxt: &mut DeserContext<'_>,
        index: usize,
    ) -> Result<Option<Value>, BindError> {
        match self.null_policy {
            NullPolicy::Skip => Ok(None),
            NullPolicy::Set => self.element.null_value(ctxt).map(Some),
            NullPolicy::AsEmpty => self.element.empty_value(ctxt).map(Some),
            NullPolicy::Fail => Err(self.wrap_element(
                BindError::invalid_value("null element where nulls are not allowed"),
                ctxt,
                index,
            )),
        }
    }

    fn read_elements(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Vec<Value>, BindError> {
        let mut acc = RefsAccumulator::new();
        let track_ids = self.element.identity().is_some();
        let mut index = 0usize;
        loop {
            let Some(peeked) = tokens.peek()? else {
                return Err(BindError::mismatched("array end", "end of input"));
            };
            match &peeked.kind {
                TokenKind::ArrayEnd => {
                    tokens.next()?;
                    break;
                }
                TokenKind::Scalar(ScalarToken::Null) => {
                    tokens.next()?;
                    if let Some(value) = self.null_element(ctxt, index)? {
                        acc.push(value);
                    }
                }
                _ => match self.element.deserialize(tokens, ctxt) {
                    Ok(value) => acc.push(value),
                    Err(BindError::UnresolvedForwardReference { id }) if track_ids => {
                        acc.defer(id);
                    }
                    Err(err) => return Err(self.wrap_element(err, ctxt, index)),
                },
            }
            if track_ids {
                acc.flush_resolved(ctxt.objects())?;
            }
            index += 1;
        }
        log::trace!("collection {}: read {index} elements", self.desc);
        acc.into_values()
    }

    /// Single-value entry: one element becomes a one-element collection.
    fn from_single_value(
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
            let items = match self.null_element(ctxt, 0)? {
                Some(value) => vec![value],
                None => Vec::new(),
            };
            return materialize_collection(self.kind, items);
        }
        let value = self
            .element
            .deserialize(tokens, ctxt)
            .map_err(|err| self.wrap_element(err, ctxt, 0))?;
        materialize_collection(self.kind, vec![value])
    }
}

impl ValueDeser for CollectionDeser {
    fn deserialize(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let Some(peeked) = tokens.peek()? else {
            return Err(BindError::mismatched("array", "end of input"));
        };
        let span = peeked.span;
        match &peeked.kind {
            TokenKind::ArrayStart => {
                tokens.next()?;
                let items = self.read_elements(tokens, ctxt)?;
                materialize_collection(self.kind, items)
            }
            TokenKind::Scalar(ScalarToken::Str(s)) if s.trim().is_empty() => {
                let input = if s.is_empty() {
                    CoercionInput::EmptyString
                } else {
                    CoercionInput::BlankString
                };
                match ctxt.coercion_action(LogicalShape::Collection, input, CoercionAction::Fail) {
                    CoercionAction::AsNull => {
                        tokens.next()?;
                        Ok(Value::Null)
                    }
                    CoercionAction::AsEmpty => {
                        tokens.next()?;
                        materialize_collection(self.kind, Vec::new())
                    }
                    CoercionAction::TryConvert => self.from_single_value(tokens, ctxt),
                    CoercionAction::Fail => Err(BindError::mismatched(
                        "array",
                        format!("{:?}", s.as_ref()),
                    )
                    .with_span(span)),
                }
            }
            other => {
                if ctxt.config().accept_single_value_as_array() {
                    self.from_single_value(tokens, ctxt)
                } else {
                    Err(
                        BindError::mismatched("array", other.kind_name().to_owned())
                            .with_span(span),
                    )
                }
            }
        }
    }

    fn empty_value(&self, _ctxt: &mut DeserContext<'_>) -> Result<Value, BindError> {
        Ok(Value::Array(Vec::new()))
    }

    fn is_cachable(&self) -> bool {
        !self.custom_element && self.element.is_cachable()
    }
}

impl std::fmt::Debug for CollectionDeser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionDeser")
            .field("desc", &self.desc.to_string())
            .field("kind", &self.kind)
            .field("null_policy", &self.null_policy)
            .field("custom_element", &self.custom_element)
            .finish_non_exhaustive()
    }
}
