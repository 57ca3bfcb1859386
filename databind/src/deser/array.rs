//! Fixed-array deserialization.
//!
//! Shares the element machinery with collections but targets a
//! non-growable array value; scalar element kinds take a direct fast path
//! with no identity tracking.

use std::sync::Arc;

use databind_core::{
    BindError, CoercionAction, CoercionInput, LogicalShape, NullPolicy, PathSegment, ScalarKind,
    ScalarToken, TokenKind, TokenSource, TypeDesc, Value,
};

use crate::context::DeserContext;
use crate::deser::ValueDeser;
use crate::refs::RefsAccumulator;

/// Deserializer for fixed-array targets.
pub struct ArrayDeser {
    desc: TypeDesc,
    element: Arc<dyn ValueDeser>,
    /// Scalar element kind, when the target is a primitive array.
    primitive: Option<ScalarKind>,
    null_policy: NullPolicy,
    custom_element: bool,
}

impl ArrayDeser {
    /// Array deserializer over a resolved element deserializer.
    pub fn new(
        desc: TypeDesc,
        element: Arc<dyn ValueDeser>,
        primitive: Option<ScalarKind>,
        null_policy: NullPolicy,
        custom_element: bool,
    ) -> Self {
        Self {
            desc,
            element,
            primitive,
            null_policy,
            custom_element,
        }
    }

    fn wrap_element(&self, err: BindError, ctxt: &DeserContext<'_>, index: usize) -> BindError {
        if err.is_definition_error() || !ctxt.config().wrap_element_errors() {
            return err;
        }
        err.prepend_path(PathSegment::Index {
            type_name: self.desc.to_string(),
            index,
        })
    }

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

    /// Primitive fast path: plain scalar reads, no identity machinery.
    fn read_primitive(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Vec<Value>, BindError> {
        let mut items = Vec::new();
        let mut index = 0usize;
        loop {
            let Some(peeked) = tokens.peek()? else {
                return Err(BindError::mismatched("array end", "end of input"));
            };
            match &peeked.kind {
                TokenKind::ArrayEnd => {
                    tokens.next()?;
                    return Ok(items);
                }
                TokenKind::Scalar(ScalarToken::Null) => {
                    tokens.next()?;
                    if let Some(value) = self.null_element(ctxt, index)? {
                        items.push(value);
                    }
                }
                _ => {
                    let value = self
                        .element
                        .deserialize(tokens, ctxt)
                        .map_err(|err| self.wrap_element(err, ctxt, index))?;
                    items.push(value);
                }
            }
            index += 1;
        }
    }

    fn read_elements(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Vec<Value>, BindError> {
        if self.primitive.is_some() {
            return self.read_primitive(tokens, ctxt);
        }
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
        acc.into_values()
    }

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
            return Ok(Value::Array(items));
        }
        let value = self
            .element
            .deserialize(tokens, ctxt)
            .map_err(|err| self.wrap_element(err, ctxt, 0))?;
        Ok(Value::Array(vec![value]))
    }
}

impl ValueDeser for ArrayDeser {
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
                Ok(Value::Array(items))
            }
            TokenKind::Scalar(ScalarToken::Str(s)) if s.trim().is_empty() => {
                let input = if s.is_empty() {
                    CoercionInput::EmptyString
                } else {
                    CoercionInput::BlankString
                };
                match ctxt.coercion_action(LogicalShape::Array, input, CoercionAction::Fail) {
                    CoercionAction::AsNull => {
                        tokens.next()?;
                        Ok(Value::Null)
                    }
                    CoercionAction::AsEmpty => {
                        tokens.next()?;
                        Ok(Value::Array(Vec::new()))
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

impl std::fmt::Debug for ArrayDeser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayDeser")
            .field("desc", &self.desc.to_string())
            .field("primitive", &self.primitive)
            .field("null_policy", &self.null_policy)
            .finish_non_exhaustive()
    }
}
