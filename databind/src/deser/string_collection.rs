//! String-collection specialization.
//!
//! The all-`String`-elements case is common enough to skip generic element
//! dispatch and recognize string tokens directly. A per-property element
//! override falls back to the generic per-element path and makes the
//! instance non-cachable.

use std::sync::Arc;

use databind_core::{
    BindError, CoercionAction, CoercionInput, CollectionKind, LogicalShape, NullPolicy,
    PathSegment, ScalarToken, Token, TokenKind, TokenSource, TypeDesc, Value,
};

use crate::context::DeserContext;
use crate::deser::collection::materialize_collection;
use crate::deser::ValueDeser;

/// Fast-path deserializer for collections of strings.
pub struct StringCollectionDeser {
    desc: TypeDesc,
    kind: CollectionKind,
    /// Per-property element override; forces the generic path.
    custom: Option<Arc<dyn ValueDeser>>,
    null_policy: NullPolicy,
}

impl StringCollectionDeser {
    /// Fast-path instance (no customization).
    pub fn new(desc: TypeDesc, kind: CollectionKind, null_policy: NullPolicy) -> Self {
        Self {
            desc,
            kind,
            custom: None,
            null_policy,
        }
    }

    /// Instance with a per-property element deserializer override.
    pub fn with_custom_element(
        desc: TypeDesc,
        kind: CollectionKind,
        null_policy: NullPolicy,
        element: Arc<dyn ValueDeser>,
    ) -> Self {
        Self {
            desc,
            kind,
            custom: Some(element),
            null_policy,
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
            NullPolicy::Set => Ok(Some(Value::Null)),
            NullPolicy::AsEmpty => Ok(Some(Value::Str(String::new()))),
            NullPolicy::Fail => Err(self.wrap_element(
                BindError::invalid_value("null element where nulls are not allowed"),
                ctxt,
                index,
            )),
        }
    }

    /// One element via direct string-token recognition.
    fn read_string_element(
        &self,
        token: Token<'_>,
        ctxt: &DeserContext<'_>,
    ) -> Result<Value, BindError> {
        match token.kind {
            TokenKind::Scalar(ScalarToken::Str(s)) => Ok(Value::Str(s.into_owned())),
            TokenKind::Scalar(ScalarToken::I64(n)) => {
                self.convert_scalar(n.to_string(), CoercionInput::Integer, &token, ctxt)
            }
            TokenKind::Scalar(ScalarToken::U64(u)) => {
                self.convert_scalar(u.to_string(), CoercionInput::Integer, &token, ctxt)
            }
            TokenKind::Scalar(ScalarToken::F64(n)) => {
                self.convert_scalar(n.to_string(), CoercionInput::Float, &token, ctxt)
            }
            TokenKind::Scalar(ScalarToken::Bool(b)) => {
                self.convert_scalar(b.to_string(), CoercionInput::Boolean, &token, ctxt)
            }
            other => Err(BindError::mismatched("string", other.kind_name().to_owned())
                .with_span(token.span)),
        }
    }

    fn convert_scalar(
        &self,
        converted: String,
        input: CoercionInput,
        token: &Token<'_>,
        ctxt: &DeserContext<'_>,
    ) -> Result<Value, BindError> {
        match ctxt.coercion_action(LogicalShape::Textual, input, CoercionAction::Fail) {
            CoercionAction::TryConvert => Ok(Value::Str(converted)),
            CoercionAction::AsNull => Ok(Value::Null),
            _ => Err(BindError::mismatched("string", token.kind.kind_name().to_owned())
                .with_span(token.span)),
        }
    }

    fn read_elements(
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
                    break;
                }
                TokenKind::Scalar(ScalarToken::Null) => {
                    tokens.next()?;
                    if let Some(value) = self.null_element(ctxt, index)? {
                        items.push(value);
                    }
                }
                _ => {
                    let value = match &self.custom {
                        // Customized: generic per-element dispatch.
                        Some(element) => element
                            .deserialize(tokens, ctxt)
                            .map_err(|err| self.wrap_element(err, ctxt, index))?,
                        None => {
                            let Some(token) = tokens.next()? else {
                                return Err(BindError::mismatched("string", "end of input"));
                            };
                            self.read_string_element(token, ctxt)
                                .map_err(|err| self.wrap_element(err, ctxt, index))?
                        }
                    };
                    items.push(value);
                }
            }
            index += 1;
        }
        Ok(items)
    }

    fn from_single_value(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let Some(peeked) = tokens.peek()? else {
            return Err(BindError::mismatched("string", "end of input"));
        };
        if peeked.kind == TokenKind::Scalar(ScalarToken::Null) {
            tokens.next()?;
            let items = match self.null_element(ctxt, 0)? {
                Some(value) => vec![value],
                None => Vec::new(),
            };
            return materialize_collection(self.kind, items);
        }
        let value = match &self.custom {
            Some(element) => element
                .deserialize(tokens, ctxt)
                .map_err(|err| self.wrap_element(err, ctxt, 0))?,
            None => {
                let Some(token) = tokens.next()? else {
                    return Err(BindError::mismatched("string", "end of input"));
                };
                self.read_string_element(token, ctxt)
                    .map_err(|err| self.wrap_element(err, ctxt, 0))?
            }
        };
        materialize_collection(self.kind, vec![value])
    }
}

impl ValueDeser for StringCollectionDeser {
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
        self.custom.is_none()
    }
}

impl std::fmt::Debug for StringCollectionDeser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringCollectionDeser")
            .field("desc", &self.desc.to_string())
            .field("kind", &self.kind)
            .field("customized", &self.custom.is_some())
            .finish_non_exhaustive()
    }
}
