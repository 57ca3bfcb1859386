//! Enum deserialization: constant lookup by name, alias or ordinal.

use std::sync::Arc;

use databind_core::{
    BindError, CoercionAction, CoercionInput, LogicalShape, ScalarToken, TokenKind, TokenSource,
    TypeSpec, Value,
};

use crate::context::DeserContext;
use crate::deser::ValueDeser;

/// Deserializer for registered enum types.
pub struct EnumDeser {
    spec: Arc<TypeSpec>,
}

impl EnumDeser {
    /// Enum deserializer over a registered spec.
    pub fn new(spec: Arc<TypeSpec>) -> Self {
        Self { spec }
    }

    fn by_name(&self, name: &str) -> Option<Value> {
        self.spec
            .constants()
            .iter()
            .find(|constant| {
                constant.name == name || constant.aliases.iter().any(|alias| alias == name)
            })
            .map(|constant| constant.value.clone())
    }

    fn by_ordinal(&self, ordinal: i64) -> Option<Value> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| self.spec.constants().get(i))
            .map(|constant| constant.value.clone())
    }

    fn unknown(&self, got: impl Into<String>, ctxt: &DeserContext<'_>) -> Result<Value, BindError> {
        if ctxt.config().unknown_enum_as_null() {
            return Ok(Value::Null);
        }
        let names: Vec<&str> = self
            .spec
            .constants()
            .iter()
            .map(|constant| constant.name.as_str())
            .collect();
        Err(BindError::invalid_value(format!(
            "{} is not a constant of `{}` (expected one of {names:?})",
            got.into(),
            self.spec.name()
        )))
    }
}

impl ValueDeser for EnumDeser {
    fn deserialize(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let Some(token) = tokens.next()? else {
            return Err(BindError::mismatched("enum constant", "end of input"));
        };
        match &token.kind {
            TokenKind::Scalar(ScalarToken::Null) => Ok(Value::Null),
            TokenKind::Scalar(ScalarToken::Str(s)) => {
                if s.trim().is_empty() {
                    let input = if s.is_empty() {
                        CoercionInput::EmptyString
                    } else {
                        CoercionInput::BlankString
                    };
                    return match ctxt.coercion_action(
                        LogicalShape::Enum,
                        input,
                        CoercionAction::Fail,
                    ) {
                        CoercionAction::AsNull | CoercionAction::AsEmpty => Ok(Value::Null),
                        _ => self
                            .unknown(format!("{:?}", s.as_ref()), ctxt)
                            .map_err(|err| err.with_span(token.span)),
                    };
                }
                match self.by_name(s) {
                    Some(value) => Ok(value),
                    None => self
                        .unknown(format!("{:?}", s.as_ref()), ctxt)
                        .map_err(|err| err.with_span(token.span)),
                }
            }
            TokenKind::Scalar(ScalarToken::I64(n)) => match self.by_ordinal(*n) {
                Some(value) => Ok(value),
                None => self
                    .unknown(format!("index {n}"), ctxt)
                    .map_err(|err| err.with_span(token.span)),
            },
            other => Err(
                BindError::mismatched("enum constant", other.kind_name().to_owned())
                    .with_span(token.span),
            ),
        }
    }
}

impl std::fmt::Debug for EnumDeser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EnumDeser({})", self.spec.name())
    }
}
