//! Scalar deserializers with coercion handling.

use databind_core::{
    BindError, CoercionAction, CoercionInput, ScalarKind, ScalarToken, Token, TokenKind,
    TokenSource, Value,
};
use rust_decimal::Decimal;

use crate::context::DeserContext;
use crate::deser::ValueDeser;

/// Deserializer for one scalar kind.
#[derive(Debug, Clone, Copy)]
pub struct ScalarDeser {
    kind: ScalarKind,
}

impl ScalarDeser {
    /// Deserializer for `kind`.
    pub const fn new(kind: ScalarKind) -> Self {
        Self { kind }
    }

    /// The target scalar kind.
    pub const fn kind(&self) -> ScalarKind {
        self.kind
    }

    fn mismatch(&self, token: &Token<'_>) -> BindError {
        BindError::mismatched(self.kind.name(), token.kind.kind_name().to_owned())
            .with_span(token.span)
    }

    fn from_i64(&self, n: i64, token: &Token<'_>, ctxt: &DeserContext<'_>) -> Result<Value, BindError> {
        match self.kind {
            ScalarKind::Int => {
                if i32::try_from(n).is_ok() {
                    Ok(Value::Int(n))
                } else {
                    Err(BindError::invalid_value(format!(
                        "integer {n} out of range for int"
                    ))
                    .with_span(token.span))
                }
            }
            ScalarKind::Long => Ok(Value::Int(n)),
            ScalarKind::BigInt => Ok(Value::BigInt(i128::from(n))),
            ScalarKind::Double => Ok(Value::Double(n as f64)),
            ScalarKind::Decimal => Ok(Value::Decimal(Decimal::from(n))),
            ScalarKind::Str => {
                let action = ctxt.coercion_action(
                    databind_core::LogicalShape::Textual,
                    CoercionInput::Integer,
                    CoercionAction::Fail,
                );
                match action {
                    CoercionAction::TryConvert => Ok(Value::Str(n.to_string())),
                    CoercionAction::AsNull => Ok(Value::Null),
                    _ => Err(self.mismatch(token)),
                }
            }
            ScalarKind::Bool => {
                let action = ctxt.coercion_action(
                    databind_core::LogicalShape::Boolean,
                    CoercionInput::Integer,
                    CoercionAction::Fail,
                );
                match action {
                    CoercionAction::TryConvert => Ok(Value::Bool(n != 0)),
                    CoercionAction::AsNull => Ok(Value::Null),
                    _ => Err(self.mismatch(token)),
                }
            }
        }
    }

    fn from_f64(&self, n: f64, token: &Token<'_>, ctxt: &DeserContext<'_>) -> Result<Value, BindError> {
        match self.kind {
            ScalarKind::Double => Ok(Value::Double(n)),
            ScalarKind::Decimal => Decimal::try_from(n)
                .map(Value::Decimal)
                .map_err(|_| {
                    BindError::invalid_value(format!("float {n} is not a valid decimal"))
                        .with_span(token.span)
                }),
            ScalarKind::Int | ScalarKind::Long | ScalarKind::BigInt => {
                let action = ctxt.coercion_action(
                    self.kind_shape(),
                    CoercionInput::Float,
                    CoercionAction::Fail,
                );
                match action {
                    CoercionAction::TryConvert if n.fract() == 0.0 => {
                        self.from_i64(n as i64, token, ctxt)
                    }
                    CoercionAction::AsNull => Ok(Value::Null),
                    _ => Err(self.mismatch(token)),
                }
            }
            ScalarKind::Str | ScalarKind::Bool => Err(self.mismatch(token)),
        }
    }

    fn parse_text(&self, text: &str) -> Option<Value> {
        match self.kind {
            ScalarKind::Str => Some(Value::Str(text.to_owned())),
            ScalarKind::Int => text
                .parse::<i32>()
                .ok()
                .map(|n| Value::Int(i64::from(n))),
            ScalarKind::Long => text.parse::<i64>().ok().map(Value::Int),
            ScalarKind::BigInt => text.parse::<i128>().ok().map(Value::BigInt),
            ScalarKind::Double => text.parse::<f64>().ok().map(Value::Double),
            ScalarKind::Decimal => text.parse::<Decimal>().ok().map(Value::Decimal),
            ScalarKind::Bool => text.parse::<bool>().ok().map(Value::Bool),
        }
    }

    fn from_text(
        &self,
        text: &str,
        token: &Token<'_>,
        ctxt: &DeserContext<'_>,
    ) -> Result<Value, BindError> {
        if self.kind == ScalarKind::Str {
            return Ok(Value::Str(text.to_owned()));
        }
        let input = if text.is_empty() {
            CoercionInput::EmptyString
        } else if text.trim().is_empty() {
            CoercionInput::BlankString
        } else {
            CoercionInput::String
        };
        // Non-empty strings parse by default; empty and blank ones fail
        // unless configured otherwise.
        let fallback = if input == CoercionInput::String {
            CoercionAction::TryConvert
        } else {
            CoercionAction::Fail
        };
        match ctxt.coercion_action(self.kind_shape(), input, fallback) {
            CoercionAction::AsNull => Ok(Value::Null),
            CoercionAction::AsEmpty => Ok(self.empty()),
            CoercionAction::Fail => Err(self.mismatch(token)),
            CoercionAction::TryConvert => self.parse_text(text).ok_or_else(|| {
                BindError::invalid_value(format!(
                    "cannot parse {text:?} as {}",
                    self.kind.name()
                ))
                .with_span(token.span)
            }),
        }
    }

    fn kind_shape(&self) -> databind_core::LogicalShape {
        databind_core::TypeDesc::scalar(self.kind).logical_shape()
    }

    fn empty(&self) -> Value {
        match self.kind {
            ScalarKind::Str => Value::Str(String::new()),
            ScalarKind::Int | ScalarKind::Long => Value::Int(0),
            ScalarKind::BigInt => Value::BigInt(0),
            ScalarKind::Double => Value::Double(0.0),
            ScalarKind::Decimal => Value::Decimal(Decimal::ZERO),
            ScalarKind::Bool => Value::Bool(false),
        }
    }
}

impl ValueDeser for ScalarDeser {
    fn deserialize(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        let Some(token) = tokens.next()? else {
            return Err(BindError::mismatched(self.kind.name(), "end of input"));
        };
        match &token.kind {
            TokenKind::Scalar(ScalarToken::Null) => Ok(Value::Null),
            TokenKind::Scalar(ScalarToken::Bool(b)) => {
                if self.kind == ScalarKind::Bool {
                    Ok(Value::Bool(*b))
                } else {
                    Err(self.mismatch(&token))
                }
            }
            TokenKind::Scalar(ScalarToken::I64(n)) => self.from_i64(*n, &token, ctxt),
            TokenKind::Scalar(ScalarToken::U64(u)) => match i64::try_from(*u) {
                Ok(n) => self.from_i64(n, &token, ctxt),
                Err(_) if self.kind == ScalarKind::BigInt => Ok(Value::BigInt(i128::from(*u))),
                Err(_) => Err(BindError::invalid_value(format!(
                    "integer {u} out of range for {}",
                    self.kind.name()
                ))
                .with_span(token.span)),
            },
            TokenKind::Scalar(ScalarToken::F64(n)) => self.from_f64(*n, &token, ctxt),
            TokenKind::Scalar(ScalarToken::BigInt(digits)) => match self.kind {
                ScalarKind::BigInt => digits.parse::<i128>().map(Value::BigInt).map_err(|_| {
                    BindError::invalid_value(format!("cannot parse {digits:?} as big-integer"))
                        .with_span(token.span)
                }),
                ScalarKind::Double => digits
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| self.mismatch(&token)),
                ScalarKind::Decimal => digits
                    .parse::<Decimal>()
                    .map(Value::Decimal)
                    .map_err(|_| self.mismatch(&token)),
                _ => Err(self.mismatch(&token)),
            },
            TokenKind::Scalar(ScalarToken::Decimal(text)) => match self.kind {
                ScalarKind::Decimal => text.parse::<Decimal>().map(Value::Decimal).map_err(|_| {
                    BindError::invalid_value(format!("cannot parse {text:?} as decimal"))
                        .with_span(token.span)
                }),
                ScalarKind::Double => text
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| self.mismatch(&token)),
                _ => Err(self.mismatch(&token)),
            },
            TokenKind::Scalar(ScalarToken::Str(s)) => self.from_text(s, &token, ctxt),
            _ => Err(self.mismatch(&token)),
        }
    }

    fn empty_value(&self, _ctxt: &mut DeserContext<'_>) -> Result<Value, BindError> {
        Ok(self.empty())
    }
}
