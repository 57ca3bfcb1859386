//! Untyped deserialization: build whatever the stream holds.

use databind_core::{
    BindError, ScalarToken, TokenKind, TokenSource, Value, ValueMap,
};
use rust_decimal::Decimal;

use crate::context::DeserContext;
use crate::deser::ValueDeser;

/// Deserializer for untyped (`Any`) targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyDeser;

impl AnyDeser {
    fn read_value(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
        depth: usize,
    ) -> Result<Value, BindError> {
        let Some(token) = tokens.next()? else {
            return Err(BindError::mismatched("value", "end of input"));
        };
        match token.kind {
            TokenKind::Scalar(ScalarToken::Null) => Ok(Value::Null),
            TokenKind::Scalar(ScalarToken::Bool(b)) => Ok(Value::Bool(b)),
            TokenKind::Scalar(ScalarToken::I64(n)) => Ok(Value::Int(n)),
            TokenKind::Scalar(ScalarToken::U64(u)) => Ok(match i64::try_from(u) {
                Ok(n) => Value::Int(n),
                Err(_) => Value::BigInt(i128::from(u)),
            }),
            TokenKind::Scalar(ScalarToken::F64(n)) => Ok(Value::Double(n)),
            TokenKind::Scalar(ScalarToken::BigInt(digits)) => digits
                .parse::<i128>()
                .map(Value::BigInt)
                .map_err(|_| {
                    BindError::invalid_value(format!("cannot parse {digits:?} as big-integer"))
                        .with_span(token.span)
                }),
            TokenKind::Scalar(ScalarToken::Decimal(text)) => text
                .parse::<Decimal>()
                .map(Value::Decimal)
                .map_err(|_| {
                    BindError::invalid_value(format!("cannot parse {text:?} as decimal"))
                        .with_span(token.span)
                }),
            TokenKind::Scalar(ScalarToken::Str(s)) => Ok(Value::Str(s.into_owned())),
            TokenKind::ArrayStart => {
                let mut items = Vec::new();
                loop {
                    match tokens.peek()? {
                        Some(peeked) if peeked.kind == TokenKind::ArrayEnd => {
                            tokens.next()?;
                            break;
                        }
                        Some(_) => items.push(self.read_value(tokens, ctxt, depth + 1)?),
                        None => {
                            return Err(BindError::mismatched("array end", "end of input"));
                        }
                    }
                }
                Ok(Value::Array(items))
            }
            TokenKind::ObjectStart => {
                let mut map = ValueMap::new();
                loop {
                    let Some(next) = tokens.next()? else {
                        return Err(BindError::mismatched("object end", "end of input"));
                    };
                    match next.kind {
                        TokenKind::ObjectEnd => break,
                        TokenKind::Key(key) => {
                            let value = self.read_value(tokens, ctxt, depth + 1)?;
                            map.insert(key.into_owned(), value);
                        }
                        other => {
                            return Err(BindError::mismatched(
                                "object key or object end",
                                other.kind_name().to_owned(),
                            )
                            .with_span(next.span));
                        }
                    }
                }
                Ok(Value::Object(map))
            }
            other => Err(
                BindError::mismatched("value", other.kind_name().to_owned()).with_span(token.span)
            ),
        }
    }
}

impl ValueDeser for AnyDeser {
    fn deserialize(
        &self,
        tokens: &mut dyn TokenSource<'_>,
        ctxt: &mut DeserContext<'_>,
    ) -> Result<Value, BindError> {
        self.read_value(tokens, ctxt, 0)
    }
}
