//! Token contract between the (out-of-scope) tokenizer and the engine.
//!
//! The engine never sees raw text: it consumes a stream of [`Token`] events
//! through the [`TokenSource`] trait, the same way a format parser feeds a
//! generic deserializer. [`TokenSlice`] is the in-memory implementation used
//! by tests and by callers that pre-tokenize.

use std::borrow::Cow;
use std::fmt;

/// Byte range in the original input, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start offset in the input.
    pub offset: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// End offset (exclusive).
    pub const fn end(&self) -> u32 {
        self.offset + self.len
    }
}

/// Scalar literal extracted from the wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarToken<'de> {
    /// Null literal.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Signed integer literal.
    I64(i64),
    /// Unsigned integer literal.
    U64(u64),
    /// Floating-point literal.
    F64(f64),
    /// Integer literal too wide for 64 bits, as decimal digits.
    BigInt(Cow<'de, str>),
    /// Decimal literal kept exact, as source text.
    Decimal(Cow<'de, str>),
    /// UTF-8 string literal.
    Str(Cow<'de, str>),
}

impl<'de> ScalarToken<'de> {
    /// Human-readable token name for diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            ScalarToken::Null => "null",
            ScalarToken::Bool(_) => "boolean",
            ScalarToken::I64(_) | ScalarToken::U64(_) => "integer",
            ScalarToken::F64(_) => "float",
            ScalarToken::BigInt(_) => "big-integer",
            ScalarToken::Decimal(_) => "decimal",
            ScalarToken::Str(_) => "string",
        }
    }
}

/// Structural or scalar event emitted while streaming through input.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'de> {
    /// Beginning of an object.
    ObjectStart,
    /// End of an object.
    ObjectEnd,
    /// Object member key.
    Key(Cow<'de, str>),
    /// Beginning of an array.
    ArrayStart,
    /// End of an array.
    ArrayEnd,
    /// Scalar literal.
    Scalar(ScalarToken<'de>),
}

impl<'de> TokenKind<'de> {
    /// Human-readable token name for diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            TokenKind::ObjectStart => "object start",
            TokenKind::ObjectEnd => "object end",
            TokenKind::Key(_) => "object key",
            TokenKind::ArrayStart => "array start",
            TokenKind::ArrayEnd => "array end",
            TokenKind::Scalar(s) => s.kind_name(),
        }
    }

    /// Shorthand for a string scalar token.
    pub fn str(s: &'de str) -> Self {
        TokenKind::Scalar(ScalarToken::Str(Cow::Borrowed(s)))
    }

    /// Shorthand for an integer scalar token.
    pub const fn int(n: i64) -> Self {
        TokenKind::Scalar(ScalarToken::I64(n))
    }

    /// Shorthand for a float scalar token.
    pub const fn float(n: f64) -> Self {
        TokenKind::Scalar(ScalarToken::F64(n))
    }

    /// Shorthand for a boolean scalar token.
    pub const fn bool(b: bool) -> Self {
        TokenKind::Scalar(ScalarToken::Bool(b))
    }

    /// Shorthand for a null scalar token.
    pub const fn null() -> Self {
        TokenKind::Scalar(ScalarToken::Null)
    }

    /// Shorthand for an object member key.
    pub fn key(name: &'de str) -> Self {
        TokenKind::Key(Cow::Borrowed(name))
    }
}

/// A token event plus its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'de> {
    /// The event.
    pub kind: TokenKind<'de>,
    /// Where it came from in the input.
    pub span: Span,
}

/// Error surfaced by a token source (malformed input, I/O, depth limits).
///
/// The tokenizer owns all input-level limits; this type is just the channel
/// through which its failures reach the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenError {
    /// What went wrong.
    pub message: String,
    /// Where it went wrong.
    pub span: Span,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token stream error: {}", self.message)
    }
}

impl std::error::Error for TokenError {}

/// Streaming token cursor for one deserialization call.
///
/// `peek` must be idempotent: repeated peeks without an intervening `next`
/// return the same token.
pub trait TokenSource<'de> {
    /// Read the next token. `Ok(None)` signals end of input.
    fn next(&mut self) -> Result<Option<Token<'de>>, TokenError>;

    /// Peek at the next token without consuming it.
    fn peek(&mut self) -> Result<Option<Token<'de>>, TokenError>;

    /// Skip the value starting at the current token (for unknown fields).
    fn skip_value(&mut self) -> Result<(), TokenError> {
        let mut depth = 0i32;
        loop {
            let Some(token) = self.next()? else {
                return Err(TokenError {
                    message: "unexpected end of input while skipping value".into(),
                    span: Span::default(),
                });
            };
            match token.kind {
                TokenKind::ObjectStart | TokenKind::ArrayStart => depth += 1,
                TokenKind::ObjectEnd | TokenKind::ArrayEnd => {
                    depth -= 1;
                    if depth <= 0 {
                        return Ok(());
                    }
                }
                TokenKind::Scalar(_) if depth == 0 => return Ok(()),
                _ => {}
            }
        }
    }
}

/// In-memory token source over a pre-built event list.
///
/// Spans are synthesized from the event index when not supplied, which keeps
/// scripted test streams terse while still exercising span propagation.
#[derive(Debug, Clone)]
pub struct TokenSlice<'de> {
    tokens: Vec<Token<'de>>,
    pos: usize,
}

impl<'de> TokenSlice<'de> {
    /// Build a source from token kinds, synthesizing one-byte spans.
    pub fn of(kinds: Vec<TokenKind<'de>>) -> Self {
        let tokens = kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| Token {
                kind,
                span: Span {
                    offset: i as u32,
                    len: 1,
                },
            })
            .collect();
        Self { tokens, pos: 0 }
    }

    /// Build a source from fully-spanned tokens.
    pub fn new(tokens: Vec<Token<'de>>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Whether every token has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

impl<'de> TokenSource<'de> for TokenSlice<'de> {
    fn next(&mut self) -> Result<Option<Token<'de>>, TokenError> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        Ok(token)
    }

    fn peek(&mut self) -> Result<Option<Token<'de>>, TokenError> {
        Ok(self.tokens.get(self.pos).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_value_handles_nesting() {
        let mut source = TokenSlice::of(vec![
            TokenKind::ObjectStart,
            TokenKind::key("a"),
            TokenKind::ArrayStart,
            TokenKind::int(1),
            TokenKind::ArrayEnd,
            TokenKind::ObjectEnd,
            TokenKind::int(9),
        ]);
        source.skip_value().unwrap();
        let next = source.next().unwrap().unwrap();
        assert_eq!(next.kind, TokenKind::int(9));
    }

    #[test]
    fn peek_is_idempotent() {
        let mut source = TokenSlice::of(vec![TokenKind::bool(true)]);
        assert_eq!(source.peek().unwrap(), source.peek().unwrap());
        assert!(source.next().unwrap().is_some());
        assert!(source.next().unwrap().is_none());
    }
}
