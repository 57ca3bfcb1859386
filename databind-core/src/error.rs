//! Error taxonomy for the binding engine.
//!
//! Two families exist and must not be confused: definition errors
//! ([`BindError::BadTypeDefinition`], [`BindError::InvalidDefinition`]) are
//! about the *type* and are detected once per configuration, while data
//! errors are about one input and never poison cached state. Every
//! data-level error carries enough context (type name, property, index,
//! span) to localize the fault without inspecting engine internals.

use std::fmt;

use crate::token::{Span, TokenError};
use crate::value::IdKey;

/// One step of a reference path through the target structure.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// A named property of a type.
    Property {
        /// Owning type.
        type_name: String,
        /// Property name.
        property: String,
    },
    /// An index into a container.
    Index {
        /// Container description.
        type_name: String,
        /// Element index.
        index: usize,
    },
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Property {
                type_name,
                property,
            } => write!(f, "{type_name}[\"{property}\"]"),
            PathSegment::Index { type_name, index } => write!(f, "{type_name}[{index}]"),
        }
    }
}

/// Outside-in reference path attached to data-level errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathRef {
    segments: Vec<PathSegment>,
}

impl PathRef {
    /// Empty path.
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Prepend a segment (errors bubble outward, so wrapping prepends).
    pub fn prepend(&mut self, segment: PathSegment) {
        self.segments.insert(0, segment);
    }

    /// The segments, outermost first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Whether any segment has been recorded.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for PathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("->")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Error produced while resolving or running a deserialization.
#[derive(Debug, Clone, PartialEq)]
pub enum BindError {
    /// The type itself cannot be instantiated as configured. Fatal at
    /// resolution time, cached, never retried.
    BadTypeDefinition {
        /// Offending type.
        type_name: String,
        /// Formatted diagnostic.
        detail: String,
    },
    /// A capability was invoked on a value instantiator that does not
    /// support it. Indicates a caller bug, not bad input.
    InvalidDefinition {
        /// Offending type.
        type_name: String,
        /// Formatted diagnostic.
        detail: String,
    },
    /// The token stream's shape does not match the target structure.
    MismatchedInput {
        /// What the target expected.
        expected: &'static str,
        /// What the stream held.
        got: String,
        /// Source location, when known.
        span: Option<Span>,
        /// Path through the target structure.
        path: PathRef,
    },
    /// Unknown property encountered with fail-on-unknown enabled.
    UnrecognizedProperty {
        /// The unknown property name.
        property: String,
        /// The type being built.
        type_name: String,
        /// Close known names, best first.
        suggestions: Vec<String>,
        /// Source location, when known.
        span: Option<Span>,
        /// Path through the target structure.
        path: PathRef,
    },
    /// Required creator property absent from the input.
    MissingProperty {
        /// The absent property.
        property: String,
        /// The type being built.
        type_name: String,
        /// Path through the target structure.
        path: PathRef,
    },
    /// A value was rejected (bad coercion, invalid null, out of range).
    InvalidValue {
        /// What was wrong.
        detail: String,
        /// Source location, when known.
        span: Option<Span>,
        /// Path through the target structure.
        path: PathRef,
    },
    /// An object id was referenced before (and never) being defined.
    UnresolvedForwardReference {
        /// The unresolved id.
        id: IdKey,
    },
    /// The tokenizer reported a stream-level failure.
    Token(TokenError),
}

impl BindError {
    /// Shorthand for a mismatched-input error without location.
    pub fn mismatched(expected: &'static str, got: impl Into<String>) -> Self {
        BindError::MismatchedInput {
            expected,
            got: got.into(),
            span: None,
            path: PathRef::root(),
        }
    }

    /// Shorthand for a definition error.
    pub fn bad_definition(type_name: impl Into<String>, detail: impl Into<String>) -> Self {
        BindError::BadTypeDefinition {
            type_name: type_name.into(),
            detail: detail.into(),
        }
    }

    /// Shorthand for an invalid-value error without location.
    pub fn invalid_value(detail: impl Into<String>) -> Self {
        BindError::InvalidValue {
            detail: detail.into(),
            span: None,
            path: PathRef::root(),
        }
    }

    /// Attach a span to location-bearing variants; no-op otherwise.
    pub fn with_span(mut self, at: Span) -> Self {
        match &mut self {
            BindError::MismatchedInput { span, .. }
            | BindError::UnrecognizedProperty { span, .. }
            | BindError::InvalidValue { span, .. } => {
                if span.is_none() {
                    *span = Some(at);
                }
            }
            _ => {}
        }
        self
    }

    /// Prepend a path segment to data-level variants.
    ///
    /// Definition errors pass through untouched: they are about the type,
    /// not about a location in one input.
    pub fn prepend_path(mut self, segment: PathSegment) -> Self {
        match &mut self {
            BindError::MismatchedInput { path, .. }
            | BindError::UnrecognizedProperty { path, .. }
            | BindError::MissingProperty { path, .. }
            | BindError::InvalidValue { path, .. } => path.prepend(segment),
            _ => {}
        }
        self
    }

    /// Whether this is a definition-time error (cached, never retried).
    pub const fn is_definition_error(&self) -> bool {
        matches!(
            self,
            BindError::BadTypeDefinition { .. } | BindError::InvalidDefinition { .. }
        )
    }

    /// The reference path, for variants that carry one.
    pub fn path(&self) -> Option<&PathRef> {
        match self {
            BindError::MismatchedInput { path, .. }
            | BindError::UnrecognizedProperty { path, .. }
            | BindError::MissingProperty { path, .. }
            | BindError::InvalidValue { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::BadTypeDefinition { type_name, detail } => {
                write!(f, "cannot construct instance of `{type_name}`: {detail}")
            }
            BindError::InvalidDefinition { type_name, detail } => {
                write!(f, "invalid definition for `{type_name}`: {detail}")
            }
            BindError::MismatchedInput {
                expected,
                got,
                path,
                ..
            } => {
                write!(f, "expected {expected}, got {got}")?;
                if !path.is_empty() {
                    write!(f, " (at {path})")?;
                }
                Ok(())
            }
            BindError::UnrecognizedProperty {
                property,
                type_name,
                suggestions,
                path,
                ..
            } => {
                write!(f, "unrecognized property `{property}` for `{type_name}`")?;
                if let Some(best) = suggestions.first() {
                    write!(f, " (did you mean `{best}`?)")?;
                }
                if !path.is_empty() {
                    write!(f, " (at {path})")?;
                }
                Ok(())
            }
            BindError::MissingProperty {
                property,
                type_name,
                path,
            } => {
                write!(
                    f,
                    "missing required creator property `{property}` for `{type_name}`"
                )?;
                if !path.is_empty() {
                    write!(f, " (at {path})")?;
                }
                Ok(())
            }
            BindError::InvalidValue { detail, path, .. } => {
                write!(f, "invalid value: {detail}")?;
                if !path.is_empty() {
                    write!(f, " (at {path})")?;
                }
                Ok(())
            }
            BindError::UnresolvedForwardReference { id } => {
                write!(f, "unresolved forward reference to object id {id}")
            }
            BindError::Token(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for BindError {}

impl From<TokenError> for BindError {
    fn from(err: TokenError) -> Self {
        BindError::Token(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_outside_in() {
        let err = BindError::mismatched("integer", "string")
            .prepend_path(PathSegment::Index {
                type_name: "List<int>".into(),
                index: 3,
            })
            .prepend_path(PathSegment::Property {
                type_name: "Config".into(),
                property: "ports".into(),
            });
        let rendered = err.to_string();
        assert!(rendered.contains("Config[\"ports\"]->List<int>[3]"), "{rendered}");
    }

    #[test]
    fn definition_errors_ignore_path_wrapping() {
        let err = BindError::bad_definition("Broken", "ambiguous creators").prepend_path(
            PathSegment::Index {
                type_name: "List<Broken>".into(),
                index: 0,
            },
        );
        assert!(err.is_definition_error());
        assert_eq!(err.path(), None);
    }
}
