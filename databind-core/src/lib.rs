//! Data model, token contract and type descriptors for the databind engine.
//!
//! This crate holds the leaf pieces the engine crate (`databind`) builds on:
//!
//! - [`Value`] — the owned dynamic value instantiation produces
//! - [`Token`] / [`TokenSource`] — the narrow contract to the tokenizer
//! - [`TypeDesc`] — immutable generic-aware type descriptors (cache keys)
//! - [`TypeSpec`] / [`TypeRegistry`] — registered per-type metadata with
//!   declared constructors, factories and attribute annotations
//! - coercion/null policy tables and the error taxonomy
//!
//! Nothing here consumes tokens or resolves creators; that is the engine's
//! job.

mod class;
mod coercion;
mod error;
mod token;
mod types;
mod value;

pub use class::{
    Attr, AttrValue, Attrs, Callable, Constructor, EnumConstant, FactoryMethod, IdentitySpec,
    MemberRef, ParamSpec, TypeRegistry, TypeSpec, TypeSpecBuilder, Visibility,
};
pub use coercion::{merge_null_policy, CoercionAction, CoercionConfigs, CoercionInput, NullPolicy};
pub use error::{BindError, PathRef, PathSegment};
pub use token::{ScalarToken, Span, Token, TokenError, TokenKind, TokenSlice, TokenSource};
pub use types::{CollectionKind, LogicalShape, MapKind, RefKind, TypeDesc, TypeShape};
pub use value::{IdKey, ScalarKind, Value, ValueKind, ValueMap};
