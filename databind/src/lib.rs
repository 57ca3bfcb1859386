//! Type-driven JSON data binding: creator resolution and container
//! deserialization.
//!
//! Given a [`TypeDesc`](databind_core::TypeDesc) and a token stream, the
//! engine decides *how* to build an instance — which constructor or factory
//! ("creator") to call, with which arguments sourced from which JSON
//! constructs — and runs the container algorithms (collections, maps,
//! arrays, enums, references) that consume tokens and populate the target.
//!
//! The moving parts, leaf first:
//!
//! - [`introspect`] — the capability oracle answering structural questions
//!   about registered types, composed as an ordered chain
//! - [`creator`] — candidate modeling and the resolution pipeline that
//!   collapses all creators of a type into one strategy
//! - [`instantiator`] — the resolved, immutable [`ValueInstantiator`]
//! - [`deser`] — the container and scalar deserializers
//! - [`refs`] — object-id tracking and the forward-reference accumulator
//! - [`factory`] — descriptor-to-deserializer dispatch plus the shared,
//!   negative-caching resolution cache
//! - [`Binder`] — the caller-facing entry point
//!
//! ```
//! use databind::{BindConfig, Binder};
//! use databind_core::{TokenKind, TokenSlice, TypeDesc, TypeRegistry, Value};
//!
//! let binder = Binder::new(BindConfig::new(TypeRegistry::new()));
//! let target = TypeDesc::list_of(TypeDesc::long());
//! let mut tokens = TokenSlice::of(vec![
//!     TokenKind::ArrayStart,
//!     TokenKind::int(1),
//!     TokenKind::int(2),
//!     TokenKind::ArrayEnd,
//! ]);
//! let value = binder.read_value(&mut tokens, &target).unwrap();
//! assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(2)]));
//! ```

mod binder;
mod config;
mod context;
pub mod creator;
pub mod deser;
pub mod factory;
mod instantiator;
pub mod introspect;
pub mod refs;

pub use binder::Binder;
pub use config::{BindConfig, InjectableValues, TypeOverride};
pub use context::DeserContext;
pub use instantiator::{CreatorKind, InjectedSlot, ValueInstantiator};
