//! Creator discovery: candidates, the collector, and the resolution engine.

mod collector;
mod property;
mod resolver;

pub use property::{CreatorProperty, PropertyDraft, PropertyMetadata};
pub(crate) use resolver::resolve_value_instantiator;

use databind_core::{MemberRef, ScalarKind, TypeDesc, TypeShape};

use crate::introspect::{Introspector, IntrospectorChain, NameTransformer};

/// One parameter of a candidate creator, with oracle answers applied.
#[derive(Debug, Clone)]
pub struct CandidateParam {
    /// Resolved logical name: explicit override, else declaration name.
    pub name: Option<String>,
    /// Injection id, when supplied outside the stream.
    pub injection: Option<String>,
    /// Unwrapping transformer, when present.
    pub unwrapper: Option<NameTransformer>,
    /// Declared parameter type.
    pub declared: TypeDesc,
}

impl CandidateParam {
    /// Whether the slot is satisfied without consuming a delegate value.
    pub fn is_satisfied_without_delegate(&self) -> bool {
        self.injection.is_some() || self.unwrapper.is_some()
    }
}

/// A constructor or factory paired with resolved parameter data.
///
/// Built fresh during discovery for one target type and discarded once the
/// value instantiator exists.
#[derive(Debug, Clone)]
pub struct CreatorCandidate<'a> {
    member: MemberRef<'a>,
    params: Vec<CandidateParam>,
}

impl<'a> CreatorCandidate<'a> {
    /// Pair a member with the oracle's per-parameter answers.
    pub fn introspect(oracle: &IntrospectorChain, member: MemberRef<'a>) -> Self {
        let params = member
            .params()
            .iter()
            .map(|param| CandidateParam {
                name: oracle
                    .find_parameter_name(param)
                    .or_else(|| param.name.clone()),
                injection: oracle.find_injectable_value(param),
                unwrapper: oracle.find_unwrapping_transformer(param),
                declared: param.declared.clone(),
            })
            .collect();
        Self { member, params }
    }

    /// The underlying member.
    pub fn member(&self) -> MemberRef<'a> {
        self.member
    }

    /// Resolved parameters.
    pub fn params(&self) -> &[CandidateParam] {
        &self.params
    }

    /// Argument count.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Scalar kind of the single argument, when there is exactly one and it
    /// is scalar-typed. First match in the detection order wins; with a
    /// single declared kind the order collapses to a direct lookup.
    pub fn single_scalar_kind(&self) -> Option<ScalarKind> {
        match self.params.as_slice() {
            [only] => match only.declared.shape() {
                TypeShape::Scalar(kind) => ScalarKind::DETECTION_ORDER
                    .into_iter()
                    .find(|candidate| candidate == kind),
                _ => None,
            },
            _ => None,
        }
    }

    /// Indexes of parameters not injected (explicit-delegating rule).
    pub fn non_injected(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, param)| param.injection.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Indexes of parameters neither injected nor unwrapped
    /// (implicit-delegating rule).
    pub fn delegate_candidates(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, param)| !param.is_satisfied_without_delegate())
            .map(|(i, _)| i)
            .collect()
    }
}
