//! Creator collector: slots for every discovered creator, conflict rules,
//! and the precedence-ordered build into a single instantiation strategy.
//!
//! Conflict rules: an explicit registration always outranks an implicit
//! one; two explicit registrations for the same slot are a definition
//! error; among several explicit delegating creators, declaration order
//! wins; two competing implicit delegating constructors are the ambiguity
//! the engine must reject rather than pick silently.

use databind_core::{BindError, Callable, ScalarKind, TypeDesc, TypeSpec};

use crate::context::DeserContext;
use crate::creator::PropertyDraft;
use crate::instantiator::{CreatorKind, InjectedSlot, ValueInstantiator};

/// A registered delegating creator.
pub(crate) struct DelegatingReg {
    pub callable: Callable,
    pub arity: usize,
    pub delegate_slot: usize,
    pub delegate_type: TypeDesc,
    pub injections: Vec<InjectedSlot>,
    pub desc: String,
}

/// A registered single-scalar creator.
pub(crate) struct ScalarReg {
    pub kind: ScalarKind,
    pub callable: Callable,
    pub from_factory: bool,
}

/// A registered properties-based creator.
pub(crate) struct PropsReg {
    pub callable: Callable,
    pub drafts: Vec<PropertyDraft>,
    /// Zero-argument factory discovered as properties-based: degrades to
    /// the default strategy.
    pub as_default: bool,
    pub desc: String,
}

/// First-claimed explicit delegating-family registration.
enum ExplicitDelegate {
    Scalar(ScalarReg),
    Delegating(DelegatingReg),
}

/// Accumulates discovered creators for one type, then builds the single
/// resolved strategy.
pub(crate) struct CreatorCollector {
    type_name: String,
    default_: Option<Callable>,
    props: Option<PropsReg>,
    props_explicit: bool,
    explicit_delegate: Option<ExplicitDelegate>,
    implicit_scalars: Vec<ScalarReg>,
    implicit_delegating: Option<DelegatingReg>,
}

impl CreatorCollector {
    pub(crate) fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            default_: None,
            props: None,
            props_explicit: false,
            explicit_delegate: None,
            implicit_scalars: Vec::new(),
            implicit_delegating: None,
        }
    }

    /// Register the zero-argument constructor; first one wins.
    pub(crate) fn set_default(&mut self, callable: Callable) {
        if self.default_.is_none() {
            self.default_ = Some(callable);
        }
    }

    /// Register a properties-based creator.
    pub(crate) fn set_properties(
        &mut self,
        reg: PropsReg,
        explicit: bool,
    ) -> Result<(), BindError> {
        match (&self.props, self.props_explicit, explicit) {
            (Some(existing), true, true) => Err(BindError::bad_definition(
                &self.type_name,
                format!(
                    "conflicting properties-based creators: {} and {}",
                    existing.desc, reg.desc
                ),
            )),
            (Some(_), true, false) => Ok(()),
            _ => {
                self.props = Some(reg);
                self.props_explicit = explicit;
                Ok(())
            }
        }
    }

    /// Register an explicitly-annotated single-scalar creator. Among
    /// several explicit delegating-family creators, the first registered
    /// (declaration order) wins.
    pub(crate) fn add_explicit_scalar(&mut self, reg: ScalarReg) {
        if self.explicit_delegate.is_none() {
            self.explicit_delegate = Some(ExplicitDelegate::Scalar(reg));
        }
    }

    /// Register an explicitly-annotated delegating creator; declaration
    /// order wins.
    pub(crate) fn add_explicit_delegating(&mut self, reg: DelegatingReg) {
        if self.explicit_delegate.is_none() {
            self.explicit_delegate = Some(ExplicitDelegate::Delegating(reg));
        }
    }

    /// Whether an explicit delegating-family creator has been claimed.
    pub(crate) fn has_explicit_delegate(&self) -> bool {
        self.explicit_delegate.is_some()
    }

    /// Register an auto-detected single-scalar creator; the first creator
    /// per scalar kind wins.
    pub(crate) fn add_implicit_scalar(&mut self, reg: ScalarReg) {
        let seen = self
            .implicit_scalars
            .iter()
            .any(|existing| existing.kind == reg.kind && existing.from_factory == reg.from_factory);
        if !seen {
            self.implicit_scalars.push(reg);
        }
    }

    /// Register an auto-detected delegating constructor.
    ///
    /// Two competing ones cannot be ordered meaningfully: that is the
    /// ambiguity the engine rejects.
    pub(crate) fn add_implicit_delegating(&mut self, reg: DelegatingReg) -> Result<(), BindError> {
        match &self.implicit_delegating {
            Some(existing) => Err(BindError::bad_definition(
                &self.type_name,
                format!(
                    "more than one argument left as delegating: {} and {} are both \
                     implicit delegating creators",
                    existing.desc, reg.desc
                ),
            )),
            None => {
                self.implicit_delegating = Some(reg);
                Ok(())
            }
        }
    }

    fn pick_scalar(&mut self, from_factory: bool) -> Option<ScalarReg> {
        for kind in ScalarKind::DETECTION_ORDER {
            if let Some(pos) = self
                .implicit_scalars
                .iter()
                .position(|reg| reg.kind == kind && reg.from_factory == from_factory)
            {
                return Some(self.implicit_scalars.remove(pos));
            }
        }
        None
    }

    /// Collapse everything into the single resolved strategy, by
    /// precedence: properties-based, explicit delegating family, implicit
    /// delegating constructor, implicit delegating factory, default.
    pub(crate) fn build(
        mut self,
        ctxt: &mut DeserContext<'_>,
        spec: &TypeSpec,
    ) -> Result<ValueInstantiator, BindError> {
        if let Some(props) = self.props.take() {
            if props.as_default {
                log::debug!(
                    "{}: zero-argument factory {} registered as default strategy",
                    self.type_name,
                    props.desc
                );
                return Ok(ValueInstantiator::new(
                    self.type_name,
                    CreatorKind::Default {
                        callable: props.callable,
                    },
                ));
            }
            let mut properties = Vec::with_capacity(props.drafts.len());
            for draft in props.drafts {
                properties.push(draft.into_resolved(ctxt, spec.name())?);
            }
            return Ok(ValueInstantiator::new(
                self.type_name,
                CreatorKind::PropertiesBased {
                    callable: props.callable,
                    properties,
                },
            ));
        }

        if let Some(explicit) = self.explicit_delegate.take() {
            let kind = match explicit {
                ExplicitDelegate::Scalar(reg) => CreatorKind::Scalar {
                    kind: reg.kind,
                    explicit: true,
                    callable: reg.callable,
                },
                ExplicitDelegate::Delegating(reg) => CreatorKind::Delegating {
                    callable: reg.callable,
                    arity: reg.arity,
                    delegate_slot: reg.delegate_slot,
                    delegate_type: reg.delegate_type,
                    injections: reg.injections,
                },
            };
            return Ok(ValueInstantiator::new(self.type_name, kind));
        }

        if let Some(reg) = self.pick_scalar(false) {
            return Ok(ValueInstantiator::new(
                self.type_name,
                CreatorKind::Scalar {
                    kind: reg.kind,
                    explicit: false,
                    callable: reg.callable,
                },
            ));
        }

        if let Some(reg) = self.implicit_delegating.take() {
            return Ok(ValueInstantiator::new(
                self.type_name,
                CreatorKind::Delegating {
                    callable: reg.callable,
                    arity: reg.arity,
                    delegate_slot: reg.delegate_slot,
                    delegate_type: reg.delegate_type,
                    injections: reg.injections,
                },
            ));
        }

        if let Some(reg) = self.pick_scalar(true) {
            return Ok(ValueInstantiator::new(
                self.type_name,
                CreatorKind::Scalar {
                    kind: reg.kind,
                    explicit: false,
                    callable: reg.callable,
                },
            ));
        }

        if let Some(callable) = self.default_.take() {
            return Ok(ValueInstantiator::new(
                self.type_name,
                CreatorKind::Default { callable },
            ));
        }

        Err(BindError::bad_definition(
            self.type_name,
            "no suitable creator found: no annotated creator, no usable implicit \
             constructor, and no default constructor",
        ))
    }
}
