//! The creator resolution pipeline.
//!
//! Produces exactly one [`ValueInstantiator`] per type, or a definition
//! error. Every step is an `Option`/`Result`-returning stage chained in
//! priority order; hard failures are reserved for genuine contract
//! violations (ambiguous shapes, unnamed un-injectable arguments,
//! duplicate any-setters).

use std::sync::Arc;

use databind_core::{merge_null_policy, BindError, TypeSpec};

use crate::config::BindConfig;
use crate::context::DeserContext;
use crate::creator::collector::{CreatorCollector, DelegatingReg, PropsReg, ScalarReg};
use crate::creator::{CreatorCandidate, PropertyDraft, PropertyMetadata};
use crate::instantiator::{InjectedSlot, ValueInstantiator};
use crate::introspect::{CreatorMode, Introspector, IntrospectorChain};

/// Resolve the instantiation strategy for a registered type.
pub(crate) fn resolve_value_instantiator(
    ctxt: &mut DeserContext<'_>,
    spec: &TypeSpec,
) -> Result<Arc<ValueInstantiator>, BindError> {
    let config = ctxt.config();
    let oracle = config.introspector();

    // Explicit override escape hatch: the oracle may hand back a complete
    // instantiator for the type.
    if let Some(instantiator) = oracle.find_value_instantiator(spec) {
        log::debug!("{}: using oracle-supplied value instantiator", spec.name());
        return Ok(instantiator);
    }

    let mut collector = CreatorCollector::new(spec.name());

    // Classify members by creator annotation.
    let mut explicit_props = Vec::new();
    let mut explicit_delegating = Vec::new();
    let mut implicit = Vec::new();
    for member in spec.creator_members() {
        match oracle.find_creator_annotation(spec, member) {
            Some(CreatorMode::Disabled) => continue,
            Some(CreatorMode::PropertiesBased) => {
                explicit_props.push(CreatorCandidate::introspect(oracle, member));
            }
            Some(CreatorMode::Delegating) => {
                explicit_delegating.push(CreatorCandidate::introspect(oracle, member));
            }
            None => implicit.push(CreatorCandidate::introspect(oracle, member)),
        }
    }

    // Step 1: explicit properties-based primary creator.
    if explicit_props.len() > 1 {
        return Err(BindError::bad_definition(
            spec.name(),
            format!(
                "conflicting properties-based creators: {} and {}",
                explicit_props[0].member().describe(),
                explicit_props[1].member().describe()
            ),
        ));
    }
    let props_choice = match explicit_props.pop() {
        Some(candidate) => Some((candidate, true)),
        None => oracle
            .find_preferred_creator(spec)
            .filter(|preferred| oracle.find_creator_annotation(spec, *preferred).is_none())
            .map(|preferred| (CreatorCandidate::introspect(oracle, preferred), false)),
    };
    if let Some((candidate, explicit)) = props_choice {
        register_properties_creator(&mut collector, config, oracle, spec, &candidate, explicit)?;
    }

    // Step 2: explicit delegating creators, declaration order.
    let had_explicit_delegating = !explicit_delegating.is_empty();
    for candidate in &explicit_delegating {
        register_explicit_delegating(&mut collector, spec, candidate)?;
    }

    // Steps 3-5: implicit constructors, default constructor, implicit
    // factories. All gated on concreteness and (except the plain default
    // constructor) on implicit detection and visibility.
    if !spec.is_abstract() {
        let min_visibility = config.min_creator_visibility();
        for candidate in implicit.iter().filter(|c| !c.member().is_factory()) {
            if candidate.member().visibility() < min_visibility {
                continue;
            }
            match candidate.arity() {
                0 => collector.set_default(candidate.member().callable().clone()),
                1 if config.implicit_creator_detection() => {
                    if let Some(kind) = candidate.single_scalar_kind() {
                        collector.add_implicit_scalar(ScalarReg {
                            kind,
                            callable: candidate.member().callable().clone(),
                            from_factory: false,
                        });
                    }
                }
                n if n > 1 && config.implicit_creator_detection() => {
                    register_implicit_multi_arg(&mut collector, spec, candidate)?;
                }
                _ => {}
            }
        }

        if !had_explicit_delegating && config.implicit_creator_detection() {
            for candidate in implicit.iter().filter(|c| c.member().is_factory()) {
                if candidate.member().visibility() < min_visibility {
                    continue;
                }
                if let Some(kind) = candidate.single_scalar_kind() {
                    collector.add_implicit_scalar(ScalarReg {
                        kind,
                        callable: candidate.member().callable().clone(),
                        from_factory: true,
                    });
                }
            }
        }
    }

    collector.build(ctxt, spec).map(Arc::new)
}

/// Step 1 worker: resolve each parameter of a properties-based creator to
/// an any-setter marker, a name, or an injection id.
fn register_properties_creator(
    collector: &mut CreatorCollector,
    config: &BindConfig,
    oracle: &IntrospectorChain,
    spec: &TypeSpec,
    candidate: &CreatorCandidate<'_>,
    explicit: bool,
) -> Result<(), BindError> {
    let desc = candidate.member().describe();

    // A zero-argument factory discovered as properties-based is really the
    // default strategy.
    if candidate.arity() == 0 && candidate.member().is_factory() {
        return collector.set_properties(
            PropsReg {
                callable: candidate.member().callable().clone(),
                drafts: Vec::new(),
                as_default: true,
                desc,
            },
            explicit,
        );
    }

    let per_type_nulls = config
        .type_override(spec.name())
        .and_then(|ov| ov.null_policy);
    let mut drafts = Vec::with_capacity(candidate.arity());
    let mut any_setter_seen = false;

    let member_params = candidate.member().params();
    for (slot, (param_spec, cparam)) in member_params
        .iter()
        .zip(candidate.params())
        .enumerate()
    {
        let metadata = PropertyMetadata {
            required: oracle.has_required_marker(param_spec).unwrap_or(false),
            description: oracle.find_property_description(param_spec),
            index: oracle.find_property_index(param_spec),
            default_text: oracle.find_property_default_value(param_spec),
            null_policy: merge_null_policy(
                oracle.find_setter_info(param_spec),
                per_type_nulls,
                config.global_null_policy(),
            ),
        };

        if oracle.has_any_setter(param_spec).unwrap_or(false) {
            if any_setter_seen {
                return Err(BindError::bad_definition(
                    spec.name(),
                    format!("more than one any-setter argument for {desc} (argument #{slot})"),
                ));
            }
            any_setter_seen = true;
            drafts.push(PropertyDraft {
                name: None,
                aliases: Vec::new(),
                declared: cparam.declared.clone(),
                unwrapper: None,
                injection: None,
                any_setter: true,
                creator_slot: slot,
                custom_deser: None,
                custom_content: None,
                metadata,
            });
            continue;
        }

        if cparam.name.is_none() && cparam.injection.is_none() && cparam.unwrapper.is_none() {
            return Err(BindError::bad_definition(
                spec.name(),
                format!(
                    "argument #{slot} of {desc} has no property name annotation and is \
                     not injectable"
                ),
            ));
        }

        drafts.push(PropertyDraft {
            name: cparam.name.clone(),
            aliases: oracle.find_property_aliases(param_spec).unwrap_or_default(),
            declared: cparam.declared.clone(),
            unwrapper: cparam.unwrapper.clone(),
            injection: cparam.injection.clone(),
            any_setter: false,
            creator_slot: slot,
            custom_deser: oracle.find_custom_deserializer(param_spec),
            custom_content: oracle.find_custom_content_deserializer(param_spec),
            metadata,
        });
    }

    collector.set_properties(
        PropsReg {
            callable: candidate.member().callable().clone(),
            drafts,
            as_default: false,
            desc,
        },
        explicit,
    )
}

/// Step 2 worker: exactly one non-injected parameter is the delegate.
fn register_explicit_delegating(
    collector: &mut CreatorCollector,
    spec: &TypeSpec,
    candidate: &CreatorCandidate<'_>,
) -> Result<(), BindError> {
    let desc = candidate.member().describe();
    let non_injected = candidate.non_injected();
    match non_injected.as_slice() {
        [] if candidate.arity() == 0 => {
            // Zero-argument explicit-delegating creators behave like a
            // property creator with no properties.
            collector.set_properties(
                PropsReg {
                    callable: candidate.member().callable().clone(),
                    drafts: Vec::new(),
                    as_default: false,
                    desc,
                },
                true,
            )
        }
        [] => Err(BindError::bad_definition(
            spec.name(),
            format!(
                "delegating creator {desc} has no delegate argument (all {} parameters \
                 are injectable)",
                candidate.arity()
            ),
        )),
        [delegate_slot] => {
            if let Some(kind) = candidate.single_scalar_kind() {
                collector.add_explicit_scalar(ScalarReg {
                    kind,
                    callable: candidate.member().callable().clone(),
                    from_factory: candidate.member().is_factory(),
                });
            } else {
                collector.add_explicit_delegating(DelegatingReg {
                    callable: candidate.member().callable().clone(),
                    arity: candidate.arity(),
                    delegate_slot: *delegate_slot,
                    delegate_type: candidate.params()[*delegate_slot].declared.clone(),
                    injections: injected_slots(candidate),
                    desc,
                });
            }
            Ok(())
        }
        [first, second, ..] => Err(BindError::bad_definition(
            spec.name(),
            format!(
                "more than one argument left as delegating (arguments #{first} and \
                 #{second}) for {desc}"
            ),
        )),
    }
}

/// Step 3 worker: a multi-argument un-annotated constructor is usable only
/// when every parameter but one is injectable; the remainder is the
/// delegate.
fn register_implicit_multi_arg(
    collector: &mut CreatorCollector,
    spec: &TypeSpec,
    candidate: &CreatorCandidate<'_>,
) -> Result<(), BindError> {
    // Unwrapped parameters need a properties-based creator to be bound;
    // they disqualify implicit delegation.
    if candidate.params().iter().any(|p| p.unwrapper.is_some()) {
        return Ok(());
    }
    let open = candidate.delegate_candidates();
    match open.as_slice() {
        [delegate_slot] => collector.add_implicit_delegating(DelegatingReg {
            callable: candidate.member().callable().clone(),
            arity: candidate.arity(),
            delegate_slot: *delegate_slot,
            delegate_type: candidate.params()[*delegate_slot].declared.clone(),
            injections: injected_slots(candidate),
            desc: candidate.member().describe(),
        }),
        [first, second, ..] => {
            // Several unnamed open slots cannot be disambiguated; named
            // ones are simply not implicit-delegating material.
            if open
                .iter()
                .all(|&slot| candidate.params()[slot].name.is_none())
            {
                Err(BindError::bad_definition(
                    spec.name(),
                    format!(
                        "more than one argument (#{first} and #{second}) left as \
                         delegating for {}",
                        candidate.member().describe()
                    ),
                ))
            } else {
                Ok(())
            }
        }
        [] => Ok(()),
    }
}

fn injected_slots(candidate: &CreatorCandidate<'_>) -> Vec<InjectedSlot> {
    candidate
        .params()
        .iter()
        .enumerate()
        .filter_map(|(slot, param)| {
            param.injection.as_ref().map(|id| InjectedSlot {
                slot,
                id: id.clone(),
            })
        })
        .collect()
}
