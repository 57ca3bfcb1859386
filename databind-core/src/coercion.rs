//! Coercion and null-handling policy tables.
//!
//! A coercion decides what happens when the input shape does not natively
//! match the target shape (empty string where an array is expected, string
//! where a number is expected, and so on). Policies are layered: a lookup
//! consults the per-logical-shape table first, then the per-input defaults,
//! then the caller-provided fallback. Blank strings have their own policy,
//! independent of the empty-string one.

use std::collections::HashMap;

use crate::types::LogicalShape;

/// Configured response to a shape mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoercionAction {
    /// Report a mismatched-input error.
    Fail,
    /// Produce `null`.
    AsNull,
    /// Produce the target's empty value.
    AsEmpty,
    /// Attempt a value conversion (e.g. parse the string).
    TryConvert,
}

/// Classified input shape driving a coercion lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoercionInput {
    /// The empty string `""`.
    EmptyString,
    /// A whitespace-only string.
    BlankString,
    /// Any other string.
    String,
    /// An integral number.
    Integer,
    /// A floating-point number.
    Float,
    /// A boolean.
    Boolean,
}

/// Layered coercion configuration.
#[derive(Debug, Clone, Default)]
pub struct CoercionConfigs {
    per_shape: HashMap<(LogicalShape, CoercionInput), CoercionAction>,
    defaults: HashMap<CoercionInput, CoercionAction>,
    blank_string: Option<CoercionAction>,
}

impl CoercionConfigs {
    /// Empty configuration: every lookup falls through to the caller default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the action for one target shape and input shape.
    pub fn with_action(
        mut self,
        shape: LogicalShape,
        input: CoercionInput,
        action: CoercionAction,
    ) -> Self {
        self.per_shape.insert((shape, input), action);
        self
    }

    /// Set the default action for one input shape, across target shapes.
    pub fn with_default(mut self, input: CoercionInput, action: CoercionAction) -> Self {
        self.defaults.insert(input, action);
        self
    }

    /// Set the blank-string policy, overriding the empty-string fallthrough.
    pub fn with_blank_string(mut self, action: CoercionAction) -> Self {
        self.blank_string = Some(action);
        self
    }

    /// Resolve the action for a target/input pair.
    ///
    /// Blank strings fall back to the empty-string configuration when no
    /// blank-specific policy exists, then to `fallback`.
    pub fn action_for(
        &self,
        shape: LogicalShape,
        input: CoercionInput,
        fallback: CoercionAction,
    ) -> CoercionAction {
        if let Some(action) = self.per_shape.get(&(shape, input)) {
            return *action;
        }
        if let Some(action) = self.defaults.get(&input) {
            return *action;
        }
        if input == CoercionInput::BlankString {
            if let Some(action) = self.blank_string {
                return action;
            }
            return self.action_for(shape, CoercionInput::EmptyString, fallback);
        }
        fallback
    }
}

/// Null-handling policy for one property or content slot.
///
/// Merged from three sources in priority order: per-property explicit
/// setting, per-type configuration override, global default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPolicy {
    /// Assign the null as-is.
    #[default]
    Set,
    /// Drop the null (no slot written, no element added).
    Skip,
    /// Report an invalid-null error.
    Fail,
    /// Substitute the slot's empty value.
    AsEmpty,
}

impl NullPolicy {
    /// Parse a policy from attribute text.
    pub fn parse(text: &str) -> Option<NullPolicy> {
        match text {
            "set" => Some(NullPolicy::Set),
            "skip" => Some(NullPolicy::Skip),
            "fail" => Some(NullPolicy::Fail),
            "as_empty" => Some(NullPolicy::AsEmpty),
            _ => None,
        }
    }
}

/// Merge a null policy from layered optional sources.
///
/// Priority: per-property explicit -> per-type override -> global default.
pub fn merge_null_policy(
    explicit: Option<NullPolicy>,
    per_type: Option<NullPolicy>,
    global: NullPolicy,
) -> NullPolicy {
    explicit.or(per_type).unwrap_or(global)
}
