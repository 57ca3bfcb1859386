//! Value instantiators: the resolved, durable instantiation strategy.
//!
//! Resolution collapses all creator candidates of a type into exactly one
//! [`CreatorKind`] — a closed tagged union decided once and cached. The
//! operations of the contract are each valid only when the matching
//! capability flag holds; invoking an unsupported one is an
//! invalid-definition error (a caller bug), never a data error.

use std::sync::Arc;

use databind_core::{BindError, Callable, ScalarKind, TypeDesc, Value};

use crate::context::DeserContext;
use crate::creator::CreatorProperty;

/// An injected argument slot of a delegating creator.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectedSlot {
    /// Positional index within the creator invocation.
    pub slot: usize,
    /// Injection id looked up in the per-call injectable values.
    pub id: String,
}

/// The closed set of instantiation strategies.
#[derive(Debug, PartialEq)]
pub enum CreatorKind {
    /// Zero-argument construction.
    Default {
        /// The zero-argument creator.
        callable: Callable,
    },
    /// Construction from a single scalar.
    Scalar {
        /// Which scalar the creator takes.
        kind: ScalarKind,
        /// Annotated (`true`) vs auto-detected single-arg creator.
        explicit: bool,
        /// The single-argument creator.
        callable: Callable,
    },
    /// Construction by delegation to one generically-deserialized value.
    Delegating {
        /// The creator.
        callable: Callable,
        /// Total argument count.
        arity: usize,
        /// Position of the delegate argument.
        delegate_slot: usize,
        /// Declared type of the delegate argument.
        delegate_type: TypeDesc,
        /// Injected argument slots.
        injections: Vec<InjectedSlot>,
    },
    /// Construction from an ordered list of named/injected property slots.
    PropertiesBased {
        /// The creator.
        callable: Callable,
        /// Ordered argument slots.
        properties: Vec<CreatorProperty>,
    },
}

impl CreatorKind {
    /// Variant tag for diagnostics and precedence tests.
    pub const fn variant_name(&self) -> &'static str {
        match self {
            CreatorKind::Default { .. } => "default",
            CreatorKind::Scalar { .. } => "scalar",
            CreatorKind::Delegating { .. } => "delegating",
            CreatorKind::PropertiesBased { .. } => "properties-based",
        }
    }
}

/// The resolved, immutable instantiation strategy for one type.
#[derive(Debug, PartialEq)]
pub struct ValueInstantiator {
    type_name: Arc<str>,
    kind: CreatorKind,
}

impl ValueInstantiator {
    /// Wrap a resolved strategy.
    pub fn new(type_name: impl Into<Arc<str>>, kind: CreatorKind) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
        }
    }

    /// The target type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The resolved strategy.
    pub fn kind(&self) -> &CreatorKind {
        &self.kind
    }

    /// Whether zero-argument creation is supported.
    pub fn can_create_default(&self) -> bool {
        match &self.kind {
            CreatorKind::Default { .. } => true,
            CreatorKind::PropertiesBased { properties, .. } => properties.is_empty(),
            _ => false,
        }
    }

    /// Whether creation from the given scalar kind is supported.
    pub fn can_create_from_scalar(&self, kind: ScalarKind) -> bool {
        matches!(&self.kind, CreatorKind::Scalar { kind: k, .. } if *k == kind)
    }

    /// Whether delegate-based creation is supported.
    pub fn can_create_using_delegate(&self) -> bool {
        matches!(&self.kind, CreatorKind::Delegating { .. })
    }

    /// Whether property-argument creation is supported.
    pub fn can_create_from_object(&self) -> bool {
        matches!(&self.kind, CreatorKind::PropertiesBased { .. })
    }

    /// Ordered creator properties, when properties-based.
    pub fn properties(&self) -> &[CreatorProperty] {
        match &self.kind {
            CreatorKind::PropertiesBased { properties, .. } => properties,
            _ => &[],
        }
    }

    /// Declared delegate type, when delegating.
    pub fn delegate_type(&self) -> Option<&TypeDesc> {
        match &self.kind {
            CreatorKind::Delegating { delegate_type, .. } => Some(delegate_type),
            _ => None,
        }
    }

    fn unsupported(&self, operation: &str) -> BindError {
        BindError::InvalidDefinition {
            type_name: self.type_name.to_string(),
            detail: format!(
                "instantiator ({}) does not support {operation}",
                self.kind.variant_name()
            ),
        }
    }

    /// Creation failures raised by user code surface as definition errors,
    /// distinct from data-validation failures.
    fn invoke(&self, callable: &Callable, args: Vec<Value>) -> Result<Value, BindError> {
        callable.invoke(args).map_err(|message| {
            BindError::bad_definition(
                self.type_name.to_string(),
                format!("creator `{}` failed: {message}", callable.name()),
            )
        })
    }

    /// Build the default instance.
    pub fn create_default(&self, _ctxt: &mut DeserContext<'_>) -> Result<Value, BindError> {
        match &self.kind {
            CreatorKind::Default { callable } => self.invoke(callable, Vec::new()),
            CreatorKind::PropertiesBased {
                callable,
                properties,
            } if properties.is_empty() => self.invoke(callable, Vec::new()),
            _ => Err(self.unsupported("default creation")),
        }
    }

    /// Build from a single scalar of the resolved kind.
    pub fn create_from_scalar(
        &self,
        _ctxt: &mut DeserContext<'_>,
        kind: ScalarKind,
        value: Value,
    ) -> Result<Value, BindError> {
        match &self.kind {
            CreatorKind::Scalar {
                kind: k, callable, ..
            } if *k == kind => self.invoke(callable, vec![value]),
            _ => Err(self.unsupported(kind.name())),
        }
    }

    /// Build from a string.
    pub fn create_from_string(
        &self,
        ctxt: &mut DeserContext<'_>,
        value: impl Into<String>,
    ) -> Result<Value, BindError> {
        self.create_from_scalar(ctxt, ScalarKind::Str, Value::Str(value.into()))
    }

    /// Build from an `int`.
    pub fn create_from_int(
        &self,
        ctxt: &mut DeserContext<'_>,
        value: i64,
    ) -> Result<Value, BindError> {
        self.create_from_scalar(ctxt, ScalarKind::Int, Value::Int(value))
    }

    /// Build from a `long`.
    pub fn create_from_long(
        &self,
        ctxt: &mut DeserContext<'_>,
        value: i64,
    ) -> Result<Value, BindError> {
        self.create_from_scalar(ctxt, ScalarKind::Long, Value::Int(value))
    }

    /// Build from a `double`.
    pub fn create_from_double(
        &self,
        ctxt: &mut DeserContext<'_>,
        value: f64,
    ) -> Result<Value, BindError> {
        self.create_from_scalar(ctxt, ScalarKind::Double, Value::Double(value))
    }

    /// Build from a boolean.
    pub fn create_from_bool(
        &self,
        ctxt: &mut DeserContext<'_>,
        value: bool,
    ) -> Result<Value, BindError> {
        self.create_from_scalar(ctxt, ScalarKind::Bool, Value::Bool(value))
    }

    /// Build from a wide integer.
    pub fn create_from_big_int(
        &self,
        ctxt: &mut DeserContext<'_>,
        value: i128,
    ) -> Result<Value, BindError> {
        self.create_from_scalar(ctxt, ScalarKind::BigInt, Value::BigInt(value))
    }

    /// Build from a decimal.
    pub fn create_from_decimal(
        &self,
        ctxt: &mut DeserContext<'_>,
        value: rust_decimal::Decimal,
    ) -> Result<Value, BindError> {
        self.create_from_scalar(ctxt, ScalarKind::Decimal, Value::Decimal(value))
    }

    /// Build by delegation, filling injected slots from the context.
    pub fn create_using_delegate(
        &self,
        ctxt: &mut DeserContext<'_>,
        delegate: Value,
    ) -> Result<Value, BindError> {
        let CreatorKind::Delegating {
            callable,
            arity,
            delegate_slot,
            injections,
            ..
        } = &self.kind
        else {
            return Err(self.unsupported("delegate creation"));
        };
        let mut args = vec![Value::Null; *arity];
        args[*delegate_slot] = delegate;
        for injected in injections {
            args[injected.slot] = ctxt.injectable(&injected.id, &self.type_name)?;
        }
        self.invoke(callable, args)
    }

    /// Build from positionally-aligned property arguments.
    ///
    /// `args[i]` corresponds to `properties()[i]`; `None` marks a slot the
    /// input did not provide. Absent slots fill from injection, then the
    /// default-value text; a required slot with neither fails with a
    /// missing-property error at this point, never earlier.
    pub fn create_from_object_with(
        &self,
        ctxt: &mut DeserContext<'_>,
        args: Vec<Option<Value>>,
    ) -> Result<Value, BindError> {
        let CreatorKind::PropertiesBased {
            callable,
            properties,
        } = &self.kind
        else {
            return Err(self.unsupported("property-based creation"));
        };
        debug_assert_eq!(args.len(), properties.len());

        let mut filled = Vec::with_capacity(properties.len());
        for (property, arg) in properties.iter().zip(args) {
            let value = match arg {
                Some(value) => value,
                None => self.fill_absent_slot(ctxt, property)?,
            };
            filled.push(value);
        }
        self.invoke(callable, filled)
    }

    fn fill_absent_slot(
        &self,
        ctxt: &mut DeserContext<'_>,
        property: &CreatorProperty,
    ) -> Result<Value, BindError> {
        if let Some(id) = property.injection() {
            return ctxt.injectable(id, &self.type_name);
        }
        if let Some(default) = property.parse_default_text(&self.type_name)? {
            return Ok(default);
        }
        if property.is_any_setter() {
            return Ok(Value::Object(Default::default()));
        }
        if property.metadata().required {
            return Err(BindError::MissingProperty {
                property: property.name().unwrap_or("<unnamed>").to_owned(),
                type_name: self.type_name.to_string(),
                path: databind_core::PathRef::root(),
            });
        }
        property.deser().null_value(ctxt)
    }
}
