//! Runtime type specifications: the metadata creator discovery runs against.
//!
//! There is no constructor reflection in Rust, so class-like targets are
//! described explicitly: a [`TypeSpec`] lists the declared constructors and
//! factory methods of one type, each carrying namespaced attribute metadata
//! (the analog of source-level annotations) and a [`Callable`] that actually
//! builds the value. Specs are registered once in a [`TypeRegistry`] and
//! shared immutably from then on.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::TypeDesc;
use crate::value::Value;

/// Attribute value payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Bare marker attribute.
    Flag,
    /// String payload.
    Str(String),
    /// Integer payload.
    Int(i64),
}

/// One attribute: optional namespace, key, payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    /// Namespace for extension attributes, `None` for builtins.
    pub ns: Option<&'static str>,
    /// Attribute key.
    pub key: &'static str,
    /// Payload.
    pub value: AttrValue,
}

/// Ordered attribute list attached to a type, member or parameter.
///
/// Lookups return the first match, so earlier attributes win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attrs {
    entries: Vec<Attr>,
}

impl Attrs {
    /// Empty attribute list.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a builtin attribute.
    pub fn with(mut self, key: &'static str, value: AttrValue) -> Self {
        self.entries.push(Attr {
            ns: None,
            key,
            value,
        });
        self
    }

    /// Append a bare marker attribute.
    pub fn with_flag(self, key: &'static str) -> Self {
        self.with(key, AttrValue::Flag)
    }

    /// Append a string-payload attribute.
    pub fn with_str(self, key: &'static str, value: impl Into<String>) -> Self {
        self.with(key, AttrValue::Str(value.into()))
    }

    /// First payload registered under `key`, builtin namespace.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries
            .iter()
            .find(|attr| attr.ns.is_none() && attr.key == key)
            .map(|attr| &attr.value)
    }

    /// Whether a marker attribute is present.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// String payload under `key`, if present and string-shaped.
    pub fn str_value(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(AttrValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer payload under `key`, if present and integer-shaped.
    pub fn int_value(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(AttrValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// All string payloads registered under `key`, in declaration order.
    pub fn str_values(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|attr| attr.ns.is_none() && attr.key == key)
            .filter_map(|attr| match &attr.value {
                AttrValue::Str(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Member visibility, gating implicit creator discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Visibility {
    /// Private member.
    Private,
    /// Crate-visible member.
    Crate,
    /// Public member.
    Public,
}

/// The function behind a constructor or factory.
///
/// Compared by display name: within one registry a name identifies one
/// function, and name equality is what makes resolved instantiators
/// structurally comparable across repeated resolutions.
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    f: Arc<dyn Fn(Vec<Value>) -> Result<Value, String> + Send + Sync>,
}

impl Callable {
    /// Wrap a function with a display name.
    pub fn new(
        name: impl Into<Arc<str>>,
        f: impl Fn(Vec<Value>) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// Display name for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke with positional arguments.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, String> {
        (self.f)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f) || self.name == other.name
    }
}

/// One declared parameter of a constructor or factory.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Implicit (declaration-site) parameter name, when known.
    pub name: Option<String>,
    /// Declared parameter type.
    pub declared: TypeDesc,
    /// Attribute metadata.
    pub attrs: Attrs,
}

impl ParamSpec {
    /// Named parameter without attributes.
    pub fn named(name: impl Into<String>, declared: TypeDesc) -> Self {
        Self {
            name: Some(name.into()),
            declared,
            attrs: Attrs::new(),
        }
    }

    /// Nameless parameter without attributes.
    pub fn unnamed(declared: TypeDesc) -> Self {
        Self {
            name: None,
            declared,
            attrs: Attrs::new(),
        }
    }

    /// Attach attributes.
    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }
}

/// A declared constructor.
#[derive(Debug, Clone)]
pub struct Constructor {
    /// Ordered parameters.
    pub params: Vec<ParamSpec>,
    /// Visibility, gating implicit discovery.
    pub visibility: Visibility,
    /// Attribute metadata.
    pub attrs: Attrs,
    /// The function that builds the value.
    pub callable: Callable,
}

/// A declared static factory method.
#[derive(Debug, Clone)]
pub struct FactoryMethod {
    /// Method name.
    pub name: String,
    /// Ordered parameters.
    pub params: Vec<ParamSpec>,
    /// Visibility, gating implicit discovery.
    pub visibility: Visibility,
    /// Attribute metadata.
    pub attrs: Attrs,
    /// The function that builds the value.
    pub callable: Callable,
}

/// Reference to a creator member during discovery.
#[derive(Debug, Clone, Copy)]
pub enum MemberRef<'a> {
    /// A constructor.
    Constructor(&'a Constructor),
    /// A factory method.
    Factory(&'a FactoryMethod),
}

impl<'a> MemberRef<'a> {
    /// Ordered parameters.
    pub fn params(&self) -> &'a [ParamSpec] {
        match self {
            MemberRef::Constructor(c) => &c.params,
            MemberRef::Factory(m) => &m.params,
        }
    }

    /// Attribute metadata.
    pub fn attrs(&self) -> &'a Attrs {
        match self {
            MemberRef::Constructor(c) => &c.attrs,
            MemberRef::Factory(m) => &m.attrs,
        }
    }

    /// Visibility.
    pub fn visibility(&self) -> Visibility {
        match self {
            MemberRef::Constructor(c) => c.visibility,
            MemberRef::Factory(m) => m.visibility,
        }
    }

    /// The function that builds the value.
    pub fn callable(&self) -> &'a Callable {
        match self {
            MemberRef::Constructor(c) => &c.callable,
            MemberRef::Factory(m) => &m.callable,
        }
    }

    /// Whether this member is a factory.
    pub const fn is_factory(&self) -> bool {
        matches!(self, MemberRef::Factory(_))
    }

    /// Diagnostic description (`constructor(2 args)` / `factory from_parts`).
    pub fn describe(&self) -> String {
        match self {
            MemberRef::Constructor(c) => format!("constructor({} args)", c.params.len()),
            MemberRef::Factory(m) => format!("factory {}", m.name),
        }
    }
}

/// One constant of a registered enum.
#[derive(Debug, Clone)]
pub struct EnumConstant {
    /// Canonical name.
    pub name: String,
    /// Accepted aliases.
    pub aliases: Vec<String>,
    /// Value the constant deserializes to.
    pub value: Value,
}

impl EnumConstant {
    /// Constant deserializing to its own name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let value = Value::Str(name.clone());
        Self {
            name,
            aliases: Vec::new(),
            value,
        }
    }

    /// Attach aliases.
    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = &'static str>) -> Self {
        self.aliases = aliases.into_iter().map(str::to_owned).collect();
        self
    }
}

/// Object-identity declaration: which property carries the instance id.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySpec {
    /// Property whose value is the id.
    pub property: String,
}

/// Registered metadata for one class-like or enum target type.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    name: Arc<str>,
    is_abstract: bool,
    constructors: Vec<Constructor>,
    factories: Vec<FactoryMethod>,
    constants: Vec<EnumConstant>,
    identity: Option<IdentitySpec>,
    attrs: Attrs,
}

impl TypeSpec {
    /// Start building a spec.
    pub fn builder(name: impl Into<Arc<str>>) -> TypeSpecBuilder {
        TypeSpecBuilder {
            spec: TypeSpec {
                name: name.into(),
                is_abstract: false,
                constructors: Vec::new(),
                factories: Vec::new(),
                constants: Vec::new(),
                identity: None,
                attrs: Attrs::new(),
            },
        }
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the type cannot be instantiated directly.
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Declared constructors, in declaration order.
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Declared factory methods, in declaration order.
    pub fn factories(&self) -> &[FactoryMethod] {
        &self.factories
    }

    /// Enum constants, empty for non-enum types.
    pub fn constants(&self) -> &[EnumConstant] {
        &self.constants
    }

    /// Object-identity declaration, if any.
    pub fn identity(&self) -> Option<&IdentitySpec> {
        self.identity.as_ref()
    }

    /// Type-level attribute metadata.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// All creator members, constructors first, in declaration order.
    pub fn creator_members(&self) -> impl Iterator<Item = MemberRef<'_>> {
        self.constructors
            .iter()
            .map(MemberRef::Constructor)
            .chain(self.factories.iter().map(MemberRef::Factory))
    }
}

/// Builder for [`TypeSpec`].
pub struct TypeSpecBuilder {
    spec: TypeSpec,
}

impl TypeSpecBuilder {
    /// Mark the type abstract.
    pub fn abstract_type(mut self) -> Self {
        self.spec.is_abstract = true;
        self
    }

    /// Add a constructor.
    pub fn constructor(mut self, ctor: Constructor) -> Self {
        self.spec.constructors.push(ctor);
        self
    }

    /// Add a factory method.
    pub fn factory(mut self, factory: FactoryMethod) -> Self {
        self.spec.factories.push(factory);
        self
    }

    /// Add an enum constant.
    pub fn constant(mut self, constant: EnumConstant) -> Self {
        self.spec.constants.push(constant);
        self
    }

    /// Declare the identity property.
    pub fn identity(mut self, property: impl Into<String>) -> Self {
        self.spec.identity = Some(IdentitySpec {
            property: property.into(),
        });
        self
    }

    /// Attach type-level attributes.
    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.spec.attrs = attrs;
        self
    }

    /// Finish and share the spec.
    pub fn build(self) -> Arc<TypeSpec> {
        Arc::new(self.spec)
    }
}

/// Registry of type specs, keyed by type name.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    specs: HashMap<Arc<str>, Arc<TypeSpec>>,
}

impl TypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spec, replacing any previous spec of the same name.
    pub fn register(&mut self, spec: Arc<TypeSpec>) -> &mut Self {
        self.specs.insert(Arc::from(spec.name()), spec);
        self
    }

    /// Look up a spec by name.
    pub fn get(&self, name: &str) -> Option<&Arc<TypeSpec>> {
        self.specs.get(name)
    }

    /// Number of registered specs.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attrs_first_match_wins() {
        let attrs = Attrs::new()
            .with_str("name", "first")
            .with_str("name", "second");
        assert_eq!(attrs.str_value("name"), Some("first"));
    }

    #[test]
    fn callables_compare_by_name() {
        let a = Callable::new("Point::new", |_| Ok(Value::Null));
        let b = Callable::new("Point::new", |_| Ok(Value::Null));
        let c = Callable::new("Point::origin", |_| Ok(Value::Null));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn registry_replaces_same_name() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeSpec::builder("T").build());
        registry.register(TypeSpec::builder("T").abstract_type().build());
        assert_eq!(registry.len(), 1);
        assert!(registry.get("T").unwrap().is_abstract());
    }
}
