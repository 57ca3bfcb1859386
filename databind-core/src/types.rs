//! Resolved, generic-aware type descriptors.
//!
//! A [`TypeDesc`] is the immutable description of one target type shape:
//! raw kind plus (for containers and references) key/content descriptors.
//! Descriptors are `Arc`-shared, cheap to clone, and serve as the cache key
//! for resolved deserializers and instantiators, so they are constructed
//! once per distinct generic shape.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::value::ScalarKind;

/// Declared collection kind, abstract or concrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Unspecified collection (abstract).
    Collection,
    /// Ordered list (abstract).
    List,
    /// Unordered unique set (abstract).
    Set,
    /// Ordered unique set (abstract).
    SortedSet,
    /// Double-ended queue (abstract).
    Deque,
    /// Concrete growable vector.
    Vec,
    /// Concrete double-ended queue.
    VecDeque,
    /// Concrete hash set (first-occurrence order under a value model).
    HashSet,
    /// Concrete ordered set.
    BTreeSet,
}

impl CollectionKind {
    /// Whether this kind still needs the fallback table.
    pub const fn is_abstract(self) -> bool {
        matches!(
            self,
            CollectionKind::Collection
                | CollectionKind::List
                | CollectionKind::Set
                | CollectionKind::SortedSet
                | CollectionKind::Deque
        )
    }

    /// Static fallback table from abstract kinds to concrete defaults.
    pub const fn concrete_default(self) -> CollectionKind {
        match self {
            CollectionKind::Collection | CollectionKind::List => CollectionKind::Vec,
            CollectionKind::Set => CollectionKind::HashSet,
            CollectionKind::SortedSet => CollectionKind::BTreeSet,
            CollectionKind::Deque => CollectionKind::VecDeque,
            concrete => concrete,
        }
    }

    /// Whether elements are kept unique.
    pub const fn is_set(self) -> bool {
        matches!(
            self,
            CollectionKind::Set
                | CollectionKind::SortedSet
                | CollectionKind::HashSet
                | CollectionKind::BTreeSet
        )
    }

    /// Whether elements are materialized in sorted order.
    pub const fn is_sorted(self) -> bool {
        matches!(self, CollectionKind::SortedSet | CollectionKind::BTreeSet)
    }
}

/// Declared map kind, abstract or concrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    /// Unspecified map (abstract).
    Map,
    /// Key-ordered map (abstract).
    SortedMap,
    /// Concrete insertion-ordered map.
    IndexMap,
    /// Concrete key-ordered map.
    BTreeMap,
    /// Concrete map keyed by enum constants, entries in ordinal order.
    EnumMap,
}

impl MapKind {
    /// Whether this kind still needs the fallback table.
    pub const fn is_abstract(self) -> bool {
        matches!(self, MapKind::Map | MapKind::SortedMap)
    }

    /// Static fallback table from abstract kinds to concrete defaults.
    ///
    /// An abstract `Map` keyed by an enum degrades to [`MapKind::EnumMap`];
    /// that special case lives in [`TypeDesc::with_concrete_containers`]
    /// because it needs the key descriptor.
    pub const fn concrete_default(self) -> MapKind {
        match self {
            MapKind::Map => MapKind::IndexMap,
            MapKind::SortedMap => MapKind::BTreeMap,
            concrete => concrete,
        }
    }

    /// Whether entries are materialized in key order.
    pub const fn is_sorted(self) -> bool {
        matches!(self, MapKind::SortedMap | MapKind::BTreeMap)
    }
}

/// Single-content reference wrapper kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Optional value: null input stays null at zero cost.
    Option,
    /// Shared cell: wraps the content, null input allowed.
    Shared,
    /// A registered wrapper class constructed through its own instantiator.
    Custom(Arc<str>),
}

/// Structural shape of a target type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeShape {
    /// Untyped target: deserializes to whatever the stream holds.
    Any,
    /// Built-in scalar.
    Scalar(ScalarKind),
    /// Registered class, by name.
    Class(Arc<str>),
    /// Registered enum, by name.
    Enum(Arc<str>),
    /// Growable collection.
    Collection {
        /// Declared kind, possibly abstract.
        kind: CollectionKind,
        /// Element descriptor.
        element: TypeDesc,
    },
    /// Key/value map.
    Map {
        /// Declared kind, possibly abstract.
        kind: MapKind,
        /// Key descriptor.
        key: TypeDesc,
        /// Value descriptor.
        value: TypeDesc,
    },
    /// Fixed array (non-growable target).
    Array {
        /// Element descriptor.
        element: TypeDesc,
    },
    /// Single-content reference wrapper.
    Reference {
        /// Wrapper kind.
        kind: RefKind,
        /// Content descriptor.
        referent: TypeDesc,
    },
}

/// Coarse classification used by coercion configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalShape {
    /// Strings.
    Textual,
    /// Integral numbers.
    Integer,
    /// Floating-point and decimal numbers.
    Float,
    /// Booleans.
    Boolean,
    /// Enum constants.
    Enum,
    /// Collections.
    Collection,
    /// Maps.
    Map,
    /// Arrays.
    Array,
    /// Reference wrappers.
    Reference,
    /// Classes.
    Class,
    /// Untyped.
    Any,
}

/// Immutable, shared descriptor of one target type.
#[derive(Debug, Clone)]
pub struct TypeDesc {
    shape: Arc<TypeShape>,
}

impl TypeDesc {
    /// Wrap a shape into a descriptor.
    pub fn new(shape: TypeShape) -> Self {
        Self {
            shape: Arc::new(shape),
        }
    }

    /// The untyped descriptor.
    pub fn any() -> Self {
        Self::new(TypeShape::Any)
    }

    /// Scalar descriptor.
    pub fn scalar(kind: ScalarKind) -> Self {
        Self::new(TypeShape::Scalar(kind))
    }

    /// String descriptor.
    pub fn string() -> Self {
        Self::scalar(ScalarKind::Str)
    }

    /// `int` descriptor.
    pub fn int() -> Self {
        Self::scalar(ScalarKind::Int)
    }

    /// `long` descriptor.
    pub fn long() -> Self {
        Self::scalar(ScalarKind::Long)
    }

    /// `double` descriptor.
    pub fn double() -> Self {
        Self::scalar(ScalarKind::Double)
    }

    /// `boolean` descriptor.
    pub fn boolean() -> Self {
        Self::scalar(ScalarKind::Bool)
    }

    /// Registered class descriptor.
    pub fn class(name: impl Into<Arc<str>>) -> Self {
        Self::new(TypeShape::Class(name.into()))
    }

    /// Registered enum descriptor.
    pub fn enumeration(name: impl Into<Arc<str>>) -> Self {
        Self::new(TypeShape::Enum(name.into()))
    }

    /// `List<element>` descriptor.
    pub fn list_of(element: TypeDesc) -> Self {
        Self::collection_of(CollectionKind::List, element)
    }

    /// Collection descriptor with an explicit kind.
    pub fn collection_of(kind: CollectionKind, element: TypeDesc) -> Self {
        Self::new(TypeShape::Collection { kind, element })
    }

    /// `Map<key, value>` descriptor.
    pub fn map_of(key: TypeDesc, value: TypeDesc) -> Self {
        Self::new(TypeShape::Map {
            kind: MapKind::Map,
            key,
            value,
        })
    }

    /// Map descriptor with an explicit kind.
    pub fn map_kind_of(kind: MapKind, key: TypeDesc, value: TypeDesc) -> Self {
        Self::new(TypeShape::Map { kind, key, value })
    }

    /// Fixed-array descriptor.
    pub fn array_of(element: TypeDesc) -> Self {
        Self::new(TypeShape::Array { element })
    }

    /// `Option<referent>` descriptor.
    pub fn option_of(referent: TypeDesc) -> Self {
        Self::new(TypeShape::Reference {
            kind: RefKind::Option,
            referent,
        })
    }

    /// Reference descriptor with an explicit wrapper kind.
    pub fn reference_of(kind: RefKind, referent: TypeDesc) -> Self {
        Self::new(TypeShape::Reference { kind, referent })
    }

    /// Borrow the structural shape.
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Content (element/value/referent) descriptor, if this is a container.
    pub fn content_type(&self) -> Option<&TypeDesc> {
        match self.shape() {
            TypeShape::Collection { element, .. } | TypeShape::Array { element } => Some(element),
            TypeShape::Map { value, .. } => Some(value),
            TypeShape::Reference { referent, .. } => Some(referent),
            _ => None,
        }
    }

    /// Key descriptor, if this is a map.
    pub fn key_type(&self) -> Option<&TypeDesc> {
        match self.shape() {
            TypeShape::Map { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Whether the declared shape is an abstract container kind.
    pub fn is_abstract_container(&self) -> bool {
        match self.shape() {
            TypeShape::Collection { kind, .. } => kind.is_abstract(),
            TypeShape::Map { kind, .. } => kind.is_abstract(),
            _ => false,
        }
    }

    /// Whether this descriptor is an array of a scalar element kind.
    pub fn is_primitive_array(&self) -> bool {
        matches!(
            self.shape(),
            TypeShape::Array { element } if matches!(element.shape(), TypeShape::Scalar(_))
        )
    }

    /// Resolve abstract container kinds through the static fallback table.
    ///
    /// Returns `self` unchanged (same allocation) when already concrete.
    /// The enum-key degradation happens here: an abstract map whose key is
    /// an enum becomes [`MapKind::EnumMap`].
    pub fn with_concrete_containers(&self) -> TypeDesc {
        match self.shape() {
            TypeShape::Collection { kind, element } if kind.is_abstract() => {
                TypeDesc::collection_of(kind.concrete_default(), element.clone())
            }
            TypeShape::Map { kind, key, value } if kind.is_abstract() => {
                let concrete = if matches!(kind, MapKind::Map)
                    && matches!(key.shape(), TypeShape::Enum(_))
                {
                    MapKind::EnumMap
                } else {
                    kind.concrete_default()
                };
                TypeDesc::map_kind_of(concrete, key.clone(), value.clone())
            }
            _ => self.clone(),
        }
    }

    /// Coarse classification for coercion lookups.
    pub fn logical_shape(&self) -> LogicalShape {
        match self.shape() {
            TypeShape::Any => LogicalShape::Any,
            TypeShape::Scalar(ScalarKind::Str) => LogicalShape::Textual,
            TypeShape::Scalar(ScalarKind::Bool) => LogicalShape::Boolean,
            TypeShape::Scalar(ScalarKind::Double) | TypeShape::Scalar(ScalarKind::Decimal) => {
                LogicalShape::Float
            }
            TypeShape::Scalar(_) => LogicalShape::Integer,
            TypeShape::Class(_) => LogicalShape::Class,
            TypeShape::Enum(_) => LogicalShape::Enum,
            TypeShape::Collection { .. } => LogicalShape::Collection,
            TypeShape::Map { .. } => LogicalShape::Map,
            TypeShape::Array { .. } => LogicalShape::Array,
            TypeShape::Reference { .. } => LogicalShape::Reference,
        }
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shape, &other.shape) || self.shape == other.shape
    }
}

impl Eq for TypeDesc {}

impl Hash for TypeDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shape.hash(state);
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape() {
            TypeShape::Any => f.write_str("Any"),
            TypeShape::Scalar(kind) => f.write_str(kind.name()),
            TypeShape::Class(name) | TypeShape::Enum(name) => f.write_str(name),
            TypeShape::Collection { kind, element } => write!(f, "{kind:?}<{element}>"),
            TypeShape::Map { kind, key, value } => write!(f, "{kind:?}<{key},{value}>"),
            TypeShape::Array { element } => write!(f, "[{element}]"),
            TypeShape::Reference { kind, referent } => match kind {
                RefKind::Option => write!(f, "Option<{referent}>"),
                RefKind::Shared => write!(f, "Shared<{referent}>"),
                RefKind::Custom(name) => write!(f, "{name}<{referent}>"),
            },
        }
    }
}
