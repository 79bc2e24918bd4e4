//! Type representation.
//!
//! Every type is a 32-bit index into the [`TypeTable`] pool. Basic types
//! have fixed indices so equality checks against them are O(1) constant
//! comparisons; `TypeId::NONE` is the "no type" sentinel returned by failed
//! resolution (never an error).

use crate::scope::ScopeId;
use crate::symbol::SymbolId;
use quill_ir::{Name, StringInterner};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;

/// A 32-bit index into the type pool.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // Basic types are pre-interned at pool creation.

    /// Sentinel "no type".
    pub const NONE: Self = Self(0);
    /// The `int` type (64-bit signed).
    pub const INT: Self = Self(1);
    /// The `float` type (64-bit).
    pub const FLOAT: Self = Self(2);
    /// The `string` type.
    pub const STRING: Self = Self(3);
    /// The `bool` type.
    pub const BOOL: Self = Self(4);
    /// The task-dependency graph type.
    pub const GRAPH: Self = Self(5);
    /// The game-object prototype type (a type-and-value hybrid).
    pub const PROTOTYPE: Self = Self(6);
    /// The item prototype type.
    pub const ITEM_PROTOTYPE: Self = Self(7);

    const FIRST_DYNAMIC: u32 = 8;

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_basic(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TypeId::NONE => write!(f, "ty#none"),
            TypeId::INT => write!(f, "ty#int"),
            TypeId::FLOAT => write!(f, "ty#float"),
            TypeId::STRING => write!(f, "ty#string"),
            TypeId::BOOL => write!(f, "ty#bool"),
            TypeId::GRAPH => write!(f, "ty#graph"),
            TypeId::PROTOTYPE => write!(f, "ty#prototype"),
            TypeId::ITEM_PROTOTYPE => write!(f, "ty#item_prototype"),
            TypeId(n) => write!(f, "ty#{n}"),
        }
    }
}

/// Key identifying a host class, the replacement for language reflection.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct HostClassKey(std::any::TypeId);

impl HostClassKey {
    /// Key for the host type `T`.
    pub fn of<T: 'static>() -> Self {
        HostClassKey(std::any::TypeId::of::<T>())
    }

    /// Key from a runtime-inspected type id (e.g. the concrete class
    /// behind a `dyn Any` instance).
    pub fn from_type_id(id: std::any::TypeId) -> Self {
        HostClassKey(id)
    }
}

/// A named, typed member of an aggregate type.
#[derive(Copy, Clone, Debug)]
pub struct Member {
    pub name: Name,
    pub ty: TypeId,
    /// The member's symbol (kind `Member`), bound in the aggregate's
    /// member scope.
    pub symbol: SymbolId,
}

/// Member list of an aggregate type; fixed once analysis completes.
#[derive(Clone, Debug)]
pub struct AggregateDef {
    pub members: Vec<Member>,
    /// Member scope: child of the defining scope, holds one symbol per
    /// member for property-definition resolution.
    pub scope: ScopeId,
    /// Set when the aggregate adapts an external host class.
    pub host: Option<HostClassKey>,
}

impl AggregateDef {
    /// Find a member by name.
    pub fn member(&self, name: Name) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Signature of a callable type.
#[derive(Clone, Debug)]
pub struct FunctionSig {
    pub params: SmallVec<[TypeId; 4]>,
    pub ret: TypeId,
}

/// Variants of an enum type.
#[derive(Clone, Debug)]
pub struct EnumDef {
    pub variants: Vec<Name>,
}

impl EnumDef {
    /// Index of a variant by name.
    pub fn variant_index(&self, name: Name) -> Option<usize> {
        self.variants.iter().position(|&v| v == name)
    }
}

/// Closed set of type kinds.
#[derive(Clone, Debug)]
pub enum TypeKind {
    /// Scalar built-in (int, float, string, bool, graph, prototype).
    Basic,
    /// Callable signature.
    Function(FunctionSig),
    /// DSL-native record type with named, typed members.
    Aggregate(AggregateDef),
    /// Aggregate whose members mirror an introspected host class.
    AggregateAdapted(AggregateDef),
    /// Enumeration of named variants.
    Enum(EnumDef),
    /// Ordered collection.
    List { element: TypeId },
    /// De-duplicated collection.
    Set { element: TypeId },
    /// Keyed collection.
    Map { key: TypeId, element: TypeId },
}

/// A pooled type: its DSL name plus kind.
#[derive(Clone, Debug)]
pub struct TypeDef {
    pub name: Name,
    pub kind: TypeKind,
}

/// The type pool.
///
/// Immutable once analysis completes; the interpreter only reads it.
pub struct TypeTable {
    types: Vec<TypeDef>,
    by_name: FxHashMap<Name, TypeId>,
    adapted: FxHashMap<HostClassKey, TypeId>,
}

impl TypeTable {
    /// Create a table with the basic types pre-interned at their fixed
    /// indices.
    pub fn new(interner: &StringInterner) -> Self {
        let mut table = TypeTable {
            types: Vec::with_capacity(16),
            by_name: FxHashMap::default(),
            adapted: FxHashMap::default(),
        };
        for name in [
            "none",
            "int",
            "float",
            "string",
            "bool",
            "graph",
            "prototype",
            "item_prototype",
        ] {
            let name = interner.intern(name);
            let id = TypeId(u32::try_from(table.types.len()).unwrap_or(u32::MAX));
            table.types.push(TypeDef {
                name,
                kind: TypeKind::Basic,
            });
            table.by_name.insert(name, id);
        }
        table
    }

    /// Register a new type under `name`. A prior registration under the
    /// same name is shadowed for resolution but its `TypeId` stays valid.
    pub fn intern(&mut self, name: Name, kind: TypeKind) -> TypeId {
        let id = TypeId(u32::try_from(self.types.len()).unwrap_or(u32::MAX));
        self.types.push(TypeDef { name, kind });
        self.by_name.insert(name, id);
        id
    }

    /// Resolve a type by name; `TypeId::NONE` when unknown.
    pub fn resolve(&self, name: Name) -> TypeId {
        self.by_name.get(&name).copied().unwrap_or(TypeId::NONE)
    }

    /// Definition lookup.
    #[inline]
    pub fn def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.index()]
    }

    /// Kind lookup.
    #[inline]
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.index()].kind
    }

    /// DSL name of a type.
    #[inline]
    pub fn name(&self, id: TypeId) -> Name {
        self.types[id.index()].name
    }

    /// Member list of an aggregate type; empty for every other kind.
    pub fn members(&self, id: TypeId) -> &[Member] {
        match self.kind(id) {
            TypeKind::Aggregate(def) | TypeKind::AggregateAdapted(def) => &def.members,
            _ => &[],
        }
    }

    /// Aggregate definition of a type, if it is one.
    pub fn aggregate(&self, id: TypeId) -> Option<&AggregateDef> {
        match self.kind(id) {
            TypeKind::Aggregate(def) | TypeKind::AggregateAdapted(def) => Some(def),
            _ => None,
        }
    }

    /// Whether the type is an aggregate (native or adapted).
    pub fn is_aggregate(&self, id: TypeId) -> bool {
        self.aggregate(id).is_some()
    }

    /// Record that `key`'s host class adapts to DSL type `ty`.
    ///
    /// Returns `false` (leaving the prior registration) when the class
    /// already has an adapted type; a host class maps to exactly one type.
    pub fn register_adapted(&mut self, key: HostClassKey, ty: TypeId) -> bool {
        if self.adapted.contains_key(&key) {
            return false;
        }
        self.adapted.insert(key, ty);
        true
    }

    /// The single DSL type registered for a host class, or `TypeId::NONE`.
    pub fn adapted_type_for(&self, key: HostClassKey) -> TypeId {
        self.adapted.get(&key).copied().unwrap_or(TypeId::NONE)
    }

    /// Intern (or reuse) the list type over `element`.
    pub fn list_of(&mut self, element: TypeId, interner: &StringInterner) -> TypeId {
        let name = interner.intern(&format!("{}[]", interner.lookup(self.name(element))));
        let existing = self.resolve(name);
        if !existing.is_none() {
            return existing;
        }
        self.intern(name, TypeKind::List { element })
    }

    /// Intern (or reuse) the set type over `element`.
    pub fn set_of(&mut self, element: TypeId, interner: &StringInterner) -> TypeId {
        let name = interner.intern(&format!("{}<>", interner.lookup(self.name(element))));
        let existing = self.resolve(name);
        if !existing.is_none() {
            return existing;
        }
        self.intern(name, TypeKind::Set { element })
    }

    /// Intern (or reuse) the map type from `key` to `element`.
    pub fn map_of(&mut self, key: TypeId, element: TypeId, interner: &StringInterner) -> TypeId {
        let name = interner.intern(&format!(
            "[{}->{}]",
            interner.lookup(self.name(key)),
            interner.lookup(self.name(element))
        ));
        let existing = self.resolve(name);
        if !existing.is_none() {
            return existing;
        }
        self.intern(name, TypeKind::Map { key, element })
    }

    /// Number of pooled types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basics_have_fixed_indices() {
        let interner = StringInterner::new();
        let table = TypeTable::new(&interner);
        assert_eq!(table.resolve(interner.intern("int")), TypeId::INT);
        assert_eq!(table.resolve(interner.intern("graph")), TypeId::GRAPH);
        assert_eq!(table.resolve(interner.intern("nope")), TypeId::NONE);
    }

    #[test]
    fn collection_types_are_reused() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new(&interner);
        let a = table.list_of(TypeId::INT, &interner);
        let b = table.list_of(TypeId::INT, &interner);
        assert_eq!(a, b);
        assert_eq!(interner.lookup(table.name(a)), "int[]");
    }

    #[test]
    fn adapted_registration_is_single() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new(&interner);
        struct Probe;
        let key = HostClassKey::of::<Probe>();
        assert!(table.register_adapted(key, TypeId::INT));
        assert!(!table.register_adapted(key, TypeId::FLOAT));
        assert_eq!(table.adapted_type_for(key), TypeId::INT);
    }
}
