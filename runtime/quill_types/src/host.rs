//! Host-class descriptors.
//!
//! The runtime binds DSL values to instances of the host game's object
//! model. Instead of language reflection, every bindable host class
//! registers a descriptor table once: per declared field a pair of
//! read/write closures over `dyn Any`, per property a getter/setter pair
//! with independent capability flags, plus an optional constructor for
//! instantiating the class from an evaluated definition.
//!
//! Descriptors are built through [`HostClassBuilder`] and registered in the
//! [`HostRegistry`]; registration also interns the aggregate-adapted DSL
//! type whose members mirror the descriptor.

use crate::env::Environment;
use crate::scope::ScopeId;
use crate::symbol::{NativeFnId, Symbol, SymbolId, SymbolKind};
use crate::types::{AggregateDef, HostClassKey, Member, TypeId, TypeKind};
use bitflags::bitflags;
use quill_ir::Name;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

/// A live host object, shared between the game and the runtime.
pub type HostInstance = Rc<RefCell<dyn Any>>;

/// Wrap a concrete host value as a [`HostInstance`].
pub fn host_instance<T: 'static>(value: T) -> HostInstance {
    Rc::new(RefCell::new(value))
}

/// The host-class key of a live instance's concrete type.
pub fn instance_key(instance: &HostInstance) -> HostClassKey {
    HostClassKey::from_type_id((*instance.borrow()).type_id())
}

/// Scalar crossing the host boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum HostScalar {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

/// A callable crossing the host boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostCallback {
    /// A host-exposed native callable.
    Native(NativeFnId),
    /// A script-defined callable pushed into a host field; the embedder
    /// invokes it back through the interpreter by symbol.
    Script(SymbolId),
}

/// What reading a host field produced.
pub enum HostRead {
    /// The field is unset on the host side.
    Null,
    Scalar(HostScalar),
    /// A nested host object (aggregate-typed field).
    Object(HostInstance),
    Callable(HostCallback),
    List(Vec<HostRead>),
    Set(Vec<HostRead>),
    Map(Vec<(HostRead, HostRead)>),
    /// An enum field, identified by variant name.
    EnumVariant(String),
    /// An opaque host value (e.g. a dependency graph) passed through
    /// by downcast on the other side.
    Opaque(Rc<dyn Any>),
}

/// What a host write carries.
pub enum HostWrite {
    Scalar(HostScalar),
    Callback(HostCallback),
    /// An enum value, identified by variant name.
    EnumVariant(String),
    /// Opaque payload; the field's write closure downcasts it.
    Opaque(Rc<dyn Any>),
}

/// Fatal host-access failure: the descriptor and the live class disagree.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("cannot access member '{member}' of host class '{class}'")]
pub struct HostAccessError {
    pub class: &'static str,
    pub member: String,
}

impl HostAccessError {
    pub fn new(class: &'static str, member: impl Into<String>) -> Self {
        HostAccessError {
            class,
            member: member.into(),
        }
    }
}

bitflags! {
    /// Access capabilities of a property.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Capability: u8 {
        const GET = 1;
        const SET = 2;
    }
}

type ReadFn = Rc<dyn Fn(&dyn Any) -> Result<HostRead, HostAccessError>>;
type WriteFn = Rc<dyn Fn(&mut dyn Any, &HostWrite) -> Result<bool, HostAccessError>>;

/// One declared field of a host class.
#[derive(Clone)]
pub struct HostField {
    /// DSL member name (snake_case per the naming convention).
    pub name: Name,
    /// Declared DSL member type.
    pub ty: TypeId,
    read: ReadFn,
    write: Option<WriteFn>,
}

impl HostField {
    /// Read the field from a host instance.
    pub fn read(&self, instance: &dyn Any) -> Result<HostRead, HostAccessError> {
        (self.read)(instance)
    }

    /// Write through to the host instance.
    ///
    /// `Ok(false)` is a type mismatch (backing store untouched);
    /// `Err` is a fatal access failure. Fields without a writer reject
    /// writes with `Ok(false)`.
    pub fn write(
        &self,
        instance: &mut dyn Any,
        value: &HostWrite,
    ) -> Result<bool, HostAccessError> {
        match &self.write {
            Some(write) => write(instance, value),
            None => Ok(false),
        }
    }
}

/// One declared property (getter/setter pair) of a host class.
#[derive(Clone)]
pub struct HostProperty {
    pub name: Name,
    pub ty: TypeId,
    pub caps: Capability,
    get: Option<ReadFn>,
    set: Option<WriteFn>,
}

impl HostProperty {
    /// Invoke the getter. A non-gettable property yields an empty read,
    /// not an error.
    pub fn get(&self, instance: &dyn Any) -> Result<HostRead, HostAccessError> {
        if !self.caps.contains(Capability::GET) {
            return Ok(HostRead::Null);
        }
        match &self.get {
            Some(get) => get(instance),
            None => Ok(HostRead::Null),
        }
    }

    /// Invoke the setter. A non-settable property rejects the write with
    /// `Ok(false)` and leaves the backing store untouched.
    pub fn set(
        &self,
        instance: &mut dyn Any,
        value: &HostWrite,
    ) -> Result<bool, HostAccessError> {
        if !self.caps.contains(Capability::SET) {
            return Ok(false);
        }
        match &self.set {
            Some(set) => set(instance, value),
            None => Ok(false),
        }
    }
}

/// Registered descriptor of a host class.
pub struct HostClass {
    /// DSL type name.
    pub name: Name,
    pub key: HostClassKey,
    /// Rust type name, for diagnostics.
    pub rust_name: &'static str,
    construct: Option<Rc<dyn Fn() -> HostInstance>>,
    fields: FxHashMap<Name, HostField>,
    properties: FxHashMap<Name, HostProperty>,
}

impl HostClass {
    /// Field descriptor by DSL member name.
    pub fn field(&self, name: Name) -> Option<&HostField> {
        self.fields.get(&name)
    }

    /// Property descriptor by DSL member name.
    pub fn property(&self, name: Name) -> Option<&HostProperty> {
        self.properties.get(&name)
    }

    /// Construct a fresh instance, when the class is instantiable.
    pub fn construct(&self) -> Option<HostInstance> {
        self.construct.as_ref().map(|f| f())
    }
}

/// Registry of host-class descriptors, keyed by the host type.
#[derive(Default)]
pub struct HostRegistry {
    classes: FxHashMap<HostClassKey, Rc<HostClass>>,
    by_type: FxHashMap<TypeId, Rc<HostClass>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        HostRegistry::default()
    }

    pub(crate) fn insert(&mut self, key: HostClassKey, ty: TypeId, class: HostClass) {
        let class = Rc::new(class);
        self.classes.insert(key, class.clone());
        self.by_type.insert(ty, class);
    }

    /// Descriptor for a host class key.
    pub fn class(&self, key: HostClassKey) -> Option<&Rc<HostClass>> {
        self.classes.get(&key)
    }

    /// Descriptor for an aggregate-adapted DSL type.
    pub fn class_for_type(&self, ty: TypeId) -> Option<&Rc<HostClass>> {
        self.by_type.get(&ty)
    }
}

/// Convert a host-side member name to the DSL naming convention
/// (`camelCase`/`PascalCase` → `snake_case`).
pub fn dsl_member_name(host_name: &str) -> String {
    let mut out = String::with_capacity(host_name.len() + 4);
    for (i, ch) in host_name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Builder for a host-class descriptor.
///
/// Field closures are written against the concrete host type `T`; the
/// builder wraps them with the `dyn Any` downcast, so a mismatch between
/// descriptor and live instance surfaces as a [`HostAccessError`] instead
/// of silent corruption.
pub struct HostClassBuilder<T: 'static> {
    dsl_name: String,
    rust_name: &'static str,
    construct: Option<Rc<dyn Fn() -> HostInstance>>,
    fields: Vec<(String, TypeId, ReadFn, Option<WriteFn>)>,
    properties: Vec<(String, TypeId, Capability, Option<ReadFn>, Option<WriteFn>)>,
    _marker: PhantomData<T>,
}

impl<T: 'static> HostClassBuilder<T> {
    /// Start a descriptor; `dsl_name` becomes the adapted type's name.
    pub fn new(dsl_name: &str) -> Self {
        HostClassBuilder {
            dsl_name: dsl_name.to_owned(),
            rust_name: std::any::type_name::<T>(),
            construct: None,
            fields: Vec::new(),
            properties: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Register a constructor, making the class instantiable from an
    /// evaluated definition.
    pub fn constructor(mut self, f: impl Fn() -> T + 'static) -> Self {
        self.construct = Some(Rc::new(move || host_instance(f())));
        self
    }

    /// Declare a scalar (POD) field with read and write access.
    pub fn scalar_field(
        mut self,
        host_name: &str,
        ty: TypeId,
        get: impl Fn(&T) -> HostScalar + 'static,
        set: impl Fn(&mut T, &HostScalar) -> bool + 'static,
    ) -> Self {
        let member = dsl_member_name(host_name);
        let rust_name = self.rust_name;
        let read_member = member.clone();
        let read: ReadFn = Rc::new(move |instance| {
            let typed = instance
                .downcast_ref::<T>()
                .ok_or_else(|| HostAccessError::new(rust_name, read_member.clone()))?;
            Ok(HostRead::Scalar(get(typed)))
        });
        let write_member = member.clone();
        let write: WriteFn = Rc::new(move |instance, value| {
            let typed = instance
                .downcast_mut::<T>()
                .ok_or_else(|| HostAccessError::new(rust_name, write_member.clone()))?;
            match value {
                HostWrite::Scalar(scalar) => Ok(set(typed, scalar)),
                _ => Ok(false),
            }
        });
        self.fields.push((member, ty, read, Some(write)));
        self
    }

    /// Declare an aggregate-typed field holding a nested host object.
    ///
    /// Writes into aggregate members are unsupported by contract; the
    /// field carries no writer.
    pub fn object_field(
        mut self,
        host_name: &str,
        ty: TypeId,
        get: impl Fn(&T) -> Option<HostInstance> + 'static,
    ) -> Self {
        let member = dsl_member_name(host_name);
        let rust_name = self.rust_name;
        let read_member = member.clone();
        let read: ReadFn = Rc::new(move |instance| {
            let typed = instance
                .downcast_ref::<T>()
                .ok_or_else(|| HostAccessError::new(rust_name, read_member.clone()))?;
            Ok(match get(typed) {
                Some(nested) => HostRead::Object(nested),
                None => HostRead::Null,
            })
        });
        self.fields.push((member, ty, read, None));
        self
    }

    /// Declare a callable-typed field.
    pub fn callback_field(
        mut self,
        host_name: &str,
        ty: TypeId,
        get: impl Fn(&T) -> Option<HostCallback> + 'static,
        set: impl Fn(&mut T, HostCallback) + 'static,
    ) -> Self {
        let member = dsl_member_name(host_name);
        let rust_name = self.rust_name;
        let read_member = member.clone();
        let read: ReadFn = Rc::new(move |instance| {
            let typed = instance
                .downcast_ref::<T>()
                .ok_or_else(|| HostAccessError::new(rust_name, read_member.clone()))?;
            Ok(match get(typed) {
                Some(cb) => HostRead::Callable(cb),
                None => HostRead::Null,
            })
        });
        let write_member = member.clone();
        let write: WriteFn = Rc::new(move |instance, value| {
            let typed = instance
                .downcast_mut::<T>()
                .ok_or_else(|| HostAccessError::new(rust_name, write_member.clone()))?;
            match value {
                HostWrite::Callback(cb) => {
                    set(typed, cb.clone());
                    Ok(true)
                }
                _ => Ok(false),
            }
        });
        self.fields.push((member, ty, read, Some(write)));
        self
    }

    /// Declare a field with fully custom read/write closures (collections,
    /// enums, opaque payloads).
    pub fn raw_field(
        mut self,
        host_name: &str,
        ty: TypeId,
        read: impl Fn(&T) -> Result<HostRead, HostAccessError> + 'static,
        write: Option<Box<dyn Fn(&mut T, &HostWrite) -> Result<bool, HostAccessError>>>,
    ) -> Self {
        let member = dsl_member_name(host_name);
        let rust_name = self.rust_name;
        let read_member = member.clone();
        let read: ReadFn = Rc::new(move |instance| {
            let typed = instance
                .downcast_ref::<T>()
                .ok_or_else(|| HostAccessError::new(rust_name, read_member.clone()))?;
            read(typed)
        });
        let write = write.map(|w| {
            let write_member = member.clone();
            let write: WriteFn = Rc::new(move |instance: &mut dyn Any, value: &HostWrite| {
                let typed = instance
                    .downcast_mut::<T>()
                    .ok_or_else(|| HostAccessError::new(rust_name, write_member.clone()))?;
                w(typed, value)
            });
            write
        });
        self.fields.push((member, ty, read, write));
        self
    }

    /// Declare a property backed by a getter/setter pair with explicit
    /// capabilities.
    pub fn property(
        mut self,
        host_name: &str,
        ty: TypeId,
        caps: Capability,
        get: Option<Box<dyn Fn(&T) -> HostRead>>,
        set: Option<Box<dyn Fn(&mut T, &HostWrite) -> bool>>,
    ) -> Self {
        let member = dsl_member_name(host_name);
        let rust_name = self.rust_name;
        let get = get.map(|g| {
            let get_member = member.clone();
            let read: ReadFn = Rc::new(move |instance: &dyn Any| {
                let typed = instance
                    .downcast_ref::<T>()
                    .ok_or_else(|| HostAccessError::new(rust_name, get_member.clone()))?;
                Ok(g(typed))
            });
            read
        });
        let set = set.map(|s| {
            let set_member = member.clone();
            let write: WriteFn = Rc::new(move |instance: &mut dyn Any, value: &HostWrite| {
                let typed = instance
                    .downcast_mut::<T>()
                    .ok_or_else(|| HostAccessError::new(rust_name, set_member.clone()))?;
                Ok(s(typed, value))
            });
            write
        });
        self.properties.push((member, ty, caps, get, set));
        self
    }

    /// Intern the adapted type, create member symbols, and register the
    /// descriptor. Fails (returning the existing type) when the host class
    /// was already registered: a host class maps to exactly one DSL type.
    pub fn register(self, env: &mut Environment) -> TypeId {
        let key = HostClassKey::of::<T>();
        let existing = env.types.adapted_type_for(key);
        if !existing.is_none() {
            return existing;
        }

        let type_name = env.interner.intern(&self.dsl_name);
        let member_scope = env.scopes.push_scope(ScopeId::GLOBAL);

        let mut members = Vec::with_capacity(self.fields.len() + self.properties.len());
        let mut fields = FxHashMap::default();
        let mut properties = FxHashMap::default();

        for (member, ty, read, write) in self.fields {
            let name = env.interner.intern(&member);
            let symbol = env.symbols.push(Symbol {
                name,
                ty,
                kind: SymbolKind::Member,
                scope: member_scope,
            });
            env.scopes.bind(member_scope, name, symbol);
            members.push(Member { name, ty, symbol });
            fields.insert(name, HostField { name, ty, read, write });
        }
        for (member, ty, caps, get, set) in self.properties {
            let name = env.interner.intern(&member);
            let symbol = env.symbols.push(Symbol {
                name,
                ty,
                kind: SymbolKind::Member,
                scope: member_scope,
            });
            env.scopes.bind(member_scope, name, symbol);
            members.push(Member { name, ty, symbol });
            properties.insert(
                name,
                HostProperty {
                    name,
                    ty,
                    caps,
                    get,
                    set,
                },
            );
        }

        let ty = env.types.intern(
            type_name,
            TypeKind::AggregateAdapted(AggregateDef {
                members,
                scope: member_scope,
                host: Some(key),
            }),
        );
        env.types.register_adapted(key, ty);
        env.host.insert(
            key,
            ty,
            HostClass {
                name: type_name,
                key,
                rust_name: self.rust_name,
                construct: self.construct,
                fields,
                properties,
            },
        );

        // the type is also a symbol, resolvable by name in the global scope
        let type_symbol = env.symbols.push(Symbol {
            name: type_name,
            ty: TypeId::NONE,
            kind: SymbolKind::Type(ty),
            scope: ScopeId::GLOBAL,
        });
        env.scopes.bind(ScopeId::GLOBAL, type_name, type_symbol);

        tracing::debug!(
            class = self.rust_name,
            dsl_type = self.dsl_name.as_str(),
            "registered host class"
        );
        ty
    }
}
