//! Runtime values.
//!
//! A `Value` is a cheap handle onto a shared slot; cloning a `Value`
//! aliases the slot, mirroring the reference semantics the memory model is
//! built on. Deep copies are explicit (`clone_value`), which is what keeps
//! prototype instantiation independent.
//!
//! `Value::None` is the single shared "not found / unset" sentinel: name
//! resolution returns it instead of erroring, and callers check for it
//! explicitly.

use crate::graph::TaskGraph;
use crate::host::{AggPropertySlot, FieldSlot, PropertySlot};
use crate::memory::SpaceRef;
use crate::prototype::PrototypeSlot;
use crate::shared::Shared;
use quill_ir::{Name, StringInterner};
use quill_types::{HostInstance, NativeFnId, SymbolId, TypeId};
use std::fmt;
use std::rc::Rc;

/// Raw scalar payload of a basic value.
#[derive(Clone, Debug, Default)]
pub enum RawValue {
    /// Unset.
    #[default]
    None,
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Bool(bool),
    /// Task dependency graph; graph-typed values are basic in the DSL.
    Graph(Rc<TaskGraph>),
}

impl RawValue {
    /// The synthesized zero value for a basic type, when one exists.
    pub fn zero_for(ty: TypeId) -> Option<RawValue> {
        match ty {
            TypeId::INT => Some(RawValue::Int(0)),
            TypeId::FLOAT => Some(RawValue::Float(0.0)),
            TypeId::STRING => Some(RawValue::Str(Rc::from(""))),
            TypeId::BOOL => Some(RawValue::Bool(false)),
            _ => None,
        }
    }

    /// Whether two raw values hold the same scalar kind.
    pub fn same_kind(&self, other: &RawValue) -> bool {
        matches!(
            (self, other),
            (RawValue::None, RawValue::None)
                | (RawValue::Int(_), RawValue::Int(_))
                | (RawValue::Float(_), RawValue::Float(_))
                | (RawValue::Str(_), RawValue::Str(_))
                | (RawValue::Bool(_), RawValue::Bool(_))
                | (RawValue::Graph(_), RawValue::Graph(_))
        )
    }

    /// Truthiness of the scalar (zero-like is false).
    pub fn is_truthy(&self) -> bool {
        match self {
            RawValue::None => false,
            RawValue::Int(n) => *n != 0,
            RawValue::Float(f) => *f != 0.0,
            RawValue::Str(s) => !s.is_empty(),
            RawValue::Bool(b) => *b,
            RawValue::Graph(_) => true,
        }
    }
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RawValue::None, RawValue::None) => true,
            (RawValue::Int(a), RawValue::Int(b)) => a == b,
            (RawValue::Float(a), RawValue::Float(b)) => a == b,
            (RawValue::Str(a), RawValue::Str(b)) => a == b,
            (RawValue::Bool(a), RawValue::Bool(b)) => a == b,
            (RawValue::Graph(a), RawValue::Graph(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Slot of a basic (scalar) value.
#[derive(Clone, Debug)]
pub struct BasicSlot {
    pub ty: TypeId,
    pub raw: RawValue,
    /// Explicitly authored, as opposed to a synthesized default.
    pub dirty: bool,
}

/// Slot of an aggregate value: its members live in a memory space, which
/// may be lexical (DSL-owned) or host-backed (encapsulated object).
#[derive(Clone)]
pub struct AggregateSlot {
    pub ty: TypeId,
    pub space: SpaceRef,
    /// The live host object once the value has been translated.
    pub internal: Option<HostInstance>,
    pub dirty: bool,
}

/// Slot of an enum value; `variant` is `None` while unset.
#[derive(Clone, Debug)]
pub struct EnumSlot {
    pub ty: TypeId,
    pub variant: Option<Name>,
    pub dirty: bool,
}

/// Reference to a callable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallableRef {
    /// Host-exposed native; no DSL body.
    Native(NativeFnId),
    /// User-defined function symbol; body walked per call.
    User(SymbolId),
}

/// Slot of a function value.
#[derive(Clone, Debug)]
pub struct FuncSlot {
    pub ty: TypeId,
    pub callable: Option<CallableRef>,
    pub dirty: bool,
}

/// Slot of a list value.
#[derive(Clone)]
pub struct ListSlot {
    /// The list type when pre-interned; literals carry only `element`.
    pub ty: TypeId,
    pub element: TypeId,
    pub entries: Vec<Value>,
    pub dirty: bool,
}

/// Slot of a set value. Entries are identified by their internal scalar
/// value, not by `Value` identity.
#[derive(Clone)]
pub struct SetSlot {
    pub ty: TypeId,
    pub element: TypeId,
    pub entries: Vec<Value>,
    pub dirty: bool,
}

impl SetSlot {
    /// Add a value unless an entry with the same internal value exists.
    /// Returns whether the set grew.
    pub fn add(&mut self, value: Value) -> bool {
        let key = value.internal_key();
        if self.entries.iter().any(|v| v.internal_key() == key) {
            return false;
        }
        self.entries.push(value);
        true
    }
}

/// Slot of a map value; keys are identified by internal value.
#[derive(Clone)]
pub struct MapSlot {
    pub ty: TypeId,
    pub key: TypeId,
    pub element: TypeId,
    pub entries: Vec<(Value, Value)>,
    pub dirty: bool,
}

impl MapSlot {
    /// Insert or overwrite the entry under `key`'s internal value.
    pub fn insert(&mut self, key: Value, value: Value) {
        let k = key.internal_key();
        if let Some(entry) = self.entries.iter_mut().find(|(ek, _)| ek.internal_key() == k) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Look up by internal key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        let k = key.internal_key();
        self.entries
            .iter()
            .find(|(ek, _)| ek.internal_key() == k)
            .map(|(_, v)| v)
    }
}

/// Identity of a value's internal payload, used for collection
/// de-duplication.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ValueKey {
    None,
    Int(i64),
    FloatBits(u64),
    Str(String),
    Bool(bool),
    Variant(u32, Option<u32>),
    /// Identity by slot or host-object address.
    Addr(usize),
}

/// Runtime value handle.
#[derive(Clone)]
pub enum Value {
    /// The shared "not found / unset" sentinel.
    None,
    Basic(Shared<BasicSlot>),
    Aggregate(Shared<AggregateSlot>),
    Enum(Shared<EnumSlot>),
    Func(Shared<FuncSlot>),
    List(Shared<ListSlot>),
    Set(Shared<SetSlot>),
    Map(Shared<MapSlot>),
    /// A prototype is a type-and-value hybrid: it is bound by name like a
    /// value and instantiated like a type.
    Prototype(Shared<PrototypeSlot>),
    /// Scalar or callable bound to one host field, kept live for writes.
    EncapsulatedField(Shared<FieldSlot>),
    /// Scalar bound to a getter/setter pair.
    Property(Shared<PropertySlot>),
    /// Aggregate bound to a getter/setter pair.
    AggregateProperty(Shared<AggPropertySlot>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Basic(s) => f.debug_tuple("Basic").field(&*s.borrow()).finish(),
            Value::Enum(s) => f.debug_tuple("Enum").field(&*s.borrow()).finish(),
            Value::Func(s) => f.debug_tuple("Func").field(&*s.borrow()).finish(),
            Value::Aggregate(_) => write!(f, "Aggregate(..)"),
            Value::List(_) => write!(f, "List(..)"),
            Value::Set(_) => write!(f, "Set(..)"),
            Value::Map(_) => write!(f, "Map(..)"),
            Value::Prototype(_) => write!(f, "Prototype(..)"),
            Value::EncapsulatedField(_) => write!(f, "EncapsulatedField(..)"),
            Value::Property(_) => write!(f, "Property(..)"),
            Value::AggregateProperty(_) => write!(f, "AggregateProperty(..)"),
        }
    }
}

impl Value {
    // Factory methods

    pub fn int(n: i64) -> Value {
        Value::basic(TypeId::INT, RawValue::Int(n))
    }

    pub fn float(f: f64) -> Value {
        Value::basic(TypeId::FLOAT, RawValue::Float(f))
    }

    pub fn string(s: impl AsRef<str>) -> Value {
        Value::basic(TypeId::STRING, RawValue::Str(Rc::from(s.as_ref())))
    }

    pub fn bool_value(b: bool) -> Value {
        Value::basic(TypeId::BOOL, RawValue::Bool(b))
    }

    pub fn graph(graph: TaskGraph) -> Value {
        Value::basic(TypeId::GRAPH, RawValue::Graph(Rc::new(graph)))
    }

    pub fn basic(ty: TypeId, raw: RawValue) -> Value {
        Value::Basic(Shared::new(BasicSlot {
            ty,
            raw,
            dirty: false,
        }))
    }

    pub fn func(ty: TypeId, callable: CallableRef) -> Value {
        Value::Func(Shared::new(FuncSlot {
            ty,
            callable: Some(callable),
            dirty: false,
        }))
    }

    /// Whether this is the `NONE` sentinel.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// The value's data type.
    pub fn data_type(&self) -> TypeId {
        match self {
            Value::None => TypeId::NONE,
            Value::Basic(slot) => slot.borrow().ty,
            Value::Aggregate(slot) => slot.borrow().ty,
            Value::Enum(slot) => slot.borrow().ty,
            Value::Func(slot) => slot.borrow().ty,
            Value::List(slot) => slot.borrow().ty,
            Value::Set(slot) => slot.borrow().ty,
            Value::Map(slot) => slot.borrow().ty,
            Value::Prototype(slot) => slot.borrow().kind,
            Value::EncapsulatedField(slot) => slot.borrow().ty,
            Value::Property(slot) => slot.borrow().ty,
            Value::AggregateProperty(slot) => slot.borrow().ty,
        }
    }

    /// Whether the value was explicitly authored (set), as opposed to
    /// synthesized as a default.
    pub fn is_dirty(&self) -> bool {
        match self {
            Value::None => false,
            Value::Basic(slot) => slot.borrow().dirty,
            Value::Aggregate(slot) => slot.borrow().dirty,
            Value::Enum(slot) => slot.borrow().dirty,
            Value::Func(slot) => slot.borrow().dirty,
            Value::List(slot) => slot.borrow().dirty,
            Value::Set(slot) => slot.borrow().dirty,
            Value::Map(slot) => slot.borrow().dirty,
            // host-backed and prototype values are always live
            Value::Prototype(_)
            | Value::EncapsulatedField(_)
            | Value::Property(_)
            | Value::AggregateProperty(_) => true,
        }
    }

    /// Mark the value explicitly authored.
    pub fn set_dirty(&self) {
        match self {
            Value::Basic(slot) => slot.borrow_mut().dirty = true,
            Value::Aggregate(slot) => slot.borrow_mut().dirty = true,
            Value::Enum(slot) => slot.borrow_mut().dirty = true,
            Value::Func(slot) => slot.borrow_mut().dirty = true,
            Value::List(slot) => slot.borrow_mut().dirty = true,
            Value::Set(slot) => slot.borrow_mut().dirty = true,
            Value::Map(slot) => slot.borrow_mut().dirty = true,
            _ => {}
        }
    }

    /// Identity of the internal payload, for collection membership.
    pub fn internal_key(&self) -> ValueKey {
        match self {
            Value::None => ValueKey::None,
            Value::Basic(slot) => match &slot.borrow().raw {
                RawValue::None => ValueKey::None,
                RawValue::Int(n) => ValueKey::Int(*n),
                RawValue::Float(f) => ValueKey::FloatBits(f.to_bits()),
                RawValue::Str(s) => ValueKey::Str(s.to_string()),
                RawValue::Bool(b) => ValueKey::Bool(*b),
                RawValue::Graph(g) => ValueKey::Addr(Rc::as_ptr(g) as usize),
            },
            Value::Enum(slot) => {
                let slot = slot.borrow();
                ValueKey::Variant(
                    slot.ty.index() as u32,
                    slot.variant.map(quill_ir::Name::raw),
                )
            }
            Value::Aggregate(slot) => {
                let borrowed = slot.borrow();
                match &borrowed.internal {
                    Some(instance) => ValueKey::Addr(Rc::as_ptr(instance).cast::<u8>() as usize),
                    None => ValueKey::Addr(borrowed.space.addr()),
                }
            }
            Value::Func(slot) => ValueKey::Addr(slot.addr()),
            Value::List(slot) => ValueKey::Addr(slot.addr()),
            Value::Set(slot) => ValueKey::Addr(slot.addr()),
            Value::Map(slot) => ValueKey::Addr(slot.addr()),
            Value::Prototype(slot) => ValueKey::Addr(slot.addr()),
            Value::EncapsulatedField(slot) => ValueKey::Addr(slot.addr()),
            Value::Property(slot) => ValueKey::Addr(slot.addr()),
            Value::AggregateProperty(slot) => ValueKey::Addr(slot.addr()),
        }
    }

    /// Truthiness, following the original semantics: the sentinel is
    /// false, an empty aggregate is false, an unset enum is false, a
    /// zero-like basic is false, anything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Basic(slot) => slot.borrow().raw.is_truthy(),
            Value::Aggregate(slot) => {
                let borrowed = slot.borrow();
                match &borrowed.space {
                    SpaceRef::Lexical(space) => !space.borrow().is_empty(),
                    SpaceRef::Host(_) => true,
                }
            }
            Value::Enum(slot) => slot.borrow().variant.is_some(),
            _ => true,
        }
    }

    /// Deep copy for scalar payloads, fresh-handle copy elsewhere.
    ///
    /// Basic/enum/function slots get fresh slots (mutating the copy never
    /// touches the source); collections copy entries recursively;
    /// aggregates get a fresh slot over the same member space (the
    /// prototype engine instantiates nested aggregates through nested
    /// prototypes instead of relying on aggregate deep-copy).
    pub fn clone_value(&self) -> Value {
        match self {
            Value::None => Value::None,
            Value::Basic(slot) => Value::Basic(Shared::new(slot.borrow().clone())),
            Value::Enum(slot) => Value::Enum(Shared::new(slot.borrow().clone())),
            Value::Func(slot) => Value::Func(Shared::new(slot.borrow().clone())),
            Value::List(slot) => {
                let borrowed = slot.borrow();
                Value::List(Shared::new(ListSlot {
                    ty: borrowed.ty,
                    element: borrowed.element,
                    entries: borrowed.entries.iter().map(Value::clone_value).collect(),
                    dirty: borrowed.dirty,
                }))
            }
            Value::Set(slot) => {
                let borrowed = slot.borrow();
                Value::Set(Shared::new(SetSlot {
                    ty: borrowed.ty,
                    element: borrowed.element,
                    entries: borrowed.entries.iter().map(Value::clone_value).collect(),
                    dirty: borrowed.dirty,
                }))
            }
            Value::Map(slot) => {
                let borrowed = slot.borrow();
                Value::Map(Shared::new(MapSlot {
                    ty: borrowed.ty,
                    key: borrowed.key,
                    element: borrowed.element,
                    entries: borrowed
                        .entries
                        .iter()
                        .map(|(k, v)| (k.clone_value(), v.clone_value()))
                        .collect(),
                    dirty: borrowed.dirty,
                }))
            }
            Value::Aggregate(slot) => Value::Aggregate(Shared::new(slot.borrow().clone())),
            Value::Prototype(slot) => Value::Prototype(Shared::new(slot.borrow().clone())),
            // host-backed values stay live links; copying them would break
            // write-through
            Value::EncapsulatedField(slot) => Value::EncapsulatedField(slot.clone()),
            Value::Property(slot) => Value::Property(slot.clone()),
            Value::AggregateProperty(slot) => Value::AggregateProperty(slot.clone()),
        }
    }

    /// Copy a raw scalar into this basic slot.
    ///
    /// Returns `false` on scalar-kind mismatch, leaving the slot
    /// unmodified; `int` widens into a `float` slot.
    pub fn set_raw(&self, incoming: RawValue) -> bool {
        let Value::Basic(dst) = self else {
            return false;
        };
        let mut dst = dst.borrow_mut();
        let converted = match (&dst.raw, incoming) {
            // int literals flow into float slots
            (RawValue::Float(_), RawValue::Int(n)) => RawValue::Float(n as f64),
            (RawValue::None, incoming) => incoming,
            (current, incoming) if current.same_kind(&incoming) => incoming,
            _ => return false,
        };
        dst.raw = converted;
        dst.dirty = true;
        true
    }

    /// Copy a basic payload from another basic value into this slot.
    pub fn set_raw_from(&self, other: &Value) -> bool {
        let Value::Basic(src) = other else {
            return false;
        };
        let incoming = src.borrow().raw.clone();
        self.set_raw(incoming)
    }

    /// Promote the value to a declared member type (authored literals are
    /// typed by the slot they are assigned into).
    pub fn promote_type(&self, ty: TypeId) {
        if ty.is_none() {
            return;
        }
        match self {
            Value::Basic(slot) => slot.borrow_mut().ty = ty,
            Value::Aggregate(slot) => slot.borrow_mut().ty = ty,
            Value::Enum(slot) => slot.borrow_mut().ty = ty,
            Value::Func(slot) => slot.borrow_mut().ty = ty,
            Value::List(slot) => slot.borrow_mut().ty = ty,
            Value::Set(slot) => slot.borrow_mut().ty = ty,
            Value::Map(slot) => slot.borrow_mut().ty = ty,
            _ => {}
        }
    }

    /// Render for diagnostics and `print`.
    pub fn render(&self, interner: &StringInterner) -> String {
        match self {
            Value::None => "none".to_owned(),
            Value::Basic(slot) => match &slot.borrow().raw {
                RawValue::None => "none".to_owned(),
                RawValue::Int(n) => n.to_string(),
                RawValue::Float(f) => f.to_string(),
                RawValue::Str(s) => s.to_string(),
                RawValue::Bool(b) => b.to_string(),
                RawValue::Graph(g) => {
                    format!("graph '{}'", interner.lookup(g.name))
                }
            },
            Value::Enum(slot) => {
                let borrowed = slot.borrow();
                match borrowed.variant {
                    Some(variant) => interner.lookup(variant).to_owned(),
                    None => "none".to_owned(),
                }
            }
            Value::Aggregate(_) | Value::AggregateProperty(_) => "<aggregate>".to_owned(),
            Value::Func(_) => "<function>".to_owned(),
            Value::List(slot) => {
                let entries: Vec<String> = slot
                    .borrow()
                    .entries
                    .iter()
                    .map(|v| v.render(interner))
                    .collect();
                format!("[{}]", entries.join(", "))
            }
            Value::Set(slot) => {
                let entries: Vec<String> = slot
                    .borrow()
                    .entries
                    .iter()
                    .map(|v| v.render(interner))
                    .collect();
                format!("<{}>", entries.join(", "))
            }
            Value::Map(_) => "<map>".to_owned(),
            Value::Prototype(slot) => {
                format!("<prototype {}>", interner.lookup(slot.borrow().name))
            }
            Value::EncapsulatedField(_) | Value::Property(_) => "<host field>".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_value_detaches_basic_slots() {
        let a = Value::int(3);
        let b = a.clone_value();
        assert!(b.set_raw_from(&Value::int(9)));
        match (&a, &b) {
            (Value::Basic(a), Value::Basic(b)) => {
                assert_eq!(a.borrow().raw, RawValue::Int(3));
                assert_eq!(b.borrow().raw, RawValue::Int(9));
            }
            _ => panic!("expected basic values"),
        }
    }

    #[test]
    fn plain_clone_aliases() {
        let a = Value::int(3);
        let b = a.clone();
        assert!(b.set_raw_from(&Value::int(9)));
        if let Value::Basic(slot) = &a {
            assert_eq!(slot.borrow().raw, RawValue::Int(9));
        }
    }

    #[test]
    fn kind_mismatch_leaves_slot_untouched() {
        let slot = Value::int(3);
        assert!(!slot.set_raw_from(&Value::string("torch")));
        if let Value::Basic(slot) = &slot {
            assert_eq!(slot.borrow().raw, RawValue::Int(3));
        }
    }

    #[test]
    fn int_widens_into_float_slot() {
        let slot = Value::float(0.0);
        assert!(slot.set_raw_from(&Value::int(7)));
        if let Value::Basic(slot) = &slot {
            assert_eq!(slot.borrow().raw, RawValue::Float(7.0));
        }
    }

    #[test]
    fn set_identity_is_by_internal_value() {
        let mut set = SetSlot {
            ty: TypeId::NONE,
            element: TypeId::INT,
            entries: Vec::new(),
            dirty: false,
        };
        assert!(set.add(Value::int(1)));
        // a distinct Value handle with the same internal value is a duplicate
        assert!(!set.add(Value::int(1)));
        assert!(set.add(Value::int(2)));
        assert_eq!(set.entries.len(), 2);
    }

    #[test]
    fn truthiness_table() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::int(0).is_truthy());
        assert!(Value::int(-1).is_truthy());
        assert!(!Value::float(0.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::string("x").is_truthy());
        assert!(!Value::bool_value(false).is_truthy());
    }
}
