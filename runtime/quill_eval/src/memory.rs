//! Memory spaces: lexical name→value environments.
//!
//! The interpreter maintains one global space for the lifetime of the run
//! plus a stack of transient spaces (function calls, aggregate
//! instantiations, nested property blocks, loop iterations). Binding a
//! name that already resolves locally overwrites; resolving a missing name
//! yields the `NONE` sentinel, never an error.
//!
//! A `SpaceRef` abstracts over DSL-owned lexical spaces and host-backed
//! (encapsulated) spaces, because an aggregate's backing store is swapped
//! from the former to the latter when its definition is translated into a
//! live host object.

use crate::error::{EvalError, EvalResult};
use crate::host::EncapsulatedObject;
use crate::shared::Shared;
use crate::value::Value;
use quill_ir::{Name, StringInterner};
use rustc_hash::FxHashMap;

/// An ordered name→value mapping with an optional parent for fallback
/// resolution.
#[derive(Default)]
pub struct MemorySpace {
    bindings: FxHashMap<Name, Value>,
    /// Binding order, for deterministic iteration.
    order: Vec<Name>,
    parent: Option<SpaceRef>,
}

impl MemorySpace {
    pub fn new() -> Self {
        MemorySpace::default()
    }

    pub fn with_parent(parent: SpaceRef) -> Self {
        MemorySpace {
            bindings: FxHashMap::default(),
            order: Vec::new(),
            parent: Some(parent),
        }
    }

    /// Install a value locally, overwriting any prior local binding.
    pub fn bind_value(&mut self, name: Name, value: Value) {
        if self.bindings.insert(name, value).is_none() {
            self.order.push(name);
        }
    }

    /// Resolve in this space only; the sentinel when missing.
    pub fn resolve_local(&self, name: Name) -> Value {
        self.bindings.get(&name).cloned().unwrap_or(Value::None)
    }

    /// Resolve locally, then through the parent chain.
    pub fn resolve(&self, name: Name) -> EvalResult<Value> {
        if let Some(value) = self.bindings.get(&name) {
            return Ok(value.clone());
        }
        match &self.parent {
            Some(parent) => parent.resolve(name),
            None => Ok(Value::None),
        }
    }

    /// Remove a local binding; missing names are a no-op.
    pub fn delete(&mut self, name: Name) {
        if self.bindings.remove(&name).is_some() {
            self.order.retain(|&n| n != name);
        }
    }

    /// Bindings in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (Name, &Value)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.bindings.get(name).map(|v| (*name, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

/// Handle onto a memory space: lexical (DSL-owned) or host-backed.
#[derive(Clone)]
pub enum SpaceRef {
    Lexical(Shared<MemorySpace>),
    Host(Shared<EncapsulatedObject>),
}

impl SpaceRef {
    /// A fresh lexical space with no parent.
    pub fn root() -> SpaceRef {
        SpaceRef::Lexical(Shared::new(MemorySpace::new()))
    }

    /// A fresh lexical space chained to `parent`.
    pub fn child_of(parent: &SpaceRef) -> SpaceRef {
        SpaceRef::Lexical(Shared::new(MemorySpace::with_parent(parent.clone())))
    }

    /// Install a binding. Host-backed spaces accept no bindings; the
    /// attempt reports `false`.
    pub fn bind_value(&self, name: Name, value: Value) -> bool {
        match self {
            SpaceRef::Lexical(space) => {
                space.borrow_mut().bind_value(name, value);
                true
            }
            SpaceRef::Host(_) => false,
        }
    }

    /// Resolve through the parent chain. Host-backed resolution can fail
    /// structurally (host access error); lexical resolution cannot.
    pub fn resolve(&self, name: Name) -> EvalResult<Value> {
        match self {
            SpaceRef::Lexical(space) => space.borrow().resolve(name),
            SpaceRef::Host(object) => object.borrow_mut().resolve(name),
        }
    }

    /// Resolve without consulting parents.
    pub fn resolve_local(&self, name: Name) -> EvalResult<Value> {
        match self {
            SpaceRef::Lexical(space) => Ok(space.borrow().resolve_local(name)),
            SpaceRef::Host(object) => object.borrow_mut().resolve(name),
        }
    }

    /// Remove a binding. Host-backed (introspected) spaces fail loudly
    /// instead of silently ignoring the request.
    pub fn delete(&self, name: Name, interner: &StringInterner) -> EvalResult<()> {
        match self {
            SpaceRef::Lexical(space) => {
                space.borrow_mut().delete(name);
                Ok(())
            }
            SpaceRef::Host(_) => Err(EvalError::ReadOnlySpace {
                name: interner.lookup(name).to_owned(),
            }),
        }
    }

    /// Identity address, for value keys.
    pub fn addr(&self) -> usize {
        match self {
            SpaceRef::Lexical(space) => space.addr(),
            SpaceRef::Host(object) => object.addr(),
        }
    }

    /// Whether both refs point at the same space.
    pub fn same(a: &SpaceRef, b: &SpaceRef) -> bool {
        a.addr() == b.addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawValue;

    fn name(n: u32) -> Name {
        Name::from_raw(n)
    }

    #[test]
    fn bind_overwrites_local() {
        let mut space = MemorySpace::new();
        space.bind_value(name(1), Value::int(1));
        space.bind_value(name(1), Value::int(2));
        match space.resolve_local(name(1)) {
            Value::Basic(slot) => assert_eq!(slot.borrow().raw, RawValue::Int(2)),
            other => panic!("unexpected {}", other.is_none()),
        }
        assert_eq!(space.len(), 1);
    }

    #[test]
    fn missing_name_resolves_to_sentinel() {
        let space = MemorySpace::new();
        assert!(space.resolve_local(name(9)).is_none());
        assert!(space.resolve(name(9)).is_ok_and(|v| v.is_none()));
    }

    #[test]
    fn parent_chain_resolution() {
        let parent = SpaceRef::root();
        parent.bind_value(name(1), Value::int(42));
        let child = SpaceRef::child_of(&parent);
        let resolved = child.resolve(name(1)).expect("lexical resolve");
        match resolved {
            Value::Basic(slot) => assert_eq!(slot.borrow().raw, RawValue::Int(42)),
            _ => panic!("expected basic"),
        }
        // local resolution does not chase the parent
        assert!(child
            .resolve_local(name(1))
            .is_ok_and(|v| v.is_none()));
    }

    #[test]
    fn shadowing_in_child_space() {
        let parent = SpaceRef::root();
        parent.bind_value(name(1), Value::int(1));
        let child = SpaceRef::child_of(&parent);
        child.bind_value(name(1), Value::int(2));
        match child.resolve(name(1)).expect("lexical resolve") {
            Value::Basic(slot) => assert_eq!(slot.borrow().raw, RawValue::Int(2)),
            _ => panic!("expected basic"),
        }
    }

    #[test]
    fn delete_removes_binding() {
        let space = SpaceRef::root();
        let interner = StringInterner::new();
        space.bind_value(name(1), Value::int(1));
        space.delete(name(1), &interner).expect("lexical delete");
        assert!(space.resolve(name(1)).is_ok_and(|v| v.is_none()));
    }
}
