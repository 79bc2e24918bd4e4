//! Prototypes: default-value templates for aggregate types.
//!
//! Every user-defined game-object or item definition yields a prototype: a
//! mapping from member name to either a default value (marked dirty, i.e.
//! explicitly authored) or a nested prototype for aggregate-typed members.
//! Prototypes are built once when the runtime initializes and consumed
//! repeatedly by instantiation; instantiation deep-copies, so instances
//! never alias the template's defaults.
//!
//! Creation and instantiation walk AST nodes and synthesize defaults, so
//! they live on the interpreter; this module holds the template itself.

use crate::value::Value;
use quill_ir::Name;
use quill_types::TypeId;
use rustc_hash::FxHashMap;

/// A named template of member defaults for an aggregate type.
#[derive(Clone)]
pub struct PrototypeSlot {
    /// `TypeId::PROTOTYPE` for game-object definitions,
    /// `TypeId::ITEM_PROTOTYPE` for item definitions.
    pub kind: TypeId,
    /// The defined name (e.g. the `entity_type` identifier).
    pub name: Name,
    /// The underlying aggregate type being templated.
    pub ty: TypeId,
    defaults: FxHashMap<Name, Value>,
    order: Vec<Name>,
}

impl PrototypeSlot {
    pub fn new(kind: TypeId, name: Name, ty: TypeId) -> Self {
        PrototypeSlot {
            kind,
            name,
            ty,
            defaults: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Record a default for a member. The value may itself be a nested
    /// prototype (for aggregate-typed members).
    pub fn add_default(&mut self, member: Name, value: Value) {
        if self.defaults.insert(member, value).is_none() {
            self.order.push(member);
        }
    }

    /// The default recorded for a member, if any.
    pub fn default_for(&self, member: Name) -> Option<&Value> {
        self.defaults.get(&member)
    }

    /// Recorded defaults in authoring order.
    pub fn defaults(&self) -> impl Iterator<Item = (Name, &Value)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.defaults.get(name).map(|v| (*name, v)))
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_authoring_order() {
        let mut proto = PrototypeSlot::new(TypeId::PROTOTYPE, Name::from_raw(1), TypeId::NONE);
        proto.add_default(Name::from_raw(10), Value::int(1));
        proto.add_default(Name::from_raw(11), Value::int(2));
        proto.add_default(Name::from_raw(10), Value::int(3));

        let names: Vec<Name> = proto.defaults().map(|(n, _)| n).collect();
        assert_eq!(names, vec![Name::from_raw(10), Name::from_raw(11)]);
        assert_eq!(proto.len(), 2);
    }
}
