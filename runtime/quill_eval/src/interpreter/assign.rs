//! The value-setting family.
//!
//! Local, recoverable conditions (unknown member, scalar-kind mismatch,
//! non-settable property) report `false` and leave the assignee
//! untouched. Host access failures propagate as errors.

use super::Interpreter;
use crate::error::EvalResult;
use crate::host::{instantiate_value, HostWrite};
use crate::shared::Shared;
use crate::value::{CallableRef, ListSlot, MapSlot, RawValue, SetSlot, Value};
use quill_types::TypeKind;
use std::any::Any;
use std::rc::Rc;

impl Interpreter {
    /// Assign `value` into `assignee`.
    pub fn set_value(&mut self, assignee: &Value, value: &Value) -> EvalResult<bool> {
        match assignee {
            Value::None => Ok(false),

            Value::Basic(_) => {
                let raw = self.raw_of(value)?;
                Ok(assignee.set_raw(raw))
            }

            Value::Aggregate(dst) => self.set_aggregate_value(dst, value),

            Value::Enum(dst) => match value {
                Value::Enum(src) => {
                    if !Shared::same(dst, src) {
                        let variant = src.borrow().variant;
                        let mut dst = dst.borrow_mut();
                        dst.variant = variant;
                        dst.dirty = true;
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },

            Value::Func(dst) => match self.callable_of(value)? {
                Some(callable) => {
                    let mut dst = dst.borrow_mut();
                    dst.callable = Some(callable);
                    dst.dirty = true;
                    Ok(true)
                }
                None => Ok(false),
            },

            Value::List(dst) => self.set_list_value(dst, value),
            Value::Set(dst) => self.set_set_value(dst, value),
            Value::Map(dst) => self.set_map_value(dst, value),

            Value::Prototype(dst) => match value {
                Value::Prototype(src) => {
                    if !Shared::same(dst, src) {
                        *dst.borrow_mut() = src.borrow().clone();
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },

            Value::EncapsulatedField(dst) => {
                let ty = dst.borrow().ty;
                if matches!(self.renv.types().kind(ty), TypeKind::Function(_)) {
                    match self.callable_of(value)? {
                        Some(callable) => dst.borrow().write_callback(callable),
                        None => Ok(false),
                    }
                } else {
                    let raw = self.raw_of(value)?;
                    dst.borrow().write_raw(&raw)
                }
            }

            Value::Property(dst) => {
                let raw = self.raw_of(value)?;
                dst.borrow().set_raw(&raw)
            }

            Value::AggregateProperty(dst) => {
                // push the instantiated host object through the setter
                let Some(instance) = instantiate_value(value, &self.renv)? else {
                    return Ok(false);
                };
                let any: Rc<dyn Any> = Rc::new(instance);
                dst.borrow().set_instance(&HostWrite::Opaque(any))
            }
        }
    }

    /// Aggregate-to-aggregate assignment.
    ///
    /// In compatibility mode (the default) this reproduces the original
    /// dual behavior: the assignee's memory space is replaced wholesale by
    /// the source's (aliasing, not deep copy) while the raw internal value
    /// is also copied. Scripts observing mutation-through-alias depend on
    /// this. With compatibility off, members are deep-copied instead.
    fn set_aggregate_value(
        &mut self,
        dst: &Shared<crate::value::AggregateSlot>,
        value: &Value,
    ) -> EvalResult<bool> {
        let Value::Aggregate(src) = value else {
            return Ok(false);
        };
        if Shared::same(dst, src) {
            return Ok(true);
        }

        if self.assign_compat {
            let (space, internal) = {
                let src = src.borrow();
                (src.space.clone(), src.internal.clone())
            };
            let mut dst = dst.borrow_mut();
            dst.space = space;
            dst.internal = internal;
            dst.dirty = true;
            return Ok(true);
        }

        // pure value semantics: copy members into a fresh space
        let (dst_ty, fresh) = {
            let dst = dst.borrow();
            (dst.ty, crate::memory::SpaceRef::root())
        };
        let members: Vec<quill_types::Member> = self.renv.types().members(dst_ty).to_vec();
        let src_space = src.borrow().space.clone();
        for member in members {
            let member_value = src_space.resolve_local(member.name)?;
            if !member_value.is_none() {
                fresh.bind_value(member.name, member_value.clone_value());
            }
        }
        let mut dst = dst.borrow_mut();
        dst.space = fresh;
        dst.dirty = true;
        Ok(true)
    }

    fn set_list_value(&mut self, dst: &Shared<ListSlot>, value: &Value) -> EvalResult<bool> {
        let Value::List(src) = value else {
            return Ok(false);
        };
        if Shared::same(dst, src) {
            return Ok(true);
        }
        let (src_element, src_entries) = {
            let src = src.borrow();
            (src.element, src.entries.clone())
        };
        let dst_element = dst.borrow().element;

        if dst_element == src_element || dst_element.is_none() || src_element.is_none() {
            let mut dst = dst.borrow_mut();
            dst.entries = src_entries;
            dst.dirty = true;
            return Ok(true);
        }

        // element types differ: convert entry-wise through typed slots
        let mut converted = Vec::with_capacity(src_entries.len());
        for entry in &src_entries {
            let slot = self.create_default_value(dst_element)?;
            self.set_value(&slot, entry)?;
            converted.push(slot);
        }
        let mut dst = dst.borrow_mut();
        dst.entries = converted;
        dst.dirty = true;
        Ok(true)
    }

    fn set_set_value(&mut self, dst: &Shared<SetSlot>, value: &Value) -> EvalResult<bool> {
        let Value::Set(src) = value else {
            return Ok(false);
        };
        if Shared::same(dst, src) {
            return Ok(true);
        }
        let (src_element, src_entries) = {
            let src = src.borrow();
            (src.element, src.entries.clone())
        };
        let dst_element = dst.borrow().element;

        if dst_element == src_element || dst_element.is_none() || src_element.is_none() {
            let mut dst = dst.borrow_mut();
            dst.entries.clear();
            dst.dirty = true;
            for entry in src_entries {
                dst.add(entry);
            }
            return Ok(true);
        }

        let mut converted: Vec<Value> = Vec::with_capacity(src_entries.len());
        for entry in &src_entries {
            let slot = self.create_default_value(dst_element)?;
            self.set_value(&slot, entry)?;
            converted.push(slot);
        }
        let mut dst = dst.borrow_mut();
        dst.entries.clear();
        dst.dirty = true;
        for entry in converted {
            dst.add(entry);
        }
        Ok(true)
    }

    fn set_map_value(&mut self, dst: &Shared<MapSlot>, value: &Value) -> EvalResult<bool> {
        let Value::Map(src) = value else {
            return Ok(false);
        };
        if Shared::same(dst, src) {
            return Ok(true);
        }
        let (src_key, src_element, src_entries) = {
            let src = src.borrow();
            (src.key, src.element, src.entries.clone())
        };
        let (dst_key, dst_element) = {
            let dst = dst.borrow();
            (dst.key, dst.element)
        };

        if (dst_key == src_key && dst_element == src_element)
            || dst_key.is_none()
            || src_key.is_none()
        {
            let mut dst = dst.borrow_mut();
            dst.entries = src_entries;
            dst.dirty = true;
            return Ok(true);
        }

        let mut converted: Vec<(Value, Value)> = Vec::with_capacity(src_entries.len());
        for (key, entry) in &src_entries {
            let key_slot = self.create_default_value(dst_key)?;
            self.set_value(&key_slot, key)?;
            let entry_slot = self.create_default_value(dst_element)?;
            self.set_value(&entry_slot, entry)?;
            converted.push((key_slot, entry_slot));
        }
        let mut dst = dst.borrow_mut();
        dst.entries.clear();
        dst.dirty = true;
        for (key, entry) in converted {
            dst.insert(key, entry);
        }
        Ok(true)
    }

    /// The raw scalar behind a value: basic slots directly, host-bound
    /// fields and properties through their live accessors.
    pub(crate) fn raw_of(&self, value: &Value) -> EvalResult<RawValue> {
        match value {
            Value::Basic(slot) => Ok(slot.borrow().raw.clone()),
            Value::EncapsulatedField(slot) => slot.borrow().current(),
            Value::Property(slot) => slot.borrow().get_raw(),
            _ => Ok(RawValue::None),
        }
    }

    /// The callable behind a value, when it has one.
    pub(crate) fn callable_of(&self, value: &Value) -> EvalResult<Option<CallableRef>> {
        match value {
            Value::Func(slot) => Ok(slot.borrow().callable),
            Value::EncapsulatedField(slot) => slot.borrow().callable(),
            _ => Ok(None),
        }
    }
}
