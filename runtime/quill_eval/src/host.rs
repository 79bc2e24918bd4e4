//! Host binding layer.
//!
//! Three pieces, mirroring the two directions data crosses the boundary:
//!
//! - [`EncapsulatedObject`]: a memory-space proxy over a live host
//!   instance. Members resolve lazily through the class descriptor's
//!   accessors and are cached per instance so repeated resolution never
//!   re-translates.
//! - The runtime object translator ([`translate_instance`] /
//!   [`translate_read`]): host → DSL, with a registry of custom per-class
//!   translators in front of the default translation.
//! - The instantiator ([`instantiate_value`]): DSL → host, constructing an
//!   instance through the class descriptor and writing every explicitly
//!   authored (dirty) member through its accessor.
//!
//! Unknown member names resolve to the `NONE` sentinel or report `false`;
//! a descriptor/class mismatch is a fatal [`EvalError::HostAccess`].

use crate::error::{EvalError, EvalResult};
use crate::graph::TaskGraph;
use crate::memory::SpaceRef;
use crate::runtime_env::SharedRuntimeEnv;
use crate::shared::Shared;
use crate::value::{
    AggregateSlot, CallableRef, EnumSlot, ListSlot, MapSlot, RawValue, SetSlot, Value,
};
use quill_ir::Name;
pub(crate) use quill_types::HostWrite;
use quill_types::{
    instance_key, Capability, HostClass, HostClassKey, HostField, HostInstance, HostProperty,
    HostRead, HostScalar, TypeId, TypeKind,
};
use rustc_hash::FxHashMap;
use std::any::Any;
use std::rc::Rc;

// Scalar conversions across the boundary

pub(crate) fn scalar_to_raw(scalar: &HostScalar) -> RawValue {
    match scalar {
        HostScalar::Int(n) => RawValue::Int(*n),
        HostScalar::Float(f) => RawValue::Float(*f),
        HostScalar::Str(s) => RawValue::Str(Rc::from(s.as_str())),
        HostScalar::Bool(b) => RawValue::Bool(*b),
    }
}

pub(crate) fn raw_to_scalar(raw: &RawValue) -> Option<HostScalar> {
    match raw {
        RawValue::Int(n) => Some(HostScalar::Int(*n)),
        RawValue::Float(f) => Some(HostScalar::Float(*f)),
        RawValue::Str(s) => Some(HostScalar::Str(s.to_string())),
        RawValue::Bool(b) => Some(HostScalar::Bool(*b)),
        RawValue::None | RawValue::Graph(_) => None,
    }
}

fn basic_type_of(raw: &RawValue) -> TypeId {
    match raw {
        RawValue::Int(_) => TypeId::INT,
        RawValue::Float(_) => TypeId::FLOAT,
        RawValue::Str(_) => TypeId::STRING,
        RawValue::Bool(_) => TypeId::BOOL,
        RawValue::Graph(_) => TypeId::GRAPH,
        RawValue::None => TypeId::NONE,
    }
}

pub(crate) fn callback_to_callable(cb: &quill_types::HostCallback) -> CallableRef {
    match cb {
        quill_types::HostCallback::Native(id) => CallableRef::Native(*id),
        quill_types::HostCallback::Script(symbol) => CallableRef::User(*symbol),
    }
}

pub(crate) fn callable_to_callback(callable: CallableRef) -> quill_types::HostCallback {
    match callable {
        CallableRef::Native(id) => quill_types::HostCallback::Native(id),
        CallableRef::User(symbol) => quill_types::HostCallback::Script(symbol),
    }
}

/// A scalar (or callable) value kept live against one host field: reads go
/// through the field accessor on every access, writes push straight back
/// into the host instance.
pub struct FieldSlot {
    pub ty: TypeId,
    instance: HostInstance,
    field: HostField,
}

impl FieldSlot {
    pub(crate) fn new(ty: TypeId, instance: HostInstance, field: HostField) -> Self {
        FieldSlot {
            ty,
            instance,
            field,
        }
    }

    /// The field's current raw value.
    pub fn current(&self) -> EvalResult<RawValue> {
        let read = self.field.read(&*self.instance.borrow())?;
        Ok(match read {
            HostRead::Scalar(scalar) => scalar_to_raw(&scalar),
            HostRead::Opaque(any) => match any.downcast::<TaskGraph>() {
                Ok(graph) => RawValue::Graph(graph),
                Err(_) => RawValue::None,
            },
            _ => RawValue::None,
        })
    }

    /// The callable behind a function-typed field.
    pub fn callable(&self) -> EvalResult<Option<CallableRef>> {
        let read = self.field.read(&*self.instance.borrow())?;
        Ok(match read {
            HostRead::Callable(cb) => Some(callback_to_callable(&cb)),
            _ => None,
        })
    }

    /// Write a raw scalar through to the host field.
    pub fn write_raw(&self, raw: &RawValue) -> EvalResult<bool> {
        let write = match raw {
            RawValue::Graph(graph) => {
                let any: Rc<dyn Any> = graph.clone();
                HostWrite::Opaque(any)
            }
            RawValue::None => return Ok(false),
            other => match raw_to_scalar(other) {
                Some(scalar) => HostWrite::Scalar(scalar),
                None => return Ok(false),
            },
        };
        Ok(self.field.write(&mut *self.instance.borrow_mut(), &write)?)
    }

    /// Write a callable reference through to the host field.
    pub fn write_callback(&self, callable: CallableRef) -> EvalResult<bool> {
        let write = HostWrite::Callback(callable_to_callback(callable));
        Ok(self.field.write(&mut *self.instance.borrow_mut(), &write)?)
    }
}

/// A scalar value bound to a getter/setter pair with independent
/// capability flags. A disallowed get yields an empty read; a disallowed
/// set reports `false` and leaves the backing store untouched.
pub struct PropertySlot {
    pub ty: TypeId,
    property: HostProperty,
    instance: HostInstance,
}

impl PropertySlot {
    pub fn caps(&self) -> Capability {
        self.property.caps
    }

    pub fn get_raw(&self) -> EvalResult<RawValue> {
        let read = self.property.get(&*self.instance.borrow())?;
        Ok(match read {
            HostRead::Scalar(scalar) => scalar_to_raw(&scalar),
            _ => RawValue::None,
        })
    }

    pub fn set_raw(&self, raw: &RawValue) -> EvalResult<bool> {
        let Some(scalar) = raw_to_scalar(raw) else {
            return Ok(false);
        };
        Ok(self
            .property
            .set(&mut *self.instance.borrow_mut(), &HostWrite::Scalar(scalar))?)
    }
}

/// An aggregate value bound to a getter/setter pair; member resolution
/// goes through a host-backed space translated from the getter's result.
pub struct AggPropertySlot {
    pub ty: TypeId,
    property: HostProperty,
    instance: HostInstance,
    renv: SharedRuntimeEnv,
}

impl AggPropertySlot {
    pub fn caps(&self) -> Capability {
        self.property.caps
    }

    /// The member space behind the getter; `None` when the property is
    /// unset or not gettable.
    pub fn space(&self) -> EvalResult<Option<SpaceRef>> {
        let read = self.property.get(&*self.instance.borrow())?;
        match read {
            HostRead::Object(nested) => {
                let object = EncapsulatedObject::new(nested, self.ty, self.renv.clone())?;
                Ok(Some(SpaceRef::Host(Shared::new(object))))
            }
            _ => Ok(None),
        }
    }

    /// Push a host write through the setter (capability-checked).
    pub fn set_instance(&self, write: &HostWrite) -> EvalResult<bool> {
        Ok(self.property.set(&mut *self.instance.borrow_mut(), write)?)
    }
}

/// Memory-space proxy over a live host instance.
pub struct EncapsulatedObject {
    ty: TypeId,
    class: Rc<HostClass>,
    instance: HostInstance,
    renv: SharedRuntimeEnv,
    /// Already-translated members, so resolution translates each member
    /// once per instance.
    cache: FxHashMap<Name, Value>,
}

impl EncapsulatedObject {
    /// Wrap `instance` as a member space of the aggregate-adapted type
    /// `ty`. Fails when no host class is registered for the type.
    pub fn new(instance: HostInstance, ty: TypeId, renv: SharedRuntimeEnv) -> EvalResult<Self> {
        let class = renv
            .sem
            .host
            .class_for_type(ty)
            .cloned()
            .ok_or_else(|| EvalError::HostAccess {
                class: renv.lookup(renv.types().name(ty)).to_owned(),
                member: "<no registered host class>".to_owned(),
            })?;
        Ok(EncapsulatedObject {
            ty,
            class,
            instance,
            renv,
            cache: FxHashMap::default(),
        })
    }

    pub fn ty(&self) -> TypeId {
        self.ty
    }

    pub fn instance(&self) -> &HostInstance {
        &self.instance
    }

    /// Resolve a member: cached translation, declared field, or property.
    /// Unknown names yield the `NONE` sentinel.
    pub fn resolve(&mut self, name: Name) -> EvalResult<Value> {
        if let Some(value) = self.cache.get(&name) {
            return Ok(value.clone());
        }

        if let Some(field) = self.class.field(name).cloned() {
            let read = field.read(&*self.instance.borrow())?;
            let value = match read {
                // unset on the host side; not worth caching, the field may
                // be populated later
                HostRead::Null => return Ok(Value::None),
                HostRead::Scalar(scalar) => {
                    let ty = if field.ty.is_none() {
                        basic_type_of(&scalar_to_raw(&scalar))
                    } else {
                        field.ty
                    };
                    Value::EncapsulatedField(Shared::new(FieldSlot::new(
                        ty,
                        self.instance.clone(),
                        field,
                    )))
                }
                HostRead::Callable(_) => Value::EncapsulatedField(Shared::new(FieldSlot::new(
                    field.ty,
                    self.instance.clone(),
                    field,
                ))),
                HostRead::Object(nested) => translate_instance(&nested, field.ty, &self.renv)?,
                other => translate_read(other, field.ty, &self.renv)?,
            };
            self.cache.insert(name, value.clone());
            return Ok(value);
        }

        if let Some(property) = self.class.property(name).cloned() {
            let value = if self.renv.types().is_aggregate(property.ty) {
                Value::AggregateProperty(Shared::new(AggPropertySlot {
                    ty: property.ty,
                    property,
                    instance: self.instance.clone(),
                    renv: self.renv.clone(),
                }))
            } else {
                Value::Property(Shared::new(PropertySlot {
                    ty: property.ty,
                    property,
                    instance: self.instance.clone(),
                }))
            };
            return Ok(value);
        }

        Ok(Value::None)
    }

    /// Write a raw scalar into a declared field. Unknown members report
    /// `false`; aggregate (non-POD) members carry no writer and also
    /// report `false` rather than corrupting state.
    pub fn set_scalar(&mut self, name: Name, raw: &RawValue) -> EvalResult<bool> {
        let Some(field) = self.class.field(name) else {
            return Ok(false);
        };
        let Some(scalar) = raw_to_scalar(raw) else {
            return Ok(false);
        };
        Ok(field.write(
            &mut *self.instance.borrow_mut(),
            &HostWrite::Scalar(scalar),
        )?)
    }
}

/// Custom host→DSL translation for one class.
pub trait ObjectTranslator {
    fn translate(&self, instance: &HostInstance, renv: &SharedRuntimeEnv) -> EvalResult<Value>;
}

/// Registry of custom per-class translators consulted before the default
/// translation.
#[derive(Default)]
pub struct TranslatorRegistry {
    custom: FxHashMap<HostClassKey, Rc<dyn ObjectTranslator>>,
}

impl TranslatorRegistry {
    pub fn new() -> Self {
        TranslatorRegistry::default()
    }

    /// Register a translator for a class; `false` if one is already
    /// registered (the prior one stays).
    pub fn register(&mut self, key: HostClassKey, translator: Rc<dyn ObjectTranslator>) -> bool {
        if self.custom.contains_key(&key) {
            return false;
        }
        self.custom.insert(key, translator);
        true
    }

    pub fn get(&self, key: HostClassKey) -> Option<&Rc<dyn ObjectTranslator>> {
        self.custom.get(&key)
    }
}

/// Translate a live host instance into a DSL value.
///
/// Prefers the declared target type; falls back to the type registered for
/// the instance's runtime class. An unknown class yields the `NONE`
/// sentinel (a resolution miss, not an error).
pub fn translate_instance(
    instance: &HostInstance,
    target: TypeId,
    renv: &SharedRuntimeEnv,
) -> EvalResult<Value> {
    let key = instance_key(instance);
    if let Some(custom) = renv.translators.get(key) {
        let custom = custom.clone();
        return custom.translate(instance, renv);
    }

    let ty = if !target.is_none() && renv.sem.host.class_for_type(target).is_some() {
        target
    } else {
        renv.types().adapted_type_for(key)
    };
    if ty.is_none() {
        return Ok(Value::None);
    }

    let object = EncapsulatedObject::new(instance.clone(), ty, renv.clone())?;
    Ok(Value::Aggregate(Shared::new(AggregateSlot {
        ty,
        space: SpaceRef::Host(Shared::new(object)),
        internal: Some(instance.clone()),
        dirty: false,
    })))
}

/// Default translation of a host read into a DSL value.
pub fn translate_read(read: HostRead, target: TypeId, renv: &SharedRuntimeEnv) -> EvalResult<Value> {
    match read {
        HostRead::Null => Ok(Value::None),
        HostRead::Scalar(scalar) => {
            let raw = scalar_to_raw(&scalar);
            let ty = if target.is_none() {
                basic_type_of(&raw)
            } else {
                target
            };
            Ok(Value::basic(ty, raw))
        }
        HostRead::Callable(cb) => Ok(Value::func(target, callback_to_callable(&cb))),
        HostRead::Object(instance) => translate_instance(&instance, target, renv),
        HostRead::List(items) => {
            let element = match renv.types().kind(target) {
                TypeKind::List { element } => *element,
                _ => TypeId::NONE,
            };
            let mut entries = Vec::with_capacity(items.len());
            for item in items {
                entries.push(translate_read(item, element, renv)?);
            }
            Ok(Value::List(Shared::new(ListSlot {
                ty: target,
                element,
                entries,
                dirty: false,
            })))
        }
        HostRead::Set(items) => {
            let element = match renv.types().kind(target) {
                TypeKind::Set { element } => *element,
                _ => TypeId::NONE,
            };
            let mut slot = SetSlot {
                ty: target,
                element,
                entries: Vec::with_capacity(items.len()),
                dirty: false,
            };
            for item in items {
                let value = translate_read(item, element, renv)?;
                slot.add(value);
            }
            Ok(Value::Set(Shared::new(slot)))
        }
        HostRead::Map(items) => {
            let (key_ty, element) = match renv.types().kind(target) {
                TypeKind::Map { key, element } => (*key, *element),
                _ => (TypeId::NONE, TypeId::NONE),
            };
            let mut slot = MapSlot {
                ty: target,
                key: key_ty,
                element,
                entries: Vec::with_capacity(items.len()),
                dirty: false,
            };
            for (k, v) in items {
                let key = translate_read(k, key_ty, renv)?;
                let value = translate_read(v, element, renv)?;
                slot.insert(key, value);
            }
            Ok(Value::Map(Shared::new(slot)))
        }
        HostRead::EnumVariant(variant) => {
            let TypeKind::Enum(def) = renv.types().kind(target) else {
                return Ok(Value::None);
            };
            let name = renv.interner().intern(&variant);
            if def.variant_index(name).is_none() {
                return Ok(Value::None);
            }
            Ok(Value::Enum(Shared::new(EnumSlot {
                ty: target,
                variant: Some(name),
                dirty: false,
            })))
        }
        HostRead::Opaque(any) => match any.downcast::<TaskGraph>() {
            Ok(graph) => Ok(Value::basic(TypeId::GRAPH, RawValue::Graph(graph))),
            Err(_) => Ok(Value::None),
        },
    }
}

/// Translate an evaluated aggregate value into a live host instance.
///
/// Reuses the existing instance when the value is already host-bound;
/// otherwise constructs through the class descriptor and writes every
/// dirty member through its accessor. Types without a registered host
/// class stay DSL-side (`None`).
pub fn instantiate_value(value: &Value, renv: &SharedRuntimeEnv) -> EvalResult<Option<HostInstance>> {
    let Value::Aggregate(slot) = value else {
        return Ok(None);
    };
    let (ty, space, internal) = {
        let borrowed = slot.borrow();
        (borrowed.ty, borrowed.space.clone(), borrowed.internal.clone())
    };
    if let Some(existing) = internal {
        return Ok(Some(existing));
    }
    let Some(class) = renv.sem.host.class_for_type(ty).cloned() else {
        return Ok(None);
    };
    let Some(instance) = class.construct() else {
        return Ok(None);
    };

    for member in renv.types().members(ty) {
        let member_value = space.resolve_local(member.name)?;
        if member_value.is_none() || !member_value.is_dirty() {
            continue;
        }
        let Some(write) = to_host_write(&member_value, renv)? else {
            continue;
        };
        if let Some(property) = class.property(member.name) {
            property.set(&mut *instance.borrow_mut(), &write)?;
        } else if let Some(field) = class.field(member.name) {
            field.write(&mut *instance.borrow_mut(), &write)?;
        }
    }

    tracing::debug!(class = class.rust_name, "instantiated host object");
    Ok(Some(instance))
}

/// Lower a DSL value into a host write, when it has a host-side shape.
fn to_host_write(value: &Value, renv: &SharedRuntimeEnv) -> EvalResult<Option<HostWrite>> {
    match value {
        Value::Basic(slot) => {
            let raw = slot.borrow().raw.clone();
            match raw {
                RawValue::None => Ok(None),
                RawValue::Graph(graph) => {
                    let any: Rc<dyn Any> = graph;
                    Ok(Some(HostWrite::Opaque(any)))
                }
                other => Ok(raw_to_scalar(&other).map(HostWrite::Scalar)),
            }
        }
        Value::Enum(slot) => Ok(slot
            .borrow()
            .variant
            .map(|v| HostWrite::EnumVariant(renv.lookup(v).to_owned()))),
        Value::Func(slot) => Ok(slot
            .borrow()
            .callable
            .map(|c| HostWrite::Callback(callable_to_callback(c)))),
        Value::Aggregate(_) => {
            let nested = instantiate_value(value, renv)?;
            Ok(nested.map(|instance| {
                let any: Rc<dyn Any> = Rc::new(instance);
                HostWrite::Opaque(any)
            }))
        }
        Value::List(slot) => Ok(scalars_of(&slot.borrow().entries).map(|scalars| {
            let any: Rc<dyn Any> = Rc::new(scalars);
            HostWrite::Opaque(any)
        })),
        Value::Set(slot) => Ok(scalars_of(&slot.borrow().entries).map(|scalars| {
            let any: Rc<dyn Any> = Rc::new(scalars);
            HostWrite::Opaque(any)
        })),
        Value::EncapsulatedField(slot) => {
            let raw = slot.borrow().current()?;
            Ok(raw_to_scalar(&raw).map(HostWrite::Scalar))
        }
        _ => Ok(None),
    }
}

/// Scalar projection of collection entries; `None` when any entry is not
/// a plain scalar.
fn scalars_of(entries: &[Value]) -> Option<Vec<HostScalar>> {
    entries
        .iter()
        .map(|value| match value {
            Value::Basic(slot) => raw_to_scalar(&slot.borrow().raw),
            _ => None,
        })
        .collect()
}
