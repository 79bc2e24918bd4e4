//! Tree-walking interpreter.
//!
//! # Architecture
//!
//! Evaluation dispatches on the closed AST node enum with an exhaustive
//! match; there is no runtime "unsupported node" fallback for node kinds
//! the language defines (the [`crate::error::EvalError::UnsupportedNode`]
//! variant covers only valid AST outside the interpreted subset, e.g. a
//! method call on a member access).
//!
//! The interpreter owns one global memory space for the lifetime of the
//! run plus a stack of transient spaces; every pushed space is popped on
//! every exit path by routing the region through [`Interpreter::with_space`].
//!
//! Helper modules:
//!
//! - `eval` - expressions: literals, identifiers, member access, operators,
//!   collections, graph definitions
//! - `stmt` - statements and control flow (blocks, conditionals, loops,
//!   return)
//! - `assign` - the value-setting family, including the aggregate
//!   assignment compatibility mode
//! - `call` - native and user-defined function calls

mod assign;
mod builder;
mod call;
mod eval;
mod stmt;

pub use builder::InterpreterBuilder;

use crate::error::{EvalError, EvalResult};
use crate::memory::SpaceRef;
use crate::natives::PrintHandler;
use crate::prototype::PrototypeSlot;
use crate::runtime_env::SharedRuntimeEnv;
use crate::shared::Shared;
use crate::value::{AggregateSlot, CallableRef, EnumSlot, FuncSlot, ListSlot, MapSlot, SetSlot, Value};
use quill_ir::{AstArena, Name, NodeId, NodeKind, Program, StringInterner};
use quill_types::{Member, ScopeId, SymbolId, SymbolKind, TypeId, TypeKind};
use std::rc::Rc;

/// A fully interpreted root (quest-config) definition.
pub struct RootConfig {
    /// The evaluated aggregate value.
    pub value: Value,
    /// The live host object, when the root type has a registered host
    /// class.
    pub host: Option<quill_types::HostInstance>,
    /// Authored `name` member, falling back to the definition identifier.
    pub display_name: String,
}

/// The tree-walking interpreter.
pub struct Interpreter {
    renv: SharedRuntimeEnv,
    program: Rc<Program>,
    global: SpaceRef,
    stack: Vec<SpaceRef>,
    root_type: Name,
    name_member: Name,
    return_name: Name,
    assign_compat: bool,
    print: PrintHandler,
    initialized: bool,
}

impl Interpreter {
    pub(crate) fn from_parts(
        renv: SharedRuntimeEnv,
        program: Rc<Program>,
        root_type: Name,
        assign_compat: bool,
        print: PrintHandler,
    ) -> Self {
        let name_member = renv.interner().intern("name");
        let return_name = renv.interner().intern("$return_value$");
        Interpreter {
            renv,
            program,
            global: SpaceRef::root(),
            stack: Vec::new(),
            root_type,
            name_member,
            return_name,
            assign_compat,
            print,
            initialized: false,
        }
    }

    // Accessors

    pub fn runtime_env(&self) -> &SharedRuntimeEnv {
        &self.renv
    }

    pub fn interner(&self) -> &StringInterner {
        self.renv.interner()
    }

    pub fn print_handler(&self) -> &PrintHandler {
        &self.print
    }

    pub fn global_space(&self) -> &SpaceRef {
        &self.global
    }

    pub(crate) fn arena(&self) -> &AstArena {
        &self.program.arena
    }

    /// The current memory space: the stack top, or the global space.
    pub fn current_space(&self) -> SpaceRef {
        self.stack.last().cloned().unwrap_or_else(|| self.global.clone())
    }

    /// Run `f` with `space` pushed; exactly one pop follows on every exit
    /// path, errors included.
    pub(crate) fn with_space<R>(
        &mut self,
        space: SpaceRef,
        f: impl FnOnce(&mut Self) -> EvalResult<R>,
    ) -> EvalResult<R> {
        self.stack.push(space);
        let result = f(self);
        self.stack.pop();
        result
    }

    // Initialization

    /// Bind global symbols into the global memory space, evaluate global
    /// definitions (graphs last, root configs deferred), and build
    /// prototypes. Idempotent.
    pub fn initialize(&mut self) -> EvalResult<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        self.evaluate_global_symbols()?;
        self.create_prototypes()?;
        Ok(())
    }

    fn evaluate_global_symbols(&mut self) -> EvalResult<()> {
        let symbol_ids: Vec<SymbolId> =
            self.renv.sem.scopes.symbols(ScopeId::GLOBAL).to_vec();

        // pass 1: bind every global symbol to a value
        let mut pending: Vec<(SymbolId, Name, TypeId, Value)> = Vec::new();
        for id in symbol_ids {
            let (name, ty, kind) = {
                let symbol = self.renv.sem.symbols.get(id);
                (symbol.name, symbol.ty, symbol.kind)
            };
            match kind {
                SymbolKind::NativeFn(native) => {
                    // natives become callable values up front
                    self.global
                        .bind_value(name, Value::func(ty, CallableRef::Native(native)));
                }
                // user-defined callables are recorded by symbol only; the
                // body is walked lazily on each call
                SymbolKind::UserFn { .. } => {}
                SymbolKind::Type(_) | SymbolKind::Member | SymbolKind::EnumVariant { .. } => {}
                SymbolKind::Variable => {
                    let value = self.create_default_value(ty)?;
                    self.global.bind_value(name, value.clone());
                    pending.push((id, name, ty, value));
                }
            }
        }

        // pass 2: evaluate definitions. Graph definitions go last - they
        // may reference tasks defined anywhere in the file.
        let mut graphs: Vec<(SymbolId, Name, Value)> = Vec::new();
        for (id, name, ty, value) in pending {
            if ty == TypeId::GRAPH {
                graphs.push((id, name, value));
                continue;
            }
            // root-type definitions are interpreted on demand, not at load
            if self.renv.types().name(ty) == self.root_type {
                continue;
            }
            self.evaluate_global_definition(id, name, &value)?;
        }
        for (id, name, value) in graphs {
            self.evaluate_global_definition(id, name, &value)?;
        }
        Ok(())
    }

    fn evaluate_global_definition(
        &mut self,
        symbol: SymbolId,
        name: Name,
        assignee: &Value,
    ) -> EvalResult<()> {
        let Some(node) = self.renv.table.creation_node(symbol) else {
            return Ok(());
        };
        let evaluated = self
            .eval(node)
            .map_err(|e| e.in_definition(self.renv.lookup(name)))?;
        self.set_value(assignee, &evaluated)?;
        Ok(())
    }

    // Prototypes

    /// Build a prototype for every user-defined aggregate type whose
    /// creation node is a game-object or item definition, and bind it by
    /// name in the current memory space.
    fn create_prototypes(&mut self) -> EvalResult<()> {
        let symbol_ids: Vec<SymbolId> =
            self.renv.sem.scopes.symbols(ScopeId::GLOBAL).to_vec();
        for id in symbol_ids {
            let SymbolKind::Type(ty) = self.renv.sem.symbols.get(id).kind else {
                continue;
            };
            // only user-defined aggregates have a creation node to revisit
            if !matches!(self.renv.types().kind(ty), TypeKind::Aggregate(_)) {
                continue;
            }
            let Some(node) = self.renv.table.creation_node(id) else {
                continue;
            };
            match self.arena().kind(node) {
                NodeKind::PrototypeDef { name, components } => {
                    let proto = self.create_object_prototype(ty, name, components)?;
                    self.current_space().bind_value(name, proto);
                }
                NodeKind::ItemPrototypeDef { name, properties } => {
                    let proto = self.create_item_prototype(ty, name, properties)?;
                    self.current_space().bind_value(name, proto);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn create_object_prototype(
        &mut self,
        ty: TypeId,
        name: Name,
        components: quill_ir::NodeRange,
    ) -> EvalResult<Value> {
        tracing::debug!(prototype = self.renv.lookup(name), "building prototype");
        let mut proto = PrototypeSlot::new(TypeId::PROTOTYPE, name, ty);
        let component_ids: Vec<NodeId> = self.arena().children(components).to_vec();
        for comp in component_ids {
            let NodeKind::ComponentDef {
                type_name,
                properties,
            } = self.arena().kind(comp)
            else {
                continue;
            };
            let component = self.create_component_prototype(comp, type_name, properties)?;
            proto.add_default(type_name, component);
        }
        Ok(Value::Prototype(Shared::new(proto)))
    }

    /// Build the nested prototype for one component definition: evaluate
    /// its property definitions and record each produced value as an
    /// explicitly authored (dirty) default.
    fn create_component_prototype(
        &mut self,
        node: NodeId,
        type_name: Name,
        properties: quill_ir::NodeRange,
    ) -> EvalResult<Value> {
        let member_symbol = self.renv.table.symbol_for_node(node);
        let component_ty = self.renv.sem.symbols.get(member_symbol).ty;
        let mut proto = PrototypeSlot::new(TypeId::PROTOTYPE, type_name, component_ty);
        self.collect_property_defaults(&mut proto, properties)?;
        Ok(Value::Prototype(Shared::new(proto)))
    }

    fn create_item_prototype(
        &mut self,
        ty: TypeId,
        name: Name,
        properties: quill_ir::NodeRange,
    ) -> EvalResult<Value> {
        tracing::debug!(prototype = self.renv.lookup(name), "building item prototype");
        let mut proto = PrototypeSlot::new(TypeId::ITEM_PROTOTYPE, name, ty);
        self.collect_property_defaults(&mut proto, properties)?;
        Ok(Value::Prototype(Shared::new(proto)))
    }

    fn collect_property_defaults(
        &mut self,
        proto: &mut PrototypeSlot,
        properties: quill_ir::NodeRange,
    ) -> EvalResult<()> {
        let property_ids: Vec<NodeId> = self.arena().children(properties).to_vec();
        for prop in property_ids {
            let NodeKind::PropertyDef { name, value } = self.arena().kind(prop) else {
                continue;
            };
            let rhs = self.eval(value)?;
            let member_symbol = self.renv.table.symbol_for_node(prop);
            let member_ty = self.renv.sem.symbols.get(member_symbol).ty;

            // clone the evaluated value so the template never aliases
            // script state, promote it to the member's declared type, and
            // mark it explicitly authored
            let default = rhs.clone_value();
            default.promote_type(member_ty);
            default.set_dirty();
            proto.add_default(name, default);
        }
        Ok(())
    }

    /// Instantiate a prototype into a fresh, independent aggregate value.
    ///
    /// Per member of the underlying type: nested prototypes instantiate
    /// recursively, recorded defaults are deep-copied, everything else
    /// gets a synthesized zero-value (or the `NONE` sentinel when the
    /// member's type has none).
    pub fn instantiate_prototype(&mut self, proto: &PrototypeSlot) -> EvalResult<Value> {
        let space = SpaceRef::child_of(&self.current_space());
        let members: Vec<Member> = self.renv.types().members(proto.ty).to_vec();
        self.with_space(space.clone(), |interp| {
            for member in &members {
                let value = match proto.default_for(member.name) {
                    Some(Value::Prototype(nested)) => {
                        let nested = nested.borrow().clone();
                        interp.instantiate_prototype(&nested)?
                    }
                    Some(default) => default.clone_value(),
                    None => {
                        // no default and no synthesizable zero-value: the
                        // NONE sentinel, distinguishable from "explicitly
                        // set to empty"
                        let synthesized = interp.create_default_value(member.ty)?;
                        if is_unset_basic(&synthesized) {
                            Value::None
                        } else {
                            synthesized
                        }
                    }
                };
                space.bind_value(member.name, value);
            }
            Ok(())
        })?;
        Ok(Value::Aggregate(Shared::new(AggregateSlot {
            ty: proto.ty,
            space,
            internal: None,
            dirty: true,
        })))
    }

    // Default values

    /// DSL-level default for a type: zero-likes for basics, recursively
    /// defaulted members for aggregates, empty collections, unset enums
    /// and functions. Types without a synthesizable default yield the
    /// `NONE` sentinel.
    pub fn create_default_value(&mut self, ty: TypeId) -> EvalResult<Value> {
        if ty.is_none() {
            return Ok(Value::None);
        }
        if ty == TypeId::PROTOTYPE || ty == TypeId::ITEM_PROTOTYPE {
            return Ok(Value::Prototype(Shared::new(PrototypeSlot::new(
                ty,
                Name::EMPTY,
                TypeId::NONE,
            ))));
        }
        let summary = match self.renv.types().kind(ty) {
            TypeKind::Basic => KindSummary::Basic,
            TypeKind::Aggregate(_) | TypeKind::AggregateAdapted(_) => KindSummary::Aggregate,
            TypeKind::Enum(_) => KindSummary::Enum,
            TypeKind::Function(_) => KindSummary::Function,
            TypeKind::List { element } => KindSummary::List(*element),
            TypeKind::Set { element } => KindSummary::Set(*element),
            TypeKind::Map { key, element } => KindSummary::Map(*key, *element),
        };
        Ok(match summary {
            KindSummary::Basic => {
                // basics without a zero (graph) still get a real slot, so
                // later assignment into the binding works; prototype
                // instantiation separately collapses unset slots to NONE
                let raw = crate::value::RawValue::zero_for(ty)
                    .unwrap_or(crate::value::RawValue::None);
                Value::basic(ty, raw)
            }
            KindSummary::Aggregate => {
                let space = SpaceRef::child_of(&self.current_space());
                let members: Vec<Member> = self.renv.types().members(ty).to_vec();
                self.with_space(space.clone(), |interp| {
                    for member in &members {
                        let value = interp.create_default_value(member.ty)?;
                        space.bind_value(member.name, value);
                    }
                    Ok(())
                })?;
                Value::Aggregate(Shared::new(AggregateSlot {
                    ty,
                    space,
                    internal: None,
                    dirty: false,
                }))
            }
            KindSummary::Enum => Value::Enum(Shared::new(EnumSlot {
                ty,
                variant: None,
                dirty: false,
            })),
            KindSummary::Function => Value::Func(Shared::new(FuncSlot {
                ty,
                callable: None,
                dirty: false,
            })),
            KindSummary::List(element) => Value::List(Shared::new(ListSlot {
                ty,
                element,
                entries: Vec::new(),
                dirty: false,
            })),
            KindSummary::Set(element) => Value::Set(Shared::new(SetSlot {
                ty,
                element,
                entries: Vec::new(),
                dirty: false,
            })),
            KindSummary::Map(key, element) => Value::Map(Shared::new(MapSlot {
                ty,
                key,
                element,
                entries: Vec::new(),
                dirty: false,
            })),
        })
    }

    // Root configuration

    /// Interpret the first top-level definition of the configured root
    /// type. Discovery is a single non-recursive pass over top-level
    /// object definitions; `None` when the script has no root definition.
    pub fn interpret_first_root(&mut self) -> EvalResult<Option<RootConfig>> {
        let items: Vec<NodeId> = self.program.items.clone();
        for item in items {
            if let NodeKind::ObjectDef { type_name, .. } = self.arena().kind(item) {
                if type_name == self.root_type {
                    return self.interpret_entry_point(item).map(Some);
                }
            }
        }
        Ok(None)
    }

    /// Interpret one root object definition into a host-bound config.
    pub fn interpret_entry_point(&mut self, node: NodeId) -> EvalResult<RootConfig> {
        self.initialize()?;
        let NodeKind::ObjectDef { name, .. } = self.arena().kind(node) else {
            return Err(EvalError::UnsupportedNode {
                kind: "non-object entry point",
                span: self.arena().span(node),
            });
        };

        let value = self
            .eval(node)
            .map_err(|e| e.in_definition(self.renv.lookup(name)))?;

        let mut display_name = self.renv.lookup(name).to_owned();
        let mut host = None;
        if let Value::Aggregate(slot) = &value {
            let (space, internal) = {
                let borrowed = slot.borrow();
                (borrowed.space.clone(), borrowed.internal.clone())
            };
            host = internal;
            let name_value = space.resolve_local(self.name_member)?;
            if let Ok(crate::value::RawValue::Str(s)) = self.raw_of(&name_value) {
                if !s.is_empty() {
                    display_name = s.to_string();
                }
            }
        }

        Ok(RootConfig {
            value,
            host,
            display_name,
        })
    }
}

enum KindSummary {
    Basic,
    Aggregate,
    Enum,
    Function,
    List(TypeId),
    Set(TypeId),
    Map(TypeId, TypeId),
}

/// A basic slot whose payload is still unset.
fn is_unset_basic(value: &Value) -> bool {
    match value {
        Value::Basic(slot) => matches!(slot.borrow().raw, crate::value::RawValue::None),
        _ => false,
    }
}
