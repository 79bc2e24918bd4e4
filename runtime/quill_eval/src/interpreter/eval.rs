//! Expression evaluation.

use super::Interpreter;
use crate::error::{EvalError, EvalResult};
use crate::graph::TaskGraph;
use crate::host::translate_instance;
use crate::memory::SpaceRef;
use crate::shared::Shared;
use crate::value::{CallableRef, EnumSlot, ListSlot, RawValue, SetSlot, Value};
use quill_ir::{BinaryOp, Name, NodeId, NodeKind, UnaryOp};
use quill_types::{SymbolKind, TypeId, TypeKind};

impl Interpreter {
    /// Evaluate a node to a value. Statement nodes evaluate for their
    /// effects and yield the `NONE` sentinel.
    pub fn eval(&mut self, node: NodeId) -> EvalResult<Value> {
        match self.arena().kind(node) {
            // literals
            NodeKind::Int(n) => Ok(Value::int(n)),
            NodeKind::Float(f) => Ok(Value::float(f)),
            NodeKind::Str(s) => Ok(Value::string(self.interner().lookup(s))),
            NodeKind::Bool(b) => Ok(Value::bool_value(b)),

            // references
            NodeKind::Ident(name) => self.eval_ident(name),
            NodeKind::MemberAccess { lhs, rhs } => self.eval_member_access(lhs, rhs),
            NodeKind::FnCall { name, args } => self.eval_fn_call(node, name, args),

            // expressions
            NodeKind::Binary { op, lhs, rhs } => self.eval_binary(node, op, lhs, rhs),
            NodeKind::Unary { op, operand } => self.eval_unary(node, op, operand),
            NodeKind::Grouped { inner } => self.eval(inner),
            NodeKind::ListLit { entries } => self.eval_list_literal(entries),
            NodeKind::SetLit { entries } => self.eval_set_literal(entries),

            // definitions appearing in value position
            NodeKind::PropertyDef { name, value } => self.eval_property_def(name, value),
            NodeKind::ObjectDef { name, .. } => self.eval_object_def(node, name),
            NodeKind::ComponentDef {
                type_name,
                properties,
            } => self.eval_component_def(type_name, properties),
            NodeKind::PrototypeDef { name, .. } | NodeKind::ItemPrototypeDef { name, .. } => {
                // prototype definitions resolve to their bound prototype value
                self.current_space().resolve(name)
            }
            NodeKind::GraphDef { name, edges } => self.eval_graph_def(name, edges),
            NodeKind::FnDef { .. } => {
                let symbol = self.renv.table.symbol_for_node(node);
                let ty = self.renv.sem.symbols.get(symbol).ty;
                Ok(Value::func(ty, CallableRef::User(symbol)))
            }
            NodeKind::ParamDef { .. } => Ok(Value::None),
            NodeKind::EdgeStmt { .. } => Err(EvalError::UnsupportedNode {
                kind: "edge statement outside graph definition",
                span: self.arena().span(node),
            }),

            // statements in value position run for effect
            NodeKind::VarDecl { .. }
            | NodeKind::Assignment { .. }
            | NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::For { .. }
            | NodeKind::Return { .. }
            | NodeKind::Block { .. } => {
                self.exec_stmt(node)?;
                Ok(Value::None)
            }
        }
    }

    /// Identifier resolution: current memory space first (locals shadow
    /// globals), then global symbols - callables become function values,
    /// and a not-yet-evaluated global definition is visited right then
    /// (on-demand evaluation through its creation node).
    fn eval_ident(&mut self, name: Name) -> EvalResult<Value> {
        let value = self.current_space().resolve(name)?;
        if !value.is_none() {
            return Ok(value);
        }

        let symbol_id = self.renv.sem.resolve_global(name);
        if symbol_id.is_null() {
            return Ok(Value::None);
        }
        let (ty, kind) = {
            let symbol = self.renv.sem.symbols.get(symbol_id);
            (symbol.ty, symbol.kind)
        };
        match kind {
            SymbolKind::NativeFn(native) => Ok(Value::func(ty, CallableRef::Native(native))),
            SymbolKind::UserFn { .. } => Ok(Value::func(ty, CallableRef::User(symbol_id))),
            SymbolKind::Variable => {
                let Some(node) = self.renv.table.creation_node(symbol_id) else {
                    return Ok(Value::None);
                };
                let evaluated = self.eval(node)?;
                self.global.bind_value(name, evaluated.clone());
                Ok(evaluated)
            }
            _ => Ok(Value::None),
        }
    }

    fn eval_member_access(&mut self, lhs: NodeId, rhs: NodeId) -> EvalResult<Value> {
        // enum variant access: `task_state.DONE`
        if let NodeKind::Ident(lhs_name) = self.arena().kind(lhs) {
            let symbol = self.renv.sem.resolve_global(lhs_name);
            if let SymbolKind::Type(ty) = self.renv.sem.symbols.get(symbol).kind {
                if let TypeKind::Enum(def) = self.renv.types().kind(ty) {
                    let NodeKind::Ident(variant) = self.arena().kind(rhs) else {
                        return Ok(Value::None);
                    };
                    if def.variant_index(variant).is_none() {
                        return Ok(Value::None);
                    }
                    return Ok(Value::Enum(Shared::new(EnumSlot {
                        ty,
                        variant: Some(variant),
                        dirty: false,
                    })));
                }
            }
        }

        let lhs_value = self.eval(lhs)?;
        let Some(space) = self.member_space_of(&lhs_value)? else {
            return Ok(Value::None);
        };
        match self.arena().kind(rhs) {
            NodeKind::Ident(name) => space.resolve(name),
            NodeKind::MemberAccess {
                lhs: inner_lhs,
                rhs: inner_rhs,
            } => self.with_space(space, |interp| {
                interp.eval_member_access(inner_lhs, inner_rhs)
            }),
            _ => Err(EvalError::UnsupportedNode {
                kind: "member access on a non-identifier",
                span: self.arena().span(rhs),
            }),
        }
    }

    /// The member space behind a value, when it has one.
    fn member_space_of(&self, value: &Value) -> EvalResult<Option<SpaceRef>> {
        match value {
            Value::Aggregate(slot) => Ok(Some(slot.borrow().space.clone())),
            Value::AggregateProperty(slot) => slot.borrow().space(),
            _ => Ok(None),
        }
    }

    fn eval_property_def(&mut self, name: Name, value_node: NodeId) -> EvalResult<Value> {
        let rhs = self.eval(value_node)?;
        let assignee = self.current_space().resolve(name)?;
        let set = self.set_value(&assignee, &rhs)?;
        if !set {
            tracing::debug!(
                property = self.renv.lookup(name),
                "property assignment rejected"
            );
        }
        Ok(Value::None)
    }

    /// Object definition lifecycle: apply property definitions to the
    /// bound default value, then translate it into a live host object and
    /// swap the backing store to the encapsulated space. Idempotent - a
    /// definition whose store is already host-backed is returned as is.
    fn eval_object_def(&mut self, node: NodeId, name: Name) -> EvalResult<Value> {
        let NodeKind::ObjectDef { properties, .. } = self.arena().kind(node) else {
            return Ok(Value::None);
        };
        let objects_value = self.current_space().resolve(name)?;
        let Value::Aggregate(aggregate) = objects_value.clone() else {
            return Err(EvalError::NotAnAggregate {
                name: self.renv.lookup(name).to_owned(),
            });
        };

        let space = aggregate.borrow().space.clone();
        if matches!(space, SpaceRef::Host(_)) {
            return Ok(objects_value);
        }

        let property_ids: Vec<NodeId> = self.arena().children(properties).to_vec();
        self.with_space(space.clone(), |interp| {
            for prop in property_ids {
                interp.eval(prop)?;
            }
            Ok(())
        })?;

        // an unset `name` member picks up the definition identifier
        let name_value = space.resolve_local(self.name_member)?;
        if !name_value.is_none() && !name_value.is_dirty() {
            let identifier = Value::string(self.renv.lookup(name));
            self.set_value(&name_value, &identifier)?;
        }

        // convert to the concrete host object when the type has one
        let ty = aggregate.borrow().ty;
        if self.renv.sem.host.class_for_type(ty).is_some() {
            let instance = crate::host::instantiate_value(&objects_value, &self.renv)?;
            if let Some(instance) = instance {
                let translated = translate_instance(&instance, ty, &self.renv)?;
                if let Value::Aggregate(translated) = translated {
                    let host_space = translated.borrow().space.clone();
                    let mut borrowed = aggregate.borrow_mut();
                    borrowed.space = host_space;
                    borrowed.internal = Some(instance);
                }
            }
        }

        Ok(objects_value)
    }

    /// Component definition in value position: instantiate the component
    /// type's defaults, then apply the property definitions.
    fn eval_component_def(
        &mut self,
        type_name: Name,
        properties: quill_ir::NodeRange,
    ) -> EvalResult<Value> {
        let ty = self
            .renv
            .sem
            .named_type(self.renv.sem.resolve_global(type_name));
        let value = self.create_default_value(ty)?;
        let Value::Aggregate(aggregate) = &value else {
            return Ok(Value::None);
        };
        let space = aggregate.borrow().space.clone();
        let property_ids: Vec<NodeId> = self.arena().children(properties).to_vec();
        self.with_space(space, |interp| {
            for prop in property_ids {
                interp.eval(prop)?;
            }
            Ok(())
        })?;
        Ok(value.clone())
    }

    fn eval_graph_def(&mut self, name: Name, edges: quill_ir::NodeRange) -> EvalResult<Value> {
        let mut graph = TaskGraph::new(name);
        for &edge in self.arena().children(edges) {
            if let NodeKind::EdgeStmt { from, to } = self.arena().kind(edge) {
                graph.add_edge(from, to);
            }
        }
        Ok(Value::basic(
            TypeId::GRAPH,
            RawValue::Graph(std::rc::Rc::new(graph)),
        ))
    }

    fn eval_list_literal(&mut self, entries: quill_ir::NodeRange) -> EvalResult<Value> {
        let entry_ids: Vec<NodeId> = self.arena().children(entries).to_vec();
        let mut values = Vec::with_capacity(entry_ids.len());
        for entry in entry_ids {
            values.push(self.eval(entry)?);
        }
        // element type inferred from the first entry until typechecking
        // assigns one
        let element = values.first().map_or(TypeId::NONE, Value::data_type);
        Ok(Value::List(Shared::new(ListSlot {
            ty: TypeId::NONE,
            element,
            entries: values,
            dirty: false,
        })))
    }

    fn eval_set_literal(&mut self, entries: quill_ir::NodeRange) -> EvalResult<Value> {
        let entry_ids: Vec<NodeId> = self.arena().children(entries).to_vec();
        let mut slot = SetSlot {
            ty: TypeId::NONE,
            element: TypeId::NONE,
            entries: Vec::with_capacity(entry_ids.len()),
            dirty: false,
        };
        for entry in entry_ids {
            let value = self.eval(entry)?;
            if slot.element.is_none() {
                slot.element = value.data_type();
            }
            slot.add(value);
        }
        Ok(Value::Set(Shared::new(slot)))
    }

    fn eval_binary(
        &mut self,
        node: NodeId,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> EvalResult<Value> {
        // short-circuiting forms evaluate the rhs only when needed
        match op {
            BinaryOp::And => {
                let lhs_value = self.eval(lhs)?;
                if !lhs_value.is_truthy() {
                    return Ok(Value::bool_value(false));
                }
                let rhs_value = self.eval(rhs)?;
                return Ok(Value::bool_value(rhs_value.is_truthy()));
            }
            BinaryOp::Or => {
                let lhs_value = self.eval(lhs)?;
                if lhs_value.is_truthy() {
                    return Ok(Value::bool_value(true));
                }
                let rhs_value = self.eval(rhs)?;
                return Ok(Value::bool_value(rhs_value.is_truthy()));
            }
            _ => {}
        }

        let lhs_value = self.eval(lhs)?;
        let rhs_value = self.eval(rhs)?;

        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            let equal = lhs_value.internal_key() == rhs_value.internal_key();
            return Ok(Value::bool_value(if op == BinaryOp::Eq {
                equal
            } else {
                !equal
            }));
        }

        let span = self.arena().span(node);
        let left = self.raw_of(&lhs_value)?;
        let right = self.raw_of(&rhs_value)?;
        match (left, right) {
            (RawValue::Int(a), RawValue::Int(b)) => Self::int_binary(op, a, b, span),
            (RawValue::Float(a), RawValue::Float(b)) => Self::float_binary(op, a, b, span),
            (RawValue::Str(a), RawValue::Str(b)) => {
                if op == BinaryOp::Add {
                    Ok(Value::string(format!("{a}{b}")))
                } else {
                    Err(EvalError::InvalidOperand {
                        op: op_name(op),
                        span,
                    })
                }
            }
            _ => Err(EvalError::InvalidOperand {
                op: op_name(op),
                span,
            }),
        }
    }

    fn int_binary(op: BinaryOp, a: i64, b: i64, span: quill_ir::Span) -> EvalResult<Value> {
        Ok(match op {
            BinaryOp::Add => Value::int(a.wrapping_add(b)),
            BinaryOp::Sub => Value::int(a.wrapping_sub(b)),
            BinaryOp::Mul => Value::int(a.wrapping_mul(b)),
            BinaryOp::Div => {
                if b == 0 {
                    return Err(EvalError::DivisionByZero { span });
                }
                Value::int(a.wrapping_div(b))
            }
            BinaryOp::Lt => Value::bool_value(a < b),
            BinaryOp::Le => Value::bool_value(a <= b),
            BinaryOp::Gt => Value::bool_value(a > b),
            BinaryOp::Ge => Value::bool_value(a >= b),
            _ => {
                return Err(EvalError::InvalidOperand {
                    op: op_name(op),
                    span,
                })
            }
        })
    }

    fn float_binary(op: BinaryOp, a: f64, b: f64, span: quill_ir::Span) -> EvalResult<Value> {
        Ok(match op {
            BinaryOp::Add => Value::float(a + b),
            BinaryOp::Sub => Value::float(a - b),
            BinaryOp::Mul => Value::float(a * b),
            BinaryOp::Div => Value::float(a / b),
            BinaryOp::Lt => Value::bool_value(a < b),
            BinaryOp::Le => Value::bool_value(a <= b),
            BinaryOp::Gt => Value::bool_value(a > b),
            BinaryOp::Ge => Value::bool_value(a >= b),
            _ => {
                return Err(EvalError::InvalidOperand {
                    op: op_name(op),
                    span,
                })
            }
        })
    }

    fn eval_unary(&mut self, node: NodeId, op: UnaryOp, operand: NodeId) -> EvalResult<Value> {
        let value = self.eval(operand)?;
        match op {
            UnaryOp::Not => Ok(Value::bool_value(!value.is_truthy())),
            UnaryOp::Neg => {
                let span = self.arena().span(node);
                match self.raw_of(&value)? {
                    RawValue::Int(n) => Ok(Value::int(-n)),
                    RawValue::Float(f) => Ok(Value::float(-f)),
                    _ => Err(EvalError::InvalidOperand { op: "-", span }),
                }
            }
        }
    }
}

fn op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}
