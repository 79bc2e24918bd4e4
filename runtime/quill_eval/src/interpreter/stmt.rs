//! Statement execution and control flow.

use super::Interpreter;
use crate::error::{EvalError, EvalResult};
use crate::memory::SpaceRef;
use crate::value::Value;
use quill_ir::{Name, NodeId, NodeKind};
use quill_types::TypeId;

/// How a statement finished.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    Normal,
    /// A `return` statement fired; unwind to the function boundary.
    Return,
}

impl Interpreter {
    /// Execute a statement node.
    pub(crate) fn exec_stmt(&mut self, node: NodeId) -> EvalResult<Flow> {
        match self.arena().kind(node) {
            NodeKind::Block { stmts } => {
                let stmt_ids: Vec<NodeId> = self.arena().children(stmts).to_vec();
                let space = SpaceRef::child_of(&self.current_space());
                self.with_space(space, |interp| {
                    for stmt in stmt_ids {
                        if interp.exec_stmt(stmt)? == Flow::Return {
                            return Ok(Flow::Return);
                        }
                    }
                    Ok(Flow::Normal)
                })
            }

            NodeKind::VarDecl { name, ty, init } => {
                self.exec_var_decl(name, ty, init)?;
                Ok(Flow::Normal)
            }

            NodeKind::Assignment { lhs, rhs } => {
                let lhs_value = self.eval(lhs)?;
                let rhs_value = self.eval(rhs)?;
                self.set_value(&lhs_value, &rhs_value)?;
                Ok(Flow::Normal)
            }

            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition_value = self.eval(condition)?;
                let branch = if condition_value.is_truthy() {
                    Some(then_branch)
                } else {
                    else_branch
                };
                let Some(branch) = branch else {
                    return Ok(Flow::Normal);
                };
                // single statements get their own space, as blocks do
                if matches!(self.arena().kind(branch), NodeKind::Block { .. }) {
                    self.exec_stmt(branch)
                } else {
                    let space = SpaceRef::child_of(&self.current_space());
                    self.with_space(space, |interp| interp.exec_stmt(branch))
                }
            }

            NodeKind::While { condition, body } => {
                loop {
                    let condition_value = self.eval(condition)?;
                    if !condition_value.is_truthy() {
                        break;
                    }
                    // fresh space per iteration
                    let space = SpaceRef::child_of(&self.current_space());
                    let flow = self.with_space(space, |interp| interp.exec_stmt(body))?;
                    if flow == Flow::Return {
                        return Ok(Flow::Return);
                    }
                }
                Ok(Flow::Normal)
            }

            NodeKind::For {
                var,
                iterable,
                counter,
                body,
            } => self.exec_for(var, iterable, counter, body, node),

            NodeKind::Return { value } => self.exec_return(value),

            // everything else evaluates for its value or effect
            _ => {
                self.eval(node)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_var_decl(
        &mut self,
        name: Name,
        ty: Option<Name>,
        init: Option<NodeId>,
    ) -> EvalResult<Value> {
        let current = self.current_space();

        // re-declaration in the same space drops the prior binding
        let existing = current.resolve_local(name)?;
        if !existing.is_none() {
            current.delete(name, self.interner())?;
        }

        let declared = ty
            .map(|ty_name| self.renv.types().resolve(ty_name))
            .unwrap_or(TypeId::NONE);

        let value = match init {
            Some(init) => {
                let evaluated = self.eval(init)?;
                if declared.is_none() {
                    evaluated.clone_value()
                } else {
                    let slot = self.create_default_value(declared)?;
                    self.set_value(&slot, &evaluated)?;
                    slot
                }
            }
            None => self.create_default_value(declared)?,
        };
        current.bind_value(name, value.clone());
        Ok(value)
    }

    fn exec_for(
        &mut self,
        var: Name,
        iterable: NodeId,
        counter: Option<Name>,
        body: NodeId,
        node: NodeId,
    ) -> EvalResult<Flow> {
        let iterable_value = self.eval(iterable)?;
        let entries: Vec<Value> = match &iterable_value {
            Value::List(slot) => slot.borrow().entries.clone(),
            Value::Set(slot) => slot.borrow().entries.clone(),
            _ => {
                return Err(EvalError::NotIterable {
                    span: self.arena().span(node),
                })
            }
        };

        for (index, entry) in entries.into_iter().enumerate() {
            let space = SpaceRef::child_of(&self.current_space());
            space.bind_value(var, entry.clone_value());
            if let Some(counter) = counter {
                space.bind_value(counter, Value::int(i64::try_from(index).unwrap_or(i64::MAX)));
            }
            let flow = self.with_space(space, |interp| interp.exec_stmt(body))?;
            if flow == Flow::Return {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Normal)
    }

    /// `return`: store the evaluated value into the nearest return slot on
    /// the memory stack (bound by the enclosing function call), then
    /// unwind to the function boundary.
    fn exec_return(&mut self, value: Option<NodeId>) -> EvalResult<Flow> {
        if let Some(value) = value {
            let evaluated = self.eval(value)?;
            if !evaluated.is_none() {
                let return_name = self.return_name;
                let mut target = None;
                for space in self.stack.iter().rev() {
                    let slot = space.resolve_local(return_name)?;
                    if !slot.is_none() {
                        target = Some(slot);
                        break;
                    }
                }
                if let Some(target) = target {
                    self.set_value(&target, &evaluated)?;
                }
            }
        }
        Ok(Flow::Return)
    }
}
