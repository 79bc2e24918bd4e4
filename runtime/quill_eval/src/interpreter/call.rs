//! Function calls: native and user-defined.

use super::stmt::Flow;
use super::Interpreter;
use crate::error::{EvalError, EvalResult};
use crate::memory::SpaceRef;
use crate::value::Value;
use quill_ir::{Name, NodeId, NodeKind, NodeRange};
use quill_types::{SymbolId, SymbolKind, TypeId, TypeKind};

impl Interpreter {
    pub(crate) fn eval_fn_call(
        &mut self,
        node: NodeId,
        name: Name,
        args: NodeRange,
    ) -> EvalResult<Value> {
        let symbol_id = {
            let associated = self.renv.table.symbol_for_node(node);
            if associated.is_null() {
                self.renv.sem.resolve_global(name)
            } else {
                associated
            }
        };
        let kind = self.renv.sem.symbols.get(symbol_id).kind;
        let arg_ids: Vec<NodeId> = self.arena().children(args).to_vec();

        match kind {
            SymbolKind::NativeFn(native) => {
                // natives receive evaluated values and no DSL body is walked
                let mut arg_values = Vec::with_capacity(arg_ids.len());
                for arg in arg_ids {
                    arg_values.push(self.eval(arg)?);
                }
                let Some(function) = self.renv.natives.get(native) else {
                    return Err(EvalError::NotCallable {
                        name: self.renv.lookup(name).to_owned(),
                    });
                };
                function.call(self, &arg_values)
            }
            SymbolKind::UserFn { .. } => self.call_user_function(symbol_id, &arg_ids),
            _ => Err(EvalError::NotCallable {
                name: self.renv.lookup(name).to_owned(),
            }),
        }
    }

    /// Call a user-defined function with argument nodes evaluated in the
    /// caller's memory space.
    ///
    /// A fresh space is pushed for the call, parameters are bound into it,
    /// the body is walked, and the space is popped on every exit path. The
    /// call itself yields the `NONE` sentinel: return values land in the
    /// function space's reserved slot but are not propagated (preserved
    /// behavior; see DESIGN.md).
    fn call_user_function(&mut self, symbol_id: SymbolId, arg_nodes: &[NodeId]) -> EvalResult<Value> {
        let function_space = self.create_function_space(symbol_id)?;
        self.bind_parameters(symbol_id, &function_space, arg_nodes)?;
        self.execute_function_body(symbol_id, function_space)?;
        Ok(Value::None)
    }

    /// Call a user-defined function with raw values (embedder callbacks
    /// wired through host fields come back in through here).
    pub fn call_function(&mut self, symbol_id: SymbolId, args: &[Value]) -> EvalResult<Value> {
        let kind = self.renv.sem.symbols.get(symbol_id).kind;
        let SymbolKind::UserFn { scope } = kind else {
            return Err(EvalError::NotCallable {
                name: self
                    .renv
                    .lookup(self.renv.sem.symbols.get(symbol_id).name)
                    .to_owned(),
            });
        };

        let function_space = self.create_function_space(symbol_id)?;
        let param_ids: Vec<SymbolId> = self.renv.sem.scopes.symbols(scope).to_vec();
        for (param_id, arg) in param_ids.iter().zip(args) {
            let (param_name, param_ty) = {
                let symbol = self.renv.sem.symbols.get(*param_id);
                (symbol.name, symbol.ty)
            };
            let slot = self.create_default_value(param_ty)?;
            function_space.bind_value(param_name, slot.clone());
            self.set_value(&slot, arg)?;
        }
        self.execute_function_body(symbol_id, function_space)?;
        Ok(Value::None)
    }

    /// Create the call's memory space, chained to the current space, with
    /// the reserved return slot bound when the function declares a return
    /// type.
    fn create_function_space(&mut self, symbol_id: SymbolId) -> EvalResult<SpaceRef> {
        let fn_ty = self.renv.sem.symbols.get(symbol_id).ty;
        let ret = match self.renv.types().kind(fn_ty) {
            TypeKind::Function(sig) => sig.ret,
            _ => TypeId::NONE,
        };
        let function_space = SpaceRef::child_of(&self.current_space());
        if !ret.is_none() {
            let return_value = self.create_default_value(ret)?;
            function_space.bind_value(self.return_name, return_value);
        }
        Ok(function_space)
    }

    /// Evaluate argument nodes in the caller's space (pushing the function
    /// space first would let a parameter shadow an argument of the same
    /// name), then bind them as parameters.
    fn bind_parameters(
        &mut self,
        symbol_id: SymbolId,
        function_space: &SpaceRef,
        arg_nodes: &[NodeId],
    ) -> EvalResult<()> {
        let SymbolKind::UserFn { scope } = self.renv.sem.symbols.get(symbol_id).kind else {
            return Ok(());
        };
        let param_ids: Vec<SymbolId> = self.renv.sem.scopes.symbols(scope).to_vec();
        for (param_id, arg_node) in param_ids.iter().zip(arg_nodes) {
            let (param_name, param_ty) = {
                let symbol = self.renv.sem.symbols.get(*param_id);
                (symbol.name, symbol.ty)
            };
            let slot = self.create_default_value(param_ty)?;
            let argument = self.eval(*arg_node)?;
            function_space.bind_value(param_name, slot.clone());
            self.set_value(&slot, &argument)?;
        }
        Ok(())
    }

    /// Walk the function body inside its space.
    fn execute_function_body(
        &mut self,
        symbol_id: SymbolId,
        function_space: SpaceRef,
    ) -> EvalResult<()> {
        let Some(def_node) = self.renv.table.creation_node(symbol_id) else {
            return Ok(());
        };
        let NodeKind::FnDef { body, .. } = self.arena().kind(def_node) else {
            return Ok(());
        };
        let stmt_ids: Vec<NodeId> = self.arena().children(body).to_vec();

        tracing::trace!(
            function = self
                .renv
                .lookup(self.renv.sem.symbols.get(symbol_id).name),
            "calling user-defined function"
        );
        self.with_space(function_space, |interp| {
            for stmt in stmt_ids {
                if interp.exec_stmt(stmt)? == Flow::Return {
                    break;
                }
            }
            Ok(())
        })
    }
}
