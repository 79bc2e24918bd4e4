//! Semantic binder.
//!
//! Walks a [`Program`] and populates the environment's scopes, symbols and
//! types, producing the [`SymbolTable`] the interpreter evaluates against.
//! Unknown names bind to the null symbol and surface as non-fatal
//! diagnostics; analysis itself never fails.

use crate::env::Environment;
use crate::scope::ScopeId;
use crate::symbol::{Symbol, SymbolId, SymbolKind};
use crate::table::SymbolTable;
use crate::types::{AggregateDef, FunctionSig, Member, TypeId, TypeKind};
use quill_ir::{NodeId, NodeKind, Program, Span};
use smallvec::SmallVec;

/// Non-fatal finding produced during analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
}

/// Result of analysis: the symbol table plus advisory diagnostics.
pub struct Analysis {
    pub table: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// The DSL member name item definitions resolve their properties against.
pub const ITEM_BASE_TYPE: &str = "quest_item";

/// Analyze a program against (and into) the environment.
pub fn analyze(env: &mut Environment, program: &Program) -> Analysis {
    let mut analyzer = Analyzer {
        env,
        program,
        table: SymbolTable::new(),
        diagnostics: Vec::new(),
    };
    analyzer.bind_type_definitions();
    analyzer.bind_functions();
    analyzer.bind_object_definitions();
    Analysis {
        table: analyzer.table,
        diagnostics: analyzer.diagnostics,
    }
}

struct Analyzer<'a> {
    env: &'a mut Environment,
    program: &'a Program,
    table: SymbolTable,
    diagnostics: Vec<Diagnostic>,
}

impl Analyzer<'_> {
    fn report(&mut self, node: NodeId, message: String) {
        let span = self.program.arena.span(node);
        tracing::debug!(?span, message = message.as_str(), "analysis diagnostic");
        self.diagnostics.push(Diagnostic { message, span });
    }

    /// Pass 1: game-object and item prototype definitions become aggregate
    /// types.
    fn bind_type_definitions(&mut self) {
        for item in self.program.items() {
            match self.program.arena.kind(item) {
                NodeKind::PrototypeDef { name, components } => {
                    self.bind_prototype_def(item, name, components);
                }
                NodeKind::ItemPrototypeDef { name, properties } => {
                    self.bind_item_prototype_def(item, name, properties);
                }
                _ => {}
            }
        }
    }

    fn bind_prototype_def(
        &mut self,
        node: NodeId,
        name: quill_ir::Name,
        components: quill_ir::NodeRange,
    ) {
        let member_scope = self.env.scopes.push_scope(ScopeId::GLOBAL);
        let mut members = Vec::new();

        let component_ids: Vec<NodeId> = self.program.arena.children(components).to_vec();
        for comp in component_ids {
            let NodeKind::ComponentDef {
                type_name,
                properties,
            } = self.program.arena.kind(comp)
            else {
                self.report(comp, "expected a component definition".to_owned());
                continue;
            };
            let comp_ty = self
                .env
                .named_type(self.env.resolve_global(type_name));
            if comp_ty.is_none() {
                let wanted = self.env.interner.lookup(type_name);
                self.report(comp, format!("unknown component type '{wanted}'"));
                continue;
            }
            let symbol = self.env.symbols.push(Symbol {
                name: type_name,
                ty: comp_ty,
                kind: SymbolKind::Member,
                scope: member_scope,
            });
            self.env.scopes.bind(member_scope, type_name, symbol);
            self.table.associate(comp, symbol);
            members.push(Member {
                name: type_name,
                ty: comp_ty,
                symbol,
            });

            self.bind_properties_against(comp_ty, properties);
        }

        let ty = self.env.types.intern(
            name,
            TypeKind::Aggregate(AggregateDef {
                members,
                scope: member_scope,
                host: None,
            }),
        );
        self.bind_type_symbol(node, name, ty);
    }

    fn bind_item_prototype_def(
        &mut self,
        node: NodeId,
        name: quill_ir::Name,
        properties: quill_ir::NodeRange,
    ) {
        let base_name = self.env.interner.intern(ITEM_BASE_TYPE);
        let base_ty = self.env.named_type(self.env.resolve_global(base_name));
        let base_def = self.env.types.aggregate(base_ty).cloned();
        let def = match base_def {
            Some(def) => def,
            None => {
                self.report(
                    node,
                    format!("item definition requires a registered '{ITEM_BASE_TYPE}' host type"),
                );
                AggregateDef {
                    members: Vec::new(),
                    scope: self.env.scopes.push_scope(ScopeId::GLOBAL),
                    host: None,
                }
            }
        };

        self.bind_properties_against(base_ty, properties);

        let ty = self.env.types.intern(name, TypeKind::Aggregate(def));
        self.bind_type_symbol(node, name, ty);
    }

    /// Associate each property definition with the member it assigns in
    /// the aggregate `ty`.
    fn bind_properties_against(&mut self, ty: TypeId, properties: quill_ir::NodeRange) {
        let property_ids: Vec<NodeId> = self.program.arena.children(properties).to_vec();
        for prop in property_ids {
            let NodeKind::PropertyDef { name, .. } = self.program.arena.kind(prop) else {
                continue;
            };
            let Some(def) = self.env.types.aggregate(ty) else {
                continue;
            };
            let member = self.env.scopes.resolve_local(def.scope, name);
            if member.is_null() {
                let prop_name = self.env.interner.lookup(name);
                let ty_name = self.env.interner.lookup(self.env.types.name(ty));
                self.report(
                    prop,
                    format!("property '{prop_name}' cannot be resolved in type '{ty_name}'"),
                );
            } else {
                self.table.associate_reference(prop, member);
            }
        }
    }

    fn bind_type_symbol(&mut self, node: NodeId, name: quill_ir::Name, ty: TypeId) {
        let symbol = self.env.symbols.push(Symbol {
            name,
            ty: TypeId::NONE,
            kind: SymbolKind::Type(ty),
            scope: ScopeId::GLOBAL,
        });
        self.env.scopes.bind(ScopeId::GLOBAL, name, symbol);
        self.table.associate(node, symbol);
    }

    /// Pass 2: function definitions.
    fn bind_functions(&mut self) {
        for item in self.program.items() {
            let NodeKind::FnDef {
                name,
                params,
                return_type,
                ..
            } = self.program.arena.kind(item)
            else {
                continue;
            };

            let fn_scope = self.env.scopes.push_scope(ScopeId::GLOBAL);
            let mut param_types: SmallVec<[TypeId; 4]> = SmallVec::new();
            let param_ids: Vec<NodeId> = self.program.arena.children(params).to_vec();
            for param in param_ids {
                let NodeKind::ParamDef {
                    name: param_name,
                    type_name,
                } = self.program.arena.kind(param)
                else {
                    continue;
                };
                let ty = self.env.named_type(self.env.resolve_global(type_name));
                if ty.is_none() {
                    let wanted = self.env.interner.lookup(type_name);
                    self.report(param, format!("unknown parameter type '{wanted}'"));
                }
                let symbol = self.env.symbols.push(Symbol {
                    name: param_name,
                    ty,
                    kind: SymbolKind::Variable,
                    scope: fn_scope,
                });
                self.env.scopes.bind(fn_scope, param_name, symbol);
                self.table.associate(param, symbol);
                param_types.push(ty);
            }

            let ret = match return_type {
                Some(ret_name) => {
                    let ty = self.env.named_type(self.env.resolve_global(ret_name));
                    if ty.is_none() {
                        let wanted = self.env.interner.lookup(ret_name);
                        self.report(item, format!("unknown return type '{wanted}'"));
                    }
                    ty
                }
                None => TypeId::NONE,
            };

            let fn_ty = self.env.types.intern(
                name,
                TypeKind::Function(FunctionSig {
                    params: param_types,
                    ret,
                }),
            );
            let symbol = self.env.symbols.push(Symbol {
                name,
                ty: fn_ty,
                kind: SymbolKind::UserFn { scope: fn_scope },
                scope: ScopeId::GLOBAL,
            });
            self.env.scopes.bind(ScopeId::GLOBAL, name, symbol);
            self.table.associate(item, symbol);
        }
    }

    /// Pass 3: object and graph definitions become global variables.
    fn bind_object_definitions(&mut self) {
        for item in self.program.items() {
            match self.program.arena.kind(item) {
                NodeKind::ObjectDef {
                    type_name,
                    name,
                    properties,
                } => {
                    let ty = self
                        .env
                        .named_type(self.env.resolve_global(type_name));
                    if ty.is_none() {
                        let wanted = self.env.interner.lookup(type_name);
                        self.report(item, format!("unknown object type '{wanted}'"));
                    }
                    self.bind_global_variable(item, name, ty);
                    self.bind_properties_against(ty, properties);
                }
                NodeKind::GraphDef { name, .. } => {
                    self.bind_global_variable(item, name, TypeId::GRAPH);
                }
                _ => {}
            }
        }
    }

    fn bind_global_variable(&mut self, node: NodeId, name: quill_ir::Name, ty: TypeId) -> SymbolId {
        let symbol = self.env.symbols.push(Symbol {
            name,
            ty,
            kind: SymbolKind::Variable,
            scope: ScopeId::GLOBAL,
        });
        self.env.scopes.bind(ScopeId::GLOBAL, name, symbol);
        self.table.associate(node, symbol);
        symbol
    }
}
