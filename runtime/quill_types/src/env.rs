//! Semantic environment: everything name resolution runs against.
//!
//! Constructed once per run, populated by host-class registration and
//! analysis, and read-only afterwards. The interpreter never mutates it.

use crate::scope::{ScopeId, ScopeTree};
use crate::symbol::{NativeFnId, Symbol, SymbolArena, SymbolId, SymbolKind};
use crate::types::{EnumDef, FunctionSig, TypeId, TypeKind, TypeTable};
use quill_ir::{Name, SharedInterner};
use smallvec::SmallVec;

/// Process-scoped semantic state: interner, type pool, symbols, scopes and
/// the host-class registry.
pub struct Environment {
    pub interner: SharedInterner,
    pub types: TypeTable,
    pub symbols: SymbolArena,
    pub scopes: ScopeTree,
    pub host: crate::host::HostRegistry,
}

impl Environment {
    /// Create an environment with the basic types bound as global type
    /// symbols.
    pub fn new(interner: SharedInterner) -> Self {
        let types = TypeTable::new(&interner);
        let mut env = Environment {
            interner,
            types,
            symbols: SymbolArena::new(),
            scopes: ScopeTree::new(),
            host: crate::host::HostRegistry::new(),
        };
        for id in [
            TypeId::INT,
            TypeId::FLOAT,
            TypeId::STRING,
            TypeId::BOOL,
            TypeId::GRAPH,
        ] {
            let name = env.types.name(id);
            let symbol = env.symbols.push(Symbol {
                name,
                ty: TypeId::NONE,
                kind: SymbolKind::Type(id),
                scope: ScopeId::GLOBAL,
            });
            env.scopes.bind(ScopeId::GLOBAL, name, symbol);
        }
        env
    }

    /// Resolve a name in the global scope.
    pub fn resolve_global(&self, name: Name) -> SymbolId {
        self.scopes.resolve(ScopeId::GLOBAL, name)
    }

    /// The type a symbol names, or `TypeId::NONE` when the symbol is not a
    /// type.
    pub fn named_type(&self, symbol: SymbolId) -> TypeId {
        match self.symbols.get(symbol).kind {
            SymbolKind::Type(ty) => ty,
            _ => TypeId::NONE,
        }
    }

    /// Declare a host-exposed native callable in the global scope.
    pub fn declare_native_fn(
        &mut self,
        name: &str,
        params: &[TypeId],
        ret: TypeId,
        id: NativeFnId,
    ) -> SymbolId {
        let name = self.interner.intern(name);
        let fn_ty = self.types.intern(
            name,
            TypeKind::Function(FunctionSig {
                params: SmallVec::from_slice(params),
                ret,
            }),
        );
        let symbol = self.symbols.push(Symbol {
            name,
            ty: fn_ty,
            kind: SymbolKind::NativeFn(id),
            scope: ScopeId::GLOBAL,
        });
        self.scopes.bind(ScopeId::GLOBAL, name, symbol);
        symbol
    }

    /// Register an enum type with its variants bound as variant symbols in
    /// the global scope (resolved through member access on the type name).
    pub fn register_enum(&mut self, name: &str, variants: &[&str]) -> TypeId {
        let type_name = self.interner.intern(name);
        let variant_names: Vec<Name> =
            variants.iter().map(|v| self.interner.intern(v)).collect();
        let ty = self.types.intern(
            type_name,
            TypeKind::Enum(EnumDef {
                variants: variant_names.clone(),
            }),
        );
        let type_symbol = self.symbols.push(Symbol {
            name: type_name,
            ty: TypeId::NONE,
            kind: SymbolKind::Type(ty),
            scope: ScopeId::GLOBAL,
        });
        self.scopes.bind(ScopeId::GLOBAL, type_name, type_symbol);
        for variant in variant_names {
            self.symbols.push(Symbol {
                name: variant,
                ty,
                kind: SymbolKind::EnumVariant { owner: ty },
                scope: ScopeId::GLOBAL,
            });
        }
        ty
    }
}
