//! Quill Types - type system, symbol table and host-class registry.
//!
//! # Architecture
//!
//! - `TypeTable` / `TypeId`: pooled types with fixed indices for basics
//! - `SymbolArena` / `ScopeTree`: named entities across nested lexical
//!   scopes, with total (sentinel-returning) resolution
//! - `SymbolTable`: AST ↔ symbol associations, including the creation-node
//!   link that powers lazy evaluation
//! - `HostRegistry` / `HostClassBuilder`: descriptor tables replacing
//!   reflection for host-class binding
//! - `analyze`: the semantic binder populating all of the above from a
//!   program
//!
//! Everything here is immutable once analysis completes; the evaluator
//! only reads it.

mod analyzer;
mod env;
mod host;
mod scope;
mod symbol;
mod table;
mod types;

pub use analyzer::{analyze, Analysis, Diagnostic, ITEM_BASE_TYPE};
pub use env::Environment;
pub use host::{
    dsl_member_name, host_instance, instance_key, Capability, HostAccessError, HostCallback,
    HostClass, HostClassBuilder, HostField, HostInstance, HostProperty, HostRead, HostRegistry,
    HostScalar, HostWrite,
};
pub use scope::{ScopeId, ScopeTree};
pub use symbol::{NativeFnId, Symbol, SymbolArena, SymbolId, SymbolKind};
pub use table::SymbolTable;
pub use types::{
    AggregateDef, EnumDef, FunctionSig, HostClassKey, Member, TypeDef, TypeId, TypeKind, TypeTable,
};
