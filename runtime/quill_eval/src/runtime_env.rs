//! Runtime environment: the read-only state interpretation runs against.

use crate::host::TranslatorRegistry;
use crate::natives::NativeRegistry;
use quill_ir::{Name, StringInterner};
use quill_types::{Environment, SymbolTable, TypeTable};
use std::rc::Rc;

/// Everything the evaluator reads but never writes: the semantic
/// environment (types, symbols, scopes, host classes), the symbol table
/// from analysis, the native registry and custom object translators.
///
/// Shared (`Rc`) between the interpreter and every host-backed value, the
/// way memory-space proxies need to reach type information long after the
/// interpreter call that created them returned.
pub struct RuntimeEnv {
    pub sem: Environment,
    pub table: SymbolTable,
    pub natives: NativeRegistry,
    pub translators: TranslatorRegistry,
}

/// Shared handle to a [`RuntimeEnv`].
pub type SharedRuntimeEnv = Rc<RuntimeEnv>;

impl RuntimeEnv {
    pub fn interner(&self) -> &StringInterner {
        &self.sem.interner
    }

    pub fn types(&self) -> &TypeTable {
        &self.sem.types
    }

    /// Readable form of a name, for diagnostics.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.sem.interner.lookup(name)
    }
}
