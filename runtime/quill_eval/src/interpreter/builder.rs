//! `InterpreterBuilder` for assembling an interpreter with its runtime
//! configuration.

use super::Interpreter;
use crate::host::{ObjectTranslator, TranslatorRegistry};
use crate::natives::{NativeRegistry, PrintHandler};
use crate::runtime_env::RuntimeEnv;
use quill_ir::Program;
use quill_types::{Environment, HostClassKey, SymbolTable};
use std::rc::Rc;

/// Builder for [`Interpreter`] instances.
///
/// Collects the semantic environment, the analysis output, the program,
/// and the runtime configuration, then freezes them into the shared
/// runtime environment the interpreter (and every host-backed value) reads
/// from.
pub struct InterpreterBuilder {
    env: Environment,
    table: SymbolTable,
    program: Program,
    natives: Option<NativeRegistry>,
    translators: TranslatorRegistry,
    root_type: String,
    assign_compat: bool,
    print: PrintHandler,
}

impl InterpreterBuilder {
    /// Start from an analyzed program.
    pub fn new(env: Environment, table: SymbolTable, program: Program) -> Self {
        InterpreterBuilder {
            env,
            table,
            program,
            natives: None,
            translators: TranslatorRegistry::new(),
            root_type: "quest_config".to_owned(),
            assign_compat: true,
            print: PrintHandler::Stdout,
        }
    }

    /// Install the native-callable registry (defaults to empty).
    pub fn natives(mut self, natives: NativeRegistry) -> Self {
        self.natives = Some(natives);
        self
    }

    /// Type name whose top-level definitions are entry points
    /// (default `"quest_config"`).
    pub fn root_type(mut self, name: &str) -> Self {
        self.root_type = name.to_owned();
        self
    }

    /// Preserve the original aggregate-assignment aliasing behavior
    /// (default `true`); `false` switches to pure value semantics.
    pub fn assign_compat(mut self, enabled: bool) -> Self {
        self.assign_compat = enabled;
        self
    }

    /// Destination for `print` output.
    pub fn print_handler(mut self, print: PrintHandler) -> Self {
        self.print = print;
        self
    }

    /// Register a custom host-object translator for a class.
    pub fn translator(mut self, key: HostClassKey, translator: Rc<dyn ObjectTranslator>) -> Self {
        self.translators.register(key, translator);
        self
    }

    /// Freeze everything into an interpreter.
    pub fn build(self) -> Interpreter {
        let root_type = self.env.interner.intern(&self.root_type);
        let renv = Rc::new(RuntimeEnv {
            sem: self.env,
            table: self.table,
            natives: self.natives.unwrap_or_default(),
            translators: self.translators,
        });
        Interpreter::from_parts(
            renv,
            Rc::new(self.program),
            root_type,
            self.assign_compat,
            self.print,
        )
    }
}
