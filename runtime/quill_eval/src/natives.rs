//! Native (host-exposed) callables and print output.
//!
//! Natives receive already-evaluated argument values plus the interpreter,
//! and never walk a DSL body. `print` writes through a configurable
//! handler so tests can capture output instead of scraping stdout.

use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::value::Value;
use quill_types::{Environment, NativeFnId, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

/// Destination for `print` output.
#[derive(Clone, Default)]
pub enum PrintHandler {
    /// Write to stdout (default).
    #[default]
    Stdout,
    /// Capture into a shared buffer (tests, embedders).
    Buffer(Rc<RefCell<String>>),
    /// Discard silently.
    Silent,
}

impl PrintHandler {
    /// A capturing handler plus the buffer it writes into.
    pub fn buffer() -> (PrintHandler, Rc<RefCell<String>>) {
        let buffer = Rc::new(RefCell::new(String::new()));
        (PrintHandler::Buffer(buffer.clone()), buffer)
    }

    /// Print a line (with newline).
    pub fn println(&self, msg: &str) {
        match self {
            PrintHandler::Stdout => println!("{msg}"),
            PrintHandler::Buffer(buffer) => {
                let mut buffer = buffer.borrow_mut();
                buffer.push_str(msg);
                buffer.push('\n');
            }
            PrintHandler::Silent => {}
        }
    }
}

/// A host-exposed callable.
pub trait NativeFunction {
    /// DSL-visible name.
    fn name(&self) -> &'static str;

    /// Invoke with already-evaluated arguments.
    fn call(&self, interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value>;
}

/// Registry of native callables, indexed by [`NativeFnId`].
#[derive(Default)]
pub struct NativeRegistry {
    fns: Vec<Rc<dyn NativeFunction>>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        NativeRegistry::default()
    }

    /// Register a native, returning its id. The caller still has to
    /// declare the matching symbol in the environment.
    pub fn register(&mut self, f: Rc<dyn NativeFunction>) -> NativeFnId {
        let id = NativeFnId(u32::try_from(self.fns.len()).unwrap_or(u32::MAX));
        self.fns.push(f);
        id
    }

    /// Look up by id.
    pub fn get(&self, id: NativeFnId) -> Option<Rc<dyn NativeFunction>> {
        self.fns.get(id.0 as usize).cloned()
    }

    /// The standard native set (`print`, `instantiate`), declared into the
    /// environment's global scope.
    pub fn standard(env: &mut Environment) -> NativeRegistry {
        let mut registry = NativeRegistry::new();
        let id = registry.register(Rc::new(NativePrint));
        env.declare_native_fn("print", &[TypeId::STRING], TypeId::NONE, id);
        let id = registry.register(Rc::new(NativeInstantiate));
        env.declare_native_fn("instantiate", &[TypeId::PROTOTYPE], TypeId::NONE, id);
        registry
    }
}

/// `print(value)`: render the argument and write a line.
pub struct NativePrint;

impl NativeFunction for NativePrint {
    fn name(&self) -> &'static str {
        "print"
    }

    fn call(&self, interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
        let msg = args
            .first()
            .map(|v| v.render(interp.interner()))
            .unwrap_or_default();
        interp.print_handler().println(&msg);
        Ok(Value::None)
    }
}

/// `instantiate(prototype)`: create an independent aggregate value from a
/// prototype template.
pub struct NativeInstantiate;

impl NativeFunction for NativeInstantiate {
    fn name(&self) -> &'static str {
        "instantiate"
    }

    fn call(&self, interp: &mut Interpreter, args: &[Value]) -> EvalResult<Value> {
        match args.first() {
            Some(Value::Prototype(slot)) => {
                let proto = slot.borrow().clone();
                interp.instantiate_prototype(&proto)
            }
            _ => Ok(Value::None),
        }
    }
}
