//! Quill Eval - interpreter and runtime value model for the Quill DSL.
//!
//! This crate evaluates an analyzed quest-configuration script into a
//! host-bound object graph. A script is interpreted once per load,
//! single-threaded and synchronous, and control returns to the caller with
//! the live root object.
//!
//! # Architecture
//!
//! - `MemorySpace` / `SpaceRef`: lexical environments with parent-chained
//!   resolution, stacked strictly LIFO
//! - `Value`: the tagged runtime value, including host-backed proxies
//! - `PrototypeSlot` + the engine on `Interpreter`: default-value
//!   templates, instantiated independently per use
//! - `EncapsulatedObject` and friends: the host binding layer (translator
//!   in, instantiator out)
//! - `Interpreter` / `InterpreterBuilder`: the tree-walking evaluator
//! - `entry_points`: advisory root-definition discovery
//!
//! # Error model
//!
//! Resolution misses resolve to `Value::None`, setter mismatches report
//! `false`; only structural failures (host access, unsupported node
//! kinds) surface as [`EvalError`], carrying the defining symbol and an
//! approximate source location.

mod entrypoint;
mod error;
mod graph;
mod host;
mod interpreter;
mod memory;
mod natives;
mod prototype;
mod runtime_env;
mod shared;
mod value;

#[cfg(test)]
mod tests;

pub use entrypoint::{entry_points, EntryPoint};
pub use error::{EvalError, EvalResult};
pub use graph::{TaskEdge, TaskGraph};
pub use host::{
    instantiate_value, translate_instance, translate_read, AggPropertySlot, EncapsulatedObject,
    FieldSlot, ObjectTranslator, PropertySlot, TranslatorRegistry,
};
pub use interpreter::{Interpreter, InterpreterBuilder, RootConfig};
pub use memory::{MemorySpace, SpaceRef};
pub use natives::{NativeFunction, NativeInstantiate, NativePrint, NativeRegistry, PrintHandler};
pub use prototype::PrototypeSlot;
pub use runtime_env::{RuntimeEnv, SharedRuntimeEnv};
pub use shared::Shared;
pub use value::{
    AggregateSlot, BasicSlot, CallableRef, EnumSlot, FuncSlot, ListSlot, MapSlot, RawValue,
    SetSlot, Value, ValueKey,
};
