//! Evaluation errors.
//!
//! Only structural failures surface here: host-binding access errors and
//! language features without interpreter support. Recoverable conditions
//! (name misses, setter type mismatches) resolve to sentinel values or
//! booleans and never abort interpretation; see the taxonomy in the crate
//! docs.

use quill_ir::Span;
use quill_types::HostAccessError;

/// Result of evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// A structural evaluation failure. Aborts interpretation of the current
/// definition.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EvalError {
    /// The host class contract and the DSL type declaration disagree;
    /// not correctable at run time.
    #[error("cannot access member '{member}' of host class '{class}'")]
    HostAccess { class: String, member: String },

    /// An AST node kind outside the interpreted subset was reached.
    #[error("no interpretation for {kind} node at {span}")]
    UnsupportedNode { kind: &'static str, span: Span },

    /// A call target that is not a callable symbol.
    #[error("symbol '{name}' is not callable")]
    NotCallable { name: String },

    /// An operand type an operator cannot handle.
    #[error("invalid operand type for '{op}' at {span}")]
    InvalidOperand { op: &'static str, span: Span },

    /// Integer division by zero.
    #[error("division by zero at {span}")]
    DivisionByZero { span: Span },

    /// A `for` loop over a non-collection value.
    #[error("value of non-collection type used in for loop at {span}")]
    NotIterable { span: Span },

    /// An object definition whose bound value is not an aggregate.
    #[error("defined object '{name}' is not an aggregate value")]
    NotAnAggregate { name: String },

    /// `delete` on a host-backed (introspected) memory space.
    #[error("deleting '{name}' from a host-backed memory space is not supported")]
    ReadOnlySpace { name: String },

    /// Context wrapper naming the definition being interpreted.
    #[error("in definition '{definition}': {source}")]
    InDefinition {
        definition: String,
        #[source]
        source: Box<EvalError>,
    },
}

impl EvalError {
    /// Wrap with the name of the definition being interpreted, so content
    /// authors can locate the faulty script section.
    pub fn in_definition(self, definition: impl Into<String>) -> Self {
        match self {
            // keep the innermost definition; nested wrapping adds noise
            already @ EvalError::InDefinition { .. } => already,
            other => EvalError::InDefinition {
                definition: definition.into(),
                source: Box::new(other),
            },
        }
    }
}

impl From<HostAccessError> for EvalError {
    fn from(err: HostAccessError) -> Self {
        EvalError::HostAccess {
            class: err.class.to_owned(),
            member: err.member,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_context_is_not_nested() {
        let inner = EvalError::DivisionByZero { span: Span::ZERO };
        let wrapped = inner.in_definition("my_quest").in_definition("outer");
        match wrapped {
            EvalError::InDefinition { definition, .. } => assert_eq!(definition, "my_quest"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
