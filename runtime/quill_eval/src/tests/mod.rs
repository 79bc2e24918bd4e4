//! Test suites for the evaluator.
//!
//! Small units keep inline `#[cfg(test)]` modules next to their
//! implementation; the scenario-level suites live here.

mod support;

mod interpreter_tests;
