//! Predicates over file entities.
//!
//! Callers build a [`Predicate`] tree explicitly. Before a query runs, the repository asks
//! [`NameShortcut`] whether the predicate is a plain `name == "..."` lookup it can answer
//! without scanning, and otherwise compiles it into a [`CompiledPredicate`] that is evaluated
//! against each scanned entity.

mod analyzer;
mod ast;
mod compiled;

pub use analyzer::NameShortcut;
pub use ast::{Captured, CapturedRef, CapturedScope, CompareOp, Field, Operand, Predicate, Value};
pub use compiled::CompiledPredicate;
