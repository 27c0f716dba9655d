use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::Node;
use crate::grammar::{Grammar, NonTerminal};

/// An input together with the output the synthesized program must produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example<I, O> {
    pub input: I,
    pub output: O,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The candidate has no value on this input (e.g. division by zero).
    /// The search treats this as a mismatch.
    #[error("candidate rejected: {0}")]
    Rejected(String),
    /// Anything else. Aborts the search.
    #[error("evaluator fault: {0}")]
    Fault(String),
}

/// Gives meaning to complete candidate trees. Implementations must be
/// deterministic: the same tree on the same input always yields the same
/// result.
pub trait Evaluator {
    type Input;
    type Output: Clone + Eq + Hash + Debug;

    /// Runs a tree of the primary (start) category.
    fn evaluate(
        &self,
        grammar: &Grammar,
        tree: &Node,
        input: &Self::Input,
    ) -> Result<Self::Output, EvalError>;

    /// Runs a tree of a predicate category.
    fn evaluate_predicate(
        &self,
        grammar: &Grammar,
        tree: &Node,
        input: &Self::Input,
    ) -> Result<bool, EvalError>;

    /// Whether trees of `category` are run with `evaluate_predicate`.
    fn is_predicate(&self, grammar: &Grammar, category: NonTerminal) -> bool {
        category != grammar.start()
    }
}
