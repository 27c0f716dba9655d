pub mod arith;
pub mod ast;
pub mod equiv;
pub mod eval;
pub mod grammar;
pub mod problem;
pub mod search;
pub mod synth;

pub use ast::{Node, Program};
pub use eval::{EvalError, Evaluator, Example};
pub use grammar::{Grammar, GrammarBuilder, GrammarError, NonTerminal, RuleSpec, Symbol, Terminal};
pub use search::{synthesize, SearchLimits, Strategy, SynthError, SynthResult};
