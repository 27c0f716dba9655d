pub mod bottom_up;
pub mod product;
pub mod top_down;

use crate::eval::Evaluator;
use crate::grammar::Grammar;
use crate::search::{SearchContext, SearchLimits, SearchStep, SynthError};

/// A synthesizer is an iterator-like structure. Each step explores a bit
/// more of the grammar's language against the examples in `ctx`.
pub trait Synthesizer<E: Evaluator> {
    fn build(grammar: &Grammar, limits: &SearchLimits) -> Self;

    /// Advances the search. Returns `None` once the synthesizer has no
    /// candidates left to try.
    fn step(&mut self, ctx: &SearchContext<'_, E>) -> Result<Option<SearchStep>, SynthError>;
}
