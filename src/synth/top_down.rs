use std::collections::VecDeque;
use std::rc::Rc;

use log::{debug, trace};

use crate::ast::{Node, Program};
use crate::eval::Evaluator;
use crate::grammar::{Grammar, Symbol};
use crate::search::{SearchContext, SearchLimits, SearchStep, SynthError};

use super::Synthesizer;

/// Breadth-first refinement of partial trees, starting from a lone
/// placeholder for the start symbol. Each step takes one candidate off
/// the worklist: complete ones are checked against the examples, partial
/// ones have their leftmost-outermost placeholder expanded with every
/// production of its category.
///
/// There is no size cap: on grammars with recursive categories the search
/// only ends when a program is found or the driver's limits kick in.
pub struct TopDown {
    worklist: VecDeque<Rc<Node>>,
}

impl TopDown {
    pub fn new(grammar: &Grammar) -> Self {
        Self {
            worklist: VecDeque::from([Node::hole(grammar.start())]),
        }
    }

    pub fn pending(&self) -> usize {
        self.worklist.len()
    }

    fn expand<E: Evaluator>(
        &mut self,
        ctx: &SearchContext<'_, E>,
        cand: Rc<Node>,
        path: &[usize],
    ) -> Result<SearchStep, SynthError> {
        let grammar = ctx.grammar();
        // NOTE: `first_hole` only ever returns paths to placeholders
        let Some(Symbol::NonTerminal(nt)) = cand.get(path).map(Node::symbol) else {
            unreachable!("hole path does not lead to a placeholder");
        };

        let mut count = 0;
        for prod in grammar.productions_for(nt)? {
            let Some(next) = cand.replace(path, Node::expansion(prod)) else {
                unreachable!("hole path is valid");
            };

            trace!("Enqueue: {}", next.display(grammar));

            self.worklist.push_back(next);
            count += 1;
        }

        Ok(SearchStep::Expanded { cand, count })
    }
}

impl<E: Evaluator> Synthesizer<E> for TopDown {
    fn build(grammar: &Grammar, _limits: &SearchLimits) -> Self {
        Self::new(grammar)
    }

    fn step(&mut self, ctx: &SearchContext<'_, E>) -> Result<Option<SearchStep>, SynthError> {
        let Some(cand) = self.worklist.pop_front() else {
            return Ok(None);
        };

        if let Some(path) = cand.first_hole() {
            return self.expand(ctx, cand, &path).map(Some);
        }

        debug!("Try: {}", cand.display(ctx.grammar()));

        if ctx.check(&cand)? {
            // Completeness was just established by `first_hole`
            let Some(program) = Program::new(cand) else {
                unreachable!("candidate without holes is complete");
            };

            return Ok(Some(SearchStep::CorrectSample { program }));
        }

        Ok(Some(SearchStep::IncorrectSample { cand }))
    }
}
