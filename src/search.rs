use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{debug, info};
use thiserror::Error;

use crate::ast::{Node, Program};
use crate::eval::{EvalError, Evaluator, Example};
use crate::grammar::{Grammar, GrammarError};
use crate::synth::bottom_up::BottomUp;
use crate::synth::top_down::TopDown;
use crate::synth::Synthesizer;

pub const DEFAULT_MAX_SIZE: usize = 20;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error("evaluator failure: {0}")]
    Evaluator(EvalError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// Breadth-first refinement of partial trees from the start symbol
    TopDown,
    /// Size-indexed growth from terminals with observational-equivalence pruning
    BottomUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLimits {
    /// Largest tree (in nodes) the bottom-up search builds.
    pub max_size: usize,
    /// Number of search steps after which the search gives up.
    pub max_steps: Option<usize>,
    pub time_limit: Option<Duration>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            max_steps: None,
            time_limit: None,
        }
    }
}

impl SearchLimits {
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SynthResult {
    Program(Program),
    ProgramNotFound,
    Timeout,
}

#[derive(Clone, Debug)]
pub enum SearchStep {
    /// A complete candidate failed on some example.
    IncorrectSample {
        cand: Rc<Node>,
    },
    /// A partial candidate was refined into `count` new candidates.
    Expanded {
        cand: Rc<Node>,
        count: usize,
    },
    /// All trees of `size` nodes were built; `frontier` survived pruning.
    Round {
        size: usize,
        frontier: usize,
    },
    CorrectSample {
        program: Program,
    },
}

/// Everything a synthesizer reads during a run. Nothing in here changes
/// while the search is going.
pub struct SearchContext<'a, E: Evaluator> {
    grammar: &'a Grammar,
    examples: &'a [Example<E::Input, E::Output>],
    evaluator: &'a E,
}

impl<'a, E: Evaluator> SearchContext<'a, E> {
    pub fn new(
        grammar: &'a Grammar,
        examples: &'a [Example<E::Input, E::Output>],
        evaluator: &'a E,
    ) -> Self {
        Self {
            grammar,
            examples,
            evaluator,
        }
    }

    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    pub fn examples(&self) -> &'a [Example<E::Input, E::Output>] {
        self.examples
    }

    pub fn evaluator(&self) -> &'a E {
        self.evaluator
    }

    /// Runs a complete tree of the start category on every example and
    /// reports whether all outputs match exactly.
    pub fn check(&self, tree: &Node) -> Result<bool, SynthError> {
        for example in self.examples {
            match self.evaluator.evaluate(self.grammar, tree, &example.input) {
                Ok(out) if out == example.output => (),
                Ok(_) | Err(EvalError::Rejected(_)) => return Ok(false),
                Err(e) => return Err(SynthError::Evaluator(e)),
            }
        }

        Ok(true)
    }
}

/// Drives a synthesizer step by step and enforces the search limits.
pub struct Search<'a, E: Evaluator, S> {
    ctx: SearchContext<'a, E>,
    synth: S,
    steps: usize,
}

impl<'a, E: Evaluator, S: Synthesizer<E>> Search<'a, E, S> {
    pub fn new(ctx: SearchContext<'a, E>, limits: &SearchLimits) -> Self {
        let synth = S::build(ctx.grammar(), limits);

        Self {
            ctx,
            synth,
            steps: 0,
        }
    }

    pub fn context(&self) -> &SearchContext<'a, E> {
        &self.ctx
    }

    pub fn synthesizer(&self) -> &S {
        &self.synth
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn step(&mut self) -> Result<Option<SearchStep>, SynthError> {
        let res = self.synth.step(&self.ctx)?;
        if res.is_some() {
            self.steps += 1;
        }

        Ok(res)
    }

    pub fn run(&mut self, limits: &SearchLimits) -> Result<SynthResult, SynthError> {
        let deadline = limits.time_limit.map(|x| Instant::now() + x);
        let grammar = self.ctx.grammar();

        loop {
            if deadline.is_some_and(|x| Instant::now() >= x) {
                info!("Time limit reached after {} steps", self.steps);
                return Ok(SynthResult::Timeout);
            }
            if limits.max_steps.is_some_and(|x| self.steps >= x) {
                info!("Step limit reached after {} steps", self.steps);
                return Ok(SynthResult::ProgramNotFound);
            }

            match self.step()? {
                None => {
                    info!("Search space exhausted after {} steps", self.steps);
                    return Ok(SynthResult::ProgramNotFound);
                },
                Some(SearchStep::CorrectSample { program }) => {
                    info!("Found {} after {} steps", program.display(grammar), self.steps);
                    return Ok(SynthResult::Program(program));
                },
                Some(SearchStep::Round { size, frontier }) => {
                    debug!("Size {size}: {frontier} new components");
                },
                Some(_) => (),
            }
        }
    }
}

/// Searches `grammar` for a program reproducing every example.
pub fn synthesize<E: Evaluator>(
    grammar: &Grammar,
    examples: &[Example<E::Input, E::Output>],
    evaluator: &E,
    strategy: Strategy,
    limits: &SearchLimits,
) -> Result<SynthResult, SynthError> {
    let ctx = SearchContext::new(grammar, examples, evaluator);

    info!("Synthesizing with {strategy:?} over {} examples", examples.len());

    match strategy {
        Strategy::TopDown => Search::<E, TopDown>::new(ctx, limits).run(limits),
        Strategy::BottomUp => Search::<E, BottomUp<E::Output>>::new(ctx, limits).run(limits),
    }
}
