use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use log::{debug, trace};

use crate::ast::{Node, Program};
use crate::equiv::{signature, EquivalenceReducer};
use crate::eval::Evaluator;
use crate::grammar::{Grammar, NonTerminal, Symbol};
use crate::search::{SearchContext, SearchLimits, SearchStep, SynthError};

use super::product::SizedProduct;
use super::Synthesizer;

struct Component {
    tree: Rc<Node>,
    category: NonTerminal,
    correct: bool,
}

/// Size-indexed enumeration of complete trees. Round `n` builds exactly
/// the trees of `n` nodes out of the (pruned) components of smaller size,
/// keeps one tree per observational-equivalence class, and checks the
/// survivors of the start category against the examples.
pub struct BottomUp<V> {
    max_size: usize,
    size: usize,
    categories: Vec<NonTerminal>,
    // Components by category, in order of increasing size
    bank: Vec<Vec<Rc<Node>>>,
    // One shared leaf per terminal, for literal argument positions
    leaves: Vec<Rc<Node>>,
    frontier: Vec<Component>,
    reducer: EquivalenceReducer<V>,
}

impl<V: Clone + Eq + Hash + Debug> BottomUp<V> {
    pub fn new(grammar: &Grammar, max_size: usize) -> Self {
        let categories = grammar.all_non_terminals().into_iter().collect::<Vec<_>>();

        Self {
            max_size,
            size: 0,
            bank: vec![Vec::new(); categories.len()],
            categories,
            leaves: grammar.terminals().map(Node::leaf).collect(),
            frontier: Vec::new(),
            reducer: EquivalenceReducer::new(),
        }
    }

    /// Size of the trees built by the last round, 0 before the first.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn components_of(&self, category: NonTerminal) -> &[Rc<Node>] {
        self.bank.get(category.index()).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn components(&self) -> impl Iterator<Item = (NonTerminal, &Rc<Node>)> {
        self.categories.iter()
            .zip(&self.bank)
            .flat_map(|(category, trees)| trees.iter().map(move |x| (*category, x)))
    }

    fn seed<E>(&mut self, ctx: &SearchContext<'_, E>) -> Result<(), SynthError>
    where
        E: Evaluator<Output = V>,
    {
        let grammar = ctx.grammar();

        for t in grammar.zero_arity_terminals() {
            let category = grammar.return_type_of(t)?;
            admit(ctx, &mut self.reducer, &mut self.frontier, Node::leaf(t), category)?;
        }

        Ok(())
    }

    fn grow<E>(&mut self, ctx: &SearchContext<'_, E>, target: usize) -> Result<(), SynthError>
    where
        E: Evaluator<Output = V>,
    {
        let grammar = ctx.grammar();
        let Self { bank, leaves, frontier, reducer, .. } = self;

        for op in grammar.operator_terminals() {
            let prod = grammar.production_of(op)?;
            let columns = prod.arguments().iter()
                .map(|arg| match arg {
                    Symbol::NonTerminal(nt) => bank[nt.index()].as_slice(),
                    Symbol::Terminal(t) => std::slice::from_ref(&leaves[t.index()]),
                })
                .collect::<Vec<_>>();
            let sizes = columns.iter()
                .map(|col| col.iter().map(|x| x.size()).collect::<Vec<_>>())
                .collect::<Vec<_>>();

            // The operator node itself accounts for one
            for digits in SizedProduct::new(&sizes, target - 1) {
                let children = digits.iter()
                    .zip(&columns)
                    .map(|(d, col)| col[*d].clone())
                    .collect();

                admit(ctx, reducer, frontier, Node::apply(op, children), prod.return_symbol())?;
            }
        }

        Ok(())
    }
}

fn admit<E: Evaluator>(
    ctx: &SearchContext<'_, E>,
    reducer: &mut EquivalenceReducer<E::Output>,
    frontier: &mut Vec<Component>,
    tree: Rc<Node>,
    category: NonTerminal,
) -> Result<(), SynthError> {
    let grammar = ctx.grammar();
    let sig = signature(ctx, category, &tree)?;
    let correct = category == grammar.start()
        && sig.matches(ctx.examples().iter().map(|x| &x.output));

    if reducer.admit(category, sig) {
        trace!("New component: {}", tree.display(grammar));
        frontier.push(Component { tree, category, correct });
    } else {
        trace!("Pruned: {}", tree.display(grammar));
    }

    Ok(())
}

impl<E: Evaluator> Synthesizer<E> for BottomUp<E::Output> {
    fn build(grammar: &Grammar, limits: &SearchLimits) -> Self {
        Self::new(grammar, limits.max_size)
    }

    fn step(&mut self, ctx: &SearchContext<'_, E>) -> Result<Option<SearchStep>, SynthError> {
        if self.size >= self.max_size {
            return Ok(None);
        }

        self.size += 1;
        if self.size == 1 {
            self.seed(ctx)?;
        } else {
            self.grow(ctx, self.size)?;
        }

        let found = self.frontier.iter()
            .find(|x| x.correct)
            .map(|x| x.tree.clone());
        let frontier = self.frontier.len();

        for comp in self.frontier.drain(..) {
            self.bank[comp.category.index()].push(comp.tree);
        }

        if let Some(program) = found.and_then(Program::new) {
            debug!("Size {}: found {}", self.size, program.display(ctx.grammar()));
            return Ok(Some(SearchStep::CorrectSample { program }));
        }

        Ok(Some(SearchStep::Round {
            size: self.size,
            frontier,
        }))
    }
}
