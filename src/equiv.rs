use std::collections::HashSet;
use std::hash::Hash;
use std::rc::Rc;

use log::trace;

use crate::ast::Node;
use crate::eval::{EvalError, Evaluator};
use crate::grammar::NonTerminal;
use crate::search::{SearchContext, SynthError};

/// The outputs of a tree on every example, in example order. `None`
/// marks an example the evaluator rejected the tree on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature<V> {
    Primary(Vec<Option<V>>),
    Predicate(Vec<Option<bool>>),
}

impl<V: PartialEq> Signature<V> {
    /// Whether this is a primary signature equal to `expected` everywhere.
    pub fn matches<'a>(&self, expected: impl IntoIterator<Item = &'a V>) -> bool
    where
        V: 'a,
    {
        let Signature::Primary(outputs) = self else {
            return false;
        };
        let mut expected = expected.into_iter();

        outputs.iter().all(|out| match (out, expected.next()) {
            (Some(out), Some(exp)) => out == exp,
            _ => false,
        }) && expected.next().is_none()
    }
}

fn accept<T>(res: Result<T, EvalError>) -> Result<Option<T>, SynthError> {
    match res {
        Ok(x) => Ok(Some(x)),
        Err(EvalError::Rejected(why)) => {
            trace!("Rejected: {why}");
            Ok(None)
        },
        Err(e) => Err(SynthError::Evaluator(e)),
    }
}

/// Evaluates a complete tree of `category` on every example.
pub fn signature<E: Evaluator>(
    ctx: &SearchContext<'_, E>,
    category: NonTerminal,
    tree: &Node,
) -> Result<Signature<E::Output>, SynthError> {
    let grammar = ctx.grammar();
    let evaluator = ctx.evaluator();
    let inputs = ctx.examples().iter().map(|x| &x.input);

    if evaluator.is_predicate(grammar, category) {
        inputs.map(|input| accept(evaluator.evaluate_predicate(grammar, tree, input)))
            .collect::<Result<Vec<_>, _>>()
            .map(Signature::Predicate)
    } else {
        inputs.map(|input| accept(evaluator.evaluate(grammar, tree, input)))
            .collect::<Result<Vec<_>, _>>()
            .map(Signature::Primary)
    }
}

/// Remembers one class per (category, signature) pair seen so far.
#[derive(Debug)]
pub struct EquivalenceReducer<V> {
    seen: HashSet<(NonTerminal, Signature<V>)>,
}

impl<V> Default for EquivalenceReducer<V> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }
}

impl<V: Eq + Hash> EquivalenceReducer<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the signature opens a new class, i.e. the tree
    /// carrying it should be kept as the class representative.
    pub fn admit(&mut self, category: NonTerminal, signature: Signature<V>) -> bool {
        self.seen.insert((category, signature))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Keeps the first tree of every observational-equivalence class.
pub fn eliminate_equivalents<E: Evaluator>(
    ctx: &SearchContext<'_, E>,
    trees: impl IntoIterator<Item = Rc<Node>>,
) -> Result<Vec<Rc<Node>>, SynthError> {
    let grammar = ctx.grammar();
    let mut reducer = EquivalenceReducer::new();
    let mut kept = Vec::new();

    for tree in trees {
        let category = grammar.return_type_of_tree(&tree)?;
        let sig = signature(ctx, category, &tree)?;

        if reducer.admit(category, sig) {
            kept.push(tree);
        } else {
            trace!("Pruned {}", tree.display(grammar));
        }
    }

    Ok(kept)
}
