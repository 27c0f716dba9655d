use std::fmt;
use std::rc::Rc;

use crate::grammar::{Grammar, NonTerminal, Production, Symbol, Terminal};

/// Child indices leading from a root to one of its nodes.
pub type Path = Vec<usize>;

/// A (possibly partial) candidate program. Nodes are never mutated once
/// built; subtrees are shared between candidates through `Rc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    symbol: Symbol,
    children: Vec<Rc<Node>>,
    size: usize,
    complete: bool,
}

impl Node {
    fn new(symbol: Symbol, children: Vec<Rc<Node>>) -> Rc<Node> {
        let size = 1 + children.iter().map(|x| x.size).sum::<usize>();
        let complete = matches!(symbol, Symbol::Terminal(_))
            && children.iter().all(|x| x.complete);

        Rc::new(Node {
            symbol,
            children,
            size,
            complete,
        })
    }

    /// A constant or variable.
    pub fn leaf(t: Terminal) -> Rc<Node> {
        Self::new(Symbol::Terminal(t), Vec::new())
    }

    /// An unexpanded placeholder for any program of category `nt`.
    pub fn hole(nt: NonTerminal) -> Rc<Node> {
        Self::new(Symbol::NonTerminal(nt), Vec::new())
    }

    pub fn apply(op: Terminal, children: Vec<Rc<Node>>) -> Rc<Node> {
        Self::new(Symbol::Terminal(op), children)
    }

    /// The leaf for a terminal argument, the hole for a category.
    pub fn for_symbol(symbol: Symbol) -> Rc<Node> {
        Self::new(symbol, Vec::new())
    }

    /// One step of top-down refinement: the production's operator with a
    /// fresh child per argument symbol.
    pub fn expansion(prod: &Production) -> Rc<Node> {
        let children = prod.arguments().iter()
            .map(|x| Self::for_symbol(*x))
            .collect();

        Self::apply(prod.operator(), children)
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn children(&self) -> &[Rc<Node>] {
        &self.children
    }

    pub fn child(&self, idx: usize) -> Option<&Rc<Node>> {
        self.children.get(idx)
    }

    /// Total node count, leaves included.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_hole(&self) -> bool {
        matches!(self.symbol, Symbol::NonTerminal(_))
    }

    /// Path of the leftmost-outermost placeholder, scanning in preorder.
    pub fn first_hole(&self) -> Option<Path> {
        let mut path = Vec::new();

        self.find_hole(&mut path).then_some(path)
    }

    fn find_hole(&self, path: &mut Path) -> bool {
        if self.is_hole() {
            return true;
        }
        if self.complete {
            return false;
        }

        for (idx, child) in self.children.iter().enumerate() {
            path.push(idx);
            if child.find_hole(path) {
                return true;
            }
            path.pop();
        }

        false
    }

    pub fn get(&self, path: &[usize]) -> Option<&Node> {
        match path.split_first() {
            None => Some(self),
            Some((idx, rest)) => self.children.get(*idx)?.get(rest),
        }
    }

    /// Builds a new tree with the node at `path` replaced by `with`.
    /// Only the nodes along the path are copied, the rest is shared.
    /// Returns `None` if the path leads nowhere.
    pub fn replace(self: &Rc<Self>, path: &[usize], with: Rc<Node>) -> Option<Rc<Node>> {
        let Some((idx, rest)) = path.split_first() else {
            return Some(with);
        };

        let new_child = self.children.get(*idx)?.replace(rest, with)?;
        let mut children = self.children.clone();
        children[*idx] = new_child;

        Some(Self::new(self.symbol, children))
    }

    /// Renders the tree with the grammar's names, e.g. `Add(x, Multiply(y, 2))`.
    pub fn display<'a>(&'a self, grammar: &'a Grammar) -> TreeDisplay<'a> {
        TreeDisplay { node: self, grammar }
    }
}

pub struct TreeDisplay<'a> {
    node: &'a Node,
    grammar: &'a Grammar,
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.grammar.name_of(self.node.symbol) {
            Ok(name) => write!(f, "{name}")?,
            // Foreign handle, print it raw
            Err(_) => write!(f, "{}", self.node.symbol)?,
        }

        if !self.node.children.is_empty() {
            write!(f, "(")?;
            for (idx, child) in self.node.children.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", child.display(self.grammar))?;
            }
            write!(f, ")")?;
        }

        Ok(())
    }
}

/// A complete candidate tree selected as the synthesis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    root: Rc<Node>,
}

impl Program {
    pub fn new(root: Rc<Node>) -> Option<Self> {
        root.is_complete().then_some(Program { root })
    }

    pub fn root(&self) -> &Rc<Node> {
        &self.root
    }

    pub fn into_root(self) -> Rc<Node> {
        self.root
    }

    pub fn size(&self) -> usize {
        self.root.size()
    }

    pub fn display<'a>(&'a self, grammar: &'a Grammar) -> TreeDisplay<'a> {
        self.root.display(grammar)
    }
}
