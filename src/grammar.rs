use std::collections::{BTreeSet, HashMap};
use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::Node;

/// Interned handle of an operator (constant, variable or function symbol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Terminal(u32);

/// Interned handle of a grammar category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonTerminal(u32);

impl Terminal {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl NonTerminal {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// Handles carry no name of their own, only the grammar that issued them does
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(t) => t.fmt(f),
            Symbol::NonTerminal(nt) => nt.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(Terminal),
    NonTerminal(NonTerminal),
}

impl From<Terminal> for Symbol {
    fn from(t: Terminal) -> Self {
        Symbol::Terminal(t)
    }
}

impl From<NonTerminal> for Symbol {
    fn from(nt: NonTerminal) -> Self {
        Symbol::NonTerminal(nt)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// The handle was issued by another grammar or builder, so there is
    /// no name to report.
    #[error("operator handle {0} does not belong to this grammar")]
    UnknownOperator(Terminal),
    #[error("category handle {0} does not belong to this grammar")]
    UnknownCategory(NonTerminal),
    #[error("`{0}` only appears as a literal argument and has no production")]
    NoProduction(String),
    #[error("operator `{0}` appears in more than one production")]
    DuplicateOperator(String),
    #[error("category `{0}` is referenced but has no productions")]
    MissingProductions(String),
    #[error("`{0}` is used both as an operator and as a category")]
    KindClash(String),
    #[error("operator `{0}` takes arguments and cannot be used as a literal argument")]
    LiteralOperator(String),
}

/// One way of building a value of the category `ret`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    ret: NonTerminal,
    op: Terminal,
    args: Vec<Symbol>,
}

impl Production {
    pub fn return_symbol(&self) -> NonTerminal {
        self.ret
    }

    pub fn operator(&self) -> Terminal {
        self.op
    }

    pub fn arguments(&self) -> &[Symbol] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

/// A production written with plain names, as it appears in a problem file.
/// Argument names that are the return symbol of some rule denote categories,
/// any other name is a literal terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub ret: String,
    pub op: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl RuleSpec {
    pub fn new(ret: &str, op: &str, args: &[&str]) -> Self {
        Self {
            ret: ret.to_string(),
            op: op.to_string(),
            args: args.iter().map(|x| x.to_string()).collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct GrammarBuilder {
    terminals: HashMap<String, Terminal>,
    terminal_names: Vec<String>,
    non_terminals: HashMap<String, NonTerminal>,
    non_terminal_names: Vec<String>,
    productions: Vec<Production>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminal(&mut self, name: &str) -> Terminal {
        if let Some(t) = self.terminals.get(name) {
            return *t;
        }

        let t = Terminal(self.terminal_names.len() as u32);
        self.terminals.insert(name.to_string(), t);
        self.terminal_names.push(name.to_string());

        t
    }

    pub fn non_terminal(&mut self, name: &str) -> NonTerminal {
        if let Some(nt) = self.non_terminals.get(name) {
            return *nt;
        }

        let nt = NonTerminal(self.non_terminal_names.len() as u32);
        self.non_terminals.insert(name.to_string(), nt);
        self.non_terminal_names.push(name.to_string());

        nt
    }

    pub fn production(
        &mut self,
        ret: NonTerminal,
        op: Terminal,
        args: impl IntoIterator<Item = Symbol>,
    ) -> &mut Self {
        self.productions.push(Production {
            ret,
            op,
            args: args.into_iter().collect(),
        });

        self
    }

    /// Builds a grammar from name-based rules. The categories are exactly
    /// the names appearing as `ret`.
    pub fn from_rules<'a>(
        start: &str,
        rules: impl IntoIterator<Item = &'a RuleSpec>,
    ) -> Result<Grammar, GrammarError> {
        let rules = rules.into_iter().collect::<Vec<_>>();
        let mut builder = Self::new();

        for rule in &rules {
            builder.non_terminal(&rule.ret);
        }
        let start = builder.non_terminal(start);

        for rule in &rules {
            if builder.non_terminals.contains_key(&rule.op) {
                return Err(GrammarError::KindClash(rule.op.clone()));
            }

            let ret = builder.non_terminal(&rule.ret);
            let op = builder.terminal(&rule.op);
            let args = rule.args.iter()
                .map(|arg| match builder.non_terminals.get(arg).copied() {
                    Some(nt) => Symbol::NonTerminal(nt),
                    None => Symbol::Terminal(builder.terminal(arg)),
                })
                .collect::<Vec<_>>();

            builder.production(ret, op, args);
        }

        builder.build(start)
    }

    pub fn build(self, start: NonTerminal) -> Result<Grammar, GrammarError> {
        let mut productions = vec![Vec::new(); self.non_terminal_names.len()];
        let mut owner = vec![None; self.terminal_names.len()];

        // Every handle must come from this builder before anything is indexed
        let known_nt = |nt: NonTerminal| if nt.index() < self.non_terminal_names.len() {
            Ok(())
        } else {
            Err(GrammarError::UnknownCategory(nt))
        };
        let known_t = |t: Terminal| if t.index() < self.terminal_names.len() {
            Ok(())
        } else {
            Err(GrammarError::UnknownOperator(t))
        };

        known_nt(start)?;
        for prod in &self.productions {
            known_nt(prod.ret)?;
            known_t(prod.op)?;
            for arg in &prod.args {
                match arg {
                    Symbol::Terminal(t) => known_t(*t)?,
                    Symbol::NonTerminal(nt) => known_nt(*nt)?,
                }
            }
        }

        for prod in self.productions {
            let op = prod.op.index();
            if owner[op].is_some() {
                return Err(GrammarError::DuplicateOperator(self.terminal_names[op].clone()));
            }

            let rules: &mut Vec<Production> = &mut productions[prod.ret.index()];
            owner[op] = Some((prod.ret, rules.len()));
            rules.push(prod);
        }

        let missing = |nt: NonTerminal| GrammarError::MissingProductions(
            self.non_terminal_names[nt.index()].clone()
        );

        if productions[start.index()].is_empty() {
            return Err(missing(start));
        }

        for prod in productions.iter().flatten() {
            for arg in &prod.args {
                match arg {
                    Symbol::NonTerminal(nt) if productions[nt.index()].is_empty() => {
                        return Err(missing(*nt));
                    },
                    Symbol::Terminal(t) => {
                        let takes_args = owner[t.index()]
                            .map(|(ret, idx): (NonTerminal, usize)| productions[ret.index()][idx].arity() > 0)
                            .unwrap_or(false);
                        if takes_args {
                            return Err(GrammarError::LiteralOperator(
                                self.terminal_names[t.index()].clone()
                            ));
                        }
                    },
                    _ => (),
                }
            }
        }

        trace!("Built grammar with {} categories and {} operators",
            self.non_terminal_names.len(),
            self.terminal_names.len(),
        );

        Ok(Grammar {
            start,
            terminal_names: self.terminal_names,
            non_terminal_names: self.non_terminal_names,
            productions,
            owner,
        })
    }
}

/// A validated context-free grammar. Read-only once built.
#[derive(Debug, Clone)]
pub struct Grammar {
    start: NonTerminal,
    terminal_names: Vec<String>,
    non_terminal_names: Vec<String>,
    productions: Vec<Vec<Production>>,
    // Terminal -> (category, position in that category's rules)
    owner: Vec<Option<(NonTerminal, usize)>>,
}

impl Grammar {
    pub fn start(&self) -> NonTerminal {
        self.start
    }

    pub fn productions_for(&self, nt: NonTerminal) -> Result<&[Production], GrammarError> {
        self.productions.get(nt.index())
            .map(Vec::as_slice)
            .ok_or(GrammarError::UnknownCategory(nt))
    }

    pub fn all_productions(&self) -> impl Iterator<Item = &Production> {
        self.productions.iter().flatten()
    }

    /// Operators without arguments: constants and variables.
    pub fn zero_arity_terminals(&self) -> Vec<Terminal> {
        self.all_productions()
            .filter(|prod| prod.arity() == 0)
            .map(Production::operator)
            .collect()
    }

    /// Operators taking at least one argument.
    pub fn operator_terminals(&self) -> Vec<Terminal> {
        self.all_productions()
            .filter(|prod| prod.arity() > 0)
            .map(Production::operator)
            .collect()
    }

    pub fn all_non_terminals(&self) -> BTreeSet<NonTerminal> {
        (0..self.non_terminal_names.len())
            .map(|idx| NonTerminal(idx as u32))
            .collect()
    }

    /// Every terminal, including those only used as literal arguments.
    pub fn terminals(&self) -> impl Iterator<Item = Terminal> {
        (0..self.terminal_names.len()).map(|idx| Terminal(idx as u32))
    }

    pub fn production_of(&self, op: Terminal) -> Result<&Production, GrammarError> {
        let (ret, idx) = match self.owner.get(op.index()) {
            Some(Some(x)) => *x,
            Some(None) => return Err(GrammarError::NoProduction(
                self.terminal_names[op.index()].clone()
            )),
            None => return Err(GrammarError::UnknownOperator(op)),
        };

        Ok(&self.productions[ret.index()][idx])
    }

    pub fn return_type_of(&self, op: Terminal) -> Result<NonTerminal, GrammarError> {
        self.production_of(op).map(Production::return_symbol)
    }

    pub fn argument_types_of(&self, op: Terminal) -> Result<&[Symbol], GrammarError> {
        self.production_of(op).map(Production::arguments)
    }

    /// The category a tree belongs to, read off its root alone.
    pub fn return_type_of_tree(&self, node: &Node) -> Result<NonTerminal, GrammarError> {
        match node.symbol() {
            Symbol::NonTerminal(nt) => Ok(nt),
            Symbol::Terminal(t) => self.return_type_of(t),
        }
    }

    /// Checks every node of `node` against the productions: arity matches
    /// and each child reduces to the type its position requires.
    pub fn well_typed(&self, node: &Node) -> bool {
        let Symbol::Terminal(op) = node.symbol() else {
            return node.children().is_empty();
        };
        let Ok(args) = self.argument_types_of(op) else {
            // Literal-only terminal
            return node.children().is_empty();
        };
        if args.len() != node.children().len() {
            return false;
        }

        args.iter().zip(node.children()).all(|(arg, child)| {
            let fits = match arg {
                Symbol::Terminal(t) => child.symbol() == Symbol::Terminal(*t),
                Symbol::NonTerminal(nt) => self.return_type_of_tree(child) == Ok(*nt),
            };

            fits && self.well_typed(child)
        })
    }

    pub fn name_of(&self, symbol: Symbol) -> Result<&str, GrammarError> {
        let name = match symbol {
            Symbol::Terminal(t) => self.terminal_names.get(t.index())
                .ok_or(GrammarError::UnknownOperator(t))?,
            Symbol::NonTerminal(nt) => self.non_terminal_names.get(nt.index())
                .ok_or(GrammarError::UnknownCategory(nt))?,
        };

        Ok(name.as_str())
    }

    pub fn terminal(&self, name: &str) -> Option<Terminal> {
        self.terminal_names.iter()
            .position(|x| x == name)
            .map(|idx| Terminal(idx as u32))
    }

    pub fn non_terminal(&self, name: &str) -> Option<NonTerminal> {
        self.non_terminal_names.iter()
            .position(|x| x == name)
            .map(|idx| NonTerminal(idx as u32))
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A built grammar only holds handles it issued
        let name = |x: Symbol| self.name_of(x).map_err(|_| fmt::Error);

        writeln!(f, "Start symbol: {}", name(self.start.into())?)?;
        writeln!(f, "Productions:")?;

        for prod in self.all_productions() {
            write!(f, "  {} -> {}", name(prod.ret.into())?, name(prod.op.into())?)?;
            if !prod.args.is_empty() {
                let args = prod.args.iter()
                    .map(|x| name(*x))
                    .collect::<Result<Vec<_>, _>>()?;
                write!(f, "({})", args.join(", "))?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
