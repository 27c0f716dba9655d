//! A concrete evaluator for small integer/boolean expression grammars.
//!
//! Operators are recognised by name (case-insensitively): integer literals,
//! `true`/`false`, `Neg`, `Not`, `Add`, `Sub`, `Multiply`, `Div`, `Mod`,
//! `Lt`, `Gt`, `Eq`, `And`, `Or` and `Ite`. Any other zero-argument name
//! is a variable looked up in the example input. Grammars that give an
//! operator the wrong number of arguments are refused at construction.

use std::collections::BTreeMap;

use log::trace;
use thiserror::Error;

use crate::ast::Node;
use crate::eval::{EvalError, Evaluator};
use crate::grammar::{Grammar, GrammarError, NonTerminal, Symbol};

pub type Env = BTreeMap<String, i64>;

/// A grammar the evaluator cannot give a meaning to.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArithError {
    #[error("`{name}` is not a known operator, and as a variable it cannot take {found} arguments")]
    UnknownOperator {
        name: String,
        found: usize,
    },
    #[error("`{name}` takes {expected} arguments, but its production gives {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Lit(i64),
    Bool(bool),
    Var,
    Neg,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Eq,
    And,
    Or,
    Ite,
}

impl Op {
    fn arity(&self) -> usize {
        match self {
            Op::Lit(_) | Op::Bool(_) | Op::Var => 0,
            Op::Neg | Op::Not => 1,
            Op::Ite => 3,
            _ => 2,
        }
    }

    fn is_boolean(&self) -> bool {
        matches!(
            self,
            Op::Bool(_) | Op::Not | Op::Lt | Op::Gt | Op::Eq | Op::And | Op::Or,
        )
    }

    fn from_name(name: &str) -> Op {
        if let Ok(n) = name.parse::<i64>() {
            return Op::Lit(n);
        }

        match name.to_ascii_lowercase().as_str() {
            "true" => Op::Bool(true),
            "false" => Op::Bool(false),
            "neg" | "negate" => Op::Neg,
            "not" => Op::Not,
            "add" | "plus" => Op::Add,
            "sub" | "minus" => Op::Sub,
            "mul" | "multiply" | "times" => Op::Mul,
            "div" => Op::Div,
            "mod" => Op::Mod,
            "lt" => Op::Lt,
            "gt" => Op::Gt,
            "eq" => Op::Eq,
            "and" => Op::And,
            "or" => Op::Or,
            "ite" => Op::Ite,
            _ => Op::Var,
        }
    }
}

/// Evaluates trees over integer-valued variables. A category whose
/// productions all build booleans is a predicate category.
#[derive(Debug, Clone)]
pub struct ArithEvaluator {
    ops: Vec<(String, Op)>,
    predicates: Vec<bool>,
}

impl ArithEvaluator {
    /// Fails if some production uses an operator with the wrong number of
    /// arguments. Unknown names are variables and take none.
    pub fn new(grammar: &Grammar) -> Result<Self, ArithError> {
        let ops = grammar.terminals()
            .map(|t| {
                let name = grammar.name_of(Symbol::Terminal(t))?;
                Ok::<_, GrammarError>((name.to_string(), Op::from_name(name)))
            })
            .collect::<Result<Vec<_>, GrammarError>>()?;

        for prod in grammar.all_productions() {
            let (name, op) = &ops[prod.operator().index()];
            match (op, prod.arity()) {
                (_, found) if found == op.arity() => (),
                (Op::Var, found) => return Err(ArithError::UnknownOperator {
                    name: name.clone(),
                    found,
                }),
                (_, found) => return Err(ArithError::Arity {
                    name: name.clone(),
                    expected: op.arity(),
                    found,
                }),
            }
        }

        let predicates = grammar.all_non_terminals()
            .into_iter()
            .map(|nt| grammar.productions_for(nt)
                .map(|prods| prods.iter().all(|prod| ops[prod.operator().index()].1.is_boolean()))
                .unwrap_or(false)
            )
            .collect::<Vec<_>>();

        trace!("Operator table: {ops:?}");

        Ok(Self { ops, predicates })
    }

    fn value(&self, node: &Node, env: &Env) -> Result<Value, EvalError> {
        let Symbol::Terminal(t) = node.symbol() else {
            return Err(EvalError::Fault("cannot evaluate an incomplete tree".to_string()));
        };
        let (name, op) = self.ops.get(t.index())
            .ok_or_else(|| EvalError::Fault(format!("operator {t} is not in the table")))?;
        let args = node.children();

        let int = |idx: usize| -> Result<i64, EvalError> {
            match self.value(&args[idx], env)? {
                Value::Int(n) => Ok(n),
                Value::Bool(_) => Err(EvalError::Fault(
                    format!("`{name}` expects an integer in position {idx}")
                )),
            }
        };
        let boolean = |idx: usize| -> Result<bool, EvalError> {
            match self.value(&args[idx], env)? {
                Value::Bool(b) => Ok(b),
                Value::Int(_) => Err(EvalError::Fault(
                    format!("`{name}` expects a boolean in position {idx}")
                )),
            }
        };

        let res = match (op, args.len()) {
            (Op::Lit(n), 0) => Value::Int(*n),
            (Op::Bool(b), 0) => Value::Bool(*b),
            (Op::Var, 0) => env.get(name)
                .copied()
                .map(Value::Int)
                .ok_or_else(|| EvalError::Fault(format!("unbound variable `{name}`")))?,
            (Op::Neg, 1) => Value::Int(int(0)?.wrapping_neg()),
            (Op::Not, 1) => Value::Bool(!boolean(0)?),
            (Op::Add, 2) => Value::Int(int(0)?.wrapping_add(int(1)?)),
            (Op::Sub, 2) => Value::Int(int(0)?.wrapping_sub(int(1)?)),
            (Op::Mul, 2) => Value::Int(int(0)?.wrapping_mul(int(1)?)),
            (Op::Div, 2) => Value::Int(int(0)?.checked_div(int(1)?)
                .ok_or_else(|| EvalError::Rejected("division by zero".to_string()))?),
            (Op::Mod, 2) => Value::Int(int(0)?.checked_rem(int(1)?)
                .ok_or_else(|| EvalError::Rejected("remainder by zero".to_string()))?),
            (Op::Lt, 2) => Value::Bool(int(0)? < int(1)?),
            (Op::Gt, 2) => Value::Bool(int(0)? > int(1)?),
            (Op::Eq, 2) => Value::Bool(int(0)? == int(1)?),
            (Op::And, 2) => Value::Bool(boolean(0)? && boolean(1)?),
            (Op::Or, 2) => Value::Bool(boolean(0)? || boolean(1)?),
            (Op::Ite, 3) => if boolean(0)? {
                self.value(&args[1], env)?
            } else {
                self.value(&args[2], env)?
            },
            (_, n) => return Err(EvalError::Fault(
                format!("`{name}` cannot be applied to {n} arguments")
            )),
        };

        Ok(res)
    }
}

impl Evaluator for ArithEvaluator {
    type Input = Env;
    type Output = i64;

    fn evaluate(
        &self,
        _grammar: &Grammar,
        tree: &Node,
        input: &Env,
    ) -> Result<i64, EvalError> {
        match self.value(tree, input)? {
            Value::Int(n) => Ok(n),
            Value::Bool(_) => Err(EvalError::Fault("expected an integer program".to_string())),
        }
    }

    fn evaluate_predicate(
        &self,
        _grammar: &Grammar,
        tree: &Node,
        input: &Env,
    ) -> Result<bool, EvalError> {
        match self.value(tree, input)? {
            Value::Bool(b) => Ok(b),
            Value::Int(_) => Err(EvalError::Fault("expected a predicate".to_string())),
        }
    }

    fn is_predicate(&self, _grammar: &Grammar, category: NonTerminal) -> bool {
        self.predicates.get(category.index()).copied().unwrap_or(false)
    }
}
