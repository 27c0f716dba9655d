use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arith::Env;
use crate::eval::Example;
use crate::grammar::{Grammar, GrammarBuilder, GrammarError, RuleSpec};

/// A synthesis problem as read from disk: a grammar over the integer
/// language of [`crate::arith`] and the examples to reproduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub start: String,
    pub productions: Vec<RuleSpec>,
    pub examples: Vec<Example<Env, i64>>,
}

impl Problem {
    pub fn grammar(&self) -> Result<Grammar, GrammarError> {
        GrammarBuilder::from_rules(&self.start, &self.productions)
    }
}

pub fn decode_problem(bytes: &[u8]) -> Result<Problem, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn read_problem<P: AsRef<Path>>(path: P) -> anyhow::Result<Problem> {
    let data = fs::read(path)?;
    let problem = decode_problem(&data)?;
    Ok(problem)
}
