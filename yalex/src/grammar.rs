//! Context-free grammars to LALR(1) parsing tables.
//!
//! [`compute_first`] and [`compute_follow`] analyse a [`Grammar`],
//! [`Automaton::construct`] builds its canonical LR(1) item sets,
//! [`Automaton::simplify`] merges them into LALR(1) states, and
//! [`ParsingTableBuilder`] turns the result into ACTION/GOTO tables.
//! Shift/reduce and reduce/reduce conflicts do not fail the build; they are
//! settled by a [`ConflictPolicy`] and listed on the [`ParsingTable`].

mod first_follow;
mod lalr;
mod model;
pub mod notation;
mod table;
pub mod write;

pub use first_follow::{FirstFollow, FirstFollowTable, compute_first, compute_follow};
pub use lalr::{Automaton, AutomatonState, Core, LrItem, StateId, closure, goto};
pub use model::{Grammar, GrammarRule, GrammarToken};
pub use table::{
    Action, Conflict, ConflictPolicy, ParsingTable, ParsingTableBuilder, RecognizeStats,
};

use anyhow::{Context, Result};
use notation::read_grammar;

/// Reads grammar notation and builds its LALR(1) table.
pub fn compile(text: &str, policy: ConflictPolicy) -> Result<ParsingTable> {
    let grammar = read_grammar(text).context("Failed to read grammar")?;
    let start = grammar.start();
    let automaton = Automaton::lalr(&grammar)
        .with_context(|| format!("Failed to build automaton for start symbol {}", start))?;
    let table = ParsingTableBuilder::with_policy(policy)
        .build(&automaton, &grammar)
        .context("Failed to build parsing table")?;
    Ok(table)
}
