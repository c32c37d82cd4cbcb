//! Plain-text listings of grammar analysis results.
//!
//! Every listing starts with a count line and writes one comma-separated
//! record per line, so the output diffs well and is easy to grep.

use super::first_follow::FirstFollowTable;
use super::lalr::Automaton;
use super::model::{Grammar, GrammarToken};
use super::table::ParsingTable;
use std::collections::BTreeSet;
use std::io::{self, Write};

fn write_symbols<W: Write>(out: &mut W, symbols: &BTreeSet<GrammarToken>) -> io::Result<()> {
    write!(out, "{{")?;
    for (i, sym) in symbols.iter().enumerate() {
        write!(out, "{}{}", if i > 0 { ", " } else { "" }, sym)?;
    }
    write!(out, "}}")
}

/// Writes the rules of `grammar`.
///
/// ```text
/// PS,<number of rules>
/// P,<index>,<head> -> <production>
/// ```
pub fn write_prods<W: Write>(out: &mut W, grammar: &Grammar) -> io::Result<()> {
    writeln!(out, "PS,{}", grammar.rules().len())?;
    for (i, rule) in grammar.rules().iter().enumerate() {
        writeln!(out, "P,{},{}", i, rule)?;
    }
    Ok(())
}

/// Writes FIRST and FOLLOW of every nonterminal.
///
/// ```text
/// FIRST,<symbol>,{a, b, ε}
/// FOLLOW,<symbol>,{b, $}
/// ```
pub fn write_first_follow<W: Write>(out: &mut W, table: &FirstFollowTable) -> io::Result<()> {
    for (symbol, entry) in table.entries() {
        write!(out, "FIRST,{},", symbol)?;
        write_symbols(out, &entry.first)?;
        writeln!(out)?;
    }
    for (symbol, entry) in table.entries() {
        write!(out, "FOLLOW,{},", symbol)?;
        write_symbols(out, &entry.follow)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Writes the item sets and transitions of `automaton`.
///
/// ```text
/// CS,<number of states>
/// C,<state>,[A -> α . β, {lookaheads}]
/// T,<state>,<symbol>,<target>
/// ```
pub fn write_states<W: Write>(out: &mut W, automaton: &Automaton) -> io::Result<()> {
    writeln!(out, "CS,{}", automaton.state_count())?;
    for (id, state) in automaton.states() {
        for item in state.items() {
            writeln!(out, "C,{},{}", id, item)?;
        }
        if let Some(row) = automaton.transitions().get(id) {
            for (symbol, to) in row {
                writeln!(out, "T,{},{},{}", id, symbol, to)?;
            }
        }
    }
    Ok(())
}

/// Writes the ACTION and GOTO entries and the conflicts of `table`.
///
/// ```text
/// A,<state>,<symbol>,s3|r2|acc
/// G,<state>,<symbol>,<target>
/// X,<conflict description>
/// ```
pub fn write_table<W: Write>(out: &mut W, table: &ParsingTable) -> io::Result<()> {
    for (state, row) in table.actions() {
        for (symbol, action) in row {
            writeln!(out, "A,{},{},{}", state, symbol, action)?;
        }
    }
    for (state, row) in table.gotos() {
        for (symbol, to) in row {
            writeln!(out, "G,{},{},{}", state, symbol, to)?;
        }
    }
    for conflict in table.conflicts() {
        writeln!(out, "X,{}", conflict)?;
    }
    Ok(())
}
