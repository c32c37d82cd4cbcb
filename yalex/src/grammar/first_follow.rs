//! FIRST and FOLLOW sets.
//!
//! Both are least fixpoints over the rules: every pass recomputes each
//! rule's contribution from the current sets and stops once a whole pass
//! adds nothing. Sets only ever grow, so the iteration terminates, and
//! left recursion or nullable prefixes need no special casing.

use super::model::{Grammar, GrammarToken};
use std::collections::{BTreeMap, BTreeSet};

/// FIRST and FOLLOW of one nonterminal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirstFollow {
    /// May contain epsilon, never the end marker.
    pub first: BTreeSet<GrammarToken>,
    /// May contain the end marker, never epsilon.
    pub follow: BTreeSet<GrammarToken>,
}

/// FIRST/FOLLOW entries for every nonterminal of a grammar.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirstFollowTable {
    entries: BTreeMap<GrammarToken, FirstFollow>,
}

impl FirstFollowTable {
    pub fn entries(&self) -> &BTreeMap<GrammarToken, FirstFollow> {
        &self.entries
    }

    pub fn get(&self, symbol: &GrammarToken) -> Option<&FirstFollow> {
        self.entries.get(symbol)
    }

    /// FIRST of a single symbol. Terminals, epsilon and the end marker are
    /// their own FIRST set; unknown nonterminals have an empty one.
    pub fn first(&self, symbol: &GrammarToken) -> BTreeSet<GrammarToken> {
        match symbol {
            GrammarToken::NonTerminal(_) => self
                .entries
                .get(symbol)
                .map(|e| e.first.clone())
                .unwrap_or_default(),
            _ => BTreeSet::from([symbol.clone()]),
        }
    }

    /// FOLLOW of a nonterminal, empty for anything else.
    pub fn follow(&self, symbol: &GrammarToken) -> BTreeSet<GrammarToken> {
        self.entries
            .get(symbol)
            .map(|e| e.follow.clone())
            .unwrap_or_default()
    }

    pub fn nullable(&self, symbol: &GrammarToken) -> bool {
        match symbol {
            GrammarToken::NonTerminal(_) => self
                .entries
                .get(symbol)
                .is_some_and(|e| e.first.contains(&GrammarToken::epsilon())),
            _ => symbol.is_epsilon(),
        }
    }

    /// FIRST of a symbol string.
    ///
    /// Symbols are taken left to right until one is not nullable. Epsilon
    /// is part of the result only if every symbol is nullable, which
    /// includes the empty string.
    pub fn first_of_sequence(&self, sequence: &[GrammarToken]) -> BTreeSet<GrammarToken> {
        let epsilon = GrammarToken::epsilon();
        let mut out = BTreeSet::new();
        for symbol in sequence {
            let mut first = self.first(symbol);
            let nullable = first.remove(&epsilon);
            out.extend(first);
            if !nullable {
                return out;
            }
        }
        out.insert(epsilon);
        out
    }
}

/// Computes FIRST for every nonterminal of `grammar`.
pub fn compute_first(grammar: &Grammar) -> FirstFollowTable {
    let mut table = FirstFollowTable {
        entries: grammar
            .nonterminals()
            .iter()
            .map(|n| (n.clone(), FirstFollow::default()))
            .collect(),
    };
    let mut pass = 0;
    let mut changed = true;
    while changed {
        changed = false;
        pass += 1;
        for rule in grammar.rules() {
            let first = table.first_of_sequence(rule.production());
            let entry = table.entries.entry(rule.head().clone()).or_default();
            let before = entry.first.len();
            entry.first.extend(first);
            changed |= entry.first.len() != before;
        }
    }
    log::trace!("first: fixpoint after {} passes", pass);
    table
}

/// Computes FIRST and FOLLOW for every nonterminal of `grammar`.
pub fn compute_follow(grammar: &Grammar) -> FirstFollowTable {
    let mut table = compute_first(grammar);
    table
        .entries
        .entry(grammar.start().clone())
        .or_default()
        .follow
        .insert(GrammarToken::End);

    let epsilon = GrammarToken::epsilon();
    let mut pass = 0;
    let mut changed = true;
    while changed {
        changed = false;
        pass += 1;
        for rule in grammar.rules() {
            let production = rule.production();
            for (i, symbol) in production.iter().enumerate() {
                if !symbol.is_nonterminal() {
                    continue;
                }
                let mut add = table.first_of_sequence(&production[i + 1..]);
                if add.remove(&epsilon) {
                    add.extend(table.follow(rule.head()));
                }
                let entry = table.entries.entry(symbol.clone()).or_default();
                let before = entry.follow.len();
                entry.follow.extend(add);
                changed |= entry.follow.len() != before;
            }
        }
    }
    log::trace!("follow: fixpoint after {} passes", pass);
    table
}
