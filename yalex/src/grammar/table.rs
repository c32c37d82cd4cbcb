//! ACTION/GOTO tables and a table-driven recognizer.

use super::lalr::{Automaton, StateId};
use super::model::{Grammar, GrammarToken, join};
use crate::error::GrammarError;
use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;
use std::fmt;

/// A parser action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// Push the state and consume the token.
    Shift(StateId),
    /// Reduce by the rule with this index in the unaugmented grammar.
    Reduce(usize),
    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shift(s) => write!(f, "s{}", s),
            Action::Reduce(r) => write!(f, "r{}", r),
            Action::Accept => f.write_str("acc"),
        }
    }
}

/// How a shift/reduce clash is settled. Reduce/reduce clashes always keep
/// the rule listed first, and `Accept` is never displaced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    #[default]
    PreferShift,
    PreferReduce,
}

/// A cell that received two different actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateId,
    pub symbol: GrammarToken,
    pub kept: Action,
    pub discarded: Action,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match (self.kept, self.discarded) {
            (Action::Reduce(_), Action::Reduce(_)) => "reduce/reduce",
            (Action::Accept, _) | (_, Action::Accept) => "accept",
            _ => "shift/reduce",
        };
        write!(
            f,
            "{} conflict in state {} on {}: kept {}, discarded {}",
            kind, self.state, self.symbol, self.kept, self.discarded
        )
    }
}

/// Counters of one [`ParsingTable::recognize`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizeStats {
    pub tokens: usize,
    pub shifts: usize,
    pub reductions: usize,
}

/// An LALR(1) parsing table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsingTable {
    action: BTreeMap<StateId, BTreeMap<GrammarToken, Action>>,
    goto: BTreeMap<StateId, BTreeMap<GrammarToken, StateId>>,
    grammar: Grammar,
    initial: StateId,
    conflicts: Vec<Conflict>,
}

impl ParsingTable {
    pub fn action(&self, state: StateId, symbol: &GrammarToken) -> Option<Action> {
        self.action.get(&state)?.get(symbol).copied()
    }

    pub fn goto(&self, state: StateId, symbol: &GrammarToken) -> Option<StateId> {
        self.goto.get(&state)?.get(symbol).copied()
    }

    pub fn actions(&self) -> &BTreeMap<StateId, BTreeMap<GrammarToken, Action>> {
        &self.action
    }

    pub fn gotos(&self) -> &BTreeMap<StateId, BTreeMap<GrammarToken, StateId>> {
        &self.goto
    }

    /// The grammar reductions refer to, without the augmented start rule.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn initial(&self) -> StateId {
        self.initial
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Runs the shift/reduce loop over `input` followed by `$`.
    pub fn recognize(&self, input: &[GrammarToken]) -> Result<RecognizeStats> {
        let mut stats = RecognizeStats::default();
        let end = GrammarToken::End;
        let mut states = vec![self.initial];
        let mut tokens = input.iter().chain(std::iter::once(&end));
        let mut token = tokens.next().ok_or_else(|| anyhow!("empty input"))?;
        stats.tokens += 1;
        loop {
            let state = *states.last().ok_or_else(|| anyhow!("stack underflow"))?;
            match self.action(state, token) {
                Some(Action::Shift(next)) => {
                    log::trace!("<{}> {}  Shift {}", state, token, next);
                    states.push(next);
                    token = match tokens.next() {
                        Some(t) => t,
                        None => bail!("unexpected end of stream"),
                    };
                    stats.tokens += 1;
                    stats.shifts += 1;
                }
                Some(Action::Reduce(index)) => {
                    let rule = &self.grammar.rules()[index];
                    log::trace!("<{}> {}  Reduce {}", state, token, rule);
                    let arity = rule.arity();
                    if arity >= states.len() {
                        bail!("stack underflow");
                    }
                    states.truncate(states.len() - arity);
                    let top = *states.last().ok_or_else(|| anyhow!("stack underflow"))?;
                    let Some(next) = self.goto(top, rule.head()) else {
                        bail!("no goto from state {} on {}", top, rule.head());
                    };
                    states.push(next);
                    stats.reductions += 1;
                }
                Some(Action::Accept) => {
                    log::trace!("<{}> {}  Accept", state, token);
                    return Ok(stats);
                }
                None => bail!("unexpected {} in state {}", token, state),
            }
        }
    }
}

/// Builds [`ParsingTable`]s from LALR(1) automata.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParsingTableBuilder {
    policy: ConflictPolicy,
}

impl ParsingTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    /// Fills the table for `automaton`, built from `grammar`.
    ///
    /// Terminal transitions become shifts and nonterminal transitions
    /// become gotos. Every complete item reduces by the matching rule of
    /// `grammar` on each of its lookaheads. The single accept action sits
    /// on `$` in the state reached from the initial state over the start
    /// symbol.
    pub fn build(
        &self,
        automaton: &Automaton,
        grammar: &Grammar,
    ) -> Result<ParsingTable, GrammarError> {
        let mut table = ParsingTable {
            action: BTreeMap::new(),
            goto: BTreeMap::new(),
            grammar: grammar.clone(),
            initial: automaton.initial(),
            conflicts: Vec::new(),
        };
        let augmented_start = automaton.grammar().start();

        for (&from, row) in automaton.transitions() {
            for (symbol, &to) in row {
                if symbol.is_nonterminal() {
                    let gotos = table.goto.entry(from).or_default();
                    gotos.insert(symbol.clone(), to);
                } else {
                    self.insert(&mut table, from, symbol, Action::Shift(to));
                }
            }
        }

        for (&id, state) in automaton.states() {
            for item in state.items().iter().filter(|i| i.is_complete()) {
                if &item.head == augmented_start {
                    continue;
                }
                let index = grammar
                    .rule_index(&item.head, &item.production)
                    .ok_or_else(|| GrammarError::RuleNotFound {
                        head: item.head.to_string(),
                        production: join(&item.production),
                    })?;
                for symbol in &item.lookahead {
                    self.insert(&mut table, id, symbol, Action::Reduce(index));
                }
            }
        }

        let accept = automaton
            .transition(automaton.initial(), grammar.start())
            .ok_or_else(|| GrammarError::NoAcceptState {
                symbol: grammar.start().to_string(),
            })?;
        self.insert(&mut table, accept, &GrammarToken::End, Action::Accept);

        log::debug!(
            "table: {} states, {} conflicts",
            automaton.state_count(),
            table.conflicts.len()
        );
        Ok(table)
    }

    fn insert(
        &self,
        table: &mut ParsingTable,
        state: StateId,
        symbol: &GrammarToken,
        action: Action,
    ) {
        let row = table.action.entry(state).or_default();
        let Some(&existing) = row.get(symbol) else {
            row.insert(symbol.clone(), action);
            return;
        };
        if existing == action {
            return;
        }
        let kept = match (existing, action) {
            (Action::Accept, _) | (_, Action::Accept) => Action::Accept,
            (Action::Reduce(a), Action::Reduce(b)) => Action::Reduce(a.min(b)),
            (shift @ Action::Shift(_), reduce) | (reduce, shift @ Action::Shift(_)) => {
                match self.policy {
                    ConflictPolicy::PreferShift => shift,
                    ConflictPolicy::PreferReduce => reduce,
                }
            }
        };
        let discarded = if kept == existing { action } else { existing };
        row.insert(symbol.clone(), kept);
        let conflict = Conflict {
            state,
            symbol: symbol.clone(),
            kept,
            discarded,
        };
        log::warn!("{}", conflict);
        table.conflicts.push(conflict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarRule;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn t(name: &str) -> GrammarToken {
        GrammarToken::terminal(name)
    }

    fn n(name: &str) -> GrammarToken {
        GrammarToken::nonterminal(name)
    }

    fn grammar(start: &str, rules: &[(&str, &[GrammarToken])]) -> Grammar {
        let rules = rules
            .iter()
            .map(|(head, prod)| GrammarRule::new(n(head), prod.to_vec()).unwrap())
            .collect();
        Grammar::new(n(start), rules).unwrap()
    }

    fn table(g: &Grammar, policy: ConflictPolicy) -> ParsingTable {
        let automaton = Automaton::lalr(g).unwrap();
        let builder = ParsingTableBuilder::with_policy(policy);
        builder.build(&automaton, g).unwrap()
    }

    fn words(text: &str) -> Vec<GrammarToken> {
        text.split_whitespace().map(t).collect()
    }

    /// E -> E + T | T ; T -> T * F | F ; F -> ( E ) | id
    fn expr() -> Grammar {
        grammar(
            "E",
            &[
                ("E", &[n("E"), t("+"), n("T")]),
                ("E", &[n("T")]),
                ("T", &[n("T"), t("*"), n("F")]),
                ("T", &[n("F")]),
                ("F", &[t("("), n("E"), t(")")]),
                ("F", &[t("id")]),
            ],
        )
    }

    #[test]
    fn expression_table_is_conflict_free() {
        init_logger();
        let table = table(&expr(), ConflictPolicy::default());
        assert!(table.conflicts().is_empty());
        assert!(table.recognize(&words("id + id * ( id + id )")).is_ok());
        assert!(table.recognize(&words("id")).is_ok());
        assert!(table.recognize(&words("id + * id")).is_err());
        assert!(table.recognize(&words("( id")).is_err());
        assert!(table.recognize(&[]).is_err());

        let stats = table.recognize(&words("id * id")).unwrap();
        assert_eq!(stats.shifts, 3);
        // F -> id, T -> F, F -> id, T -> T * F, E -> T
        assert_eq!(stats.reductions, 5);
    }

    #[test]
    fn single_accept_on_end() {
        let g = expr();
        let automaton = Automaton::lalr(&g).unwrap();
        let table = ParsingTableBuilder::new().build(&automaton, &g).unwrap();
        let initial = automaton.initial();
        let target = automaton.transition(initial, g.start()).unwrap();

        let mut accepts: Vec<(StateId, &GrammarToken)> = Vec::new();
        for (state, row) in table.actions() {
            for (symbol, action) in row {
                if *action == Action::Accept {
                    accepts.push((*state, symbol));
                }
            }
        }
        assert_eq!(accepts, vec![(target, &GrammarToken::End)]);
    }

    #[test]
    fn dangling_else() {
        init_logger();
        // S -> if S | if S else S | x
        let g = grammar(
            "S",
            &[
                ("S", &[t("if"), n("S")]),
                ("S", &[t("if"), n("S"), t("else"), n("S")]),
                ("S", &[t("x")]),
            ],
        );
        let shift = table(&g, ConflictPolicy::PreferShift);
        assert_eq!(shift.conflicts().len(), 1);
        let conflict = &shift.conflicts()[0];
        assert_eq!(conflict.symbol, t("else"));
        assert!(matches!(conflict.kept, Action::Shift(_)));
        assert_eq!(conflict.discarded, Action::Reduce(0));
        assert!(shift.recognize(&words("if if x else x")).is_ok());

        let reduce = table(&g, ConflictPolicy::PreferReduce);
        assert_eq!(reduce.conflicts().len(), 1);
        assert_eq!(reduce.conflicts()[0].kept, Action::Reduce(0));
        // Reducing on `else` closes every `if` before it can take one.
        assert!(reduce.recognize(&words("if if x")).is_ok());
        assert!(reduce.recognize(&words("if x else x")).is_err());
    }

    #[test]
    fn reduce_reduce_keeps_first_rule() {
        // S -> A | B ; A -> x ; B -> x
        let g = grammar(
            "S",
            &[
                ("S", &[n("A")]),
                ("S", &[n("B")]),
                ("A", &[t("x")]),
                ("B", &[t("x")]),
            ],
        );
        let table = table(&g, ConflictPolicy::default());
        assert_eq!(table.conflicts().len(), 1);
        assert_eq!(table.conflicts()[0].kept, Action::Reduce(2));
        assert_eq!(table.conflicts()[0].discarded, Action::Reduce(3));
        assert!(table.recognize(&words("x")).is_ok());
    }

    #[test]
    fn epsilon_rules_reduce_without_popping() {
        // L -> L x | ε
        let g = grammar(
            "L",
            &[
                ("L", &[n("L"), t("x")]),
                ("L", &[GrammarToken::epsilon()]),
            ],
        );
        let table = table(&g, ConflictPolicy::default());
        assert!(table.conflicts().is_empty());
        assert!(table.recognize(&[]).is_ok());
        let stats = table.recognize(&words("x x x")).unwrap();
        assert_eq!(stats.reductions, 4);
    }

    #[test]
    fn rule_missing_from_grammar() {
        let g = expr();
        let automaton = Automaton::lalr(&g).unwrap();
        let other = grammar("E", &[("E", &[n("T")]), ("T", &[t("id")])]);
        let builder = ParsingTableBuilder::new();
        let err = builder.build(&automaton, &other).unwrap_err();
        assert!(matches!(err, GrammarError::RuleNotFound { .. }));
    }

    #[test]
    fn tables_are_reproducible() {
        let a = table(&expr(), ConflictPolicy::default());
        let b = table(&expr(), ConflictPolicy::default());
        assert_eq!(a, b);
    }
}
