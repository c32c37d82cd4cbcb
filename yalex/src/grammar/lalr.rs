//! LR(1) item sets and their LALR(1) merge.
//!
//! [`Automaton::construct`] builds the canonical LR(1) collection of an
//! augmented grammar; [`Automaton::simplify`] then folds together the
//! states that share a core, which gives the LALR(1) automaton.

use super::first_follow::{FirstFollowTable, compute_first};
use super::model::{Grammar, GrammarToken, join};
use crate::error::GrammarError;
use indexmap::IndexSet;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Index of an automaton state. After [`Automaton::simplify`] states are
/// numbered in breadth-first order from the initial state.
pub type StateId = usize;

/// An LR(1) item `[head -> α . β, lookahead]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LrItem {
    pub head: GrammarToken,
    pub production: Vec<GrammarToken>,
    pub dot: usize,
    pub lookahead: BTreeSet<GrammarToken>,
}

/// The lookahead-free part of an item.
pub type Core<'a> = (&'a GrammarToken, &'a [GrammarToken], usize);

type ItemKey = (GrammarToken, Vec<GrammarToken>, usize);
type Lookahead = BTreeSet<GrammarToken>;
type Transitions = BTreeMap<StateId, BTreeMap<GrammarToken, StateId>>;

impl LrItem {
    pub fn new(
        head: GrammarToken,
        production: Vec<GrammarToken>,
        dot: usize,
        lookahead: BTreeSet<GrammarToken>,
    ) -> Self {
        Self {
            head,
            production,
            dot,
            lookahead,
        }
    }

    fn from_entry(((head, production, dot), lookahead): (ItemKey, Lookahead)) -> Self {
        Self::new(head, production, dot, lookahead)
    }

    fn key(&self) -> ItemKey {
        (self.head.clone(), self.production.clone(), self.dot)
    }

    pub fn core(&self) -> Core<'_> {
        (&self.head, self.production.as_slice(), self.dot)
    }

    /// Symbol right after the dot. An epsilon production has none.
    pub fn next_symbol(&self) -> Option<&GrammarToken> {
        self.production.get(self.dot).filter(|s| !s.is_epsilon())
    }

    pub fn is_complete(&self) -> bool {
        self.next_symbol().is_none()
    }

    /// The item with the dot moved over one symbol.
    pub fn advance(&self) -> LrItem {
        LrItem {
            dot: self.dot + 1,
            ..self.clone()
        }
    }
}

impl fmt::Display for LrItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let split = self.dot.min(self.production.len());
        let (before, after) = self.production.split_at(split);
        write!(f, "[{} ->", self.head)?;
        if !before.is_empty() {
            write!(f, " {}", join(before))?;
        }
        write!(f, " .")?;
        if !after.is_empty() {
            write!(f, " {}", join(after))?;
        }
        write!(f, ", {{")?;
        for (i, la) in self.lookahead.iter().enumerate() {
            write!(f, "{}{}", if i > 0 { ", " } else { "" }, la)?;
        }
        write!(f, "}}]")
    }
}

/// An item set. Items are unique by core and sorted by core, so two
/// states with the same items compare equal whatever order the items were
/// found in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AutomatonState {
    items: Vec<LrItem>,
}

impl AutomatonState {
    /// Builds a state, merging the lookaheads of core-equal items.
    pub fn new<I: IntoIterator<Item = LrItem>>(items: I) -> Self {
        let mut by_core: BTreeMap<ItemKey, Lookahead> = BTreeMap::new();
        for item in items {
            by_core
                .entry((item.head, item.production, item.dot))
                .or_default()
                .extend(item.lookahead);
        }
        AutomatonState {
            items: by_core.into_iter().map(LrItem::from_entry).collect(),
        }
    }

    pub fn items(&self) -> &[LrItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `true` if both states hold the same item cores.
    pub fn core_eq(&self, other: &AutomatonState) -> bool {
        self.items.len() == other.items.len() && self.core_key() == other.core_key()
    }

    /// Unites the lookaheads of `other` into this state, item by item.
    /// Both states must be core-equal.
    pub fn merge(&mut self, other: &AutomatonState) {
        debug_assert!(self.core_eq(other));
        for (mine, theirs) in self.items.iter_mut().zip(&other.items) {
            mine.lookahead.extend(theirs.lookahead.iter().cloned());
        }
    }

    /// Distinct symbols right after a dot, in symbol order.
    pub fn symbols_after_dot(&self) -> BTreeSet<&GrammarToken> {
        self.items.iter().filter_map(LrItem::next_symbol).collect()
    }

    fn core_key(&self) -> Vec<Core<'_>> {
        self.items.iter().map(LrItem::core).collect()
    }
}

impl fmt::Display for AutomatonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        Ok(())
    }
}

/// Closes `state` under the LR(1) item expansion rule.
///
/// For every `[A -> α . X β, L]` with `X` a nonterminal and every rule
/// `X -> γ`, the item `[X -> . γ, FIRST(β) - {ε}]` is added, with `L`
/// included as well when `β` is empty or nullable. Repeats until no item
/// and no lookahead is added.
pub fn closure(
    state: &AutomatonState,
    grammar: &Grammar,
    table: &FirstFollowTable,
) -> Result<AutomatonState, GrammarError> {
    let epsilon = GrammarToken::epsilon();
    let mut items: BTreeMap<ItemKey, Lookahead> = state
        .items
        .iter()
        .map(|i| (i.key(), i.lookahead.clone()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        let snapshot: Vec<LrItem> = items.clone().into_iter().map(LrItem::from_entry).collect();
        for item in &snapshot {
            let Some(next) = item.next_symbol() else {
                continue;
            };
            if !next.is_nonterminal() {
                continue;
            }
            let mut lookahead = table.first_of_sequence(&item.production[item.dot + 1..]);
            if lookahead.remove(&epsilon) {
                lookahead.extend(item.lookahead.iter().cloned());
            }
            let mut found = false;
            for (_, rule) in grammar.rules_for(next) {
                found = true;
                let key = (next.clone(), rule.production().to_vec(), 0);
                changed |= !items.contains_key(&key);
                let entry = items.entry(key).or_default();
                let before = entry.len();
                entry.extend(lookahead.iter().cloned());
                changed |= entry.len() != before;
            }
            if !found {
                return Err(GrammarError::UndefinedRuleReference {
                    symbol: next.to_string(),
                });
            }
        }
    }
    Ok(AutomatonState::new(items.into_iter().map(LrItem::from_entry)))
}

/// Moves the dot over `symbol` in every item that allows it and closes the
/// result. Returns an empty state if no item does.
pub fn goto(
    state: &AutomatonState,
    symbol: &GrammarToken,
    grammar: &Grammar,
    table: &FirstFollowTable,
) -> Result<AutomatonState, GrammarError> {
    let kernel = AutomatonState::new(
        state
            .items
            .iter()
            .filter(|i| i.next_symbol() == Some(symbol))
            .map(LrItem::advance),
    );
    if kernel.is_empty() {
        return Ok(kernel);
    }
    closure(&kernel, grammar, table)
}

/// An LR(1) or LALR(1) automaton over an augmented grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Automaton {
    grammar: Grammar,
    states: BTreeMap<StateId, AutomatonState>,
    transitions: Transitions,
    initial: StateId,
}

impl Automaton {
    /// Builds the canonical LR(1) automaton of `grammar`.
    ///
    /// The grammar is augmented with a fresh start rule, the initial state
    /// is the closure of its item with lookahead `{$}`, and new states are
    /// discovered breadth first, trying symbols in order. States are
    /// identified by their complete item sets, lookaheads included.
    pub fn construct(grammar: &Grammar) -> Result<Automaton, GrammarError> {
        let grammar = grammar.augmented();
        let table = compute_first(&grammar);
        let start = LrItem::new(
            grammar.start().clone(),
            grammar.rules()[0].production().to_vec(),
            0,
            BTreeSet::from([GrammarToken::End]),
        );
        let initial = closure(&AutomatonState::new([start]), &grammar, &table)?;

        let mut states: IndexSet<AutomatonState> = IndexSet::new();
        states.insert(initial);
        let mut transitions = Transitions::new();

        let mut i = 0;
        while i < states.len() {
            let state = states[i].clone();
            for symbol in state.symbols_after_dot() {
                let next = goto(&state, symbol, &grammar, &table)?;
                let (j, new) = states.insert_full(next);
                if new {
                    log::trace!("lr1: state {} --{}--> new state {}", i, symbol, j);
                }
                transitions.entry(i).or_default().insert(symbol.clone(), j);
            }
            i += 1;
        }

        log::debug!("lr1: {} states", states.len());
        Ok(Automaton {
            grammar,
            states: states.into_iter().enumerate().collect(),
            transitions,
            initial: 0,
        })
    }

    /// Builds the LALR(1) automaton of `grammar`.
    pub fn lalr(grammar: &Grammar) -> Result<Automaton, GrammarError> {
        let mut automaton = Self::construct(grammar)?;
        automaton.simplify();
        Ok(automaton)
    }

    /// Merges all states that share a core.
    ///
    /// Each group of core-equal states becomes one state whose items carry
    /// the union of the group's lookaheads. Transitions are redirected to
    /// the merged states; core-equal states have core-equal successors, so
    /// the result stays deterministic. States are then renumbered breadth
    /// first from the initial state.
    pub fn simplify(&mut self) {
        let before = self.states.len();

        let mut group_of_core: BTreeMap<Vec<Core<'_>>, StateId> = BTreeMap::new();
        let mut representative: BTreeMap<StateId, StateId> = BTreeMap::new();
        for (&id, state) in &self.states {
            let rep = *group_of_core.entry(state.core_key()).or_insert(id);
            representative.insert(id, rep);
        }
        drop(group_of_core);

        let mut states: BTreeMap<StateId, AutomatonState> = BTreeMap::new();
        for (id, state) in &self.states {
            let rep = representative[id];
            match states.get_mut(&rep) {
                Some(merged) => {
                    log::trace!("lalr: merging state {} into {}", id, rep);
                    merged.merge(state);
                }
                None => {
                    states.insert(rep, state.clone());
                }
            }
        }
        let mut transitions = Transitions::new();
        for (from, row) in &self.transitions {
            let merged_row = transitions.entry(representative[from]).or_default();
            for (symbol, to) in row {
                merged_row.insert(symbol.clone(), representative[to]);
            }
        }
        let initial = representative[&self.initial];

        // Breadth-first renumbering.
        let mut order: BTreeMap<StateId, StateId> = BTreeMap::from([(initial, 0)]);
        let mut queue = VecDeque::from([initial]);
        while let Some(id) = queue.pop_front() {
            let Some(row) = transitions.get(&id) else {
                continue;
            };
            for to in row.values() {
                if !order.contains_key(to) {
                    order.insert(*to, order.len());
                    queue.push_back(*to);
                }
            }
        }

        self.states = states
            .into_iter()
            .filter_map(|(id, state)| order.get(&id).map(|&new| (new, state)))
            .collect();
        self.transitions = transitions
            .into_iter()
            .filter_map(|(from, row)| {
                let from = *order.get(&from)?;
                let row = row.into_iter().map(|(sym, to)| (sym, order[&to]));
                Some((from, row.collect()))
            })
            .collect();
        self.initial = 0;
        log::debug!("lalr: {} states merged into {}", before, self.states.len());
    }

    /// The augmented grammar the automaton was built for.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn states(&self) -> &BTreeMap<StateId, AutomatonState> {
        &self.states
    }

    pub fn state(&self, id: StateId) -> Option<&AutomatonState> {
        self.states.get(&id)
    }

    pub fn transitions(&self) -> &BTreeMap<StateId, BTreeMap<GrammarToken, StateId>> {
        &self.transitions
    }

    pub fn transition(&self, from: StateId, symbol: &GrammarToken) -> Option<StateId> {
        self.transitions.get(&from)?.get(symbol).copied()
    }

    pub fn initial(&self) -> StateId {
        self.initial
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }
}
