//! Direct DFA construction from followpos.
//!
//! Each DFA state stands for a set of leaf positions of the augmented
//! syntax tree. The state id is derived from that set alone (see
//! [`StateId`]), so rediscovering a set through a different path always
//! lands on the same state.

use super::ast::{NodeSet, PositionRow};
use super::token::ActionTag;
use smartstring::alias::String;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::{self, Write};

/// Canonical DFA state id: the sorted leaf positions of the state, written
/// as `{p0,p1,...}`. The empty set `{}` is the trap state.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(String);

impl StateId {
    /// Builds the id of a position set. Positions are sorted and
    /// deduplicated first.
    pub fn from_positions<I: IntoIterator<Item = usize>>(positions: I) -> Self {
        let sorted: BTreeSet<usize> = positions.into_iter().collect();
        let mut id = String::from("{");
        for (i, p) in sorted.iter().enumerate() {
            if i > 0 {
                id.push(',');
            }
            // Writing into a SmartString cannot fail.
            let _ = write!(id, "{}", p);
        }
        id.push('}');
        StateId(id)
    }

    pub fn trap() -> Self {
        StateId("{}".into())
    }

    pub fn is_trap(&self) -> bool {
        self.0 == "{}"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A total deterministic automaton over [`Dfa::alphabet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dfa {
    pub(crate) initial: StateId,
    pub(crate) transitions: BTreeMap<StateId, BTreeMap<char, StateId>>,
    pub(crate) accepting: BTreeSet<StateId>,
    pub(crate) actions: BTreeMap<StateId, ActionTag>,
    pub(crate) alphabet: BTreeSet<char>,
    pub(crate) trap: StateId,
}

impl Dfa {
    pub fn initial(&self) -> &StateId {
        &self.initial
    }

    pub fn trap(&self) -> &StateId {
        &self.trap
    }

    /// Input symbols that label at least one transition.
    pub fn alphabet(&self) -> &BTreeSet<char> {
        &self.alphabet
    }

    pub fn transitions(&self) -> &BTreeMap<StateId, BTreeMap<char, StateId>> {
        &self.transitions
    }

    pub fn accepting(&self) -> &BTreeSet<StateId> {
        &self.accepting
    }

    /// Rule tags of accepting states that were reached through an action.
    pub fn actions(&self) -> &BTreeMap<StateId, ActionTag> {
        &self.actions
    }

    /// All states, the trap state included, in id order.
    pub fn states(&self) -> impl Iterator<Item = &StateId> {
        self.transitions.keys()
    }

    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_accepting(&self, state: &StateId) -> bool {
        self.accepting.contains(state)
    }

    pub fn action(&self, state: &StateId) -> Option<&ActionTag> {
        self.actions.get(state)
    }

    /// Follows the transition on `c`. Symbols outside the alphabet and
    /// unknown states lead to the trap state.
    pub fn step(&self, state: &StateId, c: char) -> &StateId {
        self.transitions
            .get(state)
            .and_then(|row| row.get(&c))
            .unwrap_or(&self.trap)
    }

    /// Returns `true` if the whole of `input` is accepted.
    pub fn derive(&self, input: &str) -> bool {
        let mut state = &self.initial;
        for c in input.chars() {
            state = self.step(state, c);
            if *state == self.trap {
                return false;
            }
        }
        self.is_accepting(state)
    }

    /// Finds the longest accepted prefix of `input`.
    ///
    /// Returns its length in bytes and the rule tag of the state it ends
    /// in, if any.
    pub fn longest_match(&self, input: &str) -> Option<(usize, Option<&ActionTag>)> {
        let mut state = &self.initial;
        let mut last = self.is_accepting(state).then(|| (0, self.action(state)));
        for (i, c) in input.char_indices() {
            state = self.step(state, c);
            if *state == self.trap {
                break;
            }
            if self.is_accepting(state) {
                last = Some((i + c.len_utf8(), self.action(state)));
            }
        }
        last
    }
}

/// Builds a [`Dfa`] from a position table.
pub struct DfaBuilder;

impl DfaBuilder {
    /// Runs direct construction over `rows`, as produced by
    /// [`annotate`](super::annotate). The last row is the root.
    pub fn build(rows: &[PositionRow]) -> Dfa {
        let trap = StateId::trap();
        let alphabet: BTreeSet<char> = rows.iter().filter_map(|r| r.symbol).collect();
        let Some(root) = rows.last() else {
            return Dfa {
                initial: trap.clone(),
                transitions: BTreeMap::from([(trap.clone(), BTreeMap::new())]),
                accepting: BTreeSet::new(),
                actions: BTreeMap::new(),
                alphabet,
                trap,
            };
        };

        let id_of =
            |set: &NodeSet| StateId::from_positions(set.iter().filter_map(|&n| rows[n].position));

        let initial = id_of(&root.firstpos);
        let mut discovered: BTreeMap<StateId, NodeSet> =
            BTreeMap::from([(initial.clone(), root.firstpos.clone())]);
        let mut queue = VecDeque::from([initial.clone()]);
        let mut transitions: BTreeMap<StateId, BTreeMap<char, StateId>> = BTreeMap::new();
        let mut accepting = BTreeSet::new();
        let mut actions = BTreeMap::new();

        while let Some(id) = queue.pop_front() {
            let set = discovered[&id].clone();

            let tag = set
                .iter()
                .filter_map(|&n| rows[n].action.as_ref())
                .min_by(|a, b| (a.priority, &a.source).cmp(&(b.priority, &b.source)));
            if let Some(tag) = tag {
                actions.insert(id.clone(), tag.clone());
                accepting.insert(id.clone());
            } else if set.iter().any(|&n| rows[n].is_accept) {
                accepting.insert(id.clone());
            }

            let mut moves: BTreeMap<char, NodeSet> = BTreeMap::new();
            for &leaf in &set {
                if let Some(c) = rows[leaf].symbol {
                    moves.entry(c).or_default().extend(&rows[leaf].followpos);
                }
            }

            let row = transitions.entry(id.clone()).or_default();
            for (c, next) in moves {
                if next.is_empty() {
                    continue;
                }
                let next_id = id_of(&next);
                log::trace!("dfa: {} --{:?}--> {}", id, c, next_id);
                row.insert(c, next_id.clone());
                if !discovered.contains_key(&next_id) {
                    discovered.insert(next_id.clone(), next);
                    queue.push_back(next_id);
                }
            }
        }

        // Route every missing (state, symbol) pair to the trap state.
        transitions.insert(trap.clone(), BTreeMap::new());
        for row in transitions.values_mut() {
            for &c in &alphabet {
                row.entry(c).or_insert_with(|| trap.clone());
            }
        }

        log::debug!(
            "dfa: {} states ({} accepting) over {} symbols",
            transitions.len(),
            accepting.len(),
            alphabet.len()
        );
        Dfa {
            initial,
            transitions,
            accepting,
            actions,
            alphabet,
            trap,
        }
    }
}
