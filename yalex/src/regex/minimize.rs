//! State equivalence marking and DFA minimization.
//!
//! [`mark_distinguishable`] fills the classic pair table: a pair is
//! distinct when exactly one side accepts (or both accept for different
//! rules), or when some input symbol leads to a distinct pair. Pairs are
//! resolved recursively with memoization; the memo entry is written before
//! recursing, which terminates on cycles. A closing sweep repeats the
//! successor check until nothing changes, since a pair concluded while one
//! of its successors was still optimistically equivalent may need to flip.

use super::dfa::{Dfa, StateId};
use std::collections::{BTreeMap, BTreeSet};

/// Marking of a state pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Distinguish {
    Equivalent,
    Distinct,
}

/// Pairwise marking for all states of a DFA.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PairTable {
    pairs: BTreeMap<(StateId, StateId), Distinguish>,
}

impl PairTable {
    fn key(a: &StateId, b: &StateId) -> (StateId, StateId) {
        if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }

    /// Marking of `(a, b)`. A state is always equivalent to itself; pairs
    /// of states the table was not built for are reported distinct.
    pub fn get(&self, a: &StateId, b: &StateId) -> Distinguish {
        if a == b {
            return Distinguish::Equivalent;
        }
        self.pairs
            .get(&Self::key(a, b))
            .copied()
            .unwrap_or(Distinguish::Distinct)
    }

    pub fn is_equivalent(&self, a: &StateId, b: &StateId) -> bool {
        self.get(a, b) == Distinguish::Equivalent
    }

    /// Number of pairs marked equivalent.
    pub fn equivalent_count(&self) -> usize {
        self.pairs
            .values()
            .filter(|d| **d == Distinguish::Equivalent)
            .count()
    }
}

struct Marker<'a> {
    dfa: &'a Dfa,
    pairs: BTreeMap<(StateId, StateId), Distinguish>,
}

impl Marker<'_> {
    fn initial(&self, a: &StateId, b: &StateId) -> Distinguish {
        if self.dfa.is_accepting(a) != self.dfa.is_accepting(b)
            || self.dfa.action(a) != self.dfa.action(b)
        {
            Distinguish::Distinct
        } else {
            Distinguish::Equivalent
        }
    }

    fn mark(&mut self, a: &StateId, b: &StateId) -> Distinguish {
        if a == b {
            return Distinguish::Equivalent;
        }
        let key = PairTable::key(a, b);
        if let Some(&marking) = self.pairs.get(&key) {
            return marking;
        }
        let marking = self.initial(a, b);
        self.pairs.insert(key.clone(), marking);
        if marking == Distinguish::Distinct {
            return marking;
        }
        for &c in self.dfa.alphabet() {
            let (na, nb) = (self.dfa.step(a, c), self.dfa.step(b, c));
            if self.mark(na, nb) == Distinguish::Distinct {
                self.pairs.insert(key, Distinguish::Distinct);
                return Distinguish::Distinct;
            }
        }
        Distinguish::Equivalent
    }

    /// Re-checks every equivalent pair against its successors until stable.
    fn settle(&mut self) {
        let mut rounds = 0;
        loop {
            rounds += 1;
            let flipped: Vec<(StateId, StateId)> = self
                .pairs
                .iter()
                .filter(|(_, d)| **d == Distinguish::Equivalent)
                .filter(|((a, b), _)| {
                    self.dfa.alphabet().iter().any(|&c| {
                        let (na, nb) = (self.dfa.step(a, c), self.dfa.step(b, c));
                        let key = PairTable::key(na, nb);
                        na != nb && self.pairs.get(&key) == Some(&Distinguish::Distinct)
                    })
                })
                .map(|(key, _)| key.clone())
                .collect();
            if flipped.is_empty() {
                break;
            }
            for key in flipped {
                self.pairs.insert(key, Distinguish::Distinct);
            }
        }
        log::trace!("minimize: pair table settled after {} rounds", rounds);
    }
}

/// Marks every pair of states of `dfa` as equivalent or distinct.
pub fn mark_distinguishable(dfa: &Dfa) -> PairTable {
    let states: Vec<&StateId> = dfa.states().collect();
    let mut marker = Marker {
        dfa,
        pairs: BTreeMap::new(),
    };
    for (i, a) in states.iter().enumerate() {
        for b in &states[i + 1..] {
            marker.mark(a, b);
        }
    }
    marker.settle();
    PairTable {
        pairs: marker.pairs,
    }
}

/// Collapses equivalent states of `dfa`.
///
/// Each class is represented by its smallest id, except that a class
/// containing the trap state keeps the trap id.
pub fn minimize(dfa: &Dfa) -> Dfa {
    let table = mark_distinguishable(dfa);
    let states: Vec<&StateId> = dfa.states().collect();

    let mut representative: BTreeMap<StateId, StateId> = BTreeMap::new();
    for &state in &states {
        let rep = if table.is_equivalent(state, dfa.trap()) {
            dfa.trap()
        } else {
            states
                .iter()
                .copied()
                .find(|other| table.is_equivalent(state, other))
                .unwrap_or(state)
        };
        representative.insert(state.clone(), rep.clone());
    }
    let rep = |s: &StateId| representative[s].clone();

    let mut transitions: BTreeMap<StateId, BTreeMap<char, StateId>> = BTreeMap::new();
    for (state, row) in dfa.transitions() {
        transitions
            .entry(rep(state))
            .or_insert_with(|| row.iter().map(|(c, t)| (*c, rep(t))).collect());
    }
    let accepting: BTreeSet<StateId> = dfa.accepting().iter().map(rep).collect();
    let actions = dfa
        .actions()
        .iter()
        .map(|(s, tag)| (rep(s), tag.clone()))
        .collect();

    log::debug!(
        "minimize: {} -> {} states",
        dfa.state_count(),
        transitions.len()
    );
    Dfa {
        initial: rep(dfa.initial()),
        transitions,
        accepting,
        actions,
        alphabet: dfa.alphabet().clone(),
        trap: rep(dfa.trap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::{Alphabet, LexRule, compile, compile_rules};

    #[test]
    fn textbook_dfa_is_already_minimal() {
        let dfa = compile("(a|b)*abb", &Alphabet::default()).unwrap();
        let table = mark_distinguishable(&dfa);
        assert_eq!(table.equivalent_count(), 0);
        assert_eq!(minimize(&dfa), dfa);
    }

    #[test]
    fn redundant_states_collapse() {
        // The two `c` leaves give two states with identical futures.
        let dfa = compile("ac|bc", &Alphabet::default()).unwrap();
        let a = dfa.step(dfa.initial(), 'a').clone();
        let b = dfa.step(dfa.initial(), 'b').clone();
        let table = mark_distinguishable(&dfa);
        assert_ne!(a, b);
        assert!(table.is_equivalent(&a, &b));
        assert_eq!(table.get(dfa.initial(), &a), Distinguish::Distinct);

        let min = minimize(&dfa);
        assert_eq!(dfa.state_count(), 5);
        assert_eq!(min.state_count(), 4);
        for input in ["ac", "bc", "a", "", "ab", "acc", "cc"] {
            assert_eq!(min.derive(input), dfa.derive(input), "{input:?}");
        }
    }

    #[test]
    fn cyclic_equivalence() {
        // A two-state loop exercises the memo on cycles.
        let dfa = compile("(aa)*", &Alphabet::default()).unwrap();
        let min = minimize(&dfa);
        for n in 0..8 {
            let input: String = "a".repeat(n);
            assert_eq!(min.derive(&input), n % 2 == 0);
        }
        assert!(min.is_accepting(min.initial()));
    }

    #[test]
    fn different_actions_stay_apart() {
        let rules = [
            LexRule::new("IF", "if", 0),
            LexRule::new("ID", "[a-z]+", 1),
        ];
        let dfa = compile_rules(&rules, &Alphabet::default()).unwrap();
        let table = mark_distinguishable(&dfa);
        let if_state = dfa.step(dfa.step(dfa.initial(), 'i'), 'f');
        let id_state = dfa.step(dfa.step(dfa.initial(), 'x'), 'y');
        assert_eq!(table.get(if_state, id_state), Distinguish::Distinct);
        let min = minimize(&dfa);
        let (len, tag) = min.longest_match("if").unwrap();
        assert_eq!(len, 2);
        assert_eq!(tag.unwrap().source.as_str(), "IF");
    }
}
