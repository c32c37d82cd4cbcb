//! Grammar symbols, rules and grammars.

use crate::error::GrammarError;
use smartstring::alias::String;
use std::collections::BTreeSet;
use std::fmt;

/// A grammar symbol.
///
/// The derived order (terminals, then nonterminals, then the end marker,
/// each by name) is the order in which symbols are visited whenever
/// construction has to pick one.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrammarToken {
    /// A terminal, or epsilon when `None`.
    Terminal(Option<String>),
    NonTerminal(String),
    /// End of input, `$`.
    End,
}

impl GrammarToken {
    pub fn terminal(name: &str) -> Self {
        GrammarToken::Terminal(Some(name.into()))
    }

    pub fn nonterminal(name: &str) -> Self {
        GrammarToken::NonTerminal(name.into())
    }

    pub fn epsilon() -> Self {
        GrammarToken::Terminal(None)
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self, GrammarToken::Terminal(None))
    }

    /// `true` for named terminals and the end marker.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GrammarToken::Terminal(Some(_)) | GrammarToken::End)
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self, GrammarToken::NonTerminal(_))
    }

    /// Symbol name as written in grammar notation.
    pub fn name(&self) -> &str {
        match self {
            GrammarToken::Terminal(Some(name)) | GrammarToken::NonTerminal(name) => name.as_str(),
            GrammarToken::Terminal(None) => "ε",
            GrammarToken::End => "$",
        }
    }
}

impl fmt::Display for GrammarToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Writes symbols separated by single spaces.
pub(crate) fn join(symbols: &[GrammarToken]) -> std::string::String {
    symbols
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A production `head -> production`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GrammarRule {
    head: GrammarToken,
    production: Vec<GrammarToken>,
}

impl GrammarRule {
    /// Checks and builds a rule.
    ///
    /// The head must be a nonterminal and the production must not be empty.
    /// An empty alternative is written as a single epsilon; epsilon may not
    /// appear next to other symbols, and the end marker may not appear at
    /// all.
    pub fn new(head: GrammarToken, production: Vec<GrammarToken>) -> Result<Self, GrammarError> {
        let rule = GrammarRule { head, production };
        let reason = if !rule.head.is_nonterminal() {
            Some("head is not a nonterminal")
        } else if rule.production.is_empty() {
            Some("empty production, use an explicit epsilon")
        } else if rule.production.len() > 1
            && rule.production.iter().any(GrammarToken::is_epsilon)
        {
            Some("epsilon mixed with other symbols")
        } else if rule.production.contains(&GrammarToken::End) {
            Some("end marker in production")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(GrammarError::InvalidRule {
                rule: rule.to_string(),
                reason,
            }),
            None => Ok(rule),
        }
    }

    pub fn head(&self) -> &GrammarToken {
        &self.head
    }

    pub fn production(&self) -> &[GrammarToken] {
        &self.production
    }

    pub fn is_epsilon(&self) -> bool {
        self.production.len() == 1 && self.production[0].is_epsilon()
    }

    /// Number of stack entries a reduction by this rule pops.
    pub fn arity(&self) -> usize {
        if self.is_epsilon() {
            0
        } else {
            self.production.len()
        }
    }
}

impl fmt::Display for GrammarRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.head, join(&self.production))
    }
}

/// A context-free grammar. Rule indices are positions in [`Grammar::rules`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grammar {
    start: GrammarToken,
    rules: Vec<GrammarRule>,
    terminals: BTreeSet<GrammarToken>,
    nonterminals: BTreeSet<GrammarToken>,
}

impl Grammar {
    /// Builds a grammar. Terminals and nonterminals are collected from the
    /// rules; nonterminals referenced without a rule of their own are kept
    /// so that construction can report them.
    pub fn new(start: GrammarToken, rules: Vec<GrammarRule>) -> Result<Self, GrammarError> {
        if !start.is_nonterminal() {
            return Err(GrammarError::InvalidStart {
                symbol: start.to_string(),
            });
        }
        let mut terminals = BTreeSet::new();
        let mut nonterminals = BTreeSet::from([start.clone()]);
        for rule in &rules {
            nonterminals.insert(rule.head.clone());
            for sym in &rule.production {
                match sym {
                    GrammarToken::NonTerminal(_) => {
                        nonterminals.insert(sym.clone());
                    }
                    GrammarToken::Terminal(Some(_)) => {
                        terminals.insert(sym.clone());
                    }
                    _ => {}
                }
            }
        }
        Ok(Grammar {
            start,
            rules,
            terminals,
            nonterminals,
        })
    }

    pub fn start(&self) -> &GrammarToken {
        &self.start
    }

    pub fn rules(&self) -> &[GrammarRule] {
        &self.rules
    }

    /// Named terminals; neither epsilon nor the end marker.
    pub fn terminals(&self) -> &BTreeSet<GrammarToken> {
        &self.terminals
    }

    pub fn nonterminals(&self) -> &BTreeSet<GrammarToken> {
        &self.nonterminals
    }

    /// Rules headed by `head`, with their indices, in grammar order.
    pub fn rules_for<'a>(
        &'a self,
        head: &'a GrammarToken,
    ) -> impl Iterator<Item = (usize, &'a GrammarRule)> + 'a {
        self.rules
            .iter()
            .enumerate()
            .filter(move |(_, r)| &r.head == head)
    }

    /// Index of the rule with exactly this head and production.
    pub fn rule_index(&self, head: &GrammarToken, production: &[GrammarToken]) -> Option<usize> {
        self.rules
            .iter()
            .position(|r| &r.head == head && r.production == production)
    }

    /// Returns the grammar extended with `S' -> S` as rule 0, where `S'`
    /// is the start name followed by as many `'` as needed to be fresh.
    pub fn augmented(&self) -> Grammar {
        let mut name: String = self.start.name().into();
        loop {
            name.push('\'');
            let candidate = GrammarToken::NonTerminal(name.clone());
            if !self.nonterminals.contains(&candidate) {
                break;
            }
        }
        let start = GrammarToken::NonTerminal(name);
        let mut rules = Vec::with_capacity(self.rules.len() + 1);
        rules.push(GrammarRule {
            head: start.clone(),
            production: vec![self.start.clone()],
        });
        rules.extend(self.rules.iter().cloned());
        let mut nonterminals = self.nonterminals.clone();
        nonterminals.insert(start.clone());
        Grammar {
            start,
            rules,
            terminals: self.terminals.clone(),
            nonterminals,
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}
