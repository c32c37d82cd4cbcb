//! Error types for regex compilation and grammar analysis.
//!
//! Both pipelines fail fast: a [`RegexError`] aborts regex compilation before
//! any DFA is returned, and a [`GrammarError`] aborts automaton or table
//! construction before any table is returned. Parsing-table conflicts are
//! *not* errors; they are recorded on the table (see
//! [`Conflict`](crate::grammar::Conflict)).

use thiserror::Error;

/// Failures of the regex pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexError {
    /// The token stream is not a well formed expression: unbalanced
    /// parentheses or brackets, negation outside the head of a bracket,
    /// nested brackets, or an operator without operands.
    ///
    /// `position` is the index of the offending token in the stream handed
    /// to the failing stage (pattern characters for
    /// [`tokenize`](crate::regex::tokenize), tokens for
    /// [`infix_to_postfix`](crate::regex::infix_to_postfix), postfix
    /// tokens for [`AstBuilder`](crate::regex::AstBuilder)).
    #[error("malformed expression at {position}: {reason}")]
    MalformedExpression {
        /// Index of the offending token.
        position: usize,
        /// Human-readable description.
        reason: String,
    },
}

impl RegexError {
    pub(crate) fn malformed(position: usize, reason: impl Into<String>) -> Self {
        RegexError::MalformedExpression {
            position,
            reason: reason.into(),
        }
    }
}

/// Failures of the grammar pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    /// A rule is structurally invalid (non-nonterminal head, empty
    /// production, misplaced epsilon or end marker).
    #[error("invalid rule {rule}: {reason}")]
    InvalidRule {
        /// The offending rule, rendered as text.
        rule: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The start symbol is not a nonterminal.
    #[error("start symbol {symbol} is not a nonterminal")]
    InvalidStart {
        /// The rejected start symbol.
        symbol: String,
    },

    /// Closure reached a nonterminal that heads no rule.
    #[error("undefined rule reference: no production for {symbol}")]
    UndefinedRuleReference {
        /// The nonterminal with no productions.
        symbol: String,
    },

    /// A completed item could not be matched to a rule of the original
    /// grammar.
    #[error("rule not found: {head} -> {production}")]
    RuleNotFound {
        /// Head of the completed item.
        head: String,
        /// Production of the completed item, space separated.
        production: String,
    },

    /// The initial state has no transition on the start symbol, so there is
    /// no state to install the accept action in.
    #[error("no accept state: initial state has no transition on {symbol}")]
    NoAcceptState {
        /// The grammar's start symbol.
        symbol: String,
    },

    /// Grammar notation could not be read.
    #[error("grammar syntax error at line {line}: {message}")]
    Syntax {
        /// 1-based line number.
        line: usize,
        /// Human-readable description.
        message: String,
    },
}
