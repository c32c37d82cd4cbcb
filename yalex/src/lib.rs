//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Automaton construction for lexer and parser generators.
//!
//! `yalex` provides the two construction engines a generator toolchain sits on:
//!  * [`regex`]: extended regular expressions to a total DFA, built directly
//!    from the followpos relation of the augmented syntax tree, with
//!    optional state minimization and multi-rule lexers whose accepting
//!    states carry the winning rule
//!  * [`grammar`]: context-free grammars to LALR(1) ACTION/GOTO tables via
//!    canonical LR(1) item sets and core-based state merging
//!
//! Rule-file parsing, source emission and visualisation are left to the
//! generators built on top of this crate.
//!
//! # Example
//!
//! ```rust
//! use yalex::grammar::{self, ConflictPolicy, GrammarToken};
//! use yalex::regex::{self, Alphabet};
//!
//! let dfa = regex::compile("a(b|c)*", &Alphabet::default()).unwrap();
//! assert!(dfa.derive("abcb"));
//!
//! let table = grammar::compile("S -> ( S ) S |\n", ConflictPolicy::default()).unwrap();
//! let words = ["(", "(", ")", ")"];
//! let input: Vec<GrammarToken> = words.into_iter().map(GrammarToken::terminal).collect();
//! assert!(table.recognize(&input).is_ok());
//! ```

pub mod error;
pub mod grammar;
pub mod regex;

pub use error::{GrammarError, RegexError};
