//! Regular expressions to deterministic automata.
//!
//! The pipeline runs pattern text through [`tokenize`], converts the
//! infix token stream to postfix with [`infix_to_postfix`], builds the
//! augmented syntax tree with [`AstBuilder`], annotates it with position
//! sets ([`annotate`]) and finally builds a total [`Dfa`] directly from
//! the followpos relation with [`DfaBuilder`]. No NFA is ever built.
//!
//! [`compile`] and [`compile_rules`] run the whole pipeline;
//! [`mark_distinguishable`] and [`minimize`] work on the result.

mod ast;
mod compile;
mod dfa;
mod minimize;
mod shunting_yard;
mod token;

pub use ast::{Ast, AstBuilder, AstNode, NodeId, NodeSet, PositionRow, annotate};
pub use compile::{LexRule, compile, compile_rules};
pub use dfa::{Dfa, DfaBuilder, StateId};
pub use minimize::{Distinguish, PairTable, mark_distinguishable, minimize};
pub use shunting_yard::{ShuntingYard, infix_to_postfix, render};
pub use token::{ActionTag, Alphabet, Operator, RxToken, tokenize};
