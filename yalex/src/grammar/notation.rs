//! Plain-text grammar notation.
//!
//! ```text
//! -- arithmetic
//! Expr -> Expr + Term | Term
//! Term -> id | ( Expr )
//! Opt  -> x |
//! ```
//!
//! One rule head per line, alternatives separated by `|`. Capitalised words
//! are nonterminals, anything else is a terminal. An empty alternative (or
//! an explicit `ε`) is an epsilon production. A head may appear on several
//! lines. The first head is the start symbol.

mod lexer;
mod parser;

pub use lexer::{Token, tokenize_line};
pub use parser::{RuleLine, parser};

use super::model::{Grammar, GrammarRule, GrammarToken};
use crate::error::GrammarError;
use chumsky::Parser as _;
use chumsky::error::Rich;

fn syntax_error(line: usize, errs: &[Rich<'_, Token>]) -> GrammarError {
    let message = match errs.first().and_then(|e| e.found()) {
        Some(found) => format!("unexpected {}", found),
        None => "unexpected end of line".to_string(),
    };
    GrammarError::Syntax { line, message }
}

/// Reads a grammar from notation text.
pub fn read_grammar(text: &str) -> Result<Grammar, GrammarError> {
    let mut start = None;
    let mut rules = Vec::new();
    let mut last_line = 0;
    for (i, source) in text.lines().enumerate() {
        let line = i + 1;
        last_line = line;
        let tokens = tokenize_line(source, line)?;
        let parsed = parser().parse(&tokens).into_result();
        let parsed = parsed.map_err(|errs| syntax_error(line, &errs))?;
        let Some(rule_line) = parsed else { continue };

        let head = GrammarToken::NonTerminal(rule_line.head);
        start.get_or_insert_with(|| head.clone());
        for alternative in rule_line.alternatives {
            let production = if alternative.is_empty() {
                vec![GrammarToken::epsilon()]
            } else {
                alternative
            };
            rules.push(GrammarRule::new(head.clone(), production)?);
        }
    }
    let Some(start) = start else {
        return Err(GrammarError::Syntax {
            line: last_line + 1,
            message: "no rules".to_string(),
        });
    };
    log::debug!("notation: {} rules, start {}", rules.len(), start);
    Grammar::new(start, rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rules_in_order() {
        let text = "-- list grammar\n\
                    List -> List , item\n\
                    \n\
                    List -> item | \n";
        let g = read_grammar(text).unwrap();
        assert_eq!(g.start(), &GrammarToken::nonterminal("List"));
        let rendered: Vec<std::string::String> = g.rules().iter().map(|r| r.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["List -> List , item", "List -> item", "List -> ε"]
        );
    }

    #[test]
    fn syntax_errors_carry_lines() {
        let err = read_grammar("S -> a\nS a\n").unwrap_err();
        assert_eq!(
            err,
            GrammarError::Syntax {
                line: 2,
                message: "unexpected `a`".into()
            }
        );
        assert!(matches!(
            read_grammar("-- nothing\n"),
            Err(GrammarError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            read_grammar("S -> a ε\n"),
            Err(GrammarError::InvalidRule { .. })
        ));
    }
}
