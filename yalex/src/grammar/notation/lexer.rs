//! Lexer for grammar notation.
//!
//! Works one line at a time so that every token knows its line. Words
//! starting with an uppercase letter are nonterminals; other words and
//! punctuation are terminals. `->` separates head and body, `|` separates
//! alternatives, `ε` is an explicit empty alternative and `--` starts a
//! comment that runs to the end of the line.

use crate::error::GrammarError;
use logos::Logos;
use smartstring::alias::String;
use std::fmt;

/// Tokens of one notation line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    NonTerminal(String),
    Terminal(String),
    /// `->`
    Arrow,
    /// `|`
    Pipe,
    /// `ε`
    Epsilon,
    /// End of the line; every line ends with one.
    LineFeed,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::NonTerminal(s) | Token::Terminal(s) => write!(f, "`{}`", s),
            Token::Arrow => f.write_str("`->`"),
            Token::Pipe => f.write_str("`|`"),
            Token::Epsilon => f.write_str("`ε`"),
            Token::LineFeed => f.write_str("end of line"),
        }
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\f\r]+")]
enum LogosToken {
    #[regex(r"--[^\n]*")]
    Comment,

    #[token("->")]
    Arrow,

    #[token("|")]
    Pipe,

    #[token("ε")]
    Epsilon,

    #[regex(r"[A-Z][a-zA-Z0-9_]*'*")]
    Var,

    #[regex(r"[a-z_][a-zA-Z0-9_]*")]
    Atom,

    #[regex(r###"[-~`!@#$%^&*+=\\<>?/;\(\)\[\]{},\.'":]"###)]
    Sym,
}

/// Splits one line into tokens and appends [`Token::LineFeed`].
///
/// `line` is the 1-based line number used in errors.
pub fn tokenize_line(text: &str, line: usize) -> Result<Vec<Token>, GrammarError> {
    let mut lexer = LogosToken::lexer(text);
    let mut out = Vec::new();
    while let Some(kind) = lexer.next() {
        let slice = lexer.slice();
        let token = match kind {
            Ok(LogosToken::Comment) => continue,
            Ok(LogosToken::Arrow) => Token::Arrow,
            Ok(LogosToken::Pipe) => Token::Pipe,
            Ok(LogosToken::Epsilon) => Token::Epsilon,
            Ok(LogosToken::Var) => Token::NonTerminal(slice.into()),
            Ok(LogosToken::Atom) | Ok(LogosToken::Sym) => Token::Terminal(slice.into()),
            Err(()) => {
                return Err(GrammarError::Syntax {
                    line,
                    message: format!("unrecognized input `{}`", slice),
                });
            }
        };
        out.push(token);
    }
    out.push(Token::LineFeed);
    Ok(out)
}
