//! Regex token model.
//!
//! A regex reaches the construction pipeline as a flat stream of
//! [`RxToken`]s: operators, literals (with epsilon as the literal that
//! carries no code point) and action tags that mark which lexer rule an
//! expression belongs to. [`tokenize`] turns pattern text into such a
//! stream; rule-file readers may also build streams directly.

use crate::error::RegexError;
use once_cell::sync::Lazy;
use smartstring::alias::String;
use std::collections::BTreeSet;
use std::fmt;

/// Regex operators, including grouping and class delimiters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    /// Alternation `|`.
    Or,
    /// Concatenation, implicit in pattern text.
    And,
    /// Zero or more `*`.
    Star,
    /// One or more `+`.
    Plus,
    /// Zero or one `?`.
    Optional,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `^` at the head of a bracket.
    Negate,
}

impl Operator {
    /// Returns the pattern spelling of this operator.
    ///
    /// Concatenation has no spelling in pattern text; it is shown as `.`,
    /// the usual postfix notation.
    pub fn to_str(self) -> &'static str {
        match self {
            Operator::Or => "|",
            Operator::And => ".",
            Operator::Star => "*",
            Operator::Plus => "+",
            Operator::Optional => "?",
            Operator::LParen => "(",
            Operator::RParen => ")",
            Operator::LBracket => "[",
            Operator::RBracket => "]",
            Operator::Negate => "^",
        }
    }

    /// Returns `true` for the postfix quantifiers `*`, `+` and `?`.
    pub fn is_quantifier(self) -> bool {
        matches!(self, Operator::Star | Operator::Plus | Operator::Optional)
    }
}

/// Identifies the lexer rule an accepting position belongs to.
///
/// Lower `priority` values win when one DFA state accepts for several
/// rules.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionTag {
    /// Rule label or action source text handed back to the emitter.
    pub source: String,
    /// Rule precedence; lower is stronger.
    pub priority: usize,
}

impl ActionTag {
    pub fn new(source: &str, priority: usize) -> Self {
        Self {
            source: source.into(),
            priority,
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}:{}}}", self.source, self.priority)
    }
}

/// A regex token.
///
/// Equality is structural: same variant, same payload.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RxToken {
    /// An operator or delimiter.
    Operator(Operator),
    /// A literal code point, or epsilon when `None`.
    Literal(Option<char>),
    /// A rule tag; behaves as an operand that consumes no input.
    Action(ActionTag),
}

impl RxToken {
    /// The empty-string literal.
    pub const EPSILON: RxToken = RxToken::Literal(None);

    pub fn literal(c: char) -> Self {
        RxToken::Literal(Some(c))
    }

    pub fn action(source: &str, priority: usize) -> Self {
        RxToken::Action(ActionTag::new(source, priority))
    }

    pub fn is_operator(&self, op: Operator) -> bool {
        matches!(self, RxToken::Operator(o) if *o == op)
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self, RxToken::Literal(None))
    }

    /// Returns `true` for tokens that stand for an operand on their own
    /// (literals, epsilon and action tags).
    pub fn is_operand(&self) -> bool {
        matches!(self, RxToken::Literal(_) | RxToken::Action(_))
    }
}

impl From<Operator> for RxToken {
    fn from(op: Operator) -> Self {
        RxToken::Operator(op)
    }
}

impl fmt::Display for RxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RxToken::Operator(op) => f.write_str(op.to_str()),
            RxToken::Literal(None) => f.write_str("ε"),
            RxToken::Literal(Some(c)) if is_special(*c) => write!(f, "\\{}", c),
            RxToken::Literal(Some(c)) => write!(f, "{}", c.escape_debug()),
            RxToken::Action(tag) => write!(f, "{}", tag),
        }
    }
}

/// Characters with operator meaning outside brackets.
fn is_special(c: char) -> bool {
    matches!(
        c,
        '|' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '\\' | '.'
    )
}

/// A finite set of code points, the universe that negated classes are
/// complemented against.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Alphabet(BTreeSet<char>);

static DEFAULT_ALPHABET: Lazy<Alphabet> =
    Lazy::new(|| Alphabet::new((' '..='~').chain(['\t', '\n', '\r'])));

impl Alphabet {
    pub fn new<I: IntoIterator<Item = char>>(chars: I) -> Self {
        Alphabet(chars.into_iter().collect())
    }

    pub fn contains(&self, c: char) -> bool {
        self.0.contains(&c)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the code points in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().copied()
    }

    /// Returns the code points of this alphabet that are not in `excluded`,
    /// in ascending order.
    pub fn complement(&self, excluded: &BTreeSet<char>) -> Vec<char> {
        self.0.difference(excluded).copied().collect()
    }
}

/// Printable ASCII plus tab, line feed and carriage return.
impl Default for Alphabet {
    fn default() -> Self {
        DEFAULT_ALPHABET.clone()
    }
}

impl FromIterator<char> for Alphabet {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Alphabet::new(iter)
    }
}

/// Splits pattern text into regex tokens.
///
/// Outside brackets `| * + ? ( ) [` are operators; inside brackets every
/// character except the closing `]` is a literal, and a `^` directly after
/// `[` is [`Operator::Negate`]. A backslash makes the next character a
/// literal; `\n`, `\t`, `\r` and `\0` name the usual control characters.
///
/// Bracket balance is left to [`infix_to_postfix`](super::infix_to_postfix);
/// the only error reported here is a trailing backslash.
pub fn tokenize(pattern: &str) -> Result<Vec<RxToken>, RegexError> {
    let mut tokens = Vec::new();
    let mut in_brackets = false;
    let mut chars = pattern.chars().enumerate().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            let Some((_, escaped)) = chars.next() else {
                return Err(RegexError::malformed(i, "trailing escape"));
            };
            tokens.push(RxToken::literal(unescape(escaped)));
            continue;
        }
        if in_brackets {
            if c == ']' {
                in_brackets = false;
                tokens.push(Operator::RBracket.into());
            } else {
                tokens.push(RxToken::literal(c));
            }
            continue;
        }
        let token = match c {
            '|' => Operator::Or.into(),
            '*' => Operator::Star.into(),
            '+' => Operator::Plus.into(),
            '?' => Operator::Optional.into(),
            '(' => Operator::LParen.into(),
            ')' => Operator::RParen.into(),
            ']' => Operator::RBracket.into(),
            '[' => {
                in_brackets = true;
                tokens.push(Operator::LBracket.into());
                if let Some((_, '^')) = chars.peek() {
                    chars.next();
                    tokens.push(Operator::Negate.into());
                }
                continue;
            }
            c => RxToken::literal(c),
        };
        tokens.push(token);
    }
    Ok(tokens)
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        c => c,
    }
}
