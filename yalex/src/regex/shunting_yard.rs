//! Infix to postfix conversion for regex token streams.
//!
//! A shunting-yard pass with an operator stack, extended with a small mode
//! register for parenthesised groups and character classes. Character
//! classes are expanded here into explicit alternations, negated classes
//! are complemented against an [`Alphabet`], and the `+` and `?`
//! quantifiers are desugared, so the postfix stream only contains
//! literals, action tags and the `|`, `.` and `*` operators.

use super::token::{Alphabet, Operator, RxToken};
use crate::error::RegexError;
use std::collections::BTreeSet;

/// Converts an infix token stream into postfix.
///
/// An empty stream yields a single epsilon literal.
pub fn infix_to_postfix(
    tokens: &[RxToken],
    alphabet: &Alphabet,
) -> Result<Vec<RxToken>, RegexError> {
    ShuntingYard::new(alphabet).run(tokens)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Normal,
    InParens,
    InBrackets,
    InNegatedBrackets,
}

#[derive(Clone, Copy, Debug)]
enum StackEntry {
    Op(Operator),
    /// An open parenthesis; `start` is the output length when it opened.
    Open { start: usize, position: usize },
}

/// Converter state for one token stream.
pub struct ShuntingYard<'a> {
    alphabet: &'a Alphabet,
    mode: Mode,
    depth: usize,
    output: Vec<RxToken>,
    stack: Vec<StackEntry>,
    /// Whether the next operand must be concatenated to what precedes it.
    can_and: bool,
    /// Output index where the most recent complete operand starts.
    last_operand: Option<usize>,
    /// Raw class members collected since the last `[`.
    class: Vec<char>,
    class_start: usize,
    class_position: usize,
}

impl<'a> ShuntingYard<'a> {
    const PRECEDENCE_OR: u8 = 1;
    const PRECEDENCE_AND: u8 = 2;
    const PRECEDENCE_STAR: u8 = 3;

    pub fn new(alphabet: &'a Alphabet) -> Self {
        Self {
            alphabet,
            mode: Mode::Normal,
            depth: 0,
            output: Vec::new(),
            stack: Vec::new(),
            can_and: false,
            last_operand: None,
            class: Vec::new(),
            class_start: 0,
            class_position: 0,
        }
    }

    fn precedence(op: Operator) -> u8 {
        match op {
            Operator::Or => Self::PRECEDENCE_OR,
            Operator::And => Self::PRECEDENCE_AND,
            Operator::Star | Operator::Plus | Operator::Optional => Self::PRECEDENCE_STAR,
            _ => 0,
        }
    }

    /// Consumes the converter and converts `tokens`.
    pub fn run(mut self, tokens: &[RxToken]) -> Result<Vec<RxToken>, RegexError> {
        for (position, token) in tokens.iter().enumerate() {
            match self.mode {
                Mode::InBrackets | Mode::InNegatedBrackets => self.bracket_token(position, token)?,
                Mode::Normal | Mode::InParens => self.token(position, token)?,
            }
            log::trace!(
                "{:>3} {:<4} out: {}",
                position,
                token.to_string(),
                render(&self.output)
            );
        }
        self.finish(tokens.len())
    }

    fn token(&mut self, position: usize, token: &RxToken) -> Result<(), RegexError> {
        match token {
            RxToken::Literal(_) | RxToken::Action(_) => {
                let start = self.begin_operand();
                self.output.push(token.clone());
                self.end_operand(start);
            }
            RxToken::Operator(Operator::Or) => {
                if !self.can_and {
                    return Err(RegexError::malformed(position, "missing operand before `|`"));
                }
                self.push_operator(Operator::Or);
                self.can_and = false;
                self.last_operand = None;
            }
            RxToken::Operator(Operator::And) => {
                if !self.can_and {
                    return Err(RegexError::malformed(
                        position,
                        "missing operand before concatenation",
                    ));
                }
                self.push_operator(Operator::And);
                self.can_and = false;
                self.last_operand = None;
            }
            RxToken::Operator(op) if op.is_quantifier() => self.quantifier(position, *op)?,
            RxToken::Operator(Operator::LParen) => {
                let start = self.begin_operand();
                self.stack.push(StackEntry::Open { start, position });
                self.depth += 1;
                self.mode = Mode::InParens;
                self.can_and = false;
                self.last_operand = None;
            }
            RxToken::Operator(Operator::RParen) => self.close_paren(position)?,
            RxToken::Operator(Operator::LBracket) => {
                self.class_start = self.begin_operand();
                self.class_position = position;
                self.class.clear();
                self.mode = Mode::InBrackets;
            }
            RxToken::Operator(Operator::RBracket) => {
                return Err(RegexError::malformed(position, "unbalanced `]`"));
            }
            RxToken::Operator(Operator::Negate) => {
                return Err(RegexError::malformed(position, "negation outside a bracket head"));
            }
            RxToken::Operator(_) => unreachable!("quantifiers handled above"),
        }
        Ok(())
    }

    fn bracket_token(&mut self, position: usize, token: &RxToken) -> Result<(), RegexError> {
        match token {
            RxToken::Literal(Some(c)) => self.class.push(*c),
            RxToken::Operator(Operator::Negate)
                if self.mode == Mode::InBrackets && position == self.class_position + 1 =>
            {
                self.mode = Mode::InNegatedBrackets;
            }
            RxToken::Operator(Operator::Negate) => {
                return Err(RegexError::malformed(position, "negation inside a character class"));
            }
            RxToken::Operator(Operator::LBracket) => {
                return Err(RegexError::malformed(position, "nested character class"));
            }
            RxToken::Operator(Operator::RBracket) => self.close_bracket(position)?,
            RxToken::Literal(None) => {
                return Err(RegexError::malformed(position, "epsilon inside a character class"));
            }
            RxToken::Action(_) => {
                return Err(RegexError::malformed(position, "action inside a character class"));
            }
            RxToken::Operator(op) => {
                return Err(RegexError::malformed(
                    position,
                    format!("operator `{}` inside a character class", op.to_str()),
                ));
            }
        }
        Ok(())
    }

    /// Inserts an implicit concatenation if needed and returns the output
    /// index where the new operand starts.
    fn begin_operand(&mut self) -> usize {
        if self.can_and {
            self.push_operator(Operator::And);
        }
        self.output.len()
    }

    fn end_operand(&mut self, start: usize) {
        self.can_and = true;
        self.last_operand = Some(start);
    }

    /// Pops operators of higher or equal precedence, then pushes `op`.
    fn push_operator(&mut self, op: Operator) {
        while let Some(StackEntry::Op(top)) = self.stack.last().copied() {
            if Self::precedence(top) < Self::precedence(op) {
                break;
            }
            self.stack.pop();
            self.output.push(top.into());
        }
        self.stack.push(StackEntry::Op(op));
    }

    /// Emits a postfix quantifier for the operand at the tail of the output.
    fn quantifier(&mut self, position: usize, op: Operator) -> Result<(), RegexError> {
        let Some(start) = self.last_operand.filter(|_| self.can_and) else {
            return Err(RegexError::malformed(
                position,
                format!("quantifier `{}` without operand", op.to_str()),
            ));
        };
        match op {
            Operator::Star => self.output.push(Operator::Star.into()),
            Operator::Optional => {
                self.output.push(RxToken::EPSILON);
                self.output.push(Operator::Or.into());
            }
            Operator::Plus => {
                let replay = self.output[start..].to_vec();
                self.output.extend(replay);
                self.output.push(Operator::Star.into());
                self.output.push(Operator::And.into());
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    fn close_paren(&mut self, position: usize) -> Result<(), RegexError> {
        if !self.can_and {
            return Err(RegexError::malformed(position, "missing operand before `)`"));
        }
        loop {
            match self.stack.pop() {
                Some(StackEntry::Op(op)) => self.output.push(op.into()),
                Some(StackEntry::Open { start, .. }) => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        self.mode = Mode::Normal;
                    }
                    self.end_operand(start);
                    return Ok(());
                }
                None => return Err(RegexError::malformed(position, "unbalanced `)`")),
            }
        }
    }

    fn close_bracket(&mut self, position: usize) -> Result<(), RegexError> {
        let negated = self.mode == Mode::InNegatedBrackets;
        let members = self.expand_class()?;
        let members = if negated {
            let excluded: BTreeSet<char> = members.into_iter().collect();
            self.alphabet.complement(&excluded)
        } else {
            members
        };
        if members.is_empty() {
            return Err(RegexError::malformed(position, "empty character class"));
        }
        for (i, c) in members.into_iter().enumerate() {
            self.output.push(RxToken::literal(c));
            if i > 0 {
                self.output.push(Operator::Or.into());
            }
        }
        self.mode = if self.depth > 0 {
            Mode::InParens
        } else {
            Mode::Normal
        };
        self.end_operand(self.class_start);
        Ok(())
    }

    /// Expands `x-y` ranges and removes duplicates, keeping first
    /// occurrences in order.
    fn expand_class(&self) -> Result<Vec<char>, RegexError> {
        let raw = &self.class;
        let mut seen = BTreeSet::new();
        let mut members = Vec::new();
        let mut i = 0;
        while i < raw.len() {
            if i + 2 < raw.len() && raw[i + 1] == '-' && same_range_kind(raw[i], raw[i + 2]) {
                let (lo, hi) = (raw[i], raw[i + 2]);
                if lo > hi {
                    return Err(RegexError::malformed(
                        self.class_position + 1 + i,
                        format!("reversed range `{}-{}`", lo, hi),
                    ));
                }
                for c in lo..=hi {
                    if seen.insert(c) {
                        members.push(c);
                    }
                }
                i += 3;
            } else {
                if seen.insert(raw[i]) {
                    members.push(raw[i]);
                }
                i += 1;
            }
        }
        Ok(members)
    }

    fn finish(mut self, end: usize) -> Result<Vec<RxToken>, RegexError> {
        if matches!(self.mode, Mode::InBrackets | Mode::InNegatedBrackets) {
            return Err(RegexError::malformed(self.class_position, "unbalanced `[`"));
        }
        if self.output.is_empty() && self.stack.is_empty() {
            return Ok(vec![RxToken::EPSILON]);
        }
        if !self.can_and {
            return Err(RegexError::malformed(end, "missing operand at end of expression"));
        }
        while let Some(entry) = self.stack.pop() {
            match entry {
                StackEntry::Op(op) => self.output.push(op.into()),
                StackEntry::Open { position, .. } => {
                    return Err(RegexError::malformed(position, "unbalanced `(`"));
                }
            }
        }
        Ok(self.output)
    }
}

/// Both digits, both lowercase or both uppercase ASCII letters.
fn same_range_kind(a: char, b: char) -> bool {
    (a.is_ascii_digit() && b.is_ascii_digit())
        || (a.is_ascii_lowercase() && b.is_ascii_lowercase())
        || (a.is_ascii_uppercase() && b.is_ascii_uppercase())
}

/// Renders a token stream separated by spaces.
pub fn render(tokens: &[RxToken]) -> std::string::String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::tokenize;

    fn postfix(pattern: &str) -> std::string::String {
        let tokens = tokenize(pattern).unwrap();
        render(&infix_to_postfix(&tokens, &Alphabet::default()).unwrap())
    }

    fn error(pattern: &str) -> RegexError {
        let tokens = tokenize(pattern).unwrap();
        infix_to_postfix(&tokens, &Alphabet::default()).unwrap_err()
    }

    fn position_of(err: RegexError) -> usize {
        let RegexError::MalformedExpression { position, .. } = err;
        position
    }

    #[test]
    fn precedence_and_implicit_concatenation() {
        assert_eq!(postfix("ab"), "a b .");
        assert_eq!(postfix("a|bc"), "a b c . |");
        assert_eq!(postfix("ab*"), "a b * .");
        assert_eq!(postfix("a(b|c)*"), "a b c | * .");
        assert_eq!(postfix("(a|b)*abb"), "a b | * a . b . b .");
        assert_eq!(postfix("a|b|c"), "a b | c |");
    }

    #[test]
    fn quantifiers_desugar() {
        assert_eq!(postfix("a?"), "a ε |");
        assert_eq!(postfix("ab+"), "a b b * . .");
        assert_eq!(postfix("(ab)+"), "a b . a b . * .");
        assert_eq!(postfix("a**"), "a * *");
    }

    #[test]
    fn character_classes() {
        assert_eq!(postfix("[abc]"), "a b | c |");
        assert_eq!(postfix("x[0-2]"), "x 0 1 | 2 | .");
        assert_eq!(postfix("[a-c-]"), "a b | c | - |");
        // mixed range kinds keep the dash as a literal
        assert_eq!(postfix("[a-Z]"), "a - | Z |");
        assert_eq!(postfix("[aa]"), "a");
    }

    #[test]
    fn negated_class_uses_alphabet() {
        let alphabet = Alphabet::new(['a', 'b', 'c', 'd']);
        let tokens = tokenize("[^bd]").unwrap();
        let out = infix_to_postfix(&tokens, &alphabet).unwrap();
        assert_eq!(render(&out), "a c |");
        let tokens = vec![
            Operator::LBracket.into(),
            Operator::Negate.into(),
            Operator::RBracket.into(),
        ];
        let out = infix_to_postfix(&tokens, &alphabet).unwrap();
        assert_eq!(render(&out), "a b | c | d |");
    }

    #[test]
    fn negated_class_inside_parentheses() {
        let alphabet = Alphabet::new(['a', 'b', 'c']);
        let tokens = tokenize("(a|[^b])").unwrap();
        let out = infix_to_postfix(&tokens, &alphabet).unwrap();
        assert_eq!(render(&out), "a a c | |");
        let tokens = tokenize("([^a])x").unwrap();
        let out = infix_to_postfix(&tokens, &alphabet).unwrap();
        assert_eq!(render(&out), "b c | x .");
    }

    #[test]
    fn empty_input_is_epsilon() {
        assert_eq!(postfix(""), "ε");
    }

    #[test]
    fn actions_are_operands() {
        let tokens = vec![RxToken::literal('a'), RxToken::action("A", 0)];
        let out = infix_to_postfix(&tokens, &Alphabet::default()).unwrap();
        assert_eq!(
            out,
            vec![
                RxToken::literal('a'),
                RxToken::action("A", 0),
                Operator::And.into()
            ]
        );
    }

    #[test]
    fn malformed_expressions() {
        assert_eq!(error("(ab"), RegexError::malformed(0, "unbalanced `(`"));
        assert_eq!(error("ab)"), RegexError::malformed(2, "unbalanced `)`"));
        assert_eq!(position_of(error("a)")), 1);
        assert_eq!(position_of(error("[ab")), 0);
        assert_eq!(position_of(error("a]")), 1);
        assert_eq!(position_of(error("*a")), 0);
        assert_eq!(position_of(error("a|")), 2);
        assert_eq!(position_of(error("|a")), 0);
        assert_eq!(position_of(error("()")), 1);
        assert_eq!(position_of(error("[z-a]")), 1);
    }

    #[test]
    fn illegal_negation_and_nesting() {
        let nested = vec![
            Operator::LBracket.into(),
            RxToken::literal('a'),
            Operator::LBracket.into(),
            RxToken::literal('b'),
            Operator::RBracket.into(),
            Operator::RBracket.into(),
        ];
        let err = infix_to_postfix(&nested, &Alphabet::default()).unwrap_err();
        assert_eq!(position_of(err), 2);

        let late_negate = vec![
            Operator::LBracket.into(),
            RxToken::literal('a'),
            Operator::Negate.into(),
            Operator::RBracket.into(),
        ];
        let err = infix_to_postfix(&late_negate, &Alphabet::default()).unwrap_err();
        assert_eq!(position_of(err), 2);

        let bare_negate = vec![Operator::Negate.into(), RxToken::literal('a')];
        let err = infix_to_postfix(&bare_negate, &Alphabet::default()).unwrap_err();
        assert_eq!(position_of(err), 0);
    }
}
