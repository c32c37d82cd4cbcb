use super::lexer::Token;
use crate::grammar::GrammarToken;
use chumsky::prelude::*;
use smartstring::alias::String;

/// One notation line `Head -> alt | alt ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleLine {
    pub head: String,
    /// Each alternative's symbols; an empty alternative is empty here.
    pub alternatives: Vec<Vec<GrammarToken>>,
}

type ParserError<'a> = extra::Err<Rich<'a, Token>>;

pub fn parser<'a>() -> impl Parser<'a, &'a [Token], Option<RuleLine>, ParserError<'a>> {
    let symbol = select! {
        Token::Terminal(t) => GrammarToken::Terminal(Some(t)),
        Token::NonTerminal(n) => GrammarToken::NonTerminal(n),
        Token::Epsilon => GrammarToken::epsilon(),
    }
    .labelled("symbol");

    let alternative = symbol.repeated().collect::<Vec<_>>();

    let head = select! {
        Token::NonTerminal(n) => n,
    }
    .labelled("head");

    let arrow = select! { Token::Arrow => () }.labelled("->");
    let pipe = select! { Token::Pipe => () }.labelled("|");
    let lf = select! { Token::LineFeed => () }.labelled("end of line");

    let alternatives = alternative
        .separated_by(pipe)
        .at_least(1)
        .collect::<Vec<_>>();

    let rule = head
        .then_ignore(arrow)
        .then(alternatives)
        .then_ignore(lf.clone())
        .map(|(head, alternatives)| RuleLine { head, alternatives })
        .map(Some);

    let empty_line = lf.map(|_| None::<RuleLine>);

    rule.or(empty_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(tokens: &[Token]) -> Option<RuleLine> {
        parser().parse(tokens).into_result().unwrap()
    }

    #[test]
    fn single_alternative() {
        let tokens = vec![
            Token::NonTerminal("S".into()),
            Token::Arrow,
            Token::Terminal("a".into()),
            Token::NonTerminal("S".into()),
            Token::LineFeed,
        ];
        let rule = line(&tokens).unwrap();
        assert_eq!(rule.head.as_str(), "S");
        let expected = vec![GrammarToken::terminal("a"), GrammarToken::nonterminal("S")];
        assert_eq!(rule.alternatives, vec![expected]);
    }

    #[test]
    fn empty_alternatives() {
        let tokens = vec![
            Token::NonTerminal("A".into()),
            Token::Arrow,
            Token::Pipe,
            Token::Terminal("b".into()),
            Token::Pipe,
            Token::Epsilon,
            Token::LineFeed,
        ];
        let rule = line(&tokens).unwrap();
        assert_eq!(
            rule.alternatives,
            vec![
                vec![],
                vec![GrammarToken::terminal("b")],
                vec![GrammarToken::epsilon()],
            ]
        );

        let tokens = vec![
            Token::NonTerminal("A".into()),
            Token::Arrow,
            Token::LineFeed,
        ];
        let rule = line(&tokens).unwrap();
        assert_eq!(rule.alternatives, vec![Vec::<GrammarToken>::new()]);
    }

    #[test]
    fn empty_line_skipped() {
        assert_eq!(line(&[Token::LineFeed]), None);
    }

    #[test]
    fn missing_arrow() {
        let tokens = vec![
            Token::NonTerminal("A".into()),
            Token::Terminal("a".into()),
            Token::LineFeed,
        ];
        let errs = parser().parse(&tokens).into_result().unwrap_err();
        assert_eq!(errs[0].found(), Some(&Token::Terminal("a".into())));
    }
}
