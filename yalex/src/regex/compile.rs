//! Regex pipeline facades.

use super::ast::{AstBuilder, annotate};
use super::dfa::{Dfa, DfaBuilder};
use super::shunting_yard::{infix_to_postfix, render};
use super::token::{Alphabet, Operator, RxToken, tokenize};
use anyhow::{Context, Result, bail};
use smartstring::alias::String;

/// One rule of a multi-rule lexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexRule {
    pub label: String,
    pub pattern: String,
    /// Lower values win when two rules match the same text.
    pub priority: usize,
}

impl LexRule {
    pub fn new(label: &str, pattern: &str, priority: usize) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
            priority,
        }
    }
}

fn postfix_of(pattern: &str, alphabet: &Alphabet) -> Result<Vec<RxToken>> {
    let tokens = tokenize(pattern)?;
    let postfix = infix_to_postfix(&tokens, alphabet)?;
    log::trace!("postfix of {:?}: {}", pattern, render(&postfix));
    Ok(postfix)
}

fn build(postfix: &[RxToken]) -> Result<Dfa> {
    let ast = AstBuilder::build(postfix)?;
    Ok(DfaBuilder::build(&annotate(&ast)))
}

/// Compiles a single pattern into a DFA.
pub fn compile(pattern: &str, alphabet: &Alphabet) -> Result<Dfa> {
    let postfix = postfix_of(pattern, alphabet)
        .with_context(|| format!("Failed to parse regex {:?}", pattern))?;
    build(&postfix).with_context(|| format!("Failed to build DFA for regex {:?}", pattern))
}

/// Compiles a rule set into one DFA whose accepting states carry the tag
/// of the winning rule.
///
/// Every rule becomes `pattern . {label:priority}` and the rules are joined
/// by alternation.
pub fn compile_rules(rules: &[LexRule], alphabet: &Alphabet) -> Result<Dfa> {
    if rules.is_empty() {
        bail!("No lexer rules to compile");
    }
    let mut postfix = Vec::new();
    for (i, rule) in rules.iter().enumerate() {
        let part = postfix_of(&rule.pattern, alphabet).with_context(|| {
            format!(
                "Failed to parse regex {:?} for rule {:?}",
                rule.pattern, rule.label
            )
        })?;
        postfix.extend(part);
        postfix.push(RxToken::action(&rule.label, rule.priority));
        postfix.push(Operator::And.into());
        if i > 0 {
            postfix.push(Operator::Or.into());
        }
    }
    let dfa = build(&postfix)
        .with_context(|| format!("Failed to build DFA for {} rules", rules.len()))?;
    log::debug!(
        "compiled {} rules into {} states ({} tagged)",
        rules.len(),
        dfa.state_count(),
        dfa.actions().len()
    );
    Ok(dfa)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::minimize;
    use proptest::prelude::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn malformed_pattern_has_context() {
        init_logger();
        let err = compile("(ab", &Alphabet::default()).unwrap_err();
        assert!(err.to_string().contains("\"(ab\""), "{err}");
        let cause = err.root_cause().to_string();
        assert!(cause.starts_with("malformed expression"));

        let rules = [LexRule::new("OK", "a", 0), LexRule::new("BAD", "a[", 1)];
        let err = compile_rules(&rules, &Alphabet::default()).unwrap_err();
        assert!(err.to_string().contains("\"BAD\""), "{err}");

        assert!(compile_rules(&[], &Alphabet::default()).is_err());
    }

    #[test]
    fn keyword_beats_identifier() {
        init_logger();
        let rules = [
            LexRule::new("ID", "[a-z][a-z0-9]*", 2),
            LexRule::new("IF", "if", 1),
            LexRule::new("NUM", "[0-9]+", 3),
            LexRule::new("WS", "[ \t]+", 4),
        ];
        let dfa = compile_rules(&rules, &Alphabet::default()).unwrap();

        let tag = |input: &str| {
            let (len, tag) = dfa.longest_match(input)?;
            Some((len, tag.map(|t| t.source.clone())))
        };
        assert_eq!(tag("if"), Some((2, Some("IF".into()))));
        assert_eq!(tag("iffy"), Some((4, Some("ID".into()))));
        assert_eq!(tag("i"), Some((1, Some("ID".into()))));
        assert_eq!(tag("42+"), Some((2, Some("NUM".into()))));
        assert_eq!(tag("  x"), Some((2, Some("WS".into()))));
        assert_eq!(tag("+"), None);

        // Every accepting state of a rule set is reached through a rule tag.
        assert_eq!(dfa.accepting().len(), dfa.actions().len());
    }

    #[test]
    fn equal_priority_prefers_smaller_label() {
        let rules = [LexRule::new("B", "x", 0), LexRule::new("A", "x", 0)];
        let dfa = compile_rules(&rules, &Alphabet::default()).unwrap();
        let (_, tag) = dfa.longest_match("x").unwrap();
        assert_eq!(tag.unwrap().source.as_str(), "A");
    }

    #[test]
    fn compilation_is_reproducible() {
        let a = compile("(x|y)*z[0-3]?", &Alphabet::default()).unwrap();
        let b = compile("(x|y)*z[0-3]?", &Alphabet::default()).unwrap();
        assert_eq!(a, b);
    }

    fn pattern() -> impl Strategy<Value = std::string::String> {
        let leaf = prop_oneof![
            Just("a".to_string()),
            Just("b".to_string()),
            Just("[ab]".to_string()),
            Just("[^a]".to_string()),
        ];
        leaf.prop_recursive(4, 24, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("{l}{r}")),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({l}|{r})")),
                inner.clone().prop_map(|e| format!("({e})*")),
                inner.clone().prop_map(|e| format!("({e})+")),
                inner.prop_map(|e| format!("({e})?")),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn agrees_with_regex_crate(
            pat in pattern(),
            inputs in prop::collection::vec("[abc]{0,8}", 16),
        ) {
            let alphabet = Alphabet::new(['a', 'b', 'c']);
            let dfa = compile(&pat, &alphabet).unwrap();
            let min = minimize(&dfa);
            let oracle = ::regex::Regex::new(&format!("^(?:{})$", pat)).unwrap();
            for input in &inputs {
                let expected = oracle.is_match(input);
                prop_assert_eq!(dfa.derive(input), expected, "{} on {:?}", pat, input);
                prop_assert_eq!(min.derive(input), expected, "minimized {} on {:?}", pat, input);
            }
        }

        #[test]
        fn rule_order_does_not_change_matches(
            inputs in prop::collection::vec("[a-z0-9 ]{0,6}", 16),
            rotate in 0usize..3,
        ) {
            let mut rules = vec![
                LexRule::new("KW", "do|while", 0),
                LexRule::new("ID", "[a-z]+", 1),
                LexRule::new("NUM", "[0-9]+", 2),
            ];
            let base = compile_rules(&rules, &Alphabet::default()).unwrap();
            rules.rotate_left(rotate);
            let rotated = compile_rules(&rules, &Alphabet::default()).unwrap();
            prop_assert_eq!(minimize(&base).state_count(), minimize(&rotated).state_count());
            for input in &inputs {
                prop_assert_eq!(base.longest_match(input), rotated.longest_match(input));
            }
        }
    }
}
