//! Augmented syntax tree and position sets.
//!
//! [`AstBuilder::build`] turns a postfix stream into an arena tree whose
//! root concatenates the expression with a unique end-marker leaf `#`.
//! [`annotate`] then computes, per node, the `nullable`, `firstpos`,
//! `lastpos` and `followpos` sets that drive direct DFA construction.
//!
//! Nodes are addressed by their arena index ([`NodeId`]). Children are
//! always pushed before their parent, so ascending id order is a valid
//! post-order walk, the root is the last node and the `#` leaf is the
//! second to last.

use super::token::{ActionTag, Operator, RxToken};
use crate::error::RegexError;
use std::collections::BTreeSet;

/// Index of a node in the [`Ast`] arena.
pub type NodeId = usize;

/// Set of node ids.
pub type NodeSet = BTreeSet<NodeId>;

/// An arena node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AstNode {
    pub value: RxToken,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    /// Ordinal of this leaf among the non-epsilon leaves, counted from the
    /// left starting at 0. `None` for inner nodes and epsilon leaves.
    pub position: Option<usize>,
}

impl AstNode {
    fn leaf(value: RxToken, position: Option<usize>) -> Self {
        Self {
            value,
            parent: None,
            left: None,
            right: None,
            position,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// An augmented syntax tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ast {
    nodes: Vec<AstNode>,
    accept: NodeId,
}

impl Ast {
    pub fn nodes(&self) -> &[AstNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> NodeId {
        self.nodes.len() - 1
    }

    /// The end-marker leaf.
    pub fn accept(&self) -> NodeId {
        self.accept
    }

    /// Number of leaf positions, the end marker included.
    pub fn position_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.position.is_some()).count()
    }
}

/// Builds augmented syntax trees from postfix token streams.
pub struct AstBuilder;

impl AstBuilder {
    /// The end-marker literal appended to every expression.
    pub const END_MARKER: char = '#';

    /// Builds the tree for `postfix` followed by `# .`.
    ///
    /// The stream may only contain literals, action tags and the `|`, `.`
    /// and `*` operators, as produced by
    /// [`infix_to_postfix`](super::infix_to_postfix).
    pub fn build(postfix: &[RxToken]) -> Result<Ast, RegexError> {
        let augmented = [RxToken::literal(Self::END_MARKER), Operator::And.into()];
        let mut nodes: Vec<AstNode> = Vec::with_capacity(postfix.len() + 2);
        let mut stack: Vec<NodeId> = Vec::new();
        let mut positions = 0;

        for (i, token) in postfix.iter().chain(augmented.iter()).enumerate() {
            let id = nodes.len();
            match token {
                RxToken::Literal(None) => nodes.push(AstNode::leaf(token.clone(), None)),
                RxToken::Literal(Some(_)) | RxToken::Action(_) => {
                    nodes.push(AstNode::leaf(token.clone(), Some(positions)));
                    positions += 1;
                }
                RxToken::Operator(Operator::Star) => {
                    let child = pop(&mut stack, i)?;
                    nodes[child].parent = Some(id);
                    nodes.push(AstNode {
                        value: token.clone(),
                        parent: None,
                        left: Some(child),
                        right: None,
                        position: None,
                    });
                }
                RxToken::Operator(Operator::And | Operator::Or) => {
                    let right = pop(&mut stack, i)?;
                    let left = pop(&mut stack, i)?;
                    nodes[left].parent = Some(id);
                    nodes[right].parent = Some(id);
                    nodes.push(AstNode {
                        value: token.clone(),
                        parent: None,
                        left: Some(left),
                        right: Some(right),
                        position: None,
                    });
                }
                RxToken::Operator(op) => {
                    return Err(RegexError::malformed(
                        i,
                        format!("operator `{}` in postfix stream", op.to_str()),
                    ));
                }
            }
            stack.push(id);
        }

        if stack.len() != 1 {
            return Err(RegexError::malformed(
                postfix.len(),
                format!("{} operands left without operator", stack.len() - 1),
            ));
        }
        let accept = nodes.len() - 2;
        log::debug!("ast: {} nodes, {} positions", nodes.len(), positions);
        Ok(Ast { nodes, accept })
    }
}

fn pop(stack: &mut Vec<NodeId>, position: usize) -> Result<NodeId, RegexError> {
    stack
        .pop()
        .ok_or_else(|| RegexError::malformed(position, "operator without operand"))
}

/// Position data for one node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionRow {
    pub nullable: bool,
    pub firstpos: NodeSet,
    pub lastpos: NodeSet,
    /// Only meaningful for leaves.
    pub followpos: NodeSet,
    /// Input symbol of a literal leaf; `None` for epsilon, action and
    /// end-marker leaves and for inner nodes.
    pub symbol: Option<char>,
    /// `true` only for the end-marker leaf.
    pub is_accept: bool,
    /// Leaf ordinal, see [`AstNode::position`].
    pub position: Option<usize>,
    /// Rule tag of an action leaf.
    pub action: Option<ActionTag>,
}

/// Computes the position table of `ast`, one row per node, indexed by
/// node id.
pub fn annotate(ast: &Ast) -> Vec<PositionRow> {
    let mut rows: Vec<PositionRow> = Vec::with_capacity(ast.len());

    // Pass 1: children precede parents in the arena.
    for (id, node) in ast.nodes().iter().enumerate() {
        let row = match (&node.value, node.left, node.right) {
            (RxToken::Literal(None), _, _) => PositionRow {
                nullable: true,
                ..PositionRow::default()
            },
            (RxToken::Literal(Some(c)), _, _) => PositionRow {
                firstpos: NodeSet::from([id]),
                lastpos: NodeSet::from([id]),
                symbol: (id != ast.accept()).then_some(*c),
                is_accept: id == ast.accept(),
                position: node.position,
                ..PositionRow::default()
            },
            (RxToken::Action(tag), _, _) => PositionRow {
                firstpos: NodeSet::from([id]),
                lastpos: NodeSet::from([id]),
                position: node.position,
                action: Some(tag.clone()),
                ..PositionRow::default()
            },
            (RxToken::Operator(Operator::Or), Some(l), Some(r)) => PositionRow {
                nullable: rows[l].nullable || rows[r].nullable,
                firstpos: &rows[l].firstpos | &rows[r].firstpos,
                lastpos: &rows[l].lastpos | &rows[r].lastpos,
                ..PositionRow::default()
            },
            (RxToken::Operator(Operator::And), Some(l), Some(r)) => {
                let mut firstpos = rows[l].firstpos.clone();
                if rows[l].nullable {
                    firstpos.extend(&rows[r].firstpos);
                }
                let mut lastpos = rows[r].lastpos.clone();
                if rows[r].nullable {
                    lastpos.extend(&rows[l].lastpos);
                }
                PositionRow {
                    nullable: rows[l].nullable && rows[r].nullable,
                    firstpos,
                    lastpos,
                    ..PositionRow::default()
                }
            }
            (RxToken::Operator(Operator::Star), Some(c), None) => PositionRow {
                nullable: true,
                firstpos: rows[c].firstpos.clone(),
                lastpos: rows[c].lastpos.clone(),
                ..PositionRow::default()
            },
            (value, _, _) => unreachable!("AstBuilder never produces {:?} with this shape", value),
        };
        rows.push(row);
    }

    // Pass 2: followpos.
    for node in ast.nodes() {
        match (&node.value, node.left, node.right) {
            (RxToken::Operator(Operator::And), Some(l), Some(r)) => {
                let targets = rows[r].firstpos.clone();
                for leaf in rows[l].lastpos.clone() {
                    rows[leaf].followpos.extend(&targets);
                }
            }
            (RxToken::Operator(Operator::Star), Some(c), None) => {
                let targets = rows[c].firstpos.clone();
                for leaf in rows[c].lastpos.clone() {
                    rows[leaf].followpos.extend(&targets);
                }
            }
            _ => {}
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::{Alphabet, infix_to_postfix, tokenize};

    fn tree(pattern: &str) -> Ast {
        let tokens = tokenize(pattern).unwrap();
        let postfix = infix_to_postfix(&tokens, &Alphabet::default()).unwrap();
        AstBuilder::build(&postfix).unwrap()
    }

    fn position_of(err: RegexError) -> usize {
        let RegexError::MalformedExpression { position, .. } = err;
        position
    }

    /// Maps a node set to leaf positions.
    fn positions(ast: &Ast, set: &NodeSet) -> Vec<usize> {
        set.iter().filter_map(|&id| ast.node(id).position).collect()
    }

    #[test]
    fn arena_links() {
        let ast = tree("ab");
        // a b . # .
        assert_eq!(ast.len(), 5);
        assert_eq!(ast.root(), 4);
        assert_eq!(ast.accept(), 3);
        assert_eq!(ast.node(2).left, Some(0));
        assert_eq!(ast.node(2).right, Some(1));
        assert_eq!(ast.node(0).parent, Some(2));
        assert_eq!(ast.node(2).parent, Some(4));
        assert!(ast.node(3).is_leaf());
        assert!(!ast.node(4).is_leaf());
        assert_eq!(ast.position_count(), 3);
    }

    #[test]
    fn textbook_position_table() {
        // (a|b)*abb#, positions 0..=5
        let ast = tree("(a|b)*abb");
        let rows = annotate(&ast);
        assert_eq!(ast.len(), 12);
        assert_eq!(ast.position_count(), 6);

        let root = &rows[ast.root()];
        assert!(!root.nullable);
        assert_eq!(positions(&ast, &root.firstpos), vec![0, 1, 2]);
        assert_eq!(positions(&ast, &root.lastpos), vec![5]);

        let star = &rows[3];
        assert!(star.nullable);
        assert_eq!(positions(&ast, &star.firstpos), vec![0, 1]);
        assert_eq!(positions(&ast, &star.lastpos), vec![0, 1]);

        let follow: Vec<Vec<usize>> = ast
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.position.is_some())
            .map(|(id, _)| positions(&ast, &rows[id].followpos))
            .collect();
        assert_eq!(
            follow,
            vec![
                vec![0, 1, 2],
                vec![0, 1, 2],
                vec![3],
                vec![4],
                vec![5],
                vec![],
            ]
        );

        let symbols: Vec<Option<char>> = rows
            .iter()
            .filter(|r| r.position.is_some())
            .map(|r| r.symbol)
            .collect();
        assert_eq!(
            symbols,
            vec![Some('a'), Some('b'), Some('a'), Some('b'), Some('b'), None]
        );
        assert!(rows[ast.accept()].is_accept);
        assert_eq!(rows.iter().filter(|r| r.is_accept).count(), 1);
    }

    #[test]
    fn epsilon_alone() {
        let ast = tree("");
        let rows = annotate(&ast);
        let eps = &rows[0];
        assert!(eps.nullable);
        assert!(eps.firstpos.is_empty());
        assert!(eps.lastpos.is_empty());
        assert_eq!(positions(&ast, &rows[ast.root()].firstpos), vec![0]);
    }

    #[test]
    fn optional_is_nullable() {
        let ast = tree("a?");
        let rows = annotate(&ast);
        // a ε | # .
        assert!(rows[2].nullable);
        assert_eq!(rows[2].firstpos, NodeSet::from([0]));
    }

    #[test]
    fn action_leaves_are_positions() {
        let postfix = vec![
            RxToken::literal('x'),
            RxToken::action("X", 3),
            Operator::And.into(),
        ];
        let ast = AstBuilder::build(&postfix).unwrap();
        let rows = annotate(&ast);
        assert_eq!(rows[1].action, Some(ActionTag::new("X", 3)));
        assert_eq!(rows[1].symbol, None);
        assert_eq!(rows[0].followpos, NodeSet::from([1]));
        assert_eq!(rows[1].followpos, NodeSet::from([3]));
    }

    #[test]
    fn malformed_postfix() {
        let err = AstBuilder::build(&[Operator::Or.into()]).unwrap_err();
        assert_eq!(position_of(err), 0);

        let err = AstBuilder::build(&[RxToken::literal('a'), RxToken::literal('b')]).unwrap_err();
        assert_eq!(position_of(err), 2);

        let err = AstBuilder::build(&[RxToken::literal('a'), Operator::Plus.into()]).unwrap_err();
        assert_eq!(position_of(err), 1);
    }
}
