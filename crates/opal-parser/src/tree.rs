//! On-demand rowan materialization of the event log.
//!
//! The flat event vector is the primary artifact; this module builds a
//! conventional syntax tree view from it when callers want one, plus a
//! debug renderer used heavily by tests. Node kinds map straight into
//! rowan's raw kind space; token kinds are offset so the two ranges
//! never collide, and steps get a reserved kind of their own.

use opal_common::TokenKind;
use rowan::{GreenNodeBuilder, Language};

use crate::event::{EventKind, NodeKind};
use crate::ParseTree;

/// Raw kind reserved for StepEnter/StepExit groups.
pub const STEP_RAW: u16 = 98;
/// Token kinds live at `TOKEN_BASE + TokenKind as u16`.
pub const TOKEN_BASE: u16 = 100;

/// Unified raw kind for nodes, steps, and tokens in the rowan tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpalKind(pub u16);

impl OpalKind {
    pub fn node_kind(self) -> Option<NodeKind> {
        NodeKind::from_u32(self.0 as u32)
    }

    pub fn is_step(self) -> bool {
        self.0 == STEP_RAW
    }
}

/// Marker type connecting [`OpalKind`] to rowan's tree infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpalLanguage {}

impl Language for OpalLanguage {
    type Kind = OpalKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        OpalKind(raw.0)
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        rowan::SyntaxKind(kind.0)
    }
}

/// A tree node (interior node with children).
pub type SyntaxNode = rowan::SyntaxNode<OpalLanguage>;
/// A tree token (leaf with text).
pub type SyntaxToken = rowan::SyntaxToken<OpalLanguage>;
/// Either a node or a token.
pub type SyntaxElement = rowan::SyntaxElement<OpalLanguage>;

fn token_raw(kind: TokenKind) -> rowan::SyntaxKind {
    rowan::SyntaxKind(TOKEN_BASE + kind as u16)
}

/// Build the rowan view of a parse tree's events.
pub fn syntax_tree(tree: &ParseTree) -> SyntaxNode {
    let mut builder = GreenNodeBuilder::new();
    for event in &tree.events {
        match event.kind {
            EventKind::Open => {
                builder.start_node(rowan::SyntaxKind(event.data as u16));
            }
            EventKind::Close => builder.finish_node(),
            EventKind::Token => {
                let token = &tree.tokens[event.data as usize];
                builder.token(token_raw(token.kind), token.text(&tree.source));
            }
            EventKind::StepEnter => builder.start_node(rowan::SyntaxKind(STEP_RAW)),
            EventKind::StepExit => builder.finish_node(),
        }
    }
    SyntaxNode::new_root(builder.finish())
}

/// Render a tree as an indented listing: node names, then quoted token
/// text. Deterministic; used by snapshot tests.
pub fn debug_tree(node: &SyntaxNode) -> String {
    let mut out = String::new();
    render(node, 0, &mut out);
    // Trim the single trailing newline for snapshot friendliness.
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

fn render(node: &SyntaxNode, depth: usize, out: &mut String) {
    let kind = node.kind();
    let name = if kind.is_step() {
        "Step".to_string()
    } else {
        match kind.node_kind() {
            Some(k) => k.name().to_string(),
            None => format!("Unknown({})", kind.0),
        }
    };
    out.push_str(&"  ".repeat(depth));
    out.push_str(&name);
    out.push('\n');
    for child in node.children_with_tokens() {
        match child {
            SyntaxElement::Node(n) => render(&n, depth + 1, out),
            SyntaxElement::Token(t) => {
                out.push_str(&"  ".repeat(depth + 1));
                out.push('\'');
                out.push_str(t.text());
                out.push('\'');
                out.push('\n');
            }
        }
    }
}
