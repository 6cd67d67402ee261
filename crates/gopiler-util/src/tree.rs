//! The generic tree primitive shared by the CST and AST (spec.md §3,
//! component C2).
//!
//! Grounded on `original_source/internal/tree.go`'s `Node`/`TokenTree`:
//! a node is either a terminal (`kind == "Token"`, payload present) or a
//! non-terminal (a static grammar label, no payload, zero or more
//! children). Ownership flows strictly parent-to-child — there is no
//! parent pointer on the node itself; construction uses an explicit
//! parent-handle stack instead (see `gopiler-par::Parser` and
//! `gopiler-sem::lower`), per DESIGN NOTES §9.

use std::fmt::Write as _;

/// One node of a CST or AST.
///
/// `kind` is `"Token"` for a terminal leaf (in which case `payload` is
/// `Some`), or a non-terminal label such as `"<Block>"` otherwise.
#[derive(Debug, Clone)]
pub struct Node<T> {
    pub kind: &'static str,
    pub payload: Option<T>,
    pub children: Vec<Node<T>>,
}

impl<T> Node<T> {
    pub fn new(kind: &'static str, payload: Option<T>) -> Self {
        Self {
            kind,
            payload,
            children: Vec::new(),
        }
    }

    /// A terminal leaf node wrapping a token payload.
    pub fn leaf(payload: T) -> Self {
        Self::new("Token", Some(payload))
    }

    /// A non-terminal node with no payload.
    pub fn branch(kind: &'static str) -> Self {
        Self::new(kind, None)
    }

    pub fn add_child(&mut self, child: Node<T>) {
        self.children.push(child);
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == "Token"
    }
}

/// A node payload that knows how to render itself for the `{FORMAL_NAME
/// [ trueContent ]}` leaf format used by `getCST`/`getAST` (spec.md §6).
pub trait Labeled {
    fn label(&self) -> String;
}

/// One tree per program, owning its root node.
#[derive(Debug, Clone)]
pub struct Tree<T> {
    pub root: Node<T>,
}

impl<T: Labeled> Tree<T> {
    pub fn new(root: Node<T>) -> Self {
        Self { root }
    }

    /// Renders the tree the way `tree.go`'s `PrintNode` does: terminals as
    /// `{FORMAL_NAME [ trueContent ]}`, non-terminals as the bare type
    /// string, one `-` of indentation per depth level.
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_node(&self.root, 0, &mut out);
        out
    }
}

fn render_node<T: Labeled>(node: &Node<T>, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push('-');
    }
    match &node.payload {
        Some(payload) => {
            let _ = writeln!(out, "{}", payload.label());
        }
        None => {
            let _ = writeln!(out, "{}", node.kind);
        }
    }
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tok(&'static str, &'static str);

    impl Labeled for Tok {
        fn label(&self) -> String {
            format!("{{{} [ {} ]}}", self.0, self.1)
        }
    }

    #[test]
    fn renders_nested_tree() {
        let mut block = Node::branch("<Block>");
        block.add_child(Node::leaf(Tok("OPEN_BRACE", "{")));
        block.add_child(Node::leaf(Tok("CLOSE_BRACE", "}")));
        let tree = Tree::new(block);

        let rendered = tree.render();
        assert_eq!(
            rendered,
            "<Block>\n-{OPEN_BRACE [ { ]}\n-{CLOSE_BRACE [ } ]}\n"
        );
    }

    #[test]
    fn leaf_and_branch_kind() {
        let leaf: Node<Tok> = Node::leaf(Tok("ID", "a"));
        assert!(leaf.is_leaf());
        let branch: Node<Tok> = Node::branch("<VarDecl>");
        assert!(!branch.is_leaf());
    }
}
