//! The abstract syntax tree (spec.md §4.4, DESIGN NOTES §9).
//!
//! Replaces the stringly-typed `kind` dispatch the teacher's CST shares
//! with a tagged variant per DESIGN NOTES §9: `Block { .. }`, `VarDecl
//! { .. }`, `Assign { .. }`, `Print { .. }`, `If { .. }`, `While { .. }`,
//! `Addition { .. }`, `Equality`/`Inequality`, `DigitLit`/`StringLit`/
//! `BoolLit`/`IdRef`. Every node still carries the [`Location`] of its
//! first token so later passes can report diagnostics.

use gopiler_util::Location;
use std::fmt::Write as _;

/// The three declarable data types (spec.md §3 "Symbol entry").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    String,
    Boolean,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataType::Int => "int",
            DataType::String => "string",
            DataType::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// One AST node, tagged by [`AstKind`] and anchored at its first token's
/// source [`Location`].
#[derive(Debug, Clone)]
pub struct AstNode {
    pub loc: Location,
    pub kind: AstKind,
}

impl AstNode {
    pub fn new(loc: Location, kind: AstKind) -> Self {
        Self { loc, kind }
    }

    /// Renders the AST the way `tree.go`'s `PrintNode` renders the CST:
    /// one `-` of indentation per depth, composites as a bare `<Label>`,
    /// leaves as `{LABEL [ content ]}` (reused by `getAST`, spec.md §6).
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_node(self, 0, &mut out);
        out
    }
}

fn render_node(node: &AstNode, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push('-');
    }
    match &node.kind {
        AstKind::Block(children) => {
            let _ = writeln!(out, "<Block>");
            for c in children {
                render_node(c, depth + 1, out);
            }
        }
        AstKind::VarDecl { ty, name } => {
            let _ = writeln!(out, "<VarDecl>");
            for _ in 0..(depth + 1) {
                out.push('-');
            }
            let _ = writeln!(out, "{{{ty} [ {name} ]}}");
        }
        AstKind::Assign { name, expr } => {
            let _ = writeln!(out, "<AssignmentStatement>");
            for _ in 0..(depth + 1) {
                out.push('-');
            }
            let _ = writeln!(out, "{{ID [ {name} ]}}");
            render_node(expr, depth + 1, out);
        }
        AstKind::Print(expr) => {
            let _ = writeln!(out, "<PrintStatement>");
            render_node(expr, depth + 1, out);
        }
        AstKind::If { cond, block } => {
            let _ = writeln!(out, "<IfStatement>");
            render_node(cond, depth + 1, out);
            render_node(block, depth + 1, out);
        }
        AstKind::While { cond, block } => {
            let _ = writeln!(out, "<WhileStatement>");
            render_node(cond, depth + 1, out);
            render_node(block, depth + 1, out);
        }
        AstKind::Addition { digit, rhs } => {
            let _ = writeln!(out, "<Addition>");
            for _ in 0..(depth + 1) {
                out.push('-');
            }
            let _ = writeln!(out, "{{DIGIT [ {digit} ]}}");
            render_node(rhs, depth + 1, out);
        }
        AstKind::Equality(l, r) => {
            let _ = writeln!(out, "<Equality>");
            render_node(l, depth + 1, out);
            render_node(r, depth + 1, out);
        }
        AstKind::Inequality(l, r) => {
            let _ = writeln!(out, "<Inequality>");
            render_node(l, depth + 1, out);
            render_node(r, depth + 1, out);
        }
        AstKind::DigitLit(d) => {
            let _ = writeln!(out, "{{DIGIT [ {d} ]}}");
        }
        AstKind::StringLit(s) => {
            let _ = writeln!(out, "{{STRING [ {s} ]}}");
        }
        AstKind::BoolLit(b) => {
            let _ = writeln!(out, "{{BOOLVAL [ {b} ]}}");
        }
        AstKind::IdRef(name) => {
            let _ = writeln!(out, "{{ID [ {name} ]}}");
        }
    }
}

#[derive(Debug, Clone)]
pub enum AstKind {
    Block(Vec<AstNode>),
    VarDecl { ty: DataType, name: char },
    Assign { name: char, expr: Box<AstNode> },
    Print(Box<AstNode>),
    If { cond: Box<AstNode>, block: Box<AstNode> },
    While { cond: Box<AstNode>, block: Box<AstNode> },
    /// A right-skewed addition chain: `digit + rhs`, where `rhs` may
    /// itself be an `Addition`, a `DigitLit`, or an int-typed `IdRef`.
    Addition { digit: u8, rhs: Box<AstNode> },
    Equality(Box<AstNode>, Box<AstNode>),
    Inequality(Box<AstNode>, Box<AstNode>),
    DigitLit(u8),
    StringLit(String),
    BoolLit(bool),
    IdRef(char),
}
