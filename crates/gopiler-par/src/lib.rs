//! gopiler-par — the recursive-descent parser (spec.md §4.3, component C4).
//!
//! Builds a concrete syntax tree (CST) over [`gopiler_lex::Token`] from the
//! grammar in spec.md §4.3. Every non-terminal in the grammar — including
//! the `<Expr>`/`<IntExpr>`/`<BooleanExpression>` wrapper productions that
//! `original_source/internal/parser.go` shows but spec.md's EBNF elides —
//! becomes one [`gopiler_util::tree::Node`]; terminal consumption emits a
//! `"Token"` leaf. Parsing halts at the first mismatch (no error recovery,
//! per spec.md §4.3) and the partial tree is discarded.

mod parser;

pub use gopiler_lex::Token;
pub use parser::{parse, ParseOutcome};
