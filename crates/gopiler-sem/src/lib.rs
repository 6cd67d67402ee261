//! gopiler-sem — the semantic analyzer (spec.md §4.4/§4.5, component C5).
//!
//! Lowers a parser-built CST into the AST defined in [`ast`] (spec.md
//! §4.4), then walks that AST to build the scoped symbol-table tree
//! defined in [`scope`] while checking scope and type rules (spec.md
//! §4.5). Both sub-passes share one [`Diagnostics`]/[`Counters`] pair;
//! per spec.md §4.5's closing rule, any error found anywhere empties both
//! the AST and the symbol table before returning, so the code generator
//! never sees a program this pass rejected.

pub mod ast;
pub mod check;
pub mod lower;
pub mod scope;

use gopiler_lex::Token;
use gopiler_util::{Counters, Diagnostics, Tree};

pub use ast::{AstKind, AstNode, DataType};
pub use scope::{ScopeId, SymbolEntry, SymbolTableTree};

/// Result of semantically analyzing one program.
pub struct AnalysisOutcome {
    pub ast: Option<AstNode>,
    pub symbols: Option<SymbolTableTree>,
    pub counters: Counters,
}

/// Runs AST construction and scope/type checking over one program's CST.
///
/// `cst: None` (the lexer/parser already failed this program) short-
/// circuits with zero counters, matching the empty-source boundary case
/// spec.md §8 describes for the earlier passes.
pub fn analyze(cst: Option<&Tree<Token>>, diag: &Diagnostics, program_num: usize) -> AnalysisOutcome {
    let Some(cst) = cst else {
        return AnalysisOutcome {
            ast: None,
            symbols: None,
            counters: Counters::default(),
        };
    };

    diag.info(
        "GOPILER",
        &format!("Semantically analyzing program {program_num}"),
    );
    diag.debug("SEMANTIC ANALYZER", "Generating AST...");

    let ast = lower::lower_program(&cst.root);
    diag.info(
        "GOPILER",
        &format!(
            "Program {program_num} Abstract Syntax Tree (AST):\n{}\n{}",
            "-".repeat(75),
            ast.render()
        ),
    );

    let (symbols, counters) = check::check(&ast, diag);

    if counters.has_errors() {
        diag.fail(
            "SEMANTIC ANALYZER",
            &format!(
                "Semantic analysis failed for program {program_num} with {} error(s), {} warning(s).",
                counters.errors, counters.warnings
            ),
        );
        diag.info(
            "GOPILER",
            &format!("Compilation of program {program_num} aborted due to semantic error."),
        );
        AnalysisOutcome {
            ast: None,
            symbols: None,
            counters,
        }
    } else {
        diag.pass(
            "SEMANTIC ANALYZER",
            &format!(
                "Semantic analyzer successfully evaluated program {program_num} ({} warning(s)).",
                counters.warnings
            ),
        );
        diag.info(
            "GOPILER",
            &format!(
                "Program {program_num} Symbol Table:\n{}\n{}",
                "-".repeat(75),
                symbols.dump()
            ),
        );
        AnalysisOutcome {
            ast: Some(ast),
            symbols: Some(symbols),
            counters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gopiler_lex::lex;
    use gopiler_par::parse;

    fn analyze_src(src: &str) -> AnalysisOutcome {
        let diag = Diagnostics::terminal(false);
        let progs = lex(src, &diag);
        let outcome = parse(&progs[0].tokens, &diag, 1);
        analyze(outcome.cst.as_ref(), &diag, 1)
    }

    #[test]
    fn well_formed_program_yields_ast_and_symbols() {
        let out = analyze_src("{ int a a = 3 print(a) }$");
        assert!(out.ast.is_some());
        assert!(out.symbols.is_some());
        assert!(!out.counters.has_errors());
    }

    #[test]
    fn semantic_error_empties_artifacts() {
        let out = analyze_src("{ int a string a }$");
        assert!(out.ast.is_none());
        assert!(out.symbols.is_none());
        assert!(out.counters.has_errors());
    }

    #[test]
    fn missing_cst_short_circuits() {
        let diag = Diagnostics::terminal(false);
        let out = analyze(None, &diag, 1);
        assert!(out.ast.is_none());
        assert!(!out.counters.has_errors());
    }
}
