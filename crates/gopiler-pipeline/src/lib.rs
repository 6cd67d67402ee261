//! Runs the four pipeline passes over every program in one source file.
//!
//! This is the orchestration half of spec.md §2's data-flow table: `source
//! text → tokens → CST → AST + symbol tables → machine image + assembly`,
//! stopping early for whichever program a pass rejects (spec.md §2: "a
//! failure at pass N for program P records the failure kind, empties later
//! artifacts for P, and moves on to the next program"). Each pass already
//! performs its own empty-on-failure bookkeeping internally; this function
//! just threads `Option`s through.
//!
//! Both `gopiler-drv` (the CLI) and `gopiler-web` (the HTTP front end) call
//! into this crate rather than each re-implementing the same orchestration;
//! it holds no CLI- or HTTP-specific content, only the pass sequencing
//! every collaborator needs (spec.md §1 "every collaborator wraps the same
//! four passes").

use gopiler_gen::Image;
use gopiler_lex::Token;
use gopiler_sem::{AstNode, SymbolTableTree};
use gopiler_util::{Diagnostics, Tree};

/// Everything produced (or not) for one program in the source file.
pub struct ProgramResult {
    pub program_num: usize,
    pub cst: Option<Tree<Token>>,
    pub ast: Option<AstNode>,
    pub symbols: Option<SymbolTableTree>,
    pub image: Option<Image>,
    pub assembly: Option<String>,
}

impl ProgramResult {
    /// `true` once a full machine image and assembly listing exist for
    /// this program.
    pub fn succeeded(&self) -> bool {
        self.image.is_some()
    }
}

/// Lexes `source` into one token stream per program, then runs
/// parse/analyze/codegen over each program independently.
pub fn compile_source(source: &str, diag: &Diagnostics) -> Vec<ProgramResult> {
    let programs = gopiler_lex::lex(source, diag);

    programs
        .iter()
        .enumerate()
        .map(|(i, program_tokens)| {
            let program_num = i + 1;

            // spec.md §4.2's closing rule: "on failure [the lexer] reports
            // counts and skips downstream passes for this program." A
            // lexer error may still leave a well-formed (if incomplete)
            // token stream behind — e.g. an invalid character is simply
            // dropped rather than breaking tokenization — so this has to
            // be checked explicitly rather than relying on the parser to
            // notice anything is wrong.
            if program_tokens.counters.has_errors() {
                diag.info(
                    "GOPILER",
                    &format!("Compilation of program {program_num} aborted due to lexer error."),
                );
                return ProgramResult {
                    program_num,
                    cst: None,
                    ast: None,
                    symbols: None,
                    image: None,
                    assembly: None,
                };
            }

            let parsed = gopiler_par::parse_program_tokens(program_tokens, diag, program_num);
            let analyzed = gopiler_sem::analyze(parsed.cst.as_ref(), diag, program_num);
            let generated = gopiler_gen::generate(
                analyzed.ast.as_ref(),
                analyzed.symbols.as_ref(),
                diag,
                program_num,
            );

            ProgramResult {
                program_num,
                cst: parsed.cst,
                ast: analyzed.ast,
                symbols: analyzed.symbols,
                image: generated.image,
                assembly: generated.assembly,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_programs_split_on_eop_both_compile() {
        let diag = Diagnostics::terminal(false);
        let results = compile_source("{}$ {}$", &diag);
        assert_eq!(results.len(), 2);
        assert!(results[0].succeeded());
        assert!(results[1].succeeded());
    }

    #[test]
    fn lexer_failure_yields_no_downstream_artifacts() {
        let diag = Diagnostics::terminal(false);
        let results = compile_source("{ A }$", &diag);
        assert_eq!(results.len(), 1);
        assert!(results[0].cst.is_none());
        assert!(results[0].ast.is_none());
        assert!(!results[0].succeeded());
    }

    #[test]
    fn semantic_failure_still_keeps_cst() {
        let diag = Diagnostics::terminal(false);
        let results = compile_source("{ int a string a }$", &diag);
        assert_eq!(results.len(), 1);
        assert!(results[0].cst.is_some());
        assert!(results[0].ast.is_none());
        assert!(results[0].image.is_none());
    }

    #[test]
    fn full_program_produces_image_and_assembly() {
        let diag = Diagnostics::terminal(false);
        let results = compile_source("{ int a a = 3 print(a) }$", &diag);
        assert_eq!(results.len(), 1);
        assert!(results[0].succeeded());
        assert!(results[0].assembly.as_ref().unwrap().contains("SYS"));
    }

    #[test]
    fn empty_input_yields_one_tokenless_program() {
        let diag = Diagnostics::terminal(false);
        let results = compile_source("", &diag);
        assert_eq!(results.len(), 1);
        assert!(results[0].cst.is_none());
        assert!(!results[0].succeeded());
    }
}
