//! Scope entry and type checking over the AST (spec.md §4.5).
//!
//! Walks the AST top-down, pushing a fresh [`crate::scope::Scope`] for
//! every `Block` (the root `Block` reuses [`SymbolTableTree::root`]
//! directly, per spec.md §4.5's "the root `<Block>` gets scope `0`").
//! Errors and warnings are reported through the same [`Diagnostics`] sink
//! the lexer and parser use, and counted the same way so the driver can
//! decide pass/fail for this pass exactly as it does for the others.

use gopiler_util::{Counters, Diagnostics};

use crate::ast::{AstKind, AstNode, DataType};
use crate::scope::{ScopeId, SymbolEntry, SymbolTableTree};

/// Checks one program's AST, producing the symbol table tree it builds
/// along the way. Diagnostics and counters are reported as checking
/// proceeds; the caller decides pass/fail from the returned [`Counters`].
pub fn check(ast: &AstNode, diag: &Diagnostics) -> (SymbolTableTree, Counters) {
    let mut table = SymbolTableTree::new();
    let mut counters = Counters::default();
    let root = table.root();

    let AstKind::Block(stmts) = &ast.kind else {
        unreachable!("program AST root is always a Block");
    };
    for stmt in stmts {
        check_stmt(stmt, &mut table, root, diag, &mut counters);
    }

    for (scope, entry) in table.all_entries() {
        if !entry.initialized {
            diag.warn(
                "SEMANTIC ANALYZER",
                &format!(
                    "Warning at ({}). ID [ {} ] in scope [ {} ] is declared but never initialized.",
                    entry.loc,
                    entry.name,
                    table.id_string(scope)
                ),
            );
            counters.record_warning();
        } else if !entry.used {
            diag.warn(
                "SEMANTIC ANALYZER",
                &format!(
                    "Warning at ({}). ID [ {} ] in scope [ {} ] is initialized but never used.",
                    entry.loc,
                    entry.name,
                    table.id_string(scope)
                ),
            );
            counters.record_warning();
        }
    }

    (table, counters)
}

fn check_stmt(
    node: &AstNode,
    table: &mut SymbolTableTree,
    scope: ScopeId,
    diag: &Diagnostics,
    counters: &mut Counters,
) {
    match &node.kind {
        AstKind::Block(stmts) => {
            let child = table.new_child(scope);
            for stmt in stmts {
                check_stmt(stmt, table, child, diag, counters);
            }
        }
        AstKind::VarDecl { ty, name } => {
            let entry = SymbolEntry {
                name: *name,
                ty: *ty,
                loc: node.loc,
                initialized: false,
                used: false,
            };
            if table.declare(scope, entry).is_err() {
                diag.error(
                    "SEMANTIC ANALYZER",
                    &format!(
                        "Declaration Error at ({}). ID [ {} ] is already declared in scope [ {} ].",
                        node.loc,
                        name,
                        table.id_string(scope)
                    ),
                );
                counters.record_error();
            }
        }
        AstKind::Assign { name, expr } => {
            let expr_ty = check_expr(expr, table, scope, diag, counters);
            match table.lookup(scope, *name) {
                None => {
                    diag.error(
                        "SEMANTIC ANALYZER",
                        &format!(
                            "Undeclared Variable Error at ({}). ID [ {} ] used at scope [ {} ] has not been declared.",
                            node.loc,
                            name,
                            table.id_string(scope)
                        ),
                    );
                    counters.record_error();
                }
                Some((_, entry)) => {
                    let decl_ty = entry.ty;
                    if let Some(expr_ty) = expr_ty {
                        if expr_ty != decl_ty {
                            diag.error(
                                "SEMANTIC ANALYZER",
                                &format!(
                                    "Type Mismatch Error at ({}). Cannot assign type [ {} ] to ID [ {} ] of type [ {} ].",
                                    node.loc, expr_ty, name, decl_ty
                                ),
                            );
                            counters.record_error();
                        } else if let Some(e) = table.lookup_mut(scope, *name) {
                            e.initialized = true;
                        }
                    }
                }
            }
        }
        AstKind::Print(expr) => {
            check_expr(expr, table, scope, diag, counters);
        }
        AstKind::If { cond, block } | AstKind::While { cond, block } => {
            check_expr(cond, table, scope, diag, counters);
            check_stmt(block, table, scope, diag, counters);
        }
        other => unreachable!("not a statement: {other:?}"),
    }
}

/// Type-checks `node` as an expression, returning its type if it is
/// well-formed (`None` after an error has already been reported, so
/// callers don't cascade a second diagnostic from the same mistake).
fn check_expr(
    node: &AstNode,
    table: &mut SymbolTableTree,
    scope: ScopeId,
    diag: &Diagnostics,
    counters: &mut Counters,
) -> Option<DataType> {
    match &node.kind {
        AstKind::DigitLit(_) => Some(DataType::Int),
        AstKind::StringLit(_) => Some(DataType::String),
        AstKind::BoolLit(_) => Some(DataType::Boolean),
        AstKind::IdRef(name) => match table.lookup(scope, *name) {
            None => {
                diag.error(
                    "SEMANTIC ANALYZER",
                    &format!(
                        "Undeclared Variable Error at ({}). ID [ {} ] used at scope [ {} ] has not been declared.",
                        node.loc,
                        name,
                        table.id_string(scope)
                    ),
                );
                counters.record_error();
                None
            }
            Some((_, entry)) => {
                let ty = entry.ty;
                let was_initialized = entry.initialized;
                if !was_initialized {
                    diag.warn(
                        "SEMANTIC ANALYZER",
                        &format!(
                            "Warning at ({}). ID [ {} ] used before being initialized.",
                            node.loc, name
                        ),
                    );
                    counters.record_warning();
                }
                if let Some(e) = table.lookup_mut(scope, *name) {
                    e.used = true;
                }
                Some(ty)
            }
        },
        AstKind::Addition { rhs, .. } => match check_expr(rhs, table, scope, diag, counters) {
            Some(DataType::Int) => Some(DataType::Int),
            Some(other) => {
                diag.error(
                    "SEMANTIC ANALYZER",
                    &format!(
                        "Type Mismatch Error at ({}). Addition requires an int-typed right operand, found [ {} ].",
                        node.loc, other
                    ),
                );
                counters.record_error();
                None
            }
            None => None,
        },
        AstKind::Equality(l, r) | AstKind::Inequality(l, r) => {
            let lt = check_expr(l, table, scope, diag, counters);
            let rt = check_expr(r, table, scope, diag, counters);
            match (lt, rt) {
                (Some(a), Some(b)) if a == b => Some(DataType::Boolean),
                (Some(a), Some(b)) => {
                    diag.error(
                        "SEMANTIC ANALYZER",
                        &format!(
                            "Type Mismatch Error at ({}). Cannot compare [ {} ] with [ {} ].",
                            node.loc, a, b
                        ),
                    );
                    counters.record_error();
                    None
                }
                _ => None,
            }
        }
        other => unreachable!("not an expression: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::lower_program;
    use gopiler_lex::lex;
    use gopiler_par::parse;

    fn check_src(src: &str) -> (SymbolTableTree, Counters) {
        let diag = Diagnostics::terminal(false);
        let progs = lex(src, &diag);
        let outcome = parse(&progs[0].tokens, &diag, 1);
        let ast = lower_program(&outcome.cst.unwrap().root);
        check(&ast, &diag)
    }

    #[test]
    fn well_typed_program_has_no_errors() {
        let (table, counters) = check_src("{ int a a = 3 print(a) }$");
        assert!(!counters.has_errors());
        let entry = table.get(table.root(), 'a').unwrap();
        assert!(entry.initialized);
        assert!(entry.used);
    }

    #[test]
    fn redeclaration_in_same_scope_is_error() {
        let (_, counters) = check_src("{ int a string a }$");
        assert!(counters.has_errors());
    }

    #[test]
    fn shadowing_in_nested_block_is_allowed() {
        let (_, counters) = check_src("{ int a { string a } }$");
        assert!(!counters.has_errors());
    }

    #[test]
    fn undeclared_use_is_error() {
        let (_, counters) = check_src("{ print(a) }$");
        assert!(counters.has_errors());
    }

    #[test]
    fn assignment_type_mismatch_is_error() {
        let (_, counters) = check_src("{ int a a = \"hi\" }$");
        assert!(counters.has_errors());
    }

    #[test]
    fn declared_but_never_initialized_is_warning_only() {
        let (_, counters) = check_src("{ int a }$");
        assert!(!counters.has_errors());
        assert!(counters.warnings >= 1);
    }

    #[test]
    fn addition_with_string_rhs_is_type_error() {
        let (_, counters) = check_src("{ string s s = \"hi\" int a a = 1 + s }$");
        assert!(counters.has_errors());
    }

    #[test]
    fn equality_of_mismatched_types_is_error() {
        let (_, counters) = check_src("{ if (1 == true) { } }$");
        assert!(counters.has_errors());
    }
}
