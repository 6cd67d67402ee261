//! CST→AST lowering (spec.md §4.4).
//!
//! The CST's shape is fully determined by the grammar in spec.md §4.3, so
//! lowering is direct structural recursion over each production's known
//! children rather than generic dispatch on `kind` strings — the
//! production functions in `gopiler_par::parser` and the ones here mirror
//! each other one-to-one. Wrapper productions that exist only to hold a
//! single terminal (`<Digit>`, `<ID>`, `<Type>`, `<BoolVal>`, `<Char>`)
//! are unwrapped here rather than carried into the AST.

use gopiler_lex::Token;
use gopiler_util::{Location, Node};

use crate::ast::{AstKind, AstNode, DataType};

/// Lowers a whole `<Program>` CST (its `Block EOP` shape) to the AST's
/// root `Block`.
pub fn lower_program(cst_root: &Node<Token>) -> AstNode {
    debug_assert_eq!(cst_root.kind, "<Program>");
    lower_block(&cst_root.children[0])
}

fn token_of<'a>(wrapper: &'a Node<Token>) -> &'a Token {
    wrapper.children[0]
        .payload
        .as_ref()
        .expect("wrapper production must hold exactly one terminal")
}

fn lower_block(node: &Node<Token>) -> AstNode {
    debug_assert_eq!(node.kind, "<Block>");
    // children: OPEN_BRACE leaf, <StatementList>, CLOSE_BRACE leaf
    let open_brace = node.children[0]
        .payload
        .as_ref()
        .expect("<Block>'s first child is the '{' terminal");
    let stmts = lower_statement_list(&node.children[1]);
    AstNode::new(open_brace.location, AstKind::Block(stmts))
}

fn lower_statement_list(node: &Node<Token>) -> Vec<AstNode> {
    debug_assert_eq!(node.kind, "<StatementList>");
    // ε production: single EPS leaf child.
    if node.children[0].kind == "Token" && node.children[0].payload.as_ref().unwrap().formal_name == "EPS" {
        return Vec::new();
    }
    // Statement → StatementList
    let mut out = vec![lower_statement(&node.children[0])];
    out.extend(lower_statement_list(&node.children[1]));
    out
}

fn lower_statement(node: &Node<Token>) -> AstNode {
    debug_assert_eq!(node.kind, "<Statement>");
    let child = &node.children[0];
    match child.kind {
        "<PrintStatement>" => lower_print_statement(child),
        "<AssignmentStatement>" => lower_assignment(child),
        "<VarDecl>" => lower_var_decl(child),
        "<WhileStatement>" => lower_while(child),
        "<IfStatement>" => lower_if(child),
        "<Block>" => lower_block(child),
        other => unreachable!("<Statement> cannot wrap {other}"),
    }
}

fn lower_print_statement(node: &Node<Token>) -> AstNode {
    // children: KEYW_PRINT, OPEN_PAREN, <Expr>, CLOSE_PAREN
    let keyw = node.children[0].payload.as_ref().unwrap();
    let expr = lower_expr(&node.children[2]);
    AstNode::new(keyw.location, AstKind::Print(Box::new(expr)))
}

fn lower_var_decl(node: &Node<Token>) -> AstNode {
    // children: <Type>, <ID>
    let type_tok = token_of(&node.children[0]);
    let ty = match type_tok.formal_name {
        "I_TYPE" => DataType::Int,
        "S_TYPE" => DataType::String,
        "B_TYPE" => DataType::Boolean,
        other => unreachable!("not a type keyword: {other}"),
    };
    let id_tok = token_of(&node.children[1]);
    let name = id_char(id_tok);
    AstNode::new(type_tok.location, AstKind::VarDecl { ty, name })
}

fn lower_assignment(node: &Node<Token>) -> AstNode {
    // children: <ID>, ASSIGN_OP, <Expr>
    let id_tok = token_of(&node.children[0]);
    let name = id_char(id_tok);
    let expr = lower_expr(&node.children[2]);
    AstNode::new(
        id_tok.location,
        AstKind::Assign {
            name,
            expr: Box::new(expr),
        },
    )
}

fn lower_while(node: &Node<Token>) -> AstNode {
    // children: KEYW_WHILE, <BooleanExpression>, <Block>
    let keyw = node.children[0].payload.as_ref().unwrap();
    let cond = lower_boolean_expr(&node.children[1]);
    let block = lower_block(&node.children[2]);
    AstNode::new(
        keyw.location,
        AstKind::While {
            cond: Box::new(cond),
            block: Box::new(block),
        },
    )
}

fn lower_if(node: &Node<Token>) -> AstNode {
    // children: KEYW_IF, <BooleanExpression>, <Block>
    let keyw = node.children[0].payload.as_ref().unwrap();
    let cond = lower_boolean_expr(&node.children[1]);
    let block = lower_block(&node.children[2]);
    AstNode::new(
        keyw.location,
        AstKind::If {
            cond: Box::new(cond),
            block: Box::new(block),
        },
    )
}

fn lower_expr(node: &Node<Token>) -> AstNode {
    debug_assert_eq!(node.kind, "<Expr>");
    let child = &node.children[0];
    match child.kind {
        "<IntExpr>" => lower_int_expr(child),
        "<StringExpr>" => lower_string_expr(child),
        "<BooleanExpression>" => lower_boolean_expr(child),
        "<ID>" => {
            let tok = token_of(child);
            AstNode::new(tok.location, AstKind::IdRef(id_char(tok)))
        }
        other => unreachable!("<Expr> cannot wrap {other}"),
    }
}

fn lower_int_expr(node: &Node<Token>) -> AstNode {
    // children: <Digit> [, <IntOp>, <Expr>]
    let digit_tok = token_of(&node.children[0]);
    let digit = digit_tok
        .true_content
        .parse::<u8>()
        .expect("DIGIT token content must be a single ASCII digit");
    if node.children.len() == 1 {
        return AstNode::new(digit_tok.location, AstKind::DigitLit(digit));
    }
    let rhs = lower_expr(&node.children[2]);
    AstNode::new(
        digit_tok.location,
        AstKind::Addition {
            digit,
            rhs: Box::new(rhs),
        },
    )
}

fn lower_string_expr(node: &Node<Token>) -> AstNode {
    // children: QUOTE, <CharList>, QUOTE
    let open_quote = node.children[0].payload.as_ref().unwrap();
    let mut text = String::new();
    let mut first_char_loc: Option<Location> = None;
    collect_char_list(&node.children[1], &mut text, &mut first_char_loc);
    let loc = first_char_loc.unwrap_or(open_quote.location);
    AstNode::new(loc, AstKind::StringLit(text))
}

fn collect_char_list(node: &Node<Token>, out: &mut String, first_loc: &mut Option<Location>) {
    debug_assert_eq!(node.kind, "<CharList>");
    if node.children[0].kind == "Token" && node.children[0].payload.as_ref().unwrap().formal_name == "EPS" {
        return;
    }
    // children: <Char>, <CharList>
    let char_tok = token_of(&node.children[0]);
    if first_loc.is_none() {
        *first_loc = Some(char_tok.location);
    }
    out.push_str(&char_tok.true_content);
    collect_char_list(&node.children[1], out, first_loc);
}

fn lower_boolean_expr(node: &Node<Token>) -> AstNode {
    debug_assert_eq!(node.kind, "<BooleanExpression>");
    if node.children.len() == 1 {
        // <BoolVal>
        let tok = token_of(&node.children[0]);
        let val = tok.formal_name == "KEYW_TRUE";
        return AstNode::new(tok.location, AstKind::BoolLit(val));
    }
    // children: OPEN_PAREN, <Expr>, <BoolOp>, <Expr>, CLOSE_PAREN
    let open_paren = node.children[0].payload.as_ref().unwrap();
    let l = lower_expr(&node.children[1]);
    let op_tok = token_of(&node.children[2]);
    let r = lower_expr(&node.children[3]);
    let kind = if op_tok.formal_name == "EQUAL_OP" {
        AstKind::Equality(Box::new(l), Box::new(r))
    } else {
        AstKind::Inequality(Box::new(l), Box::new(r))
    };
    AstNode::new(open_paren.location, kind)
}

fn id_char(tok: &Token) -> char {
    tok.true_content
        .chars()
        .next()
        .expect("ID token content must be a single lowercase letter")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gopiler_lex::lex;
    use gopiler_par::parse;
    use gopiler_util::Diagnostics;

    fn lower_src(src: &str) -> AstNode {
        let diag = Diagnostics::terminal(false);
        let progs = lex(src, &diag);
        let outcome = parse(&progs[0].tokens, &diag, 1);
        lower_program(&outcome.cst.unwrap().root)
    }

    #[test]
    fn empty_block_lowers_to_empty_block() {
        let ast = lower_src("{}$");
        assert!(matches!(ast.kind, AstKind::Block(ref v) if v.is_empty()));
    }

    #[test]
    fn var_decl_assign_print_lowers() {
        let ast = lower_src("{ int a a = 3 print(a) }$");
        let AstKind::Block(stmts) = &ast.kind else { panic!() };
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[0].kind, AstKind::VarDecl { name: 'a', ty: DataType::Int }));
        assert!(matches!(&stmts[1].kind, AstKind::Assign { name: 'a', .. }));
        assert!(matches!(&stmts[2].kind, AstKind::Print(_)));
    }

    #[test]
    fn nested_addition_stays_right_skewed() {
        let ast = lower_src("{ int a a = 1 + 2 + a }$");
        let AstKind::Block(stmts) = &ast.kind else { panic!() };
        let AstKind::Assign { expr, .. } = &stmts[1].kind else { panic!() };
        let AstKind::Addition { digit: 1, rhs } = &expr.kind else { panic!() };
        let AstKind::Addition { digit: 2, rhs: inner } = &rhs.kind else { panic!() };
        assert!(matches!(inner.kind, AstKind::IdRef('a')));
    }

    #[test]
    fn string_expr_collapses_char_list() {
        let ast = lower_src("{ string s s = \"hi there\" }$");
        let AstKind::Block(stmts) = &ast.kind else { panic!() };
        let AstKind::Assign { expr, .. } = &stmts[1].kind else { panic!() };
        assert!(matches!(&expr.kind, AstKind::StringLit(s) if s == "hi there"));
    }

    #[test]
    fn equality_boolean_expr_lowers() {
        let ast = lower_src("{ if (1 == 1) { print(\"ok\") } }$");
        let AstKind::Block(stmts) = &ast.kind else { panic!() };
        assert!(matches!(&stmts[0].kind, AstKind::If { cond, .. } if matches!(cond.kind, AstKind::Equality(..))));
    }

    #[test]
    fn bare_boolval_condition_lowers() {
        let ast = lower_src("{ while (false) { } }$");
        let AstKind::Block(stmts) = &ast.kind else { panic!() };
        assert!(matches!(&stmts[0].kind, AstKind::While { cond, .. } if matches!(cond.kind, AstKind::BoolLit(false))));
    }
}
