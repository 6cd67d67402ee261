//! Recursive-descent implementation of spec.md §4.3's grammar.
//!
//! Each `parse_*` method corresponds to one EBNF production: it builds the
//! node for that production, appends the children its alternative
//! requires, and returns the node to its caller — which appends it as a
//! child of its own node. This return-composition plays the role of
//! `original_source/internal/parser.go`'s explicit `currentParent`
//! pointer-stack (DESIGN NOTES §9: avoid parent pointers living inside the
//! tree itself; thread construction state through the recursion instead).

use gopiler_lex::{ProgramTokens, Token, TokenKind};
use gopiler_util::{Counters, Diagnostics, Node, Tree};

/// The parser's own internal control-flow signal: `Err(())` means a
/// mismatch was already reported to [`Diagnostics`] and counted, and the
/// caller should unwind without recovery (spec.md §4.3).
type PResult<T> = Result<T, ()>;

/// Result of parsing one program's token stream.
pub struct ParseOutcome {
    pub cst: Option<Tree<Token>>,
    pub counters: Counters,
}

/// Parses one program's tokens into a CST.
///
/// Returns `cst: None` with zero counters if `tokens` is empty (the lexer
/// already reported this program as producing no tokens; there is nothing
/// to parse, per spec.md §8's "empty source file" boundary case).
pub fn parse(tokens: &[Token], diag: &Diagnostics, program_num: usize) -> ParseOutcome {
    if tokens.is_empty() {
        return ParseOutcome {
            cst: None,
            counters: Counters::default(),
        };
    }

    diag.info("GOPILER", &format!("Parsing program {program_num}"));
    let mut parser = Parser {
        tokens,
        pos: 0,
        diag,
        counters: Counters::default(),
        alt_warning: None,
    };

    match parser.parse_program() {
        Ok(root) => {
            diag.pass(
                "PARSER",
                &format!("Parser successfully evaluated program {program_num} with no errors."),
            );
            let tree = Tree::new(root);
            diag.info(
                "GOPILER",
                &format!(
                    "Program {program_num} Concrete Syntax Tree (CST):\n{}\n{}",
                    "-".repeat(75),
                    tree.render()
                ),
            );
            ParseOutcome {
                cst: Some(tree),
                counters: parser.counters,
            }
        }
        Err(()) => {
            diag.fail("PARSER", "Parsing aborted due to an error.");
            diag.info(
                "GOPILER",
                &format!("Compilation of program {program_num} aborted due to parser error."),
            );
            ParseOutcome {
                cst: None,
                counters: parser.counters,
            }
        }
    }
}

/// Parses a whole program, reusing the lexer's own per-program counters as
/// the starting point (so a lexer warning on this program is preserved
/// even when the parser itself finds nothing wrong).
pub fn parse_program_tokens(pt: &ProgramTokens, diag: &Diagnostics, program_num: usize) -> ParseOutcome {
    let mut outcome = parse(&pt.tokens, diag, program_num);
    outcome.counters.errors += pt.counters.errors;
    outcome.counters.warnings += pt.counters.warnings;
    outcome
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    diag: &'a Diagnostics,
    counters: Counters,
    alt_warning: Option<String>,
}

impl<'a> Parser<'a> {
    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Consumes the current token into a `"Token"` leaf, advancing unless
    /// already at the last token in the stream (mirrors
    /// `consumeCurrentToken`'s `lastToken` guard).
    fn leaf(&mut self) -> Node<Token> {
        self.diag.debug(
            "PARSER",
            &format!(
                "\tFound terminal {} [ {} ] in token stream",
                self.cur().formal_name,
                self.cur().true_content
            ),
        );
        let tok = self.cur().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        Node::leaf(tok)
    }

    fn eps_node(&mut self) -> Node<Token> {
        self.diag
            .debug("PARSER", "\tEpsilon [ \u{03B5} ] production");
        Node::leaf(Token::new(
            TokenKind::Symbol,
            "EPS",
            self.cur().location,
            "\u{03B5}",
        ))
    }

    fn wrong_token(&mut self, expected: &str) {
        let hint = self.alt_warning.take().unwrap_or_default();
        self.diag.error(
            "PARSER",
            &format!(
                "Error at ({}). Expected {}. Found {} [ {} ]. {}",
                self.cur().location,
                expected,
                self.cur().formal_name,
                self.cur().true_content,
                hint
            ),
        );
        self.counters.record_error();
    }

    fn is_statement_start(&self) -> bool {
        matches!(
            self.cur().formal_name,
            "KEYW_PRINT" | "ID" | "KEYW_WHILE" | "KEYW_IF" | "OPEN_BRACE"
        ) || self.cur().is_type_keyword()
    }

    fn parse_program(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<Program>");
        node.add_child(self.parse_block()?);
        if self.cur().formal_name == "EOP" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("EOP [ $ ]");
            return Err(());
        }
        Ok(node)
    }

    fn parse_block(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<Block>");
        if self.cur().formal_name == "OPEN_BRACE" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("OPEN_BRACE [ { ]");
            return Err(());
        }
        node.add_child(self.parse_statement_list()?);
        if self.cur().formal_name == "CLOSE_BRACE" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("CLOSE_BRACE [ } ]");
            return Err(());
        }
        Ok(node)
    }

    fn parse_statement_list(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<StatementList>");
        if self.is_statement_start() {
            node.add_child(self.parse_statement()?);
            node.add_child(self.parse_statement_list()?);
        } else {
            if self.cur().formal_name != "CLOSE_BRACE" {
                self.alt_warning = Some(
                    "Hint: Possibly missing element in: {PrintStatement, AssignmentStatement, VarDecl, WhileStatement, IfStatement, Block}"
                        .to_string(),
                );
            }
            node.add_child(self.eps_node());
        }
        Ok(node)
    }

    fn parse_statement(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<Statement>");
        let child = if self.cur().formal_name == "KEYW_PRINT" {
            self.parse_print_statement()?
        } else if self.cur().formal_name == "ID" {
            self.parse_assignment_statement()?
        } else if self.cur().is_type_keyword() {
            self.parse_var_decl()?
        } else if self.cur().formal_name == "KEYW_WHILE" {
            self.parse_while_statement()?
        } else if self.cur().formal_name == "KEYW_IF" {
            self.parse_if_statement()?
        } else {
            // OPEN_BRACE, the only remaining FIRST(Statement) option.
            self.parse_block()?
        };
        node.add_child(child);
        Ok(node)
    }

    fn parse_print_statement(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<PrintStatement>");
        if self.cur().formal_name == "KEYW_PRINT" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("KEYW_PRINT [ print ]");
            return Err(());
        }
        if self.cur().formal_name == "OPEN_PAREN" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("OPEN_PAREN [ ( ]");
            return Err(());
        }
        node.add_child(self.parse_expr()?);
        if self.cur().formal_name == "CLOSE_PAREN" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("CLOSE_PAREN [ ) ]");
            return Err(());
        }
        Ok(node)
    }

    fn parse_expr(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<Expr>");
        let child = match self.cur().formal_name {
            "DIGIT" => self.parse_int_expr()?,
            "QUOTE" => self.parse_string_expr()?,
            "OPEN_PAREN" | "KEYW_TRUE" | "KEYW_FALSE" => self.parse_boolean_expr()?,
            "ID" => self.parse_id()?,
            _ => {
                self.wrong_token("token in: {ID [ char ], IntExpr, StringExpr, BooleanExpr}");
                return Err(());
            }
        };
        node.add_child(child);
        Ok(node)
    }

    fn parse_int_expr(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<IntExpr>");
        if self.cur().formal_name == "DIGIT" {
            node.add_child(self.parse_digit()?);
        } else {
            self.wrong_token("DIGIT [ 0-9 ]");
            return Err(());
        }
        if self.cur().formal_name == "ADD" {
            node.add_child(self.parse_int_op()?);
            node.add_child(self.parse_expr()?);
        } else if self.cur().formal_name == "DIGIT" {
            self.alt_warning = Some("Hint: Possible missing ADD [ + ].".to_string());
        }
        Ok(node)
    }

    fn parse_int_op(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<IntOp>");
        if self.cur().formal_name == "ADD" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("ADD [ + ]");
            return Err(());
        }
        Ok(node)
    }

    fn parse_digit(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<Digit>");
        if self.cur().formal_name == "DIGIT" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("DIGIT [ 0-9 ]");
            return Err(());
        }
        Ok(node)
    }

    fn parse_string_expr(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<StringExpr>");
        if self.cur().formal_name == "QUOTE" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("QUOTE [ \" ]");
            return Err(());
        }
        node.add_child(self.parse_char_list()?);
        if self.cur().formal_name == "QUOTE" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("QUOTE [ \" ]");
            return Err(());
        }
        Ok(node)
    }

    fn parse_char_list(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<CharList>");
        if self.cur().formal_name == "CHAR" {
            node.add_child(self.parse_char()?);
            node.add_child(self.parse_char_list()?);
        } else {
            node.add_child(self.eps_node());
        }
        Ok(node)
    }

    fn parse_char(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<Char>");
        if self.cur().formal_name == "CHAR" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("CHAR [ a-z | (space) ]");
            return Err(());
        }
        Ok(node)
    }

    fn parse_assignment_statement(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<AssignmentStatement>");
        if self.cur().formal_name == "ID" {
            node.add_child(self.parse_id()?);
        } else {
            self.wrong_token("ID [ char ]");
            return Err(());
        }
        if self.cur().formal_name == "ASSIGN_OP" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("ASSIGN_OP [ = ]");
            return Err(());
        }
        node.add_child(self.parse_expr()?);
        Ok(node)
    }

    fn parse_id(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<ID>");
        if self.cur().formal_name == "ID" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("ID [ char ]");
            return Err(());
        }
        Ok(node)
    }

    fn parse_var_decl(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<VarDecl>");
        if self.cur().is_type_keyword() {
            node.add_child(self.parse_type()?);
        } else {
            self.wrong_token("type keyword in: {I_TYPE [ int ], B_TYPE [ boolean ], S_TYPE [ string ]}");
            return Err(());
        }
        if self.cur().formal_name == "ID" {
            node.add_child(self.parse_id()?);
        } else {
            self.wrong_token("ID [ char ]");
            return Err(());
        }
        Ok(node)
    }

    fn parse_type(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<Type>");
        if self.cur().is_type_keyword() {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("type keyword in: {I_TYPE [ int ], B_TYPE [ boolean ], S_TYPE [ string ]}");
            return Err(());
        }
        Ok(node)
    }

    fn parse_while_statement(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<WhileStatement>");
        if self.cur().formal_name == "KEYW_WHILE" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("KEYW_WHILE [ while ]");
            return Err(());
        }
        node.add_child(self.parse_boolean_expr()?);
        node.add_child(self.parse_block()?);
        Ok(node)
    }

    fn parse_boolean_expr(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<BooleanExpression>");
        if self.cur().formal_name == "OPEN_PAREN" {
            node.add_child(self.leaf());
            node.add_child(self.parse_expr()?);
            node.add_child(self.parse_bool_op()?);
            node.add_child(self.parse_expr()?);
            if self.cur().formal_name == "CLOSE_PAREN" {
                node.add_child(self.leaf());
            } else {
                self.wrong_token("CLOSE_PAREN [ ) ]");
                return Err(());
            }
        } else {
            node.add_child(self.parse_bool_val()?);
        }
        Ok(node)
    }

    fn parse_bool_op(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<BoolOp>");
        if matches!(self.cur().formal_name, "EQUAL_OP" | "N-EQUAL_OP") {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("token in: {EQUAL_OP [ == ], N-EQUAL_OP [ != ]}");
            return Err(());
        }
        Ok(node)
    }

    fn parse_bool_val(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<BoolVal>");
        if matches!(self.cur().formal_name, "KEYW_TRUE" | "KEYW_FALSE") {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("token in: {KEYW_TRUE [ true ], KEYW_FALSE [ false ]}");
            return Err(());
        }
        Ok(node)
    }

    fn parse_if_statement(&mut self) -> PResult<Node<Token>> {
        let mut node = Node::branch("<IfStatement>");
        if self.cur().formal_name == "KEYW_IF" {
            node.add_child(self.leaf());
        } else {
            self.wrong_token("KEYW_IF [ if ]");
            return Err(());
        }
        node.add_child(self.parse_boolean_expr()?);
        node.add_child(self.parse_block()?);
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gopiler_lex::lex;

    fn parse_src(src: &str) -> ParseOutcome {
        let diag = Diagnostics::terminal(false);
        let progs = lex(src, &diag);
        parse(&progs[0].tokens, &diag, 1)
    }

    #[test]
    fn empty_block_parses() {
        let outcome = parse_src("{}$");
        assert!(outcome.cst.is_some());
        assert!(!outcome.counters.has_errors());
    }

    #[test]
    fn var_decl_assignment_print_parses() {
        let outcome = parse_src("{ int a a = 3 print(a) }$");
        assert!(outcome.cst.is_some());
        assert!(!outcome.counters.has_errors());
    }

    #[test]
    fn missing_close_brace_is_error() {
        let outcome = parse_src("{ int a $");
        assert!(outcome.cst.is_none());
        assert!(outcome.counters.has_errors());
    }

    #[test]
    fn if_with_equality_parses() {
        let outcome = parse_src("{ if (1 == 1) { print(\"ok\") } }$");
        assert!(outcome.cst.is_some());
    }

    #[test]
    fn while_with_inequality_parses() {
        let outcome = parse_src("{ int a a = 0 while (a != 1) { a = 1 } }$");
        assert!(outcome.cst.is_some());
    }

    #[test]
    fn nested_addition_right_recursion_parses() {
        let outcome = parse_src("{ int a a = 1 + 2 + 3 }$");
        assert!(outcome.cst.is_some());
    }
}
