//! The lexer (spec.md §4.2, component C3).
//!
//! A single left-to-right scan over the source, interpreted as a sequence
//! of Unicode code points rather than bytes (per spec.md's explicit call-
//! out — the source language permits no non-ASCII content, but the scan
//! itself must not assume one-byte-per-character). A small state machine
//! tracks whether the scan is inside a double-quoted string (`quote`) or a
//! `/* ... */` comment (`comment`); outside both, alphanumeric runs
//! accumulate into a buffer that is flushed with the greedy longest-match
//! rule before any delimiter is consumed.
//!
//! Every source position is resolved through a precomputed `locs` table
//! (one [`Location`] per code point, plus one trailing sentinel for EOF)
//! so that comment-skipping lookahead (the `==`/`!=` two-character
//! operators) never has to manually thread line/column state through
//! index arithmetic.

use gopiler_util::{Counters, Diagnostics, Location};

use crate::token::{Token, TokenKind};

/// The token stream and error/warning counters for one program.
#[derive(Debug, Clone, Default)]
pub struct ProgramTokens {
    pub tokens: Vec<Token>,
    pub counters: Counters,
}

/// Keywords recognized by the greedy longest-match rule (spec.md §4.2),
/// ordered longest-first so the scan never needs to sort at runtime.
const KEYWORDS: &[(&str, &str)] = &[
    ("boolean", "B_TYPE"),
    ("string", "S_TYPE"),
    ("print", "KEYW_PRINT"),
    ("while", "KEYW_WHILE"),
    ("false", "KEYW_FALSE"),
    ("true", "KEYW_TRUE"),
    ("int", "I_TYPE"),
    ("if", "KEYW_IF"),
];

struct Lexer<'a> {
    chars: Vec<char>,
    /// `locs[i]` is the location of `chars[i]`; `locs[chars.len()]` is the
    /// synthetic location just past the last character (used for EOF and
    /// injected `EOP` tokens).
    locs: Vec<Location>,
    idx: usize,
    diag: &'a Diagnostics,
    programs: Vec<ProgramTokens>,
    cur_tokens: Vec<Token>,
    cur_counters: Counters,
    program_num: u32,
    logged_current: bool,
    /// Set when an `EOP` closed a program but only trivia (or an
    /// unterminated trailing comment) follows; finalized once EOF
    /// confirms no new program actually starts (spec.md §4.2).
    trailing_closed: Option<ProgramTokens>,
}

/// Runs the lexer over a full source file, splitting it into one token
/// stream per program at each `EOP` (`$`) marker.
pub fn lex(source: &str, diag: &Diagnostics) -> Vec<ProgramTokens> {
    let chars: Vec<char> = source.chars().collect();
    let mut locs = Vec::with_capacity(chars.len() + 1);
    let mut line = 1u32;
    let mut col = 1u32;
    for &c in &chars {
        locs.push(Location::new(line, col));
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    locs.push(Location::new(line, col));

    let mut lexer = Lexer {
        chars,
        locs,
        idx: 0,
        diag,
        programs: Vec::new(),
        cur_tokens: Vec::new(),
        cur_counters: Counters::default(),
        program_num: 1,
        logged_current: false,
        trailing_closed: None,
    };
    lexer.run();
    lexer.programs
}

impl<'a> Lexer<'a> {
    fn loc(&self, idx: usize) -> Location {
        self.locs[idx.min(self.locs.len() - 1)]
    }

    fn cur_loc(&self) -> Location {
        self.loc(self.idx)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).copied()
    }

    fn note_new_program_if_needed(&mut self) {
        if !self.logged_current {
            self.diag.info(
                "GOPILER",
                &format!("Compiling program {}", self.program_num),
            );
            self.logged_current = true;
        }
    }

    fn push_token(&mut self, kind: TokenKind, formal_name: &'static str, loc: Location, content: impl Into<String>) {
        self.note_new_program_if_needed();
        self.cur_tokens.push(Token::new(kind, formal_name, loc, content));
    }

    fn finalize(&mut self, program: ProgramTokens) {
        let n = self.programs.len() + 1;
        if program.counters.has_errors() {
            self.diag.fail(
                "LEXER",
                &format!(
                    "Lexing failed for program {n} with {} error(s), {} warning(s).",
                    program.counters.errors, program.counters.warnings
                ),
            );
        } else {
            self.diag.pass(
                "LEXER",
                &format!(
                    "Lexer successfully evaluated program {n} ({} warning(s)).",
                    program.counters.warnings
                ),
            );
        }
        self.programs.push(program);
    }

    fn finish_current_program(&mut self) {
        let program = ProgramTokens {
            tokens: std::mem::take(&mut self.cur_tokens),
            counters: std::mem::take(&mut self.cur_counters),
        };
        self.finalize(program);
        self.program_num += 1;
        self.logged_current = false;
    }

    /// Scans forward from `idx` over whitespace and well-formed `/* .. */`
    /// comments without consuming anything. Returns `Ok(Some(idx))` at the
    /// first real character, `Ok(None)` if only trivia remains before EOF,
    /// or `Err(())` if an unterminated comment is found.
    fn lookahead_trivia(&self, mut idx: usize) -> Result<Option<usize>, ()> {
        loop {
            match self.chars.get(idx) {
                None => return Ok(None),
                Some(c) if c.is_whitespace() => idx += 1,
                Some('/') if self.chars.get(idx + 1) == Some(&'*') => {
                    idx += 2;
                    loop {
                        match (self.chars.get(idx), self.chars.get(idx + 1)) {
                            (None, _) => return Err(()),
                            (Some('*'), Some('/')) => {
                                idx += 2;
                                break;
                            }
                            _ => idx += 1,
                        }
                    }
                }
                Some(_) => return Ok(Some(idx)),
            }
        }
    }

    fn run(&mut self) {
        self.note_new_program_if_needed();

        let mut buffer = String::new();
        let mut buffer_start: Location = Location::START;
        let mut quote = false;
        let mut comment = false;

        macro_rules! flush_buffer {
            ($self:ident) => {
                if !buffer.is_empty() {
                    $self.flush_ident_buffer(&mut buffer, buffer_start);
                }
            };
        }

        while self.idx < self.chars.len() {
            let c = self.chars[self.idx];

            if quote {
                match c {
                    '"' => {
                        self.push_token(TokenKind::Symbol, "QUOTE", self.cur_loc(), "\"");
                        self.idx += 1;
                        quote = false;
                    }
                    ' ' | 'a'..='z' => {
                        self.push_token(TokenKind::Character, "CHAR", self.cur_loc(), c.to_string());
                        self.idx += 1;
                    }
                    '\n' => {
                        self.cur_counters.record_error();
                        self.diag.error(
                            "LEXER",
                            &format!(
                                "Error at ({}). Invalid character in string. Multiline strings not permitted.",
                                self.cur_loc()
                            ),
                        );
                        self.idx += 1;
                    }
                    'A'..='Z' => {
                        self.cur_counters.record_error();
                        self.diag.error(
                            "LEXER",
                            &format!(
                                "Error at ({}). Invalid character in string. Capital letters not permitted in strings.",
                                self.cur_loc()
                            ),
                        );
                        self.idx += 1;
                    }
                    '0'..='9' => {
                        self.cur_counters.record_error();
                        self.diag.error(
                            "LEXER",
                            &format!(
                                "Error at ({}). Invalid character in string. Digits not permitted in strings.",
                                self.cur_loc()
                            ),
                        );
                        self.idx += 1;
                    }
                    '$' => {
                        self.cur_counters.record_error();
                        self.diag.error(
                            "LEXER",
                            &format!(
                                "Error at ({}). Invalid character in string. Perhaps unterminated string.",
                                self.cur_loc()
                            ),
                        );
                        self.idx += 1;
                    }
                    _ => {
                        self.cur_counters.record_error();
                        self.diag.error(
                            "LEXER",
                            &format!("Error at ({}). Invalid character in string.", self.cur_loc()),
                        );
                        self.idx += 1;
                    }
                }
                continue;
            }

            if comment {
                if c == '*' && self.peek(1) == Some('/') {
                    self.idx += 2;
                    comment = false;
                } else {
                    self.idx += 1;
                }
                continue;
            }

            if c.is_alphanumeric() && c.is_ascii() {
                if buffer.is_empty() {
                    buffer_start = self.cur_loc();
                }
                buffer.push(c);
                self.idx += 1;
                continue;
            }

            flush_buffer!(self);

            match c {
                c if c.is_whitespace() => {
                    self.idx += 1;
                }
                '/' if self.peek(1) == Some('*') => {
                    comment = true;
                    self.idx += 2;
                }
                '=' => {
                    let start = self.cur_loc();
                    match self.lookahead_through_comments_for_eq(self.idx + 1) {
                        Some(end_idx) => {
                            self.push_token(TokenKind::Symbol, "EQUAL_OP", start, "==");
                            self.idx = end_idx + 1;
                        }
                        None => {
                            self.push_token(TokenKind::Symbol, "ASSIGN_OP", start, "=");
                            self.idx += 1;
                        }
                    }
                }
                '!' => {
                    let start = self.cur_loc();
                    match self.lookahead_through_comments_for_eq(self.idx + 1) {
                        Some(end_idx) => {
                            self.push_token(TokenKind::Symbol, "N-EQUAL_OP", start, "!=");
                            self.idx = end_idx + 1;
                        }
                        None => {
                            self.cur_counters.record_error();
                            self.diag.error(
                                "LEXER",
                                &format!(
                                    "Error at ({start}). Invalid token [ ! ]. Possible malformed N-EQUAL_OP."
                                ),
                            );
                            self.idx += 1;
                        }
                    }
                }
                '"' => {
                    self.push_token(TokenKind::Symbol, "QUOTE", self.cur_loc(), "\"");
                    self.idx += 1;
                    quote = true;
                }
                '{' => self.emit_symbol_and_advance("OPEN_BRACE", "{"),
                '}' => self.emit_symbol_and_advance("CLOSE_BRACE", "}"),
                '(' => self.emit_symbol_and_advance("OPEN_PAREN", "("),
                ')' => self.emit_symbol_and_advance("CLOSE_PAREN", ")"),
                '+' => self.emit_symbol_and_advance("ADD", "+"),
                '$' => {
                    let start = self.cur_loc();
                    self.push_token(TokenKind::Symbol, "EOP", start, "$");
                    self.idx += 1;
                    self.close_program_and_lookahead();
                }
                '*' => {
                    self.cur_counters.record_error();
                    self.diag.error(
                        "LEXER",
                        &format!(
                            "Error at ({}). Invalid token [ * ]. Possible malformed comment.",
                            self.cur_loc()
                        ),
                    );
                    self.idx += 1;
                }
                c if c.is_uppercase() => {
                    self.cur_counters.record_error();
                    self.diag.error(
                        "LEXER",
                        &format!(
                            "Error at ({}). Invalid token [ {} ]. Capitals not permitted.",
                            self.cur_loc(),
                            c
                        ),
                    );
                    self.idx += 1;
                }
                other => {
                    self.cur_counters.record_error();
                    self.diag.error(
                        "LEXER",
                        &format!(
                            "Error at ({}). Invalid token [ {} ].",
                            self.cur_loc(),
                            other
                        ),
                    );
                    self.idx += 1;
                }
            }
        }

        flush_buffer!(self);

        if quote {
            self.cur_counters.record_error();
            self.diag.error(
                "LEXER",
                &format!(
                    "Error at ({}). Unterminated string at EOF.",
                    self.cur_loc()
                ),
            );
        }
        if comment {
            self.cur_counters.record_error();
            self.diag.error(
                "LEXER",
                &format!(
                    "Error at ({}). Unterminated comment at EOF.",
                    self.cur_loc()
                ),
            );
        }

        if let Some(mut closed) = self.trailing_closed.take() {
            // Trailing trivia (or an unterminated comment) after the last
            // EOP never started a new program; fold whatever errors/
            // warnings it raised back into the program that already
            // closed, then finalize only that one.
            closed.counters.errors += self.cur_counters.errors;
            closed.counters.warnings += self.cur_counters.warnings;
            self.finalize(closed);
            return;
        }

        // EOF without a closing EOP: synthesize one, with a warning, iff
        // the input wasn't truly empty. Whitespace/comment-only input has
        // scanned real characters (just none that produced a token) and
        // still gets a synthetic EOP (spec.md §8: "input of only
        // whitespace/comments (warning, synthetic EOP)"); only the empty
        // string itself gets the separate no-tokens-at-all boundary case.
        if !self.chars.is_empty() {
            self.cur_counters.record_warning();
            self.diag.warn(
                "LEXER",
                "Reached EOF before an EOP [ $ ] marker; a synthetic EOP was injected.",
            );
            let loc = self.cur_loc();
            self.push_token(TokenKind::Symbol, "EOP", loc, "$");
            self.finish_current_program();
        } else if self.programs.is_empty() {
            // Truly empty input: one warning, no tokens at all (spec.md
            // §8 "Empty source file").
            self.cur_counters.record_warning();
            self.diag.warn("LEXER", "Source contains no tokens.");
            self.finish_current_program();
        }
        // Otherwise: we already closed the last real program at its EOP
        // and nothing but trivia followed — nothing further to finalize.
    }

    fn emit_symbol_and_advance(&mut self, formal_name: &'static str, content: &'static str) {
        let loc = self.cur_loc();
        self.push_token(TokenKind::Symbol, formal_name, loc, content);
        self.idx += 1;
    }

    /// After an `EOP`, decides whether another program follows. Mirrors
    /// spec.md §4.2's "looks ahead: if any non-whitespace, non-comment
    /// code point remains, a new program begins" — an unterminated
    /// trailing comment is attributed back to the program that just
    /// closed rather than starting a new one.
    fn close_program_and_lookahead(&mut self) {
        let closed = ProgramTokens {
            tokens: std::mem::take(&mut self.cur_tokens),
            counters: std::mem::take(&mut self.cur_counters),
        };
        match self.lookahead_trivia(self.idx) {
            Ok(Some(_)) => {
                // Real content remains: finalize this program now and let
                // the main loop's buffering lazily log the next one.
                self.finalize(closed);
                self.program_num += 1;
                self.logged_current = false;
            }
            Ok(None) | Err(()) => {
                // Only trivia, or an unterminated trailing comment,
                // remains: hold this program open until EOF confirms no
                // new program actually starts, so a trailing unterminated
                // comment is attributed back to it (spec.md §4.2).
                self.trailing_closed = Some(closed);
            }
        }
    }

    /// Looks for a second `=` at or after `start`, allowed to pass
    /// through at most one intervening well-formed comment (spec.md
    /// §4.2's `=/*…*/=` example). Returns the index of the matched `=` on
    /// success.
    fn lookahead_through_comments_for_eq(&self, start: usize) -> Option<usize> {
        let mut idx = start;
        loop {
            match self.chars.get(idx) {
                Some('=') => return Some(idx),
                Some('/') if self.chars.get(idx + 1) == Some(&'*') => {
                    idx += 2;
                    loop {
                        match (self.chars.get(idx), self.chars.get(idx + 1)) {
                            (Some('*'), Some('/')) => {
                                idx += 2;
                                break;
                            }
                            (None, _) => return None,
                            _ => idx += 1,
                        }
                    }
                }
                _ => return None,
            }
        }
    }

    /// Flushes an accumulated alphanumeric buffer using the greedy
    /// longest-match rule (spec.md §4.2): repeatedly peel off the longest
    /// keyword prefix, or else exactly one character as a lone `ID`/`DIGIT`.
    fn flush_ident_buffer(&mut self, buffer: &mut String, start: Location) {
        let text = std::mem::take(buffer);
        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0usize;
        // Column offset within the buffer; the buffer never contains a
        // newline (alphanumerics only), so line stays fixed.
        while pos < chars.len() {
            let rest: String = chars[pos..].iter().collect();
            let mut matched = false;
            for pair in KEYWORDS {
                let (kw, formal): (&str, &str) = *pair;
                if rest.starts_with(kw) {
                    let loc = Location::new(start.line, start.column + pos as u32);
                    self.push_token(TokenKind::Keyword, formal, loc, kw);
                    pos += kw.chars().count();
                    matched = true;
                    break;
                }
            }
            if matched {
                continue;
            }
            let c = chars[pos];
            let loc = Location::new(start.line, start.column + pos as u32);
            if c.is_ascii_digit() {
                self.push_token(TokenKind::Digit, "DIGIT", loc, c.to_string());
            } else if c.is_ascii_lowercase() {
                self.push_token(TokenKind::Identifier, "ID", loc, c.to_string());
            } else {
                // Uppercase letters never enter the buffer (caught
                // immediately in the main scan); anything else
                // alphanumeric-but-unexpected is reported defensively.
                self.cur_counters.record_error();
                self.diag.error(
                    "LEXER",
                    &format!("Error at ({loc}). Invalid token [ {c} ]."),
                );
            }
            pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_str(src: &str) -> Vec<ProgramTokens> {
        let diag = Diagnostics::terminal(false);
        lex(src, &diag)
    }

    fn names(p: &ProgramTokens) -> Vec<&str> {
        p.tokens.iter().map(|t| t.formal_name).collect()
    }

    #[test]
    fn empty_braces_program() {
        let progs = lex_str("{}$");
        assert_eq!(progs.len(), 1);
        assert_eq!(names(&progs[0]), vec!["OPEN_BRACE", "CLOSE_BRACE", "EOP"]);
        assert_eq!(progs[0].tokens[0].location, Location::new(1, 1));
        assert_eq!(progs[0].tokens[1].location, Location::new(1, 2));
        assert_eq!(progs[0].tokens[2].location, Location::new(1, 3));
    }

    #[test]
    fn greedy_longest_match_keyword_then_suffix() {
        let progs = lex_str("whiles$");
        let toks = &progs[0].tokens;
        assert_eq!(toks[0].formal_name, "KEYW_WHILE");
        assert_eq!(toks[1].formal_name, "ID");
        assert_eq!(toks[1].true_content, "s");
    }

    #[test]
    fn greedy_longest_match_digit_then_keyword_suffix() {
        // i9nt -> i, 9, n, t (each a single-char token; "nt" is not "int")
        let progs = lex_str("i9nt$");
        let toks: Vec<(&str, &str)> = progs[0]
            .tokens
            .iter()
            .map(|t| (t.formal_name, t.true_content.as_str()))
            .collect();
        assert_eq!(
            toks,
            vec![
                ("ID", "i"),
                ("DIGIT", "9"),
                ("ID", "n"),
                ("ID", "t"),
                ("EOP", "$"),
            ]
        );
    }

    #[test]
    fn equal_op_two_char() {
        let progs = lex_str("==$");
        assert_eq!(names(&progs[0]), vec!["EQUAL_OP", "EOP"]);
    }

    #[test]
    fn equal_op_sees_through_comment() {
        let progs = lex_str("=/* hi */=$");
        assert_eq!(names(&progs[0]), vec!["EQUAL_OP", "EOP"]);
    }

    #[test]
    fn bang_without_equals_is_error() {
        let diag = Diagnostics::buffered(false);
        let progs = lex(" ! $", &diag);
        assert!(progs[0].counters.has_errors());
        assert!(diag.drain().contains("N-EQUAL_OP"));
    }

    #[test]
    fn two_programs_split_at_eop() {
        let progs = lex_str("{}${}$");
        assert_eq!(progs.len(), 2);
    }

    #[test]
    fn empty_input_warns_with_no_tokens() {
        let progs = lex_str("");
        assert_eq!(progs.len(), 1);
        assert!(progs[0].tokens.is_empty());
        assert_eq!(progs[0].counters.warnings, 1);
    }

    #[test]
    fn whitespace_only_input_synthesizes_eop() {
        let progs = lex_str("   \n  ");
        assert_eq!(progs.len(), 1);
        assert_eq!(names(&progs[0]), vec!["EOP"]);
        assert_eq!(progs[0].counters.warnings, 1);
    }

    #[test]
    fn unterminated_string_is_error() {
        let progs = lex_str("{ string s s = \"hi }$");
        assert!(progs[0].counters.has_errors());
    }

    #[test]
    fn string_chars_become_char_tokens() {
        let progs = lex_str("\"hi there\"$");
        let toks = &progs[0].tokens;
        // QUOTE, h, i, space, t, h, e, r, e, QUOTE, EOP
        assert_eq!(toks[0].formal_name, "QUOTE");
        assert_eq!(toks[1].formal_name, "CHAR");
        assert_eq!(toks[1].true_content, "h");
        assert_eq!(toks[3].true_content, " ");
    }

    #[test]
    fn uppercase_outside_string_is_error() {
        let progs = lex_str("{ Int a }$");
        assert!(progs[0].counters.has_errors());
    }

    #[test]
    fn missing_eop_injects_synthetic_one() {
        let progs = lex_str("{}");
        assert_eq!(names(&progs[0]), vec!["OPEN_BRACE", "CLOSE_BRACE", "EOP"]);
        assert_eq!(progs[0].counters.warnings, 1);
    }
}
