//! Tokens produced by the lexer (spec.md §3 "Token", §4.2).

use gopiler_util::{Labeled, Location};

/// The five token kinds named in spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Symbol,
    Digit,
    Character,
}

/// A single lexed token: kind, a stable uppercase formal name, a source
/// location, and the true (original) content.
///
/// Tokens are value-like and immutable once produced — nothing downstream
/// mutates a `Token` in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub formal_name: &'static str,
    pub location: Location,
    pub true_content: String,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        formal_name: &'static str,
        location: Location,
        true_content: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            formal_name,
            location,
            true_content: true_content.into(),
        }
    }

    /// `true` for the formal names the parser treats as type keywords
    /// (`I_TYPE`/`S_TYPE`/`B_TYPE`).
    pub fn is_type_keyword(&self) -> bool {
        self.kind == TokenKind::Keyword
            && matches!(self.formal_name, "I_TYPE" | "S_TYPE" | "B_TYPE")
    }
}

/// Renders a leaf the way `tree.go`'s `PrintNode` renders a terminal:
/// `{FORMAL_NAME [ trueContent ]}`, with the literal text `space` standing
/// in for an actual space character so the dump stays legible.
impl Labeled for Token {
    fn label(&self) -> String {
        let shown: &str = if self.true_content == " " {
            "space"
        } else {
            &self.true_content
        };
        format!("{{{} [ {} ]}}", self.formal_name, shown)
    }
}
