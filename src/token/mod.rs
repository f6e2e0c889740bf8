//! Token model and the keyword/HTML-element registries.
//!
//! A closed `TokenKind` enum classified eagerly by the registries in
//! [`keywords`] and [`html`], carried alongside a source [`Position`].

pub mod html;
pub mod keywords;

use serde::{Deserialize, Serialize};

/// A source location, carried on every token and AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub file: u32,
    pub line: u32,
    pub column: u32,
    pub byte_offset: u32,
}

impl Position {
    pub fn start(file: u32) -> Self {
        Self {
            file,
            line: 1,
            column: 1,
            byte_offset: 0,
        }
    }
}

/// Closed set of token kinds. `:` and `=` are distinct kinds but are
/// CE-equal (colon/equals-equivalent) for the parser — see
/// [`TokenKind::is_assign_like`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals / identifiers
    Identifier,
    HtmlElementIdent,
    StringLiteral,
    UnquotedLiteral,
    NumberLiteral,

    // Punctuators
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Semicolon,
    Colon,
    Equals,
    Comma,
    Dot,
    Ampersand,
    At,
    Hash,

    // Comments
    LineComment,
    BlockComment,
    GeneratorComment,

    // Keywords
    Text,
    Style,
    Script,
    Inherit,
    Delete,
    Insert,
    After,
    Before,
    Replace,
    Top,
    Bottom,
    From,
    As,
    Except,
    Use,
    Html5,

    // Bracketed block tags
    BlockTemplate,
    BlockCustom,
    BlockOrigin,
    BlockImport,
    BlockConfiguration,
    BlockNamespace,
    BlockName,
    BlockOriginType,
    BlockInfo,
    BlockExport,

    // Typed prefixes
    AtStyle,
    AtElement,
    AtVar,
    AtHtml,
    AtJavaScript,
    AtChtl,
    AtCJmod,
    AtConfig,
    /// User-defined type prefix, e.g. `@Vue`.
    AtCustomType,

    Eof,
    /// Lexical error recovery placeholder; never emitted on success.
    Unknown,
}

impl TokenKind {
    /// `:` and `=` are interchangeable at the parser layer.
    pub fn is_assign_like(self) -> bool {
        matches!(self, TokenKind::Colon | TokenKind::Equals)
    }

    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment | TokenKind::BlockComment | TokenKind::GeneratorComment
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::StringLiteral | TokenKind::UnquotedLiteral | TokenKind::NumberLiteral
        )
    }

    pub fn is_bracketed_block(self) -> bool {
        matches!(
            self,
            TokenKind::BlockTemplate
                | TokenKind::BlockCustom
                | TokenKind::BlockOrigin
                | TokenKind::BlockImport
                | TokenKind::BlockConfiguration
                | TokenKind::BlockNamespace
                | TokenKind::BlockName
                | TokenKind::BlockOriginType
                | TokenKind::BlockInfo
                | TokenKind::BlockExport
        )
    }

    pub fn is_type_prefix(self) -> bool {
        matches!(
            self,
            TokenKind::AtStyle
                | TokenKind::AtElement
                | TokenKind::AtVar
                | TokenKind::AtHtml
                | TokenKind::AtJavaScript
                | TokenKind::AtChtl
                | TokenKind::AtCJmod
                | TokenKind::AtConfig
                | TokenKind::AtCustomType
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }

    pub fn len(&self) -> usize {
        self.lexeme.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.lexeme.is_empty()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}({:?}) @ {}:{}",
            self.kind, self.lexeme, self.position.line, self.position.column
        )
    }
}
