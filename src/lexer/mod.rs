//! Character-stream lexer.
//!
//! Single forward pass over a `Vec<char>`: a `position`/`row`/`column`
//! cursor over collected chars, one `read_*` method per lexeme family,
//! threaded through the [`crate::config`] alias table so `[Name]`
//! overrides apply to subsequent input only.

mod raw_capture;
mod scan;

pub use raw_capture::capture_braced_span;

use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::token::{Position, Token, TokenKind};

pub struct Lexer<'a> {
    input: Vec<char>,
    byte_offsets: Vec<u32>,
    position: usize,
    line: u32,
    column: u32,
    file: u32,
    config: &'a Config,
}

pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub diagnostics: DiagnosticBag,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, file: u32, config: &'a Config) -> Self {
        let input: Vec<char> = source.chars().collect();
        let mut byte_offsets = Vec::with_capacity(input.len() + 1);
        let mut offset = 0u32;
        for ch in &input {
            byte_offsets.push(offset);
            offset += ch.len_utf8() as u32;
        }
        byte_offsets.push(offset);
        Self {
            input,
            byte_offsets,
            position: 0,
            line: 1,
            column: 1,
            file,
            config,
        }
    }

    pub fn tokenize(mut self) -> LexOutput {
        let mut tokens = Vec::new();
        let mut diagnostics = DiagnosticBag::new();
        loop {
            let token = scan::next_token(&mut self, &mut diagnostics);
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        LexOutput { tokens, diagnostics }
    }

    /// Source text covering `[start, end)` byte offsets, used by the
    /// parser for raw-capture spans.
    pub fn source_slice(&self, start: u32, end: u32) -> String {
        self.input
            .iter()
            .zip(self.byte_offsets.iter())
            .filter(|(_, &off)| off >= start && off < end)
            .map(|(c, _)| *c)
            .collect()
    }

    pub(crate) fn pos_byte_offset(&self) -> u32 {
        self.byte_offsets[self.position]
    }

    fn pos(&self) -> Position {
        Position {
            file: self.file,
            line: self.line,
            column: self.column,
            byte_offset: self.byte_offsets[self.position],
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(
        &self,
        diagnostics: &mut DiagnosticBag,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) {
        diagnostics.push(Diagnostic::new(kind, self.pos(), message));
    }
}

pub(crate) fn is_alpha(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn lex(src: &str) -> Vec<Token> {
        let config = Config::default();
        Lexer::new(src, 0, &config).tokenize().tokens
    }

    #[test]
    fn empty_input_yields_only_eof() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn basic_element_tokens() {
        let tokens = lex("div { id: x; }");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::HtmlElementIdent,
                TokenKind::LBrace,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literal_escapes() {
        let tokens = lex(r#""hi\nthere""#);
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].lexeme, "hi\nthere");
    }

    #[test]
    fn unterminated_string_reports_error() {
        let config = Config::default();
        let out = Lexer::new("\"abc", 0, &config).tokenize();
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnterminatedString));
    }

    #[test]
    fn generator_comment_is_not_a_block_comment() {
        let tokens = lex("-- hello\n");
        assert_eq!(tokens[0].kind, TokenKind::GeneratorComment);
        assert_eq!(tokens[0].lexeme, " hello");
    }

    #[test]
    fn bracketed_tag_is_single_token() {
        let tokens = lex("[Template] @Style Foo {}");
        assert_eq!(tokens[0].kind, TokenKind::BlockTemplate);
        assert_eq!(tokens[1].kind, TokenKind::AtStyle);
    }

    #[test]
    fn colon_and_equals_are_distinct_kinds() {
        let tokens = lex("a: 1; b = 2;");
        assert_eq!(tokens[1].kind, TokenKind::Colon);
        assert_eq!(tokens[4].kind, TokenKind::Equals);
        assert!(tokens[1].kind.is_assign_like());
        assert!(tokens[4].kind.is_assign_like());
    }

    #[test]
    fn unknown_char_is_reported() {
        let config = Config::default();
        let out = Lexer::new("div { ~ }", 0, &config).tokenize();
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::InvalidChar));
    }
}
