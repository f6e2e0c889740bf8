//! Verbatim brace-matched span capture.
//!
//! `[Origin]` bodies and `script { … }` bodies are not interpreted as
//! CHTL syntax — their contents are foreign (HTML/CSS/JS/arbitrary
//! text) and must reach the generator byte-for-byte. The token stream
//! already tokenizes quoted strings as single `StringLiteral` tokens
//! (escape-aware), so brace depth can be tracked purely over
//! `LBrace`/`RBrace` tokens without re-scanning characters: a stray
//! `{`/`}` inside a JS string literal never produced its own brace
//! token in the first place, so string literals disable brace matching
//! implicitly, enforced by the tokenizer rather than this pass.

use crate::token::{Token, TokenKind};

/// `tokens[start]` must be the first token after an already-consumed
/// opening `{`. Returns the verbatim source text up to (not including)
/// the matching closing `}`, plus the index of the token right after
/// that closing brace.
pub fn capture_braced_span(tokens: &[Token], start: usize, source: &str) -> (String, usize) {
    let mut depth = 1usize;
    let mut idx = start;
    let body_start = tokens
        .get(start)
        .map(|t| t.position.byte_offset)
        .unwrap_or(source.len() as u32);

    while idx < tokens.len() {
        match tokens[idx].kind {
            TokenKind::LBrace => depth += 1,
            TokenKind::RBrace => {
                depth -= 1;
                if depth == 0 {
                    let body_end = tokens[idx].position.byte_offset;
                    let text = slice(source, body_start, body_end);
                    return (text, idx + 1);
                }
            }
            TokenKind::Eof => break,
            _ => {}
        }
        idx += 1;
    }
    (slice(source, body_start, source.len() as u32), idx)
}

fn slice(source: &str, start: u32, end: u32) -> String {
    source
        .get(start as usize..end.max(start) as usize)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::lexer::Lexer;

    fn tokenize(src: &str) -> Vec<Token> {
        let config = Config::default();
        Lexer::new(src, 0, &config).tokenize().tokens
    }

    #[test]
    fn captures_simple_body() {
        let src = "script { let x = 1; }";
        let tokens = tokenize(src);
        let open = tokens
            .iter()
            .position(|t| t.kind == TokenKind::LBrace)
            .unwrap();
        let (text, _next) = capture_braced_span(&tokens, open + 1, src);
        assert_eq!(text.trim(), "let x = 1;");
    }

    #[test]
    fn nested_braces_are_preserved() {
        let src = "script { if (a) { b(); } }";
        let tokens = tokenize(src);
        let open = tokens
            .iter()
            .position(|t| t.kind == TokenKind::LBrace)
            .unwrap();
        let (text, _next) = capture_braced_span(&tokens, open + 1, src);
        assert_eq!(text.trim(), "if (a) { b(); }");
    }
}
