//! Style-block selector parsing.
//!
//! The prefix character decides the selector kind; pseudo-class/element
//! suffixes (`:hover`, `::before`) attach to whatever base preceded them,
//! producing a [`SelectorKind::Compound`]. `&` is resolved later, at
//! codegen time — here it is just recorded as `Context`.

use crate::ast::SelectorKind;
use crate::token::TokenKind;

use super::Parser;

/// Parses one selector (base plus any pseudo suffix) and returns it
/// along with the raw lexeme sequence, kept for diagnostics.
pub fn parse_selector(parser: &mut Parser<'_>) -> (SelectorKind, String) {
    let mut raw = String::new();
    let base = parse_base(parser, &mut raw);
    parse_suffix(parser, base, &mut raw)
}

fn parse_base(parser: &mut Parser<'_>, raw: &mut String) -> SelectorKind {
    match parser.peek_kind() {
        TokenKind::Dot => {
            parser.advance();
            let name = parser.advance();
            raw.push('.');
            raw.push_str(&name.lexeme);
            SelectorKind::Class(name.lexeme)
        }
        TokenKind::Hash => {
            parser.advance();
            let name = parser.advance();
            raw.push('#');
            raw.push_str(&name.lexeme);
            SelectorKind::Id(name.lexeme)
        }
        TokenKind::Ampersand => {
            parser.advance();
            raw.push('&');
            SelectorKind::Context
        }
        TokenKind::Colon => SelectorKind::Context,
        _ => {
            let name = parser.advance();
            raw.push_str(&name.lexeme);
            SelectorKind::Element(name.lexeme)
        }
    }
}

fn parse_suffix(
    parser: &mut Parser<'_>,
    base: SelectorKind,
    raw: &mut String,
) -> (SelectorKind, String) {
    if !parser.check(TokenKind::Colon) {
        return (base, std::mem::take(raw));
    }
    parser.advance();
    let is_pseudo_element = parser.check(TokenKind::Colon);
    if is_pseudo_element {
        parser.advance();
    }
    let name = parser.advance();
    raw.push_str(if is_pseudo_element { "::" } else { ":" });
    raw.push_str(&name.lexeme);
    let suffix = if is_pseudo_element {
        SelectorKind::PseudoElement(name.lexeme)
    } else {
        SelectorKind::PseudoClass(name.lexeme)
    };
    (
        SelectorKind::Compound(Box::new(base), Box::new(suffix)),
        std::mem::take(raw),
    )
}

#[cfg(test)]
mod tests {
    use crate::ast::SelectorKind;
    use crate::config::Config;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn selector_of(src: &str) -> SelectorKind {
        let config = Config::default();
        let tokens = Lexer::new(src, 0, &config).tokenize().tokens;
        let mut parser = Parser::new(&tokens, src, 0, &config);
        super::parse_selector(&mut parser).0
    }

    #[test]
    fn class_selector() {
        assert_eq!(selector_of(".box"), SelectorKind::Class("box".to_string()));
    }

    #[test]
    fn id_selector() {
        assert_eq!(selector_of("#main"), SelectorKind::Id("main".to_string()));
    }

    #[test]
    fn context_pseudo_class() {
        match selector_of("&:hover") {
            SelectorKind::Compound(base, suffix) => {
                assert_eq!(*base, SelectorKind::Context);
                assert_eq!(*suffix, SelectorKind::PseudoClass("hover".to_string()));
            }
            other => panic!("expected compound selector, got {other:?}"),
        }
    }

    #[test]
    fn context_pseudo_element() {
        match selector_of("&::before") {
            SelectorKind::Compound(base, suffix) => {
                assert_eq!(*base, SelectorKind::Context);
                assert_eq!(*suffix, SelectorKind::PseudoElement("before".to_string()));
            }
            other => panic!("expected compound selector, got {other:?}"),
        }
    }
}
