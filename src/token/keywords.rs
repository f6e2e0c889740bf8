//! Keyword, bracketed-block and type-prefix registries.
//!
//! Populated as plain match tables — the keyword set is small and
//! fixed, and config-driven aliases (see [`crate::config`]) are layered
//! on top at lex time rather than mutating this table.

use super::TokenKind;

/// Classify a bare word as a CHTL keyword, if it is one.
pub fn keyword_kind(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match word {
        "text" => Text,
        "style" => Style,
        "script" => Script,
        "inherit" => Inherit,
        "delete" => Delete,
        "insert" => Insert,
        "after" => After,
        "before" => Before,
        "replace" => Replace,
        "top" => Top,
        "bottom" => Bottom,
        "from" => From,
        "as" => As,
        "except" => Except,
        "use" => Use,
        "html5" => Html5,
        _ => return None,
    })
}

/// Classify a bracketed tag's interior word (already stripped of `[` `]`).
pub fn block_kind(name: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match name {
        "Template" => BlockTemplate,
        "Custom" => BlockCustom,
        "Origin" => BlockOrigin,
        "Import" => BlockImport,
        "Configuration" => BlockConfiguration,
        "Namespace" => BlockNamespace,
        "Name" => BlockName,
        "OriginType" => BlockOriginType,
        "Info" => BlockInfo,
        "Export" => BlockExport,
        _ => return None,
    })
}

/// Classify a `@Word` type prefix. Anything not one of the builtins is
/// still a type prefix (`AtCustomType`), unless the caller disables
/// recognizing custom origin types (`DISABLE_CUSTOM_ORIGIN_TYPE`) —
/// that policy is applied by the caller, not here.
pub fn type_prefix_kind(word: &str) -> TokenKind {
    use TokenKind::*;
    match word {
        "Style" => AtStyle,
        "Element" => AtElement,
        "Var" => AtVar,
        "Html" => AtHtml,
        "JavaScript" => AtJavaScript,
        "Chtl" => AtChtl,
        "CJmod" => AtCJmod,
        "Config" => AtConfig,
        _ => AtCustomType,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_core_keywords() {
        assert_eq!(keyword_kind("inherit"), Some(TokenKind::Inherit));
        assert_eq!(keyword_kind("at"), None);
    }

    #[test]
    fn recognizes_blocks_and_prefixes() {
        assert_eq!(block_kind("Template"), Some(TokenKind::BlockTemplate));
        assert_eq!(block_kind("Bogus"), None);
        assert_eq!(type_prefix_kind("Style"), TokenKind::AtStyle);
        assert_eq!(type_prefix_kind("Vue"), TokenKind::AtCustomType);
    }
}
