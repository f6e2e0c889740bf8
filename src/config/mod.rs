//! Configuration resolver.
//!
//! A `[Configuration]` block customizes compiler behavior and can
//! rename keywords and type prefixes via a nested `[Name]` block, or
//! register custom `[Origin]` type names via `[OriginType]`. Aliases
//! apply only to lexing that happens after the block is resolved — the
//! lexer consults the config passed in at construction time, it never
//! rewrites already-emitted tokens.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub index_initial_count: i64,
    pub disable_name_group: bool,
    pub disable_custom_origin_type: bool,
    pub debug_mode: bool,
    pub disable_style_auto_add_class: bool,
    pub disable_style_auto_add_id: bool,
    pub disable_script_auto_add_class: bool,
    pub disable_script_auto_add_id: bool,
    pub disable_default_namespace: bool,

    /// Canonical keyword/type-prefix name -> accepted alias spellings,
    /// as written in a `[Name]` block (e.g. `STYLE = [style, css];`).
    name_groups: HashMap<String, Vec<String>>,
    /// Reverse index built from `name_groups`: alias spelling ->
    /// canonical keyword, used by the lexer.
    alias_to_keyword: HashMap<String, String>,
    /// `[OriginType]` registrations: custom origin type name -> the
    /// builtin type it behaves like (`Html`, `Style`, `JavaScript`).
    origin_types: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_initial_count: 0,
            disable_name_group: true,
            disable_custom_origin_type: false,
            debug_mode: false,
            disable_style_auto_add_class: false,
            disable_style_auto_add_id: false,
            disable_script_auto_add_class: true,
            disable_script_auto_add_id: true,
            disable_default_namespace: false,
            name_groups: HashMap::new(),
            alias_to_keyword: HashMap::new(),
            origin_types: HashMap::new(),
        }
    }
}

impl Config {
    /// Registers an alias group for a canonical keyword, e.g.
    /// `register_aliases("text", ["text", "plaintext"])`. Rebuilds the
    /// reverse index. A no-op while `disable_name_group` is set (the
    /// default) — `[Name]` blocks only take effect once a
    /// `[Configuration]` block flips that flag off.
    pub fn register_aliases(&mut self, canonical: &str, aliases: Vec<String>) {
        for alias in &aliases {
            self.alias_to_keyword
                .insert(alias.clone(), canonical.to_string());
        }
        self.name_groups.insert(canonical.to_string(), aliases);
    }

    pub fn register_origin_type(&mut self, name: &str, behaves_like: &str) {
        self.origin_types
            .insert(name.to_string(), behaves_like.to_string());
    }

    /// Resolve a bare identifier through the `[Name]` alias table. Only
    /// consulted when name-group aliasing is enabled; returns `None`
    /// otherwise so the caller falls back to the plain spelling.
    pub fn resolve_alias<'a>(&'a self, word: &'a str) -> Option<&'a str> {
        if self.disable_name_group {
            return None;
        }
        self.alias_to_keyword.get(word).map(String::as_str)
    }

    /// Resolve a `@Word` type-prefix spelling through the alias table.
    pub fn resolve_type_alias(&self, word: &str) -> Option<String> {
        if self.disable_name_group {
            return None;
        }
        self.alias_to_keyword.get(word).cloned()
    }

    pub fn origin_type(&self, name: &str) -> Option<&str> {
        self.origin_types.get(name).map(String::as_str)
    }

    /// Merge semantics for multiple `[Configuration]` blocks in one
    /// file: later blocks override earlier scalar fields and extend
    /// the alias/origin-type tables.
    pub fn merge(&mut self, other: &Config) {
        self.index_initial_count = other.index_initial_count;
        self.disable_name_group = other.disable_name_group;
        self.disable_custom_origin_type = other.disable_custom_origin_type;
        self.debug_mode = other.debug_mode;
        self.disable_style_auto_add_class = other.disable_style_auto_add_class;
        self.disable_style_auto_add_id = other.disable_style_auto_add_id;
        self.disable_script_auto_add_class = other.disable_script_auto_add_class;
        self.disable_script_auto_add_id = other.disable_script_auto_add_id;
        self.disable_default_namespace = other.disable_default_namespace;
        for (canonical, aliases) in &other.name_groups {
            self.register_aliases(canonical, aliases.clone());
        }
        for (name, behaves_like) in &other.origin_types {
            self.register_origin_type(name, behaves_like);
        }
    }

    /// Applies one recognized `[Configuration]` option key to this
    /// config. Unrecognized keys are ignored rather than reported — an
    /// unknown key in a `[Configuration]` block is not itself an error.
    pub fn apply_option(&mut self, key: &str, value: &str) {
        match key {
            "INDEX_INITIAL_COUNT" => {
                if let Ok(n) = value.parse() {
                    self.index_initial_count = n;
                }
            }
            "DEBUG_MODE" => self.debug_mode = parse_bool(value),
            "DISABLE_NAME_GROUP" => self.disable_name_group = parse_bool(value),
            "DISABLE_CUSTOM_ORIGIN_TYPE" => self.disable_custom_origin_type = parse_bool(value),
            "DISABLE_STYLE_AUTO_ADD_CLASS" => self.disable_style_auto_add_class = parse_bool(value),
            "DISABLE_STYLE_AUTO_ADD_ID" => self.disable_style_auto_add_id = parse_bool(value),
            "DISABLE_SCRIPT_AUTO_ADD_CLASS" => self.disable_script_auto_add_class = parse_bool(value),
            "DISABLE_SCRIPT_AUTO_ADD_ID" => self.disable_script_auto_add_id = parse_bool(value),
            "DISABLE_DEFAULT_NAMESPACE" => self.disable_default_namespace = parse_bool(value),
            _ => {}
        }
    }

    /// Folds one parsed `[Configuration]` block's options, `[Name]`
    /// aliases and `[OriginType]` registrations into this config.
    /// Multiple `[Configuration]` blocks in one compilation are merged
    /// this way, one call per block.
    pub fn apply_configuration_data(&mut self, data: &crate::ast::ConfigurationData) {
        for (key, value) in &data.options {
            self.apply_option(key, value);
        }
        for (canonical, aliases) in &data.name_groups {
            self.register_aliases(canonical, aliases.clone());
        }
        for (name, behaves_like) in &data.origin_types {
            self.register_origin_type(name, behaves_like);
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "true" | "1" | "yes")
}

/// Scans a token stream — lexed with a default `Config`, since
/// bracket-tag recognition never depends on keyword aliases — for
/// every *unnamed* top-level `[Configuration]` block and folds them
/// into a fresh `Config`, in document order. A named
/// `@Config Name` block is a selectable, inert definition until
/// explicitly activated (by a matching `[Import] @Config`); it is
/// skipped here, not auto-applied.
///
/// This two-pass shape (prescan to resolve aliases, then the real lex
/// with [`Lexer::new`] against the resolved config) implements
/// "aliases apply to subsequent input, not retroactively": the parser
/// consumes a fully-materialized token slice rather than pulling
/// tokens from a live, stateful lexer, so "subsequent input" is
/// realized as "every token after the prescan, not the prescan's own
/// tokens" (see DESIGN.md for the full rationale).
pub fn prescan(tokens: &[Token]) -> Config {
    let mut config = Config::default();
    let mut i = 0usize;
    while i < tokens.len() {
        if tokens[i].kind == TokenKind::BlockConfiguration {
            let mut j = i + 1;
            if j < tokens.len() && tokens[j].kind == TokenKind::AtConfig {
                j += 2; // `@Config`, name
                if j < tokens.len() && tokens[j].kind == TokenKind::LBrace {
                    j = skip_balanced(tokens, j);
                }
                i = j;
                continue;
            }
            if j < tokens.len() && tokens[j].kind == TokenKind::LBrace {
                let (data, end) = scan_configuration_body(tokens, j + 1);
                config.apply_configuration_data(&data);
                i = end;
                continue;
            }
        }
        i += 1;
    }
    config
}

/// Finds a single *named* `[Configuration] @Config Name { ... }`
/// block by name, used by `[Import] @Config` to activate a
/// previously-inert named configuration.
pub fn prescan_named(tokens: &[Token], wanted: &str) -> Option<Config> {
    let mut i = 0usize;
    while i < tokens.len() {
        if tokens[i].kind == TokenKind::BlockConfiguration {
            let mut j = i + 1;
            if j < tokens.len() && tokens[j].kind == TokenKind::AtConfig {
                let name = tokens.get(j + 1).map(|t| t.lexeme.as_str()).unwrap_or_default();
                let body_start = j + 2;
                if name == wanted && tokens.get(body_start).map(|t| t.kind) == Some(TokenKind::LBrace) {
                    let (data, _) = scan_configuration_body(tokens, body_start + 1);
                    let mut config = Config::default();
                    config.apply_configuration_data(&data);
                    return Some(config);
                }
                if tokens.get(body_start).map(|t| t.kind) == Some(TokenKind::LBrace) {
                    i = skip_balanced(tokens, body_start);
                    continue;
                }
            }
        }
        i += 1;
    }
    None
}

fn skip_balanced(tokens: &[Token], open_brace: usize) -> usize {
    let mut depth = 1i32;
    let mut k = open_brace + 1;
    while k < tokens.len() && depth > 0 {
        match tokens[k].kind {
            TokenKind::LBrace => depth += 1,
            TokenKind::RBrace => depth -= 1,
            _ => {}
        }
        k += 1;
    }
    k
}

/// Parses the body of an unnamed `[Configuration] { ... }` block
/// starting just after its opening `{`, returning the data and the
/// index just past the matching `}`. Mirrors
/// `Parser::parse_configuration`'s grammar over a bare
/// token slice, since this runs before a `Config` exists to build a
/// full `Parser` with.
fn scan_configuration_body(tokens: &[Token], mut i: usize) -> (crate::ast::ConfigurationData, usize) {
    use crate::ast::ConfigurationData;
    let mut data = ConfigurationData::default();
    while i < tokens.len() && tokens[i].kind != TokenKind::RBrace {
        match tokens[i].kind {
            TokenKind::BlockName => {
                i += 1;
                if tokens.get(i).map(|t| t.kind) == Some(TokenKind::LBrace) {
                    i += 1;
                    while i < tokens.len() && tokens[i].kind != TokenKind::RBrace {
                        let canonical = tokens[i].lexeme.clone();
                        i += 1;
                        if tokens.get(i).map(|t| t.kind.is_assign_like()) == Some(true) {
                            i += 1;
                        }
                        let mut aliases = Vec::new();
                        if tokens.get(i).map(|t| t.kind) == Some(TokenKind::LBracket) {
                            i += 1;
                            while i < tokens.len() && tokens[i].kind != TokenKind::RBracket {
                                if tokens[i].kind != TokenKind::Comma {
                                    aliases.push(tokens[i].lexeme.clone());
                                }
                                i += 1;
                            }
                            i += 1; // `]`
                        } else if i < tokens.len() {
                            aliases.push(tokens[i].lexeme.clone());
                            i += 1;
                        }
                        if tokens.get(i).map(|t| t.kind) == Some(TokenKind::Semicolon) {
                            i += 1;
                        }
                        data.name_groups.push((canonical, aliases));
                    }
                    i += 1; // `}`
                }
            }
            TokenKind::BlockOriginType => {
                i += 1;
                if tokens.get(i).map(|t| t.kind) == Some(TokenKind::LBrace) {
                    i += 1;
                    while i < tokens.len() && tokens[i].kind != TokenKind::RBrace {
                        let key = tokens[i].lexeme.clone();
                        i += 1;
                        if tokens.get(i).map(|t| t.kind.is_assign_like()) == Some(true) {
                            i += 1;
                        }
                        let value = tokens.get(i).map(|t| t.lexeme.clone()).unwrap_or_default();
                        i += 1;
                        if tokens.get(i).map(|t| t.kind) == Some(TokenKind::Semicolon) {
                            i += 1;
                        }
                        data.origin_types.push((key, value));
                    }
                    i += 1; // `}`
                }
            }
            TokenKind::Eof => break,
            _ => {
                let key = tokens[i].lexeme.clone();
                i += 1;
                if tokens.get(i).map(|t| t.kind.is_assign_like()) == Some(true) {
                    i += 1;
                }
                let value = tokens.get(i).map(|t| t.lexeme.clone()).unwrap_or_default();
                i += 1;
                if tokens.get(i).map(|t| t.kind) == Some(TokenKind::Semicolon) {
                    i += 1;
                }
                data.options.push((key, value));
            }
        }
    }
    (data, (i + 1).min(tokens.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_global_map() {
        let config = Config::default();
        assert_eq!(config.index_initial_count, 0);
        assert!(config.disable_name_group);
        assert!(!config.disable_custom_origin_type);
        assert!(!config.debug_mode);
        assert!(config.disable_script_auto_add_class);
        assert!(config.disable_script_auto_add_id);
        assert!(!config.disable_style_auto_add_class);
        assert!(!config.disable_style_auto_add_id);
    }

    #[test]
    fn alias_resolution_requires_name_group_enabled() {
        let mut config = Config::default();
        config.register_aliases("text", vec!["plaintext".to_string()]);
        assert_eq!(config.resolve_alias("plaintext"), None);
        config.disable_name_group = false;
        assert_eq!(config.resolve_alias("plaintext"), Some("text"));
    }

    #[test]
    fn merge_overrides_scalars_and_extends_tables() {
        let mut base = Config::default();
        let mut patch = Config::default();
        patch.disable_name_group = false;
        patch.register_origin_type("Vue", "Html");
        base.merge(&patch);
        assert!(!base.disable_name_group);
        assert_eq!(base.origin_type("Vue"), Some("Html"));
    }
}
