//! Recursive-descent parser.
//!
//! One-token lookahead (two-token only for the `at top`/`at bottom`
//! compound keyword), driven over a pre-lexed token slice rather than
//! pulling from a live `Lexer` — simpler to reason about than a
//! streaming tokenizer. State transitions are guarded through
//! [`state::ParseStateStack`]; declarations are registered into the
//! [`crate::registry::Registry`] as they are parsed, so the registry
//! and scope are populated incrementally during this phase rather than
//! in a separate pass.

pub mod selector;
pub mod state;

use ego_tree::NodeId;

use crate::ast::{
    AstNode, AttributeData, AttributeValue, CommentData, ConfigurationData, DefData, DefKind,
    ElementData, ImportData, ImportKind, NamespaceData, NodeKind, OperationData, OperationKind,
    OriginData, OriginKind, PropertyData, ScriptData, SelectiveImport, SelectiveKind, TextData,
};
use crate::ast::Ast;
use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::lexer::capture_braced_span;
use crate::registry::{CustomEntity, OriginEntity, Registry, TemplateEntity};
use crate::scope::{FrameKind, ScopeStack};
use crate::token::{Position, Token, TokenKind};

use state::{ContextType, ParseState, ParseStateStack};

pub struct ParseOutput {
    pub ast: Ast,
    pub registry: Registry,
    pub diagnostics: DiagnosticBag,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    source: &'a str,
    file: u32,
    pos: usize,
    config: &'a Config,
    ast: Ast,
    registry: Registry,
    scope: ScopeStack,
    state: ParseStateStack,
    diagnostics: DiagnosticBag,
    allow_partial: bool,
}

const RESYNC: &[TokenKind] = &[
    TokenKind::Semicolon,
    TokenKind::RBrace,
    TokenKind::RBracket,
    TokenKind::Eof,
];

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], source: &'a str, file: u32, config: &'a Config) -> Self {
        Self {
            tokens,
            source,
            file,
            pos: 0,
            config,
            ast: Ast::new(file),
            registry: Registry::new(),
            scope: ScopeStack::new(),
            state: ParseStateStack::new(),
            diagnostics: DiagnosticBag::new(),
            allow_partial: true,
        }
    }

    pub fn parse(mut self) -> ParseOutput {
        let root = self.ast.root_id();
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                _ => self.parse_top_level_item(root),
            }
        }
        ParseOutput {
            ast: self.ast,
            registry: self.registry,
            diagnostics: self.diagnostics,
        }
    }

    // --- cursor helpers -------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            let tok = self.peek().clone();
            self.error(
                DiagnosticKind::UnexpectedToken,
                tok.position,
                format!("expected {what}, found {:?} ({:?})", tok.kind, tok.lexeme),
            );
            None
        }
    }

    fn eat_semicolon(&mut self) {
        if !self.eat(TokenKind::Semicolon) {
            let tok = self.peek().clone();
            self.error(DiagnosticKind::MissingSemicolon, tok.position, "expected ';'");
        }
    }

    /// Consumes every token up to (not including) the next
    /// `; } EOF`, returning the exact source text those tokens span
    /// rather than their lexemes space-joined back together. A
    /// property/attribute value like `10px` or `#fff` lexes as more
    /// than one token (`scan.rs`'s `read_number` stops at the first
    /// non-digit), so reconstructing it from lexemes would insert
    /// whitespace that was never there; slicing the source span
    /// between the first consumed token and the terminator — the same
    /// technique `lexer::capture_braced_span` uses for raw blocks —
    /// preserves it byte-for-byte.
    fn capture_value_span(&mut self) -> String {
        let start = self.peek().position.byte_offset as usize;
        while !matches!(self.peek_kind(), TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof) {
            self.advance();
        }
        let end = self.peek().position.byte_offset as usize;
        self.source.get(start..end.max(start)).unwrap_or("").trim().to_string()
    }

    fn error(&mut self, kind: DiagnosticKind, position: Position, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(kind, position, message));
    }

    fn resync(&mut self) {
        while !RESYNC.contains(&self.peek_kind()) {
            self.advance();
        }
        if self.check(TokenKind::Semicolon) || self.check(TokenKind::RBrace) {
            self.advance();
        }
    }

    // --- top level --------------------------------------------------------

    fn parse_top_level_item(&mut self, parent: NodeId) {
        match self.peek_kind() {
            TokenKind::HtmlElementIdent | TokenKind::Identifier => self.parse_element(parent),
            TokenKind::BlockTemplate => self.parse_def_decl(parent, true),
            TokenKind::BlockCustom => self.parse_def_decl(parent, false),
            TokenKind::BlockOrigin => self.parse_origin(parent),
            TokenKind::BlockImport => self.parse_import(parent),
            TokenKind::BlockConfiguration => self.parse_configuration(parent),
            TokenKind::BlockNamespace => self.parse_namespace(parent),
            TokenKind::GeneratorComment => self.parse_generator_comment(parent),
            TokenKind::Use => self.parse_use(parent),
            TokenKind::LineComment | TokenKind::BlockComment => {
                self.advance();
            }
            _ => {
                let tok = self.peek().clone();
                self.error(
                    DiagnosticKind::IllegalConstruct,
                    tok.position,
                    format!("unexpected token at top level: {:?}", tok.kind),
                );
                self.resync();
            }
        }
    }

    fn parse_use(&mut self, parent: NodeId) {
        let pos = self.peek().position;
        self.advance(); // `use`
        let target = self.advance();
        self.eat_semicolon();
        let node = AstNode::new(
            NodeKind::Operation(OperationData {
                kind: OperationKind::Use,
                target: target.lexeme,
            }),
            pos,
        );
        self.ast.append_child(parent, node);
    }

    fn parse_generator_comment(&mut self, parent: NodeId) {
        let tok = self.advance();
        let node = AstNode::new(
            NodeKind::Comment(CommentData { text: tok.lexeme }),
            tok.position,
        );
        self.ast.append_child(parent, node);
    }

    // --- elements -----------------------------------------------------

    fn parse_element(&mut self, parent: NodeId) {
        let tag_tok = self.advance();
        if tag_tok.kind == TokenKind::Identifier
            && !crate::token::html::is_html_element(&tag_tok.lexeme)
        {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::UnknownHtmlElement,
                    tag_tok.position,
                    format!("'{}' is not a known HTML element", tag_tok.lexeme),
                ),
            );
        }
        let guard = self.state.enter(ParseState::InElement, ContextType::Element);
        let guard = match guard {
            Ok(g) => g,
            Err(msg) => {
                self.error(DiagnosticKind::IllegalConstruct, tag_tok.position, msg);
                return;
            }
        };
        self.state.set_current_element(tag_tok.lexeme.clone());
        self.scope.push(tag_tok.lexeme.clone(), FrameKind::Element);

        let element = AstNode::new(
            NodeKind::Element(ElementData::new(tag_tok.lexeme.clone())),
            tag_tok.position,
        );
        let node_id = self.ast.append_child(parent, element);

        if self.expect(TokenKind::LBrace, "'{'").is_some() {
            self.parse_element_body(node_id);
            self.expect(TokenKind::RBrace, "'}'");
        }

        self.scope.pop();
        drop(guard);
    }

    fn parse_element_body(&mut self, element: NodeId) {
        let mut last_reference: Option<NodeId> = None;
        loop {
            match self.peek_kind() {
                TokenKind::RBrace | TokenKind::Eof => return,
                TokenKind::HtmlElementIdent => {
                    self.parse_element(element);
                    last_reference = None;
                }
                TokenKind::Identifier => {
                    if self.peek_at(1).kind.is_assign_like() {
                        self.parse_attribute(element);
                    } else {
                        self.parse_element(element);
                    }
                    last_reference = None;
                }
                TokenKind::Text => {
                    self.parse_text_block(element);
                    last_reference = None;
                }
                TokenKind::Style => {
                    self.parse_style_block(element);
                    last_reference = None;
                }
                TokenKind::Script => {
                    self.parse_script_block(element);
                    last_reference = None;
                }
                TokenKind::BlockOrigin => {
                    self.parse_origin(element);
                    last_reference = None;
                }
                TokenKind::GeneratorComment => self.parse_generator_comment(element),
                TokenKind::Delete | TokenKind::Insert | TokenKind::Replace | TokenKind::Inherit => {
                    self.parse_inline_spec_op(last_reference);
                }
                kind if kind.is_type_prefix() => {
                    last_reference = Some(self.parse_type_use_site(element));
                }
                TokenKind::LineComment | TokenKind::BlockComment => {
                    self.advance();
                }
                _ => {
                    let tok = self.peek().clone();
                    self.error(
                        DiagnosticKind::IllegalConstruct,
                        tok.position,
                        format!("unexpected token in element body: {:?}", tok.kind),
                    );
                    self.resync();
                }
            }
        }
    }

    fn parse_attribute(&mut self, element: NodeId) {
        let name_tok = self.advance();
        self.advance(); // `:` or `=`
        let value = self.parse_attribute_value();
        self.eat_semicolon();
        match (&name_tok.lexeme[..], &value) {
            ("id", AttributeValue::Text { value, .. }) => {
                if let Some(mut n) = self.ast.get_mut(element) {
                    if let Some(e) = n.value().as_element_mut() {
                        e.id = Some(value.clone());
                    }
                }
            }
            ("class", AttributeValue::Text { value, .. }) => {
                if let Some(mut n) = self.ast.get_mut(element) {
                    if let Some(e) = n.value().as_element_mut() {
                        for class in value.split_whitespace() {
                            e.add_class(class);
                        }
                    }
                }
            }
            _ => {}
        }
        let node = AstNode::new(
            NodeKind::Attribute(AttributeData {
                name: name_tok.lexeme,
                value,
            }),
            name_tok.position,
        );
        self.ast.append_child(element, node);
    }

    fn parse_attribute_value(&mut self) -> AttributeValue {
        match self.peek_kind() {
            TokenKind::StringLiteral => {
                let tok = self.advance();
                AttributeValue::Text {
                    value: tok.lexeme,
                    is_literal: true,
                }
            }
            TokenKind::NumberLiteral => AttributeValue::Number(self.advance().lexeme),
            TokenKind::Identifier if self.peek_at(1).kind == TokenKind::LParen => {
                self.parse_var_ref()
            }
            kind if kind.is_type_prefix() => {
                AttributeValue::TypedBlockRef(self.advance().lexeme)
            }
            _ => {
                let tok = self.advance();
                AttributeValue::Text {
                    value: tok.lexeme,
                    is_literal: false,
                }
            }
        }
    }

    fn parse_var_ref(&mut self) -> AttributeValue {
        let group = self.advance().lexeme;
        self.expect(TokenKind::LParen, "'('");
        let name = self.advance().lexeme;
        let default = if self.peek_kind().is_assign_like() {
            self.advance();
            Some(self.advance().lexeme)
        } else {
            None
        };
        self.expect(TokenKind::RParen, "')'");
        AttributeValue::VarRef {
            group,
            name,
            default,
        }
    }

    fn parse_text_block(&mut self, parent: NodeId) {
        let pos = self.peek().position;
        self.advance(); // `text`
        self.expect(TokenKind::LBrace, "'{'");
        let (value, is_literal) = match self.peek_kind() {
            TokenKind::StringLiteral => (self.advance().lexeme, true),
            TokenKind::RBrace => (String::new(), true),
            _ => (self.advance().lexeme, false),
        };
        self.expect(TokenKind::RBrace, "'}'");
        let node = AstNode::new(NodeKind::Text(TextData { value, is_literal }), pos);
        self.ast.append_child(parent, node);
    }

    // --- style / script blocks -----------------------------------------

    fn parse_style_block(&mut self, element: NodeId) {
        let pos = self.peek().position;
        self.advance(); // `style`
        let guard = self.state.enter(ParseState::InStyleBlock, ContextType::LocalStyle);
        if let Some(mut n) = self.ast.get_mut(element) {
            if let Some(e) = n.value().as_element_mut() {
                e.has_style = true;
            }
        }
        let style_node = AstNode::new(NodeKind::Style, pos);
        let style_id = self.ast.append_child(element, style_node);
        self.expect(TokenKind::LBrace, "'{'");
        self.parse_style_body(style_id, element);
        self.expect(TokenKind::RBrace, "'}'");
        drop(guard);
    }

    fn parse_style_body(&mut self, style: NodeId, owning_element: NodeId) {
        let mut last_reference: Option<NodeId> = None;
        loop {
            match self.peek_kind() {
                TokenKind::RBrace | TokenKind::Eof => return,
                TokenKind::Dot | TokenKind::Hash | TokenKind::Ampersand | TokenKind::Colon => {
                    self.parse_style_rule(style, owning_element);
                    last_reference = None;
                }
                kind if kind.is_type_prefix() => {
                    last_reference = Some(self.parse_type_use_site(style));
                }
                TokenKind::Identifier => {
                    if self.peek_at(1).kind.is_assign_like() {
                        self.parse_property(style);
                    } else {
                        self.parse_style_rule(style, owning_element);
                    }
                    last_reference = None;
                }
                TokenKind::HtmlElementIdent => {
                    self.parse_style_rule(style, owning_element);
                    last_reference = None;
                }
                TokenKind::Delete | TokenKind::Insert | TokenKind::Replace => {
                    self.parse_inline_spec_op(last_reference);
                }
                TokenKind::Inherit => {
                    let tok = self.peek().clone();
                    self.error(
                        DiagnosticKind::IllegalConstruct,
                        tok.position,
                        "'inherit' is only valid inside a [Template]/[Custom] body",
                    );
                    self.resync();
                }
                TokenKind::LineComment | TokenKind::BlockComment => {
                    self.advance();
                }
                _ => {
                    let tok = self.peek().clone();
                    self.error(
                        DiagnosticKind::IllegalConstruct,
                        tok.position,
                        format!("unexpected token in style block: {:?}", tok.kind),
                    );
                    self.resync();
                }
            }
        }
    }

    fn parse_property(&mut self, parent: NodeId) {
        let name_tok = self.advance();
        self.advance(); // `:` or `=`
        let mut value = self.capture_value_span();
        let important = value.trim_end().ends_with("!important");
        if important {
            value = value.trim_end().trim_end_matches("!important").trim_end().to_string();
        }
        self.eat_semicolon();
        let node = AstNode::new(
            NodeKind::Property(PropertyData {
                name: name_tok.lexeme,
                value,
                important,
            }),
            name_tok.position,
        );
        self.ast.append_child(parent, node);
    }

    fn parse_style_rule(&mut self, style: NodeId, owning_element: NodeId) {
        let (kind, raw) = selector::parse_selector(self);
        if let (crate::ast::SelectorKind::Class(name), true) = (&kind, true) {
            if !self.config.disable_style_auto_add_class {
                if let Some(mut n) = self.ast.get_mut(owning_element) {
                    if let Some(e) = n.value().as_element_mut() {
                        e.add_class(name.clone());
                    }
                }
            }
        }
        if let crate::ast::SelectorKind::Id(name) = &kind {
            if !self.config.disable_style_auto_add_id {
                let mut had_id = false;
                if let Some(mut n) = self.ast.get_mut(owning_element) {
                    if let Some(e) = n.value().as_element_mut() {
                        if e.id.is_none() {
                            e.id = Some(name.clone());
                        } else {
                            had_id = true;
                        }
                    }
                }
                if had_id {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::AutoIdSuppressed,
                        self.peek().position,
                        format!("id '{name}' not applied: element already has an id"),
                    ));
                }
            }
        }
        let pos = self.peek().position;
        let selector_node = AstNode::new(
            NodeKind::Selector(crate::ast::node::SelectorData { kind }),
            pos,
        );
        let selector_id = self.ast.append_child(style, selector_node);
        let _ = raw;
        self.expect(TokenKind::LBrace, "'{'");
        while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
            self.parse_property(selector_id);
        }
        self.expect(TokenKind::RBrace, "'}'");
    }

    fn parse_script_block(&mut self, element: NodeId) {
        let pos = self.peek().position;
        self.advance(); // `script`
        if let Some(mut n) = self.ast.get_mut(element) {
            if let Some(e) = n.value().as_element_mut() {
                e.has_script = true;
            }
        }
        self.expect(TokenKind::LBrace, "'{'");
        let (raw_text, next_idx) = capture_braced_span(self.tokens, self.pos, self.source);
        self.pos = next_idx;
        let node = AstNode::new(NodeKind::Script(ScriptData { raw_text }), pos);
        self.ast.append_child(element, node);
    }

    // --- origin / import / configuration / namespace --------------------

    fn parse_origin(&mut self, parent: NodeId) {
        let pos = self.peek().position;
        self.advance(); // `[Origin]`
        let type_tok = self.advance();
        let kind = match type_tok.kind {
            TokenKind::AtHtml => OriginKind::Html,
            TokenKind::AtStyle => OriginKind::Style,
            TokenKind::AtJavaScript => OriginKind::JavaScript,
            _ => {
                if self.config.disable_custom_origin_type {
                    self.error(
                        DiagnosticKind::InvalidTypePrefix,
                        type_tok.position,
                        "custom origin types are disabled",
                    );
                }
                OriginKind::Custom(type_tok.lexeme.trim_start_matches('@').to_string())
            }
        };
        let name = if self.check(TokenKind::Identifier) {
            Some(self.advance().lexeme)
        } else {
            None
        };
        self.expect(TokenKind::LBrace, "'{'");
        let (raw_text, next_idx) = capture_braced_span(self.tokens, self.pos, self.source);
        self.pos = next_idx;
        self.registry.register_origin(
            name.clone(),
            OriginEntity {
                name: name.clone(),
                kind: format!("{kind:?}"),
                raw_text: raw_text.clone(),
                namespace_path: self.registry.current_namespace.clone(),
            },
        );
        let node = AstNode::new(
            NodeKind::Origin(OriginData {
                name,
                kind,
                raw_text,
            }),
            pos,
        );
        self.ast.append_child(parent, node);
    }

    fn parse_import(&mut self, parent: NodeId) {
        let pos = self.peek().position;
        self.advance(); // `[Import]`
        let selective = if self.check(TokenKind::BlockTemplate)
            || self.check(TokenKind::BlockCustom)
            || self.check(TokenKind::BlockOrigin)
        {
            let kind = match self.advance().kind {
                TokenKind::BlockTemplate => SelectiveKind::Template,
                TokenKind::BlockCustom => SelectiveKind::Custom,
                _ => SelectiveKind::Origin,
            };
            let type_prefix = self.advance().lexeme;
            let name = self.advance().lexeme;
            Some(SelectiveImport {
                kind,
                type_prefix,
                name,
            })
        } else {
            None
        };
        let type_tok = self.advance();
        let kind = match type_tok.kind {
            TokenKind::AtHtml => ImportKind::Html,
            TokenKind::AtStyle => ImportKind::Style,
            TokenKind::AtJavaScript => ImportKind::JavaScript,
            TokenKind::AtCJmod => ImportKind::CJmod,
            TokenKind::AtConfig => ImportKind::Config,
            _ => ImportKind::Chtl,
        };
        if self.check(TokenKind::From) {
            self.advance();
        }
        let path_tok = self.expect(TokenKind::StringLiteral, "import path string");
        let logical_path = path_tok.map(|t| t.lexeme).unwrap_or_default();
        let alias = if self.check(TokenKind::As) {
            self.advance();
            Some(self.advance().lexeme)
        } else {
            None
        };
        self.eat_semicolon();
        self.registry.register_import(crate::registry::ImportEntity {
            logical_path: logical_path.clone(),
            resolved_file_path: None,
            alias: alias.clone(),
            namespace_path: self.registry.current_namespace.clone(),
        });
        let node = AstNode::new(
            NodeKind::Import(ImportData {
                kind,
                logical_path,
                alias,
                selective,
            }),
            pos,
        );
        self.ast.append_child(parent, node);
    }

    fn parse_configuration(&mut self, parent: NodeId) {
        let pos = self.peek().position;
        self.advance(); // `[Configuration]`
        let name = if self.check(TokenKind::AtConfig) {
            self.advance();
            Some(self.advance().lexeme)
        } else {
            None
        };
        self.expect(TokenKind::LBrace, "'{'");
        let mut data = ConfigurationData {
            name,
            ..Default::default()
        };
        while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
            match self.peek_kind() {
                TokenKind::BlockName => {
                    self.advance();
                    self.expect(TokenKind::LBrace, "'{'");
                    while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
                        let canonical = self.advance().lexeme;
                        self.advance(); // `=`
                        let mut aliases = Vec::new();
                        if self.eat(TokenKind::LBracket) {
                            while !self.check(TokenKind::RBracket) && !self.check(TokenKind::Eof) {
                                aliases.push(self.advance().lexeme);
                                self.eat(TokenKind::Comma);
                            }
                            self.eat(TokenKind::RBracket);
                        } else {
                            aliases.push(self.advance().lexeme);
                        }
                        self.eat_semicolon();
                        data.name_groups.push((canonical, aliases));
                    }
                    self.expect(TokenKind::RBrace, "'}'");
                }
                TokenKind::BlockOriginType => {
                    self.advance();
                    self.expect(TokenKind::LBrace, "'{'");
                    while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
                        let key = self.advance().lexeme;
                        self.advance(); // `=`
                        let value = self.advance().lexeme;
                        self.eat_semicolon();
                        data.origin_types.push((key, value));
                    }
                    self.expect(TokenKind::RBrace, "'}'");
                }
                _ => {
                    let key = self.advance().lexeme;
                    if self.peek_kind().is_assign_like() {
                        self.advance();
                    }
                    let value = self.advance().lexeme;
                    self.eat_semicolon();
                    data.options.push((key, value));
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        let node = AstNode::new(NodeKind::Configuration(data), pos);
        self.ast.append_child(parent, node);
    }

    fn parse_namespace(&mut self, parent: NodeId) {
        let pos = self.peek().position;
        self.advance(); // `[Namespace]`
        let name_tok = self.advance();
        let previous = self.registry.current_namespace.clone();
        self.registry.register_namespace(&name_tok.lexeme, if previous.is_empty() { None } else { Some(previous.clone()) });
        self.registry.current_namespace = if previous.is_empty() {
            name_tok.lexeme.clone()
        } else {
            format!("{previous}.{}", name_tok.lexeme)
        };
        self.state.set_current_namespace(self.registry.current_namespace.clone());
        let guard = self.state.enter(ParseState::InNamespace, ContextType::Namespace);
        let node = AstNode::new(
            NodeKind::Namespace(NamespaceData {
                name: name_tok.lexeme,
            }),
            pos,
        );
        let ns_id = self.ast.append_child(parent, node);
        self.expect(TokenKind::LBrace, "'{'");
        while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
            self.parse_top_level_item(ns_id);
        }
        self.expect(TokenKind::RBrace, "'}'");
        self.registry.current_namespace = previous;
        drop(guard);
    }

    // --- template / custom declarations ---------------------------------

    fn def_kind_from_prefix(&self, kind: TokenKind) -> DefKind {
        match kind {
            TokenKind::AtStyle => DefKind::Style,
            TokenKind::AtVar => DefKind::Var,
            _ => DefKind::Element,
        }
    }

    fn parse_def_decl(&mut self, parent: NodeId, is_template: bool) {
        let pos = self.peek().position;
        self.advance(); // `[Template]` / `[Custom]`
        let type_tok = self.advance();
        let def_kind = self.def_kind_from_prefix(type_tok.kind);
        let name_tok = self.advance();

        let (state, context) = match (is_template, def_kind) {
            (true, DefKind::Style) => (ParseState::InTemplate, ContextType::TemplateStyle),
            (true, DefKind::Element) => (ParseState::InTemplate, ContextType::TemplateElement),
            (true, DefKind::Var) => (ParseState::InTemplate, ContextType::TemplateVar),
            (false, DefKind::Style) => (ParseState::InCustom, ContextType::CustomStyle),
            (false, DefKind::Element) => (ParseState::InCustom, ContextType::CustomElement),
            (false, DefKind::Var) => (ParseState::InCustom, ContextType::CustomVar),
        };
        let guard = self.state.enter(state, context);

        let mut body = Ast::new(self.file);
        let body_root = body.root_id();
        let mut inheritance_chain = Vec::new();
        let mut specialization_ops = Vec::new();

        self.expect(TokenKind::LBrace, "'{'");
        while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
            match self.peek_kind() {
                TokenKind::Inherit => {
                    self.advance();
                    self.advance(); // type prefix
                    let target = self.advance().lexeme;
                    self.eat_semicolon();
                    inheritance_chain.push(target);
                }
                kind if kind.is_type_prefix() && def_kind == DefKind::Element => {
                    let prefix = self.advance();
                    let target = self.advance().lexeme;
                    self.eat_semicolon();
                    inheritance_chain.push(target);
                    let _ = prefix;
                }
                TokenKind::Delete if !is_template => {
                    specialization_ops.push(self.parse_delete_op());
                }
                TokenKind::Insert if !is_template => {
                    specialization_ops.push(self.parse_insert_op());
                }
                TokenKind::Replace if !is_template => {
                    specialization_ops.push(self.parse_replace_op());
                }
                TokenKind::Identifier if self.peek_at(1).kind.is_assign_like() => {
                    if !is_template {
                        if let Some(op) = self.parse_modify_or_own_property(&mut body, body_root) {
                            specialization_ops.push(op);
                        }
                    } else {
                        self.parse_property_into(&mut body, body_root);
                    }
                }
                TokenKind::HtmlElementIdent | TokenKind::Identifier => {
                    self.parse_element_into(&mut body, body_root);
                }
                TokenKind::GeneratorComment => {
                    self.advance();
                }
                TokenKind::LineComment | TokenKind::BlockComment => {
                    self.advance();
                }
                _ => {
                    let tok = self.peek().clone();
                    self.error(
                        DiagnosticKind::IllegalConstruct,
                        tok.position,
                        format!("unexpected token in {} body: {:?}", if is_template {"template"} else {"custom"}, tok.kind),
                    );
                    self.resync();
                }
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        drop(guard);

        if is_template {
            let entity = TemplateEntity {
                name: name_tok.lexeme.clone(),
                kind: def_kind,
                namespace_path: self.registry.current_namespace.clone(),
                inheritance_chain,
                parameter_map: Vec::new(),
                required_params: Vec::new(),
                is_abstract: false,
                body,
            };
            if let Err(conflict) = self.registry.register_template(entity) {
                self.diagnostics
                    .push(crate::registry::conflict_diagnostic(&conflict, pos));
            }
        } else {
            let entity = CustomEntity {
                name: name_tok.lexeme.clone(),
                kind: def_kind,
                namespace_path: self.registry.current_namespace.clone(),
                inheritance_chain,
                parameter_map: Vec::new(),
                required_params: Vec::new(),
                specialization_ops,
                allows_specialization: true,
                body,
            };
            if let Err(conflict) = self.registry.register_custom(entity) {
                self.diagnostics
                    .push(crate::registry::conflict_diagnostic(&conflict, pos));
            }
        }

        let node = AstNode::new(
            if is_template {
                NodeKind::Template(DefData {
                    name: name_tok.lexeme,
                    kind: def_kind,
                })
            } else {
                NodeKind::Custom(DefData {
                    name: name_tok.lexeme,
                    kind: def_kind,
                })
            },
            pos,
        );
        self.ast.append_child(parent, node);
    }

    fn parse_delete_op(&mut self) -> crate::ast::SpecOp {
        self.advance(); // `delete`
        if self.peek_kind().is_type_prefix() {
            self.advance();
            let name = self.advance().lexeme;
            self.eat_semicolon();
            return crate::ast::SpecOp::DeleteInheritance(name);
        }
        let target = self.parse_target_token();
        self.eat_semicolon();
        crate::ast::SpecOp::DeleteProperty(target)
    }

    fn parse_insert_op(&mut self) -> crate::ast::SpecOp {
        self.advance(); // `insert`
        let position = self.parse_insert_position();
        let target = self.parse_target_token();
        self.expect(TokenKind::LBrace, "'{'");
        let subtree = self.parse_subtree();
        self.expect(TokenKind::RBrace, "'}'");
        crate::ast::SpecOp::Insert {
            position,
            target,
            subtree,
        }
    }

    fn parse_replace_op(&mut self) -> crate::ast::SpecOp {
        self.advance(); // `replace`
        let target = self.parse_target_token();
        self.expect(TokenKind::LBrace, "'{'");
        let subtree = self.parse_subtree();
        self.expect(TokenKind::RBrace, "'}'");
        crate::ast::SpecOp::ReplaceElement { target, subtree }
    }

    fn parse_insert_position(&mut self) -> crate::ast::InsertPosition {
        use crate::ast::InsertPosition::*;
        match self.peek_kind() {
            TokenKind::After => {
                self.advance();
                After
            }
            TokenKind::Before => {
                self.advance();
                Before
            }
            TokenKind::Replace => {
                self.advance();
                Replace
            }
            TokenKind::Top => {
                self.advance();
                AtTop
            }
            TokenKind::Bottom => {
                self.advance();
                AtBottom
            }
            _ => {
                // `at top` / `at bottom` written as two bare identifiers
                let first = self.advance().lexeme;
                let second = self.advance().lexeme;
                match (first.as_str(), second.as_str()) {
                    (_, "top") => AtTop,
                    (_, "bottom") => AtBottom,
                    _ => AtBottom,
                }
            }
        }
    }

    fn parse_target_token(&mut self) -> crate::ast::SpecTarget {
        if self.check(TokenKind::UnquotedLiteral) && self.peek().lexeme == "*" {
            self.advance();
            return crate::ast::SpecTarget::Wildcard;
        }
        let name_tok = self.advance();
        if self.eat(TokenKind::LBracket) {
            let idx_tok = self.advance();
            let index: i64 = idx_tok.lexeme.parse().unwrap_or(0);
            self.expect(TokenKind::RBracket, "']'");
            if index < self.config.index_initial_count {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::IndexOutOfRange,
                    idx_tok.position,
                    format!("index {index} is below INDEX_INITIAL_COUNT"),
                ));
            }
            crate::ast::SpecTarget::Indexed {
                tag: name_tok.lexeme,
                index,
            }
        } else {
            crate::ast::SpecTarget::Name(name_tok.lexeme)
        }
    }

    fn parse_subtree(&mut self) -> crate::ast::SubtreeData {
        let mut fragment = Ast::new(self.file);
        let root = fragment.root_id();
        while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
            self.parse_element_into(&mut fragment, root);
        }
        crate::ast::node::SubtreeData(std::sync::Arc::new(fragment))
    }

    fn parse_modify_or_own_property(
        &mut self,
        body: &mut Ast,
        body_root: NodeId,
    ) -> Option<crate::ast::SpecOp> {
        let name_tok = self.advance();
        self.advance(); // `:`/`=`
        let value = self.capture_value_span();
        self.eat_semicolon();
        let node = AstNode::new(
            NodeKind::Property(PropertyData {
                name: name_tok.lexeme.clone(),
                value: value.clone(),
                important: false,
            }),
            name_tok.position,
        );
        body.append_child(body_root, node);
        Some(crate::ast::SpecOp::ModifyProperty(name_tok.lexeme, value))
    }

    fn parse_property_into(&mut self, body: &mut Ast, parent: NodeId) {
        let name_tok = self.advance();
        self.advance();
        let value = self.capture_value_span();
        self.eat_semicolon();
        let node = AstNode::new(
            NodeKind::Property(PropertyData {
                name: name_tok.lexeme,
                value,
                important: false,
            }),
            name_tok.position,
        );
        body.append_child(parent, node);
    }

    fn parse_element_into(&mut self, body: &mut Ast, parent: NodeId) {
        let tag_tok = self.advance();
        let element = AstNode::new(
            NodeKind::Element(ElementData::new(tag_tok.lexeme)),
            tag_tok.position,
        );
        let node_id = body.append_child(parent, element);
        if self.expect(TokenKind::LBrace, "'{'").is_some() {
            while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
                match self.peek_kind() {
                    TokenKind::HtmlElementIdent => self.parse_element_into(body, node_id),
                    TokenKind::Identifier if self.peek_at(1).kind.is_assign_like() => {
                        self.parse_attribute_into(body, node_id)
                    }
                    TokenKind::Identifier => self.parse_element_into(body, node_id),
                    TokenKind::Text => {
                        let pos = self.peek().position;
                        self.advance();
                        self.expect(TokenKind::LBrace, "'{'");
                        let (value, is_literal) = match self.peek_kind() {
                            TokenKind::StringLiteral => (self.advance().lexeme, true),
                            TokenKind::RBrace => (String::new(), true),
                            _ => (self.advance().lexeme, false),
                        };
                        self.expect(TokenKind::RBrace, "'}'");
                        body.append_child(node_id, AstNode::new(NodeKind::Text(TextData { value, is_literal }), pos));
                    }
                    _ => {
                        self.advance();
                    }
                }
            }
            self.expect(TokenKind::RBrace, "'}'");
        }
    }

    fn parse_attribute_into(&mut self, body: &mut Ast, parent: NodeId) {
        let name_tok = self.advance();
        self.advance();
        let value = self.parse_attribute_value();
        self.eat_semicolon();
        body.append_child(
            parent,
            AstNode::new(
                NodeKind::Attribute(AttributeData {
                    name: name_tok.lexeme,
                    value,
                }),
                name_tok.position,
            ),
        );
    }

    /// Parses a template/custom use-site (`@Style Name;`, `@Element
    /// Name;`, …) and returns the new `Reference` node's id so the
    /// caller can attach trailing inline specialization ops to it
    ///.
    fn parse_type_use_site(&mut self, parent: NodeId) -> NodeId {
        let pos = self.peek().position;
        let prefix = self.advance();
        let name_tok = self.advance();
        self.eat_semicolon();
        let node = AstNode::new(
            NodeKind::Reference(crate::ast::node::ReferenceData {
                group: prefix.lexeme,
                name: name_tok.lexeme,
                default: None,
                inline_ops: Vec::new(),
            }),
            pos,
        );
        self.ast.append_child(parent, node)
    }

    /// Parses one inline specialization statement (`delete`/`insert`/
    /// `replace`) and appends it to `reference`'s `inline_ops`, if
    /// `reference` names a use-site in the current scope. `inherit`
    /// only makes sense inside a template/custom declaration body, not
    /// at an ordinary use-site, and is rejected here.
    fn parse_inline_spec_op(&mut self, reference: Option<NodeId>) {
        let op = match self.peek_kind() {
            TokenKind::Delete => self.parse_delete_op(),
            TokenKind::Insert => self.parse_insert_op(),
            TokenKind::Replace => self.parse_replace_op(),
            TokenKind::Inherit => {
                let tok = self.peek().clone();
                self.error(
                    DiagnosticKind::IllegalConstruct,
                    tok.position,
                    "'inherit' is only valid inside a [Template]/[Custom] body",
                );
                self.resync();
                return;
            }
            _ => return,
        };
        match reference.and_then(|id| self.ast.get_mut(id)) {
            Some(mut n) => {
                if let NodeKind::Reference(data) = &mut n.value().kind {
                    data.inline_ops.push(op);
                }
            }
            None => {
                let pos = self.peek().position;
                self.error(
                    DiagnosticKind::IllegalConstruct,
                    pos,
                    "specialization statement has no preceding template/custom use-site",
                );
            }
        }
    }
}
