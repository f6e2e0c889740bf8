//! Code generator: walks the resolved document once and
//! emits HTML, hoisted CSS and concatenated JS.

pub mod html;
pub mod style;

use ego_tree::NodeId;

use crate::ast::{Ast, NodeKind, OriginKind};
use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticBag};
use crate::registry::Registry;

/// The environment handed to the CHTL-JS hook for each `script { }`
/// body.
pub struct ScriptEnv<'a> {
    pub element_id: Option<String>,
    pub element_classes: &'a [String],
    pub config: &'a Config,
    pub variable_groups: Vec<String>,
    pub registry: &'a Registry,
}

/// `compile_script(raw, env) -> (js, diagnostics)`. Absent
/// means script bodies pass through unchanged.
pub type ScriptHook<'a> = dyn Fn(&str, &ScriptEnv<'_>) -> (String, Vec<Diagnostic>) + 'a;

#[derive(Debug, Default, Clone)]
pub struct GeneratedOutput {
    pub html: String,
    pub css: String,
    pub js: String,
}

struct Generator<'a> {
    registry: &'a Registry,
    config: &'a Config,
    diagnostics: &'a mut DiagnosticBag,
    script_hook: Option<&'a ScriptHook<'a>>,
    css: style::CssSheet,
    js_chunks: Vec<String>,
    auto_class_counter: u32,
}

/// Runs the generator over the whole document, returning the three
/// output strings.
pub fn generate(
    ast: &mut Ast,
    registry: &Registry,
    config: &Config,
    diagnostics: &mut DiagnosticBag,
    script_hook: Option<&ScriptHook<'_>>,
) -> GeneratedOutput {
    let mut gen = Generator {
        registry,
        config,
        diagnostics,
        script_hook,
        css: style::CssSheet::default(),
        js_chunks: Vec::new(),
        auto_class_counter: 0,
    };
    let root = ast.root_id();
    let mut html = String::new();
    let children: Vec<NodeId> = ast.children(root).map(|n| n.id()).collect();
    for child in children {
        gen.emit_node(ast, child, &mut html);
    }
    GeneratedOutput {
        html,
        css: gen.css.render(),
        js: gen.js_chunks.join("\n"),
    }
}

impl<'a> Generator<'a> {
    fn emit_node(&mut self, ast: &mut Ast, id: NodeId, out: &mut String) {
        let kind_tag = ast.get(id).map(|n| std::mem::discriminant(&n.value().kind));
        let _ = kind_tag;
        match ast.get(id).map(|n| n.value().kind.clone()) {
            Some(NodeKind::Element(_)) => self.emit_element(ast, id, out),
            Some(NodeKind::Text(t)) => {
                if t.is_literal {
                    out.push_str(&t.value);
                } else {
                    out.push_str(&html::escape_html(&t.value));
                }
            }
            Some(NodeKind::Comment(c)) => {
                out.push_str("<!--");
                out.push_str(&c.text);
                out.push_str("-->");
            }
            Some(NodeKind::Origin(o)) => self.emit_origin(&o, out),
            Some(NodeKind::Script(s)) => self.emit_script(None, &[], &s.raw_text),
            // Attribute/Style/Property/Selector/Reference nodes are
            // only ever meaningful as a parent's child, handled inline
            // by `emit_element`; a stray one at document level is
            // dropped rather than mis-rendered.
            _ => {}
        }
    }

    fn emit_element(&mut self, ast: &mut Ast, id: NodeId, out: &mut String) {
        let tag = ast
            .get(id)
            .and_then(|n| n.value().as_element())
            .map(|e| e.tag.clone())
            .unwrap_or_default();

        // Resolve this element's style block (auto-class minting for
        // `&`, hoisted rule collection, inline style assembly) before
        // the opening tag's attributes are rendered, since minting can
        // still add a class to this very element.
        let style_id = ast
            .children(id)
            .find(|n| matches!(n.value().kind, NodeKind::Style))
            .map(|n| n.id());
        let inline_style = style_id.map(|sid| self.process_style_block(ast, id, sid));

        let element = ast.get(id).and_then(|n| n.value().as_element()).cloned();
        let Some(element) = element else { return };

        out.push('<');
        out.push_str(&tag);
        if let Some(id_value) = &element.id {
            out.push_str(" id=\"");
            out.push_str(&html::escape_html(id_value));
            out.push('"');
        }
        if !element.classes.is_empty() {
            out.push_str(" class=\"");
            out.push_str(&html::escape_html(&element.classes.join(" ")));
            out.push('"');
        }
        if let Some(style_value) = &inline_style {
            if !style_value.is_empty() {
                out.push_str(" style=\"");
                out.push_str(&html::escape_html(style_value));
                out.push('"');
            }
        }
        for attr in ast.children(id).filter_map(|n| match &n.value().kind {
            NodeKind::Attribute(a) if a.name != "id" && a.name != "class" => Some(a.clone()),
            _ => None,
        }) {
            out.push(' ');
            out.push_str(&attr.name);
            out.push_str("=\"");
            out.push_str(&html::escape_html(&attribute_text(&attr.value)));
            out.push('"');
        }

        if element.self_closing {
            out.push_str(" />");
            return;
        }
        out.push('>');

        let script_raw: Option<String> = ast.children(id).find_map(|n| match &n.value().kind {
            NodeKind::Script(s) => Some(s.raw_text.clone()),
            _ => None,
        });
        if let Some(raw) = script_raw {
            self.emit_script(element.id.as_deref(), &element.classes, &raw);
        }

        let children: Vec<NodeId> = ast
            .children(id)
            .filter(|n| {
                matches!(
                    n.value().kind,
                    NodeKind::Element(_) | NodeKind::Text(_) | NodeKind::Comment(_) | NodeKind::Origin(_)
                )
            })
            .map(|n| n.id())
            .collect();
        for child in children {
            self.emit_node(ast, child, out);
        }

        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }

    /// Processes one element's `style { }` block: hoists selector
    /// rules into the document CSS sheet (resolving `&` along the
    /// way) and returns the merged inline-style text.
    fn process_style_block(&mut self, ast: &mut Ast, element: NodeId, style_id: NodeId) -> String {
        let needs_effective = style::style_uses_context(ast, style_id);
        let effective = if needs_effective {
            Some(style::effective_selector(ast, element, &mut self.auto_class_counter))
        } else {
            None
        };

        let mut inline_properties = Vec::new();
        let rule_ids: Vec<NodeId> = ast.children(style_id).map(|n| n.id()).collect();
        for child_id in rule_ids {
            let Some(child) = ast.get(child_id) else { continue };
            match &child.value().kind {
                NodeKind::Property(p) => inline_properties.push((p.name.clone(), p.value.clone(), p.important)),
                NodeKind::Selector(s) => {
                    let text = style::selector_text(&s.kind, effective.as_deref().unwrap_or(""));
                    let properties: Vec<(String, String, bool)> = ast
                        .children(child_id)
                        .filter_map(|n| match &n.value().kind {
                            NodeKind::Property(p) => Some((p.name.clone(), p.value.clone(), p.important)),
                            _ => None,
                        })
                        .collect();
                    self.css.push_rule(text, properties);
                }
                _ => {}
            }
        }
        let merged = style::merge_inline_properties(&inline_properties);
        style::render_inline_style(&merged)
    }

    fn emit_origin(&mut self, origin: &crate::ast::node::OriginData, out: &mut String) {
        let behaves_like = match &origin.kind {
            OriginKind::Html => "Html",
            OriginKind::Style => "Style",
            OriginKind::JavaScript => "JavaScript",
            OriginKind::Custom(name) => self.config.origin_type(name).unwrap_or("Html"),
        };
        match behaves_like {
            "Style" => self.css.push_origin(origin.raw_text.clone()),
            "JavaScript" => self.js_chunks.push(wrap_iife(&origin.raw_text)),
            _ => out.push_str(&origin.raw_text),
        }
    }

    fn emit_script(&mut self, element_id: Option<&str>, classes: &[String], raw: &str) {
        let env = ScriptEnv {
            element_id: element_id.map(str::to_string),
            element_classes: classes,
            config: self.config,
            variable_groups: self.registry.var_group_names(),
            registry: self.registry,
        };
        let (js, extra_diagnostics) = match self.script_hook {
            Some(hook) => hook(raw, &env),
            None => (raw.to_string(), Vec::new()),
        };
        for diag in extra_diagnostics {
            self.diagnostics.push(diag);
        }
        self.js_chunks.push(wrap_iife(&js));
    }
}

fn wrap_iife(body: &str) -> String {
    if body.trim().is_empty() {
        return String::new();
    }
    format!("(function(){{\n{body}\n}})();")
}

fn attribute_text(value: &crate::ast::AttributeValue) -> String {
    use crate::ast::AttributeValue::*;
    match value {
        Text { value, .. } => value.clone(),
        Number(n) => n.clone(),
        VarRef { group, name, default } => match default {
            Some(d) => format!("{group}({name}={d})"),
            None => format!("{group}({name})"),
        },
        TypedBlockRef(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::{AttributeData, ElementData, PropertyData, SelectorData, TextData};
    use crate::ast::{AstNode, AttributeValue, SelectorKind};
    use crate::token::Position;

    fn new_element(ast: &mut Ast, parent: NodeId, tag: &str) -> NodeId {
        ast.append_child(parent, AstNode::new(NodeKind::Element(ElementData::new(tag.to_string())), Position::start(0)))
    }

    #[test]
    fn basic_element_and_text() {
        let mut ast = Ast::new(0);
        let root = ast.root_id();
        let html_id = new_element(&mut ast, root, "html");
        let body_id = new_element(&mut ast, html_id, "body");
        let div_id = new_element(&mut ast, body_id, "div");
        if let Some(mut n) = ast.get_mut(div_id) {
            n.value().as_element_mut().unwrap().id = Some("x".to_string());
        }
        ast.append_child(div_id, AstNode::new(NodeKind::Text(TextData { value: "hi".to_string(), is_literal: true }), Position::start(0)));

        let registry = Registry::new();
        let config = Config::default();
        let mut diagnostics = DiagnosticBag::new();
        let output = generate(&mut ast, &registry, &config, &mut diagnostics, None);
        assert!(output.html.contains("<div id=\"x\">hi</div>"));
        assert!(output.css.is_empty());
        assert!(output.js.is_empty());
    }

    #[test]
    fn auto_class_injection_hoists_css() {
        let mut ast = Ast::new(0);
        let root = ast.root_id();
        let div_id = new_element(&mut ast, root, "div");
        if let Some(mut n) = ast.get_mut(div_id) {
            n.value().as_element_mut().unwrap().add_class("box");
        }
        let style_id = ast.append_child(div_id, AstNode::new(NodeKind::Style, Position::start(0)));
        let selector_id = ast.append_child(
            style_id,
            AstNode::new(NodeKind::Selector(SelectorData { kind: SelectorKind::Class("box".to_string()) }), Position::start(0)),
        );
        ast.append_child(
            selector_id,
            AstNode::new(NodeKind::Property(PropertyData { name: "color".to_string(), value: "red".to_string(), important: false }), Position::start(0)),
        );

        let registry = Registry::new();
        let config = Config::default();
        let mut diagnostics = DiagnosticBag::new();
        let output = generate(&mut ast, &registry, &config, &mut diagnostics, None);
        assert!(output.html.contains("<div class=\"box\">"));
        assert!(output.css.contains(".box { color: red; }"));
    }

    #[test]
    fn context_reference_resolves_to_id_selector() {
        let mut ast = Ast::new(0);
        let root = ast.root_id();
        let div_id = new_element(&mut ast, root, "div");
        if let Some(mut n) = ast.get_mut(div_id) {
            n.value().as_element_mut().unwrap().id = Some("m".to_string());
        }
        let style_id = ast.append_child(div_id, AstNode::new(NodeKind::Style, Position::start(0)));
        let selector_id = ast.append_child(
            style_id,
            AstNode::new(
                NodeKind::Selector(SelectorData {
                    kind: SelectorKind::Compound(Box::new(SelectorKind::Context), Box::new(SelectorKind::PseudoClass("hover".to_string()))),
                }),
                Position::start(0),
            ),
        );
        ast.append_child(
            selector_id,
            AstNode::new(NodeKind::Property(PropertyData { name: "color".to_string(), value: "blue".to_string(), important: false }), Position::start(0)),
        );

        let registry = Registry::new();
        let config = Config::default();
        let mut diagnostics = DiagnosticBag::new();
        let output = generate(&mut ast, &registry, &config, &mut diagnostics, None);
        assert!(output.html.contains("<div id=\"m\">"));
        assert!(output.css.contains("#m:hover { color: blue; }"));
    }

    #[test]
    fn plain_attribute_round_trips() {
        let mut ast = Ast::new(0);
        let root = ast.root_id();
        let a_id = new_element(&mut ast, root, "a");
        ast.append_child(
            a_id,
            AstNode::new(
                NodeKind::Attribute(AttributeData { name: "href".to_string(), value: AttributeValue::Text { value: "/x".to_string(), is_literal: true } }),
                Position::start(0),
            ),
        );
        let registry = Registry::new();
        let config = Config::default();
        let mut diagnostics = DiagnosticBag::new();
        let output = generate(&mut ast, &registry, &config, &mut diagnostics, None);
        assert!(output.html.contains("href=\"/x\""));
    }
}
