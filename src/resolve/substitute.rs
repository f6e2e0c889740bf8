//! Variable-group substitution.
//!
//! `GroupName(paramName)` and `GroupName(paramName=default)` are
//! plain substrings inside a property value or attribute text — there
//! is no dedicated AST node for them, so the substitution pass walks
//! the whole tree after reference expansion and rewrites matching
//! text in place, the way the original macro-expands var groups
//! textually rather than parsing them into an expression tree.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::ast::{Ast, AttributeValue, DefKind, NodeKind};
use crate::diagnostics::{DiagnosticBag, DiagnosticKind};
use crate::registry::Registry;
use crate::token::Position;

fn var_ref_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*([A-Za-z_][A-Za-z0-9_-]*)\s*(?:=\s*([^()]*?))?\s*\)")
            .expect("static variable-reference pattern is well-formed")
    })
}

/// Walks the whole tree, substituting `Group(name[=default])`
/// references inside property values and attribute text, and
/// resolving `AttributeValue::VarRef` nodes left by the parser.
pub fn substitute_tree(ast: &mut Ast, registry: &Registry, diagnostics: &mut DiagnosticBag) {
    let ids: Vec<_> = ast.descendants(ast.root_id()).map(|n| n.id()).collect();
    for id in ids {
        let Some(mut node) = ast.get_mut(id) else {
            continue;
        };
        let pos = node.value().position;
        match &mut node.value().kind {
            NodeKind::Property(p) => {
                p.value = substitute_text(&p.value, registry, diagnostics, pos);
            }
            NodeKind::Attribute(a) => match &a.value {
                AttributeValue::Text { value, is_literal } => {
                    let substituted = substitute_text(value, registry, diagnostics, pos);
                    a.value = AttributeValue::Text {
                        value: substituted,
                        is_literal: *is_literal,
                    };
                }
                AttributeValue::VarRef { group, name, default } => {
                    if let Some(resolved) = resolve_var(registry, group, name, default.as_deref()) {
                        a.value = AttributeValue::Text {
                            value: resolved,
                            is_literal: true,
                        };
                    } else {
                        diagnostics.push(crate::diagnostics::Diagnostic::new(
                            DiagnosticKind::UnresolvedVariableReference,
                            pos,
                            format!("unresolved variable reference '{group}({name})'"),
                        ));
                    }
                }
                AttributeValue::Number(_) | AttributeValue::TypedBlockRef(_) => {}
            },
            _ => {}
        }
    }
}

/// Substitutes every `Group(name[=default])` occurrence in `value`,
/// leaving unresolved references untouched: a reference that cannot be
/// resolved is left as written, with a warning.
pub fn substitute_text(
    value: &str,
    registry: &Registry,
    diagnostics: &mut DiagnosticBag,
    pos: Position,
) -> String {
    var_ref_pattern()
        .replace_all(value, |caps: &Captures| {
            let group = &caps[1];
            let name = &caps[2];
            let default = caps.get(3).map(|m| m.as_str().trim());
            match resolve_var(registry, group, name, default) {
                Some(resolved) => resolved,
                None => {
                    diagnostics.push(crate::diagnostics::Diagnostic::new(
                        DiagnosticKind::UnresolvedVariableReference,
                        pos,
                        format!("unresolved variable reference '{group}({name})'"),
                    ));
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

fn resolve_var(registry: &Registry, group: &str, name: &str, default: Option<&str>) -> Option<String> {
    let body = registry
        .find_custom(DefKind::Var, group)
        .map(|c| &c.body)
        .or_else(|| registry.find_template(DefKind::Var, group).map(|t| &t.body))?;
    for node in body.children(body.root_id()) {
        if let NodeKind::Property(p) = &node.value().kind {
            if p.name == name {
                return Some(p.value.clone());
            }
        }
    }
    default.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::PropertyData;
    use crate::ast::{AstNode, DefKind};
    use crate::registry::{Registry, TemplateEntity};

    fn var_group(name: &str, vars: &[(&str, &str)]) -> TemplateEntity {
        let mut body = Ast::new(0);
        let root = body.root_id();
        for (n, v) in vars {
            body.append_child(
                root,
                AstNode::new(
                    NodeKind::Property(PropertyData {
                        name: n.to_string(),
                        value: v.to_string(),
                        important: false,
                    }),
                    Position::start(0),
                ),
            );
        }
        TemplateEntity {
            name: name.to_string(),
            kind: DefKind::Var,
            namespace_path: String::new(),
            inheritance_chain: Vec::new(),
            parameter_map: Vec::new(),
            required_params: Vec::new(),
            is_abstract: false,
            body,
        }
    }

    #[test]
    fn substitutes_known_variable() {
        let mut registry = Registry::new();
        registry.register_template(var_group("Colors", &[("primary", "#08f")])).unwrap();
        let mut diagnostics = DiagnosticBag::new();
        let out = substitute_text("Colors(primary)", &registry, &mut diagnostics, Position::start(0));
        assert_eq!(out, "#08f");
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn falls_back_to_inline_default() {
        let registry = Registry::new();
        let mut diagnostics = DiagnosticBag::new();
        let out = substitute_text("Colors(missing=black)", &registry, &mut diagnostics, Position::start(0));
        assert_eq!(out, "black");
    }

    #[test]
    fn leaves_unresolved_reference_untouched_and_warns() {
        let registry = Registry::new();
        let mut diagnostics = DiagnosticBag::new();
        let out = substitute_text("Colors(primary)", &registry, &mut diagnostics, Position::start(0));
        assert_eq!(out, "Colors(primary)");
        assert!(diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnresolvedVariableReference));
    }
}
