//! Inheritance-chain linearization and property/child merging
//!.
//!
//! A use-site names one entity, but that entity's own `inherit`
//! statements can name more, recursively. [`linearize_use_site`] walks
//! that graph depth-first, ancestors before descendants, and hands
//! back a flat list ready to fold into one property set (Style/Var)
//! or one ordered child list (Element).

use crate::ast::{Ast, DefKind, NodeKind, SpecOp};
use crate::diagnostics::{DiagnosticBag, DiagnosticKind};
use crate::registry::Registry;
use crate::token::Position;

/// One ancestor's qualified name and body, in resolution order
/// (farthest ancestor first, the use-site's own entity last).
pub type Chain<'a> = Vec<(String, &'a Ast)>;

/// Resolves a bare `@K Name` use-site: picks Template vs. Custom by
/// last-declared-wins when both exist, then linearizes the full
/// `inherit` chain. Returns the chain plus the
/// resolved entity's own specialization ops (empty for a Template —
/// only Customs carry `delete`/`insert`/`replace` statements).
pub fn linearize_use_site<'a>(
    registry: &'a Registry,
    kind: DefKind,
    name: &str,
    diagnostics: &mut DiagnosticBag,
    pos: Position,
) -> Option<(Chain<'a>, Vec<SpecOp>)> {
    let has_template = registry.find_template(kind, name).is_some();
    let has_custom = registry.find_custom(kind, name).is_some();
    if !has_template && !has_custom {
        diagnostics.error(
            DiagnosticKind::UndefinedReference,
            pos,
            format!("undefined reference '{name}'"),
        );
        return None;
    }
    let use_custom = if has_template && has_custom {
        diagnostics.push(crate::diagnostics::Diagnostic::new(
            DiagnosticKind::AmbiguousTemplateCustomReference,
            pos,
            format!("'{name}' matches both a [Template] and a [Custom]; using the one declared last"),
        ));
        registry.last_declared_is_custom(kind, name).unwrap_or(true)
    } else {
        has_custom
    };

    let mut visited = Vec::new();
    let mut chain = Vec::new();
    if !collect_chain(registry, kind, name, use_custom, &mut visited, &mut chain, diagnostics, pos) {
        return None;
    }
    let ops = if use_custom {
        registry
            .find_custom(kind, name)
            .map(|c| c.specialization_ops.clone())
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    Some((chain, ops))
}

/// Ancestor lookup (as opposed to the top-level use-site) always
/// prefers a Custom over a Template of the same name, falling back to
/// whichever exists — an `inherit @Style Foo;` names a category only
/// implicitly via `kind`, so there is no declaration-order tie-break
/// to consult the way there is at a use-site.
fn collect_chain<'a>(
    registry: &'a Registry,
    kind: DefKind,
    name: &str,
    prefer_custom: bool,
    visited: &mut Vec<String>,
    out: &mut Chain<'a>,
    diagnostics: &mut DiagnosticBag,
    pos: Position,
) -> bool {
    let qualified = registry.qualify(name);
    if visited.contains(&qualified) {
        diagnostics.error(
            DiagnosticKind::CircularInheritance,
            pos,
            format!("circular inheritance involving '{name}'"),
        );
        return false;
    }
    visited.push(qualified.clone());

    let found = if prefer_custom {
        registry
            .find_custom(kind, name)
            .map(|c| (&c.inheritance_chain, &c.body))
            .or_else(|| registry.find_template(kind, name).map(|t| (&t.inheritance_chain, &t.body)))
    } else {
        registry
            .find_template(kind, name)
            .map(|t| (&t.inheritance_chain, &t.body))
            .or_else(|| registry.find_custom(kind, name).map(|c| (&c.inheritance_chain, &c.body)))
    };
    let Some((parents, body)) = found else {
        diagnostics.error(
            DiagnosticKind::UndefinedReference,
            pos,
            format!("undefined reference '{name}'"),
        );
        visited.pop();
        return false;
    };

    for parent in parents.clone() {
        if !collect_chain(registry, kind, &parent, true, visited, out, diagnostics, pos) {
            return false;
        }
    }
    if !out.iter().any(|(n, _)| n == &qualified) {
        out.push((qualified, body));
    }
    visited.pop();
    true
}

/// Removes the ancestors named by any `DeleteInheritance` op from
/// `chain` before merging, so the deleted ancestor's contribution
/// disappears entirely rather than just its still-visible properties —
/// only a pre-merge filter can do that without re-deriving per-property
/// provenance after the fact.
pub fn apply_inheritance_deletions(chain: Chain<'_>, ops: &[SpecOp]) -> Chain<'_> {
    let excluded: Vec<&str> = ops
        .iter()
        .filter_map(|op| match op {
            SpecOp::DeleteInheritance(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();
    if excluded.is_empty() {
        return chain;
    }
    chain
        .into_iter()
        .filter(|(qualified, _)| {
            !excluded
                .iter()
                .any(|e| qualified == e || qualified.ends_with(&format!(".{e}")))
        })
        .collect()
}

/// Folds a chain of Style/Var bodies into one ordered property list,
/// last-declaration-wins in place: a descendant's
/// `color: red;` overwrites an ancestor's without moving to the end.
pub fn merge_style_properties(chain: &Chain<'_>) -> Vec<(String, String, bool)> {
    let mut merged: Vec<(String, String, bool)> = Vec::new();
    for (_, body) in chain {
        for node in body.children(body.root_id()) {
            if let NodeKind::Property(p) = &node.value().kind {
                if let Some(slot) = merged.iter_mut().find(|(n, _, _)| *n == p.name) {
                    *slot = (p.name.clone(), p.value.clone(), p.important);
                } else {
                    merged.push((p.name.clone(), p.value.clone(), p.important));
                }
            }
        }
    }
    merged
}

/// Concatenates a chain of Element bodies' children, in order, into a
/// scratch [`Ast`] that specialization ops then operate on: an element
/// template's children are concatenated in declaration order, ancestors
/// first.
pub fn merge_element_children(chain: &Chain<'_>, file: u32) -> Ast {
    let mut scratch = Ast::new(file);
    let root = scratch.root_id();
    for (_, body) in chain {
        for child in body.children(body.root_id()) {
            body.clone_subtree_into(child.id(), &mut scratch, root);
        }
    }
    scratch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::PropertyData;
    use crate::ast::{AstNode, DefKind};
    use crate::diagnostics::DiagnosticBag;
    use crate::registry::{Registry, TemplateEntity};
    use crate::token::Position;

    fn style_template(name: &str, props: &[(&str, &str)]) -> TemplateEntity {
        let mut body = Ast::new(0);
        let root = body.root_id();
        for (n, v) in props {
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
            kind: DefKind::Style,
            namespace_path: String::new(),
            inheritance_chain: Vec::new(),
            parameter_map: Vec::new(),
            required_params: Vec::new(),
            is_abstract: false,
            body,
        }
    }

    #[test]
    fn linearizes_single_level_inheritance() {
        let mut registry = Registry::new();
        registry.register_template(style_template("Base", &[("color", "red")])).unwrap();
        let mut child = style_template("Child", &[("font-weight", "bold")]);
        child.inheritance_chain.push("Base".to_string());
        registry.register_template(child).unwrap();

        let mut diagnostics = DiagnosticBag::new();
        let (chain, ops) =
            linearize_use_site(&registry, DefKind::Style, "Child", &mut diagnostics, Position::start(0)).unwrap();
        assert!(ops.is_empty());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].0, "Base");
        assert_eq!(chain[1].0, "Child");
        assert!(!diagnostics.has_errors());

        let merged = merge_style_properties(&chain);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], ("color".to_string(), "red".to_string(), false));
    }

    #[test]
    fn self_inheritance_is_circular() {
        let mut registry = Registry::new();
        let mut looping = style_template("Loop", &[]);
        looping.inheritance_chain.push("Loop".to_string());
        registry.register_template(looping).unwrap();

        let mut diagnostics = DiagnosticBag::new();
        let result =
            linearize_use_site(&registry, DefKind::Style, "Loop", &mut diagnostics, Position::start(0));
        assert!(result.is_none());
        assert!(diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::CircularInheritance));
    }

    #[test]
    fn undefined_reference_reports_diagnostic() {
        let registry = Registry::new();
        let mut diagnostics = DiagnosticBag::new();
        let result =
            linearize_use_site(&registry, DefKind::Style, "Missing", &mut diagnostics, Position::start(0));
        assert!(result.is_none());
        assert!(diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UndefinedReference));
    }
}
