//! Template/Custom resolver.
//!
//! Runs after parsing, registry population already done during
//! parsing: strips `[Template]`/`[Custom]` definition markers out of
//! the document tree (invariant: they never reach codegen), expands
//! every `@Style`/`@Element`/`@Var` use-site in place by splicing in
//! the resolved entity's (possibly inherited, possibly specialized)
//! content, and finally substitutes `Group(name)` variable references
//! everywhere they appear as plain text.

pub mod linearize;
pub mod specialize;
pub mod substitute;

use ego_tree::NodeId;

use crate::ast::{Ast, AstNode, DefKind, NodeKind};
use crate::config::Config;
use crate::diagnostics::{DiagnosticBag, DiagnosticKind};
use crate::registry::Registry;
use crate::token::Position;

/// Use-site expansion can in principle re-introduce new use-sites
/// (an expanded Custom's body can itself reference another Custom);
/// this bounds how many times the loop will re-scan before giving up
/// and reporting the remainder as unresolved, rather than hanging on
/// a pathological mutual-reference chain the registry didn't already
/// reject as circular inheritance.
const MAX_EXPANSION_ROUNDS: usize = 4096;

/// Runs the full resolution pass over `ast` in place.
pub fn resolve(ast: &mut Ast, registry: &Registry, config: &Config, diagnostics: &mut DiagnosticBag) {
    strip_definitions(ast);
    expand_references(ast, registry, config, diagnostics);
    substitute::substitute_tree(ast, registry, diagnostics);
}

fn strip_definitions(ast: &mut Ast) {
    let ids: Vec<NodeId> = ast
        .descendants(ast.root_id())
        .filter(|n| matches!(n.value().kind, NodeKind::Template(_) | NodeKind::Custom(_)))
        .map(|n| n.id())
        .collect();
    for id in ids {
        ast.detach(id);
    }
}

fn find_next_reference(ast: &Ast) -> Option<NodeId> {
    ast.descendants(ast.root_id())
        .find(|n| matches!(n.value().kind, NodeKind::Reference(_)))
        .map(|n| n.id())
}

fn expand_references(ast: &mut Ast, registry: &Registry, config: &Config, diagnostics: &mut DiagnosticBag) {
    let mut rounds = 0;
    while let Some(id) = find_next_reference(ast) {
        rounds += 1;
        if rounds > MAX_EXPANSION_ROUNDS {
            let pos = ast.get(id).map(|n| n.value().position).unwrap_or_else(|| Position::start(0));
            diagnostics.error(
                DiagnosticKind::CircularInheritance,
                pos,
                "use-site expansion did not converge (possible mutual Custom/Template reference)",
            );
            ast.detach(id);
            continue;
        }
        expand_one(ast, id, registry, config, diagnostics);
    }
}

fn expand_one(ast: &mut Ast, id: NodeId, registry: &Registry, config: &Config, diagnostics: &mut DiagnosticBag) {
    let (data, pos) = {
        let node = ast.get(id).expect("reference node must exist in this arena");
        let data = match &node.value().kind {
            NodeKind::Reference(r) => r.clone(),
            _ => unreachable!("find_next_reference only returns Reference nodes"),
        };
        (data, node.value().position)
    };

    let def_kind = match data.group.as_str() {
        "@Style" => DefKind::Style,
        "@Element" => DefKind::Element,
        "@Var" => DefKind::Var,
        other => {
            diagnostics.error(
                DiagnosticKind::UnexpectedToken,
                pos,
                format!("unknown type prefix '{other}' at use-site"),
            );
            ast.detach(id);
            return;
        }
    };

    // A bare `@Var Group;` use-site has no document representation of
    // its own — variable groups only ever contribute values through
    // `Group(name)` substitution, handled in a later pass.
    if def_kind == DefKind::Var {
        ast.detach(id);
        return;
    }

    let Some((chain, own_ops)) =
        linearize::linearize_use_site(registry, def_kind, &data.name, diagnostics, pos)
    else {
        ast.detach(id);
        return;
    };
    let chain = linearize::apply_inheritance_deletions(chain, &own_ops);
    let chain = linearize::apply_inheritance_deletions(chain, &data.inline_ops);

    match def_kind {
        DefKind::Style => {
            let mut properties = linearize::merge_style_properties(&chain);
            specialize::apply_style_ops(&mut properties, &own_ops);
            specialize::apply_style_ops(&mut properties, &data.inline_ops);
            for (name, value, important) in properties {
                let node = AstNode::new(
                    NodeKind::Property(crate::ast::node::PropertyData {
                        name,
                        value,
                        important,
                    }),
                    pos,
                );
                ast.insert_before(id, node);
            }
        }
        DefKind::Element => {
            let mut scratch = linearize::merge_element_children(&chain, pos.file);
            // A Custom/Template body can itself hold a use-site (e.g.
            // a Custom built on top of a Template via `@Element
            // Card;`); resolve those before this entity's own
            // specialization ops run, so `div[1]` etc. index into the
            // fully-expanded child list rather than a lone Reference
            // placeholder.
            expand_references(&mut scratch, registry, config, diagnostics);
            specialize::apply_element_ops(&mut scratch, &own_ops, config);
            specialize::apply_element_ops(&mut scratch, &data.inline_ops, config);
            let root = scratch.root_id();
            let children: Vec<NodeId> = scratch.children(root).map(|n| n.id()).collect();
            for child in children {
                scratch.clone_subtree_before(child, ast, id);
            }
        }
        DefKind::Var => unreachable!("handled above"),
    }
    ast.detach(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::{ElementData, PropertyData, ReferenceData};
    use crate::ast::{AstNode, CommentData};
    use crate::registry::{CustomEntity, Registry, TemplateEntity};

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

    fn element_template(name: &str, tags: &[&str]) -> TemplateEntity {
        let mut body = Ast::new(0);
        let root = body.root_id();
        for tag in tags {
            body.append_child(
                root,
                AstNode::new(NodeKind::Element(ElementData::new(tag.to_string())), Position::start(0)),
            );
        }
        TemplateEntity {
            name: name.to_string(),
            kind: DefKind::Element,
            namespace_path: String::new(),
            inheritance_chain: Vec::new(),
            parameter_map: Vec::new(),
            required_params: Vec::new(),
            is_abstract: false,
            body,
        }
    }

    #[test]
    fn strips_definition_markers() {
        let mut ast = Ast::new(0);
        let root = ast.root_id();
        ast.append_child(
            root,
            AstNode::new(
                NodeKind::Template(crate::ast::node::DefData {
                    name: "Foo".to_string(),
                    kind: DefKind::Style,
                }),
                Position::start(0),
            ),
        );
        ast.append_child(root, AstNode::new(NodeKind::Comment(CommentData { text: "kept".to_string() }), Position::start(0)));
        strip_definitions(&mut ast);
        assert_eq!(ast.children(root).count(), 1);
    }

    #[test]
    fn expands_style_reference_into_properties() {
        let mut registry = Registry::new();
        registry.register_template(style_template("Base", &[("color", "red")])).unwrap();

        let mut ast = Ast::new(0);
        let root = ast.root_id();
        ast.append_child(
            root,
            AstNode::new(
                NodeKind::Reference(ReferenceData {
                    group: "@Style".to_string(),
                    name: "Base".to_string(),
                    default: None,
                    inline_ops: Vec::new(),
                }),
                Position::start(0),
            ),
        );

        let config = Config::default();
        let mut diagnostics = DiagnosticBag::new();
        resolve(&mut ast, &registry, &config, &mut diagnostics);

        let props: Vec<_> = ast
            .children(root)
            .filter_map(|n| match &n.value().kind {
                NodeKind::Property(p) => Some((p.name.clone(), p.value.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(props, vec![("color".to_string(), "red".to_string())]);
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn custom_element_specialization_deletes_and_inserts() {
        let mut registry = Registry::new();
        registry
            .register_template(element_template("Card", &["div", "div", "div"]))
            .unwrap();

        let mut fragment = Ast::new(0);
        let froot = fragment.root_id();
        fragment.append_child(froot, AstNode::new(NodeKind::Element(ElementData::new("span".to_string())), Position::start(0)));

        let mut custom_body = Ast::new(0);
        let custom_root = custom_body.root_id();
        custom_body.append_child(
            custom_root,
            AstNode::new(NodeKind::Reference(ReferenceData {
                group: "@Element".to_string(),
                name: "Card".to_string(),
                default: None,
                inline_ops: Vec::new(),
            }), Position::start(0)),
        );

        registry
            .register_custom(CustomEntity {
                name: "C2".to_string(),
                kind: DefKind::Element,
                namespace_path: String::new(),
                inheritance_chain: Vec::new(),
                parameter_map: Vec::new(),
                required_params: Vec::new(),
                specialization_ops: vec![
                    crate::ast::SpecOp::DeleteProperty(crate::ast::SpecTarget::Indexed {
                        tag: "div".to_string(),
                        index: 1,
                    }),
                    crate::ast::SpecOp::Insert {
                        position: crate::ast::InsertPosition::After,
                        target: crate::ast::SpecTarget::Indexed { tag: "div".to_string(), index: 0 },
                        subtree: crate::ast::node::SubtreeData(std::sync::Arc::new(fragment)),
                    },
                ],
                allows_specialization: true,
                body: custom_body,
            })
            .unwrap();

        let mut ast = Ast::new(0);
        let root = ast.root_id();
        ast.append_child(
            root,
            AstNode::new(
                NodeKind::Reference(ReferenceData {
                    group: "@Element".to_string(),
                    name: "C2".to_string(),
                    default: None,
                    inline_ops: Vec::new(),
                }),
                Position::start(0),
            ),
        );

        let config = Config::default();
        let mut diagnostics = DiagnosticBag::new();
        resolve(&mut ast, &registry, &config, &mut diagnostics);

        let tags: Vec<_> = ast
            .children(root)
            .filter_map(|n| n.value().as_element().map(|e| e.tag.clone()))
            .collect();
        assert_eq!(tags, vec!["div", "span", "div"]);
        assert!(!diagnostics.has_errors());
    }
}
