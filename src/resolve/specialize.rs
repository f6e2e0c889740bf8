//! Specialization-op application.
//!
//! Applied twice per use-site: once for the resolved Custom's own
//! baked-in ops (if it has any), then again for whatever `delete`/
//! `insert`/`replace` statements were written directly at the
//! use-site (`ReferenceData::inline_ops`) — the use-site ops run last
//! so they can undo or refine what the Custom itself specialized.

use crate::ast::{Ast, NodeKind, SpecOp, SpecTarget};
use crate::config::Config;

/// Applies `delete`/`modify` ops to a flat Style/Var property list.
/// `Insert`/`ReplaceElement` have no meaning for a property map and
/// are ignored; `DeleteInheritance` is handled earlier, before
/// merging (see [`super::linearize::apply_inheritance_deletions`]).
pub fn apply_style_ops(properties: &mut Vec<(String, String, bool)>, ops: &[SpecOp]) {
    for op in ops {
        match op {
            SpecOp::DeleteProperty(SpecTarget::Name(name)) => {
                properties.retain(|(n, _, _)| n != name);
            }
            SpecOp::DeleteProperty(SpecTarget::Wildcard) => properties.clear(),
            SpecOp::DeleteProperty(SpecTarget::Indexed { tag, .. }) => {
                properties.retain(|(n, _, _)| n != tag);
            }
            SpecOp::ModifyProperty(name, value) => {
                if let Some(slot) = properties.iter_mut().find(|(n, _, _)| n == name) {
                    slot.1 = value.clone();
                } else {
                    properties.push((name.clone(), value.clone(), false));
                }
            }
            SpecOp::DeleteInheritance(_) | SpecOp::Insert { .. } | SpecOp::ReplaceElement { .. } => {}
        }
    }
}

/// Applies `delete`/`insert`/`replace` ops to a merged element-child
/// scratch tree. `ModifyProperty` has no meaning for a child list and
/// is ignored.
pub fn apply_element_ops(scratch: &mut Ast, ops: &[SpecOp], config: &Config) {
    for op in ops {
        match op {
            SpecOp::DeleteProperty(target) => delete_matching(scratch, target, config),
            SpecOp::ReplaceElement { target, subtree } => {
                replace_matching(scratch, target, &subtree.0, config)
            }
            SpecOp::Insert {
                position,
                target,
                subtree,
            } => insert_relative(scratch, *position, target, &subtree.0, config),
            SpecOp::ModifyProperty(_, _) | SpecOp::DeleteInheritance(_) => {}
        }
    }
}

fn tag_of(ast: &Ast, id: ego_tree::NodeId) -> Option<String> {
    ast.get(id)
        .and_then(|n| n.value().as_element().map(|e| e.tag.clone()))
}

/// Finds the ids of root-level children matching `target`, in
/// document order.
fn find_matches(scratch: &Ast, target: &SpecTarget, config: &Config) -> Vec<ego_tree::NodeId> {
    let root = scratch.root_id();
    let children: Vec<ego_tree::NodeId> = scratch.children(root).map(|n| n.id()).collect();
    match target {
        SpecTarget::Wildcard => children,
        SpecTarget::Name(name) => children
            .into_iter()
            .find(|id| tag_of(scratch, *id).as_deref() == Some(name.as_str()))
            .into_iter()
            .collect(),
        SpecTarget::Indexed { tag, index } => {
            let zero_based = index - config.index_initial_count;
            if zero_based < 0 {
                return Vec::new();
            }
            children
                .into_iter()
                .filter(|id| tag_of(scratch, *id).as_deref() == Some(tag.as_str()))
                .nth(zero_based as usize)
                .into_iter()
                .collect()
        }
    }
}

fn delete_matching(scratch: &mut Ast, target: &SpecTarget, config: &Config) {
    for id in find_matches(scratch, target, config) {
        scratch.detach(id);
    }
}

fn replace_matching(scratch: &mut Ast, target: &SpecTarget, fragment: &Ast, config: &Config) {
    let matches = find_matches(scratch, target, config);
    let Some(&first) = matches.first() else {
        return;
    };
    let anchor = scratch.get(first).and_then(|n| n.next_sibling()).map(|s| s.id());
    for id in &matches {
        scratch.detach(*id);
    }
    splice_fragment(scratch, fragment, anchor);
}

fn insert_relative(
    scratch: &mut Ast,
    position: crate::ast::InsertPosition,
    target: &SpecTarget,
    fragment: &Ast,
    config: &Config,
) {
    use crate::ast::InsertPosition::*;
    let root = scratch.root_id();
    match position {
        AtTop => {
            let first_child = scratch.children(root).next().map(|n| n.id());
            splice_fragment(scratch, fragment, first_child);
        }
        AtBottom => splice_fragment(scratch, fragment, None),
        Before => {
            let anchor = find_matches(scratch, target, config).into_iter().next();
            splice_fragment(scratch, fragment, anchor);
        }
        After => {
            let anchor = find_matches(scratch, target, config)
                .into_iter()
                .next()
                .and_then(|id| scratch.get(id).and_then(|n| n.next_sibling()).map(|s| s.id()));
            splice_fragment(scratch, fragment, anchor);
        }
        Replace => replace_matching(scratch, target, fragment, config),
    }
}

/// Clones each of `fragment`'s root-level children into `scratch`, in
/// order, either right before `anchor` or, if `anchor` is `None`,
/// appended at the end of `scratch`'s root.
fn splice_fragment(scratch: &mut Ast, fragment: &Ast, anchor: Option<ego_tree::NodeId>) {
    let root = scratch.root_id();
    let froot = fragment.root_id();
    match anchor {
        Some(anchor) => {
            for child in fragment.children(froot) {
                fragment.clone_subtree_before(child.id(), scratch, anchor);
            }
        }
        None => {
            for child in fragment.children(froot) {
                fragment.clone_subtree_into(child.id(), scratch, root);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::ElementData;
    use crate::ast::{AstNode, InsertPosition};
    use crate::token::Position;

    fn scratch_with_divs(n: usize) -> Ast {
        let mut ast = Ast::new(0);
        let root = ast.root_id();
        for _ in 0..n {
            ast.append_child(root, AstNode::new(NodeKind::Element(ElementData::new("div".to_string())), Position::start(0)));
        }
        ast
    }

    fn tags(ast: &Ast) -> Vec<String> {
        ast.children(ast.root_id())
            .filter_map(|n| n.value().as_element().map(|e| e.tag.clone()))
            .collect()
    }

    #[test]
    fn deletes_indexed_target() {
        let mut scratch = scratch_with_divs(3);
        let config = Config::default();
        apply_element_ops(
            &mut scratch,
            &[SpecOp::DeleteProperty(SpecTarget::Indexed {
                tag: "div".to_string(),
                index: 1,
            })],
            &config,
        );
        assert_eq!(tags(&scratch), vec!["div", "div"]);
    }

    #[test]
    fn inserts_after_indexed_target() {
        let mut scratch = scratch_with_divs(2);
        let mut fragment = Ast::new(0);
        let froot = fragment.root_id();
        fragment.append_child(froot, AstNode::new(NodeKind::Element(ElementData::new("span".to_string())), Position::start(0)));
        let config = Config::default();
        apply_element_ops(
            &mut scratch,
            &[SpecOp::Insert {
                position: InsertPosition::After,
                target: SpecTarget::Indexed { tag: "div".to_string(), index: 0 },
                subtree: crate::ast::node::SubtreeData(std::sync::Arc::new(fragment)),
            }],
            &config,
        );
        assert_eq!(tags(&scratch), vec!["div", "span", "div"]);
    }

    #[test]
    fn style_wildcard_delete_clears_all() {
        let mut properties = vec![
            ("color".to_string(), "red".to_string(), false),
            ("font-weight".to_string(), "bold".to_string(), false),
        ];
        apply_style_ops(&mut properties, &[SpecOp::DeleteProperty(SpecTarget::Wildcard)]);
        assert!(properties.is_empty());
    }

    #[test]
    fn style_modify_overwrites_in_place() {
        let mut properties = vec![("color".to_string(), "red".to_string(), false)];
        apply_style_ops(
            &mut properties,
            &[SpecOp::ModifyProperty("color".to_string(), "blue".to_string())],
        );
        assert_eq!(properties[0].1, "blue");
    }
}
