//! AST node model.
//!
//! The whole tree lives in one `ego_tree::Tree<AstNode>` arena,
//! addressed by `ego_tree::NodeId`. Parent/child/sibling links are the
//! arena's, never hand-rolled `Rc`/`Weak` — avoiding the cyclic
//! parent/child references a naive owning-pointer tree would need.

pub mod node;

pub use node::*;

use ego_tree::{NodeId, NodeMut, NodeRef, Tree};

use crate::token::Position;

/// The arena-backed AST. Wraps `ego_tree::Tree<AstNode>` so every other
/// component threads `NodeId`s — integer indices into the arena —
/// instead of owning pointers.
#[derive(Debug, Clone)]
pub struct Ast {
    tree: Tree<AstNode>,
}

impl Ast {
    pub fn new(file: u32) -> Self {
        let root = AstNode::new(NodeKind::Document, Position::start(file));
        Self {
            tree: Tree::new(root),
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.tree.root().id()
    }

    pub fn root(&self) -> NodeRef<'_, AstNode> {
        self.tree.root()
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, AstNode>> {
        self.tree.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<NodeMut<'_, AstNode>> {
        self.tree.get_mut(id)
    }

    /// Appends `node` as the last child of `parent`, returning the new
    /// node's id.
    pub fn append_child(&mut self, parent: NodeId, node: AstNode) -> NodeId {
        let mut parent_mut = self
            .tree
            .get_mut(parent)
            .expect("parent id must belong to this arena");
        parent_mut.append(node).id()
    }

    /// Detaches `node` from its parent without dropping it from the
    /// arena (used by specialization `delete`/`replace` ops, §4.J).
    pub fn detach(&mut self, node: NodeId) {
        if let Some(mut n) = self.tree.get_mut(node) {
            n.detach();
        }
    }

    /// Prepends `node` as the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, node: AstNode) -> NodeId {
        self.tree
            .get_mut(parent)
            .expect("parent id must belong to this arena")
            .prepend(node)
            .id()
    }

    /// Inserts `node` as the sibling immediately after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, node: AstNode) -> NodeId {
        self.tree
            .get_mut(sibling)
            .expect("sibling id must belong to this arena")
            .insert_after(node)
            .id()
    }

    /// Inserts `node` as the sibling immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, node: AstNode) -> NodeId {
        self.tree
            .get_mut(sibling)
            .expect("sibling id must belong to this arena")
            .insert_before(node)
            .id()
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.tree.get(id).and_then(|n| n.parent()).map(|p| p.id())
    }

    /// Deep-copies the subtree rooted at `src_id` of `self` onto a new
    /// child of `dest_parent` in `dest` (possibly a different arena
    /// entirely — used to splice a template/custom body, which lives
    /// in its own `Ast`, into the document being resolved).
    pub fn clone_subtree_into(&self, src_id: NodeId, dest: &mut Ast, dest_parent: NodeId) -> NodeId {
        let src_node = self.get(src_id).expect("src_id must belong to this arena");
        let new_id = dest.append_child(dest_parent, src_node.value().clone());
        for child in src_node.children() {
            self.clone_subtree_into(child.id(), dest, new_id);
        }
        new_id
    }

    /// Like [`Ast::clone_subtree_into`] but positions the new root
    /// right after `sibling` instead of appending under a parent.
    pub fn clone_subtree_after(&self, src_id: NodeId, dest: &mut Ast, sibling: NodeId) -> NodeId {
        let src_node = self.get(src_id).expect("src_id must belong to this arena");
        let new_id = dest.insert_after(sibling, src_node.value().clone());
        for child in src_node.children() {
            self.clone_subtree_into(child.id(), dest, new_id);
        }
        new_id
    }

    /// Like [`Ast::clone_subtree_into`] but positions the new root
    /// right before `sibling`.
    pub fn clone_subtree_before(&self, src_id: NodeId, dest: &mut Ast, sibling: NodeId) -> NodeId {
        let src_node = self.get(src_id).expect("src_id must belong to this arena");
        let new_id = dest.insert_before(sibling, src_node.value().clone());
        for child in src_node.children() {
            self.clone_subtree_into(child.id(), dest, new_id);
        }
        new_id
    }

    /// Like [`Ast::clone_subtree_into`] but positions the new root as
    /// the first child of `parent`.
    pub fn clone_subtree_prepend(&self, src_id: NodeId, dest: &mut Ast, parent: NodeId) -> NodeId {
        let src_node = self.get(src_id).expect("src_id must belong to this arena");
        let new_id = dest.prepend_child(parent, src_node.value().clone());
        for child in src_node.children() {
            self.clone_subtree_into(child.id(), dest, new_id);
        }
        new_id
    }

    /// Pre-order traversal starting at `id`, inclusive.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeRef<'_, AstNode>> {
        self.tree
            .get(id)
            .into_iter()
            .flat_map(|n| n.descendants())
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeRef<'_, AstNode>> {
        self.tree
            .get(id)
            .into_iter()
            .flat_map(|n| n.children())
    }
}
