//! Scope/symbol manager.
//!
//! A stack of lexical frames for local identifiers and variable
//! bindings, distinct from the global registry (§4.F): this tracks
//! names visible only within the current parse/resolve recursion
//! (e.g. a template body's own parameter names), discarded when the
//! frame closes.

use std::collections::HashMap;

use ego_tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Element,
    Template,
    Custom,
    StyleBlock,
    ScriptBlock,
}

#[derive(Debug)]
struct Frame {
    name: String,
    kind: FrameKind,
    symbols: HashMap<String, NodeId>,
    variables: HashMap<String, String>,
}

/// Stack of symbol frames. `lookup`/`get_var` search
/// innermost-outward.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, kind: FrameKind) {
        self.frames.push(Frame {
            name: name.into(),
            kind,
            symbols: HashMap::new(),
            variables: HashMap::new(),
        });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn define(&mut self, name: impl Into<String>, node: NodeId) {
        if let Some(frame) = self.frames.last_mut() {
            frame.symbols.insert(name.into(), node);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.symbols.get(name).copied())
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.variables.insert(name.into(), value.into());
        }
    }

    pub fn get_var(&self, name: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.variables.get(name).map(String::as_str))
    }

    pub fn current_name(&self) -> Option<&str> {
        self.frames.last().map(|f| f.name.as_str())
    }

    pub fn current_kind(&self) -> Option<FrameKind> {
        self.frames.last().map(|f| f.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_searches_innermost_outward() {
        let mut scope = ScopeStack::new();
        scope.push("outer", FrameKind::Element);
        scope.set_var("color", "red");
        scope.push("inner", FrameKind::StyleBlock);
        assert_eq!(scope.get_var("color"), Some("red"));
        scope.set_var("color", "blue");
        assert_eq!(scope.get_var("color"), Some("blue"));
        scope.pop();
        assert_eq!(scope.get_var("color"), Some("red"));
    }

    #[test]
    fn closed_scopes_discard_their_frames() {
        let mut scope = ScopeStack::new();
        scope.push("a", FrameKind::Element);
        scope.set_var("x", "1");
        scope.pop();
        assert_eq!(scope.get_var("x"), None);
    }
}
