//! Parse-state machine.
//!
//! A stack of `(state, context, element?, namespace?, attributes,
//! nesting_level, in_specialization)` frames, entered and exited via an
//! RAII guard instead of manually paired push/pop calls. The guard
//! holds a shared handle to the stack rather than a borrow of `Parser`,
//! so it can be produced by a method that also needs `&mut self`
//! elsewhere in the same scope.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Initial,
    InElement,
    InTemplate,
    InCustom,
    InOrigin,
    InImport,
    InConfiguration,
    InNamespace,
    InStyleBlock,
    InScriptBlock,
    InTextBlock,
    InAttribute,
    InSelector,
    InProperty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextType {
    Global,
    Element,
    TemplateStyle,
    TemplateElement,
    TemplateVar,
    CustomStyle,
    CustomElement,
    CustomVar,
    Origin,
    Import,
    Configuration,
    Namespace,
    LocalStyle,
    LocalScript,
    Text,
}

#[derive(Debug, Clone)]
pub struct StateFrame {
    pub state: ParseState,
    pub context: ContextType,
    pub current_element: Option<String>,
    pub current_namespace: Option<String>,
    pub attributes: HashMap<String, String>,
    pub nesting_level: usize,
    pub in_specialization: bool,
}

impl StateFrame {
    fn initial() -> Self {
        Self {
            state: ParseState::Initial,
            context: ContextType::Global,
            current_element: None,
            current_namespace: None,
            attributes: HashMap::new(),
            nesting_level: 0,
            in_specialization: false,
        }
    }
}

/// Checks whether `to` may be entered while the innermost frame is in
/// `from`. The table names three
/// arrows explicitly; the rest follow the same shape (declaration
/// contexts reachable from `Initial`, element-body constructs
/// reachable from `Element`/`Template`/`Custom` bodies, and
/// selector/property constructs reachable from a style block).
fn is_valid_transition(from: ParseState, to: ParseState) -> bool {
    use ParseState::*;
    match from {
        Initial => matches!(
            to,
            InElement | InTemplate | InCustom | InOrigin | InImport | InConfiguration
                | InNamespace
        ),
        InElement | InTemplate | InCustom | InNamespace => matches!(
            to,
            InStyleBlock
                | InScriptBlock
                | InTextBlock
                | InAttribute
                | InElement
                | InOrigin
                | Initial
        ),
        InStyleBlock | InScriptBlock => matches!(to, InSelector | InProperty | InElement | Initial),
        InSelector | InProperty | InAttribute | InTextBlock | InOrigin | InImport
        | InConfiguration => matches!(to, InElement | Initial | InStyleBlock | InScriptBlock),
    }
}

/// Stack of parse-state frames. Cloneable handle: clones share the
/// same underlying stack, mirroring the original's single
/// process-wide `CHTLState` but threaded explicitly instead of as a
/// singleton.
#[derive(Debug, Clone)]
pub struct ParseStateStack {
    frames: Rc<RefCell<Vec<StateFrame>>>,
}

impl ParseStateStack {
    pub fn new() -> Self {
        Self {
            frames: Rc::new(RefCell::new(vec![StateFrame::initial()])),
        }
    }

    pub fn current(&self) -> StateFrame {
        self.frames
            .borrow()
            .last()
            .cloned()
            .expect("state stack is never empty")
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn is_in_context(&self, context: ContextType) -> bool {
        self.frames.borrow().iter().any(|f| f.context == context)
    }

    /// Enters `state`/`context`, returning a guard that pops it again
    /// on drop. Returns `Err` with a message if the transition is
    /// illegal from the current state (caller turns this into an
    /// `IllegalConstruct` diagnostic).
    pub fn enter(&self, state: ParseState, context: ContextType) -> Result<StateGuard, String> {
        let from = self.current().state;
        if !is_valid_transition(from, state) {
            return Err(format!("illegal transition {from:?} -> {state:?}"));
        }
        let mut frame = self.current();
        frame.state = state;
        frame.context = context;
        frame.nesting_level += 1;
        self.frames.borrow_mut().push(frame);
        Ok(StateGuard {
            frames: Rc::clone(&self.frames),
        })
    }

    pub fn set_current_element(&self, name: impl Into<String>) {
        if let Some(frame) = self.frames.borrow_mut().last_mut() {
            frame.current_element = Some(name.into());
        }
    }

    pub fn set_current_namespace(&self, name: impl Into<String>) {
        if let Some(frame) = self.frames.borrow_mut().last_mut() {
            frame.current_namespace = Some(name.into());
        }
    }

    pub fn enter_specialization(&self) {
        if let Some(frame) = self.frames.borrow_mut().last_mut() {
            frame.in_specialization = true;
        }
    }
}

impl Default for ParseStateStack {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII handle popping its frame when dropped.
pub struct StateGuard {
    frames: Rc<RefCell<Vec<StateFrame>>>,
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        let mut frames = self.frames.borrow_mut();
        if frames.len() > 1 {
            frames.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_and_drop_restores_previous_state() {
        let stack = ParseStateStack::new();
        assert_eq!(stack.current().state, ParseState::Initial);
        {
            let _guard = stack.enter(ParseState::InElement, ContextType::Element).unwrap();
            assert_eq!(stack.current().state, ParseState::InElement);
            assert_eq!(stack.depth(), 2);
        }
        assert_eq!(stack.current().state, ParseState::Initial);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let stack = ParseStateStack::new();
        let result = stack.enter(ParseState::InSelector, ContextType::LocalStyle);
        assert!(result.is_err());
    }

    #[test]
    fn nested_guards_pop_in_reverse_order() {
        let stack = ParseStateStack::new();
        let outer = stack.enter(ParseState::InElement, ContextType::Element).unwrap();
        {
            let _inner = stack.enter(ParseState::InStyleBlock, ContextType::LocalStyle).unwrap();
            assert_eq!(stack.current().state, ParseState::InStyleBlock);
        }
        assert_eq!(stack.current().state, ParseState::InElement);
        drop(outer);
        assert_eq!(stack.current().state, ParseState::Initial);
    }
}
