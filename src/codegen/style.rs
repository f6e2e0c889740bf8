//! Local-style automation and CSS emission.
//!
//! Class/id auto-injection from `.name { }` / `#name { }` selector
//! rules already happens in the parser (`parser::parse_style_rule`),
//! mutating `ElementData` directly as each rule is parsed. What is
//! left for codegen time is resolving `&` to the element's *effective*
//! selector, which depends on whatever class/id the element ends up
//! with after every rule in its style block has been seen — including
//! rules that come after the `&` occurrence.

use ego_tree::NodeId;

use crate::ast::{Ast, NodeKind, SelectorKind};

/// Accumulates hoisted CSS rules in document order, merging properties
/// into an existing entry when the same selector text reappears:
/// rules with the same selector merge with last-write-wins per
/// property.
#[derive(Debug, Default)]
pub struct CssSheet {
    rules: Vec<(String, Vec<(String, String, bool)>)>,
    /// Raw, verbatim `[Origin] @Style` bodies, appended after the
    /// rule-based CSS.
    origins: Vec<String>,
}

impl CssSheet {
    pub fn push_rule(&mut self, selector: String, properties: Vec<(String, String, bool)>) {
        if let Some(existing) = self.rules.iter_mut().find(|(s, _)| *s == selector) {
            for (name, value, important) in properties {
                if let Some(slot) = existing.1.iter_mut().find(|(n, _, _)| *n == name) {
                    *slot = (name, value, important);
                } else {
                    existing.1.push((name, value, important));
                }
            }
        } else {
            self.rules.push((selector, properties));
        }
    }

    pub fn push_origin(&mut self, raw_text: String) {
        self.origins.push(raw_text);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (selector, properties) in &self.rules {
            if properties.is_empty() {
                continue;
            }
            out.push_str(selector);
            out.push_str(" { ");
            for (name, value, important) in properties {
                out.push_str(name);
                out.push_str(": ");
                out.push_str(value);
                if *important {
                    out.push_str(" !important");
                }
                out.push_str("; ");
            }
            out.push_str("}\n");
        }
        for origin in &self.origins {
            out.push_str(origin);
            out.push('\n');
        }
        out
    }
}

/// Merges bare (not-under-any-selector) properties of a `style { }`
/// block into the element's inline `style="…"` value, last-declared
/// wins in place.
pub fn merge_inline_properties(properties: &[(String, String, bool)]) -> Vec<(String, String, bool)> {
    let mut merged: Vec<(String, String, bool)> = Vec::new();
    for (name, value, important) in properties {
        if let Some(slot) = merged.iter_mut().find(|(n, _, _)| n == name) {
            *slot = (name.clone(), value.clone(), *important);
        } else {
            merged.push((name.clone(), value.clone(), *important));
        }
    }
    merged
}

pub fn render_inline_style(properties: &[(String, String, bool)]) -> String {
    properties
        .iter()
        .map(|(name, value, important)| {
            if *important {
                format!("{name}: {value} !important;")
            } else {
                format!("{name}: {value};")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves the effective selector an element's `&` stands for,
/// minting `chtl-<n>` and adding it to the element's class set if
/// neither a class nor an id is present yet.
pub fn effective_selector(ast: &mut Ast, element: NodeId, auto_class_counter: &mut u32) -> String {
    let (class, id) = ast
        .get(element)
        .and_then(|n| n.value().as_element())
        .map(|e| (e.classes.first().cloned(), e.id.clone()))
        .unwrap_or((None, None));
    if let Some(class) = class {
        return format!(".{class}");
    }
    if let Some(id) = id {
        return format!("#{id}");
    }
    let minted = format!("chtl-{auto_class_counter}");
    *auto_class_counter += 1;
    if let Some(mut n) = ast.get_mut(element) {
        if let Some(e) = n.value().as_element_mut() {
            e.add_class(minted.clone());
        }
    }
    format!(".{minted}")
}

/// Renders a selector tree to CSS text, substituting `effective` for
/// any [`SelectorKind::Context`] node it contains.
pub fn selector_text(kind: &SelectorKind, effective: &str) -> String {
    match kind {
        SelectorKind::Class(name) => format!(".{name}"),
        SelectorKind::Id(name) => format!("#{name}"),
        SelectorKind::Element(name) => name.clone(),
        SelectorKind::Context => effective.to_string(),
        SelectorKind::PseudoClass(name) => format!(":{name}"),
        SelectorKind::PseudoElement(name) => format!("::{name}"),
        SelectorKind::Compound(base, suffix) => {
            format!("{}{}", selector_text(base, effective), selector_text(suffix, effective))
        }
    }
}

/// True if any selector under this style node's rules uses `&`,
/// meaning the effective selector must be resolved before rendering.
pub fn style_uses_context(ast: &Ast, style_id: NodeId) -> bool {
    ast.children(style_id).any(|n| match &n.value().kind {
        NodeKind::Selector(s) => contains_context(&s.kind),
        _ => false,
    })
}

fn contains_context(kind: &SelectorKind) -> bool {
    match kind {
        SelectorKind::Context => true,
        SelectorKind::Compound(base, suffix) => contains_context(base) || contains_context(suffix),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_duplicate_selectors_last_write_wins() {
        let mut sheet = CssSheet::default();
        sheet.push_rule(".box".to_string(), vec![("color".to_string(), "red".to_string(), false)]);
        sheet.push_rule(
            ".box".to_string(),
            vec![("color".to_string(), "blue".to_string(), false), ("margin".to_string(), "0".to_string(), false)],
        );
        let rendered = sheet.render();
        assert!(rendered.contains("color: blue"));
        assert!(rendered.contains("margin: 0"));
        assert_eq!(rendered.matches(".box").count(), 1);
    }

    #[test]
    fn compound_selector_renders_base_then_suffix() {
        let text = selector_text(
            &SelectorKind::Compound(Box::new(SelectorKind::Context), Box::new(SelectorKind::PseudoClass("hover".to_string()))),
            "#m",
        );
        assert_eq!(text, "#m:hover");
    }
}
