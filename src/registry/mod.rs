//! Global registry.
//!
//! A namespaced store of templates, customs, origins, imports and
//! loaded files, held as an ordinary value threaded through the
//! compilation instead of a process-wide singleton.

use std::collections::{HashMap, HashSet};

use crate::ast::{Ast, DefKind, SpecOp};
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::token::Position;

#[derive(Debug, Clone)]
pub struct TemplateEntity {
    pub name: String,
    pub kind: DefKind,
    pub namespace_path: String,
    pub inheritance_chain: Vec<String>,
    /// `(param_name, default_value)`, insertion-ordered.
    pub parameter_map: Vec<(String, String)>,
    pub required_params: Vec<String>,
    pub is_abstract: bool,
    pub body: Ast,
}

#[derive(Debug, Clone)]
pub struct CustomEntity {
    pub name: String,
    pub kind: DefKind,
    pub namespace_path: String,
    pub inheritance_chain: Vec<String>,
    pub parameter_map: Vec<(String, Option<String>)>,
    pub required_params: Vec<String>,
    pub specialization_ops: Vec<SpecOp>,
    pub allows_specialization: bool,
    pub body: Ast,
}

#[derive(Debug, Clone)]
pub struct OriginEntity {
    pub name: Option<String>,
    pub kind: String,
    pub raw_text: String,
    pub namespace_path: String,
}

#[derive(Debug, Clone)]
pub struct ImportEntity {
    pub logical_path: String,
    pub resolved_file_path: Option<String>,
    pub alias: Option<String>,
    pub namespace_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceEntity {
    pub name: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub exports: HashSet<String>,
}

/// A `(category, kind)` pair identifies one of the six template/custom
/// maps the registry keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DefCategory {
    Template,
    Custom,
}

#[derive(Debug, Default)]
pub struct Registry {
    style_templates: HashMap<String, TemplateEntity>,
    element_templates: HashMap<String, TemplateEntity>,
    var_templates: HashMap<String, TemplateEntity>,
    style_customs: HashMap<String, CustomEntity>,
    element_customs: HashMap<String, CustomEntity>,
    var_customs: HashMap<String, CustomEntity>,
    origins: HashMap<String, OriginEntity>,
    imports: Vec<ImportEntity>,
    namespaces: HashMap<String, NamespaceEntity>,
    /// `@CJmod` modules: qualified module name -> exported function
    /// names, the only part of a CJmod this core understands; the
    /// module body itself stays opaque.
    cjmod_exports: HashMap<String, Vec<String>>,
    /// Tracks, per qualified name, which `(category, kind)` already
    /// registered it — used to compute `conflicts_for` without
    /// scanning every map.
    registrations: HashMap<String, Vec<(DefCategory, DefKind)>>,
    pub loaded_files: HashSet<String>,
    pub current_namespace: String,
}

/// Returned when a qualified name collides within the same
/// `(category, kind)` pair.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub qualified_name: String,
    pub message: String,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn qualify(&self, name: &str) -> String {
        if self.current_namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.current_namespace, name)
        }
    }

    fn record_registration(&mut self, qualified: &str, category: DefCategory, kind: DefKind) {
        self.registrations
            .entry(qualified.to_string())
            .or_default()
            .push((category, kind));
    }

    fn template_map_mut(&mut self, kind: DefKind) -> &mut HashMap<String, TemplateEntity> {
        match kind {
            DefKind::Style => &mut self.style_templates,
            DefKind::Element => &mut self.element_templates,
            DefKind::Var => &mut self.var_templates,
        }
    }

    fn template_map(&self, kind: DefKind) -> &HashMap<String, TemplateEntity> {
        match kind {
            DefKind::Style => &self.style_templates,
            DefKind::Element => &self.element_templates,
            DefKind::Var => &self.var_templates,
        }
    }

    fn custom_map_mut(&mut self, kind: DefKind) -> &mut HashMap<String, CustomEntity> {
        match kind {
            DefKind::Style => &mut self.style_customs,
            DefKind::Element => &mut self.element_customs,
            DefKind::Var => &mut self.var_customs,
        }
    }

    fn custom_map(&self, kind: DefKind) -> &HashMap<String, CustomEntity> {
        match kind {
            DefKind::Style => &self.style_customs,
            DefKind::Element => &self.element_customs,
            DefKind::Var => &self.var_customs,
        }
    }

    pub fn register_template(&mut self, entity: TemplateEntity) -> Result<(), Conflict> {
        let qualified = self.qualify(&entity.name);
        if self.template_map(entity.kind).contains_key(&qualified) {
            return Err(Conflict {
                qualified_name: qualified,
                message: "duplicate template registration".to_string(),
            });
        }
        self.record_registration(&qualified, DefCategory::Template, entity.kind);
        self.template_map_mut(entity.kind).insert(qualified, entity);
        Ok(())
    }

    pub fn register_custom(&mut self, entity: CustomEntity) -> Result<(), Conflict> {
        let qualified = self.qualify(&entity.name);
        if self.custom_map(entity.kind).contains_key(&qualified) {
            return Err(Conflict {
                qualified_name: qualified,
                message: "duplicate custom registration".to_string(),
            });
        }
        self.record_registration(&qualified, DefCategory::Custom, entity.kind);
        self.custom_map_mut(entity.kind).insert(qualified, entity);
        Ok(())
    }

    pub fn register_origin(&mut self, name: Option<String>, entity: OriginEntity) {
        let key = name
            .clone()
            .map(|n| self.qualify(&n))
            .unwrap_or_else(|| format!("__anon_origin_{}", self.origins.len()));
        self.origins.insert(key, entity);
    }

    pub fn register_import(&mut self, entity: ImportEntity) {
        self.imports.push(entity);
    }

    pub fn register_namespace(&mut self, name: &str, parent: Option<String>) {
        self.namespaces
            .entry(name.to_string())
            .or_insert_with(|| NamespaceEntity {
                name: name.to_string(),
                parent,
                children: Vec::new(),
                exports: HashSet::new(),
            });
    }

    /// Looks up the qualified name first, then falls back to the bare
    /// name as a global lookup.
    pub fn find_template(&self, kind: DefKind, name: &str) -> Option<&TemplateEntity> {
        let qualified = self.qualify(name);
        self.template_map(kind)
            .get(&qualified)
            .or_else(|| self.template_map(kind).get(name))
    }

    pub fn find_custom(&self, kind: DefKind, name: &str) -> Option<&CustomEntity> {
        let qualified = self.qualify(name);
        self.custom_map(kind)
            .get(&qualified)
            .or_else(|| self.custom_map(kind).get(name))
    }

    /// Names of every registered `@Var` template or custom, qualified
    /// form first — used to populate a `ScriptEnv` for the CHTL-JS
    /// hook.
    pub fn var_group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .var_templates
            .keys()
            .chain(self.var_customs.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn find_origin(&self, name: &str) -> Option<&OriginEntity> {
        let qualified = self.qualify(name);
        self.origins.get(&qualified).or_else(|| self.origins.get(name))
    }

    /// All `(category, kind)` pairs a qualified name is registered
    /// under, used to build an `AmbiguousTemplateCustomReference`
    /// warning when a bare `@K Name` use-site matches both a Template
    /// and a Custom.
    pub fn conflicts_for(&self, qualified_name: &str) -> &[(DefCategory, DefKind)] {
        self.registrations
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when both a Template and a Custom of `kind` are registered
    /// under `name` in the current namespace.
    pub fn has_template_custom_conflict(&self, kind: DefKind, name: &str) -> bool {
        let qualified = self.qualify(name);
        let has_template = self.template_map(kind).contains_key(&qualified)
            || self.template_map(kind).contains_key(name);
        let has_custom =
            self.custom_map(kind).contains_key(&qualified) || self.custom_map(kind).contains_key(name);
        has_template && has_custom
    }

    /// Resolves a bare `@K Name` use-site that matches both a Template
    /// and a Custom of `kind` by last-declared-wins: `Some(true)` if
    /// the Custom was registered after the Template, `Some(false)` the
    /// other way round, `None` if fewer than two registrations of
    /// `kind` exist under `name`.
    pub fn last_declared_is_custom(&self, kind: DefKind, name: &str) -> Option<bool> {
        let qualified = self.qualify(name);
        let entries = self
            .registrations
            .get(&qualified)
            .or_else(|| self.registrations.get(name))?;
        entries
            .iter()
            .rev()
            .find(|(_, k)| *k == kind)
            .map(|(cat, _)| *cat == DefCategory::Custom)
    }

    /// Marks `path` loaded, returning `false` if it already was.
    pub fn mark_loaded(&mut self, canonical_path: &str) -> bool {
        self.loaded_files.insert(canonical_path.to_string())
    }

    pub fn is_loaded(&self, canonical_path: &str) -> bool {
        self.loaded_files.contains(canonical_path)
    }

    pub fn register_cjmod(&mut self, qualified_name: String, functions: Vec<String>) {
        self.cjmod_exports.insert(qualified_name, functions);
    }

    pub fn find_cjmod(&self, name: &str) -> Option<&[String]> {
        let qualified = self.qualify(name);
        self.cjmod_exports
            .get(&qualified)
            .or_else(|| self.cjmod_exports.get(name))
            .map(Vec::as_slice)
    }

    // --- direct-key insertion, used by the import resolver
    // to place entities loaded from another file's registry under the
    // *importing* namespace path rather than whatever namespace the
    // sub-compilation happened to be in when it registered them. ---

    pub fn insert_template_at(&mut self, qualified_key: String, entity: TemplateEntity) -> Result<(), Conflict> {
        if self.template_map(entity.kind).contains_key(&qualified_key) {
            return Err(Conflict {
                qualified_name: qualified_key,
                message: "duplicate template registration (imported)".to_string(),
            });
        }
        self.record_registration(&qualified_key, DefCategory::Template, entity.kind);
        self.template_map_mut(entity.kind).insert(qualified_key, entity);
        Ok(())
    }

    pub fn insert_custom_at(&mut self, qualified_key: String, entity: CustomEntity) -> Result<(), Conflict> {
        if self.custom_map(entity.kind).contains_key(&qualified_key) {
            return Err(Conflict {
                qualified_name: qualified_key,
                message: "duplicate custom registration (imported)".to_string(),
            });
        }
        self.record_registration(&qualified_key, DefCategory::Custom, entity.kind);
        self.custom_map_mut(entity.kind).insert(qualified_key, entity);
        Ok(())
    }

    pub fn insert_origin_at(&mut self, qualified_key: String, entity: OriginEntity) {
        self.origins.insert(qualified_key, entity);
    }

    /// Merges every entity `other` registered — each reinserted under
    /// `namespace_prefix` joined to its own qualified key — into
    /// `self`, reporting a `ConflictingRegistration` diagnostic per
    /// collision rather than aborting the whole import. `loaded_files`
    /// is unioned unconditionally: a file loaded while compiling `other` must
    /// never be re-entered through a different import path either.
    pub fn merge_from(
        &mut self,
        other: Registry,
        namespace_prefix: &str,
        position: Position,
        diagnostics: &mut DiagnosticBag,
    ) {
        let prefixed = |key: &str| -> String {
            if namespace_prefix.is_empty() {
                key.to_string()
            } else {
                format!("{namespace_prefix}.{key}")
            }
        };

        for (key, entity) in other.style_templates.into_iter().chain(other.element_templates.into_iter()).chain(other.var_templates.into_iter()) {
            if let Err(conflict) = self.insert_template_at(prefixed(&key), entity) {
                diagnostics.push(conflict_diagnostic(&conflict, position));
            }
        }
        for (key, entity) in other.style_customs.into_iter().chain(other.element_customs.into_iter()).chain(other.var_customs.into_iter()) {
            if let Err(conflict) = self.insert_custom_at(prefixed(&key), entity) {
                diagnostics.push(conflict_diagnostic(&conflict, position));
            }
        }
        for (key, entity) in other.origins {
            self.insert_origin_at(prefixed(&key), entity);
        }
        for (key, functions) in other.cjmod_exports {
            self.cjmod_exports.insert(prefixed(&key), functions);
        }
        for (name, ns) in other.namespaces {
            self.namespaces.entry(prefixed(&name)).or_insert(ns);
        }
        self.loaded_files.extend(other.loaded_files);
    }

    /// Pulls a single named entity
    /// out of `other` and registers it in `self` under `alias` (or its
    /// own name) qualified by `namespace_prefix`.
    pub fn import_selective(
        &mut self,
        other: &Registry,
        kind: SelectiveKindLookup,
        name: &str,
        rename: Option<&str>,
        namespace_prefix: &str,
        position: Position,
        diagnostics: &mut DiagnosticBag,
    ) {
        let target_name = rename.unwrap_or(name);
        let key = if namespace_prefix.is_empty() {
            target_name.to_string()
        } else {
            format!("{namespace_prefix}.{target_name}")
        };
        match kind {
            SelectiveKindLookup::Template(def_kind) => {
                let Some(entity) = other.template_map(def_kind).get(name).or_else(|| other.template_map(def_kind).get(&other.qualify(name))) else {
                    diagnostics.error(DiagnosticKind::UndefinedReference, position, format!("no such template '{name}' in imported file"));
                    return;
                };
                let mut entity = entity.clone();
                entity.name = target_name.to_string();
                if let Err(conflict) = self.insert_template_at(key, entity) {
                    diagnostics.push(conflict_diagnostic(&conflict, position));
                }
            }
            SelectiveKindLookup::Custom(def_kind) => {
                let Some(entity) = other.custom_map(def_kind).get(name).or_else(|| other.custom_map(def_kind).get(&other.qualify(name))) else {
                    diagnostics.error(DiagnosticKind::UndefinedReference, position, format!("no such custom '{name}' in imported file"));
                    return;
                };
                let mut entity = entity.clone();
                entity.name = target_name.to_string();
                if let Err(conflict) = self.insert_custom_at(key, entity) {
                    diagnostics.push(conflict_diagnostic(&conflict, position));
                }
            }
            SelectiveKindLookup::Origin => {
                let Some(entity) = other.find_origin(name) else {
                    diagnostics.error(DiagnosticKind::UndefinedReference, position, format!("no such origin '{name}' in imported file"));
                    return;
                };
                let mut entity = entity.clone();
                entity.name = Some(target_name.to_string());
                self.insert_origin_at(key, entity);
            }
        }
    }
}

/// Which of the registry's three per-kind map pairs a selective import
/// targets.
#[derive(Debug, Clone, Copy)]
pub enum SelectiveKindLookup {
    Template(DefKind),
    Custom(DefKind),
    Origin,
}

pub fn conflict_diagnostic(conflict: &Conflict, position: Position) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::ConflictingRegistration,
        position,
        format!("{}: {}", conflict.qualified_name, conflict.message),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ast;

    fn entity(name: &str) -> TemplateEntity {
        TemplateEntity {
            name: name.to_string(),
            kind: DefKind::Style,
            namespace_path: String::new(),
            inheritance_chain: Vec::new(),
            parameter_map: Vec::new(),
            required_params: Vec::new(),
            is_abstract: false,
            body: Ast::new(0),
        }
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let mut registry = Registry::new();
        registry.register_template(entity("Card")).unwrap();
        let err = registry.register_template(entity("Card")).unwrap_err();
        assert_eq!(err.qualified_name, "Card");
    }

    #[test]
    fn lookup_prefers_qualified_then_falls_back_to_bare() {
        let mut registry = Registry::new();
        registry.register_template(entity("Card")).unwrap();
        registry.current_namespace = "ui".to_string();
        assert!(registry.find_template(DefKind::Style, "Card").is_some());
    }
}
