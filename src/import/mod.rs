//! Import resolver & module loader.
//!
//! Runs as a pass over the already-parsed document's `Import` nodes:
//! for each one, resolves a logical path to a file via the three-
//! directory search order, re-enters the lexer and parser on it, and
//! merges the result into the compilation's [`Registry`]. Implemented
//! as a dedicated post-parse sweep in document order rather than
//! inline recursion inside [`crate::parser::Parser`], so the parser's
//! own unit tests don't need a filesystem.
//!
//! File reads and directory walks go through `std::fs` and [`walkdir`].

mod info;
mod search;

pub use info::ModuleInfo;
pub use search::ModuleRoots;

use std::path::{Path, PathBuf};

use ego_tree::NodeId;

use crate::ast::{Ast, DefKind, ImportData, ImportKind, NodeKind, SelectiveKind};
use crate::config::Config;
use crate::diagnostics::{DiagnosticBag, DiagnosticKind};
use crate::lexer::Lexer;
use crate::parser::{ParseOutput, Parser};
use crate::registry::{OriginEntity, Registry, SelectiveKindLookup};
use crate::token::Position;

/// One file currently being loaded, tracked to detect `CircularImport`:
/// a load that re-enters a file already on the active chain reports it
/// instead of recursing forever.
pub type LoadChain = Vec<String>;

/// Resolves every `Import` node reachable from `ast`'s root, in
/// document order, mutating `registry` and `config` in place.
/// `importing_file` is the entry file's own path, used to seed the
/// search order's "directory of the importing file" leg.
pub fn resolve_imports(
    ast: &mut Ast,
    importing_file: &Path,
    registry: &mut Registry,
    config: &mut Config,
    diagnostics: &mut DiagnosticBag,
    roots: &ModuleRoots,
) {
    let mut chain = vec![canonicalize_best_effort(importing_file)];
    resolve_imports_in(ast, importing_file, registry, config, diagnostics, roots, &mut chain);
}

fn resolve_imports_in(
    ast: &Ast,
    importing_file: &Path,
    registry: &mut Registry,
    config: &mut Config,
    diagnostics: &mut DiagnosticBag,
    roots: &ModuleRoots,
    chain: &mut LoadChain,
) {
    let import_ids: Vec<NodeId> = ast
        .descendants(ast.root_id())
        .filter(|n| matches!(n.value().kind, NodeKind::Import(_)))
        .map(|n| n.id())
        .collect();

    let importing_dir = importing_file.parent().unwrap_or_else(|| Path::new("."));

    for id in import_ids {
        let Some(node) = ast.get(id) else { continue };
        let data = match &node.value().kind {
            NodeKind::Import(d) => d.clone(),
            _ => continue,
        };
        let pos = node.value().position;
        let namespace_path = namespace_path_of(ast, id);
        process_import(
            &data,
            pos,
            &namespace_path,
            importing_dir,
            registry,
            config,
            diagnostics,
            roots,
            chain,
        );
    }
}

/// Reconstructs the `.`-joined namespace path `id` was declared under
/// by climbing parent `Namespace` nodes.
fn namespace_path_of(ast: &Ast, id: NodeId) -> String {
    let mut parts = Vec::new();
    let mut current = ast.parent_of(id);
    while let Some(parent_id) = current {
        if let Some(parent) = ast.get(parent_id) {
            if let NodeKind::Namespace(ns) = &parent.value().kind {
                parts.push(ns.name.clone());
            }
        }
        current = ast.parent_of(parent_id);
    }
    parts.reverse();
    parts.join(".")
}

fn process_import(
    data: &ImportData,
    pos: Position,
    namespace_path: &str,
    importing_dir: &Path,
    registry: &mut Registry,
    config: &mut Config,
    diagnostics: &mut DiagnosticBag,
    roots: &ModuleRoots,
    chain: &mut LoadChain,
) {
    match data.kind {
        ImportKind::Html | ImportKind::Style | ImportKind::JavaScript => {
            import_raw_asset(data, pos, namespace_path, importing_dir, registry, diagnostics, roots)
        }
        ImportKind::Config => import_config(data, pos, importing_dir, config, diagnostics, roots),
        ImportKind::CJmod => import_cjmod(data, pos, namespace_path, importing_dir, registry, diagnostics, roots),
        ImportKind::Chtl => {
            if let Some(selective) = &data.selective {
                import_selective(data, selective, pos, namespace_path, importing_dir, registry, diagnostics, roots)
            } else {
                import_chtl(data, pos, namespace_path, importing_dir, registry, config, diagnostics, roots, chain)
            }
        }
    }
}

fn import_raw_asset(
    data: &ImportData,
    pos: Position,
    namespace_path: &str,
    importing_dir: &Path,
    registry: &mut Registry,
    diagnostics: &mut DiagnosticBag,
    roots: &ModuleRoots,
) {
    let Some(path) = search::resolve_asset_path(&data.logical_path, importing_dir, roots) else {
        diagnostics.error(DiagnosticKind::FileNotFound, pos, format!("import target not found: {}", data.logical_path));
        return;
    };
    let raw_text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            diagnostics.error(DiagnosticKind::Unreadable, pos, format!("{}: {err}", path.display()));
            return;
        }
    };
    let origin_kind = match data.kind {
        ImportKind::Html => "Html",
        ImportKind::Style => "Style",
        ImportKind::JavaScript => "JavaScript",
        _ => unreachable!("import_raw_asset only called for Html/Style/JavaScript"),
    };
    let name = data
        .alias
        .clone()
        .unwrap_or_else(|| file_stem(&path));
    let key = qualify(namespace_path, &name);
    registry.insert_origin_at(
        key,
        OriginEntity {
            name: Some(name),
            kind: origin_kind.to_string(),
            raw_text,
            namespace_path: namespace_path.to_string(),
        },
    );
}

fn import_config(
    data: &ImportData,
    pos: Position,
    importing_dir: &Path,
    config: &mut Config,
    diagnostics: &mut DiagnosticBag,
    roots: &ModuleRoots,
) {
    let Some(path) = search::resolve_chtl_path(&data.logical_path, importing_dir, roots) else {
        diagnostics.error(DiagnosticKind::FileNotFound, pos, format!("configuration import not found: {}", data.logical_path));
        return;
    };
    let source = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            diagnostics.error(DiagnosticKind::Unreadable, pos, format!("{}: {err}", path.display()));
            return;
        }
    };
    let default_config = Config::default();
    let tokens = Lexer::new(&source, 0, &default_config).tokenize().tokens;
    let wanted = data.selective.as_ref().map(|s| s.name.as_str());
    let loaded = match wanted {
        Some(name) => crate::config::prescan_named(&tokens, name),
        None => Some(crate::config::prescan(&tokens)),
    };
    match loaded {
        Some(loaded) => config.merge(&loaded),
        None => diagnostics.error(
            DiagnosticKind::UndefinedReference,
            pos,
            format!("no such named configuration in {}", path.display()),
        ),
    }
}

fn import_cjmod(
    data: &ImportData,
    pos: Position,
    namespace_path: &str,
    importing_dir: &Path,
    registry: &mut Registry,
    diagnostics: &mut DiagnosticBag,
    roots: &ModuleRoots,
) {
    let Some(path) = search::resolve_cjmod_path(&data.logical_path, importing_dir, roots) else {
        diagnostics.error(DiagnosticKind::FileNotFound, pos, format!("CJmod not found: {}", data.logical_path));
        return;
    };
    let name = data.alias.clone().unwrap_or_else(|| file_stem(&path));
    match info::load_module_info(&path, &name) {
        Ok(module_info) => {
            let key = qualify(namespace_path, &name);
            registry.register_cjmod(key, module_info.exports);
        }
        Err(err) => diagnostics.error(DiagnosticKind::MalformedModule, pos, err),
    }
}

fn import_selective(
    data: &ImportData,
    selective: &crate::ast::SelectiveImport,
    pos: Position,
    namespace_path: &str,
    importing_dir: &Path,
    registry: &mut Registry,
    diagnostics: &mut DiagnosticBag,
    roots: &ModuleRoots,
) {
    let Some(path) = search::resolve_chtl_path(&data.logical_path, importing_dir, roots) else {
        diagnostics.error(DiagnosticKind::FileNotFound, pos, format!("import target not found: {}", data.logical_path));
        return;
    };
    let Some(sub) = load_and_parse(&path, diagnostics) else { return };
    diagnostics.extend(sub.diagnostics);

    let lookup = match selective.kind {
        SelectiveKind::Template => SelectiveKindLookup::Template(def_kind_from_prefix(&selective.type_prefix)),
        SelectiveKind::Custom => SelectiveKindLookup::Custom(def_kind_from_prefix(&selective.type_prefix)),
        SelectiveKind::Origin => SelectiveKindLookup::Origin,
    };
    registry.import_selective(
        &sub.registry,
        lookup,
        &selective.name,
        data.alias.as_deref(),
        namespace_path,
        pos,
        diagnostics,
    );
}

#[allow(clippy::too_many_arguments)]
fn import_chtl(
    data: &ImportData,
    pos: Position,
    namespace_path: &str,
    importing_dir: &Path,
    registry: &mut Registry,
    config: &mut Config,
    diagnostics: &mut DiagnosticBag,
    roots: &ModuleRoots,
    chain: &mut LoadChain,
) {
    let Some(path) = search::resolve_chtl_path(&data.logical_path, importing_dir, roots) else {
        diagnostics.error(DiagnosticKind::FileNotFound, pos, format!("import target not found: {}", data.logical_path));
        return;
    };

    if path.is_dir() {
        import_package(&path, pos, namespace_path, registry, config, diagnostics, roots, chain);
        return;
    }

    let canonical = canonicalize_best_effort(&path);
    if registry.is_loaded(&canonical) {
        return;
    }
    if chain.contains(&canonical) {
        diagnostics.error(
            DiagnosticKind::CircularImport,
            pos,
            format!("circular import: {} -> {canonical}", chain.join(" -> ")),
        );
        return;
    }

    registry.mark_loaded(&canonical);
    chain.push(canonical.clone());

    let Some(sub) = load_and_parse(&path, diagnostics) else {
        chain.pop();
        return;
    };
    let ParseOutput { ast: sub_ast, registry: sub_registry, diagnostics: sub_diag } = sub;
    diagnostics.extend(sub_diag);
    registry.merge_from(sub_registry, namespace_path, pos, diagnostics);

    let mut sub_ast = sub_ast;
    resolve_imports_in(&mut sub_ast, &path, registry, config, diagnostics, roots, chain);

    chain.pop();
}

/// A packaged `.cmod` module: an on-disk `src/`+`info/` directory pair.
/// No zip/archive format is implemented, only this directory contract.
#[allow(clippy::too_many_arguments)]
fn import_package(
    package_dir: &Path,
    pos: Position,
    namespace_path: &str,
    registry: &mut Registry,
    config: &mut Config,
    diagnostics: &mut DiagnosticBag,
    roots: &ModuleRoots,
    chain: &mut LoadChain,
) {
    let canonical = canonicalize_best_effort(package_dir);
    if registry.is_loaded(&canonical) {
        return;
    }
    if chain.contains(&canonical) {
        diagnostics.error(
            DiagnosticKind::CircularImport,
            pos,
            format!("circular import: {} -> {canonical}", chain.join(" -> ")),
        );
        return;
    }
    registry.mark_loaded(&canonical);
    chain.push(canonical.clone());

    let name = file_stem(package_dir);
    let module_info = match info::load_module_info(package_dir, &name) {
        Ok(info) => info,
        Err(err) => {
            diagnostics.error(DiagnosticKind::MissingModuleInfo, pos, err);
            chain.pop();
            return;
        }
    };

    for dependency in &module_info.dependencies {
        let dep_data = ImportData {
            kind: ImportKind::Chtl,
            logical_path: format!("chtl::{dependency}"),
            alias: None,
            selective: None,
        };
        process_import(&dep_data, pos, namespace_path, package_dir, registry, config, diagnostics, roots, chain);
    }

    let src_dir = package_dir.join("src");
    let mut source_files: Vec<PathBuf> = Vec::new();
    if src_dir.is_dir() {
        for entry in walkdir::WalkDir::new(&src_dir).sort_by_file_name() {
            let Ok(entry) = entry else { continue };
            if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "chtl") {
                source_files.push(entry.path().to_path_buf());
            }
        }
    }

    // `[Export]`-restricted visibility is not enforced
    // here: every top-level declaration in the package's source files
    // is merged in, the same as an unrestricted `@Chtl` import. See
    // DESIGN.md's Open Question notes.
    for file in source_files {
        let Some(sub) = load_and_parse(&file, diagnostics) else { continue };
        let ParseOutput { ast: mut sub_ast, registry: sub_registry, diagnostics: sub_diag } = sub;
        diagnostics.extend(sub_diag);
        registry.merge_from(sub_registry, namespace_path, pos, diagnostics);
        resolve_imports_in(&mut sub_ast, &file, registry, config, diagnostics, roots, chain);
    }

    chain.pop();
}

fn load_and_parse(path: &Path, diagnostics: &mut DiagnosticBag) -> Option<ParseOutput> {
    let source = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            diagnostics.error(DiagnosticKind::Unreadable, Position::start(0), format!("{}: {err}", path.display()));
            return None;
        }
    };
    let default_config = Config::default();
    let prescan_tokens = Lexer::new(&source, 0, &default_config).tokenize().tokens;
    let resolved_config = crate::config::prescan(&prescan_tokens);
    let tokens = Lexer::new(&source, 0, &resolved_config).tokenize().tokens;
    Some(Parser::new(&tokens, &source, 0, &resolved_config).parse())
}

fn def_kind_from_prefix(prefix: &str) -> DefKind {
    match prefix {
        "@Style" => DefKind::Style,
        "@Var" => DefKind::Var,
        _ => DefKind::Element,
    }
}

fn qualify(namespace_path: &str, name: &str) -> String {
    if namespace_path.is_empty() {
        name.to_string()
    } else {
        format!("{namespace_path}.{name}")
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("module").to_string()
}

fn canonicalize_best_effort(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstNode;
    use crate::token::Position;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn resolves_sibling_chtl_import() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "lib.chtl", "[Template] @Style Base { color: red; }");
        let entry_path = write_file(dir.path(), "main.chtl", "[Import] @Chtl from \"lib\";");

        let source = std::fs::read_to_string(&entry_path).unwrap();
        let config = Config::default();
        let tokens = Lexer::new(&source, 0, &config).tokenize().tokens;
        let mut out = Parser::new(&tokens, &source, 0, &config).parse();

        let roots = ModuleRoots::for_importing_file(&entry_path);
        resolve_imports(&mut out.ast, &entry_path, &mut out.registry, &mut Config::default(), &mut out.diagnostics, &roots);

        assert!(!out.diagnostics.has_errors());
        assert!(out.registry.find_template(DefKind::Style, "Base").is_some());
    }

    #[test]
    fn circular_import_reports_without_hanging() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b.chtl", "[Import] @Chtl from \"a\";");
        let a_path = write_file(dir.path(), "a.chtl", "[Import] @Chtl from \"b\";");

        let source = std::fs::read_to_string(&a_path).unwrap();
        let config = Config::default();
        let tokens = Lexer::new(&source, 0, &config).tokenize().tokens;
        let mut out = Parser::new(&tokens, &source, 0, &config).parse();

        let roots = ModuleRoots::for_importing_file(&a_path);
        resolve_imports(&mut out.ast, &a_path, &mut out.registry, &mut Config::default(), &mut out.diagnostics, &roots);

        assert!(out.diagnostics.iter().any(|d| d.kind == DiagnosticKind::CircularImport));
    }

    #[test]
    fn html_import_registers_anonymous_origin() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "banner.html", "<marquee>hi</marquee>");
        let entry_path = write_file(dir.path(), "main.chtl", "[Import] @Html from \"banner.html\";");

        let source = std::fs::read_to_string(&entry_path).unwrap();
        let config = Config::default();
        let tokens = Lexer::new(&source, 0, &config).tokenize().tokens;
        let mut out = Parser::new(&tokens, &source, 0, &config).parse();

        let roots = ModuleRoots::for_importing_file(&entry_path);
        resolve_imports(&mut out.ast, &entry_path, &mut out.registry, &mut Config::default(), &mut out.diagnostics, &roots);

        assert!(out.registry.find_origin("banner").is_some());
        assert_eq!(out.registry.find_origin("banner").unwrap().raw_text, "<marquee>hi</marquee>");
    }

    #[test]
    fn namespace_path_of_climbs_parent_namespaces() {
        let mut ast = Ast::new(0);
        let root = ast.root_id();
        let ns_id = ast.append_child(root, AstNode::new(NodeKind::Namespace(crate::ast::NamespaceData { name: "ui".to_string() }), Position::start(0)));
        let import_id = ast.append_child(
            ns_id,
            AstNode::new(
                NodeKind::Import(ImportData { kind: ImportKind::Chtl, logical_path: "x".to_string(), alias: None, selective: None }),
                Position::start(0),
            ),
        );
        assert_eq!(namespace_path_of(&ast, import_id), "ui");
    }
}
