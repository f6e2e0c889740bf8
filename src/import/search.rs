//! Search-path resolution for `[Import]` logical paths.
//!
//! Three directories are tried in order: a fixed official module root,
//! a `module/` directory next to the current working directory, and
//! the importing file's own directory. A `chtl::` prefix restricts the
//! search to the official root only.

use std::path::{Path, PathBuf};

/// The two directory roots a compilation-wide search consults before
/// falling back to the importing file's own directory.
#[derive(Debug, Clone)]
pub struct ModuleRoots {
    pub official: PathBuf,
    pub cwd_module: PathBuf,
}

impl ModuleRoots {
    pub fn new(official: PathBuf, cwd_module: PathBuf) -> Self {
        Self { official, cwd_module }
    }

    /// Builds the default roots: the official module directory (taken
    /// from `CHTL_MODULE_PATH` if set, else `module/` relative to the
    /// entry file's directory) and `module/` next to the process's
    /// current working directory.
    pub fn for_importing_file(importing_file: &Path) -> Self {
        let entry_dir = importing_file.parent().unwrap_or_else(|| Path::new("."));
        let official = std::env::var_os("CHTL_MODULE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| entry_dir.join("module"));
        let cwd_module = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("module");
        Self { official, cwd_module }
    }
}

/// Resolves a `@Chtl`/`@Config`/selective-import logical path to a
/// file or package directory, preferring `.cmod` over `.chtl`. A
/// literal `.chtl`/`.cmod` suffix in `logical_path` is honored as-is
/// rather than re-appended.
pub fn resolve_chtl_path(logical_path: &str, importing_dir: &Path, roots: &ModuleRoots) -> Option<PathBuf> {
    if let Some(name) = logical_path.strip_prefix("chtl::") {
        return resolve_in(name, &[official_cmod_dir(roots), official_cjmod_dir(roots), roots.official.clone()]);
    }
    if let Some(abs) = as_absolute(logical_path) {
        return Some(abs);
    }
    resolve_in(logical_path, &[roots.official.clone(), roots.cwd_module.clone(), importing_dir.to_path_buf()])
}

/// Resolves a `@CJmod` logical path the same way as [`resolve_chtl_path`]
/// but preferring a `.cjmod` package directory.
pub fn resolve_cjmod_path(logical_path: &str, importing_dir: &Path, roots: &ModuleRoots) -> Option<PathBuf> {
    if let Some(name) = logical_path.strip_prefix("chtl::") {
        return resolve_in(name, &[official_cjmod_dir(roots), roots.official.clone()]);
    }
    if let Some(abs) = as_absolute(logical_path) {
        return Some(abs);
    }
    resolve_in(logical_path, &[roots.official.clone(), roots.cwd_module.clone(), importing_dir.to_path_buf()])
}

/// Resolves a raw `@Html`/`@Style`/`@JavaScript` import target: no
/// extension substitution, just the literal path tried across the
/// same three search directories.
pub fn resolve_asset_path(logical_path: &str, importing_dir: &Path, roots: &ModuleRoots) -> Option<PathBuf> {
    if let Some(abs) = as_absolute(logical_path) {
        return Some(abs);
    }
    for dir in [roots.official.clone(), roots.cwd_module.clone(), importing_dir.to_path_buf()] {
        let candidate = dir.join(logical_path);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

fn as_absolute(logical_path: &str) -> Option<PathBuf> {
    let path = Path::new(logical_path);
    if path.is_absolute() && path.exists() {
        Some(path.to_path_buf())
    } else {
        None
    }
}

fn official_cmod_dir(roots: &ModuleRoots) -> PathBuf {
    roots.official.join("CMOD")
}

fn official_cjmod_dir(roots: &ModuleRoots) -> PathBuf {
    roots.official.join("CJMOD")
}

/// Tries each directory in `dirs`, in order, for `<dir>/<name>.cmod`
/// (as a package directory), then `<dir>/<name>.chtl` (as a plain
/// file), then the bare `<dir>/<name>` (already-suffixed or
/// extensionless logical paths).
fn resolve_in(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    if name.ends_with(".chtl") || name.ends_with(".cmod") {
        for dir in dirs {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        return None;
    }
    for dir in dirs {
        let cmod = dir.join(format!("{name}.cmod"));
        if cmod.is_dir() {
            return Some(cmod);
        }
    }
    for dir in dirs {
        let chtl = dir.join(format!("{name}.chtl"));
        if chtl.is_file() {
            return Some(chtl);
        }
    }
    for dir in dirs {
        let bare = dir.join(name);
        if bare.exists() {
            return Some(bare);
        }
    }
    None
}
