//! `[Info]`/`[Export]` metadata parsing for packaged modules.
//!
//! `info/<name>.chtl` holds an `[Info] { key = "value"; … }` block plus
//! an optional `[Export] { … }` block. Both are scanned directly off
//! the token stream, the same lightweight way [`crate::config::prescan`]
//! reads a `[Configuration]` block, since neither needs a full AST.

use std::path::Path;

use crate::config::Config;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Default)]
pub struct ModuleInfo {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub category: Option<String>,
    pub min_chtl_version: Option<String>,
    pub max_chtl_version: Option<String>,
    pub dependencies: Vec<String>,
    /// Entity names named inside `[Export] { … }`; empty means
    /// everything top-level is visible.
    pub exports: Vec<String>,
}

/// Loads `<package_dir>/info/<default_name>.chtl`, falling back to any
/// single `.chtl` file directly under `info/` if a name match isn't
/// found (tolerating a sub-module whose directory name differs from
/// its declared `name` key).
pub fn load_module_info(package_dir: &Path, default_name: &str) -> Result<ModuleInfo, String> {
    let info_dir = package_dir.join("info");
    let named = info_dir.join(format!("{default_name}.chtl"));
    let info_path = if named.is_file() {
        named
    } else {
        find_sole_info_file(&info_dir)
            .ok_or_else(|| format!("missing info/{default_name}.chtl in {}", package_dir.display()))?
    };

    let source = std::fs::read_to_string(&info_path)
        .map_err(|err| format!("{}: {err}", info_path.display()))?;
    let config = Config::default();
    let tokens = Lexer::new(&source, 0, &config).tokenize().tokens;
    Ok(parse_info_tokens(&tokens, default_name))
}

fn find_sole_info_file(info_dir: &Path) -> Option<std::path::PathBuf> {
    let entries = std::fs::read_dir(info_dir).ok()?;
    let mut candidates: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "chtl"))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

fn parse_info_tokens(tokens: &[Token], default_name: &str) -> ModuleInfo {
    let mut info = ModuleInfo {
        name: default_name.to_string(),
        ..ModuleInfo::default()
    };
    let mut i = 0usize;
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::BlockInfo => {
                i += 1;
                if tokens.get(i).map(|t| t.kind) == Some(TokenKind::LBrace) {
                    i = scan_info_body(tokens, i + 1, &mut info);
                }
            }
            TokenKind::BlockExport => {
                i += 1;
                if tokens.get(i).map(|t| t.kind) == Some(TokenKind::LBrace) {
                    i = scan_export_body(tokens, i + 1, &mut info);
                }
            }
            TokenKind::Eof => break,
            _ => i += 1,
        }
    }
    info
}

fn scan_info_body(tokens: &[Token], mut i: usize, info: &mut ModuleInfo) -> usize {
    while i < tokens.len() && tokens[i].kind != TokenKind::RBrace {
        let key = tokens[i].lexeme.clone();
        i += 1;
        if tokens.get(i).map(|t| t.kind.is_assign_like()) == Some(true) {
            i += 1;
        }
        let value = tokens.get(i).map(|t| t.lexeme.clone()).unwrap_or_default();
        i += 1;
        if tokens.get(i).map(|t| t.kind) == Some(TokenKind::Semicolon) {
            i += 1;
        }
        match key.as_str() {
            "name" => info.name = value,
            "version" => info.version = Some(value),
            "description" => info.description = Some(value),
            "author" => info.author = Some(value),
            "license" => info.license = Some(value),
            "category" => info.category = Some(value),
            "minCHTLVersion" => info.min_chtl_version = Some(value),
            "maxCHTLVersion" => info.max_chtl_version = Some(value),
            "dependencies" => {
                info.dependencies = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {}
        }
    }
    (i + 1).min(tokens.len())
}

fn scan_export_body(tokens: &[Token], mut i: usize, info: &mut ModuleInfo) -> usize {
    while i < tokens.len() && tokens[i].kind != TokenKind::RBrace {
        if tokens[i].kind == TokenKind::Semicolon || tokens[i].kind == TokenKind::Comma {
            i += 1;
            continue;
        }
        info.exports.push(tokens[i].lexeme.clone());
        i += 1;
    }
    (i + 1).min(tokens.len())
}
