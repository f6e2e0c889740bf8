//! Compilation entry point.
//!
//! Wires the pipeline the rest of this crate implements piecewise:
//! lex (twice, for `[Configuration]` prescan) → parse → resolve
//! imports → resolve templates/customs → generate. The CLI driver
//! (`src/bin/chtlc.rs`) is the only intended caller outside tests.

use std::path::{Path, PathBuf};

use crate::codegen::{self, GeneratedOutput, ScriptHook};
use crate::config::{self, Config};
use crate::diagnostics::{Diagnostic, DiagnosticBag};
use crate::import::{self, ModuleRoots};
use crate::lexer::Lexer;
use crate::parser::{ParseOutput, Parser};
use crate::registry::Registry;

/// Inputs to a single compilation.
pub struct CompileOptions<'a> {
    /// The entry file's own path, used to seed import search order and
    /// to tag diagnostics/positions with a file id. Does not need to
    /// exist on disk (tests may pass a synthetic path).
    pub entry_path: PathBuf,
    /// Overrides the default module search roots; `None` derives them
    /// from `entry_path`.
    pub module_roots: Option<ModuleRoots>,
    /// Returns early with whatever partial output is available instead
    /// of requiring a clean parse.
    pub allow_partial: bool,
    pub script_hook: Option<&'a ScriptHook<'a>>,
}

impl<'a> CompileOptions<'a> {
    pub fn new(entry_path: impl Into<PathBuf>) -> Self {
        Self {
            entry_path: entry_path.into(),
            module_roots: None,
            allow_partial: true,
            script_hook: None,
        }
    }

    pub fn with_script_hook(mut self, hook: &'a ScriptHook<'a>) -> Self {
        self.script_hook = Some(hook);
        self
    }
}

pub struct CompileOutputs {
    pub html: String,
    pub css: String,
    pub js: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutputs {
    pub fn succeeded(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Compiles one `.chtl` source string start to finish: the full
/// lex/parse/resolve/generate pipeline, minus the CHTL-JS sub-compiler
/// itself, which is plugged in through `options.script_hook`.
pub fn compile(source: &str, options: CompileOptions<'_>) -> CompileOutputs {
    let file_id = 0u32;
    let mut diagnostics = DiagnosticBag::new();

    let default_config = Config::default();
    let prescan_tokens = Lexer::new(source, file_id, &default_config).tokenize().tokens;
    let mut resolved_config = config::prescan(&prescan_tokens);

    let lexed = Lexer::new(source, file_id, &resolved_config).tokenize();
    diagnostics.extend(lexed.diagnostics);

    let parsed = Parser::new(&lexed.tokens, source, file_id, &resolved_config).parse();
    let ParseOutput { mut ast, mut registry, diagnostics: parse_diag } = parsed;
    diagnostics.extend(parse_diag);

    let roots = options
        .module_roots
        .unwrap_or_else(|| ModuleRoots::for_importing_file(&options.entry_path));
    import::resolve_imports(&mut ast, &options.entry_path, &mut registry, &mut resolved_config, &mut diagnostics, &roots);

    if !options.allow_partial && diagnostics.has_errors() {
        return CompileOutputs {
            html: String::new(),
            css: String::new(),
            js: String::new(),
            diagnostics: diagnostics.into_vec(),
        };
    }

    crate::resolve::resolve(&mut ast, &registry, &resolved_config, &mut diagnostics);

    let GeneratedOutput { html, css, js } =
        codegen::generate(&mut ast, &registry, &resolved_config, &mut diagnostics, options.script_hook);

    CompileOutputs {
        html,
        css,
        js,
        diagnostics: diagnostics.into_vec(),
    }
}

/// Reads `path` and compiles it. Returns
/// an `Unreadable` diagnostic rather than erroring if the file can't
/// be read, matching every other file-IO failure path in this crate.
pub fn compile_file(path: &Path, options_builder: impl FnOnce(CompileOptions<'_>) -> CompileOptions<'_>) -> CompileOutputs {
    let source = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            let mut diagnostics = DiagnosticBag::new();
            diagnostics.error(
                crate::diagnostics::DiagnosticKind::Unreadable,
                crate::token::Position::start(0),
                format!("{}: {err}", path.display()),
            );
            return CompileOutputs {
                html: String::new(),
                css: String::new(),
                js: String::new(),
                diagnostics: diagnostics.into_vec(),
            };
        }
    };
    let options = options_builder(CompileOptions::new(path.to_path_buf()));
    compile(&source, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_minimal_document() {
        let source = r#"
            html {
                body {
                    div {
                        id: "root";
                        text { "hello" }
                    }
                }
            }
        "#;
        let options = CompileOptions::new("memory://test.chtl");
        let output = compile(source, options);
        assert!(output.succeeded(), "{:?}", output.diagnostics);
        assert!(output.html.contains("<div id=\"root\">"));
        assert!(output.html.contains("hello"));
    }

    #[test]
    fn style_template_expands_into_hoisted_css() {
        let source = r#"
            [Template] @Style Base {
                color: red;
            }
            div {
                class: "box";
                style {
                    .box {
                        @Style Base;
                    }
                }
            }
        "#;
        let options = CompileOptions::new("memory://test.chtl");
        let output = compile(source, options);
        assert!(output.succeeded(), "{:?}", output.diagnostics);
        assert!(output.css.contains("color: red"));
    }
}
