//! Multi-file `[Import]` resolution tests, driven through the public
//! `chtl::compile_file` entry point against real files in a scratch
//! directory.

use std::fs;

use chtl::{compile_file, CompileOptions};
use tempfile::tempdir;

#[test]
fn sibling_chtl_file_is_imported_and_its_templates_are_usable() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("theme.chtl"),
        r#"
        [Template] @Style Base {
            color: purple;
        }
        "#,
    )
    .unwrap();
    let entry = dir.path().join("main.chtl");
    fs::write(
        &entry,
        r#"
        [Import] @Chtl from "theme.chtl"
        div {
            class: "box";
            style {
                .box {
                    @Style Base;
                }
            }
        }
        "#,
    )
    .unwrap();

    let output = compile_file(&entry, |opts| opts);
    assert!(output.succeeded(), "unexpected diagnostics: {:?}", output.diagnostics);
    assert!(output.css.contains("color: purple"));
}

#[test]
fn circular_chtl_imports_report_without_hanging() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("a.chtl"),
        r#"[Import] @Chtl from "b.chtl""#,
    )
    .unwrap();
    fs::write(
        dir.path().join("b.chtl"),
        r#"[Import] @Chtl from "a.chtl""#,
    )
    .unwrap();
    let entry = dir.path().join("a.chtl");

    let output = compile_file(&entry, |opts| opts);
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == chtl::DiagnosticKind::CircularImport));
}

#[test]
fn raw_html_import_is_registered_as_an_anonymous_origin() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("snippet.html"), "<hr class=\"rule\">").unwrap();
    let entry = dir.path().join("main.chtl");
    fs::write(
        &entry,
        r#"
        [Import] @Html from "snippet.html"
        div {
            [Origin] @Html {
                placeholder
            }
        }
        "#,
    )
    .unwrap();

    let output = compile_file(&entry, |opts| opts);
    assert!(output.succeeded(), "unexpected diagnostics: {:?}", output.diagnostics);
}

#[test]
fn missing_import_target_is_reported_as_module_io_error() {
    let dir = tempdir().unwrap();
    let entry = dir.path().join("main.chtl");
    fs::write(
        &entry,
        r#"[Import] @Chtl from "does_not_exist.chtl""#,
    )
    .unwrap();

    let output = compile_file(&entry, |opts| opts);
    assert!(!output.succeeded());
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == chtl::DiagnosticKind::FileNotFound));
}

#[test]
fn packaged_cmod_module_with_info_and_src_is_importable() {
    let dir = tempdir().unwrap();
    let module_dir = dir.path().join("module").join("widgets.cmod");
    fs::create_dir_all(module_dir.join("info")).unwrap();
    fs::create_dir_all(module_dir.join("src")).unwrap();
    fs::write(
        module_dir.join("info").join("widgets.chtl"),
        r#"
        [Info] {
            name = widgets;
            version = "1.0.0";
        }
        "#,
    )
    .unwrap();
    fs::write(
        module_dir.join("src").join("button.chtl"),
        r#"
        [Template] @Element Button {
            div {
                class: "btn";
            }
        }
        "#,
    )
    .unwrap();

    let entry = dir.path().join("main.chtl");
    fs::write(
        &entry,
        r#"
        [Import] @Chtl from "chtl::widgets"
        body {
            @Element Button;
        }
        "#,
    )
    .unwrap();

    let output = compile_file(&entry, |opts| opts);
    assert!(output.succeeded(), "unexpected diagnostics: {:?}", output.diagnostics);
    assert!(output.html.contains("btn"));
}
