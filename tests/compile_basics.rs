//! End to end compilation tests exercising the public `chtl::compile`
//! entry point for a single file, without imports.

use chtl::{compile, CompileOptions};

fn compile_ok(source: &str) -> chtl::CompileOutputs {
    let output = compile(source, CompileOptions::new("memory://test.chtl"));
    assert!(output.succeeded(), "unexpected diagnostics: {:?}", output.diagnostics);
    output
}

#[test]
fn nested_elements_with_attributes_and_text() {
    let output = compile_ok(
        r#"
        html {
            body {
                div {
                    id: "app";
                    class: "container wide";
                    text { "hello world" }
                }
            }
        }
        "#,
    );
    assert!(output.html.contains("<div id=\"app\" class=\"container wide\">"));
    assert!(output.html.contains("hello world"));
    assert!(output.html.contains("</div>"));
}

#[test]
fn unquoted_literal_text_is_accepted() {
    let output = compile_ok(
        r#"
        div {
            text { unquoted }
        }
        "#,
    );
    assert!(output.html.contains("unquoted"));
}

#[test]
fn script_block_is_emitted_to_js_output() {
    let output = compile_ok(
        r#"
        div {
            id: "btn";
            script {
                console.log("clicked");
            }
        }
        "#,
    );
    assert!(output.js.contains("console.log"));
}

#[test]
fn local_style_block_hoists_a_class_scoped_rule() {
    let output = compile_ok(
        r#"
        div {
            class: "box";
            style {
                .box {
                    color: blue;
                    width: 10px;
                }
            }
        }
        "#,
    );
    assert!(output.css.contains(".box"));
    assert!(output.css.contains("color: blue"));
    assert!(output.css.contains("width: 10px"));
}

#[test]
fn origin_html_passes_raw_markup_through_untouched() {
    let output = compile_ok(
        r#"
        div {
            [Origin] @Html {
                <marquee>raw</marquee>
            }
        }
        "#,
    );
    assert!(output.html.contains("<marquee>raw</marquee>"));
}

#[test]
fn undefined_style_template_reference_is_reported() {
    let output = compile(
        r#"
        div {
            style {
                .box {
                    @Style Ghost;
                }
            }
        }
        "#,
        CompileOptions::new("memory://test.chtl"),
    );
    assert!(!output.succeeded());
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == chtl::DiagnosticKind::UndefinedReference));
}
