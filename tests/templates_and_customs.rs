//! Template/Custom inheritance, specialization and variable-group
//! tests.

use chtl::{compile, CompileOptions};

fn compile_ok(source: &str) -> chtl::CompileOutputs {
    let output = compile(source, CompileOptions::new("memory://test.chtl"));
    assert!(output.succeeded(), "unexpected diagnostics: {:?}", output.diagnostics);
    output
}

#[test]
fn style_template_inherits_properties_from_its_parent() {
    let output = compile_ok(
        r#"
        [Template] @Style Base {
            color: red;
            font-size: 12px;
        }
        [Template] @Style Derived {
            inherit @Style Base;
            font-weight: bold;
        }
        div {
            class: "box";
            style {
                .box {
                    @Style Derived;
                }
            }
        }
        "#,
    );
    assert!(output.css.contains("color: red"));
    assert!(output.css.contains("font-size: 12px"));
    assert!(output.css.contains("font-weight: bold"));
}

#[test]
fn custom_element_deletes_an_inherited_property() {
    let output = compile_ok(
        r#"
        [Template] @Style Base {
            color: red;
            font-size: 12px;
        }
        [Custom] @Style Trimmed {
            inherit @Style Base;
            delete font-size;
        }
        div {
            class: "box";
            style {
                .box {
                    @Style Trimmed;
                }
            }
        }
        "#,
    );
    assert!(output.css.contains("color: red"));
    assert!(!output.css.contains("font-size"));
}

#[test]
fn custom_element_use_site_can_replace_a_child() {
    let output = compile_ok(
        r#"
        [Custom] @Element Card {
            div {
                class: "title";
                text { "old" }
            }
        }
        body {
            @Element Card;
            replace div[0] {
                div {
                    class: "title";
                    text { "new" }
                }
            }
        }
        "#,
    );
    assert!(output.html.contains("new"));
    assert!(!output.html.contains("old"));
}

#[test]
fn var_group_reference_in_style_property_is_substituted() {
    let output = compile_ok(
        r#"
        [Template] @Var Palette {
            primary: "#336699";
        }
        div {
            class: "box";
            style {
                .box {
                    color: Palette(primary);
                }
            }
        }
        "#,
    );
    assert!(output.css.contains("#336699"));
}

#[test]
fn var_group_reference_with_default_falls_back_when_missing() {
    let output = compile_ok(
        r#"
        [Template] @Var Palette {
            primary: "#336699";
        }
        div {
            class: "box";
            style {
                .box {
                    color: Palette(accent=#000000);
                }
            }
        }
        "#,
    );
    assert!(output.css.contains("#000000"));
}

#[test]
fn circular_inheritance_is_reported_not_hung() {
    let output = compile(
        r#"
        [Template] @Style A {
            inherit @Style B;
        }
        [Template] @Style B {
            inherit @Style A;
        }
        div {
            style {
                .x {
                    @Style A;
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
        .any(|d| d.kind == chtl::DiagnosticKind::CircularInheritance));
}

#[test]
fn namespaced_template_is_reachable_from_inside_its_own_namespace() {
    let output = compile_ok(
        r#"
        [Namespace] theme {
            [Template] @Style Base {
                color: green;
            }
            div {
                class: "box";
                style {
                    .box {
                        @Style Base;
                    }
                }
            }
        }
        "#,
    );
    assert!(output.css.contains("color: green"));
}
