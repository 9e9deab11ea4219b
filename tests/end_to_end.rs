//! End-to-end tests: markdown in, violations out
use std::process::Command;
use std::sync::Mutex;

use doc_structure_lint::template::{parse_templates, TemplateFormat, TemplateRegistry};
use doc_structure_lint::validation::{
    validate_structure, InstructionChecker, InstructionFailure, SkipInstructions, Violation,
};
use doc_structure_lint::{parse_markdown, ViolationKind};
use pretty_assertions::assert_eq;
use tower_lsp::async_trait;

fn registry(yaml: &str) -> TemplateRegistry {
    parse_templates(yaml, TemplateFormat::Yaml).expect("valid templates")
}

async fn lint(markdown: &str, templates: &str, name: &str) -> Vec<Violation> {
    lint_with(markdown, templates, name, &SkipInstructions).await
}

async fn lint_with(
    markdown: &str,
    templates: &str,
    name: &str,
    checker: &dyn InstructionChecker,
) -> Vec<Violation> {
    let registry = registry(templates);
    let template = registry.get(name).expect("template exists");
    let document = parse_markdown(markdown).expect("markdown parses");
    validate_structure(&document, &template.sections, checker)
        .await
        .expect("validation runs")
}

fn kinds(violations: &[Violation]) -> Vec<ViolationKind> {
    violations.iter().map(|v| v.kind).collect()
}

const INTRO: &str = r#"
templates:
  intro-only:
    sections:
      intro:
        heading:
          const: Introduction
        required: true
"#;

#[tokio::test]
async fn matching_heading_is_clean() {
    let violations = lint("# Introduction\nSome content here.", INTRO, "intro-only").await;
    assert_eq!(violations, vec![]);
}

#[tokio::test]
async fn wrong_heading_reports_const_error() {
    let violations = lint("# Wrong Heading\nSome content here.", INTRO, "intro-only").await;
    assert_eq!(kinds(&violations), vec![ViolationKind::HeadingConstError]);
    assert_eq!(
        violations[0].message,
        "Expected title \"Introduction\", but found \"Wrong Heading\""
    );
    assert_eq!(violations[0].heading_label.as_deref(), Some("Wrong Heading"));
    assert_eq!(violations[0].position.start.line, 1);
}

#[tokio::test]
async fn setext_heading_is_checked() {
    let violations = lint(
        "Wrong Heading\n=============\nSome content here.\n",
        INTRO,
        "intro-only",
    )
    .await;
    assert_eq!(kinds(&violations), vec![ViolationKind::HeadingConstError]);
    assert_eq!(
        violations[0].message,
        "Expected title \"Introduction\", but found \"Wrong Heading\""
    );
}

#[tokio::test]
async fn text_before_first_heading_is_ignored() {
    let templates = r#"
templates:
  t:
    sections:
      intro:
        heading:
          const: Introduction
      steps:
        heading:
          const: Steps
"#;
    let markdown = "[![badge](x.svg)](y)\n\n# Introduction\n\nText.\n\n# Steps\n\nMore.\n";
    assert_eq!(lint(markdown, templates, "t").await, vec![]);
}

#[tokio::test]
async fn paragraph_count() {
    let templates = r#"
templates:
  t:
    sections:
      body:
        paragraphs:
          min: 2
"#;
    let violations = lint("# Body\n\nOnly one.\n", templates, "t").await;
    assert_eq!(kinds(&violations), vec![ViolationKind::ParagraphsCountError]);
    assert_eq!(
        violations[0].message,
        "Expected at least 2 paragraphs, but found 1"
    );
}

const SEQUENCE: &str = r#"
templates:
  t:
    sections:
      body:
        sequence:
          - paragraphs:
              min: 1
              patterns: ["^Run"]
          - code_blocks:
              max: 1
          - lists:
              items:
                min: 2
"#;

#[tokio::test]
async fn sequence_in_order_is_checked_per_run() {
    let markdown = "# Body\n\nRun this.\n\n```sh\nmake\n```\n\n- only one\n";
    let violations = lint(markdown, SEQUENCE, "t").await;
    assert_eq!(kinds(&violations), vec![ViolationKind::ListItemsCountError]);
    // Positioned at the list run, not the section
    assert_eq!(violations[0].position.start.line, 9);
}

#[tokio::test]
async fn sequence_length_gate_hides_everything_else() {
    let violations = lint("# Body\n\nNot matching the pattern.\n", SEQUENCE, "t").await;
    assert_eq!(
        violations,
        vec![Violation::new(
            ViolationKind::SequenceLengthError,
            Some("Body"),
            violations[0].position,
            "Expected 3 content types in sequence, but found 1",
        )]
    );
}

#[tokio::test]
async fn sequence_order_error_lists_both_shapes() {
    let markdown = "# Body\n\n- a\n- b\n\nRun.\n\n```\nx\n```\n";
    let violations = lint(markdown, SEQUENCE, "t").await;
    assert_eq!(kinds(&violations), vec![ViolationKind::SequenceOrderError]);
    assert_eq!(
        violations[0].message,
        r#"Expected ["paragraphs","code_blocks","lists"] but found ["lists","paragraphs","code_blocks"]"#
    );
}

const TWO_REQUIRED: &str = r#"
templates:
  t:
    sections:
      doc:
        sections:
          first: {}
          second: {}
"#;

#[tokio::test]
async fn too_many_children_without_extras() {
    let markdown = "# Doc\n## A\n## B\n## C\n";
    let violations = lint(markdown, TWO_REQUIRED, "t").await;
    assert_eq!(kinds(&violations), vec![ViolationKind::SectionCountMismatch]);
    assert_eq!(
        violations[0].message,
        "Expected between 2 and 2 sections, but found 3"
    );
}

#[tokio::test]
async fn no_children_reports_first_missing() {
    let violations = lint("# Doc\n\nText.\n", TWO_REQUIRED, "t").await;
    assert_eq!(kinds(&violations), vec![ViolationKind::MissingSection]);
    assert_eq!(violations[0].message, "Missing section first");
}

const CAPABILITY: &str = r#"
templates:
  t:
    sections:
      doc:
        additionalSections: true
        sections:
          intro:
            heading:
              const: Introduction
          appendix:
            required: false
            heading:
              const: Appendix
"#;

#[tokio::test]
async fn capability_mode_accepts_unrelated_extras() {
    let markdown = "# Doc\n## Introduction\n## Unrelated\n## Also unrelated\n";
    assert_eq!(lint(markdown, CAPABILITY, "t").await, vec![]);
}

#[tokio::test]
async fn capability_mode_reports_unmatched_required() {
    let markdown = "# Doc\n## Overview\n## Unrelated\n## Also unrelated\n";
    let violations = lint(markdown, CAPABILITY, "t").await;
    assert_eq!(kinds(&violations), vec![ViolationKind::MissingSection]);
    assert_eq!(violations[0].message, "Missing section intro");
}

#[tokio::test]
async fn capability_mode_with_as_many_children_as_rules() {
    let templates = r#"
templates:
  t:
    sections:
      doc:
        additionalSections: true
        sections:
          intro:
            heading:
              const: Introduction
          appendix:
            required: false
"#;
    let markdown = "# Doc\n## Introduction\n## Unrelated\n";
    assert_eq!(lint(markdown, templates, "t").await, vec![]);
}

#[tokio::test]
async fn equal_counts_pair_children_by_position() {
    let markdown = "# Doc\n## Introduction\n## Unrelated\n";
    let violations = lint(markdown, CAPABILITY, "t").await;
    assert_eq!(kinds(&violations), vec![ViolationKind::HeadingConstError]);
    assert_eq!(
        violations[0].message,
        "Expected title \"Appendix\", but found \"Unrelated\""
    );
}

#[tokio::test]
async fn nested_rules_apply_to_grandchildren() {
    let templates = r#"
templates:
  t:
    sections:
      doc:
        sections:
          part:
            sections:
              detail:
                code_blocks:
                  min: 1
"#;
    let markdown = "# Doc\n## Part\n### Detail\n\nNo code here.\n";
    let violations = lint(markdown, templates, "t").await;
    assert_eq!(kinds(&violations), vec![ViolationKind::CodeBlocksCountError]);
    assert_eq!(violations[0].heading_label.as_deref(), Some("Detail"));
}

#[tokio::test]
async fn embedded_how_to_template() {
    let registry = TemplateRegistry::embedded().unwrap();
    let template = registry.get("how-to").unwrap();
    let markdown = "\
# Install the tool

This guide installs the tool.

## Prerequisites

- A shell

## Steps

Run the installer.

1. Download
2. Install
";
    let document = parse_markdown(markdown).unwrap();
    let violations = validate_structure(&document, &template.sections, &SkipInstructions)
        .await
        .unwrap();
    assert_eq!(violations, vec![]);
}

/// Fails instructions mentioning "colors" when the text lacks "blue"
#[derive(Default)]
struct KeywordChecker {
    calls: Mutex<usize>,
}

#[async_trait]
impl InstructionChecker for KeywordChecker {
    async fn check(
        &self,
        content: &str,
        instruction: &str,
    ) -> anyhow::Result<Option<InstructionFailure>> {
        *self.calls.lock().unwrap() += 1;
        if instruction.contains("colors") && !content.contains("blue") {
            return Ok(Some(InstructionFailure {
                explanation: "Blue is missing.".to_string(),
            }));
        }
        Ok(None)
    }
}

#[tokio::test]
async fn instructions_use_raw_section_text() {
    let templates = r#"
templates:
  t:
    sections:
      doc:
        instructions:
          - Must mention the primary colors
"#;
    let checker = KeywordChecker::default();
    let violations =
        lint_with("# Doc\n\nRed and yellow.\n", templates, "t", &checker).await;
    assert_eq!(kinds(&violations), vec![ViolationKind::InstructionError]);
    assert_eq!(
        violations[0].message,
        "Instruction: Must mention the primary colors. Explanation: Blue is missing."
    );

    let clean = lint_with("# Doc\n\nRed, yellow and blue.\n", templates, "t", &checker).await;
    assert_eq!(clean, vec![]);
    assert_eq!(*checker.calls.lock().unwrap(), 2);
}

fn cli() -> Command {
    let bin_path = std::env::var("CARGO_BIN_EXE_doc-structure-lint")
        .unwrap_or_else(|_| "target/debug/doc-structure-lint".to_string());
    let mut command = Command::new(bin_path);
    command.env("RUST_LOG", "off");
    command
}

#[test]
fn cli_reports_violations_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let templates = dir.path().join("templates.yaml");
    std::fs::write(&templates, INTRO).unwrap();
    let doc = dir.path().join("doc.md");
    std::fs::write(&doc, "# Wrong Heading\nSome content here.").unwrap();

    let output = cli()
        .current_dir(dir.path())
        .args(["-f", doc.to_str().unwrap(), "-t", "intro-only", "-p"])
        .arg(&templates)
        .output()
        .expect("run linter");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Structure violations found:"));
    assert!(stdout.contains(
        "- [heading_const_error] Wrong Heading (start: 0, end: 15): Expected title \"Introduction\", but found \"Wrong Heading\""
    ));
}

#[test]
fn cli_json_output_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let templates = dir.path().join("templates.yaml");
    std::fs::write(&templates, INTRO).unwrap();
    let doc = dir.path().join("doc.md");
    std::fs::write(&doc, "# Introduction\nSome content here.").unwrap();

    let output = cli()
        .current_dir(dir.path())
        .args(["--json", "-t", "intro-only", "-f", doc.to_str().unwrap(), "-p"])
        .arg(&templates)
        .output()
        .expect("run linter");

    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report, serde_json::json!({ "success": true, "errors": [] }));
}

#[test]
fn cli_uses_project_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("templates.yaml"), INTRO).unwrap();
    std::fs::write(
        dir.path().join(".doc-structure-lint.toml"),
        "template = \"intro-only\"\ntemplate_path = \"templates.yaml\"\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("doc.md"), "# Introduction\n").unwrap();

    let output = cli()
        .current_dir(dir.path())
        .args(["-f", "doc.md"])
        .output()
        .expect("run linter");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Validation successful!"
    );
}

#[test]
fn cli_missing_template_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doc.md"), "# Introduction\n").unwrap();

    let output = cli()
        .current_dir(dir.path())
        .args(["-f", "doc.md", "-t", "x", "-p", "missing.yaml"])
        .output()
        .expect("run linter");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Template file not found: missing.yaml"));
}
