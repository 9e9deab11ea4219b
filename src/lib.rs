//! Document Structure Lint
//!
//! Checks that a document's section tree conforms to a structural template.
//!
//! This library provides:
//! - The section tree model and a markdown front-end
//! - Template loading and validation
//! - The conformance engine and its violations
//! - An HTTP instruction checker, a command-line linter and an LSP server

pub mod checker;
pub mod config;
pub mod lint;
pub mod lsp;
pub mod parser;
pub mod report;
pub mod template;
pub mod tree;
pub mod validation;

pub use config::Config;
pub use lint::{lint_document, LintReport, LintRequest};
pub use parser::parse_markdown;
pub use template::{Template, TemplateRegistry};
pub use tree::{Document, Section};
pub use validation::{validate_section, validate_structure, Violation, ViolationKind};
