//! Violations
//!
//! Structural mismatches are data, never errors. A validation run returns
//! them in traversal order without deduplication.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::{ContentRun, Section, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    HeadingConstError,
    HeadingPatternError,
    ParagraphsCountError,
    CodeBlocksCountError,
    ListsCountError,
    ListItemsCountError,
    ParagraphPatternError,
    SequenceLengthError,
    SequenceOrderError,
    MissingSection,
    SectionCountMismatch,
    InstructionError,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::HeadingConstError => "heading_const_error",
            ViolationKind::HeadingPatternError => "heading_pattern_error",
            ViolationKind::ParagraphsCountError => "paragraphs_count_error",
            ViolationKind::CodeBlocksCountError => "code_blocks_count_error",
            ViolationKind::ListsCountError => "lists_count_error",
            ViolationKind::ListItemsCountError => "list_items_count_error",
            ViolationKind::ParagraphPatternError => "paragraph_pattern_error",
            ViolationKind::SequenceLengthError => "sequence_length_error",
            ViolationKind::SequenceOrderError => "sequence_order_error",
            ViolationKind::MissingSection => "missing_section",
            ViolationKind::SectionCountMismatch => "section_count_mismatch",
            ViolationKind::InstructionError => "instruction_error",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positioned structural mismatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    /// Heading of the section the violation was found in
    #[serde(rename = "heading", default, skip_serializing_if = "Option::is_none")]
    pub heading_label: Option<String>,
    pub position: Span,
    pub message: String,
}

impl Violation {
    pub fn new(
        kind: ViolationKind,
        heading_label: Option<&str>,
        position: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            heading_label: heading_label.map(str::to_string),
            position,
            message: message.into(),
        }
    }
}

/// Where a validator reports: the heading label and the default position
#[derive(Debug, Clone, Copy)]
pub struct Anchor<'a> {
    pub heading: Option<&'a str>,
    pub position: Span,
}

impl<'a> Anchor<'a> {
    pub fn section(section: &'a Section) -> Self {
        Self {
            heading: section.heading_label(),
            position: section.position,
        }
    }

    /// A content run inside `section`, still labeled with the section heading
    pub fn run(section: &'a Section, run: &ContentRun) -> Self {
        Self {
            heading: section.heading_label(),
            position: run.position,
        }
    }

    pub fn at(&self, position: Span) -> Self {
        Self {
            heading: self.heading,
            position,
        }
    }
}

/// Ordered accumulator for violations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViolationCollector {
    violations: Vec<Violation>,
}

impl ViolationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ViolationKind, anchor: &Anchor<'_>, message: String) {
        self.violations
            .push(Violation::new(kind, anchor.heading, anchor.position, message));
    }

    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.violations
    }
}
