//! Conformance Engine
//!
//! Walks a section tree against a template and concatenates what every
//! validator reports, in a fixed order:
//! sequence, heading, paragraphs, code blocks, lists, instructions,
//! subsections.

use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;

use crate::template::{Subsections, TemplateSection};
use crate::tree::{Document, Section};

use super::heading::check_heading;
use super::instruction::{check_instructions, InstructionChecker};
use super::quantity::{check_code_blocks, check_lists, check_paragraphs};
use super::sequence::check_sequence;
use super::subsections::check_subsections;
use super::violation::{Anchor, Violation, ViolationCollector};

/// Failures that are not structural mismatches
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("instruction check failed in section \"{heading}\": {reason}")]
    Checker { heading: String, reason: String },

    #[error(
        "malformed section tree: section \"{heading}\" at line {line} is outside its parent or out of order"
    )]
    MalformedTree { heading: String, line: usize },
}

/// Validate one section and, through the subsection rules, its descendants
pub fn validate_section<'a>(
    section: &'a Section,
    rule: &'a TemplateSection,
    checker: &'a dyn InstructionChecker,
) -> BoxFuture<'a, Result<Vec<Violation>, EngineError>> {
    async move {
        let mut out = ViolationCollector::new();
        let anchor = Anchor::section(section);

        if let Some(slots) = &rule.sequence {
            check_sequence(section, slots, &mut out);
        }

        if let (Some(heading_rule), Some(heading)) = (&rule.heading, &section.heading) {
            check_heading(heading, heading_rule, &anchor, &mut out);
        }

        if let Some(paragraphs) = &rule.paragraphs {
            check_paragraphs(&section.paragraphs, paragraphs, &anchor, &mut out);
        }

        if let Some(code_blocks) = &rule.code_blocks {
            check_code_blocks(&section.code_blocks, code_blocks, &anchor, &mut out);
        }

        if let Some(lists) = &rule.lists {
            check_lists(&section.lists, lists, &anchor, &mut out);
        }

        if !rule.instructions.is_empty() {
            check_instructions(section, &rule.instructions, checker, &mut out).await?;
        }

        if let Some(declared) = &rule.sections {
            check_subsections(
                section,
                declared,
                rule.additional_sections,
                checker,
                &mut out,
            )
            .await?;
        }

        Ok(out.into_vec())
    }
    .boxed()
}

/// Validate a document's top-level sections against a template's root
/// sections, pairing them by position
pub async fn validate_structure(
    document: &Document,
    template: &Subsections,
    checker: &dyn InstructionChecker,
) -> Result<Vec<Violation>, EngineError> {
    if let Some(bad) = document.find_span_violation() {
        return Err(EngineError::MalformedTree {
            heading: bad.heading_label().unwrap_or_default().to_string(),
            line: bad.position.start.line,
        });
    }

    let mut violations = Vec::new();
    for ((name, rule), section) in template.iter().zip(&document.sections) {
        log::debug!("Validating section {:?} against {}", section.heading_label(), name);
        violations.extend(validate_section(section, rule, checker).await?);
    }
    Ok(violations)
}
