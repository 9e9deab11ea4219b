//! Subsection Matcher
//!
//! Reconciles declared (named, ordered) subsections against a section's
//! actual (unnamed, ordered) children.
//!
//! - Positional mode pairs `declared[i]` with `actual[i]`, after two gates:
//!   no children at all while something is required, then a child count
//!   outside the declared range.
//! - Trial mode applies when extras are allowed and there are more children
//!   than declared rules. A rule is satisfied by any child that validates
//!   cleanly against it; leftover children are never reported.

use crate::template::Subsections;
use crate::tree::Section;

use super::engine::{validate_section, EngineError};
use super::instruction::InstructionChecker;
use super::violation::{Anchor, ViolationCollector, ViolationKind};

pub async fn check_subsections(
    section: &Section,
    declared: &Subsections,
    additional_sections: bool,
    checker: &dyn InstructionChecker,
    out: &mut ViolationCollector,
) -> Result<(), EngineError> {
    let anchor = Anchor::section(section);
    let actual = &section.sections;
    let required = declared.required_count();
    let optional = declared.len() - required;

    if actual.is_empty() && required > 0 {
        let first = declared.first_name().unwrap_or_default();
        out.add(
            ViolationKind::MissingSection,
            &anchor,
            format!("Missing section {}", first),
        );
        return Ok(());
    }

    if actual.len() < required || (actual.len() > required + optional && !additional_sections) {
        out.add(
            ViolationKind::SectionCountMismatch,
            &anchor,
            format!(
                "Expected between {} and {} sections, but found {}",
                required,
                required + optional,
                actual.len()
            ),
        );
        return Ok(());
    }

    if additional_sections && actual.len() > declared.len() {
        return match_by_trial(section, declared, checker, out).await;
    }

    for ((_, rule), child) in declared.iter().zip(actual) {
        out.extend(validate_section(child, rule, checker).await?);
    }
    Ok(())
}

async fn match_by_trial(
    section: &Section,
    declared: &Subsections,
    checker: &dyn InstructionChecker,
    out: &mut ViolationCollector,
) -> Result<(), EngineError> {
    let anchor = Anchor::section(section);
    for (name, rule) in declared.iter() {
        let mut matched = false;
        for child in &section.sections {
            if validate_section(child, rule, checker).await?.is_empty() {
                matched = true;
                break;
            }
        }
        if !matched && rule.required {
            log::debug!("No child of {:?} satisfies rule {}", section.heading_label(), name);
            out.add(
                ViolationKind::MissingSection,
                &anchor,
                format!("Missing section {}", name),
            );
        }
    }
    Ok(())
}
