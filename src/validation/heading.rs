//! Heading checks: exact title and title pattern, independently.

use crate::template::HeadingRule;
use crate::tree::Heading;

use super::violation::{Anchor, ViolationCollector, ViolationKind};

/// Compare a section heading against its rule. Both checks may fire.
pub fn check_heading(
    heading: &Heading,
    rule: &HeadingRule,
    anchor: &Anchor<'_>,
    out: &mut ViolationCollector,
) {
    let at = anchor.at(heading.position);

    if let Some(expected) = &rule.constant {
        if heading.content != *expected {
            out.add(
                ViolationKind::HeadingConstError,
                &at,
                format!(
                    "Expected title \"{}\", but found \"{}\"",
                    expected, heading.content
                ),
            );
        }
    }

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(&heading.content) {
            out.add(
                ViolationKind::HeadingPatternError,
                &at,
                format!(
                    "Title \"{}\" doesn't match pattern \"{}\"",
                    heading.content,
                    pattern.as_str()
                ),
            );
        }
    }
}
