//! Sequence Validator
//!
//! Checks a section's ordered body (its content runs) against the declared
//! slots. Two gates run first and stop the check when the shape already
//! disagrees: run count, then run kinds.

use crate::template::SequenceSlot;
use crate::tree::{ContentKind, ContentRun, Section};

use super::quantity::{check_code_blocks, check_lists, check_paragraphs};
use super::violation::{Anchor, ViolationCollector, ViolationKind};

pub fn check_sequence(section: &Section, slots: &[SequenceSlot], out: &mut ViolationCollector) {
    let anchor = Anchor::section(section);
    let runs = &section.content;

    if slots.len() != runs.len() {
        out.add(
            ViolationKind::SequenceLengthError,
            &anchor,
            format!(
                "Expected {} content types in sequence, but found {}",
                slots.len(),
                runs.len()
            ),
        );
        return;
    }

    let expected: Vec<Option<ContentKind>> = slots.iter().map(|s| Some(s.kind())).collect();
    let actual: Vec<Option<ContentKind>> = runs.iter().map(ContentRun::kind).collect();
    if actual.contains(&None) || expected != actual {
        out.add(
            ViolationKind::SequenceOrderError,
            &anchor,
            format!(
                "Expected {} but found {}",
                render_kinds(&expected),
                render_kinds(&actual)
            ),
        );
        return;
    }

    for (slot, run) in slots.iter().zip(runs) {
        let at = Anchor::run(section, run);
        match (slot, run) {
            (
                SequenceSlot::Paragraphs(rule),
                ContentRun {
                    paragraphs: Some(items),
                    ..
                },
            ) => check_paragraphs(items, rule, &at, out),
            (
                SequenceSlot::CodeBlocks(rule),
                ContentRun {
                    code_blocks: Some(items),
                    ..
                },
            ) => check_code_blocks(items, rule, &at, out),
            (
                SequenceSlot::Lists(rule),
                ContentRun {
                    lists: Some(items),
                    ..
                },
            ) => check_lists(items, rule, &at, out),
            // Unreachable once the order gate has passed
            _ => {}
        }
    }
}

/// `["paragraphs","code_blocks",null]`
fn render_kinds(kinds: &[Option<ContentKind>]) -> String {
    let parts: Vec<String> = kinds
        .iter()
        .map(|k| match k {
            Some(kind) => format!("\"{}\"", kind.as_str()),
            None => "null".to_string(),
        })
        .collect();
    format!("[{}]", parts.join(","))
}
