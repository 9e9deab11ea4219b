//! Quantity Validators
//!
//! Count bounds for paragraphs, code blocks and lists, list item bounds,
//! and cyclic paragraph patterns. Used both for a section's own body and for
//! the individual runs of a sequence.

use crate::template::{CountRule, ListRule, ParagraphRule};
use crate::tree::{CodeBlock, List, Paragraph};

use super::violation::{Anchor, ViolationCollector, ViolationKind};

/// Report `count` against `rule`. Lower and upper bounds are independent.
pub fn check_count(
    count: usize,
    rule: &CountRule,
    kind: ViolationKind,
    noun: &str,
    anchor: &Anchor<'_>,
    out: &mut ViolationCollector,
) {
    if let Some(min) = rule.min {
        if count < min {
            out.add(
                kind,
                anchor,
                format!("Expected at least {} {}, but found {}", min, noun, count),
            );
        }
    }
    if let Some(max) = rule.max {
        if count > max {
            out.add(
                kind,
                anchor,
                format!("Expected at most {} {}, but found {}", max, noun, count),
            );
        }
    }
}

pub fn check_paragraphs(
    paragraphs: &[Paragraph],
    rule: &ParagraphRule,
    anchor: &Anchor<'_>,
    out: &mut ViolationCollector,
) {
    check_count(
        paragraphs.len(),
        &rule.count,
        ViolationKind::ParagraphsCountError,
        "paragraphs",
        anchor,
        out,
    );

    if rule.patterns.is_empty() {
        return;
    }
    for (i, paragraph) in paragraphs.iter().enumerate() {
        let pattern = &rule.patterns[i % rule.patterns.len()];
        if !pattern.is_match(&paragraph.content) {
            out.add(
                ViolationKind::ParagraphPatternError,
                &anchor.at(paragraph.position),
                format!(
                    "Paragraph \"{}\" doesn't match expected pattern \"{}\"",
                    paragraph.content,
                    pattern.as_str()
                ),
            );
        }
    }
}

pub fn check_code_blocks(
    code_blocks: &[CodeBlock],
    rule: &CountRule,
    anchor: &Anchor<'_>,
    out: &mut ViolationCollector,
) {
    check_count(
        code_blocks.len(),
        rule,
        ViolationKind::CodeBlocksCountError,
        "code blocks",
        anchor,
        out,
    );
}

pub fn check_lists(
    lists: &[List],
    rule: &ListRule,
    anchor: &Anchor<'_>,
    out: &mut ViolationCollector,
) {
    check_count(
        lists.len(),
        &rule.count,
        ViolationKind::ListsCountError,
        "lists",
        anchor,
        out,
    );

    if let Some(items) = &rule.items {
        check_list_items(lists, items, anchor, out);
    }
}

/// All lists are judged together: at most one violation per call
fn check_list_items(
    lists: &[List],
    rule: &CountRule,
    anchor: &Anchor<'_>,
    out: &mut ViolationCollector,
) {
    let too_many = rule
        .max
        .is_some_and(|max| lists.iter().any(|l| l.items.len() > max));
    let too_few = rule
        .min
        .is_some_and(|min| lists.iter().any(|l| l.items.len() < min));

    let message = match (rule.min, rule.max, too_few, too_many) {
        (Some(min), Some(max), true, true) => {
            format!("Expected between {} and {} items in a list", min, max)
        }
        (_, Some(max), false, true) => format!("Expected at most {} items in a list", max),
        (Some(min), _, true, false) => format!("Expected at least {} items in a list", min),
        _ => return,
    };
    out.add(ViolationKind::ListItemsCountError, anchor, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ListItem, Point, Span};
    use crate::validation::Violation;
    use regex::Regex;

    fn span(line: usize) -> Span {
        Span::new(Point::new(line, 1, line * 10), Point::new(line, 9, line * 10 + 8))
    }

    fn anchor() -> Anchor<'static> {
        Anchor {
            heading: Some("Section"),
            position: span(1),
        }
    }

    fn paragraphs(texts: &[&str]) -> Vec<Paragraph> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Paragraph {
                content: t.to_string(),
                position: span(i + 2),
            })
            .collect()
    }

    fn list(items: usize) -> List {
        List {
            ordered: false,
            items: (0..items)
                .map(|i| ListItem {
                    content: format!("item {}", i),
                    position: span(i + 2),
                })
                .collect(),
            position: span(2),
        }
    }

    fn collect(f: impl FnOnce(&mut ViolationCollector)) -> Vec<Violation> {
        let mut out = ViolationCollector::new();
        f(&mut out);
        out.into_vec()
    }

    #[test]
    fn test_too_few_paragraphs() {
        let rule = ParagraphRule {
            count: CountRule::new(Some(2), None),
            patterns: vec![],
        };
        let v = collect(|out| check_paragraphs(&paragraphs(&["only"]), &rule, &anchor(), out));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::ParagraphsCountError);
        assert_eq!(v[0].message, "Expected at least 2 paragraphs, but found 1");
        assert_eq!(v[0].position, span(1));
    }

    #[test]
    fn test_contradictory_bounds_fire_twice() {
        let rule = CountRule::new(Some(3), Some(1));
        let v = collect(|out| {
            check_count(
                2,
                &rule,
                ViolationKind::CodeBlocksCountError,
                "code blocks",
                &anchor(),
                out,
            )
        });
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].message, "Expected at least 3 code blocks, but found 2");
        assert_eq!(v[1].message, "Expected at most 1 code blocks, but found 2");
    }

    #[test]
    fn test_zero_max_is_enforced() {
        let rule = CountRule::new(None, Some(0));
        let blocks = vec![CodeBlock {
            content: "ls".to_string(),
            language: None,
            position: span(2),
        }];
        let v = collect(|out| check_code_blocks(&blocks, &rule, &anchor(), out));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].message, "Expected at most 0 code blocks, but found 1");
    }

    #[test]
    fn test_patterns_cycle_and_report_each_paragraph() {
        let rule = ParagraphRule {
            count: CountRule::default(),
            patterns: vec![Regex::new("^Step").unwrap(), Regex::new("^Note").unwrap()],
        };
        let items = paragraphs(&["Step one", "Oops", "Nope", "Note done"]);
        let v = collect(|out| check_paragraphs(&items, &rule, &anchor(), out));
        assert_eq!(v.len(), 2);
        assert!(v.iter().all(|x| x.kind == ViolationKind::ParagraphPatternError));
        assert_eq!(v[0].position, items[1].position);
        assert_eq!(v[1].position, items[2].position);
        assert_eq!(
            v[0].message,
            "Paragraph \"Oops\" doesn't match expected pattern \"^Note\""
        );
        assert_eq!(v[0].heading_label.as_deref(), Some("Section"));
    }

    #[test]
    fn test_list_count() {
        let rule = ListRule {
            count: CountRule::new(Some(2), None),
            items: None,
        };
        let v = collect(|out| check_lists(&[list(3)], &rule, &anchor(), out));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::ListsCountError);
        assert_eq!(v[0].message, "Expected at least 2 lists, but found 1");
    }

    #[test]
    fn test_list_items_single_violation_per_section() {
        let rule = ListRule {
            count: CountRule::default(),
            items: Some(CountRule::new(None, Some(2))),
        };
        let v = collect(|out| check_lists(&[list(3), list(4), list(1)], &rule, &anchor(), out));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::ListItemsCountError);
        assert_eq!(v[0].message, "Expected at most 2 items in a list");
    }

    #[test]
    fn test_list_items_lower_bound() {
        let rule = ListRule {
            count: CountRule::default(),
            items: Some(CountRule::new(Some(2), Some(5))),
        };
        let v = collect(|out| check_lists(&[list(1), list(3)], &rule, &anchor(), out));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].message, "Expected at least 2 items in a list");
    }

    #[test]
    fn test_list_items_both_bounds() {
        let rule = ListRule {
            count: CountRule::default(),
            items: Some(CountRule::new(Some(2), Some(3))),
        };
        let v = collect(|out| check_lists(&[list(1), list(5)], &rule, &anchor(), out));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].message, "Expected between 2 and 3 items in a list");
    }

    #[test]
    fn test_list_items_within_bounds() {
        let rule = ListRule {
            count: CountRule::default(),
            items: Some(CountRule::new(Some(1), Some(3))),
        };
        assert!(collect(|out| check_lists(&[list(1), list(3)], &rule, &anchor(), out)).is_empty());
    }
}
