//! Per-document state and position helpers for the language server.

use anyhow::Result;
use tower_lsp::lsp_types::{Position, Range};

use crate::parser::parse_markdown;
use crate::template::{Subsections, TemplateSection};
use crate::tree::{Document, Point, Section, Span};

/// State for each open document
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub content: String,
    /// Section tree of `content`, rebuilt on every change
    pub document: Document,
}

impl DocumentState {
    pub fn new(content: String) -> Result<Self> {
        let document = parse_markdown(&content)?;
        Ok(Self { content, document })
    }
}

/// Tree points are 1-based with char columns. LSP positions are 0-based and
/// count UTF-16 code units from the start of the line.
pub fn point_to_position(source: &str, point: &Point) -> Position {
    let character = source
        .get(..point.offset)
        .map(|before| {
            let line_start = before.rfind('\n').map_or(0, |i| i + 1);
            before[line_start..].encode_utf16().count()
        })
        .unwrap_or_else(|| point.column.saturating_sub(1));
    Position::new(point.line.saturating_sub(1) as u32, character as u32)
}

pub fn span_to_range(source: &str, span: &Span) -> Range {
    Range::new(
        point_to_position(source, &span.start),
        point_to_position(source, &span.end),
    )
}

fn covers_line(span: &Span, line: usize) -> bool {
    span.start.line <= line && line <= span.end.line
}

/// Template rule for the heading on `position.line`, pairing sections with
/// declared rules by position at every level
pub fn rule_for_heading<'a>(
    document: &'a Document,
    rules: &'a Subsections,
    position: Position,
) -> Option<(&'a str, &'a TemplateSection, &'a Section)> {
    find_rule(&document.sections, rules, position.line as usize + 1)
}

fn find_rule<'a>(
    sections: &'a [Section],
    rules: &'a Subsections,
    line: usize,
) -> Option<(&'a str, &'a TemplateSection, &'a Section)> {
    for ((name, rule), section) in rules.iter().zip(sections) {
        if let Some(heading) = &section.heading {
            if covers_line(&heading.position, line) {
                return Some((name, rule, section));
            }
        }
        if covers_line(&section.position, line) {
            let children = rule.sections.as_ref()?;
            return find_rule(&section.sections, children, line);
        }
    }
    None
}
