//! Section Tree
//!
//! Immutable document representation shared by every front-end and the
//! validation engine. No parsing or validation logic lives here.
//!
//! The serde shape matches the JSON produced by external parsers, so a tree
//! can be handed to the engine as a file instead of being parsed from
//! markdown.

use serde::{Deserialize, Serialize};

/// A location in the source text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
    /// 0-based byte offset
    pub offset: usize,
}

impl Point {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// A start/end pair of source locations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Point,
    pub end: Point,
}

impl Span {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// True when `other` lies entirely inside this span
    pub fn contains(&self, other: &Span) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }

    /// Smallest span covering both spans
    pub fn cover(&self, other: &Span) -> Span {
        let start = if other.start.offset < self.start.offset {
            other.start
        } else {
            self.start
        };
        let end = if other.end.offset > self.end.offset {
            other.end
        } else {
            self.end
        };
        Span { start, end }
    }
}

/// Heading line of a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub content: String,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub content: String,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub content: String,
    /// Fence info string, e.g. `bash`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub content: String,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub ordered: bool,
    pub items: Vec<ListItem>,
    pub position: Span,
}

/// The three kinds of body content a section can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Paragraphs,
    CodeBlocks,
    Lists,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Paragraphs => "paragraphs",
            ContentKind::CodeBlocks => "code_blocks",
            ContentKind::Lists => "lists",
        }
    }
}

/// A maximal run of same-kind blocks, in document order
///
/// Exactly one payload is set for runs built by the markdown front-end.
/// Trees supplied from elsewhere may carry none, which the sequence check
/// reports as an unrecognized run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentRun {
    pub position: Span,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraphs: Option<Vec<Paragraph>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_blocks: Option<Vec<CodeBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lists: Option<Vec<List>>,
}

impl ContentRun {
    pub fn paragraphs(items: Vec<Paragraph>, position: Span) -> Self {
        Self {
            position,
            paragraphs: Some(items),
            ..Default::default()
        }
    }

    pub fn code_blocks(items: Vec<CodeBlock>, position: Span) -> Self {
        Self {
            position,
            code_blocks: Some(items),
            ..Default::default()
        }
    }

    pub fn lists(items: Vec<List>, position: Span) -> Self {
        Self {
            position,
            lists: Some(items),
            ..Default::default()
        }
    }

    /// Which payload this run wraps, checked in a fixed order
    pub fn kind(&self) -> Option<ContentKind> {
        if self.paragraphs.is_some() {
            Some(ContentKind::Paragraphs)
        } else if self.code_blocks.is_some() {
            Some(ContentKind::CodeBlocks)
        } else if self.lists.is_some() {
            Some(ContentKind::Lists)
        } else {
            None
        }
    }
}

/// A heading-rooted unit of document content
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub id: String,
    /// May be absent in trees supplied by other front-ends
    #[serde(default)]
    pub heading: Option<Heading>,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default, alias = "codeBlocks")]
    pub code_blocks: Vec<CodeBlock>,
    #[serde(default)]
    pub lists: Vec<List>,
    #[serde(default)]
    pub content: Vec<ContentRun>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub position: Span,
    /// Source text of the body, without the heading line and child sections
    #[serde(default, alias = "rawContent")]
    pub raw_content: String,
}

impl Section {
    /// Heading text used to label violations
    pub fn heading_label(&self) -> Option<&str> {
        self.heading.as_ref().map(|h| h.content.as_str())
    }

    /// Check that every child span nests in its parent and that siblings
    /// appear in increasing, non-overlapping order. Returns the first
    /// offending child on failure.
    pub fn find_span_violation(&self) -> Option<&Section> {
        let mut previous_end: Option<usize> = None;
        for child in &self.sections {
            if !self.position.contains(&child.position) {
                return Some(child);
            }
            if let Some(end) = previous_end {
                if child.position.start.offset < end {
                    return Some(child);
                }
            }
            previous_end = Some(child.position.end.offset);
            if let Some(bad) = child.find_span_violation() {
                return Some(bad);
            }
        }
        None
    }
}

/// Output of a front-end: the ordered top-level sections
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Source text before the first heading, not validated
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preamble: String,
}

impl Document {
    /// Same ordering rules as `Section::find_span_violation`, applied to the
    /// top-level sections
    pub fn find_span_violation(&self) -> Option<&Section> {
        let mut previous_end: Option<usize> = None;
        for section in &self.sections {
            if let Some(end) = previous_end {
                if section.position.start.offset < end {
                    return Some(section);
                }
            }
            previous_end = Some(section.position.end.offset);
            if let Some(bad) = section.find_span_violation() {
                return Some(bad);
            }
        }
        None
    }
}
