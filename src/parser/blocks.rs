//! Markdown Blocks
//!
//! Walks the tree-sitter-md block tree and flattens it into the top-level
//! blocks the section builder folds by heading. Inline markup is not parsed.

use std::ops::Range;

use anyhow::{anyhow, Context, Result};
use tree_sitter::{Node, Parser};

use crate::tree::{CodeBlock, Heading, List, ListItem, Paragraph, Point, Span};

/// A top-level markdown block
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(Heading),
    Paragraph(Paragraph),
    CodeBlock(CodeBlock),
    List(List),
    /// Block quotes, tables, HTML and breaks: part of the section text but
    /// none of the counted content kinds
    Other(Span),
}

impl Block {
    pub fn position(&self) -> Span {
        match self {
            Block::Heading(h) => h.position,
            Block::Paragraph(p) => p.position,
            Block::CodeBlock(c) => c.position,
            Block::List(l) => l.position,
            Block::Other(span) => *span,
        }
    }
}

pub fn markdown_parser() -> Result<Parser> {
    let language: tree_sitter::Language = tree_sitter_md::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .context("Failed to load the markdown grammar")?;
    Ok(parser)
}

/// Parse `source` and return its top-level blocks in document order
pub fn collect_blocks(source: &str) -> Result<Vec<Block>> {
    let mut parser = markdown_parser()?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow!("Markdown parser returned no tree"))?;

    let walker = BlockWalker::new(source);
    let mut blocks = Vec::new();
    walker.visit(tree.root_node(), &mut blocks);
    Ok(blocks)
}

/// Byte offsets of line starts, for 1-based line/column points
struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { source, starts }
    }

    fn line_start(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset).max(1);
        (line, self.starts[line - 1])
    }

    fn point(&self, offset: usize) -> Point {
        let (line, start) = self.line_start(offset);
        let column = self
            .source
            .get(start..offset)
            .map_or(offset - start, |text| text.chars().count());
        Point::new(line, column + 1, offset)
    }

    /// Span of `range` with surrounding whitespace left out
    fn span(&self, range: Range<usize>) -> Span {
        let text = self.source.get(range.clone()).unwrap_or_default();
        let start = range.start + (text.len() - text.trim_start().len());
        let end = (range.start + text.trim_end().len()).max(start);
        Span::new(self.point(start), self.point(end))
    }
}

struct BlockWalker<'a> {
    source: &'a str,
    lines: LineIndex<'a>,
}

impl<'a> BlockWalker<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lines: LineIndex::new(source),
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    fn visit(&self, node: Node<'_>, blocks: &mut Vec<Block>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "section" => self.visit(child, blocks),
                "atx_heading" | "setext_heading" => blocks.push(Block::Heading(self.heading(child))),
                "paragraph" => blocks.push(Block::Paragraph(Paragraph {
                    content: normalize_lines(self.text(child)),
                    position: self.lines.span(child.byte_range()),
                })),
                "fenced_code_block" | "indented_code_block" => {
                    blocks.push(Block::CodeBlock(self.code_block(child)))
                }
                "list" => blocks.push(Block::List(self.list(child))),
                // Front matter belongs to no section
                "minus_metadata" | "plus_metadata" | "block_continuation" => {}
                _ => {
                    let span = self.lines.span(child.byte_range());
                    if span.start.offset < span.end.offset {
                        blocks.push(Block::Other(span));
                    }
                }
            }
        }
    }

    fn heading(&self, node: Node<'_>) -> Heading {
        let mut level = 1;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let kind = child.kind();
            if let Some(n) = kind
                .strip_prefix("atx_h")
                .and_then(|rest| rest.strip_suffix("_marker"))
                .and_then(|n| n.parse::<u8>().ok())
            {
                level = n;
            } else if kind == "setext_h2_underline" {
                level = 2;
            }
        }

        let content = match node.child_by_field_name("heading_content") {
            Some(content) if node.kind() == "atx_heading" => {
                strip_closing_sequence(self.text(content)).to_string()
            }
            Some(content) => normalize_lines(self.text(content)),
            None => String::new(),
        };

        Heading {
            level,
            content,
            position: self.lines.span(node.byte_range()),
        }
    }

    fn code_block(&self, node: Node<'_>) -> CodeBlock {
        let mut language = None;
        let mut body = None;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "info_string" => {
                    language = self.text(child).split_whitespace().next().map(str::to_string)
                }
                "code_fence_content" => body = Some(child),
                _ => {}
            }
        }

        let content = if node.kind() == "indented_code_block" {
            let (_, line_start) = self.lines.line_start(node.start_byte());
            dedent(self.source.get(line_start..node.end_byte()).unwrap_or_default())
        } else {
            match body {
                Some(body) => {
                    let (_, fence_line) = self.lines.line_start(node.start_byte());
                    let (_, body_line) = self.lines.line_start(body.start_byte());
                    let text = self.source.get(body_line..body.end_byte()).unwrap_or_default();
                    strip_indent(text, node.start_byte() - fence_line)
                }
                None => String::new(),
            }
        };

        CodeBlock {
            content,
            language,
            position: self.lines.span(node.byte_range()),
        }
    }

    fn list(&self, node: Node<'_>) -> List {
        let mut ordered = false;
        let mut items = Vec::new();
        let mut cursor = node.walk();
        for (index, item) in node
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "list_item")
            .enumerate()
        {
            let (item_ordered, content) = self.list_item(item);
            if index == 0 {
                ordered = item_ordered;
            }
            items.push(ListItem {
                content,
                position: self.lines.span(item.byte_range()),
            });
        }

        List {
            ordered,
            items,
            position: self.lines.span(node.byte_range()),
        }
    }

    /// Whether the item has an ordered marker, and its text with nested
    /// blocks flattened one per line
    fn list_item(&self, node: Node<'_>) -> (bool, String) {
        let mut ordered = false;
        let mut parts = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "list_marker_dot" | "list_marker_parenthesis" => ordered = true,
                kind if kind.starts_with("list_marker") || kind.starts_with("task_list_marker") => {}
                "block_continuation" => {}
                "list" => {
                    let nested = self.list(child);
                    parts.extend(nested.items.into_iter().map(|item| item.content));
                }
                "fenced_code_block" | "indented_code_block" => {
                    parts.push(self.code_block(child).content)
                }
                _ => parts.push(normalize_lines(self.text(child))),
            }
        }
        parts.retain(|part| !part.is_empty());
        (ordered, parts.join("\n"))
    }
}

/// Trim each line and drop leading and trailing blank lines
fn normalize_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    lines.join("\n").trim().to_string()
}

/// Remove the optional closing `#` run of an ATX heading
fn strip_closing_sequence(text: &str) -> &str {
    let trimmed = text.trim();
    let without = trimmed.trim_end_matches('#');
    if without.len() == trimmed.len() {
        trimmed
    } else if without.is_empty() {
        ""
    } else if without.ends_with([' ', '\t']) {
        without.trim_end()
    } else {
        trimmed
    }
}

/// Remove up to `indent` leading spaces from every line
fn strip_indent(text: &str, indent: usize) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(|line| {
            let spaces = line.bytes().take(indent).take_while(|&b| b == b' ').count();
            &line[spaces..]
        })
        .collect();
    lines.join("\n")
}

/// Remove the indentation shared by every non-blank line
fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect();
    lines.join("\n").trim_matches('\n').to_string()
}
