//! Section Tree Builder
//!
//! Folds the flat block list into a heading-rooted section tree. Content
//! before the first heading is kept as document preamble text and belongs
//! to no section.

use crate::parser::blocks::Block;
use crate::tree::{ContentRun, Document, Section, Span};

/// Section under construction
struct OpenSection {
    section: Section,
    level: u8,
}

impl OpenSection {
    fn new(level: u8, position: Span) -> Self {
        Self {
            section: Section {
                position,
                ..Default::default()
            },
            level,
        }
    }

    fn push_block(&mut self, block: Block) {
        let position = block.position();
        let section = &mut self.section;
        match block {
            Block::Paragraph(p) => {
                section.paragraphs.push(p.clone());
                match section.content.last_mut() {
                    Some(ContentRun {
                        paragraphs: Some(run),
                        position: run_pos,
                        ..
                    }) => {
                        run.push(p);
                        *run_pos = run_pos.cover(&position);
                    }
                    _ => section.content.push(ContentRun::paragraphs(vec![p], position)),
                }
            }
            Block::CodeBlock(c) => {
                section.code_blocks.push(c.clone());
                match section.content.last_mut() {
                    Some(ContentRun {
                        code_blocks: Some(run),
                        position: run_pos,
                        ..
                    }) => {
                        run.push(c);
                        *run_pos = run_pos.cover(&position);
                    }
                    _ => section.content.push(ContentRun::code_blocks(vec![c], position)),
                }
            }
            Block::List(l) => {
                section.lists.push(l.clone());
                match section.content.last_mut() {
                    Some(ContentRun {
                        lists: Some(run),
                        position: run_pos,
                        ..
                    }) => {
                        run.push(l);
                        *run_pos = run_pos.cover(&position);
                    }
                    _ => section.content.push(ContentRun::lists(vec![l], position)),
                }
            }
            Block::Heading(_) | Block::Other(_) => {}
        }
        section.position = section.position.cover(&position);
    }

    /// Fill in the span and body text once no more content can arrive
    fn close(mut self, source: &str) -> Section {
        let section = &mut self.section;
        if let Some(last) = section.sections.last() {
            section.position = section.position.cover(&last.position);
        }

        let body_start = match &section.heading {
            Some(h) => h.position.end.offset,
            None => section.position.start.offset,
        };
        let body_end = match section.sections.first() {
            Some(child) => child.position.start.offset,
            None => section.position.end.offset,
        };
        section.raw_content = source
            .get(body_start..body_end.max(body_start))
            .unwrap_or_default()
            .trim()
            .to_string();
        self.section
    }
}

/// Fold blocks into sections by heading level
pub fn blocks_to_document(blocks: Vec<Block>, source: &str) -> Document {
    let mut document = Document::default();
    let mut stack: Vec<OpenSection> = Vec::new();
    let mut ids = IdGenerator::default();
    let mut preamble: Option<Span> = None;

    for block in blocks {
        match block {
            Block::Heading(heading) => {
                while stack.last().is_some_and(|open| open.level >= heading.level) {
                    close_top(&mut stack, &mut document, source);
                }
                let mut open = OpenSection::new(heading.level, heading.position);
                open.section.id = ids.next(&heading.content);
                open.section.heading = Some(heading);
                stack.push(open);
            }
            other => match stack.last_mut() {
                Some(open) => open.push_block(other),
                None => {
                    let position = other.position();
                    preamble = Some(preamble.map_or(position, |span| span.cover(&position)));
                }
            },
        }
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut document, source);
    }
    if let Some(span) = preamble {
        document.preamble = source
            .get(span.start.offset..span.end.offset)
            .unwrap_or_default()
            .to_string();
    }
    document
}

fn close_top(stack: &mut Vec<OpenSection>, document: &mut Document, source: &str) {
    let Some(open) = stack.pop() else {
        return;
    };
    let section = open.close(source);
    match stack.last_mut() {
        Some(parent) => parent.section.sections.push(section),
        None => document.sections.push(section),
    }
}

/// Slug ids, made unique within one document
#[derive(Default)]
struct IdGenerator {
    seen: std::collections::HashMap<String, usize>,
}

impl IdGenerator {
    fn next(&mut self, text: &str) -> String {
        let mut slug = String::new();
        for c in text.chars() {
            if c.is_alphanumeric() {
                slug.extend(c.to_lowercase());
            } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_matches('-').to_string();
        let slug = if slug.is_empty() { "section".to_string() } else { slug };

        let count = self.seen.entry(slug.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            slug
        } else {
            format!("{}-{}", slug, *count - 1)
        }
    }
}
