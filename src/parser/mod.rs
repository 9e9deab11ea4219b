//! Markdown Parser
//!
//! tree-sitter-md front-end producing the section tree. Covers the block
//! structure the validators look at (headings, paragraphs, code blocks,
//! lists) and nothing inline.

pub mod ast;
pub mod blocks;

pub use ast::blocks_to_document;
pub use blocks::{collect_blocks, Block};

use anyhow::Result;

use crate::tree::Document;

/// Parse markdown source into a section tree
///
/// This is the main entry point for parsing. It walks the block syntax tree
/// and nests the blocks under their headings.
pub fn parse_markdown(source: &str) -> Result<Document> {
    let blocks = blocks::collect_blocks(source)?;
    Ok(ast::blocks_to_document(blocks, source))
}
