//! Templates
//!
//! Loading, validating and looking up the rule trees documents are checked
//! against.

pub mod loader;
pub mod registry;
pub mod schema;

pub use loader::{load_templates, parse_templates, TemplateFormat};
pub use registry::TemplateRegistry;
pub use schema::{
    CountRule, HeadingRule, ListRule, ParagraphRule, SequenceSlot, Subsections, Template,
    TemplateSection,
};
