//! Template Schema Types
//!
//! Two layers, as with any file-backed rule set here: `Raw*` types mirror
//! the file format one-to-one (serde, unknown keys rejected), and the runtime
//! types below hold compiled regexes and ordered subsections. Conversion is
//! where schema validation happens.

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::tree::ContentKind;

/// `{min?, max?}` bounds on a count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountRule {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl CountRule {
    pub fn new(min: Option<usize>, max: Option<usize>) -> Self {
        Self { min, max }
    }
}

/// Paragraph bounds plus cyclic content patterns
#[derive(Debug, Clone, Default)]
pub struct ParagraphRule {
    pub count: CountRule,
    pub patterns: Vec<Regex>,
}

/// List bounds plus per-list item bounds
#[derive(Debug, Clone, Default)]
pub struct ListRule {
    pub count: CountRule,
    pub items: Option<CountRule>,
}

#[derive(Debug, Clone, Default)]
pub struct HeadingRule {
    /// Exact expected heading text
    pub constant: Option<String>,
    pub pattern: Option<Regex>,
}

/// One expected slot of an ordered body
#[derive(Debug, Clone)]
pub enum SequenceSlot {
    Paragraphs(ParagraphRule),
    CodeBlocks(CountRule),
    Lists(ListRule),
}

impl SequenceSlot {
    pub fn kind(&self) -> ContentKind {
        match self {
            SequenceSlot::Paragraphs(_) => ContentKind::Paragraphs,
            SequenceSlot::CodeBlocks(_) => ContentKind::CodeBlocks,
            SequenceSlot::Lists(_) => ContentKind::Lists,
        }
    }
}

/// Declared child sections, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Subsections {
    entries: Vec<(String, TemplateSection)>,
}

impl Subsections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, section: TemplateSection) -> Self {
        self.insert(name, section);
        self
    }

    /// Insert or replace, keeping the original slot on replace
    pub fn insert(&mut self, name: &str, section: TemplateSection) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = section,
            None => self.entries.push((name.to_string(), section)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TemplateSection> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TemplateSection)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn required_count(&self) -> usize {
        self.entries.iter().filter(|(_, s)| s.required).count()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.entries.first().map(|(n, _)| n.as_str())
    }
}

/// Rule set describing the expected shape of one section
#[derive(Debug, Clone)]
pub struct TemplateSection {
    pub description: Option<String>,
    pub heading: Option<HeadingRule>,
    pub required: bool,
    pub paragraphs: Option<ParagraphRule>,
    pub code_blocks: Option<CountRule>,
    pub lists: Option<ListRule>,
    pub sequence: Option<Vec<SequenceSlot>>,
    pub instructions: Vec<String>,
    pub additional_sections: bool,
    pub sections: Option<Subsections>,
}

impl Default for TemplateSection {
    fn default() -> Self {
        Self {
            description: None,
            heading: None,
            required: true,
            paragraphs: None,
            code_blocks: None,
            lists: None,
            sequence: None,
            instructions: Vec::new(),
            additional_sections: false,
            sections: None,
        }
    }
}

impl TemplateSection {
    /// True when this rule or any descendant declares instructions
    pub fn has_instructions(&self) -> bool {
        !self.instructions.is_empty()
            || self
                .sections
                .as_ref()
                .is_some_and(|subs| subs.iter().any(|(_, s)| s.has_instructions()))
    }

    /// Build from one `sections.<name>` value of a template file
    pub fn from_value(path: &str, value: Value) -> Result<Self> {
        let raw: RawTemplateSection =
            serde_json::from_value(value).map_err(|e| anyhow!("{}: {}", path, e))?;
        raw.into_section(path)
    }
}

/// A named root template
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub description: Option<String>,
    pub sections: Subsections,
}

impl Template {
    pub fn from_value(name: &str, value: Value) -> Result<Self> {
        let path = format!("templates.{}", name);
        check_name(&path, name)?;
        let raw: RawTemplate =
            serde_json::from_value(value).map_err(|e| anyhow!("{}: {}", path, e))?;
        let sections = match raw.sections {
            Some(map) => subsections_from_map(&path, map)?,
            None => Subsections::new(),
        };
        Ok(Self {
            name: name.to_string(),
            description: raw.description,
            sections,
        })
    }

    pub fn has_instructions(&self) -> bool {
        self.sections.iter().any(|(_, s)| s.has_instructions())
    }
}

/// Root of a template (matches file format)
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTemplate {
    description: Option<String>,
    sections: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHeading {
    #[serde(rename = "const")]
    constant: Option<String>,
    pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParagraphs {
    min: Option<usize>,
    max: Option<usize>,
    #[serde(default)]
    patterns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLists {
    min: Option<usize>,
    max: Option<usize>,
    items: Option<CountRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSequenceItem {
    paragraphs: Option<RawParagraphs>,
    code_blocks: Option<CountRule>,
    lists: Option<RawLists>,
}

/// Section entry (matches file format)
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTemplateSection {
    description: Option<String>,
    heading: Option<RawHeading>,
    #[serde(default = "default_required")]
    required: bool,
    paragraphs: Option<RawParagraphs>,
    code_blocks: Option<CountRule>,
    lists: Option<RawLists>,
    sequence: Option<Vec<RawSequenceItem>>,
    instructions: Option<Vec<String>>,
    #[serde(default, rename = "additionalSections")]
    additional_sections: bool,
    sections: Option<Map<String, Value>>,
}

fn default_required() -> bool {
    true
}

impl RawTemplateSection {
    fn into_section(self, path: &str) -> Result<TemplateSection> {
        if self.sequence.is_some()
            && (self.paragraphs.is_some() || self.code_blocks.is_some() || self.lists.is_some())
        {
            bail!(
                "{}: `sequence` cannot be combined with `paragraphs`, `code_blocks` or `lists`",
                path
            );
        }

        let heading = self
            .heading
            .map(|h| -> Result<HeadingRule> {
                Ok(HeadingRule {
                    constant: h.constant,
                    pattern: h
                        .pattern
                        .map(|p| compile(&format!("{}.heading.pattern", path), &p))
                        .transpose()?,
                })
            })
            .transpose()?;

        let paragraphs = self
            .paragraphs
            .map(|p| p.into_rule(&format!("{}.paragraphs", path)))
            .transpose()?;

        let sequence = match self.sequence {
            Some(items) => {
                if items.is_empty() {
                    bail!("{}.sequence: must contain at least one item", path);
                }
                let slots = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| item.into_slot(&format!("{}.sequence[{}]", path, i)))
                    .collect::<Result<Vec<_>>>()?;
                Some(slots)
            }
            None => None,
        };

        let sections = self
            .sections
            .map(|map| subsections_from_map(path, map))
            .transpose()?;

        Ok(TemplateSection {
            description: self.description,
            heading,
            required: self.required,
            paragraphs,
            code_blocks: self.code_blocks,
            lists: self.lists.map(RawLists::into_rule),
            sequence,
            instructions: self.instructions.unwrap_or_default(),
            additional_sections: self.additional_sections,
            sections,
        })
    }
}

impl RawParagraphs {
    fn into_rule(self, path: &str) -> Result<ParagraphRule> {
        let patterns = self
            .patterns
            .iter()
            .enumerate()
            .map(|(i, p)| compile(&format!("{}.patterns[{}]", path, i), p))
            .collect::<Result<Vec<_>>>()?;
        Ok(ParagraphRule {
            count: CountRule::new(self.min, self.max),
            patterns,
        })
    }
}

impl RawLists {
    fn into_rule(self) -> ListRule {
        ListRule {
            count: CountRule::new(self.min, self.max),
            items: self.items,
        }
    }
}

impl RawSequenceItem {
    fn into_slot(self, path: &str) -> Result<SequenceSlot> {
        match (self.paragraphs, self.code_blocks, self.lists) {
            (Some(p), None, None) => Ok(SequenceSlot::Paragraphs(
                p.into_rule(&format!("{}.paragraphs", path))?,
            )),
            (None, Some(c), None) => Ok(SequenceSlot::CodeBlocks(c)),
            (None, None, Some(l)) => Ok(SequenceSlot::Lists(l.into_rule())),
            _ => bail!(
                "{}: must declare exactly one of `paragraphs`, `code_blocks` or `lists`",
                path
            ),
        }
    }
}

fn subsections_from_map(path: &str, map: Map<String, Value>) -> Result<Subsections> {
    let mut subsections = Subsections::new();
    for (name, value) in map {
        let child_path = format!("{}.sections.{}", path, name);
        check_name(&child_path, &name)?;
        let section = TemplateSection::from_value(&child_path, value)?;
        subsections.insert(&name, section);
    }
    Ok(subsections)
}

fn check_name(path: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        bail!(
            "{}: name must only contain letters, digits, '-' or '_'",
            path
        );
    }
    Ok(())
}

fn compile(path: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("{}: invalid regex \"{}\"", path, pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_defaults() {
        let section = TemplateSection::from_value("s", json!({})).unwrap();
        assert!(section.required);
        assert!(!section.additional_sections);
        assert!(section.sections.is_none());
        assert!(section.instructions.is_empty());
    }

    #[test]
    fn test_full_section() {
        let section = TemplateSection::from_value(
            "s",
            json!({
                "heading": {"const": "Intro", "pattern": "^In"},
                "required": false,
                "paragraphs": {"min": 1, "max": 3, "patterns": ["^A", "^B"]},
                "code_blocks": {"max": 2},
                "lists": {"min": 1, "items": {"min": 2}},
                "additionalSections": true,
                "sections": {"first": {}, "second": {"required": false}}
            }),
        )
        .unwrap();

        let heading = section.heading.as_ref().unwrap();
        assert_eq!(heading.constant.as_deref(), Some("Intro"));
        assert!(heading.pattern.as_ref().unwrap().is_match("Intro"));
        assert!(!section.required);
        assert_eq!(section.paragraphs.as_ref().unwrap().patterns.len(), 2);
        assert_eq!(section.code_blocks, Some(CountRule::new(None, Some(2))));
        assert_eq!(
            section.lists.as_ref().unwrap().items,
            Some(CountRule::new(Some(2), None))
        );
        let subs = section.sections.as_ref().unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs.first_name(), Some("first"));
        assert_eq!(subs.required_count(), 1);
    }

    #[test]
    fn test_sequence_slots() {
        let section = TemplateSection::from_value(
            "s",
            json!({"sequence": [{"paragraphs": {"min": 1}}, {"code_blocks": {}}, {"lists": {"max": 1}}]}),
        )
        .unwrap();
        let kinds: Vec<_> = section
            .sequence
            .unwrap()
            .iter()
            .map(SequenceSlot::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ContentKind::Paragraphs,
                ContentKind::CodeBlocks,
                ContentKind::Lists
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = TemplateSection::from_value("t.sections.a", json!({"headings": {}})).unwrap_err();
        assert!(err.to_string().contains("t.sections.a"));
        assert!(err.to_string().contains("headings"));
    }

    #[test]
    fn test_rejects_sequence_with_paragraphs() {
        let err = TemplateSection::from_value(
            "s",
            json!({"sequence": [{"paragraphs": {}}], "paragraphs": {"min": 1}}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot be combined"));
    }

    #[test]
    fn test_rejects_ambiguous_sequence_item() {
        let err = TemplateSection::from_value(
            "s",
            json!({"sequence": [{"paragraphs": {}, "lists": {}}]}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("s.sequence[0]"));
    }

    #[test]
    fn test_rejects_empty_sequence() {
        assert!(TemplateSection::from_value("s", json!({"sequence": []})).is_err());
    }

    #[test]
    fn test_rejects_negative_count() {
        assert!(TemplateSection::from_value("s", json!({"paragraphs": {"min": -1}})).is_err());
    }

    #[test]
    fn test_rejects_bad_regex() {
        let err = TemplateSection::from_value("s", json!({"heading": {"pattern": "(unclosed"}}))
            .unwrap_err();
        assert!(err.to_string().contains("s.heading.pattern"));
    }

    #[test]
    fn test_rejects_bad_section_name() {
        let err = TemplateSection::from_value("s", json!({"sections": {"bad name": {}}}))
            .unwrap_err();
        assert!(err.to_string().contains("bad name"));
    }

    #[test]
    fn test_has_instructions_looks_at_descendants() {
        let section = TemplateSection::from_value(
            "s",
            json!({"sections": {"inner": {"instructions": ["Be brief."]}}}),
        )
        .unwrap();
        assert!(section.instructions.is_empty());
        assert!(section.has_instructions());
    }

    #[test]
    fn test_template_keeps_declaration_order() {
        let template = Template::from_value(
            "how-to",
            json!({"sections": {"zeta": {}, "alpha": {}, "mid": {}}}),
        )
        .unwrap();
        let names: Vec<_> = template.sections.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
