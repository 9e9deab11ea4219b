//! Template Registry
//!
//! Named templates in file order, plus the embedded default set.

use anyhow::{anyhow, Context, Result};

use super::loader::{parse_templates, TemplateFormat};
use super::schema::Template;

const EMBEDDED_TEMPLATES: &str = include_str!("../../resources/templates/default.yaml");

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Templates shipped with the binary
    pub fn embedded() -> Result<Self> {
        parse_templates(EMBEDDED_TEMPLATES, TemplateFormat::Yaml)
            .context("Failed to load embedded templates")
    }

    /// Add a template, replacing any template with the same name
    pub fn add_template(&mut self, template: Template) {
        match self.templates.iter_mut().find(|t| t.name == template.name) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Like `get`, with the lookup failure as an error
    pub fn require(&self, name: &str) -> Result<&Template> {
        self.get(name)
            .ok_or_else(|| anyhow!("Template \"{}\" not found", name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
