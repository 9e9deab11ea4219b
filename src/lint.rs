//! Document Linting
//!
//! Ties the pieces together for one file: load templates, read and parse the
//! document, run the engine and wrap the outcome in a report.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::parser::parse_markdown;
use crate::template::loader::is_url;
use crate::template::{load_templates, Subsections, TemplateRegistry};
use crate::tree::Document;
use crate::validation::{validate_structure, InstructionChecker, SkipInstructions, Violation};

/// How a document file is turned into a section tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Markdown,
    /// A section tree serialized by another front-end
    Json,
}

impl DocumentFormat {
    pub fn from_location(location: &str) -> Self {
        let extension = Path::new(location)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => DocumentFormat::Json,
            _ => DocumentFormat::Markdown,
        }
    }

    pub fn parse(&self, source: &str) -> Result<Document> {
        match self {
            DocumentFormat::Markdown => parse_markdown(source),
            DocumentFormat::Json => {
                serde_json::from_str(source).context("Invalid section tree JSON")
            }
        }
    }
}

/// Outcome of linting one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintReport {
    pub success: bool,
    pub errors: Vec<Violation>,
}

impl LintReport {
    pub fn from_violations(errors: Vec<Violation>) -> Self {
        Self {
            success: errors.is_empty(),
            errors,
        }
    }
}

/// Everything needed to lint a single document
pub struct LintRequest {
    pub file_path: String,
    pub template: String,
    /// Embedded templates are used when `None`
    pub template_path: Option<String>,
    pub timeout: Option<Duration>,
    pub checker: Arc<dyn InstructionChecker>,
}

impl LintRequest {
    pub fn new(file_path: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            template: template.into(),
            template_path: None,
            timeout: None,
            checker: Arc::new(SkipInstructions),
        }
    }

    /// Build a request from resolved configuration
    pub fn from_config(file_path: impl Into<String>, config: &Config) -> Result<Self> {
        let template = config
            .template
            .clone()
            .ok_or_else(|| anyhow!("No template specified"))?;
        Ok(Self {
            file_path: file_path.into(),
            template,
            template_path: config.template_path.clone(),
            timeout: config.timeout,
            checker: config.instruction_checker(),
        })
    }

    pub fn with_template_path(mut self, template_path: impl Into<String>) -> Self {
        self.template_path = Some(template_path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_checker(mut self, checker: Arc<dyn InstructionChecker>) -> Self {
        self.checker = checker;
        self
    }
}

/// Run the engine, giving up once `limit` has passed
pub async fn validate_with_timeout(
    document: &Document,
    rules: &Subsections,
    checker: &dyn InstructionChecker,
    limit: Option<Duration>,
) -> Result<Vec<Violation>> {
    let validation = validate_structure(document, rules, checker);
    let violations = match limit {
        Some(limit) => tokio::time::timeout(limit, validation)
            .await
            .map_err(|_| anyhow!("Validation timed out after {:?}", limit))?,
        None => validation.await,
    }?;
    Ok(violations)
}

/// Lint one document against a named template
pub async fn lint_document(request: &LintRequest) -> Result<LintReport> {
    let registry = match &request.template_path {
        Some(path) => load_templates(path).await?,
        None => TemplateRegistry::embedded()?,
    };
    let template = registry.require(&request.template)?;

    let source = read_document(&request.file_path).await?;
    let document = DocumentFormat::from_location(&request.file_path).parse(&source)?;
    log::debug!(
        "Parsed {} into {} top-level sections",
        request.file_path,
        document.sections.len()
    );

    let violations = validate_with_timeout(
        &document,
        &template.sections,
        request.checker.as_ref(),
        request.timeout,
    )
    .await
    .with_context(|| format!("Failed to validate {}", request.file_path))?;

    log::info!(
        "{}: {} violation(s) against template \"{}\"",
        request.file_path,
        violations.len(),
        template.name
    );
    Ok(LintReport::from_violations(violations))
}

async fn read_document(location: &str) -> Result<String> {
    let content = if is_url(location) {
        fetch(location).await
    } else {
        tokio::fs::read_to_string(location).await.map_err(Into::into)
    };
    content.with_context(|| format!("Failed to read file: {}", location))
}

async fn fetch(url: &str) -> Result<String> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.text().await?)
}
