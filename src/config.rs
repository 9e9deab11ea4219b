//! Configuration management for the linter and the language server.
//!
//! Handles:
//! - Command-line argument parsing for both binaries
//! - Project configuration discovery (`.doc-structure-lint.toml`)
//! - Template file and instruction checker selection

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use crate::checker::{OllamaChecker, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::template::{load_templates, TemplateRegistry};
use crate::validation::{InstructionChecker, SkipInstructions};

/// Project configuration file, looked up from the working directory upwards
pub const PROJECT_CONFIG_FILE: &str = ".doc-structure-lint.toml";

/// Command-line arguments for `doc-structure-lint`
#[derive(Debug, Parser)]
#[command(name = "doc-structure-lint")]
#[command(about = "Check the structure of a document against a template")]
#[command(version)]
pub struct Args {
    /// Document to lint: a local path or an http(s) URL
    #[arg(short = 'f', long)]
    pub file_path: String,

    /// Name of the template to check against
    #[arg(short = 't', long)]
    pub template: Option<String>,

    /// Template file (YAML, TOML or JSON), local path or URL
    #[arg(short = 'p', long)]
    pub template_path: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Give up on validation after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Command-line arguments for `doc-structure-ls`
#[derive(Debug, Parser)]
#[command(name = "doc-structure-ls")]
#[command(about = "Language server publishing document structure violations")]
#[command(version)]
pub struct ServerArgs {
    /// Name of the template open documents are checked against
    #[arg(short = 't', long)]
    pub template: Option<String>,

    /// Template file (YAML, TOML or JSON)
    #[arg(short = 'p', long)]
    pub template_path: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Flags shared by both binaries
#[derive(Debug, Clone, clap::Args)]
pub struct CommonArgs {
    /// Log level
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,

    /// Model server used to check template instructions
    #[arg(long)]
    pub instruction_endpoint: Option<String>,

    /// Model used to check template instructions
    #[arg(long)]
    pub instruction_model: Option<String>,
}

/// `.doc-structure-lint.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub template_path: Option<String>,
    pub template: Option<String>,
    pub timeout_secs: Option<u64>,
    pub instructions: Option<InstructionSettings>,
}

/// `[instructions]` table of the project config
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstructionSettings {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse project config: {}", path.display()))
    }

    /// Find and load the closest project config at or above `start`
    pub fn discover(start: &Path) -> Result<Option<(PathBuf, Self)>> {
        for dir in start.ancestors() {
            let candidate = dir.join(PROJECT_CONFIG_FILE);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((candidate, config)));
            }
        }
        Ok(None)
    }
}

/// Values given on the command line, before merging
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub template: Option<String>,
    pub template_path: Option<String>,
    pub timeout_secs: Option<u64>,
    pub instruction_endpoint: Option<String>,
    pub instruction_model: Option<String>,
    pub log_level: String,
}

/// Endpoint and model for the instruction checker
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionConfig {
    pub endpoint: String,
    pub model: String,
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub template: Option<String>,
    /// Template file to load; the embedded templates when `None`
    pub template_path: Option<String>,
    pub timeout: Option<Duration>,
    /// Instruction checking is off when `None`
    pub instructions: Option<InstructionConfig>,
    pub log_level: String,
    /// Path of the project config that was applied, for logging
    pub project_config_path: Option<PathBuf>,
}

impl From<Args> for Overrides {
    fn from(args: Args) -> Self {
        Self {
            template: args.template,
            template_path: args.template_path,
            timeout_secs: args.timeout_secs,
            instruction_endpoint: args.common.instruction_endpoint,
            instruction_model: args.common.instruction_model,
            log_level: args.common.log_level,
        }
    }
}

impl From<ServerArgs> for Overrides {
    fn from(args: ServerArgs) -> Self {
        Self {
            template: args.template,
            template_path: args.template_path,
            timeout_secs: None,
            instruction_endpoint: args.common.instruction_endpoint,
            instruction_model: args.common.instruction_model,
            log_level: args.common.log_level,
        }
    }
}

impl Config {
    /// Server configuration from the process arguments and working directory
    pub fn from_server_args() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        Self::resolve(ServerArgs::parse().into(), &cwd)
    }

    /// Merge command-line values over the project config found from `cwd`
    pub fn resolve(overrides: Overrides, cwd: &Path) -> Result<Self> {
        let (project_config_path, project) = match ProjectConfig::discover(cwd)? {
            Some((path, config)) => (Some(path), config),
            None => (None, ProjectConfig::default()),
        };
        let project_dir = project_config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);

        let template_path = overrides
            .template_path
            .or_else(|| {
                project
                    .template_path
                    .map(|p| relative_to(project_dir.as_deref(), &p))
            })
            .or_else(user_template_path);

        let instructions = if overrides.instruction_endpoint.is_some()
            || overrides.instruction_model.is_some()
            || project.instructions.is_some()
        {
            let settings = project.instructions.unwrap_or_default();
            Some(InstructionConfig {
                endpoint: overrides
                    .instruction_endpoint
                    .or(settings.endpoint)
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                model: overrides
                    .instruction_model
                    .or(settings.model)
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            })
        } else {
            None
        };

        Ok(Config {
            template: overrides.template.or(project.template),
            template_path,
            timeout: overrides
                .timeout_secs
                .or(project.timeout_secs)
                .map(Duration::from_secs),
            instructions,
            log_level: overrides.log_level,
            project_config_path,
        })
    }

    pub fn has_project_config(&self) -> bool {
        self.project_config_path.is_some()
    }

    /// Load the configured template file, or the embedded templates
    pub async fn template_registry(&self) -> Result<TemplateRegistry> {
        match &self.template_path {
            Some(path) => load_templates(path).await,
            None => TemplateRegistry::embedded(),
        }
    }

    pub fn instruction_checker(&self) -> Arc<dyn InstructionChecker> {
        match &self.instructions {
            Some(settings) => Arc::new(OllamaChecker::new(
                settings.endpoint.clone(),
                settings.model.clone(),
            )),
            None => Arc::new(SkipInstructions),
        }
    }
}

/// `<user config dir>/doc-structure-lint/templates.yaml`, if present
fn user_template_path() -> Option<String> {
    let path = dirs::config_dir()?
        .join("doc-structure-lint")
        .join("templates.yaml");
    path.is_file().then(|| path.to_string_lossy().into_owned())
}

fn relative_to(base: Option<&Path>, location: &str) -> String {
    if crate::template::loader::is_url(location) || Path::new(location).is_absolute() {
        return location.to_string();
    }
    match base {
        Some(dir) => dir.join(location).to_string_lossy().into_owned(),
        None => location.to_string(),
    }
}
