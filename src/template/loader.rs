//! Template Loader
//!
//! Reads a template file (YAML, TOML or JSON, local or over HTTP), inlines
//! local `$ref` pointers and converts every entry under `templates` into the
//! validated runtime model.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;

use super::registry::TemplateRegistry;
use super::schema::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Yaml,
    Toml,
    Json,
}

impl TemplateFormat {
    /// Pick a format from the file extension, defaulting to YAML
    pub fn from_location(location: &str) -> Self {
        let extension = Path::new(location)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => TemplateFormat::Toml,
            Some("json") => TemplateFormat::Json,
            _ => TemplateFormat::Yaml,
        }
    }
}

pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Load templates from a file path or an http(s) URL
pub async fn load_templates(location: &str) -> Result<TemplateRegistry> {
    let content = if is_url(location) {
        fetch(location)
            .await
            .context("Error reading template file")?
    } else {
        if !Path::new(location).exists() {
            bail!("Template file not found: {}", location);
        }
        tokio::fs::read_to_string(location)
            .await
            .with_context(|| format!("Error reading template file: {}", location))?
    };

    log::debug!("Loaded template file {}", location);
    parse_templates(&content, TemplateFormat::from_location(location))
}

async fn fetch(url: &str) -> Result<String> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Parse, dereference and validate template file content
pub fn parse_templates(content: &str, format: TemplateFormat) -> Result<TemplateRegistry> {
    let document = to_value(content, format).context("Error reading template file")?;
    let document = resolve_refs(&document).context("Error reading template file")?;

    let templates = match document.get("templates") {
        Some(Value::Object(map)) => map.clone(),
        Some(_) => bail!("Template is invalid: `templates` must be a mapping"),
        None => bail!("Template is invalid: missing `templates`"),
    };

    let mut registry = TemplateRegistry::new();
    for (name, value) in templates {
        let template = Template::from_value(&name, value)
            .map_err(|e| anyhow!("Template is invalid: {:#}", e))?;
        registry.add_template(template);
    }
    Ok(registry)
}

fn to_value(content: &str, format: TemplateFormat) -> Result<Value> {
    let value = match format {
        TemplateFormat::Yaml => serde_yaml::from_str(content)?,
        TemplateFormat::Toml => toml::from_str(content)?,
        TemplateFormat::Json => serde_json::from_str(content)?,
    };
    Ok(value)
}

/// Replace every `{"$ref": "#/a/b", ...}` object with the target it points
/// to. Sibling keys of the reference override keys of the target.
pub fn resolve_refs(root: &Value) -> Result<Value> {
    let mut stack = Vec::new();
    resolve(root, root, &mut stack)
}

fn resolve(value: &Value, root: &Value, stack: &mut Vec<String>) -> Result<Value> {
    match value {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref") {
                let reference = reference
                    .as_str()
                    .ok_or_else(|| anyhow!("`$ref` must be a string"))?;
                let pointer = reference
                    .strip_prefix('#')
                    .ok_or_else(|| anyhow!("Unsupported reference \"{}\"", reference))?;
                if stack.iter().any(|seen| seen == pointer) {
                    bail!("Circular reference \"{}\"", reference);
                }
                let target = root
                    .pointer(pointer)
                    .ok_or_else(|| anyhow!("Unresolved reference \"{}\"", reference))?;

                stack.push(pointer.to_string());
                let mut resolved = resolve(target, root, stack)?;
                stack.pop();

                for (key, sibling) in map.iter().filter(|(k, _)| *k != "$ref") {
                    let sibling = resolve(sibling, root, stack)?;
                    match &mut resolved {
                        Value::Object(target_map) => {
                            target_map.insert(key.clone(), sibling);
                        }
                        _ => bail!(
                            "Reference \"{}\" has sibling keys but does not point to a mapping",
                            reference
                        ),
                    }
                }
                return Ok(resolved);
            }

            let mut out = serde_json::Map::new();
            for (key, child) in map {
                out.insert(key.clone(), resolve(child, root, stack)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| resolve(item, root, stack))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}
