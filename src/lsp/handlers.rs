use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::*;

use crate::lint::validate_with_timeout;
use crate::lsp::backend::Backend;
use crate::lsp::document::{rule_for_heading, span_to_range};
use crate::template::TemplateSection;
use crate::tree::Section;
use crate::validation::Violation;

/// Source reported on every diagnostic
pub const DIAGNOSTIC_SOURCE: &str = "doc-structure-lint";

/// Trait for handling hover requests
#[tower_lsp::async_trait]
pub trait HandleHover {
    async fn handle_hover(&self, params: HoverParams) -> LspResult<Option<Hover>>;
}

/// Trait for handling document symbols
#[tower_lsp::async_trait]
pub trait HandleDocumentSymbol {
    async fn handle_document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>>;
}

/// Trait for handling diagnostics
#[tower_lsp::async_trait]
pub trait HandleDiagnostics {
    async fn publish_diagnostics(&self, uri: Url);
    async fn publish_all_diagnostics(&self);
}

#[tower_lsp::async_trait]
impl HandleHover for Backend {
    async fn handle_hover(&self, params: HoverParams) -> LspResult<Option<Hover>> {
        let tdpp = params.text_document_position_params;
        let uri = tdpp.text_document.uri;
        let pos = tdpp.position;

        let docs = self.documents.lock().await;
        let doc_state = match docs.get(&uri) {
            Some(state) => state,
            None => return Ok(None),
        };

        let registry = self.registry.read().await;
        let template = match self.active_template_name(&registry) {
            Some(name) => match registry.get(&name) {
                Some(template) => template,
                None => return Ok(None),
            },
            None => return Ok(None),
        };

        let Some((name, rule, section)) =
            rule_for_heading(&doc_state.document, &template.sections, pos)
        else {
            return Ok(None);
        };

        let m = MarkupContent {
            kind: MarkupKind::Markdown,
            value: hover_text(name, rule),
        };
        Ok(Some(Hover {
            contents: HoverContents::Markup(m),
            range: section
                .heading
                .as_ref()
                .map(|h| span_to_range(&doc_state.content, &h.position)),
        }))
    }
}

/// Markdown summary of a template rule
fn hover_text(name: &str, rule: &TemplateSection) -> String {
    let mut text = format!("**{}**", name);
    if !rule.required {
        text.push_str(" (optional)");
    }
    if let Some(description) = &rule.description {
        text.push_str("\n\n");
        text.push_str(description);
    }

    let mut constraints = Vec::new();
    if let Some(heading) = &rule.heading {
        if let Some(constant) = &heading.constant {
            constraints.push(format!("- Heading: `{}`", constant));
        }
        if let Some(pattern) = &heading.pattern {
            constraints.push(format!("- Heading pattern: `{}`", pattern.as_str()));
        }
    }
    if let Some(sections) = &rule.sections {
        let names: Vec<&str> = sections.iter().map(|(n, _)| n).collect();
        if !names.is_empty() {
            constraints.push(format!("- Subsections: {}", names.join(", ")));
        }
    }
    if !constraints.is_empty() {
        text.push_str("\n\n");
        text.push_str(&constraints.join("\n"));
    }
    text
}

#[tower_lsp::async_trait]
impl HandleDiagnostics for Backend {
    /// Validate one open document and publish the result
    async fn publish_diagnostics(&self, uri: Url) {
        let state = {
            let docs = self.documents.lock().await;
            match docs.get(&uri) {
                Some(state) => state.clone(),
                None => return,
            }
        };

        // Registry guard is released before validating
        let (name, rules) = {
            let registry = self.registry.read().await;
            let Some(name) = self.active_template_name(&registry) else {
                return;
            };
            let rules = registry.get(&name).map(|t| t.sections.clone());
            (name, rules)
        };
        let Some(rules) = rules else {
            self.client
                .log_message(
                    MessageType::WARNING,
                    format!("Template \"{}\" not found", name),
                )
                .await;
            return;
        };

        let violations = match validate_with_timeout(
            &state.document,
            &rules,
            self.checker.as_ref(),
            self.config.timeout,
        )
        .await
        {
            Ok(violations) => violations,
            Err(e) => {
                self.client
                    .log_message(MessageType::ERROR, format!("Validation failed: {:#}", e))
                    .await;
                return;
            }
        };

        let diagnostics = violations
            .iter()
            .map(|v| create_lsp_diagnostic(&state.content, v))
            .collect();
        self.client
            .publish_diagnostics(uri, diagnostics, None)
            .await;
    }

    /// Re-validate every open document, e.g. after a template reload
    async fn publish_all_diagnostics(&self) {
        let uris: Vec<Url> = self.documents.lock().await.keys().cloned().collect();
        for uri in uris {
            self.publish_diagnostics(uri).await;
        }
    }
}

pub fn create_lsp_diagnostic(source: &str, violation: &Violation) -> Diagnostic {
    Diagnostic::new(
        span_to_range(source, &violation.position),
        Some(DiagnosticSeverity::ERROR),
        Some(NumberOrString::String(violation.kind.to_string())),
        Some(DIAGNOSTIC_SOURCE.to_string()),
        violation.message.clone(),
        None,
        None,
    )
}

#[tower_lsp::async_trait]
impl HandleDocumentSymbol for Backend {
    async fn handle_document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;

        let docs = self.documents.lock().await;
        let doc_state = match docs.get(&uri) {
            Some(state) => state,
            None => return Ok(None),
        };

        let symbols = doc_state
            .document
            .sections
            .iter()
            .filter_map(|s| section_symbol(&doc_state.content, s))
            .collect();
        Ok(Some(DocumentSymbolResponse::Nested(symbols)))
    }
}

/// Outline entry for a headed section and its headed descendants
fn section_symbol(source: &str, section: &Section) -> Option<DocumentSymbol> {
    let heading = section.heading.as_ref()?;
    let children: Vec<DocumentSymbol> = section
        .sections
        .iter()
        .filter_map(|child| section_symbol(source, child))
        .collect();

    Some(DocumentSymbol {
        name: if heading.content.is_empty() {
            section.id.clone()
        } else {
            heading.content.clone()
        },
        detail: Some(format!("h{}", heading.level)),
        kind: SymbolKind::STRING,
        tags: None,
        #[allow(deprecated)]
        deprecated: Some(false), // Required by tower-lsp 0.20
        range: span_to_range(source, &section.position),
        selection_range: span_to_range(source, &heading.position),
        children: if children.is_empty() {
            None
        } else {
            Some(children)
        },
    })
}
