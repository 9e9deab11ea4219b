use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::{Mutex, RwLock};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::lsp::document::DocumentState;
use crate::lsp::handlers::{HandleDiagnostics, HandleDocumentSymbol, HandleHover};
use crate::lsp::watcher::{start_reload_task, watch_template_file};
use crate::template::loader::is_url;
use crate::template::TemplateRegistry;
use crate::validation::InstructionChecker;
use crate::Config;

/// The main LSP backend that holds state and implements the Language Server Protocol
#[derive(Clone)]
pub struct Backend {
    pub client: Client,
    pub registry: Arc<RwLock<TemplateRegistry>>,
    pub documents: Arc<Mutex<HashMap<Url, DocumentState>>>,
    pub config: Config,
    pub checker: Arc<dyn InstructionChecker>,
    /// Kept alive for as long as the server runs
    watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
}

impl Backend {
    pub fn new(client: Client, config: Config, registry: TemplateRegistry) -> Self {
        let checker = config.instruction_checker();

        Self {
            client,
            registry: Arc::new(RwLock::new(registry)),
            documents: Arc::new(Mutex::new(HashMap::new())),
            config,
            checker,
            watcher: Arc::new(Mutex::new(None)),
        }
    }

    /// Configured template, or the first template of the registry
    pub fn active_template_name(&self, registry: &TemplateRegistry) -> Option<String> {
        self.config
            .template
            .clone()
            .or_else(|| registry.names().first().map(|n| n.to_string()))
    }

    /// Replace the registry from the configured source. Keeps the previous
    /// templates when loading fails.
    pub async fn reload_templates(&self) -> bool {
        match self.config.template_registry().await {
            Ok(registry) => {
                let count = registry.len();
                *self.registry.write().await = registry;
                self.client
                    .log_message(
                        MessageType::INFO,
                        format!("Reloaded {} template(s)", count),
                    )
                    .await;
                true
            }
            Err(e) => {
                self.client
                    .log_message(
                        MessageType::ERROR,
                        format!("Failed to reload templates: {:#}", e),
                    )
                    .await;
                false
            }
        }
    }

    async fn start_watching(&self) {
        let Some(path) = self.config.template_path.as_deref() else {
            return;
        };
        if is_url(path) {
            return;
        }

        match watch_template_file(Path::new(path)) {
            Ok((watcher, rx)) => {
                *self.watcher.lock().await = Some(watcher);
                start_reload_task(self.clone(), rx);
                log::info!("Watching template file {}", path);
            }
            Err(e) => {
                self.client
                    .log_message(
                        MessageType::WARNING,
                        format!("Template file will not be reloaded: {:#}", e),
                    )
                    .await;
            }
        }
    }

    async fn store_document(&self, uri: Url, content: String) {
        match DocumentState::new(content) {
            Ok(doc_state) => {
                self.documents.lock().await.insert(uri, doc_state);
            }
            Err(e) => {
                self.documents.lock().await.remove(&uri);
                self.client
                    .log_message(
                        MessageType::ERROR,
                        format!("Failed to parse {}: {:#}", uri, e),
                    )
                    .await;
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(
        &self,
        _: InitializeParams,
    ) -> tower_lsp::jsonrpc::Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "doc-structure-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "doc-structure-ls initialized")
            .await;
        self.start_watching().await;
    }

    async fn shutdown(&self) -> tower_lsp::jsonrpc::Result<()> {
        Ok(())
    }

    async fn hover(&self, params: HoverParams) -> tower_lsp::jsonrpc::Result<Option<Hover>> {
        self.handle_hover(params).await
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> tower_lsp::jsonrpc::Result<Option<DocumentSymbolResponse>> {
        self.handle_document_symbol(params).await
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        self.store_document(uri.clone(), params.text_document.text)
            .await;
        self.publish_diagnostics(uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().last() {
            self.store_document(uri.clone(), change.text).await;
            self.publish_diagnostics(uri).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(text) = params.text {
            self.store_document(uri.clone(), text).await;
        }
        self.publish_diagnostics(uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.lock().await.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tower_lsp::LspService;

    use super::*;
    use crate::template::{parse_templates, TemplateFormat};
    use crate::validation::InstructionFailure;

    /// Never answers
    struct StalledChecker;

    #[tower_lsp::async_trait]
    impl InstructionChecker for StalledChecker {
        async fn check(&self, _: &str, _: &str) -> anyhow::Result<Option<InstructionFailure>> {
            std::future::pending().await
        }
    }

    fn config() -> Config {
        Config {
            template: Some("t".to_string()),
            template_path: None,
            timeout: None,
            instructions: None,
            log_level: "info".to_string(),
            project_config_path: None,
        }
    }

    #[tokio::test]
    async fn test_slow_validation_does_not_hold_registry() {
        let registry = parse_templates(
            "templates:\n  t:\n    sections:\n      doc:\n        instructions:\n          - Be brief\n",
            TemplateFormat::Yaml,
        )
        .unwrap();
        let (service, _socket) = LspService::new(|client| {
            let mut backend = Backend::new(client, config(), registry);
            backend.checker = Arc::new(StalledChecker);
            backend
        });
        let backend = service.inner().clone();
        let uri = Url::parse("file:///tmp/doc.md").unwrap();
        backend
            .store_document(uri.clone(), "# Doc\n\nText.\n".to_string())
            .await;

        let pending = tokio::spawn({
            let backend = backend.clone();
            async move { backend.publish_diagnostics(uri).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        let guard = tokio::time::timeout(Duration::from_secs(1), backend.registry.write()).await;
        assert!(guard.is_ok());
        pending.abort();
    }
}
