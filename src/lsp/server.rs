use std::thread;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{stdin, stdout};
use tower_lsp::{LspService, Server};

use crate::lsp::backend::Backend;
use crate::template::TemplateRegistry;
use crate::Config;

/// Makes the server exit shortly after start, for integration tests that
/// read stdout to EOF
pub const TEST_EXIT_ENV: &str = "DOC_STRUCTURE_LS_TEST_EXIT";

/// Start the LSP server
pub async fn serve(config: Config) -> Result<()> {
    let registry = load_registry(&config).await?;
    log::info!(
        "Serving with {} template(s): {}",
        registry.len(),
        registry.names().join(", ")
    );

    if std::env::var(TEST_EXIT_ENV).as_deref() == Ok("1") {
        thread::spawn(|| {
            thread::sleep(Duration::from_secs(1));
            std::process::exit(0);
        });
    }

    let (service, socket) =
        LspService::build(move |client| Backend::new(client, config.clone(), registry.clone()))
            .finish();

    Server::new(stdin(), stdout(), socket).serve(service).await;

    Ok(())
}

/// A broken template file should not keep the server from starting
async fn load_registry(config: &Config) -> Result<TemplateRegistry> {
    match config.template_registry().await {
        Ok(registry) => Ok(registry),
        Err(e) if config.template_path.is_some() => {
            log::error!("{:#}; falling back to the embedded templates", e);
            TemplateRegistry::embedded()
        }
        Err(e) => Err(e),
    }
}
