use anyhow::Result;
use doc_structure_lint::config::Config;
use doc_structure_lint::lsp::serve;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_server_args()?;

    // stdout carries the protocol
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .target(env_logger::Target::Stderr)
        .init();

    if let Some(path) = &config.project_config_path {
        log::info!("Using project config {}", path.display());
    }

    serve(config).await
}
