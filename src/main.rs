use std::process::ExitCode;

use clap::Parser;

use doc_structure_lint::config::{Args, Config};
use doc_structure_lint::lint::{lint_document, LintRequest};
use doc_structure_lint::report::{render_json, render_text};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.common.log_level);

    let json = args.json;
    let file_path = args.file_path.clone();

    match run(args).await {
        Ok(report) => {
            let rendered = if json {
                render_json(&report)
            } else {
                Ok(render_text(&report))
            };
            match rendered {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("{:#}", e);
                    return ExitCode::FAILURE;
                }
            }
            if report.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            log::error!("Linting {} failed", file_path);
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<doc_structure_lint::LintReport> {
    let cwd = std::env::current_dir()?;
    let file_path = args.file_path.clone();
    let config = Config::resolve(args.into(), &cwd)?;
    if let Some(path) = &config.project_config_path {
        log::debug!("Using project config {}", path.display());
    }

    let request = LintRequest::from_config(file_path, &config)?;
    lint_document(&request).await
}

/// `RUST_LOG` wins over `--log-level`
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}
