//! Template file watching for live reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tower_lsp::lsp_types::MessageType;

use crate::lsp::backend::Backend;
use crate::lsp::handlers::HandleDiagnostics;

/// Events from the template watcher
#[derive(Debug)]
pub enum WatcherEvent {
    TemplateFileChanged(PathBuf),
    WatcherError(notify::Error),
}

/// Watch the directory holding `template_file` and forward events for that
/// file only. Editors often save by replacing the file, which a watch on the
/// file itself would miss.
pub fn watch_template_file(
    template_file: &Path,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<WatcherEvent>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let file_name = template_file
        .file_name()
        .map(|n| n.to_os_string())
        .with_context(|| format!("Not a file: {}", template_file.display()))?;
    let dir = match template_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                if let EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) =
                    event.kind
                {
                    for path in event.paths {
                        if path.file_name() == Some(file_name.as_os_str()) {
                            let _ = tx.send(WatcherEvent::TemplateFileChanged(path));
                        }
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(WatcherEvent::WatcherError(e));
            }
        },
        Config::default().with_poll_interval(Duration::from_secs(1)),
    )?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;

    Ok((watcher, rx))
}

/// Reload templates and re-validate open documents on every change
pub fn start_reload_task(backend: Backend, mut rx: mpsc::UnboundedReceiver<WatcherEvent>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                WatcherEvent::TemplateFileChanged(path) => {
                    backend
                        .client
                        .log_message(
                            MessageType::INFO,
                            format!("Template file changed: {}", path.display()),
                        )
                        .await;

                    if backend.reload_templates().await {
                        backend.publish_all_diagnostics().await;
                    }
                }
                WatcherEvent::WatcherError(e) => {
                    backend
                        .client
                        .log_message(
                            MessageType::ERROR,
                            format!("Template file watcher error: {}", e),
                        )
                        .await;
                }
            }
        }
    });
}
