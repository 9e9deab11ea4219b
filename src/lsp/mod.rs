//! LSP Protocol Implementation
//!
//! Publishes violations of open markdown documents as diagnostics.

pub mod backend;
pub mod document;
pub mod handlers;
pub mod server;
pub mod watcher;

pub use backend::Backend;
pub use server::serve;
