//! Instruction Checker Backends
//!
//! Implementations of `InstructionChecker` that talk to a model server.

pub mod ollama;

pub use ollama::OllamaChecker;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:3b";
