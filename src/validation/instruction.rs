//! Instruction Validator
//!
//! Free-text instructions are judged by an injected checker, typically a
//! language model. The engine only sees pass or fail plus an explanation.

use serde::{Deserialize, Serialize};
use tower_lsp::async_trait;

use crate::tree::Section;

use super::engine::EngineError;
use super::violation::{Anchor, ViolationCollector, ViolationKind};

/// Verdict for an instruction the content does not follow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionFailure {
    pub explanation: String,
}

/// Judges whether section text follows a natural-language instruction
#[async_trait]
pub trait InstructionChecker: Send + Sync {
    /// `Ok(None)` means the instruction is satisfied
    async fn check(
        &self,
        content: &str,
        instruction: &str,
    ) -> anyhow::Result<Option<InstructionFailure>>;
}

/// Used when no checker is configured: every instruction passes
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipInstructions;

#[async_trait]
impl InstructionChecker for SkipInstructions {
    async fn check(
        &self,
        _content: &str,
        instruction: &str,
    ) -> anyhow::Result<Option<InstructionFailure>> {
        log::warn!(
            "No instruction checker configured, skipping instruction \"{}\"",
            instruction
        );
        Ok(None)
    }
}

/// Run every instruction in order against the section's raw body text
pub async fn check_instructions(
    section: &Section,
    instructions: &[String],
    checker: &dyn InstructionChecker,
    out: &mut ViolationCollector,
) -> Result<(), EngineError> {
    let anchor = Anchor::section(section);
    for instruction in instructions {
        let verdict = checker
            .check(&section.raw_content, instruction)
            .await
            .map_err(|e| EngineError::Checker {
                heading: section.heading_label().unwrap_or_default().to_string(),
                reason: format!("{:#}", e),
            })?;

        if let Some(failure) = verdict {
            let separator = if instruction.ends_with('.') { "" } else { "." };
            out.add(
                ViolationKind::InstructionError,
                &anchor,
                format!(
                    "Instruction: {}{} Explanation: {}",
                    instruction, separator, failure.explanation
                ),
            );
        }
    }
    Ok(())
}
