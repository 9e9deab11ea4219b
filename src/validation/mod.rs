//! Validation Engine
//!
//! Structural conformance checks of a section tree against a template,
//! separated from parsing and editor concerns.

pub mod engine;
pub mod heading;
pub mod instruction;
pub mod quantity;
pub mod sequence;
pub mod subsections;
pub mod violation;

pub use engine::{validate_section, validate_structure, EngineError};
pub use instruction::{InstructionChecker, InstructionFailure, SkipInstructions};
pub use violation::{Violation, ViolationCollector, ViolationKind};
