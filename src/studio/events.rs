use std::time::SystemTime;

use crate::generate::{GenerateError, GenerationResult, Severity};
use crate::input::GenerationInput;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioCommand {
    Generate { input: GenerationInput },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioEvent {
    GenerationStarted {
        started_at: SystemTime,
    },
    GenerationCompleted {
        result: GenerationResult,
        show_reasoning: bool,
    },
    GenerationFailed {
        notice: StudioNotice,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioNotice {
    pub severity: Severity,
    pub message: String,
}

impl From<&GenerateError> for StudioNotice {
    fn from(error: &GenerateError) -> Self {
        let message = if error.is_input_error() {
            error.to_string()
        } else {
            format!("Diagram generation failed: {error}")
        };

        Self {
            severity: error.severity(),
            message,
        }
    }
}
