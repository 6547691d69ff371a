use serde::Serialize;
use tracing::{info, warn};

use crate::input::{Backend, BackendChoice, GenerationInput};
use crate::model::{ProviderError, TextProvider, TextRequest};
use crate::present::sequence_diagram_link;

pub const TEMPERATURE: f32 = 0.3;
pub const FALLBACK_DIAGRAM: &str = "Caller->System: TODO\nSystem->Caller: Not implemented";
pub const FALLBACK_REASONING: &str = "(Heuristic fallback selected; no LLM used.)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Please enter a system description.")]
    MissingDescription,

    #[error("Please supply your OpenAI API key in the sidebar.")]
    MissingCredential,

    #[error("model request failed: {0}")]
    Provider(#[from] ProviderError),
}

impl GenerateError {
    /// Input problems are caught before any provider call and are the user's
    /// to fix; provider failures are not.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MissingDescription | Self::MissingCredential)
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingDescription => Severity::Warning,
            Self::MissingCredential | Self::Provider(_) => Severity::Error,
        }
    }
}

/// Output of one successful generation. Fields are read-only so the outbound
/// link can never drift from the markup it encodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    reasoning: Option<String>,
    diagram_markup: String,
}

impl GenerationResult {
    pub fn new(reasoning: Option<String>, diagram_markup: impl Into<String>) -> Self {
        Self {
            reasoning,
            diagram_markup: diagram_markup.into(),
        }
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    pub fn diagram_markup(&self) -> &str {
        &self.diagram_markup
    }

    pub fn outbound_link(&self) -> String {
        sequence_diagram_link(&self.diagram_markup)
    }
}

/// Checks the preconditions in order and resolves the backend choice into a
/// tagged variant carrying whatever it needs.
pub fn validate(input: &GenerationInput) -> Result<Backend, GenerateError> {
    if input.description.trim().is_empty() {
        return Err(GenerateError::MissingDescription);
    }

    match input.backend {
        BackendChoice::Fallback => Ok(Backend::Fallback),
        BackendChoice::Llm => input
            .credential
            .clone()
            .map(|credential| Backend::LanguageModel { credential })
            .ok_or(GenerateError::MissingCredential),
    }
}

pub async fn generate<P: TextProvider>(
    input: &GenerationInput,
    provider: &P,
    model: &str,
) -> Result<GenerationResult, GenerateError> {
    let backend = match validate(input) {
        Ok(backend) => backend,
        Err(error) => {
            warn!(backend = %input.backend, error = %error, "generation aborted");
            return Err(error);
        }
    };

    info!(
        backend = %input.backend,
        show_reasoning = input.show_reasoning,
        description_chars = input.description.chars().count(),
        "starting diagram generation"
    );

    let credential = match backend {
        Backend::Fallback => return Ok(fallback_result(input.show_reasoning)),
        Backend::LanguageModel { credential } => credential,
    };

    let reasoning = if input.show_reasoning {
        let request = text_request(model, reasoning_prompt(&input.description));
        let text = provider.generate_text(&credential, &request).await?;
        info!(reasoning_chars = text.chars().count(), "received reasoning");
        Some(text.trim().to_owned())
    } else {
        None
    };

    let request = text_request(model, diagram_prompt(&input.description));
    let diagram_markup = provider.generate_text(&credential, &request).await?;
    info!(
        diagram_chars = diagram_markup.chars().count(),
        "received diagram markup"
    );

    Ok(GenerationResult::new(reasoning, diagram_markup.trim()))
}

pub fn fallback_result(show_reasoning: bool) -> GenerationResult {
    GenerationResult::new(
        show_reasoning.then(|| FALLBACK_REASONING.to_owned()),
        FALLBACK_DIAGRAM,
    )
}

fn text_request(model: &str, prompt: String) -> TextRequest {
    TextRequest {
        model: model.to_owned(),
        prompt,
        temperature: TEMPERATURE,
    }
}

pub fn reasoning_prompt(description: &str) -> String {
    format!(
        "You are a senior software architect.\n\
         Provide a concise step-by-step reasoning outline for how you'd design the system described below. Limit to ~10 bullet points.\n\
         \n\
         SYSTEM DESCRIPTION:\n\
         {description}"
    )
}

pub fn diagram_prompt(description: &str) -> String {
    format!(
        "You are a senior software architect. Think through the system below and then output ONLY the final sequence diagram code using the textual syntax supported by https://www.sequencediagram.org. Do **not** add any commentary before or after the diagram.\n\
         \n\
         SYSTEM DESCRIPTION:\n\
         {description}"
    )
}
