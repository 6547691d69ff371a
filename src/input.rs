use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::Deserialize;

pub const DESCRIPTION_PLACEHOLDER: &str =
    "e.g. Create a user login flow with email + password + OTP verification";
pub const CREDENTIAL_HELP: &str = "Create a free account at https://platform.openai.com - pay-as-you-go; first $5 credit is usually free.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendChoice {
    #[default]
    #[serde(alias = "openai")]
    Llm,
    #[serde(alias = "heuristic")]
    Fallback,
}

impl BackendChoice {
    pub const ALL: [Self; 2] = [Self::Llm, Self::Fallback];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Fallback => "fallback",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Llm => "OpenAI Chat (recommended - needs key)",
            Self::Fallback => "Heuristic Fallback (dummy)",
        }
    }

    pub fn requires_credential(self) -> bool {
        matches!(self, Self::Llm)
    }
}

impl Display for BackendChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendChoice {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "llm" | "openai" => Ok(Self::Llm),
            "fallback" | "heuristic" => Ok(Self::Fallback),
            other => Err(anyhow!(
                "invalid backend `{other}`; expected `llm` or `fallback`"
            )),
        }
    }
}

/// Provider API key. Never printed: `Debug` is redacted and there is no
/// `Display` or `Serialize` impl.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for blank input so "unset" has a single representation.
    pub fn from_input(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Values read from the form at the moment the user triggers a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationInput {
    pub backend: BackendChoice,
    pub credential: Option<Credential>,
    pub description: String,
    pub show_reasoning: bool,
}

impl GenerationInput {
    /// Builds input from raw widget values. The credential text is only kept
    /// when the selected backend asks for one.
    pub fn collect(
        backend: BackendChoice,
        credential_text: &str,
        description: impl Into<String>,
        show_reasoning: bool,
    ) -> Self {
        let credential = if backend.requires_credential() {
            Credential::from_input(credential_text)
        } else {
            None
        };

        Self {
            backend,
            credential,
            description: description.into(),
            show_reasoning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Fallback,
    LanguageModel { credential: Credential },
}
