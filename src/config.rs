use std::env;

use anyhow::{Result, ensure};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Process-wide settings. The API key is deliberately absent: it is always
/// entered by the user and travels with each generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub model: String,
    pub openai_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_OPENAI_MODEL.to_owned(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_owned(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        // Load .env if present, but do not fail if file does not exist.
        let _ = dotenvy::dotenv();

        Self::from_values(
            read_optional_env("MODEL"),
            read_optional_env("OPENAI_BASE_URL"),
        )
    }

    fn from_values(model: Option<String>, openai_base_url: Option<String>) -> Result<Self> {
        let model = model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_owned());
        ensure!(!model.trim().is_empty(), "MODEL cannot be empty");

        let openai_base_url =
            openai_base_url.unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_owned());
        ensure!(
            openai_base_url.starts_with("http://") || openai_base_url.starts_with("https://"),
            "OPENAI_BASE_URL must start with http:// or https://, got `{openai_base_url}`"
        );

        Ok(Self {
            model,
            openai_base_url: openai_base_url.trim_end_matches('/').to_owned(),
        })
    }
}

fn read_optional_env(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}
