use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::Settings;
use crate::generate::generate;
use crate::input::{BackendChoice, GenerationInput};
use crate::model::OpenAiProvider;
use crate::present::Presentation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    pub description: String,
    pub backend: BackendChoice,
    pub show_reasoning: bool,
    pub api_key_stdin: bool,
    pub output: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct GenerateJsonOutput<'a> {
    reasoning: Option<&'a str>,
    diagram_markup: &'a str,
    link: &'a str,
}

pub async fn run_generate(settings: &Settings, args: GenerateArgs) -> Result<()> {
    let credential_text = if args.api_key_stdin && args.backend.requires_credential() {
        read_credential_line().context("failed to read API key from stdin")?
    } else {
        String::new()
    };

    let input = GenerationInput::collect(
        args.backend,
        &credential_text,
        args.description,
        args.show_reasoning,
    );
    let provider = OpenAiProvider::new(settings);
    let result = generate(&input, &provider, &settings.model).await?;
    let presentation = Presentation::new(&result, input.show_reasoning);

    if let Some(path) = &args.output {
        presentation.download().save_to(path)?;
        info!(path = %path.display(), "saved diagram code");
    }

    let mut stdout = io::stdout().lock();
    if args.json {
        let body = GenerateJsonOutput {
            reasoning: presentation.reasoning,
            diagram_markup: presentation.diagram_markup,
            link: &presentation.link,
        };
        serde_json::to_writer_pretty(&mut stdout, &body)
            .context("failed to serialize generation result")?;
        writeln!(stdout)?;
    } else {
        write!(stdout, "{}", presentation.render_text())?;
    }

    Ok(())
}

fn read_credential_line() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("OpenAI API Key: ");
        io::stderr().flush()?;
    }

    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line)
}
