use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use seqdiagram_architect::cli::{GenerateArgs, run_generate};
use seqdiagram_architect::config::Settings;
use seqdiagram_architect::input::BackendChoice;
use seqdiagram_architect::server::{DEFAULT_BIND, run_http_server};
use seqdiagram_architect::studio::run_studio;

const LOG_FILE_PREFIX: &str = "seqdiagram_architect.log";

#[derive(Debug, Parser)]
#[command(
    name = "seqdiagram_architect",
    about = "Turn a system description into sequencediagram.org markup"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate diagram markup for a description and print it.
    Generate {
        description: String,
        /// `llm` (OpenAI chat) or `fallback` (fixed stub).
        #[arg(long, default_value = "llm")]
        backend: BackendChoice,
        /// Also ask the model for design reasoning (extra API call).
        #[arg(long)]
        show_reasoning: bool,
        /// Read the OpenAI API key from the first line of stdin.
        #[arg(long)]
        api_key_stdin: bool,
        /// Write the diagram markup to this file.
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Serve the browser form.
    Serve {
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: String,
    },
    /// Open the native form window.
    Studio,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _file_log_guard = init_tracing()?;

    let cli = Cli::parse();
    let settings = Settings::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Generate {
            description,
            backend,
            show_reasoning,
            api_key_stdin,
            output,
            json,
        } => {
            run_generate(
                &settings,
                GenerateArgs {
                    description,
                    backend,
                    show_reasoning,
                    api_key_stdin,
                    output,
                    json,
                },
            )
            .await?
        }
        Commands::Serve { bind } => run_http_server(&settings, &bind).await?,
        Commands::Studio => run_studio(&settings)?,
    }

    Ok(())
}

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,seqdiagram_architect=debug"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(env_filter);

    let (file_layer, guard) = match std::env::var_os("SEQDIAGRAM_LOG_DIR") {
        Some(log_dir) => {
            let file_filter = std::env::var("SEQDIAGRAM_FILE_LOG")
                .map(EnvFilter::new)
                .unwrap_or_else(|_| EnvFilter::new("info"));
            let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(guard)
}
