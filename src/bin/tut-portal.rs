//! CLI binary for tut-portal.
//!
//! `serve` runs the HTTP API; `extract-event` and `ask` run a single
//! pipeline locally and print JSON / text to stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tut_portal::{ask_study_assistant, extract_event, run_server, AppState, PortalConfig};

const AFTER_HELP: &str = r#"ENVIRONMENT:
  GROQ_API_KEY       Bearer token for the chat-completion endpoint
  OCRSPACE_API_KEY   API key for the OCR fallback
  RUST_LOG           Overrides the log filter (e.g. tut_portal=debug)

PDF ENGINE:
  On first run the pdfium library is downloaded and cached automatically.
  To use an existing copy: PDFIUM_LIB_PATH=/path/to/libpdfium tut-portal ...
"#;

/// University resource portal API.
#[derive(Parser, Debug)]
#[command(
    name = "tut-portal",
    version,
    about = "University resource portal API: PDF event extraction and study assistant",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Chat-completion model identifier.
    #[arg(long, global = true, env = "TUT_PORTAL_MODEL")]
    model: Option<String>,

    /// Chat-completion endpoint URL.
    #[arg(long, global = true, env = "TUT_PORTAL_LLM_ENDPOINT")]
    llm_endpoint: Option<String>,

    /// LLM request timeout in seconds.
    #[arg(long, global = true, env = "TUT_PORTAL_LLM_TIMEOUT")]
    llm_timeout: Option<u64>,

    /// Debug logging.
    #[arg(short, long, global = true, env = "TUT_PORTAL_VERBOSE")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, global = true, env = "TUT_PORTAL_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server.
    Serve {
        #[arg(long, env = "TUT_PORTAL_HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, env = "TUT_PORTAL_PORT", default_value_t = 8000)]
        port: u16,
    },
    /// Extract event details from a local PDF and print them as JSON.
    ExtractEvent {
        /// PDF file.
        file: PathBuf,
    },
    /// Ask the study assistant a question.
    Ask {
        prompt: String,
    },
}

impl Cli {
    fn config(&self) -> Result<PortalConfig> {
        let mut builder = PortalConfig::from_env().to_builder();
        if let Some(model) = &self.model {
            builder = builder.model(model);
        }
        if let Some(url) = &self.llm_endpoint {
            builder = builder.llm_endpoint(url);
        }
        if let Some(secs) = self.llm_timeout {
            builder = builder.llm_timeout_secs(secs);
        }
        builder.build().context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = cli.config()?;
    if config.llm_api_key.is_none() {
        warn!("GROQ_API_KEY is not set; model calls will be rejected upstream");
    }

    // Fetch the PDF engine up front. Without it every upload goes to OCR,
    // so a failure here is logged rather than fatal.
    match tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None)) {
        Ok(path) => info!("PDF engine: {}", path.display()),
        Err(e) => warn!("PDF engine unavailable, text layer disabled: {}", e),
    }

    let state = AppState::from_config(config).context("Failed to initialise services")?;

    match cli.command {
        Command::Serve { host, port } => run_server(state, &host, port)
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("Server failed")?,

        Command::ExtractEvent { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let result = extract_event(&state.extractor, state.llm.as_ref(), Arc::from(bytes))
                .await
                .context("Event extraction failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialize event")?
            );
        }

        Command::Ask { prompt } => {
            let answer = ask_study_assistant(state.llm.as_ref(), &prompt)
                .await
                .context("Study assistant failed")?;
            println!("{answer}");
        }
    }

    Ok(())
}
