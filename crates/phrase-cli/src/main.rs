//! # speech-to-phrase
//!
//! Offline tools around the transcription layer: run text through the
//! finalization pipeline, decode token ids, inspect resolved settings.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use phrase_settings::PhraseSettings;
use phrase_transcription::{Finalizer, Model, ModelType, TokenTable, WordCasing};
use tracing::debug;

/// Speech-to-phrase command-line tools.
#[derive(Parser, Debug)]
#[command(name = "speech-to-phrase", about = "Speech-to-phrase transcription tools")]
struct Cli {
    /// Settings file (defaults to `~/.speech-to-phrase/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Emit JSON-lines logs instead of compact text.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run text through casing, language normalization, and meta decoding.
    Normalize {
        /// Language family tag of the model (e.g. `vi`).
        #[arg(long, default_value = "vi")]
        language: String,

        /// Casing strategy: keep, lower, upper, title.
        #[arg(long, default_value = "keep")]
        casing: String,

        /// Text to normalize.
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Convert token ids to text through a token file.
    Tokens {
        /// Token file with `<symbol> <id>` lines.
        #[arg(long)]
        file: PathBuf,

        /// Token ids in emission order.
        #[arg(required = true, allow_negative_numbers = true)]
        ids: Vec<i64>,
    },

    /// Print the resolved settings as JSON.
    Settings,
}

fn parse_casing(value: &str) -> Result<WordCasing> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .with_context(|| format!("unknown casing '{value}' (expected keep, lower, upper, title)"))
}

fn load(cli: &Cli) -> Result<PhraseSettings> {
    let settings = match &cli.settings {
        Some(path) => {
            if !path.exists() {
                bail!("settings file not found: {}", path.display());
            }
            phrase_settings::load_settings_from_path(path)
        }
        None => phrase_settings::load_settings(),
    };
    settings.context("failed to load settings")
}

fn normalize(language: &str, casing: &str, text: &[String]) -> Result<String> {
    let model = Model::new("cli", language, ModelType::PipelineModel)
        .with_casing(parse_casing(casing)?);
    Ok(Finalizer::default().finalize_cased(&model, &text.join(" ")))
}

fn tokens(file: &Path, ids: &[i64]) -> Result<String> {
    let table = TokenTable::load(file)?;
    if table.is_empty() {
        bail!("no tokens loaded from {}", file.display());
    }
    Ok(table.to_text(ids))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;

    if cli.json_logs {
        phrase_logging::init_json_subscriber(&settings.log_level);
    } else {
        phrase_logging::init_subscriber(&settings.log_level);
    }
    debug!(command = ?cli.command, "starting");

    let output = match &cli.command {
        Command::Normalize {
            language,
            casing,
            text,
        } => normalize(language, casing, text)?,
        Command::Tokens { file, ids } => tokens(file, ids)?,
        Command::Settings => serde_json::to_string_pretty(&settings)?,
    };
    println!("{output}");
    Ok(())
}
