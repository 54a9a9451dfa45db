//! Command-line interface for wmsurvey.
//!
//! Provides commands for taking the survey, validating the corpus,
//! showing the resolved configuration and summarizing stored responses.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::sink_from_settings;
use crate::config::{self, Backend};
use crate::core::{tally_file, Score, Session, SessionError, Variant, MIN_CORPUS_SIZE};
use crate::corpus;
use crate::domain::{QuestionMode, RowSchema};

pub mod survey;

pub use survey::{Survey, SurveyEnd};

/// wmsurvey - Can you tell human, AI and watermarked AI texts apart?
#[derive(Parser, Debug)]
#[command(name = "wmsurvey")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Take the survey
    Take {
        /// Question mode (defaults to the configured one)
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Number of passages to show
        #[arg(short = 'n', long)]
        sample_size: Option<usize>,

        /// Storage backend (defaults to the configured one)
        #[arg(short, long, value_enum)]
        backend: Option<BackendArg>,

        /// Corpus file (defaults to the configured one)
        #[arg(short, long)]
        corpus: Option<PathBuf>,
    },

    /// Validate the corpus and show its label distribution
    Check {
        /// Corpus file (defaults to the configured one)
        #[arg(short, long)]
        corpus: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,

    /// Summarize accuracy over the stored responses file
    Tally {
        /// Responses file (defaults to the configured one)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Question mode for CLI (maps to QuestionMode)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Human or AI
    Binary,

    /// Human, AI, or AI with watermark
    Ternary,

    /// Human or AI, then watermark when AI
    TwoStep,
}

impl From<ModeArg> for QuestionMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Binary => QuestionMode::Binary,
            ModeArg::Ternary => QuestionMode::Ternary,
            ModeArg::TwoStep => QuestionMode::TwoStep,
        }
    }
}

/// Storage backend for CLI (maps to Backend)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    /// Local CSV file
    File,

    /// Google Sheets
    Sheets,
}

impl From<BackendArg> for Backend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::File => Backend::File,
            BackendArg::Sheets => Backend::Sheets,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Take {
                mode,
                sample_size,
                backend,
                corpus,
            } => take_survey(mode, sample_size, backend, corpus).await,
            Commands::Check { corpus } => check_corpus(corpus),
            Commands::Config => show_config(),
            Commands::Tally { file } => show_tally(file),
        }
    }
}

/// Run one interactive session on stdin/stdout
async fn take_survey(
    mode: Option<ModeArg>,
    sample_size: Option<usize>,
    backend: Option<BackendArg>,
    corpus_path: Option<PathBuf>,
) -> Result<()> {
    let config = config::config()?;

    let mut variant = config.variant;
    if let Some(mode) = mode {
        // An explicit mode brings its own default layout
        variant = Variant::new(mode.into(), variant.sample_size);
    }
    if let Some(n) = sample_size {
        if n == 0 {
            anyhow::bail!("--sample-size must be at least 1");
        }
        variant.sample_size = n;
    }

    let mut storage = config.storage.clone();
    if let Some(backend) = backend {
        storage.backend = backend.into();
    }
    let sink = sink_from_settings(&storage)?;

    let corpus_path = corpus_path.unwrap_or_else(|| config.corpus.clone());
    let corpus = corpus::shared(&corpus_path, config.delimiter)?;

    let mut session = match Session::start(corpus, variant) {
        Ok(session) => session,
        Err(SessionError::CorpusTooSmall { available, required }) => {
            eprintln!("No hay suficientes textos válidos para mostrar. Revisa el archivo.");
            eprintln!("[{} valid passages in {}, need {}]", available, corpus_path.display(), required);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let stdin = io::stdin();
    let mut survey = Survey::new(stdin.lock(), io::stdout());
    match survey.run(&mut session, sink.as_ref()).await? {
        SurveyEnd::Submitted => eprintln!("\n[Session {} stored via {}]", session.id(), sink.name()),
        SurveyEnd::Abandoned => eprintln!("\n[Session {} left without submitting]", session.id()),
    }

    Ok(())
}

/// Validate the corpus file
fn check_corpus(corpus_path: Option<PathBuf>) -> Result<()> {
    let config = config::config()?;
    let path = corpus_path.unwrap_or_else(|| config.corpus.clone());

    let corpus = corpus::load_corpus(&path, config.delimiter)
        .with_context(|| format!("Failed to load corpus: {}", path.display()))?;

    println!("Corpus: {}", path.display());
    println!("Valid passages: {}", corpus.len());
    println!("Discarded (blank text): {}", corpus.discarded());

    let (human, marked, plain) = corpus.truth_counts();
    println!("\nGround truth:");
    println!("  human:                {}", human);
    println!("  ai with watermark:    {}", marked);
    println!("  ai without watermark: {}", plain);

    println!("\nLabels:");
    for (label, count) in corpus.label_counts() {
        println!("  {:<30} {}", label, count);
    }

    let required = config.variant.sample_size.max(MIN_CORPUS_SIZE);
    if corpus.len() < required {
        anyhow::bail!(
            "Corpus has {} valid passages; sessions need at least {}",
            corpus.len(),
            required
        );
    }

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = config::config()?;

    println!("Config file: {}", match &config.config_file {
        Some(path) => path.display().to_string(),
        None => "(none)".to_string(),
    });
    println!("Home:        {}", config.home.display());
    println!("Corpus:      {}", config.corpus.display());
    println!("Delimiter:   {}", config.delimiter as char);
    println!("Mode:        {:?}", config.variant.mode);
    println!("Sample size: {}", config.variant.sample_size);
    println!("Row schema:  {:?} ({} columns)", config.variant.schema, config.variant.schema.header().len());
    println!("Backend:     {:?}", config.storage.backend);
    match config.storage.backend {
        Backend::File => println!("Responses:   {}", config.storage.responses_file.display()),
        Backend::Sheets => {
            println!(
                "Spreadsheet: {}",
                config.storage.spreadsheet_id.as_deref().unwrap_or("(not set)")
            );
            println!("Range:       {}", config.storage.range);
            println!("Token env:   {}", config.storage.token_env);
        }
    }

    Ok(())
}

/// Summarize the responses file
fn show_tally(file: Option<PathBuf>) -> Result<()> {
    let config = config::config()?;
    let path = file.unwrap_or_else(|| config.storage.responses_file.clone());

    if !path.exists() {
        println!("No responses stored yet ({})", path.display());
        return Ok(());
    }

    let tally = tally_file(&path)?;

    println!("Responses: {}", path.display());
    if let Some(schema) = tally.schema {
        println!("Layout:    {}", describe_schema(schema));
    }
    println!("Rows:      {}", tally.rows);
    println!("Sessions:  {}", tally.sessions);
    println!("\n{:<12} {:>8} {:>8} {:>9}", "DIMENSION", "CORRECT", "TOTAL", "ACCURACY");
    println!("{}", "-".repeat(40));
    for (name, score) in [
        ("exact", tally.exact),
        ("human/ai", tally.provenance),
        ("watermark", tally.watermark),
    ] {
        println!("{:<12} {:>8} {:>8} {:>9}", name, score.correct, score.total, format_accuracy(&score));
    }

    Ok(())
}

fn describe_schema(schema: RowSchema) -> &'static str {
    match schema {
        RowSchema::Compact => "single question (6 columns)",
        RowSchema::Padded => "single question (7 columns)",
        RowSchema::Split => "ai + watermark (8 columns)",
    }
}

fn format_accuracy(score: &Score) -> String {
    score
        .accuracy()
        .map(|a| format!("{:.1}%", a * 100.0))
        .unwrap_or_else(|| "-".to_string())
}
