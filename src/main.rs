use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{info, warn};

use txt_wrapped::config::AppConfig;
use txt_wrapped::contacts::{ContactBook, Pseudonymizer};
use txt_wrapped::correspondent::profile_texts;
use txt_wrapped::logging::{init_logging, OperationTimer};
use txt_wrapped::models::PeriodKind;
use txt_wrapped::nlp::NlpProcessor;
use txt_wrapped::timestamp::TimeBasis;
use txt_wrapped::validation::InputValidator;
use txt_wrapped::{AnalysisOptions, ResultRecord, WrappedService};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file layered above config/default, config/local and config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute yearly statistics from an iMessage database
    Analyze {
        /// Path to chat.db (or a SQL dump with --script)
        #[arg(short, long)]
        db: PathBuf,

        /// Treat the input as a SQL script instead of a database image
        #[arg(long)]
        script: bool,

        /// Target year (defaults to the latest year with sent messages)
        #[arg(short, long)]
        year: Option<i32>,

        /// Histogram bucket: month or weekday
        #[arg(short, long)]
        period: Option<PeriodKind>,

        /// Bucket dates in UTC instead of local time
        #[arg(long)]
        utc: bool,

        /// Words and emoji kept per top friend
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// vCard file used to resolve ids to names
        #[arg(short, long)]
        contacts: Option<PathBuf>,

        /// Replace ids with random names
        #[arg(long)]
        anonymize: bool,

        /// Seed for --anonymize
        #[arg(long, requires = "anonymize")]
        seed: Option<u64>,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Rank words and emoji in text read from stdin
    Words {
        /// Number of words and emoji to keep
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WordsOutput {
    top_word_count: Vec<txt_wrapped::models::WordCount>,
    top_emojis: Vec<txt_wrapped::models::EmojiCount>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    let log_file = config.log_file();
    let _guard = init_logging(Some(&config.log_level()), log_file.as_deref(), config.json_logs())?;

    info!("Starting txt-wrapped");

    match cli.command {
        Commands::Analyze {
            db,
            script,
            year,
            period,
            utc,
            top_k,
            contacts,
            anonymize,
            seed,
            output,
            compact,
        } => {
            let mut options = AnalysisOptions::from(&config);
            if year.is_some() {
                options.year = year;
            }
            if let Some(period) = period {
                options.period = period;
            }
            if utc {
                options.time_basis = TimeBasis::Utc;
            }
            if let Some(top_k) = top_k {
                options.top_k = top_k;
            }

            let mut record = analyze(options, &db, script).await?;

            if anonymize {
                let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
                let pseudonyms = Pseudonymizer::new(record.correspondent_ids(), &mut rng);
                record.resolve_names(&pseudonyms);
            } else if let Some(path) = contacts {
                match load_contacts(&path) {
                    Ok(book) => record.resolve_names(&book),
                    Err(e) => warn!(path = %path.display(), error = %e, "Ignoring contacts file"),
                }
            }

            write_json(&record, output.as_deref(), config.output.pretty && !compact)?;
        },
        Commands::Words { top_k } => {
            let top_k = top_k.unwrap_or(config.analysis.top_k);
            InputValidator::validate_limit("top_k", top_k, txt_wrapped::config::MAX_TOP_K)?;

            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;

            let processor = NlpProcessor::with_extra_stop_words(&config.analysis.extra_stop_words)?;
            let profile = profile_texts("stdin", text.lines().map(Some), &processor, top_k);
            let words = WordsOutput {
                top_word_count: profile.top_words,
                top_emojis: profile.top_emojis,
            };
            write_json(&words, None, config.output.pretty)?;
        },
    }

    Ok(())
}

/// Read the input and run the pipeline off the async runtime.
async fn analyze(options: AnalysisOptions, db: &Path, script: bool) -> Result<ResultRecord> {
    InputValidator::validate_input_file(db)?;
    let service = Arc::new(WrappedService::new(options)?);

    let record = if script {
        let sql = std::fs::read_to_string(db).with_context(|| format!("Failed to read {}", db.display()))?;
        service.analyze_script_async(sql).await
    } else {
        let bytes = std::fs::read(db).with_context(|| format!("Failed to read {}", db.display()))?;
        service.analyze_bytes_async(bytes).await
    };
    record.with_context(|| format!("Failed to analyze {}", db.display()))
}

fn load_contacts(path: &Path) -> Result<ContactBook> {
    InputValidator::validate_input_file(path)?;
    let text = std::fs::read_to_string(path)?;
    let book = ContactBook::parse_vcard(&text);
    if book.is_empty() {
        anyhow::bail!("no named contacts found");
    }
    info!(entries = book.len(), "Loaded contacts");
    Ok(book)
}

/// Write `value` as JSON to `path`, or stdout when absent
fn write_json<T: Serialize>(value: &T, path: Option<&Path>, pretty: bool) -> Result<()> {
    let timer = OperationTimer::new("write_output");
    let mut writer: Box<dyn Write> = match path {
        Some(path) => {
            InputValidator::validate_file_path(path)?;
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        },
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    timer.finish(true);
    Ok(())
}
