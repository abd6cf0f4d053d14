//! Glimpse command-line entrypoint.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use mimalloc::MiMalloc;

use glimpse::config::Config;
use glimpse::labeling::{RelabelOptions, RelabelReport};
use glimpse::session::{LearningSession, LearningStatus};
use glimpse::storage::{AttemptId, AttemptStore};
use glimpse::training::run_training;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Self-improving solver for four-choice image verification challenges.
#[derive(Parser)]
#[command(name = "glimpse", version, about)]
struct Cli {
    /// Attempt store root (overrides GLIMPSE_STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show learning counters, partition sizes and the active model
    Status,

    /// Label stored failures from baseline predictions that pass the confidence gate
    Relabel {
        /// Predict only; write nothing
        #[arg(long)]
        dry_run: bool,
        /// Report predictions for every failure, including labeled ones; write nothing
        #[arg(long)]
        review: bool,
    },

    /// Label one stored attempt by hand
    Label {
        /// Attempt id, e.g. failed_20240601_120000_000000-1a2b3c4d
        id: String,
        /// Correct candidate (1-4)
        index: u8,
    },

    /// Fine-tune the model on every labeled attempt
    Train,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    config.validate()?;

    tracing::debug!(store = %config.store_path.display(), "Configuration loaded");

    match cli.command {
        Commands::Status => {
            let session = LearningSession::from_config(&config)?;
            print_status(&session.status()?, cli.output)?;
        }
        Commands::Relabel { dry_run, review } => {
            let options = if review {
                RelabelOptions::review()
            } else if dry_run {
                RelabelOptions::dry_run()
            } else {
                RelabelOptions::apply()
            };
            let session = LearningSession::from_config(&config)?;
            print_relabel(&session.relabel(options)?, cli.output)?;
        }
        Commands::Label { id, index } => {
            let id = AttemptId::parse(&id).with_context(|| format!("invalid attempt id '{id}'"))?;
            let session = LearningSession::from_config(&config)?;
            if session.label_manually(&id, index)? {
                println!("labeled {id} as {index}");
            } else {
                println!("{id} was already labeled, left unchanged");
            }
        }
        Commands::Train => {
            let store = AttemptStore::open(&config.store_path)?;
            let (report, summary) = run_training(&store, &config.finetune_config())?;
            tracing::info!(
                samples = report.samples,
                successes = summary.from_successes,
                retroactive = summary.retroactive,
                immediate = summary.immediate,
                manual = summary.manual,
                loss = report.final_loss,
                accuracy = report.final_accuracy,
                path = %report.weights_path.display(),
                "Training complete"
            );
        }
    }

    Ok(())
}

fn print_status(status: &LearningStatus, output: OutputFormat) -> anyhow::Result<()> {
    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(status)?);
        return Ok(());
    }

    println!("attempts:          {}", status.total_attempts);
    println!(
        "  successes:       {} ({:.1}%)",
        status.successes, status.success_rate
    );
    println!("  failures:        {}", status.failures);
    println!(
        "failures labeled:  {} / {}",
        status.labeled_failures, status.stored_failures
    );
    println!("auto-labeled:      {}", status.auto_labeled);
    println!(
        "next training in:  {} labels ({} since last)",
        status.labels_until_training, status.labels_since_training
    );
    println!("trainings:         {}", status.training_count);
    match status.last_training {
        Some(at) => println!("last training:     {}", at.to_rfc3339()),
        None => println!("last training:     never"),
    }
    println!(
        "active model:      {} (fine-tuned {})",
        status.active_variant,
        if status.finetuned_available {
            "available"
        } else {
            "missing"
        }
    );
    Ok(())
}

fn print_relabel(report: &RelabelReport, output: OutputFormat) -> anyhow::Result<()> {
    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for entry in &report.entries {
        let existing = entry
            .existing_label
            .map_or_else(|| "-".to_string(), |l| l.to_string());
        println!(
            "{}  {:<20} predicted {} ({:.1}%, margin {:.1}%) existing {}{}",
            entry.id,
            entry.question,
            entry.predicted,
            entry.confidence,
            entry.margin,
            existing,
            if entry.written { "  [written]" } else { "" }
        );
    }
    println!(
        "examined {}, labeled {}, withheld {}, already labeled {}, errors {}",
        report.examined, report.labeled, report.withheld, report.already_labeled, report.errors
    );
    Ok(())
}
