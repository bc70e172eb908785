use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

mod aggregate;
mod config;
mod documents;
mod error;
mod extract;
mod grades;
mod logging;
mod models;
mod records;
mod report;
mod semester;
mod stats;

use crate::aggregate::Transcript;
use crate::config::AppConfig;
use crate::stats::TargetPlan;

#[derive(Parser)]
#[command(name = "transcript-gpa")]
#[command(about = "Grade memo and results page analysis", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from each document and print the outcomes as JSON
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Hall ticket number to attach when a document lacks one
        #[arg(long)]
        htno: Option<String>,
    },
    /// Merge documents and print the full analysis as JSON
    Analyze {
        files: Vec<PathBuf>,
        /// Previously exported CSV records to merge in
        #[arg(long = "records")]
        record_files: Vec<PathBuf>,
        #[arg(long)]
        htno: Option<String>,
    },
    /// Generate a markdown report
    Report {
        files: Vec<PathBuf>,
        #[arg(long = "records")]
        record_files: Vec<PathBuf>,
        #[arg(long)]
        htno: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export extracted records to CSV
    Export {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        htno: Option<String>,
    },
    /// Project the next SGPA from a semester history
    Predict {
        #[arg(long, required = true, num_args = 1..)]
        sgpa: Vec<f64>,
    },
    /// SGPA needed in the remaining semesters to reach a target CGPA
    Target {
        #[arg(long)]
        current_cgpa: f64,
        #[arg(long)]
        completed_credits: f64,
        #[arg(long)]
        target: f64,
        #[arg(long)]
        remaining_semesters: Option<u32>,
        #[arg(long)]
        credits_per_semester: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    logging::init_logging(level)?;

    match cli.command {
        Commands::Extract { files, htno } => {
            let outcomes = documents::load_batch(
                &files,
                config.batch.max_concurrent_documents,
                htno.as_deref(),
            )
            .await;
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
        Commands::Analyze {
            files,
            record_files,
            htno,
        } => {
            let transcript =
                load_transcript(&config, &files, &record_files, htno.as_deref()).await?;
            let analysis = report::build_analysis(&transcript);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Commands::Report {
            files,
            record_files,
            htno,
            out,
        } => {
            let transcript =
                load_transcript(&config, &files, &record_files, htno.as_deref()).await?;
            let analysis = report::build_analysis(&transcript);
            let report = report::build_report(&analysis, chrono::Utc::now().date_naive());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write report to {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { files, csv, htno } => {
            let transcript = load_transcript(&config, &files, &[], htno.as_deref()).await?;
            records::export_csv(&csv, &transcript.records)
                .with_context(|| format!("failed to export records to {}", csv.display()))?;
            println!(
                "Exported {} records to {}.",
                transcript.records.len(),
                csv.display()
            );
        }
        Commands::Predict { sgpa } => {
            let output = serde_json::json!({
                "prediction": stats::predict_next_sgpa(&sgpa),
                "insights": stats::insights(&sgpa),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Target {
            current_cgpa,
            completed_credits,
            target,
            remaining_semesters,
            credits_per_semester,
        } => {
            let plan = TargetPlan {
                current_cgpa,
                completed_credits,
                target_cgpa: target,
                remaining_semesters: remaining_semesters
                    .unwrap_or(config.analysis.remaining_semesters),
                credits_per_semester: credits_per_semester
                    .unwrap_or(config.analysis.credits_per_semester),
            };
            let outcome = stats::solve_target(&plan)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

/// Extract the batch, append CSV records, and fail when nothing was recovered.
async fn load_transcript(
    config: &AppConfig,
    files: &[PathBuf],
    record_files: &[PathBuf],
    htno: Option<&str>,
) -> anyhow::Result<Transcript> {
    let outcomes =
        documents::load_batch(files, config.batch.max_concurrent_documents, htno).await;
    let mut transcript = documents::merge_outcomes(&outcomes);

    for path in record_files {
        let imported = import_records(path)?;
        info!(source = %path.display(), records = imported.len(), "imported CSV records");
        transcript.extend_records(imported);
    }

    if transcript.records.is_empty() {
        anyhow::bail!(
            "could not extract subject data from any document; \
             try the grade memo PDF text instead of the results page"
        );
    }
    Ok(transcript)
}

fn import_records(path: &Path) -> anyhow::Result<Vec<models::SubjectRecord>> {
    records::import_csv(path)
        .with_context(|| format!("failed to import records from {}", path.display()))
}
