use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use groupscholar_writing_progress::config::Config;
use groupscholar_writing_progress::db::{self, PgRepository};
use groupscholar_writing_progress::models::{Submission, SubmissionStatus};
use groupscholar_writing_progress::report;
use groupscholar_writing_progress::review::{self, AnalysisOutcome};
use groupscholar_writing_progress::store::{
    list_submissions, load_contributor_progress, load_team_analytics, SubmissionFilter,
    SubmissionRepository,
};

#[derive(Parser)]
#[command(name = "writing-progress")]
#[command(about = "Writing review scoring and contributor progress for Group Scholar", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import historical submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Submit a new piece for review
    Submit {
        #[arg(long)]
        contributor_id: String,
        #[arg(long)]
        contributor_name: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body_file: PathBuf,
        #[arg(long, default_value = "markdown")]
        format: String,
    },
    /// Record an analysis result (JSON file) against a submission
    Review {
        #[arg(long)]
        submission: Uuid,
        #[arg(long)]
        analysis: PathBuf,
    },
    /// Mark annotations as applied
    ApplyFixes {
        #[arg(long)]
        submission: Uuid,
        #[arg(long = "annotation", required = true)]
        annotations: Vec<Uuid>,
    },
    /// Move a submission through the review workflow
    SetStatus {
        #[arg(long)]
        submission: Uuid,
        #[arg(long)]
        status: SubmissionStatus,
    },
    /// Show one submission with its score, annotations, feedback and history
    Show {
        #[arg(long)]
        submission: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// List submissions, newest first
    List {
        #[arg(long)]
        status: Option<SubmissionStatus>,
        #[arg(long)]
        contributor: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one contributor's progress
    Progress {
        #[arg(long)]
        contributor: String,
        #[arg(long)]
        json: bool,
    },
    /// Show team-wide analytics
    Team {
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let repo = PgRepository::new(pool.clone());
    info!(retention = %config.retention, "connected");

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&repo).await?;
            println!("Seed data inserted ({inserted} new submissions).");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&repo, &csv).await?;
            println!("Inserted {inserted} submissions from {}.", csv.display());
        }
        Commands::Submit {
            contributor_id,
            contributor_name,
            title,
            body_file,
            format,
        } => {
            let body = std::fs::read_to_string(&body_file)
                .with_context(|| format!("failed to read {}", body_file.display()))?;
            let submission = Submission::new(
                contributor_id,
                contributor_name,
                title,
                body,
                format,
                Utc::now(),
            );
            repo.create(&submission).await?;
            println!("Submitted {} ({}).", submission.title, submission.id);
        }
        Commands::Review {
            submission,
            analysis,
        } => {
            let raw = std::fs::read_to_string(&analysis)
                .with_context(|| format!("failed to read {}", analysis.display()))?;
            let outcome: AnalysisOutcome =
                serde_json::from_str(&raw).context("analysis file is not a valid result")?;

            let mut record = fetch(&repo, submission).await?;
            review::apply_review(&mut record, outcome, config.retention, Utc::now())?;
            repo.save(&record).await?;

            let overall = record.score.map(|score| score.overall()).unwrap_or_default();
            println!(
                "Reviewed {} (revision {}): overall {} with {} annotations.",
                record.title,
                record.revision,
                overall,
                record.annotations.len()
            );
            for annotation in &record.annotations {
                println!(
                    "- {} [{} / {}] {}",
                    annotation.id, annotation.severity, annotation.category, annotation.explanation
                );
            }
        }
        Commands::ApplyFixes {
            submission,
            annotations,
        } => {
            let mut record = fetch(&repo, submission).await?;
            let changed = review::apply_fixes(&mut record, &annotations, Utc::now());
            if changed > 0 {
                repo.save(&record).await?;
            }
            println!("Marked {changed} annotations as applied.");
        }
        Commands::SetStatus { submission, status } => {
            let mut record = fetch(&repo, submission).await?;
            review::transition_status(&mut record, status, Utc::now())?;
            repo.save(&record).await?;
            println!("{} is now {}.", record.title, record.status);
        }
        Commands::Show { submission, json } => {
            let record = fetch(&repo, submission).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print!("{}", report::render_submission(&record));
            }
        }
        Commands::List {
            status,
            contributor,
            limit,
        } => {
            let filter = SubmissionFilter {
                status,
                contributor_id: contributor,
                limit: Some(limit),
            };
            let submissions = list_submissions(&repo, &filter).await?;
            if submissions.is_empty() {
                println!("No submissions match.");
                return Ok(());
            }
            for submission in &submissions {
                let overall = submission
                    .score
                    .map(|score| score.overall().to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "- {} {} by {} [{}] score {} ({})",
                    submission.id,
                    submission.title,
                    submission.contributor_name,
                    submission.status,
                    overall,
                    submission.created_at.format("%Y-%m-%d")
                );
            }
        }
        Commands::Progress { contributor, json } => {
            let Some(progress) = load_contributor_progress(&repo, &contributor).await? else {
                println!("No submissions on record for {contributor}.");
                return Ok(());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
            } else {
                print!("{}", report::render_progress(&progress, Utc::now()));
            }
        }
        Commands::Team { json } => {
            let analytics = load_team_analytics(&repo).await?.analytics;
            if json {
                println!("{}", serde_json::to_string_pretty(&analytics)?);
                return Ok(());
            }

            println!(
                "{} contributors ({} active), {} submissions, {} pending review",
                analytics.total_contributors,
                analytics.active_contributors,
                analytics.total_submissions,
                analytics.pending_review
            );
            println!(
                "Average team score {:.1}, average review time {:.1} hours",
                analytics.average_team_score, analytics.average_review_time
            );
            println!("Top performers:");
            for entry in &analytics.top_performers {
                println!(
                    "- {} ({}) average {:.1}",
                    entry.contributor_name, entry.contributor_id, entry.average_score
                );
            }
            println!("Improvement leaders:");
            for entry in &analytics.improvement_leaders {
                println!(
                    "- {} ({}) {:+.2} per submission",
                    entry.contributor_name, entry.contributor_id, entry.improvement_rate
                );
            }
        }
        Commands::Report { out } => {
            let snapshot = load_team_analytics(&repo).await?;
            let report = report::build_report(
                Utc::now(),
                &snapshot.analytics,
                &snapshot.progress,
                &snapshot.submissions,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn fetch(repo: &PgRepository, id: Uuid) -> anyhow::Result<Submission> {
    match repo.get(id).await? {
        Some(submission) => Ok(submission),
        None => bail!("submission {id} not found"),
    }
}
