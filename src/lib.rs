//! Scoring and progress analytics for contributor writing reviews.
//!
//! The engine turns per-review sub-scores into a weighted composite, normalizes
//! review issues into annotations, and folds a contributor's history into a
//! progress snapshot and the whole cohort into team analytics. Storage sits
//! behind [`store::SubmissionRepository`]; [`db::PgRepository`] backs the CLI.

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod issues;
pub mod models;
pub mod progress;
pub mod report;
pub mod review;
pub mod scoring;
pub mod store;
pub mod trend;

pub use analytics::compute_cohort_analytics;
pub use error::{EngineError, EngineResult};
pub use issues::classify_issue;
pub use progress::compute_contributor_progress;
pub use scoring::compose_score;
pub use trend::estimate_trend;
