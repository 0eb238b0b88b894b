use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::issues::{classify_issue, RawIssue, MAX_ISSUES};
use crate::models::{Annotation, Feedback, ReviewCycle, SubScores, Submission, SubmissionStatus};
use crate::scoring::compose_score;

const SYSTEM_REVIEWER: &str = "system";

/// What happens to the previous score, annotations and feedback on re-review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    #[default]
    Replace,
    Archive,
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionPolicy::Replace => f.write_str("replace"),
            RetentionPolicy::Archive => f.write_str("archive"),
        }
    }
}

impl FromStr for RetentionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(RetentionPolicy::Replace),
            "archive" => Ok(RetentionPolicy::Archive),
            other => Err(format!("unknown retention policy {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFeedback {
    pub overall_comment: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvement_areas: Vec<String>,
    #[serde(default)]
    pub learning_resources: Vec<String>,
}

/// Record handed over by the content-analysis service for one review cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub scores: SubScores,
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default)]
    pub feedback: RawFeedback,
    #[serde(default)]
    pub reviewer_id: Option<String>,
}

/// Applies one review cycle to `submission`.
///
/// Everything is validated before the submission is touched, so an invalid score
/// or issue leaves it exactly as it was.
pub fn apply_review(
    submission: &mut Submission,
    outcome: AnalysisOutcome,
    retention: RetentionPolicy,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    if submission.status == SubmissionStatus::Published {
        return Err(EngineError::AlreadyPublished);
    }

    let score = compose_score(outcome.scores)?;
    if outcome.issues.len() > MAX_ISSUES {
        warn!(
            submission = %submission.id,
            received = outcome.issues.len(),
            "dropping issues beyond the first {MAX_ISSUES}"
        );
    }
    let annotations = outcome
        .issues
        .iter()
        .take(MAX_ISSUES)
        .map(classify_issue)
        .collect::<EngineResult<Vec<Annotation>>>()?;

    let feedback = Feedback {
        reviewer_id: outcome
            .reviewer_id
            .unwrap_or_else(|| SYSTEM_REVIEWER.to_string()),
        overall_comment: outcome.feedback.overall_comment,
        strengths: outcome.feedback.strengths,
        improvement_areas: outcome.feedback.improvement_areas,
        learning_resources: outcome.feedback.learning_resources,
        created_at: now,
    };

    let previously_reviewed = submission.reviewed_at.is_some() || submission.score.is_some();
    if previously_reviewed {
        if retention == RetentionPolicy::Archive {
            submission.review_history.push(ReviewCycle {
                revision: submission.revision,
                score: submission.score.take(),
                annotations: std::mem::take(&mut submission.annotations),
                feedback: submission.feedback.take(),
                reviewed_at: submission.reviewed_at,
            });
        }
        submission.revision += 1;
    }

    submission.score = Some(score);
    submission.annotations = annotations;
    submission.feedback = Some(feedback);
    submission.status = SubmissionStatus::InReview;
    submission.reviewed_at = Some(now);
    submission.updated_at = now;

    info!(
        submission = %submission.id,
        contributor = %submission.contributor_id,
        overall = score.overall(),
        issues = submission.annotations.len(),
        revision = submission.revision,
        %retention,
        "review applied"
    );
    Ok(())
}

/// Marks the given annotations as applied and returns how many changed.
pub fn apply_fixes(
    submission: &mut Submission,
    annotation_ids: &[Uuid],
    now: DateTime<Utc>,
) -> usize {
    let mut changed = 0;
    for annotation in submission
        .annotations
        .iter_mut()
        .filter(|a| !a.applied && annotation_ids.contains(&a.id))
    {
        annotation.applied = true;
        changed += 1;
    }

    if changed > 0 {
        submission.updated_at = now;
        info!(submission = %submission.id, changed, "fixes marked as applied");
    }
    changed
}

/// Whether the review workflow allows moving from `from` to `to`.
pub fn can_transition(from: SubmissionStatus, to: SubmissionStatus) -> bool {
    use SubmissionStatus::*;
    matches!(
        (from, to),
        (PendingReview, InReview)
            | (InReview, NeedsRevision)
            | (InReview, Approved)
            | (NeedsRevision, InReview)
            | (Approved, Published)
    )
}

pub fn transition_status(
    submission: &mut Submission,
    to: SubmissionStatus,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let from = submission.status;
    if !can_transition(from, to) {
        return Err(EngineError::InvalidTransition { from, to });
    }

    submission.status = to;
    submission.updated_at = now;
    if to == SubmissionStatus::Published {
        submission.published_at = Some(now);
    }
    info!(submission = %submission.id, %from, %to, "status changed");
    Ok(())
}
