use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    PendingReview,
    InReview,
    NeedsRevision,
    Approved,
    Published,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::PendingReview => "pending_review",
            SubmissionStatus::InReview => "in_review",
            SubmissionStatus::NeedsRevision => "needs_revision",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Published => "published",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending_review" => Ok(SubmissionStatus::PendingReview),
            "in_review" => Ok(SubmissionStatus::InReview),
            "needs_revision" => Ok(SubmissionStatus::NeedsRevision),
            "approved" => Ok(SubmissionStatus::Approved),
            "published" => Ok(SubmissionStatus::Published),
            other => Err(EngineError::InvalidStatus(other.to_string())),
        }
    }
}

/// Raw per-dimension scores as they arrive from the content-analysis service.
///
/// Values are unchecked here; `scoring::compose_score` validates the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub optimization: i64,
    pub credibility: i64,
    pub quality: i64,
    pub compliance: i64,
}

/// Validated score with its derived composite.
///
/// Fields are private so `overall` can only come from the weighted mean.
/// Deserializing goes back through the composer and ignores any stored `overall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubScores")]
pub struct Score {
    optimization: u8,
    credibility: u8,
    quality: u8,
    compliance: u8,
    overall: u8,
}

impl Score {
    pub(crate) fn from_parts(
        optimization: u8,
        credibility: u8,
        quality: u8,
        compliance: u8,
        overall: u8,
    ) -> Self {
        Self {
            optimization,
            credibility,
            quality,
            compliance,
            overall,
        }
    }

    pub fn optimization(&self) -> u8 {
        self.optimization
    }

    pub fn credibility(&self) -> u8 {
        self.credibility
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn compliance(&self) -> u8 {
        self.compliance
    }

    pub fn overall(&self) -> u8 {
        self.overall
    }

    pub fn skill(&self, area: SkillArea) -> u8 {
        match area {
            SkillArea::Optimization => self.optimization,
            SkillArea::Credibility => self.credibility,
            SkillArea::Quality => self.quality,
            SkillArea::Compliance => self.compliance,
        }
    }

    pub fn sub_scores(&self) -> SubScores {
        SubScores {
            optimization: i64::from(self.optimization),
            credibility: i64::from(self.credibility),
            quality: i64::from(self.quality),
            compliance: i64::from(self.compliance),
        }
    }
}

impl TryFrom<SubScores> for Score {
    type Error = EngineError;

    fn try_from(raw: SubScores) -> Result<Self, Self::Error> {
        crate::scoring::compose_score(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillArea {
    Optimization,
    Credibility,
    Quality,
    Compliance,
}

impl SkillArea {
    pub const ALL: [SkillArea; 4] = [
        SkillArea::Optimization,
        SkillArea::Credibility,
        SkillArea::Quality,
        SkillArea::Compliance,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SkillArea::Optimization => "SEO Optimization",
            SkillArea::Credibility => "E-E-A-T",
            SkillArea::Quality => "Content Quality",
            SkillArea::Compliance => "Compliance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Suggestion,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "critical" => Ok(Severity::Critical),
            "warning" => Ok(Severity::Warning),
            "suggestion" => Ok(Severity::Suggestion),
            other => Err(EngineError::InvalidSeverity(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Technical,
    Content,
    Meta,
    Structure,
    Compliance,
    Performance,
    Uncategorized,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Technical => "technical",
            IssueCategory::Content => "content",
            IssueCategory::Meta => "meta",
            IssueCategory::Structure => "structure",
            IssueCategory::Compliance => "compliance",
            IssueCategory::Performance => "performance",
            IssueCategory::Uncategorized => "uncategorized",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueCategory {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "technical" => Ok(IssueCategory::Technical),
            "content" => Ok(IssueCategory::Content),
            "meta" => Ok(IssueCategory::Meta),
            "structure" => Ok(IssueCategory::Structure),
            "compliance" => Ok(IssueCategory::Compliance),
            "performance" => Ok(IssueCategory::Performance),
            "uncategorized" => Ok(IssueCategory::Uncategorized),
            other => Err(EngineError::InvalidCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub severity: Severity,
    pub category: IssueCategory,
    /// Frequency-table key: the category name, or for uncategorized issues the
    /// leading phrase of the explanation.
    pub issue_key: String,
    pub explanation: String,
    pub fix_suggestion: String,
    pub learning_note: Option<String>,
    pub excerpt: Option<String>,
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub reviewer_id: String,
    pub overall_comment: String,
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub learning_resources: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A prior review kept under the archive retention policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCycle {
    pub revision: u32,
    pub score: Option<Score>,
    pub annotations: Vec<Annotation>,
    pub feedback: Option<Feedback>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub contributor_id: String,
    pub contributor_name: String,
    pub title: String,
    pub body: String,
    pub format: String,
    pub status: SubmissionStatus,
    pub score: Option<Score>,
    pub annotations: Vec<Annotation>,
    pub feedback: Option<Feedback>,
    pub revision: u32,
    pub review_history: Vec<ReviewCycle>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn new(
        contributor_id: impl Into<String>,
        contributor_name: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        format: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contributor_id: contributor_id.into(),
            contributor_name: contributor_name.into(),
            title: title.into(),
            body: body.into(),
            format: format.into(),
            status: SubmissionStatus::PendingReview,
            score: None,
            annotations: Vec::new(),
            feedback: None,
            revision: 0,
            review_history: Vec::new(),
            created_at,
            updated_at: created_at,
            reviewed_at: None,
            published_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAreaStat {
    pub skill: SkillArea,
    pub current: u8,
    pub initial: u8,
    pub improvement: i32,
    pub articles_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCount {
    pub issue: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorProgress {
    pub contributor_id: String,
    pub contributor_name: String,
    pub total_submissions: usize,
    pub approved_submissions: usize,
    pub average_score: f64,
    pub score_trend: Vec<u8>,
    pub skill_areas: Vec<SkillAreaStat>,
    pub common_issues: Vec<IssueCount>,
    pub improvement_rate: f64,
    pub last_submission: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformerEntry {
    pub contributor_id: String,
    pub contributor_name: String,
    pub average_score: f64,
    pub total_submissions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementEntry {
    pub contributor_id: String,
    pub contributor_name: String,
    pub improvement_rate: f64,
    pub total_submissions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAnalytics {
    pub total_contributors: usize,
    pub active_contributors: usize,
    pub total_submissions: usize,
    pub pending_review: usize,
    pub average_team_score: f64,
    pub top_performers: Vec<PerformerEntry>,
    pub improvement_leaders: Vec<ImprovementEntry>,
    pub common_team_issues: Vec<IssueCount>,
    pub average_review_time: f64,
}
