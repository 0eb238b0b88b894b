use std::collections::HashMap;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::issues::RawIssue;
use crate::models::{
    Annotation, Feedback, ReviewCycle, Score, SubScores, Submission, SubmissionStatus,
};
use crate::review::{apply_review, AnalysisOutcome, RawFeedback, RetentionPolicy};
use crate::scoring::compose_score;
use crate::store::{Contributor, SubmissionRepository};

const SUBMISSION_COLUMNS: &str = "id, contributor_id, contributor_name, title, body, format, \
     status, revision, optimization_score, credibility_score, quality_score, compliance_score, \
     created_at, updated_at, reviewed_at, published_at";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed submission store.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a submission with all of its review data. Returns `false` when a
    /// row with the same `source_key` already exists.
    pub async fn insert(
        &self,
        submission: &Submission,
        source_key: Option<&str>,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;
        let scores = score_columns(submission.score.as_ref());

        let result = sqlx::query(
            r#"
            INSERT INTO writing_progress.submissions
            (id, contributor_id, contributor_name, title, body, format, status, revision,
             optimization_score, credibility_score, quality_score, compliance_score, overall_score,
             created_at, updated_at, reviewed_at, published_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(submission.id)
        .bind(&submission.contributor_id)
        .bind(&submission.contributor_name)
        .bind(&submission.title)
        .bind(&submission.body)
        .bind(&submission.format)
        .bind(submission.status.as_str())
        .bind(submission.revision as i32)
        .bind(scores[0])
        .bind(scores[1])
        .bind(scores[2])
        .bind(scores[3])
        .bind(scores[4])
        .bind(submission.created_at)
        .bind(submission.updated_at)
        .bind(submission.reviewed_at)
        .bind(submission.published_at)
        .bind(source_key)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        write_children(&mut tx, submission).await?;
        tx.commit().await?;
        debug!(submission = %submission.id, "inserted submission");
        Ok(true)
    }

    async fn fetch_where(
        &self,
        clause: &str,
        bind: Option<&str>,
    ) -> anyhow::Result<Vec<Submission>> {
        let query = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM writing_progress.submissions {clause} \
             ORDER BY created_at, id"
        );
        let mut rows = sqlx::query(&query);
        if let Some(value) = bind {
            rows = rows.bind(value);
        }
        let records = rows.fetch_all(&self.pool).await?;

        let mut submissions = records
            .iter()
            .map(submission_from_row)
            .collect::<anyhow::Result<Vec<Submission>>>()?;
        self.hydrate(&mut submissions).await?;
        Ok(submissions)
    }

    /// Loads annotations, feedback and archived cycles for already-fetched rows.
    async fn hydrate(&self, submissions: &mut [Submission]) -> anyhow::Result<()> {
        if submissions.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = submissions.iter().map(|s| s.id).collect();
        let slots: HashMap<Uuid, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let annotation_rows = sqlx::query(
            r#"
            SELECT submission_id, id, severity, category, issue_key, explanation,
                   fix_suggestion, learning_note, excerpt, applied
            FROM writing_progress.annotations
            WHERE submission_id = ANY($1)
            ORDER BY submission_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in annotation_rows {
            let submission_id: Uuid = row.get("submission_id");
            let severity: String = row.get("severity");
            let category: String = row.get("category");
            let annotation = Annotation {
                id: row.get("id"),
                severity: severity.parse()?,
                category: category.parse()?,
                issue_key: row.get("issue_key"),
                explanation: row.get("explanation"),
                fix_suggestion: row.get("fix_suggestion"),
                learning_note: row.get("learning_note"),
                excerpt: row.get("excerpt"),
                applied: row.get("applied"),
            };
            if let Some(&slot) = slots.get(&submission_id) {
                submissions[slot].annotations.push(annotation);
            }
        }

        let feedback_rows = sqlx::query(
            r#"
            SELECT submission_id, reviewer_id, overall_comment, strengths, improvement_areas,
                   learning_resources, created_at
            FROM writing_progress.feedback
            WHERE submission_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in feedback_rows {
            let submission_id: Uuid = row.get("submission_id");
            if let Some(&slot) = slots.get(&submission_id) {
                submissions[slot].feedback = Some(Feedback {
                    reviewer_id: row.get("reviewer_id"),
                    overall_comment: row.get("overall_comment"),
                    strengths: row.get("strengths"),
                    improvement_areas: row.get("improvement_areas"),
                    learning_resources: row.get("learning_resources"),
                    created_at: row.get("created_at"),
                });
            }
        }

        let cycle_rows = sqlx::query(
            r#"
            SELECT submission_id, cycle
            FROM writing_progress.review_cycles
            WHERE submission_id = ANY($1)
            ORDER BY submission_id, revision
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in cycle_rows {
            let submission_id: Uuid = row.get("submission_id");
            let cycle: String = row.get("cycle");
            let cycle: ReviewCycle = serde_json::from_str(&cycle)
                .with_context(|| format!("corrupt review cycle for submission {submission_id}"))?;
            if let Some(&slot) = slots.get(&submission_id) {
                submissions[slot].review_history.push(cycle);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SubmissionRepository for PgRepository {
    async fn create(&self, submission: &Submission) -> anyhow::Result<()> {
        if !self.insert(submission, None).await? {
            bail!("submission {} already exists", submission.id);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Submission>> {
        let record = sqlx::query(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM writing_progress.submissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = record else {
            return Ok(None);
        };
        let mut submissions = vec![submission_from_row(&row)?];
        self.hydrate(&mut submissions).await?;
        Ok(submissions.pop())
    }

    async fn save(&self, submission: &Submission) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        let scores = score_columns(submission.score.as_ref());

        let result = sqlx::query(
            r#"
            UPDATE writing_progress.submissions
            SET title = $2, body = $3, format = $4, status = $5, revision = $6,
                optimization_score = $7, credibility_score = $8, quality_score = $9,
                compliance_score = $10, overall_score = $11,
                updated_at = $12, reviewed_at = $13, published_at = $14
            WHERE id = $1 AND contributor_id = $15
            "#,
        )
        .bind(submission.id)
        .bind(&submission.title)
        .bind(&submission.body)
        .bind(&submission.format)
        .bind(submission.status.as_str())
        .bind(submission.revision as i32)
        .bind(scores[0])
        .bind(scores[1])
        .bind(scores[2])
        .bind(scores[3])
        .bind(scores[4])
        .bind(submission.updated_at)
        .bind(submission.reviewed_at)
        .bind(submission.published_at)
        .bind(&submission.contributor_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            bail!("submission {} not found", submission.id);
        }

        sqlx::query("DELETE FROM writing_progress.annotations WHERE submission_id = $1")
            .bind(submission.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM writing_progress.feedback WHERE submission_id = $1")
            .bind(submission.id)
            .execute(&mut *tx)
            .await?;

        write_children(&mut tx, submission).await?;
        tx.commit().await?;
        debug!(submission = %submission.id, "saved submission");
        Ok(())
    }

    async fn list_by_contributor(&self, contributor_id: &str) -> anyhow::Result<Vec<Submission>> {
        self.fetch_where("WHERE contributor_id = $1", Some(contributor_id)).await
    }

    async fn list_by_status(&self, status: SubmissionStatus) -> anyhow::Result<Vec<Submission>> {
        self.fetch_where("WHERE status = $1", Some(status.as_str())).await
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Submission>> {
        self.fetch_where("", None).await
    }

    async fn contributors(&self) -> anyhow::Result<Vec<Contributor>> {
        let rows = sqlx::query(
            r#"
            SELECT contributor_id, contributor_name
            FROM (
                SELECT DISTINCT ON (contributor_id) contributor_id, contributor_name, created_at
                FROM writing_progress.submissions
                ORDER BY contributor_id, created_at
            ) firsts
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Contributor {
                id: row.get("contributor_id"),
                name: row.get("contributor_name"),
            })
            .collect())
    }
}

/// Annotations, feedback and any not-yet-archived review cycles.
async fn write_children(
    tx: &mut Transaction<'_, Postgres>,
    submission: &Submission,
) -> anyhow::Result<()> {
    for (position, annotation) in submission.annotations.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO writing_progress.annotations
            (id, submission_id, position, severity, category, issue_key, explanation,
             fix_suggestion, learning_note, excerpt, applied)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(annotation.id)
        .bind(submission.id)
        .bind(position as i32)
        .bind(annotation.severity.as_str())
        .bind(annotation.category.as_str())
        .bind(&annotation.issue_key)
        .bind(&annotation.explanation)
        .bind(&annotation.fix_suggestion)
        .bind(&annotation.learning_note)
        .bind(&annotation.excerpt)
        .bind(annotation.applied)
        .execute(&mut **tx)
        .await?;
    }

    if let Some(feedback) = &submission.feedback {
        sqlx::query(
            r#"
            INSERT INTO writing_progress.feedback
            (submission_id, reviewer_id, overall_comment, strengths, improvement_areas,
             learning_resources, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(submission.id)
        .bind(&feedback.reviewer_id)
        .bind(&feedback.overall_comment)
        .bind(&feedback.strengths)
        .bind(&feedback.improvement_areas)
        .bind(&feedback.learning_resources)
        .bind(feedback.created_at)
        .execute(&mut **tx)
        .await?;
    }

    for cycle in &submission.review_history {
        sqlx::query(
            r#"
            INSERT INTO writing_progress.review_cycles (submission_id, revision, cycle)
            VALUES ($1, $2, $3)
            ON CONFLICT (submission_id, revision) DO NOTHING
            "#,
        )
        .bind(submission.id)
        .bind(cycle.revision as i32)
        .bind(serde_json::to_string(cycle)?)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

fn score_columns(score: Option<&Score>) -> [Option<i16>; 5] {
    match score {
        Some(score) => [
            Some(i16::from(score.optimization())),
            Some(i16::from(score.credibility())),
            Some(i16::from(score.quality())),
            Some(i16::from(score.compliance())),
            Some(i16::from(score.overall())),
        ],
        None => [None; 5],
    }
}

fn submission_from_row(row: &PgRow) -> anyhow::Result<Submission> {
    let id: Uuid = row.get("id");
    let status: String = row.get("status");
    let revision: i32 = row.get("revision");

    // overall_score is stored for ad-hoc queries only and recomputed here
    let parts: [Option<i16>; 4] = [
        row.get("optimization_score"),
        row.get("credibility_score"),
        row.get("quality_score"),
        row.get("compliance_score"),
    ];
    let score = match parts {
        [Some(optimization), Some(credibility), Some(quality), Some(compliance)] => Some(
            compose_score(SubScores {
                optimization: i64::from(optimization),
                credibility: i64::from(credibility),
                quality: i64::from(quality),
                compliance: i64::from(compliance),
            })
            .with_context(|| format!("stored score for submission {id} is invalid"))?,
        ),
        [None, None, None, None] => None,
        _ => bail!("submission {id} has a partially stored score"),
    };

    Ok(Submission {
        id,
        contributor_id: row.get("contributor_id"),
        contributor_name: row.get("contributor_name"),
        title: row.get("title"),
        body: row.get("body"),
        format: row.get("format"),
        status: status.parse()?,
        score,
        annotations: Vec::new(),
        feedback: None,
        revision: u32::try_from(revision).context("negative revision counter")?,
        review_history: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        reviewed_at: row.get("reviewed_at"),
        published_at: row.get("published_at"),
    })
}

pub async fn seed(repo: &PgRepository) -> anyhow::Result<usize> {
    let contributors = [
        ("w-avery", "Avery Lee"),
        ("w-jules", "Jules Moreno"),
        ("w-kiara", "Kiara Patel"),
    ];

    // (source key, contributor index, title, day offset, sub-scores, issues)
    let drafts: Vec<(&str, usize, &str, i64, [i64; 4], Vec<(&str, &str, &str)>)> = vec![
        (
            "seed-001",
            0,
            "Choosing a first-year seminar",
            0,
            [58, 62, 66, 80],
            vec![
                ("critical", "content", "Claims about acceptance rates lack a source"),
                ("warning", "structure", "Intro runs four paragraphs before the main point"),
            ],
        ),
        (
            "seed-002",
            0,
            "How to ask for a recommendation letter",
            9,
            [70, 68, 74, 85],
            vec![("warning", "meta", "Title does not include the target keyword")],
        ),
        (
            "seed-003",
            0,
            "Budgeting for textbooks",
            18,
            [82, 79, 84, 90],
            vec![("suggestion", "structure", "A checklist would make the steps easier to scan")],
        ),
        (
            "seed-004",
            1,
            "Financial aid appeal basics",
            2,
            [75, 80, 72, 70],
            vec![
                (
                    "critical",
                    "compliance",
                    "Describes eligibility rules without the official disclaimer",
                ),
                ("warning", "content", "Deadline dates are not tied to an academic year"),
            ],
        ),
        (
            "seed-005",
            1,
            "Balancing work and coursework",
            14,
            [71, 74, 70, 66],
            vec![("critical", "compliance", "Mentions employer benefits without qualification")],
        ),
        (
            "seed-006",
            2,
            "Writing a personal statement",
            5,
            [88, 90, 92, 95],
            vec![("suggestion", "meta", "Meta description is longer than recommended")],
        ),
    ];

    let base = Utc
        .with_ymd_and_hms(2026, 1, 12, 9, 0, 0)
        .single()
        .context("invalid seed date")?;
    let mut inserted = 0usize;

    for (source_key, who, title, day, scores, issues) in drafts {
        let (contributor_id, contributor_name) = contributors[who];
        let created_at = base + Duration::days(day);
        let mut submission = Submission::new(
            contributor_id,
            contributor_name,
            title,
            format!("# {title}\n\nDraft body for {title}."),
            "markdown",
            created_at,
        );

        let outcome = AnalysisOutcome {
            scores: SubScores {
                optimization: scores[0],
                credibility: scores[1],
                quality: scores[2],
                compliance: scores[3],
            },
            issues: issues
                .into_iter()
                .map(|(severity, category, explanation)| RawIssue {
                    severity: severity.to_string(),
                    category: Some(category.to_string()),
                    explanation: explanation.to_string(),
                    fix_suggestion: "See the style guide section on this topic.".to_string(),
                    learning_note: None,
                    excerpt: None,
                })
                .collect(),
            feedback: RawFeedback {
                overall_comment: format!(
                    "Thanks {contributor_name}, this is moving in the right direction."
                ),
                strengths: vec!["Clear voice".to_string()],
                improvement_areas: vec!["Support claims with sources".to_string()],
                learning_resources: Vec::new(),
            },
            reviewer_id: Some("editor-seed".to_string()),
        };
        apply_review(
            &mut submission,
            outcome,
            RetentionPolicy::Replace,
            created_at + Duration::hours(20),
        )?;

        if repo.insert(&submission, Some(source_key)).await? {
            inserted += 1;
        }
    }

    info!(inserted, "seed data written");
    Ok(inserted)
}

pub async fn import_csv(repo: &PgRepository, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        contributor_id: String,
        contributor_name: String,
        title: String,
        body: String,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        status: Option<String>,
        created_at: DateTime<Utc>,
        #[serde(default)]
        reviewed_at: Option<DateTime<Utc>>,
        #[serde(default)]
        optimization: Option<i64>,
        #[serde(default)]
        credibility: Option<i64>,
        #[serde(default)]
        quality: Option<i64>,
        #[serde(default)]
        compliance: Option<i64>,
        #[serde(default)]
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("malformed row at line {line}"))?;

        let mut submission = Submission::new(
            row.contributor_id,
            row.contributor_name,
            row.title,
            row.body,
            row.format.unwrap_or_else(|| "markdown".to_string()),
            row.created_at,
        );
        if let Some(status) = row.status.filter(|s| !s.trim().is_empty()) {
            submission.status = status
                .trim()
                .parse()
                .with_context(|| format!("line {line}"))?;
        }

        submission.score = match (row.optimization, row.credibility, row.quality, row.compliance) {
            (Some(optimization), Some(credibility), Some(quality), Some(compliance)) => Some(
                compose_score(SubScores {
                    optimization,
                    credibility,
                    quality,
                    compliance,
                })
                .with_context(|| format!("line {line}"))?,
            ),
            (None, None, None, None) => None,
            _ => bail!("line {line}: either all four sub-scores or none must be given"),
        };
        submission.reviewed_at = row.reviewed_at;
        submission.updated_at = row.reviewed_at.unwrap_or(row.created_at);

        let source_key = row
            .source_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if repo.insert(&submission, Some(&source_key)).await? {
            inserted += 1;
        } else {
            debug!(source_key, "skipping already imported row");
        }
    }

    info!(inserted, path = %csv_path.display(), "csv import finished");
    Ok(inserted)
}
