//! Submission storage seam.
//!
//! The engine itself never touches storage: callers load a stable copy of the
//! submissions they need through a [`SubmissionRepository`] and hand it to the
//! pure progress and analytics functions.

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::analytics::compute_cohort_analytics;
use crate::models::{ContributorProgress, Submission, SubmissionStatus, TeamAnalytics};
use crate::progress::compute_contributor_progress;

/// Contributor identity as known to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Stores a new submission; fails if the id is already taken.
    async fn create(&self, submission: &Submission) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Submission>>;

    /// Overwrites an existing submission with its current state.
    async fn save(&self, submission: &Submission) -> Result<()>;

    async fn list_by_contributor(&self, contributor_id: &str) -> Result<Vec<Submission>>;

    async fn list_by_status(&self, status: SubmissionStatus) -> Result<Vec<Submission>>;

    async fn list_all(&self) -> Result<Vec<Submission>>;

    /// Every contributor with at least one submission, in first-seen order.
    async fn contributors(&self) -> Result<Vec<Contributor>>;
}

/// Arena of submissions keyed by id, indexed by contributor.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    inner: RwLock<Arena>,
}

#[derive(Debug, Default)]
struct Arena {
    submissions: HashMap<Uuid, Submission>,
    order: Vec<Uuid>,
    by_contributor: HashMap<String, Vec<Uuid>>,
    contributors: Vec<Contributor>,
}

impl Arena {
    fn collect<'a>(&self, ids: impl IntoIterator<Item = &'a Uuid>) -> Vec<Submission> {
        ids.into_iter()
            .filter_map(|id| self.submissions.get(id))
            .cloned()
            .collect()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryRepository {
    async fn create(&self, submission: &Submission) -> Result<()> {
        let mut guard = self.inner.write().await;
        let arena = &mut *guard;
        if arena.submissions.contains_key(&submission.id) {
            bail!("submission {} already exists", submission.id);
        }

        let ids = arena
            .by_contributor
            .entry(submission.contributor_id.clone())
            .or_default();
        let first_for_contributor = ids.is_empty();
        ids.push(submission.id);
        if first_for_contributor {
            arena.contributors.push(Contributor {
                id: submission.contributor_id.clone(),
                name: submission.contributor_name.clone(),
            });
        }
        arena.order.push(submission.id);
        arena.submissions.insert(submission.id, submission.clone());
        debug!(submission = %submission.id, "stored submission in memory");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Submission>> {
        Ok(self.inner.read().await.submissions.get(&id).cloned())
    }

    async fn save(&self, submission: &Submission) -> Result<()> {
        let mut arena = self.inner.write().await;
        let Some(existing) = arena.submissions.get_mut(&submission.id) else {
            bail!("submission {} not found", submission.id);
        };
        if existing.contributor_id != submission.contributor_id {
            bail!("submission {} cannot change contributor", submission.id);
        }
        *existing = submission.clone();
        Ok(())
    }

    async fn list_by_contributor(&self, contributor_id: &str) -> Result<Vec<Submission>> {
        let arena = self.inner.read().await;
        Ok(arena
            .by_contributor
            .get(contributor_id)
            .map(|ids| arena.collect(ids))
            .unwrap_or_default())
    }

    async fn list_by_status(&self, status: SubmissionStatus) -> Result<Vec<Submission>> {
        let arena = self.inner.read().await;
        Ok(arena
            .collect(&arena.order)
            .into_iter()
            .filter(|s| s.status == status)
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Submission>> {
        let arena = self.inner.read().await;
        Ok(arena.collect(&arena.order))
    }

    async fn contributors(&self) -> Result<Vec<Contributor>> {
        Ok(self.inner.read().await.contributors.clone())
    }
}

/// Listing filter mirroring the submissions overview: optional status and
/// contributor, newest first, capped at `limit`.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub contributor_id: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_submissions(
    repo: &dyn SubmissionRepository,
    filter: &SubmissionFilter,
) -> Result<Vec<Submission>> {
    let mut submissions = match (&filter.contributor_id, filter.status) {
        (Some(contributor_id), status) => repo
            .list_by_contributor(contributor_id)
            .await?
            .into_iter()
            .filter(|s| status.map_or(true, |wanted| s.status == wanted))
            .collect(),
        (None, Some(status)) => repo.list_by_status(status).await?,
        (None, None) => repo.list_all().await?,
    };

    submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    if let Some(limit) = filter.limit {
        submissions.truncate(limit);
    }
    Ok(submissions)
}

/// Loads one contributor's history and folds it into a progress snapshot.
/// Returns `None` for a contributor with no submissions on record.
pub async fn load_contributor_progress(
    repo: &dyn SubmissionRepository,
    contributor_id: &str,
) -> Result<Option<ContributorProgress>> {
    let submissions = repo.list_by_contributor(contributor_id).await?;
    let Some(first) = submissions.first() else {
        return Ok(None);
    };
    let name = first.contributor_name.clone();
    Ok(Some(compute_contributor_progress(
        contributor_id,
        &name,
        &submissions,
    )))
}

/// Team analytics together with the per-contributor snapshots and submissions
/// they were computed from.
#[derive(Debug, Clone)]
pub struct TeamSnapshot {
    pub analytics: TeamAnalytics,
    pub progress: Vec<ContributorProgress>,
    pub submissions: Vec<Submission>,
}

/// Builds one snapshot per contributor from a single read of the store, then the
/// team analytics over that same read, so the parts always correspond.
pub async fn load_team_analytics(repo: &dyn SubmissionRepository) -> Result<TeamSnapshot> {
    let submissions = repo.list_all().await?;

    let mut grouped: Vec<(Contributor, Vec<Submission>)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    for submission in &submissions {
        let slot = *slots
            .entry(submission.contributor_id.clone())
            .or_insert_with(|| {
                grouped.push((
                    Contributor {
                        id: submission.contributor_id.clone(),
                        name: submission.contributor_name.clone(),
                    },
                    Vec::new(),
                ));
                grouped.len() - 1
            });
        grouped[slot].1.push(submission.clone());
    }

    let progress: Vec<ContributorProgress> = grouped
        .iter()
        .map(|(contributor, own)| {
            compute_contributor_progress(&contributor.id, &contributor.name, own)
        })
        .collect();
    let analytics = compute_cohort_analytics(&submissions, &progress);
    Ok(TeamSnapshot {
        analytics,
        progress,
        submissions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn submission(contributor: &str, day: i64) -> Submission {
        let base = Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap();
        Submission::new(
            contributor,
            format!("{contributor} name"),
            format!("post {day}"),
            "body",
            "markdown",
            base + Duration::days(day),
        )
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let repo = InMemoryRepository::new();
        let s = submission("w1", 0);
        repo.create(&s).await.unwrap();
        assert!(repo.create(&s).await.is_err());
    }

    #[tokio::test]
    async fn indexes_by_contributor_and_status() {
        let repo = InMemoryRepository::new();
        let mut approved = submission("w2", 1);
        approved.status = SubmissionStatus::Approved;
        for s in [submission("w1", 0), approved.clone(), submission("w1", 2)] {
            repo.create(&s).await.unwrap();
        }

        assert_eq!(repo.list_by_contributor("w1").await.unwrap().len(), 2);
        assert!(repo.list_by_contributor("nobody").await.unwrap().is_empty());
        let approved_list = repo.list_by_status(SubmissionStatus::Approved).await.unwrap();
        assert_eq!(approved_list, vec![approved]);

        let ids: Vec<String> = repo
            .contributors()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["w1", "w2"]);
    }

    #[tokio::test]
    async fn save_overwrites_and_returns_copies() {
        let repo = InMemoryRepository::new();
        let mut s = submission("w1", 0);
        repo.create(&s).await.unwrap();

        let mut copy = repo.get(s.id).await.unwrap().unwrap();
        copy.title = "changed locally".to_string();
        assert_eq!(repo.get(s.id).await.unwrap().unwrap().title, "post 0");

        s.status = SubmissionStatus::InReview;
        repo.save(&s).await.unwrap();
        assert_eq!(
            repo.get(s.id).await.unwrap().unwrap().status,
            SubmissionStatus::InReview
        );

        assert!(repo.save(&submission("w1", 9)).await.is_err());
    }

    #[tokio::test]
    async fn listing_filters_sorts_and_limits() {
        let repo = InMemoryRepository::new();
        for s in [submission("w1", 0), submission("w2", 3), submission("w1", 5)] {
            repo.create(&s).await.unwrap();
        }

        let all = list_submissions(&repo, &SubmissionFilter::default()).await.unwrap();
        let titles: Vec<&str> = all.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["post 5", "post 3", "post 0"]);

        let filter = SubmissionFilter {
            contributor_id: Some("w1".to_string()),
            limit: Some(1),
            ..SubmissionFilter::default()
        };
        let newest = list_submissions(&repo, &filter).await.unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].title, "post 5");

        let filter = SubmissionFilter {
            status: Some(SubmissionStatus::Approved),
            ..SubmissionFilter::default()
        };
        assert!(list_submissions(&repo, &filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn team_analytics_uses_one_snapshot_per_contributor() {
        let repo = InMemoryRepository::new();
        for s in [submission("w1", 0), submission("w2", 1), submission("w1", 2)] {
            repo.create(&s).await.unwrap();
        }

        let snapshot = load_team_analytics(&repo).await.unwrap();
        let progress = &snapshot.progress;
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0].contributor_id, "w1");
        assert_eq!(progress[0].total_submissions, 2);
        assert_eq!(snapshot.submissions.len(), 3);
        assert_eq!(snapshot.analytics.total_contributors, 2);
        assert_eq!(snapshot.analytics.total_submissions, 3);
        assert_eq!(snapshot.analytics.pending_review, 3);

        assert!(load_contributor_progress(&repo, "nobody").await.unwrap().is_none());
        let w2 = load_contributor_progress(&repo, "w2").await.unwrap().unwrap();
        assert_eq!(w2.contributor_name, "w2 name");
    }
}
