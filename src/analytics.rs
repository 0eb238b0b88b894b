use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::issues::tally_issues;
use crate::models::{
    ContributorProgress, ImprovementEntry, PerformerEntry, Submission, SubmissionStatus,
    TeamAnalytics,
};
use crate::scoring::round1;

/// Contributors with a submission inside this many trailing days count as active.
pub const ACTIVE_WINDOW_DAYS: i64 = 30;
pub const LEADERBOARD_SIZE: usize = 5;

/// Team-wide analytics as of the current wall-clock instant.
///
/// `progress` must hold exactly one snapshot per contributor appearing in
/// `submissions`, computed from those same submissions. That correspondence is not
/// checked: a mismatched set silently skews the contributor counts and leaderboards.
pub fn compute_cohort_analytics(
    submissions: &[Submission],
    progress: &[ContributorProgress],
) -> TeamAnalytics {
    compute_cohort_analytics_at(submissions, progress, Utc::now())
}

/// Same as [`compute_cohort_analytics`] with an explicit computation instant.
pub fn compute_cohort_analytics_at(
    submissions: &[Submission],
    progress: &[ContributorProgress],
    now: DateTime<Utc>,
) -> TeamAnalytics {
    let cutoff = now - Duration::days(ACTIVE_WINDOW_DAYS);
    let active_contributors = progress
        .iter()
        .filter(|p| p.last_submission.is_some_and(|last| last > cutoff))
        .count();

    let pending_review = submissions
        .iter()
        .filter(|s| s.status == SubmissionStatus::PendingReview)
        .count();

    let overall: Vec<f64> = submissions
        .iter()
        .filter_map(|s| s.score.map(|score| f64::from(score.overall())))
        .collect();

    let annotations = submissions.iter().flat_map(|s| s.annotations.iter());

    let analytics = TeamAnalytics {
        total_contributors: progress.len(),
        active_contributors,
        total_submissions: submissions.len(),
        pending_review,
        average_team_score: round1(mean(&overall)),
        top_performers: top_performers(progress),
        improvement_leaders: improvement_leaders(progress),
        common_team_issues: tally_issues(annotations),
        average_review_time: round1(average_review_hours(submissions)),
    };

    debug!(
        contributors = analytics.total_contributors,
        active = analytics.active_contributors,
        submissions = analytics.total_submissions,
        "computed team analytics"
    );
    analytics
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn top_performers(progress: &[ContributorProgress]) -> Vec<PerformerEntry> {
    let mut ranked: Vec<&ContributorProgress> = progress.iter().collect();
    ranked.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));
    ranked
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .map(|p| PerformerEntry {
            contributor_id: p.contributor_id.clone(),
            contributor_name: p.contributor_name.clone(),
            average_score: p.average_score,
            total_submissions: p.total_submissions,
        })
        .collect()
}

fn improvement_leaders(progress: &[ContributorProgress]) -> Vec<ImprovementEntry> {
    let mut ranked: Vec<&ContributorProgress> = progress
        .iter()
        .filter(|p| p.improvement_rate > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.improvement_rate.total_cmp(&a.improvement_rate));
    ranked
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .map(|p| ImprovementEntry {
            contributor_id: p.contributor_id.clone(),
            contributor_name: p.contributor_name.clone(),
            improvement_rate: p.improvement_rate,
            total_submissions: p.total_submissions,
        })
        .collect()
}

/// Mean hours from creation to review over reviewed submissions.
fn average_review_hours(submissions: &[Submission]) -> f64 {
    let hours: Vec<f64> = submissions
        .iter()
        .filter_map(|s| s.reviewed_at.map(|reviewed| reviewed - s.created_at))
        .map(|turnaround| turnaround.num_milliseconds() as f64 / 3_600_000.0)
        .collect();
    mean(&hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{classify_issue, RawIssue};
    use crate::models::SubScores;
    use crate::progress::compute_contributor_progress;
    use crate::scoring::compose_score;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 30, 12, 0, 0).unwrap()
    }

    fn submission(contributor: &str, days_ago: i64, overall: Option<i64>) -> Submission {
        let created = now() - Duration::days(days_ago);
        let name = contributor.to_uppercase();
        let mut s = Submission::new(contributor, name, "t", "b", "markdown", created);
        s.score = overall.map(|value| {
            compose_score(SubScores {
                optimization: value,
                credibility: value,
                quality: value,
                compliance: value,
            })
            .unwrap()
        });
        s
    }

    fn progress(contributor: &str, average: f64, rate: f64) -> ContributorProgress {
        ContributorProgress {
            contributor_id: contributor.to_string(),
            contributor_name: contributor.to_uppercase(),
            total_submissions: 1,
            approved_submissions: 0,
            average_score: average,
            score_trend: Vec::new(),
            skill_areas: Vec::new(),
            common_issues: Vec::new(),
            improvement_rate: rate,
            last_submission: None,
        }
    }

    fn annotation(category: &str) -> crate::models::Annotation {
        classify_issue(&RawIssue {
            severity: "critical".to_string(),
            category: Some(category.to_string()),
            explanation: "Unsupported claim".to_string(),
            fix_suggestion: "Cite a source".to_string(),
            learning_note: None,
            excerpt: None,
        })
        .unwrap()
    }

    #[test]
    fn empty_team_is_all_zero() {
        let analytics = compute_cohort_analytics_at(&[], &[], now());
        assert_eq!(analytics.total_contributors, 0);
        assert_eq!(analytics.active_contributors, 0);
        assert_eq!(analytics.average_team_score, 0.0);
        assert_eq!(analytics.average_review_time, 0.0);
        assert!(analytics.top_performers.is_empty());
        assert!(analytics.improvement_leaders.is_empty());
        assert!(analytics.common_team_issues.is_empty());
    }

    #[test]
    fn activity_uses_trailing_window() {
        let submissions = vec![
            submission("w1", 2, Some(70)),
            submission("w2", 29, Some(60)),
            submission("w3", 45, Some(80)),
        ];
        let snapshots: Vec<ContributorProgress> = ["w1", "w2", "w3"]
            .iter()
            .map(|id| {
                let own: Vec<Submission> = submissions
                    .iter()
                    .filter(|s| s.contributor_id == *id)
                    .cloned()
                    .collect();
                compute_contributor_progress(id, &id.to_uppercase(), &own)
            })
            .collect();

        let analytics = compute_cohort_analytics_at(&submissions, &snapshots, now());
        assert_eq!(analytics.total_contributors, 3);
        assert_eq!(analytics.active_contributors, 2);

        let later_instant = now() + Duration::days(5);
        let later = compute_cohort_analytics_at(&submissions, &snapshots, later_instant);
        assert_eq!(later.active_contributors, 1);
    }

    #[test]
    fn activity_window_excludes_its_boundary() {
        let on_boundary = submission("wx", 30, Some(70));
        let mut just_inside = submission("wy", 0, Some(70));
        just_inside.created_at = now() - (Duration::days(30) - Duration::seconds(1));
        let submissions = vec![on_boundary, just_inside];

        let snapshots: Vec<ContributorProgress> = submissions
            .iter()
            .map(|s| {
                compute_contributor_progress(
                    &s.contributor_id,
                    &s.contributor_name,
                    std::slice::from_ref(s),
                )
            })
            .collect();

        let analytics = compute_cohort_analytics_at(&submissions, &snapshots, now());
        assert_eq!(analytics.total_contributors, 2);
        assert_eq!(analytics.active_contributors, 1);
        assert!(snapshots[1].last_submission.is_some_and(|last| {
            last > now() - Duration::days(ACTIVE_WINDOW_DAYS)
        }));
    }

    #[test]
    fn counts_pending_and_averages_scored_only() {
        let mut approved = submission("w1", 3, Some(80));
        approved.status = SubmissionStatus::Approved;
        let submissions = vec![
            submission("w1", 1, None),
            submission("w2", 1, None),
            submission("w2", 2, Some(70)),
            approved,
        ];
        let analytics = compute_cohort_analytics_at(&submissions, &[], now());
        assert_eq!(analytics.total_submissions, 4);
        // Submission::new starts in pending_review; the unscored pair plus the 70
        assert_eq!(analytics.pending_review, 3);
        assert_eq!(analytics.average_team_score, 75.0);
    }

    #[test]
    fn top_performers_rank_by_average_and_cap_at_five() {
        let snapshots: Vec<ContributorProgress> = (0u32..7)
            .map(|i| progress(&format!("w{i}"), 60.0 + f64::from(i), 0.0))
            .collect();
        let analytics = compute_cohort_analytics_at(&[], &snapshots, now());

        let ids: Vec<&str> = analytics
            .top_performers
            .iter()
            .map(|p| p.contributor_id.as_str())
            .collect();
        assert_eq!(ids, vec!["w6", "w5", "w4", "w3", "w2"]);
        assert_eq!(analytics.top_performers[0].average_score, 66.0);
    }

    #[test]
    fn improvement_leaders_exclude_non_positive_rates() {
        let snapshots = vec![
            progress("best-average", 95.0, -0.5),
            progress("flat", 80.0, 0.0),
            progress("slow", 60.0, 0.75),
            progress("fast", 55.0, 4.2),
        ];
        let analytics = compute_cohort_analytics_at(&[], &snapshots, now());

        let ids: Vec<&str> = analytics
            .improvement_leaders
            .iter()
            .map(|p| p.contributor_id.as_str())
            .collect();
        assert_eq!(ids, vec!["fast", "slow"]);
        assert_eq!(analytics.top_performers[0].contributor_id, "best-average");
    }

    #[test]
    fn team_issues_tally_every_submission() {
        let mut a = submission("w1", 1, Some(70));
        a.annotations = vec![annotation("compliance"), annotation("meta")];
        let mut b = submission("w2", 1, Some(70));
        b.annotations = vec![annotation("meta")];

        let analytics = compute_cohort_analytics_at(&[a, b], &[], now());
        assert_eq!(analytics.common_team_issues[0].issue, "meta");
        assert_eq!(analytics.common_team_issues[0].count, 2);
        assert_eq!(analytics.common_team_issues[1].issue, "compliance");
    }

    #[test]
    fn review_time_averages_reviewed_submissions_in_hours() {
        let mut quick = submission("w1", 3, Some(70));
        quick.reviewed_at = Some(quick.created_at + Duration::hours(2));
        let mut slow = submission("w1", 3, Some(70));
        slow.reviewed_at = Some(slow.created_at + Duration::minutes(5 * 60 + 30));
        let never = submission("w1", 1, None);

        let analytics = compute_cohort_analytics_at(&[quick, slow, never], &[], now());
        assert_eq!(analytics.average_review_time, 3.8);
    }
}
