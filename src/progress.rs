use chrono::{DateTime, Utc};
use tracing::debug;

use crate::issues::tally_issues;
use crate::models::{
    ContributorProgress, Score, SkillArea, SkillAreaStat, Submission, SubmissionStatus,
};
use crate::scoring::{round1, round2};
use crate::trend::estimate_trend;

/// Number of most recent scored submissions the trend is computed over.
pub const TREND_WINDOW: usize = 10;

/// Folds one contributor's submissions (any order) into a progress snapshot.
///
/// Unscored submissions count toward totals and recency but are excluded from
/// averages, trend and skill areas. Calling this twice on the same input yields
/// identical snapshots.
pub fn compute_contributor_progress(
    contributor_id: &str,
    contributor_name: &str,
    submissions: &[Submission],
) -> ContributorProgress {
    let mut ordered: Vec<&Submission> = submissions.iter().collect();
    ordered.sort_by_key(|s| s.created_at);

    let scored: Vec<&Score> = ordered.iter().filter_map(|s| s.score.as_ref()).collect();

    let average_score = if scored.is_empty() {
        0.0
    } else {
        let total: u32 = scored.iter().map(|s| u32::from(s.overall())).sum();
        round1(f64::from(total) / scored.len() as f64)
    };

    let window_start = scored.len().saturating_sub(TREND_WINDOW);
    let score_trend: Vec<u8> = scored[window_start..]
        .iter()
        .map(|s| s.overall())
        .collect();
    let improvement_rate = round2(estimate_trend(&score_trend));

    let approved_submissions = submissions
        .iter()
        .filter(|s| s.status == SubmissionStatus::Approved)
        .count();

    let progress = ContributorProgress {
        contributor_id: contributor_id.to_string(),
        contributor_name: contributor_name.to_string(),
        total_submissions: submissions.len(),
        approved_submissions,
        average_score,
        score_trend,
        skill_areas: skill_area_stats(&scored),
        common_issues: tally_issues(ordered.iter().flat_map(|s| s.annotations.iter())),
        improvement_rate,
        last_submission: ordered.last().map(|s| s.created_at),
    };

    debug!(
        contributor = contributor_id,
        submissions = progress.total_submissions,
        average = progress.average_score,
        rate = progress.improvement_rate,
        "computed contributor progress"
    );
    progress
}

/// `scored` must already be in chronological order.
fn skill_area_stats(scored: &[&Score]) -> Vec<SkillAreaStat> {
    let (Some(first), Some(last)) = (scored.first(), scored.last()) else {
        return Vec::new();
    };

    SkillArea::ALL
        .iter()
        .map(|&skill| {
            let initial = first.skill(skill);
            let current = last.skill(skill);
            SkillAreaStat {
                skill,
                current,
                initial,
                improvement: i32::from(current) - i32::from(initial),
                articles_count: scored.len(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    Performance,
    Trend,
    Strength,
    FocusArea,
    Activity,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Performance => "performance",
            InsightKind::Trend => "trend",
            InsightKind::Strength => "strength",
            InsightKind::FocusArea => "focus",
            InsightKind::Activity => "activity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
}

/// Plain-language notes about a contributor, for managers skimming a report.
pub fn contributor_insights(progress: &ContributorProgress, now: DateTime<Utc>) -> Vec<Insight> {
    let mut insights = Vec::new();

    let performance = if progress.average_score >= 85.0 {
        "Excellent: consistently high-quality work."
    } else if progress.average_score >= 70.0 {
        "Good work with room to improve in some areas."
    } else {
        "Keep learning: significant improvement needed."
    };
    insights.push(Insight {
        kind: InsightKind::Performance,
        message: performance.to_string(),
    });

    let trend = if progress.improvement_rate > 2.0 {
        "Rapid improvement across recent submissions."
    } else if progress.improvement_rate > 0.0 {
        "Steady improvement over time."
    } else if progress.improvement_rate < -1.0 {
        "Declining scores; may need additional support."
    } else {
        "Stable performance."
    };
    insights.push(Insight {
        kind: InsightKind::Trend,
        message: trend.to_string(),
    });

    // first maximum / first minimum wins on ties
    let strongest = progress
        .skill_areas
        .iter()
        .reduce(|best, stat| if stat.current > best.current { stat } else { best });
    let weakest = progress
        .skill_areas
        .iter()
        .reduce(|worst, stat| if stat.current < worst.current { stat } else { worst });

    if let Some(stat) = strongest {
        insights.push(Insight {
            kind: InsightKind::Strength,
            message: format!("Strongest in {} ({}/100).", stat.skill.label(), stat.current),
        });
    }
    if let Some(stat) = weakest {
        insights.push(Insight {
            kind: InsightKind::FocusArea,
            message: format!("Focus on {} ({}/100).", stat.skill.label(), stat.current),
        });
    }

    if let Some(last) = progress.last_submission {
        let days_since = (now - last).num_days();
        let activity = if days_since < 7 {
            "Active contributor."
        } else if days_since < 30 {
            "Moderately active."
        } else {
            "Inactive: last submission over 30 days ago."
        };
        insights.push(Insight {
            kind: InsightKind::Activity,
            message: activity.to_string(),
        });
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{classify_issue, RawIssue};
    use crate::models::SubScores;
    use crate::scoring::compose_score;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap()
    }

    fn scored(day: u32, sub: [i64; 4]) -> Submission {
        let mut submission =
            Submission::new("w1", "Avery Lee", "Draft", "body", "markdown", at(day));
        submission.score = Some(
            compose_score(SubScores {
                optimization: sub[0],
                credibility: sub[1],
                quality: sub[2],
                compliance: sub[3],
            })
            .unwrap(),
        );
        submission
    }

    fn flat(day: u32, overall: i64) -> Submission {
        scored(day, [overall; 4])
    }

    fn issue(category: &str) -> crate::models::Annotation {
        classify_issue(&RawIssue {
            severity: "warning".to_string(),
            category: Some(category.to_string()),
            explanation: "Thin section".to_string(),
            fix_suggestion: "Expand it".to_string(),
            learning_note: None,
            excerpt: None,
        })
        .unwrap()
    }

    #[test]
    fn no_submissions_gives_empty_snapshot() {
        let progress = compute_contributor_progress("w0", "Nobody", &[]);
        assert_eq!(progress.total_submissions, 0);
        assert_eq!(progress.approved_submissions, 0);
        assert_eq!(progress.average_score, 0.0);
        assert!(progress.score_trend.is_empty());
        assert!(progress.skill_areas.is_empty());
        assert!(progress.common_issues.is_empty());
        assert_eq!(progress.improvement_rate, 0.0);
        assert_eq!(progress.last_submission, None);
    }

    #[test]
    fn three_submissions_end_to_end() {
        // supplied out of order on purpose
        let submissions = vec![flat(3, 85), flat(1, 60), flat(2, 70)];
        let progress = compute_contributor_progress("w1", "Avery Lee", &submissions);

        assert_eq!(progress.total_submissions, 3);
        assert_eq!(progress.average_score, 71.7);
        assert_eq!(progress.score_trend, vec![60, 70, 85]);
        assert_eq!(progress.improvement_rate, 12.5);
        assert_eq!(progress.last_submission, Some(at(3)));
    }

    #[test]
    fn unscored_submissions_are_excluded_from_means() {
        let pending = Submission::new("w1", "Avery Lee", "New", "body", "markdown", at(5));
        let submissions = vec![flat(1, 60), pending, flat(2, 80)];
        let progress = compute_contributor_progress("w1", "Avery Lee", &submissions);

        assert_eq!(progress.total_submissions, 3);
        assert_eq!(progress.average_score, 70.0);
        assert_eq!(progress.score_trend, vec![60, 80]);
        assert_eq!(progress.skill_areas[0].articles_count, 2);
        assert_eq!(progress.last_submission, Some(at(5)));
    }

    #[test]
    fn trend_window_keeps_last_ten_scored() {
        let submissions: Vec<Submission> =
            (1..=12).map(|day| flat(day, 40 + day as i64)).collect();
        let progress = compute_contributor_progress("w1", "Avery Lee", &submissions);

        assert_eq!(progress.score_trend.len(), TREND_WINDOW);
        assert_eq!(progress.score_trend.first(), Some(&43));
        assert_eq!(progress.score_trend.last(), Some(&52));
        assert_eq!(progress.improvement_rate, 1.0);
    }

    #[test]
    fn single_scored_submission_has_no_skill_improvement() {
        let progress =
            compute_contributor_progress("w1", "Avery Lee", &[scored(1, [80, 70, 60, 90])]);

        assert_eq!(progress.skill_areas.len(), 4);
        for stat in &progress.skill_areas {
            assert_eq!(stat.improvement, 0);
            assert_eq!(stat.initial, stat.current);
            assert_eq!(stat.articles_count, 1);
        }
    }

    #[test]
    fn skill_areas_compare_first_and_last() {
        let submissions = vec![scored(2, [70, 65, 80, 90]), scored(1, [50, 60, 75, 95])];
        let progress = compute_contributor_progress("w1", "Avery Lee", &submissions);

        let optimization = &progress.skill_areas[0];
        assert_eq!(optimization.skill, SkillArea::Optimization);
        assert_eq!(optimization.initial, 50);
        assert_eq!(optimization.current, 70);
        assert_eq!(optimization.improvement, 20);

        let compliance = &progress.skill_areas[3];
        assert_eq!(compliance.skill, SkillArea::Compliance);
        assert_eq!(compliance.improvement, -5);
    }

    #[test]
    fn only_unscored_submissions_omit_skill_areas() {
        let pending = Submission::new("w1", "Avery Lee", "New", "body", "markdown", at(1));
        let progress = compute_contributor_progress("w1", "Avery Lee", &[pending]);
        assert!(progress.skill_areas.is_empty());
        assert_eq!(progress.total_submissions, 1);
    }

    #[test]
    fn approved_counts_only_approved_status() {
        let mut approved = flat(1, 70);
        approved.status = SubmissionStatus::Approved;
        let mut published = flat(2, 75);
        published.status = SubmissionStatus::Published;
        let mut revising = flat(3, 50);
        revising.status = SubmissionStatus::NeedsRevision;

        let progress =
            compute_contributor_progress("w1", "Avery Lee", &[approved, published, revising]);
        assert_eq!(progress.approved_submissions, 1);
    }

    #[test]
    fn common_issues_count_categories_across_submissions() {
        let mut first = flat(1, 60);
        first.annotations = vec![issue("meta"), issue("content")];
        let mut second = flat(2, 65);
        second.annotations = vec![issue("content"), issue("structure"), issue("content")];

        let progress = compute_contributor_progress("w1", "Avery Lee", &[second, first]);
        assert_eq!(progress.common_issues[0].issue, "content");
        assert_eq!(progress.common_issues[0].count, 3);
        // meta was seen first chronologically, so it leads the tie
        assert_eq!(progress.common_issues[1].issue, "meta");
        assert_eq!(progress.common_issues[2].issue, "structure");
    }

    #[test]
    fn recomputation_is_identical() {
        let submissions = vec![scored(1, [50, 60, 70, 80]), scored(4, [65, 60, 72, 81])];
        let first = compute_contributor_progress("w1", "Avery Lee", &submissions);
        let second = compute_contributor_progress("w1", "Avery Lee", &submissions);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.skill_areas).unwrap(),
            serde_json::to_string(&second.skill_areas).unwrap()
        );
    }

    #[test]
    fn insights_follow_bands() {
        let submissions = vec![scored(1, [90, 80, 95, 88]), scored(2, [92, 84, 96, 90])];
        let progress = compute_contributor_progress("w1", "Avery Lee", &submissions);
        let insights = contributor_insights(&progress, at(2) + Duration::days(3));

        let by_kind = |kind: InsightKind| {
            insights
                .iter()
                .find(|insight| insight.kind == kind)
                .map(|insight| insight.message.clone())
        };
        assert_eq!(
            by_kind(InsightKind::Performance).as_deref(),
            Some("Excellent: consistently high-quality work.")
        );
        assert_eq!(
            by_kind(InsightKind::Trend).as_deref(),
            Some("Rapid improvement across recent submissions.")
        );
        assert_eq!(
            by_kind(InsightKind::Strength).as_deref(),
            Some("Strongest in Content Quality (96/100).")
        );
        assert_eq!(
            by_kind(InsightKind::FocusArea).as_deref(),
            Some("Focus on E-E-A-T (84/100).")
        );
        assert_eq!(by_kind(InsightKind::Activity).as_deref(), Some("Active contributor."));
    }

    #[test]
    fn insights_for_empty_progress_skip_missing_inputs() {
        let progress = compute_contributor_progress("w0", "Nobody", &[]);
        let insights = contributor_insights(&progress, at(1));
        let kinds: Vec<InsightKind> = insights.iter().map(|insight| insight.kind).collect();
        assert_eq!(kinds, vec![InsightKind::Performance, InsightKind::Trend]);
    }
}
