use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{
    Annotation, ContributorProgress, IssueCount, SkillArea, Submission, TeamAnalytics,
};
use crate::progress::contributor_insights;

pub fn build_report(
    generated_at: DateTime<Utc>,
    analytics: &TeamAnalytics,
    progress: &[ContributorProgress],
    submissions: &[Submission],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Writing Quality Progress Report");
    let _ = writeln!(
        output,
        "Generated {} for {} contributors ({} active in the last 30 days)",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        analytics.total_contributors,
        analytics.active_contributors
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Team Overview");
    let _ = writeln!(
        output,
        "- {} submissions, {} pending review",
        analytics.total_submissions, analytics.pending_review
    );
    let _ = writeln!(output, "- Average team score {:.1}", analytics.average_team_score);
    let _ = writeln!(
        output,
        "- Average review turnaround {:.1} hours",
        analytics.average_review_time
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");
    if analytics.top_performers.is_empty() {
        let _ = writeln!(output, "No scored contributors yet.");
    } else {
        for entry in &analytics.top_performers {
            let _ = writeln!(
                output,
                "- {} ({}) average {:.1} across {} submissions",
                entry.contributor_name,
                entry.contributor_id,
                entry.average_score,
                entry.total_submissions
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Improved");
    if analytics.improvement_leaders.is_empty() {
        let _ = writeln!(output, "No contributor is trending upward yet.");
    } else {
        for entry in &analytics.improvement_leaders {
            let _ = writeln!(
                output,
                "- {} ({}) {:+.2} points per submission across {} submissions",
                entry.contributor_name,
                entry.contributor_id,
                entry.improvement_rate,
                entry.total_submissions
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recurring Issues");
    write_issue_table(&mut output, &analytics.common_team_issues);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Contributor Notes");
    if progress.is_empty() {
        let _ = writeln!(output, "No contributors on record.");
    }
    for entry in progress {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {}", entry.contributor_name);
        let _ = writeln!(
            output,
            "{} submissions ({} approved), average {:.1}, trend {:+.2}",
            entry.total_submissions,
            entry.approved_submissions,
            entry.average_score,
            entry.improvement_rate
        );
        for insight in contributor_insights(entry, generated_at) {
            let _ = writeln!(output, "- {}", insight.message);
        }
    }

    let mut recent: Vec<&Submission> = submissions
        .iter()
        .filter(|s| s.reviewed_at.is_some())
        .collect();
    recent.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Reviews");

    if recent.is_empty() {
        let _ = writeln!(output, "No reviews recorded yet.");
    } else {
        for submission in recent.iter().take(5) {
            let overall = submission
                .score
                .map(|score| score.overall().to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "- {} by {} scored {} ({}, {} issues)",
                submission.title,
                submission.contributor_name,
                overall,
                submission.status,
                submission.annotations.len()
            );
        }
    }

    output
}

/// Plain-text rendering of one contributor's snapshot for the terminal.
pub fn render_progress(progress: &ContributorProgress, now: DateTime<Utc>) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{} ({}): {} submissions, {} approved",
        progress.contributor_name,
        progress.contributor_id,
        progress.total_submissions,
        progress.approved_submissions
    );
    let _ = writeln!(
        output,
        "Average score {:.1}, improvement rate {:+.2} per submission",
        progress.average_score, progress.improvement_rate
    );
    if !progress.score_trend.is_empty() {
        let trend: Vec<String> = progress.score_trend.iter().map(u8::to_string).collect();
        let _ = writeln!(output, "Recent scores: {}", trend.join(" -> "));
    }
    if let Some(last) = progress.last_submission {
        let _ = writeln!(output, "Last submission {}", last.format("%Y-%m-%d"));
    }

    if !progress.skill_areas.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "Skill areas:");
        for stat in &progress.skill_areas {
            let _ = writeln!(
                output,
                "- {}: {} (from {}, {:+}) over {} submissions",
                stat.skill.label(),
                stat.current,
                stat.initial,
                stat.improvement,
                stat.articles_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Common issues:");
    write_issue_table(&mut output, &progress.common_issues);

    let _ = writeln!(output);
    let _ = writeln!(output, "Insights:");
    for insight in contributor_insights(progress, now) {
        let _ = writeln!(output, "- [{}] {}", insight.kind.as_str(), insight.message);
    }

    output
}

/// Plain-text rendering of a single submission and its review record.
pub fn render_submission(submission: &Submission) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{} by {} ({})",
        submission.title, submission.contributor_name, submission.contributor_id
    );
    let _ = writeln!(
        output,
        "Status {}, revision {}, submitted {}",
        submission.status,
        submission.revision,
        submission.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(reviewed) = submission.reviewed_at {
        let _ = writeln!(output, "Reviewed {}", reviewed.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(published) = submission.published_at {
        let _ = writeln!(output, "Published {}", published.format("%Y-%m-%d %H:%M UTC"));
    }

    let _ = writeln!(output);
    match submission.score {
        Some(score) => {
            let _ = writeln!(output, "Score {}:", score.overall());
            for area in SkillArea::ALL {
                let _ = writeln!(output, "- {}: {}", area.label(), score.skill(area));
            }
        }
        None => {
            let _ = writeln!(output, "Not scored yet.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Annotations:");
    write_annotations(&mut output, &submission.annotations);

    if let Some(feedback) = &submission.feedback {
        let _ = writeln!(output);
        let _ = writeln!(output, "Feedback from {}:", feedback.reviewer_id);
        let _ = writeln!(output, "{}", feedback.overall_comment);
        write_list(&mut output, "Strengths", &feedback.strengths);
        write_list(&mut output, "Improvement areas", &feedback.improvement_areas);
        write_list(&mut output, "Learning resources", &feedback.learning_resources);
    }

    if !submission.review_history.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "Earlier reviews:");
        for cycle in &submission.review_history {
            let overall = cycle
                .score
                .map(|score| score.overall().to_string())
                .unwrap_or_else(|| "-".to_string());
            let reviewed = cycle
                .reviewed_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "- revision {} reviewed {} scored {} with {} annotations",
                cycle.revision,
                reviewed,
                overall,
                cycle.annotations.len()
            );
        }
    }

    output
}

fn write_annotations(output: &mut String, annotations: &[Annotation]) {
    if annotations.is_empty() {
        let _ = writeln!(output, "None.");
        return;
    }
    for annotation in annotations {
        let mark = if annotation.applied { "x" } else { " " };
        let _ = writeln!(
            output,
            "- [{mark}] {} {} ({}): {}",
            annotation.id, annotation.severity, annotation.category, annotation.explanation
        );
        let _ = writeln!(output, "      fix: {}", annotation.fix_suggestion);
        if let Some(note) = &annotation.learning_note {
            let _ = writeln!(output, "      note: {note}");
        }
    }
}

fn write_list(output: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(output, "{heading}:");
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
}

fn write_issue_table(output: &mut String, issues: &[IssueCount]) {
    if issues.is_empty() {
        let _ = writeln!(output, "No issues recorded.");
        return;
    }
    for issue in issues {
        let _ = writeln!(output, "- {}: {} occurrences", issue.issue, issue.count);
    }
}
