use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{Annotation, IssueCategory, IssueCount, Severity};

/// Upper bound on annotations kept per review and on frequency table rows.
pub const MAX_ISSUES: usize = 10;
pub const ISSUE_KEY_CHARS: usize = 50;

/// One issue record as produced by the content-analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIssue {
    pub severity: String,
    #[serde(default)]
    pub category: Option<String>,
    pub explanation: String,
    pub fix_suggestion: String,
    #[serde(default)]
    pub learning_note: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
}

/// Validates a raw issue and normalizes it into an `Annotation`.
///
/// Severity and category tokens must be exactly one of the canonical lowercase
/// names; anything else is rejected, never mapped to a default. A missing
/// category becomes `Uncategorized`, and its frequency key is derived from the
/// explanation by [`issue_key`].
pub fn classify_issue(raw: &RawIssue) -> EngineResult<Annotation> {
    let severity: Severity = raw.severity.parse()?;
    let category = match raw.category.as_deref() {
        None | Some("") => IssueCategory::Uncategorized,
        Some(token) => token.parse()?,
    };
    let issue_key = match category {
        IssueCategory::Uncategorized => issue_key(&raw.explanation),
        named => named.as_str().to_string(),
    };

    Ok(Annotation {
        id: Uuid::new_v4(),
        severity,
        category,
        issue_key,
        explanation: raw.explanation.clone(),
        fix_suggestion: raw.fix_suggestion.clone(),
        learning_note: non_empty(raw.learning_note.as_deref()),
        excerpt: non_empty(raw.excerpt.as_deref()),
        applied: false,
    })
}

/// Leading phrase of an explanation: the text before the first `:`, or the
/// first `ISSUE_KEY_CHARS` characters when there is no colon.
pub fn issue_key(explanation: &str) -> String {
    match explanation.split_once(':') {
        Some((head, _)) => head.to_string(),
        None => explanation.chars().take(ISSUE_KEY_CHARS).collect(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Counts annotations by issue key and keeps the `MAX_ISSUES` most frequent.
/// Equal counts keep the order in which each key was first seen.
pub fn tally_issues<'a, I>(annotations: I) -> Vec<IssueCount>
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let mut slots: HashMap<&'a str, usize> = HashMap::new();
    let mut counts: Vec<IssueCount> = Vec::new();

    for annotation in annotations {
        let slot = *slots
            .entry(annotation.issue_key.as_str())
            .or_insert_with(|| {
                counts.push(IssueCount {
                    issue: annotation.issue_key.clone(),
                    count: 0,
                });
                counts.len() - 1
            });
        counts[slot].count += 1;
    }

    // stable sort keeps first-seen order among ties
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(MAX_ISSUES);
    counts
}
