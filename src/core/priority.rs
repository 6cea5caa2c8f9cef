// Keyword-based urgency classification for disaster reports.
//
// Matching is plain substring search over the lowercased text, so "firefighter"
// counts as "fire". Producers rely on that, keep it.

use super::model::{DisasterReport, Priority};

pub const HIGH_PRIORITY_KEYWORDS: [&str; 6] =
    ["urgent", "emergency", "evacuation", "alert", "fire", "flood"];

/// Classify a report from its title, description and tags.
pub fn classify(report: &DisasterReport) -> Priority {
    let content = format!(
        "{} {} {}",
        report.title,
        report.description,
        report.tags.join(" ")
    )
    .to_lowercase();

    if HIGH_PRIORITY_KEYWORDS.iter().any(|word| content.contains(word)) {
        Priority::High
    } else {
        Priority::Normal
    }
}

/// Fill in `priority` on every report.
pub fn classify_all(reports: Vec<DisasterReport>) -> Vec<DisasterReport> {
    reports.into_iter().map(DisasterReport::classified).collect()
}
