use std::collections::BTreeMap;

use crate::db::models::{ClassificationFeedback, CorrectionCount, FeedbackStatistics};

const TOP_CORRECTIONS: usize = 5;

/// Summary of the audit log. Entries whose prediction was already right do
/// not count as corrections.
pub fn feedback_statistics(log: &[ClassificationFeedback]) -> FeedbackStatistics {
    let mut stats = FeedbackStatistics {
        total_feedback: log.len(),
        ..FeedbackStatistics::default()
    };
    let mut corrections: BTreeMap<(&str, &str), usize> = BTreeMap::new();

    for item in log {
        *stats.domains.entry(item.domain.clone()).or_insert(0) += 1;
        *stats.sources.entry(item.source.clone()).or_insert(0) += 1;
        if item.predicted_context != item.corrected_context {
            *corrections
                .entry((&item.predicted_context, &item.corrected_context))
                .or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<CorrectionCount> = corrections
        .into_iter()
        .map(|((from, to), count)| CorrectionCount {
            from: from.to_string(),
            to: to.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_CORRECTIONS);
    stats.most_common_corrections = ranked;

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn item(domain: &str, from: &str, to: &str, source: &str) -> ClassificationFeedback {
        ClassificationFeedback {
            url: format!("https://{domain}/"),
            domain: domain.into(),
            timestamp: Utc::now(),
            predicted_context: from.into(),
            corrected_context: to.into(),
            source: source.into(),
        }
    }

    #[test]
    fn empty_log_has_zero_totals() {
        assert_eq!(feedback_statistics(&[]), FeedbackStatistics::default());
    }

    #[test]
    fn counts_domains_sources_and_real_corrections() {
        let log = vec![
            item("bbc.com", "News", "Work", "popup"),
            item("bbc.com", "News", "Work", "popup"),
            item("notion.so", "Work", "Work", "sidepanel"),
            item("chess.com", "Social", "Entertainment", "popup"),
        ];
        let stats = feedback_statistics(&log);
        assert_eq!(stats.total_feedback, 4);
        assert_eq!(stats.domains["bbc.com"], 2);
        assert_eq!(stats.sources["popup"], 3);
        assert_eq!(
            stats.most_common_corrections,
            vec![
                CorrectionCount { from: "News".into(), to: "Work".into(), count: 2 },
                CorrectionCount { from: "Social".into(), to: "Entertainment".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn keeps_only_top_five_corrections() {
        let contexts = ["A", "B", "C", "D", "E", "F", "G"];
        let log: Vec<_> = contexts
            .iter()
            .map(|to| item("x.com", "Z", to, "popup"))
            .collect();
        assert_eq!(feedback_statistics(&log).most_common_corrections.len(), 5);
    }
}
