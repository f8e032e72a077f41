//! Pure derivations over the history log. Nothing here is cached; every
//! call rescans the entries it is given.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::classifier::catalog::UNKNOWN;
use crate::db::models::{ContextHistoryEntry, ContextSwitch};

/// Distinct destination contexts required, on top of the switch count,
/// before focus counts as lost.
const MIN_DISTINCT_DESTINATIONS: usize = 3;

fn window(minutes: u32) -> Duration {
    Duration::minutes(i64::from(minutes))
}

/// Switches between adjacent entries younger than `window_minutes`.
pub fn context_switches(
    entries: &[ContextHistoryEntry],
    window_minutes: u32,
    now: DateTime<Utc>,
) -> impl Iterator<Item = ContextSwitch> + '_ {
    let window = window(window_minutes);
    let in_window = move |entry: &&ContextHistoryEntry| now - entry.timestamp < window;

    let previous = entries.iter().filter(in_window);
    let next = entries.iter().filter(in_window).skip(1);

    previous
        .zip(next)
        .filter(|(from, to)| from.context != to.context)
        .map(|(from, to)| ContextSwitch {
            from: from.context.clone(),
            to: to.context.clone(),
            timestamp: to.timestamp,
            from_url: from.url.clone(),
            to_url: to.url.clone(),
        })
}

/// Trailing run length of the newest entry's context.
pub fn current_streak(entries: &[ContextHistoryEntry]) -> usize {
    let Some(last) = entries.last() else {
        return 0;
    };
    entries
        .iter()
        .rev()
        .take_while(|entry| entry.context == last.context)
        .count()
}

fn lost_focus_from(switches: &[ContextSwitch], switch_threshold: usize) -> bool {
    if switches.len() < switch_threshold {
        return false;
    }
    let destinations: HashSet<&str> = switches.iter().map(|s| s.to.as_str()).collect();
    destinations.len() >= MIN_DISTINCT_DESTINATIONS
}

/// Many switches alone are not enough: flip-flopping between two contexts
/// never counts as lost focus.
pub fn is_lost_focus(
    entries: &[ContextHistoryEntry],
    switch_threshold: usize,
    window_minutes: u32,
    now: DateTime<Utc>,
) -> bool {
    let switches: Vec<ContextSwitch> = context_switches(entries, window_minutes, now).collect();
    lost_focus_from(&switches, switch_threshold)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusStatus {
    pub is_lost_focus: bool,
    pub context_switches: Vec<ContextSwitch>,
    pub current_streak: usize,
    pub current_context: String,
}

pub fn focus_status(
    entries: &[ContextHistoryEntry],
    switch_threshold: usize,
    window_minutes: u32,
    now: DateTime<Utc>,
) -> FocusStatus {
    let switches: Vec<ContextSwitch> = context_switches(entries, window_minutes, now).collect();
    FocusStatus {
        is_lost_focus: lost_focus_from(&switches, switch_threshold),
        current_streak: current_streak(entries),
        current_context: entries
            .last()
            .map(|entry| entry.context.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        context_switches: switches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn history(contexts: &[&str], now: DateTime<Utc>) -> Vec<ContextHistoryEntry> {
        let count = contexts.len() as i64;
        contexts
            .iter()
            .enumerate()
            .map(|(index, context)| ContextHistoryEntry {
                context: context.to_string(),
                url: format!("https://site{index}.com/"),
                timestamp: now - Duration::seconds(count - index as i64),
                confidence: 0.5,
            })
            .collect()
    }

    #[test]
    fn switches_are_emitted_between_differing_neighbours() {
        let now = Utc::now();
        let entries = history(&["Work", "Work", "News", "Work"], now);
        let switches: Vec<_> = context_switches(&entries, 15, now).collect();
        assert_eq!(switches.len(), 2);
        assert_eq!(switches[0].from, "Work");
        assert_eq!(switches[0].to, "News");
        assert_eq!(switches[0].from_url, "https://site1.com/");
        assert_eq!(switches[0].to_url, "https://site2.com/");
        assert_eq!(switches[0].timestamp, entries[2].timestamp);
    }

    #[test]
    fn entries_outside_window_are_ignored() {
        let now = Utc::now();
        let mut entries = history(&["News", "Work"], now);
        entries[0].timestamp = now - Duration::minutes(20);
        assert_eq!(context_switches(&entries, 15, now).count(), 0);
        assert_eq!(context_switches(&entries, 30, now).count(), 1);
    }

    #[test]
    fn switch_sequence_is_restartable() {
        let now = Utc::now();
        let entries = history(&["Work", "News", "Social"], now);
        let first: Vec<_> = context_switches(&entries, 15, now).collect();
        let second: Vec<_> = context_switches(&entries, 15, now).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn streak_counts_trailing_run() {
        let now = Utc::now();
        assert_eq!(current_streak(&[]), 0);
        assert_eq!(current_streak(&history(&["Work"], now)), 1);
        assert_eq!(current_streak(&history(&["News", "Work", "Work", "Work"], now)), 3);
    }

    #[test]
    fn flip_flop_between_two_contexts_is_not_lost_focus() {
        let now = Utc::now();
        let entries = history(&["A", "B", "A", "B", "A", "B"], now);
        assert_eq!(context_switches(&entries, 15, now).count(), 5);
        assert!(!is_lost_focus(&entries, 5, 15, now));
    }

    #[test]
    fn wide_ranging_switches_are_lost_focus() {
        let now = Utc::now();
        let entries = history(&["A", "B", "C", "D", "A", "B"], now);
        assert!(is_lost_focus(&entries, 5, 15, now));
        assert!(!is_lost_focus(&entries, 6, 15, now));
    }

    #[test]
    fn empty_history_reports_unknown_context() {
        let status = focus_status(&[], 5, 15, Utc::now());
        assert_eq!(status.current_context, UNKNOWN);
        assert_eq!(status.current_streak, 0);
        assert!(!status.is_lost_focus);
    }
}
