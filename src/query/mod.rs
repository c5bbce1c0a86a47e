//! Time filter, keyword search, sort and limit over an event set.
//!
//! Steps always run in that order so cache hits and fresh parses produce
//! identical results.

pub mod filter;
pub mod stats;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::JumpListError;
use crate::log_info;
use crate::models::Event;

pub use filter::{parse_instant, search, TimeRange};
pub use stats::EventStatistics;

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first.
    #[default]
    Timestamp,
    /// Target path ascending, byte-wise.
    Path,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Timestamp => "timestamp",
            SortOrder::Path => "path",
        }
    }
}

impl FromStr for SortOrder {
    type Err = JumpListError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "timestamp" => Ok(SortOrder::Timestamp),
            "path" => Ok(SortOrder::Path),
            other => Err(JumpListError::Input(format!(
                "unknown sort_by {other:?}, expected \"timestamp\" or \"path\""
            ))),
        }
    }
}

/// Stable sort; equal keys keep their incoming order.
pub fn sort_events(events: &mut [Event], order: SortOrder) {
    match order {
        SortOrder::Timestamp => events.sort_by(|a, b| b.timestamp_utc().cmp(a.timestamp_utc())),
        SortOrder::Path => events.sort_by(|a, b| a.target_path().cmp(b.target_path())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    pub time_range: TimeRange,
    pub keyword: Option<String>,
    pub sort: SortOrder,
    /// `None` or `Some(0)` means no limit.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub events: Vec<Event>,
    /// Matches before the limit was applied.
    pub total_matches: usize,
}

impl QueryOutcome {
    pub fn truncated(&self) -> bool {
        self.total_matches > self.events.len()
    }

    pub fn dropped(&self) -> usize {
        self.total_matches - self.events.len()
    }
}

impl EventQuery {
    /// Filtered and sorted, but not yet limited.
    pub fn select(&self, events: Vec<Event>) -> Vec<Event> {
        let mut events = self.time_range.apply(events);
        if let Some(keyword) = self.keyword.as_deref() {
            events = search(events, keyword);
        }
        sort_events(&mut events, self.sort);
        events
    }

    pub fn run(&self, events: Vec<Event>) -> QueryOutcome {
        let mut events = self.select(events);
        let total_matches = events.len();

        if let Some(limit) = self.limit.filter(|&limit| limit > 0) {
            if total_matches > limit {
                events.truncate(limit);
                log_info!("Note: Showing {limit} of {total_matches} events");
            }
        }

        QueryOutcome {
            events,
            total_matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventDraft;
    use chrono::{Duration, TimeZone, Utc};

    fn event(path: &str, timestamp: String) -> Event {
        let mut draft = EventDraft::new(path);
        draft.target_modified_utc = Some(timestamp);
        draft.build().unwrap()
    }

    fn series(count: i64) -> Vec<Event> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let at = base + Duration::minutes(i);
                event(
                    &format!("C:\\files\\{i:03}.txt"),
                    at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn limit_keeps_most_recent_in_order() {
        let query = EventQuery {
            limit: Some(100),
            ..EventQuery::default()
        };
        let outcome = query.run(series(150));

        assert_eq!(outcome.events.len(), 100);
        assert_eq!(outcome.total_matches, 150);
        assert_eq!(outcome.dropped(), 50);
        assert!(outcome.truncated());
        assert_eq!(outcome.events[0].target_path(), "C:\\files\\149.txt");
        assert_eq!(outcome.events[99].target_path(), "C:\\files\\050.txt");
        assert!(outcome
            .events
            .windows(2)
            .all(|pair| pair[0].timestamp_utc() > pair[1].timestamp_utc()));
    }

    #[test]
    fn zero_limit_is_unlimited() {
        let query = EventQuery {
            limit: Some(0),
            ..EventQuery::default()
        };
        let outcome = query.run(series(20));
        assert_eq!(outcome.events.len(), 20);
        assert!(!outcome.truncated());
    }

    #[test]
    fn path_sort_is_ascending() {
        let events = vec![
            event("C:\\b.txt", "2024-01-02T00:00:00Z".into()),
            event("C:\\a.txt", "2024-01-01T00:00:00Z".into()),
            event("C:\\B.txt", "2024-01-03T00:00:00Z".into()),
        ];
        let query = EventQuery {
            sort: SortOrder::Path,
            ..EventQuery::default()
        };
        let paths: Vec<String> = query
            .run(events)
            .events
            .iter()
            .map(|e| e.target_path().to_string())
            .collect();
        assert_eq!(paths, vec!["C:\\B.txt", "C:\\a.txt", "C:\\b.txt"]);
    }

    #[test]
    fn filter_then_search_then_limit() {
        let mut events = series(10);
        events.push(event("C:\\Users\\a\\Invoice.pdf", "2024-01-01T00:03:30Z".into()));
        events.push(event("C:\\Users\\a\\invoice-old.pdf", "2023-06-01T00:00:00Z".into()));

        let query = EventQuery {
            time_range: TimeRange::parse(Some("2024-01-01T00:00:00Z"), None).unwrap(),
            keyword: Some("INVOICE".into()),
            sort: SortOrder::Timestamp,
            limit: Some(5),
        };
        let outcome = query.run(events);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].target_path(), "C:\\Users\\a\\Invoice.pdf");
    }

    #[test]
    fn sort_order_parsing() {
        assert_eq!("path".parse::<SortOrder>().unwrap(), SortOrder::Path);
        assert_eq!("timestamp".parse::<SortOrder>().unwrap(), SortOrder::Timestamp);
        assert!("size".parse::<SortOrder>().unwrap_err().is_input());
    }
}
