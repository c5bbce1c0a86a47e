use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::{filter::parse_instant, sort_events, SortOrder};
use crate::models::Event;

const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppCount {
    pub app_id: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionCount {
    pub extension: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub earliest: String,
    pub latest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentFile {
    pub timestamp: String,
    pub app_id: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventStatistics {
    pub total_events: usize,
    pub unique_apps: usize,
    pub date_range: Option<DateRange>,
    pub top_apps: Vec<AppCount>,
    pub top_extensions: Vec<ExtensionCount>,
    pub recent_files: Vec<RecentFile>,
    pub app_list: Vec<String>,
}

impl EventStatistics {
    pub fn from_events(events: &[Event]) -> Self {
        if events.is_empty() {
            return Self::default();
        }

        let app_counts = count_in_order(events.iter().map(|e| e.app_id().to_string()));
        let extension_counts =
            count_in_order(events.iter().filter_map(|e| extension(e.target_path())));

        let app_list: Vec<String> = events
            .iter()
            .map(|e| e.app_id().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut recent = events.to_vec();
        sort_events(&mut recent, SortOrder::Timestamp);
        let recent_files = recent
            .into_iter()
            .take(TOP_N)
            .map(|e| RecentFile {
                timestamp: e.timestamp_utc().to_string(),
                app_id: e.app_id().to_string(),
                path: e.target_path().to_string(),
            })
            .collect();

        Self {
            total_events: events.len(),
            unique_apps: app_list.len(),
            date_range: date_range(events),
            top_apps: top(app_counts)
                .map(|(app_id, count)| AppCount { app_id, count })
                .collect(),
            top_extensions: top(extension_counts)
                .map(|(extension, count)| ExtensionCount { extension, count })
                .collect(),
            recent_files,
            app_list,
        }
    }
}

/// Occurrence counts, listed in order of first appearance.
fn count_in_order(keys: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for key in keys {
        match positions.get(&key) {
            Some(&index) => counts[index].1 += 1,
            None => {
                positions.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts
}

/// Highest counts first; the stable sort keeps first-seen order on ties.
fn top(mut counts: Vec<(String, usize)>) -> impl Iterator<Item = (String, usize)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(TOP_N)
}

/// Lower-cased suffix of the last path component, dot included.
///
/// Handles both `\` and `/` separators; dotfiles have no suffix.
pub fn extension(path: &str) -> Option<String> {
    let name = path.rsplit(|c: char| c == '\\' || c == '/').next().unwrap_or(path);
    let dot = name.rfind('.')?;
    if dot == 0 || dot + 1 == name.len() {
        return None;
    }
    Some(name[dot..].to_lowercase())
}

fn date_range(events: &[Event]) -> Option<DateRange> {
    let mut instants = events.iter().filter_map(|e| parse_instant(e.timestamp_utc()));
    let first = instants.next()?;
    let (earliest, latest) = instants.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
    Some(DateRange {
        earliest: render(earliest),
        latest: render(latest),
    })
}

fn render(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventDraft;

    fn event(path: &str, timestamp: &str, app: &str) -> Event {
        let mut draft = EventDraft::new(path);
        draft.target_modified_utc = Some(timestamp.to_string());
        draft.app_id = Some(app.to_string());
        draft.build().unwrap()
    }

    #[test]
    fn top_apps_break_ties_by_first_appearance() {
        let mut events = Vec::new();
        for i in 0..5 {
            events.push(event(&format!("C:\\a{i}.txt"), "2024-01-01T00:00:00Z", "A"));
            events.push(event(&format!("C:\\b{i}.txt"), "2024-01-01T00:00:00Z", "B"));
        }
        for i in 0..3 {
            events.insert(0, event(&format!("C:\\c{i}.txt"), "2024-01-01T00:00:00Z", "C"));
        }
        // C is seen first but has fewer hits; A precedes B.
        let stats = EventStatistics::from_events(&events);
        let order: Vec<(&str, usize)> = stats
            .top_apps
            .iter()
            .map(|a| (a.app_id.as_str(), a.count))
            .collect();
        assert_eq!(order, vec![("A", 5), ("B", 5), ("C", 3)]);
        assert_eq!(stats.unique_apps, 3);
        assert_eq!(stats.app_list, vec!["A", "B", "C"]);
    }

    #[test]
    fn extensions_are_lowercased_suffixes() {
        assert_eq!(extension("C:\\Users\\a\\Report.DOCX"), Some(".docx".into()));
        assert_eq!(extension("/home/a/archive.tar.gz"), Some(".gz".into()));
        assert_eq!(extension("C:\\Users\\a\\.bashrc"), None);
        assert_eq!(extension("C:\\Users\\a.b\\Downloads"), None);
        assert_eq!(extension("trailing."), None);
    }

    #[test]
    fn summary_fields() {
        let events = vec![
            event("C:\\x\\one.PDF", "2024-02-01T08:00:00Z", "acrobat"),
            event("C:\\x\\two.pdf", "2024-03-01T08:00:00Z", "acrobat"),
            event("C:\\x\\three.txt", "2024-01-01T08:00:00Z", "notepad"),
            event("C:\\x\\folder", "2024-04-01T08:00:00Z", "explorer"),
        ];
        let stats = EventStatistics::from_events(&events);

        assert_eq!(stats.total_events, 4);
        assert_eq!(
            stats.date_range,
            Some(DateRange {
                earliest: "2024-01-01T08:00:00Z".into(),
                latest: "2024-04-01T08:00:00Z".into(),
            })
        );
        assert_eq!(
            stats.top_extensions,
            vec![
                ExtensionCount { extension: ".pdf".into(), count: 2 },
                ExtensionCount { extension: ".txt".into(), count: 1 },
            ]
        );
        assert_eq!(stats.recent_files[0].path, "C:\\x\\folder");
        assert_eq!(stats.recent_files[3].path, "C:\\x\\three.txt");
    }

    #[test]
    fn recent_files_cap_at_ten() {
        let events: Vec<Event> = (0..15)
            .map(|i| {
                let timestamp = format!("2024-01-{:02}T00:00:00Z", i + 1);
                event(&format!("C:\\f{i:02}.txt"), &timestamp, "app")
            })
            .collect();
        let stats = EventStatistics::from_events(&events);
        assert_eq!(stats.recent_files.len(), 10);
        assert_eq!(stats.recent_files[0].timestamp, "2024-01-15T00:00:00Z");
        assert_eq!(stats.top_extensions.len(), 1);
    }

    #[test]
    fn empty_input_has_no_range() {
        let stats = EventStatistics::from_events(&[]);
        assert_eq!(stats.total_events, 0);
        assert!(stats.date_range.is_none());
        assert!(stats.top_apps.is_empty());
    }
}
