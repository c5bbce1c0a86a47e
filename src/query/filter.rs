use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{JumpListError, Result};
use crate::log_warn;
use crate::models::Event;

const ENABLE_LOGS: bool = true;

const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601 instant. Values without an offset are taken as UTC.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Inclusive `[from, to]` window; a missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        Ok(Self {
            from: parse_bound(from, "time_from")?,
            to: parse_bound(to, "time_to")?,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| instant >= from) && self.to.map_or(true, |to| instant <= to)
    }

    /// Keep events inside the window. Events whose timestamp does not parse
    /// are dropped with a warning.
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        if self.is_unbounded() {
            return events;
        }

        events
            .into_iter()
            .filter(|event| match parse_instant(event.timestamp_utc()) {
                Some(instant) => self.contains(instant),
                None => {
                    log_warn!(
                        "Warning: Could not parse event timestamp {:?} for {}",
                        event.timestamp_utc(),
                        event.target_path()
                    );
                    false
                }
            })
            .collect()
    }
}

fn parse_bound(value: Option<&str>, name: &str) -> Result<Option<DateTime<Utc>>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_instant(raw)
            .map(Some)
            .ok_or_else(|| JumpListError::Input(format!("{name} is not an ISO-8601 time: {raw}"))),
    }
}

/// Case-insensitive substring match on the target path.
pub fn matches_keyword(event: &Event, keyword_lower: &str) -> bool {
    event.target_path().to_lowercase().contains(keyword_lower)
}

pub fn search(events: Vec<Event>, keyword: &str) -> Vec<Event> {
    let keyword_lower = keyword.to_lowercase();
    events
        .into_iter()
        .filter(|event| matches_keyword(event, &keyword_lower))
        .collect()
}
