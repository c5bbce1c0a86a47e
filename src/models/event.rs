//! Normalized JumpList timeline events.
//!
//! An [`Event`] can only be obtained through [`EventDraft::build`], which
//! enforces the two construction rules: a non-empty target path and a
//! primary timestamp resolved from the target's modified, accessed or
//! created time (in that order).

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const SOURCE_JUMPLIST: &str = "jumplist";
pub const ARTIFACT_RECENT_ITEM: &str = "recent_item";
pub const UNKNOWN_APP_ID: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target path is empty")]
    EmptyTargetPath,
    #[error("no modified, accessed or created timestamp to order the event by")]
    MissingTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Event {
    source: String,
    artifact: String,
    timestamp_utc: String,
    app_id: String,
    target_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_created_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_modified_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_accessed_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    machine_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume_serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry_number: Option<i64>,
}

/// Field values for an event that has not been validated yet.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub source: Option<String>,
    pub artifact: Option<String>,
    pub app_id: Option<String>,
    pub target_path: String,
    pub target_created_utc: Option<String>,
    pub target_modified_utc: Option<String>,
    pub target_accessed_utc: Option<String>,
    pub file_size: Option<u64>,
    pub machine_id: Option<String>,
    pub volume_serial: Option<String>,
    pub entry_number: Option<i64>,
}

impl EventDraft {
    pub fn new(target_path: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            ..Self::default()
        }
    }

    /// The timestamp the event will be ordered by, if any.
    pub fn primary_timestamp(&self) -> Option<&str> {
        [
            &self.target_modified_utc,
            &self.target_accessed_utc,
            &self.target_created_utc,
        ]
        .into_iter()
        .find_map(|value| non_empty(value.as_deref()))
    }

    pub fn build(self) -> Result<Event, ValidationError> {
        if self.target_path.trim().is_empty() {
            return Err(ValidationError::EmptyTargetPath);
        }
        let timestamp_utc = self
            .primary_timestamp()
            .ok_or(ValidationError::MissingTimestamp)?
            .to_string();

        Ok(Event {
            source: present_or(self.source, SOURCE_JUMPLIST),
            artifact: present_or(self.artifact, ARTIFACT_RECENT_ITEM),
            timestamp_utc,
            app_id: present_or(self.app_id, UNKNOWN_APP_ID),
            target_path: self.target_path,
            target_created_utc: present(self.target_created_utc),
            target_modified_utc: present(self.target_modified_utc),
            target_accessed_utc: present(self.target_accessed_utc),
            file_size: self.file_size,
            machine_id: present(self.machine_id),
            volume_serial: present(self.volume_serial),
            entry_number: self.entry_number,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn present_or(value: Option<String>, fallback: &str) -> String {
    present(value).unwrap_or_else(|| fallback.to_string())
}

impl Event {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn timestamp_utc(&self) -> &str {
        &self.timestamp_utc
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    pub fn target_created_utc(&self) -> Option<&str> {
        self.target_created_utc.as_deref()
    }

    pub fn target_modified_utc(&self) -> Option<&str> {
        self.target_modified_utc.as_deref()
    }

    pub fn target_accessed_utc(&self) -> Option<&str> {
        self.target_accessed_utc.as_deref()
    }

    pub fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    pub fn machine_id(&self) -> Option<&str> {
        self.machine_id.as_deref()
    }

    pub fn volume_serial(&self) -> Option<&str> {
        self.volume_serial.as_deref()
    }

    pub fn entry_number(&self) -> Option<i64> {
        self.entry_number
    }

    /// Field map with absent optional fields left out entirely.
    ///
    /// Both the cache writer and the public query results go through this,
    /// so "present" means the same thing everywhere.
    pub fn projection(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // Serializing a struct of strings and integers always yields an object.
            _ => Map::new(),
        }
    }
}
