use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fingerprinted state of one artifact directory at parse time.
///
/// A snapshot owns its events; both are replaced together and never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceSnapshot {
    pub id: String,
    pub directory_path: String,
    pub content_fingerprint: String,
    pub file_count: u64,
    pub latest_modified_utc: Option<DateTime<Utc>>,
    pub fingerprinted_at: DateTime<Utc>,
}
