//! Cheap change detection for a directory of JumpList files.
//!
//! The fingerprint covers file names and modification times only. Artifact
//! files are write-once outputs of an extraction step, so reading their
//! contents is not needed to notice drift.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};

use crate::log_debug;

const ENABLE_LOGS: bool = true;

pub const JUMPLIST_EXTENSIONS: [&str; 2] = ["automaticDestinations-ms", "customDestinations-ms"];

/// One member file as seen by the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub name: String,
    /// Nanoseconds since the Unix epoch.
    pub modified_nanos: i128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub digest: String,
    pub file_count: u64,
    pub latest_modified: Option<DateTime<Utc>>,
}

impl Fingerprint {
    /// Digest over the name-sorted `(name, mtime)` pairs.
    pub fn from_stamps(mut stamps: Vec<FileStamp>) -> Self {
        stamps.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.modified_nanos.cmp(&b.modified_nanos))
        });

        let mut hasher = Sha256::new();
        for stamp in &stamps {
            hasher.update(stamp.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(stamp.modified_nanos.to_le_bytes());
        }

        let latest_modified = stamps
            .iter()
            .map(|s| s.modified_nanos)
            .max()
            .and_then(nanos_to_datetime);

        Self {
            digest: format!("{:x}", hasher.finalize()),
            file_count: stamps.len() as u64,
            latest_modified,
        }
    }
}

/// Outcome of comparing a directory against its stored fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// No JumpList files: nothing to parse or cache.
    NoData,
    Hit(Fingerprint),
    Miss(Fingerprint),
}

#[derive(Debug, Clone)]
pub struct FreshnessOracle {
    extensions: Vec<String>,
}

impl Default for FreshnessOracle {
    fn default() -> Self {
        Self::new(JUMPLIST_EXTENSIONS.iter().map(|ext| ext.to_string()))
    }
}

impl FreshnessOracle {
    pub fn new(extensions: impl IntoIterator<Item = String>) -> Self {
        Self {
            extensions: extensions.into_iter().collect(),
        }
    }

    pub fn is_artifact(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Matching artifact files directly inside `dir` (not recursive).
    pub fn artifact_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && self.is_artifact(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// `None` when the directory holds no artifact files.
    pub fn fingerprint(&self, dir: &Path) -> io::Result<Option<Fingerprint>> {
        let files = self.artifact_files(dir)?;
        if files.is_empty() {
            log_debug!("no JumpList files in {}", dir.display());
            return Ok(None);
        }

        let mut stamps = Vec::with_capacity(files.len());
        for path in files {
            let modified = fs::metadata(&path)?.modified()?;
            stamps.push(FileStamp {
                name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                modified_nanos: system_time_nanos(modified),
            });
        }

        Ok(Some(Fingerprint::from_stamps(stamps)))
    }

    /// Compare the current state of `dir` with `stored`, a previously
    /// recorded digest.
    pub fn check(&self, dir: &Path, stored: Option<&str>) -> io::Result<Freshness> {
        Ok(match self.fingerprint(dir)? {
            None => Freshness::NoData,
            Some(current) => judge(current, stored),
        })
    }
}

/// Equal digests are a hit; anything else, including no stored digest, a miss.
fn judge(current: Fingerprint, stored: Option<&str>) -> Freshness {
    if stored == Some(current.digest.as_str()) {
        Freshness::Hit(current)
    } else {
        Freshness::Miss(current)
    }
}

fn system_time_nanos(time: SystemTime) -> i128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos() as i128,
        Err(before) => -(before.duration().as_nanos() as i128),
    }
}

fn nanos_to_datetime(nanos: i128) -> Option<DateTime<Utc>> {
    let nanos = i64::try_from(nanos).ok()?;
    Some(Utc.timestamp_nanos(nanos))
}
