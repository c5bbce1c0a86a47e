//! Directory-keyed cache of normalized events.
//!
//! One snapshot covers a whole directory: adding or touching any artifact
//! file invalidates every cached event for it.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{JumpListError, Result};
use crate::freshness::{Fingerprint, Freshness, FreshnessOracle};
use crate::models::{Event, SourceSnapshot};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    pub total_events: u64,
    pub total_snapshots: u64,
    pub store_size_bytes: u64,
    pub unique_app_count: u64,
}

/// Result of a single freshness probe against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheProbe {
    /// The directory has no artifact files.
    NoData,
    Hit(Vec<Event>),
    /// Stale or absent. `fingerprint` is `None` when it could not be computed,
    /// in which case fresh results must not be written back.
    Miss { fingerprint: Option<Fingerprint> },
}

#[derive(Clone)]
pub struct CacheStore {
    db: Database,
    oracle: FreshnessOracle,
}

impl CacheStore {
    pub fn open(cache_path: PathBuf) -> Result<Self> {
        let db = Database::open(cache_path).map_err(JumpListError::store)?;
        Ok(Self::with_database(db, FreshnessOracle::default()))
    }

    pub fn with_database(db: Database, oracle: FreshnessOracle) -> Self {
        Self { db, oracle }
    }

    pub fn oracle(&self) -> &FreshnessOracle {
        &self.oracle
    }

    /// Fingerprint `directory` once and load its events if still valid.
    ///
    /// Read failures are logged and reported as a miss.
    pub fn probe(&self, directory: &Path) -> CacheProbe {
        let key = directory_key(directory);
        let stored = match self.db.get_snapshot(&key) {
            Ok(snapshot) => snapshot.map(|s| s.content_fingerprint),
            Err(err) => {
                log_warn!("Failed to read cached snapshot for {key}: {err:#}");
                None
            }
        };

        let current = match self.oracle.check(directory, stored.as_deref()) {
            Ok(Freshness::NoData) => return CacheProbe::NoData,
            Ok(Freshness::Miss(current)) => {
                return CacheProbe::Miss {
                    fingerprint: Some(current),
                }
            }
            Ok(Freshness::Hit(current)) => current,
            Err(err) => {
                log_warn!(
                    "Cache check failed for {}: {err}; treating as uncached",
                    directory.display()
                );
                return CacheProbe::Miss { fingerprint: None };
            }
        };

        match self.db.get_events_for_directory(&key) {
            Ok(events) if !events.is_empty() => {
                log_info!("Loaded {} events from cache for {key}", events.len());
                CacheProbe::Hit(events)
            }
            Ok(_) => CacheProbe::Miss {
                fingerprint: Some(current),
            },
            Err(err) => {
                log_warn!("Failed to get cached events for {key}: {err:#}");
                CacheProbe::Miss {
                    fingerprint: Some(current),
                }
            }
        }
    }

    /// Cached events for `directory`, only if its fingerprint is unchanged.
    pub fn lookup(&self, directory: &Path) -> Option<Vec<Event>> {
        match self.probe(directory) {
            CacheProbe::Hit(events) => Some(events),
            CacheProbe::NoData | CacheProbe::Miss { .. } => None,
        }
    }

    /// Atomically supersede the snapshot for `directory`.
    pub fn replace(
        &self,
        directory: &Path,
        fingerprint: &Fingerprint,
        events: &[Event],
    ) -> Result<SourceSnapshot> {
        let snapshot = SourceSnapshot {
            id: Uuid::new_v4().to_string(),
            directory_path: directory_key(directory),
            content_fingerprint: fingerprint.digest.clone(),
            file_count: fingerprint.file_count,
            latest_modified_utc: fingerprint.latest_modified,
            fingerprinted_at: Utc::now(),
        };

        let written = self
            .db
            .replace_snapshot(&snapshot, events)
            .map_err(JumpListError::store)?;
        log_info!(
            "Cached {written} events for {}",
            snapshot.directory_path
        );
        Ok(snapshot)
    }

    pub fn statistics(&self) -> Result<CacheStatistics> {
        Ok(CacheStatistics {
            total_events: self.db.count_events().map_err(JumpListError::store)?,
            total_snapshots: self.db.count_snapshots().map_err(JumpListError::store)?,
            store_size_bytes: self.db.storage_size_bytes().map_err(JumpListError::store)?,
            unique_app_count: self.db.count_unique_apps().map_err(JumpListError::store)?,
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.db.clear_snapshots().map_err(JumpListError::store)?;
        log_info!("Cache cleared");
        Ok(())
    }
}

/// Canonical cache key for a directory; falls back to the path as given.
pub fn directory_key(directory: &Path) -> String {
    std::fs::canonicalize(directory)
        .unwrap_or_else(|_| directory.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
