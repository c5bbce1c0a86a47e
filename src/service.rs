//! Request handling: freshness check, cache lookup or fresh parse, then the
//! query pipeline.
//!
//! Every call runs to completion on the caller's thread.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cache::{CacheProbe, CacheStore};
use crate::collaborator::{ArtifactParser, JleCmdParser};
use crate::config::Config;
use crate::error::{JumpListError, Result};
use crate::models::Event;
use crate::normalizer::Normalizer;
use crate::query::{EventQuery, EventStatistics, SortOrder, TimeRange};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

pub const DEFAULT_PARSE_LIMIT: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Where a request's events came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    Cache,
    Parsed,
    /// The directory has no JumpList files.
    Empty,
}

#[derive(Debug, Clone)]
pub struct ParseRequest {
    pub directory: PathBuf,
    pub time_from: Option<String>,
    pub time_to: Option<String>,
    /// `Some(0)` or `None` returns everything.
    pub limit: Option<usize>,
    pub sort_by: SortOrder,
    pub use_cache: bool,
}

impl ParseRequest {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            time_from: None,
            time_to: None,
            limit: Some(DEFAULT_PARSE_LIMIT),
            sort_by: SortOrder::Timestamp,
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub directory: PathBuf,
    pub keyword: String,
    pub time_from: Option<String>,
    pub time_to: Option<String>,
    pub limit: Option<usize>,
    pub use_cache: bool,
}

impl SearchRequest {
    pub fn new(directory: impl Into<PathBuf>, keyword: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            keyword: keyword.into(),
            time_from: None,
            time_to: None,
            limit: Some(DEFAULT_SEARCH_LIMIT),
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub events: Vec<Map<String, Value>>,
    pub total_matches: usize,
    pub origin: EventOrigin,
    /// Set when fresh results could not be written back to the cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsResponse {
    #[serde(flatten)]
    pub statistics: EventStatistics,
    pub origin: EventOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_warning: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub total_events: u64,
    pub total_snapshots: u64,
    pub cache_size_bytes: u64,
    pub unique_app_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearConfirmation {
    pub status: String,
    pub message: String,
}

struct LoadedEvents {
    events: Vec<Event>,
    origin: EventOrigin,
    cache_warning: Option<String>,
}

pub struct JumpListService {
    store: CacheStore,
    parser: Box<dyn ArtifactParser>,
    normalizer: Normalizer,
}

impl JumpListService {
    pub fn new(config: &Config) -> Result<Self> {
        let store = CacheStore::open(config.cache_path.clone())?;
        let parser = JleCmdParser::new(config.locator(), config.parser_timeout());
        Ok(Self::with_parts(store, Box::new(parser)))
    }

    pub fn with_parts(store: CacheStore, parser: Box<dyn ArtifactParser>) -> Self {
        Self {
            store,
            parser,
            normalizer: Normalizer::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Events for `directory`, filtered, sorted and limited.
    pub fn parse(&self, request: &ParseRequest) -> Result<QueryResponse> {
        let query = EventQuery {
            time_range: TimeRange::parse(
                request.time_from.as_deref(),
                request.time_to.as_deref(),
            )?,
            keyword: None,
            sort: request.sort_by,
            limit: request.limit,
        };
        self.respond(&request.directory, request.use_cache, &query)
    }

    /// Events whose target path contains `keyword`, newest first.
    pub fn search(&self, request: &SearchRequest) -> Result<QueryResponse> {
        let query = EventQuery {
            time_range: TimeRange::parse(
                request.time_from.as_deref(),
                request.time_to.as_deref(),
            )?,
            keyword: Some(request.keyword.clone()),
            sort: SortOrder::Timestamp,
            limit: request.limit,
        };
        self.respond(&request.directory, request.use_cache, &query)
    }

    /// Aggregates over every event of the directory, unlimited.
    pub fn statistics(&self, directory: &Path, use_cache: bool) -> Result<StatisticsResponse> {
        let loaded = self.load_events(directory, use_cache)?;
        Ok(StatisticsResponse {
            statistics: EventStatistics::from_events(&loaded.events),
            origin: loaded.origin,
            cache_warning: loaded.cache_warning,
        })
    }

    pub fn cache_info(&self) -> Result<CacheInfo> {
        let stats = self.store.statistics()?;
        Ok(CacheInfo {
            total_events: stats.total_events,
            total_snapshots: stats.total_snapshots,
            cache_size_bytes: stats.store_size_bytes,
            unique_app_count: stats.unique_app_count,
        })
    }

    pub fn cache_clear(&self) -> Result<ClearConfirmation> {
        self.store.clear()?;
        Ok(ClearConfirmation {
            status: "success".to_string(),
            message: "Cache cleared".to_string(),
        })
    }

    fn respond(
        &self,
        directory: &Path,
        use_cache: bool,
        query: &EventQuery,
    ) -> Result<QueryResponse> {
        let loaded = self.load_events(directory, use_cache)?;
        let outcome = query.run(loaded.events);

        Ok(QueryResponse {
            events: outcome.events.iter().map(Event::projection).collect(),
            total_matches: outcome.total_matches,
            origin: loaded.origin,
            cache_warning: loaded.cache_warning,
        })
    }

    fn load_events(&self, directory: &Path, use_cache: bool) -> Result<LoadedEvents> {
        if !directory.is_dir() {
            return Err(JumpListError::DirectoryNotFound(directory.to_path_buf()));
        }

        if !use_cache {
            return match self.store.oracle().fingerprint(directory) {
                Ok(None) => Ok(empty(directory)),
                _ => Ok(LoadedEvents {
                    events: self.parse_fresh(directory)?,
                    origin: EventOrigin::Parsed,
                    cache_warning: None,
                }),
            };
        }

        let fingerprint = match self.store.probe(directory) {
            CacheProbe::NoData => return Ok(empty(directory)),
            CacheProbe::Hit(events) => {
                return Ok(LoadedEvents {
                    events,
                    origin: EventOrigin::Cache,
                    cache_warning: None,
                })
            }
            CacheProbe::Miss { fingerprint } => fingerprint,
        };

        let events = self.parse_fresh(directory)?;
        let cache_warning = match fingerprint {
            Some(fingerprint) if !events.is_empty() => self
                .store
                .replace(directory, &fingerprint, &events)
                .err()
                .map(|err| {
                    log_warn!("Warning: Failed to save cache: {err}");
                    err.to_string()
                }),
            Some(_) => None,
            None => Some(
                "directory could not be fingerprinted; results were not cached".to_string(),
            ),
        };

        Ok(LoadedEvents {
            events,
            origin: EventOrigin::Parsed,
            cache_warning,
        })
    }

    fn parse_fresh(&self, directory: &Path) -> Result<Vec<Event>> {
        let table = self.parser.parse_directory(directory)?;
        let report = self.normalizer.normalize_table(&table);
        log_info!(
            "Normalized {} events from {} ({} warnings)",
            report.events.len(),
            directory.display(),
            report.warnings.len()
        );
        Ok(report.events)
    }
}

fn empty(directory: &Path) -> LoadedEvents {
    log_info!("No JumpList files found in {}", directory.display());
    LoadedEvents {
        events: Vec::new(),
        origin: EventOrigin::Empty,
        cache_warning: None,
    }
}
