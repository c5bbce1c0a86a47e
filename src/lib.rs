pub mod cache;
pub mod collaborator;
pub mod config;
pub mod db;
pub mod error;
pub mod freshness;
pub mod models;
pub mod normalizer;
pub mod query;
pub mod service;
pub mod utils;

pub use cache::{CacheProbe, CacheStatistics, CacheStore};
pub use collaborator::{ArtifactParser, CollaboratorLocator, JleCmdParser, RawRow, RawTable};
pub use config::Config;
pub use db::Database;
pub use error::{JumpListError, Result};
pub use freshness::{Fingerprint, Freshness, FreshnessOracle};
pub use models::{Event, EventDraft, SourceSnapshot, ValidationError};
pub use normalizer::{NormalizationReport, NormalizationWarning, Normalizer, TimestampParser};
pub use query::{EventQuery, EventStatistics, SortOrder, TimeRange};
pub use service::{
    CacheInfo, ClearConfirmation, EventOrigin, JumpListService, ParseRequest, QueryResponse,
    SearchRequest, StatisticsResponse,
};
pub use utils::init_logging;
