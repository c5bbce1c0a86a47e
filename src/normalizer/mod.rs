//! Maps raw JLECmd rows into validated [`Event`]s.
//!
//! Bad rows never fail the batch: each one is logged, reported as a
//! [`NormalizationWarning`] and skipped.

pub mod timestamp;

use thiserror::Error;

use crate::collaborator::{RawRow, RawTable};
use crate::log_warn;
use crate::models::{Event, EventDraft, ValidationError};

pub use timestamp::{ParsedTimestamp, TimestampParser};

const ENABLE_LOGS: bool = true;

/// JLECmd CSV column names.
pub mod columns {
    pub const PATH: &str = "Path";
    pub const TARGET_CREATED: &str = "TargetCreated";
    pub const TARGET_MODIFIED: &str = "TargetModified";
    pub const TARGET_ACCESSED: &str = "TargetAccessed";
    pub const APP_ID: &str = "AppId";
    pub const FILE_SIZE: &str = "FileSize";
    pub const MACHINE_ID: &str = "MachineID";
    pub const VOLUME_SERIAL: &str = "VolumeSerialNumber";
    pub const ENTRY_NUMBER: &str = "EntryNumber";
}

/// Primary timestamp precedence.
const PRIMARY_TIMESTAMP_COLUMNS: [&str; 3] = [
    columns::TARGET_MODIFIED,
    columns::TARGET_ACCESSED,
    columns::TARGET_CREATED,
];

/// A row-level problem. `row` is the 1-based data row number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationWarning {
    #[error("row {row}: empty path, skipped")]
    EmptyPath { row: usize },

    #[error("row {row}: no modified, accessed or created timestamp, skipped")]
    MissingTimestamp { row: usize },

    #[error("row {row}: could not parse {field} timestamp {value:?}, skipped")]
    UnparseablePrimary {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: could not parse {field} timestamp {value:?}, kept as-is")]
    UnparseableField {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: {source}")]
    Invalid {
        row: usize,
        #[source]
        source: ValidationError,
    },
}

impl NormalizationWarning {
    /// Whether the row was dropped because of this warning.
    pub fn skipped_row(&self) -> bool {
        !matches!(self, NormalizationWarning::UnparseableField { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationReport {
    pub events: Vec<Event>,
    pub warnings: Vec<NormalizationWarning>,
}

impl NormalizationReport {
    pub fn skipped_rows(&self) -> usize {
        self.warnings.iter().filter(|w| w.skipped_row()).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    timestamps: TimestampParser,
}

impl Normalizer {
    pub fn new(timestamps: TimestampParser) -> Self {
        Self { timestamps }
    }

    pub fn normalize_table(&self, table: &RawTable) -> NormalizationReport {
        let mut report = NormalizationReport::default();

        for (index, row) in table.rows.iter().enumerate() {
            let row_number = index + 1;
            if let Some(event) = self.normalize_row(row_number, row, &mut report.warnings) {
                report.events.push(event);
            }
        }

        for warning in &report.warnings {
            log_warn!("Warning: {warning}");
        }
        if !report.warnings.is_empty() {
            log_warn!(
                "Normalized {} of {} rows ({} skipped)",
                report.events.len(),
                table.len(),
                report.skipped_rows()
            );
        }

        report
    }

    /// Zero or one event for a row; problems are pushed onto `warnings`.
    pub fn normalize_row(
        &self,
        row_number: usize,
        row: &RawRow,
        warnings: &mut Vec<NormalizationWarning>,
    ) -> Option<Event> {
        let Some(path) = row.get(columns::PATH) else {
            warnings.push(NormalizationWarning::EmptyPath { row: row_number });
            return None;
        };

        let Some(primary) = PRIMARY_TIMESTAMP_COLUMNS
            .into_iter()
            .find(|column| row.get(column).is_some())
        else {
            warnings.push(NormalizationWarning::MissingTimestamp { row: row_number });
            return None;
        };

        let mut draft = EventDraft::new(path);
        for column in PRIMARY_TIMESTAMP_COLUMNS {
            let Some(parsed) = row.get(column).and_then(|v| self.timestamps.normalize(v)) else {
                continue;
            };

            if let ParsedTimestamp::Raw(value) = &parsed {
                if column == primary {
                    warnings.push(NormalizationWarning::UnparseablePrimary {
                        row: row_number,
                        field: column,
                        value: value.clone(),
                    });
                    return None;
                }
                warnings.push(NormalizationWarning::UnparseableField {
                    row: row_number,
                    field: column,
                    value: value.clone(),
                });
            }

            let slot = match column {
                columns::TARGET_MODIFIED => &mut draft.target_modified_utc,
                columns::TARGET_ACCESSED => &mut draft.target_accessed_utc,
                _ => &mut draft.target_created_utc,
            };
            *slot = Some(parsed.into_string());
        }

        draft.app_id = row.get(columns::APP_ID).map(str::to_string);
        // Sizes must round-trip through a signed SQLite INTEGER.
        draft.file_size = parse_int::<i64>(row.get(columns::FILE_SIZE))
            .and_then(|size| u64::try_from(size).ok());
        draft.machine_id = row.get(columns::MACHINE_ID).map(str::to_string);
        draft.volume_serial = row.get(columns::VOLUME_SERIAL).map(str::to_string);
        draft.entry_number = parse_int(row.get(columns::ENTRY_NUMBER));

        match draft.build() {
            Ok(event) => Some(event),
            Err(source) => {
                warnings.push(NormalizationWarning::Invalid {
                    row: row_number,
                    source,
                });
                None
            }
        }
    }
}

/// Empty or non-numeric values are absent, not errors.
fn parse_int<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}
