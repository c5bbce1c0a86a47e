use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{invalid_column, to_u64},
};
use crate::models::{Event, EventDraft};

fn row_to_event(row: &Row) -> Result<Event, rusqlite::Error> {
    let file_size: Option<i64> = row.get("file_size")?;
    let file_size = file_size
        .map(|size| to_u64(size, "file_size"))
        .transpose()
        .map_err(invalid_column)?;

    let draft = EventDraft {
        source: row.get("source")?,
        artifact: row.get("artifact")?,
        app_id: row.get("app_id")?,
        target_path: row.get("target_path")?,
        target_created_utc: row.get("target_created_utc")?,
        target_modified_utc: row.get("target_modified_utc")?,
        target_accessed_utc: row.get("target_accessed_utc")?,
        file_size,
        machine_id: row.get("machine_id")?,
        volume_serial: row.get("volume_serial")?,
        entry_number: row.get("entry_number")?,
    };

    draft.build().map_err(|err| invalid_column(err.into()))
}

impl Database {
    /// Events owned by the snapshot of `directory_path`, in insertion order.
    pub fn get_events_for_directory(&self, directory_path: &str) -> Result<Vec<Event>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    e.source,
                    e.artifact,
                    e.timestamp_utc,
                    e.app_id,
                    e.target_path,
                    e.target_created_utc,
                    e.target_modified_utc,
                    e.target_accessed_utc,
                    e.file_size,
                    e.machine_id,
                    e.volume_serial,
                    e.entry_number
                FROM events e
                JOIN source_snapshots s ON e.snapshot_id = s.id
                WHERE s.directory_path = ?1
                ORDER BY e.id ASC",
            )?;

            let events_iter = stmt.query_map(params![directory_path], row_to_event)?;

            let mut events = Vec::new();
            for event_result in events_iter {
                events.push(event_result.context("failed to decode cached event")?);
            }

            Ok(events)
        })
    }

    pub fn count_events(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
            to_u64(count, "event count")
        })
    }

    pub fn count_unique_apps(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT app_id) FROM events",
                [],
                |row| row.get(0),
            )?;
            to_u64(count, "unique app count")
        })
    }

    /// Bytes used by the database pages.
    pub fn storage_size_bytes(&self) -> Result<u64> {
        self.execute(|conn| {
            let page_count: i64 = conn.pragma_query_value(None, "page_count", |row| row.get(0))?;
            let page_size: i64 = conn.pragma_query_value(None, "page_size", |row| row.get(0))?;
            to_u64(page_count * page_size, "database size")
        })
    }
}
