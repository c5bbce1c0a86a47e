use anyhow::{bail, Context, Result};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{invalid_column, parse_datetime, parse_optional_datetime, projected, to_i64, to_u64},
};
use crate::models::{Event, SourceSnapshot};

/// Event columns written from [`Event::projection`], in insert order.
const EVENT_COLUMNS: [&str; 12] = [
    "source",
    "artifact",
    "timestamp_utc",
    "app_id",
    "target_path",
    "target_created_utc",
    "target_modified_utc",
    "target_accessed_utc",
    "file_size",
    "machine_id",
    "volume_serial",
    "entry_number",
];

fn row_to_snapshot(row: &Row) -> Result<SourceSnapshot, rusqlite::Error> {
    let fingerprinted_at: String = row.get("fingerprinted_at")?;
    let latest_modified: Option<String> = row.get("latest_modified_utc")?;
    let file_count: i64 = row.get("file_count")?;

    Ok(SourceSnapshot {
        id: row.get("id")?,
        directory_path: row.get("directory_path")?,
        content_fingerprint: row.get("content_fingerprint")?,
        file_count: to_u64(file_count, "file_count").map_err(invalid_column)?,
        latest_modified_utc: parse_optional_datetime(latest_modified, "latest_modified_utc")
            .map_err(invalid_column)?,
        fingerprinted_at: parse_datetime(&fingerprinted_at, "fingerprinted_at")
            .map_err(invalid_column)?,
    })
}

impl Database {
    pub fn get_snapshot(&self, directory_path: &str) -> Result<Option<SourceSnapshot>> {
        self.execute(|conn| {
            let snapshot = conn
                .query_row(
                    "SELECT id, directory_path, content_fingerprint, file_count,
                            latest_modified_utc, fingerprinted_at
                     FROM source_snapshots
                     WHERE directory_path = ?1",
                    params![directory_path],
                    row_to_snapshot,
                )
                .optional()
                .context("failed to load snapshot")?;
            Ok(snapshot)
        })
    }

    /// Swap the snapshot for `snapshot.directory_path` and all of its events
    /// in one transaction. Any failure rolls back to the previous snapshot.
    pub fn replace_snapshot(&self, snapshot: &SourceSnapshot, events: &[Event]) -> Result<usize> {
        if events.is_empty() {
            bail!("refusing to cache an empty event set");
        }

        self.execute(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM events WHERE snapshot_id IN (
                    SELECT id FROM source_snapshots WHERE directory_path = ?1
                 )",
                params![snapshot.directory_path],
            )
            .context("failed to delete previous events")?;
            tx.execute(
                "DELETE FROM source_snapshots WHERE directory_path = ?1",
                params![snapshot.directory_path],
            )
            .context("failed to delete previous snapshot")?;

            tx.execute(
                "INSERT INTO source_snapshots (
                    id,
                    directory_path,
                    content_fingerprint,
                    file_count,
                    latest_modified_utc,
                    fingerprinted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    snapshot.id,
                    snapshot.directory_path,
                    snapshot.content_fingerprint,
                    to_i64(snapshot.file_count)?,
                    snapshot.latest_modified_utc.map(|dt| dt.to_rfc3339()),
                    snapshot.fingerprinted_at.to_rfc3339(),
                ],
            )
            .context("failed to insert snapshot")?;

            {
                let placeholders = (2..=EVENT_COLUMNS.len() + 1)
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "INSERT INTO events (snapshot_id, {}) VALUES (?1, {placeholders})",
                    EVENT_COLUMNS.join(", ")
                );
                let mut stmt = tx.prepare(&sql)?;

                for event in events {
                    let projection = event.projection();
                    let mut values = vec![rusqlite::types::Value::Text(snapshot.id.clone())];
                    for column in EVENT_COLUMNS {
                        values.push(projected(&projection, column).with_context(|| {
                            format!("cannot store event for {}", event.target_path())
                        })?);
                    }
                    stmt.execute(params_from_iter(values)).with_context(|| {
                        format!("failed to insert event for {}", event.target_path())
                    })?;
                }
            }

            tx.commit().context("failed to commit snapshot replacement")?;
            Ok(events.len())
        })
    }

    pub fn count_snapshots(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM source_snapshots", [], |row| row.get(0))?;
            to_u64(count, "snapshot count")
        })
    }

    /// Delete every snapshot and event.
    pub fn clear_snapshots(&self) -> Result<()> {
        self.execute(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM events", [])?;
            tx.execute("DELETE FROM source_snapshots", [])?;
            tx.commit().context("failed to clear cache")?;
            Ok(())
        })
    }
}
