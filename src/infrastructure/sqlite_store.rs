// SQLite store implementation
use crate::application::metrics_store::MetricsStore;
use crate::domain::error::StoreError;
use crate::domain::metric::{MetricPoint, MetricType};
use crate::domain::snapshot::{CategoryTotal, LinePoint};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS metric_points (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp_ms INTEGER NOT NULL,
    metric_type TEXT NOT NULL CHECK (metric_type IN ('line', 'bar', 'pie')),
    category TEXT,
    value REAL NOT NULL,
    metadata TEXT
);
CREATE INDEX IF NOT EXISTS idx_points_type_ts ON metric_points (metric_type, timestamp_ms);
CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
INSERT OR IGNORE INTO counters (name, value) VALUES ('total_events', 0);
";

/// Embedded store. One connection behind a mutex: every operation runs as a
/// single statement or transaction while holding the lock, so readers never
/// see a half-applied batch and `total_events` only moves in whole batches.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn validate(point: &MetricPoint) -> Result<(), StoreError> {
        match (point.metric_type, point.category.is_some()) {
            (MetricType::Line, true) => Err(StoreError::InvalidPoint(
                "line points must not carry a category".to_string(),
            )),
            (MetricType::Bar | MetricType::Pie, false) => Err(StoreError::InvalidPoint(
                format!("{} points require a category", point.metric_type.as_str()),
            )),
            _ => Ok(()),
        }
    }

    fn insert_in_tx(tx: &rusqlite::Transaction<'_>, point: &MetricPoint) -> Result<i64, StoreError> {
        Self::validate(point)?;
        tx.execute(
            "INSERT INTO metric_points (timestamp_ms, metric_type, category, value, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                point.timestamp.timestamp_millis(),
                point.metric_type.as_str(),
                point.category,
                point.value,
                point.metadata,
            ],
        )?;
        tx.execute(
            "UPDATE counters SET value = value + 1 WHERE name = 'total_events'",
            [],
        )?;
        Ok(tx.last_insert_rowid())
    }
}

fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

impl MetricsStore for SqliteStore {
    fn insert(&self, point: &MetricPoint) -> Result<i64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = Self::insert_in_tx(&tx, point)?;
        tx.commit()?;
        Ok(id)
    }

    fn insert_batch(&self, points: &[MetricPoint]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for point in points {
            // Any failure drops the transaction uncommitted: all or nothing.
            Self::insert_in_tx(&tx, point)?;
        }
        tx.commit()?;
        Ok(points.len())
    }

    fn query_line_series(&self, limit: usize) -> Result<Vec<LinePoint>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT timestamp_ms, value FROM metric_points
             WHERE metric_type = 'line'
             ORDER BY timestamp_ms DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(LinePoint {
                timestamp: ms_to_datetime(row.get(0)?),
                value: row.get(1)?,
            })
        })?;

        let mut points = rows.collect::<Result<Vec<_>, _>>()?;
        // Newest-first from the index; the contract is ascending output.
        points.reverse();
        Ok(points)
    }

    fn query_aggregates(&self, metric_type: MetricType) -> Result<Vec<CategoryTotal>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT category, SUM(value) FROM metric_points
             WHERE metric_type = ?1 AND category IS NOT NULL
             GROUP BY category
             ORDER BY category",
        )?;
        let rows = stmt.query_map(params![metric_type.as_str()], |row| {
            Ok(CategoryTotal {
                category: row.get(0)?,
                total: row.get(1)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn total_events(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT value FROM counters WHERE name = 'total_events'",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn cleanup(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM metric_points WHERE timestamp_ms < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        Ok(deleted as u64)
    }
}
