// Store trait for metric point persistence
use crate::domain::error::StoreError;
use crate::domain::metric::{MetricPoint, MetricType};
use crate::domain::snapshot::{CategoryTotal, LinePoint};
use chrono::{DateTime, Utc};

/// Write/read contract of the metrics store. Operations are synchronous: the
/// backing store is local and embedded, so calls may block briefly but are
/// never treated as long-running work needing cancellation.
pub trait MetricsStore: Send + Sync {
    /// Append one point; returns the assigned id (monotonically increasing).
    fn insert(&self, point: &MetricPoint) -> Result<i64, StoreError>;

    /// Append all points in one transaction. Either every point becomes
    /// visible or none does; a concurrent reader never observes a partial
    /// batch, including through `total_events`.
    fn insert_batch(&self, points: &[MetricPoint]) -> Result<usize, StoreError>;

    /// The most recent `limit` line points, ascending by timestamp.
    fn query_line_series(&self, limit: usize) -> Result<Vec<LinePoint>, StoreError>;

    /// One row per category with the sum of all values for that
    /// (metric_type, category) pair, ordered by category.
    fn query_aggregates(&self, metric_type: MetricType) -> Result<Vec<CategoryTotal>, StoreError>;

    /// Count of all points ever stored. A running counter: retention cleanup
    /// does not decrease it.
    fn total_events(&self) -> Result<u64, StoreError>;

    /// Delete every point with `timestamp < cutoff` in a single statement;
    /// returns the number deleted.
    fn cleanup(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
