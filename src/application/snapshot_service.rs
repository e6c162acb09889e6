// Snapshot service - computes the current dashboard state from the store
use crate::application::metrics_store::MetricsStore;
use crate::domain::error::StoreError;
use crate::domain::metric::MetricType;
use crate::domain::snapshot::DashboardSnapshot;
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct SnapshotService {
    store: Arc<dyn MetricsStore>,
    line_series_limit: usize,
}

impl SnapshotService {
    pub fn new(store: Arc<dyn MetricsStore>, line_series_limit: usize) -> Self {
        Self {
            store,
            line_series_limit,
        }
    }

    /// Compute the full dashboard snapshot. Both transports serve the output
    /// of this one function, so push and pull clients always agree on shape.
    pub fn snapshot(&self) -> Result<DashboardSnapshot, StoreError> {
        let line_series = self.store.query_line_series(self.line_series_limit)?;
        let bar_series = self.store.query_aggregates(MetricType::Bar)?;
        let pie_series = self.store.query_aggregates(MetricType::Pie)?;
        let total_events = self.store.total_events()?;

        Ok(DashboardSnapshot {
            line_series,
            bar_series,
            pie_series,
            total_events,
            last_updated: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metric::MetricPoint;
    use crate::infrastructure::sqlite_store::SqliteStore;
    use chrono::Duration;

    #[test]
    fn test_snapshot_aggregates_by_category() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let now = Utc::now();
        store
            .insert_batch(&[
                MetricPoint::line(now, 1.0),
                MetricPoint::bar(now, "search", 2.0),
                MetricPoint::bar(now, "search", 3.0),
                MetricPoint::bar(now, "graph", 1.0),
                MetricPoint::pie(now, "skills", 5.0),
            ])
            .unwrap();

        let snapshot = SnapshotService::new(store, 10).snapshot().unwrap();
        assert_eq!(snapshot.total_events, 5);
        assert_eq!(snapshot.line_series.len(), 1);

        // Ordered by category, summed per category
        assert_eq!(snapshot.bar_series.len(), 2);
        assert_eq!(snapshot.bar_series[0].category, "graph");
        assert_eq!(snapshot.bar_series[0].total, 1.0);
        assert_eq!(snapshot.bar_series[1].category, "search");
        assert_eq!(snapshot.bar_series[1].total, 5.0);

        assert_eq!(snapshot.pie_series.len(), 1);
        assert_eq!(snapshot.pie_series[0].total, 5.0);
    }

    #[test]
    fn test_snapshot_bounds_line_series_to_most_recent() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let now = Utc::now();
        let points: Vec<_> = (0..30)
            .map(|i| MetricPoint::line(now - Duration::minutes(i), i as f64))
            .collect();
        store.insert_batch(&points).unwrap();

        let snapshot = SnapshotService::new(store, 10).snapshot().unwrap();
        assert_eq!(snapshot.line_series.len(), 10);
        // Ascending, ending at the newest inserted timestamp
        for pair in snapshot.line_series.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        let newest = snapshot.line_series.last().unwrap();
        assert_eq!(newest.value, 0.0);
    }
}
