// Metric generator - seeds history and synthesizes live points
use crate::application::metrics_store::MetricsStore;
use crate::domain::error::StoreError;
use crate::domain::metric::MetricPoint;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const BASE_LEVEL: f64 = 50.0;

/// Produces synthetic metric points and writes them through the store in
/// atomic batches. After every write it signals the broadcast loop over
/// `data_ready` so updates are pushed on write, not discovered by polling
/// the store on a timer.
pub struct Generator {
    store: Arc<dyn MetricsStore>,
    categories: Vec<String>,
    interval: Duration,
    data_ready: mpsc::Sender<()>,
    // Random-walk level for the line series
    level: Mutex<f64>,
}

impl Generator {
    pub fn new(
        store: Arc<dyn MetricsStore>,
        categories: Vec<String>,
        interval: Duration,
        data_ready: mpsc::Sender<()>,
    ) -> Self {
        Self {
            store,
            categories,
            interval,
            data_ready,
            level: Mutex::new(BASE_LEVEL),
        }
    }

    /// Backdated history: one line point per minute over the window
    /// (inclusive fenceposts, so one hour yields 61 points) plus one bar and
    /// one pie point per category. Written as a single batch; returns the
    /// number of points inserted.
    pub fn seed(&self, hours: u32) -> Result<usize, StoreError> {
        let now = Utc::now();
        let total_minutes = i64::from(hours) * 60;
        let mut rng = rand::thread_rng();
        let mut points = Vec::with_capacity(total_minutes as usize + 1 + 2 * self.categories.len());

        for minutes_back in (0..=total_minutes).rev() {
            let ts = now - ChronoDuration::minutes(minutes_back);
            let value = BASE_LEVEL + rng.gen_range(-15.0..15.0);
            points.push(MetricPoint::line(ts, value));
        }

        for category in &self.categories {
            let ts = now - ChronoDuration::minutes(rng.gen_range(0..=total_minutes));
            points.push(MetricPoint::bar(ts, category.clone(), rng.gen_range(5.0..40.0)));
            let ts = now - ChronoDuration::minutes(rng.gen_range(0..=total_minutes));
            points.push(MetricPoint::pie(ts, category.clone(), rng.gen_range(5.0..40.0)));
        }

        let count = self.store.insert_batch(&points)?;
        self.notify();
        Ok(count)
    }

    /// Seed one window of history iff the store has never seen a point, so
    /// dashboards never render empty on first boot.
    pub fn seed_if_empty(&self, hours: u32) -> Result<Option<usize>, StoreError> {
        if self.store.total_events()? > 0 {
            return Ok(None);
        }
        self.seed(hours).map(Some)
    }

    /// Continuous mode: one line point plus an incremental delta per bar/pie
    /// category, every tick, forever. Runs until the task is aborted.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // first tick completes immediately
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick_once() {
                tracing::error!("generator write failed: {e}");
            }
        }
    }

    fn tick_once(&self) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut rng = rand::thread_rng();

        let value = {
            let mut level = self.level.lock().map_err(|_| StoreError::Poisoned)?;
            *level += rng.gen_range(-4.0..4.0);
            // Keep the walk in a plottable band
            *level = level.clamp(BASE_LEVEL - 40.0, BASE_LEVEL + 40.0);
            *level
        };

        let mut points = Vec::with_capacity(1 + 2 * self.categories.len());
        points.push(MetricPoint::line(now, value));
        for category in &self.categories {
            points.push(MetricPoint::bar(now, category.clone(), rng.gen_range(0.5..5.0)));
            points.push(MetricPoint::pie(now, category.clone(), rng.gen_range(0.5..5.0)));
        }

        self.store.insert_batch(&points)?;
        self.notify();
        Ok(())
    }

    fn notify(&self) {
        // A full channel means a broadcast is already pending; updates coalesce.
        let _ = self.data_ready.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite_store::SqliteStore;

    fn generator(store: Arc<dyn MetricsStore>) -> (Arc<Generator>, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(8);
        let categories = vec!["search".to_string(), "graph".to_string()];
        (
            Arc::new(Generator::new(store, categories, Duration::from_secs(2), tx)),
            rx,
        )
    }

    #[test]
    fn test_seed_one_hour_density() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let (generator, mut rx) = generator(store.clone());

        let count = generator.seed(1).unwrap();
        // 61 line points plus one bar and one pie point per category
        assert_eq!(count, 61 + 4);
        assert_eq!(store.total_events().unwrap(), 65);
        assert!(rx.try_recv().is_ok());

        // Snapshot keeps the 10 most recent, ending at the newest timestamp
        let series = store.query_line_series(10).unwrap();
        assert_eq!(series.len(), 10);
        let all = store.query_line_series(100).unwrap();
        assert_eq!(all.len(), 61);
        assert_eq!(
            series.last().unwrap().timestamp,
            all.last().unwrap().timestamp
        );
    }

    #[test]
    fn test_seed_if_empty_runs_once() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let (generator, _rx) = generator(store.clone());

        assert!(generator.seed_if_empty(1).unwrap().is_some());
        assert_eq!(generator.seed_if_empty(1).unwrap(), None);
    }

    #[test]
    fn test_tick_writes_one_batch_and_signals() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let (generator, mut rx) = generator(store.clone());

        generator.tick_once().unwrap();
        // 1 line + 2 bar + 2 pie
        assert_eq!(store.total_events().unwrap(), 5);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
