// Poll transport - fixed-cadence snapshot fetching with an in-flight guard
use crate::domain::error::TransportError;
use crate::domain::snapshot::{DashboardSnapshot, PollResponse};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Fetches one snapshot from the pull endpoint. A trait seam so the loop can
/// be driven by a fake in tests.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self) -> Result<DashboardSnapshot, TransportError>;
}

pub struct HttpSnapshotFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch(&self) -> Result<DashboardSnapshot, TransportError> {
        let response = self.client.get(&self.url).send().await?;
        let body: PollResponse = response.json().await?;
        if !body.success {
            return Err(TransportError::Rejected(
                body.error.unwrap_or_else(|| "unknown server error".to_string()),
            ));
        }
        body.data
            .ok_or_else(|| TransportError::Rejected("response carried no snapshot".to_string()))
    }
}

pub type SnapshotCallback = Arc<dyn Fn(DashboardSnapshot) + Send + Sync>;

type PendingFetch = Pin<Box<dyn Future<Output = Result<DashboardSnapshot, TransportError>> + Send>>;

async fn resolve(pending: &mut Option<PendingFetch>) -> Result<DashboardSnapshot, TransportError> {
    match pending.as_mut() {
        Some(fetch) => fetch.await,
        // Unreachable behind the select guard; parks forever rather than panics
        None => futures::future::pending().await,
    }
}

/// Fixed-interval poll loop. A tick that lands while a fetch is still in
/// flight is a no-op, so at most one request is ever outstanding. Failures
/// are logged and the cadence continues unchanged: no backoff, no retry
/// budget. Runs until the owning task is aborted, which also drops (and so
/// cancels) any in-flight fetch.
pub async fn run_poll_loop(
    fetcher: Arc<dyn SnapshotFetcher>,
    period: Duration,
    on_snapshot: SnapshotCallback,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut pending: Option<PendingFetch> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if pending.is_none() {
                    let fetcher = fetcher.clone();
                    pending = Some(Box::pin(async move { fetcher.fetch().await }));
                }
            }
            result = resolve(&mut pending), if pending.is_some() => {
                pending = None;
                match result {
                    Ok(snapshot) => on_snapshot(snapshot),
                    Err(e) => tracing::warn!("poll fetch failed: {e}"),
                }
            }
        }
    }
}
