// Main entry point - wiring and server setup
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pulseboard::application::generator::Generator;
use pulseboard::application::metrics_store::MetricsStore;
use pulseboard::application::snapshot_service::SnapshotService;
use pulseboard::infrastructure::config::load_settings;
use pulseboard::infrastructure::sqlite_store::SqliteStore;
use pulseboard::presentation::app_state::AppState;
use pulseboard::presentation::broadcast::{run_update_loop, BroadcastHub};
use pulseboard::presentation::router;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = load_settings()?;

    if let Some(parent) = Path::new(&settings.store.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store: Arc<dyn MetricsStore> = Arc::new(SqliteStore::open(&settings.store.path)?);
    let snapshots = SnapshotService::new(store.clone(), settings.dashboard.line_series_limit);
    let hub = Arc::new(BroadcastHub::new());

    // Write-completed signal: generator (and seeding) on one end, the
    // broadcast update loop on the other
    let (data_ready_tx, data_ready_rx) = mpsc::channel(64);
    let generator = Arc::new(Generator::new(
        store.clone(),
        settings.generator.categories.clone(),
        Duration::from_secs(settings.generator.interval_seconds),
        data_ready_tx,
    ));

    if let Some(count) = generator.seed_if_empty(settings.generator.seed_hours)? {
        tracing::info!("seeded {count} points into an empty store");
    }

    tokio::spawn(run_update_loop(hub.clone(), snapshots.clone(), data_ready_rx));
    if settings.generator.enabled {
        tokio::spawn(generator.clone().run());
    }

    let state = Arc::new(AppState {
        store,
        snapshots,
        generator,
        hub,
    });
    let router = router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    tracing::info!("starting pulseboard on {addr}");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
