pub mod generator;
pub mod metrics_store;
pub mod snapshot_service;
