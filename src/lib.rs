// Live-dashboard synchronization service: metrics store, generator,
// websocket push, poll endpoint, and the client-side dual-transport manager.
pub mod application;
pub mod client;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
