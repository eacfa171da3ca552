//! HTTP + WebSocket surface of the dashboard server.

pub mod models;
pub mod server;
pub mod ws;

pub use server::router;
