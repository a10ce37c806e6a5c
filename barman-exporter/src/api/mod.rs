//! HTTP exposition of the collected gauges.

pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
