//! # tandem-api
//!
//! HTTP API layer for Tandem built on Axum.
//!
//! Provides the presence and session endpoints, the WebSocket feeds,
//! bearer-token extraction, request logging, CORS and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
