//! HTTP and WebSocket handlers.

pub mod health;
pub mod presence;
pub mod session;
pub mod stream;
