//! # tandem-auth
//!
//! Resolves the calling user from an HS256 bearer token. Every presence
//! and session operation is scoped to the identity produced here.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
