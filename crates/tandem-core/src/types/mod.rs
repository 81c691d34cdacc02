//! Core type definitions used across the Tandem workspace.

pub mod id;

pub use id::*;
