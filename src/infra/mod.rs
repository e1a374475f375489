//! Infrastructure adapters and runtime bootstrap.

mod atomic;
pub mod content;
pub mod error;
pub mod http;
pub mod telemetry;
pub mod views;
