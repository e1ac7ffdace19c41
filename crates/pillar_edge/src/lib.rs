//! HTTP edge for onboarding example generation.

pub mod config;
pub mod handler;

pub use config::{ConfigError, EdgeConfig};
pub use handler::{build_router, AppState, EdgeError};
