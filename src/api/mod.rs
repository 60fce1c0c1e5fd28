//! Driving HTTP adapter.

pub mod error;
pub mod health;
pub mod recognize;
pub mod sessions;

pub use error::{ApiError, ApiResult};
pub use health::HealthState;
