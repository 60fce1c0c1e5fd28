//! PostgreSQL persistence adapter for the session store port.

mod diesel_session_store;
mod models;
mod pool;
mod schema;

pub use diesel_session_store::DieselSessionStore;
pub use pool::{DbPool, PoolConfig, PoolError};
