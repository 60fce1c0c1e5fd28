//! Toolcrib service library.
//!
//! Checkout-session tracking for crib tools: sessions are opened from a
//! photograph of the handed-out kit, reconciled against a photograph of the
//! returned kit, and approved by a person at both ends.

pub mod api;
pub mod doc;
pub mod domain;
pub mod middleware;
pub mod outbound;
pub mod server;

pub use doc::ApiDoc;
pub use middleware::Trace;
