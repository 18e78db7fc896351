//! Core domain models and business rules for the Reseed cross-seeding
//! engine.
//!
//! This crate contains the fundamental domain models (releases, torrent
//! shapes, injection outcomes, automation state), the shared error
//! taxonomy, retry helpers, and the traits through which the engine
//! consumes its external collaborators (qBittorrent, Torznab indexers,
//! state storage).

pub mod domain;
pub mod error;
pub mod models;
pub mod retry;

// Re-export core types
pub use domain::*;
pub use error::*;
pub use models::*;
pub use retry::{retry_with_backoff, RetryConfig, RetryPolicy};
