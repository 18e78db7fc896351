//! Collaborator contracts
//!
//! The engine consumes qBittorrent, the Torznab search layer, and
//! persistent state through these traits; it never depends on any
//! particular transport.

mod services;

pub use services::*;
