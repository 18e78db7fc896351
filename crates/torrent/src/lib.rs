//! BitTorrent v1 metainfo parsing
//!
//! Decodes bencoded `.torrent` bytes into the engine's [`TorrentInfo`]
//! shape: file list with per-file piece ranges, the SHA-1 info hash,
//! and the announce domains. The engine never re-hashes payload data
//! or rewrites info dictionaries; this crate is read-only over the
//! wire format.

mod metainfo;

pub use metainfo::{parse_torrent, TorrentParseError};
