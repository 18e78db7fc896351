//! Torznab query and result shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A query against the Torznab search service.
///
/// Season and episode ride as structured parameters when the release
/// name carried them; otherwise only the cleaned free-text query is
/// set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorznabQuery {
    pub query: String,
    pub season: Option<i32>,
    pub episode: Option<i32>,
}

/// One search result row from an indexer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub guid: String,
    pub indexer_id: i32,
    pub indexer_name: String,
    pub title: String,
    pub download_url: String,
    pub size: Option<u64>,
    pub seeders: Option<u32>,
    pub leechers: Option<u32>,
    pub info_hash: Option<String>,
    pub categories: Vec<i32>,
    pub published: Option<DateTime<Utc>>,
}

/// One item from an indexer's RSS feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub guid: String,
    pub indexer_id: i32,
    pub title: String,
    pub download_url: String,
    pub size: Option<u64>,
    pub categories: Vec<i32>,
    pub published: Option<DateTime<Utc>>,
}
