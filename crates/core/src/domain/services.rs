//! Trait definitions for the engine's external collaborators

use crate::error::Result;
use crate::models::{
    AutomationSettings, FeedItem, FeedItemMemory, IndexerCooldown, RunSummary, SearchResult,
    TorrentProperties, TorznabQuery,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Filter for torrent enumeration on a qBittorrent instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TorrentFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
    /// Restrict to these states (empty = all)
    pub states: Vec<String>,
}

/// One torrent row as reported by a qBittorrent instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientTorrent {
    pub hash: String,
    pub name: String,
    pub state: String,
    pub progress: f64,
    pub size: u64,
    pub save_path: String,
    pub content_path: String,
    pub category: String,
    pub tags: Vec<String>,
    pub auto_managed: bool,
    pub completed_on: Option<DateTime<Utc>>,
}

/// One payload file of a torrent as reported by qBittorrent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientTorrentFile {
    /// Path relative to the save path, `/` separators
    pub name: String,
    pub size: u64,
}

/// Application preferences of a qBittorrent instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPreferences {
    pub save_path: String,
    pub torrent_content_layout: Option<String>,
}

/// A category known to a qBittorrent instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub name: String,
    pub save_path: String,
}

/// Bulk action verbs on torrent hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentAction {
    Resume,
    Pause,
    Recheck,
    Delete,
}

/// Access to qBittorrent instances.
///
/// Implemented outside the engine; all calls may suspend on network
/// I/O and honour cancellation of their caller.
#[async_trait]
pub trait SyncManager: Send + Sync {
    async fn get_torrents(
        &self,
        instance_id: i32,
        filter: &TorrentFilter,
    ) -> Result<Vec<ClientTorrent>>;

    async fn get_torrent_files_batch(
        &self,
        instance_id: i32,
        hashes: &[String],
    ) -> Result<HashMap<String, Vec<ClientTorrentFile>>>;

    /// Returns the first torrent matching any of the given hashes
    async fn has_torrent_by_any_hash(
        &self,
        instance_id: i32,
        hashes: &[String],
    ) -> Result<Option<ClientTorrent>>;

    async fn get_torrent_properties(
        &self,
        instance_id: i32,
        hash: &str,
    ) -> Result<TorrentProperties>;

    async fn get_app_preferences(&self, instance_id: i32) -> Result<ClientPreferences>;

    /// Option keys used by the engine: `savepath`, `autoTMM`,
    /// `category`, `tags`, `contentLayout`, `paused`, `stopped`,
    /// `skip_checking`.
    async fn add_torrent(
        &self,
        instance_id: i32,
        torrent: &[u8],
        options: &HashMap<String, String>,
    ) -> Result<()>;

    async fn bulk_action(
        &self,
        instance_id: i32,
        hashes: &[String],
        action: TorrentAction,
    ) -> Result<()>;

    async fn set_tags(&self, instance_id: i32, hashes: &[String], tags: &[String]) -> Result<()>;

    async fn rename_torrent(&self, instance_id: i32, hash: &str, name: &str) -> Result<()>;

    async fn rename_torrent_file(
        &self,
        instance_id: i32,
        hash: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<()>;

    async fn rename_torrent_folder(
        &self,
        instance_id: i32,
        hash: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<()>;

    async fn get_categories(&self, instance_id: i32) -> Result<HashMap<String, CategoryInfo>>;

    async fn create_category(&self, instance_id: i32, name: &str, save_path: &str) -> Result<()>;
}

/// Access to the Torznab search layer (Jackett, Prowlarr, native
/// endpoints).
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(
        &self,
        indexer_ids: &[i32],
        query: &TorznabQuery,
        categories: &[i32],
    ) -> Result<Vec<SearchResult>>;

    async fn feed(&self, indexer_id: i32) -> Result<Vec<FeedItem>>;

    /// Returns bencoded torrent metainfo bytes
    async fn fetch_torrent(&self, indexer_id: i32, download_url: &str) -> Result<Vec<u8>>;
}

/// Persistent engine state: settings, feed memory, cooldowns, run log.
///
/// The upsert of a feed item is atomic per `(guid, indexer_id)`; two
/// racing runs leave the later write as the final state.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_automation_settings(&self) -> Result<AutomationSettings>;

    async fn get_feed_item(&self, guid: &str, indexer_id: i32) -> Result<Option<FeedItemMemory>>;

    async fn upsert_feed_item(&self, item: &FeedItemMemory) -> Result<()>;

    /// Remove feed items last seen before the cutoff; returns the
    /// number removed
    async fn prune_feed_items(&self, older_than: DateTime<Utc>) -> Result<u64>;

    async fn list_rate_limit_cooldowns(&self) -> Result<Vec<IndexerCooldown>>;

    async fn upsert_rate_limit_cooldown(&self, cooldown: &IndexerCooldown) -> Result<()>;

    async fn record_run(&self, summary: &RunSummary) -> Result<()>;
}
