//! In-memory state store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reseed_core::{
    AutomationSettings, FeedItemMemory, IndexerCooldown, Result, RunSummary, StateStore,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory store mirroring the persistence contract
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    pub settings: Arc<Mutex<AutomationSettings>>,
    pub feed_items: Arc<Mutex<HashMap<(String, i32), FeedItemMemory>>>,
    pub cooldowns: Arc<Mutex<HashMap<i32, IndexerCooldown>>>,
    pub runs: Arc<Mutex<Vec<RunSummary>>>,
}

impl MemoryStateStore {
    pub fn new(settings: AutomationSettings) -> Self {
        Self {
            settings: Arc::new(Mutex::new(settings)),
            ..Default::default()
        }
    }

    pub fn feed_item(&self, guid: &str, indexer_id: i32) -> Option<FeedItemMemory> {
        self.feed_items
            .lock()
            .unwrap()
            .get(&(guid.to_string(), indexer_id))
            .cloned()
    }

    pub fn recorded_runs(&self) -> Vec<RunSummary> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load_automation_settings(&self) -> Result<AutomationSettings> {
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn get_feed_item(&self, guid: &str, indexer_id: i32) -> Result<Option<FeedItemMemory>> {
        Ok(self
            .feed_items
            .lock()
            .unwrap()
            .get(&(guid.to_string(), indexer_id))
            .cloned())
    }

    async fn upsert_feed_item(&self, item: &FeedItemMemory) -> Result<()> {
        self.feed_items
            .lock()
            .unwrap()
            .insert((item.guid.clone(), item.indexer_id), item.clone());
        Ok(())
    }

    async fn prune_feed_items(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let mut items = self.feed_items.lock().unwrap();
        let before = items.len();
        items.retain(|_, item| item.last_seen_at >= older_than);
        Ok((before - items.len()) as u64)
    }

    async fn list_rate_limit_cooldowns(&self) -> Result<Vec<IndexerCooldown>> {
        Ok(self.cooldowns.lock().unwrap().values().cloned().collect())
    }

    async fn upsert_rate_limit_cooldown(&self, cooldown: &IndexerCooldown) -> Result<()> {
        self.cooldowns
            .lock()
            .unwrap()
            .insert(cooldown.indexer_id, cooldown.clone());
        Ok(())
    }

    async fn record_run(&self, summary: &RunSummary) -> Result<()> {
        self.runs.lock().unwrap().push(summary.clone());
        Ok(())
    }
}
