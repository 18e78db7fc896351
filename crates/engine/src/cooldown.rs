//! Persisted indexer cooldowns
//!
//! Rate-limited indexers are suppressed until their window passes.
//! The registry is shared across runs and survives restarts through
//! the state store.

use chrono::{Duration, Utc};
use reseed_core::{IndexerCooldown, StateStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct CooldownRegistry {
    store: Arc<dyn StateStore>,
    entries: RwLock<HashMap<i32, IndexerCooldown>>,
}

impl CooldownRegistry {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Load persisted cooldowns, dropping any that already expired
    pub async fn load(&self) -> reseed_core::Result<()> {
        let now = Utc::now();
        let persisted = self.store.list_rate_limit_cooldowns().await?;
        let mut entries = self.entries.write().await;
        entries.clear();
        for cooldown in persisted {
            if cooldown.is_active(now) {
                entries.insert(cooldown.indexer_id, cooldown);
            }
        }
        info!(active = entries.len(), "loaded indexer cooldowns");
        Ok(())
    }

    /// Whether queries to this indexer are currently suppressed
    pub async fn is_cooling(&self, indexer_id: i32) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(&indexer_id)
            .map(|c| c.is_active(Utc::now()))
            .unwrap_or(false)
    }

    /// Register a new cooldown window and persist it. Persistence
    /// failures are logged, not propagated; the in-memory window still
    /// protects the current process.
    pub async fn register(&self, indexer_id: i32, cooldown_secs: u64, reason: impl Into<String>) {
        let cooldown = IndexerCooldown {
            indexer_id,
            resume_at: Utc::now() + Duration::seconds(cooldown_secs as i64),
            cooldown_secs,
            reason: reason.into(),
        };
        if let Err(err) = self.store.upsert_rate_limit_cooldown(&cooldown).await {
            warn!(indexer_id, %err, "failed to persist indexer cooldown");
        }
        info!(
            indexer_id,
            cooldown_secs,
            reason = %cooldown.reason,
            "indexer placed on cooldown"
        );
        self.entries.write().await.insert(indexer_id, cooldown);
    }
}
