//! Automation settings, feed memory and run records

use crate::models::candidate::InjectionOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operator configuration for the automation loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationSettings {
    pub enabled: bool,
    pub run_interval_minutes: u32,
    pub start_paused: bool,
    /// Category applied to injected torrents (None keeps the matched
    /// torrent's category)
    pub category: Option<String>,
    pub rss_automation_tags: Vec<String>,
    pub seeded_search_tags: Vec<String>,
    pub completion_search_tags: Vec<String>,
    pub webhook_tags: Vec<String>,
    /// Instances considered during a run (empty = all)
    pub target_instance_ids: Vec<i32>,
    /// Indexers queried during a run (empty = all)
    pub target_indexer_ids: Vec<i32>,
    pub max_results_per_run: usize,
    /// Tolerated total-size difference between source and candidate,
    /// percent, clamped to 0-100
    pub size_mismatch_tolerance_percent: f64,
    /// Opt torrents in `error`/`missingFiles` states back into
    /// candidate enumeration
    pub recover_errored_torrents: bool,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            run_interval_minutes: 30,
            start_paused: false,
            category: None,
            rss_automation_tags: Vec::new(),
            seeded_search_tags: Vec::new(),
            completion_search_tags: Vec::new(),
            webhook_tags: Vec::new(),
            target_instance_ids: Vec::new(),
            target_indexer_ids: Vec::new(),
            max_results_per_run: 50,
            size_mismatch_tolerance_percent: 5.0,
            recover_errored_torrents: false,
        }
    }
}

impl AutomationSettings {
    /// Tolerance as a 0.0-1.0 fraction, clamped
    pub fn size_tolerance_fraction(&self) -> f64 {
        self.size_mismatch_tolerance_percent.clamp(0.0, 100.0) / 100.0
    }
}

/// Processing state of a remembered feed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedItemStatus {
    Pending,
    Processed,
    Failed,
}

/// Persistent memory of a feed item, keyed by `(guid, indexer_id)`.
///
/// Entries expire after a retention window owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItemMemory {
    pub guid: String,
    pub indexer_id: i32,
    pub title: String,
    pub last_status: FeedItemStatus,
    pub last_run_id: Option<Uuid>,
    pub info_hash: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl FeedItemMemory {
    pub fn new(guid: impl Into<String>, indexer_id: i32, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            guid: guid.into(),
            indexer_id,
            title: title.into(),
            last_status: FeedItemStatus::Pending,
            last_run_id: None,
            info_hash: None,
            first_seen_at: now,
            last_seen_at: now,
        }
    }
}

/// Persisted cooldown window for a rate-limited indexer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerCooldown {
    pub indexer_id: i32,
    pub resume_at: DateTime<Utc>,
    pub cooldown_secs: u64,
    pub reason: String,
}

impl IndexerCooldown {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.resume_at > now
    }
}

/// Terminal state of an automation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Completed,
    Failed,
    Canceled,
}

/// One candidate's outcome inside a run's result log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub instance_id: i32,
    pub indexer_id: Option<i32>,
    pub source_name: String,
    pub candidate_name: String,
    pub outcome: InjectionOutcome,
    pub recorded_at: DateTime<Utc>,
}

/// Result log of a single automation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: RunState,
    pub searched: usize,
    pub matched: usize,
    pub injected: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: Vec<CandidateRecord>,
    pub error: Option<String>,
}

impl RunSummary {
    pub fn begin() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            state: RunState::Completed,
            searched: 0,
            matched: 0,
            injected: 0,
            skipped: 0,
            failed: 0,
            records: Vec::new(),
            error: None,
        }
    }

    pub fn finish(&mut self, state: RunState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }
}
