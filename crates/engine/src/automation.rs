//! Scheduled discovery runs
//!
//! One automation run at a time: enumerate local seed targets, search
//! indexers for alternate releases, dedupe feed items against
//! persistent memory, and push every surviving candidate through the
//! cross-seed pipeline with bounded fan-out.

use crate::cooldown::CooldownRegistry;
use crate::inject::InstanceLinkSettings;
use crate::pipeline::{CrossSeedPipeline, PipelineInput};
use chrono::{Duration as ChronoDuration, Utc};
use reseed_core::{
    retry_with_backoff, AutomationSettings, Candidate, ClientTorrent, CrossSeedRequest, FeedItem,
    FeedItemMemory, FeedItemStatus, InjectionStatus, Release, ReseedError, Result, RetryConfig,
    RetryPolicy, RunState, RunSummary, SearchResult, SearchService, StateStore, SyncManager,
    TorrentFilter, TorrentInfo, TorrentProperties,
};
use reseed_matcher::releases_match;
use reseed_release::{build_search_query, classify, ContentClass, ReleaseCache};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bounded-parallelism and timing knobs for a run
#[derive(Debug, Clone)]
pub struct AutomationLimits {
    /// Concurrent indexer searches
    pub indexer_workers: usize,
    /// Concurrent injections
    pub injection_workers: usize,
    /// Per-indexer search timeout
    pub search_timeout: Duration,
    /// Minutes a pending feed item stays off-limits to other runs
    pub pending_cooldown_minutes: i64,
    /// Days before feed memory expires
    pub feed_retention_days: i64,
    /// Cooldown applied when an indexer rate-limits us
    pub rate_limit_cooldown_secs: u64,
    /// How far back a torrent still counts as recently completed
    pub completion_window_hours: i64,
}

impl Default for AutomationLimits {
    fn default() -> Self {
        Self {
            indexer_workers: 8,
            injection_workers: 4,
            search_timeout: Duration::from_secs(30),
            pending_cooldown_minutes: 30,
            feed_retention_days: 30,
            rate_limit_cooldown_secs: 1800,
            completion_window_hours: 24,
        }
    }
}

struct ActiveRun {
    run_id: Uuid,
    cancel: watch::Sender<bool>,
}

/// A locally-seeded torrent eligible for cross-seeding this run
#[derive(Clone)]
struct SourceTarget {
    candidate: Candidate,
    release: Arc<Release>,
    class: ContentClass,
}

/// One unit of injection work surfaced by discovery
struct DiscoveredCandidate {
    source_index: usize,
    indexer_id: i32,
    guid: Option<String>,
    title: String,
    download_url: String,
    size: Option<u64>,
    /// Tags the trigger source contributes to the injected torrent
    trigger_tags: Vec<String>,
}

pub struct AutomationEngine {
    sync: Arc<dyn SyncManager>,
    search: Arc<dyn SearchService>,
    store: Arc<dyn StateStore>,
    cache: Arc<ReleaseCache>,
    pipeline: Arc<CrossSeedPipeline>,
    cooldowns: Arc<CooldownRegistry>,
    limits: AutomationLimits,
    /// Per-instance link configuration, keyed by instance id
    link_settings: HashMap<i32, InstanceLinkSettings>,
    active: Mutex<Option<ActiveRun>>,
    webhook_queue: Mutex<Vec<FeedItem>>,
}

impl AutomationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sync: Arc<dyn SyncManager>,
        search: Arc<dyn SearchService>,
        store: Arc<dyn StateStore>,
        cache: Arc<ReleaseCache>,
        pipeline: Arc<CrossSeedPipeline>,
        cooldowns: Arc<CooldownRegistry>,
        limits: AutomationLimits,
        link_settings: HashMap<i32, InstanceLinkSettings>,
    ) -> Self {
        Self {
            sync,
            search,
            store,
            cache,
            pipeline,
            cooldowns,
            limits,
            link_settings,
            active: Mutex::new(None),
            webhook_queue: Mutex::new(Vec::new()),
        }
    }

    /// Indexers that rate-limit without a retry-after hint get the
    /// configured default window.
    fn cooldown_secs(&self, retry_after_secs: u64) -> u64 {
        if retry_after_secs > 0 {
            retry_after_secs
        } else {
            self.limits.rate_limit_cooldown_secs
        }
    }

    /// Queue an externally-triggered item for the next run
    pub fn push_webhook_item(&self, item: FeedItem) {
        self.webhook_queue
            .lock()
            .expect("webhook queue poisoned")
            .push(item);
    }

    /// Signal the active run to stop. Returns whether one was active.
    pub fn cancel_run(&self) -> bool {
        let active = self.active.lock().expect("active-run lock poisoned");
        match &*active {
            Some(run) => {
                info!(run_id = %run.run_id, "canceling automation run");
                let _ = run.cancel.send(true);
                true
            }
            None => false,
        }
    }

    /// Drive runs on the configured interval until shutdown flips.
    ///
    /// The interval is re-read from settings each cycle so operators
    /// can retune without a restart; a disabled configuration just
    /// waits out the current interval.
    pub async fn run_scheduler(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let interval_minutes = match self.store.load_automation_settings().await {
                Ok(settings) if settings.enabled => {
                    match self.run_once().await {
                        Ok(_) => {}
                        Err(ReseedError::PreconditionUnmet { reason }) => {
                            debug!(reason, "scheduled run did not start");
                        }
                        Err(err) => warn!(%err, "scheduled automation run failed"),
                    }
                    self.store
                        .load_automation_settings()
                        .await
                        .map(|s| s.run_interval_minutes)
                        .unwrap_or(30)
                }
                Ok(settings) => settings.run_interval_minutes,
                Err(err) => {
                    warn!(%err, "could not load automation settings");
                    30
                }
            };

            let sleep = Duration::from_secs(u64::from(interval_minutes.max(1)) * 60);
            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("automation scheduler stopping");
                        return;
                    }
                }
            }
        }
    }

    /// Execute one automation run. Exactly one run may be active per
    /// process; contention returns immediately.
    pub async fn run_once(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        {
            let mut active = self.active.lock().expect("active-run lock poisoned");
            if active.is_some() {
                return Err(ReseedError::PreconditionUnmet {
                    reason: "an automation run is already active".to_string(),
                });
            }
            *active = Some(ActiveRun {
                run_id,
                cancel: cancel_tx,
            });
        }

        info!(%run_id, "automation run starting");
        let result = self.execute(run_id, cancel_rx).await;
        self.active
            .lock()
            .expect("active-run lock poisoned")
            .take();

        match &result {
            Ok(summary) => {
                if let Err(err) = self.store.record_run(summary).await {
                    warn!(%run_id, %err, "failed to persist run summary");
                }
            }
            Err(err) => warn!(%run_id, %err, "automation run failed"),
        }
        result
    }

    async fn execute(&self, run_id: Uuid, cancel: watch::Receiver<bool>) -> Result<RunSummary> {
        let settings = self.store.load_automation_settings().await?;
        if !settings.enabled {
            return Err(ReseedError::PreconditionUnmet {
                reason: "automation is disabled".to_string(),
            });
        }

        self.cooldowns.load().await?;
        let retention_cutoff =
            Utc::now() - ChronoDuration::days(self.limits.feed_retention_days);
        if let Err(err) = self.store.prune_feed_items(retention_cutoff).await {
            warn!(%err, "feed-memory pruning failed");
        }

        let mut summary = RunSummary::begin();
        summary.run_id = run_id;

        let sources = self.collect_sources(&settings).await?;
        info!(sources = sources.len(), "collected seed targets");

        let mut candidates = self
            .discover(&settings, &sources, &cancel, &mut summary)
            .await?;

        if *cancel.borrow() {
            summary.finish(RunState::Canceled);
            return Ok(summary);
        }

        if candidates.len() > settings.max_results_per_run {
            info!(
                dropped = candidates.len() - settings.max_results_per_run,
                cap = settings.max_results_per_run,
                "capping candidates for this run"
            );
            candidates.truncate(settings.max_results_per_run);
        }

        self.process_candidates(&settings, &sources, candidates, &cancel, run_id, &mut summary)
            .await;

        let state = if *cancel.borrow() {
            RunState::Canceled
        } else {
            RunState::Completed
        };
        summary.finish(state);
        info!(
            %run_id,
            searched = summary.searched,
            matched = summary.matched,
            injected = summary.injected,
            state = ?summary.state,
            "automation run finished"
        );
        Ok(summary)
    }

    /// Enumerate seeded and recently-completed torrents on the target
    /// instances, honouring tag filters and the errored-torrent policy.
    async fn collect_sources(&self, settings: &AutomationSettings) -> Result<Vec<SourceTarget>> {
        let mut targets = Vec::new();
        let mut seen: HashSet<(i32, String)> = HashSet::new();

        for &instance_id in &settings.target_instance_ids {
            let torrents = self
                .sync
                .get_torrents(instance_id, &TorrentFilter::default())
                .await?;

            let mut wanted: Vec<&ClientTorrent> = Vec::new();
            for torrent in &torrents {
                let errored = matches!(torrent.state.as_str(), "error" | "missingFiles");
                if errored && !settings.recover_errored_torrents {
                    continue;
                }
                if !errored && torrent.progress < 1.0 {
                    continue;
                }
                let completion_cutoff =
                    Utc::now() - ChronoDuration::hours(self.limits.completion_window_hours);
                let seeded = tags_overlap(&torrent.tags, &settings.seeded_search_tags);
                let completed = torrent
                    .completed_on
                    .map(|at| at > completion_cutoff)
                    .unwrap_or(false)
                    && tags_overlap(&torrent.tags, &settings.completion_search_tags);
                if !(seeded || completed) {
                    continue;
                }
                if seen.insert((instance_id, torrent.hash.clone())) {
                    wanted.push(torrent);
                }
            }
            if wanted.is_empty() {
                continue;
            }

            let hashes: Vec<String> = wanted.iter().map(|t| t.hash.clone()).collect();
            let mut files_by_hash = self
                .sync
                .get_torrent_files_batch(instance_id, &hashes)
                .await?;

            for torrent in wanted {
                let files = files_by_hash.remove(&torrent.hash).unwrap_or_default();
                if files.is_empty() {
                    debug!(hash = %torrent.hash, "skipping torrent with no file listing");
                    continue;
                }
                let info = TorrentInfo {
                    name: torrent.name.clone(),
                    info_hash: torrent.hash.clone(),
                    // The client API does not expose the piece length;
                    // only candidate metainfo drives piece math.
                    piece_length: 0,
                    files: files
                        .into_iter()
                        .map(|f| reseed_core::TorrentFile::new(f.name, f.size))
                        .collect(),
                    announce_domains: Vec::new(),
                };
                let release = self.cache.parse(&torrent.name);
                let class = classify(&torrent.name, &release);
                targets.push(SourceTarget {
                    candidate: Candidate {
                        instance_id,
                        instance_name: format!("instance-{}", instance_id),
                        torrent: info,
                        properties: TorrentProperties {
                            save_path: torrent.save_path.clone(),
                            content_path: torrent.content_path.clone(),
                            category: torrent.category.clone(),
                            tags: torrent.tags.clone(),
                            auto_managed: torrent.auto_managed,
                            content_layout: None,
                            progress: torrent.progress,
                            state: torrent.state.clone(),
                        },
                    },
                    release,
                    class,
                })
            }
        }
        Ok(targets)
    }

    /// Stage one: fan out searches per source, then fold in RSS feed
    /// items and queued webhook triggers.
    async fn discover(
        &self,
        settings: &AutomationSettings,
        sources: &[SourceTarget],
        cancel: &watch::Receiver<bool>,
        summary: &mut RunSummary,
    ) -> Result<Vec<DiscoveredCandidate>> {
        let mut discovered = Vec::new();

        // Seeded/completion search fan-out
        let semaphore = Arc::new(Semaphore::new(self.limits.indexer_workers.max(1)));
        let mut tasks: JoinSet<(usize, Result<Vec<SearchResult>>)> = JoinSet::new();
        for (index, source) in sources.iter().enumerate() {
            if *cancel.borrow() {
                break;
            }
            let mut indexer_ids = Vec::new();
            for &indexer_id in &settings.target_indexer_ids {
                if !self.cooldowns.is_cooling(indexer_id).await {
                    indexer_ids.push(indexer_id);
                }
            }
            if indexer_ids.is_empty() {
                continue;
            }

            let query = build_search_query(&source.candidate.torrent.name, &source.release);
            let categories = source.class.categories.clone();
            let search = Arc::clone(&self.search);
            let permit_pool = Arc::clone(&semaphore);
            let timeout = self.limits.search_timeout;
            tasks.spawn(async move {
                let _permit = permit_pool.acquire_owned().await;
                let result = retry_with_backoff(
                    RetryConfig::quick(),
                    RetryPolicy::Transient,
                    "indexer search",
                    || async {
                        match tokio::time::timeout(
                            timeout,
                            search.search(&indexer_ids, &query, &categories),
                        )
                        .await
                        {
                            Ok(result) => result,
                            Err(_) => Err(ReseedError::Timeout {
                                operation: "indexer search".to_string(),
                                seconds: timeout.as_secs(),
                            }),
                        }
                    },
                )
                .await;
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok((index, result)) = joined else {
                continue;
            };
            match result {
                Ok(results) => {
                    summary.searched += results.len();
                    for result in results {
                        discovered.push(DiscoveredCandidate {
                            source_index: index,
                            indexer_id: result.indexer_id,
                            guid: Some(result.guid),
                            title: result.title,
                            download_url: result.download_url,
                            size: result.size,
                            trigger_tags: settings.seeded_search_tags.clone(),
                        });
                    }
                }
                Err(ReseedError::RateLimited {
                    indexer_id,
                    retry_after_secs,
                }) => {
                    self.cooldowns
                        .register(
                            indexer_id,
                            self.cooldown_secs(retry_after_secs),
                            "search rate limited",
                        )
                        .await;
                    summary.failed += 1;
                }
                Err(err) => {
                    warn!(%err, "indexer search failed");
                    summary.failed += 1;
                }
            }
        }

        // RSS feeds
        for &indexer_id in &settings.target_indexer_ids {
            if *cancel.borrow() {
                break;
            }
            if self.cooldowns.is_cooling(indexer_id).await {
                continue;
            }
            let items = match self.search.feed(indexer_id).await {
                Ok(items) => items,
                Err(ReseedError::RateLimited {
                    indexer_id,
                    retry_after_secs,
                }) => {
                    self.cooldowns
                        .register(
                            indexer_id,
                            self.cooldown_secs(retry_after_secs),
                            "feed rate limited",
                        )
                        .await;
                    continue;
                }
                Err(err) => {
                    warn!(indexer_id, %err, "feed fetch failed");
                    continue;
                }
            };
            for item in items {
                if let Some(candidate) = self
                    .admit_feed_item(item, sources, &settings.rss_automation_tags, summary)
                    .await
                {
                    discovered.push(candidate);
                }
            }
        }

        // Webhook-triggered items
        let queued: Vec<FeedItem> = self
            .webhook_queue
            .lock()
            .expect("webhook queue poisoned")
            .drain(..)
            .collect();
        for item in queued {
            if let Some(candidate) = self
                .admit_feed_item(item, sources, &settings.webhook_tags, summary)
                .await
            {
                discovered.push(candidate);
            }
        }

        Ok(discovered)
    }

    /// Feed-memory gate: skip processed items and items another run is
    /// already working on, then pair the item with a matching source.
    async fn admit_feed_item(
        &self,
        item: FeedItem,
        sources: &[SourceTarget],
        trigger_tags: &[String],
        summary: &mut RunSummary,
    ) -> Option<DiscoveredCandidate> {
        summary.searched += 1;

        match self.store.get_feed_item(&item.guid, item.indexer_id).await {
            Ok(Some(memory)) => {
                if memory.last_status == FeedItemStatus::Processed {
                    return None;
                }
                let pending_cutoff =
                    Utc::now() - ChronoDuration::minutes(self.limits.pending_cooldown_minutes);
                if memory.last_status == FeedItemStatus::Pending
                    && memory.last_seen_at > pending_cutoff
                {
                    return None;
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%err, guid = %item.guid, "feed memory lookup failed");
                return None;
            }
        }

        let release = self.cache.parse(&item.title);
        let source_index = sources
            .iter()
            .position(|s| releases_match(&s.release, &release))?;

        let mut memory = FeedItemMemory::new(&item.guid, item.indexer_id, &item.title);
        memory.last_seen_at = Utc::now();
        if let Err(err) = self.store.upsert_feed_item(&memory).await {
            warn!(%err, guid = %item.guid, "failed to mark feed item pending");
        }

        Some(DiscoveredCandidate {
            source_index,
            indexer_id: item.indexer_id,
            guid: Some(item.guid),
            title: item.title,
            download_url: item.download_url,
            size: item.size,
            trigger_tags: trigger_tags.to_vec(),
        })
    }

    /// Stage two: run every discovered candidate through the pipeline
    /// with bounded fan-out, recording outcomes and feed memory.
    async fn process_candidates(
        &self,
        settings: &AutomationSettings,
        sources: &[SourceTarget],
        candidates: Vec<DiscoveredCandidate>,
        cancel: &watch::Receiver<bool>,
        run_id: Uuid,
        summary: &mut RunSummary,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.limits.injection_workers.max(1)));
        let tolerance = settings.size_tolerance_fraction();

        let mut tasks: JoinSet<(DiscoveredCandidate, Result<reseed_core::InjectionOutcome>)> =
            JoinSet::new();

        for candidate in candidates {
            if *cancel.borrow() {
                break;
            }
            let Some(source) = sources.get(candidate.source_index) else {
                continue;
            };

            // Size pre-filter against the source's total, within the
            // configured tolerance.
            if let Some(size) = candidate.size {
                let total = source.candidate.torrent.total_size();
                if total > 0 {
                    let deviation =
                        (size as f64 - total as f64).abs() / total as f64;
                    if deviation > tolerance {
                        debug!(
                            title = %candidate.title,
                            deviation,
                            "candidate skipped by size pre-filter"
                        );
                        self.record_candidate(
                            summary,
                            source,
                            &candidate,
                            &reseed_core::InjectionOutcome::rejected(
                                InjectionStatus::SizeMismatch,
                                format!(
                                    "announced size deviates {:.1}% from source",
                                    deviation * 100.0
                                ),
                            ),
                        );
                        self.write_feed_memory(&candidate, FeedItemStatus::Failed, None, run_id)
                            .await;
                        continue;
                    }
                }
            }

            let search = Arc::clone(&self.search);
            let pipeline = Arc::clone(&self.pipeline);
            let permit_pool = Arc::clone(&semaphore);
            let link = self
                .link_settings
                .get(&source.candidate.instance_id)
                .cloned()
                .unwrap_or_default();
            let input = PipelineInput {
                instance_enabled: true,
                source: source.candidate.clone(),
                torrent_bytes: Vec::new(),
                request: CrossSeedRequest {
                    start_paused: settings.start_paused,
                    ..Default::default()
                },
                link,
                automation_category: settings.category.clone(),
                automation_tags: candidate.trigger_tags.clone(),
            };
            let indexer_id = candidate.indexer_id;
            let download_url = candidate.download_url.clone();

            tasks.spawn(async move {
                let _permit = permit_pool.acquire_owned().await;
                let fetched = retry_with_backoff(
                    RetryConfig::quick(),
                    RetryPolicy::Transient,
                    "torrent fetch",
                    || async { search.fetch_torrent(indexer_id, &download_url).await },
                )
                .await;
                let outcome = match fetched {
                    Ok(bytes) => {
                        let mut input = input;
                        input.torrent_bytes = bytes;
                        pipeline.process(&input).await
                    }
                    Err(err) => Err(err),
                };
                (candidate, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok((candidate, outcome)) = joined else {
                continue;
            };
            let Some(source) = sources.get(candidate.source_index) else {
                continue;
            };
            match outcome {
                Ok(outcome) => {
                    let status = if outcome.success {
                        FeedItemStatus::Processed
                    } else {
                        FeedItemStatus::Failed
                    };
                    self.write_feed_memory(
                        &candidate,
                        status,
                        outcome.info_hash.clone(),
                        run_id,
                    )
                    .await;
                    self.record_candidate(summary, source, &candidate, &outcome);
                }
                Err(ReseedError::RateLimited {
                    indexer_id,
                    retry_after_secs,
                }) => {
                    self.cooldowns
                        .register(
                            indexer_id,
                            self.cooldown_secs(retry_after_secs),
                            "fetch rate limited",
                        )
                        .await;
                    summary.failed += 1;
                }
                Err(err) => {
                    warn!(title = %candidate.title, %err, "candidate processing failed");
                    self.write_feed_memory(&candidate, FeedItemStatus::Failed, None, run_id)
                        .await;
                    summary.failed += 1;
                }
            }
        }
    }

    fn record_candidate(
        &self,
        summary: &mut RunSummary,
        source: &SourceTarget,
        candidate: &DiscoveredCandidate,
        outcome: &reseed_core::InjectionOutcome,
    ) {
        match outcome.status {
            InjectionStatus::Added => {
                summary.matched += 1;
                summary.injected += 1;
            }
            InjectionStatus::SkippedDuplicate
            | InjectionStatus::SkippedRecheck
            | InjectionStatus::Disabled => {
                summary.matched += 1;
                summary.skipped += 1;
            }
            InjectionStatus::NoMatch => {
                summary.skipped += 1;
            }
            _ => {
                summary.matched += 1;
                summary.failed += 1;
            }
        }
        summary.records.push(reseed_core::CandidateRecord {
            instance_id: source.candidate.instance_id,
            indexer_id: Some(candidate.indexer_id),
            source_name: source.candidate.torrent.name.clone(),
            candidate_name: candidate.title.clone(),
            outcome: outcome.clone(),
            recorded_at: Utc::now(),
        });
    }

    async fn write_feed_memory(
        &self,
        candidate: &DiscoveredCandidate,
        status: FeedItemStatus,
        info_hash: Option<String>,
        run_id: Uuid,
    ) {
        let Some(guid) = &candidate.guid else {
            return;
        };
        let mut memory = FeedItemMemory::new(guid, candidate.indexer_id, &candidate.title);
        memory.last_status = status;
        memory.last_run_id = Some(run_id);
        memory.info_hash = info_hash;
        memory.last_seen_at = Utc::now();
        if let Err(err) = self.store.upsert_feed_item(&memory).await {
            warn!(%err, guid = %guid, "failed to update feed memory");
        }
    }
}

fn tags_overlap(torrent_tags: &[String], filter: &[String]) -> bool {
    if filter.is_empty() {
        return false;
    }
    torrent_tags.iter().any(|t| filter.contains(t))
}
