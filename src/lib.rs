//! Reseed — a cross-seeding engine for qBittorrent
//!
//! Given a locally-seeded torrent, Reseed searches Torznab-compatible
//! indexers for alternate releases of the same content, verifies that
//! a discovered candidate is byte-compatible with the data already on
//! disk, and injects the new torrent into qBittorrent so seeding
//! starts without re-downloading anything.
//!
//! The workspace splits along the pipeline:
//!
//! - [`reseed_core`] — domain models, errors, collaborator traits
//! - [`reseed_torrent`] — BitTorrent v1 metainfo parsing
//! - [`reseed_release`] — release parsing, memoisation, classification
//! - [`reseed_matcher`] — candidate compatibility rules
//! - [`reseed_planner`] — rename plans, piece safety, link trees
//! - [`reseed_engine`] — injection orchestration and automation runs
//!
//! Hosts supply implementations of [`SyncManager`], [`SearchService`]
//! and [`StateStore`]; the engine owns everything in between.

pub use reseed_core::{
    AddPolicy, AutomationSettings, Candidate, CategoryInfo, ClientPreferences, ClientTorrent,
    ClientTorrentFile, ContentLayout, CrossSeedRequest, FeedItem, FeedItemMemory, FeedItemStatus,
    IndexerCooldown, InjectionOutcome, InjectionStatus, Release, ReleaseKey, ReleaseType,
    ReseedError, Result, RunState, RunSummary, SearchResult, SearchService, StateStore,
    SyncManager, TorrentAction, TorrentFile, TorrentFilter, TorrentInfo, TorrentProperties,
    TorznabQuery,
};
pub use reseed_engine::{
    AutomationEngine, AutomationLimits, CooldownRegistry, CrossSeedPipeline, InjectionJob,
    InjectionOrchestrator, InstanceLinkSettings, OrchestratorConfig, PipelineInput,
};
pub use reseed_matcher::{releases_match, should_align_files_with_candidate};
pub use reseed_planner::{DirPreset, LinkMode};
pub use reseed_release::{build_search_query, classify, ContentClass, ContentType, ReleaseCache};
pub use reseed_torrent::parse_torrent;
