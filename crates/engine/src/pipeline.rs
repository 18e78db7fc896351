//! The single-candidate cross-seed pipeline
//!
//! Wires the stages together for one `(source, candidate)` pair:
//! parse both names, compare the releases, check pack/episode set
//! membership over the file lists, and hand compatible pairs to the
//! injection orchestrator. Stages run in order; each stage's output is
//! fully observed before the next starts.

use crate::inject::{InjectionJob, InjectionOrchestrator, InstanceLinkSettings};
use reseed_core::{
    Candidate, CrossSeedRequest, InjectionOutcome, InjectionStatus, Release, ReleaseKey,
    ReseedError, Result, TorrentInfo,
};
use reseed_matcher::{
    compare_releases, keyed_sets_match, should_align_files_with_candidate,
    should_rename_torrent_display,
};
use reseed_release::ReleaseCache;
use reseed_torrent::parse_torrent;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Everything the pipeline needs for one candidate
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub instance_enabled: bool,
    pub source: Candidate,
    /// Bencoded candidate torrent fetched from the indexer
    pub torrent_bytes: Vec<u8>,
    pub request: CrossSeedRequest,
    pub link: InstanceLinkSettings,
    pub automation_category: Option<String>,
    pub automation_tags: Vec<String>,
}

pub struct CrossSeedPipeline {
    cache: Arc<ReleaseCache>,
    orchestrator: Arc<InjectionOrchestrator>,
}

impl CrossSeedPipeline {
    pub fn new(cache: Arc<ReleaseCache>, orchestrator: Arc<InjectionOrchestrator>) -> Self {
        Self {
            cache,
            orchestrator,
        }
    }

    /// Run the full pipeline for one candidate. Incompatible pairs
    /// come back as unsuccessful outcomes; transport failures
    /// propagate for the caller's retry and record policy.
    pub async fn process(&self, input: &PipelineInput) -> Result<InjectionOutcome> {
        let candidate = parse_torrent(&input.torrent_bytes).map_err(|e| {
            ReseedError::ValidationError {
                field: "torrent_bytes".to_string(),
                message: e.to_string(),
            }
        })?;

        // A torrent never cross-seeds itself.
        if candidate.info_hash == input.source.torrent.info_hash {
            return Ok(InjectionOutcome::duplicate(candidate.info_hash));
        }

        if !input.source.is_viable_target() {
            return Ok(InjectionOutcome::rejected(
                InjectionStatus::NoMatch,
                format!(
                    "source torrent is not a viable target (state {}, progress {:.2})",
                    input.source.properties.state, input.source.properties.progress
                ),
            ));
        }

        let source_release = self.cache.parse(&input.source.torrent.name);
        let candidate_release = self.cache.parse(&candidate.name);

        if let Some(mismatch) = compare_releases(&source_release, &candidate_release) {
            debug!(
                source = %input.source.torrent.name,
                candidate = %candidate.name,
                ?mismatch,
                "releases do not match"
            );
            return Ok(InjectionOutcome::rejected(
                InjectionStatus::NoMatch,
                format!("releases differ on {:?}", mismatch),
            ));
        }

        // Pack/episode pairings must agree on set membership by
        // release key and size.
        if source_release.is_season_pack() != candidate_release.is_season_pack() {
            let source_set = file_key_set(&self.cache, &input.source.torrent);
            let candidate_set = file_key_set(&self.cache, &candidate);
            if !keyed_sets_match(&source_set, &candidate_set) {
                return Ok(InjectionOutcome::rejected(
                    InjectionStatus::NoMatch,
                    "candidate episodes are not contained in the pack".to_string(),
                ));
            }
        }

        let job = InjectionJob {
            instance_enabled: input.instance_enabled,
            source: input.source.clone(),
            candidate,
            torrent_bytes: input.torrent_bytes.clone(),
            request: input.request.clone(),
            link: input.link.clone(),
            automation_category: input.automation_category.clone(),
            automation_tags: input.automation_tags.clone(),
            rename_display: should_rename_torrent_display(&source_release, &candidate_release),
            align_files: should_align_files_with_candidate(&source_release, &candidate_release),
        };
        self.orchestrator.inject(&job).await
    }
}

/// Describe a torrent's non-ignored files as `ReleaseKey -> size` for
/// partial matching.
fn file_key_set(cache: &ReleaseCache, torrent: &TorrentInfo) -> HashMap<ReleaseKey, u64> {
    let mut set = HashMap::new();
    for file in &torrent.files {
        if reseed_planner::is_ignored_path(&file.path) {
            continue;
        }
        let release: Arc<Release> = cache.parse(file.file_name());
        set.insert(release.key(), file.size);
    }
    set
}
