//! Injection orchestration
//!
//! Chooses between direct and link injection, composes the qBittorrent
//! add options so existing data is recognised, and drives the
//! post-add recheck-resume sequence.

use reseed_core::{
    AddPolicy, Candidate, ContentLayout, CrossSeedRequest, InjectionOutcome, InjectionStatus,
    Result, SyncManager, TorrentAction, TorrentInfo,
};
use reseed_planner::{
    build_file_rename_plan, check_piece_boundaries, classify_torrent_layout,
    content_size_mismatches, detect_add_policy, is_ignored_path, materialise_tree,
    needs_rename_alignment, normalize_file_key, AnnotatedFile, DirPreset, LinkConfig, LinkMode,
    LinkRequest, RenamePlan, TorrentLayout,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Link configuration of one qBittorrent instance
#[derive(Debug, Clone, Default)]
pub struct InstanceLinkSettings {
    pub has_local_filesystem_access: bool,
    pub use_hardlinks: bool,
    pub use_reflinks: bool,
    pub hardlink_base_dir: String,
    pub hardlink_dir_preset: DirPreset,
}

impl InstanceLinkSettings {
    /// Link mode applies only with filesystem access and exactly one
    /// of hardlinks or reflinks selected
    pub fn link_mode(&self) -> Option<LinkMode> {
        if !self.has_local_filesystem_access {
            return None;
        }
        match (self.use_hardlinks, self.use_reflinks) {
            (true, false) => Some(LinkMode::Hardlink),
            (false, true) => Some(LinkMode::Reflink),
            _ => None,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Tags applied to every injected torrent
    pub tags: Vec<String>,
    /// Progress at or above which a rechecked torrent resumes
    pub resume_progress_threshold: f64,
    /// Poll interval while a recheck runs
    pub recheck_poll_interval: Duration,
    /// Polls before giving up on observing the recheck
    pub recheck_poll_limit: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tags: vec!["cross-seed".to_string()],
            resume_progress_threshold: 0.999,
            recheck_poll_interval: Duration::from_secs(2),
            recheck_poll_limit: 150,
        }
    }
}

/// One injection request, fully resolved by the pipeline
#[derive(Debug, Clone)]
pub struct InjectionJob {
    pub instance_enabled: bool,
    /// The locally-seeded torrent the candidate matched against
    pub source: Candidate,
    /// Parsed metainfo of the torrent being injected
    pub candidate: TorrentInfo,
    /// Raw bencoded bytes handed to qBittorrent
    pub torrent_bytes: Vec<u8>,
    pub request: CrossSeedRequest,
    pub link: InstanceLinkSettings,
    /// Category configured for cross-seeds, if any
    pub automation_category: Option<String>,
    pub automation_tags: Vec<String>,
    /// Matcher verdicts carried along from release comparison
    pub rename_display: bool,
    pub align_files: bool,
}

pub struct InjectionOrchestrator {
    sync: Arc<dyn SyncManager>,
    config: OrchestratorConfig,
}

impl InjectionOrchestrator {
    pub fn new(sync: Arc<dyn SyncManager>, config: OrchestratorConfig) -> Self {
        Self { sync, config }
    }

    /// Run one injection end to end. Data rejections come back as
    /// unsuccessful outcomes; transport and infrastructure failures
    /// propagate as errors for the caller's retry/record policy.
    pub async fn inject(&self, job: &InjectionJob) -> Result<InjectionOutcome> {
        let instance_id = job.source.instance_id;

        if !job.instance_enabled {
            return Ok(InjectionOutcome::rejected(
                InjectionStatus::Disabled,
                format!("instance {} is disabled", job.source.instance_name),
            ));
        }

        // Never match a torrent against itself, and never re-add one
        // that is already present.
        let hashes = vec![job.candidate.info_hash.clone()];
        if let Some(existing) = self.sync.has_torrent_by_any_hash(instance_id, &hashes).await? {
            debug!(hash = %existing.hash, "candidate already present");
            return Ok(InjectionOutcome::duplicate(existing.hash));
        }

        let source_files = &job.source.torrent.files;
        let candidate_files = &job.candidate.files;

        let source_layout = classify_torrent_layout(source_files);
        let candidate_layout = classify_torrent_layout(candidate_files);
        if source_layout != candidate_layout {
            return Ok(InjectionOutcome::rejected(
                InjectionStatus::LayoutMismatch,
                format!(
                    "source layout {:?} does not match candidate layout {:?}",
                    source_layout, candidate_layout
                ),
            ));
        }
        if source_layout == TorrentLayout::Unknown {
            return Ok(InjectionOutcome::rejected(
                InjectionStatus::LayoutMismatch,
                "neither torrent has a classifiable content file".to_string(),
            ));
        }

        let mismatches = content_size_mismatches(source_files, candidate_files);
        if !mismatches.is_empty() {
            let detail: Vec<String> = mismatches
                .iter()
                .take(4)
                .map(|m| format!("{} ({} bytes)", m.path, m.size))
                .collect();
            return Ok(InjectionOutcome::rejected(
                InjectionStatus::SizeMismatch,
                format!(
                    "{} source file(s) with no size-compatible candidate: {}",
                    mismatches.len(),
                    detail.join(", ")
                ),
            ));
        }

        let policy = detect_add_policy(source_files);
        let plan = build_file_rename_plan(source_files, candidate_files);

        // Candidate files whose bytes the source cannot provide leave
        // unverifiable pieces; refuse when a boundary sits inside one.
        let provided: HashSet<&String> = plan_covered_candidate_paths(&plan, candidate_files);
        let annotated: Vec<AnnotatedFile> = candidate_files
            .iter()
            .map(|f| {
                AnnotatedFile::new(
                    f.path.clone(),
                    f.size,
                    provided.contains(&f.path) && !is_ignored_path(&f.path),
                )
            })
            .collect();
        let boundary = check_piece_boundaries(&annotated, job.candidate.piece_length);
        if !boundary.safe {
            let first = &boundary.violations[0];
            return Ok(InjectionOutcome::rejected(
                InjectionStatus::LayoutMismatch,
                format!(
                    "piece-boundary violation at offset {} (piece {}) between {} and {}",
                    first.offset, first.piece_index, first.before, first.after
                ),
            ));
        }

        let needs_alignment = needs_rename_alignment(
            &job.source.torrent.name,
            &job.candidate.name,
            source_files,
            candidate_files,
        );
        let aligned_no_extras = !needs_alignment
            && plan.missing.is_empty()
            && plan.unmatched.is_empty()
            && !plan.has_extras();

        match job.link.link_mode() {
            Some(mode) => self.inject_linked(job, &plan, &policy, mode).await,
            None => {
                self.inject_direct(job, &plan, &policy, needs_alignment, aligned_no_extras)
                    .await
            }
        }
    }

    async fn inject_linked(
        &self,
        job: &InjectionJob,
        plan: &RenamePlan,
        policy: &AddPolicy,
        mode: LinkMode,
    ) -> Result<InjectionOutcome> {
        // A skip-check add with extra source files would report
        // complete while pieces remain unverified.
        if job.request.skip_recheck && plan.has_extras() {
            return Ok(InjectionOutcome::rejected(
                InjectionStatus::SkippedRecheck,
                format!(
                    "link injection requires a recheck ({} extra source file(s)) but skip_recheck is set",
                    plan.extras.len()
                ),
            ));
        }

        let entries = link_entries(&job.source, &job.candidate);
        let link_config = LinkConfig {
            base_dir: PathBuf::from(&job.link.hardlink_base_dir),
            mode,
            preset: job.link.hardlink_dir_preset,
        };
        let link_request = LinkRequest {
            instance_name: job.source.instance_name.clone(),
            tracker: job.candidate.primary_tracker().map(str::to_string),
            display_name: job.candidate.name.clone(),
            info_hash: job.candidate.info_hash.clone(),
            candidate_has_root: job.candidate.root_folder().is_some(),
            entries,
        };

        let outcome = match materialise_tree(&link_config, &link_request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Infrastructure failures are surfaced, never silently
                // downgraded to a direct add.
                let status = match mode {
                    LinkMode::Hardlink => InjectionStatus::HardlinkError,
                    LinkMode::Reflink => InjectionStatus::ReflinkError,
                };
                warn!(%err, "link materialisation failed");
                return Ok(InjectionOutcome::rejected(status, err.to_string()));
            }
        };

        // The tree carries the candidate's exact names, so alignment
        // reduces to full coverage without extras.
        let covered = plan.missing.is_empty() && plan.unmatched.is_empty();
        let skip_checking =
            covered && (!plan.has_extras() || job.request.skip_recheck);
        let options = self
            .compose_options(
                job,
                policy,
                outcome.save_path.to_string_lossy().as_ref(),
                // The tree was built to the candidate's exact layout
                Some(ContentLayout::Original),
                skip_checking,
                false,
            )
            .await?;

        self.sync
            .add_torrent(job.source.instance_id, &job.torrent_bytes, &options)
            .await?;
        info!(
            hash = %job.candidate.info_hash,
            save_path = %outcome.save_path.display(),
            links = outcome.links_created,
            "injected via link tree"
        );

        self.finish_add(job, policy, skip_checking, false).await
    }

    async fn inject_direct(
        &self,
        job: &InjectionJob,
        plan: &RenamePlan,
        policy: &AddPolicy,
        needs_alignment: bool,
        aligned_no_extras: bool,
    ) -> Result<InjectionOutcome> {
        let (save_path, layout) = direct_save_path(&job.source, &job.candidate);
        let skip_checking = aligned_no_extras || (job.request.skip_recheck && plan.missing.is_empty());
        let needs_renames = job.align_files
            && (plan.root_rename.is_some() || !plan.operations.is_empty());

        let options = self
            .compose_options(
                job,
                policy,
                &save_path,
                layout,
                skip_checking,
                needs_alignment || needs_renames,
            )
            .await?;

        self.sync
            .add_torrent(job.source.instance_id, &job.torrent_bytes, &options)
            .await?;
        info!(
            hash = %job.candidate.info_hash,
            save_path = %save_path,
            "injected directly"
        );

        // The added torrent carries the candidate's names; the data on
        // disk carries the source's. Rename the torrent's paths onto
        // the source names before any recheck. Files go first: the
        // plan's paths are rooted under the candidate root until the
        // folder rename lands.
        if needs_renames {
            let hash = &job.candidate.info_hash;
            for op in &plan.operations {
                self.sync
                    .rename_torrent_file(job.source.instance_id, hash, &op.to, &op.from)
                    .await?;
            }
            if let Some(op) = &plan.root_rename {
                self.sync
                    .rename_torrent_folder(job.source.instance_id, hash, &op.to, &op.from)
                    .await?;
            }
        }

        if job.rename_display && job.candidate.name != job.source.torrent.name {
            self.sync
                .rename_torrent(
                    job.source.instance_id,
                    &job.candidate.info_hash,
                    &job.source.torrent.name,
                )
                .await?;
        }

        self.finish_add(job, policy, skip_checking, needs_alignment || needs_renames)
            .await
    }

    /// Compose the option map for the qBittorrent add call
    async fn compose_options(
        &self,
        job: &InjectionJob,
        policy: &AddPolicy,
        save_path: &str,
        layout: Option<ContentLayout>,
        skip_checking: bool,
        recheck_planned: bool,
    ) -> Result<HashMap<String, String>> {
        let mut options = HashMap::new();

        let category = job
            .request
            .category_override
            .clone()
            .or_else(|| job.automation_category.clone())
            .unwrap_or_else(|| job.source.properties.category.clone());

        // autoTMM only when the matched torrent is auto-managed, no
        // override is in play, and the category actually resolves to
        // the computed save path.
        let auto_tmm = if job.source.properties.auto_managed
            && job.request.category_override.is_none()
        {
            let categories = self.sync.get_categories(job.source.instance_id).await?;
            categories
                .get(&category)
                .map(|c| c.save_path == save_path)
                .unwrap_or(false)
        } else {
            false
        };

        options.insert("savepath".to_string(), save_path.to_string());
        options.insert("autoTMM".to_string(), auto_tmm.to_string());
        if !category.is_empty() {
            options.insert("category".to_string(), category);
        }
        if let Some(layout) = layout {
            options.insert("contentLayout".to_string(), layout.as_str().to_string());
        }
        options.insert("skip_checking".to_string(), skip_checking.to_string());

        // Pause whenever requested, forced by policy, or a recheck has
        // to happen before the torrent may run.
        let paused = job.request.start_paused || policy.force_paused || recheck_planned
            || (!skip_checking);
        // Both spellings so 4.x and 5.x instances behave identically.
        options.insert("paused".to_string(), paused.to_string());
        options.insert("stopped".to_string(), paused.to_string());

        let mut tags: Vec<String> = self.config.tags.clone();
        for tag in job.automation_tags.iter().chain(job.request.extra_tags.iter()) {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        options.insert("tags".to_string(), tags.join(","));

        Ok(options)
    }

    /// Post-add follow-up: recheck-resume, or immediate resume for
    /// perfect matches. Disc layouts are never resumed.
    async fn finish_add(
        &self,
        job: &InjectionJob,
        policy: &AddPolicy,
        skip_checking: bool,
        recheck_planned: bool,
    ) -> Result<InjectionOutcome> {
        let instance_id = job.source.instance_id;
        let hash = job.candidate.info_hash.clone();
        let hashes = vec![hash.clone()];

        let mut message = format!(
            "added to {} ({})",
            job.source.instance_name, job.source.properties.save_path
        );
        if policy.disc_layout {
            let marker = policy.disc_marker.as_deref().unwrap_or("disc");
            message = format!(
                "{}; disc layout ({}) detected, torrent stays paused",
                message, marker
            );
            return Ok(InjectionOutcome::added(hash, message));
        }

        let may_resume = !job.request.start_paused
            && !job.request.skip_auto_resume
            && !policy.force_skip_auto_resume
            && !policy.force_paused;

        if skip_checking && !recheck_planned {
            // Perfect match: nothing to verify, resume right away.
            if may_resume {
                self.sync
                    .bulk_action(instance_id, &hashes, TorrentAction::Resume)
                    .await?;
            }
            return Ok(InjectionOutcome::added(hash, message));
        }

        self.sync
            .bulk_action(instance_id, &hashes, TorrentAction::Recheck)
            .await?;

        if !may_resume {
            message = format!("{}; recheck started, auto-resume disabled", message);
            return Ok(InjectionOutcome::added(hash, message));
        }

        // Observe the recheck and resume once the data verifies.
        for _ in 0..self.config.recheck_poll_limit {
            tokio::time::sleep(self.config.recheck_poll_interval).await;
            let props = self.sync.get_torrent_properties(instance_id, &hash).await?;
            if props.state.starts_with("checking") {
                continue;
            }
            if props.progress >= self.config.resume_progress_threshold {
                self.sync
                    .bulk_action(instance_id, &hashes, TorrentAction::Resume)
                    .await?;
                message = format!("{}; recheck complete, resumed", message);
            } else {
                warn!(
                    %hash,
                    progress = props.progress,
                    "recheck finished below resume threshold"
                );
                message = format!(
                    "{}; recheck finished at {:.1}%, left paused",
                    message,
                    props.progress * 100.0
                );
            }
            return Ok(InjectionOutcome::added(hash, message));
        }

        warn!(%hash, "recheck did not finish within the polling window");
        message = format!("{}; recheck still running, left paused", message);
        Ok(InjectionOutcome::added(hash, message))
    }
}

/// Candidate paths the source can provide bytes for, i.e. everything
/// matched by the rename plan plus paths that already agree.
fn plan_covered_candidate_paths<'a>(
    plan: &RenamePlan,
    candidate_files: &'a [reseed_core::TorrentFile],
) -> HashSet<&'a String> {
    let missing: HashSet<&String> = plan.missing.iter().collect();
    let unmatched: HashSet<&String> = plan.unmatched.iter().collect();
    candidate_files
        .iter()
        .map(|f| &f.path)
        .filter(|p| !missing.contains(*p) && !unmatched.contains(*p))
        .collect()
}

/// Pair candidate-relative paths with absolute source paths by
/// normalised key and size, for the link materialiser.
fn link_entries(source: &Candidate, candidate: &TorrentInfo) -> Vec<(PathBuf, String)> {
    let mut by_key: HashMap<(String, u64), &reseed_core::TorrentFile> = HashMap::new();
    for file in &source.torrent.files {
        by_key.insert((normalize_file_key(&file.path), file.size), file);
    }

    let mut entries = Vec::new();
    for file in &candidate.files {
        let key = (normalize_file_key(&file.path), file.size);
        if let Some(source_file) = by_key.get(&key) {
            let mut absolute = PathBuf::from(&source.properties.save_path);
            for segment in source_file.path.split('/') {
                absolute.push(segment);
            }
            entries.push((absolute, file.path.clone()));
        }
    }
    entries
}

/// Save path and content layout for a direct add.
///
/// The save path is the directory containing the candidate's root.
/// When the candidate is rootless and the matched content lives under
/// a subfolder, the content path itself becomes the save path.
fn direct_save_path(source: &Candidate, candidate: &TorrentInfo) -> (String, Option<ContentLayout>) {
    let source_root = source.torrent.root_folder().map(str::to_string);
    let candidate_root = candidate.root_folder().map(str::to_string);

    match (source_root, candidate_root) {
        // Candidate rootless but the matched content sits in its own
        // folder: point qBittorrent inside that folder.
        (Some(_), None) => {
            let content = &source.properties.content_path;
            if !content.is_empty() && content != &source.properties.save_path {
                (content.clone(), Some(ContentLayout::Original))
            } else {
                (
                    source.properties.save_path.clone(),
                    Some(ContentLayout::Original),
                )
            }
        }
        // Candidate has a folder the source data does not: strip it so
        // the files resolve at the source's flat location.
        (None, Some(_)) => (
            source.properties.save_path.clone(),
            Some(ContentLayout::NoSubfolder),
        ),
        _ => (
            source.properties.save_path.clone(),
            Some(ContentLayout::Original),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reseed_core::{TorrentFile, TorrentProperties};

    fn candidate_with(files: Vec<TorrentFile>, save_path: &str, content_path: &str) -> Candidate {
        Candidate {
            instance_id: 1,
            instance_name: "local".to_string(),
            torrent: TorrentInfo {
                name: "Source".to_string(),
                info_hash: "aa".repeat(20),
                piece_length: 16_384,
                files,
                announce_domains: vec![],
            },
            properties: TorrentProperties {
                save_path: save_path.to_string(),
                content_path: content_path.to_string(),
                progress: 1.0,
                state: "uploading".to_string(),
                ..Default::default()
            },
        }
    }

    fn torrent_with(name: &str, files: Vec<TorrentFile>) -> TorrentInfo {
        TorrentInfo {
            name: name.to_string(),
            info_hash: "bb".repeat(20),
            piece_length: 16_384,
            files,
            announce_domains: vec![],
        }
    }

    #[test]
    fn rootless_candidate_uses_content_path() {
        let source = candidate_with(
            vec![TorrentFile::new("Movie.2024/movie.mkv", 100)],
            "/downloads",
            "/downloads/Movie.2024",
        );
        let candidate = torrent_with("movie.mkv", vec![TorrentFile::new("movie.mkv", 100)]);
        let (save_path, layout) = direct_save_path(&source, &candidate);
        assert_eq!(save_path, "/downloads/Movie.2024");
        assert_eq!(layout, Some(ContentLayout::Original));
    }

    #[test]
    fn foldered_candidate_over_flat_source_strips_subfolder() {
        let source = candidate_with(
            vec![TorrentFile::new("movie.mkv", 100)],
            "/downloads",
            "/downloads/movie.mkv",
        );
        let candidate = torrent_with(
            "Movie.2024",
            vec![TorrentFile::new("Movie.2024/movie.mkv", 100)],
        );
        let (save_path, layout) = direct_save_path(&source, &candidate);
        assert_eq!(save_path, "/downloads");
        assert_eq!(layout, Some(ContentLayout::NoSubfolder));
    }

    #[test]
    fn matching_roots_keep_original_layout() {
        let source = candidate_with(
            vec![TorrentFile::new("Movie.2024/movie.mkv", 100)],
            "/downloads",
            "/downloads/Movie.2024",
        );
        let candidate = torrent_with(
            "Movie.2024",
            vec![TorrentFile::new("Movie.2024/movie.mkv", 100)],
        );
        let (save_path, layout) = direct_save_path(&source, &candidate);
        assert_eq!(save_path, "/downloads");
        assert_eq!(layout, Some(ContentLayout::Original));
    }

    #[test]
    fn link_entries_pair_by_key_and_size() {
        let source = candidate_with(
            vec![
                TorrentFile::new("Pack/Show.S01E01.mkv", 100),
                TorrentFile::new("Pack/Show.S01E02.mkv", 200),
            ],
            "/seeds",
            "/seeds/Pack",
        );
        let candidate = torrent_with(
            "Pack v2",
            vec![
                TorrentFile::new("Pack v2/Show S01E01.mkv", 100),
                TorrentFile::new("Pack v2/Show S01E02.mkv", 200),
                TorrentFile::new("Pack v2/extra.nfo", 5),
            ],
        );
        let entries = link_entries(&source, &candidate);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].0,
            PathBuf::from("/seeds/Pack/Show.S01E01.mkv")
        );
        assert_eq!(entries[0].1, "Pack v2/Show S01E01.mkv");
    }
}
