//! Layout classification, ignore rules and disc detection

use reseed_core::{AddPolicy, TorrentFile};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Extensions excluded from size-mismatch and pairing decisions
pub const IGNORED_EXTENSIONS: &[&str] = &[
    "nfo", "srr", "srt", "sub", "idx", "ass", "ssa", "sup", "vtt", "txt",
];

/// Path keywords marking promotional or auxiliary material
const IGNORED_KEYWORDS: &[&str] = &[
    "sample",
    "!sample",
    "proof",
    "extras",
    "bonus",
    "trailer",
    "featurette",
];

const ARCHIVE_EXTENSIONS: &[&str] = &["rar", "zip", "7z", "tar", "gz", "xz", "bz2"];

/// Path segments (other than the final one) that mark a disc layout
const DISC_MARKERS: &[&str] = &["BDMV", "VIDEO_TS"];

/// Shape of a torrent's payload, judged by its largest meaningful file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentLayout {
    Files,
    Archives,
    Unknown,
}

fn extension(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next()?;
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

fn is_archive(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    if let Some((_, ext)) = file_name.rsplit_once('.') {
        if ARCHIVE_EXTENSIONS.contains(&ext) {
            return true;
        }
        // Split volumes: .r00 through .r99
        if ext.len() == 3 && ext.starts_with('r') && ext[1..].chars().all(|c| c.is_ascii_digit())
        {
            return true;
        }
    }
    false
}

/// Whether a file plays no part in compatibility decisions
pub fn is_ignored_path(path: &str) -> bool {
    if let Some(ext) = extension(path) {
        if IGNORED_EXTENSIONS.contains(&ext.as_str()) {
            return true;
        }
    }
    let lowered = path.to_ascii_lowercase();
    IGNORED_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Classify a torrent's layout by inspecting its largest non-ignored
/// file. Cross-seeding is rejected when source and candidate disagree.
pub fn classify_torrent_layout(files: &[TorrentFile]) -> TorrentLayout {
    let largest = files
        .iter()
        .filter(|f| !is_ignored_path(&f.path))
        .max_by_key(|f| f.size);
    match largest {
        Some(file) if is_archive(&file.path) => TorrentLayout::Archives,
        Some(_) => TorrentLayout::Files,
        None => TorrentLayout::Unknown,
    }
}

/// Derive the add policy from a file list.
///
/// A `BDMV` or `VIDEO_TS` directory segment forces a paused,
/// never-auto-resumed add: the piece layout of a disc structure
/// depends on exact file order and a mis-ordered tree corrupts on
/// recheck.
pub fn detect_add_policy(files: &[TorrentFile]) -> AddPolicy {
    for file in files {
        let segments: Vec<&str> = file.path.split('/').collect();
        if segments.len() < 2 {
            continue;
        }
        for segment in &segments[..segments.len() - 1] {
            if let Some(marker) = DISC_MARKERS
                .iter()
                .find(|m| segment.eq_ignore_ascii_case(m))
            {
                debug!(path = %file.path, marker, "detected disc layout");
                return AddPolicy {
                    force_paused: true,
                    force_skip_auto_resume: true,
                    disc_layout: true,
                    disc_marker: Some((*marker).to_string()),
                };
            }
        }
    }
    AddPolicy::default()
}
