//! Rename-plan construction and size-mismatch detection

use crate::layout::is_ignored_path;
use reseed_core::TorrentFile;
use reseed_matcher::fold_ascii;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m2ts", "ts", "wmv", "mov", "mpg", "mpeg", "vob",
];

/// One rename operation, full `/`-separated paths on both sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOp {
    pub from: String,
    pub to: String,
}

/// Plan for making a candidate's expected layout resolve to source
/// data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenamePlan {
    /// Root-folder rename applied before the file operations
    pub root_rename: Option<RenameOp>,
    /// Unique 1:1 renames, source path (post root rename) to candidate
    /// path
    pub operations: Vec<RenameOp>,
    /// Paths with ambiguous key+size pairings, deliberately not
    /// auto-renamed
    pub unmatched: Vec<String>,
    /// Source files the candidate does not cover (all files, ignored
    /// included; skip-recheck injections must not carry any)
    pub extras: Vec<String>,
    /// Candidate files with no source data behind them
    pub missing: Vec<String>,
}

impl RenamePlan {
    pub fn is_aligned(&self) -> bool {
        self.root_rename.is_none() && self.operations.is_empty() && self.unmatched.is_empty()
    }

    pub fn has_extras(&self) -> bool {
        !self.extras.is_empty()
    }
}

/// A source file whose size no candidate file can account for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeMismatch {
    pub path: String,
    pub size: u64,
}

/// Normalised pairing key for a file: folded base name plus extension.
///
/// Folder components are deliberately excluded, so files differing
/// only by directory share a key. Sidecars keep their own extension
/// but drop an intermediate video extension (`movie.mkv.nfo` keys as
/// `movie.nfo`).
pub fn normalize_file_key(path: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let (mut stem, ext) = match file_name.rsplit_once('.') {
        Some((s, e)) => (s.to_string(), e.to_ascii_lowercase()),
        None => (file_name.to_string(), String::new()),
    };
    if !VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        if let Some((inner, inner_ext)) = stem.rsplit_once('.') {
            if VIDEO_EXTENSIONS.contains(&inner_ext.to_ascii_lowercase().as_str()) {
                stem = inner.to_string();
            }
        }
    }
    let folded: String = fold_ascii(&stem)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if ext.is_empty() {
        folded
    } else {
        format!("{}.{}", folded, ext)
    }
}

fn common_root(files: &[TorrentFile]) -> Option<String> {
    let mut segments = files
        .iter()
        .map(|f| f.path.split_once('/').map(|(root, _)| root));
    let first = segments.next().flatten()?;
    if segments.all(|s| s == Some(first)) {
        Some(first.to_string())
    } else {
        None
    }
}

fn relative<'a>(path: &'a str, root: Option<&str>) -> &'a str {
    match root {
        Some(root) => path
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(path),
        None => path,
    }
}

/// Build the rename plan pairing source and candidate files by
/// `(normalised key, size)`. Only unique 1:1 pairs produce rename
/// operations; ambiguous pairings are reported, never guessed.
pub fn build_file_rename_plan(source: &[TorrentFile], candidate: &[TorrentFile]) -> RenamePlan {
    let source_root = common_root(source);
    let candidate_root = common_root(candidate);

    let root_rename = match (&source_root, &candidate_root) {
        (Some(from), Some(to)) if from != to => Some(RenameOp {
            from: from.clone(),
            to: to.clone(),
        }),
        _ => None,
    };

    let group = |files: &[TorrentFile]| {
        let mut map: HashMap<(String, u64), Vec<String>> = HashMap::new();
        for file in files {
            map.entry((normalize_file_key(&file.path), file.size))
                .or_default()
                .push(file.path.clone());
        }
        map
    };
    let source_groups = group(source);
    let candidate_groups = group(candidate);

    let mut plan = RenamePlan {
        root_rename,
        ..Default::default()
    };

    for (key, source_paths) in &source_groups {
        match candidate_groups.get(key) {
            None => plan.extras.extend(source_paths.iter().cloned()),
            Some(candidate_paths) => {
                if source_paths.len() == 1 && candidate_paths.len() == 1 {
                    let from_path = &source_paths[0];
                    let to_path = &candidate_paths[0];
                    // Express the source path as it reads after the
                    // root rename, so applying the plan converges.
                    let aligned_from = match &plan.root_rename {
                        Some(op) => format!(
                            "{}/{}",
                            op.to,
                            relative(from_path, Some(op.from.as_str()))
                        ),
                        None => from_path.clone(),
                    };
                    if &aligned_from != to_path {
                        plan.operations.push(RenameOp {
                            from: aligned_from,
                            to: to_path.clone(),
                        });
                    }
                } else {
                    plan.unmatched.extend(source_paths.iter().cloned());
                    plan.unmatched.extend(candidate_paths.iter().cloned());
                }
            }
        }
    }
    for (key, candidate_paths) in &candidate_groups {
        if !source_groups.contains_key(key) {
            plan.missing.extend(candidate_paths.iter().cloned());
        }
    }

    plan.operations.sort_by(|a, b| a.from.cmp(&b.from));
    plan.unmatched.sort();
    plan.extras.sort();
    plan.missing.sort();

    debug!(
        operations = plan.operations.len(),
        unmatched = plan.unmatched.len(),
        extras = plan.extras.len(),
        missing = plan.missing.len(),
        "built rename plan"
    );
    plan
}

/// Detect source content files the candidate cannot account for.
///
/// For each non-ignored source file there must be a candidate file
/// with the same key and size, or failing any same-key entry, some
/// candidate file of the same size that a rename could pair. Catches
/// indexer metadata that claims the same track over different bytes.
pub fn content_size_mismatches(
    source: &[TorrentFile],
    candidate: &[TorrentFile],
) -> Vec<SizeMismatch> {
    let mut mismatches = Vec::new();
    for file in source {
        if is_ignored_path(&file.path) {
            continue;
        }
        let key = normalize_file_key(&file.path);
        let same_key: Vec<&TorrentFile> = candidate
            .iter()
            .filter(|c| normalize_file_key(&c.path) == key)
            .collect();
        let accounted = if same_key.is_empty() {
            candidate
                .iter()
                .filter(|c| !is_ignored_path(&c.path))
                .any(|c| c.size == file.size)
        } else {
            same_key.iter().any(|c| c.size == file.size)
        };
        if !accounted {
            mismatches.push(SizeMismatch {
                path: file.path.clone(),
                size: file.size,
            });
        }
    }
    mismatches.sort_by(|a, b| a.path.cmp(&b.path));
    mismatches
}

/// Whether injection needs a hash recheck: true when the torrent
/// display names imply a layout change, the common roots differ, a
/// single file pairs with a folder of a different inner name, or any
/// file-level path differs.
pub fn needs_rename_alignment(
    torrent_name: &str,
    matched_name: &str,
    source: &[TorrentFile],
    candidate: &[TorrentFile],
) -> bool {
    let source_root = common_root(source);
    let candidate_root = common_root(candidate);

    if source_root != candidate_root {
        return true;
    }

    let single_source = source.len() == 1 && !source[0].path.contains('/');
    let single_candidate = candidate.len() == 1 && !candidate[0].path.contains('/');
    if single_source != single_candidate {
        return true;
    }
    if single_source && single_candidate && source[0].path != candidate[0].path {
        return true;
    }

    let root = source_root.as_deref();
    let mut source_paths: Vec<&str> = source.iter().map(|f| relative(&f.path, root)).collect();
    let mut candidate_paths: Vec<&str> = candidate
        .iter()
        .map(|f| relative(&f.path, candidate_root.as_deref()))
        .collect();
    source_paths.sort_unstable();
    candidate_paths.sort_unstable();
    if source_paths != candidate_paths {
        return true;
    }

    torrent_name != matched_name && source_root.is_none() && source.len() > 1
}
