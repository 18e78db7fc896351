//! Hardlink/reflink tree construction
//!
//! When a candidate's filenames differ from the data on disk but the
//! bytes are identical, a parallel tree of links under the instance's
//! base directory gives qBittorrent the layout it expects without
//! duplicating data.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Filesystem primitive used for the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    Hardlink,
    Reflink,
}

/// Directory scheme under the base directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirPreset {
    /// Every torrent gets its own isolation folder
    #[default]
    Flat,
    /// Group trees under the sanitised primary tracker name
    ByTracker,
    /// Group trees under the sanitised instance name
    ByInstance,
}

/// Per-instance link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub base_dir: PathBuf,
    pub mode: LinkMode,
    pub preset: DirPreset,
}

/// One materialisation request
#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub instance_name: String,
    /// Primary tracker domain, if known
    pub tracker: Option<String>,
    /// Display name of the torrent being injected
    pub display_name: String,
    pub info_hash: String,
    /// Whether the candidate torrent has a common root folder of its
    /// own; rootless layouts get an isolation folder instead
    pub candidate_has_root: bool,
    /// `(absolute source path, candidate-relative destination path)`
    pub entries: Vec<(PathBuf, String)>,
}

/// Result of a successful materialisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    /// Directory to hand to qBittorrent as the save path
    pub save_path: PathBuf,
    pub links_created: usize,
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("link base directory is not usable: {path}: {detail}")]
    BaseDirUnusable { path: PathBuf, detail: String },

    #[error("destination already exists: {0}")]
    Collision(PathBuf),

    #[error("reflinks are not supported on this platform")]
    ReflinkUnsupported,

    #[error("link failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Characters qBittorrent and common filesystems reject in names
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn sanitize_segment(segment: &str, fallback: &str) -> String {
    let cleaned: String = segment
        .chars()
        .filter(|c| !FORBIDDEN.contains(c))
        .collect::<String>()
        .trim()
        .to_string();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// Advisory locks per destination root so concurrent runs targeting
/// the same content serialise their tree construction.
static DEST_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn lock_for(path: &Path) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = DEST_LOCKS.lock().expect("link lock registry poisoned");
    Arc::clone(
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
    )
}

/// Compute the directory qBittorrent will be pointed at
fn destination_root(config: &LinkConfig, request: &LinkRequest) -> PathBuf {
    let mut root = config.base_dir.clone();
    match config.preset {
        DirPreset::Flat => {}
        DirPreset::ByTracker => {
            let tracker = request.tracker.as_deref().unwrap_or("Unknown");
            root.push(sanitize_segment(tracker, "Unknown"));
        }
        DirPreset::ByInstance => {
            root.push(sanitize_segment(&request.instance_name, "Unknown"));
        }
    }
    if !request.candidate_has_root {
        // Rootless candidates would drop their files at the top of the
        // shared directory; give each an isolation folder keyed by a
        // hash prefix so display-name collisions stay apart.
        let prefix: String = request.info_hash.chars().take(8).collect();
        let isolation = format!(
            "{}--{}",
            sanitize_segment(&request.display_name, "Unknown"),
            prefix
        );
        root.push(isolation);
    }
    root
}

/// Build the link tree for a request. Pre-existing destination files
/// abort the materialisation; nothing is overwritten.
pub async fn materialise_tree(
    config: &LinkConfig,
    request: &LinkRequest,
) -> Result<LinkOutcome, LinkError> {
    if config.base_dir.as_os_str().is_empty() {
        return Err(LinkError::BaseDirUnusable {
            path: config.base_dir.clone(),
            detail: "base directory is empty".to_string(),
        });
    }
    tokio::fs::create_dir_all(&config.base_dir)
        .await
        .map_err(|e| LinkError::BaseDirUnusable {
            path: config.base_dir.clone(),
            detail: e.to_string(),
        })?;

    let save_path = destination_root(config, request);
    let guard = lock_for(&save_path);
    let _held = guard.lock().await;

    let mut links_created = 0usize;
    for (source, relative) in &request.entries {
        let mut destination = save_path.clone();
        for segment in relative.split('/') {
            destination.push(sanitize_segment(segment, "Unknown"));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LinkError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        if tokio::fs::try_exists(&destination)
            .await
            .unwrap_or(false)
        {
            warn!(path = %destination.display(), "destination exists, aborting link tree");
            return Err(LinkError::Collision(destination));
        }

        match config.mode {
            LinkMode::Hardlink => {
                let source = source.clone();
                let destination_path = destination.clone();
                tokio::task::spawn_blocking(move || std::fs::hard_link(&source, &destination_path))
                    .await
                    .map_err(|e| LinkError::Io {
                        path: destination.clone(),
                        source: std::io::Error::other(e),
                    })?
                    .map_err(|e| match e.kind() {
                        std::io::ErrorKind::AlreadyExists => LinkError::Collision(destination.clone()),
                        _ => LinkError::Io {
                            path: destination.clone(),
                            source: e,
                        },
                    })?;
            }
            LinkMode::Reflink => {
                let source = source.clone();
                let destination_path = destination.clone();
                tokio::task::spawn_blocking(move || reflink_file(&source, &destination_path))
                    .await
                    .map_err(|e| LinkError::Io {
                        path: destination.clone(),
                        source: std::io::Error::other(e),
                    })??;
            }
        }
        debug!(source = %source.display(), dest = %destination.display(), "linked");
        links_created += 1;
    }

    info!(
        save_path = %save_path.display(),
        links_created,
        "materialised link tree"
    );
    Ok(LinkOutcome {
        save_path,
        links_created,
    })
}

#[cfg(target_os = "linux")]
fn reflink_file(source: &Path, destination: &Path) -> Result<(), LinkError> {
    use std::os::unix::io::AsRawFd;

    // FICLONE from linux/fs.h
    const FICLONE: libc::c_ulong = 0x4004_9409;

    let src = std::fs::File::open(source).map_err(|e| LinkError::Io {
        path: source.to_path_buf(),
        source: e,
    })?;
    let dst = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => LinkError::Collision(destination.to_path_buf()),
            _ => LinkError::Io {
                path: destination.to_path_buf(),
                source: e,
            },
        })?;

    let rc = unsafe { libc::ioctl(dst.as_raw_fd(), FICLONE, src.as_raw_fd()) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        let _ = std::fs::remove_file(destination);
        return Err(LinkError::Io {
            path: destination.to_path_buf(),
            source: err,
        });
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn reflink_file(_source: &Path, _destination: &Path) -> Result<(), LinkError> {
    Err(LinkError::ReflinkUnsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn config(base: &Path, preset: DirPreset) -> LinkConfig {
        LinkConfig {
            base_dir: base.to_path_buf(),
            mode: LinkMode::Hardlink,
            preset,
        }
    }

    fn request(entries: Vec<(PathBuf, String)>, has_root: bool) -> LinkRequest {
        LinkRequest {
            instance_name: "seedbox".to_string(),
            tracker: Some("tracker.example".to_string()),
            display_name: "Movie 2024 1080p".to_string(),
            info_hash: "abcdef0123456789abcdef0123456789abcdef01".to_string(),
            candidate_has_root: has_root,
            entries,
        }
    }

    #[tokio::test]
    async fn flat_preset_isolates_rootless_torrents() {
        let temp = TempDir::new().unwrap();
        let source = write_file(temp.path(), "source.mkv", b"data");
        let base = temp.path().join("links");

        let outcome = materialise_tree(
            &config(&base, DirPreset::Flat),
            &request(vec![(source, "Movie 2024.mkv".to_string())], false),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome.save_path,
            base.join("Movie 2024 1080p--abcdef01")
        );
        assert_eq!(outcome.links_created, 1);
        assert!(outcome.save_path.join("Movie 2024.mkv").exists());
    }

    #[tokio::test]
    async fn rooted_candidates_skip_the_isolation_folder() {
        let temp = TempDir::new().unwrap();
        let source = write_file(temp.path(), "source.mkv", b"data");
        let base = temp.path().join("links");

        let outcome = materialise_tree(
            &config(&base, DirPreset::Flat),
            &request(
                vec![(source, "Movie 2024/Movie 2024.mkv".to_string())],
                true,
            ),
        )
        .await
        .unwrap();

        assert_eq!(outcome.save_path, base);
        assert!(base.join("Movie 2024/Movie 2024.mkv").exists());
    }

    #[tokio::test]
    async fn by_tracker_preset_groups_under_tracker() {
        let temp = TempDir::new().unwrap();
        let source = write_file(temp.path(), "source.mkv", b"data");
        let base = temp.path().join("links");

        let outcome = materialise_tree(
            &config(&base, DirPreset::ByTracker),
            &request(
                vec![(source, "Movie 2024/Movie 2024.mkv".to_string())],
                true,
            ),
        )
        .await
        .unwrap();

        assert_eq!(outcome.save_path, base.join("tracker.example"));
    }

    #[tokio::test]
    async fn by_instance_preset_groups_under_instance() {
        let temp = TempDir::new().unwrap();
        let source = write_file(temp.path(), "source.mkv", b"data");
        let base = temp.path().join("links");

        let outcome = materialise_tree(
            &config(&base, DirPreset::ByInstance),
            &request(
                vec![(source, "Movie 2024/Movie 2024.mkv".to_string())],
                true,
            ),
        )
        .await
        .unwrap();

        assert_eq!(outcome.save_path, base.join("seedbox"));
    }

    #[tokio::test]
    async fn forbidden_characters_are_sanitised() {
        let temp = TempDir::new().unwrap();
        let source = write_file(temp.path(), "source.mkv", b"data");
        let base = temp.path().join("links");

        let mut req = request(
            vec![(source, "Movie: 2024?/file|name.mkv".to_string())],
            true,
        );
        req.tracker = Some("tracker:9090".to_string());

        let outcome = materialise_tree(&config(&base, DirPreset::ByTracker), &req)
            .await
            .unwrap();

        assert_eq!(outcome.save_path, base.join("tracker9090"));
        assert!(outcome
            .save_path
            .join("Movie 2024")
            .join("filename.mkv")
            .exists());
    }

    #[tokio::test]
    async fn collision_aborts_without_overwriting() {
        let temp = TempDir::new().unwrap();
        let source = write_file(temp.path(), "source.mkv", b"new data");
        let base = temp.path().join("links");
        let existing_dir = base.join("Movie 2024");
        std::fs::create_dir_all(&existing_dir).unwrap();
        let existing = write_file(&existing_dir, "Movie 2024.mkv", b"old");

        let result = materialise_tree(
            &config(&base, DirPreset::Flat),
            &request(
                vec![(source, "Movie 2024/Movie 2024.mkv".to_string())],
                true,
            ),
        )
        .await;

        assert!(matches!(result, Err(LinkError::Collision(_))));
        assert_eq!(std::fs::read(existing).unwrap(), b"old");
    }

    #[tokio::test]
    async fn hardlinks_share_inode_data() {
        let temp = TempDir::new().unwrap();
        let source = write_file(temp.path(), "source.mkv", b"payload");
        let base = temp.path().join("links");

        let outcome = materialise_tree(
            &config(&base, DirPreset::Flat),
            &request(vec![(source.clone(), "renamed.mkv".to_string())], false),
        )
        .await
        .unwrap();

        let linked = outcome.save_path.join("renamed.mkv");
        assert_eq!(std::fs::read(&linked).unwrap(), b"payload");

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let a = std::fs::metadata(&source).unwrap();
            let b = std::fs::metadata(&linked).unwrap();
            assert_eq!(a.ino(), b.ino());
        }
    }

    #[tokio::test]
    async fn empty_base_dir_is_rejected() {
        let temp = TempDir::new().unwrap();
        let source = write_file(temp.path(), "source.mkv", b"data");
        let cfg = LinkConfig {
            base_dir: PathBuf::new(),
            mode: LinkMode::Hardlink,
            preset: DirPreset::Flat,
        };
        let result =
            materialise_tree(&cfg, &request(vec![(source, "x.mkv".to_string())], false)).await;
        assert!(matches!(result, Err(LinkError::BaseDirUnusable { .. })));
    }
}
