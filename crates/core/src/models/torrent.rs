//! Torrent shapes shared across the engine

use serde::{Deserialize, Serialize};

/// A single payload file inside a torrent.
///
/// Paths use `/` separators; the root folder (if any) is always the
/// first path segment. Sizes are bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFile {
    pub path: String,
    pub size: u64,
    /// Inclusive range of piece indices this file's bytes fall into
    pub piece_range: (u32, u32),
}

impl TorrentFile {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            piece_range: (0, 0),
        }
    }

    /// First path segment, e.g. the root folder for multi-file layouts
    pub fn first_segment(&self) -> &str {
        self.path.split('/').next().unwrap_or("")
    }

    /// Final path segment (the file name)
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }
}

/// Parsed torrent metainfo. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentInfo {
    pub name: String,
    /// Hex-encoded SHA-1 of the bencoded info dictionary, lowercase
    pub info_hash: String,
    pub piece_length: u64,
    pub files: Vec<TorrentFile>,
    /// Hosts from announce/announce-list; the first entry is the
    /// primary tracker for display purposes
    pub announce_domains: Vec<String>,
}

impl TorrentInfo {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Single-file torrents have exactly one file whose path has no
    /// directory component.
    pub fn is_single_file(&self) -> bool {
        self.files.len() == 1 && !self.files[0].path.contains('/')
    }

    /// The folder shared by every file as its first path segment, when
    /// one exists. Single-file and rootless multi-file torrents have
    /// none.
    pub fn root_folder(&self) -> Option<&str> {
        let mut segments = self
            .files
            .iter()
            .map(|f| f.path.split_once('/').map(|(root, _)| root));
        let first = segments.next().flatten()?;
        if segments.all(|s| s == Some(first)) {
            Some(first)
        } else {
            None
        }
    }

    pub fn primary_tracker(&self) -> Option<&str> {
        self.announce_domains.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(files: Vec<TorrentFile>) -> TorrentInfo {
        TorrentInfo {
            name: "t".to_string(),
            info_hash: "00".repeat(20),
            piece_length: 16384,
            files,
            announce_domains: vec![],
        }
    }

    #[test]
    fn root_folder_shared() {
        let t = info(vec![
            TorrentFile::new("Show.S01/ep1.mkv", 1),
            TorrentFile::new("Show.S01/ep2.mkv", 1),
        ]);
        assert_eq!(t.root_folder(), Some("Show.S01"));
    }

    #[test]
    fn root_folder_absent_for_single_file() {
        let t = info(vec![TorrentFile::new("movie.mkv", 1)]);
        assert!(t.is_single_file());
        assert_eq!(t.root_folder(), None);
    }

    #[test]
    fn root_folder_absent_when_mixed() {
        let t = info(vec![
            TorrentFile::new("a/ep1.mkv", 1),
            TorrentFile::new("b/ep2.mkv", 1),
        ]);
        assert_eq!(t.root_folder(), None);
    }
}
