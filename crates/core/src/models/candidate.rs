//! Candidates, injection requests and injection outcomes

use crate::models::torrent::TorrentInfo;
use serde::{Deserialize, Serialize};

/// qBittorrent content layout for added torrents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentLayout {
    Original,
    Subfolder,
    NoSubfolder,
}

impl ContentLayout {
    /// Wire value understood by the qBittorrent add endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentLayout::Original => "Original",
            ContentLayout::Subfolder => "Subfolder",
            ContentLayout::NoSubfolder => "NoSubfolder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Original" => Some(ContentLayout::Original),
            "Subfolder" => Some(ContentLayout::Subfolder),
            "NoSubfolder" => Some(ContentLayout::NoSubfolder),
            _ => None,
        }
    }
}

/// Live properties of a torrent already present in a qBittorrent
/// instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TorrentProperties {
    pub save_path: String,
    /// Absolute path of the torrent's content root
    pub content_path: String,
    pub category: String,
    pub tags: Vec<String>,
    pub auto_managed: bool,
    pub content_layout: Option<ContentLayout>,
    pub progress: f64,
    pub state: String,
}

impl TorrentProperties {
    /// States in which qBittorrent cannot vouch for the payload
    pub fn is_errored(&self) -> bool {
        matches!(self.state.as_str(), "error" | "missingFiles")
    }
}

/// A locally-seeded torrent that cross-seed candidates are matched
/// against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub instance_id: i32,
    pub instance_name: String,
    pub torrent: TorrentInfo,
    pub properties: TorrentProperties,
}

impl Candidate {
    /// Only complete, non-errored torrents are matching targets.
    pub fn is_viable_target(&self) -> bool {
        self.properties.progress >= 1.0 && !self.properties.is_errored()
    }
}

/// User-level intent for a single cross-seed attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossSeedRequest {
    pub indexer_name: Option<String>,
    pub start_paused: bool,
    pub skip_auto_resume: bool,
    pub skip_recheck: bool,
    pub category_override: Option<String>,
    pub extra_tags: Vec<String>,
}

/// Derived constraint on how a torrent may be added.
///
/// Computed purely from the source file list; disc layouts force a
/// paused, never-auto-resumed add because a mis-ordered Blu-ray
/// structure corrupts on recheck.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPolicy {
    pub force_paused: bool,
    pub force_skip_auto_resume: bool,
    pub disc_layout: bool,
    /// Marker directory that triggered disc detection (BDMV, VIDEO_TS)
    pub disc_marker: Option<String>,
}

/// Machine-readable status of one injection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionStatus {
    Added,
    SkippedDuplicate,
    SkippedRecheck,
    HardlinkError,
    ReflinkError,
    LayoutMismatch,
    SizeMismatch,
    NoMatch,
    Disabled,
}

impl InjectionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, InjectionStatus::Added | InjectionStatus::SkippedDuplicate)
    }
}

/// Result of a single injection attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionOutcome {
    pub success: bool,
    pub status: InjectionStatus,
    pub message: String,
    pub info_hash: Option<String>,
}

impl InjectionOutcome {
    pub fn added(info_hash: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: InjectionStatus::Added,
            message: message.into(),
            info_hash: Some(info_hash.into()),
        }
    }

    pub fn duplicate(info_hash: impl Into<String>) -> Self {
        Self {
            success: true,
            status: InjectionStatus::SkippedDuplicate,
            message: "torrent already present in instance".to_string(),
            info_hash: Some(info_hash.into()),
        }
    }

    pub fn rejected(status: InjectionStatus, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            message: message.into(),
            info_hash: None,
        }
    }
}
