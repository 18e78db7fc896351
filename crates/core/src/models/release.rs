//! Structured release metadata parsed from torrent and file names

use serde::{Deserialize, Serialize};

/// Broad content type of a release, derived from its name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseType {
    Movie,
    Episode,
    Series,
    Music,
    Audiobook,
    Book,
    Comic,
    Game,
    App,
    #[default]
    Unknown,
}

/// Structured metadata parsed from a release string.
///
/// All fields are always present; zero or empty means the field was not
/// recognised in the name. A `Release` is never mutated after
/// construction — the parser cache hands out shared references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Cleaned title tokens, separator characters folded to spaces
    pub title: String,
    /// Release year (0 when absent)
    pub year: i32,
    /// Season number (0 when absent)
    pub series: i32,
    /// Episode number (0 when absent); for multi-episode names this is
    /// the first episode
    pub episode: i32,
    /// Air-date components for date-based releases (0 when absent)
    pub month: i32,
    pub day: i32,
    /// Source after alias collapsing (WEBDL, WEBRIP, BLURAY, HDTV, ...)
    pub source: String,
    /// Resolution token (2160p, 1080p, 720p, 576p, 480p, SD, or empty)
    pub resolution: String,
    /// Video codecs after alias collapsing (AVC, HEVC, ...)
    pub codecs: Vec<String>,
    /// Audio codec tokens as seen (DDP, DTS-HD, TRUEHD, ...)
    pub audio: Vec<String>,
    /// Audio channel layout (5.1, 7.1, 2.0, or empty)
    pub channels: String,
    /// Language token (empty means unspecified, treated as English)
    pub language: String,
    /// Collection tag naming a distinct video master (IMAX, ...)
    pub collection: String,
    /// HDR flags (HDR, HDR10, DV, ...)
    pub hdr: Vec<String>,
    /// Remaining flags: REPACK, PROPER, HYBRID, REMUX, INTERNAL, ...
    pub other: Vec<String>,
    /// Release group (empty when absent)
    pub group: String,
    /// Content type tag
    pub release_type: ReleaseType,
}

impl Release {
    /// A season pack carries a season marker but no episode marker.
    pub fn is_season_pack(&self) -> bool {
        self.series > 0 && self.episode == 0
    }

    pub fn has_episode(&self) -> bool {
        self.episode > 0
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.other.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    /// Canonical key for season-pack vs. episode set membership.
    pub fn key(&self) -> ReleaseKey {
        ReleaseKey {
            series: self.series,
            episode: self.episode,
            year: self.year,
            month: self.month,
            day: self.day,
        }
    }
}

/// Canonical tuple used for set membership between packs and episodes.
///
/// Zero fields are wildcards for partial-match computations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ReleaseKey {
    pub series: i32,
    pub episode: i32,
    pub year: i32,
    pub month: i32,
    pub day: i32,
}

impl ReleaseKey {
    pub fn is_empty(&self) -> bool {
        *self == ReleaseKey::default()
    }

    /// Wildcard-aware comparison: a zero field on either side matches
    /// any value on the other.
    pub fn matches(&self, other: &ReleaseKey) -> bool {
        fn field(a: i32, b: i32) -> bool {
            a == 0 || b == 0 || a == b
        }
        field(self.series, other.series)
            && field(self.episode, other.episode)
            && field(self.year, other.year)
            && field(self.month, other.month)
            && field(self.day, other.day)
    }
}
