//! Candidate matching
//!
//! Decides whether two parsed releases describe the same underlying
//! content closely enough to be cross-seeded: field-level
//! compatibility rules, season-pack versus episode relationships, and
//! set-based partial matching over release keys.

pub mod normalize;
pub mod partial;
pub mod rules;

pub use normalize::{fold_ascii, normalize_title};
pub use partial::{keyed_sets_match, PARTIAL_MATCH_THRESHOLD};
pub use rules::{
    compare_releases, releases_match, should_align_files_with_candidate,
    should_rename_torrent_display, FieldMismatch,
};
