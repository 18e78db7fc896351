//! File planning and link materialisation
//!
//! Given the files of a locally-seeded torrent and a discovered
//! candidate, this crate decides whether the candidate's expected
//! layout can be made to resolve to the data already on disk: layout
//! classification, rename plans, size-mismatch detection, the
//! piece-boundary safety walk, and construction of hardlink/reflink
//! trees when filenames differ.

pub mod layout;
pub mod linker;
pub mod pieces;
pub mod rename;

pub use layout::{classify_torrent_layout, detect_add_policy, is_ignored_path, TorrentLayout};
pub use linker::{materialise_tree, DirPreset, LinkConfig, LinkError, LinkMode, LinkOutcome, LinkRequest};
pub use pieces::{check_piece_boundaries, AnnotatedFile, BoundaryViolation, PieceBoundaryReport};
pub use rename::{
    build_file_rename_plan, content_size_mismatches, needs_rename_alignment, normalize_file_key,
    RenameOp, RenamePlan, SizeMismatch,
};
