//! Piece-boundary safety analysis
//!
//! A piece that straddles a content file and an ignored-or-missing
//! file cannot be verified from the content file alone: letting the
//! client fetch the "missing" side re-hashes the piece and a mismatch
//! corrupts the content file. Injection is unsafe while any content
//! transition sits off a piece boundary.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A file in torrent order, flagged by whether its bytes are content
/// the source actually provides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedFile {
    pub path: String,
    pub size: u64,
    pub is_content: bool,
}

impl AnnotatedFile {
    pub fn new(path: impl Into<String>, size: u64, is_content: bool) -> Self {
        Self {
            path: path.into(),
            size,
            is_content,
        }
    }
}

/// One misaligned content transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryViolation {
    /// Byte offset of the transition
    pub offset: u64,
    /// Piece index containing the transition
    pub piece_index: u32,
    /// File ending at the transition
    pub before: String,
    /// File beginning at the transition
    pub after: String,
}

/// Outcome of the boundary walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceBoundaryReport {
    pub safe: bool,
    pub violations: Vec<BoundaryViolation>,
}

/// Walk the ordered file list and require every flip of the content
/// flag to land on a piece boundary. The operation is unsafe when any
/// violation exists alongside at least one non-content file.
pub fn check_piece_boundaries(files: &[AnnotatedFile], piece_length: u64) -> PieceBoundaryReport {
    let mut violations = Vec::new();
    if piece_length == 0 {
        return PieceBoundaryReport {
            safe: false,
            violations,
        };
    }

    let mut offset = 0u64;
    for pair in files.windows(2) {
        offset += pair[0].size;
        if pair[0].is_content != pair[1].is_content && offset % piece_length != 0 {
            violations.push(BoundaryViolation {
                offset,
                piece_index: (offset / piece_length) as u32,
                before: pair[0].path.clone(),
                after: pair[1].path.clone(),
            });
        }
    }

    let has_non_content = files.iter().any(|f| !f.is_content);
    let safe = violations.is_empty() || !has_non_content;
    if !safe {
        debug!(
            violations = violations.len(),
            piece_length, "piece-boundary violations found"
        );
    }
    PieceBoundaryReport { safe, violations }
}
