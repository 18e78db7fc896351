//! Bencoded metainfo decoding

use reseed_core::{TorrentFile, TorrentInfo};
use serde::Deserialize;
use serde_bencode::value::Value;
use serde_bytes::ByteBuf;
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::trace;
use url::Url;

#[derive(Error, Debug)]
pub enum TorrentParseError {
    #[error("invalid bencode: {0}")]
    Bencode(String),

    #[error("missing info dictionary")]
    MissingInfo,

    #[error("invalid piece length: {0}")]
    InvalidPieceLength(i64),

    #[error("pieces length {0} is not a multiple of 20")]
    InvalidPieces(usize),

    #[error("torrent has no files")]
    NoFiles,
}

/// Top-level metainfo keys the engine reads. The `info` dictionary is
/// kept as a raw bencode value so the hash is computed over exactly
/// the bytes the torrent carries, unknown keys included.
#[derive(Debug, Deserialize)]
struct Metainfo {
    #[serde(default)]
    announce: Option<String>,
    #[serde(default, rename = "announce-list")]
    announce_list: Option<Vec<Vec<String>>>,
    info: Value,
}

#[derive(Debug, Deserialize)]
struct Info {
    name: String,
    #[serde(rename = "piece length")]
    piece_length: i64,
    pieces: ByteBuf,
    #[serde(default)]
    length: Option<i64>,
    #[serde(default)]
    files: Option<Vec<InfoFile>>,
}

#[derive(Debug, Deserialize)]
struct InfoFile {
    length: i64,
    path: Vec<String>,
}

/// Parse bencoded torrent metainfo into the engine's torrent shape.
pub fn parse_torrent(bytes: &[u8]) -> Result<TorrentInfo, TorrentParseError> {
    let meta: Metainfo =
        serde_bencode::from_bytes(bytes).map_err(|e| TorrentParseError::Bencode(e.to_string()))?;

    // Re-encode the info value; bencode dictionaries have a canonical
    // key order, so this reproduces the original bytes.
    let info_bytes =
        serde_bencode::to_bytes(&meta.info).map_err(|e| TorrentParseError::Bencode(e.to_string()))?;
    let info_hash = hex_digest(&info_bytes);

    let info: Info = serde_bencode::from_bytes(&info_bytes)
        .map_err(|_| TorrentParseError::MissingInfo)?;

    if info.piece_length <= 0 {
        return Err(TorrentParseError::InvalidPieceLength(info.piece_length));
    }
    if info.pieces.len() % 20 != 0 {
        return Err(TorrentParseError::InvalidPieces(info.pieces.len()));
    }
    let piece_length = info.piece_length as u64;

    let mut files = Vec::new();
    match (&info.files, info.length) {
        (Some(shared), _) => {
            for f in shared {
                let mut path = String::from(&info.name);
                for segment in &f.path {
                    path.push('/');
                    path.push_str(segment);
                }
                files.push(TorrentFile::new(path, f.length.max(0) as u64));
            }
        }
        (None, Some(length)) => {
            files.push(TorrentFile::new(info.name.clone(), length.max(0) as u64));
        }
        (None, None) => return Err(TorrentParseError::NoFiles),
    }
    if files.is_empty() {
        return Err(TorrentParseError::NoFiles);
    }

    assign_piece_ranges(&mut files, piece_length);

    let announce_domains = announce_domains(&meta);
    trace!(
        name = %info.name,
        files = files.len(),
        hash = %info_hash,
        "parsed torrent metainfo"
    );

    Ok(TorrentInfo {
        name: info.name,
        info_hash,
        piece_length,
        files,
        announce_domains,
    })
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(40);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Annotate each file with the inclusive range of piece indices its
/// bytes fall into. Zero-length files inherit the piece at their
/// offset.
fn assign_piece_ranges(files: &mut [TorrentFile], piece_length: u64) {
    let mut offset = 0u64;
    for file in files {
        let start = (offset / piece_length) as u32;
        let end = if file.size > 0 {
            ((offset + file.size - 1) / piece_length) as u32
        } else {
            start
        };
        file.piece_range = (start, end);
        offset += file.size;
    }
}

/// Hosts from `announce` and `announce-list`, order-preserving and
/// deduplicated. The first tier's first entry leads, so it resolves as
/// the primary tracker for display.
fn announce_domains(meta: &Metainfo) -> Vec<String> {
    let mut domains: Vec<String> = Vec::new();
    let mut push = |raw: &str| {
        if let Ok(url) = Url::parse(raw) {
            if let Some(host) = url.host_str() {
                if !domains.iter().any(|d| d == host) {
                    domains.push(host.to_string());
                }
            }
        }
    };

    if let Some(tiers) = &meta.announce_list {
        for tier in tiers {
            for entry in tier {
                push(entry);
            }
        }
    }
    if let Some(announce) = &meta.announce {
        push(announce);
    }
    domains
}
