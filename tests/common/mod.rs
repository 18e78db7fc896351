//! Shared builders for integration tests

use reseed_core::{Candidate, ClientTorrent, TorrentFile, TorrentInfo, TorrentProperties};
use serde::Serialize;
use serde_bytes::ByteBuf;

/// Opt-in log output for debugging test runs; safe to call repeatedly
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[derive(Serialize)]
struct BencodeFile {
    length: i64,
    path: Vec<String>,
}

#[derive(Serialize)]
struct BencodeInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<BencodeFile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    length: Option<i64>,
    name: String,
    #[serde(rename = "piece length")]
    piece_length: i64,
    pieces: ByteBuf,
}

#[derive(Serialize)]
struct BencodeMeta {
    announce: String,
    info: BencodeInfo,
}

fn piece_bytes(total_size: u64, piece_length: u64) -> ByteBuf {
    let pieces = total_size.div_ceil(piece_length).max(1) as usize;
    ByteBuf::from(vec![0u8; pieces * 20])
}

/// Bencoded single-file torrent
pub fn single_file_torrent(name: &str, size: u64) -> Vec<u8> {
    let meta = BencodeMeta {
        announce: "http://tracker.example/announce".to_string(),
        info: BencodeInfo {
            files: None,
            length: Some(size as i64),
            name: name.to_string(),
            piece_length: 16_384,
            pieces: piece_bytes(size, 16_384),
        },
    };
    serde_bencode::to_bytes(&meta).unwrap()
}

/// Bencoded multi-file torrent; paths are relative to the root `name`
pub fn multi_file_torrent(name: &str, files: &[(&str, u64)]) -> Vec<u8> {
    let total: u64 = files.iter().map(|(_, s)| s).sum();
    let meta = BencodeMeta {
        announce: "http://tracker.example/announce".to_string(),
        info: BencodeInfo {
            files: Some(
                files
                    .iter()
                    .map(|(path, size)| BencodeFile {
                        length: *size as i64,
                        path: path.split('/').map(str::to_string).collect(),
                    })
                    .collect(),
            ),
            length: None,
            name: name.to_string(),
            piece_length: 16_384,
            pieces: piece_bytes(total, 16_384),
        },
    };
    serde_bencode::to_bytes(&meta).unwrap()
}

/// A locally-seeded source torrent for pipeline tests
pub fn source_candidate(name: &str, files: &[(&str, u64)], save_path: &str) -> Candidate {
    Candidate {
        instance_id: 1,
        instance_name: "local".to_string(),
        torrent: TorrentInfo {
            name: name.to_string(),
            info_hash: "aa".repeat(20),
            piece_length: 0,
            files: files
                .iter()
                .map(|(path, size)| TorrentFile::new(*path, *size))
                .collect(),
            announce_domains: vec![],
        },
        properties: TorrentProperties {
            save_path: save_path.to_string(),
            content_path: format!("{}/{}", save_path, name),
            progress: 1.0,
            state: "uploading".to_string(),
            ..Default::default()
        },
    }
}

/// A torrent row as a qBittorrent instance would report it
pub fn client_torrent(hash: &str, name: &str, tags: &[&str], save_path: &str) -> ClientTorrent {
    ClientTorrent {
        hash: hash.to_string(),
        name: name.to_string(),
        state: "uploading".to_string(),
        progress: 1.0,
        size: 0,
        save_path: save_path.to_string(),
        content_path: format!("{}/{}", save_path, name),
        category: String::new(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        auto_managed: false,
        completed_on: None,
    }
}
