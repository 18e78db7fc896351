//! Token tables shared by the parser, matcher-facing aliases and the
//! query builder

/// Collapse source spellings into a canonical token. Plain `WEB` stays
/// ambiguous on purpose; the matcher treats it as compatible with both
/// WEBDL and WEBRIP.
pub fn canonical_source(token: &str) -> String {
    let folded: String = token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    match folded.as_str() {
        "WEBDL" => "WEBDL".to_string(),
        "WEBRIP" => "WEBRIP".to_string(),
        "WEB" => "WEB".to_string(),
        "BLURAY" | "BLU" => "BLURAY".to_string(),
        "BDRIP" | "BRRIP" => "BDRIP".to_string(),
        "DVDRIP" => "DVDRIP".to_string(),
        "DVD" | "DVD5" | "DVD9" => "DVD".to_string(),
        "HDTV" => "HDTV".to_string(),
        "SDTV" => "SDTV".to_string(),
        "BDMV" => "BDMV".to_string(),
        other => other.to_string(),
    }
}

/// Collapse codec spellings: the x264/h.264 family normalises to AVC,
/// the x265/h.265 family to HEVC, everything else compares uppercased.
pub fn canonical_codec(token: &str) -> String {
    let folded: String = token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    match folded.as_str() {
        "X264" | "H264" | "AVC" => "AVC".to_string(),
        "X265" | "H265" | "HEVC" => "HEVC".to_string(),
        other => other.to_string(),
    }
}

/// Numeric resolution values excluded from anime absolute-episode
/// extraction
pub const RESOLUTION_NUMBERS: &[i32] = &[480, 576, 720, 1080, 2160, 4320];

/// Quality and source tokens stripped when cleaning a name into a
/// free-text query
pub const QUERY_STOP_TOKENS: &[&str] = &[
    "2160p", "1080p", "720p", "576p", "480p", "4320p", "4K", "UHD", "SD",
    "WEB-DL", "WEBDL", "WEBRip", "WEB", "BluRay", "Blu-Ray", "BDRip", "BRRip", "BDMV",
    "HDTV", "DVDRip", "DVD", "REMUX", "HYBRID", "REPACK", "PROPER", "INTERNAL",
    "x264", "x265", "h264", "h265", "H.264", "H.265", "HEVC", "AVC", "XviD", "DivX", "AV1",
    "DDP", "DDPA", "EAC3", "AC3", "DTS", "TrueHD", "Atmos", "AAC", "FLAC", "OPUS",
    "HDR10", "HDR", "DV", "DoVi", "HLG", "IMAX", "MULTI", "DUAL",
];

/// RIAJ manufacturer-code media classes, keyed by the third character
/// of the four-letter prefix in `ABCD-12345`
pub fn riaj_media(third: char) -> Option<RiajMedia> {
    match third.to_ascii_uppercase() {
        'C' => Some(RiajMedia::Cd),
        'S' => Some(RiajMedia::Sacd),
        'D' => Some(RiajMedia::DvdVideo),
        'B' => Some(RiajMedia::Bluray),
        'X' => Some(RiajMedia::DvdAudio),
        'R' => Some(RiajMedia::CdRom),
        'G' => Some(RiajMedia::PsGame),
        _ => None,
    }
}

/// Media classes encoded by RIAJ manufacturer codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RiajMedia {
    Cd,
    Sacd,
    DvdAudio,
    DvdVideo,
    Bluray,
    CdRom,
    PsGame,
}

impl RiajMedia {
    pub fn is_audio(&self) -> bool {
        matches!(self, RiajMedia::Cd | RiajMedia::Sacd | RiajMedia::DvdAudio)
    }

    pub fn is_video(&self) -> bool {
        matches!(self, RiajMedia::DvdVideo | RiajMedia::Bluray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_aliases_collapse() {
        assert_eq!(canonical_source("WEB-DL"), "WEBDL");
        assert_eq!(canonical_source("WEBDL"), "WEBDL");
        assert_eq!(canonical_source("WEB-dl"), "WEBDL");
        assert_eq!(canonical_source("WEBRip"), "WEBRIP");
        assert_eq!(canonical_source("Blu-Ray"), "BLURAY");
        assert_eq!(canonical_source("WEB"), "WEB");
    }

    #[test]
    fn codec_aliases_collapse() {
        for raw in ["x264", "X264", "h.264", "H264", "AVC"] {
            assert_eq!(canonical_codec(raw), "AVC");
        }
        for raw in ["x265", "h.265", "H265", "HEVC"] {
            assert_eq!(canonical_codec(raw), "HEVC");
        }
        assert_eq!(canonical_codec("XviD"), "XVID");
    }

    #[test]
    fn riaj_third_character_table() {
        assert_eq!(riaj_media('C'), Some(RiajMedia::Cd));
        assert_eq!(riaj_media('B'), Some(RiajMedia::Bluray));
        assert!(riaj_media('C').unwrap().is_audio());
        assert!(riaj_media('D').unwrap().is_video());
        assert_eq!(riaj_media('Q'), None);
    }
}
