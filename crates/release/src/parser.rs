//! Release string parsing
//!
//! One pass of regex recognisers over a scene-style name, producing a
//! [`Release`]. Parsing never fails: anything unrecognisable comes
//! back with `ReleaseType::Unknown` and empty fields.

use crate::tokens::{canonical_codec, canonical_source, RESOLUTION_NUMBERS};
use once_cell::sync::Lazy;
use regex::Regex;
use reseed_core::{Release, ReleaseType};
use tracing::trace;

static SEASON_EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bS(\d{1,2})[. _-]?E(\d{1,4})").unwrap());

static SEASON_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bS(\d{1,2})\b").unwrap());

static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})[._ -](\d{1,2})[._ -](\d{1,2})\b").unwrap());

static BRACKET_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d{4})\.(\d{1,2})\.(\d{1,2})\]").unwrap());

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());

static RESOLUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(4320p|2160p|1080p|720p|576p|480p)\b|\bSD\b").unwrap());

static SOURCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(WEB[-_. ]?DL|WEB[-_. ]?Rip|Blu[-_. ]?Ray|BDMV|BDRip|BRRip|HDTV|DVDRip|SDTV|DVD|WEB)\b",
    )
    .unwrap()
});

static CODEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(x[. ]?264|x[. ]?265|h[. ]?264|h[. ]?265|HEVC|AVC|XviD|DivX|AV1|VP9)\b")
        .unwrap()
});

static AUDIO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(DDPA|DDP|DD\+|E-?AC-?3|AC3|DTS[-. ]?HD(?:[-. ]?MA)?|DTS[-. ]?X|DTS|TrueHD|Atmos|AAC|FLAC|MP3|OPUS|LPCM|PCM)\b",
    )
    .unwrap()
});

static CHANNELS: Lazy<Regex> = Lazy::new(|| Regex::new(r"([1-9]\.[0-9])\b").unwrap());

static LANGUAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(MULTi|FRENCH|GERMAN|ITALIAN|SPANISH|CASTELLANO|LATINO|NORDIC|DANISH|SWEDISH|NORWEGIAN|FINNISH|DUTCH|FLEMISH|POLISH|CZECH|HUNGARIAN|ROMANIAN|TURKISH|GREEK|RUSSIAN|UKRAINIAN|HEBREW|ARABIC|HINDI|TAMIL|TELUGU|JAPANESE|KOREAN|CHINESE|MANDARIN|CANTONESE|PORTUGUESE|BRAZILIAN|ENGLISH|VOSTFR)\b",
    )
    .unwrap()
});

static HDR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(HDR10\+|HDR10|HDR|DoVi|Dolby[. _-]?Vision|HLG)\b|\bDV\b").unwrap()
});

static OTHER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(REPACK\d?|PROPER|REAL|RERIP|HYBRID|REMUX|INTERNAL|LIMITED|EXTENDED|UNRATED|UNCUT|COMPLETE)\b",
    )
    .unwrap()
});

static COLLECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(IMAX|CRITERION|OPEN[. _-]?MATTE)\b").unwrap());

static GROUP_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-([A-Za-z0-9][A-Za-z0-9_]*)(?:\[[^\]]*\])?$").unwrap());

static GROUP_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[([^\]]+)\]\s*").unwrap());

static ANIME_ABSOLUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s-\s(\d{1,4})\b").unwrap());

static MUSIC_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(FLAC|ALAC|MP3|V0|V2|VINYL|DISCOGRAPHY)\b").unwrap());

static AUDIOBOOK_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(AUDIOBOOK|M4B)\b").unwrap());

static BOOK_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(EPUB|MOBI|AZW3?)\b").unwrap());

static COMIC_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(CBZ|CBR|CBT)\b").unwrap());

static GAME_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(NSW|PS[2-5]|XBOX(?:360|ONE)?|GOG|WII U?)\b").unwrap());

static APP_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(WIN64|WIN32|MACOS|KEYGEN|CRACKED)\b").unwrap());

static FILE_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(mkv|mp4|avi|m2ts|ts|wmv|mov|flac|mp3|m4b|epub|iso|img)$").unwrap()
});

/// Parse a release string into structured metadata. Never fails and is
/// idempotent; callers normally go through [`crate::ReleaseCache`].
pub fn parse_release(input: &str) -> Release {
    let name = FILE_EXTENSION.replace(input.trim(), "").into_owned();

    let mut release = Release::default();
    let mut title_cut = name.len();

    // Leading bracketed tag is the anime-convention release group.
    let body = if let Some(caps) = GROUP_PREFIX.captures(&name) {
        release.group = caps[1].to_string();
        &name[caps.get(0).unwrap().end()..]
    } else {
        name.as_str()
    };

    if let Some(caps) = SEASON_EPISODE.captures(body) {
        release.series = caps[1].parse().unwrap_or(0);
        release.episode = caps[2].parse().unwrap_or(0);
        title_cut = title_cut.min(caps.get(0).unwrap().start());
    } else if let Some(caps) = BRACKET_DATE.captures(body) {
        let (y, m, d) = (
            caps[1].parse().unwrap_or(0),
            caps[2].parse().unwrap_or(0),
            caps[3].parse().unwrap_or(0),
        );
        if (1900..=2100).contains(&y) {
            release.year = y;
            release.month = m;
            release.day = d;
            title_cut = title_cut.min(caps.get(0).unwrap().start());
        }
    } else if let Some(caps) = DATE.captures(body) {
        release.year = caps[1].parse().unwrap_or(0);
        release.month = caps[2].parse().unwrap_or(0);
        release.day = caps[3].parse().unwrap_or(0);
        title_cut = title_cut.min(caps.get(0).unwrap().start());
    } else if let Some(caps) = SEASON_ONLY.captures(body) {
        release.series = caps[1].parse().unwrap_or(0);
        title_cut = title_cut.min(caps.get(0).unwrap().start());
    }

    if release.year == 0 {
        // Scene convention puts the year after the title, so a title
        // that is itself a year ("1917", "2012") resolves by taking
        // the last plausible match.
        if let Some(m) = YEAR.find_iter(body).last() {
            let year: i32 = m.as_str().parse().unwrap_or(0);
            if (1900..=2100).contains(&year) {
                release.year = year;
                title_cut = title_cut.min(m.start());
            }
        }
    }

    if let Some(m) = RESOLUTION.find(body) {
        let token = m.as_str();
        release.resolution = if token.eq_ignore_ascii_case("sd") {
            "SD".to_string()
        } else {
            token.to_lowercase()
        };
        title_cut = title_cut.min(m.start());
    }

    if let Some(m) = SOURCE.find(body) {
        release.source = canonical_source(m.as_str());
        title_cut = title_cut.min(m.start());
    }

    for m in CODEC.find_iter(body) {
        let codec = canonical_codec(m.as_str());
        if !release.codecs.contains(&codec) {
            release.codecs.push(codec);
        }
        title_cut = title_cut.min(m.start());
    }

    for m in AUDIO.find_iter(body) {
        let token: String = m
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase();
        let token = if token == "DD" { "DDP".to_string() } else { token };
        if !release.audio.contains(&token) {
            release.audio.push(token);
        }
    }

    if let Some(caps) = CHANNELS.captures(body) {
        release.channels = caps[1].to_string();
    }

    if let Some(m) = LANGUAGE.find(body) {
        release.language = m.as_str().to_uppercase();
    }

    for m in HDR.find_iter(body) {
        let folded: String = m
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '+')
            .collect::<String>()
            .to_uppercase();
        let token = match folded.as_str() {
            "DOVI" | "DOLBYVISION" | "DV" => "DV".to_string(),
            other => other.to_string(),
        };
        if !release.hdr.contains(&token) {
            release.hdr.push(token);
        }
    }

    for m in OTHER.find_iter(body) {
        let mut token: String = m.as_str().to_uppercase();
        if token.starts_with("REPACK") {
            token = "REPACK".to_string();
        }
        if !release.other.contains(&token) {
            release.other.push(token);
        }
    }

    if let Some(m) = COLLECTION.find(body) {
        let folded: String = m
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase();
        release.collection = folded;
    }

    if release.group.is_empty() {
        if let Some(caps) = GROUP_SUFFIX.captures(body) {
            let group = caps[1].to_string();
            if !group.chars().all(|c| c.is_ascii_digit()) {
                release.group = group;
            }
        }
    }

    // Anime absolute numbering only applies when nothing structured
    // matched.
    if release.series == 0 && release.episode == 0 && release.month == 0 {
        if let Some(caps) = ANIME_ABSOLUTE.captures(body) {
            let number: i32 = caps[1].parse().unwrap_or(0);
            let is_resolution = RESOLUTION_NUMBERS.contains(&number);
            let is_year = (1900..=2100).contains(&number);
            if (1..=5000).contains(&number) && !is_resolution && !is_year {
                release.episode = number;
                title_cut = title_cut.min(caps.get(0).unwrap().start());
            }
        }
    }

    release.title = clean_title(&body[..title_cut.min(body.len())]);
    release.release_type = infer_type(&release, body);

    trace!(input, ?release.release_type, title = %release.title, "parsed release");
    release
}

fn clean_title(raw: &str) -> String {
    let folded: String = raw
        .chars()
        .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn infer_type(release: &Release, body: &str) -> ReleaseType {
    if AUDIOBOOK_HINT.is_match(body) {
        return ReleaseType::Audiobook;
    }
    if COMIC_HINT.is_match(body) {
        return ReleaseType::Comic;
    }
    if BOOK_HINT.is_match(body) {
        return ReleaseType::Book;
    }
    if GAME_HINT.is_match(body) {
        return ReleaseType::Game;
    }
    if APP_HINT.is_match(body) {
        return ReleaseType::App;
    }
    if release.month > 0 && release.day > 0 {
        return ReleaseType::Episode;
    }
    if release.series > 0 && release.episode > 0 {
        return ReleaseType::Episode;
    }
    if release.series > 0 {
        return ReleaseType::Series;
    }
    if release.episode > 0 {
        return ReleaseType::Episode;
    }
    // Music hints win over a bare year; the classifier corrects names
    // that carry unambiguous video signals alongside them.
    if MUSIC_HINT.is_match(body) {
        return ReleaseType::Music;
    }
    if release.year > 0 {
        return ReleaseType::Movie;
    }
    ReleaseType::Unknown
}
