//! Content classification
//!
//! Maps a parsed release to indexer categories and the Torznab search
//! type needed to find it. Rules apply in order; the first match wins.

use crate::parser::parse_release;
use crate::tokens::riaj_media;
use once_cell::sync::Lazy;
use regex::Regex;
use reseed_core::{Release, ReleaseType};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use crate::tokens::RiajMedia as MediaType;

static XXX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bxxx\b").unwrap());

/// Catalogue codes: JAV identifiers (`ABC-1234`, `ABCD-123`) and RIAJ
/// manufacturer codes (`ABCD-12345`) share this shape.
static CATALOGUE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{3,5})-(\d{3,5})\b").unwrap());

static ADULT_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{6}[_-]\d{3}").unwrap());

static BRACKET_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d{4}\.\d{1,2}\.\d{1,2}\]").unwrap());

static VIDEO_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(BluRay|Blu-Ray|WEB[-_. ]?DL|WEBRip|HDTV|BDMV|m2ts)\b").unwrap()
});

/// Benign xXx references that must not trip the adult rule
static BENIGN_XXX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(xxxtentacion|xander[. _-]?cage|state[. _-]of[. _-]the[. _-]union)").unwrap()
});

/// Technical tokens that look like catalogue-code prefixes but never
/// are
const CODE_PREFIX_STOPLIST: &[&str] = &[
    "WEB", "FLAC", "AAC", "OPUS", "DDP", "DDPA", "DTS", "AVC", "HEVC", "XVID", "DIVX", "HDR",
    "IMAX", "NSW", "GOG", "VOL", "PART", "DISC", "OVA", "UHD", "PCM", "LPCM", "HMAX", "AMZN",
    "ATVP", "HULU",
];

/// Broad content buckets used for category and capability dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Movie,
    Tv,
    Music,
    Book,
    Game,
    App,
    Adult,
    Unknown,
}

/// Torznab search verb required for a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Movie,
    TvSearch,
    Music,
    Book,
    Search,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Movie => "movie",
            SearchType::TvSearch => "tvsearch",
            SearchType::Music => "music",
            SearchType::Book => "book",
            SearchType::Search => "search",
        }
    }

    /// Torznab capability an indexer must advertise for this verb
    pub fn required_caps(&self) -> Vec<String> {
        let caps: &[&str] = match self {
            SearchType::Movie => &["movie-search"],
            SearchType::TvSearch => &["tv-search"],
            SearchType::Music => &["audio-search"],
            SearchType::Book => &["book-search"],
            SearchType::Search => &["search"],
        };
        caps.iter().map(|s| s.to_string()).collect()
    }
}

/// Classification result for one release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentClass {
    pub content_type: ContentType,
    pub categories: Vec<i32>,
    pub search_type: SearchType,
    pub required_caps: Vec<String>,
    pub is_music: bool,
    pub media_type: Option<MediaType>,
}

impl ContentClass {
    fn of(content_type: ContentType) -> Self {
        let (categories, search_type, is_music) = match content_type {
            ContentType::Movie => (vec![2000], SearchType::Movie, false),
            ContentType::Tv => (vec![5000], SearchType::TvSearch, false),
            ContentType::Music => (vec![3000], SearchType::Music, true),
            ContentType::Book => (vec![8000], SearchType::Book, false),
            ContentType::Game => (vec![4000], SearchType::Search, false),
            ContentType::App => (vec![4000], SearchType::Search, false),
            ContentType::Adult => (vec![6000], SearchType::Search, false),
            ContentType::Unknown => (vec![], SearchType::Search, false),
        };
        let required_caps = search_type.required_caps();
        Self {
            content_type,
            categories,
            search_type,
            required_caps,
            is_music,
            media_type: None,
        }
    }

    fn with_media(mut self, media: MediaType) -> Self {
        self.media_type = Some(media);
        self
    }
}

/// Classify a release. `name` is the raw release string the release
/// was parsed from; the adult and catalogue-code checks need the
/// uncleaned form because title cleaning folds the separators they
/// key on.
pub fn classify(name: &str, release: &Release) -> ContentClass {
    let class = classify_inner(name, release, true);
    debug!(name, content_type = ?class.content_type, "classified release");
    class
}

fn classify_inner(name: &str, release: &Release, allow_jav_retry: bool) -> ContentClass {
    // Rule 1: adult detection on the raw name, title and collection
    let adult_fields = format!("{} {} {}", name, release.title, release.collection);
    if XXX.is_match(&adult_fields) && !is_benign_xxx(&adult_fields, release) {
        return ContentClass::of(ContentType::Adult);
    }
    if ADULT_DATE.is_match(name) || BRACKET_DATE.is_match(name) {
        return ContentClass::of(ContentType::Adult);
    }

    if let Some((prefix, digits, _)) = catalogue_code(name) {
        if riaj_interpretation(&prefix, &digits).is_none() && digits.len() <= 4 {
            // Rule 2: strip the code and retry; keep adult when the
            // residue has no better interpretation
            if allow_jav_retry {
                let residue = CATALOGUE_CODE.replace(name, " ").into_owned();
                let residue = residue.trim();
                if !residue.is_empty() {
                    let retry_release = parse_release(residue);
                    let retry = classify_inner(residue, &retry_release, false);
                    if !matches!(retry.content_type, ContentType::Adult | ContentType::Unknown) {
                        return retry;
                    }
                }
            }
            return ContentClass::of(ContentType::Adult);
        }
    }

    // Rule 3: typed dispatch
    let typed = match release.release_type {
        ReleaseType::Movie => Some(ContentType::Movie),
        ReleaseType::Episode | ReleaseType::Series => Some(ContentType::Tv),
        ReleaseType::Music => Some(ContentType::Music),
        ReleaseType::Audiobook => Some(ContentType::Music),
        ReleaseType::Book | ReleaseType::Comic => Some(ContentType::Book),
        ReleaseType::Game => Some(ContentType::Game),
        ReleaseType::App => Some(ContentType::App),
        ReleaseType::Unknown => None,
    };
    if let Some(content_type) = typed {
        let class = ContentClass::of(content_type);
        return correct_music_misclassification(class, name, release);
    }

    // Rule 4: unknown fallback via structural fields
    if release.series > 0 || release.episode > 0 {
        return ContentClass::of(ContentType::Tv);
    }
    if release.year > 0 {
        return ContentClass::of(ContentType::Movie);
    }

    // Rule 5: RIAJ media-code inference
    if let Some((prefix, digits, _)) = catalogue_code(name) {
        if let Some(media) = riaj_interpretation(&prefix, &digits) {
            let content_type = if media.is_audio() {
                ContentType::Music
            } else if media.is_video() {
                ContentType::Movie
            } else if media == MediaType::PsGame {
                ContentType::Game
            } else {
                ContentType::App
            };
            return ContentClass::of(content_type).with_media(media);
        }
    }

    ContentClass::of(ContentType::Unknown)
}

fn catalogue_code(name: &str) -> Option<(String, String, usize)> {
    for caps in CATALOGUE_CODE.captures_iter(name) {
        let prefix = caps[1].to_string();
        if CODE_PREFIX_STOPLIST.contains(&prefix.as_str()) {
            continue;
        }
        let digits = caps[2].to_string();
        // Year-like numbers are release years, not catalogue numbers
        if digits.len() == 4 {
            if let Ok(n) = digits.parse::<i32>() {
                if (1900..=2100).contains(&n) {
                    continue;
                }
            }
        }
        return Some((prefix, digits, caps.get(0).unwrap().start()));
    }
    None
}

fn is_benign_xxx(fields: &str, release: &Release) -> bool {
    if BENIGN_XXX.is_match(fields) {
        return true;
    }
    // The xXx films themselves: a bare "xXx" title in a film year
    let title_is_bare_xxx = release.title.trim().eq_ignore_ascii_case("xxx");
    title_is_bare_xxx && matches!(release.year, 2002 | 2005 | 2017)
}

fn riaj_interpretation(prefix: &str, digits: &str) -> Option<MediaType> {
    if prefix.len() != 4 || !(4..=5).contains(&digits.len()) {
        return None;
    }
    let third = prefix.chars().nth(2)?;
    riaj_media(third)
}

fn correct_music_misclassification(
    class: ContentClass,
    name: &str,
    release: &Release,
) -> ContentClass {
    if class.content_type != ContentType::Music {
        return class;
    }
    let has_video_hint = !release.resolution.is_empty()
        || !release.hdr.is_empty()
        || release
            .codecs
            .iter()
            .any(|c| matches!(c.as_str(), "AVC" | "HEVC" | "XVID" | "DIVX" | "AV1"))
        || VIDEO_TOKEN.is_match(name);
    if !has_video_hint {
        return class;
    }
    if release.series > 0 || release.episode > 0 {
        ContentClass::of(ContentType::Tv)
    } else {
        ContentClass::of(ContentType::Movie)
    }
}
