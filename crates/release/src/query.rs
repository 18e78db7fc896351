//! Torznab query construction
//!
//! Builds a safe query for a torrent name. Structured season/episode
//! metadata passes through as query parameters; names without it
//! (anime absolute numbering in particular) are cleaned into free
//! text with the episode number extracted separately.

use crate::tokens::{QUERY_STOP_TOKENS, RESOLUTION_NUMBERS};
use once_cell::sync::Lazy;
use regex::Regex;
use reseed_core::{Release, TorznabQuery};
use tracing::trace;

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").unwrap());

static STOP_TOKENS: Lazy<Regex> = Lazy::new(|| {
    let alternation = QUERY_STOP_TOKENS
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).unwrap()
});

static DASH_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s-\s*(\d{1,4})\b").unwrap());

static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{2,4})\b").unwrap());

static FILE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(mkv|mp4|avi|m2ts|ts|wmv|mov)$").unwrap());

/// Build a Torznab query for a torrent name and its parsed release.
pub fn build_search_query(name: &str, release: &Release) -> TorznabQuery {
    // Structured metadata is always preferred over free text.
    if release.series > 0 {
        return TorznabQuery {
            query: release.title.clone(),
            season: Some(release.series),
            episode: (release.episode > 0).then_some(release.episode),
        };
    }

    let stripped = FILE_EXTENSION.replace(name.trim(), "");
    let without_brackets = BRACKETED.replace_all(&stripped, " ");
    let without_tokens = STOP_TOKENS.replace_all(&without_brackets, " ");

    let episode = extract_absolute_episode(&without_tokens);

    let mut cleaned: String = without_tokens
        .chars()
        .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
        .collect();
    if let Some(number) = episode {
        // The episode rides as a parameter; keep it out of the text
        cleaned = cleaned.replacen(&number.to_string(), " ", 1);
    }
    let query = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let result = TorznabQuery {
        query,
        season: None,
        episode,
    };
    trace!(name, query = %result.query, episode = ?result.episode, "built search query");
    result
}

fn plausible_episode(number: i32) -> bool {
    (1..=5000).contains(&number)
        && !RESOLUTION_NUMBERS.contains(&number)
        && !(1900..=2100).contains(&number)
}

fn extract_absolute_episode(cleaned: &str) -> Option<i32> {
    // First preference: the number directly after a dash
    if let Some(caps) = DASH_NUMBER.captures(cleaned) {
        let number: i32 = caps[1].parse().ok()?;
        if plausible_episode(number) {
            return Some(number);
        }
    }
    // Fallback: the first plausible bare number
    for caps in BARE_NUMBER.captures_iter(cleaned) {
        if let Ok(number) = caps[1].parse::<i32>() {
            if plausible_episode(number) {
                return Some(number);
            }
        }
    }
    None
}
