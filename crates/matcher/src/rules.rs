//! Field-level compatibility rules between two releases

use crate::normalize::normalize_title;
use reseed_core::Release;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// First field that failed compatibility, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMismatch {
    Title,
    Year,
    Series,
    Episode,
    AirDate,
    Source,
    Resolution,
    Codec,
    Language,
    Collection,
    MasterFlags,
    Repack,
    Group,
}

/// Flags that may differ when one side is a season pack
const REPACK_FLAGS: &[&str] = &["REPACK", "PROPER", "REAL", "RERIP"];

/// Flags naming a distinct video master; always compared exactly
const MASTER_FLAGS: &[&str] = &["HYBRID", "REMUX"];

/// Whether two releases describe the same content closely enough to
/// cross-seed. Symmetric in its arguments.
pub fn releases_match(a: &Release, b: &Release) -> bool {
    compare_releases(a, b).is_none()
}

/// Detailed comparison; returns the first incompatible field.
pub fn compare_releases(a: &Release, b: &Release) -> Option<FieldMismatch> {
    if normalize_title(&a.title) != normalize_title(&b.title) {
        return Some(FieldMismatch::Title);
    }
    if both_present_and_differ(a.year, b.year) {
        return Some(FieldMismatch::Year);
    }
    if both_present_and_differ(a.series, b.series) {
        return Some(FieldMismatch::Series);
    }
    if both_present_and_differ(a.episode, b.episode) {
        return Some(FieldMismatch::Episode);
    }
    if both_present_and_differ(a.month, b.month) || both_present_and_differ(a.day, b.day) {
        return Some(FieldMismatch::AirDate);
    }
    if !sources_compatible(&a.source, &b.source) {
        return Some(FieldMismatch::Source);
    }
    if !resolutions_compatible(&a.resolution, &b.resolution) {
        return Some(FieldMismatch::Resolution);
    }
    if !codecs_compatible(&a.codecs, &b.codecs) {
        return Some(FieldMismatch::Codec);
    }
    // Audio and channel differences pass through on purpose: indexer
    // metadata lies here and the file-size check downstream catches
    // real mismatches.
    if !languages_compatible(&a.language, &b.language) {
        return Some(FieldMismatch::Language);
    }
    if !a.collection.eq_ignore_ascii_case(&b.collection) {
        return Some(FieldMismatch::Collection);
    }
    if flag_set(a, MASTER_FLAGS) != flag_set(b, MASTER_FLAGS) {
        return Some(FieldMismatch::MasterFlags);
    }
    if !repack_compatible(a, b) {
        return Some(FieldMismatch::Repack);
    }
    if !groups_compatible(&a.group, &b.group) {
        return Some(FieldMismatch::Group);
    }
    trace!(title = %a.title, "releases are compatible");
    None
}

/// Fields that must agree only when both sides carry them
fn both_present_and_differ(a: i32, b: i32) -> bool {
    a > 0 && b > 0 && a != b
}

/// Sources are parsed into canonical tokens already. Plain WEB is
/// ambiguous and compatible with both WEBDL and WEBRIP; a missing
/// source is compatible with anything.
fn sources_compatible(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() || a == b {
        return true;
    }
    let web_family = |s: &str| matches!(s, "WEB" | "WEBDL" | "WEBRIP");
    (a == "WEB" && web_family(b)) || (b == "WEB" && web_family(a))
}

/// Empty resolution is compatible with the SD tier only; empty versus
/// 720p and up is a real mismatch.
fn resolutions_compatible(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let is_sd = |s: &str| matches!(s, "480p" | "576p" | "SD");
    (a.is_empty() && is_sd(b)) || (b.is_empty() && is_sd(a))
}

fn codecs_compatible(a: &[String], b: &[String]) -> bool {
    if a.is_empty() || b.is_empty() {
        return true;
    }
    let mut left: Vec<&str> = a.iter().map(String::as_str).collect();
    let mut right: Vec<&str> = b.iter().map(String::as_str).collect();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}

/// Empty language means English
fn languages_compatible(a: &str, b: &str) -> bool {
    let canon = |s: &str| {
        if s.is_empty() {
            "ENGLISH".to_string()
        } else {
            s.to_uppercase()
        }
    };
    canon(a) == canon(b)
}

fn flag_set(release: &Release, from: &[&str]) -> Vec<String> {
    let mut flags: Vec<String> = release
        .other
        .iter()
        .filter(|f| from.iter().any(|k| f.eq_ignore_ascii_case(k)))
        .map(|f| f.to_uppercase())
        .collect();
    flags.sort_unstable();
    flags
}

/// REPACK/PROPER must agree for individual episodes and movies, but a
/// season pack may legitimately incorporate the repack of one episode.
fn repack_compatible(a: &Release, b: &Release) -> bool {
    if a.is_season_pack() || b.is_season_pack() {
        return true;
    }
    flag_set(a, REPACK_FLAGS) == flag_set(b, REPACK_FLAGS)
}

fn groups_compatible(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || a.eq_ignore_ascii_case(b)
}

/// Whether the injected torrent should take the candidate's display
/// name. Pairing an episode with a pack that contains it (or the
/// reverse) keeps the original name.
pub fn should_rename_torrent_display(source: &Release, candidate: &Release) -> bool {
    source.is_season_pack() == candidate.is_season_pack()
}

/// Whether the file planner should rename files to the candidate's
/// layout. Pack-to-episode pairings keep the source layout; the
/// candidate's files are a subset resolved by the planner instead.
pub fn should_align_files_with_candidate(source: &Release, candidate: &Release) -> bool {
    source.is_season_pack() == candidate.is_season_pack()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn release(name_fields: impl FnOnce(&mut Release)) -> Release {
        let mut r = Release {
            title: "Show".to_string(),
            year: 2024,
            source: "WEBDL".to_string(),
            resolution: "1080p".to_string(),
            codecs: vec!["AVC".to_string()],
            group: "GRP".to_string(),
            ..Default::default()
        };
        name_fields(&mut r);
        r
    }

    #[test]
    fn identical_releases_match() {
        let a = release(|_| {});
        assert!(releases_match(&a, &a.clone()));
    }

    #[test]
    fn codec_aliases_already_collapsed_match() {
        // Parsed x264 and H.264 both arrive as AVC
        let a = release(|r| r.codecs = vec!["AVC".to_string()]);
        let b = release(|r| r.codecs = vec!["AVC".to_string()]);
        assert!(releases_match(&a, &b));
    }

    #[test]
    fn missing_codec_is_compatible() {
        let a = release(|r| r.codecs = vec![]);
        let b = release(|_| {});
        assert!(releases_match(&a, &b));
        assert!(releases_match(&b, &a));
    }

    #[test]
    fn web_is_ambiguous() {
        let a = release(|r| r.source = "WEB".to_string());
        let dl = release(|r| r.source = "WEBDL".to_string());
        let rip = release(|r| r.source = "WEBRIP".to_string());
        assert!(releases_match(&a, &dl));
        assert!(releases_match(&a, &rip));
        assert_eq!(compare_releases(&dl, &rip), Some(FieldMismatch::Source));
    }

    #[test]
    fn missing_source_is_compatible() {
        let a = release(|r| r.source = String::new());
        let b = release(|r| r.source = "BLURAY".to_string());
        assert!(releases_match(&a, &b));
    }

    #[test]
    fn sd_resolution_exception() {
        let empty = release(|r| r.resolution = String::new());
        let sd = release(|r| r.resolution = "480p".to_string());
        let hd = release(|r| r.resolution = "720p".to_string());
        assert!(releases_match(&empty, &sd));
        assert!(releases_match(&sd, &empty));
        assert_eq!(
            compare_releases(&empty, &hd),
            Some(FieldMismatch::Resolution)
        );
    }

    #[test]
    fn empty_language_is_english() {
        let a = release(|r| r.language = String::new());
        let b = release(|r| r.language = "ENGLISH".to_string());
        let c = release(|r| r.language = "FRENCH".to_string());
        assert!(releases_match(&a, &b));
        assert_eq!(compare_releases(&a, &c), Some(FieldMismatch::Language));
    }

    #[test]
    fn audio_differences_pass_through() {
        let a = release(|r| r.audio = vec!["DDP".to_string()]);
        let b = release(|r| r.audio = vec!["DDPA".to_string()]);
        assert!(releases_match(&a, &b));
    }

    #[test]
    fn imax_rejects_vanilla() {
        let imax = release(|r| r.collection = "IMAX".to_string());
        let vanilla = release(|_| {});
        assert_eq!(
            compare_releases(&imax, &vanilla),
            Some(FieldMismatch::Collection)
        );
    }

    #[test]
    fn imax_rejects_vanilla_even_for_season_packs() {
        let imax = release(|r| {
            r.collection = "IMAX".to_string();
            r.series = 1;
            r.year = 0;
        });
        let vanilla = release(|r| {
            r.series = 1;
            r.year = 0;
        });
        assert_eq!(
            compare_releases(&imax, &vanilla),
            Some(FieldMismatch::Collection)
        );
    }

    #[test]
    fn hybrid_must_match() {
        let hybrid = release(|r| r.other = vec!["HYBRID".to_string()]);
        let plain = release(|_| {});
        assert_eq!(
            compare_releases(&hybrid, &plain),
            Some(FieldMismatch::MasterFlags)
        );
    }

    #[test]
    fn repack_rejects_for_episodes() {
        let repack = release(|r| {
            r.series = 1;
            r.episode = 3;
            r.other = vec!["REPACK".to_string()];
        });
        let plain = release(|r| {
            r.series = 1;
            r.episode = 3;
        });
        assert_eq!(compare_releases(&repack, &plain), Some(FieldMismatch::Repack));
    }

    #[test]
    fn repack_allowed_for_season_packs() {
        let repack = release(|r| {
            r.series = 1;
            r.other = vec!["REPACK".to_string()];
        });
        let plain = release(|r| r.series = 1);
        assert!(releases_match(&repack, &plain));
    }

    #[test]
    fn group_must_match_when_both_present() {
        let a = release(|r| r.group = "GRP".to_string());
        let b = release(|r| r.group = "OTHER".to_string());
        let anon = release(|r| r.group = String::new());
        assert_eq!(compare_releases(&a, &b), Some(FieldMismatch::Group));
        assert!(releases_match(&a, &anon));
    }

    #[test]
    fn titles_compare_normalised() {
        let a = release(|r| r.title = "Amélie".to_string());
        let b = release(|r| r.title = "amelie".to_string());
        assert!(releases_match(&a, &b));
    }

    #[test]
    fn pack_episode_display_and_alignment() {
        let pack = release(|r| r.series = 1);
        let episode = release(|r| {
            r.series = 1;
            r.episode = 9;
        });
        assert!(!should_rename_torrent_display(&episode, &pack));
        assert!(!should_align_files_with_candidate(&episode, &pack));
        assert!(should_rename_torrent_display(&episode, &episode.clone()));
    }

    fn arb_release() -> impl Strategy<Value = Release> {
        (
            prop_oneof![Just("Show"), Just("Other Show")],
            0..3i32,
            0..3i32,
            prop_oneof![Just(""), Just("WEB"), Just("WEBDL"), Just("WEBRIP"), Just("BLURAY")],
            prop_oneof![Just(""), Just("480p"), Just("720p"), Just("1080p")],
            prop_oneof![Just(vec![]), Just(vec!["AVC".to_string()]), Just(vec!["HEVC".to_string()])],
            prop_oneof![Just(""), Just("REPACK")],
            prop_oneof![Just(""), Just("GRP"), Just("OTHER")],
        )
            .prop_map(
                |(title, series, episode, source, resolution, codecs, flag, group)| Release {
                    title: title.to_string(),
                    series,
                    episode,
                    source: source.to_string(),
                    resolution: resolution.to_string(),
                    codecs,
                    other: if flag.is_empty() {
                        vec![]
                    } else {
                        vec![flag.to_string()]
                    },
                    group: group.to_string(),
                    ..Default::default()
                },
            )
    }

    proptest! {
        #[test]
        fn matching_is_symmetric(a in arb_release(), b in arb_release()) {
            prop_assert_eq!(releases_match(&a, &b), releases_match(&b, &a));
        }

        #[test]
        fn matching_is_reflexive(a in arb_release()) {
            prop_assert!(releases_match(&a, &a.clone()));
        }
    }
}
