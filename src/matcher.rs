//! Hash-overlap matching and offset alignment.
//!
//! Ported from `AudioLibrary::FindMatches`/`AlignMatches`. Two quirks are
//! preserved deliberately rather than "fixed": `FindMatches` double-counts
//! a dedup hit once per query offset sharing that hash (rather than once
//! per distinct hash), and `AlignMatches` collapses a song's offsets to the
//! single largest raw offset value seen for that song, not the mode of an
//! offset-diff histogram — it never counts occurrences, so it isn't meant to
//! imitate DejaVu's counting scheme.

use std::collections::HashMap;
use std::path::Path;

use crate::config::Settings;
use crate::fingerprint::{EntryId, Fingerprint};
use crate::library::Library;

/// One raw `(hash, offset)` hit between a query and a library fingerprint.
#[derive(Debug, Clone, Copy)]
struct FoundMatch {
    sid: EntryId,
    offset: i32,
}

/// Hash-overlap counts and offset candidates for every library entry that
/// shares at least one hash with the query.
#[derive(Debug, Default)]
pub struct Results {
    matches: Vec<FoundMatch>,
    dedups: HashMap<EntryId, i32>,
}

/// A ranked candidate match, ready for display.
#[derive(Debug, Clone)]
pub struct FoundSong {
    pub sid: EntryId,
    pub path: std::path::PathBuf,
    pub input_hashes: i32,
    pub fingerprinted_hashes: i32,
    pub hashes_matched: i32,
    pub input_confidence: f32,
    pub fingerprinted_confidence: f32,
    pub overall_confidence: f32,
    pub offset: i32,
    pub offset_secs: f32,
}

fn same_file(a: &Path, b: &Path) -> bool {
    a.file_name() == b.file_name()
}

/// Build the hash/offset overlap between `query` and every fingerprinted
/// entry in `library`, excluding entries whose filename matches `query_path`
/// (so re-scanning a library against itself doesn't just match every track
/// to itself).
pub fn find_matches(library: &Library, query_path: &Path, query: &Fingerprint) -> Results {
    let query_offsets = query.all_offsets();
    let mut results = Results::default();

    for (id, entry) in library.fingerprinted_entries() {
        if same_file(&entry.path, query_path) {
            continue;
        }
        let Some(fp) = &entry.fingerprint else {
            continue;
        };
        let lib_offsets = fp.first_offsets();

        for (hash, offsets) in &query_offsets {
            let Some(&lib_offset) = lib_offsets.get(hash) else {
                continue;
            };
            *results.dedups.entry(id).or_insert(0) += 1;
            for &query_offset in offsets {
                results.matches.push(FoundMatch {
                    sid: id,
                    offset: lib_offset - query_offset,
                });
            }
        }
    }

    results
}

/// Collapse `results` into ranked [`FoundSong`]s, keeping at most `topn`.
pub fn align_matches(
    library: &Library,
    query: &Fingerprint,
    results: &Results,
    settings: &Settings,
    topn: usize,
) -> Vec<FoundSong> {
    let input_hashes = query.len() as i32;
    let avg_length = library.avg_length_seconds();

    let mut max_offset_by_sid: HashMap<EntryId, i32> = HashMap::new();
    for m in &results.matches {
        let slot = max_offset_by_sid.entry(m.sid).or_insert(m.offset);
        *slot = (*slot).max(m.offset);
    }

    let mut songs: Vec<FoundSong> = Vec::new();
    for (sid, &offset) in &max_offset_by_sid {
        let Some(entry) = library.entry(*sid) else {
            continue;
        };
        let Some(fp) = &entry.fingerprint else {
            continue;
        };

        let hashes_matched = results.dedups.get(sid).copied().unwrap_or(0);
        let fingerprinted_hashes = fp.len() as i32;

        let input_confidence = if input_hashes == 0 {
            0.0
        } else {
            hashes_matched as f32 / input_hashes as f32
        };
        let fingerprinted_confidence = if fingerprinted_hashes == 0 {
            0.0
        } else {
            hashes_matched as f32 / fingerprinted_hashes as f32
        };

        let adj_input_confidence = if settings.demote_songs && entry.length_seconds > 0.0 {
            input_confidence * (avg_length / entry.length_seconds * settings.demotion_factor).min(1.0)
        } else {
            input_confidence
        };

        let offset_secs =
            offset as f32 / settings.fs * settings.default_window_size as f32 * settings.default_overlap_ratio * 0.5;

        songs.push(FoundSong {
            sid: *sid,
            path: entry.path,
            input_hashes,
            fingerprinted_hashes,
            hashes_matched,
            input_confidence,
            fingerprinted_confidence,
            overall_confidence: fingerprinted_confidence + adj_input_confidence,
            offset,
            offset_secs,
        });
    }

    songs.sort_by(|a, b| {
        b.overall_confidence
            .partial_cmp(&a.overall_confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.offset.cmp(&a.offset))
    });
    songs.truncate(topn);
    songs
}

/// Match then align with the default top-N of 10, in one call.
pub fn test_song(library: &Library, query_path: &Path, query: &Fingerprint, settings: &Settings) -> Vec<FoundSong> {
    let results = find_matches(library, query_path, query);
    align_matches(library, query, &results, settings, 10)
}
