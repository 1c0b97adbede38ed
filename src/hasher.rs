//! Fan-out combinatorial hashing of [`Peak`]s into addressable hash tokens.
//!
//! Ported from `AudioFile::GenerateHashes`: sort peaks by `(time, freq)`,
//! pair each peak with up to `default_fan_value` peaks ahead of it whose
//! `Δt` falls in `[min_hash_time_delta, max_hash_time_delta]`, and hash the
//! triple `freq_a|freq_b|Δt`.

use sha1::{Digest, Sha1};

use crate::config::Settings;
use crate::peaks::Peak;

/// A `(hash, time_offset)` pair as produced for one anchor peak.
pub type HashEntry = (String, i32);

fn hex_digest(input: &str) -> String {
    let digest = Sha1::digest(input.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Generate the ordered multimap of hashes for an already-sorted peak list.
///
/// `peaks` must be sorted ascending by `(time_frame, freq_bin)`, as returned
/// by [`crate::peaks::find`]. The returned vector preserves anchor order,
/// which callers rely on for "first-inserted offset" semantics.
pub fn generate(peaks: &[Peak], settings: &Settings) -> Vec<HashEntry> {
    let fan = settings.default_fan_value.max(0) as usize;
    let mut hashes = Vec::new();

    for i in 0..peaks.len() {
        for j in 1..fan {
            let Some(other) = peaks.get(i + j) else {
                break;
            };
            let delta_t = other.time_frame - peaks[i].time_frame;
            if delta_t >= settings.min_hash_time_delta && delta_t <= settings.max_hash_time_delta {
                let input = format!("{}|{}|{}", peaks[i].freq_bin, other.freq_bin, delta_t);
                let digest = hex_digest(&input);
                let reduction = settings.fingerprint_reduction.clamp(0, digest.len() as i32) as usize;
                hashes.push((digest[..reduction].to_string(), peaks[i].time_frame));
            }
        }
    }

    hashes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(freq: i32, time: i32) -> Peak {
        Peak {
            freq_bin: freq,
            time_frame: time,
            amplitude: 0.0,
        }
    }

    #[test]
    fn pairs_within_fan_and_delta_window() {
        let settings = Settings::new().with_fan_value(3).with_hash_time_delta(1, 5);
        let peaks = vec![peak(10, 0), peak(20, 2), peak(30, 4), peak(40, 20)];
        let hashes = generate(&peaks, &settings);

        // peak 0 pairs with peaks 1 and 2 (deltas 2, 4); peak 3 is out of
        // fan range relative to peak 0's j in 1..3. peak 1 pairs with peak 2
        // (delta 2); peak 3's delta (18) exceeds max_hash_time_delta.
        assert_eq!(hashes.len(), 3);
        assert!(hashes.iter().all(|(h, _)| h.len() == 20));
    }

    #[test]
    fn truncates_to_fingerprint_reduction() {
        let settings = Settings::new().with_fan_value(2).with_fingerprint_reduction(8);
        let peaks = vec![peak(1, 0), peak(2, 1)];
        let hashes = generate(&peaks, &settings);
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes[0].0.len(), 8);
    }

    #[test]
    fn hash_is_deterministic() {
        let settings = Settings::new();
        let peaks = vec![peak(5, 0), peak(9, 3)];
        let a = generate(&peaks, &settings);
        let b = generate(&peaks, &settings);
        assert_eq!(a, b);
    }

    #[test]
    fn delta_outside_window_is_skipped() {
        let settings = Settings::new().with_fan_value(2).with_hash_time_delta(5, 10);
        let peaks = vec![peak(1, 0), peak(2, 1)];
        let hashes = generate(&peaks, &settings);
        assert!(hashes.is_empty());
    }

    #[test]
    fn anchor_order_is_preserved() {
        let settings = Settings::new().with_fan_value(2).with_hash_time_delta(0, 100);
        let peaks = vec![peak(1, 0), peak(2, 1), peak(3, 2)];
        let hashes = generate(&peaks, &settings);
        let offsets: Vec<i32> = hashes.iter().map(|(_, t)| *t).collect();
        assert_eq!(offsets, vec![0, 1]);
    }
}
