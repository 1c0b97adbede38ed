use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FinderError, Result};

/// Tunables for the fingerprinting and ranking algorithm.
///
/// Mirrors the original `finder::Settings` global: every field here is a
/// precondition the core trusts the caller to have validated (e.g.
/// `fingerprint_reduction <= 40`). There is no runtime branch for invalid
/// settings; that validation belongs to whatever collaborator persists this
/// struct as JSON or TOML.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Max `j` in peak-pair enumeration.
    pub default_fan_value: i32,

    /// Lower bound for `Δt` (frames) accepted by the hasher.
    pub min_hash_time_delta: i32,

    /// Upper bound for `Δt` (frames) accepted by the hasher.
    pub max_hash_time_delta: i32,

    /// Hex characters retained from the truncated SHA-1 digest.
    pub fingerprint_reduction: i32,

    /// `N` for the `(2N+1)`-side peak-picking kernel.
    pub peak_neighborhood_size: i32,

    /// FFT window size `W`.
    pub default_window_size: i32,

    /// dB floor for peak acceptance.
    pub default_amp_min: f32,

    /// STFT overlap fraction in `[0, 1)`.
    pub default_overlap_ratio: f32,

    /// Reference sample rate used for seconds conversion.
    pub fs: f32,

    /// Enable the length-bias correction in `Matcher::align_matches`.
    pub demote_songs: bool,

    /// Strength of the length-bias correction.
    pub demotion_factor: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_fan_value: 15,
            min_hash_time_delta: 0,
            max_hash_time_delta: 200,
            fingerprint_reduction: 20,
            peak_neighborhood_size: 20,
            default_window_size: 4096,
            default_amp_min: -48.0,
            default_overlap_ratio: 0.5,
            fs: 22050.0,
            demote_songs: true,
            demotion_factor: 2.0,
        }
    }
}

impl Settings {
    /// Create a new `Settings` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fan_value(mut self, fan: i32) -> Self {
        self.default_fan_value = fan;
        self
    }

    pub fn with_hash_time_delta(mut self, min: i32, max: i32) -> Self {
        self.min_hash_time_delta = min;
        self.max_hash_time_delta = max;
        self
    }

    pub fn with_fingerprint_reduction(mut self, chars: i32) -> Self {
        self.fingerprint_reduction = chars;
        self
    }

    pub fn with_peak_neighborhood_size(mut self, n: i32) -> Self {
        self.peak_neighborhood_size = n;
        self
    }

    pub fn with_window_size(mut self, window: i32) -> Self {
        self.default_window_size = window;
        self
    }

    pub fn with_amp_min(mut self, amp_min: f32) -> Self {
        self.default_amp_min = amp_min;
        self
    }

    pub fn with_overlap_ratio(mut self, ratio: f32) -> Self {
        self.default_overlap_ratio = ratio.clamp(0.0, 0.999);
        self
    }

    pub fn with_sample_rate(mut self, fs: f32) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_demotion(mut self, enabled: bool, factor: f32) -> Self {
        self.demote_songs = enabled;
        self.demotion_factor = factor;
        self
    }

    /// `overlap = floor(W * r)` samples.
    pub fn overlap_samples(&self) -> usize {
        (self.default_window_size as f32 * self.default_overlap_ratio).floor() as usize
    }

    /// `hop = W - overlap` samples.
    pub fn hop_samples(&self) -> usize {
        self.default_window_size as usize - self.overlap_samples()
    }

    /// `F = W/2 + 1` (even `W`) or `(W+1)/2` (odd `W`) frequency bins.
    pub fn freq_bins(&self) -> usize {
        let w = self.default_window_size as usize;
        if w % 2 == 0 {
            w / 2 + 1
        } else {
            (w + 1) / 2
        }
    }

    /// Load settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| FinderError::Config {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| FinderError::Config {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Save settings to a TOML file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| FinderError::Config {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        std::fs::write(path, content).map_err(|e| FinderError::Config {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Load settings from a JSON string (the format the original GUI persisted).
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| FinderError::Config {
            path: "<json>".into(),
            source: e.into(),
        })
    }

    /// Serialize settings as a pretty-printed JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| FinderError::Config {
            path: "<json>".into(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.default_fan_value, 15);
        assert_eq!(s.min_hash_time_delta, 0);
        assert_eq!(s.max_hash_time_delta, 200);
        assert_eq!(s.fingerprint_reduction, 20);
        assert_eq!(s.peak_neighborhood_size, 20);
        assert_eq!(s.default_window_size, 4096);
        assert_eq!(s.default_amp_min, -48.0);
        assert_eq!(s.default_overlap_ratio, 0.5);
        assert_eq!(s.fs, 22050.0);
        assert!(s.demote_songs);
        assert_eq!(s.demotion_factor, 2.0);
    }

    #[test]
    fn freq_bins_even_and_odd_window() {
        let even = Settings::new().with_window_size(4096);
        assert_eq!(even.freq_bins(), 2049);

        let odd = Settings::new().with_window_size(4095);
        assert_eq!(odd.freq_bins(), 2048);
    }

    #[test]
    fn overlap_and_hop() {
        let s = Settings::new().with_window_size(4096).with_overlap_ratio(0.5);
        assert_eq!(s.overlap_samples(), 2048);
        assert_eq!(s.hop_samples(), 2048);
    }

    #[test]
    fn toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let settings = Settings::new().with_fan_value(10).with_sample_rate(44100.0);
        settings.to_file(&path).unwrap();

        let loaded = Settings::from_file(&path).unwrap();
        assert_eq!(loaded.default_fan_value, 10);
        assert_eq!(loaded.fs, 44100.0);
    }

    #[test]
    fn json_round_trip() {
        let settings = Settings::new().with_demotion(false, 1.5);
        let json = settings.to_json_string().unwrap();
        let loaded = Settings::from_json_str(&json).unwrap();
        assert!(!loaded.demote_songs);
        assert_eq!(loaded.demotion_factor, 1.5);
    }
}
