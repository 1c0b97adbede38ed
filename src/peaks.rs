//! Morphological 2-D peak picking over a [`Spectrogram`].
//!
//! Ported from `AudioFile::Get2DPeaks`, which built its structuring element
//! by dilating a 3x3 cross `peak_neighborhood_size` times with OpenCV. N
//! iterations of a 3x3 cross dilation produce exactly the L1 ball of radius
//! N, so the kernel is generated directly here instead of simulated
//! iteratively.

use crate::config::Settings;
use crate::spectrogram::Spectrogram;

/// A local maximum in the spectrogram, addressed by bin and frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub freq_bin: i32,
    pub time_frame: i32,
    pub amplitude: f32,
}

fn l1_ball_offsets(n: i32) -> Vec<(i32, i32)> {
    let mut offsets = Vec::new();
    for di in -n..=n {
        let remaining = n - di.abs();
        for dj in -remaining..=remaining {
            offsets.push((di, dj));
        }
    }
    offsets
}

/// Find every spectrogram cell that is a local maximum within its
/// neighborhood and above `amp_min`, in ascending `(time_frame, freq_bin)`
/// order — the order the hasher requires.
pub fn find(spectrogram: &Spectrogram, settings: &Settings) -> Vec<Peak> {
    let n = settings.peak_neighborhood_size;
    let offsets = l1_ball_offsets(n);
    let rows = spectrogram.rows as i32;
    let cols = spectrogram.cols as i32;

    let at = |i: i32, j: i32| -> Option<f32> {
        if i < 0 || j < 0 || i >= rows || j >= cols {
            None
        } else {
            Some(spectrogram.get(i as usize, j as usize))
        }
    };

    let mut peaks = Vec::new();
    for j in 0..cols {
        for i in 0..rows {
            let center = spectrogram.get(i as usize, j as usize);

            let mut dilated = f32::NEG_INFINITY;
            for &(di, dj) in &offsets {
                if let Some(v) = at(i + di, j + dj) {
                    dilated = dilated.max(v);
                }
            }

            let is_local_max = center >= dilated;

            // Background pixels are those whose value is exactly zero; an
            // eroded-background pixel additionally requires every neighbor
            // to be background. Since this runs after log compression,
            // "zero" only occurs for an exact 0 dB cell (power == 1.0).
            let is_background = center == 0.0;
            let eroded_background = is_background
                && offsets.iter().all(|&(di, dj)| match at(i + di, j + dj) {
                    Some(v) => v == 0.0,
                    None => false,
                });

            if is_local_max && !eroded_background && center > settings.default_amp_min {
                peaks.push(Peak {
                    freq_bin: i,
                    time_frame: j,
                    amplitude: center,
                });
            }
        }
    }

    peaks.sort_by_key(|p| (p.time_frame, p.freq_bin));
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peaks_of_a_single_tone_are_in_frequency_order() {
        let settings = Settings::new().with_window_size(1024).with_overlap_ratio(0.5);
        let n = 1024 * 4;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / settings.fs).sin() * 5000.0)
            .collect();
        let spectrogram = crate::spectrogram::compute(&samples, &settings);

        let peaks = find(&spectrogram, &settings.with_amp_min(-1000.0));
        for w in peaks.windows(2) {
            assert!(
                (w[0].time_frame, w[0].freq_bin) <= (w[1].time_frame, w[1].freq_bin)
            );
        }
    }

    #[test]
    fn l1_ball_radius_zero_is_just_the_center() {
        let offsets = l1_ball_offsets(0);
        assert_eq!(offsets, vec![(0, 0)]);
    }

    #[test]
    fn l1_ball_radius_one_has_five_cells() {
        let offsets = l1_ball_offsets(1);
        assert_eq!(offsets.len(), 5);
    }

    #[test]
    fn silence_has_no_peaks_above_floor() {
        let settings = Settings::new().with_window_size(256).with_overlap_ratio(0.5);
        let samples = vec![0.0f32; 256 * 6];
        let spectrogram = crate::spectrogram::compute(&samples, &settings);
        let peaks = find(&spectrogram, &settings);
        assert!(peaks.is_empty());
    }
}
