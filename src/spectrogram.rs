//! STFT + Hann window + mean-detrend + log-power spectrogram.
//!
//! Reproduces `AudioFile::Process` bin-for-bin: stride the signal into
//! overlapping windows, apply a Hann taper, add (not subtract — see the
//! comment at the detrend step below) the global mean, FFT each window,
//! fold to a one-sided power spectrum with energy-conserving doubling,
//! normalize to a power spectral density, then log-compress.

use chfft::RFft1D;

use crate::config::Settings;

/// A `[freq_bin, time_frame]` dB-power matrix, row-major by frequency bin.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub rows: usize,
    pub cols: usize,
    data: Vec<f32>,
}

impl Spectrogram {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    #[inline]
    pub fn get(&self, freq_bin: usize, time_frame: usize) -> f32 {
        self.data[freq_bin * self.cols + time_frame]
    }

    #[inline]
    fn set(&mut self, freq_bin: usize, time_frame: usize, value: f32) {
        self.data[freq_bin * self.cols + time_frame] = value;
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

/// Compute the dB-power spectrogram of `samples` per `settings`.
pub fn compute(samples: &[f32], settings: &Settings) -> Spectrogram {
    let w = settings.default_window_size as usize;
    let overlap = settings.overlap_samples();
    let hop = settings.hop_samples();
    let rows = settings.freq_bins();

    let cols = if samples.len() < overlap {
        0
    } else {
        (samples.len() - overlap) / hop
    };

    if cols == 0 || w == 0 {
        return Spectrogram::new(rows, 0);
    }

    // Step 1: stride into W-sample blocks, one per time frame.
    let mut blocks: Vec<Vec<f32>> = (0..cols)
        .map(|j| {
            let start = j * hop;
            samples[start..start + w].to_vec()
        })
        .collect();

    // Step 2: Hann window, applied per-sample across every block.
    let window = hann_window(w);
    for block in blocks.iter_mut() {
        for (v, wi) in block.iter_mut().zip(window.iter()) {
            *v *= wi;
        }
    }

    // Step 3: mean-detrend. The reference source computes `cell -= -mean`,
    // i.e. adds the mean rather than subtracting it. That sign is pinned
    // here deliberately to stay bit-compatible with the original tool; see
    // the design notes for why this is not "fixed".
    let total: f64 = blocks
        .iter()
        .flat_map(|b| b.iter())
        .map(|&v| v as f64)
        .sum();
    let count = (w * cols) as f64;
    let mean = (total / count) as f32;
    for block in blocks.iter_mut() {
        for v in block.iter_mut() {
            *v += mean;
        }
    }

    // Steps 4-6: per-frame real FFT, power, one-sided fold with doubling.
    let mut fft = RFft1D::<f32>::new(w);
    let mut spectrogram = Spectrogram::new(rows, cols);

    let window_energy: f32 = window.iter().map(|v| v * v).sum();
    let psd_scale = settings.fs * window_energy;

    for (j, block) in blocks.iter().enumerate() {
        let spectrum = fft.forward(block);
        for i in 0..rows.min(spectrum.len()) {
            let mut power = spectrum[i].re * spectrum[i].re + spectrum[i].im * spectrum[i].im;
            if i != 0 && i != rows - 1 {
                power *= 2.0;
            }

            // Step 7: PSD normalization.
            power /= psd_scale;

            // Step 8: log-compress, floored at machine epsilon.
            let floored = power.max(f32::EPSILON);
            spectrogram.set(i, j, 10.0 * floored.log10());
        }
    }

    spectrogram
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_window_endpoints_are_zero() {
        let w = hann_window(8);
        assert!((w[0]).abs() < 1e-6);
        assert!((w[7]).abs() < 1e-6);
    }

    #[test]
    fn single_window_sine_has_one_time_frame() {
        let settings = Settings::new().with_window_size(4096).with_overlap_ratio(0.5);
        let n = 4096;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / settings.fs).sin() * 1000.0)
            .collect();

        let spec = compute(&samples, &settings);
        assert_eq!(spec.cols, 1);
        assert_eq!(spec.rows, settings.freq_bins());
    }

    #[test]
    fn short_input_yields_zero_columns() {
        let settings = Settings::new().with_window_size(4096).with_overlap_ratio(0.5);
        let samples = vec![0.0f32; 100];
        let spec = compute(&samples, &settings);
        assert_eq!(spec.cols, 0);
    }

    #[test]
    fn values_are_floored_at_log_epsilon() {
        let settings = Settings::new().with_window_size(64).with_overlap_ratio(0.5);
        let samples = vec![0.0f32; 256];
        let spec = compute(&samples, &settings);
        let floor = 10.0 * f32::EPSILON.log10();
        for t in 0..spec.cols {
            for f in 0..spec.rows {
                assert!(spec.get(f, t) >= floor - 1e-3);
            }
        }
    }
}
