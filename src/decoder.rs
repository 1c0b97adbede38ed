//! Decodes WAV/MP3 files into mono PCM-magnitude sample buffers.
//!
//! Only channel 0 is taken, not an average across channels — this mirrors
//! DejaVu's behavior more closely than channel averaging does. Samples are
//! left at their native PCM magnitude; nothing downstream needs them
//! normalized to `[-1, 1]` since the spectrogram goes through a log
//! transform anyway.

use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, Source};

use crate::error::FinderError;

/// A decoded mono sample buffer at the file's native sample rate.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn length_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f32 / self.sample_rate as f32
        }
    }
}

/// Decode a `.wav` or `.mp3` file to a mono float buffer.
///
/// The caller is responsible for extension filtering (see `Library::load`);
/// this function will happily attempt to decode whatever `rodio` accepts.
pub fn decode(path: impl AsRef<Path>) -> Result<SampleBuffer, FinderError> {
    let path = path.as_ref();

    let open = || -> anyhow::Result<SampleBuffer> {
        let file = std::fs::File::open(path)?;
        let source = Decoder::new(BufReader::new(file))?;

        let channels = source.channels().max(1) as usize;
        let sample_rate = source.sample_rate();

        // Take channel 0 only: stride through the interleaved stream rather
        // than averaging across channels.
        let samples: Vec<f32> = source
            .step_by(channels)
            .map(|s| s as f32)
            .collect();

        if samples.is_empty() {
            anyhow::bail!("decoder produced zero frames");
        }

        Ok(SampleBuffer {
            samples,
            sample_rate,
        })
    };

    open().map_err(|source| FinderError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sine_wav(path: &Path, seconds: f32, freq: f32, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let n = (seconds * sample_rate as f32) as usize;
        for i in 0..n {
            let t = i as f32 / sample_rate as f32;
            let v = (2.0 * std::f32::consts::PI * freq * t).sin();
            writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_mono_wav_at_native_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 1.0, 440.0, 22050);

        let buf = decode(&path).unwrap();
        assert_eq!(buf.sample_rate, 22050);
        assert_eq!(buf.samples.len(), 22050);
        assert!(buf.samples.iter().any(|&s| s.abs() > 1.0));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let result = decode("/nonexistent/path/to/a/file.wav");
        assert!(matches!(result, Err(FinderError::Decode { .. })));
    }

    #[test]
    fn empty_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        std::fs::File::create(&path).unwrap().write_all(b"").unwrap();

        let result = decode(&path);
        assert!(result.is_err());
    }
}
