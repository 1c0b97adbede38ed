//! Ties decoding, spectrogram, peak-picking and hashing into one
//! per-file [`Fingerprint`], addressed by a stable [`EntryId`] rather than
//! a pointer into the library's entry vector. A vector that reallocates
//! underneath an outstanding reference into it is a real hazard; indexing
//! by position sidesteps that entirely. See `library.rs`.

use std::collections::HashMap;
use std::path::Path;

use crate::config::Settings;
use crate::decoder::SampleBuffer;
use crate::error::FinderError;
use crate::hasher::{self, HashEntry};
use crate::peaks;
use crate::{decoder, spectrogram};

/// A stable handle to an entry in a [`crate::library::Library`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub usize);

/// The hash multimap produced for one audio file, plus the entry it
/// describes.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub source: EntryId,
    hashes: Vec<HashEntry>,
}

impl Fingerprint {
    pub fn new(source: EntryId, hashes: Vec<HashEntry>) -> Self {
        Self { source, hashes }
    }

    pub fn hashes(&self) -> &[HashEntry] {
        &self.hashes
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// First-inserted offset per distinct hash — what a library-side
    /// fingerprint is probed with during matching.
    pub fn first_offsets(&self) -> HashMap<&str, i32> {
        let mut map = HashMap::new();
        for (hash, offset) in &self.hashes {
            map.entry(hash.as_str()).or_insert(*offset);
        }
        map
    }

    /// Every offset recorded per distinct hash — what a query fingerprint
    /// contributes during matching.
    pub fn all_offsets(&self) -> HashMap<&str, Vec<i32>> {
        let mut map: HashMap<&str, Vec<i32>> = HashMap::new();
        for (hash, offset) in &self.hashes {
            map.entry(hash.as_str()).or_default().push(*offset);
        }
        map
    }
}

/// Spectrogram, peak-pick and hash an already-decoded sample buffer.
///
/// This is the half of the pipeline `Library::process` runs: decoding
/// happens during `Library::load` so sample buffers can be released once
/// their fingerprint is computed (see `library.rs`'s resource discipline).
pub fn fingerprint_samples(buffer: &SampleBuffer, source: EntryId, settings: &Settings) -> Fingerprint {
    let spec = spectrogram::compute(&buffer.samples, settings);
    let peaks = peaks::find(&spec, settings);
    let hashes = hasher::generate(&peaks, settings);
    Fingerprint::new(source, hashes)
}

/// Decode a file and fingerprint it in one call — the path a standalone
/// query (not already tracked by a `Library`) takes.
pub fn fingerprint_file(
    path: impl AsRef<Path>,
    source: EntryId,
    settings: &Settings,
) -> Result<(Fingerprint, f32), FinderError> {
    let buffer = decoder::decode(path)?;
    let length_seconds = buffer.length_seconds();
    Ok((fingerprint_samples(&buffer, source, settings), length_seconds))
}
