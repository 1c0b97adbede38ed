//! A directory of audio files, their fingerprints, and the background
//! workers that populate both.
//!
//! Entries are never addressed by pointer or long-lived reference, only by
//! [`EntryId`], resolved through the mutex on every access. A `std::vector`
//! of entries that reallocates underneath a concurrent reader holding a raw
//! pointer into it is a real hazard in the C++ tool this traces back to
//! (flagged with its own `FIXME` at the call site); indexing sidesteps it
//! entirely.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::cache::{self, CacheEntry};
use crate::config::Settings;
use crate::decoder::{self, SampleBuffer};
use crate::error::FinderError;
use crate::fingerprint::{self, EntryId, Fingerprint};

/// One tracked audio file and whatever the pipeline has computed for it so
/// far.
///
/// `samples` holds the decoded buffer between `load` and `process`; once an
/// entry has been fingerprinted, `process` clears it back to `None` rather
/// than holding every track's PCM data in memory for the life of the
/// library.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub path: PathBuf,
    pub length_seconds: f32,
    pub samples: Option<SampleBuffer>,
    pub fingerprint: Option<Fingerprint>,
    pub processed: bool,
}

/// Snapshot of load/process progress, safe to poll from any thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    pub loading: bool,
    pub processing: bool,
    pub load_min: usize,
    pub load_max: usize,
}

struct State {
    entries: Vec<AudioFile>,
    fingerprint_index: Vec<EntryId>,
    progress: Progress,
    avg_length_seconds: f32,
}

/// A scanned and (optionally) fingerprinted audio library.
pub struct Library {
    settings: Settings,
    root_path: Mutex<Option<PathBuf>>,
    exclude: Vec<PathBuf>,
    state: Arc<Mutex<State>>,
    load_handle: Mutex<Option<JoinHandle<()>>>,
    process_handle: Mutex<Option<JoinHandle<()>>>,
}

const EXTENSIONS: [&str; 2] = ["wav", "mp3"];
const CACHE_FILE_NAME: &str = "library.kpsf";

impl Library {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            root_path: Mutex::new(None),
            exclude: Vec::new(),
            state: Arc::new(Mutex::new(State {
                entries: Vec::new(),
                fingerprint_index: Vec::new(),
                progress: Progress::default(),
                avg_length_seconds: 0.0,
            })),
            load_handle: Mutex::new(None),
            process_handle: Mutex::new(None),
        }
    }

    pub fn with_exclude(mut self, exclude: Vec<PathBuf>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn progress(&self) -> Progress {
        self.state.lock().unwrap().progress
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry(&self, id: EntryId) -> Option<AudioFile> {
        self.state.lock().unwrap().entries.get(id.0).cloned()
    }

    pub fn avg_length_seconds(&self) -> f32 {
        self.state.lock().unwrap().avg_length_seconds
    }

    /// Every entry that currently has a fingerprint, as `(id, file)` pairs.
    pub fn fingerprinted_entries(&self) -> Vec<(EntryId, AudioFile)> {
        let state = self.state.lock().unwrap();
        state
            .fingerprint_index
            .iter()
            .map(|&id| (id, state.entries[id.0].clone()))
            .collect()
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|prefix| path.starts_with(prefix))
    }

    fn scan_paths(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect()
    }

    /// Spawn a background worker that runs the library's unified load: if
    /// `root_path/library.kpsf` exists, populate `entries` from it first
    /// (so previously fingerprinted tracks are resumed rather than
    /// re-decoded) and treat every cached path as excluded from the walk;
    /// then recursively walk `root_path`, decode every remaining
    /// `.wav`/`.mp3` not already covered by the cache (skipping anything
    /// under an excluded prefix), and append a not-yet-processed
    /// [`AudioFile`] entry for each one that decodes successfully. A file
    /// that fails to decode is dropped rather than tracked.
    pub fn load(self: &Arc<Self>, root_path: impl Into<PathBuf>) {
        let root_path = root_path.into();
        let this = Arc::clone(self);
        let handle = thread::spawn(move || {
            this.load_inner(&root_path);
        });
        *self.load_handle.lock().unwrap() = Some(handle);
    }

    /// Synchronous equivalent of [`load`], useful in tests and short-lived
    /// CLI invocations that want to block until the scan finishes.
    pub fn load_blocking(&self, root_path: impl AsRef<Path>) {
        self.load_inner(root_path.as_ref());
    }

    fn load_inner(&self, root_path: &Path) {
        *self.root_path.lock().unwrap() = Some(root_path.to_path_buf());

        let cache_path = root_path.join(CACHE_FILE_NAME);
        let mut cached_paths: Vec<PathBuf> = Vec::new();
        if cache_path.is_file() {
            match self.load_cache(&cache_path, root_path) {
                Ok(()) => {
                    cached_paths = self.state.lock().unwrap().entries.iter().map(|e| e.path.clone()).collect();
                }
                Err(e) => {
                    log::warn!("failed to load cache {}: {e}", cache_path.display());
                }
            }
        }

        let paths: Vec<PathBuf> = Self::scan_paths(root_path)
            .into_iter()
            .filter(|p| !self.is_excluded(p))
            .filter(|p| !cached_paths.contains(p))
            .collect();

        {
            let mut state = self.state.lock().unwrap();
            state.progress.loading = true;
            state.progress.load_max = paths.len();
            state.progress.load_min = 0;
        }

        for path in paths {
            match decoder::decode(&path) {
                Ok(buffer) => {
                    let length_seconds = buffer.length_seconds();
                    let mut state = self.state.lock().unwrap();
                    state.entries.push(AudioFile {
                        path,
                        length_seconds,
                        samples: Some(buffer),
                        fingerprint: None,
                        processed: false,
                    });
                }
                Err(e) => {
                    log::warn!("skipping {}: {e}", path.display());
                }
            }
            self.state.lock().unwrap().progress.load_min += 1;
        }

        let mut state = self.state.lock().unwrap();
        state.progress.loading = false;
    }

    pub fn join_load(&self) {
        if let Some(handle) = self.load_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    /// Spawn a background worker that fingerprints every unprocessed entry
    /// in parallel via rayon. With `force`, re-fingerprints everything.
    pub fn process(self: &Arc<Self>, force: bool) {
        let this = Arc::clone(self);
        let handle = thread::spawn(move || {
            this.process_inner(force);
        });
        *self.process_handle.lock().unwrap() = Some(handle);
    }

    pub fn process_blocking(&self, force: bool) {
        self.process_inner(force);
    }

    fn process_inner(&self, force: bool) {
        let settings = self.settings;

        // Each target carries its own decoded buffer if `load` still has
        // one cached, or falls back to re-decoding from disk (the `force`
        // re-process path, once an earlier pass already released samples).
        let targets: Vec<(EntryId, PathBuf, Option<SampleBuffer>)> = {
            let state = self.state.lock().unwrap();
            state
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| force || !e.processed)
                .map(|(i, e)| (EntryId(i), e.path.clone(), e.samples.clone()))
                .collect()
        };

        {
            let mut state = self.state.lock().unwrap();
            state.progress.processing = true;
        }

        let results: Vec<(EntryId, Option<(Fingerprint, f32)>)> = targets
            .into_par_iter()
            .map(|(id, path, samples)| {
                let buffer = samples.map(Ok).unwrap_or_else(|| decoder::decode(&path));
                let result = buffer
                    .ok()
                    .map(|buf| (fingerprint::fingerprint_samples(&buf, id, &settings), buf.length_seconds()));
                (id, result)
            })
            .collect();

        let mut state = self.state.lock().unwrap();
        for (id, result) in results {
            if let Some((fp, length_seconds)) = result {
                if let Some(entry) = state.entries.get_mut(id.0) {
                    entry.length_seconds = length_seconds;
                    entry.fingerprint = Some(fp);
                    entry.processed = true;
                    entry.samples = None;
                }
                if !state.fingerprint_index.contains(&id) {
                    state.fingerprint_index.push(id);
                }
            }
        }

        let n = state.entries.len();
        state.avg_length_seconds = if n == 0 {
            0.0
        } else {
            state.entries.iter().map(|e| e.length_seconds).sum::<f32>() / n as f32
        };
        state.progress.processing = false;
    }

    pub fn join_process(&self) {
        if let Some(handle) = self.process_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    /// Persist every fingerprinted entry to the binary cache format.
    pub fn save(&self, cache_path: impl AsRef<Path>) -> Result<(), FinderError> {
        let root = self.root_path.lock().unwrap().clone();
        let state = self.state.lock().unwrap();

        let entries: Vec<CacheEntry> = state
            .fingerprint_index
            .iter()
            .filter_map(|&id| {
                let entry = state.entries.get(id.0)?;
                let fp = entry.fingerprint.as_ref()?;
                let relative_path = match &root {
                    Some(root) => entry
                        .path
                        .strip_prefix(root)
                        .unwrap_or(&entry.path)
                        .to_string_lossy()
                        .into_owned(),
                    None => entry.path.to_string_lossy().into_owned(),
                };
                Some(CacheEntry {
                    relative_path,
                    length_seconds: entry.length_seconds,
                    hashes: fp.hashes().to_vec(),
                })
            })
            .collect();

        cache::write_to_path(cache_path, state.avg_length_seconds, &entries)
    }

    /// Load previously cached fingerprints, resolving each cached relative
    /// path against `root_path` to rebuild the entry vector without
    /// re-decoding or re-fingerprinting anything.
    pub fn load_cache(&self, cache_path: impl AsRef<Path>, root_path: impl AsRef<Path>) -> Result<(), FinderError> {
        let (avg_length_seconds, cache_entries) =
            cache::read_from_path(cache_path, self.settings.fingerprint_reduction.max(0) as usize)?;

        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        state.fingerprint_index.clear();
        state.avg_length_seconds = avg_length_seconds;

        for cache_entry in cache_entries {
            let id = EntryId(state.entries.len());
            state.entries.push(AudioFile {
                path: root_path.as_ref().join(&cache_entry.relative_path),
                length_seconds: cache_entry.length_seconds,
                samples: None,
                fingerprint: Some(Fingerprint::new(id, cache_entry.hashes)),
                processed: true,
            });
            state.fingerprint_index.push(id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            writer.write_sample((v * i16::MAX as f32 * 0.8) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn load_finds_wav_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write_sine_wav(&dir.path().join("a.wav"), 1.0, 440.0, 22050);
        write_sine_wav(&dir.path().join("sub/b.wav"), 1.0, 550.0, 22050);
        std::fs::write(dir.path().join("ignore.txt"), b"nope").unwrap();

        let library = Library::new(Settings::new());
        library.load_blocking(dir.path());

        assert_eq!(library.len(), 2);
    }

    #[test]
    fn process_then_save_then_load_cache_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        write_sine_wav(&dir.path().join("a.wav"), 1.0, 440.0, 22050);

        let library = Library::new(Settings::new());
        library.load_blocking(dir.path());
        library.process_blocking(false);

        assert_eq!(library.fingerprinted_entries().len(), 1);

        let cache_path = dir.path().join("lib.kpsf");
        library.save(&cache_path).unwrap();

        let reloaded = Library::new(Settings::new());
        reloaded.load_cache(&cache_path, dir.path()).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.fingerprinted_entries().len(), 1);
    }

    #[test]
    fn excluded_prefix_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("skip")).unwrap();
        write_sine_wav(&dir.path().join("skip/a.wav"), 1.0, 440.0, 22050);
        write_sine_wav(&dir.path().join("keep.wav"), 1.0, 440.0, 22050);

        let library = Library::new(Settings::new()).with_exclude(vec![dir.path().join("skip")]);
        library.load_blocking(dir.path());
        assert_eq!(library.len(), 1);
    }
}
