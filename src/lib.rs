//! # sampletrace
//!
//! A local sample-identification engine built on constellation audio
//! fingerprinting: decode a file, take an STFT, pick spectral peaks,
//! combinatorially hash them, and match the result against a library of
//! fingerprinted tracks. There is no cloud recognition step — everything
//! here runs against a directory of audio you already have.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sampletrace::{Library, Settings};
//!
//! let library = Arc::new(Library::new(Settings::default()));
//! library.load("./music");
//! library.join_load();
//! library.process(false);
//! library.join_process();
//! ```

pub mod cache;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fingerprint;
pub mod hasher;
pub mod library;
pub mod matcher;
pub mod output;
pub mod peaks;
pub mod spectrogram;

pub use config::Settings;
pub use decoder::SampleBuffer;
pub use error::{FinderError, Result};
pub use fingerprint::{EntryId, Fingerprint};
pub use library::{AudioFile, Library, Progress};
pub use matcher::{test_song, FoundSong};
pub use output::{OutputFormat, RecognitionOutput};

/// Current version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
