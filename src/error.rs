use std::path::PathBuf;

/// Errors surfaced by the fingerprinting and matching core.
///
/// No variant here is fatal to a `Library`: decode failures drop the
/// offending entry and scanning continues, and a failed cache read falls
/// back to a full directory scan (see `Library::load`).
#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    /// The file could not be opened, or a decoder reported zero frames.
    #[error("failed to decode audio file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Reading or writing the binary library cache failed.
    #[error("cache I/O error at {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file is truncated, oversized, or otherwise malformed.
    #[error("cache file {path} is malformed: {reason}")]
    CacheFormat { path: PathBuf, reason: String },

    /// A settings file could not be parsed.
    #[error("invalid settings file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, FinderError>;
