//! Binary library cache codec.
//!
//! Byte-for-byte compatible with the reference `.kpsf` format written by
//! `AudioLibrary::Save`/`RetrieveCachedMusic` and `IO.cpp`'s `Loader`/
//! `Saver`: no magic number, no version byte, just a header and a flat run
//! of entries. Every string is UTF-8, length-prefixed as a little-endian
//! `i32` byte count except for hashes, which are written at a fixed width
//! (`fingerprint_reduction` bytes, ASCII hex) with no prefix at all.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::FinderError;

/// One library entry as persisted to disk: a relative path, its length in
/// seconds, and its hash multimap.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub relative_path: String,
    pub length_seconds: f32,
    pub hashes: Vec<(String, i32)>,
}

fn write_string(writer: &mut impl Write, s: &str) -> io::Result<()> {
    writer.write_i32::<LittleEndian>(s.len() as i32)?;
    writer.write_all(s.as_bytes())
}

fn read_string(reader: &mut impl Read) -> io::Result<String> {
    let len = reader.read_i32::<LittleEndian>()?;
    let mut buf = vec![0u8; len.max(0) as usize];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn read_fixed_string(reader: &mut impl Read, width: usize) -> io::Result<String> {
    let mut buf = vec![0u8; width];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write the header (`avg_length_seconds * entries.len()` truncated to
/// `i32`, then the entry count) followed by every entry.
pub fn write(writer: &mut impl Write, avg_length_seconds: f32, entries: &[CacheEntry]) -> io::Result<()> {
    let header = (avg_length_seconds * entries.len() as f32) as i32;
    writer.write_i32::<LittleEndian>(header)?;
    writer.write_i32::<LittleEndian>(entries.len() as i32)?;

    for entry in entries {
        write_string(writer, &entry.relative_path)?;
        writer.write_f32::<LittleEndian>(entry.length_seconds)?;
        writer.write_i32::<LittleEndian>(entry.hashes.len() as i32)?;
        for (hash, offset) in &entry.hashes {
            writer.write_all(hash.as_bytes())?;
            writer.write_i32::<LittleEndian>(*offset)?;
        }
    }
    Ok(())
}

/// Read a cache file written by [`write`]. `fingerprint_reduction` must
/// match the value the cache was written with, since hash width isn't
/// self-describing.
pub fn read(reader: &mut impl Read, fingerprint_reduction: usize) -> io::Result<(f32, Vec<CacheEntry>)> {
    let header = reader.read_i32::<LittleEndian>()?;
    let n_entries = reader.read_i32::<LittleEndian>()?.max(0) as usize;

    let mut entries = Vec::with_capacity(n_entries);
    for _ in 0..n_entries {
        let relative_path = read_string(reader)?;
        let length_seconds = reader.read_f32::<LittleEndian>()?;
        let n_hashes = reader.read_i32::<LittleEndian>()?.max(0) as usize;

        let mut hashes = Vec::with_capacity(n_hashes);
        for _ in 0..n_hashes {
            let hash = read_fixed_string(reader, fingerprint_reduction)?;
            let offset = reader.read_i32::<LittleEndian>()?;
            hashes.push((hash, offset));
        }

        entries.push(CacheEntry {
            relative_path,
            length_seconds,
            hashes,
        });
    }

    let avg_length_seconds = if n_entries == 0 {
        0.0
    } else {
        header as f32 / n_entries as f32
    };
    Ok((avg_length_seconds, entries))
}

pub fn write_to_path(
    path: impl AsRef<std::path::Path>,
    avg_length_seconds: f32,
    entries: &[CacheEntry],
) -> Result<(), FinderError> {
    let path = path.as_ref();
    let mut file = std::fs::File::create(path).map_err(|e| FinderError::CacheIo {
        path: path.to_path_buf(),
        source: e,
    })?;
    write(&mut file, avg_length_seconds, entries).map_err(|e| FinderError::CacheIo {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn read_from_path(
    path: impl AsRef<std::path::Path>,
    fingerprint_reduction: usize,
) -> Result<(f32, Vec<CacheEntry>), FinderError> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| FinderError::CacheIo {
        path: path.to_path_buf(),
        source: e,
    })?;
    read(&mut file, fingerprint_reduction).map_err(|e| FinderError::CacheFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_entries() {
        let entries = vec![
            CacheEntry {
                relative_path: "a/song.wav".to_string(),
                length_seconds: 12.5,
                hashes: vec![("abcd1234efgh5678ijkl".to_string(), 3), ("1234abcd5678efgh9012".to_string(), 7)],
            },
            CacheEntry {
                relative_path: "b.mp3".to_string(),
                length_seconds: 200.0,
                hashes: vec![],
            },
        ];

        let mut buf = Vec::new();
        write(&mut buf, 106.25, &entries).unwrap();

        let mut cursor = io::Cursor::new(buf);
        let (avg, read_back) = read(&mut cursor, 20).unwrap();
        assert_eq!(read_back, entries);
        assert!((avg - 106.25).abs() < 0.01);
    }

    #[test]
    fn empty_library_round_trips() {
        let mut buf = Vec::new();
        write(&mut buf, 0.0, &[]).unwrap();
        let mut cursor = io::Cursor::new(buf);
        let (avg, entries) = read(&mut cursor, 20).unwrap();
        assert_eq!(avg, 0.0);
        assert!(entries.is_empty());
    }

    #[test]
    fn truncated_cache_is_an_io_error() {
        let mut buf = Vec::new();
        write(&mut buf, 10.0, &[CacheEntry {
            relative_path: "x.wav".to_string(),
            length_seconds: 1.0,
            hashes: vec![("a".repeat(20), 1)],
        }]).unwrap();
        buf.truncate(buf.len() - 2);

        let mut cursor = io::Cursor::new(buf);
        assert!(read(&mut cursor, 20).is_err());
    }
}
