//! Presentation formats for [`FoundSong`] match results.
//!
//! A format selector (`OutputFormat`) plus a struct that carries the
//! rendered string and when it was rendered (`RecognitionOutput`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matcher::FoundSong;

/// Output format for a batch of match results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per match: "path @ offset_secs (confidence)".
    Simple,
    /// Full JSON array of match records.
    Json,
    /// CSV, one row per match.
    Csv,
    /// Custom per-match template with placeholders.
    Custom(&'static str),
}

/// Formatted match output, ready to print.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionOutput {
    pub format: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SongRecord {
    path: String,
    offset_secs: f32,
    input_confidence: f32,
    fingerprinted_confidence: f32,
    overall_confidence: f32,
    hashes_matched: i32,
}

impl From<&FoundSong> for SongRecord {
    fn from(song: &FoundSong) -> Self {
        Self {
            path: song.path.to_string_lossy().into_owned(),
            offset_secs: song.offset_secs,
            input_confidence: song.input_confidence,
            fingerprinted_confidence: song.fingerprinted_confidence,
            overall_confidence: song.overall_confidence,
            hashes_matched: song.hashes_matched,
        }
    }
}

impl RecognitionOutput {
    /// Format a batch of ranked matches according to `format`.
    pub fn format_results(songs: &[FoundSong], format: OutputFormat) -> Self {
        let content = match format {
            OutputFormat::Simple => songs
                .iter()
                .map(|s| {
                    format!(
                        "{} @ {:.2}s (confidence {:.2})",
                        s.path.display(),
                        s.offset_secs,
                        s.overall_confidence
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Json => {
                let records: Vec<SongRecord> = songs.iter().map(SongRecord::from).collect();
                serde_json::to_string_pretty(&records).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Csv => {
                let mut rows = vec![Self::csv_header().to_string()];
                rows.extend(songs.iter().map(|s| {
                    format!(
                        "\"{}\",{:.3},{:.4},{:.4},{:.4},{}",
                        s.path.display(),
                        s.offset_secs,
                        s.input_confidence,
                        s.fingerprinted_confidence,
                        s.overall_confidence,
                        s.hashes_matched
                    )
                }));
                rows.join("\n")
            }
            OutputFormat::Custom(template) => songs
                .iter()
                .map(|s| Self::format_custom(s, template))
                .collect::<Vec<_>>()
                .join("\n"),
        };

        RecognitionOutput {
            format: format.to_string(),
            content,
            timestamp: Utc::now(),
        }
    }

    fn format_custom(song: &FoundSong, template: &str) -> String {
        template
            .replace("{path}", &song.path.to_string_lossy())
            .replace("{offset}", &format!("{:.2}", song.offset_secs))
            .replace("{confidence}", &format!("{:.2}", song.overall_confidence))
            .replace("{matched}", &song.hashes_matched.to_string())
    }

    pub fn csv_header() -> &'static str {
        "\"Path\",\"OffsetSecs\",\"InputConfidence\",\"FingerprintedConfidence\",\"OverallConfidence\",\"HashesMatched\""
    }
}

impl std::fmt::Display for RecognitionOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Simple => write!(f, "Simple"),
            OutputFormat::Json => write!(f, "Json"),
            OutputFormat::Csv => write!(f, "Csv"),
            OutputFormat::Custom(template) => write!(f, "Custom({})", template),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::EntryId;
    use std::path::PathBuf;

    fn song() -> FoundSong {
        FoundSong {
            sid: EntryId(0),
            path: PathBuf::from("sample.wav"),
            input_hashes: 100,
            fingerprinted_hashes: 200,
            hashes_matched: 50,
            input_confidence: 0.5,
            fingerprinted_confidence: 0.25,
            overall_confidence: 0.75,
            offset: 42,
            offset_secs: 0.95,
        }
    }

    #[test]
    fn simple_format_includes_path_and_confidence() {
        let out = RecognitionOutput::format_results(&[song()], OutputFormat::Simple);
        assert!(out.content.contains("sample.wav"));
        assert!(out.content.contains("0.75"));
    }

    #[test]
    fn json_format_round_trips_through_serde_value() {
        let out = RecognitionOutput::format_results(&[song()], OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out.content).unwrap();
        assert_eq!(value[0]["hashes_matched"], 50);
    }

    #[test]
    fn csv_format_starts_with_header() {
        let out = RecognitionOutput::format_results(&[song()], OutputFormat::Csv);
        assert!(out.content.starts_with(RecognitionOutput::csv_header()));
    }

    #[test]
    fn custom_format_substitutes_placeholders() {
        let out = RecognitionOutput::format_results(&[song()], OutputFormat::Custom("{path} -> {confidence}"));
        assert_eq!(out.content, "sample.wav -> 0.75");
    }
}
