//! Parsers for structured notation exports.
//!
//! Two collaborator seams: tab-binary exports (tracks, measures, voices,
//! beats) and MIDI-derived scores (parts, measures). The bundled parsers read
//! the JSON interchange form of each shape; anything that speaks the same
//! trait can stand in.

use std::path::Path;

use serde::Deserialize;

use crate::error::IngestError;

#[derive(Debug, Clone, Deserialize)]
pub struct TabSong {
    pub title: String,
    #[serde(default)]
    pub tempo: Option<u32>,
    pub tracks: Vec<TabTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabTrack {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub percussion: bool,
    pub measures: Vec<TabMeasure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabMeasure {
    pub voices: Vec<TabVoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabVoice {
    pub beats: Vec<TabBeat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabBeat {
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub chord: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub tempo: Option<u32>,
    pub parts: Vec<ScorePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScorePart {
    #[serde(default)]
    pub name: String,
    pub measures: Vec<ScoreMeasure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreMeasure {
    #[serde(default)]
    pub notes: Vec<String>,
}

pub trait TabParser {
    fn parse(&self, path: &Path) -> Result<TabSong, IngestError>;
}

pub trait ScoreParser {
    fn parse(&self, path: &Path) -> Result<Score, IngestError>;
}

/// Reads tab exports in JSON interchange form.
pub struct JsonTabParser;

impl TabParser for JsonTabParser {
    fn parse(&self, path: &Path) -> Result<TabSong, IngestError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| IngestError::Parse(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| IngestError::Parse(format!("{}: {e}", path.display())))
    }
}

/// Reads MIDI-derived scores in JSON interchange form.
pub struct JsonScoreParser;

impl ScoreParser for JsonScoreParser {
    fn parse(&self, path: &Path) -> Result<Score, IngestError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| IngestError::Parse(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| IngestError::Parse(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn tab_export_parses_with_defaults() {
        let raw = r#"{
            "title": "Midnight Run",
            "tempo": 120,
            "tracks": [
                {
                    "name": "Lead",
                    "measures": [
                        {"voices": [{"beats": [
                            {"notes": ["E2", "B2"], "chord": "Em", "duration": 480},
                            {}
                        ]}]}
                    ]
                }
            ]
        }"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(raw.as_bytes()).unwrap();
        let song = JsonTabParser.parse(file.path()).unwrap();
        assert_eq!(song.title, "Midnight Run");
        assert_eq!(song.tempo, Some(120));
        assert!(!song.tracks[0].percussion);
        let beats = &song.tracks[0].measures[0].voices[0].beats;
        assert_eq!(beats[0].notes, vec!["E2", "B2"]);
        assert_eq!(beats[0].chord.as_deref(), Some("Em"));
        assert!(beats[1].notes.is_empty());
        assert!(beats[1].chord.is_none());
    }

    #[test]
    fn score_parses_with_defaults() {
        let raw = r#"{"parts": [{"measures": [{"notes": ["C4"]}, {}]}]}"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(raw.as_bytes()).unwrap();
        let score = JsonScoreParser.parse(file.path()).unwrap();
        assert!(score.tempo.is_none());
        assert_eq!(score.parts[0].measures[0].notes, vec!["C4"]);
        assert!(score.parts[0].measures[1].notes.is_empty());
    }

    #[test]
    fn malformed_export_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = JsonTabParser.parse(file.path()).unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = JsonScoreParser
            .parse(Path::new("/nonexistent/score.json"))
            .unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }
}
