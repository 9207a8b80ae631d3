//! Core data models for the ingestion pipeline.
//!
//! A [`MusicChunk`] is the unit of retrieval. Its metadata is typed by source
//! shape ([`ChunkMeta`]) and stays rich in memory and in JSON snapshots; it is
//! flattened to store-safe scalars only at the store boundary.

use serde::{Deserialize, Serialize};

/// Topic label assigned to prose by keyword classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Chords,
    Scales,
    Rhythm,
    Technique,
    Theory,
    General,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Chords => "chords",
            Topic::Scales => "scales",
            Topic::Rhythm => "rhythm",
            Topic::Technique => "technique",
            Topic::Theory => "theory",
            Topic::General => "general",
        }
    }
}

/// Difficulty label assigned to prose by keyword classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Advanced,
    Intermediate,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Advanced => "advanced",
            Difficulty::Intermediate => "intermediate",
        }
    }
}

/// Metadata for an article or other prose page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProseMeta {
    pub source: String,
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub topic: Topic,
    pub difficulty: Difficulty,
    pub instrument: String,
}

/// Metadata for one section of an ASCII tablature file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabSectionMeta {
    pub source: String,
    pub title: String,
    pub section: String,
    pub tab: String,
}

/// Metadata for a single note/beat event out of a tab export or score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteEventMeta {
    pub source: String,
    pub title: String,
    pub track: usize,
    /// 1-based measure number.
    pub measure: usize,
    /// 0-based beat index within the measure, counted across voices.
    pub beat: usize,
    pub notes: Vec<String>,
    pub chord: Option<String>,
    pub tempo: Option<u32>,
    pub duration: Option<u32>,
}

/// Metadata for one chord-progression usage record from the trends API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionMeta {
    pub source: String,
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub progression: String,
    pub song: String,
    pub artist: String,
    pub probability: f64,
}

/// Per-shape chunk metadata. Serialized untagged so snapshot entries stay
/// flat maps; variant order matters for deserialization (most distinctive
/// field sets first).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChunkMeta {
    NoteEvent(NoteEventMeta),
    Progression(ProgressionMeta),
    TabSection(TabSectionMeta),
    Prose(ProseMeta),
}

impl ChunkMeta {
    /// Origin tag carried into the chunk's `source` field.
    pub fn source(&self) -> &str {
        match self {
            ChunkMeta::NoteEvent(m) => &m.source,
            ChunkMeta::Progression(m) => &m.source,
            ChunkMeta::TabSection(m) => &m.source,
            ChunkMeta::Prose(m) => &m.source,
        }
    }

    /// Human-readable label carried into the chunk's `title` field.
    pub fn title(&self) -> &str {
        match self {
            ChunkMeta::NoteEvent(m) => &m.title,
            ChunkMeta::Progression(m) => &m.title,
            ChunkMeta::TabSection(m) => &m.title,
            ChunkMeta::Prose(m) => &m.title,
        }
    }

    /// Bytes folded into the chunk id ahead of the content. Positional
    /// fields must appear here so records that happen to serialize
    /// identically at different positions still get distinct ids.
    pub fn id_salt(&self) -> String {
        match self {
            ChunkMeta::NoteEvent(m) => {
                format!("{}:{}:{}:{}", m.title, m.track, m.measure, m.beat)
            }
            ChunkMeta::Progression(m) => format!("{}:{}", m.title, m.progression),
            ChunkMeta::TabSection(m) => format!("{}:{}", m.title, m.section),
            ChunkMeta::Prose(m) => m.source.clone(),
        }
    }

    /// Content-type bucket used by the summary report.
    pub fn kind(&self) -> &str {
        match self {
            ChunkMeta::NoteEvent(_) => "note_event",
            ChunkMeta::Progression(m) => &m.content_type,
            ChunkMeta::TabSection(_) => "tab_section",
            ChunkMeta::Prose(m) => &m.content_type,
        }
    }
}

/// The unit of retrieval: token-bounded text plus provenance metadata and a
/// content-derived id. Field order here is the snapshot key order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicChunk {
    pub source: String,
    pub title: String,
    pub content: String,
    pub metadata: ChunkMeta,
    pub chunk_id: String,
    pub token_count: usize,
}
