//! MIDI collector: a local directory of MIDI-derived scores in JSON
//! interchange form. Each sounded measure becomes one note-event chunk.

use std::path::Path;
use tracing::{info, warn};

use crate::collect_tabs::{chunk_normalized, file_stem, scan_dir};
use crate::config::MidiCollectorConfig;
use crate::error::IngestError;
use crate::models::{MusicChunk, NoteEventMeta};
use crate::normalize::{self, Normalized};
use crate::pipeline::PipelineContext;
use crate::score::{JsonScoreParser, Score, ScoreParser};

pub fn collect(
    ctx: &PipelineContext,
    config: &MidiCollectorConfig,
    limit: Option<usize>,
) -> Vec<MusicChunk> {
    let files = match scan_dir(&config.dir, &config.include_globs) {
        Ok(files) => files,
        Err(e) => {
            warn!("{}: skipped: {e}", config.dir.display());
            return Vec::new();
        }
    };
    let mut chunks = Vec::new();
    for path in files.iter().take(limit.unwrap_or(usize::MAX)) {
        match score_chunks(ctx, path) {
            Ok(mut file_out) => {
                info!("{}: {} chunks", path.display(), file_out.len());
                chunks.append(&mut file_out);
            }
            Err(e) => warn!("{}: skipped: {e}", path.display()),
        }
    }
    chunks
}

fn score_chunks(ctx: &PipelineContext, path: &Path) -> Result<Vec<MusicChunk>, IngestError> {
    let score = JsonScoreParser.parse(path)?;
    let events = score_events(&score, &file_stem(path));
    if events.is_empty() {
        return Err(IngestError::ExtractionEmpty(path.display().to_string()));
    }
    chunk_normalized(ctx, events)
}

/// One event per measure that sounds at least one note. Scores carry no
/// per-beat placement, so the beat index is always zero.
fn score_events(score: &Score, title: &str) -> Vec<Normalized> {
    let mut events = Vec::new();
    for (part_idx, part) in score.parts.iter().enumerate() {
        for (measure_idx, measure) in part.measures.iter().enumerate() {
            if measure.notes.is_empty() {
                continue;
            }
            events.push(normalize::note_event(NoteEventMeta {
                source: "MIDI".to_string(),
                title: title.to_string(),
                track: part_idx,
                measure: measure_idx + 1,
                beat: 0,
                notes: measure.notes.clone(),
                chord: None,
                tempo: score.tempo,
                duration: None,
            }));
        }
    }
    events
}
