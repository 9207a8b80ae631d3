//! Tablature collector: a local directory of ASCII tabs (`.txt`) and
//! tab-binary exports in JSON interchange form (`.json`).
//!
//! ASCII files split into per-section chunks. Exports flatten into one
//! note-event chunk per sounded beat; percussion tracks carry no pitch
//! material and are skipped.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::TabsCollectorConfig;
use crate::error::IngestError;
use crate::models::{MusicChunk, NoteEventMeta};
use crate::normalize::{self, tab_sections, Normalized};
use crate::pipeline::PipelineContext;
use crate::score::{JsonTabParser, TabParser, TabSong};

pub fn collect(
    ctx: &PipelineContext,
    config: &TabsCollectorConfig,
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
        match file_chunks(ctx, path) {
            Ok(mut file_out) => {
                info!("{}: {} chunks", path.display(), file_out.len());
                chunks.append(&mut file_out);
            }
            Err(e) => warn!("{}: skipped: {e}", path.display()),
        }
    }
    chunks
}

fn file_chunks(ctx: &PipelineContext, path: &Path) -> Result<Vec<MusicChunk>, IngestError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("txt") => ascii_tab_chunks(ctx, path),
        Some("json") => tab_export_chunks(ctx, path),
        _ => Ok(Vec::new()),
    }
}

fn ascii_tab_chunks(ctx: &PipelineContext, path: &Path) -> Result<Vec<MusicChunk>, IngestError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| IngestError::Parse(format!("{}: {e}", path.display())))?;
    let title = file_stem(path);
    let sections = tab_sections(&title, &raw);
    if sections.is_empty() {
        return Err(IngestError::ExtractionEmpty(path.display().to_string()));
    }
    chunk_normalized(ctx, sections)
}

fn tab_export_chunks(ctx: &PipelineContext, path: &Path) -> Result<Vec<MusicChunk>, IngestError> {
    let song = JsonTabParser.parse(path)?;
    let events = note_events(&song);
    if events.is_empty() {
        return Err(IngestError::ExtractionEmpty(path.display().to_string()));
    }
    chunk_normalized(ctx, events)
}

/// Beats that sound notes or name a chord become events. The beat counter
/// runs across every voice of a measure, silent beats included, so positions
/// stay unique when voices overlap.
fn note_events(song: &TabSong) -> Vec<Normalized> {
    let mut events = Vec::new();
    for (track_idx, track) in song.tracks.iter().enumerate() {
        if track.percussion {
            continue;
        }
        for (measure_idx, measure) in track.measures.iter().enumerate() {
            let mut beat_no = 0usize;
            for voice in &measure.voices {
                for beat in &voice.beats {
                    if !beat.notes.is_empty() || beat.chord.is_some() {
                        events.push(normalize::note_event(NoteEventMeta {
                            source: "TuxGuitar".to_string(),
                            title: song.title.clone(),
                            track: track_idx,
                            measure: measure_idx + 1,
                            beat: beat_no,
                            notes: beat.notes.clone(),
                            chord: beat.chord.clone(),
                            tempo: song.tempo,
                            duration: beat.duration,
                        }));
                    }
                    beat_no += 1;
                }
            }
        }
    }
    events
}

pub(crate) fn chunk_normalized(
    ctx: &PipelineContext,
    normalized: Vec<Normalized>,
) -> Result<Vec<MusicChunk>, IngestError> {
    let mut chunks = Vec::new();
    for item in normalized {
        chunks.extend(chunk_text(
            &ctx.tokenizer,
            &item.text,
            &item.meta,
            ctx.chunk_size,
        )?);
    }
    Ok(chunks)
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

/// Walk a directory and return the files matching the include globs,
/// sorted for deterministic ordering.
pub(crate) fn scan_dir(dir: &Path, include_globs: &[String]) -> Result<Vec<PathBuf>, IngestError> {
    if !dir.is_dir() {
        return Err(IngestError::Config(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    let include_set = build_globset(include_globs)?;
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("walk error under {}: {e}", dir.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(dir).unwrap_or(path);
        if include_set.is_match(relative.to_string_lossy().as_ref()) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, IngestError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| IngestError::Config(format!("glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| IngestError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::ChunkMeta;
    use crate::score::{TabBeat, TabMeasure, TabTrack, TabVoice};

    fn song() -> TabSong {
        TabSong {
            title: "Midnight Run".to_string(),
            tempo: Some(120),
            tracks: vec![
                TabTrack {
                    name: "Lead".to_string(),
                    percussion: false,
                    measures: vec![
                        TabMeasure {
                            voices: vec![
                                TabVoice {
                                    beats: vec![
                                        TabBeat {
                                            notes: vec!["E2".to_string()],
                                            chord: None,
                                            duration: Some(480),
                                        },
                                        TabBeat {
                                            notes: vec![],
                                            chord: None,
                                            duration: None,
                                        },
                                    ],
                                },
                                TabVoice {
                                    beats: vec![TabBeat {
                                        notes: vec![],
                                        chord: Some("Em".to_string()),
                                        duration: None,
                                    }],
                                },
                            ],
                        },
                        TabMeasure {
                            voices: vec![TabVoice {
                                beats: vec![TabBeat {
                                    notes: vec!["G2".to_string(), "B2".to_string()],
                                    chord: None,
                                    duration: Some(240),
                                }],
                            }],
                        },
                    ],
                },
                TabTrack {
                    name: "Drums".to_string(),
                    percussion: true,
                    measures: vec![TabMeasure {
                        voices: vec![TabVoice {
                            beats: vec![TabBeat {
                                notes: vec!["C1".to_string()],
                                chord: None,
                                duration: None,
                            }],
                        }],
                    }],
                },
            ],
        }
    }

    #[test]
    fn percussion_tracks_are_skipped() {
        let events = note_events(&song());
        assert_eq!(events.len(), 3);
        for event in &events {
            match &event.meta {
                ChunkMeta::NoteEvent(m) => assert_eq!(m.source, "TuxGuitar"),
                other => panic!("expected note event, got {other:?}"),
            }
        }
    }

    #[test]
    fn beat_counter_runs_across_voices() {
        let events = note_events(&song());
        let positions: Vec<(usize, usize, usize)> = events
            .iter()
            .map(|e| match &e.meta {
                ChunkMeta::NoteEvent(m) => (m.track, m.measure, m.beat),
                other => panic!("expected note event, got {other:?}"),
            })
            .collect();
        // Measure 1: sounded beat 0 in voice one, then the chord beat lands
        // at index 2 because the silent beat still advances the counter.
        assert_eq!(positions, vec![(0, 1, 0), (0, 1, 2), (0, 2, 0)]);
    }

    #[test]
    fn measures_are_one_based() {
        let events = note_events(&song());
        match &events[0].meta {
            ChunkMeta::NoteEvent(m) => assert_eq!(m.measure, 1),
            other => panic!("expected note event, got {other:?}"),
        }
    }

    #[test]
    fn bad_export_is_skipped_and_good_files_still_collect() {
        let dir = tempfile::TempDir::new().unwrap();
        // Sorts ahead of the tab file, so the run must get past the failure.
        std::fs::write(dir.path().join("a_broken.json"), "{not valid json").unwrap();
        std::fs::write(dir.path().join("ballad.txt"), "Verse\nE|---0---|").unwrap();
        let ctx = PipelineContext::new(&Config::default()).unwrap();
        let cfg = TabsCollectorConfig {
            dir: dir.path().to_path_buf(),
            include_globs: vec!["**/*.txt".to_string(), "**/*.json".to_string()],
        };
        let chunks = collect(&ctx, &cfg, None);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source, "freetar");
        assert_eq!(chunks[0].title, "ballad");
        match &chunks[0].metadata {
            ChunkMeta::TabSection(m) => assert_eq!(m.section, "Verse"),
            other => panic!("expected tab section, got {other:?}"),
        }
    }

    #[test]
    fn scan_dir_filters_and_sorts() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("b_song.txt"), "Verse\nE|-0-|").unwrap();
        std::fs::write(dir.path().join("a_song.txt"), "Verse\nE|-1-|").unwrap();
        std::fs::write(dir.path().join("notes.md"), "not a tab").unwrap();
        let files = scan_dir(
            dir.path(),
            &["**/*.txt".to_string(), "**/*.json".to_string()],
        )
        .unwrap();
        let names: Vec<String> = files.iter().map(|p| file_stem(p)).collect();
        assert_eq!(names, vec!["a_song", "b_song"]);
    }

    #[test]
    fn missing_dir_is_a_config_error() {
        let err = scan_dir(Path::new("/nonexistent/tabs"), &["**/*.txt".to_string()]).unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }
}
