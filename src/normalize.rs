//! Normalizers: one per input shape, each producing canonical text plus a
//! typed metadata record ready for chunking.

use crate::models::{
    ChunkMeta, Difficulty, NoteEventMeta, ProgressionMeta, ProseMeta, TabSectionMeta, Topic,
};

/// Prose shorter than this after cleanup carries no retrieval value.
const MIN_PROSE_LEN: usize = 50;

/// Section labels recognized at line starts in ASCII tablature.
const SECTION_MARKERS: [&str; 6] = ["Verse", "Chorus", "Bridge", "Solo", "Intro", "Outro"];

const TOPIC_KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::Chords, &["chord", "progression", "harmony"]),
    (Topic::Scales, &["scale", "mode", "key"]),
    (Topic::Rhythm, &["rhythm", "tempo", "beat"]),
    (Topic::Technique, &["technique", "fingering", "exercise"]),
    (Topic::Theory, &["theory", "interval", "note"]),
];

const DIFFICULTY_KEYWORDS: &[(Difficulty, &[&str])] = &[
    (Difficulty::Beginner, &["beginner", "basic", "introduction", "start"]),
    (Difficulty::Advanced, &["advanced", "expert", "complex"]),
];

/// Canonical text plus the metadata that travels with every chunk cut from it.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub text: String,
    pub meta: ChunkMeta,
}

/// Normalize an article or other prose body. Returns `None` when the cleaned
/// text is too short to be worth chunking.
pub fn normalize_prose(
    source: &str,
    url: &str,
    title: &str,
    content_type: &str,
    format: Option<&str>,
    raw: &str,
) -> Option<Normalized> {
    let text = squeeze_blank_lines(raw);
    if text.chars().count() < MIN_PROSE_LEN {
        return None;
    }
    let lower = text.to_lowercase();
    let meta = ProseMeta {
        source: source.to_string(),
        url: url.to_string(),
        title: title.to_string(),
        content_type: content_type.to_string(),
        format: format.map(str::to_string),
        topic: classify_topic(&lower),
        difficulty: classify_difficulty(&lower),
        instrument: detect_instrument(&lower).to_string(),
    };
    Some(Normalized {
        text,
        meta: ChunkMeta::Prose(meta),
    })
}

/// Split an ASCII tablature file into per-section records. Lines before the
/// first recognized marker become an implicit "Intro" section; sections whose
/// body trims to nothing are dropped.
pub fn tab_sections(title: &str, raw: &str) -> Vec<Normalized> {
    let mut sections: Vec<(&'static str, Vec<&str>)> = Vec::new();
    let mut preamble: Vec<&str> = Vec::new();
    for line in raw.lines() {
        if let Some(marker) = match_section_marker(line) {
            sections.push((marker, Vec::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        } else {
            preamble.push(line);
        }
    }
    if preamble.iter().any(|l| !l.trim().is_empty()) {
        sections.insert(0, ("Intro", preamble));
    }
    sections
        .into_iter()
        .filter_map(|(section, lines)| {
            let tab = lines.join("\n").trim().to_string();
            if tab.is_empty() {
                return None;
            }
            Some(tab_section(title, section, &tab))
        })
        .collect()
}

fn tab_section(title: &str, section: &str, tab: &str) -> Normalized {
    let meta = TabSectionMeta {
        source: "freetar".to_string(),
        title: title.to_string(),
        section: section.to_string(),
        tab: tab.to_string(),
    };
    // json! objects serialize with sorted keys, so the record text is stable.
    let text = serde_json::json!({
        "source": meta.source,
        "title": meta.title,
        "section": meta.section,
        "tab": meta.tab,
    })
    .to_string();
    Normalized {
        text,
        meta: ChunkMeta::TabSection(meta),
    }
}

/// Serialize a note/beat event into its canonical record. Composite fields
/// are flattened to scalars here so the record is store-safe from creation.
pub fn note_event(meta: NoteEventMeta) -> Normalized {
    let text = serde_json::json!({
        "source": meta.source,
        "title": meta.title,
        "track": meta.track,
        "measure": meta.measure,
        "beat": meta.beat,
        "notes": meta.notes.join(", "),
        "chord": meta.chord,
        "tempo": meta.tempo,
        "duration": meta.duration,
    })
    .to_string();
    Normalized {
        text,
        meta: ChunkMeta::NoteEvent(meta),
    }
}

/// Render a chord-progression usage record as a short description.
pub fn progression(meta: ProgressionMeta) -> Normalized {
    let text = format!(
        "Chord progression: {}\nSong: {}\nArtist: {}\nProbability: {}\n",
        meta.progression, meta.song, meta.artist, meta.probability
    );
    Normalized {
        text,
        meta: ChunkMeta::Progression(meta),
    }
}

fn classify_topic(lower: &str) -> Topic {
    for (topic, keywords) in TOPIC_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return *topic;
        }
    }
    Topic::General
}

fn classify_difficulty(lower: &str) -> Difficulty {
    for (difficulty, keywords) in DIFFICULTY_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return *difficulty;
        }
    }
    Difficulty::Intermediate
}

fn detect_instrument(lower: &str) -> &'static str {
    if lower.contains("guitar") {
        "guitar"
    } else {
        "general"
    }
}

/// Collapse runs of blank lines to a single blank line and strip trailing
/// whitespace per line. Leading and trailing blank lines are removed.
fn squeeze_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_blank = false;
    for line in text.lines() {
        let line = line.trim_end();
        if line.trim_start().is_empty() {
            pending_blank = true;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        pending_blank = false;
        out.push_str(line);
    }
    out
}

fn match_section_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim();
    SECTION_MARKERS
        .into_iter()
        .find(|marker| starts_with_ignore_case(trimmed, marker))
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_priority_first_hit_wins() {
        assert_eq!(classify_topic("this chord over that scale"), Topic::Chords);
        assert_eq!(classify_topic("the dorian mode explained"), Topic::Scales);
        assert_eq!(classify_topic("keeping the beat steady"), Topic::Rhythm);
        assert_eq!(classify_topic("a fingering exercise"), Topic::Technique);
        assert_eq!(classify_topic("interval study"), Topic::Theory);
        assert_eq!(classify_topic("plain filler words"), Topic::General);
    }

    #[test]
    fn difficulty_defaults_to_intermediate() {
        assert_eq!(classify_difficulty("a basic introduction"), Difficulty::Beginner);
        assert_eq!(classify_difficulty("for expert players"), Difficulty::Advanced);
        assert_eq!(classify_difficulty("basic yet advanced"), Difficulty::Beginner);
        assert_eq!(classify_difficulty("plain filler words"), Difficulty::Intermediate);
    }

    #[test]
    fn instrument_detection() {
        assert_eq!(detect_instrument("guitar voicings"), "guitar");
        assert_eq!(detect_instrument("piano voicings"), "general");
    }

    #[test]
    fn prose_below_minimum_length_is_discarded() {
        assert!(normalize_prose("x.com", "https://x.com", "T", "main_page", None, "too short").is_none());
    }

    #[test]
    fn prose_squeezes_blank_runs_and_classifies() {
        let raw = "Open chord shapes for guitar.\n\n\n\nStart with E major and work slowly.";
        let n = normalize_prose("x.com", "https://x.com/a", "Chords", "lesson", None, raw).unwrap();
        assert_eq!(
            n.text,
            "Open chord shapes for guitar.\n\nStart with E major and work slowly."
        );
        match n.meta {
            ChunkMeta::Prose(m) => {
                assert_eq!(m.topic, Topic::Chords);
                assert_eq!(m.difficulty, Difficulty::Beginner);
                assert_eq!(m.instrument, "guitar");
                assert_eq!(m.content_type, "lesson");
            }
            other => panic!("expected prose metadata, got {other:?}"),
        }
    }

    #[test]
    fn tab_file_splits_into_one_record_per_section() {
        let raw = "Verse\nE|---0---|\nChorus\nE|---3---|";
        let sections = tab_sections("Wonderwall", raw);
        assert_eq!(sections.len(), 2);
        let first = match &sections[0].meta {
            ChunkMeta::TabSection(m) => m,
            other => panic!("expected tab section, got {other:?}"),
        };
        assert_eq!(first.section, "Verse");
        assert_eq!(first.tab, "E|---0---|");
        assert!(sections[0].text.contains("---0---"));
        assert!(!sections[0].text.contains("---3---"));
        let second = match &sections[1].meta {
            ChunkMeta::TabSection(m) => m,
            other => panic!("expected tab section, got {other:?}"),
        };
        assert_eq!(second.section, "Chorus");
        assert_eq!(second.tab, "E|---3---|");
    }

    #[test]
    fn leading_lines_become_an_implicit_intro() {
        let raw = "E|--pre--|\nVerse\nE|---0---|";
        let sections = tab_sections("Song", raw);
        assert_eq!(sections.len(), 2);
        match &sections[0].meta {
            ChunkMeta::TabSection(m) => {
                assert_eq!(m.section, "Intro");
                assert_eq!(m.tab, "E|--pre--|");
            }
            other => panic!("expected tab section, got {other:?}"),
        }
    }

    #[test]
    fn markers_match_case_insensitively_and_canonicalize() {
        let raw = "CHORUS 2\nE|---3---|";
        let sections = tab_sections("Song", raw);
        assert_eq!(sections.len(), 1);
        match &sections[0].meta {
            ChunkMeta::TabSection(m) => assert_eq!(m.section, "Chorus"),
            other => panic!("expected tab section, got {other:?}"),
        }
    }

    #[test]
    fn empty_section_bodies_are_dropped() {
        let raw = "Verse\nChorus\nE|---3---|";
        let sections = tab_sections("Song", raw);
        assert_eq!(sections.len(), 1);
        match &sections[0].meta {
            ChunkMeta::TabSection(m) => assert_eq!(m.section, "Chorus"),
            other => panic!("expected tab section, got {other:?}"),
        }
    }

    #[test]
    fn note_event_record_flattens_composites() {
        let n = note_event(NoteEventMeta {
            source: "TuxGuitar".to_string(),
            title: "Etude".to_string(),
            track: 0,
            measure: 3,
            beat: 1,
            notes: vec!["E2".to_string(), "A2".to_string()],
            chord: None,
            tempo: Some(120),
            duration: Some(480),
        });
        let v: serde_json::Value = serde_json::from_str(&n.text).unwrap();
        assert_eq!(v["notes"], "E2, A2");
        assert!(v["chord"].is_null());
        assert_eq!(v["measure"], 3);
        assert_eq!(v["tempo"], 120);
    }

    #[test]
    fn progression_uses_the_fixed_template() {
        let n = progression(ProgressionMeta {
            source: "HookTheory".to_string(),
            title: "Axis - Example".to_string(),
            content_type: "chord_progression".to_string(),
            progression: "1,5,6,4".to_string(),
            song: "Example".to_string(),
            artist: "Axis".to_string(),
            probability: 0.5,
        });
        assert_eq!(
            n.text,
            "Chord progression: 1,5,6,4\nSong: Example\nArtist: Axis\nProbability: 0.5\n"
        );
    }
}
