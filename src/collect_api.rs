//! Progression collector: chord-progression usage trends from the
//! HookTheory API. One chunk per (progression, song) usage record.

use serde_json::Value;
use tracing::{info, warn};

use crate::chunk::chunk_text;
use crate::config::ApiCollectorConfig;
use crate::error::IngestError;
use crate::models::{MusicChunk, ProgressionMeta};
use crate::normalize;
use crate::pipeline::PipelineContext;

const TRENDS_URL: &str = "https://api.hooktheory.com/v1/trends/nodes";
const TOKEN_ENV: &str = "HOOKTHEORY_TOKEN";

pub async fn collect(
    ctx: &PipelineContext,
    config: &ApiCollectorConfig,
    limit: Option<usize>,
) -> Vec<MusicChunk> {
    let token = match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => token,
        _ => {
            let e = IngestError::Config(format!("{TOKEN_ENV} not set"));
            warn!("progression API skipped: {e}");
            return Vec::new();
        }
    };
    let mut chunks = Vec::new();
    for progression in config.progressions.iter().take(limit.unwrap_or(usize::MAX)) {
        match fetch_progression(ctx, &token, progression).await {
            Ok(mut prog_chunks) => {
                info!("{progression}: {} chunks", prog_chunks.len());
                chunks.append(&mut prog_chunks);
            }
            Err(e) => warn!("{progression}: skipped: {e}"),
        }
    }
    chunks
}

async fn fetch_progression(
    ctx: &PipelineContext,
    token: &str,
    progression: &str,
) -> Result<Vec<MusicChunk>, IngestError> {
    let url = format!("{TRENDS_URL}?cp={progression}");
    let fetched = ctx.fetcher.get_with_bearer(&url, token).await?;
    let body: Value = serde_json::from_slice(&fetched.body)
        .map_err(|e| IngestError::Parse(format!("{url}: {e}")))?;
    let mut chunks = Vec::new();
    for meta in parse_trends(progression, &body) {
        let normalized = normalize::progression(meta);
        chunks.extend(chunk_text(
            &ctx.tokenizer,
            &normalized.text,
            &normalized.meta,
            ctx.chunk_size,
        )?);
    }
    Ok(chunks)
}

/// Pull usage records out of a trends response. The endpoint has shipped two
/// shapes over time: nodes that carry a `songs` array, and flat arrays where
/// each item is itself a song record. Both are accepted; missing fields fall
/// back rather than dropping the record.
pub fn parse_trends(progression: &str, body: &Value) -> Vec<ProgressionMeta> {
    let Some(items) = body.as_array() else {
        return Vec::new();
    };
    let mut records = Vec::new();
    for item in items {
        if let Some(songs) = item.get("songs").and_then(Value::as_array) {
            for song in songs {
                records.push(song_record(progression, song));
            }
        } else if item.is_object() {
            records.push(song_record(progression, item));
        }
    }
    records
}

fn song_record(progression: &str, song: &Value) -> ProgressionMeta {
    let song_name = song
        .get("song")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let artist = song
        .get("artist")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let probability = song
        .get("probability")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    ProgressionMeta {
        source: "HookTheory".to_string(),
        title: format!("{artist} - {song_name}"),
        content_type: "chord_progression".to_string(),
        progression: progression.to_string(),
        song: song_name,
        artist,
        probability,
    }
}
