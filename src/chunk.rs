//! Token-window chunking with content-addressed ids.

use sha2::{Digest, Sha256};

use crate::error::IngestError;
use crate::models::{ChunkMeta, MusicChunk};
use crate::tokenizer::Tokenizer;

/// Split `text` into consecutive windows of at most `chunk_size` tokens and
/// wrap each window as a [`MusicChunk`] carrying a clone of `meta`.
///
/// Windows are cut purely by token count, in order, with no overlap; a cut
/// may land mid-sentence. The final window holds the remainder. Empty input
/// yields no chunks. Windows that trim down to nothing are dropped.
pub fn chunk_text(
    tokenizer: &Tokenizer,
    text: &str,
    meta: &ChunkMeta,
    chunk_size: usize,
) -> Result<Vec<MusicChunk>, IngestError> {
    if chunk_size == 0 {
        return Err(IngestError::Config(
            "chunk_size must be at least 1".to_string(),
        ));
    }
    let tokens = tokenizer.encode(text);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let mut chunks = Vec::with_capacity(tokens.len() / chunk_size + 1);
    for window in tokens.chunks(chunk_size) {
        let decoded = tokenizer.decode(window.to_vec())?;
        let content = decoded.trim();
        if content.is_empty() {
            continue;
        }
        chunks.push(make_chunk(content, meta, window.len()));
    }
    Ok(chunks)
}

fn make_chunk(content: &str, meta: &ChunkMeta, token_count: usize) -> MusicChunk {
    let mut hasher = Sha256::new();
    hasher.update(meta.id_salt().as_bytes());
    hasher.update(content.as_bytes());
    let chunk_id = format!("{:x}", hasher.finalize());
    MusicChunk {
        source: meta.source().to_string(),
        title: meta.title().to_string(),
        content: content.to_string(),
        metadata: meta.clone(),
        chunk_id,
        token_count,
    }
}
