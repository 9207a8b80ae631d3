//! PDF collector: fetch configured documents and chunk their text.

use tracing::{info, warn};

use crate::chunk::chunk_text;
use crate::config::{PdfCollectorConfig, PdfSource};
use crate::error::IngestError;
use crate::extract::extract_pdf_text;
use crate::models::MusicChunk;
use crate::normalize::normalize_prose;
use crate::pipeline::PipelineContext;

pub async fn collect(
    ctx: &PipelineContext,
    config: &PdfCollectorConfig,
    limit: Option<usize>,
) -> Vec<MusicChunk> {
    let mut chunks = Vec::new();
    for doc in config.documents.iter().take(limit.unwrap_or(usize::MAX)) {
        match scrape_document(ctx, doc).await {
            Ok(mut doc_chunks) => {
                info!("{}: {} chunks", doc.url, doc_chunks.len());
                chunks.append(&mut doc_chunks);
            }
            Err(e) => warn!("{}: skipped: {e}", doc.url),
        }
    }
    chunks
}

async fn scrape_document(
    ctx: &PipelineContext,
    doc: &PdfSource,
) -> Result<Vec<MusicChunk>, IngestError> {
    let fetched = ctx.fetcher.get(&doc.url).await?;
    if let Some(ct) = &fetched.content_type {
        if !ct.contains("pdf") && !ct.contains("octet-stream") {
            warn!("{}: content-type {ct}, trying anyway", doc.url);
        }
    }
    let text = extract_pdf_text(&fetched.body)?;
    let title = doc
        .title
        .clone()
        .unwrap_or_else(|| title_from_url(&doc.url));
    let normalized = normalize_prose(
        "PDF",
        &doc.url,
        &title,
        "educational_material",
        Some("pdf"),
        &text,
    )
    .ok_or_else(|| IngestError::ExtractionEmpty(doc.url.clone()))?;
    chunk_text(
        &ctx.tokenizer,
        &normalized.text,
        &normalized.meta,
        ctx.chunk_size,
    )
}

/// Fallback title from the last path segment: extension dropped, separators
/// turned into spaces.
fn title_from_url(url: &str) -> String {
    let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    let stem = last.strip_suffix(".pdf").unwrap_or(last);
    let spaced = stem.replace(['-', '_'], " ");
    let spaced = spaced.trim();
    if spaced.is_empty() {
        url.to_string()
    } else {
        spaced.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_derives_from_the_filename() {
        assert_eq!(
            title_from_url("https://example.org/guides/chord-theory_intro.pdf"),
            "chord theory intro"
        );
        assert_eq!(title_from_url("https://example.org/scales.pdf/"), "scales");
        assert_eq!(title_from_url("https://example.org/notes"), "notes");
    }
}
