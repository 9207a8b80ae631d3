//! Web collector: scrape configured seed pages into prose chunks.

use tracing::{info, warn};

use crate::chunk::chunk_text;
use crate::config::WebCollectorConfig;
use crate::error::IngestError;
use crate::extract::{extract_main_text, page_title, site_rule_for, SiteRule, Target};
use crate::models::{ChunkMeta, MusicChunk};
use crate::normalize::normalize_prose;
use crate::pipeline::PipelineContext;

pub async fn collect(
    ctx: &PipelineContext,
    config: &WebCollectorConfig,
    limit: Option<usize>,
) -> Vec<MusicChunk> {
    let mut chunks = Vec::new();
    for url in config.seed_urls.iter().take(limit.unwrap_or(usize::MAX)) {
        match scrape_page(ctx, url).await {
            Ok(mut page_chunks) => {
                info!("{url}: {} chunks", page_chunks.len());
                chunks.append(&mut page_chunks);
            }
            Err(e) => warn!("{url}: skipped: {e}"),
        }
    }
    chunks
}

async fn scrape_page(ctx: &PipelineContext, url: &str) -> Result<Vec<MusicChunk>, IngestError> {
    let fetched = ctx.fetcher.get(url).await?;
    let html = fetched.text();
    let rule = site_rule_for(url);
    let text = extract_main_text(&html, rule);
    let title = page_title(&html).unwrap_or_else(|| url.to_string());
    let source = source_tag(url);
    let content_type = page_kind(url, rule);
    let mut normalized = normalize_prose(&source, url, &title, content_type, None, &text)
        .ok_or_else(|| IngestError::ExtractionEmpty(url.to_string()))?;
    // Tab pages are guitar material even when the body never says so
    if content_type == "guitar_tab" {
        if let ChunkMeta::Prose(meta) = &mut normalized.meta {
            meta.instrument = "guitar".to_string();
        }
    }
    chunk_text(
        &ctx.tokenizer,
        &normalized.text,
        &normalized.meta,
        ctx.chunk_size,
    )
}

/// Host with scheme and leading `www.` stripped; the chunk's origin tag.
fn source_tag(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split('/').next().unwrap_or(rest);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

fn page_kind(url: &str, rule: Option<&SiteRule>) -> &'static str {
    if matches!(rule.map(|r| r.target), Some(Target::PreBlocks)) {
        "guitar_tab"
    } else if url.contains("/lesson") {
        "lesson"
    } else {
        "main_page"
    }
}
