//! Sync pipeline orchestration.
//!
//! Coordinates the full flow: collectors → normalization → chunking →
//! snapshots → store upserts. A failing source degrades to a warning and the
//! run keeps going; the summary report prints no matter what.

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::models::MusicChunk;
use crate::store::{self, SqliteIndex, UpsertReport};
use crate::tokenizer::Tokenizer;
use crate::{collect_api, collect_midi, collect_pdf, collect_tabs, collect_web};

/// Collector names in run order.
pub const COLLECTORS: [&str; 5] = ["web", "pdf", "tabs", "midi", "api"];

/// Shared machinery handed to every collector.
pub struct PipelineContext {
    pub tokenizer: Tokenizer,
    pub fetcher: Fetcher,
    pub chunk_size: usize,
}

impl PipelineContext {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            tokenizer: Tokenizer::cl100k()?,
            fetcher: Fetcher::new(&config.fetch)?,
            chunk_size: config.chunking.chunk_size,
        })
    }
}

pub async fn run_sync(
    config: &Config,
    collector: &str,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<()> {
    let selected: Vec<&str> = if collector == "all" {
        COLLECTORS.to_vec()
    } else if COLLECTORS.contains(&collector) {
        vec![collector]
    } else {
        bail!(
            "Unknown collector: '{}'. Available: web, pdf, tabs, midi, api, all",
            collector
        )
    };

    let ctx = PipelineContext::new(config)?;

    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut corpus: Vec<MusicChunk> = Vec::new();
    for name in selected {
        let Some(chunks) = run_collector(&ctx, config, name, limit).await else {
            continue;
        };
        if !dry_run {
            if let Err(e) = write_snapshot(&config.output.dir, snapshot_name(name), &chunks) {
                warn!("snapshot {}: {e}", snapshot_name(name));
            }
        }
        counts.push((name, chunks.len()));
        corpus.extend(chunks);
    }

    if !dry_run {
        if let Err(e) = write_snapshot(&config.output.dir, "music_corpus.json", &corpus) {
            warn!("snapshot music_corpus.json: {e}");
        }
    }

    let report = if dry_run {
        None
    } else {
        Some(store_corpus(config, &corpus).await)
    };

    print_summary(collector, dry_run, &counts, &corpus, report);
    Ok(())
}

/// Run one collector, or skip it when its config section is absent.
async fn run_collector(
    ctx: &PipelineContext,
    config: &Config,
    name: &str,
    limit: Option<usize>,
) -> Option<Vec<MusicChunk>> {
    match name {
        "web" => match &config.collectors.web {
            Some(cfg) => Some(collect_web::collect(ctx, cfg, limit).await),
            None => skip(name),
        },
        "pdf" => match &config.collectors.pdf {
            Some(cfg) => Some(collect_pdf::collect(ctx, cfg, limit).await),
            None => skip(name),
        },
        "tabs" => match &config.collectors.tabs {
            Some(cfg) => Some(collect_tabs::collect(ctx, cfg, limit)),
            None => skip(name),
        },
        "midi" => match &config.collectors.midi {
            Some(cfg) => Some(collect_midi::collect(ctx, cfg, limit)),
            None => skip(name),
        },
        "api" => match &config.collectors.api {
            Some(cfg) => Some(collect_api::collect(ctx, cfg, limit).await),
            None => skip(name),
        },
        _ => unreachable!("collector names are validated before dispatch"),
    }
}

fn skip(name: &str) -> Option<Vec<MusicChunk>> {
    info!("{name}: not configured, skipping");
    None
}

fn snapshot_name(collector: &str) -> &'static str {
    match collector {
        "web" => "web_pages.json",
        "pdf" => "pdf_documents.json",
        "tabs" => "tab_files.json",
        "midi" => "midi_scores.json",
        "api" => "chord_progressions.json",
        _ => unreachable!("collector names are validated before dispatch"),
    }
}

fn write_snapshot(dir: &Path, filename: &str, chunks: &[MusicChunk]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    let json = serde_json::to_string_pretty(chunks)?;
    std::fs::write(&path, json)?;
    info!("wrote {} ({} chunks)", path.display(), chunks.len());
    Ok(())
}

async fn store_corpus(config: &Config, corpus: &[MusicChunk]) -> UpsertReport {
    let index = match SqliteIndex::open(config).await {
        Ok(index) => index,
        Err(e) => {
            warn!("store unavailable: {e}");
            return UpsertReport::default();
        }
    };
    let report = store::upsert_batch(&index, corpus).await;
    index.close().await;
    report
}

fn print_summary(
    selector: &str,
    dry_run: bool,
    counts: &[(&str, usize)],
    corpus: &[MusicChunk],
    report: Option<UpsertReport>,
) {
    if dry_run {
        println!("sync {selector} (dry-run)");
    } else {
        println!("sync {selector}");
    }
    let total_tokens: usize = corpus.iter().map(|c| c.token_count).sum();
    println!("  total chunks: {}", corpus.len());
    println!("  total tokens: {total_tokens}");
    if !corpus.is_empty() {
        println!(
            "  avg tokens per chunk: {:.1}",
            total_tokens as f64 / corpus.len() as f64
        );
    }
    let mut by_source: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for chunk in corpus {
        *by_source.entry(chunk.source.as_str()).or_default() += 1;
        *by_type.entry(chunk.metadata.kind()).or_default() += 1;
    }
    if !by_source.is_empty() {
        println!("  by source:");
        for (source, count) in &by_source {
            println!("    {source}: {count}");
        }
    }
    if !by_type.is_empty() {
        println!("  by type:");
        for (kind, count) in &by_type {
            println!("    {kind}: {count}");
        }
    }
    if counts.len() > 1 {
        println!("  by collector:");
        for (name, count) in counts {
            println!("    {name}: {count}");
        }
    }
    if let Some(report) = report {
        println!("  stored: {}", report.written);
        println!("  failed batches: {}", report.failed_batches);
    }
    println!("ok");
}
