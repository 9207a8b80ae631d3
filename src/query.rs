//! `query` command: rank stored chunks against a text query and print them.

use anyhow::Result;

use crate::config::Config;
use crate::store::{SqliteIndex, VectorIndex};

const DEFAULT_LIMIT: usize = 5;
const EXCERPT_CHARS: usize = 120;

pub async fn run_query(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let index = SqliteIndex::open(config).await?;
    let hits = index.query(query, limit.unwrap_or(DEFAULT_LIMIT)).await?;

    if hits.is_empty() {
        println!("No results.");
        index.close().await;
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let title = if hit.title.is_empty() {
            "(untitled)"
        } else {
            hit.title.as_str()
        };
        println!("{}. [{:.3}] {} / {}", i + 1, hit.score, hit.source, title);
        println!("    excerpt: \"{}\"", excerpt(&hit.document, EXCERPT_CHARS));
        println!("    id: {}", hit.chunk_id);
        println!();
    }

    index.close().await;
    Ok(())
}

/// Single-line preview of a chunk body, cut on a char boundary.
fn excerpt(document: &str, max_chars: usize) -> String {
    let flat = document.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_documents_pass_through() {
        assert_eq!(excerpt("open chords", 120), "open chords");
    }

    #[test]
    fn newlines_flatten_to_spaces() {
        assert_eq!(excerpt("E|---0---|\nB|---1---|", 120), "E|---0---| B|---1---|");
    }

    #[test]
    fn long_documents_truncate_with_ellipsis() {
        let long = "note ".repeat(100);
        let cut = excerpt(&long, 20);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= 23);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(50);
        let cut = excerpt(&text, 10);
        assert_eq!(cut, format!("{}...", "é".repeat(10)));
    }
}
