use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub collectors: CollectorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/riffbank.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data/snapshots")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_request_delay_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    // Tab archives refuse the default library agent
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0 Safari/537.36"
        .to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CollectorsConfig {
    pub web: Option<WebCollectorConfig>,
    pub pdf: Option<PdfCollectorConfig>,
    pub tabs: Option<TabsCollectorConfig>,
    pub midi: Option<MidiCollectorConfig>,
    pub api: Option<ApiCollectorConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebCollectorConfig {
    pub seed_urls: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PdfCollectorConfig {
    pub documents: Vec<PdfSource>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PdfSource {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TabsCollectorConfig {
    pub dir: PathBuf,
    #[serde(default = "default_tab_globs")]
    pub include_globs: Vec<String>,
}

fn default_tab_globs() -> Vec<String> {
    vec!["**/*.txt".to_string(), "**/*.json".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct MidiCollectorConfig {
    pub dir: PathBuf,
    #[serde(default = "default_score_globs")]
    pub include_globs: Vec<String>,
}

fn default_score_globs() -> Vec<String> {
    vec!["**/*.json".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiCollectorConfig {
    #[serde(default = "default_progressions")]
    pub progressions: Vec<String>,
}

fn default_progressions() -> Vec<String> {
    ["1,5,6,4", "1,6,4,5", "6,4,1,5", "2,5,1", "1,4,5,1"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }

    // Validate fetching
    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }

    // Validate collectors
    if let Some(web) = &config.collectors.web {
        if web.seed_urls.is_empty() {
            anyhow::bail!("collectors.web.seed_urls must not be empty");
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load_from_str(raw: &str) -> Result<Config> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(raw.as_bytes()).unwrap();
        load_config(file.path())
    }

    #[test]
    fn empty_config_gets_all_defaults() {
        let config = load_from_str("").unwrap();
        assert_eq!(config.chunking.chunk_size, 300);
        assert_eq!(config.fetch.request_delay_ms, 1000);
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.store.path, PathBuf::from("./data/riffbank.db"));
        assert!(config.collectors.web.is_none());
        assert!(config.collectors.api.is_none());
    }

    #[test]
    fn api_section_defaults_to_the_common_progressions() {
        let config = load_from_str("[collectors.api]\n").unwrap();
        let api = config.collectors.api.unwrap();
        assert_eq!(api.progressions.len(), 5);
        assert_eq!(api.progressions[0], "1,5,6,4");
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = load_from_str("[chunking]\nchunk_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn empty_seed_urls_are_rejected() {
        let err = load_from_str("[collectors.web]\nseed_urls = []\n").unwrap_err();
        assert!(err.to_string().contains("seed_urls"));
    }
}
