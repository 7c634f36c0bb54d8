//! Runtime configuration for the enrichment pipeline.
//!
//! Every tunable the pipeline relies on lives here with its default; each can
//! be overridden through a `SIGNALFEED_*` environment variable at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed taxonomy supplied to the analysis model. Tags outside this list are
/// normalized but never rejected.
pub const DEFAULT_TAXONOMY: &[&str] = &[
    "AI/机器学习",
    "开发工具",
    "安全",
    "前端",
    "后端",
    "DevOps",
    "数据库",
    "云计算",
    "其他",
];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of characters of normalized text sent per analysis call.
    pub input_char_budget: usize,
    /// Minimum cleaned body length before the body is preferred over the summary.
    pub min_body_chars: usize,
    /// Cleaned body length at which an article counts as full text even
    /// without a feed-level hint.
    pub fulltext_threshold: usize,
    /// Maximum number of unprocessed items attempted per run.
    pub batch_size: usize,
    /// Minimum delay between consecutive analysis calls.
    pub call_delay: Duration,
    pub summary_max_chars: usize,
    pub list_item_max_chars: usize,
    pub max_tags: usize,
    pub max_key_points: usize,
    pub max_analysis: usize,
    pub taxonomy: Vec<String>,
    pub data_dir: PathBuf,
    pub site_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_char_budget: 7000,
            min_body_chars: 120,
            fulltext_threshold: 900,
            batch_size: 10,
            call_delay: Duration::from_secs(1),
            summary_max_chars: 220,
            list_item_max_chars: 120,
            max_tags: 2,
            max_key_points: 3,
            max_analysis: 3,
            taxonomy: DEFAULT_TAXONOMY.iter().map(|s| s.to_string()).collect(),
            data_dir: PathBuf::from("data"),
            site_dir: PathBuf::from("site"),
        }
    }
}

impl PipelineConfig {
    /// Builds the configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            input_char_budget: env_usize("SIGNALFEED_INPUT_BUDGET", defaults.input_char_budget),
            min_body_chars: env_usize("SIGNALFEED_MIN_BODY_CHARS", defaults.min_body_chars),
            fulltext_threshold: env_usize(
                "SIGNALFEED_FULLTEXT_THRESHOLD",
                defaults.fulltext_threshold,
            ),
            batch_size: env_usize("SIGNALFEED_BATCH_SIZE", defaults.batch_size),
            call_delay: Duration::from_secs(env_u64(
                "SIGNALFEED_CALL_DELAY_SECS",
                defaults.call_delay.as_secs(),
            )),
            summary_max_chars: env_usize("SIGNALFEED_SUMMARY_MAX", defaults.summary_max_chars),
            list_item_max_chars: env_usize("SIGNALFEED_ITEM_MAX", defaults.list_item_max_chars),
            max_tags: env_usize("SIGNALFEED_MAX_TAGS", defaults.max_tags),
            max_key_points: env_usize("SIGNALFEED_MAX_KEY_POINTS", defaults.max_key_points),
            max_analysis: env_usize("SIGNALFEED_MAX_ANALYSIS", defaults.max_analysis),
            taxonomy: {
                let tags = get_env_var_as_vec("SIGNALFEED_TAXONOMY", ';');
                if tags.is_empty() {
                    defaults.taxonomy
                } else {
                    tags
                }
            },
            data_dir: env::var("SIGNALFEED_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            site_dir: env::var("SIGNALFEED_SITE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.site_dir),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("processed.txt")
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.data_dir.join("corpus.json")
    }

    pub fn articles_path(&self) -> PathBuf {
        self.data_dir.join("articles.json")
    }

    pub fn site_path(&self) -> PathBuf {
        self.site_dir.join("index.html")
    }
}

/// Retrieves an environment variable and splits it into a vector of strings,
/// dropping empty segments.
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_usize(var: &str, default: usize) -> usize {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
