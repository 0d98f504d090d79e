use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Harvest llms.txt candidates from Common Crawl and write index artifacts.
    Run(RunArgs),
    /// List recent Common Crawl collections.
    Collections(CollectionsArgs),
}

/// How to pick index files when a collection has more than `--max-files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectStrategy {
    /// First N files in manifest order (biased toward one portion of the crawl).
    First,
    /// N indices spread evenly across the manifest, including both ends.
    Spread,
}

impl SelectStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectStrategy::First => "first",
            SelectStrategy::Spread => "spread",
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Output directory for index artifacts.
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    pub out: String,

    /// Explicit crawl collection id (skips catalog discovery).
    #[arg(long, env = "CC_CRAWL_ID")]
    pub crawl_id: Option<String>,

    /// Comma-separated crawl collection ids.
    #[arg(long, env = "CC_CRAWL_IDS", conflicts_with = "crawl_id")]
    pub crawl_ids: Option<String>,

    /// Number of most recent collections to harvest when no id is given.
    #[arg(long, env = "CC_RECENT", default_value_t = 1)]
    pub recent: usize,

    /// Maximum columnar index files to scan per collection (0 = all).
    #[arg(long, env = "MAX_FILES", default_value_t = 5)]
    pub max_files: usize,

    /// File sampling strategy.
    #[arg(long, env = "FILE_STRATEGY", value_enum, default_value_t = SelectStrategy::Spread)]
    pub strategy: SelectStrategy,

    /// Maximum candidates to live-verify (0 = unlimited).
    #[arg(long, env = "VERIFY_LIMIT", default_value_t = 200)]
    pub verify_limit: usize,

    /// Concurrent live-verification probes.
    #[arg(long, env = "VERIFY_CONCURRENCY", default_value_t = 12)]
    pub verify_concurrency: usize,

    /// Per-request timeout in milliseconds.
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Also persist candidates that did not pass live verification.
    #[arg(long, env = "PERSIST_UNVERIFIED")]
    pub persist_unverified: bool,

    /// Upload artifacts to object storage after the run.
    #[arg(long, env = "PUBLISH_ENABLED")]
    pub publish: bool,

    /// Object-storage key prefix for published artifacts.
    #[arg(long, env = "PUBLISH_PREFIX", default_value = "llms-index")]
    pub publish_prefix: String,

    /// S3-compatible endpoint URL.
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Bucket for published artifacts.
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Access key id for the object-storage endpoint.
    #[arg(long, env = "S3_ACCESS_KEY_ID")]
    pub s3_access_key_id: Option<String>,

    /// Secret access key for the object-storage endpoint.
    #[arg(long, env = "S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub s3_secret_access_key: Option<String>,

    /// Collection catalog endpoint.
    #[arg(long, env = "CC_CATALOG_URL", default_value = crate::collections::DEFAULT_CATALOG_URL)]
    pub catalog_url: String,

    /// Base URL for crawl data files.
    #[arg(long, env = "CC_DATA_URL", default_value = crate::index_paths::DEFAULT_DATA_BASE_URL)]
    pub data_url: String,
}

#[derive(Debug, Args)]
pub struct CollectionsArgs {
    /// Number of collections to list.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Collection catalog endpoint.
    #[arg(long, env = "CC_CATALOG_URL", default_value = crate::collections::DEFAULT_CATALOG_URL)]
    pub catalog_url: String,
}
