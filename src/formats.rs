use serde::{Deserialize, Serialize};

/// One entry of the Common Crawl collection catalog, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateKind {
    Llms,
    LlmsFull,
}

impl CandidateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateKind::Llms => "llms",
            CandidateKind::LlmsFull => "llms-full",
        }
    }
}

/// One matched URL from a columnar scan. Immutable once extracted; superseded
/// only by re-running the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlCandidate {
    pub url: String,
    pub host: String,
    pub path: String,
    pub kind: CandidateKind,
    pub fetch_status: Option<i64>,
    pub fetch_time: Option<String>,
    pub content_type: Option<String>,
}

/// Outcome of a successful live re-probe. Probes that fail, time out, or
/// return HTML produce no result at all.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveResult {
    pub url: String,
    pub status: u16,
    pub checked_at: String,
}

/// Persisted view of a candidate merged with its optional live result and
/// crawl provenance. Serialized camelCase so the JSONL mirror matches what the
/// web consumers read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    pub url: String,
    pub host: String,
    pub path: String,
    pub kind: CandidateKind,
    pub source: String,
    pub crawl_id: String,
    pub fetch_status: Option<i64>,
    pub fetch_time: Option<String>,
    pub content_type: Option<String>,
    pub live_status: Option<i64>,
    pub live_checked_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Host-list artifact powering autocomplete in the consuming UI. Regenerated
/// wholesale every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutocompletePayload {
    pub crawl_id: String,
    pub generated_at: String,
    pub total_hosts: usize,
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    pub crawl_id: String,
    pub files_scanned: usize,
    pub candidates: usize,
    pub errors: usize,
}

/// Write-once summary of one pipeline execution, for observability only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub crawl_ids: Vec<String>,
    pub crawls: Vec<CrawlStats>,
    pub total_candidates: usize,
    pub live_verified: usize,
    pub persisted_records: usize,
    pub started_at: String,
    pub finished_at: String,
    pub max_files: usize,
    pub strategy: String,
    pub verify_limit: usize,
    pub persist_unverified: bool,
}

/// Pointer manifest uploaded next to the artifacts so consumers can find the
/// current file set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPointer {
    pub crawl_id: String,
    pub generated_at: String,
    pub files: Vec<String>,
    pub prefix: String,
}
