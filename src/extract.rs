use std::sync::{Arc, LazyLock};

use anyhow::Context as _;
use arrow::array::{Array, BooleanBuilder, RecordBatch};
use arrow::util::display::array_value_to_string;
use async_trait::async_trait;
use futures::TryStreamExt as _;
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::{ArrowPredicateFn, RowFilter};
use parquet::arrow::async_reader::{ParquetObjectReader, ParquetRecordBatchStreamBuilder};
use regex::Regex;
use url::Url;

use crate::error::HarvestError;
use crate::formats::{CandidateKind, CrawlCandidate};

/// Exact URL paths that mark a host as publishing llms.txt documentation.
pub const TARGET_PATHS: [(&str, CandidateKind); 4] = [
    ("/llms.txt", CandidateKind::Llms),
    ("/.well-known/llms.txt", CandidateKind::Llms),
    ("/llms-full.txt", CandidateKind::LlmsFull),
    ("/.well-known/llms-full.txt", CandidateKind::LlmsFull),
];

// Case-insensitive fallback for paths the literal table misses (e.g. odd
// casing recorded by the crawler).
static PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^/(?:\.well-known/)?llms(?:-full)?\.txt$").expect("target path pattern")
});

const COLUMNS: [&str; 7] = [
    "url",
    "url_path",
    "url_host_registered_domain",
    "fetch_status",
    "fetch_time",
    "content_mime_type",
    "content_mime_detected",
];

pub fn path_matches(path: &str) -> bool {
    TARGET_PATHS.iter().any(|(target, _)| *target == path) || PATH_PATTERN.is_match(path)
}

/// Regex-only matches fall back to `llms`.
pub fn kind_for_path(path: &str) -> CandidateKind {
    TARGET_PATHS
        .iter()
        .find(|(target, _)| *target == path)
        .map(|(_, kind)| *kind)
        .unwrap_or(CandidateKind::Llms)
}

/// Seam between the pipeline and the columnar engine, so the orchestration can
/// be exercised without remote crawl data.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, file_url: &str) -> Result<Vec<CrawlCandidate>, HarvestError>;
}

/// Scans remote parquet index files in place via HTTP range reads; only the
/// footer and the projected column pages are ever transferred.
#[derive(Debug, Default)]
pub struct ParquetExtractor;

impl ParquetExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for ParquetExtractor {
    async fn extract(&self, file_url: &str) -> Result<Vec<CrawlCandidate>, HarvestError> {
        scan_file(file_url)
            .await
            .map_err(|err| HarvestError::extraction(file_url, format!("{err:#}")))
    }
}

async fn scan_file(file_url: &str) -> anyhow::Result<Vec<CrawlCandidate>> {
    let (store, location) = open_store(file_url)?;

    let meta = store
        .head(&location)
        .await
        .context("stat columnar file")?;
    let reader = ParquetObjectReader::new(store, location).with_file_size(meta.size);

    let builder = ParquetRecordBatchStreamBuilder::new(reader)
        .await
        .context("read parquet footer")?;

    let projection = ProjectionMask::columns(builder.parquet_schema(), COLUMNS);
    let predicate_mask = ProjectionMask::columns(builder.parquet_schema(), ["url_path"]);
    let predicate = ArrowPredicateFn::new(predicate_mask, |batch: RecordBatch| {
        let column = batch.column_by_name("url_path").cloned();
        let mut matches = BooleanBuilder::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let matched = column
                .as_deref()
                .and_then(|array| cell_string(array, row))
                .is_some_and(|path| path_matches(&path));
            matches.append_value(matched);
        }
        Ok(matches.finish())
    });

    let stream = builder
        .with_projection(projection)
        .with_row_filter(RowFilter::new(vec![Box::new(predicate)]))
        .with_batch_size(8192)
        .build()
        .context("build parquet scan")?;

    let batches: Vec<RecordBatch> = stream
        .try_collect()
        .await
        .context("scan parquet row groups")?;

    let mut candidates = Vec::new();
    for batch in &batches {
        for row in 0..batch.num_rows() {
            if let Some(candidate) = candidate_from_row(batch, row) {
                candidates.push(candidate);
            }
        }
    }
    Ok(candidates)
}

fn candidate_from_row(batch: &RecordBatch, row: usize) -> Option<CrawlCandidate> {
    let url = column_string(batch, "url", row)?;
    let path = column_string(batch, "url_path", row)?;
    if !path_matches(&path) {
        return None;
    }

    // Failed fetches are crawl noise, not candidates.
    let fetch_status = column_i64(batch, "fetch_status", row);
    if fetch_status != Some(200) {
        return None;
    }

    let host = column_string(batch, "url_host_registered_domain", row)
        .or_else(|| Url::parse(&url).ok()?.host_str().map(str::to_owned))?;

    // Detected MIME beats the declared one when the crawler recorded both.
    let content_type = column_string(batch, "content_mime_detected", row)
        .or_else(|| column_string(batch, "content_mime_type", row));

    Some(CrawlCandidate {
        url,
        host,
        kind: kind_for_path(&path),
        path,
        fetch_status,
        fetch_time: column_string(batch, "fetch_time", row),
        content_type,
    })
}

fn column_string(batch: &RecordBatch, column: &str, row: usize) -> Option<String> {
    let array = batch.column_by_name(column)?;
    cell_string(array.as_ref(), row)
}

fn column_i64(batch: &RecordBatch, column: &str, row: usize) -> Option<i64> {
    column_string(batch, column, row)?.parse().ok()
}

fn cell_string(array: &dyn Array, row: usize) -> Option<String> {
    if array.is_null(row) {
        return None;
    }
    array_value_to_string(array, row)
        .ok()
        .filter(|value| !value.is_empty())
}

fn open_store(file_url: &str) -> anyhow::Result<(Arc<dyn ObjectStore>, ObjectPath)> {
    let parsed = Url::parse(file_url).with_context(|| format!("parse file url: {file_url}"))?;
    let location = ObjectPath::from(parsed.path().trim_start_matches('/'));

    match parsed.scheme() {
        "http" | "https" => {
            let authority = parsed
                .host_str()
                .map(|host| match parsed.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_owned(),
                })
                .ok_or_else(|| anyhow::anyhow!("file url must have host: {file_url}"))?;
            let base = format!("{}://{authority}", parsed.scheme());
            let store = object_store::http::HttpBuilder::new()
                .with_url(base)
                .with_client_options(object_store::ClientOptions::new().with_allow_http(true))
                .build()
                .context("build http object store")?;
            Ok((Arc::new(store), location))
        }
        "file" => Ok((Arc::new(object_store::local::LocalFileSystem::new()), location)),
        other => anyhow::bail!("unsupported columnar file scheme: {other}"),
    }
}
