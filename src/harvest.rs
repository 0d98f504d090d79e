use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::cli::RunArgs;
use crate::dedup::{Deduplicator, normalize_url};
use crate::extract::{Extractor, ParquetExtractor};
use crate::formats::{CrawlStats, IndexRecord, LatestPointer, LiveResult, RunMetadata};
use crate::publish::{ARTIFACT_FILES, PublishConfig};
use crate::store::IndexStore;

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let extractor = ParquetExtractor::new();
    run_with(args, &extractor).await
}

/// Full pipeline: discovery, columnar scan, dedup, live verification, store
/// write, artifact generation, optional publish. The extractor is injected so
/// tests can drive the pipeline without remote crawl data.
pub async fn run_with(args: RunArgs, extractor: &dyn Extractor) -> anyhow::Result<()> {
    let started_at = chrono::Utc::now().to_rfc3339();

    let out_dir = PathBuf::from(&args.out);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(args.timeout_ms))
        .user_agent("llms-harvest/0.1")
        .build()
        .context("build http client")?;

    let crawl_ids = resolve_crawl_ids(&client, &args).await?;
    let active_crawl_id = crawl_ids
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no crawl collections resolved"))?;
    tracing::info!(crawl_ids = ?crawl_ids, "harvesting collections");

    // Scan shards sequentially; one bad file is counted, never fatal.
    let mut dedup = Deduplicator::new();
    let mut crawls = Vec::with_capacity(crawl_ids.len());
    let mut any_manifest_ok = false;
    for crawl_id in &crawl_ids {
        let mut stats = CrawlStats {
            crawl_id: crawl_id.clone(),
            files_scanned: 0,
            candidates: 0,
            errors: 0,
        };

        let all_paths =
            match crate::index_paths::fetch_index_paths(&client, &args.data_url, crawl_id).await {
                Ok(paths) => paths,
                Err(err) => {
                    tracing::warn!(%crawl_id, error = %err, "skipping collection");
                    stats.errors += 1;
                    crawls.push(stats);
                    continue;
                }
            };
        any_manifest_ok = true;

        let selected = crate::index_paths::select_files(&all_paths, args.max_files, args.strategy);
        tracing::info!(
            %crawl_id,
            total_files = all_paths.len(),
            selected = selected.len(),
            strategy = args.strategy.as_str(),
            "scanning index files"
        );

        for file_url in &selected {
            match extractor.extract(file_url).await {
                Ok(rows) => {
                    stats.files_scanned += 1;
                    for row in rows {
                        if dedup.insert(row) {
                            stats.candidates += 1;
                        }
                    }
                }
                Err(err) => {
                    stats.errors += 1;
                    tracing::warn!(%file_url, error = %err, "index file scan failed");
                }
            }
        }

        tracing::info!(
            %crawl_id,
            files = stats.files_scanned,
            candidates = stats.candidates,
            errors = stats.errors,
            "collection scanned"
        );
        crawls.push(stats);
    }

    if !any_manifest_ok {
        anyhow::bail!("index manifest failed for every configured collection");
    }

    let candidates = dedup.into_candidates();
    let total_candidates = candidates.len();

    let mut verify_targets: Vec<String> =
        candidates.iter().map(|entry| entry.url.clone()).collect();
    if args.verify_limit > 0 {
        verify_targets.truncate(args.verify_limit);
    }
    tracing::info!(
        targets = verify_targets.len(),
        concurrency = args.verify_concurrency,
        "live-verifying candidates"
    );
    let live_results = crate::verify::verify_urls(
        &client,
        verify_targets,
        Duration::from_millis(args.timeout_ms),
        args.verify_concurrency,
    )
    .await;
    let live_by_url: HashMap<String, &LiveResult> = live_results
        .iter()
        .map(|result| (normalize_url(&result.url), result))
        .collect();

    let now = chrono::Utc::now().to_rfc3339();
    let mut records = Vec::new();
    for candidate in candidates {
        let live = live_by_url.get(&normalize_url(&candidate.url)).copied();
        if live.is_none() && !args.persist_unverified {
            continue;
        }
        records.push(IndexRecord {
            url: candidate.url,
            host: candidate.host,
            path: candidate.path,
            kind: candidate.kind,
            source: "commoncrawl".to_owned(),
            crawl_id: active_crawl_id.clone(),
            fetch_status: candidate.fetch_status,
            fetch_time: candidate.fetch_time,
            content_type: candidate.content_type,
            live_status: live.map(|result| i64::from(result.status)),
            live_checked_at: live.map(|result| result.checked_at.clone()),
            created_at: now.clone(),
            updated_at: now.clone(),
        });
    }

    let db_path = out_dir.join("llms-index.sqlite");
    let mut store = IndexStore::open(&db_path).context("open index store")?;
    store.upsert_all(&records).context("write index records")?;
    // The store may carry rows from earlier runs; the metadata reports only
    // what this run wrote.
    let persisted_records = records.len();
    let indexed_total = store.count().context("count index records")?;
    store.save().context("save index store")?;

    write_jsonl(&out_dir.join("llms-index.jsonl"), &records).context("write jsonl mirror")?;

    let generated_at = chrono::Utc::now().to_rfc3339();
    let payload = crate::autocomplete::project(
        records.iter().filter(|record| record.live_status.is_some()),
        &active_crawl_id,
        &generated_at,
    );
    write_json(&out_dir.join("llms-autocomplete.json"), &payload)
        .context("write autocomplete payload")?;

    let finished_at = chrono::Utc::now().to_rfc3339();
    let metadata = RunMetadata {
        crawl_ids,
        crawls,
        total_candidates,
        live_verified: live_results.len(),
        persisted_records,
        started_at,
        finished_at,
        max_files: args.max_files,
        strategy: args.strategy.as_str().to_owned(),
        verify_limit: args.verify_limit,
        persist_unverified: args.persist_unverified,
    };
    write_json(&out_dir.join("llms-index.meta.json"), &metadata).context("write run metadata")?;

    let pointer = LatestPointer {
        crawl_id: active_crawl_id,
        generated_at: generated_at.clone(),
        files: ARTIFACT_FILES
            .iter()
            .filter(|file| **file != "latest.json")
            .map(|file| (*file).to_owned())
            .collect(),
        prefix: args.publish_prefix.clone(),
    };
    write_json(&out_dir.join("latest.json"), &pointer).context("write latest pointer")?;

    let publish_cfg = PublishConfig {
        enabled: args.publish,
        prefix: args.publish_prefix.clone(),
        endpoint: args.s3_endpoint.clone(),
        bucket: args.s3_bucket.clone(),
        access_key_id: args.s3_access_key_id.clone(),
        secret_access_key: args.s3_secret_access_key.clone(),
    };
    crate::publish::publish(&publish_cfg, &out_dir, &generated_at)
        .await
        .context("publish artifacts")?;

    tracing::info!(
        candidates = total_candidates,
        live_verified = live_results.len(),
        persisted = persisted_records,
        indexed = indexed_total,
        out = %out_dir.display(),
        "harvest complete"
    );
    Ok(())
}

async fn resolve_crawl_ids(
    client: &reqwest::Client,
    args: &RunArgs,
) -> anyhow::Result<Vec<String>> {
    let explicit = args.crawl_id.as_deref();
    let explicit_list = args.crawl_ids.as_deref();

    // Only hit the catalog when no explicit override is configured.
    let needs_catalog = crate::collections::resolve_crawl_ids(explicit, explicit_list, &[])
        .is_empty();
    let recent = if needs_catalog {
        crate::collections::recent_collections(client, &args.catalog_url, args.recent)
            .await
            .context("discover collections")?
    } else {
        Vec::new()
    };

    Ok(crate::collections::resolve_crawl_ids(
        explicit,
        explicit_list,
        &recent,
    ))
}

fn write_jsonl(path: &Path, records: &[IndexRecord]) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("create jsonl: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut out, record).context("serialize index record")?;
        out.write_all(b"\n").context("write jsonl newline")?;
    }
    out.flush().context("flush jsonl")?;
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json =
        serde_json::to_string_pretty(value).context("serialize artifact json")?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
