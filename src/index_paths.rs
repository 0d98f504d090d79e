use std::io::Read as _;

use crate::cli::SelectStrategy;
use crate::error::HarvestError;

pub const DEFAULT_DATA_BASE_URL: &str = "https://data.commoncrawl.org";

/// Fetch the gzip-compressed manifest of columnar index files for one
/// collection and return fully-qualified URLs.
pub async fn fetch_index_paths(
    client: &reqwest::Client,
    data_base_url: &str,
    crawl_id: &str,
) -> Result<Vec<String>, HarvestError> {
    let list_url = format!("{data_base_url}/crawl-data/{crawl_id}/cc-index-table.paths.gz");

    let response = client
        .get(&list_url)
        .send()
        .await
        .map_err(|err| HarvestError::manifest(crawl_id, format!("GET {list_url}: {err}")))?;

    if !response.status().is_success() {
        return Err(HarvestError::manifest(
            crawl_id,
            format!("GET {list_url}: HTTP {}", response.status().as_u16()),
        ));
    }

    let body = response
        .bytes()
        .await
        .map_err(|err| HarvestError::manifest(crawl_id, format!("read manifest body: {err}")))?;

    decode_manifest(&body, data_base_url)
        .map_err(|err| HarvestError::manifest(crawl_id, err.to_string()))
}

fn decode_manifest(body: &[u8], data_base_url: &str) -> anyhow::Result<Vec<String>> {
    let mut decoder = flate2::read::GzDecoder::new(body);
    let mut content = String::new();
    decoder
        .read_to_string(&mut content)
        .map_err(|err| anyhow::anyhow!("gunzip manifest: {err}"))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("{data_base_url}/{line}"))
        .collect())
}

/// Pick a bounded subset of index files. `first` takes a prefix sample;
/// `spread` picks indices evenly across the whole manifest so hosts clustered
/// late in the crawl are still represented. Index collisions on small
/// manifests mean `spread` may return fewer than `max_files` entries.
pub fn select_files(
    all_paths: &[String],
    max_files: usize,
    strategy: SelectStrategy,
) -> Vec<String> {
    if max_files == 0 || max_files >= all_paths.len() {
        return all_paths.to_vec();
    }

    match strategy {
        SelectStrategy::First => all_paths[..max_files].to_vec(),
        SelectStrategy::Spread => {
            let last_index = all_paths.len() - 1;
            let mut seen = std::collections::HashSet::new();
            let mut picked = Vec::with_capacity(max_files);
            for i in 0..max_files {
                let index = if max_files == 1 {
                    0
                } else {
                    let ratio = i as f64 / (max_files - 1) as f64;
                    (ratio * last_index as f64).floor() as usize
                };
                if seen.insert(index) {
                    picked.push(all_paths[index].clone());
                }
            }
            picked
        }
    }
}
