use anyhow::Context as _;

use crate::cli::CollectionsArgs;
use crate::error::HarvestError;
use crate::formats::CollectionInfo;

pub const DEFAULT_CATALOG_URL: &str = "https://index.commoncrawl.org/collinfo.json";

/// Fetch the collection catalog and return the `limit` most recent entries.
/// The catalog is chronologically ordered, newest first.
pub async fn recent_collections(
    client: &reqwest::Client,
    catalog_url: &str,
    limit: usize,
) -> Result<Vec<CollectionInfo>, HarvestError> {
    let response = client
        .get(catalog_url)
        .send()
        .await
        .map_err(|err| HarvestError::Discovery(format!("GET {catalog_url}: {err}")))?;

    if !response.status().is_success() {
        return Err(HarvestError::Discovery(format!(
            "GET {catalog_url}: HTTP {}",
            response.status().as_u16()
        )));
    }

    let collections: Vec<CollectionInfo> = response
        .json()
        .await
        .map_err(|err| HarvestError::Discovery(format!("decode collection catalog: {err}")))?;

    match collections.first() {
        Some(first) if !first.id.is_empty() => {}
        _ => {
            return Err(HarvestError::Discovery(
                "collection catalog is empty or malformed".to_owned(),
            ));
        }
    }

    Ok(collections.into_iter().take(limit.max(1)).collect())
}

pub async fn latest_collection(
    client: &reqwest::Client,
    catalog_url: &str,
) -> Result<CollectionInfo, HarvestError> {
    let mut collections = recent_collections(client, catalog_url, 1).await?;
    Ok(collections.remove(0))
}

/// Resolve the crawl ids to harvest. An explicit single id wins, then an
/// explicit comma-separated list, then the recent catalog entries. The first
/// id of the result tags all output artifacts.
pub fn resolve_crawl_ids(
    explicit: Option<&str>,
    explicit_list: Option<&str>,
    recent: &[CollectionInfo],
) -> Vec<String> {
    if let Some(id) = explicit {
        let id = id.trim();
        if !id.is_empty() {
            return vec![id.to_owned()];
        }
    }

    if let Some(list) = explicit_list {
        let ids: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .collect();
        if !ids.is_empty() {
            return ids;
        }
    }

    recent.iter().map(|info| info.id.clone()).collect()
}

pub async fn run(args: CollectionsArgs) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("build http client")?;

    let collections = recent_collections(&client, &args.catalog_url, args.limit).await?;
    for info in &collections {
        println!("{}\t{}", info.id, info.name);
    }

    Ok(())
}
