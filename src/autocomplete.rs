use std::collections::BTreeSet;

use crate::formats::{AutocompletePayload, IndexRecord};

/// Project verified records into the sorted host list the autocomplete UI
/// loads. Rebuilt from scratch every run; hosts that drop out of verification
/// simply disappear from the next payload.
pub fn project<'a>(
    records: impl IntoIterator<Item = &'a IndexRecord>,
    crawl_id: &str,
    generated_at: &str,
) -> AutocompletePayload {
    let hosts: BTreeSet<String> = records
        .into_iter()
        .map(|record| normalize_host(&record.host))
        .filter(|host| !host.is_empty())
        .collect();

    let hosts: Vec<String> = hosts.into_iter().collect();
    AutocompletePayload {
        crawl_id: crawl_id.to_owned(),
        generated_at: generated_at.to_owned(),
        total_hosts: hosts.len(),
        hosts,
    }
}

fn normalize_host(host: &str) -> String {
    let lower = host.trim().to_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_owned()
}
