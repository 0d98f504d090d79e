use std::collections::HashSet;

use url::Url;

use crate::formats::CrawlCandidate;

/// Normalize a URL into its dedup key: host lowercased, trailing slashes
/// stripped, query kept, scheme dropped. Malformed input falls back to a
/// lexical normalization instead of failing; the same string always comes
/// back out when fed its own output.
pub fn normalize_url(value: &str) -> String {
    let trimmed = value.trim();

    if let Ok(parsed) = Url::parse(trimmed) {
        if parsed.has_host() {
            let mut path = parsed.path().to_owned();
            while path.len() > 1 && path.ends_with('/') {
                path.pop();
            }
            if path == "/" {
                path.clear();
            }

            let mut out = parsed.host_str().unwrap_or_default().to_owned();
            if let Some(port) = parsed.port() {
                out.push_str(&format!(":{port}"));
            }
            out.push_str(&path);
            if let Some(query) = parsed.query() {
                out.push('?');
                out.push_str(query);
            }
            return out.to_lowercase();
        }
    }

    lexical_normalize(trimmed)
}

fn lexical_normalize(value: &str) -> String {
    let lower = value.to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);

    let mut out = without_scheme.to_owned();
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// First-occurrence-wins candidate set. Common Crawl can surface the same URL
/// from multiple segments; later duplicates are dropped wholesale, metadata
/// included.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    candidates: Vec<CrawlCandidate>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the candidate was new.
    pub fn insert(&mut self, candidate: CrawlCandidate) -> bool {
        let key = normalize_url(&candidate.url);
        if self.seen.insert(key) {
            self.candidates.push(candidate);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_candidates(self) -> Vec<CrawlCandidate> {
        self.candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::CandidateKind;

    fn candidate(url: &str, fetch_time: &str) -> CrawlCandidate {
        CrawlCandidate {
            url: url.to_owned(),
            host: "example.com".to_owned(),
            path: "/llms.txt".to_owned(),
            kind: CandidateKind::Llms,
            fetch_status: Some(200),
            fetch_time: Some(fetch_time.to_owned()),
            content_type: Some("text/plain".to_owned()),
        }
    }

    #[test]
    fn normalize_collapses_equivalent_urls() {
        assert_eq!(
            normalize_url("https://Example.COM/llms.txt/"),
            normalize_url("http://example.com/llms.txt")
        );
        assert_eq!(
            normalize_url("https://example.com/llms.txt?v=1"),
            "example.com/llms.txt?v=1"
        );
        assert_eq!(normalize_url("https://example.com/"), "example.com");
        assert_eq!(
            normalize_url("https://example.com:8080/x"),
            "example.com:8080/x"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "https://Example.com/LLMS.txt/",
            "example.com/llms.txt",
            "not a url at all",
            "://///",
            "",
            "   https://a.b/c/?q=1  ",
            "ftp://weird/llms.txt",
        ];
        for input in inputs {
            let once = normalize_url(input);
            assert_eq!(normalize_url(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn normalize_tolerates_malformed_input() {
        assert_eq!(normalize_url("HTTP://%%%/"), lexical_normalize("HTTP://%%%/"));
        assert_eq!(normalize_url("  spaced out  "), "spaced out");
    }

    #[test]
    fn first_occurrence_wins_across_shards() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.insert(candidate("https://example.com/llms.txt", "2024-01-01")));
        assert!(!dedup.insert(candidate("https://EXAMPLE.com/llms.txt/", "2024-02-02")));

        let candidates = dedup.into_candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].fetch_time.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn distinct_urls_are_kept() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.insert(candidate("https://a.example/llms.txt", "t")));
        assert!(dedup.insert(candidate("https://b.example/llms.txt", "t")));
        assert_eq!(dedup.len(), 2);
    }
}
