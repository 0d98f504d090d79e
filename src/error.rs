use thiserror::Error;

/// Failures the pipeline discriminates on: per-item errors are counted at the
/// narrowest scope by the caller, per-run errors propagate to the process
/// boundary.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("collection discovery: {0}")]
    Discovery(String),

    #[error("index manifest for {crawl_id}: {reason}")]
    Manifest { crawl_id: String, reason: String },

    #[error("columnar scan of {file_url}: {reason}")]
    Extraction { file_url: String, reason: String },

    #[error("index store {path}: {reason}")]
    Store { path: String, reason: String },

    #[error("publish requested but {0} is not configured")]
    PublishConfig(&'static str),
}

impl HarvestError {
    pub fn manifest(crawl_id: &str, reason: impl Into<String>) -> Self {
        Self::Manifest {
            crawl_id: crawl_id.to_owned(),
            reason: reason.into(),
        }
    }

    pub fn extraction(file_url: &str, reason: impl Into<String>) -> Self {
        Self::Extraction {
            file_url: file_url.to_owned(),
            reason: reason.into(),
        }
    }

    pub fn store(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Store {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
