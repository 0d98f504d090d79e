use std::path::Path;

use anyhow::Context as _;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;

use crate::error::HarvestError;

/// The fixed artifact set one run produces, uploaded as a unit.
pub const ARTIFACT_FILES: [&str; 5] = [
    "llms-index.sqlite",
    "llms-index.jsonl",
    "llms-index.meta.json",
    "llms-autocomplete.json",
    "latest.json",
];

#[derive(Debug, Clone, Default)]
pub struct PublishConfig {
    pub enabled: bool,
    pub prefix: String,
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl PublishConfig {
    fn require(value: &Option<String>, name: &'static str) -> Result<String, HarvestError> {
        match value.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value.to_owned()),
            _ => Err(HarvestError::PublishConfig(name)),
        }
    }

    fn validated(&self) -> Result<(String, String, String, String), HarvestError> {
        Ok((
            Self::require(&self.endpoint, "endpoint")?,
            Self::require(&self.bucket, "bucket")?,
            Self::require(&self.access_key_id, "access key id")?,
            Self::require(&self.secret_access_key, "secret access key")?,
        ))
    }
}

/// Upload the run's artifacts to a timestamp-versioned prefix (immutable
/// history) and to the `latest` prefix (overwritten pointer). A no-op unless
/// publishing was requested; any upload failure propagates so the two
/// prefixes never silently diverge.
pub async fn publish(
    cfg: &PublishConfig,
    out_dir: &Path,
    generated_at: &str,
) -> anyhow::Result<()> {
    if !cfg.enabled {
        tracing::debug!("publish not requested; skipping upload");
        return Ok(());
    }

    let (endpoint, bucket, access_key_id, secret_access_key) = cfg.validated()?;

    let credentials = aws_sdk_s3::config::Credentials::new(
        access_key_id,
        secret_access_key,
        None,
        None,
        "llms-harvest",
    );
    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .load()
        .await;
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .endpoint_url(&endpoint)
        .force_path_style(true)
        .build();
    let client = aws_sdk_s3::Client::from_conf(s3_config);

    let version_prefix = format!("{}/{generated_at}", cfg.prefix);
    let latest_prefix = format!("{}/latest", cfg.prefix);

    for file in ARTIFACT_FILES {
        let source = out_dir.join(file);
        let body = tokio::fs::read(&source)
            .await
            .with_context(|| format!("read artifact: {}", source.display()))?;

        for prefix in [&version_prefix, &latest_prefix] {
            let key = format!("{prefix}/{file}");
            client
                .put_object()
                .bucket(&bucket)
                .key(&key)
                .content_type(content_type_for(file))
                .body(ByteStream::from(body.clone()))
                .send()
                .await
                .with_context(|| format!("upload s3://{bucket}/{key}"))?;
        }
    }

    tracing::info!(%bucket, prefix = %version_prefix, "published artifacts");
    Ok(())
}

fn content_type_for(file: &str) -> &'static str {
    if file.ends_with(".json") {
        "application/json"
    } else if file.ends_with(".jsonl") {
        "application/x-ndjson"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_publish_is_a_no_op() {
        let cfg = PublishConfig::default();
        let dir = tempfile::tempdir().expect("tempdir");
        publish(&cfg, dir.path(), "2024-01-01T00:00:00Z")
            .await
            .expect("disabled publish must succeed");
    }

    #[tokio::test]
    async fn enabled_publish_without_credentials_fails_fast() {
        let cfg = PublishConfig {
            enabled: true,
            prefix: "llms-index".to_owned(),
            endpoint: Some("https://storage.example".to_owned()),
            bucket: Some("indexes".to_owned()),
            access_key_id: None,
            secret_access_key: None,
        };
        let dir = tempfile::tempdir().expect("tempdir");

        let err = publish(&cfg, dir.path(), "2024-01-01T00:00:00Z")
            .await
            .expect_err("missing credentials must fail");
        let harvest_err = err
            .downcast_ref::<HarvestError>()
            .expect("typed publish error");
        assert!(matches!(
            harvest_err,
            HarvestError::PublishConfig("access key id")
        ));
    }
}
