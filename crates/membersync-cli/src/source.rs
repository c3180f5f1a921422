//! JSON snapshot source adapter
//!
//! The authoritative source system is reached by operators out-of-band
//! (exports, scraping jobs); what lands here is a JSON file containing the
//! full snapshot as an array of `{member_code, secondary_key, payload}`
//! objects. This adapter is the CLI-facing `ISourceProvider`.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use membersync_core::domain::SourceRecord;
use membersync_core::ports::ISourceProvider;

/// Reads the full source snapshot from a JSON file
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Creates a source over the given snapshot file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl ISourceProvider for JsonFileSource {
    async fn fetch_snapshot(&self) -> anyhow::Result<Vec<SourceRecord>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read snapshot file {}", self.path.display()))?;

        let records: Vec<SourceRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot file {}", self.path.display()))?;

        info!(
            path = %self.path.display(),
            records = records.len(),
            "Loaded source snapshot"
        );

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_parses_snapshot_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"member_code": "M-1", "secondary_key": "a@example.com", "payload": {{"name": "Alice"}}}},
                {{"member_code": "M-2", "secondary_key": "b@example.com", "payload": {{"name": "Bob"}}}}
            ]"#
        )
        .unwrap();

        let source = JsonFileSource::new(file.path().to_path_buf());
        let records = source.fetch_snapshot().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].member_code.as_str(), "M-1");
        assert_eq!(records[1].payload["name"], "Bob");
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let source = JsonFileSource::new(PathBuf::from("/nonexistent/snapshot.json"));
        let err = source.fetch_snapshot().await.unwrap_err();
        assert!(err.to_string().contains("snapshot"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let source = JsonFileSource::new(file.path().to_path_buf());
        assert!(source.fetch_snapshot().await.is_err());
    }
}
