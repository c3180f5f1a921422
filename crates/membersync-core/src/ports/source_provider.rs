//! Source provider port (driven/secondary port)
//!
//! The authoritative source system is an external collaborator: scrapers,
//! exports, or files that yield raw member records on demand. The engine
//! only depends on this narrow interface.

use crate::domain::SourceRecord;

/// Port trait for obtaining the full current source snapshot.
///
/// Invoked once per reconciliation run. A failure here is fatal to the
/// run: without a complete snapshot neither the diff nor the orphan sweep
/// is meaningful.
#[async_trait::async_trait]
pub trait ISourceProvider: Send + Sync {
    /// Fetches the complete current snapshot of member records
    async fn fetch_snapshot(&self) -> anyhow::Result<Vec<SourceRecord>>;
}
