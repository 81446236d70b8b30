//! Build-state persistence
//!
//! One record per project remembers which image was last built and from
//! which fingerprint. Records are written only after a successful build.

mod record;
mod store;

pub use record::BuildStateRecord;
pub use store::{FileStateStore, StateLock};

use crate::cleanup::CleanupResult;
use crate::error::TierboxResult;
use async_trait::async_trait;

/// Storage for build-state records
#[async_trait]
pub trait BuildStateStore: Send + Sync {
    /// Load the record of a project.
    ///
    /// Missing and unreadable records are both `None`; the caller rebuilds.
    async fn load(&self, project: &str) -> Option<BuildStateRecord>;

    /// Replace the record of a project atomically
    async fn save(&self, project: &str, record: &BuildStateRecord) -> TierboxResult<()>;

    /// Delete the record of a project
    async fn remove(&self, project: &str) -> CleanupResult;

    /// Serialize build decisions for one project across processes.
    ///
    /// The lock is released when the returned guard is dropped.
    async fn lock(&self, project: &str) -> TierboxResult<StateLock>;
}
