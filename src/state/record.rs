//! Persisted build-state record

use crate::error::{TierboxError, TierboxResult};
use crate::image::{Fingerprint, ImageReference};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last successful project image build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStateRecord {
    /// Image the build produced
    pub image_reference: ImageReference,

    /// Fingerprint the image was built from
    pub fingerprint: Fingerprint,

    /// When the build finished
    pub built_at: DateTime<Utc>,
}

impl BuildStateRecord {
    /// Record a build finishing now
    pub fn new(image_reference: ImageReference, fingerprint: Fingerprint) -> Self {
        Self {
            image_reference,
            fingerprint,
            built_at: Utc::now(),
        }
    }

    /// Parse a record, rejecting one that does not belong to `project`
    pub fn parse(project: &str, content: &str) -> TierboxResult<Self> {
        let record: Self = serde_json::from_str(content)?;

        let fingerprint = Fingerprint::from_hex(record.fingerprint.as_str())?;
        let expected = ImageReference::project_repository(project);
        if record.image_reference.repository != expected {
            return Err(TierboxError::Internal(format!(
                "record names {} instead of {}",
                record.image_reference.repository, expected
            )));
        }

        Ok(Self {
            fingerprint,
            ..record
        })
    }
}
