//! Configuration fingerprints
//!
//! A fingerprint is the cache key of a project image. It covers every
//! configuration field that affects image contents plus the modification
//! time of the project config, so touching the file forces a rebuild.
//!
//! # Field order (v1)
//!
//! | # | Field |
//! |---|-------|
//! | 0 | version tag `tierbox-fingerprint-v1` |
//! | 1 | project name |
//! | 2 | agent |
//! | 3 | privileged (`true` / `false`) |
//! | 4 | package count, then each package in listed order |
//! | 5 | environment count, then each environment tag in listed order |
//! | 6 | config modification time, Unix seconds |
//!
//! Every field is NUL-terminated. Changing this order changes every
//! fingerprint and invalidates every cached project image, so any change
//! must bump the version tag.

use crate::config::EffectiveConfig;
use crate::error::TierboxError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Version tag hashed ahead of all fields
pub const FINGERPRINT_VERSION: &str = "tierbox-fingerprint-v1";

/// Number of hex characters kept from the digest
pub const FINGERPRINT_LEN: usize = 12;

/// Short content hash of the image-affecting configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a configuration
    pub fn compute(config: &EffectiveConfig, modified: DateTime<Utc>) -> Self {
        let mut hasher = FieldHasher::default();

        hasher.field(FINGERPRINT_VERSION);
        hasher.field(&config.project_name);
        hasher.field(&config.agent);
        hasher.field(if config.privileged { "true" } else { "false" });

        hasher.field(&config.packages.len().to_string());
        for package in &config.packages {
            hasher.field(package);
        }

        hasher.field(&config.envs.len().to_string());
        for env in &config.envs {
            hasher.field(env.name());
        }

        hasher.field(&modified.timestamp().to_string());

        let digest = hex::encode(hasher.finish());
        Self(digest[..FINGERPRINT_LEN].to_string())
    }

    /// Wrap an existing hex fingerprint (e.g. read back from state)
    pub fn from_hex(value: &str) -> Result<Self, TierboxError> {
        if value.len() == FINGERPRINT_LEN && value.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(value.to_ascii_lowercase()))
        } else {
            Err(TierboxError::Internal(format!(
                "malformed fingerprint '{}'",
                value
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct FieldHasher(Sha256);

impl FieldHasher {
    fn field(&mut self, value: &str) {
        self.0.update(value.as_bytes());
        self.0.update([0u8]);
    }

    fn finish(self) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}
