//! Image references
//!
//! Base images are keyed by environment only and shared by every project;
//! project images are keyed by project name and fingerprint.

use crate::error::TierboxError;
use crate::image::{Environment, Fingerprint};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Repository holding every base tier
pub const BASE_REPOSITORY: &str = "tierbox-base";

/// Tag of the base tier without language tooling
pub const NEUTRAL_BASE_TAG: &str = "core";

/// A `repository:tag` image reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageReference {
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Base tier for an environment (`None` selects the neutral tier)
    pub fn base(env: Option<Environment>) -> Self {
        let tag = env.map_or(NEUTRAL_BASE_TAG, |e| e.name());
        Self::new(BASE_REPOSITORY, tag)
    }

    /// Project image for a fingerprint
    pub fn project(project_name: &str, fingerprint: &Fingerprint) -> Self {
        Self::new(Self::project_repository(project_name), fingerprint.as_str())
    }

    /// Repository shared by all images of one project
    pub fn project_repository(project_name: &str) -> String {
        format!("tierbox/{}", project_name)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

impl FromStr for ImageReference {
    type Err = TierboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The tag separator is the last ':' not followed by a path segment,
        // so registry ports ("host:5000/repo:tag") stay in the repository.
        let (repository, tag) = s
            .rsplit_once(':')
            .filter(|(repo, tag)| !repo.is_empty() && !tag.is_empty() && !tag.contains('/'))
            .ok_or_else(|| TierboxError::ImageReference(s.to_string()))?;

        Ok(Self::new(repository, tag))
    }
}

impl TryFrom<String> for ImageReference {
    type Error = TierboxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImageReference> for String {
    fn from(value: ImageReference) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_references() {
        assert_eq!(
            ImageReference::base(Some(Environment::Python)).to_string(),
            "tierbox-base:python"
        );
        assert_eq!(ImageReference::base(None).to_string(), "tierbox-base:core");
    }

    #[test]
    fn project_reference() {
        let fp = Fingerprint::from_hex("a1b2c3d4e5f6").unwrap();
        let image = ImageReference::project("demo", &fp);
        assert_eq!(image.to_string(), "tierbox/demo:a1b2c3d4e5f6");
        assert_eq!(image.repository, ImageReference::project_repository("demo"));
    }

    #[test]
    fn parse_reference() {
        let image: ImageReference = "tierbox/demo:abc".parse().unwrap();
        assert_eq!(image, ImageReference::new("tierbox/demo", "abc"));

        let registry: ImageReference = "localhost:5000/tierbox/demo:abc".parse().unwrap();
        assert_eq!(registry.repository, "localhost:5000/tierbox/demo");
        assert_eq!(registry.tag, "abc");
    }

    #[test]
    fn parse_rejects_missing_tag() {
        assert!("tierbox/demo".parse::<ImageReference>().is_err());
        assert!("tierbox/demo:".parse::<ImageReference>().is_err());
        assert!(":abc".parse::<ImageReference>().is_err());
        assert!("localhost:5000/demo".parse::<ImageReference>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        let image = ImageReference::new("tierbox/demo", "abc");
        let json = serde_json::to_string(&image).unwrap();
        assert_eq!(json, "\"tierbox/demo:abc\"");
        let parsed: ImageReference = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, image);
    }
}
