//! Two-tier image cache
//!
//! Images are built in two tiers:
//!
//! | Tier | Reference | Invalidation |
//! |------|-----------|--------------|
//! | Base | `tierbox-base:<env>` | never (removed only by `tierbox clean --base`) |
//! | Project | `tierbox/<project>:<fingerprint>` | whenever the fingerprint changes |
//!
//! The project tier is tracked by a persisted build-state record, which is
//! the only authority on whether the tagged image is still valid.

pub mod base;
pub mod dockerfile;
pub mod environment;
pub mod fingerprint;
pub mod project;
pub mod reference;

pub use base::{BaseImageCache, BaseImageResult};
pub use environment::Environment;
pub use fingerprint::Fingerprint;
pub use project::{CacheOutcome, ProjectImageCache, ProjectImageResult};
pub use reference::ImageReference;

use std::fmt;

/// Which tier an image belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Base,
    Project,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// Receives progress from image builds
pub trait BuildObserver: Send + Sync {
    /// A build is about to start
    fn build_started(&self, image: &ImageReference, tier: Tier);

    /// One line of build output
    fn build_output(&self, line: String);

    /// The build finished
    fn build_finished(&self, image: &ImageReference, tier: Tier, success: bool);
}

/// Observer that discards all build progress
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBuild;

impl BuildObserver for SilentBuild {
    fn build_started(&self, _image: &ImageReference, _tier: Tier) {}

    fn build_output(&self, _line: String) {}

    fn build_finished(&self, _image: &ImageReference, _tier: Tier, _success: bool) {}
}
