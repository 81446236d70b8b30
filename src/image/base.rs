//! Base image tier
//!
//! One base image per environment, shared by every project that lists the
//! environment first. Base images are append-only: an existing image is
//! reused without any staleness check.

use crate::config::GlobalConfig;
use crate::error::TierboxResult;
use crate::image::dockerfile::{base_dockerfile, write_build_context};
use crate::image::{BuildObserver, Environment, ImageReference, SilentBuild, Tier};
use crate::orchestration::ContainerRuntime;
use std::path::PathBuf;
use tracing::{debug, info};

/// Result of ensuring a base image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseImageResult {
    pub image: ImageReference,

    /// Whether the image already existed (no build needed)
    pub was_cached: bool,
}

/// Builds base images on first request and reuses them afterwards
pub struct BaseImageCache<'a> {
    runtime: &'a dyn ContainerRuntime,
    build_root: PathBuf,
    observer: &'a dyn BuildObserver,
}

impl<'a> BaseImageCache<'a> {
    /// `build_root` receives one build context directory per base tier
    pub fn new(runtime: &'a dyn ContainerRuntime, build_root: PathBuf) -> Self {
        Self {
            runtime,
            build_root,
            observer: &SilentBuild,
        }
    }

    /// Report build progress to `observer`
    pub fn with_observer(mut self, observer: &'a dyn BuildObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Ensure the base image for `env` exists, building it if absent.
    ///
    /// `None` selects the neutral tier without language tooling. A build
    /// failure is fatal.
    pub async fn ensure_base(
        &self,
        env: Option<Environment>,
        global: &GlobalConfig,
    ) -> TierboxResult<BaseImageResult> {
        let image = ImageReference::base(env);
        let tag = image.to_string();

        if self.runtime.image_exists(&tag).await? {
            debug!("Base image already present: {}", tag);
            return Ok(BaseImageResult {
                image,
                was_cached: true,
            });
        }

        info!("Building base image {}", tag);
        let build_dir = self.build_root.join(&image.tag);
        write_build_context(&build_dir, &base_dockerfile(env, global)).await?;

        self.observer.build_started(&image, Tier::Base);
        let on_output = |line: String| self.observer.build_output(line);
        let result = self.runtime.build_image(&build_dir, &tag, &on_output).await;
        self.observer.build_finished(&image, Tier::Base, result.is_ok());
        result?;

        Ok(BaseImageResult {
            image,
            was_cached: false,
        })
    }
}
