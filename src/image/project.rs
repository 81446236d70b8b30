//! Project image tier
//!
//! Decides between reusing and rebuilding the project image:
//!
//! | Record | Fingerprint | Image | Action |
//! |--------|-------------|-------|--------|
//! | none / unreadable | - | - | build |
//! | present | matches | present | reuse |
//! | present | matches | missing | build |
//! | present | differs | - | remove old image, build |
//!
//! The record is rewritten only after a successful build, so a failed
//! build leaves the previous state in place and the next run retries.

use crate::cleanup::CleanupResult;
use crate::config::{EffectiveConfig, GlobalConfig};
use crate::error::{TierboxError, TierboxResult};
use crate::image::dockerfile::{project_dockerfile, write_build_context};
use crate::image::{
    BaseImageCache, BuildObserver, Fingerprint, ImageReference, SilentBuild, Tier,
};
use crate::orchestration::ContainerRuntime;
use crate::state::{BuildStateRecord, BuildStateStore, StateLock};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Why the project image was (or was not) built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Record matched and the image was present
    Reused,
    /// No usable build-state record
    Built,
    /// Record matched but the image had been removed externally
    Restored,
    /// Configuration changed; the previous image was superseded
    Rebuilt { previous: ImageReference },
}

impl CacheOutcome {
    pub fn was_cached(&self) -> bool {
        matches!(self, Self::Reused)
    }
}

/// Result of ensuring a project image
#[derive(Debug, Clone)]
pub struct ProjectImageResult {
    pub image: ImageReference,
    pub fingerprint: Fingerprint,
    pub outcome: CacheOutcome,
}

/// Reuses or rebuilds project images on top of their base tier
pub struct ProjectImageCache<'a> {
    runtime: &'a dyn ContainerRuntime,
    store: &'a dyn BuildStateStore,
    cache_root: PathBuf,
    observer: &'a dyn BuildObserver,
}

impl<'a> ProjectImageCache<'a> {
    /// `cache_root` holds `base-images/` and `builds/` build contexts
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        store: &'a dyn BuildStateStore,
        cache_root: PathBuf,
    ) -> Self {
        Self {
            runtime,
            store,
            cache_root,
            observer: &SilentBuild,
        }
    }

    /// Report build progress to `observer`
    pub fn with_observer(mut self, observer: &'a dyn BuildObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Build context directory of a project
    pub fn build_dir(&self, project_name: &str) -> PathBuf {
        self.cache_root.join("builds").join(project_name)
    }

    /// Ensure a valid project image exists for `config`.
    ///
    /// `modified` is the project config's modification time; it is part of
    /// the fingerprint so that touching the file forces a rebuild.
    pub async fn ensure_project_image(
        &self,
        config: &EffectiveConfig,
        global: &GlobalConfig,
        modified: DateTime<Utc>,
    ) -> TierboxResult<ProjectImageResult> {
        let project = config.project_name.as_str();
        if project.is_empty() {
            return Err(TierboxError::Internal(
                "project name must be set before image operations".to_string(),
            ));
        }

        let fingerprint = Fingerprint::compute(config, modified);
        let image = ImageReference::project(project, &fingerprint);
        debug!("Fingerprint for {}: {}", project, fingerprint);

        // Held until the new record is written. An unusable state store
        // counts as having no record: the image is built, never reused.
        let (_lock, recorded) = match self.store.lock(project).await {
            Ok(lock) => (lock, self.store.load(project).await),
            Err(e) => {
                warn!("Build state for {} unavailable: {}", project, e);
                (StateLock::unlocked(), None)
            }
        };

        let outcome = match recorded {
            Some(record) if record.fingerprint == fingerprint => {
                let recorded = record.image_reference.to_string();
                match self.runtime.image_exists(&recorded).await {
                    Ok(true) => {
                        info!("Using cached image {}", recorded);
                        return Ok(ProjectImageResult {
                            image: record.image_reference,
                            fingerprint,
                            outcome: CacheOutcome::Reused,
                        });
                    }
                    Ok(false) => {
                        info!("Cached image {} is gone, rebuilding", recorded);
                    }
                    Err(e) => {
                        warn!("Could not check image {}: {}; rebuilding", recorded, e);
                    }
                }
                CacheOutcome::Restored
            }
            Some(record) => {
                info!(
                    "Config changed ({} -> {}), replacing {}",
                    record.fingerprint, fingerprint, record.image_reference
                );
                let previous = record.image_reference;
                let stale = previous.to_string();
                // Stopped agent containers still pin the old image
                CleanupResult::from_result(
                    format!("remove containers using {}", stale),
                    self.runtime.remove_containers_using(&stale).await,
                )
                .log();
                CleanupResult::from_result(
                    format!("remove stale image {}", stale),
                    self.runtime.remove_image(&stale, false).await,
                )
                .log();
                CacheOutcome::Rebuilt { previous }
            }
            None => CacheOutcome::Built,
        };

        let base = BaseImageCache::new(self.runtime, self.cache_root.join("base-images"))
            .with_observer(self.observer)
            .ensure_base(config.primary_environment(), global)
            .await?;

        self.clear_leftovers(&image).await;

        let build_dir = self.build_dir(project);
        write_build_context(&build_dir, &project_dockerfile(&base.image, config, global)).await?;

        let tag = image.to_string();
        info!("Building project image {} (from {})", tag, base.image);
        self.observer.build_started(&image, Tier::Project);
        let on_output = |line: String| self.observer.build_output(line);
        let result = self.runtime.build_image(&build_dir, &tag, &on_output).await;
        self.observer.build_finished(&image, Tier::Project, result.is_ok());
        result?;

        let record = BuildStateRecord::new(image.clone(), fingerprint.clone());
        if let Err(e) = self.store.save(project, &record).await {
            // The image is usable; the next run rebuilds it.
            warn!("Image {} built but its state was not saved: {}", tag, e);
        }

        Ok(ProjectImageResult {
            image,
            fingerprint,
            outcome,
        })
    }

    /// Remove containers and an image already carrying the new tag, left
    /// behind by an interrupted earlier run
    async fn clear_leftovers(&self, image: &ImageReference) {
        let tag = image.to_string();

        CleanupResult::from_result(
            format!("remove containers using {}", tag),
            self.runtime.remove_containers_using(&tag).await,
        )
        .log();

        let leftover = match self.runtime.image_exists(&tag).await {
            Ok(true) => CleanupResult::from_result(
                format!("remove leftover image {}", tag),
                self.runtime.remove_image(&tag, true).await,
            ),
            Ok(false) => CleanupResult::skipped(format!("remove leftover image {}", tag)),
            Err(e) => CleanupResult::failed(format!("inspect leftover image {}", tag), e),
        };
        leftover.log();
    }
}
