//! Clean command - remove this project's images, build context and state

use crate::cleanup::CleanupResult;
use crate::cli::args::CleanArgs;
use crate::config::{ConfigManager, GlobalConfig};
use crate::error::{TierboxError, TierboxResult};
use crate::image::reference::BASE_REPOSITORY;
use crate::image::ImageReference;
use crate::orchestration::{create_runtime, ContainerRuntime};
use crate::state::{BuildStateStore, FileStateStore};
use crate::ui::{self, UiContext};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Execute the clean command
pub async fn execute(args: CleanArgs, global: &GlobalConfig) -> TierboxResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let cwd =
        std::env::current_dir().map_err(|e| TierboxError::io("getting current directory", e))?;
    let resolved = ConfigManager::resolve(&cwd, global).await?;
    let project = resolved.config.project_name;

    let runtime = create_runtime()?;
    runtime.ensure_ready().await?;

    ui::intro(&ctx, &format!("Cleaning {}", project));

    let prompt = if args.base {
        format!("Remove all images of {} and the shared base images?", project)
    } else {
        format!("Remove all images of {}?", project)
    };
    if !ui::confirm(&ctx, &prompt, true).await? {
        ui::outro_warn(&ctx, "Nothing removed");
        return Ok(());
    }

    let store = FileStateStore::new(ConfigManager::image_state_dir());
    let cleaner = Cleaner {
        runtime: runtime.as_ref(),
        store: &store,
        cache_root: ConfigManager::cache_dir(),
    };
    let results = cleaner.clean(&project, args.base).await;

    let mut failed = 0;
    for result in &results {
        match result {
            CleanupResult::Done { action } => ui::step_ok(&ctx, action),
            CleanupResult::Skipped { .. } => {}
            CleanupResult::Failed { .. } => {
                failed += 1;
                ui::step_warn(&ctx, &result.to_string());
            }
        }
    }

    if failed == 0 {
        ui::outro_success(&ctx, "Project cleanup complete");
    } else {
        ui::outro_warn(&ctx, &format!("Cleanup finished with {} failure(s)", failed));
    }
    Ok(())
}

/// Best-effort removal of a project's artifacts
struct Cleaner<'a> {
    runtime: &'a dyn ContainerRuntime,
    store: &'a dyn BuildStateStore,
    cache_root: PathBuf,
}

impl Cleaner<'_> {
    /// Remove everything belonging to `project`; with `include_base`, the
    /// shared base images and their build contexts too. Never fails: every
    /// step reports its own outcome.
    async fn clean(&self, project: &str, include_base: bool) -> Vec<CleanupResult> {
        let mut results = self
            .remove_repository(&ImageReference::project_repository(project))
            .await;
        results.push(
            remove_dir(&self.cache_root.join("builds").join(project))
                .await
                .log(),
        );
        results.push(self.store.remove(project).await.log());

        if include_base {
            results.extend(self.remove_repository(BASE_REPOSITORY).await);
            results.push(remove_dir(&self.cache_root.join("base-images")).await.log());
        }

        results
    }

    async fn remove_repository(&self, repository: &str) -> Vec<CleanupResult> {
        let images = match self.runtime.list_images(repository).await {
            Ok(images) => images,
            Err(e) => {
                let action = format!("list images in {}", repository);
                return vec![CleanupResult::failed(action, e).log()];
            }
        };

        let mut results = Vec::new();
        for image in images {
            // Containers pin their image; remove them first
            CleanupResult::from_result(
                format!("remove containers using {}", image),
                self.runtime.remove_containers_using(&image).await,
            )
            .log();

            results.push(
                CleanupResult::from_result(
                    format!("Removed {}", image),
                    self.runtime.remove_image(&image, false).await,
                )
                .log(),
            );
        }
        results
    }
}

async fn remove_dir(dir: &Path) -> CleanupResult {
    let action = format!("Removed {}", dir.display());
    match fs::remove_dir_all(dir).await {
        Ok(()) => CleanupResult::done(action),
        Err(e) if e.kind() == io::ErrorKind::NotFound => CleanupResult::skipped(action),
        Err(e) => CleanupResult::failed(action, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Fingerprint;
    use crate::state::BuildStateRecord;
    use crate::testing::{FakeRuntime, MemoryStateStore};
    use tempfile::TempDir;

    fn seed_state(store: &MemoryStateStore) {
        let fingerprint = Fingerprint::from_hex("0123456789ab").unwrap();
        store.put(
            "demo",
            BuildStateRecord::new(ImageReference::project("demo", &fingerprint), fingerprint),
        );
    }

    #[tokio::test]
    async fn removes_only_this_project() {
        let temp = TempDir::new().unwrap();
        let runtime = FakeRuntime::with_images(&[
            "tierbox/demo:0123456789ab",
            "tierbox/demo:ba9876543210",
            "tierbox/demo-api:0123456789ab",
            "tierbox-base:python",
        ]);
        let store = MemoryStateStore::default();
        seed_state(&store);
        std::fs::create_dir_all(temp.path().join("builds/demo")).unwrap();
        std::fs::create_dir_all(temp.path().join("builds/demo-api")).unwrap();

        let cleaner = Cleaner {
            runtime: &runtime,
            store: &store,
            cache_root: temp.path().to_path_buf(),
        };
        let results = cleaner.clean("demo", false).await;

        assert!(results.iter().all(|r| !r.is_failed()));
        assert!(!runtime.has_image("tierbox/demo:0123456789ab"));
        assert!(!runtime.has_image("tierbox/demo:ba9876543210"));
        assert!(runtime.has_image("tierbox/demo-api:0123456789ab"));
        assert!(runtime.has_image("tierbox-base:python"));
        assert_eq!(runtime.containers_cleared_for().len(), 2);

        assert!(!temp.path().join("builds/demo").exists());
        assert!(temp.path().join("builds/demo-api").exists());
        assert!(store.get("demo").is_none());
    }

    #[tokio::test]
    async fn base_removal_is_opt_in() {
        let temp = TempDir::new().unwrap();
        let runtime = FakeRuntime::with_images(&["tierbox-base:python", "tierbox-base:core"]);
        let store = MemoryStateStore::default();
        std::fs::create_dir_all(temp.path().join("base-images/python")).unwrap();

        let cleaner = Cleaner {
            runtime: &runtime,
            store: &store,
            cache_root: temp.path().to_path_buf(),
        };
        cleaner.clean("demo", true).await;

        assert!(!runtime.has_image("tierbox-base:python"));
        assert!(!runtime.has_image("tierbox-base:core"));
        assert!(!temp.path().join("base-images").exists());
    }

    #[tokio::test]
    async fn failures_are_reported_not_raised() {
        let temp = TempDir::new().unwrap();
        let runtime = FakeRuntime::with_images(&["tierbox/demo:0123456789ab"]);
        runtime.fail_removals();
        let store = MemoryStateStore::default();
        seed_state(&store);

        let cleaner = Cleaner {
            runtime: &runtime,
            store: &store,
            cache_root: temp.path().to_path_buf(),
        };
        let results = cleaner.clean("demo", false).await;

        assert_eq!(results.iter().filter(|r| r.is_failed()).count(), 1);
        // State is still removed even though the image stayed
        assert!(store.get("demo").is_none());
        assert!(runtime.has_image("tierbox/demo:0123456789ab"));
    }

    #[tokio::test]
    async fn nothing_to_clean() {
        let temp = TempDir::new().unwrap();
        let runtime = FakeRuntime::default();
        let store = MemoryStateStore::default();

        let cleaner = Cleaner {
            runtime: &runtime,
            store: &store,
            cache_root: temp.path().to_path_buf(),
        };
        let results = cleaner.clean("demo", false).await;

        assert!(results
            .iter()
            .all(|r| matches!(r, CleanupResult::Skipped { .. })));
    }
}
