//! Container runtime abstraction
//!
//! The image caches and the launcher only talk to this trait, so the
//! cache state machine can be exercised against an in-memory fake.

use crate::error::TierboxResult;
use crate::launch::LaunchSpec;
use async_trait::async_trait;
use std::path::Path;

/// Abstract container runtime interface
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check if the runtime is available on this system
    async fn is_available(&self) -> TierboxResult<bool>;

    /// Ensure the runtime is ready to build and run containers
    async fn ensure_ready(&self) -> TierboxResult<()>;

    /// Check whether an image exists locally
    async fn image_exists(&self, image: &str) -> TierboxResult<bool>;

    /// Build an image from a context directory containing a Dockerfile.
    ///
    /// Each line of build output is passed to `on_output`. On failure the
    /// error carries the tail of the output.
    async fn build_image(
        &self,
        context_dir: &Path,
        tag: &str,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> TierboxResult<()>;

    /// Remove an image. Removing an image that does not exist succeeds.
    async fn remove_image(&self, image: &str, force: bool) -> TierboxResult<()>;

    /// List `repository:tag` references of local images in a repository
    async fn list_images(&self, repository: &str) -> TierboxResult<Vec<String>>;

    /// Remove a container by name, whether running or not
    async fn remove_container(&self, name: &str) -> TierboxResult<()>;

    /// Remove every container created from an image
    async fn remove_containers_using(&self, image: &str) -> TierboxResult<()>;

    /// Run a container attached to the terminal and return its exit code
    async fn run_interactive(&self, spec: &LaunchSpec) -> TierboxResult<i32>;

    /// Get the human-readable runtime name for display
    fn runtime_name(&self) -> &'static str;
}
