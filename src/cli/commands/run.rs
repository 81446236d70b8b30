//! Run and shell commands - ensure the project image, then launch

use crate::cleanup::CleanupResult;
use crate::config::{ConfigManager, GlobalConfig, ResolvedConfig};
use crate::error::{TierboxError, TierboxResult};
use crate::image::{CacheOutcome, ProjectImageCache};
use crate::launch::{HostContext, LaunchMode, LaunchSpecBuilder};
use crate::orchestration::{create_runtime, ContainerRuntime};
use crate::state::{BuildStateStore, FileStateStore};
use crate::ui::{self, BuildReporter, TaskSpinner, UiContext};
use std::path::PathBuf;
use tracing::debug;

/// Execute the run command: start the agent with `args` appended
pub async fn execute(args: Vec<String>, global: &GlobalConfig) -> TierboxResult<()> {
    launch(LaunchMode::Agent(args), global).await
}

/// Execute the shell command
pub async fn shell(global: &GlobalConfig) -> TierboxResult<()> {
    launch(LaunchMode::Shell, global).await
}

async fn launch(mode: LaunchMode, global: &GlobalConfig) -> TierboxResult<()> {
    let ctx = UiContext::detect();
    let host = HostContext::detect()?;
    let resolved = ConfigManager::resolve(&host.cwd, global).await?;

    let runtime = create_runtime()?;
    debug!("Using runtime: {}", runtime.runtime_name());

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Checking {}...", runtime.runtime_name()));
    if let Err(e) = runtime.ensure_ready().await {
        spinner.stop_error(&format!("{} is not ready", runtime.runtime_name()));
        return Err(e);
    }
    spinner.stop(&format!("{} ready", runtime.runtime_name()));

    let store = FileStateStore::new(ConfigManager::image_state_dir());
    let session = Session {
        runtime: runtime.as_ref(),
        store: &store,
        cache_root: ConfigManager::cache_dir(),
        host: &host,
        ctx: &ctx,
    };

    let code = session.launch(&resolved, &mode, global).await?;
    if code != 0 {
        return Err(TierboxError::ContainerExited { code });
    }
    Ok(())
}

/// Collaborators of one launch
struct Session<'a> {
    runtime: &'a dyn ContainerRuntime,
    store: &'a dyn BuildStateStore,
    cache_root: PathBuf,
    host: &'a HostContext,
    ctx: &'a UiContext,
}

impl Session<'_> {
    /// Ensure the image and run the container; returns the container's
    /// exit code
    async fn launch(
        &self,
        resolved: &ResolvedConfig,
        mode: &LaunchMode,
        global: &GlobalConfig,
    ) -> TierboxResult<i32> {
        let config = &resolved.config;

        let reporter = BuildReporter::new(self.ctx);
        let image = ProjectImageCache::new(self.runtime, self.store, self.cache_root.clone())
            .with_observer(&reporter)
            .ensure_project_image(config, global, resolved.source.modified)
            .await?;

        let tag = image.image.to_string();
        match image.outcome {
            CacheOutcome::Reused => ui::step_ok_detail(self.ctx, "Using cached image", &tag),
            CacheOutcome::Rebuilt { ref previous } => {
                ui::step_info(self.ctx, &format!("tierbox.toml changed, replaced {}", previous))
            }
            CacheOutcome::Built | CacheOutcome::Restored => {}
        }

        let spec = LaunchSpecBuilder::new(self.host).build(config, global, &image.image, mode);

        CleanupResult::from_result(
            format!("remove existing container {}", spec.name),
            self.runtime.remove_container(&spec.name).await,
        )
        .log();

        let what = match mode {
            LaunchMode::Agent(_) => config.agent.as_str(),
            LaunchMode::Shell => "shell",
        };
        ui::step_info(
            self.ctx,
            &format!("Starting {} for {}", what, config.project_name),
        );

        self.runtime.run_interactive(&spec).await
    }
}
