//! Podman container runtime
//!
//! Drives the `podman` CLI directly. On Linux this is native rootless
//! Podman; on macOS the CLI talks to a `podman machine` VM.

use crate::error::{TierboxError, TierboxResult};
use crate::launch::LaunchSpec;
use crate::orchestration::runtime::ContainerRuntime;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Exit status podman uses for its own errors (as opposed to the
/// container's)
const PODMAN_ERROR_EXIT: i32 = 125;

/// Container runtime using the Podman CLI
pub struct PodmanRuntime;

impl PodmanRuntime {
    /// Create a new Podman runtime
    pub fn new() -> Self {
        Self
    }

    /// Check if Podman is installed
    async fn podman_installed() -> bool {
        Command::new("podman")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Check if Podman runs rootless
    async fn rootless_configured() -> TierboxResult<bool> {
        let output = Command::new("podman")
            .args(["info", "--format", "{{.Host.Security.Rootless}}"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TierboxError::command_failed("podman info", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim() == "true")
    }

    /// Execute a Podman command and return the output
    async fn exec(&self, args: &[&str]) -> TierboxResult<std::process::Output> {
        debug!("Executing: podman {:?}", args);

        Command::new("podman")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TierboxError::command_failed(format!("podman {:?}", args), e))
    }

    /// Execute a Podman command attached to the terminal
    async fn exec_interactive(&self, args: &[String]) -> TierboxResult<i32> {
        debug!("Executing interactively: podman {:?}", args);

        let status = Command::new("podman")
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| TierboxError::command_failed(format!("podman {:?}", args), e))?;

        Ok(status.code().unwrap_or(-1))
    }
}

impl Default for PodmanRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the `repository:tag` lines belonging to `repository`.
///
/// Podman reports unqualified local images under `localhost/`.
fn filter_repository(stdout: &str, repository: &str) -> Vec<String> {
    let prefix = format!("{}:", repository);
    stdout
        .lines()
        .map(str::trim)
        .map(|line| line.strip_prefix("localhost/").unwrap_or(line))
        .filter(|line| line.starts_with(&prefix) && !line.ends_with(":<none>"))
        .map(String::from)
        .collect()
}

#[async_trait]
impl ContainerRuntime for PodmanRuntime {
    async fn is_available(&self) -> TierboxResult<bool> {
        Ok(Self::podman_installed().await)
    }

    async fn ensure_ready(&self) -> TierboxResult<()> {
        if !Self::podman_installed().await {
            return Err(TierboxError::PodmanNotFound);
        }

        match Self::rootless_configured().await {
            Ok(true) => {}
            Ok(false) => warn!("Podman is not running rootless; --userns=keep-id may fail"),
            Err(e) => debug!("Could not query podman rootless mode: {}", e),
        }

        Ok(())
    }

    async fn image_exists(&self, image: &str) -> TierboxResult<bool> {
        let output = self.exec(&["image", "exists", image]).await?;
        Ok(output.status.success())
    }

    async fn build_image(
        &self,
        context_dir: &Path,
        tag: &str,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> TierboxResult<()> {
        let context_str = context_dir.display().to_string();
        debug!("Executing: podman build -t {} {}", tag, context_str);

        let mut child = Command::new("podman")
            .args(["build", "-t", tag, &context_str])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TierboxError::command_failed("podman build", e))?;

        let all_output = super::stream_child_output(&mut child, on_output).await;

        let status = child
            .wait()
            .await
            .map_err(|e| TierboxError::command_failed("podman build", e))?;

        if !status.success() {
            return Err(TierboxError::ImageBuild {
                tag: tag.to_string(),
                reason: super::build_error_output(&all_output),
            });
        }

        info!("Built image {}", tag);
        Ok(())
    }

    async fn remove_image(&self, image: &str, force: bool) -> TierboxResult<()> {
        let mut args = vec!["rmi"];
        if force {
            args.push("-f");
        }
        args.push(image);
        let output = self.exec(&args).await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("image not known") {
                Ok(())
            } else {
                Err(TierboxError::command_exec("podman rmi", stderr))
            }
        }
    }

    async fn list_images(&self, repository: &str) -> TierboxResult<Vec<String>> {
        let filter = format!("reference={}", repository);
        let output = self
            .exec(&[
                "images",
                "--filter",
                &filter,
                "--format",
                "{{.Repository}}:{{.Tag}}",
            ])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TierboxError::command_exec("podman images", stderr));
        }

        Ok(filter_repository(
            &String::from_utf8_lossy(&output.stdout),
            repository,
        ))
    }

    async fn remove_container(&self, name: &str) -> TierboxResult<()> {
        debug!("Removing container: {}", name);

        let output = self.exec(&["rm", "-f", name]).await?;

        if output.status.success() {
            Ok(())
        } else {
            // Ignore error if container doesn't exist
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no such container") {
                Ok(())
            } else {
                Err(TierboxError::command_exec("podman rm", stderr))
            }
        }
    }

    async fn remove_containers_using(&self, image: &str) -> TierboxResult<()> {
        let filter = format!("ancestor={}", image);
        let output = self
            .exec(&["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TierboxError::command_exec("podman ps", stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        for name in stdout.lines().map(str::trim).filter(|n| !n.is_empty()) {
            self.remove_container(name).await?;
        }

        Ok(())
    }

    async fn run_interactive(&self, spec: &LaunchSpec) -> TierboxResult<i32> {
        let args = spec.to_run_args();
        let code = self.exec_interactive(&args).await?;

        if code == PODMAN_ERROR_EXIT {
            return Err(TierboxError::ContainerLaunch(format!(
                "podman could not start {} from {}",
                spec.name, spec.image
            )));
        }

        Ok(code)
    }

    fn runtime_name(&self) -> &'static str {
        "Podman"
    }
}
