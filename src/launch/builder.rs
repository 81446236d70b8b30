//! Launch specification assembly
//!
//! Host facts (home, working directory, runtime socket) come in through
//! [`HostContext`] so that assembly itself never touches the environment
//! beyond existence checks on the credential paths.

use crate::config::{project_name_from_dir, EffectiveConfig, GlobalConfig};
use crate::error::{TierboxError, TierboxResult};
use crate::image::dockerfile::CONTAINER_WORKDIR;
use crate::image::ImageReference;
use crate::launch::{LaunchSpec, Mount, MountMode};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Hostname of every tierbox container
pub const CONTAINER_HOSTNAME: &str = "tierbox";

/// Host socket mounted into privileged containers
pub const RUNTIME_SOCKET: &str = "/var/run/docker.sock";

/// Maps the invoking user to root inside the container
const USERNS_MODE: &str = "keep-id:uid=0,gid=0";

/// Host credential paths (relative to home) mounted when present
const CREDENTIAL_MOUNTS: &[(&str, &str, MountMode)] = &[
    (".claude", "/root/.claude", MountMode::ReadWrite),
    (".claude.json", "/root/.claude.json", MountMode::ReadWrite),
    (".gitconfig", "/root/.gitconfig", MountMode::ReadOnly),
    (".git-credentials", "/root/.git-credentials", MountMode::ReadOnly),
    (".ssh", "/root/.ssh", MountMode::ReadOnly),
];

/// What the container runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// The configured agent, followed by pass-through arguments
    Agent(Vec<String>),
    /// An interactive bash shell
    Shell,
}

/// Facts about the invoking host
#[derive(Debug, Clone)]
pub struct HostContext {
    pub home: PathBuf,
    /// Project directory, mounted at the container workdir
    pub cwd: PathBuf,
    pub runtime_socket: PathBuf,
    /// Whether stdin is a terminal
    pub tty: bool,
}

impl HostContext {
    /// Detect the host context of this process
    pub fn detect() -> TierboxResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| TierboxError::User("Cannot determine home directory".to_string()))?;
        let cwd = std::env::current_dir()
            .map_err(|e| TierboxError::io("getting current directory", e))?;

        Ok(Self {
            home,
            cwd,
            runtime_socket: PathBuf::from(RUNTIME_SOCKET),
            tty: std::io::stdin().is_terminal(),
        })
    }
}

/// Builds [`LaunchSpec`]s for one host
pub struct LaunchSpecBuilder<'a> {
    host: &'a HostContext,
}

impl<'a> LaunchSpecBuilder<'a> {
    pub fn new(host: &'a HostContext) -> Self {
        Self { host }
    }

    /// Container name for a launch mode, derived from the working directory
    pub fn container_name(&self, mode: &LaunchMode) -> String {
        let dir = project_name_from_dir(&self.host.cwd);
        match mode {
            LaunchMode::Agent(_) => format!("tierbox-{}", dir),
            LaunchMode::Shell => format!("tierbox-shell-{}", dir),
        }
    }

    /// Assemble the launch specification
    pub fn build(
        &self,
        config: &EffectiveConfig,
        global: &GlobalConfig,
        image: &ImageReference,
        mode: &LaunchMode,
    ) -> LaunchSpec {
        let mut spec = LaunchSpec {
            name: self.container_name(mode),
            hostname: CONTAINER_HOSTNAME.to_string(),
            image: image.clone(),
            interactive: true,
            tty: self.host.tty,
            userns: Some(USERNS_MODE.to_string()),
            privileged: false,
            security_opt: Vec::new(),
            mounts: vec![Mount::new(
                &self.host.cwd,
                CONTAINER_WORKDIR,
                MountMode::Default,
            )],
            ports: Vec::new(),
            env: Vec::new(),
            command: Vec::new(),
        };

        for (relative, target, mode) in CREDENTIAL_MOUNTS {
            let source = self.host.home.join(relative);
            if path_exists(&source) {
                spec.mounts.push(Mount::new(source, *target, *mode));
            }
        }

        if config.privileged {
            spec.privileged = true;
            spec.security_opt.push("label=disable".to_string());
            if path_exists(&self.host.runtime_socket) {
                spec.mounts.push(Mount::new(
                    &self.host.runtime_socket,
                    self.host.runtime_socket.display().to_string(),
                    MountMode::Default,
                ));
            }
        }

        for volume in &config.volumes {
            if volume.source.is_empty() || volume.target.is_empty() {
                debug!("Skipping incomplete volume {:?}", volume);
                continue;
            }
            spec.mounts.push(Mount::new(
                expand_home(&volume.source, &self.host.home),
                volume.target.clone(),
                MountMode::Relabel,
            ));
        }

        spec.ports = config
            .ports
            .iter()
            .filter(|p| p.host != 0 && p.container != 0)
            .copied()
            .collect();

        spec.env.push(("TERM".to_string(), "xterm-256color".to_string()));
        spec.env.push(("TIERBOX_PROJECT".to_string(), config.project_name.clone()));
        spec.env.push(("IS_SANDBOX".to_string(), "true".to_string()));
        let install = config.install_packages();
        if !install.is_empty() {
            spec.env.push(("TIERBOX_INSTALL".to_string(), install.join(" ")));
        }

        spec.command = match mode {
            LaunchMode::Agent(args) => {
                let mut command = vec![config.agent.clone()];
                command.extend(global.flags_for(&config.agent).iter().cloned());
                command.extend(args.iter().cloned());
                command
            }
            LaunchMode::Shell => vec!["/bin/bash".to_string()],
        };

        spec
    }
}

/// Expand a leading `~` or `~/` to the home directory
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        home.to_path_buf()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// Existence check where an error counts as absent
fn path_exists(path: &Path) -> bool {
    match path.try_exists() {
        Ok(exists) => exists,
        Err(e) => {
            debug!("Cannot check {}: {}", path.display(), e);
            false
        }
    }
}
