//! Configuration schema for tierbox
//!
//! Two files feed a launch: the global defaults at
//! `~/.config/tierbox/config.toml` and the project's `tierbox.toml`.
//! [`EffectiveConfig`] is the merge of both.

use crate::image::Environment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Process-wide defaults, read once per invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Agent used when a project does not name one
    pub default_agent: String,

    /// Privileged mode for projects that do not ask for it
    pub default_privileged: bool,

    /// Image every base tier is built from
    pub default_image: String,

    /// Flags passed to each agent, keyed by agent command
    pub agent_flags: BTreeMap<String, Vec<String>>,

    /// Packages prepended to every project's package list
    pub default_packages: Vec<String>,

    /// Environments prepended to every project's environment list
    pub default_envs: Vec<Environment>,

    /// Packages installed into every base image
    pub base_packages: Vec<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let mut agent_flags = BTreeMap::new();
        agent_flags.insert(
            "claude".to_string(),
            vec!["--dangerously-skip-permissions".to_string()],
        );

        Self {
            default_agent: "claude".to_string(),
            default_privileged: false,
            default_image: "ubuntu:24.04".to_string(),
            agent_flags,
            default_packages: vec![],
            default_envs: vec![],
            base_packages: vec![],
        }
    }
}

impl GlobalConfig {
    /// Flags configured for an agent command
    pub fn flags_for(&self, agent: &str) -> &[String] {
        self.agent_flags
            .get(agent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Contents of a project's `tierbox.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub project: ProjectSection,

    /// Install blocks; only the first one is used
    pub install: Vec<InstallBlock>,

    pub volumes: Vec<VolumeMount>,

    pub ports: Vec<PortMapping>,
}

/// `[project]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub name: String,
    pub agent: String,
    pub privileged: bool,
}

/// `[[install]]` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallBlock {
    pub packages: Vec<String>,
    pub envs: Vec<Environment>,
}

/// `[[volumes]]` entry (host source, container target)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
}

/// `[[ports]]` entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

/// Merged configuration driving image builds and launches
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub project_name: String,
    pub agent: String,
    pub privileged: bool,
    /// Global default packages followed by project packages
    pub packages: Vec<String>,
    /// Global default environments followed by project environments
    pub envs: Vec<Environment>,
    pub volumes: Vec<VolumeMount>,
    pub ports: Vec<PortMapping>,
}

impl EffectiveConfig {
    /// Merge project settings over global defaults.
    ///
    /// Default packages and environments are prepended; scalar fields fall
    /// back to the global value only when the project leaves them empty.
    pub fn merge(project: &ProjectConfig, global: &GlobalConfig) -> Self {
        let install = project.install.first().cloned().unwrap_or_default();

        let agent = if project.project.agent.is_empty() {
            global.default_agent.clone()
        } else {
            project.project.agent.clone()
        };

        let packages = global
            .default_packages
            .iter()
            .chain(install.packages.iter())
            .cloned()
            .collect();

        let envs = global
            .default_envs
            .iter()
            .chain(install.envs.iter())
            .copied()
            .collect();

        Self {
            project_name: project.project.name.clone(),
            agent,
            privileged: project.project.privileged || global.default_privileged,
            packages,
            envs,
            volumes: project.volumes.clone(),
            ports: project.ports.clone(),
        }
    }

    /// Environment that selects the base tier
    pub fn primary_environment(&self) -> Option<Environment> {
        self.envs.first().copied()
    }

    /// Environments layered into the project image on top of the base tier
    pub fn secondary_environments(&self) -> &[Environment] {
        self.envs.get(1..).unwrap_or_default()
    }

    /// Flat package list: declared packages, then every environment's packages
    pub fn install_packages(&self) -> Vec<String> {
        let mut all = self.packages.clone();
        for env in &self.envs {
            all.extend(env.packages().iter().map(|p| p.to_string()));
        }
        all
    }
}

/// Template written by `tierbox init`
pub const PROJECT_TEMPLATE: &str = r#"# tierbox project configuration
# Global defaults live in ~/.config/tierbox/config.toml

[project]
name = "my-project"
# agent = "claude"
privileged = false

[[install]]
packages = []
envs = []  # Available: python, rust, node, go, ruby, java, cpp, php, dotnet

# [[volumes]]
# source = "~/extra"
# target = "/c0de/extra"

# [[ports]]
# host = 3000
# container = 3000
"#;

/// Template written on first use when no global config exists
pub const GLOBAL_TEMPLATE: &str = r#"# tierbox global configuration

default_agent = "claude"
default_privileged = false

# Image every base tier starts from
default_image = "ubuntu:24.04"

# Packages installed in every base image
base_packages = [
  "git-lfs", "build-essential", "make",
  "tmux", "tree", "ncdu",
  "jq", "ripgrep", "fd-find", "fzf", "bat",
  "httpie", "netcat-openbsd", "iputils-ping",
  "zip", "unzip", "tar", "xz-utils",
  "docker.io", "docker-compose",
  "postgresql-client", "redis-tools", "sqlite3",
]

# Prepended to every project's environments and packages
default_envs = []
default_packages = []

# Flags passed to each agent
[agent_flags]
claude = ["--dangerously-skip-permissions"]
"#;
