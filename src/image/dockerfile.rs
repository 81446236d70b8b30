//! Build context synthesis
//!
//! Generates the Dockerfiles for both tiers and writes them into a build
//! context directory for the container runtime.

use crate::config::{EffectiveConfig, GlobalConfig};
use crate::error::{TierboxError, TierboxResult};
use crate::image::{Environment, ImageReference};
use std::path::Path;
use tokio::fs;

/// Working directory and project mount point inside every image
pub const CONTAINER_WORKDIR: &str = "/c0de/project";

/// Tooling present in every base image, ahead of the global base packages
const CORE_PACKAGES: &[&str] = &[
    "curl",
    "wget",
    "sudo",
    "ca-certificates",
    "gnupg",
    "lsb-release",
    "git",
    "vim",
    "nano",
    "htop",
    "less",
    "man-db",
];

/// Install command for agents tierbox knows how to provision
pub fn agent_install_step(agent: &str) -> Option<&'static str> {
    match agent {
        "claude" => Some("curl -fsSL https://claude.ai/install.sh | bash"),
        _ => None,
    }
}

/// Dockerfile for a base tier
pub fn base_dockerfile(env: Option<Environment>, global: &GlobalConfig) -> String {
    let mut lines = vec![
        format!("FROM {}", global.default_image),
        String::new(),
        "ENV DEBIAN_FRONTEND=noninteractive".to_string(),
        String::new(),
    ];

    let mut packages: Vec<&str> = Vec::new();
    for package in CORE_PACKAGES
        .iter()
        .copied()
        .chain(global.base_packages.iter().map(String::as_str))
    {
        if !packages.contains(&package) {
            packages.push(package);
        }
    }
    lines.push("# Base packages".to_string());
    lines.push(apt_install(&packages));
    lines.push(String::new());

    if let Some(step) = agent_install_step(&global.default_agent) {
        lines.push(format!("# Agent: {}", global.default_agent));
        lines.push(format!("RUN {}", step));
        lines.push("ENV PATH=\"/root/.local/bin:${PATH}\"".to_string());
        lines.push(String::new());
    }

    if let Some(env) = env {
        push_environment(&mut lines, env);
    }

    lines.push(format!("WORKDIR {}", CONTAINER_WORKDIR));
    lines.push("CMD [\"/bin/bash\"]".to_string());
    lines.push(String::new());

    lines.join("\n")
}

/// Dockerfile for a project image layered on `base`.
///
/// Installs the effective package list (global defaults first), then the
/// toolchains of every environment after the primary one.
pub fn project_dockerfile(
    base: &ImageReference,
    config: &EffectiveConfig,
    global: &GlobalConfig,
) -> String {
    let mut lines = vec![
        format!("FROM {}", base),
        String::new(),
        "ENV DEBIAN_FRONTEND=noninteractive".to_string(),
        String::new(),
    ];

    if !config.packages.is_empty() {
        let packages: Vec<&str> = config.packages.iter().map(String::as_str).collect();
        lines.push("# Project packages".to_string());
        lines.push(apt_install(&packages));
        lines.push(String::new());
    }

    for env in config.secondary_environments() {
        push_environment(&mut lines, *env);
    }

    if config.agent != global.default_agent {
        if let Some(step) = agent_install_step(&config.agent) {
            lines.push(format!("# Agent: {}", config.agent));
            lines.push(format!("RUN {}", step));
            lines.push("ENV PATH=\"/root/.local/bin:${PATH}\"".to_string());
            lines.push(String::new());
        }
    }

    lines.push(format!("WORKDIR {}", CONTAINER_WORKDIR));
    lines.push(String::new());

    lines.join("\n")
}

/// Write a Dockerfile into a fresh build context directory
pub async fn write_build_context(dir: &Path, dockerfile: &str) -> TierboxResult<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| TierboxError::io(format!("creating build directory {}", dir.display()), e))?;

    fs::write(dir.join("Dockerfile"), dockerfile)
        .await
        .map_err(|e| TierboxError::io(format!("writing Dockerfile in {}", dir.display()), e))
}

fn push_environment(lines: &mut Vec<String>, env: Environment) {
    lines.push(format!("# Environment: {}", env));
    lines.push(apt_install(env.packages()));
    for step in env.setup_steps() {
        lines.push(format!("RUN {}", step));
    }
    for (key, value) in env.image_env() {
        lines.push(format!("ENV {}={}", key, dockerfile_quote(value)));
    }
    lines.push(String::new());
}

fn apt_install(packages: &[&str]) -> String {
    format!(
        "RUN apt-get update && \\\n    apt-get install -y --no-install-recommends \\\n    {} && \\\n    rm -rf /var/lib/apt/lists/*",
        packages.join(" \\\n    ")
    )
}

/// Quote a value for a Dockerfile ENV instruction.
/// Embedded double quotes and backslashes are escaped.
fn dockerfile_quote(value: &str) -> String {
    if value.contains('$') || value.contains(' ') || value.contains('"') || value.contains('\\') {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}
