//! Container launch specification
//!
//! Runtime-neutral description of one interactive container start. The
//! Podman runtime turns it into `podman run` arguments.

use crate::config::PortMapping;
use crate::image::ImageReference;
use std::fmt;
use std::path::PathBuf;

/// Access mode suffix of a bind mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    /// No suffix; runtime default
    Default,
    ReadWrite,
    ReadOnly,
    /// Private SELinux relabel (`:Z`)
    Relabel,
}

impl MountMode {
    fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::ReadWrite => Some("rw"),
            Self::ReadOnly => Some("ro"),
            Self::Relabel => Some("Z"),
        }
    }
}

/// Host path bind-mounted into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub target: String,
    pub mode: MountMode,
}

impl Mount {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<String>, mode: MountMode) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            mode,
        }
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.display(), self.target)?;
        if let Some(suffix) = self.mode.suffix() {
            write!(f, ":{}", suffix)?;
        }
        Ok(())
    }
}

/// Everything needed to start one container
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Container name
    pub name: String,
    pub hostname: String,
    pub image: ImageReference,
    /// Keep stdin open
    pub interactive: bool,
    /// Allocate a TTY
    pub tty: bool,
    /// User namespace mode (e.g. `keep-id:uid=0,gid=0`)
    pub userns: Option<String>,
    pub privileged: bool,
    /// Security options (e.g. `label=disable`)
    pub security_opt: Vec<String>,
    pub mounts: Vec<Mount>,
    pub ports: Vec<PortMapping>,
    /// Environment variables, in the order they are passed
    pub env: Vec<(String, String)>,
    /// Command run in place of the image default
    pub command: Vec<String>,
}

impl LaunchSpec {
    /// Arguments for `podman run`, including the `run` verb
    pub fn to_run_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string()];

        if self.interactive {
            args.push("-i".to_string());
        }
        if self.tty {
            args.push("-t".to_string());
        }

        args.push("--name".to_string());
        args.push(self.name.clone());
        args.push("--hostname".to_string());
        args.push(self.hostname.clone());

        if let Some(ref userns) = self.userns {
            args.push(format!("--userns={}", userns));
        }

        if self.privileged {
            args.push("--privileged".to_string());
        }
        for opt in &self.security_opt {
            args.push("--security-opt".to_string());
            args.push(opt.clone());
        }

        for mount in &self.mounts {
            args.push("-v".to_string());
            args.push(mount.to_string());
        }

        for port in &self.ports {
            args.push("-p".to_string());
            args.push(format!("{}:{}", port.host, port.container));
        }

        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.push(self.image.to_string());
        args.extend(self.command.iter().cloned());

        args
    }

    /// Value of an environment variable, if set
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Mount targeting a container path, if any
    pub fn mount_at(&self, target: &str) -> Option<&Mount> {
        self.mounts.iter().find(|m| m.target == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> LaunchSpec {
        LaunchSpec {
            name: "tierbox-app".to_string(),
            hostname: "tierbox".to_string(),
            image: ImageReference::new("tierbox/app", "0123456789ab"),
            interactive: true,
            tty: true,
            userns: Some("keep-id:uid=0,gid=0".to_string()),
            privileged: false,
            security_opt: vec![],
            mounts: vec![
                Mount::new("/home/u/app", "/c0de/project", MountMode::Default),
                Mount::new("/home/u/.ssh", "/root/.ssh", MountMode::ReadOnly),
            ],
            ports: vec![PortMapping {
                host: 8080,
                container: 80,
            }],
            env: vec![("TERM".to_string(), "xterm-256color".to_string())],
            command: vec!["claude".to_string(), "--resume".to_string()],
        }
    }

    #[test]
    fn mount_display() {
        assert_eq!(
            Mount::new("/a", "/b", MountMode::Default).to_string(),
            "/a:/b"
        );
        assert_eq!(Mount::new("/a", "/b", MountMode::Relabel).to_string(), "/a:/b:Z");
        assert_eq!(Mount::new("/a", "/b", MountMode::ReadWrite).to_string(), "/a:/b:rw");
    }

    #[test]
    fn run_args_layout() {
        let args = spec().to_run_args();
        assert_eq!(
            args,
            vec![
                "run",
                "-i",
                "-t",
                "--name",
                "tierbox-app",
                "--hostname",
                "tierbox",
                "--userns=keep-id:uid=0,gid=0",
                "-v",
                "/home/u/app:/c0de/project",
                "-v",
                "/home/u/.ssh:/root/.ssh:ro",
                "-p",
                "8080:80",
                "-e",
                "TERM=xterm-256color",
                "tierbox/app:0123456789ab",
                "claude",
                "--resume",
            ]
        );
    }

    #[test]
    fn privileged_args() {
        let mut spec = spec();
        spec.privileged = true;
        spec.security_opt = vec!["label=disable".to_string()];

        let args = spec.to_run_args();
        let joined = args.join(" ");
        assert!(joined.contains("--privileged --security-opt label=disable"));
    }

    #[test]
    fn lookups() {
        let spec = spec();
        assert_eq!(spec.env_value("TERM"), Some("xterm-256color"));
        assert_eq!(spec.env_value("HOME"), None);
        assert!(spec.mount_at("/root/.ssh").is_some());
        assert!(spec.mount_at("/root/.claude").is_none());
    }
}
