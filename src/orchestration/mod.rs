//! Orchestration module for container runtimes
//!
//! Provides platform-agnostic container management on top of Podman
//! (native rootless on Linux, `podman machine` on macOS).

mod podman;
mod runtime;

pub use podman::PodmanRuntime;
pub use runtime::ContainerRuntime;

use crate::error::{TierboxError, TierboxResult};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Podman runtime for the current platform; only Linux and macOS have one
pub fn create_runtime() -> TierboxResult<Box<dyn ContainerRuntime>> {
    if cfg!(any(target_os = "linux", target_os = "macos")) {
        Ok(Box::new(PodmanRuntime::new()))
    } else {
        Err(TierboxError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}

/// Max number of output lines to include in build error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of build output for error diagnostics.
pub(crate) fn build_error_output(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(BUILD_ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns all collected output lines for error reporting. Streams that were
/// not piped are treated as already closed.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> Vec<String> {
    let mut stderr_reader = child.stderr.take().map(|s| BufReader::new(s).lines());
    let mut stdout_reader = child.stdout.take().map(|s| BufReader::new(s).lines());

    let mut all_output = Vec::new();
    let mut stderr_done = stderr_reader.is_none();
    let mut stdout_done = stdout_reader.is_none();

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = next_line(&mut stderr_reader), if !stderr_done => {
                match line {
                    Some(line) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    None => stderr_done = true,
                }
            }
            line = next_line(&mut stdout_reader), if !stdout_done => {
                match line {
                    Some(line) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    None => stdout_done = true,
                }
            }
        }
    }

    all_output
}

async fn next_line<R>(reader: &mut Option<tokio::io::Lines<BufReader<R>>>) -> Option<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match reader {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_follows_platform() {
        match create_runtime() {
            Ok(runtime) => assert_eq!(runtime.runtime_name(), "Podman"),
            Err(e) => assert!(matches!(e, TierboxError::UnsupportedPlatform(_))),
        }
    }

    #[test]
    fn error_output_keeps_tail() {
        let lines: Vec<String> = (0..120).map(|i| format!("line {}", i)).collect();
        let tail = build_error_output(&lines);

        assert_eq!(tail.lines().count(), BUILD_ERROR_TAIL_LINES);
        assert!(tail.starts_with("line 70"));
        assert!(tail.ends_with("line 119"));
    }

    #[test]
    fn error_output_short() {
        let lines = vec!["E: Unable to locate package nope".to_string()];
        assert_eq!(build_error_output(&lines), "E: Unable to locate package nope");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streams_both_pipes() {
        use std::process::Stdio;
        use std::sync::Mutex;

        let mut child = tokio::process::Command::new("sh")
            .args(["-c", "echo out; echo err 1>&2"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let seen = Mutex::new(Vec::new());
        let on_output = |line: String| seen.lock().unwrap().push(line);
        let all = stream_child_output(&mut child, &on_output).await;
        child.wait().await.unwrap();

        let mut all = all;
        all.sort();
        assert_eq!(all, vec!["err", "out"]);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
