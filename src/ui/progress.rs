//! Progress indicators with CI fallback

use super::context::UiContext;
use super::output;
use crate::image::{BuildObserver, ImageReference, Tier};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    /// Create a new spinner (shows on `start` in interactive mode)
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            // Plain output for CI
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            println!("{} {}", style("✗").red(), message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Progress bar for container image builds.
///
/// Parses Podman `STEP N/M: <instruction>` lines and displays
/// an indicatif progress bar in interactive mode, or plain text in CI.
pub struct BuildProgress {
    bar: Option<ProgressBar>,
}

impl BuildProgress {
    /// Create a new build progress indicator.
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(0);
            let template = ProgressStyle::default_bar()
                .template("  {spinner:.magenta} Building {prefix}  {bar:20.magenta/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(
                template
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .progress_chars("━╸─"),
            );
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Building {}...", label);
            None
        };
        Self { bar }
    }

    /// Process a build output line. Parses `STEP N/M:` and updates the bar.
    pub fn on_line(&self, line: String) {
        if let Some((n, total, instruction)) = parse_step_line(&line) {
            if let Some(ref bar) = self.bar {
                bar.set_length(total);
                bar.set_position(n);
                bar.set_message(truncate(instruction));
            } else {
                println!("  STEP {}/{}: {}", n, total, instruction);
            }
        } else if let Some(ref bar) = self.bar {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !is_build_noise(trimmed) {
                bar.set_message(truncate(trimmed));
            }
        }
    }

    /// Finish and clear the progress bar.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Shows one [`BuildProgress`] per image build
pub struct BuildReporter {
    ctx: UiContext,
    current: Mutex<Option<BuildProgress>>,
}

impl BuildReporter {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            ctx: ctx.clone(),
            current: Mutex::new(None),
        }
    }
}

impl BuildObserver for BuildReporter {
    fn build_started(&self, image: &ImageReference, tier: Tier) {
        let progress = BuildProgress::new(&self.ctx, &format!("{} image {}", tier, image));
        if let Ok(mut current) = self.current.lock() {
            *current = Some(progress);
        }
    }

    fn build_output(&self, line: String) {
        if let Ok(current) = self.current.lock() {
            if let Some(ref progress) = *current {
                progress.on_line(line);
            }
        }
    }

    fn build_finished(&self, image: &ImageReference, tier: Tier, success: bool) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(progress) = current.take() {
                progress.finish();
            }
        }

        let label = format!("{} image", tier);
        if success {
            output::step_ok_detail(&self.ctx, &format!("Built {}", label), &image.to_string());
        } else {
            output::step_error_detail(
                &self.ctx,
                &format!("Failed to build {}", label),
                &image.to_string(),
            );
        }
    }
}

/// Shorten a line to fit next to the bar, on a char boundary
fn truncate(line: &str) -> String {
    const MAX: usize = 60;
    if line.chars().count() > MAX {
        let head: String = line.chars().take(MAX - 3).collect();
        format!("{}...", head)
    } else {
        line.to_string()
    }
}

/// Filter out Podman internal build lines that aren't useful to display.
fn is_build_noise(line: &str) -> bool {
    line.starts_with("--->")
        || line.starts_with("-->")
        || line.starts_with("Removing intermediate")
        || line.starts_with("COMMIT")
}

/// Parse a Podman build step line like `STEP N/M: INSTRUCTION args...`
fn parse_step_line(line: &str) -> Option<(u64, u64, &str)> {
    let rest = line.strip_prefix("STEP ")?;
    let slash = rest.find('/')?;
    let colon = rest.find(':')?;
    if colon <= slash {
        return None;
    }
    let n: u64 = rest[..slash].parse().ok()?;
    let total: u64 = rest[slash + 1..colon].parse().ok()?;
    let instruction = rest[colon + 1..].trim();
    Some((n, total, instruction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Checking Podman...");
        spinner.stop("Podman ready");
    }

    #[test]
    fn parse_step_line_valid() {
        let (n, m, instr) = parse_step_line("STEP 3/7: RUN apt-get update").unwrap();
        assert_eq!(n, 3);
        assert_eq!(m, 7);
        assert_eq!(instr, "RUN apt-get update");
    }

    #[test]
    fn parse_step_line_from_instruction() {
        let (n, m, instr) = parse_step_line("STEP 1/4: FROM tierbox-base:python").unwrap();
        assert_eq!(n, 1);
        assert_eq!(m, 4);
        assert_eq!(instr, "FROM tierbox-base:python");
    }

    #[test]
    fn parse_step_line_not_a_step() {
        assert!(parse_step_line("---> abc123def").is_none());
        assert!(parse_step_line("Removing intermediate container").is_none());
        assert!(parse_step_line("").is_none());
    }

    #[test]
    fn is_build_noise_filters_podman_internals() {
        assert!(is_build_noise("---> abc123def"));
        assert!(is_build_noise("--> Using cache abc123"));
        assert!(is_build_noise("COMMIT tierbox/demo:0123456789ab"));
        assert!(!is_build_noise("Setting up jq (1.7.1-3build1) ..."));
        assert!(!is_build_noise(""));
    }

    #[test]
    fn truncate_is_char_safe() {
        let long = "é".repeat(80);
        let short = truncate(&long);
        assert_eq!(short.chars().count(), 60);
        assert!(short.ends_with("..."));
        assert_eq!(truncate("ok"), "ok");
    }

    #[test]
    fn reporter_non_interactive() {
        let ctx = UiContext::non_interactive();
        let reporter = BuildReporter::new(&ctx);
        let image = ImageReference::new("tierbox-base", "python");

        reporter.build_started(&image, Tier::Base);
        reporter.build_output("STEP 1/3: FROM ubuntu:24.04".to_string());
        reporter.build_output("---> abc123".to_string());
        reporter.build_finished(&image, Tier::Base, true);
        assert!(reporter.current.lock().unwrap().is_none());

        // Output without a running build is ignored
        reporter.build_output("stray".to_string());
    }
}
