//! Step and banner output
//!
//! Fancy mode renders through cliclack. Plain mode writes tagged lines to
//! stderr so the agent's own stdout is never interleaved with ours.

use super::context::UiContext;
use console::{style, StyledObject};

/// Severity of a reported step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Ok,
    Info,
    Warn,
    Fail,
}

impl Level {
    fn tag(self) -> StyledObject<&'static str> {
        match self {
            Self::Ok => style("[OK]").green(),
            Self::Info => style("[INFO]").cyan(),
            Self::Warn => style("[WARN]").yellow(),
            Self::Fail => style("[FAIL]").red(),
        }
    }
}

fn step(ctx: &UiContext, level: Level, message: &str) {
    if ctx.use_fancy_output() {
        let _ = match level {
            Level::Ok => cliclack::log::success(message),
            Level::Info => cliclack::log::info(message),
            Level::Warn => cliclack::log::warning(message),
            Level::Fail => cliclack::log::error(message),
        };
    } else {
        eprintln!("  {} {}", level.tag(), message);
    }
}

/// Open a command's output block
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::intro(style(title).magenta().bold());
    } else {
        eprintln!("{}", style(title).magenta().bold());
    }
}

/// Close the block on success
pub fn outro_success(ctx: &UiContext, message: &str) {
    outro(ctx, Level::Ok, style(message).green().bold());
}

/// Close the block with a warning
pub fn outro_warn(ctx: &UiContext, message: &str) {
    outro(ctx, Level::Warn, style(message).yellow().bold());
}

fn outro(ctx: &UiContext, level: Level, message: StyledObject<&str>) {
    if ctx.use_fancy_output() {
        let _ = cliclack::outro(message);
    } else {
        eprintln!("{} {}", level.tag(), message);
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Level::Ok, message);
}

/// Success with a dimmed detail, typically an image reference or path
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    step(ctx, Level::Ok, &format!("{} ({})", message, style(detail).dim()));
}

pub fn step_info(ctx: &UiContext, message: &str) {
    step(ctx, Level::Info, message);
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    step(ctx, Level::Warn, message);
}

pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    step(ctx, Level::Fail, &format!("{}: {}", message, style(detail).red()));
}

/// Dimmed follow-up hint
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::log::remark(message);
    } else {
        eprintln!("  {}", style(message).dim());
    }
}
