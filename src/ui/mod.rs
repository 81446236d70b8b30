//! UI module for consistent CLI output
//!
//! Uses `cliclack` for steps, spinners and prompts and `indicatif` for
//! image build progress, with automatic fallback to plain output in
//! CI/non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use tierbox::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//!
//! ui::intro(&ctx, "Cleaning demo");
//! if ui::confirm(&ctx, "Remove 2 images?", true).await? {
//!     ui::step_ok(&ctx, "Removed tierbox/demo:0123456789ab");
//! }
//! ui::outro_success(&ctx, "Clean complete");
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, outro_success, outro_warn, remark, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn,
};
pub use progress::{BuildProgress, BuildReporter, TaskSpinner};
pub use prompts::confirm;
