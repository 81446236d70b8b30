//! tierbox - cached development containers for AI coding agents
//!
//! Builds a shared per-language base image and a per-project image on
//! top of it, reusing both until the project configuration changes.

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod launch;
pub mod orchestration;
pub mod state;
pub mod ui;

#[cfg(test)]
mod testing;

pub use error::{TierboxError, TierboxResult};
