//! Container launch assembly

mod builder;
mod spec;

pub use builder::{expand_home, HostContext, LaunchMode, LaunchSpecBuilder, CONTAINER_HOSTNAME};
pub use spec::{LaunchSpec, Mount, MountMode};
