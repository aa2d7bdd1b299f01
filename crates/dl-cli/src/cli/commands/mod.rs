//! CLI command handlers, one per file.

mod completions;
mod config;
mod download;

pub use completions::{run_completions, run_version};
pub use config::run_config;
pub use download::run_download;

#[cfg(test)]
pub(crate) use config::build_update;
#[cfg(test)]
pub(crate) use download::{report, resolve_options};
