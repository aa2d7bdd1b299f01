//! `dl config`: merge flags into the persisted configuration.

use anyhow::{anyhow, Result};
use dl_core::classify::parse_assignment;
use dl_core::config::{self, ConfigUpdate};
use std::path::{Path, PathBuf};

use crate::cli::ConfigArgs;

/// "." means the working directory.
pub(crate) fn expand_dot(path: &Path, cwd: &Path) -> PathBuf {
    if path == Path::new(".") {
        cwd.to_path_buf()
    } else {
        path.to_path_buf()
    }
}

pub(crate) fn build_update(args: &ConfigArgs, cwd: &Path) -> Result<ConfigUpdate> {
    let sub_dir_map = args
        .subpath
        .as_deref()
        .map(parse_assignment)
        .transpose()
        .map_err(|e| anyhow!("invalid --subpath: {}", e))?;
    Ok(ConfigUpdate {
        directory: args.path.as_deref().map(|p| expand_dot(p, cwd)),
        concurrency: args.concurrent,
        auto_update: args.auto_update,
        sub_dir_map,
    })
}

/// Applies `args` to the file at `path`. Returns the rendered TOML when
/// `--debug` asks for it.
pub fn run_config(args: &ConfigArgs, path: &Path, cwd: &Path) -> Result<Option<String>> {
    let mut cfg = config::load_or_init_at(path)?;
    let update = build_update(args, cwd)?;
    if cfg.merge(update) {
        cfg.save_to(path)?;
        tracing::info!(path = %path.display(), "configuration updated");
    } else {
        tracing::debug!("configuration unchanged");
    }
    if args.debug {
        return Ok(Some(cfg.to_toml_string()?));
    }
    Ok(None)
}
