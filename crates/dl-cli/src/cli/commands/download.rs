//! `dl --url <URL>`: run one download with live progress.

use anyhow::Result;
use dl_core::config::DlConfig;
use dl_core::notify::{DesktopNotifier, Notifier};
use dl_core::transport::CurlTransport;
use dl_core::{DownloadOptions, DownloadOutcome, Downloader};
use indicatif::HumanBytes;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::config::expand_dot;
use crate::cli::progress::{render_summary, TerminalProgress};
use crate::cli::signal::interrupted;
use crate::cli::{DownloadArgs, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_OK};

/// Flags win over config. Classification subfolders apply only when the
/// directory comes from config and no explicit name was given.
pub(crate) fn resolve_options(
    args: &DownloadArgs,
    cfg: &DlConfig,
    cwd: &Path,
) -> Result<DownloadOptions> {
    let url = args.url.as_deref().unwrap_or_default().trim();
    let explicit_dir = args.path.as_deref().map(|p| expand_dot(p, cwd));
    let classify = explicit_dir.is_none() && args.name.is_none() && cfg.directory.is_some();
    let directory = explicit_dir
        .or_else(|| cfg.directory.clone())
        .unwrap_or_else(|| cwd.to_path_buf());

    let mut builder = DownloadOptions::builder(url)
        .directory(directory)
        .concurrency(args.concurrent.unwrap_or(cfg.concurrency))
        .classification(classify.then(|| cfg.sub_dir_map.clone()))
        .retry_policy(cfg.retry_policy())
        .progress_interval(cfg.progress_interval());
    if let Some(name) = &args.name {
        builder = builder.file_name(name.clone());
    }
    Ok(builder.build()?)
}

pub(crate) fn report(outcome: &DownloadOutcome, debug: bool, notifier: &dyn Notifier) -> i32 {
    if outcome.was_cancelled() {
        println!("\nOperation cancelled!");
        return EXIT_INTERRUPTED;
    }
    if !outcome.succeeded() {
        println!("\nDownload failed");
        if debug {
            for e in &outcome.errors {
                eprintln!("Error: {}", e);
            }
        }
        return EXIT_FAILURE;
    }

    println!("{}", render_summary(outcome));
    notifier.notify(
        "Download complete!",
        &format!(
            "File: {} ({})",
            outcome.file_name,
            HumanBytes(outcome.file_size())
        ),
    );
    EXIT_OK
}

pub async fn run_download(args: &DownloadArgs, cfg: &DlConfig, cwd: &Path) -> Result<i32> {
    if cfg.auto_update {
        tracing::info!("auto_update is set in config but ignored; dl does not update itself");
    }
    let options = resolve_options(args, cfg, cwd)?;
    tracing::debug!(?options, "resolved download options");

    let downloader = Downloader::new(Arc::new(CurlTransport::new()));
    let interrupt = CancellationToken::new();
    let progress = Box::new(TerminalProgress::new());

    tokio::select! {
        outcome = downloader.run(&options, progress, &interrupt) => {
            Ok(report(&outcome, args.debug, &DesktopNotifier::new()))
        }
        signal = interrupted() => {
            interrupt.cancel();
            tracing::warn!(signal, "download interrupted");
            println!("\nOperation cancelled!");
            Ok(EXIT_INTERRUPTED)
        }
    }
}
