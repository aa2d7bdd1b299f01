//! Terminal progress rendering (indicatif) and the final summary.

use std::time::Duration;

use dl_core::progress::{ProgressSink, ProgressSnapshot};
use dl_core::DownloadOutcome;
use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{prefix} {bar:32.cyan/blue} {bytes:>10}/{total_bytes:<10} {msg}";
const SPINNER_TEMPLATE: &str = "{prefix} {spinner} {bytes} {msg}";

fn style(template: &str, fallback: fn() -> ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| fallback())
}

fn chunk_prefix(done: usize, total: usize) -> String {
    format!("[{}/{}]", done, total)
}

/// Rate, percentage and ETA computed from the job's own counters.
pub(crate) fn status_line(snapshot: &ProgressSnapshot) -> String {
    let rate = format!("{}/s", HumanBytes(snapshot.bytes_per_sec() as u64));
    match snapshot.fraction() {
        Some(fraction) => {
            let eta = snapshot
                .eta()
                .map(|eta| HumanDuration(eta).to_string())
                .unwrap_or_else(|| "--".to_string());
            format!("{:>3.0}% {} ETA {}", fraction * 100.0, rate, eta)
        }
        None => rate,
    }
}

/// Byte bar with a `[done/N]` chunk prefix, or a spinner when the size is unknown.
#[derive(Default)]
pub struct TerminalProgress {
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for TerminalProgress {
    fn start(&mut self, total_bytes: Option<u64>, chunk_count: usize) {
        let bar = match total_bytes {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(style(BAR_TEMPLATE, ProgressStyle::default_bar).progress_chars("=> "));
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(style(SPINNER_TEMPLATE, ProgressStyle::default_spinner));
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        };
        bar.set_prefix(chunk_prefix(0, chunk_count));
        self.bar = Some(bar);
    }

    fn update(&mut self, snapshot: &ProgressSnapshot) {
        if let Some(bar) = &self.bar {
            bar.set_position(snapshot.bytes_done);
            bar.set_prefix(chunk_prefix(snapshot.chunks_done, snapshot.chunk_count));
            bar.set_message(status_line(snapshot));
        }
    }

    fn finish(&mut self, snapshot: &ProgressSnapshot, succeeded: bool) {
        if let Some(bar) = self.bar.take() {
            bar.set_position(snapshot.bytes_done);
            bar.set_prefix(chunk_prefix(snapshot.chunks_done, snapshot.chunk_count));
            bar.set_message(status_line(snapshot));
            if succeeded {
                bar.finish();
            } else {
                bar.abandon();
            }
        }
    }
}

/// Multi-line summary printed after a successful download.
pub fn render_summary(outcome: &DownloadOutcome) -> String {
    let location = outcome
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    format!(
        "\nFile name: {}\nFile size: {}\nTime elapsed: {:.2?}\nLocation: {}",
        outcome.file_name,
        HumanBytes(outcome.file_size()),
        outcome.elapsed,
        location
    )
}
