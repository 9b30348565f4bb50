//! Progress rendering for the long entry loops.
//!
//! Backfill and rebuild iterate hundreds of entries with a network call
//! each; a bar makes that bearable interactively, and `--log-only`
//! hides it so scheduled runs produce clean, tail-friendly logs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Set from `--log-only` in main before any bar is created.
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Bounded progress over a known number of entries.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if is_log_only() {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.green/dim}] {pos}/{len} ({eta})")
                .unwrap()
                .progress_chars("=> "),
        );
    }
    bar.set_message(msg.to_string());
    bar
}

/// Spinner for work with no known length (page fetches).
pub fn create_spinner(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if is_log_only() {
        spinner.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg} [{elapsed}]")
                .unwrap(),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
    }
    spinner.set_message(msg.to_string());
    spinner
}

/// Compact human form of a run duration for the closing log line.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_format_compactly() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }
}
