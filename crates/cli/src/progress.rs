//! Cargo-style progress output for neocli
//!
//! Displays transfers in the familiar cargo format:
//! ```text
//!    Uploading site/ ...
//!     Uploaded 42 files in 3.2s
//!      Skipped 2 files the service rejects
//! ```

use std::io::Write as _;
use std::time::{Duration, Instant};

use neocli_core::BatchReport;

/// Status verbs for cargo-style output (right-aligned to 12 chars)
struct Status;

impl Status {
    const UPLOADING: &str = "Uploading";
    const DOWNLOADING: &str = "Downloading";
    const DELETING: &str = "Deleting";
    const SKIPPED: &str = "Skipped";
}

/// Print a cargo-style status line
fn print_status(status: &str, message: &str) {
    let mut term = console::Term::stderr();
    let style = console::Style::new().green().bold();
    let _ = writeln!(term, "{:>12} {}", style.apply_to(status), message);
}

fn elapsed_str(start: Instant) -> String {
    let elapsed = start.elapsed();
    if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}

/// Tracker for one transfer: a spinner while the blocking requests run,
/// then a cargo-style summary line.
pub struct TransferProgress {
    start: Instant,
    bar: indicatif::ProgressBar,
}

impl TransferProgress {
    fn start(verb: &'static str, subject: &str) -> Self {
        let bar = indicatif::ProgressBar::new_spinner();
        bar.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg:>12} {prefix}")
                .expect("valid template"),
        );
        bar.set_message(verb);
        bar.set_prefix(format!("{subject}..."));
        bar.enable_steady_tick(Duration::from_millis(80));
        Self {
            start: Instant::now(),
            bar,
        }
    }

    pub fn uploading(subject: &str) -> Self {
        Self::start(Status::UPLOADING, subject)
    }

    pub fn downloading(subject: &str) -> Self {
        Self::start(Status::DOWNLOADING, subject)
    }

    pub fn deleting(subject: &str) -> Self {
        Self::start(Status::DELETING, subject)
    }

    /// Clear the spinner without a summary (the caller reports the error).
    pub fn clear(self) {
        self.bar.finish_and_clear();
    }

    /// Summary for a clean batch.
    pub fn finish(self, done_verb: &str, report: &BatchReport) {
        self.bar.finish_and_clear();
        if report.skipped > 0 {
            print_status(
                Status::SKIPPED,
                &format!("{} files the service rejects", report.skipped),
            );
        }
        print_status(
            done_verb,
            &format!("{} files in {}", report.succeeded, elapsed_str(self.start)),
        );
    }

    /// Summary for a single count, where the batch detail doesn't apply.
    pub fn finish_count(self, done_verb: &str, count: usize) {
        self.bar.finish_and_clear();
        print_status(
            done_verb,
            &format!("{count} paths in {}", elapsed_str(self.start)),
        );
    }

    /// Summary for a batch that had failures; lists each failed item.
    pub fn fail(self, report: &BatchReport) {
        self.bar.finish_and_clear();
        let mut term = console::Term::stderr();
        let red = console::Style::new().red().bold();
        for failure in &report.failures {
            let _ = writeln!(
                term,
                "{:>12} {}: {}",
                red.apply_to("Failed"),
                failure.path,
                failure.reason
            );
        }
        let yellow = console::Style::new().yellow().bold();
        let mut summary = format!(
            "{} successful, {} failed in {}",
            report.succeeded,
            report.failures.len(),
            elapsed_str(self.start)
        );
        if report.stopped_early {
            summary.push_str(" (stopped early)");
        }
        let _ = writeln!(term, "{:>12} {}", yellow.apply_to("Finished"), summary);
    }
}
