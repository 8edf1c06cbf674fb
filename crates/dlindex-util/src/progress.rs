use std::io::Write;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

fn status_line(style: Style, label: &str, message: &str) {
    let _ = writeln!(
        std::io::stderr(),
        "{:>12} {message}",
        style.apply_to(label),
    );
}

/// Print a Cargo-style status line: `   Uploading cli/index.html`
///
/// The `label` is right-aligned to 12 characters and printed in bold green.
pub fn status(label: &str, message: &str) {
    status_line(Style::new().green().bold(), label, message);
}

/// Like [`status`] but bold cyan, for informational (non-action) lines.
pub fn status_info(label: &str, message: &str) {
    status_line(Style::new().cyan().bold(), label, message);
}

/// Warning-style status line (bold yellow label).
pub fn status_warn(label: &str, message: &str) {
    status_line(Style::new().yellow().bold(), label, message);
}

/// Error-style status line (bold red label).
pub fn status_error(label: &str, message: &str) {
    status_line(Style::new().red().bold(), label, message);
}

/// Animated spinner for indeterminate work such as bucket listing.
///
/// Hidden when stderr is not a terminal so CI logs stay clean.
pub fn spinner(message: &str) -> ProgressBar {
    if !console::Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
