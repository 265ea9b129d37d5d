use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

pub fn print_banner() {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr);
    let _ = writeln!(
        stderr,
        "  \x1b[1mmpretrain\x1b[0m {} — molecular pretraining pipeline",
        env!("CARGO_PKG_VERSION")
    );
    let _ = writeln!(stderr);
}

pub fn print_error(err: &anyhow::Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "\x1b[31m✗ error:\x1b[0m {err}");
    for cause in err.chain().skip(1) {
        let _ = writeln!(stderr, "    \x1b[2mcaused by:\x1b[0m {cause}");
    }
}

/// Spinner for long-running pipeline stages; silent when quiet or when
/// stderr is not a terminal.
pub enum Progress {
    Interactive { bar: ProgressBar, start: Instant },
    Silent,
}

impl Progress {
    pub fn new(quiet: bool) -> Self {
        if quiet || !io::stderr().is_terminal() {
            return Self::Silent;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .expect("invalid template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Self::Interactive {
            bar,
            start: Instant::now(),
        }
    }

    pub fn update(&self, message: String) {
        if let Self::Interactive { bar, .. } = self {
            bar.set_message(message);
        }
    }

    pub fn finish(self) -> Duration {
        match self {
            Self::Interactive { bar, start } => {
                bar.finish_and_clear();
                start.elapsed()
            }
            Self::Silent => Duration::ZERO,
        }
    }
}
