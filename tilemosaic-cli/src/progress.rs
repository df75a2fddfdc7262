//! Terminal progress display for grid fetches.

use indicatif::{ProgressBar, ProgressStyle};
use tilemosaic::orchestrator::{Phase, ProgressObserver};

const TEMPLATE: &str = "{msg:>8} [{bar:40.cyan/blue}] {pos}/{len} tiles ({eta})";

/// Progress bar driven by orchestrator events.
///
/// The bar is reset at every fetch pass, so pass 2 shows only the retried
/// tiles.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(0);
        bar.set_style(style);
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Prints a line above the bar.
    pub fn println(&self, message: impl AsRef<str>) {
        self.bar.println(message);
    }

    /// Clears the bar once a request is over.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BarProgress {
    fn on_phase(&self, phase: Phase, total: usize) {
        match phase {
            Phase::FetchPass1 | Phase::FetchPass2 => {
                self.bar.set_length(total as u64);
                self.bar.set_position(0);
                self.bar.reset_eta();
            }
            Phase::ComputeGrid | Phase::Abort | Phase::Finalize => {}
        }
        self.bar.set_message(phase.to_string());
    }

    fn on_tile_finished(&self, _ok: bool) {
        self.bar.inc(1);
    }
}
