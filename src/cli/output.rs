//! CLI output formatting and the console listener

use crate::core::{FlowError, PipeResult};
use crate::execution::FlowListener;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Resolution of the per-pipe progress bar
const BAR_STEPS: u64 = 1000;

/// Create a progress bar tracking one pipe's completion
pub fn create_progress_bar() -> ProgressBar {
    let progress = ProgressBar::new(BAR_STEPS);
    if let Ok(bar_style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
    {
        progress.set_style(bar_style.progress_chars("#>-"));
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Seconds with millisecond precision
pub fn format_seconds(elapsed: Duration) -> String {
    format!("{:.3}", elapsed.as_secs_f64())
}

/// Format an error for display, prefixed with its kind
pub fn format_error(err: &FlowError) -> String {
    format!("{} {}: {}", CROSS, style(err.kind()).red(), err)
}

/// Renders run lifecycle events for a human.
///
/// Writing to stdout shows a progress bar for the running pipe; any other
/// writer gets the text lines only.
pub struct ConsoleListener {
    out: Mutex<Box<dyn Write + Send>>,
    bar: ProgressBar,
    width: usize,
    total: AtomicUsize,
    position: AtomicUsize,
}

impl ConsoleListener {
    pub fn stdout() -> Self {
        let width = term_size::dimensions_stdout().map(|(w, _)| w).unwrap_or(80);
        Self::build(Box::new(io::stdout()), create_progress_bar(), width)
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self::build(out, ProgressBar::hidden(), 40)
    }

    fn build(out: Box<dyn Write + Send>, bar: ProgressBar, width: usize) -> Self {
        Self {
            out: Mutex::new(out),
            bar,
            width: width.min(100),
            total: AtomicUsize::new(0),
            position: AtomicUsize::new(0),
        }
    }

    fn print(&self, line: String) {
        self.bar.suspend(|| {
            let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = writeln!(out, "{}", line);
            let _ = out.flush();
        });
    }

    fn separator(&self) -> String {
        "─".repeat(self.width)
    }
}

impl FlowListener for ConsoleListener {
    fn on_start(&self, order: &[String]) {
        self.total.store(order.len(), Ordering::SeqCst);
        self.position.store(0, Ordering::SeqCst);

        self.print(self.separator());
        self.print(format!("{}Running {} pipes in order:", ROCKET, order.len()));
        for (index, name) in order.iter().enumerate() {
            self.print(format!("  {}. {}", index + 1, style(name).cyan()));
        }
        self.print(self.separator());
    }

    fn on_start_generate(&self, pipe: &str) {
        let position = self.position.fetch_add(1, Ordering::SeqCst) + 1;
        self.bar.reset();
        self.bar.set_message(pipe.to_string());
        self.print(format!(
            "{}Running pipe #{} {}",
            SPINNER,
            position,
            style(pipe).bold()
        ));
    }

    fn on_progress(&self, _pipe: &str, fraction: f32) {
        self.bar.set_position((fraction * BAR_STEPS as f32) as u64);
    }

    fn on_finish_generate(&self, _pipe: &str, result: Option<&PipeResult>, elapsed: Duration) {
        self.bar.set_position(BAR_STEPS);
        let position = self.position.load(Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst).max(1);

        self.print(format!(
            "{}Finished pipe #{} in {} seconds",
            CHECK,
            position,
            format_seconds(elapsed)
        ));
        match result {
            Some(result) => self.print(format!("   produced {}", style(result).dim())),
            None => self.print("   no output".to_string()),
        }
        self.print(format!(
            "   Completed - {}% of all pipes",
            position * 100 / total
        ));
    }

    fn on_completion(&self, elapsed: Duration) {
        self.bar.finish_and_clear();
        self.print(self.separator());
        self.print(format!(
            "{}Finished in {} seconds or {:.2} minutes",
            INFO,
            format_seconds(elapsed),
            elapsed.as_secs_f64() / 60.0
        ));
    }
}
