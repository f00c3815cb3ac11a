//! Structured progress reporting for indexing runs.
//!
//! An indexing run emits `scan`, `embed`, `index` and `done` events; the CLI
//! renders them, library callers usually pass [`ProgressReporter::noop`].

use std::sync::Arc;
use std::time::Instant;

/// Progress event emitted during an indexing run.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Phase of the run: "scan", "embed", "index", "done"
    pub phase: String,

    /// Files (or chunks) processed so far
    pub current: u64,

    /// Total expected work (if known)
    pub total: Option<u64>,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: Option<f64>,

    /// Human-readable message
    pub message: String,

    /// Elapsed time since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(
        phase: impl Into<String>,
        current: u64,
        total: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        let percentage =
            total.map(|t| if t > 0 { (current as f64 / t as f64) * 100.0 } else { 0.0 });

        Self {
            phase: phase.into(),
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => format!("{}", self.current),
        };

        let pct = match self.percentage {
            Some(p) => format!(" ({:.0}%)", p),
            None => String::new(),
        };

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress reporter that emits events through a callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Arc<Instant>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.callback.is_some())
            .finish()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Arc::new(Instant::now()),
        }
    }

    /// Create a no-op reporter (no events emitted).
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Arc::new(Instant::now()),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.callback {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let event = event.with_elapsed(elapsed);

            tracing::debug!(
                phase = %event.phase,
                current = event.current,
                total = ?event.total,
                message = %event.message,
                elapsed_secs = elapsed,
                "Progress event"
            );

            callback(event);
        }
    }

    /// Source files discovered under the run's roots.
    pub fn scan(&self, files_found: u64, roots: usize) {
        self.emit(ProgressEvent::new(
            "scan",
            files_found,
            None,
            format!("{} files found under {} roots", files_found, roots),
        ));
    }

    /// A batch of files is being chunked and embedded.
    pub fn embed(&self, current: u64, total: u64, batch_size: usize) {
        self.emit(ProgressEvent::new(
            "embed",
            current,
            Some(total),
            format!("embedding batch of {} files", batch_size),
        ));
    }

    /// A batch finished and its chunks are in the store.
    pub fn index(&self, current: u64, total: u64, chunks_indexed: u64) {
        self.emit(ProgressEvent::new(
            "index",
            current,
            Some(total),
            format!("{} chunks indexed", chunks_indexed),
        ));
    }

    pub fn done(&self, files_indexed: u64, files_failed: u64) {
        self.emit(ProgressEvent::new(
            "done",
            files_indexed,
            None,
            format!("{} files indexed, {} failed", files_indexed, files_failed),
        ));
    }
}
