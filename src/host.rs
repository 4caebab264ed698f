//! Interfaces to the host environment (progress, prompts, notices) and the
//! terminal implementations the CLI uses.

use std::io::{BufRead as _, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::ResourceDescriptor;

/// Shared flag a long scan polls to learn that its caller went away.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        return self.0.load(Ordering::SeqCst);
    }
}

/// User-facing outcome messages.
pub trait Notifier {
    /// A failure the user must see.
    fn error(&mut self, message: &str);
    /// A neutral outcome, e.g. a completed rewrite or a cancelled prompt.
    fn info(&mut self, message: &str);
    /// Something degraded but not fatal.
    fn warn(&mut self, message: &str);
}

/// Receives progress during long scans.
pub trait ProgressSink {
    /// `percent` is in `0..=100`.
    fn report(&mut self, percent: u8, message: &str);
}

/// Asks the user to choose one resource.
pub trait Prompt {
    /// Index into `candidates`, or `None` if the user cancelled.
    fn pick_one(&mut self, candidates: &[ResourceDescriptor], prompt: &str) -> Option<usize>;
}

/// Progress sink that drops everything.
#[cfg(test)]
pub struct NoProgress;

#[cfg(test)]
impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8, _message: &str) {}
}

/// Integer percentage of `done` out of `total`, clamped to 100.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let scaled = done.saturating_mul(100).checked_div(total).unwrap_or(100);
    return u8::try_from(scaled.min(100)).unwrap_or(100);
}

// ── Terminal implementations ──────────────────────────────────────────

/// Progress lines on stderr; silent when `quiet`.
pub struct StderrProgress {
    /// Suppress output (e.g. for JSON mode).
    pub quiet: bool,
}

impl ProgressSink for StderrProgress {
    fn report(&mut self, percent: u8, message: &str) {
        if !self.quiet {
            eprintln!("[{percent:>3}%] {message}");
        }
    }
}

/// Notices on stderr, prefixed by severity.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }

    fn info(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn warn(&mut self, message: &str) {
        eprintln!("warning: {message}");
    }
}

/// Numbered list on stderr, answer read from stdin. Empty input or EOF cancels.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn pick_one(&mut self, candidates: &[ResourceDescriptor], prompt: &str) -> Option<usize> {
        eprintln!("{prompt}");
        for (i, candidate) in candidates.iter().enumerate() {
            eprintln!(
                "  {:>4}  {}  {}  ({})",
                i.saturating_add(1),
                candidate.display_name,
                candidate.guid,
                candidate.path.display()
            );
        }
        eprint!("number (empty to cancel): ");
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer).ok()?;
        return parse_choice(&answer, candidates.len());
    }
}

/// Parse a 1-based choice; anything out of range or non-numeric cancels.
fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let number: usize = answer.trim().parse().ok()?;
    let index = number.checked_sub(1)?;
    return (index < count).then_some(index);
}
