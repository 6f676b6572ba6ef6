use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const BAR_WIDTH: usize = 30;
const REFRESH: Duration = Duration::from_millis(100);

/// Batch counters shared between the workers and the progress line.
pub struct ProgressState {
    pub label: String,
    pub total: usize,
    pub completed: AtomicUsize,
    pub skipped: AtomicUsize,
    pub failed: AtomicUsize,
    pub done: AtomicBool,
    pub start_time: Instant,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    completed: usize,
    skipped: usize,
    failed: usize,
    done: bool,
}

impl ProgressState {
    pub fn new(label: impl Into<String>, total: usize) -> Self {
        Self {
            label: label.into(),
            total,
            completed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            done: AtomicBool::new(false),
            start_time: Instant::now(),
        }
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn finish(&self) {
        self.done.store(true, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            completed: self.completed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            done: self.done.load(Ordering::Relaxed),
        }
    }
}

/// Whole seconds as `m:ss`.
fn clock(secs: f64) -> String {
    let secs = secs.max(0.0).round() as u64;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn bar(completed: usize, total: usize) -> String {
    let filled = match total {
        0 => BAR_WIDTH,
        _ => completed.min(total) * BAR_WIDTH / total,
    };
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn render_line(state: &ProgressState) -> String {
    let snap = state.snapshot();
    let elapsed = state.start_time.elapsed().as_secs_f64();
    let mut line = format!(
        "\r{} {} {}/{} ({} skipped, {} failed) {}",
        state.label,
        bar(snap.completed, state.total),
        snap.completed,
        state.total,
        snap.skipped,
        snap.failed,
        clock(elapsed),
    );
    if snap.done {
        line.push_str("\x1b[K\n");
    } else {
        if snap.completed > 0 && snap.completed < state.total {
            let eta = elapsed / snap.completed as f64 * (state.total - snap.completed) as f64;
            line.push_str(&format!(" eta {}", clock(eta)));
        }
        line.push_str("\x1b[K");
    }
    line
}

/// Redraw the progress line on stderr until `state.finish()` is called,
/// then draw it one last time. Join the handle after finishing.
pub fn spawn_progress_thread(state: Arc<ProgressState>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || loop {
        let finished = state.done.load(Ordering::Relaxed);
        let line = render_line(&state);
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
        drop(err);
        if finished {
            break;
        }
        std::thread::sleep(REFRESH);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_and_bar() {
        assert_eq!(clock(75.0), "1:15");
        assert_eq!(clock(4.4), "0:04");
        assert_eq!(bar(0, 4), format!("[{}]", ".".repeat(BAR_WIDTH)));
        assert_eq!(bar(4, 4), format!("[{}]", "#".repeat(BAR_WIDTH)));
        assert_eq!(bar(1, 2).matches('#').count(), BAR_WIDTH / 2);
        assert_eq!(bar(0, 0).matches('#').count(), BAR_WIDTH);
    }

    #[test]
    fn test_final_line() {
        let state = ProgressState::new("Promoting", 4);
        for _ in 0..4 {
            state.increment();
        }
        state.add_skipped();
        state.add_failure();
        state.finish();
        let line = render_line(&state);
        assert!(line.starts_with("\rPromoting ["));
        assert!(line.contains("4/4 (1 skipped, 1 failed)"));
        assert!(!line.contains("eta"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_thread_exits_after_finish() {
        let state = Arc::new(ProgressState::new("Promoting", 1));
        let handle = spawn_progress_thread(state.clone());
        state.increment();
        state.finish();
        assert!(handle.join().is_ok());
    }
}
