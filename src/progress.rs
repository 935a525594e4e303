use std::io::Write;

/// Observes how far a fixture set has progressed. Never affects control flow.
pub trait ProgressReporter: Send + Sync {
    fn update(&self, set: &str, processed: usize, total: usize);

    fn finish(&self, set: &str);
}

/// Rewrites a single stderr line in place, e.g. `Testing add.json proof 3/10`.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ProgressReporter for ConsoleProgress {
    fn update(&self, set: &str, processed: usize, total: usize) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", progress_line(set, processed, total));
        let _ = stderr.flush();
    }

    fn finish(&self, _set: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[2K");
        let _ = stderr.flush();
    }
}

#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn update(&self, _set: &str, _processed: usize, _total: usize) {}

    fn finish(&self, _set: &str) {}
}

fn progress_line(set: &str, processed: usize, total: usize) -> String {
    format!("Testing {} proof {}/{} ", set, processed, total)
}
