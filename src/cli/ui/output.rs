use console::style;

use crate::types::ResponseStatus;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        eprintln!("{} {}", style("ℹ").blue(), message);
    }

    /// One-line summary of a service response on stderr
    pub fn status(&self, status: ResponseStatus, message: &str) {
        match status {
            ResponseStatus::Ok => self.success(message),
            ResponseStatus::NothingToCommit => self.warning(message),
            ResponseStatus::Failed => self.error(message),
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
