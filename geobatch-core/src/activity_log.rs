use std::collections::VecDeque;

/// Number of lines kept when no explicit window is requested
pub const DEFAULT_WINDOW: usize = 20;

/// Append-only progress log with a bounded display window
///
/// Every line is mirrored to the `log` facade, so nothing is lost when the
/// window drops old entries.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    /// Maximum number of lines kept for display
    window: usize,
    /// Retained lines (oldest first)
    lines: VecDeque<String>,
    /// Lines recorded over the lifetime of the log
    total: usize,
}

impl ActivityLog {
    /// Create a log that keeps the most recent `window` lines
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            lines: VecDeque::new(),
            total: 0,
        }
    }

    /// Append a line
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::info!("{}", line);

        self.lines.push_back(line);
        self.total += 1;

        while self.lines.len() > self.window {
            self.lines.pop_front();
        }
    }

    /// Retained lines, oldest first
    pub fn recent(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Most recent line, if any
    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Count of every line ever pushed, including those outside the window
    pub fn total_recorded(&self) -> usize {
        self.total
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
