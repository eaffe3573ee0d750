//! Log sink and status surface
//!
//! Worker tasks never touch the view directly. They hold a [`LogSink`] and
//! send [`LogEvent`]s over a channel; the foreground owner drains the channel
//! into a [`LogView`].

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::trace;

/// Visual classification of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Error,
    Plain,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
            Self::Plain => "plain",
        }
    }
}

/// One line of the output log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    pub severity: Severity,
    /// Wall-clock time the line was produced
    pub timestamp: DateTime<Local>,
}

impl LogLine {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
            timestamp: Local::now(),
        }
    }

    /// `HH:MM:SS` stamp shown in front of the message
    pub fn stamp(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Busy indicator plus one-line caption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub busy: bool,
    pub caption: String,
}

/// Message carried from worker tasks to the foreground
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Line(LogLine),
    Status(StatusChange),
}

/// Sending half handed to runs and reader tasks
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: mpsc::UnboundedSender<LogEvent>,
}

/// Receiving half drained by the foreground
pub type LogReceiver = mpsc::UnboundedReceiver<LogEvent>;

/// Create a connected sink and receiver
pub fn channel() -> (LogSink, LogReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LogSink { tx }, rx)
}

impl LogSink {
    fn send(&self, event: LogEvent) {
        if self.tx.send(event).is_err() {
            trace!("Log receiver dropped, discarding event");
        }
    }

    pub fn append(&self, text: impl Into<String>, severity: Severity) {
        self.send(LogEvent::Line(LogLine::new(text, severity)));
    }

    pub fn info(&self, text: impl Into<String>) {
        self.append(text, Severity::Info);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.append(text, Severity::Success);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.append(text, Severity::Error);
    }

    pub fn plain(&self, text: impl Into<String>) {
        self.append(text, Severity::Plain);
    }

    /// Toggle the busy indicator and replace the status caption
    pub fn set_busy(&self, busy: bool, caption: impl Into<String>) {
        self.send(LogEvent::Status(StatusChange {
            busy,
            caption: caption.into(),
        }));
    }
}

/// Foreground-owned log buffer and status surface
#[derive(Debug, Clone)]
pub struct LogView {
    lines: Vec<LogLine>,
    show_timestamps: bool,
    auto_scroll: bool,
    /// Index one past the last line the viewer is positioned at
    viewport_end: usize,
    status: StatusChange,
}

impl LogView {
    pub fn new(show_timestamps: bool, auto_scroll: bool) -> Self {
        Self {
            lines: Vec::new(),
            show_timestamps,
            auto_scroll,
            viewport_end: 0,
            status: StatusChange {
                busy: false,
                caption: "Ready".to_string(),
            },
        }
    }

    /// Apply one event, returning the line that was appended, if any
    pub fn apply(&mut self, event: LogEvent) -> Option<&LogLine> {
        match event {
            LogEvent::Line(line) => Some(self.push(line)),
            LogEvent::Status(status) => {
                self.status = status;
                None
            }
        }
    }

    pub fn append(&mut self, text: impl Into<String>, severity: Severity) -> &LogLine {
        self.push(LogLine::new(text, severity))
    }

    fn push(&mut self, line: LogLine) -> &LogLine {
        self.lines.push(line);
        if self.auto_scroll {
            self.viewport_end = self.lines.len();
        }
        &self.lines[self.lines.len() - 1]
    }

    /// Drop every line and note the clear in the fresh buffer
    pub fn clear(&mut self) {
        self.lines.clear();
        self.viewport_end = 0;
        self.append("Output cleared", Severity::Info);
    }

    /// Move the viewport to the newest line
    pub fn scroll_to_end(&mut self) {
        self.viewport_end = self.lines.len();
    }

    /// Render a line as plain text, with the stamp when enabled
    pub fn render_plain(&self, line: &LogLine) -> String {
        if self.show_timestamps {
            format!("[{}] {}", line.stamp(), line.text)
        } else {
            line.text.clone()
        }
    }

    /// The whole buffer as text, one line per entry
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&self.render_plain(line));
            out.push('\n');
        }
        out
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn viewport_end(&self) -> usize {
        self.viewport_end
    }

    pub fn status(&self) -> &StatusChange {
        &self.status
    }

    pub fn show_timestamps(&self) -> bool {
        self.show_timestamps
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }
}
