//! Output formatting and display utilities
//!
//! This module handles:
//! - Draining the run log channel on the foreground task
//! - Colour coding lines by severity
//! - Holding output back when auto-scroll is off
//! - Status captions and script tables

use crate::core::catalog::ScriptEntry;
use crate::core::log::{LogEvent, LogLine, LogReceiver, LogView, Severity, StatusChange};
use crate::core::preferences::Preferences;
use colored::Colorize;
use prettytable::{format, row, Table};
use std::io::{self, Write};
use std::path::Path;

/// Render a line with colours for its severity and an optional stamp
pub fn paint(line: &LogLine, show_timestamps: bool) -> String {
    let text = match line.severity {
        Severity::Error => line.text.red().to_string(),
        Severity::Success => line.text.green().to_string(),
        Severity::Info => line.text.blue().to_string(),
        Severity::Plain => line.text.clone(),
    };
    if show_timestamps {
        format!("{} {}", format!("[{}]", line.stamp()).dimmed(), text)
    } else {
        text
    }
}

/// Terminal front of the log view
///
/// With auto-scroll on every line is written as it arrives. With it off,
/// lines collect in the view and are written when the run ends.
pub struct Console<W: Write> {
    view: LogView,
    out: W,
    printed: usize,
    quiet: bool,
}

impl Console<io::Stdout> {
    pub fn stdout(prefs: &Preferences, quiet: bool) -> Self {
        Self::new(prefs, quiet, io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(prefs: &Preferences, quiet: bool, out: W) -> Self {
        Self {
            view: LogView::new(prefs.show_timestamps, prefs.auto_scroll),
            out,
            printed: 0,
            quiet,
        }
    }

    pub fn view(&self) -> &LogView {
        &self.view
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Append a message from the shell itself
    pub fn log(&mut self, text: impl Into<String>, severity: Severity) {
        self.view.append(text, severity);
        self.flush_visible();
    }

    /// Apply one event from a run
    pub fn apply(&mut self, event: LogEvent) {
        match event {
            LogEvent::Status(status) => {
                self.show_status(&status);
                self.view.apply(LogEvent::Status(status));
            }
            line @ LogEvent::Line(_) => {
                self.view.apply(line);
                self.flush_visible();
            }
        }
    }

    /// Apply events until every sender is gone, then show anything held back
    pub async fn drain(&mut self, mut rx: LogReceiver) {
        while let Some(event) = rx.recv().await {
            self.apply(event);
        }
        self.finish();
    }

    /// Empty the view, wiping the terminal when it is styled
    pub fn clear(&mut self) {
        if colored::control::SHOULD_COLORIZE.should_colorize() {
            let _ = write!(self.out, "\x1b[2J\x1b[H");
        }
        self.view.clear();
        self.printed = 0;
        self.flush_visible();
    }

    /// Write the whole buffer as plain text to `path`
    pub fn save_transcript(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.view.text())
    }

    /// Scroll to the end and write all remaining lines
    pub fn finish(&mut self) {
        self.view.scroll_to_end();
        self.flush_visible();
    }

    fn flush_visible(&mut self) {
        let end = self.view.viewport_end();
        if end <= self.printed {
            return;
        }
        let show_timestamps = self.view.show_timestamps();
        for line in &self.view.lines()[self.printed..end] {
            // A closed stdout (e.g. `| head`) must not abort the run
            let _ = writeln!(self.out, "{}", paint(line, show_timestamps));
        }
        let _ = self.out.flush();
        self.printed = end;
    }

    fn show_status(&self, status: &StatusChange) {
        if self.quiet {
            return;
        }
        let marker = if status.busy { "..." } else { "--" };
        eprintln!("{}", format!("{marker} {}", status.caption).dimmed());
    }
}

/// Build the catalog listing table
pub fn script_table(entries: &[ScriptEntry]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.set_titles(row![b->"Script Name", b->"Last Modified", b->"Size (KB)"]);
    for entry in entries {
        table.add_row(row![
            entry.name,
            entry.modified_display(),
            r->entry.size_kb_display()
        ]);
    }
    table
}
