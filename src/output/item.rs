//! Messages flowing through the output pipeline.

use crossterm::style::Color;

/// Platform line ending used by every sink.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
/// Platform line ending used by every sink.
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Message severity, mapped to a console color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Plain text in the terminal's current color.
    #[default]
    Default,
    Success,
    Warning,
    Error,
    Verbose,
    DarkSuccess,
    DarkWarning,
    DarkError,
    DarkVerbose,
}

impl Severity {
    /// Foreground color, or `None` to keep the current one.
    #[must_use]
    pub fn color(self) -> Option<Color> {
        match self {
            Self::Default => None,
            Self::Success => Some(Color::Green),
            Self::Warning => Some(Color::Yellow),
            Self::Error => Some(Color::Red),
            Self::Verbose => Some(Color::Grey),
            Self::DarkSuccess => Some(Color::DarkGreen),
            Self::DarkWarning => Some(Color::DarkYellow),
            Self::DarkError => Some(Color::DarkRed),
            Self::DarkVerbose => Some(Color::DarkGrey),
        }
    }
}

/// A single message for the console and log sinks.
///
/// Built with chained setters:
///
/// ```
/// use dupefinder::output::{OutputItem, Severity};
///
/// let item = OutputItem::new("Duplicate.")
///     .severity(Severity::DarkWarning)
///     .deferred(true);
/// assert!(item.deferred);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputItem {
    /// Text to write
    pub message: String,
    /// Terminate the message with a line ending
    pub append_newline: bool,
    /// Write to the error stream instead of standard output
    pub is_error: bool,
    /// Console color class
    pub severity: Severity,
    /// Hold back until the deferred queue is flushed
    pub deferred: bool,
    /// Drop without writing anywhere
    pub discard: bool,
    /// Error text appended to the log entry
    pub attached_error: Option<String>,
}

impl OutputItem {
    /// A default-severity line.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            append_newline: true,
            is_error: false,
            severity: Severity::Default,
            deferred: false,
            discard: false,
            attached_error: None,
        }
    }

    /// Do not terminate the message with a line ending.
    #[must_use]
    pub fn inline(mut self) -> Self {
        self.append_newline = false;
        self
    }

    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Route to the error stream.
    #[must_use]
    pub fn error(mut self) -> Self {
        self.is_error = true;
        self
    }

    #[must_use]
    pub fn deferred(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    #[must_use]
    pub fn discard(mut self, discard: bool) -> Self {
        self.discard = discard;
        self
    }

    /// Attach error text that only the log sink records.
    #[must_use]
    pub fn with_attached_error(mut self, error: impl ToString) -> Self {
        self.attached_error = Some(error.to_string());
        self
    }

    /// Text as written to the console.
    #[must_use]
    pub fn console_text(&self) -> String {
        if self.append_newline {
            format!("{}{}", self.message, LINE_ENDING)
        } else {
            self.message.clone()
        }
    }

    /// Text as appended to the log file.
    ///
    /// An attached error always starts on its own line and is terminated.
    #[must_use]
    pub fn log_text(&self) -> String {
        let mut text = self.message.clone();
        if self.append_newline {
            text.push_str(LINE_ENDING);
        }
        if let Some(err) = self.attached_error.as_deref().filter(|e| !e.is_empty()) {
            if !self.append_newline {
                text.push_str(LINE_ENDING);
            }
            text.push_str(err);
            text.push_str(LINE_ENDING);
        }
        text
    }

    /// Whether the console color must be reset after writing.
    #[must_use]
    pub fn needs_color_reset(&self) -> bool {
        self.is_error || self.severity != Severity::Default
    }
}

impl From<&str> for OutputItem {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for OutputItem {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
