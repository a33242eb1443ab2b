//! Colored terminal output utilities.

use std::fmt::Display;

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    dim: Style,
    cyan_bold: Style,
}

impl Output {
    /// Create a new output formatter writing to stderr.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            dim: Style::new().dim(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    fn line(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        self.line(msg);
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.red.apply_to(msg).to_string());
    }

    /// Print a section heading (cyan bold) under a separator line.
    pub(crate) fn heading(&self, msg: &str) {
        self.line(&"=".repeat(70));
        self.line(&self.cyan_bold.apply_to(msg).to_string());
    }

    /// Print a `label: value` line. Non-zero values are colored by `tone`.
    pub(crate) fn stat(&self, label: &str, value: usize, tone: Tone) {
        let text = format!("{label}: {value}");
        let styled = match tone {
            _ if value == 0 => self.dim.apply_to(text),
            Tone::Plain => Style::new().apply_to(text),
            Tone::Good => self.green.apply_to(text),
            Tone::Bad => self.yellow.apply_to(text),
        };
        self.line(&styled.to_string());
    }

    /// Print an indented list entry.
    pub(crate) fn item(&self, entry: impl Display, detail: Option<&str>) {
        match detail {
            Some(detail) => self.line(&format!(
                "  {entry}: {}",
                self.yellow.apply_to(detail)
            )),
            None => self.line(&format!("  {}", self.dim.apply_to(entry))),
        }
    }
}

/// Coloring of a [`Output::stat`] line.
#[derive(Clone, Copy)]
pub(crate) enum Tone {
    Plain,
    Good,
    Bad,
}
