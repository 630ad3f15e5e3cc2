//! Terminal output of the rebuild loop.

use console::{Style, Term};

use crate::Address;

/// Terminal writer for build status and listening announcements.
///
/// A console without a terminal discards everything written to it.
#[derive(Clone)]
pub(crate) struct Console {
    term: Option<Term>,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
}

impl Console {
    /// Create a console writing to stdout.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::with_term(Some(Term::stdout()))
    }

    /// Create a console that writes nothing.
    #[must_use]
    pub(crate) fn silent() -> Self {
        Self::with_term(None)
    }

    fn with_term(term: Option<Term>) -> Self {
        Self {
            term,
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    /// Clear the screen before a new cycle. No-op when not attached to a terminal.
    pub(crate) fn clear(&self) {
        if let Some(term) = self.term.as_ref().filter(|t| t.is_term()) {
            let _ = term.clear_screen();
        }
    }

    /// Print the listening address.
    pub(crate) fn listening(&self, address: &Address) {
        let line = format!("Listening on {address}");
        self.write_line(&self.cyan_bold.apply_to(line).to_string());
    }

    /// Print raw checker diagnostics.
    pub(crate) fn diagnostics(&self, output: &str) {
        let Some(term) = &self.term else {
            return;
        };
        if output.is_empty() {
            return;
        }
        let _ = term.write_str(output);
        if !output.ends_with('\n') {
            let _ = term.write_line("");
        }
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        self.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.write_line(&self.red.apply_to(msg).to_string());
    }

    fn write_line(&self, line: &str) {
        if let Some(term) = &self.term {
            let _ = term.write_line(line);
        }
    }
}
